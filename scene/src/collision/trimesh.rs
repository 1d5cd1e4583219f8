//! Triangle extraction from render meshes for mesh collision.
//!
//! Extraction walks the triangles of a render mesh's solid representation
//! and produces an **unscaled** triangle list. The entity's world scale is
//! applied when lowering to a rapier trimesh, so runtime scale changes
//! rebuild from the cached triangles without re-extracting.

use std::collections::HashMap;

use larkspur_core::math::{Point3, Vec3};
use larkspur_graphics::mesh::{Mesh, PrimitiveTopology, RenderStyle};
use rapier3d::prelude::SharedShape;

/// Unscaled triangle data extracted from one render mesh.
///
/// Cached per source-mesh identity by the collision system, so multiple
/// collision components sharing one render mesh pay the extraction (and
/// optional vertex welding) once.
#[derive(Debug, Clone)]
pub struct TriangleMeshData {
    vertices: Vec<Point3>,
    indices: Vec<[u32; 3]>,
}

impl TriangleMeshData {
    /// Extract the triangle list of `mesh`'s solid representation.
    ///
    /// Only triangle-list topology is supported. For an indexed mesh the
    /// solid index buffer is walked; a non-indexed mesh contributes every 3
    /// consecutive vertices as one triangle.
    ///
    /// With `check_vertex_duplicates`, positions are welded by exact bit
    /// pattern before insertion. Welding trades CPU time for a smaller
    /// triangle mesh, which is why it is a per-mesh opt-in rather than a
    /// default.
    ///
    /// Returns `None` when the mesh holds no complete triangle.
    pub fn extract(mesh: &Mesh, check_vertex_duplicates: bool) -> Option<Self> {
        let solid = *mesh.primitive(RenderStyle::Solid);
        if solid.topology != PrimitiveTopology::TriangleList {
            log::warn!(
                "mesh {:?}: collision extraction supports triangle lists, found {:?}",
                mesh.id(),
                solid.topology
            );
            return None;
        }

        let mut positions: Vec<f32> = Vec::new();
        let vertex_count = mesh.get_positions(&mut positions);
        if vertex_count == 0 {
            return None;
        }

        let mut tri_indices: Vec<u32> = Vec::new();
        if solid.indexed {
            mesh.get_indices(&mut tri_indices);
        } else {
            tri_indices.extend(solid.base..solid.base + solid.count);
        }
        if tri_indices.len() < 3 {
            return None;
        }

        let mut vertices: Vec<Point3> = Vec::with_capacity(vertex_count);
        let mut remap: Vec<u32> = Vec::with_capacity(vertex_count);
        if check_vertex_duplicates {
            // Weld exact duplicates, keyed by the raw f32 bit patterns.
            let mut seen: HashMap<[u32; 3], u32> = HashMap::with_capacity(vertex_count);
            for chunk in positions.chunks_exact(3).take(vertex_count) {
                let bits = [chunk[0].to_bits(), chunk[1].to_bits(), chunk[2].to_bits()];
                let index = *seen.entry(bits).or_insert_with(|| {
                    vertices.push(Point3::new(chunk[0], chunk[1], chunk[2]));
                    (vertices.len() - 1) as u32
                });
                remap.push(index);
            }
        } else {
            for chunk in positions.chunks_exact(3).take(vertex_count) {
                remap.push(vertices.len() as u32);
                vertices.push(Point3::new(chunk[0], chunk[1], chunk[2]));
            }
        }

        let mut indices: Vec<[u32; 3]> = Vec::with_capacity(tri_indices.len() / 3);
        for tri in tri_indices.chunks_exact(3) {
            let resolve = |i: u32| remap.get(i as usize).copied();
            match (resolve(tri[0]), resolve(tri[1]), resolve(tri[2])) {
                (Some(a), Some(b), Some(c)) => indices.push([a, b, c]),
                _ => {
                    log::warn!(
                        "mesh {:?}: triangle references out-of-range vertex; skipped",
                        mesh.id()
                    );
                }
            }
        }
        if indices.is_empty() {
            return None;
        }

        Some(Self { vertices, indices })
    }

    /// Number of (possibly welded) vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    /// Lower to a rapier trimesh with `scale` applied to the cached
    /// (unscaled) vertices.
    pub fn to_shared_shape(&self, scale: Vec3) -> Option<SharedShape> {
        let vertices: Vec<Point3> = self
            .vertices
            .iter()
            .map(|p| Point3::new(p.x * scale.x, p.y * scale.y, p.z * scale.z))
            .collect();
        match SharedShape::trimesh(vertices, self.indices.clone()) {
            Ok(shape) => Some(shape),
            Err(err) => {
                log::error!("trimesh construction failed: {err}");
                None
            }
        }
    }
}
