//! Render-source model: a list of meshes with local placements.

use std::sync::Arc;

use larkspur_core::math::Mat4;
use larkspur_graphics::mesh::Mesh;

/// One mesh of a model, placed by a local transform.
#[derive(Debug, Clone)]
pub struct ModelMesh {
    /// The render mesh.
    pub mesh: Arc<Mesh>,
    /// Placement relative to the model root.
    pub transform: Mat4,
}

/// A render source composed of one or more meshes.
///
/// This is what mesh-type collision resolves its geometry from, either
/// directly (procedurally assigned) or through the asset registry.
#[derive(Debug, Clone, Default)]
pub struct Model {
    /// The meshes with their local placements.
    pub meshes: Vec<ModelMesh>,
}

impl Model {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a model from a single mesh at the identity placement.
    pub fn from_mesh(mesh: Arc<Mesh>) -> Self {
        Self {
            meshes: vec![ModelMesh {
                mesh,
                transform: Mat4::identity(),
            }],
        }
    }

    /// Append a mesh with a local placement.
    #[must_use]
    pub fn with_mesh(mut self, mesh: Arc<Mesh>, transform: Mat4) -> Self {
        self.meshes.push(ModelMesh { mesh, transform });
        self
    }

    /// Number of meshes.
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }
}
