//! Mesh definition with incremental geometry updates.
//!
//! A [`Mesh`] is the addressable unit of renderable geometry: one
//! interleaved vertex buffer, one index buffer per render style (solid,
//! wireframe, points), and a primitive descriptor per style. Edits staged
//! through the typed setters accumulate in a [`GeometryData`] and are
//! committed by [`Mesh::update`], which decides buffer reuse versus
//! reallocation and keeps derived render styles in sync.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use larkspur_core::math::Vec3;
use larkspur_core::Aabb;

use crate::device::GraphicsDevice;
use crate::resources::Buffer;
use crate::types::{BufferDescriptor, BufferUsage};

use super::geometry::{GeometryData, StreamData, VertexStream};
use super::layout::{VertexElementFormat, VertexLayout, VertexSemantic};
use super::morph::{Morph, Skin};

/// Primitive topology describing how vertices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    /// Each vertex is a separate point.
    PointList,
    /// Every two vertices form a line.
    LineList,
    /// Vertices form a connected strip of lines.
    LineStrip,
    /// Every three vertices form a triangle.
    #[default]
    TriangleList,
    /// Vertices form a connected strip of triangles.
    TriangleStrip,
}

/// Index format for indexed drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    /// 16-bit unsigned integers (max 65535 vertices).
    #[default]
    Uint16,
    /// 32-bit unsigned integers (max ~4 billion vertices).
    Uint32,
}

impl IndexFormat {
    /// Get the size in bytes of each index.
    pub fn size(&self) -> usize {
        match self {
            Self::Uint16 => 2,
            Self::Uint32 => 4,
        }
    }
}

/// Alternate index-buffer interpretations of one vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderStyle {
    /// Filled triangles (or whatever topology the mesh was committed with).
    #[default]
    Solid,
    /// Unique triangle edges as a line list.
    Wireframe,
    /// Every vertex as a point.
    Points,
}

impl RenderStyle {
    /// Number of render-style slots.
    pub const COUNT: usize = 3;

    /// Slot index for per-style arrays.
    pub const fn slot(self) -> usize {
        match self {
            Self::Solid => 0,
            Self::Wireframe => 1,
            Self::Points => 2,
        }
    }

    const fn bit(self) -> u8 {
        1 << self.slot() as u8
    }
}

/// Draw-range descriptor for one render style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Primitive {
    /// Primitive topology.
    pub topology: PrimitiveTopology,
    /// First vertex or index.
    pub base: u32,
    /// Number of vertices or indices.
    pub count: u32,
    /// Whether the range indexes into an index buffer.
    pub indexed: bool,
}

impl Default for Primitive {
    fn default() -> Self {
        Self {
            topology: PrimitiveTopology::TriangleList,
            base: 0,
            count: 0,
            indexed: false,
        }
    }
}

/// Process-unique mesh identifier.
///
/// Used as the identity key wherever derived data is cached per mesh
/// (e.g. collision triangle extraction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(u64);

static NEXT_MESH_ID: AtomicU64 = AtomicU64::new(1);

impl MeshId {
    fn next() -> Self {
        Self(NEXT_MESH_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw id value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

mod sealed {
    pub trait Sealed {}
    impl<T: Copy> Sealed for Vec<T> {}
    impl<T: Copy> Sealed for [T] {}
}

/// Destination for stream readback.
///
/// Growable destinations (`Vec<T>`) are truncated then extended to exactly
/// the source contents; fixed destinations (`[T]`) are written in place and
/// must be large enough (asserts in debug builds, truncates otherwise).
pub trait StreamDest<T: Copy>: sealed::Sealed {
    /// Copy `src` into this destination, returning the number of scalars written.
    fn write_from(&mut self, src: &[T]) -> usize;
}

impl<T: Copy> StreamDest<T> for Vec<T> {
    fn write_from(&mut self, src: &[T]) -> usize {
        self.clear();
        self.extend_from_slice(src);
        src.len()
    }
}

impl<T: Copy> StreamDest<T> for [T] {
    fn write_from(&mut self, src: &[T]) -> usize {
        debug_assert!(
            self.len() >= src.len(),
            "fixed readback destination too small: {} < {}",
            self.len(),
            src.len()
        );
        let n = src.len().min(self.len());
        self[..n].copy_from_slice(&src[..n]);
        n
    }
}

/// A mesh with GPU-resident geometry and an incremental editing API.
///
/// # Editing
///
/// The typed setters (`set_positions`, `set_normals`, ...) stage data without
/// touching GPU buffers. [`Mesh::update`] commits everything staged since the
/// previous update: it recomputes bounds, reallocates buffers only when
/// capacity is exceeded (or a [`Mesh::clear`] forced it), writes the staged
/// streams, and regenerates any derived render styles previously requested.
///
/// # Example
///
/// ```
/// use larkspur_graphics::device::GraphicsDevice;
/// use larkspur_graphics::mesh::{Mesh, PrimitiveTopology};
///
/// let device = GraphicsDevice::new("example");
/// let mut mesh = Mesh::new(device);
/// mesh.set_positions(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0]);
/// mesh.set_indices(&[0, 1, 2]);
/// mesh.update(PrimitiveTopology::TriangleList, true);
/// assert_eq!(mesh.vertex_count(), 3);
/// ```
pub struct Mesh {
    id: MeshId,
    device: Arc<GraphicsDevice>,
    layout: Option<Arc<VertexLayout>>,
    vertex_buffer: Option<Arc<Buffer>>,
    index_buffers: [Option<Arc<Buffer>>; RenderStyle::COUNT],
    index_formats: [Option<IndexFormat>; RenderStyle::COUNT],
    primitives: [Primitive; RenderStyle::COUNT],
    vertex_count: u32,
    aabb: Aabb,
    aabb_version: u64,
    morph: Option<Arc<Morph>>,
    skin: Option<Arc<Skin>>,
    geometry: Option<Box<GeometryData>>,
    generated_styles: u8,
    label: Option<String>,
}

impl Mesh {
    /// Create an empty mesh bound to `device`.
    pub fn new(device: Arc<GraphicsDevice>) -> Self {
        Self {
            id: MeshId::next(),
            device,
            layout: None,
            vertex_buffer: None,
            index_buffers: [None, None, None],
            index_formats: [None, None, None],
            primitives: [Primitive::default(); RenderStyle::COUNT],
            vertex_count: 0,
            aabb: Aabb::ZERO,
            aabb_version: 0,
            morph: None,
            skin: None,
            geometry: None,
            generated_styles: 0,
            label: None,
        }
    }

    /// Set a debug label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Process-unique mesh id.
    pub fn id(&self) -> MeshId {
        self.id
    }

    /// Get the parent device.
    pub fn device(&self) -> &Arc<GraphicsDevice> {
        &self.device
    }

    /// Get the mesh label, if set.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The current vertex layout, if a vertex buffer has been committed.
    pub fn layout(&self) -> Option<&Arc<VertexLayout>> {
        self.layout.as_ref()
    }

    /// The committed vertex buffer, if any.
    pub fn vertex_buffer(&self) -> Option<&Arc<Buffer>> {
        self.vertex_buffer.as_ref()
    }

    /// The index buffer for `style`, if any.
    pub fn index_buffer(&self, style: RenderStyle) -> Option<&Arc<Buffer>> {
        self.index_buffers[style.slot()].as_ref()
    }

    /// The index format for `style`, if that style has an index buffer.
    pub fn index_format(&self, style: RenderStyle) -> Option<IndexFormat> {
        self.index_formats[style.slot()]
    }

    /// The primitive descriptor for `style`.
    pub fn primitive(&self, style: RenderStyle) -> &Primitive {
        &self.primitives[style.slot()]
    }

    /// Number of committed vertices.
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Object-space bounding box.
    pub fn aabb(&self) -> &Aabb {
        &self.aabb
    }

    /// Replace the object-space bounding box. Bumps the bounds version.
    pub fn set_aabb(&mut self, aabb: Aabb) {
        self.aabb = aabb;
        self.aabb_version += 1;
    }

    /// Monotonically increasing bounds version.
    ///
    /// Consumers compare versions to detect staleness without recomputing
    /// box equality.
    pub fn aabb_version(&self) -> u64 {
        self.aabb_version
    }

    /// The morph binding, if any.
    pub fn morph(&self) -> Option<&Arc<Morph>> {
        self.morph.as_ref()
    }

    /// Set or clear the morph binding (a counted reference).
    pub fn set_morph(&mut self, morph: Option<Arc<Morph>>) {
        self.morph = morph;
    }

    /// The skin binding, if any.
    pub fn skin(&self) -> Option<&Arc<Skin>> {
        self.skin.as_ref()
    }

    /// Set or clear the skin binding.
    pub fn set_skin(&mut self, skin: Option<Arc<Skin>>) {
        self.skin = skin;
    }

    // ---- Editing API ----

    fn edit_geometry(&mut self) -> &mut GeometryData {
        self.geometry.get_or_insert_with(Default::default)
    }

    /// Stage an arbitrary vertex stream for the next [`Mesh::update`].
    ///
    /// `vertex_count` overrides the count derived from the data length.
    /// Returns `false` if the write was rejected (mismatched vertex count
    /// within the current commit cycle).
    pub fn set_stream(
        &mut self,
        semantic: VertexSemantic,
        data: StreamData,
        components: u32,
        vertex_count: Option<u32>,
        normalize: bool,
    ) -> bool {
        self.edit_geometry().set_stream(
            semantic,
            VertexStream {
                data,
                components,
                normalize,
            },
            vertex_count,
        )
    }

    /// Stage vertex positions (3 components per vertex).
    pub fn set_positions(&mut self, positions: &[f32]) {
        self.set_stream(
            VertexSemantic::Position,
            StreamData::Float32(positions.to_vec()),
            3,
            None,
            false,
        );
    }

    /// Stage vertex normals (3 components per vertex).
    pub fn set_normals(&mut self, normals: &[f32]) {
        self.set_stream(
            VertexSemantic::Normal,
            StreamData::Float32(normals.to_vec()),
            3,
            None,
            false,
        );
    }

    /// Stage texture coordinates for `channel` (2 components per vertex).
    ///
    /// Channels 0..=7 are supported; other channels log an error and are
    /// ignored.
    pub fn set_uvs(&mut self, channel: u8, uvs: &[f32]) {
        let Some(semantic) = VertexSemantic::texcoord(channel) else {
            log::error!("invalid texture coordinate channel {channel}");
            return;
        };
        self.set_stream(semantic, StreamData::Float32(uvs.to_vec()), 2, None, false);
    }

    /// Stage float vertex colors (4 components per vertex).
    pub fn set_colors(&mut self, colors: &[f32]) {
        self.set_stream(
            VertexSemantic::Color,
            StreamData::Float32(colors.to_vec()),
            4,
            None,
            false,
        );
    }

    /// Stage 8-bit normalized vertex colors (4 components per vertex).
    pub fn set_colors32(&mut self, colors: &[u8]) {
        self.set_stream(
            VertexSemantic::Color,
            StreamData::Unorm8(colors.to_vec()),
            4,
            None,
            true,
        );
    }

    /// Stage index data for the next [`Mesh::update`].
    pub fn set_indices(&mut self, indices: &[u32]) {
        self.edit_geometry().set_indices(indices.to_vec(), None);
    }

    /// Stage index data, committing only the first `count` indices.
    pub fn set_indices_with_count(&mut self, indices: &[u32], count: u32) {
        self.edit_geometry()
            .set_indices(indices.to_vec(), Some(count));
    }

    // ---- Readback API ----

    /// Copy a float vertex stream into `dest`, returning the vertex count.
    ///
    /// Prefers data staged in the current commit cycle; otherwise reads back
    /// from the committed vertex buffer. Returns 0 if the semantic is absent
    /// or not float-typed.
    pub fn get_stream<D>(&self, semantic: VertexSemantic, dest: &mut D) -> usize
    where
        D: StreamDest<f32> + ?Sized,
    {
        if let Some(geo) = &self.geometry {
            if let Some(stream) = geo.stream(semantic) {
                return match &stream.data {
                    StreamData::Float32(values) => {
                        dest.write_from(values);
                        geo.vertex_count as usize
                    }
                    StreamData::Unorm8(_) => {
                        log::warn!("stream {semantic:?} is 8-bit data; float readback skipped");
                        0
                    }
                };
            }
        }

        let (Some(buffer), Some(layout)) = (&self.vertex_buffer, &self.layout) else {
            return 0;
        };
        let Some(attr) = layout.attribute(semantic) else {
            return 0;
        };
        if attr.format == VertexElementFormat::Unorm8x4 {
            log::warn!("stream {semantic:?} is 8-bit data; float readback skipped");
            return 0;
        }

        let comps = attr.format.components() as usize;
        let stride = layout.stride as usize;
        let image = buffer.read_to_vec();
        let count = self.vertex_count as usize;
        let mut values = Vec::with_capacity(count * comps);
        for v in 0..count {
            let offset = v * stride + attr.offset as usize;
            for c in 0..comps {
                let at = offset + c * 4;
                if at + 4 > image.len() {
                    break;
                }
                values.push(bytemuck::pod_read_unaligned::<f32>(&image[at..at + 4]));
            }
        }
        dest.write_from(&values);
        count
    }

    /// Copy vertex positions into `dest`, returning the vertex count.
    pub fn get_positions<D>(&self, dest: &mut D) -> usize
    where
        D: StreamDest<f32> + ?Sized,
    {
        self.get_stream(VertexSemantic::Position, dest)
    }

    /// Copy vertex normals into `dest`, returning the vertex count.
    pub fn get_normals<D>(&self, dest: &mut D) -> usize
    where
        D: StreamDest<f32> + ?Sized,
    {
        self.get_stream(VertexSemantic::Normal, dest)
    }

    /// Copy texture coordinates for `channel` into `dest`.
    pub fn get_uvs<D>(&self, channel: u8, dest: &mut D) -> usize
    where
        D: StreamDest<f32> + ?Sized,
    {
        let Some(semantic) = VertexSemantic::texcoord(channel) else {
            log::error!("invalid texture coordinate channel {channel}");
            return 0;
        };
        self.get_stream(semantic, dest)
    }

    /// Copy float vertex colors into `dest`, returning the vertex count.
    pub fn get_colors<D>(&self, dest: &mut D) -> usize
    where
        D: StreamDest<f32> + ?Sized,
    {
        self.get_stream(VertexSemantic::Color, dest)
    }

    /// Copy index data into `dest`, returning the number of indices.
    ///
    /// Prefers indices staged in the current commit cycle; otherwise reads
    /// back from the solid index buffer.
    pub fn get_indices<D>(&self, dest: &mut D) -> usize
    where
        D: StreamDest<u32> + ?Sized,
    {
        if let Some(geo) = &self.geometry {
            if let Some(indices) = geo.indices() {
                let count = (geo.index_count as usize).min(indices.len());
                dest.write_from(&indices[..count]);
                return count;
            }
        }
        match self.read_committed_indices(RenderStyle::Solid) {
            Some(indices) => {
                let n = indices.len();
                dest.write_from(&indices);
                n
            }
            None => 0,
        }
    }

    /// Read the committed index list for `style` as u32 values.
    fn read_committed_indices(&self, style: RenderStyle) -> Option<Vec<u32>> {
        let slot = style.slot();
        let buffer = self.index_buffers[slot].as_ref()?;
        let format = self.index_formats[slot]?;
        let primitive = &self.primitives[slot];
        if !primitive.indexed {
            return None;
        }
        let count = primitive.count as usize;
        let bytes = buffer.read_to_vec();
        let mut out = Vec::with_capacity(count);
        match format {
            IndexFormat::Uint16 => {
                for i in 0..count.min(bytes.len() / 2) {
                    out.push(bytemuck::pod_read_unaligned::<u16>(&bytes[i * 2..i * 2 + 2]) as u32);
                }
            }
            IndexFormat::Uint32 => {
                for i in 0..count.min(bytes.len() / 4) {
                    out.push(bytemuck::pod_read_unaligned::<u32>(&bytes[i * 4..i * 4 + 4]));
                }
            }
        }
        Some(out)
    }

    // ---- Commit ----

    /// Commit all staged edits into GPU buffers.
    ///
    /// Buffers are reused in place while the staged counts fit the allocated
    /// capacity; otherwise (or after [`Mesh::clear`]) they are destroyed and
    /// recreated. When `recompute_bounds` is set and a 3-component position
    /// stream is staged, the bounding box is recomputed from it (staging 2D
    /// positions deliberately leaves the bounds untouched). Derived render
    /// styles generated earlier are regenerated to follow the new data.
    ///
    /// A call with nothing staged performs no work beyond primitive
    /// bookkeeping.
    pub fn update(&mut self, topology: PrimitiveTopology, recompute_bounds: bool) {
        larkspur_core::profile_scope!("mesh: update");

        let Some(mut geo) = self.geometry.take() else {
            return;
        };

        if recompute_bounds {
            self.recompute_aabb(&geo);
        }

        let vertex_streams_updated = geo.vertex_streams_updated;
        let index_stream_updated = geo.index_stream_updated;
        let staged_vertex_count = geo.vertex_count;
        let staged_index_count = geo.index_count;

        // Destroy buffers that cannot hold the staged data (or that a clear
        // explicitly invalidated). Capacity never shrinks.
        if staged_vertex_count > 0 && (geo.recreate || staged_vertex_count > geo.max_vertices) {
            self.vertex_buffer = None;
            self.layout = None;
        }
        let solid = RenderStyle::Solid.slot();
        if staged_index_count > 0 && (geo.recreate || staged_index_count > geo.max_indices) {
            self.index_buffers[solid] = None;
            self.index_formats[solid] = None;
        }

        self.upload_vertex_streams(&mut geo);
        self.upload_indices(&mut geo);

        let primitive = &mut self.primitives[solid];
        primitive.topology = topology;
        primitive.base = 0;
        if self.index_buffers[solid].is_some() {
            if index_stream_updated {
                primitive.count = staged_index_count;
                primitive.indexed = true;
            }
        } else if vertex_streams_updated {
            primitive.count = staged_vertex_count;
            primitive.indexed = false;
        }

        geo.reset_cycle();
        self.geometry = Some(geo);

        self.update_render_states();
    }

    fn recompute_aabb(&mut self, geo: &GeometryData) {
        let Some(stream) = geo.stream(VertexSemantic::Position) else {
            return;
        };
        // Bounds only make sense for 3-component positions; staged 2D
        // positions leave the box untouched.
        if stream.components != 3 {
            return;
        }
        let StreamData::Float32(positions) = &stream.data else {
            return;
        };
        self.aabb = Aabb::from_points(
            positions
                .chunks_exact(3)
                .map(|p| Vec3::new(p[0], p[1], p[2])),
        );
        self.aabb_version += 1;
    }

    fn upload_vertex_streams(&mut self, geo: &mut GeometryData) {
        if !geo.vertex_streams_updated {
            return;
        }

        if self.vertex_buffer.is_none() {
            geo.max_vertices = geo.max_vertices.max(geo.vertex_count);
            let layout = VertexLayout::from_streams(geo.streams.iter().filter_map(
                |(semantic, stream)| match stream.element_format() {
                    Some(format) => Some((*semantic, format)),
                    None => {
                        log::error!(
                            "vertex stream {semantic:?} has an unsupported type/component \
                             combination; dropped"
                        );
                        None
                    }
                },
            ));
            if layout.stride == 0 || geo.max_vertices == 0 {
                return;
            }
            let size = geo.max_vertices as u64 * layout.stride as u64;
            let descriptor = BufferDescriptor::new(
                size,
                BufferUsage::VERTEX | BufferUsage::COPY_DST | BufferUsage::MAP_READ,
            )
            .with_hint(geo.vertex_usage)
            .with_label(format!("mesh-{}/vertex", self.id.value()));
            match self.device.create_buffer(&descriptor) {
                Ok(buffer) => {
                    self.vertex_buffer = Some(buffer);
                    self.layout = Some(layout);
                }
                Err(err) => {
                    log::error!("mesh {:?}: vertex buffer allocation failed: {err}", self.id);
                    return;
                }
            }
        }

        let (Some(buffer), Some(layout)) = (&self.vertex_buffer, &self.layout) else {
            return;
        };
        let stride = layout.stride as usize;

        // Scatter the staged streams into the interleaved image, leaving
        // semantics that were not re-staged this cycle intact.
        let mut image = buffer.read_to_vec();
        for (semantic, stream) in &geo.streams {
            let Some(attr) = layout.attribute(*semantic) else {
                log::warn!(
                    "vertex stream {semantic:?} is not part of the committed layout; skipped \
                     (force reallocation with clear() to change the layout)"
                );
                continue;
            };
            let elem_size = attr.format.size();
            let src = stream.data.as_bytes();
            if elem_size == 0 {
                continue;
            }
            let count = (geo.vertex_count as usize).min(src.len() / elem_size);
            for v in 0..count {
                let dst = v * stride + attr.offset as usize;
                let s = v * elem_size;
                if dst + elem_size <= image.len() {
                    image[dst..dst + elem_size].copy_from_slice(&src[s..s + elem_size]);
                }
            }
        }
        buffer.write(0, &image);
        self.vertex_count = geo.vertex_count;
    }

    fn upload_indices(&mut self, geo: &mut GeometryData) {
        if !geo.index_stream_updated {
            return;
        }
        let Some(indices) = geo.indices.as_deref() else {
            return;
        };

        let slot = RenderStyle::Solid.slot();
        if self.index_buffers[slot].is_none() {
            geo.max_indices = geo.max_indices.max(geo.index_count);
            if geo.max_indices == 0 {
                return;
            }
            // 16-bit indices unless the vertex capacity cannot be addressed.
            let format = if geo.max_vertices > 0xFFFF {
                IndexFormat::Uint32
            } else {
                IndexFormat::Uint16
            };
            let size = geo.max_indices as u64 * format.size() as u64;
            let descriptor = BufferDescriptor::new(
                size,
                BufferUsage::INDEX | BufferUsage::COPY_DST | BufferUsage::MAP_READ,
            )
            .with_hint(geo.index_usage)
            .with_label(format!("mesh-{}/index", self.id.value()));
            match self.device.create_buffer(&descriptor) {
                Ok(buffer) => {
                    self.index_buffers[slot] = Some(buffer);
                    self.index_formats[slot] = Some(format);
                }
                Err(err) => {
                    log::error!("mesh {:?}: index buffer allocation failed: {err}", self.id);
                    return;
                }
            }
        }

        let Some(buffer) = &self.index_buffers[slot] else {
            return;
        };
        let format = self.index_formats[slot].unwrap_or_default();
        let count = (geo.index_count as usize).min(indices.len());
        match format {
            IndexFormat::Uint16 => {
                let narrowed: Vec<u16> = indices[..count].iter().map(|&i| i as u16).collect();
                buffer.write(0, bytemuck::cast_slice(&narrowed));
            }
            IndexFormat::Uint32 => {
                buffer.write(0, bytemuck::cast_slice(&indices[..count]));
            }
        }
    }

    // ---- Derived render styles ----

    /// Reset the mesh to empty staging state with explicit buffer capacity.
    ///
    /// The next [`Mesh::update`] reallocates the vertex/index buffers at
    /// `max_vertices`/`max_indices` (the only way capacity shrinks). The
    /// dynamic flags set the usage hints for the recreated buffers.
    pub fn clear(
        &mut self,
        vertices_dynamic: bool,
        indices_dynamic: bool,
        max_vertices: u32,
        max_indices: u32,
    ) {
        self.geometry = Some(Box::new(GeometryData::with_capacity(
            vertices_dynamic,
            indices_dynamic,
            max_vertices,
            max_indices,
        )));
    }

    /// Build the wireframe index buffer from the solid representation.
    ///
    /// For an indexed mesh, every triangle contributes its 3 edges with
    /// order-independent deduplication, so an edge shared by two triangles
    /// appears exactly once. For a non-indexed mesh every 3 consecutive
    /// vertices are treated as an independent triangle and all edges are
    /// emitted; without connectivity the shared edges of a non-welded mesh
    /// cannot be detected, so duplicate lines are expected there (known
    /// limitation).
    pub fn generate_wireframe(&mut self) {
        larkspur_core::profile_scope!("mesh: generate_wireframe");

        let wslot = RenderStyle::Wireframe.slot();
        // Release any previous wireframe representation first.
        self.index_buffers[wslot] = None;
        self.index_formats[wslot] = None;

        let solid = self.primitives[RenderStyle::Solid.slot()];
        let mut lines: Vec<u32> = Vec::with_capacity(solid.count as usize * 2);

        if let Some(indices) = self.read_committed_indices(RenderStyle::Solid) {
            let base = solid.base as usize;
            let end = (base + solid.count as usize).min(indices.len());
            let n = u64::from(self.vertex_count.max(1));
            let mut seen: HashSet<u64> = HashSet::new();
            let mut tri = base;
            while tri + 2 < end {
                for (e0, e1) in [(0, 1), (1, 2), (2, 0)] {
                    let a = indices[tri + e0];
                    let b = indices[tri + e1];
                    let key = if a > b {
                        u64::from(b) * n + u64::from(a)
                    } else {
                        u64::from(a) * n + u64::from(b)
                    };
                    if seen.insert(key) {
                        lines.push(a);
                        lines.push(b);
                    }
                }
                tri += 3;
            }
        } else {
            let base = solid.base;
            let count = solid.count;
            let mut tri = 0;
            while tri + 2 < count {
                for (e0, e1) in [(0, 1), (1, 2), (2, 0)] {
                    lines.push(base + tri + e0);
                    lines.push(base + tri + e1);
                }
                tri += 3;
            }
        }

        if !lines.is_empty() {
            let format = if lines.len() > 0xFFFF {
                IndexFormat::Uint32
            } else {
                IndexFormat::Uint16
            };
            let size = lines.len() as u64 * format.size() as u64;
            let descriptor = BufferDescriptor::new(
                size,
                BufferUsage::INDEX | BufferUsage::COPY_DST | BufferUsage::MAP_READ,
            )
            .with_label(format!("mesh-{}/wireframe", self.id.value()));
            match self.device.create_buffer(&descriptor) {
                Ok(buffer) => {
                    match format {
                        IndexFormat::Uint16 => {
                            let narrowed: Vec<u16> = lines.iter().map(|&i| i as u16).collect();
                            buffer.write(0, bytemuck::cast_slice(&narrowed));
                        }
                        IndexFormat::Uint32 => buffer.write(0, bytemuck::cast_slice(&lines)),
                    }
                    self.index_buffers[wslot] = Some(buffer);
                    self.index_formats[wslot] = Some(format);
                }
                Err(err) => {
                    log::error!(
                        "mesh {:?}: wireframe index buffer allocation failed: {err}",
                        self.id
                    );
                }
            }
        }

        self.primitives[wslot] = Primitive {
            topology: PrimitiveTopology::LineList,
            base: 0,
            count: lines.len() as u32,
            indexed: true,
        };
        self.generated_styles |= RenderStyle::Wireframe.bit();
    }

    fn generate_points(&mut self) {
        let slot = RenderStyle::Points.slot();
        self.primitives[slot] = Primitive {
            topology: PrimitiveTopology::PointList,
            base: 0,
            count: self.vertex_count,
            indexed: false,
        };
        self.generated_styles |= RenderStyle::Points.bit();
    }

    /// Ensure the derived representation for `style` exists.
    ///
    /// Wireframe triggers [`Mesh::generate_wireframe`] on first request;
    /// points synthesizes a non-indexed point-list primitive covering all
    /// vertices. Once a style has been prepared it is regenerated
    /// automatically after every [`Mesh::update`].
    pub fn prepare_render_state(&mut self, style: RenderStyle) {
        match style {
            RenderStyle::Solid => {}
            RenderStyle::Wireframe => {
                if self.generated_styles & RenderStyle::Wireframe.bit() == 0 {
                    self.generate_wireframe();
                }
            }
            RenderStyle::Points => self.generate_points(),
        }
    }

    /// Regenerate every derived render style that was previously prepared.
    pub fn update_render_states(&mut self) {
        if self.generated_styles & RenderStyle::Wireframe.bit() != 0 {
            self.generate_wireframe();
        }
        if self.generated_styles & RenderStyle::Points.bit() != 0 {
            self.generate_points();
        }
    }

    /// Release GPU buffers, staged data, and the morph/skin references.
    ///
    /// Destruction is idempotent; destroying an already-destroyed mesh is a
    /// no-op.
    pub fn destroy(&mut self) {
        log::trace!("Mesh {:?}: destroyed", self.id);
        self.vertex_buffer = None;
        self.layout = None;
        for slot in 0..RenderStyle::COUNT {
            self.index_buffers[slot] = None;
            self.index_formats[slot] = None;
            self.primitives[slot] = Primitive::default();
        }
        self.geometry = None;
        self.morph = None;
        self.skin = None;
        self.vertex_count = 0;
        self.generated_styles = 0;
    }
}

impl std::fmt::Debug for Mesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mesh")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("vertex_count", &self.vertex_count)
            .field("solid", &self.primitives[RenderStyle::Solid.slot()])
            .field("aabb_version", &self.aabb_version)
            .finish()
    }
}

// Ensure Mesh is Send + Sync
static_assertions::assert_impl_all!(Mesh: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    fn test_mesh() -> Mesh {
        Mesh::new(GraphicsDevice::new("test"))
    }

    const TRI_POSITIONS: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];

    #[test]
    fn triangle_roundtrip() {
        let mut mesh = test_mesh();
        mesh.set_positions(&TRI_POSITIONS);
        mesh.set_indices(&[0, 1, 2]);
        mesh.update(PrimitiveTopology::TriangleList, true);

        assert_eq!(mesh.vertex_count(), 3);
        let primitive = mesh.primitive(RenderStyle::Solid);
        assert_eq!(primitive.topology, PrimitiveTopology::TriangleList);
        assert_eq!(primitive.base, 0);
        assert_eq!(primitive.count, 3);
        assert!(primitive.indexed);

        assert_eq!(mesh.aabb().min, Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(mesh.aabb().max, Vec3::new(1.0, 1.0, 0.0));

        // Readback comes from the committed buffer (staging was cleared)
        let mut positions = Vec::new();
        assert_eq!(mesh.get_positions(&mut positions), 3);
        assert_eq!(positions, TRI_POSITIONS);

        let mut indices = Vec::new();
        assert_eq!(mesh.get_indices(&mut indices), 3);
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn readback_into_fixed_destination() {
        let mut mesh = test_mesh();
        mesh.set_positions(&TRI_POSITIONS);
        mesh.update(PrimitiveTopology::TriangleList, true);

        let mut fixed = [0.0f32; 9];
        assert_eq!(mesh.get_positions(fixed.as_mut_slice()), 3);
        assert_eq!(fixed, TRI_POSITIONS);
    }

    #[test]
    fn capacity_reuse_keeps_buffer_identity() {
        let mut mesh = test_mesh();
        mesh.clear(false, false, 100, 300);

        let positions: Vec<f32> = (0..30).map(|i| i as f32).collect();
        let indices: Vec<u32> = (0..30).map(|i| i % 10).collect();

        mesh.set_positions(&positions);
        mesh.set_indices(&indices);
        mesh.update(PrimitiveTopology::TriangleList, true);

        let vb1 = mesh.vertex_buffer().unwrap().clone();
        let ib1 = mesh.index_buffer(RenderStyle::Solid).unwrap().clone();
        // Capacity, not count, sizes the allocations
        assert_eq!(vb1.size(), 100 * 12);
        assert_eq!(ib1.size(), 300 * 2);

        mesh.set_positions(&positions);
        mesh.set_indices(&indices);
        mesh.update(PrimitiveTopology::TriangleList, true);

        assert!(Arc::ptr_eq(&vb1, mesh.vertex_buffer().unwrap()));
        assert!(Arc::ptr_eq(
            &ib1,
            mesh.index_buffer(RenderStyle::Solid).unwrap()
        ));
    }

    #[test]
    fn growth_reallocates_and_capacity_is_monotonic() {
        let mut mesh = test_mesh();
        mesh.set_positions(&TRI_POSITIONS);
        mesh.update(PrimitiveTopology::TriangleList, true);
        let small = mesh.vertex_buffer().unwrap().clone();
        assert_eq!(small.size(), 3 * 12);

        let bigger: Vec<f32> = vec![0.0; 30];
        mesh.set_positions(&bigger);
        mesh.update(PrimitiveTopology::TriangleList, true);
        let grown = mesh.vertex_buffer().unwrap().clone();
        assert!(!Arc::ptr_eq(&small, &grown));
        assert_eq!(grown.size(), 10 * 12);

        // Shrinking the count keeps the grown buffer
        mesh.set_positions(&TRI_POSITIONS);
        mesh.update(PrimitiveTopology::TriangleList, true);
        assert!(Arc::ptr_eq(&grown, mesh.vertex_buffer().unwrap()));
    }

    #[test]
    fn wireframe_dedups_shared_edges() {
        let mut mesh = test_mesh();
        // Two triangles sharing edge (0, 2)
        mesh.set_positions(&[
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            1.0, 1.0, 0.0, //
            0.0, 1.0, 0.0,
        ]);
        mesh.set_indices(&[0, 1, 2, 0, 2, 3]);
        mesh.update(PrimitiveTopology::TriangleList, true);

        mesh.generate_wireframe();
        let primitive = *mesh.primitive(RenderStyle::Wireframe);
        assert_eq!(primitive.topology, PrimitiveTopology::LineList);
        assert!(primitive.indexed);
        // 5 unique edges, not 6
        assert_eq!(primitive.count, 10);

        // Idempotent: regenerating without edits yields the identical list
        let first = mesh
            .index_buffer(RenderStyle::Wireframe)
            .unwrap()
            .read_to_vec();
        mesh.generate_wireframe();
        let second = mesh
            .index_buffer(RenderStyle::Wireframe)
            .unwrap()
            .read_to_vec();
        assert_eq!(first, second);
        assert_eq!(mesh.primitive(RenderStyle::Wireframe).count, 10);
    }

    #[test]
    fn wireframe_nonindexed_fallback_emits_all_edges() {
        let mut mesh = test_mesh();
        // Two disjoint triangles, non-indexed: no dedup possible
        mesh.set_positions(&vec![0.0; 18]);
        mesh.update(PrimitiveTopology::TriangleList, true);

        mesh.generate_wireframe();
        assert_eq!(mesh.primitive(RenderStyle::Wireframe).count, 12);
    }

    #[test]
    fn update_regenerates_prepared_styles() {
        let mut mesh = test_mesh();
        mesh.set_positions(&[
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            1.0, 1.0, 0.0, //
            0.0, 1.0, 0.0,
        ]);
        mesh.set_indices(&[0, 1, 2]);
        mesh.update(PrimitiveTopology::TriangleList, true);

        mesh.prepare_render_state(RenderStyle::Wireframe);
        assert_eq!(mesh.primitive(RenderStyle::Wireframe).count, 6);

        // Adding the second triangle must refresh the wireframe on update
        mesh.set_indices(&[0, 1, 2, 0, 2, 3]);
        mesh.update(PrimitiveTopology::TriangleList, true);
        assert_eq!(mesh.primitive(RenderStyle::Wireframe).count, 10);
    }

    #[test]
    fn points_style_covers_all_vertices() {
        let mut mesh = test_mesh();
        mesh.set_positions(&TRI_POSITIONS);
        mesh.update(PrimitiveTopology::TriangleList, true);

        mesh.prepare_render_state(RenderStyle::Points);
        let primitive = *mesh.primitive(RenderStyle::Points);
        assert_eq!(primitive.topology, PrimitiveTopology::PointList);
        assert_eq!(primitive.count, 3);
        assert!(!primitive.indexed);

        mesh.set_positions(&vec![0.0; 30]);
        mesh.update(PrimitiveTopology::TriangleList, true);
        assert_eq!(mesh.primitive(RenderStyle::Points).count, 10);
    }

    #[test]
    fn aabb_version_tracks_mutations() {
        let mut mesh = test_mesh();
        assert_eq!(mesh.aabb_version(), 0);

        mesh.set_positions(&TRI_POSITIONS);
        mesh.update(PrimitiveTopology::TriangleList, true);
        assert_eq!(mesh.aabb_version(), 1);

        mesh.set_aabb(Aabb::new(Vec3::zeros(), Vec3::new(2.0, 2.0, 2.0)));
        assert_eq!(mesh.aabb_version(), 2);

        // recompute_bounds = false leaves the box and version untouched
        mesh.set_positions(&TRI_POSITIONS);
        mesh.update(PrimitiveTopology::TriangleList, false);
        assert_eq!(mesh.aabb_version(), 2);
    }

    #[test]
    fn bounds_skip_non_3_component_positions() {
        let mut mesh = test_mesh();
        mesh.set_stream(
            VertexSemantic::Position,
            StreamData::Float32(vec![0.0, 0.0, 5.0, 5.0]),
            2,
            None,
            false,
        );
        mesh.update(PrimitiveTopology::TriangleList, true);
        // Deliberate no-op: 2D positions do not feed the bounding box
        assert_eq!(mesh.aabb_version(), 0);
        assert_eq!(*mesh.aabb(), Aabb::ZERO);
    }

    #[test]
    fn index_width_follows_vertex_capacity() {
        let mut mesh = test_mesh();
        mesh.set_positions(&TRI_POSITIONS);
        mesh.set_indices(&[0, 1, 2]);
        mesh.update(PrimitiveTopology::TriangleList, true);
        assert_eq!(
            mesh.index_format(RenderStyle::Solid),
            Some(IndexFormat::Uint16)
        );

        let mut big = test_mesh();
        big.clear(false, false, 70_000, 3);
        big.set_positions(&TRI_POSITIONS);
        big.set_indices(&[0, 1, 2]);
        big.update(PrimitiveTopology::TriangleList, true);
        assert_eq!(
            big.index_format(RenderStyle::Solid),
            Some(IndexFormat::Uint32)
        );
    }

    #[test]
    fn partial_update_preserves_other_streams() {
        let mut mesh = test_mesh();
        let normals = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
        mesh.set_positions(&TRI_POSITIONS);
        mesh.set_normals(&normals);
        mesh.update(PrimitiveTopology::TriangleList, true);

        // Re-stage only positions; normals must survive in the buffer
        let moved = [0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        mesh.set_positions(&moved);
        mesh.update(PrimitiveTopology::TriangleList, true);

        let mut out = Vec::new();
        assert_eq!(mesh.get_normals(&mut out), 3);
        assert_eq!(out, normals);
        let mut pos = Vec::new();
        mesh.get_positions(&mut pos);
        assert_eq!(pos, moved);
    }

    #[test]
    fn colors32_layout_uses_unorm() {
        let mut mesh = test_mesh();
        mesh.set_positions(&TRI_POSITIONS);
        mesh.set_colors32(&[255, 0, 0, 255, 0, 255, 0, 255, 0, 0, 255, 255]);
        mesh.update(PrimitiveTopology::TriangleList, true);

        let layout = mesh.layout().unwrap();
        let color = layout.attribute(VertexSemantic::Color).unwrap();
        assert_eq!(color.format, VertexElementFormat::Unorm8x4);
        assert_eq!(layout.stride, 16);
    }

    #[test]
    fn update_with_nothing_staged_is_noop() {
        let mut mesh = test_mesh();
        mesh.update(PrimitiveTopology::TriangleList, true);
        assert!(mesh.vertex_buffer().is_none());
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.aabb_version(), 0);
    }

    #[test]
    fn destroy_releases_buffers_and_morph() {
        let device = GraphicsDevice::new("test");
        let mut mesh = Mesh::new(device.clone());
        let morph = Morph::new(2);
        mesh.set_morph(Some(morph.clone()));
        mesh.set_positions(&TRI_POSITIONS);
        mesh.set_indices(&[0, 1, 2]);
        mesh.update(PrimitiveTopology::TriangleList, true);
        assert_eq!(device.alive_buffer_count(), 2);
        assert_eq!(Arc::strong_count(&morph), 2);

        mesh.destroy();
        assert_eq!(device.alive_buffer_count(), 0);
        assert_eq!(Arc::strong_count(&morph), 1);

        // Idempotent
        mesh.destroy();
        assert!(mesh.vertex_buffer().is_none());
    }
}
