//! Staged geometry edits pending commit.
//!
//! [`GeometryData`] accumulates vertex-attribute streams and index data
//! between two successive [`Mesh::update`](super::Mesh::update) calls (one
//! commit cycle). It also carries the buffer capacity bookkeeping that
//! decides, at commit time, whether the GPU buffers can be updated in place
//! or must be destroyed and recreated.

use crate::types::BufferUsageHint;

use super::layout::{VertexElementFormat, VertexSemantic};

/// Raw data of one staged vertex stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamData {
    /// 32-bit float components.
    Float32(Vec<f32>),
    /// 8-bit unsigned components (normalized on the GPU side).
    Unorm8(Vec<u8>),
}

impl StreamData {
    /// Total number of scalar components in the stream.
    pub fn len(&self) -> usize {
        match self {
            Self::Float32(v) => v.len(),
            Self::Unorm8(v) => v.len(),
        }
    }

    /// Whether the stream holds no data.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The stream contents as raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Float32(v) => bytemuck::cast_slice(v),
            Self::Unorm8(v) => v,
        }
    }
}

/// A vertex stream staged for the next commit.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexStream {
    /// Component data.
    pub data: StreamData,
    /// Components per vertex (1..=4).
    pub components: u32,
    /// Whether integer data is normalized to [0, 1] when read by the GPU.
    pub normalize: bool,
}

impl VertexStream {
    /// Number of whole vertices implied by the data length.
    pub fn vertex_count(&self) -> u32 {
        if self.components == 0 {
            return 0;
        }
        (self.data.len() / self.components as usize) as u32
    }

    /// The vertex-attribute element format for this stream, if the
    /// data/component/normalize combination maps to a supported format.
    pub fn element_format(&self) -> Option<VertexElementFormat> {
        match (&self.data, self.normalize) {
            (StreamData::Float32(_), false) => {
                VertexElementFormat::float_with_components(self.components)
            }
            (StreamData::Unorm8(_), true) if self.components == 4 => {
                Some(VertexElementFormat::Unorm8x4)
            }
            _ => None,
        }
    }

    /// Size in bytes of one vertex worth of this stream.
    pub fn vertex_size(&self) -> usize {
        self.element_format().map(|f| f.size()).unwrap_or(0)
    }
}

/// Staging state for incremental mesh edits.
///
/// Created lazily the first time any mesh-editing API is invoked. All
/// vertex streams staged in one commit cycle must agree on vertex count;
/// a mismatch is a caller bug (asserts in debug builds, the offending
/// write is ignored in release builds).
#[derive(Debug, Default)]
pub struct GeometryData {
    /// Forces full buffer reallocation on the next commit.
    pub(crate) recreate: bool,
    /// Update-frequency hint for the vertex buffer.
    pub(crate) vertex_usage: BufferUsageHint,
    /// Update-frequency hint for the index buffer.
    pub(crate) index_usage: BufferUsageHint,
    /// Allocated vertex capacity. Only grows across commits.
    pub(crate) max_vertices: u32,
    /// Allocated index capacity. Only grows across commits.
    pub(crate) max_indices: u32,
    /// Vertex count pending commit. Reset to 0 after commit.
    pub(crate) vertex_count: u32,
    /// Index count pending commit. Reset to 0 after commit.
    pub(crate) index_count: u32,
    /// Whether any vertex stream was staged this cycle.
    pub(crate) vertex_streams_updated: bool,
    /// Whether index data was staged this cycle.
    pub(crate) index_stream_updated: bool,
    /// Staged streams in staging order; re-staging a semantic replaces it.
    pub(crate) streams: Vec<(VertexSemantic, VertexStream)>,
    /// Staged raw index data.
    pub(crate) indices: Option<Vec<u32>>,
}

impl GeometryData {
    /// Create staging state with explicit capacity and usage hints.
    ///
    /// Used by `Mesh::clear`: `recreate` is set so the next commit
    /// reallocates buffers at the requested capacity.
    pub fn with_capacity(
        vertices_dynamic: bool,
        indices_dynamic: bool,
        max_vertices: u32,
        max_indices: u32,
    ) -> Self {
        let hint = |dynamic| {
            if dynamic {
                BufferUsageHint::Dynamic
            } else {
                BufferUsageHint::Static
            }
        };
        Self {
            recreate: true,
            vertex_usage: hint(vertices_dynamic),
            index_usage: hint(indices_dynamic),
            max_vertices,
            max_indices,
            ..Self::default()
        }
    }

    /// Record or replace the pending stream for `semantic`.
    ///
    /// The vertex count is `count_override` if given, otherwise derived from
    /// the data length and component count. Returns `false` (and ignores the
    /// write) if the implied count disagrees with a stream already staged in
    /// this cycle.
    pub fn set_stream(
        &mut self,
        semantic: VertexSemantic,
        stream: VertexStream,
        count_override: Option<u32>,
    ) -> bool {
        let count = count_override.unwrap_or_else(|| stream.vertex_count());
        if !self.streams.is_empty() && count != self.vertex_count {
            debug_assert!(
                false,
                "vertex stream {semantic:?} implies {count} vertices but {} are already staged \
                 this cycle",
                self.vertex_count
            );
            log::error!(
                "vertex stream {semantic:?} implies {count} vertices but {} are already staged; \
                 write ignored",
                self.vertex_count
            );
            return false;
        }

        self.vertex_count = count;
        self.vertex_streams_updated = true;

        if let Some(slot) = self.streams.iter_mut().find(|(s, _)| *s == semantic) {
            slot.1 = stream;
        } else {
            self.streams.push((semantic, stream));
        }
        true
    }

    /// Record pending index data. The count defaults to the data length.
    pub fn set_indices(&mut self, data: Vec<u32>, count_override: Option<u32>) {
        self.index_count = count_override.unwrap_or(data.len() as u32);
        self.index_stream_updated = true;
        self.indices = Some(data);
    }

    /// The pending stream for `semantic`, if staged this cycle.
    pub fn stream(&self, semantic: VertexSemantic) -> Option<&VertexStream> {
        self.streams
            .iter()
            .find(|(s, _)| *s == semantic)
            .map(|(_, stream)| stream)
    }

    /// The pending index data, if staged this cycle.
    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    /// Clear staged data and per-cycle flags after a successful commit.
    ///
    /// Capacity (`max_vertices`/`max_indices`) and usage hints survive;
    /// capacity only ever grows unless an explicit `Mesh::clear` resets it.
    pub(crate) fn reset_cycle(&mut self) {
        self.streams.clear();
        self.indices = None;
        self.vertex_count = 0;
        self.index_count = 0;
        self.vertex_streams_updated = false;
        self.index_stream_updated = false;
        self.recreate = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn float_stream(data: Vec<f32>, components: u32) -> VertexStream {
        VertexStream {
            data: StreamData::Float32(data),
            components,
            normalize: false,
        }
    }

    #[test]
    fn derives_vertex_count_from_data() {
        let mut geo = GeometryData::default();
        assert!(geo.set_stream(
            VertexSemantic::Position,
            float_stream(vec![0.0; 9], 3),
            None
        ));
        assert_eq!(geo.vertex_count, 3);
        assert!(geo.vertex_streams_updated);
    }

    #[test]
    fn count_override_wins() {
        let mut geo = GeometryData::default();
        geo.set_stream(
            VertexSemantic::Position,
            float_stream(vec![0.0; 30], 3),
            Some(4),
        );
        assert_eq!(geo.vertex_count, 4);
    }

    #[test]
    #[should_panic(expected = "already staged")]
    fn mismatched_stream_counts_assert() {
        let mut geo = GeometryData::default();
        geo.set_stream(VertexSemantic::Position, float_stream(vec![0.0; 9], 3), None);
        // 2 vertices after 3 were staged: contract violation
        geo.set_stream(VertexSemantic::Normal, float_stream(vec![0.0; 6], 3), None);
    }

    #[test]
    fn restaging_replaces_in_place() {
        let mut geo = GeometryData::default();
        geo.set_stream(VertexSemantic::Position, float_stream(vec![0.0; 9], 3), None);
        geo.set_stream(VertexSemantic::Position, float_stream(vec![1.0; 9], 3), None);
        assert_eq!(geo.streams.len(), 1);
        match &geo.stream(VertexSemantic::Position).unwrap().data {
            StreamData::Float32(v) => assert_eq!(v[0], 1.0),
            _ => panic!("expected float stream"),
        }
    }

    #[test]
    fn unorm8_element_format() {
        let stream = VertexStream {
            data: StreamData::Unorm8(vec![255; 8]),
            components: 4,
            normalize: true,
        };
        assert_eq!(stream.element_format(), Some(VertexElementFormat::Unorm8x4));
        assert_eq!(stream.vertex_count(), 2);
    }

    #[test]
    fn reset_cycle_keeps_capacity() {
        let mut geo = GeometryData::with_capacity(false, false, 100, 300);
        geo.set_stream(
            VertexSemantic::Position,
            float_stream(vec![0.0; 30], 3),
            None,
        );
        geo.set_indices(vec![0; 30], None);
        geo.reset_cycle();
        assert_eq!(geo.max_vertices, 100);
        assert_eq!(geo.max_indices, 300);
        assert_eq!(geo.vertex_count, 0);
        assert_eq!(geo.index_count, 0);
        assert!(!geo.recreate);
        assert!(geo.streams.is_empty());
        assert!(geo.indices.is_none());
    }
}
