//! Vertex layout definitions.
//!
//! A [`VertexLayout`] describes one interleaved vertex buffer: which
//! semantics it carries, their element formats, and their byte offsets.
//! Layouts here are not declared up front; they are synthesized at commit
//! time from the set of staged streams (attribute order follows staging
//! order), then shared via `Arc` for readback and batching.

use std::sync::Arc;

/// Semantic meaning of a vertex attribute.
///
/// Semantics are the dictionary keys for staged vertex streams and are used
/// to match mesh attributes with shader inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexSemantic {
    /// Vertex position (typically float3).
    Position,
    /// Vertex normal (typically float3).
    Normal,
    /// Vertex tangent (typically float4, w = handedness).
    Tangent,
    /// Texture coordinate set 0..=7 (typically float2).
    TexCoord(u8),
    /// Vertex color (float4 or unorm4).
    Color,
    /// Bone indices for skinning (typically uint4).
    Joints,
    /// Bone weights for skinning (typically float4).
    Weights,
}

impl VertexSemantic {
    /// Number of supported texture coordinate channels.
    pub const TEXCOORD_CHANNELS: u8 = 8;

    /// Texture coordinate semantic for `channel`, if the channel is valid.
    pub fn texcoord(channel: u8) -> Option<Self> {
        (channel < Self::TEXCOORD_CHANNELS).then_some(Self::TexCoord(channel))
    }

    /// Get a unique index for this semantic (used for matching).
    pub fn index(&self) -> u32 {
        match self {
            Self::Position => 0,
            Self::Normal => 1,
            Self::Tangent => 2,
            Self::TexCoord(ch) => 3 + *ch as u32,
            Self::Color => 11,
            Self::Joints => 12,
            Self::Weights => 13,
        }
    }
}

/// Format of a vertex attribute element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexElementFormat {
    /// Single 32-bit float.
    Float,
    /// Two 32-bit floats.
    Float2,
    /// Three 32-bit floats.
    Float3,
    /// Four 32-bit floats.
    Float4,
    /// Four 8-bit unsigned integers (normalized to 0.0-1.0).
    Unorm8x4,
}

impl VertexElementFormat {
    /// Get the size in bytes of this format.
    pub fn size(&self) -> usize {
        match self {
            Self::Float => 4,
            Self::Float2 => 8,
            Self::Float3 => 12,
            Self::Float4 => 16,
            Self::Unorm8x4 => 4,
        }
    }

    /// Number of components per element.
    pub fn components(&self) -> u32 {
        match self {
            Self::Float => 1,
            Self::Float2 => 2,
            Self::Float3 => 3,
            Self::Float4 => 4,
            Self::Unorm8x4 => 4,
        }
    }

    /// Float format with the given component count (1..=4).
    pub fn float_with_components(components: u32) -> Option<Self> {
        match components {
            1 => Some(Self::Float),
            2 => Some(Self::Float2),
            3 => Some(Self::Float3),
            4 => Some(Self::Float4),
            _ => None,
        }
    }
}

/// A single vertex attribute description.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Semantic meaning of this attribute.
    pub semantic: VertexSemantic,
    /// Data format of this attribute.
    pub format: VertexElementFormat,
    /// Byte offset within the interleaved vertex.
    pub offset: u32,
}

/// Describes one interleaved vertex buffer.
///
/// Layouts are wrapped in `Arc` and shared between a mesh and its readers;
/// there are typically only a few combinations across many meshes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct VertexLayout {
    /// The vertex attributes in buffer order.
    pub attributes: Vec<VertexAttribute>,
    /// Stride in bytes between consecutive vertices.
    pub stride: u32,
}

impl VertexLayout {
    /// Synthesize a layout from `(semantic, format)` pairs.
    ///
    /// Attribute offsets are assigned in iteration order; the stride is the
    /// packed sum of element sizes.
    pub fn from_streams<I>(streams: I) -> Arc<Self>
    where
        I: IntoIterator<Item = (VertexSemantic, VertexElementFormat)>,
    {
        let mut attributes = Vec::new();
        let mut offset = 0u32;
        for (semantic, format) in streams {
            attributes.push(VertexAttribute {
                semantic,
                format,
                offset,
            });
            offset += format.size() as u32;
        }
        Arc::new(Self {
            attributes,
            stride: offset,
        })
    }

    /// Check if this layout has a specific semantic.
    pub fn has_semantic(&self, semantic: VertexSemantic) -> bool {
        self.attributes.iter().any(|attr| attr.semantic == semantic)
    }

    /// Get an attribute by semantic.
    pub fn attribute(&self, semantic: VertexSemantic) -> Option<&VertexAttribute> {
        self.attributes
            .iter()
            .find(|attr| attr.semantic == semantic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_sizes() {
        assert_eq!(VertexElementFormat::Float.size(), 4);
        assert_eq!(VertexElementFormat::Float3.size(), 12);
        assert_eq!(VertexElementFormat::Unorm8x4.size(), 4);
        assert_eq!(VertexElementFormat::Unorm8x4.components(), 4);
    }

    #[test]
    fn test_texcoord_channels() {
        assert_eq!(
            VertexSemantic::texcoord(0),
            Some(VertexSemantic::TexCoord(0))
        );
        assert_eq!(
            VertexSemantic::texcoord(7),
            Some(VertexSemantic::TexCoord(7))
        );
        assert_eq!(VertexSemantic::texcoord(8), None);
    }

    #[test]
    fn test_layout_synthesis() {
        let layout = VertexLayout::from_streams([
            (VertexSemantic::Position, VertexElementFormat::Float3),
            (VertexSemantic::Normal, VertexElementFormat::Float3),
            (VertexSemantic::TexCoord(0), VertexElementFormat::Float2),
        ]);
        assert_eq!(layout.stride, 32);
        assert_eq!(layout.attribute(VertexSemantic::Normal).unwrap().offset, 12);
        assert!(layout.has_semantic(VertexSemantic::Position));
        assert!(!layout.has_semantic(VertexSemantic::Color));
    }

    #[test]
    fn test_semantic_indices_unique() {
        let semantics = [
            VertexSemantic::Position,
            VertexSemantic::Normal,
            VertexSemantic::Tangent,
            VertexSemantic::TexCoord(0),
            VertexSemantic::TexCoord(7),
            VertexSemantic::Color,
            VertexSemantic::Joints,
            VertexSemantic::Weights,
        ];
        let mut seen = std::collections::HashSet::new();
        for s in semantics {
            assert!(seen.insert(s.index()));
        }
    }
}
