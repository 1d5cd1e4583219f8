//! Morph-target and skin associations.
//!
//! These are the association types a [`Mesh`](super::Mesh) holds counted
//! references to. Blend-weight evaluation and palette computation live
//! elsewhere; at this layer a morph or skin is an opaque shared resource
//! whose lifetime is tied to the meshes referencing it.

use std::sync::Arc;

use larkspur_core::math::Mat4;

/// A set of morph targets shared by one or more meshes.
///
/// Meshes hold an `Arc<Morph>`; the reference count tracks how many meshes
/// currently use the morph. Destroying a mesh drops its reference.
#[derive(Debug)]
pub struct Morph {
    label: Option<String>,
    target_count: usize,
}

impl Morph {
    /// Create a morph with the given number of targets.
    pub fn new(target_count: usize) -> Arc<Self> {
        Arc::new(Self {
            label: None,
            target_count,
        })
    }

    /// Create a labelled morph with the given number of targets.
    pub fn with_label(target_count: usize, label: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            label: Some(label.into()),
            target_count,
        })
    }

    /// Number of morph targets.
    pub fn target_count(&self) -> usize {
        self.target_count
    }

    /// Debug label, if set.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// Skinning data shared by one or more meshes.
#[derive(Debug)]
pub struct Skin {
    inverse_bind_matrices: Vec<Mat4>,
}

impl Skin {
    /// Create a skin from per-bone inverse bind matrices.
    pub fn new(inverse_bind_matrices: Vec<Mat4>) -> Arc<Self> {
        Arc::new(Self {
            inverse_bind_matrices,
        })
    }

    /// Number of bones.
    pub fn bone_count(&self) -> usize {
        self.inverse_bind_matrices.len()
    }

    /// Per-bone inverse bind matrices.
    pub fn inverse_bind_matrices(&self) -> &[Mat4] {
        &self.inverse_bind_matrices
    }
}
