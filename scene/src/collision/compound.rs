//! Compound shape composition.
//!
//! A [`CompoundShape`] is the composer-side child list of a compound
//! collision root: per child, the contributing component's key, its
//! relative-to-root transform, and its physics shape. The list is lowered
//! to a single rapier compound shape whenever the child set or a child
//! transform changes; the backing collider keeps its handle and only the
//! shape is replaced.

use larkspur_core::math::Isometry3;
use rapier3d::prelude::SharedShape;

use super::component::ColliderKey;

/// One child of a compound shape.
#[derive(Clone)]
pub struct CompoundChild {
    /// The contributing collision component.
    pub key: ColliderKey,
    /// Placement relative to the compound root.
    pub transform: Isometry3,
    /// The child's physics shape.
    pub shape: SharedShape,
}

impl std::fmt::Debug for CompoundChild {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompoundChild")
            .field("key", &self.key)
            .field("transform", &self.transform)
            .field("shape_type", &self.shape.shape_type())
            .finish()
    }
}

/// Child-shape list of a compound collision root.
#[derive(Debug, Clone, Default)]
pub struct CompoundShape {
    children: Vec<CompoundChild>,
}

impl CompoundShape {
    /// Create an empty (childless) compound.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether the compound has no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// The children in composition order.
    pub fn children(&self) -> &[CompoundChild] {
        &self.children
    }

    /// Whether `key` currently contributes a child shape.
    pub fn contains(&self, key: ColliderKey) -> bool {
        self.children.iter().any(|c| c.key == key)
    }

    /// Add or replace the child contributed by `key`.
    pub fn add_child(&mut self, key: ColliderKey, transform: Isometry3, shape: SharedShape) {
        if let Some(child) = self.children.iter_mut().find(|c| c.key == key) {
            child.transform = transform;
            child.shape = shape;
        } else {
            self.children.push(CompoundChild {
                key,
                transform,
                shape,
            });
        }
    }

    /// Remove the child contributed by `key`. Returns whether one was removed.
    pub fn remove_child(&mut self, key: ColliderKey) -> bool {
        let before = self.children.len();
        self.children.retain(|c| c.key != key);
        self.children.len() != before
    }

    /// Remove a child by position (fallback when the key is unknown).
    pub fn remove_child_at(&mut self, index: usize) -> bool {
        if index < self.children.len() {
            self.children.remove(index);
            true
        } else {
            false
        }
    }

    /// Replace the relative transform of the child contributed by `key`.
    ///
    /// Returns `false` if `key` contributes no child.
    pub fn set_child_transform(&mut self, key: ColliderKey, transform: Isometry3) -> bool {
        match self.children.iter_mut().find(|c| c.key == key) {
            Some(child) => {
                child.transform = transform;
                true
            }
            None => false,
        }
    }

    /// Remove all children.
    pub fn clear(&mut self) {
        self.children.clear();
    }

    /// Lower the child list to a rapier compound shape.
    ///
    /// Returns `None` while the compound is empty; the backend requires at
    /// least one child, so an empty compound has no physics presence.
    pub fn to_shared_shape(&self) -> Option<SharedShape> {
        if self.children.is_empty() {
            return None;
        }
        Some(SharedShape::compound(
            self.children
                .iter()
                .map(|c| (c.transform, c.shape.clone()))
                .collect(),
        ))
    }
}
