//! Minimal asset registry for render-source resolution.
//!
//! This is the in-process contract the collision subsystem consumes: assets
//! are keyed by [`AssetId`], loads complete asynchronously from the
//! subsystem's point of view, and interested parties watch for readiness.
//! Watches are plain data (no stored closures); whoever completes a load
//! forwards the event to the subscribers, which decide at fire time whether
//! the completion is still relevant (value-equality staleness check).

use std::collections::HashMap;
use std::sync::Arc;

use crate::model::Model;

/// Identifier of an asset in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(pub u64);

#[derive(Debug, Clone)]
enum AssetState {
    /// Load requested, not yet completed.
    Pending,
    /// Loaded and ready for use.
    Ready(Arc<Model>),
}

/// Registry of model assets.
///
/// # Example
///
/// ```
/// use larkspur_scene::assets::{AssetId, AssetRegistry};
/// use larkspur_scene::model::Model;
/// use std::sync::Arc;
///
/// let mut assets = AssetRegistry::new();
/// let id = AssetId(1);
/// assets.load(id);
/// assert!(assets.get(id).is_none());
///
/// assets.complete(id, Arc::new(Model::new()));
/// assert!(assets.get(id).is_some());
/// ```
#[derive(Debug, Default)]
pub struct AssetRegistry {
    assets: HashMap<AssetId, AssetState>,
}

impl AssetRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a load for `id`. A no-op if the asset is already pending or
    /// ready.
    pub fn load(&mut self, id: AssetId) {
        self.assets.entry(id).or_insert(AssetState::Pending);
    }

    /// Complete the load of `id` with the given model.
    ///
    /// Subscribers must be notified by the caller (e.g.
    /// `CollisionSystem::notify_asset_ready`); the registry itself holds no
    /// callbacks.
    pub fn complete(&mut self, id: AssetId, model: Arc<Model>) {
        log::trace!("AssetRegistry: asset {id:?} ready");
        self.assets.insert(id, AssetState::Ready(model));
    }

    /// Drop the asset, cancelling a pending load or releasing a ready model.
    pub fn remove(&mut self, id: AssetId) {
        self.assets.remove(&id);
    }

    /// The loaded model for `id`, if the load has completed.
    pub fn get(&self, id: AssetId) -> Option<&Arc<Model>> {
        match self.assets.get(&id) {
            Some(AssetState::Ready(model)) => Some(model),
            _ => None,
        }
    }

    /// Whether a load for `id` was requested but has not completed.
    pub fn is_pending(&self, id: AssetId) -> bool {
        matches!(self.assets.get(&id), Some(AssetState::Pending))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_then_complete() {
        let mut assets = AssetRegistry::new();
        let id = AssetId(7);
        assets.load(id);
        assert!(assets.is_pending(id));
        assert!(assets.get(id).is_none());

        assets.complete(id, Arc::new(Model::new()));
        assert!(!assets.is_pending(id));
        assert!(assets.get(id).is_some());
    }

    #[test]
    fn load_does_not_downgrade_ready_asset() {
        let mut assets = AssetRegistry::new();
        let id = AssetId(1);
        assets.complete(id, Arc::new(Model::new()));
        assets.load(id);
        assert!(assets.get(id).is_some());
    }

    #[test]
    fn remove_cancels() {
        let mut assets = AssetRegistry::new();
        let id = AssetId(2);
        assets.load(id);
        assets.remove(id);
        assert!(!assets.is_pending(id));
        assert!(assets.get(id).is_none());
    }
}
