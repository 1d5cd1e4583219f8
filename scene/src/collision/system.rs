//! Collision system: shape lifecycle and compound composition.
//!
//! The system owns every collision component (arena + generational keys),
//! the shared triangle-mesh cache, and optionally a [`PhysicsWorld`]. It
//! implements the compound state machine: a `compound`-typed component
//! becomes the root of a compound shape, descendant components without a
//! rigid body contribute child shapes at relative transforms, and
//! enable/disable/transform changes mutate the composition in place where
//! the backend allows it.
//!
//! Physics is an optional capability. Without an attached `PhysicsWorld`,
//! every shape operation degrades to a no-op and components simply have no
//! physics presence, to be retried on the next relevant event.

use std::collections::HashMap;
use std::sync::Arc;

use larkspur_core::math::{isometry_from_parts, quat_rotate_vec3, Isometry3, Quat, UnitQuaternion, Vec3};
use larkspur_graphics::mesh::MeshId;
use rapier3d::prelude::{ColliderBuilder, RigidBodyHandle, SharedShape};
use slotmap::{SecondaryMap, SlotMap};

use crate::assets::{AssetId, AssetRegistry};
use crate::graph::{NodeKey, SceneGraph};
use crate::model::Model;
use crate::physics::PhysicsWorld;

use super::component::{
    ColliderKey, CollisionComponent, CollisionData, CollisionShapeKind, CompoundRole,
    ShapeInstance,
};
use super::compound::CompoundShape;
use super::shapes::create_primitive_shape;
use super::trimesh::TriangleMeshData;

/// Which asset-reference property a pending watch observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssetSlot {
    Asset,
    RenderAsset,
}

/// A one-shot wait for an asset to finish loading.
///
/// The expected id is captured at registration time; when the load
/// completes, a mismatch with the component's current value means the
/// property was reassigned in the interim and the completion is stale.
#[derive(Debug, Clone, Copy)]
struct AssetWatch {
    component: ColliderKey,
    slot: AssetSlot,
    expected: AssetId,
}

/// Owner of collision components and their physics registrations.
///
/// # Example
///
/// ```
/// use larkspur_core::math::Vec3;
/// use larkspur_scene::assets::AssetRegistry;
/// use larkspur_scene::collision::{CollisionData, CollisionSystem};
/// use larkspur_scene::graph::SceneGraph;
/// use larkspur_scene::physics::PhysicsWorld;
///
/// let mut graph = SceneGraph::new();
/// let mut assets = AssetRegistry::new();
/// let mut system = CollisionSystem::with_physics(PhysicsWorld::default());
///
/// let node = graph.add_node("crate");
/// let key = system.add_component(
///     &mut graph,
///     &mut assets,
///     node,
///     CollisionData::cuboid(Vec3::new(0.5, 0.5, 0.5)),
/// );
/// // no rigid body: the component registers a trigger volume
/// assert!(system.component(key).unwrap().has_trigger());
/// ```
#[derive(Default)]
pub struct CollisionSystem {
    components: SlotMap<ColliderKey, CollisionComponent>,
    by_node: SecondaryMap<NodeKey, ColliderKey>,
    trimesh_cache: HashMap<MeshId, Arc<TriangleMeshData>>,
    pending_watches: Vec<AssetWatch>,
    physics: Option<PhysicsWorld>,
}

impl CollisionSystem {
    /// Create a system without a physics backend.
    ///
    /// All shape construction degrades to no-ops until a world is attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a system driving the given physics world.
    pub fn with_physics(physics: PhysicsWorld) -> Self {
        Self {
            physics: Some(physics),
            ..Self::default()
        }
    }

    /// The attached physics world, if any.
    pub fn physics(&self) -> Option<&PhysicsWorld> {
        self.physics.as_ref()
    }

    /// Mutable access to the attached physics world, if any.
    pub fn physics_mut(&mut self) -> Option<&mut PhysicsWorld> {
        self.physics.as_mut()
    }

    /// Number of live components.
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Access a component.
    pub fn component(&self, key: ColliderKey) -> Option<&CollisionComponent> {
        self.components.get(key)
    }

    /// The component attached to `node`, if any.
    pub fn component_by_node(&self, node: NodeKey) -> Option<ColliderKey> {
        self.by_node.get(node).copied()
    }

    /// Number of triangle meshes held by the shared extraction cache.
    pub fn trimesh_cache_len(&self) -> usize {
        self.trimesh_cache.len()
    }

    // ---- Component lifecycle ----

    /// Attach a collision component to `node` and build its shape.
    ///
    /// A node carries at most one collision component; adding a second one
    /// logs an error and returns the existing key.
    pub fn add_component(
        &mut self,
        graph: &mut SceneGraph,
        assets: &mut AssetRegistry,
        node: NodeKey,
        data: CollisionData,
    ) -> ColliderKey {
        if let Some(&existing) = self.by_node.get(node) {
            log::error!("node already has a collision component; keeping the existing one");
            return existing;
        }
        let key = self.components.insert(CollisionComponent::new(node, data));
        self.by_node.insert(node, key);
        if graph.enabled_in_hierarchy(node) {
            self.recreate_physical_shapes(graph, assets, key);
        }
        key
    }

    /// Associate an externally owned rigid body with the component.
    ///
    /// A body-backed component attaches its collider to the body instead of
    /// creating a trigger volume, and never becomes a compound child.
    pub fn attach_rigid_body(
        &mut self,
        graph: &mut SceneGraph,
        assets: &mut AssetRegistry,
        key: ColliderKey,
        body: RigidBodyHandle,
    ) {
        let Some(component) = self.components.get_mut(key) else {
            return;
        };
        component.body = Some(body);
        self.recreate_physical_shapes(graph, assets, key);
    }

    /// Remove the rigid-body association and rebuild as a free shape.
    pub fn detach_rigid_body(
        &mut self,
        graph: &mut SceneGraph,
        assets: &mut AssetRegistry,
        key: ColliderKey,
    ) {
        let Some(component) = self.components.get_mut(key) else {
            return;
        };
        if component.body.take().is_some() {
            self.recreate_physical_shapes(graph, assets, key);
        }
    }

    /// Remove a component, tearing down its physics registration.
    ///
    /// Children of a removed compound root are demoted to standalone and,
    /// when they have no rigid body, rebuilt as free-standing shapes.
    pub fn remove_component(
        &mut self,
        graph: &mut SceneGraph,
        assets: &mut AssetRegistry,
        key: ColliderKey,
    ) {
        let Some(component) = self.components.get_mut(key) else {
            return;
        };
        component.destroying = true;
        let node = component.node;
        let was_root = matches!(component.role, CompoundRole::Root);

        self.disable_component(graph, key);
        self.unregister(graph, key);

        let orphans = if was_root { self.demote_children(key) } else { Vec::new() };

        self.by_node.remove(node);
        self.components.remove(key);

        for orphan in orphans {
            if self.components.get(orphan).is_some_and(|c| !c.destroying) {
                self.recreate_physical_shapes(graph, assets, orphan);
            }
        }
    }

    /// Tear down every component, physics registration, and cached trimesh.
    pub fn destroy(&mut self) {
        for (_, component) in self.components.iter_mut() {
            component.destroying = true;
            if let (Some(handle), Some(physics)) = (component.collider.take(), self.physics.as_mut())
            {
                physics.remove_collider(handle);
            }
        }
        self.components.clear();
        self.by_node.clear();
        self.pending_watches.clear();
        // The shared extraction cache is released wholesale here, never
        // piecemeal during the system's lifetime.
        self.trimesh_cache.clear();
        log::trace!("CollisionSystem: destroyed");
    }

    // ---- Shape lifecycle ----

    /// Rebuild the component's physics shape and re-register it.
    ///
    /// The previous registration (compound child entry, body collider, or
    /// trigger volume) is torn down first; a shape is never present in two
    /// places at once.
    pub fn recreate_physical_shapes(
        &mut self,
        graph: &mut SceneGraph,
        assets: &mut AssetRegistry,
        key: ColliderKey,
    ) {
        larkspur_core::profile_scope!("collision: recreate_shapes");
        if !self.components.contains_key(key) {
            return;
        }

        self.unregister(graph, key);

        if self.physics.is_none() {
            // Backend unavailable: collision is silently absent until the
            // next relevant event.
            if let Some(component) = self.components.get_mut(key) {
                component.shape = None;
            }
            return;
        }

        let (kind, node, has_body) = {
            let component = &self.components[key];
            (component.data.kind, component.node, component.body.is_some())
        };

        if kind == CollisionShapeKind::Compound {
            let is_child_of_other = matches!(self.components[key].role, CompoundRole::Child(_));
            if !is_child_of_other {
                self.become_compound_root(graph, assets, key, node);
                return;
            }
            // A compound nested under another compound root is flattened
            // into that root; it contributes no shape of its own.
            self.components[key].shape = None;
            return;
        }

        if !has_body {
            // A non-compound component under a compound ancestor joins that
            // ancestor's composition.
            let ancestor = self.find_compound_ancestor(graph, node);
            let component = &mut self.components[key];
            component.role = match ancestor {
                Some(root) if root != key => CompoundRole::Child(root),
                _ => CompoundRole::Standalone,
            };
        } else {
            self.components[key].role = CompoundRole::Standalone;
        }

        let shape = self.create_shape(graph, assets, key);
        self.components[key].shape = shape;

        if !self.components[key].enabled || !graph.enabled_in_hierarchy(node) {
            return;
        }
        match self.components[key].role {
            CompoundRole::Child(root) => self.register_compound_child(graph, key, root),
            _ => self.register_own(graph, key),
        }
    }

    /// Switch the component to a different shape kind.
    ///
    /// Leaving `compound` demotes all current children to standalone (and
    /// rebuilds the body-less ones as free shapes) before the component
    /// itself is rebuilt.
    pub fn change_type(
        &mut self,
        graph: &mut SceneGraph,
        assets: &mut AssetRegistry,
        key: ColliderKey,
        new_kind: CollisionShapeKind,
    ) {
        let Some(component) = self.components.get(key) else {
            return;
        };
        let old_kind = component.data.kind;
        if old_kind == new_kind {
            return;
        }
        let was_root = matches!(component.role, CompoundRole::Root);

        // The new kind must be in place before any demoted child rebuilds,
        // so the children no longer discover this component as a compound
        // ancestor.
        self.components[key].data.kind = new_kind;

        if old_kind == CollisionShapeKind::Compound && was_root {
            let orphans = self.demote_children(key);
            let component = &mut self.components[key];
            component.compound = None;
            component.role = CompoundRole::Standalone;
            for orphan in orphans {
                if self.components.get(orphan).is_some_and(|c| c.body.is_none()) {
                    self.recreate_physical_shapes(graph, assets, orphan);
                }
            }
        }

        self.recreate_physical_shapes(graph, assets, key);
    }

    /// Re-register the component after it (or an ancestor) was enabled.
    pub fn enable_component(
        &mut self,
        graph: &mut SceneGraph,
        assets: &mut AssetRegistry,
        key: ColliderKey,
    ) {
        let Some(component) = self.components.get_mut(key) else {
            return;
        };
        component.enabled = true;
        let node = component.node;
        if !graph.enabled_in_hierarchy(node) {
            return;
        }
        let (role, body, kind) = (component.role, component.body, component.data.kind);

        match role {
            CompoundRole::Child(root) => {
                let parent_has_children = self
                    .components
                    .get(root)
                    .and_then(|r| r.compound.as_ref())
                    .is_some_and(|c| !c.is_empty());
                if parent_has_children {
                    self.register_compound_child(graph, key, root);
                } else {
                    // An empty parent compound cannot take in-place edits;
                    // rebuild the whole root instead.
                    self.recreate_physical_shapes(graph, assets, root);
                }
            }
            _ => {
                if let Some(body) = body {
                    if let Some(physics) = self.physics.as_mut() {
                        physics.set_body_enabled(body, true);
                        physics.activate_body(body);
                    }
                } else if kind == CollisionShapeKind::Compound {
                    let still_empty = self.components[key]
                        .compound
                        .as_ref()
                        .is_none_or(|c| c.is_empty());
                    if still_empty {
                        // Re-seed: the rebuild walks descendants again.
                        self.recreate_physical_shapes(graph, assets, key);
                    } else {
                        self.register_own(graph, key);
                    }
                } else if self.components[key].shape.is_some() {
                    // Standalone: re-initialize the trigger volume.
                    self.register_own(graph, key);
                } else {
                    self.recreate_physical_shapes(graph, assets, key);
                }
            }
        }
    }

    /// Withdraw the component's physics presence after it was disabled.
    pub fn disable_component(&mut self, graph: &mut SceneGraph, key: ColliderKey) {
        let Some(component) = self.components.get_mut(key) else {
            return;
        };
        component.enabled = false;
        let (role, body) = (component.role, component.body);

        match role {
            CompoundRole::Child(root) => {
                // When the parent subtree is being destroyed the whole
                // compound goes away with it; skip the piecewise removal.
                let parent_destroying = self
                    .components
                    .get(root)
                    .map(|r| r.destroying)
                    .unwrap_or(true);
                if !parent_destroying {
                    if let Some(parent) = self.components.get_mut(root) {
                        if let Some(compound) = parent.compound.as_mut() {
                            compound.remove_child(key);
                        }
                    }
                    self.refresh_root_registration(graph, root);
                }
            }
            _ => {
                if let Some(body) = body {
                    if let Some(physics) = self.physics.as_mut() {
                        physics.set_body_enabled(body, false);
                    }
                } else {
                    let collider = self.components[key].collider.take();
                    if let (Some(handle), Some(physics)) = (collider, self.physics.as_mut()) {
                        physics.remove_collider(handle);
                    }
                }
            }
        }
    }

    /// Recompute a compound child's relative transform after a scene-graph
    /// transform change below its compound root.
    ///
    /// A no-op unless the path from the child up to (but not including) the
    /// root is dirty. The child's entry is replaced in place; if the root's
    /// compound was still empty, the root is rebuilt instead (the backend
    /// needs at least one child before transform updates mean anything).
    pub fn update_compound_child_transform(
        &mut self,
        graph: &mut SceneGraph,
        assets: &mut AssetRegistry,
        node: NodeKey,
    ) {
        let Some(&key) = self.by_node.get(node) else {
            return;
        };
        let Some(component) = self.components.get(key) else {
            return;
        };
        let CompoundRole::Child(root) = component.role else {
            return;
        };
        if !component.enabled {
            return;
        }
        let Some(root_node) = self.components.get(root).map(|r| r.node) else {
            return;
        };
        if !graph.dirty_relative_to(node, root_node) {
            return;
        }

        let relative = self.compound_child_transform(graph, key, root);
        let replaced = {
            let Some(parent) = self.components.get_mut(root) else {
                return;
            };
            let Some(compound) = parent.compound.as_mut() else {
                return;
            };
            if compound.is_empty() {
                false
            } else {
                compound.set_child_transform(key, relative)
            }
        };

        if replaced {
            self.refresh_root_registration(graph, root);
            let body = self.components.get(root).and_then(|r| r.body);
            if let (Some(body), Some(physics)) = (body, self.physics.as_mut()) {
                physics.activate_body(body);
            }
        } else {
            self.recreate_physical_shapes(graph, assets, root);
        }
    }

    /// Recompute relative transforms for every compound child under `root`
    /// whose transform chain is dirty, in scene-graph order.
    pub fn update_compound_children(
        &mut self,
        graph: &mut SceneGraph,
        assets: &mut AssetRegistry,
        root_node: NodeKey,
    ) {
        for node in graph.subtree(root_node).into_iter().skip(1) {
            self.update_compound_child_transform(graph, assets, node);
        }
    }

    /// Handle the completion of an asset load.
    ///
    /// Watches registered while the asset was pending fire once; a watch
    /// whose component no longer references the completed asset is stale
    /// and ignored.
    pub fn notify_asset_ready(
        &mut self,
        graph: &mut SceneGraph,
        assets: &mut AssetRegistry,
        id: AssetId,
    ) {
        let mut fired = Vec::new();
        self.pending_watches.retain(|watch| {
            if watch.expected == id {
                fired.push(*watch);
                false
            } else {
                true
            }
        });

        for watch in fired {
            let Some(component) = self.components.get(watch.component) else {
                continue;
            };
            let current = match watch.slot {
                AssetSlot::Asset => component.data.asset,
                AssetSlot::RenderAsset => component.data.render_asset,
            };
            if current != Some(watch.expected) {
                // The property was reassigned while the load was in
                // flight; this completion is obsolete.
                log::trace!("collision: stale asset completion {id:?} ignored");
                continue;
            }
            self.recreate_physical_shapes(graph, assets, watch.component);
        }
    }

    // ---- Property setters ----

    /// Set box half-extents, rebuilding a box shape.
    pub fn set_half_extents(
        &mut self,
        graph: &mut SceneGraph,
        assets: &mut AssetRegistry,
        key: ColliderKey,
        half_extents: Vec3,
    ) {
        let Some(component) = self.components.get_mut(key) else {
            return;
        };
        if component.data.half_extents == half_extents {
            return;
        }
        component.data.half_extents = half_extents;
        if component.data.kind == CollisionShapeKind::Box {
            self.recreate_physical_shapes(graph, assets, key);
        }
    }

    /// Set the radius, rebuilding radius-driven shapes.
    pub fn set_radius(
        &mut self,
        graph: &mut SceneGraph,
        assets: &mut AssetRegistry,
        key: ColliderKey,
        radius: f32,
    ) {
        let Some(component) = self.components.get_mut(key) else {
            return;
        };
        if component.data.radius == radius {
            return;
        }
        component.data.radius = radius;
        if matches!(
            component.data.kind,
            CollisionShapeKind::Sphere
                | CollisionShapeKind::Capsule
                | CollisionShapeKind::Cylinder
                | CollisionShapeKind::Cone
        ) {
            self.recreate_physical_shapes(graph, assets, key);
        }
    }

    /// Set the height, rebuilding height-driven shapes.
    pub fn set_height(
        &mut self,
        graph: &mut SceneGraph,
        assets: &mut AssetRegistry,
        key: ColliderKey,
        height: f32,
    ) {
        let Some(component) = self.components.get_mut(key) else {
            return;
        };
        if component.data.height == height {
            return;
        }
        component.data.height = height;
        if matches!(
            component.data.kind,
            CollisionShapeKind::Capsule | CollisionShapeKind::Cylinder | CollisionShapeKind::Cone
        ) {
            self.recreate_physical_shapes(graph, assets, key);
        }
    }

    /// Set the length axis, rebuilding axis-driven shapes.
    pub fn set_axis(
        &mut self,
        graph: &mut SceneGraph,
        assets: &mut AssetRegistry,
        key: ColliderKey,
        axis: super::component::ShapeAxis,
    ) {
        let Some(component) = self.components.get_mut(key) else {
            return;
        };
        if component.data.axis == axis {
            return;
        }
        component.data.axis = axis;
        if matches!(
            component.data.kind,
            CollisionShapeKind::Capsule | CollisionShapeKind::Cylinder | CollisionShapeKind::Cone
        ) {
            self.recreate_physical_shapes(graph, assets, key);
        }
    }

    /// Set the local placement offsets and refresh the registered placement.
    pub fn set_offsets(
        &mut self,
        graph: &mut SceneGraph,
        key: ColliderKey,
        linear_offset: Vec3,
        angular_offset: Quat,
    ) {
        let Some(component) = self.components.get_mut(key) else {
            return;
        };
        component.data.linear_offset = linear_offset;
        component.data.angular_offset = angular_offset;

        match component.role {
            CompoundRole::Child(root) => {
                let relative = self.compound_child_transform(graph, key, root);
                let replaced = self
                    .components
                    .get_mut(root)
                    .and_then(|r| r.compound.as_mut())
                    .map(|c| c.set_child_transform(key, relative))
                    .unwrap_or(false);
                if replaced {
                    self.refresh_root_registration(graph, root);
                }
            }
            _ => {
                let iso = self.shape_world_isometry(graph, key);
                let collider = self.components[key].collider;
                if let (Some(handle), Some(physics)) = (collider, self.physics.as_mut()) {
                    physics.set_collider_position(handle, iso);
                }
            }
        }
    }

    /// Set the procedural model source, rebuilding a mesh shape.
    pub fn set_model(
        &mut self,
        graph: &mut SceneGraph,
        assets: &mut AssetRegistry,
        key: ColliderKey,
        model: Option<Arc<Model>>,
    ) {
        let Some(component) = self.components.get_mut(key) else {
            return;
        };
        component.data.model = model;
        if component.data.kind == CollisionShapeKind::Mesh {
            self.recreate_physical_shapes(graph, assets, key);
        }
    }

    /// Set the render model source, rebuilding a mesh shape.
    pub fn set_render(
        &mut self,
        graph: &mut SceneGraph,
        assets: &mut AssetRegistry,
        key: ColliderKey,
        render: Option<Arc<Model>>,
    ) {
        let Some(component) = self.components.get_mut(key) else {
            return;
        };
        component.data.render = render;
        if component.data.kind == CollisionShapeKind::Mesh {
            self.recreate_physical_shapes(graph, assets, key);
        }
    }

    /// Set the model asset source, rebuilding a mesh shape.
    ///
    /// Reassigning the property while a previous load is pending makes the
    /// old completion stale; it is ignored when it fires.
    pub fn set_asset(
        &mut self,
        graph: &mut SceneGraph,
        assets: &mut AssetRegistry,
        key: ColliderKey,
        asset: Option<AssetId>,
    ) {
        let Some(component) = self.components.get_mut(key) else {
            return;
        };
        if component.data.asset == asset {
            return;
        }
        component.data.asset = asset;
        if component.data.kind == CollisionShapeKind::Mesh {
            self.recreate_physical_shapes(graph, assets, key);
        }
    }

    /// Set the render asset source, rebuilding a mesh shape.
    pub fn set_render_asset(
        &mut self,
        graph: &mut SceneGraph,
        assets: &mut AssetRegistry,
        key: ColliderKey,
        render_asset: Option<AssetId>,
    ) {
        let Some(component) = self.components.get_mut(key) else {
            return;
        };
        if component.data.render_asset == render_asset {
            return;
        }
        component.data.render_asset = render_asset;
        if component.data.kind == CollisionShapeKind::Mesh {
            self.recreate_physical_shapes(graph, assets, key);
        }
    }

    /// Toggle vertex welding for future mesh extractions.
    ///
    /// Already-cached triangle data is not re-extracted.
    pub fn set_check_vertex_duplicates(&mut self, key: ColliderKey, check: bool) {
        if let Some(component) = self.components.get_mut(key) {
            component.data.check_vertex_duplicates = check;
        }
    }

    // ---- Placement ----

    /// World-space shape position: the node position with the linear offset
    /// folded in (only computed when an offset is authored).
    pub fn shape_position(&self, graph: &mut SceneGraph, key: ColliderKey) -> Vec3 {
        let Some(component) = self.components.get(key) else {
            return Vec3::zeros();
        };
        let position = graph.world_position(component.node);
        if !component.data.has_offset() {
            return position;
        }
        let rotation = graph.world_rotation(component.node);
        position + quat_rotate_vec3(rotation, component.data.linear_offset)
    }

    /// World-space shape rotation with the angular offset folded in.
    pub fn shape_rotation(&self, graph: &mut SceneGraph, key: ColliderKey) -> Quat {
        let Some(component) = self.components.get(key) else {
            return Quat::identity();
        };
        let rotation = graph.world_rotation(component.node);
        if !component.data.has_offset() {
            return rotation;
        }
        rotation * component.data.angular_offset
    }

    fn shape_world_isometry(&self, graph: &mut SceneGraph, key: ColliderKey) -> Isometry3 {
        let position = self.shape_position(graph, key);
        let rotation = self.shape_rotation(graph, key);
        let mut iso = isometry_from_parts(position, rotation);
        if let Some(shape) = self.components.get(key).and_then(|c| c.shape.as_ref()) {
            iso.rotation *= shape.local_rotation;
        }
        iso
    }

    fn compound_child_transform(
        &self,
        graph: &mut SceneGraph,
        child: ColliderKey,
        root: ColliderKey,
    ) -> Isometry3 {
        let Some(root_node) = self.components.get(root).map(|r| r.node) else {
            return Isometry3::identity();
        };
        let root_iso = isometry_from_parts(
            graph.world_position(root_node),
            graph.world_rotation(root_node),
        );
        let child_iso = self.shape_world_isometry(graph, child);
        root_iso.inv_mul(&child_iso)
    }

    // ---- Internals ----

    fn become_compound_root(
        &mut self,
        graph: &mut SceneGraph,
        assets: &mut AssetRegistry,
        key: ColliderKey,
        node: NodeKey,
    ) {
        {
            let component = &mut self.components[key];
            component.role = CompoundRole::Root;
            component.compound = Some(CompoundShape::new());
            // A compound root has no primitive shape of its own.
            component.shape = None;
        }

        // Mark every descendant collision component without a rigid body as
        // a child of this root, then rebuild each so it registers itself.
        let mut child_keys = Vec::new();
        for descendant in graph.subtree(node).into_iter().skip(1) {
            let Some(&child_key) = self.by_node.get(descendant) else {
                continue;
            };
            let child = &mut self.components[child_key];
            if child.body.is_none() {
                child.role = CompoundRole::Child(key);
                child_keys.push(child_key);
            }
        }
        for child_key in child_keys {
            let child_node = self.components[child_key].node;
            if self.components[child_key].enabled && graph.enabled_in_hierarchy(child_node) {
                self.recreate_physical_shapes(graph, assets, child_key);
            }
        }
        // Children registered themselves through the compound; nothing more
        // to do when the composition stayed empty (enable re-seeds it).
    }

    fn demote_children(&mut self, root: ColliderKey) -> Vec<ColliderKey> {
        let children: Vec<ColliderKey> = self
            .components
            .iter()
            .filter(|(_, c)| c.role == CompoundRole::Child(root))
            .map(|(k, _)| k)
            .collect();
        for &child in &children {
            self.components[child].role = CompoundRole::Standalone;
        }
        children
    }

    fn find_compound_ancestor(&self, graph: &SceneGraph, node: NodeKey) -> Option<ColliderKey> {
        let mut cursor = graph.node(node).and_then(|n| n.parent());
        while let Some(ancestor) = cursor {
            if let Some(&key) = self.by_node.get(ancestor) {
                if self
                    .components
                    .get(key)
                    .is_some_and(|c| c.data.kind == CollisionShapeKind::Compound)
                {
                    return Some(key);
                }
            }
            cursor = graph.node(ancestor).and_then(|n| n.parent());
        }
        None
    }

    fn create_shape(
        &mut self,
        graph: &mut SceneGraph,
        assets: &mut AssetRegistry,
        key: ColliderKey,
    ) -> Option<ShapeInstance> {
        match self.components[key].data.kind {
            CollisionShapeKind::Mesh => self.create_mesh_shape(graph, assets, key),
            CollisionShapeKind::Compound => None,
            _ => create_primitive_shape(&self.components[key].data),
        }
    }

    /// Build a compound of per-submesh trimeshes from the resolved model.
    ///
    /// Resolution order: `model`, `render`, `asset`, `render_asset`. An
    /// unresolved asset registers a one-shot watch and yields no shape for
    /// now.
    fn create_mesh_shape(
        &mut self,
        graph: &mut SceneGraph,
        assets: &mut AssetRegistry,
        key: ColliderKey,
    ) -> Option<ShapeInstance> {
        let (node, dedup) = {
            let component = &self.components[key];
            (component.node, component.data.check_vertex_duplicates)
        };
        let scale = graph.world_scale(node);

        let direct = {
            let data = &self.components[key].data;
            data.model.clone().or_else(|| data.render.clone())
        };
        let model = match direct {
            Some(model) => model,
            None => {
                let (slot, id) = {
                    let data = &self.components[key].data;
                    if let Some(id) = data.asset {
                        (AssetSlot::Asset, id)
                    } else if let Some(id) = data.render_asset {
                        (AssetSlot::RenderAsset, id)
                    } else {
                        return None;
                    }
                };
                match assets.get(id) {
                    Some(model) => model.clone(),
                    None => {
                        assets.load(id);
                        let already_watching = self.pending_watches.iter().any(|w| {
                            w.component == key && w.slot == slot && w.expected == id
                        });
                        if !already_watching {
                            self.pending_watches.push(AssetWatch {
                                component: key,
                                slot,
                                expected: id,
                            });
                        }
                        return None;
                    }
                }
            }
        };

        self.build_model_shape(&model, scale, dedup)
    }

    fn build_model_shape(
        &mut self,
        model: &Model,
        scale: Vec3,
        dedup: bool,
    ) -> Option<ShapeInstance> {
        larkspur_core::profile_scope!("collision: build_model_shape");
        let mut children: Vec<(Isometry3, SharedShape)> = Vec::new();
        for model_mesh in &model.meshes {
            let id = model_mesh.mesh.id();
            let data = match self.trimesh_cache.get(&id) {
                Some(data) => data.clone(),
                None => {
                    let Some(extracted) = TriangleMeshData::extract(&model_mesh.mesh, dedup)
                    else {
                        continue;
                    };
                    let data = Arc::new(extracted);
                    self.trimesh_cache.insert(id, data.clone());
                    data
                }
            };

            let (local_scale, rotation, translation) =
                larkspur_core::math::to_scale_rotation_translation(&model_mesh.transform);
            let combined_scale = scale.component_mul(&local_scale);
            let Some(shape) = data.to_shared_shape(combined_scale) else {
                continue;
            };
            // Submesh offsets scale with the entity, like the geometry does.
            let iso = isometry_from_parts(translation.component_mul(&scale), rotation);
            children.push((iso, shape));
        }

        if children.is_empty() {
            None
        } else {
            Some(ShapeInstance {
                shape: SharedShape::compound(children),
                local_rotation: UnitQuaternion::identity(),
            })
        }
    }

    /// Remove the component's current physics registration, wherever it is.
    fn unregister(&mut self, graph: &mut SceneGraph, key: ColliderKey) {
        let role = self.components.get(key).map(|c| c.role);
        if let Some(CompoundRole::Child(root)) = role {
            let parent_destroying = self
                .components
                .get(root)
                .map(|r| r.destroying)
                .unwrap_or(true);
            if !parent_destroying {
                let removed = self
                    .components
                    .get_mut(root)
                    .and_then(|r| r.compound.as_mut())
                    .map(|c| c.remove_child(key))
                    .unwrap_or(false);
                if removed {
                    self.refresh_root_registration(graph, root);
                }
            }
        }

        let collider = self.components.get_mut(key).and_then(|c| c.collider.take());
        if let (Some(handle), Some(physics)) = (collider, self.physics.as_mut()) {
            physics.remove_collider(handle);
        }
    }

    /// Register the component's shape under its own collider: attached to
    /// its rigid body when it has one, as a standalone trigger volume
    /// otherwise.
    fn register_own(&mut self, graph: &mut SceneGraph, key: ColliderKey) {
        let Some(component) = self.components.get(key) else {
            return;
        };
        if component.collider.is_some() {
            // Already registered (e.g. a redundant enable); keep the
            // existing collider rather than double-registering.
            return;
        }

        let shared = match component.data.kind {
            CollisionShapeKind::Compound => component
                .compound
                .as_ref()
                .and_then(|c| c.to_shared_shape()),
            _ => component.shape.as_ref().map(|s| s.shape.clone()),
        };
        let Some(shared) = shared else {
            return;
        };

        let body = component.body;
        let placement = if body.is_some() {
            // Relative to the body: just the authored offsets + alignment.
            let component = &self.components[key];
            let mut iso = isometry_from_parts(
                component.data.linear_offset,
                component.data.angular_offset,
            );
            if let Some(shape) = component.shape.as_ref() {
                iso.rotation *= shape.local_rotation;
            }
            iso
        } else {
            self.shape_world_isometry(graph, key)
        };

        let Some(physics) = self.physics.as_mut() else {
            return;
        };
        let handle = match body {
            Some(body) => {
                let collider = ColliderBuilder::new(shared).position(placement).build();
                let handle = physics.add_collider(collider, body);
                physics.activate_body(body);
                handle
            }
            None => {
                let collider = ColliderBuilder::new(shared)
                    .position(placement)
                    .sensor(true)
                    .build();
                physics.add_free_collider(collider)
            }
        };
        self.components[key].collider = Some(handle);
    }

    /// Add the component's shape to its compound root's composition.
    fn register_compound_child(
        &mut self,
        graph: &mut SceneGraph,
        key: ColliderKey,
        root: ColliderKey,
    ) {
        let Some(shape) = self
            .components
            .get(key)
            .and_then(|c| c.shape.as_ref())
            .map(|s| s.shape.clone())
        else {
            return;
        };
        let relative = self.compound_child_transform(graph, key, root);

        let added = self
            .components
            .get_mut(root)
            .and_then(|r| r.compound.as_mut())
            .map(|compound| {
                compound.add_child(key, relative, shape);
                true
            })
            .unwrap_or(false);
        if added {
            self.refresh_root_registration(graph, root);
        }
    }

    /// Re-lower the root's compound into its registered collider.
    ///
    /// Keeps the collider handle and replaces only the shape; seeds the
    /// registration when the first child arrives, and withdraws it when the
    /// last child leaves (an empty compound has no physics presence).
    fn refresh_root_registration(&mut self, graph: &mut SceneGraph, root: ColliderKey) {
        let Some(component) = self.components.get(root) else {
            return;
        };
        if !component.enabled || !graph.enabled_in_hierarchy(component.node) {
            return;
        }
        let lowered = component.compound.as_ref().and_then(|c| c.to_shared_shape());
        let collider = component.collider;

        match (collider, lowered) {
            (Some(handle), Some(shape)) => {
                if let Some(physics) = self.physics.as_mut() {
                    physics.set_collider_shape(handle, shape);
                }
            }
            (Some(handle), None) => {
                if let Some(physics) = self.physics.as_mut() {
                    physics.remove_collider(handle);
                }
                self.components[root].collider = None;
            }
            (None, Some(_)) => self.register_own(graph, root),
            (None, None) => {}
        }
    }
}

impl std::fmt::Debug for CollisionSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollisionSystem")
            .field("components", &self.components.len())
            .field("trimesh_cache", &self.trimesh_cache.len())
            .field("pending_watches", &self.pending_watches.len())
            .field("physics", &self.physics.is_some())
            .finish()
    }
}
