//! Scene graph: node arena, hierarchy, transforms, and dirty tracking.
//!
//! Nodes live in a slotmap arena and reference each other through
//! generational [`NodeKey`]s, so a stale key never dangles into a reused
//! slot. Parent/child links are maintained on both sides. Local TRS
//! mutations mark the subtree world-dirty; world transforms are recomputed
//! lazily in parent-before-child order.

use larkspur_core::math::{
    mat4_from_scale_rotation_translation, to_scale_rotation_translation, Mat4, Quat, Vec3,
};
use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Generational key of a scene-graph node.
    pub struct NodeKey;
}

/// A node in the scene graph.
#[derive(Debug)]
pub struct Node {
    name: Option<String>,
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
    translation: Vec3,
    rotation: Quat,
    scale: Vec3,
    world: Mat4,
    local_dirty: bool,
    world_dirty: bool,
    enabled: bool,
}

impl Node {
    fn new(name: Option<String>) -> Self {
        Self {
            name,
            parent: None,
            children: Vec::new(),
            translation: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
            world: Mat4::identity(),
            local_dirty: false,
            world_dirty: false,
            enabled: true,
        }
    }

    /// Node name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Parent node key, if parented.
    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    /// Child node keys.
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    /// Local translation.
    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    /// Local rotation.
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    /// Local scale.
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Whether the node itself is enabled (ancestors not considered).
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the local transform changed since the last recompute.
    pub fn local_dirty(&self) -> bool {
        self.local_dirty
    }

    /// Whether the cached world transform is stale.
    pub fn world_dirty(&self) -> bool {
        self.world_dirty
    }
}

/// Arena-backed scene graph.
///
/// # Example
///
/// ```
/// use larkspur_scene::graph::SceneGraph;
/// use larkspur_core::math::Vec3;
///
/// let mut graph = SceneGraph::new();
/// let root = graph.add_node("root");
/// let child = graph.add_child(root, "child");
/// graph.set_local_position(child, Vec3::new(1.0, 0.0, 0.0));
/// let world = graph.world_transform(child);
/// assert_eq!(world[(0, 3)], 1.0);
/// ```
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: SlotMap<NodeKey, Node>,
}

impl SceneGraph {
    /// Create an empty scene graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `key` refers to a live node.
    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Add an unparented node.
    pub fn add_node(&mut self, name: impl Into<String>) -> NodeKey {
        self.nodes.insert(Node::new(Some(name.into())))
    }

    /// Add a node as a child of `parent`.
    pub fn add_child(&mut self, parent: NodeKey, name: impl Into<String>) -> NodeKey {
        let key = self.add_node(name);
        self.set_parent(key, parent);
        key
    }

    /// Access a node.
    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    /// Sets `child` as a child of `parent`.
    ///
    /// Maintains both sides of the relationship; if `child` already has a
    /// different parent it is detached from it first. Reparenting marks the
    /// subtree world-dirty.
    ///
    /// # Panics
    ///
    /// Panics if `child == parent`.
    pub fn set_parent(&mut self, child: NodeKey, parent: NodeKey) {
        assert_ne!(child, parent, "cannot parent a node to itself");
        if !self.nodes.contains_key(child) || !self.nodes.contains_key(parent) {
            return;
        }

        if let Some(old_parent) = self.nodes[child].parent {
            if old_parent == parent {
                return;
            }
            if let Some(node) = self.nodes.get_mut(old_parent) {
                node.children.retain(|&c| c != child);
            }
        }

        self.nodes[child].parent = Some(parent);
        if !self.nodes[parent].children.contains(&child) {
            self.nodes[parent].children.push(child);
        }
        self.mark_subtree_world_dirty(child);
    }

    /// Detaches `child` from its parent, if any.
    pub fn remove_parent(&mut self, child: NodeKey) {
        let Some(node) = self.nodes.get_mut(child) else {
            return;
        };
        let Some(parent) = node.parent.take() else {
            return;
        };
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.retain(|&c| c != child);
        }
        self.mark_subtree_world_dirty(child);
    }

    /// Removes a node and its whole subtree.
    pub fn remove_subtree(&mut self, key: NodeKey) {
        self.remove_parent(key);
        self.remove_subtree_inner(key);
    }

    fn remove_subtree_inner(&mut self, key: NodeKey) {
        let children = match self.nodes.get(key) {
            Some(node) => node.children.clone(),
            None => return,
        };
        for child in children {
            self.remove_subtree_inner(child);
        }
        self.nodes.remove(key);
    }

    /// Set the local translation and mark the subtree dirty.
    pub fn set_local_position(&mut self, key: NodeKey, translation: Vec3) {
        if let Some(node) = self.nodes.get_mut(key) {
            node.translation = translation;
            node.local_dirty = true;
        }
        self.mark_subtree_world_dirty(key);
    }

    /// Set the local rotation and mark the subtree dirty.
    pub fn set_local_rotation(&mut self, key: NodeKey, rotation: Quat) {
        if let Some(node) = self.nodes.get_mut(key) {
            node.rotation = rotation;
            node.local_dirty = true;
        }
        self.mark_subtree_world_dirty(key);
    }

    /// Set the local scale and mark the subtree dirty.
    pub fn set_local_scale(&mut self, key: NodeKey, scale: Vec3) {
        if let Some(node) = self.nodes.get_mut(key) {
            node.scale = scale;
            node.local_dirty = true;
        }
        self.mark_subtree_world_dirty(key);
    }

    /// Enable or disable a node.
    ///
    /// Disabling does not touch transforms; [`SceneGraph::enabled_in_hierarchy`]
    /// reports the effective state including ancestors.
    pub fn set_enabled(&mut self, key: NodeKey, enabled: bool) {
        if let Some(node) = self.nodes.get_mut(key) {
            node.enabled = enabled;
        }
    }

    /// Whether the node and all of its ancestors are enabled.
    pub fn enabled_in_hierarchy(&self, key: NodeKey) -> bool {
        let mut cursor = Some(key);
        while let Some(k) = cursor {
            match self.nodes.get(k) {
                Some(node) if node.enabled => cursor = node.parent,
                _ => return false,
            }
        }
        true
    }

    fn mark_subtree_world_dirty(&mut self, key: NodeKey) {
        let mut stack = vec![key];
        while let Some(k) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(k) {
                node.world_dirty = true;
                stack.extend_from_slice(&node.children);
            }
        }
    }

    /// Whether any transform on the path from `key` up to (but not
    /// including) `ancestor` is dirty.
    pub fn dirty_relative_to(&self, key: NodeKey, ancestor: NodeKey) -> bool {
        let mut cursor = Some(key);
        while let Some(k) = cursor {
            if k == ancestor {
                return false;
            }
            match self.nodes.get(k) {
                Some(node) => {
                    if node.local_dirty || node.world_dirty {
                        return true;
                    }
                    cursor = node.parent;
                }
                None => return false,
            }
        }
        false
    }

    /// World transform of a node, recomputing the dirty ancestor chain.
    ///
    /// Clears the dirty flags along the recomputed chain.
    pub fn world_transform(&mut self, key: NodeKey) -> Mat4 {
        let mut chain = Vec::new();
        let mut cursor = Some(key);
        while let Some(k) = cursor {
            chain.push(k);
            cursor = self.nodes.get(k).and_then(|n| n.parent);
        }

        let mut world = Mat4::identity();
        for &k in chain.iter().rev() {
            let node = &self.nodes[k];
            let local =
                mat4_from_scale_rotation_translation(node.scale, node.rotation, node.translation);
            world *= local;
            let node = &mut self.nodes[k];
            node.world = world;
            node.local_dirty = false;
            node.world_dirty = false;
        }
        world
    }

    /// World position of a node.
    pub fn world_position(&mut self, key: NodeKey) -> Vec3 {
        let m = self.world_transform(key);
        Vec3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)])
    }

    /// World rotation of a node.
    pub fn world_rotation(&mut self, key: NodeKey) -> Quat {
        let m = self.world_transform(key);
        let (_, rotation, _) = to_scale_rotation_translation(&m);
        rotation
    }

    /// World scale of a node.
    pub fn world_scale(&mut self, key: NodeKey) -> Vec3 {
        let m = self.world_transform(key);
        let (scale, _, _) = to_scale_rotation_translation(&m);
        scale
    }

    /// Depth-first subtree traversal in parent-before-child order,
    /// including `key` itself.
    pub fn for_each_subtree(&self, key: NodeKey, mut f: impl FnMut(NodeKey)) {
        let mut stack = vec![key];
        while let Some(k) = stack.pop() {
            if let Some(node) = self.nodes.get(k) {
                f(k);
                // reversed so the first child is visited first
                stack.extend(node.children.iter().rev().copied());
            }
        }
    }

    /// Collect the subtree of `key` in parent-before-child order.
    pub fn subtree(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        self.for_each_subtree(key, |k| out.push(k));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use larkspur_core::math::quat_from_rotation_y;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn parent_child_bookkeeping() {
        let mut graph = SceneGraph::new();
        let a = graph.add_node("a");
        let b = graph.add_child(a, "b");
        assert_eq!(graph.node(b).unwrap().parent(), Some(a));
        assert_eq!(graph.node(a).unwrap().children(), &[b]);

        let c = graph.add_node("c");
        graph.set_parent(b, c);
        assert!(graph.node(a).unwrap().children().is_empty());
        assert_eq!(graph.node(c).unwrap().children(), &[b]);

        graph.remove_parent(b);
        assert_eq!(graph.node(b).unwrap().parent(), None);
        assert!(graph.node(c).unwrap().children().is_empty());
    }

    #[test]
    fn world_transform_composes() {
        let mut graph = SceneGraph::new();
        let root = graph.add_node("root");
        let child = graph.add_child(root, "child");
        graph.set_local_position(root, Vec3::new(1.0, 0.0, 0.0));
        graph.set_local_rotation(root, quat_from_rotation_y(FRAC_PI_2));
        graph.set_local_position(child, Vec3::new(1.0, 0.0, 0.0));

        let p = graph.world_position(child);
        // root rotates child's +X offset onto -Z
        assert!((p.x - 1.0).abs() < 1e-5);
        assert!((p.z - (-1.0)).abs() < 1e-5);
    }

    #[test]
    fn dirty_flags_propagate_and_clear() {
        let mut graph = SceneGraph::new();
        let root = graph.add_node("root");
        let child = graph.add_child(root, "child");
        let _ = graph.world_transform(child);
        assert!(!graph.node(child).unwrap().world_dirty());

        graph.set_local_position(root, Vec3::new(0.0, 1.0, 0.0));
        assert!(graph.node(child).unwrap().world_dirty());
        assert!(graph.dirty_relative_to(child, root));

        let _ = graph.world_transform(child);
        assert!(!graph.node(child).unwrap().world_dirty());
        assert!(!graph.node(root).unwrap().world_dirty());
    }

    #[test]
    fn dirty_relative_to_excludes_ancestor() {
        let mut graph = SceneGraph::new();
        let root = graph.add_node("root");
        let mid = graph.add_child(root, "mid");
        let leaf = graph.add_child(mid, "leaf");
        let _ = graph.world_transform(leaf);

        // Dirtying the root must not count: the walk stops before `root`
        graph.set_local_position(root, Vec3::new(5.0, 0.0, 0.0));
        // the subtree marking flags mid and leaf as world-dirty though
        assert!(graph.dirty_relative_to(leaf, root));

        let _ = graph.world_transform(leaf);
        assert!(!graph.dirty_relative_to(leaf, root));

        graph.set_local_position(mid, Vec3::new(0.0, 1.0, 0.0));
        assert!(graph.dirty_relative_to(leaf, root));
    }

    #[test]
    fn enabled_in_hierarchy_walks_ancestors() {
        let mut graph = SceneGraph::new();
        let root = graph.add_node("root");
        let child = graph.add_child(root, "child");
        assert!(graph.enabled_in_hierarchy(child));

        graph.set_enabled(root, false);
        assert!(!graph.enabled_in_hierarchy(root));
        assert!(!graph.enabled_in_hierarchy(child));
        assert!(graph.node(child).unwrap().enabled());
    }

    #[test]
    fn subtree_order_is_parent_before_child() {
        let mut graph = SceneGraph::new();
        let root = graph.add_node("root");
        let a = graph.add_child(root, "a");
        let b = graph.add_child(root, "b");
        let a1 = graph.add_child(a, "a1");

        let order = graph.subtree(root);
        assert_eq!(order[0], root);
        let pos = |k| order.iter().position(|&x| x == k).unwrap();
        assert!(pos(a) < pos(a1));
        assert!(pos(root) < pos(b));
    }

    #[test]
    fn remove_subtree_drops_descendants() {
        let mut graph = SceneGraph::new();
        let root = graph.add_node("root");
        let child = graph.add_child(root, "child");
        let leaf = graph.add_child(child, "leaf");
        graph.remove_subtree(child);
        assert!(graph.contains(root));
        assert!(!graph.contains(child));
        assert!(!graph.contains(leaf));
    }
}
