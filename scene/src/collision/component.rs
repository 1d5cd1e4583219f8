//! Collision component data.

use std::sync::Arc;

use larkspur_core::math::{Quat, UnitQuaternion, Vec3};
use rapier3d::prelude::{ColliderHandle, RigidBodyHandle, SharedShape};

use crate::assets::AssetId;
use crate::graph::NodeKey;
use crate::model::Model;

use super::compound::CompoundShape;

slotmap::new_key_type! {
    /// Generational key of a collision component.
    pub struct ColliderKey;
}

/// The closed set of collision shape kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CollisionShapeKind {
    /// Box from half-extents.
    #[default]
    Box,
    /// Sphere from radius.
    Sphere,
    /// Capsule along a chosen axis. The authored height spans the whole
    /// capsule including the hemispherical caps.
    Capsule,
    /// Cylinder along a chosen axis.
    Cylinder,
    /// Cone along a chosen axis.
    Cone,
    /// Triangle mesh sourced from a render model.
    Mesh,
    /// Compound shape composed from descendant collision components.
    Compound,
}

/// Axis selecting the length direction of capsule/cylinder/cone shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShapeAxis {
    /// X axis.
    X = 0,
    /// Y axis (the default).
    #[default]
    Y = 1,
    /// Z axis.
    Z = 2,
}

/// Authored collision parameters.
///
/// Only the fields relevant to the current [`CollisionShapeKind`] are
/// consumed when the physics shape is constructed.
#[derive(Debug, Clone, Default)]
pub struct CollisionData {
    /// Shape kind.
    pub kind: CollisionShapeKind,
    /// Half-extents for [`CollisionShapeKind::Box`].
    pub half_extents: Vec3,
    /// Radius for sphere/capsule/cylinder/cone.
    pub radius: f32,
    /// Full height for capsule/cylinder/cone.
    pub height: f32,
    /// Length axis for capsule/cylinder/cone.
    pub axis: ShapeAxis,
    /// Local placement offset folded into the shape position.
    pub linear_offset: Vec3,
    /// Local rotation offset folded into the shape rotation.
    pub angular_offset: Quat,
    /// Opt-in vertex welding when extracting mesh collision triangles.
    pub check_vertex_duplicates: bool,
    /// Procedurally assigned model source for [`CollisionShapeKind::Mesh`].
    pub model: Option<Arc<Model>>,
    /// Render-component model source for [`CollisionShapeKind::Mesh`].
    pub render: Option<Arc<Model>>,
    /// Model asset source for [`CollisionShapeKind::Mesh`].
    pub asset: Option<AssetId>,
    /// Render asset source for [`CollisionShapeKind::Mesh`].
    pub render_asset: Option<AssetId>,
}

impl CollisionData {
    /// Parameters with the defaults of the given kind.
    pub fn new(kind: CollisionShapeKind) -> Self {
        Self {
            kind,
            half_extents: Vec3::new(0.5, 0.5, 0.5),
            radius: 0.5,
            height: 2.0,
            axis: ShapeAxis::Y,
            linear_offset: Vec3::zeros(),
            angular_offset: Quat::identity(),
            check_vertex_duplicates: false,
            model: None,
            render: None,
            asset: None,
            render_asset: None,
        }
    }

    /// Box parameters with the given half-extents.
    pub fn cuboid(half_extents: Vec3) -> Self {
        Self {
            half_extents,
            ..Self::new(CollisionShapeKind::Box)
        }
    }

    /// Sphere parameters with the given radius.
    pub fn sphere(radius: f32) -> Self {
        Self {
            radius,
            ..Self::new(CollisionShapeKind::Sphere)
        }
    }

    /// Capsule parameters. `height` spans the full capsule including caps.
    pub fn capsule(radius: f32, height: f32) -> Self {
        Self {
            radius,
            height,
            ..Self::new(CollisionShapeKind::Capsule)
        }
    }

    /// Cylinder parameters.
    pub fn cylinder(radius: f32, height: f32) -> Self {
        Self {
            radius,
            height,
            ..Self::new(CollisionShapeKind::Cylinder)
        }
    }

    /// Cone parameters.
    pub fn cone(radius: f32, height: f32) -> Self {
        Self {
            radius,
            height,
            ..Self::new(CollisionShapeKind::Cone)
        }
    }

    /// Mesh parameters with a procedurally assigned model.
    pub fn mesh(model: Arc<Model>) -> Self {
        Self {
            model: Some(model),
            ..Self::new(CollisionShapeKind::Mesh)
        }
    }

    /// Mesh parameters resolving through a model asset.
    pub fn mesh_asset(asset: AssetId) -> Self {
        Self {
            asset: Some(asset),
            ..Self::new(CollisionShapeKind::Mesh)
        }
    }

    /// Compound parameters (children come from descendant components).
    pub fn compound() -> Self {
        Self::new(CollisionShapeKind::Compound)
    }

    /// Returns these parameters with the given length axis.
    #[must_use]
    pub fn with_axis(mut self, axis: ShapeAxis) -> Self {
        self.axis = axis;
        self
    }

    /// Returns these parameters with a local placement offset.
    #[must_use]
    pub fn with_linear_offset(mut self, offset: Vec3) -> Self {
        self.linear_offset = offset;
        self
    }

    /// Returns these parameters with a local rotation offset.
    #[must_use]
    pub fn with_angular_offset(mut self, offset: Quat) -> Self {
        self.angular_offset = offset;
        self
    }

    /// Returns these parameters with vertex welding enabled for mesh
    /// triangle extraction.
    #[must_use]
    pub fn with_vertex_dedup(mut self) -> Self {
        self.check_vertex_duplicates = true;
        self
    }

    /// Whether the placement offset is non-identity (and must be folded
    /// into the shape placement).
    pub fn has_offset(&self) -> bool {
        self.linear_offset != Vec3::zeros() || self.angular_offset != Quat::identity()
    }
}

/// Compound involvement of a collision component.
///
/// An explicit tri-state: no self-pointer sentinel marks the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompoundRole {
    /// No compound involvement.
    #[default]
    Standalone,
    /// Owns the compound shape its descendants contribute to.
    Root,
    /// Contributes a child shape to the referenced root component.
    Child(ColliderKey),
}

/// A constructed physics shape with its axis-alignment rotation.
///
/// Rapier's cylinder and cone primitives are Y-aligned; shapes authored
/// along X or Z carry the aligning rotation here and fold it into their
/// placement isometry at registration time.
#[derive(Clone)]
pub struct ShapeInstance {
    /// The physics shape.
    pub shape: SharedShape,
    /// Rotation aligning the shape's canonical axis with the authored axis.
    pub local_rotation: UnitQuaternion,
}

impl std::fmt::Debug for ShapeInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShapeInstance")
            .field("shape_type", &self.shape.shape_type())
            .field("local_rotation", &self.local_rotation)
            .finish()
    }
}

/// A collision component bound to a scene-graph node.
///
/// Created and owned by the
/// [`CollisionSystem`](super::CollisionSystem); the component's physics
/// registration (compound child entry, body-attached collider, or trigger
/// volume) is never present in more than one place at a time.
#[derive(Debug)]
pub struct CollisionComponent {
    pub(crate) node: NodeKey,
    pub(crate) enabled: bool,
    pub(crate) destroying: bool,
    pub(crate) data: CollisionData,
    pub(crate) role: CompoundRole,
    pub(crate) shape: Option<ShapeInstance>,
    pub(crate) compound: Option<CompoundShape>,
    pub(crate) body: Option<RigidBodyHandle>,
    pub(crate) collider: Option<ColliderHandle>,
}

impl CollisionComponent {
    pub(crate) fn new(node: NodeKey, data: CollisionData) -> Self {
        Self {
            node,
            enabled: true,
            destroying: false,
            data,
            role: CompoundRole::Standalone,
            shape: None,
            compound: None,
            body: None,
            collider: None,
        }
    }

    /// The scene-graph node this component is attached to.
    pub fn node(&self) -> NodeKey {
        self.node
    }

    /// Whether the component itself is enabled.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// The authored collision parameters.
    pub fn data(&self) -> &CollisionData {
        &self.data
    }

    /// The shape kind.
    pub fn kind(&self) -> CollisionShapeKind {
        self.data.kind
    }

    /// The compound involvement of this component.
    pub fn role(&self) -> CompoundRole {
        self.role
    }

    /// The constructed (but not necessarily registered) physics shape.
    pub fn shape(&self) -> Option<&ShapeInstance> {
        self.shape.as_ref()
    }

    /// The compound shape owned by this component, if it is a compound root.
    pub fn compound(&self) -> Option<&CompoundShape> {
        self.compound.as_ref()
    }

    /// Number of child shapes currently composed into this compound root.
    pub fn compound_child_count(&self) -> usize {
        self.compound.as_ref().map(|c| c.len()).unwrap_or(0)
    }

    /// The associated rigid body, if the entity carries one.
    pub fn body(&self) -> Option<RigidBodyHandle> {
        self.body
    }

    /// The registered collider handle (body-attached or trigger volume).
    pub fn collider(&self) -> Option<ColliderHandle> {
        self.collider
    }

    /// Whether this component is currently registered as a trigger volume.
    pub fn has_trigger(&self) -> bool {
        self.body.is_none() && self.collider.is_some()
    }
}
