//! Collision subsystem.
//!
//! This module provides:
//!
//! - [`CollisionComponent`] / [`CollisionData`] - Per-node collision authoring
//! - [`CollisionSystem`] - Shape lifecycle and compound composition
//! - [`CompoundShape`] - Child-shape list of a compound root
//! - [`TriangleMeshData`] - Cached triangle extraction for mesh collision
//!
//! Shapes are lowered to rapier; components without a rigid body register
//! trigger volumes, descendants of a `compound`-typed component contribute
//! child shapes to the ancestor's compound instead.

mod component;
mod compound;
mod shapes;
mod system;
mod trimesh;

pub use component::{
    ColliderKey, CollisionComponent, CollisionData, CollisionShapeKind, CompoundRole, ShapeAxis,
    ShapeInstance,
};
pub use compound::{CompoundChild, CompoundShape};
pub use shapes::{capsule_segment_height, create_primitive_shape};
pub use system::CollisionSystem;
pub use trimesh::TriangleMeshData;
