//! # Larkspur Engine Scene
//!
//! Scene graph and collision subsystem for Larkspur Engine.
//!
//! ## Core Types
//!
//! - [`graph::SceneGraph`] — Arena-backed node hierarchy with lazy world
//!   transforms and dirty tracking
//! - [`collision::CollisionSystem`] — Collision component lifecycle,
//!   per-kind shape construction, and compound composition
//! - [`physics::PhysicsWorld`] — Rapier physics state behind the handful of
//!   operations the collision layer needs
//! - [`assets::AssetRegistry`] — In-process asset readiness contract
//! - [`model::Model`] — Render source consumed by mesh collision

pub mod assets;
pub mod collision;
pub mod graph;
pub mod model;
pub mod physics;

pub use collision::CollisionSystem;
pub use graph::SceneGraph;
pub use physics::PhysicsWorld;
