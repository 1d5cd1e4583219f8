//! Rapier physics world wrapper.
//!
//! [`PhysicsWorld`] bundles all rapier 3D state behind the handful of
//! operations the collision subsystem needs: adding/removing bodies and
//! colliders, mutating collider shapes and placements in place, and
//! enabling/disabling simulation per body.
//!
//! Physics is an optional capability: a [`CollisionSystem`](crate::collision::CollisionSystem)
//! without an attached `PhysicsWorld` degrades every shape operation to a
//! no-op.

use larkspur_core::math::{Isometry3, Vec3};
use rapier3d::prelude::*;

/// Single container holding all rapier 3D physics state.
///
/// # Example
///
/// ```
/// use larkspur_scene::physics::PhysicsWorld;
///
/// let mut physics = PhysicsWorld::default();
/// physics.step();
/// assert_eq!(physics.colliders.len(), 0);
/// ```
pub struct PhysicsWorld {
    pub gravity: Vec3,
    pub integration_parameters: IntegrationParameters,
    pub pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub impulse_joints: ImpulseJointSet,
    pub multibody_joints: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
        }
    }
}

impl PhysicsWorld {
    /// Creates a new physics world with the given gravity.
    pub fn with_gravity(gravity: Vec3) -> Self {
        Self {
            gravity,
            ..Default::default()
        }
    }

    /// Steps the physics simulation by one timestep.
    pub fn step(&mut self) {
        larkspur_core::profile_scope!("rapier3d: step");
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
    }

    /// Adds a rigid body and returns its handle.
    pub fn add_body(&mut self, body: RigidBody) -> RigidBodyHandle {
        self.bodies.insert(body)
    }

    /// Removes a rigid body and all colliders attached to it.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) {
        self.bodies.remove(
            handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    /// Adds a collider attached to a rigid body and returns its handle.
    pub fn add_collider(&mut self, collider: Collider, parent: RigidBodyHandle) -> ColliderHandle {
        self.colliders
            .insert_with_parent(collider, parent, &mut self.bodies)
    }

    /// Adds a free collider (not attached to any body) and returns its handle.
    pub fn add_free_collider(&mut self, collider: Collider) -> ColliderHandle {
        self.colliders.insert(collider)
    }

    /// Removes a collider. A no-op if the handle is stale.
    pub fn remove_collider(&mut self, handle: ColliderHandle) {
        self.colliders.remove(
            handle,
            &mut self.island_manager,
            &mut self.bodies,
            true,
        );
    }

    /// Replaces a collider's shape in place. A no-op if the handle is stale.
    pub fn set_collider_shape(&mut self, handle: ColliderHandle, shape: SharedShape) {
        if let Some(collider) = self.colliders.get_mut(handle) {
            collider.set_shape(shape);
        }
    }

    /// Replaces a collider's placement in place. A no-op if the handle is stale.
    pub fn set_collider_position(&mut self, handle: ColliderHandle, position: Isometry3) {
        if let Some(collider) = self.colliders.get_mut(handle) {
            collider.set_position(position);
        }
    }

    /// Enables or disables a rigid body's simulation, waking it on enable.
    pub fn set_body_enabled(&mut self, handle: RigidBodyHandle, enabled: bool) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_enabled(enabled);
            if enabled {
                body.wake_up(true);
            }
        }
    }

    /// Wakes a sleeping rigid body.
    pub fn activate_body(&mut self, handle: RigidBodyHandle) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.wake_up(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn physics_world_default() {
        let world = PhysicsWorld::default();
        assert!((world.gravity.y - (-9.81)).abs() < 1e-6);
        assert_eq!(world.bodies.len(), 0);
        assert_eq!(world.colliders.len(), 0);
    }

    #[test]
    fn add_body_and_collider() {
        let mut physics = PhysicsWorld::default();

        let body_handle = physics.add_body(
            RigidBodyBuilder::dynamic()
                .translation(Vec3::new(0.0, 10.0, 0.0))
                .build(),
        );
        let _collider_handle =
            physics.add_collider(ColliderBuilder::ball(0.5).build(), body_handle);

        assert_eq!(physics.bodies.len(), 1);
        assert_eq!(physics.colliders.len(), 1);
    }

    #[test]
    fn step_moves_dynamic_body() {
        let mut physics = PhysicsWorld::default();

        let body_handle = physics.add_body(
            RigidBodyBuilder::dynamic()
                .translation(Vec3::new(0.0, 10.0, 0.0))
                .build(),
        );
        physics.add_collider(ColliderBuilder::ball(0.5).build(), body_handle);

        let initial_y = physics.bodies[body_handle].position().translation.y;

        for _ in 0..10 {
            physics.step();
        }

        let final_y = physics.bodies[body_handle].position().translation.y;
        // Ball should have fallen due to gravity
        assert!(final_y < initial_y);
    }

    #[test]
    fn remove_collider_is_idempotent() {
        let mut physics = PhysicsWorld::default();
        let handle = physics.add_free_collider(ColliderBuilder::ball(0.5).build());
        assert_eq!(physics.colliders.len(), 1);

        physics.remove_collider(handle);
        assert_eq!(physics.colliders.len(), 0);
        // stale handle: tolerated no-op
        physics.remove_collider(handle);
        assert_eq!(physics.colliders.len(), 0);
    }

    #[test]
    fn disabled_body_does_not_fall() {
        let mut physics = PhysicsWorld::default();
        let handle = physics.add_body(
            RigidBodyBuilder::dynamic()
                .translation(Vec3::new(0.0, 10.0, 0.0))
                .build(),
        );
        physics.set_body_enabled(handle, false);
        for _ in 0..10 {
            physics.step();
        }
        let y = physics.bodies[handle].position().translation.y;
        assert!((y - 10.0).abs() < 1e-6);
    }
}
