//! Primitive physics shape construction.
//!
//! The closed set of shape kinds is dispatched with a `match`; each arm
//! lowers the authored parameters to a rapier shape. Mesh and compound
//! shapes need system context (the trimesh cache, descendant components)
//! and are built by the [`CollisionSystem`](super::CollisionSystem).

use std::f32::consts::FRAC_PI_2;

use larkspur_core::math::UnitQuaternion;
use nalgebra::Vector3;
use rapier3d::prelude::SharedShape;

use super::component::{CollisionData, CollisionShapeKind, ShapeAxis, ShapeInstance};

/// Cylindrical segment height of a capsule whose authored `height` spans
/// the whole capsule including the hemispherical caps.
///
/// Clamped at zero: a capsule shorter than its two caps degenerates to two
/// joined hemispheres, never a negative segment.
pub fn capsule_segment_height(height: f32, radius: f32) -> f32 {
    (height - 2.0 * radius).max(0.0)
}

/// Rotation aligning rapier's canonical +Y primitive axis with `axis`.
fn axis_alignment(axis: ShapeAxis) -> UnitQuaternion {
    match axis {
        ShapeAxis::X => UnitQuaternion::from_axis_angle(&Vector3::z_axis(), -FRAC_PI_2),
        ShapeAxis::Y => UnitQuaternion::identity(),
        ShapeAxis::Z => UnitQuaternion::from_axis_angle(&Vector3::x_axis(), FRAC_PI_2),
    }
}

/// Construct the physics shape for a primitive kind.
///
/// Returns `None` for kinds that need system context (mesh, compound).
pub fn create_primitive_shape(data: &CollisionData) -> Option<ShapeInstance> {
    let instance = match data.kind {
        CollisionShapeKind::Box => ShapeInstance {
            shape: SharedShape::cuboid(
                data.half_extents.x,
                data.half_extents.y,
                data.half_extents.z,
            ),
            local_rotation: UnitQuaternion::identity(),
        },
        CollisionShapeKind::Sphere => ShapeInstance {
            shape: SharedShape::ball(data.radius),
            local_rotation: UnitQuaternion::identity(),
        },
        CollisionShapeKind::Capsule => {
            // Capsules have native per-axis constructors; no alignment
            // rotation needed.
            let half_segment = capsule_segment_height(data.height, data.radius) * 0.5;
            let shape = match data.axis {
                ShapeAxis::X => SharedShape::capsule_x(half_segment, data.radius),
                ShapeAxis::Y => SharedShape::capsule_y(half_segment, data.radius),
                ShapeAxis::Z => SharedShape::capsule_z(half_segment, data.radius),
            };
            ShapeInstance {
                shape,
                local_rotation: UnitQuaternion::identity(),
            }
        }
        CollisionShapeKind::Cylinder => ShapeInstance {
            shape: SharedShape::cylinder(data.height * 0.5, data.radius),
            local_rotation: axis_alignment(data.axis),
        },
        CollisionShapeKind::Cone => ShapeInstance {
            shape: SharedShape::cone(data.height * 0.5, data.radius),
            local_rotation: axis_alignment(data.axis),
        },
        CollisionShapeKind::Mesh | CollisionShapeKind::Compound => return None,
    };
    Some(instance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use larkspur_core::math::Vec3;

    #[test]
    fn box_half_extents() {
        let data = CollisionData::cuboid(Vec3::new(1.0, 2.0, 3.0));
        let instance = create_primitive_shape(&data).unwrap();
        let cuboid = instance.shape.as_cuboid().unwrap();
        assert_eq!(cuboid.half_extents.x, 1.0);
        assert_eq!(cuboid.half_extents.y, 2.0);
        assert_eq!(cuboid.half_extents.z, 3.0);
    }

    #[test]
    fn sphere_radius() {
        let data = CollisionData::sphere(1.5);
        let instance = create_primitive_shape(&data).unwrap();
        assert_eq!(instance.shape.as_ball().unwrap().radius, 1.5);
    }

    #[test]
    fn capsule_height_excludes_caps() {
        // height 3, radius 0.5: cylindrical segment = 2, half-segment = 1
        let data = CollisionData::capsule(0.5, 3.0);
        let instance = create_primitive_shape(&data).unwrap();
        let capsule = instance.shape.as_capsule().unwrap();
        assert_relative_eq!(capsule.half_height(), 1.0, epsilon = 1e-6);
        assert_eq!(capsule.radius, 0.5);
    }

    #[test]
    fn capsule_degenerates_to_sphere_pair() {
        // height 1.0 with radius 0.5: the caps consume the whole height
        let data = CollisionData::capsule(0.5, 1.0);
        let instance = create_primitive_shape(&data).unwrap();
        let capsule = instance.shape.as_capsule().unwrap();
        assert_relative_eq!(capsule.half_height(), 0.0, epsilon = 1e-6);

        // shorter than the caps: clamped at zero, never negative
        let data = CollisionData::capsule(0.5, 0.2);
        let instance = create_primitive_shape(&data).unwrap();
        let capsule = instance.shape.as_capsule().unwrap();
        assert_relative_eq!(capsule.half_height(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn capsule_axis_constructors() {
        for (axis, expect) in [
            (ShapeAxis::X, Vector3::new(1.0, 0.0, 0.0)),
            (ShapeAxis::Y, Vector3::new(0.0, 1.0, 0.0)),
            (ShapeAxis::Z, Vector3::new(0.0, 0.0, 1.0)),
        ] {
            let data = CollisionData::capsule(0.5, 3.0).with_axis(axis);
            let instance = create_primitive_shape(&data).unwrap();
            let capsule = instance.shape.as_capsule().unwrap();
            let dir = (capsule.segment.b - capsule.segment.a).normalize();
            assert_relative_eq!(dir.dot(&expect), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn cylinder_axis_uses_alignment_rotation() {
        let data = CollisionData::cylinder(0.5, 2.0).with_axis(ShapeAxis::X);
        let instance = create_primitive_shape(&data).unwrap();
        assert!(instance.shape.as_cylinder().is_some());
        // the alignment rotation maps +Y onto +X
        let mapped = instance.local_rotation * Vector3::new(0.0, 1.0, 0.0);
        assert_relative_eq!(mapped.x, 1.0, epsilon = 1e-6);

        let data = CollisionData::cylinder(0.5, 2.0).with_axis(ShapeAxis::Z);
        let instance = create_primitive_shape(&data).unwrap();
        let mapped = instance.local_rotation * Vector3::new(0.0, 1.0, 0.0);
        assert_relative_eq!(mapped.z, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn cone_full_height_is_halved() {
        let data = CollisionData::cone(0.5, 2.0);
        let instance = create_primitive_shape(&data).unwrap();
        let cone = instance.shape.as_cone().unwrap();
        assert_relative_eq!(cone.half_height, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn context_dependent_kinds_return_none() {
        assert!(create_primitive_shape(&CollisionData::compound()).is_none());
        let mesh_data = CollisionData::new(CollisionShapeKind::Mesh);
        assert!(create_primitive_shape(&mesh_data).is_none());
    }
}
