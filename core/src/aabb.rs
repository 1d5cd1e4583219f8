//! Axis-aligned bounding box.

use crate::math::{Mat4, Vec3, Vec4};

/// Axis-aligned bounding box in object space.
///
/// Stored as min/max corners. Construct from explicit corners, from a
/// center + half-extents pair, or from a point cloud via [`Aabb::from_points`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Vec3,
    /// Maximum corner of the bounding box.
    pub max: Vec3,
}

impl Aabb {
    /// Zero-size box at the origin.
    pub const ZERO: Self = Self {
        min: Vec3::new(0.0, 0.0, 0.0),
        max: Vec3::new(0.0, 0.0, 0.0),
    };

    /// Creates a new AABB from min and max corners.
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Creates an AABB from center and half-extents.
    #[inline]
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Computes the tight bounds of a point cloud.
    ///
    /// Returns [`Aabb::ZERO`] for an empty iterator.
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = Vec3>,
    {
        let mut iter = points.into_iter();
        let Some(first) = iter.next() else {
            return Self::ZERO;
        };
        let mut min = first;
        let mut max = first;
        for p in iter {
            min = min.inf(&p);
            max = max.sup(&p);
        }
        Self { min, max }
    }

    /// Center of the box.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Half-extents of the box.
    #[inline]
    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Grows the box to contain `point`.
    pub fn expand(&mut self, point: Vec3) {
        self.min = self.min.inf(&point);
        self.max = self.max.sup(&point);
    }

    /// Returns the smallest box containing both `self` and `other`.
    #[must_use]
    pub fn merged(&self, other: &Aabb) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Returns the AABB of this box transformed by `m`.
    ///
    /// Transforms all 8 corners and re-fits; the result is conservative for
    /// rotations (it bounds the rotated box, not the original volume).
    #[must_use]
    pub fn transformed(&self, m: &Mat4) -> Self {
        let corners = [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ];
        Self::from_points(corners.iter().map(|c| {
            let v = m * Vec4::new(c.x, c.y, c.z, 1.0);
            Vec3::new(v.x, v.y, v.z)
        }))
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{mat4_from_translation, Vec3};

    #[test]
    fn from_points_basic() {
        let aabb = Aabb::from_points([
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
        ]);
        assert_eq!(aabb.min, Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn from_points_empty() {
        let aabb = Aabb::from_points(std::iter::empty());
        assert_eq!(aabb, Aabb::ZERO);
    }

    #[test]
    fn center_and_half_extents() {
        let aabb = Aabb::new(Vec3::new(-1.0, -2.0, -3.0), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(aabb.center(), Vec3::zeros());
        assert_eq!(aabb.half_extents(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn merged_contains_both() {
        let a = Aabb::new(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));
        let b = Aabb::new(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(0.5, 2.0, 0.5));
        let m = a.merged(&b);
        assert_eq!(m.min, Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(m.max, Vec3::new(1.0, 2.0, 1.0));
    }

    #[test]
    fn transformed_by_translation() {
        let aabb = Aabb::new(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));
        let moved = aabb.transformed(&mat4_from_translation(Vec3::new(5.0, 0.0, 0.0)));
        assert_eq!(moved.min, Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(moved.max, Vec3::new(6.0, 1.0, 1.0));
    }
}
