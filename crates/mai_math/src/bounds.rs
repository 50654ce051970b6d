use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned extents of a point set.
///
/// An empty set of points produces `Bounds::EMPTY`, whose `min` is larger
/// than its `max` on every axis.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Bounds {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Bounds {
    pub const EMPTY: Bounds = Bounds {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Compute the bounds of a set of points.
    pub fn from_points(points: &[Vec3]) -> Self {
        points.iter().fold(Self::EMPTY, |b, p| b.include(*p))
    }

    /// Grow the bounds to contain `point`.
    pub fn include(self, point: Vec3) -> Self {
        Self {
            min: self.min.min(point),
            max: self.max.max(point),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Center of the box, or the origin for empty bounds.
    pub fn center(&self) -> Vec3 {
        if self.is_empty() {
            return Vec3::ZERO;
        }
        (self.min + self.max) * 0.5
    }

    /// Diagonal length of the box.
    pub fn size(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        (self.max - self.min).length()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_from_points() {
        let bounds = Bounds::from_points(&[
            Vec3::new(-1.0, -2.0, -3.0),
            Vec3::new(4.0, 5.0, 6.0),
            Vec3::ZERO,
        ]);

        assert_eq!(bounds.min, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(bounds.max, Vec3::new(4.0, 5.0, 6.0));
        assert!((bounds.center() - Vec3::new(1.5, 1.5, 1.5)).length() < 0.001);
    }

    #[test]
    fn test_empty_bounds() {
        let bounds = Bounds::from_points(&[]);
        assert!(bounds.is_empty());
        assert_eq!(bounds.size(), 0.0);
        assert_eq!(bounds.center(), Vec3::ZERO);
    }
}
