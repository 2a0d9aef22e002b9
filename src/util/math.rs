//! Math type re-exports and bounding boxes for point clouds.

pub use glam::DVec3;

use bytemuck::{Pod, Zeroable};
use std::fmt;

/// A grid vertex. Grids are always loaded as three-dimensional points.
pub type Vector3d = DVec3;

/// 3D bounding box with double precision.
#[derive(Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct BBox3d {
    pub min: DVec3,
    pub max: DVec3,
}

impl BBox3d {
    /// Empty bounding box (inverted, will expand on first point).
    pub const EMPTY: Self = Self {
        min: DVec3::splat(f64::INFINITY),
        max: DVec3::splat(f64::NEG_INFINITY),
    };

    /// Create a new bounding box from min and max points.
    #[inline]
    pub const fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Check if this box is empty (no point was added).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Expand to include a point.
    #[inline]
    pub fn expand(&mut self, p: DVec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Box extent along each axis.
    #[inline]
    pub fn size(&self) -> DVec3 {
        if self.is_empty() {
            DVec3::ZERO
        } else {
            self.max - self.min
        }
    }

    /// Build from an iterator of points.
    pub fn from_points(points: impl IntoIterator<Item = DVec3>) -> Self {
        let mut bbox = Self::EMPTY;
        for p in points {
            bbox.expand(p);
        }
        bbox
    }
}

impl Default for BBox3d {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for BBox3d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BBox3d({:?} .. {:?})", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_from_points() {
        let bbox = BBox3d::from_points([
            DVec3::new(1.0, -2.0, 0.0),
            DVec3::new(-1.0, 3.0, 0.5),
        ]);
        assert_eq!(bbox.min, DVec3::new(-1.0, -2.0, 0.0));
        assert_eq!(bbox.max, DVec3::new(1.0, 3.0, 0.5));
        assert_eq!(bbox.size(), DVec3::new(2.0, 5.0, 0.5));
    }

    #[test]
    fn test_empty_bbox() {
        let bbox = BBox3d::default();
        assert!(bbox.is_empty());
        assert_eq!(bbox.size(), DVec3::ZERO);
    }
}
