//! Axis-aligned bounding boxes
//!
//! Box/box and box/point tests use closed intervals, so touching faces count
//! as intersecting. Ray tests use the slab method over the interval
//! `[0, max_length]`.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Vec3;

/// Direction components smaller than this are treated as parallel to a slab
pub const RAY_EPSILON: f32 = 1e-6;

/// Axis-aligned box given by its minimum and maximum corners
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub mins: Vec3,
    pub maxs: Vec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        BoundingBox::ONE
    }
}

impl BoundingBox {
    /// The unit box `[-1, -1, -1]..[1, 1, 1]`
    pub const ONE: BoundingBox = BoundingBox {
        mins: Vec3::splat(-1.0),
        maxs: Vec3::splat(1.0),
    };

    pub const fn new(mins: Vec3, maxs: Vec3) -> Self {
        Self { mins, maxs }
    }

    /// Cube of half-width `half` centered on the origin
    pub const fn cube(half: f32) -> Self {
        Self::new(Vec3::splat(-half), Vec3::splat(half))
    }

    /// True when `mins < maxs` on every axis
    pub fn is_valid(&self) -> bool {
        self.mins.x < self.maxs.x && self.mins.y < self.maxs.y && self.mins.z < self.maxs.z
    }

    pub fn center(&self) -> Vec3 {
        (self.mins + self.maxs) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.maxs - self.mins
    }

    /// This box moved by `offset`
    pub fn translated(&self, offset: Vec3) -> BoundingBox {
        BoundingBox::new(self.mins + offset, self.maxs + offset)
    }

    /// Overlap test against another box. A box never intersects itself.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        if std::ptr::eq(self, other) {
            return false;
        }

        self.mins.x <= other.maxs.x
            && self.maxs.x >= other.mins.x
            && self.mins.y <= other.maxs.y
            && self.maxs.y >= other.mins.y
            && self.mins.z <= other.maxs.z
            && self.maxs.z >= other.mins.z
    }

    /// Point containment, inclusive on every face
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.mins.x
            && point.x <= self.maxs.x
            && point.y >= self.mins.y
            && point.y <= self.maxs.y
            && point.z >= self.mins.z
            && point.z <= self.maxs.z
    }

    /// Slab-method ray test
    ///
    /// Parallel axes fail unless the origin already lies inside that slab.
    /// Otherwise the running interval `[t_min, t_max]`, starting at
    /// `[0, max_length]`, is narrowed per axis and the test fails as soon as
    /// it becomes empty.
    pub fn ray_intersects(&self, origin: Vec3, direction: Vec3, max_length: f32) -> bool {
        let mut t_min = 0.0_f32;
        let mut t_max = max_length;

        for axis in 0..3 {
            let o = origin.axis(axis);
            let d = direction.axis(axis);
            let min = self.mins.axis(axis);
            let max = self.maxs.axis(axis);

            if d.abs() < RAY_EPSILON {
                if o < min || o > max {
                    return false;
                }
                continue;
            }

            let mut t1 = (min - o) / d;
            let mut t2 = (max - o) / d;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }

            t_min = t_min.max(t1);
            t_max = t_max.min(t2);

            if t_min > t_max {
                return false;
            }
        }

        true
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} .. {}]", self.mins, self.maxs)
    }
}
