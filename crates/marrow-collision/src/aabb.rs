//! Axis-aligned bounding boxes
//!
//! The overlap tests all take an `expand` parameter: the loose-octree cells
//! are tested with symmetric slack so triangles stored at a parent node are
//! still found from neighboring cells.

use crate::shapes::{Ray, Sphere};
use glam::Vec3;

/// Axis-aligned box spanning `lo..hi` on each axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub lo: Vec3,
    pub hi: Vec3,
}

impl Aabb {
    pub const fn new(lo: Vec3, hi: Vec3) -> Self {
        Self { lo, hi }
    }

    /// Box spanning two arbitrary corner points.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        Self {
            lo: a.min(b),
            hi: a.max(b),
        }
    }

    pub fn from_center_radius(center: Vec3, radius: f32) -> Self {
        Self {
            lo: center - Vec3::splat(radius),
            hi: center + Vec3::splat(radius),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.lo + self.hi) * 0.5
    }

    pub fn half_dim(&self) -> Vec3 {
        (self.hi - self.lo) * 0.5
    }

    /// Grow to cover `pt`.
    pub fn include(&mut self, pt: Vec3) {
        self.lo = self.lo.min(pt);
        self.hi = self.hi.max(pt);
    }

    /// Lo-inclusive, hi-exclusive containment.
    pub fn contains(&self, pt: Vec3) -> bool {
        self.lo.x <= pt.x
            && self.lo.y <= pt.y
            && self.lo.z <= pt.z
            && self.hi.x > pt.x
            && self.hi.y > pt.y
            && self.hi.z > pt.z
    }

    /// Corner `i` of the box; bit 0 selects the high X, bit 1 the high Y,
    /// bit 2 the high Z.
    pub fn corner(&self, i: usize) -> Vec3 {
        Vec3::new(
            if i & 1 == 0 { self.lo.x } else { self.hi.x },
            if i & 2 == 0 { self.lo.y } else { self.hi.y },
            if i & 4 == 0 { self.lo.z } else { self.hi.z },
        )
    }

    /// Open-interval overlap test, with each face of `self` pushed out by
    /// `expand`.
    pub fn overlaps(&self, other: &Aabb, expand: f32) -> bool {
        if other.lo.x >= self.hi.x + expand || other.hi.x <= self.lo.x - expand {
            return false;
        }
        if other.lo.y >= self.hi.y + expand || other.hi.y <= self.lo.y - expand {
            return false;
        }
        if other.lo.z >= self.hi.z + expand || other.hi.z <= self.lo.z - expand {
            return false;
        }
        true
    }

    /// Closest-point sphere overlap, with the sphere radius grown by
    /// `expand`.
    pub fn overlaps_sphere(&self, sphere: &Sphere, expand: f32) -> bool {
        let closest = sphere.center.min(self.hi).max(self.lo);
        let d2 = (closest - sphere.center).length_squared();
        (sphere.radius + expand) * (sphere.radius + expand) >= d2
    }

    /// Slab-method ray test against the box expanded by `expand`.
    ///
    /// `max_d` bounds the search on entry; on a hit it receives the distance
    /// at which the ray enters the box. Near-zero direction components fall
    /// back to a containment check on that axis.
    pub fn intersects_ray(&self, ray: &Ray, max_d: &mut f32, expand: f32) -> bool {
        let mut min_i = 0.0f32;
        let mut max_i = *max_d;
        let lo = self.lo - Vec3::splat(expand);
        let hi = self.hi + Vec3::splat(expand);
        for axis in 0..3 {
            let o = ray.origin[axis];
            let d = ray.direction[axis];
            if d.abs() < 1e-10 {
                if o < lo[axis] || o > hi[axis] {
                    return false;
                }
            } else {
                let inv = 1.0 / d;
                let (near, far) = if d > 0.0 {
                    ((lo[axis] - o) * inv, (hi[axis] - o) * inv)
                } else {
                    ((hi[axis] - o) * inv, (lo[axis] - o) * inv)
                };
                min_i = min_i.max(near);
                max_i = max_i.min(far);
                if min_i >= max_i {
                    return false;
                }
            }
        }
        *max_d = min_i;
        true
    }

    /// The octant sub-box selected by `octant`, given this box's center.
    /// Bit 2 selects the high X half, bit 1 the high Y, bit 0 the high Z.
    pub(crate) fn octant(&self, center: Vec3, octant: usize) -> Aabb {
        Aabb {
            lo: Vec3::new(
                if octant & 4 == 0 { self.lo.x } else { center.x },
                if octant & 2 == 0 { self.lo.y } else { center.y },
                if octant & 1 == 0 { self.lo.z } else { center.z },
            ),
            hi: Vec3::new(
                if octant & 4 == 0 { center.x } else { self.hi.x },
                if octant & 2 == 0 { center.y } else { self.hi.y },
                if octant & 1 == 0 { center.z } else { self.hi.z },
            ),
        }
    }
}
