//! Oriented bounding boxes

use crate::aabb::Aabb;
use glam::{Mat3, Quat, Vec3};

/// A box with arbitrary orientation, described by half-extents, a center
/// position and an orientation quaternion. The orientation matrix and its
/// inverse are cached and refreshed whenever the orientation changes.
#[derive(Debug, Clone, Copy)]
pub struct Obb {
    pub half_dim: Vec3,
    pub pos: Vec3,
    orientation: Quat,
    ori_matrix: Mat3,
    inv_ori_matrix: Mat3,
}

impl Obb {
    pub fn new(half_dim: Vec3, pos: Vec3, orientation: Quat) -> Self {
        let ori_matrix = Mat3::from_quat(orientation);
        Self {
            half_dim,
            pos,
            orientation,
            ori_matrix,
            inv_ori_matrix: ori_matrix.transpose(),
        }
    }

    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    pub fn set_orientation(&mut self, orientation: Quat) {
        self.orientation = orientation;
        self.ori_matrix = Mat3::from_quat(orientation);
        self.inv_ori_matrix = self.ori_matrix.transpose();
    }

    /// Take a world-space offset from the box center into the box's local
    /// frame.
    pub(crate) fn to_local(&self, v: Vec3) -> Vec3 {
        self.inv_ori_matrix * v
    }

    /// Conservative overlap against an AABB expanded by `expand`: projects
    /// the box extents onto the world axes. A separating axis in the OBB's
    /// own frame or across an edge pair is not checked, so false positives
    /// are possible; false negatives are not.
    pub fn overlaps(&self, aabb: &Aabb, expand: f32) -> bool {
        for axis in 0..3 {
            let reach = self.ori_matrix.x_axis[axis].abs() * self.half_dim.x
                + self.ori_matrix.y_axis[axis].abs() * self.half_dim.y
                + self.ori_matrix.z_axis[axis].abs() * self.half_dim.z;
            if self.pos[axis] + reach < aabb.lo[axis] - expand
                || self.pos[axis] - reach > aabb.hi[axis] + expand
            {
                return false;
            }
        }
        true
    }
}
