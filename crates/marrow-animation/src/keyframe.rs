//! Bone pose keyframes — interpolation, additive composition, and matrix conversion

use glam::{Mat3, Mat4, Quat, Vec3};

/// One bone's pose at one point in time: position, orientation and scale,
/// all relative to the parent bone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    /// Offset from parent, in parent space
    pub position: Vec3,
    /// Orientation relative to parent (kept normalized)
    pub orientation: Quat,
    /// Scale relative to parent
    pub scale: Vec3,
}

impl Default for Keyframe {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Keyframe {
    /// A keyframe that applies no scale, rotation or translation.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub const fn new(position: Vec3, orientation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            orientation,
            scale,
        }
    }

    /// Interpolate between two keyframes.
    ///
    /// Position and scale interpolate linearly. Orientation uses lerp plus
    /// normalization rather than slerp: keyframes are sampled densely enough
    /// that the angular velocity error is very small, and lerp is a lot
    /// cheaper. Interpolation always takes the short way around. `t` is not
    /// clamped; callers may extrapolate.
    pub fn interpolate(left: &Keyframe, right: &Keyframe, t: f32) -> Keyframe {
        let mut b = right.orientation;
        if left.orientation.dot(b) < 0.0 {
            b = -b;
        }
        Keyframe {
            position: left.position + (right.position - left.position) * t,
            orientation: (left.orientation + (b - left.orientation) * t).normalize(),
            scale: left.scale + (right.scale - left.scale) * t,
        }
    }

    /// Given a base keyframe and a "delta" keyframe, build the keyframe that
    /// represents the base transformation followed by `weight` worth of the
    /// delta. Used for additive layers (idle + wave, say).
    pub fn compose(first: &Keyframe, second: &Keyframe, weight: f32) -> Keyframe {
        let delta = Keyframe::interpolate(&Keyframe::IDENTITY, second, weight);
        Keyframe {
            position: first.position + first.orientation * delta.position,
            // apply first's frame, then the delta in that frame
            orientation: delta.orientation * first.orientation,
            scale: first.scale * delta.scale,
        }
    }

    /// Measure how different two keyframes are, as a single scalar.
    ///
    /// 0.01 is intended to be largely imperceptible; 1.0 is a big difference
    /// (it can be much bigger). Never negative, and 0 for identical frames.
    /// Rotational difference dominates by construction.
    pub fn difference_from(&self, other: &Keyframe) -> f32 {
        let dp = (self.position - other.position).length();
        let ds = (self.scale - other.scale).length();
        let m1 = Mat3::from_quat(self.orientation);
        let m2 = Mat3::from_quat(other.orientation);
        let dr = ((m1.x_axis - m2.x_axis).length()
            + (m1.y_axis - m2.y_axis).length()
            + (m1.z_axis - m2.z_axis).length())
        .powi(4)
            * 100_000.0;
        dp + ds + dr
    }

    /// Convert to a matrix, in order scale, rotation, translation.
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.orientation, self.position)
    }

    /// Decompose a matrix into a scale/rotation/translation keyframe.
    ///
    /// Works for matrices without shear or off-axis scale. Rotation cannot be
    /// recovered when any scale axis is within 1e-6 of zero; it is left as
    /// identity in that case, so don't scale down by more than about
    /// 1/10,000. A decomposition whose round trip misses the original by more
    /// than 0.02 in any element is logged and returned as-is.
    pub fn from_matrix(m: &Mat4) -> Keyframe {
        let x = m.x_axis.truncate();
        let y = m.y_axis.truncate();
        let z = m.z_axis.truncate();
        let mut scale = Vec3::new(x.length(), y.length(), z.length());
        let position = m.w_axis.truncate();
        let mut orientation = Quat::IDENTITY;
        if scale.x.abs() > 1e-6 && scale.y.abs() > 1e-6 && scale.z.abs() > 1e-6 {
            let right = x.normalize();
            let up = (y - right * y.dot(right)).normalize();
            let backward = right.cross(up);
            if z.dot(backward) < 0.0 {
                // mirrored basis
                scale.z = -scale.z;
            }
            orientation = Quat::from_mat3(&Mat3::from_cols(right, up, backward));
        }
        let ret = Keyframe::new(position, orientation, scale);
        let back = ret.to_matrix().to_cols_array();
        let orig = m.to_cols_array();
        for i in 0..16 {
            if (back[i] - orig[i]).abs() > 0.02 {
                log::warn!("matrix could not be cleanly decomposed into a TRS keyframe");
                break;
            }
        }
        ret
    }
}
