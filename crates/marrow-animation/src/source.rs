//! The seam between things that produce poses and things that consume them

use crate::keyframe::Keyframe;

/// Anything that can be advanced through time and asked for a pose: a plain
/// playback instance, or a whole blender feeding into another blender.
///
/// The pose is one slot per bone; `None` means the source does not animate
/// that bone and its transform should be left alone.
pub trait AnimationSource {
    /// Advance the source by `dt` seconds of real time.
    fn advance(&mut self, dt: f32);

    /// The current pose, recomputed lazily if the time moved since the last
    /// request.
    fn current_pose(&mut self) -> &[Option<Keyframe>];

    /// Name of the animation (like "walk"), for diagnostics.
    fn name(&self) -> &str;

    /// True when the source has played out (never true while looping).
    fn complete(&self) -> bool;
}
