//! Playback state for one animation on one model

use crate::animation::Animation;
use crate::keyframe::Keyframe;
use crate::source::AnimationSource;
use std::sync::Arc;

/// An `AnimationInstance` is what actually "plays" an animation: it owns the
/// clock, the playback speed and direction, the looping flag, and a cached
/// pose recomputed lazily whenever the clock moves.
pub struct AnimationInstance {
    animation: Arc<Animation>,
    frame_rate: f32,
    /// Duration in seconds, including the duration of the last frame itself.
    duration: f32,
    /// The last frame starts somewhat before the animation's full duration.
    last_frame_time: f32,
    time: f32,
    speed: f32,
    looping: bool,
    playing: bool,
    end_reached: bool,
    /// Cached pose, one slot per bone up to the highest animated bone index.
    keyframes: Vec<Option<Keyframe>>,
    /// The time the cache was computed at; `None` forces a recompute.
    applied_time: Option<f32>,
}

impl AnimationInstance {
    pub fn new(animation: Arc<Animation>) -> Self {
        let frame_rate = animation.frame_rate();
        let duration = animation.num_frames() as f32 / frame_rate;
        let last_frame_time = (animation.num_frames().saturating_sub(1)) as f32 / frame_rate;
        let bone_slots = animation.max_bone_index().map_or(0, |max| max + 1);
        Self {
            animation,
            frame_rate,
            duration,
            last_frame_time,
            time: 0.0,
            speed: 1.0,
            looping: true,
            playing: true,
            end_reached: false,
            keyframes: vec![None; bone_slots],
            applied_time: None,
        }
    }

    pub fn animation(&self) -> &Arc<Animation> {
        &self.animation
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn last_frame_time(&self) -> f32 {
        self.last_frame_time
    }

    /// Current time position, in the range `[0, duration)`.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn set_time(&mut self, time: f32) {
        if self.duration > 0.0 {
            (self.time, _) = wrap(time, 0.0, self.duration);
        }
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Animations play at any speed, including backwards.
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    pub fn looping(&self) -> bool {
        self.looping
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    pub fn playing(&self) -> bool {
        self.playing
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    /// Advance playback by `dt` seconds of real time, scaled by `speed`.
    ///
    /// Firing the end notification does not reset the clock: a one-shot
    /// animation freezes on its final frame rather than snapping back to
    /// frame zero.
    pub fn advance(&mut self, dt: f32) {
        if !self.playing || self.duration <= 0.0 {
            return;
        }
        let (wrapped_time, wrapped) = wrap(self.time + dt * self.speed, 0.0, self.duration);
        if wrapped && !self.looping {
            // freeze at the logical end instead of wrapping around
            self.time = if self.speed >= 0.0 {
                self.last_frame_time
            } else {
                0.0
            };
            self.on_end_reached();
        } else {
            self.time = wrapped_time;
            if wrapped {
                self.on_end_reached();
            } else if !self.looping && self.speed > 0.0 && self.time >= self.last_frame_time {
                self.on_end_reached();
            }
        }
    }

    fn on_end_reached(&mut self) {
        // the object should stay in its final pose
        if !self.looping {
            self.playing = false;
        }
        self.end_reached = true;
    }

    /// Poll the end-of-playback notification. Fires when the animation plays
    /// to its end and either stops or loops; consumed by the call.
    pub fn take_end_reached(&mut self) -> bool {
        std::mem::take(&mut self.end_reached)
    }

    /// The pose at the current time, one slot per bone; recomputed only when
    /// the clock moved since the last request.
    pub fn current_pose(&mut self) -> &[Option<Keyframe>] {
        if self.applied_time != Some(self.time) {
            self.calculate_keyframes();
        }
        &self.keyframes
    }

    /// If animation data changed underneath the instance, `invalidate` forces
    /// the pose to be recalculated even when `advance` leaves the clock alone.
    pub fn invalidate(&mut self) {
        self.applied_time = None;
    }

    /// Stop playback and set the time to the logical start of the animation
    /// (which is the end, when playing backwards).
    pub fn reset(&mut self) {
        self.playing = false;
        self.time = if self.speed < 0.0 {
            self.last_frame_time
        } else {
            0.0
        };
    }

    /// Convert a timestamp to a base frame number and a fractional blend
    /// factor toward the next frame. Does no wrapping.
    pub fn frame_from_time(&self, time: f32) -> (usize, f32) {
        let f = time * self.frame_rate;
        let frame = f as usize;
        let frac = f - frame as f32;
        debug_assert!((0.0..=1.0).contains(&frac));
        (frame, frac)
    }

    /// Calculate every bone's keyframe for the current time.
    ///
    /// Tracks are sparse, so the bracketing keyframes may sit several slots
    /// away on either side; the blend fraction is re-derived from how many
    /// empty slots were skipped so interpolation stays linear across gaps.
    fn calculate_keyframes(&mut self) {
        self.applied_time = Some(self.time);
        let (frame, frac_orig) = self.frame_from_time(self.time);
        for (bone, track) in self.animation.tracks() {
            let kfs = track.keyframes();
            let len = kfs.len();
            let mut f1 = frame;
            let mut f2 = frame + 1;
            let mut nprev = 0usize;
            let mut npost = 0usize;
            // clamp onto the available frames (this track may be shorter
            // than the longest one)
            if f1 >= len {
                nprev = f1 - len + 1;
                f1 = len - 1;
            }
            if f2 >= len {
                npost = f2 - len;
                f2 = 0;
            }
            while kfs[f1].is_none() {
                // first and last slots always hold keyframes
                debug_assert!(f1 > 0 && f1 != len - 1);
                f1 -= 1;
                nprev += 1;
            }
            // a one-shot animation must not blend its end into its start
            if !self.looping && f2 == 0 {
                f2 = len - 1;
            }
            while kfs[f2].is_none() {
                debug_assert!(f2 < len - 1 && f2 != 0);
                f2 += 1;
                npost += 1;
            }
            let mut frac = frac_orig;
            if nprev != 0 || npost != 0 {
                frac = (nprev as f32 + frac) / ((nprev + npost + 1) as f32);
            }
            if let (Some(a), Some(b)) = (&kfs[f1], &kfs[f2]) {
                self.keyframes[bone] = Some(Keyframe::interpolate(a, b, frac));
            }
        }
    }
}

impl AnimationSource for AnimationInstance {
    fn advance(&mut self, dt: f32) {
        AnimationInstance::advance(self, dt);
    }

    fn current_pose(&mut self) -> &[Option<Keyframe>] {
        AnimationInstance::current_pose(self)
    }

    fn name(&self) -> &str {
        self.animation.name()
    }

    fn complete(&self) -> bool {
        !self.playing
    }
}

/// Wrap a value into the interval `[min, max)`.
///
/// Returns the wrapped value and whether wrapping changed it. A single
/// modulo handles arbitrarily large overshoot; values already inside the
/// interval pass through untouched.
pub fn wrap(val: f32, min: f32, max: f32) -> (f32, bool) {
    debug_assert!(max > min);
    if val < min {
        let mut out = (val - min) % (max - min) + min;
        if out < min {
            out += max - min;
        }
        (out, true)
    } else if val > max {
        ((val - min) % (max - min) + min, true)
    } else {
        (val, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::AnimationTrack;
    use glam::{Quat, Vec3};
    use std::collections::BTreeMap;

    fn key(x: f32) -> Keyframe {
        Keyframe::new(Vec3::new(x, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE)
    }

    /// Four frames at 1 fps: duration 4s, last frame at t = 3s, pos.x == frame.
    fn test_animation() -> Arc<Animation> {
        let frames = vec![Some(key(0.0)), Some(key(1.0)), Some(key(2.0)), Some(key(3.0))];
        let mut tracks = BTreeMap::new();
        tracks.insert(0, AnimationTrack::new(0, "root", frames).unwrap());
        Arc::new(Animation::new("walk", tracks, 1.0, None))
    }

    fn pose_x(instance: &mut AnimationInstance) -> f32 {
        instance.current_pose()[0].unwrap().position.x
    }

    #[test]
    fn wrap_leaves_in_range_values_alone() {
        assert_eq!(wrap(1.5, 0.0, 4.0), (1.5, false));
        assert_eq!(wrap(0.0, 0.0, 4.0), (0.0, false));
    }

    #[test]
    fn wrap_handles_large_overshoot_in_one_step() {
        let (v, changed) = wrap(10.5, 0.0, 4.0);
        assert!(changed);
        assert!((v - 2.5).abs() < 1e-6);
        let (v, changed) = wrap(-0.5, 0.0, 4.0);
        assert!(changed);
        assert!((v - 3.5).abs() < 1e-6);
    }

    #[test]
    fn one_shot_overshoot_freezes_on_last_frame() {
        let mut inst = AnimationInstance::new(test_animation());
        inst.set_looping(false);
        inst.advance(inst.duration() + 1.0);
        assert_eq!(inst.time(), inst.last_frame_time());
        assert!(!inst.playing());
        assert!(inst.complete());
        assert!(inst.take_end_reached());
        // the notification fired exactly once
        inst.advance(1.0);
        assert!(!inst.take_end_reached());
        assert!((pose_x(&mut inst) - 3.0).abs() < 1e-5);
    }

    #[test]
    fn looping_wraps_without_stopping() {
        let mut inst = AnimationInstance::new(test_animation());
        inst.advance(inst.duration() * 2.5);
        assert!(inst.playing());
        assert!(inst.time() >= 0.0 && inst.time() < inst.duration());
        assert!(inst.take_end_reached());
    }

    #[test]
    fn pose_interpolates_between_frames() {
        let mut inst = AnimationInstance::new(test_animation());
        inst.advance(1.5);
        assert!((pose_x(&mut inst) - 1.5).abs() < 1e-5);
    }

    #[test]
    fn pose_is_cached_until_time_moves() {
        let mut inst = AnimationInstance::new(test_animation());
        inst.advance(1.0);
        let first = pose_x(&mut inst);
        let second = pose_x(&mut inst);
        assert_eq!(first, second);
        inst.invalidate();
        assert_eq!(pose_x(&mut inst), first);
    }

    #[test]
    fn sparse_track_interpolates_across_gaps() {
        let frames = vec![Some(key(0.0)), None, None, Some(key(3.0))];
        let mut tracks = BTreeMap::new();
        tracks.insert(0, AnimationTrack::new(0, "root", frames).unwrap());
        let anim = Arc::new(Animation::new("slide", tracks, 1.0, None));
        let mut inst = AnimationInstance::new(anim);
        inst.advance(1.0);
        // bracketing frames are 0 and 3; one empty slot behind, one ahead
        assert!((pose_x(&mut inst) - 1.0).abs() < 1e-5);
        inst.advance(1.0);
        assert!((pose_x(&mut inst) - 2.0).abs() < 1e-5);
    }

    #[test]
    fn one_shot_does_not_blend_end_into_start() {
        let mut inst = AnimationInstance::new(test_animation());
        inst.set_looping(false);
        // time 3.5 sits past the last frame; the pose must hold frame 3
        inst.set_time(3.5);
        assert!((pose_x(&mut inst) - 3.0).abs() < 1e-5);
    }

    #[test]
    fn looping_blends_end_into_start() {
        let mut inst = AnimationInstance::new(test_animation());
        inst.set_time(3.5);
        // halfway from frame 3 (x=3) back around to frame 0 (x=0)
        assert!((pose_x(&mut inst) - 1.5).abs() < 1e-5);
    }

    #[test]
    fn backward_playback_wraps_and_notifies() {
        let mut inst = AnimationInstance::new(test_animation());
        inst.set_speed(-1.0);
        inst.advance(0.5);
        assert!(inst.take_end_reached());
        assert!((inst.time() - 3.5).abs() < 1e-5);
    }

    #[test]
    fn backward_one_shot_freezes_at_start() {
        let mut inst = AnimationInstance::new(test_animation());
        inst.set_speed(-1.0);
        inst.set_looping(false);
        inst.set_time(1.0);
        inst.advance(2.0);
        assert_eq!(inst.time(), 0.0);
        assert!(!inst.playing());
        assert!(inst.take_end_reached());
    }

    #[test]
    fn reset_respects_direction() {
        let mut inst = AnimationInstance::new(test_animation());
        inst.advance(2.0);
        inst.reset();
        assert_eq!(inst.time(), 0.0);
        assert!(!inst.playing());

        let mut rev = AnimationInstance::new(test_animation());
        rev.set_speed(-2.0);
        rev.reset();
        assert_eq!(rev.time(), rev.last_frame_time());
    }

    #[test]
    fn stopped_instance_ignores_advance() {
        let mut inst = AnimationInstance::new(test_animation());
        inst.set_playing(false);
        inst.advance(2.0);
        assert_eq!(inst.time(), 0.0);
    }

    #[test]
    fn short_track_clamps_to_its_own_length() {
        // track 0 runs 4 frames, track 1 only 2; animation length is 4
        let mut tracks = BTreeMap::new();
        tracks.insert(
            0,
            AnimationTrack::new(
                0,
                "root",
                vec![Some(key(0.0)), Some(key(1.0)), Some(key(2.0)), Some(key(3.0))],
            )
            .unwrap(),
        );
        tracks.insert(
            1,
            AnimationTrack::new(1, "tip", vec![Some(key(10.0)), Some(key(11.0))]).unwrap(),
        );
        let anim = Arc::new(Animation::new("walk", tracks, 1.0, None));
        let mut inst = AnimationInstance::new(anim);
        inst.set_looping(false);
        inst.set_time(3.0);
        let pose = inst.current_pose();
        assert!((pose[0].unwrap().position.x - 3.0).abs() < 1e-5);
        // the short track holds its final keyframe
        assert!((pose[1].unwrap().position.x - 11.0).abs() < 1e-5);
    }
}
