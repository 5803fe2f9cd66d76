//! Build-time keyframe reduction and animation trimming
//!
//! Densely sampled tracks carry a lot of redundant data. Reduction empties
//! any interior slot whose pose is reproduced (within tolerance) by
//! interpolating its surviving neighbors; playback interpolates across the
//! gaps. Trimming cuts static padding off the end of an animation.

use crate::keyframe::Keyframe;
use crate::track::AnimationTrack;
use std::collections::BTreeMap;

/// Differences below this are treated as imperceptible.
pub const DEFAULT_TOLERANCE: f32 = 0.001;

/// Turn a densely sampled run of keyframes into a sparse one.
///
/// Walks the interior frames and empties each one whose value interpolates
/// from the previous kept frame and the next frame to within `tolerance`.
/// The first and last frames are always kept.
pub fn reduce_keyframes(frames: &[Keyframe], tolerance: f32) -> Vec<Option<Keyframe>> {
    let mut out: Vec<Option<Keyframe>> = frames.iter().copied().map(Some).collect();
    let n = frames.len();
    if n < 3 {
        return out;
    }
    let mut removed = 0usize;
    let mut prev = 0usize;
    for cur in 1..n - 1 {
        let next = cur + 1;
        let lerp = Keyframe::interpolate(
            &frames[prev],
            &frames[next],
            (cur - prev) as f32 / (next - prev) as f32,
        );
        if lerp.difference_from(&frames[cur]) < tolerance {
            out[cur] = None;
            removed += 1;
        } else {
            prev = cur;
        }
    }
    if removed > 0 {
        log::debug!("reduced {removed} of {n} keyframes");
    }
    out
}

/// Find the latest frame that carries unique data in any track, and chop
/// every track down to that length. Some exporters pad short animations with
/// static frames; this removes the padding.
///
/// Returns the new frame count when anything was trimmed.
pub fn trim_animation_tracks(
    name: &str,
    tracks: &mut BTreeMap<usize, AnimationTrack>,
    tolerance: f32,
) -> Option<usize> {
    let mut latest_unique = 1usize;
    let mut latest_frame = 0usize;
    for track in tracks.values() {
        let kfs = track.keyframes();
        latest_frame = latest_frame.max(kfs.len());
        let Some(mut last) = kfs[0] else { continue };
        let mut latest_current = 0usize;
        for (index, slot) in kfs.iter().enumerate() {
            if let Some(kf) = slot {
                if last.difference_from(kf) >= tolerance {
                    latest_current = index;
                    last = *kf;
                }
            }
        }
        latest_unique = latest_unique.max(latest_current);
    }
    if latest_unique + 1 < latest_frame {
        log::debug!(
            "trimming animation {name} from {latest_frame} to {} frames",
            latest_unique + 1
        );
        for track in tracks.values_mut() {
            track.chop_to_length(latest_unique + 1);
        }
        Some(latest_unique + 1)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    fn key(x: f32) -> Keyframe {
        Keyframe::new(Vec3::new(x, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE)
    }

    #[test]
    fn linear_interior_frames_are_removed() {
        let frames: Vec<Keyframe> = (0..5).map(|i| key(i as f32)).collect();
        let out = reduce_keyframes(&frames, DEFAULT_TOLERANCE);
        assert!(out[0].is_some());
        assert!(out[4].is_some());
        assert!(out[1].is_none());
        assert!(out[2].is_none());
        assert!(out[3].is_none());
    }

    #[test]
    fn nonlinear_frames_survive() {
        let frames = vec![key(0.0), key(5.0), key(2.0), key(8.0), key(3.0)];
        let out = reduce_keyframes(&frames, DEFAULT_TOLERANCE);
        assert!(out.iter().all(Option::is_some));
    }

    #[test]
    fn reduced_track_plays_back_the_same() {
        use crate::animation::Animation;
        use crate::instance::AnimationInstance;
        use std::sync::Arc;

        let frames: Vec<Keyframe> = (0..8).map(|i| key(i as f32)).collect();
        let sparse = reduce_keyframes(&frames, DEFAULT_TOLERANCE);
        let mut tracks = BTreeMap::new();
        tracks.insert(0, AnimationTrack::new(0, "root", sparse).unwrap());
        let anim = Arc::new(Animation::new("ramp", tracks, 1.0, None));
        let mut inst = AnimationInstance::new(anim);
        inst.set_looping(false);
        for t in [0.5f32, 2.25, 5.0, 6.75] {
            inst.set_time(t);
            let x = inst.current_pose()[0].unwrap().position.x;
            assert!((x - t).abs() < 1e-4, "at t={t} got x={x}");
        }
    }

    #[test]
    fn short_runs_are_untouched() {
        let frames = vec![key(0.0), key(1.0)];
        let out = reduce_keyframes(&frames, DEFAULT_TOLERANCE);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(Option::is_some));
    }

    #[test]
    fn static_tail_is_trimmed_across_all_tracks() {
        let mut tracks = BTreeMap::new();
        // movement stops after frame 2; three static frames of padding follow
        tracks.insert(
            0,
            AnimationTrack::new(
                0,
                "root",
                vec![
                    Some(key(0.0)),
                    Some(key(1.0)),
                    Some(key(2.0)),
                    Some(key(2.0)),
                    Some(key(2.0)),
                    Some(key(2.0)),
                ],
            )
            .unwrap(),
        );
        tracks.insert(
            1,
            AnimationTrack::new(1, "arm", vec![Some(key(9.0)); 6]).unwrap(),
        );
        let new_len = trim_animation_tracks("punch", &mut tracks, DEFAULT_TOLERANCE);
        assert_eq!(new_len, Some(3));
        assert!(tracks.values().all(|t| t.num_frames() == 3));
    }

    #[test]
    fn fully_animated_tracks_are_not_trimmed() {
        let mut tracks = BTreeMap::new();
        tracks.insert(
            0,
            AnimationTrack::new(
                0,
                "root",
                vec![Some(key(0.0)), Some(key(1.0)), Some(key(2.0))],
            )
            .unwrap(),
        );
        assert_eq!(
            trim_animation_tracks("walk", &mut tracks, DEFAULT_TOLERANCE),
            None
        );
        assert_eq!(tracks[&0].num_frames(), 3);
    }
}
