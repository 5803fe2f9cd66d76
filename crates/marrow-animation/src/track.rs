//! One track of animation data: a sparse run of keyframes over time for a single bone

use crate::keyframe::Keyframe;
use marrow_core::{MarrowError, Result};

/// A sparse, ordered run of keyframes for one bone.
///
/// Not every frame slot carries data — keyframe reduction leaves gaps that
/// playback re-interpolates across — but the first and last slots are always
/// populated. That invariant is checked once at construction, not per access.
#[derive(Debug, Clone)]
pub struct AnimationTrack {
    bone_index: usize,
    name: String,
    keyframes: Vec<Option<Keyframe>>,
}

impl AnimationTrack {
    pub fn new(
        bone_index: usize,
        name: impl Into<String>,
        keyframes: Vec<Option<Keyframe>>,
    ) -> Result<Self> {
        let name = name.into();
        if keyframes.is_empty() {
            return Err(MarrowError::InvalidTrack(format!(
                "track '{name}' has no keyframes"
            )));
        }
        if keyframes[0].is_none() || keyframes[keyframes.len() - 1].is_none() {
            return Err(MarrowError::InvalidTrack(format!(
                "track '{name}' must have keyframes in its first and last slots"
            )));
        }
        Ok(Self {
            bone_index,
            name,
            keyframes,
        })
    }

    pub fn bone_index(&self) -> usize {
        self.bone_index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keyframes(&self) -> &[Option<Keyframe>] {
        &self.keyframes
    }

    pub fn num_frames(&self) -> usize {
        self.keyframes.len()
    }

    /// Truncate the track to `length` frames. If the new final slot is empty,
    /// the first keyframe past the cut is pulled in to fill it, keeping the
    /// last-slot invariant. Never extends the track.
    pub fn chop_to_length(&mut self, length: usize) {
        assert!(length >= 1, "cannot chop a track to zero frames");
        if length >= self.keyframes.len() {
            return;
        }
        if self.keyframes[length - 1].is_none() {
            let carried = self.keyframes[length..].iter().find_map(|k| *k);
            debug_assert!(carried.is_some());
            self.keyframes[length - 1] = carried;
        }
        self.keyframes.truncate(length);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use glam::Quat;

    fn key(x: f32) -> Keyframe {
        Keyframe::new(Vec3::new(x, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE)
    }

    #[test]
    fn rejects_empty_and_open_ended_tracks() {
        assert!(AnimationTrack::new(0, "spine", vec![]).is_err());
        assert!(AnimationTrack::new(0, "spine", vec![None, Some(key(1.0))]).is_err());
        assert!(AnimationTrack::new(0, "spine", vec![Some(key(0.0)), None]).is_err());
        assert!(AnimationTrack::new(0, "spine", vec![Some(key(0.0))]).is_ok());
    }

    #[test]
    fn chop_truncates_and_keeps_populated_end() {
        let mut track = AnimationTrack::new(
            3,
            "arm",
            vec![Some(key(0.0)), Some(key(1.0)), Some(key(2.0)), Some(key(3.0))],
        )
        .unwrap();
        track.chop_to_length(2);
        assert_eq!(track.num_frames(), 2);
        assert_eq!(track.keyframes()[1], Some(key(1.0)));
    }

    #[test]
    fn chop_pulls_later_keyframe_into_empty_final_slot() {
        let mut track = AnimationTrack::new(
            0,
            "arm",
            vec![Some(key(0.0)), Some(key(1.0)), None, None, Some(key(4.0))],
        )
        .unwrap();
        track.chop_to_length(3);
        assert_eq!(track.num_frames(), 3);
        // the slot at index 2 was empty; the keyframe from index 4 fills it
        assert_eq!(track.keyframes()[2], Some(key(4.0)));
    }

    #[test]
    fn chop_to_longer_length_is_a_no_op() {
        let mut track =
            AnimationTrack::new(0, "arm", vec![Some(key(0.0)), Some(key(1.0))]).unwrap();
        track.chop_to_length(10);
        assert_eq!(track.num_frames(), 2);
    }
}
