//! An animation: a named collection of per-bone tracks plus timing information

use crate::track::AnimationTrack;
use std::collections::BTreeMap;

/// A collection of animation tracks targeting different bones, with a frame
/// rate and a total frame count. Immutable once built; share between playback
/// instances through an `Arc`.
///
/// Bone indices come from the skeleton and may be sparse and large, so tracks
/// live in an ordered map rather than a dense array.
#[derive(Debug, Clone)]
pub struct Animation {
    name: String,
    frame_rate: f32,
    num_frames: usize,
    tracks: BTreeMap<usize, AnimationTrack>,
}

impl Animation {
    /// Build an animation from its tracks. When `num_frames` is `None` the
    /// frame count is the maximum over all tracks.
    pub fn new(
        name: impl Into<String>,
        tracks: BTreeMap<usize, AnimationTrack>,
        frame_rate: f32,
        num_frames: Option<usize>,
    ) -> Self {
        debug_assert!(frame_rate > 0.0);
        let num_frames = num_frames
            .unwrap_or_else(|| tracks.values().map(AnimationTrack::num_frames).max().unwrap_or(0));
        Self {
            name: name.into(),
            frame_rate,
            num_frames,
            tracks,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frame_rate(&self) -> f32 {
        self.frame_rate
    }

    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    pub fn track_by_bone_index(&self, index: usize) -> Option<&AnimationTrack> {
        self.tracks.get(&index)
    }

    pub fn tracks(&self) -> impl Iterator<Item = (usize, &AnimationTrack)> {
        self.tracks.iter().map(|(&bone, track)| (bone, track))
    }

    pub fn num_tracks(&self) -> usize {
        self.tracks.len()
    }

    /// Highest bone index any track targets, if there are tracks at all.
    pub fn max_bone_index(&self) -> Option<usize> {
        self.tracks.keys().next_back().copied()
    }
}
