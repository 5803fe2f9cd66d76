//! Blending and composing several playing animations into one pose per frame
//!
//! You typically create one `AnimationBlender` per character, wrap each
//! playing animation in a `BlendedAnimation`, and add it to the blender. Each
//! update tick you call `advance()`; each draw you read `current_pose()` and
//! apply it to your bone array.

use crate::keyframe::Keyframe;
use crate::source::AnimationSource;
use glam::Mat4;

/// How an entry contributes to the final pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendType {
    /// All normalized-blend entries are interpolated to a total weight of
    /// 1.0. Useful for blending between walk and run, say.
    NormalizedBlend,
    /// Compose entries are "added" on top of the blended result. Useful for
    /// layering a wave onto an idle, say.
    Compose,
}

/// A playable wrapped for membership in an `AnimationBlender`.
///
/// Build one with [`BlendedAnimation::blended`] or
/// [`BlendedAnimation::composed`], then hand it to
/// [`AnimationBlender::add_animation`]. Attaching moves the entry into the
/// blender, so an entry can only ever belong to one blender at a time.
pub struct BlendedAnimation {
    source: Box<dyn AnimationSource>,
    blend_type: BlendType,
}

impl BlendedAnimation {
    /// Wrap an animation source for weighted (normalized) blending.
    pub fn blended(source: Box<dyn AnimationSource>) -> Self {
        Self {
            source,
            blend_type: BlendType::NormalizedBlend,
        }
    }

    /// Wrap an animation source for additive composition.
    pub fn composed(source: Box<dyn AnimationSource>) -> Self {
        Self {
            source,
            blend_type: BlendType::Compose,
        }
    }

    pub fn blend_type(&self) -> BlendType {
        self.blend_type
    }
}

/// Identifies an entry inside one `AnimationBlender` after it has been added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendHandle(u64);

struct BlendEntry {
    id: u64,
    source: Box<dyn AnimationSource>,
    weight: f32,
}

/// A crossfade in flight: ramps `from` down to zero weight and `to` up to its
/// target over `duration` seconds of wall-clock time.
#[derive(Debug, Clone, Copy)]
struct Transition {
    from: Option<u64>,
    to: Option<u64>,
    from_weight: f32,
    to_weight: f32,
    duration: f32,
    elapsed: f32,
}

/// Combines any number of blended and composed animations into a single
/// per-bone output pose, with timed transitions between them.
pub struct AnimationBlender {
    name: String,
    bind_pose: Vec<Keyframe>,
    keyframes: Vec<Option<Keyframe>>,
    blended: Vec<BlendEntry>,
    composed: Vec<BlendEntry>,
    transitions: Vec<Transition>,
    next_id: u64,
}

impl AnimationBlender {
    /// Create a blender targeting a skeleton described by its per-bone local
    /// bind transforms. The bind pose seeds the output for every bone and is
    /// restored by `reset()`.
    pub fn new(name: impl Into<String>, bind_pose: &[Mat4]) -> Self {
        let bind: Vec<Keyframe> = bind_pose.iter().map(Keyframe::from_matrix).collect();
        let keyframes = bind.iter().map(|k| Some(*k)).collect();
        Self {
            name: name.into(),
            bind_pose: bind,
            keyframes,
            blended: Vec::new(),
            composed: Vec::new(),
            transitions: Vec::new(),
            next_id: 1,
        }
    }

    pub fn bone_count(&self) -> usize {
        self.bind_pose.len()
    }

    /// True when there are no attached animations left, blended or composed.
    /// Callers use this to know a blender can be discarded or re-seeded.
    pub fn complete(&self) -> bool {
        self.blended.is_empty() && self.composed.is_empty()
    }

    /// Remove all playing animations and transitions and restore the bind
    /// pose as the output.
    pub fn reset(&mut self) {
        self.keyframes = self.bind_pose.iter().map(|k| Some(*k)).collect();
        self.blended.clear();
        self.composed.clear();
        self.transitions.clear();
    }

    /// Add an animation that keeps playing until removed or transitioned out.
    /// Routes to the blend or compose list based on the entry's type.
    pub fn add_animation(&mut self, entry: BlendedAnimation, weight: f32) -> BlendHandle {
        let BlendedAnimation { source, blend_type } = entry;
        let id = self.next_id;
        self.next_id += 1;
        let entry = BlendEntry { id, source, weight };
        match blend_type {
            BlendType::NormalizedBlend => self.blended.push(entry),
            BlendType::Compose => self.composed.push(entry),
        }
        BlendHandle(id)
    }

    /// Remove an animation from the blender, stopping its contribution.
    ///
    /// The handle must refer to a current member. Any transition that still
    /// references the entry is told, so it can drop the dangling side —
    /// removing a transition's `from` completes the transition on the next
    /// advance and snaps its `to` weight to 1.
    ///
    /// # Panics
    /// Panics if the entry is not attached to this blender.
    pub fn remove_animation(&mut self, handle: BlendHandle) {
        assert!(
            self.remove_entry(handle.0),
            "removed an animation that is not attached to this blender"
        );
    }

    /// Current weight of an attached entry.
    ///
    /// # Panics
    /// Panics if the entry is not attached to this blender.
    pub fn weight(&self, handle: BlendHandle) -> f32 {
        self.entry(handle.0)
            .expect("blend entry is not attached to this blender")
            .weight
    }

    /// Set the weight of an attached entry. While a transition owns an entry
    /// its weight is ramped automatically and there is no need to call this.
    ///
    /// # Panics
    /// Panics if the entry is not attached to this blender.
    pub fn set_weight(&mut self, handle: BlendHandle, weight: f32) {
        self.entry_mut(handle.0)
            .expect("blend entry is not attached to this blender")
            .weight = weight;
    }

    /// Over `duration` seconds, fade out `from` (ending in its removal) and
    /// fade `to` in from zero weight up to full. Either side may be absent.
    /// `to` is added to the blender immediately at weight 0; its handle is
    /// returned.
    ///
    /// When the last running animation transitions to nothing, the
    /// re-normalization to weight 1.0 keeps it playing at full influence
    /// until the duration runs out; transition to a short stationary
    /// animation instead for things that should come to rest.
    pub fn transition_animations(
        &mut self,
        from: Option<BlendHandle>,
        to: Option<BlendedAnimation>,
        duration: f32,
    ) -> Option<BlendHandle> {
        let to_handle = to.map(|entry| self.add_animation(entry, 0.0));
        let from_weight = from.map_or(0.0, |h| self.weight(h));
        self.transitions.push(Transition {
            from: from.map(|h| h.0),
            to: to_handle.map(|h| h.0),
            from_weight,
            to_weight: 1.0,
            duration,
            elapsed: 0.0,
        });
        to_handle
    }

    /// Advance all attached animations by `dt` seconds.
    ///
    /// Order per tick: transitions ramp weights (finished ones are removed),
    /// then the normalized blends combine with incremental re-normalized
    /// interpolation, then composes apply additively in insertion order.
    /// Bones no entry animates keep their previous output value.
    pub fn advance(&mut self, dt: f32) {
        self.update_transitions(dt);

        // normalized blends: the first non-zero entry seeds the output, each
        // later one re-interpolates toward its pose by weight / running total
        let mut running_weight = 0.0f32;
        for entry in self.blended.iter_mut() {
            entry.source.advance(dt);
            let wt = entry.weight;
            if wt == 0.0 {
                continue;
            }
            let pose = entry.source.current_pose();
            let n = pose.len().min(self.keyframes.len());
            if running_weight == 0.0 {
                running_weight = wt.abs();
                for i in 0..n {
                    if let Some(k) = &pose[i] {
                        self.keyframes[i] = Some(*k);
                    }
                }
            } else {
                running_weight += wt.abs();
                let t = wt / running_weight;
                for i in 0..n {
                    if let (Some(k), Some(out)) = (&pose[i], &mut self.keyframes[i]) {
                        *out = Keyframe::interpolate(out, k, t);
                    }
                }
            }
        }

        // composes build on the running result sequentially, in list order
        for entry in self.composed.iter_mut() {
            entry.source.advance(dt);
            let w = entry.weight;
            if w == 0.0 {
                continue;
            }
            let pose = entry.source.current_pose();
            let n = pose.len().min(self.keyframes.len());
            for i in 0..n {
                if let (Some(k), Some(out)) = (&pose[i], &mut self.keyframes[i]) {
                    *out = Keyframe::compose(out, k, w);
                }
            }
        }
    }

    fn update_transitions(&mut self, dt: f32) {
        let mut ti = 0;
        while ti < self.transitions.len() {
            let mut t = self.transitions[ti];
            t.elapsed += dt;
            let from_complete = t
                .from
                .is_some_and(|id| self.entry(id).is_some_and(|e| e.source.complete()));
            let to_complete = t
                .to
                .is_some_and(|id| self.entry(id).is_some_and(|e| e.source.complete()));
            if t.elapsed >= t.duration || from_complete || to_complete {
                if let Some(id) = t.from {
                    self.remove_entry(id);
                }
                if let Some(id) = t.to {
                    if let Some(entry) = self.entry_mut(id) {
                        entry.weight = 1.0;
                    }
                }
                self.transitions.remove(ti);
            } else {
                let delta = t.elapsed / t.duration;
                if let Some(id) = t.from {
                    if let Some(entry) = self.entry_mut(id) {
                        entry.weight = t.from_weight * (1.0 - delta);
                    }
                }
                if let Some(id) = t.to {
                    if let Some(entry) = self.entry_mut(id) {
                        entry.weight = t.to_weight * delta;
                    }
                }
                self.transitions[ti] = t;
                ti += 1;
            }
        }
    }

    fn entry(&self, id: u64) -> Option<&BlendEntry> {
        self.blended
            .iter()
            .chain(self.composed.iter())
            .find(|e| e.id == id)
    }

    fn entry_mut(&mut self, id: u64) -> Option<&mut BlendEntry> {
        self.blended
            .iter_mut()
            .chain(self.composed.iter_mut())
            .find(|e| e.id == id)
    }

    /// Drop the entry with the given id and tell every transition. Returns
    /// false when no such entry is attached.
    fn remove_entry(&mut self, id: u64) -> bool {
        let found = if let Some(pos) = self.blended.iter().position(|e| e.id == id) {
            self.blended.remove(pos);
            true
        } else if let Some(pos) = self.composed.iter().position(|e| e.id == id) {
            self.composed.remove(pos);
            true
        } else {
            false
        };
        if found {
            self.notify_entry_removed(id);
        }
        found
    }

    fn notify_entry_removed(&mut self, id: u64) {
        let mut snap_to_full = Vec::new();
        for t in self.transitions.iter_mut() {
            if t.from == Some(id) {
                // make sure the transition completes on the next step
                t.from = None;
                t.elapsed = t.duration;
                if let Some(to) = t.to {
                    snap_to_full.push(to);
                }
            }
            if t.to == Some(id) {
                t.to = None;
            }
        }
        for to in snap_to_full {
            if let Some(entry) = self.entry_mut(to) {
                entry.weight = 1.0;
            }
        }
    }
}

impl AnimationSource for AnimationBlender {
    fn advance(&mut self, dt: f32) {
        AnimationBlender::advance(self, dt);
    }

    fn current_pose(&mut self) -> &[Option<Keyframe>] {
        &self.keyframes
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn complete(&self) -> bool {
        AnimationBlender::complete(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Animation;
    use crate::instance::AnimationInstance;
    use crate::track::AnimationTrack;
    use glam::{Quat, Vec3};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn key(x: f32) -> Keyframe {
        Keyframe::new(Vec3::new(x, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE)
    }

    /// A constant-pose animation holding pos.x == `x` on bone 0, 1 fps.
    fn constant_animation(name: &str, x: f32, frames: usize) -> Arc<Animation> {
        let mut tracks = BTreeMap::new();
        tracks.insert(
            0,
            AnimationTrack::new(0, "root", vec![Some(key(x)); frames]).unwrap(),
        );
        Arc::new(Animation::new(name, tracks, 1.0, None))
    }

    fn blended_instance(name: &str, x: f32) -> BlendedAnimation {
        BlendedAnimation::blended(Box::new(AnimationInstance::new(constant_animation(
            name, x, 4,
        ))))
    }

    fn blender() -> AnimationBlender {
        AnimationBlender::new("character", &[Mat4::IDENTITY; 2])
    }

    fn out_x(b: &mut AnimationBlender) -> f32 {
        b.current_pose()[0].unwrap().position.x
    }

    #[test]
    fn empty_blender_is_complete_and_holds_bind_pose() {
        let mut b = blender();
        assert!(b.complete());
        assert_eq!(b.bone_count(), 2);
        b.advance(0.1);
        assert_eq!(out_x(&mut b), 0.0);
    }

    #[test]
    fn two_weighted_blends_normalize() {
        let mut b = blender();
        b.add_animation(blended_instance("a", 0.0), 0.3);
        b.add_animation(blended_instance("b", 10.0), 0.7);
        b.advance(0.1);
        // interpolation of the two poses at t = 0.7 / (0.3 + 0.7)
        assert!((out_x(&mut b) - 7.0).abs() < 1e-4);
        assert!(!b.complete());
    }

    #[test]
    fn zero_weight_entries_are_skipped_but_still_advanced() {
        let mut b = blender();
        b.add_animation(blended_instance("a", 5.0), 1.0);
        b.add_animation(blended_instance("b", 100.0), 0.0);
        b.advance(0.1);
        assert!((out_x(&mut b) - 5.0).abs() < 1e-4);
    }

    #[test]
    fn unanimated_bones_keep_previous_output() {
        let mut b = blender();
        // the instance animates only bone 0; bone 1 keeps the bind value
        b.add_animation(blended_instance("a", 5.0), 1.0);
        b.advance(0.1);
        let pose = b.current_pose();
        assert!(pose[1].is_some());
        assert_eq!(pose[1].unwrap().position, Vec3::ZERO);
    }

    #[test]
    fn compose_layers_on_top_of_blend() {
        let mut b = blender();
        b.add_animation(blended_instance("idle", 1.0), 1.0);
        b.add_animation(
            BlendedAnimation::composed(Box::new(AnimationInstance::new(constant_animation(
                "wave", 2.0, 4,
            )))),
            1.0,
        );
        b.advance(0.1);
        // additive: idle position plus the full wave delta
        assert!((out_x(&mut b) - 3.0).abs() < 1e-4);
    }

    #[test]
    fn compose_weight_scales_the_delta() {
        let mut b = blender();
        b.add_animation(blended_instance("idle", 1.0), 1.0);
        b.add_animation(
            BlendedAnimation::composed(Box::new(AnimationInstance::new(constant_animation(
                "wave", 2.0, 4,
            )))),
            0.5,
        );
        b.advance(0.1);
        assert!((out_x(&mut b) - 2.0).abs() < 1e-4);
    }

    #[test]
    fn transition_ramps_weights_linearly() {
        let mut b = blender();
        let from = b.add_animation(blended_instance("walk", 0.0), 1.0);
        let to = b
            .transition_animations(Some(from), Some(blended_instance("run", 10.0)), 2.0)
            .unwrap();
        b.advance(1.0);
        assert!((b.weight(from) - 0.5).abs() < 1e-5);
        assert!((b.weight(to) - 0.5).abs() < 1e-5);
        // halfway through the crossfade the output sits at the midpoint
        assert!((out_x(&mut b) - 5.0).abs() < 1e-4);
    }

    #[test]
    fn transition_completes_and_removes_from() {
        let mut b = blender();
        let from = b.add_animation(blended_instance("walk", 0.0), 1.0);
        let to = b
            .transition_animations(Some(from), Some(blended_instance("run", 10.0)), 2.0)
            .unwrap();
        b.advance(1.0);
        b.advance(1.0);
        assert!((b.weight(to) - 1.0).abs() < 1e-5);
        // "walk" is gone; only "run" remains
        assert!((out_x(&mut b) - 10.0).abs() < 1e-4);
        b.remove_animation(to);
        assert!(b.complete());
    }

    #[test]
    fn transition_seeded_with_current_from_weight() {
        let mut b = blender();
        let from = b.add_animation(blended_instance("walk", 0.0), 0.8);
        b.transition_animations(Some(from), Some(blended_instance("run", 10.0)), 2.0);
        b.advance(1.0);
        assert!((b.weight(from) - 0.4).abs() < 1e-5);
    }

    #[test]
    fn one_shot_completion_finishes_transition_early() {
        let mut b = blender();
        let mut inst = AnimationInstance::new(constant_animation("attack", 0.0, 2));
        inst.set_looping(false);
        let from = b.add_animation(BlendedAnimation::blended(Box::new(inst)), 1.0);
        let to = b
            .transition_animations(Some(from), Some(blended_instance("idle", 10.0)), 100.0)
            .unwrap();
        // the 2-second one-shot plays out long before the 100-second fade
        b.advance(3.0);
        b.advance(0.1);
        assert!((b.weight(to) - 1.0).abs() < 1e-5);
        assert!(b.entry(from.0).is_none());
    }

    #[test]
    fn removing_transition_source_snaps_target_to_full() {
        let mut b = blender();
        let from = b.add_animation(blended_instance("walk", 0.0), 1.0);
        let to = b
            .transition_animations(Some(from), Some(blended_instance("run", 10.0)), 10.0)
            .unwrap();
        b.remove_animation(from);
        assert!((b.weight(to) - 1.0).abs() < 1e-5);
        b.advance(0.1);
        assert!((out_x(&mut b) - 10.0).abs() < 1e-4);
    }

    #[test]
    #[should_panic(expected = "not attached")]
    fn removing_a_non_member_panics() {
        let mut b = blender();
        let handle = b.add_animation(blended_instance("walk", 0.0), 1.0);
        b.remove_animation(handle);
        b.remove_animation(handle);
    }

    #[test]
    fn reset_clears_entries_and_restores_bind_pose() {
        let mut b = blender();
        b.add_animation(blended_instance("walk", 5.0), 1.0);
        b.advance(0.1);
        assert!((out_x(&mut b) - 5.0).abs() < 1e-4);
        b.reset();
        assert!(b.complete());
        assert_eq!(out_x(&mut b), 0.0);
    }

    #[test]
    fn blender_nests_as_an_animation_source() {
        let mut inner = blender();
        inner.add_animation(blended_instance("walk", 4.0), 1.0);
        let mut outer = blender();
        outer.add_animation(BlendedAnimation::blended(Box::new(inner)), 1.0);
        outer.advance(0.1);
        assert!((out_x(&mut outer) - 4.0).abs() < 1e-4);
    }
}
