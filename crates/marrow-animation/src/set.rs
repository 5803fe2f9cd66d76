//! Animation set — the named registry of animations shipped with a model

use crate::animation::Animation;
use marrow_core::{MarrowError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A dictionary of animations, found by name or by iteration.
///
/// Animations are handed out as `Arc`s so any number of playback instances
/// can share one immutable animation. Ordered by name so serialization output
/// is deterministic.
#[derive(Debug, Default, Clone)]
pub struct AnimationSet {
    animations: BTreeMap<String, Arc<Animation>>,
}

impl AnimationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an animation to the set. The name must be unique.
    pub fn add_animation(&mut self, animation: Animation) -> Result<()> {
        let name = animation.name().to_owned();
        if self.animations.contains_key(&name) {
            return Err(MarrowError::DuplicateAnimation(name));
        }
        self.animations.insert(name, Arc::new(animation));
        Ok(())
    }

    /// Remove an animation by name; it must be present.
    pub fn remove_animation(&mut self, name: &str) -> Result<Arc<Animation>> {
        self.animations
            .remove(name)
            .ok_or_else(|| MarrowError::AnimationNotFound(name.to_owned()))
    }

    pub fn animation_by_name(&self, name: &str) -> Option<&Arc<Animation>> {
        self.animations.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.animations.keys().map(String::as_str)
    }

    pub fn animations(&self) -> impl Iterator<Item = &Arc<Animation>> {
        self.animations.values()
    }

    pub fn len(&self) -> usize {
        self.animations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }
}
