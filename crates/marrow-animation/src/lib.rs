//! Skeletal animation runtime for the Marrow engine
//!
//! Data flows bottom-up: a [`Keyframe`] is one bone's pose, an
//! [`AnimationTrack`] is a sparse run of keyframes for one bone, an
//! [`Animation`] bundles tracks with timing, an [`AnimationInstance`] plays
//! one animation, and an [`AnimationBlender`] combines any number of playing
//! instances into the final per-bone pose a renderer consumes.

pub mod animation;
pub mod blender;
pub mod instance;
pub mod io;
pub mod keyframe;
pub mod reduce;
pub mod set;
pub mod source;
pub mod track;

pub use animation::Animation;
pub use blender::{AnimationBlender, BlendHandle, BlendType, BlendedAnimation};
pub use instance::{wrap, AnimationInstance};
pub use keyframe::Keyframe;
pub use set::AnimationSet;
pub use source::AnimationSource;
pub use track::AnimationTrack;
