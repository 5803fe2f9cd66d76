//! Binary animation asset format
//!
//! A little-endian tagged stream: a magic/version header, then the animation
//! set as count-prefixed records. Sparse keyframe arrays store one presence
//! byte per slot. Malformed input fails at load time, not at the first frame
//! of playback.

use crate::animation::Animation;
use crate::keyframe::Keyframe;
use crate::set::AnimationSet;
use crate::track::AnimationTrack;
use glam::{Quat, Vec3};
use marrow_core::io::{ReadExt, WriteExt};
use marrow_core::{MarrowError, Result};
use std::collections::BTreeMap;
use std::io::{Read, Write};

pub const MAGIC: [u8; 4] = *b"MANM";
pub const VERSION: u32 = 1;

/// Read a whole animation set from a binary stream.
pub fn read_animation_set<R: Read>(reader: &mut R) -> Result<AnimationSet> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(MarrowError::InvalidMagic {
            expected: String::from_utf8_lossy(&MAGIC).into_owned(),
            actual: String::from_utf8_lossy(&magic).into_owned(),
        });
    }
    let version = reader.read_u32_le()?;
    if version != VERSION {
        return Err(MarrowError::UnsupportedVersion(version));
    }
    let count = reader.read_u32_le()?;
    let mut set = AnimationSet::new();
    for _ in 0..count {
        set.add_animation(read_animation(reader)?)?;
    }
    Ok(set)
}

/// Write a whole animation set to a binary stream. Output is deterministic
/// (animations ordered by name, tracks by bone index), so write-read-write
/// round trips are byte-identical.
pub fn write_animation_set<W: Write>(writer: &mut W, set: &AnimationSet) -> Result<()> {
    writer.write_all(&MAGIC)?;
    writer.write_u32_le(VERSION)?;
    writer.write_u32_le(set.len() as u32)?;
    for animation in set.animations() {
        write_animation(writer, animation)?;
    }
    Ok(())
}

fn read_animation<R: Read>(reader: &mut R) -> Result<Animation> {
    let name = reader.read_string()?;
    let frame_rate = reader.read_f32_le()?;
    if frame_rate <= 0.0 || frame_rate.is_nan() {
        return Err(MarrowError::ParseError(format!(
            "animation '{name}' has non-positive frame rate {frame_rate}"
        )));
    }
    let num_frames = reader.read_i32_le()?;
    let track_count = reader.read_u32_le()?;
    let mut tracks = BTreeMap::new();
    for _ in 0..track_count {
        let bone_index = reader.read_i32_le()?;
        let track = read_track(reader)?;
        if bone_index < 0 || bone_index as usize != track.bone_index() {
            return Err(MarrowError::ParseError(format!(
                "animation '{name}': track bone index {} does not match its key {bone_index}",
                track.bone_index()
            )));
        }
        if tracks.insert(track.bone_index(), track).is_some() {
            return Err(MarrowError::ParseError(format!(
                "animation '{name}' has two tracks for bone {bone_index}"
            )));
        }
    }
    // a negative frame count means "derive from the tracks"
    let num_frames = usize::try_from(num_frames).ok();
    Ok(Animation::new(name, tracks, frame_rate, num_frames))
}

fn write_animation<W: Write>(writer: &mut W, animation: &Animation) -> Result<()> {
    writer.write_string(animation.name())?;
    writer.write_f32_le(animation.frame_rate())?;
    writer.write_i32_le(animation.num_frames() as i32)?;
    writer.write_u32_le(animation.num_tracks() as u32)?;
    for (bone, track) in animation.tracks() {
        writer.write_i32_le(bone as i32)?;
        write_track(writer, track)?;
    }
    Ok(())
}

fn read_track<R: Read>(reader: &mut R) -> Result<AnimationTrack> {
    let bone_index = reader.read_i32_le()?;
    if bone_index < 0 {
        return Err(MarrowError::ParseError(format!(
            "negative bone index {bone_index} in track"
        )));
    }
    let frame_count = reader.read_u32_le()?;
    let mut keyframes = Vec::with_capacity(frame_count as usize);
    for _ in 0..frame_count {
        let present = reader.read_u8()?;
        keyframes.push(match present {
            0 => None,
            1 => Some(read_keyframe(reader)?),
            other => {
                return Err(MarrowError::ParseError(format!(
                    "bad keyframe presence tag {other}"
                )))
            }
        });
    }
    let name = reader.read_string()?;
    AnimationTrack::new(bone_index as usize, name, keyframes)
}

fn write_track<W: Write>(writer: &mut W, track: &AnimationTrack) -> Result<()> {
    writer.write_i32_le(track.bone_index() as i32)?;
    writer.write_u32_le(track.num_frames() as u32)?;
    for slot in track.keyframes() {
        match slot {
            Some(keyframe) => {
                writer.write_u8(1)?;
                write_keyframe(writer, keyframe)?;
            }
            None => writer.write_u8(0)?,
        }
    }
    writer.write_string(track.name())?;
    Ok(())
}

fn read_keyframe<R: Read>(reader: &mut R) -> Result<Keyframe> {
    let position = read_vec3(reader)?;
    let orientation = Quat::from_xyzw(
        reader.read_f32_le()?,
        reader.read_f32_le()?,
        reader.read_f32_le()?,
        reader.read_f32_le()?,
    );
    let scale = read_vec3(reader)?;
    Ok(Keyframe::new(position, orientation, scale))
}

fn write_keyframe<W: Write>(writer: &mut W, keyframe: &Keyframe) -> Result<()> {
    write_vec3(writer, keyframe.position)?;
    writer.write_f32_le(keyframe.orientation.x)?;
    writer.write_f32_le(keyframe.orientation.y)?;
    writer.write_f32_le(keyframe.orientation.z)?;
    writer.write_f32_le(keyframe.orientation.w)?;
    write_vec3(writer, keyframe.scale)?;
    Ok(())
}

fn read_vec3<R: Read>(reader: &mut R) -> Result<Vec3> {
    Ok(Vec3::new(
        reader.read_f32_le()?,
        reader.read_f32_le()?,
        reader.read_f32_le()?,
    ))
}

fn write_vec3<W: Write>(writer: &mut W, v: Vec3) -> Result<()> {
    writer.write_f32_le(v.x)?;
    writer.write_f32_le(v.y)?;
    writer.write_f32_le(v.z)?;
    Ok(())
}
