//! Bone-major animation storage

use glam::{Quat, Vec3};
use mocap_core::{euler_to_quat, MocapError, Result};

/// Frame rate assumed when none is given
pub const DEFAULT_FPS: f32 = 90.0;

/// Per-bone rotation tracks plus the root translation track.
///
/// Rotations are stored bone-major (`rotations[bone][frame]`). Only the root
/// translates, so translations hold one value per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimData {
    num_bones: usize,
    num_frames: usize,
    fps: f32,
    rotations: Vec<Vec<Quat>>,
    translations: Vec<Vec3>,
}

/// Every bone's local rotation and the root translation for a single frame
#[derive(Debug, Clone, PartialEq)]
pub struct FramePose {
    pub rotations: Vec<Quat>,
    pub root_translation: Vec3,
}

impl AnimData {
    /// Identity rotations and zero translations for every bone and frame
    pub fn new(num_bones: usize, num_frames: usize, fps: f32) -> Self {
        Self {
            num_bones,
            num_frames,
            fps,
            rotations: vec![vec![Quat::IDENTITY; num_frames]; num_bones],
            translations: vec![Vec3::ZERO; num_frames],
        }
    }

    /// Assemble from complete tracks. Callers guarantee consistent lengths.
    pub(crate) fn from_tracks(fps: f32, rotations: Vec<Vec<Quat>>, translations: Vec<Vec3>) -> Self {
        Self {
            num_bones: rotations.len(),
            num_frames: translations.len(),
            fps,
            rotations,
            translations,
        }
    }

    pub fn num_bones(&self) -> usize {
        self.num_bones
    }

    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn set_fps(&mut self, fps: f32) {
        self.fps = fps;
    }

    /// Length in seconds
    pub fn duration(&self) -> f32 {
        if self.fps > 0.0 {
            self.num_frames as f32 / self.fps
        } else {
            0.0
        }
    }

    /// Replace one bone's rotation track
    pub fn put_bone_rotations(&mut self, bone: usize, track: Vec<Quat>) -> Result<()> {
        self.check_bone_index(bone)?;
        if track.len() != self.num_frames {
            return Err(MocapError::TrackLengthMismatch {
                expected: self.num_frames,
                got: track.len(),
            });
        }
        self.rotations[bone] = track;
        Ok(())
    }

    /// Replace one bone's rotation track from packed `[z, y, x]` radians,
    /// three values per frame
    pub fn put_bone_euler(&mut self, bone: usize, packed: &[f32]) -> Result<()> {
        if packed.len() != self.num_frames * 3 {
            return Err(MocapError::TrackLengthMismatch {
                expected: self.num_frames * 3,
                got: packed.len(),
            });
        }
        let track = packed
            .chunks_exact(3)
            .map(|zyx| euler_to_quat([zyx[0], zyx[1], zyx[2]]))
            .collect();
        self.put_bone_rotations(bone, track)
    }

    /// Replace the root translation track
    pub fn put_translations(&mut self, track: Vec<Vec3>) -> Result<()> {
        if track.len() != self.num_frames {
            return Err(MocapError::TrackLengthMismatch {
                expected: self.num_frames,
                got: track.len(),
            });
        }
        self.translations = track;
        Ok(())
    }

    /// Rotation of `bone` at `frame`.
    ///
    /// # Panics
    /// If either index is out of range.
    pub fn rotation(&self, bone: usize, frame: usize) -> Quat {
        assert!(bone < self.num_bones, "bone {} out of range ({} bones)", bone, self.num_bones);
        assert!(frame < self.num_frames, "frame {} out of range ({} frames)", frame, self.num_frames);
        self.rotations[bone][frame]
    }

    /// Root translation at `frame`.
    ///
    /// # Panics
    /// If `frame` is out of range.
    pub fn translation(&self, frame: usize) -> Vec3 {
        assert!(frame < self.num_frames, "frame {} out of range ({} frames)", frame, self.num_frames);
        self.translations[frame]
    }

    /// Full rotation track of one bone
    pub fn bone_rotations(&self, bone: usize) -> Option<&[Quat]> {
        self.rotations.get(bone).map(Vec::as_slice)
    }

    pub fn translations(&self) -> &[Vec3] {
        &self.translations
    }

    pub fn first_translation(&self) -> Option<Vec3> {
        self.translations.first().copied()
    }

    pub fn last_translation(&self) -> Option<Vec3> {
        self.translations.last().copied()
    }

    /// Snapshot of all bones at `frame`.
    ///
    /// # Panics
    /// If `frame` is out of range.
    pub fn frame_pose(&self, frame: usize) -> FramePose {
        FramePose {
            rotations: (0..self.num_bones).map(|b| self.rotation(b, frame)).collect(),
            root_translation: self.translation(frame),
        }
    }

    /// Copy frames `[start, end)` into a new clip with the same fps
    pub fn sub_copy(&self, start: usize, end: usize) -> Result<AnimData> {
        if start >= end || end > self.num_frames {
            return Err(MocapError::InvalidFrameRange {
                start,
                end,
                num_frames: self.num_frames,
            });
        }
        Ok(Self::from_tracks(
            self.fps,
            self.rotations.iter().map(|track| track[start..end].to_vec()).collect(),
            self.translations[start..end].to_vec(),
        ))
    }

    fn check_bone_index(&self, bone: usize) -> Result<()> {
        if bone >= self.num_bones {
            return Err(MocapError::BoneOutOfRange {
                index: bone,
                count: self.num_bones,
            });
        }
        Ok(())
    }
}
