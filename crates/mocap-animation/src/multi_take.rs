//! Multi-take averaging
//!
//! Several recordings of the same motion on the same skeleton are kept side by
//! side and averaged frame by frame to reduce capture noise. The frame count
//! follows the first take; a frame is averaged over every take long enough to
//! cover it.

use crate::anim_data::AnimData;
use glam::{Quat, Vec3, Vec4};
use mocap_core::{MocapError, Result};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct MultiTakeAnimData {
    takes: Vec<AnimData>,
    average: AnimData,
}

impl MultiTakeAnimData {
    /// Start from a single take, which also fixes bone count, frame count and fps
    pub fn new(first: AnimData) -> Self {
        Self {
            average: first.clone(),
            takes: vec![first],
        }
    }

    /// Add another take and refresh the running average.
    ///
    /// Returns the index of the new take.
    pub fn add_take(&mut self, take: AnimData) -> Result<usize> {
        let expected = self.takes[0].num_bones();
        if take.num_bones() != expected {
            return Err(MocapError::SkeletonMismatch {
                expected,
                got: take.num_bones(),
            });
        }
        self.takes.push(take);
        self.average = average_takes(&self.takes);
        debug!(takes = self.takes.len(), "multi-take average refreshed");
        Ok(self.takes.len() - 1)
    }

    pub fn take_count(&self) -> usize {
        self.takes.len()
    }

    pub fn take(&self, index: usize) -> Result<&AnimData> {
        self.takes.get(index).ok_or(MocapError::TakeOutOfRange {
            index,
            count: self.takes.len(),
        })
    }

    /// Frame-wise average of all takes
    pub fn averaged(&self) -> &AnimData {
        &self.average
    }

    pub fn into_averaged(self) -> AnimData {
        self.average
    }
}

fn average_takes(takes: &[AnimData]) -> AnimData {
    let reference = &takes[0];
    let num_frames = reference.num_frames();

    let translations: Vec<Vec3> = (0..num_frames)
        .map(|frame| {
            let covering: Vec<Vec3> = takes
                .iter()
                .filter(|t| frame < t.num_frames())
                .map(|t| t.translation(frame))
                .collect();
            covering.iter().copied().sum::<Vec3>() / covering.len() as f32
        })
        .collect();

    let rotations: Vec<Vec<Quat>> = (0..reference.num_bones())
        .map(|bone| {
            (0..num_frames)
                .map(|frame| {
                    let anchor = reference.rotation(bone, frame);
                    let covering = takes
                        .iter()
                        .filter(|t| frame < t.num_frames())
                        .map(|t| t.rotation(bone, frame));
                    average_rotation(anchor, covering)
                })
                .collect()
        })
        .collect();

    AnimData::from_tracks(reference.fps(), rotations, translations)
}

/// Normalized sum of quaternions flipped into the anchor's hemisphere.
///
/// Accurate for the small spreads expected between takes of one motion.
fn average_rotation(anchor: Quat, rotations: impl Iterator<Item = Quat>) -> Quat {
    let sum: Vec4 = rotations
        .map(|q| {
            let v = Vec4::from(q);
            if anchor.dot(q) < 0.0 {
                -v
            } else {
                v
            }
        })
        .sum();
    if sum.length_squared() <= f32::EPSILON {
        return anchor;
    }
    Quat::from_vec4(sum.normalize())
}
