//! Per-bone rotation limits over a clip

use crate::anim_data::AnimData;
use crate::skeleton::Skeleton;
use mocap_core::{quat_to_euler_zyx, MocapError, Result};
use std::fmt;

/// Smallest and largest Euler angles a bone reaches, `[z, y, x]` in radians
#[derive(Debug, Clone, PartialEq)]
pub struct RotationRange {
    pub bone: String,
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl RotationRange {
    /// Per-axis spread `max - min`, `[z, y, x]`
    pub fn span(&self) -> [f32; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }
}

/// One line per bone: `name {min x y z} {max x y z}` in degrees
impl fmt::Display for RotationRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let deg = |r: f32| r.to_degrees();
        write!(
            f,
            "{:<15} {{{:>7.2} {:>7.2} {:>7.2}}} {{{:>7.2} {:>7.2} {:>7.2}}}",
            self.bone,
            deg(self.min[2]),
            deg(self.min[1]),
            deg(self.min[0]),
            deg(self.max[2]),
            deg(self.max[1]),
            deg(self.max[0]),
        )
    }
}

/// Rotation limits of every bone, in skeleton order
pub fn rotation_ranges(skeleton: &Skeleton, data: &AnimData) -> Result<Vec<RotationRange>> {
    if skeleton.bone_count() != data.num_bones() {
        return Err(MocapError::SkeletonMismatch {
            expected: skeleton.bone_count(),
            got: data.num_bones(),
        });
    }
    if data.num_frames() == 0 {
        return Err(MocapError::AnimationError("clip has no frames".into()));
    }

    Ok(skeleton
        .collect_bones()
        .into_iter()
        .map(|bone| {
            let mut min = [f32::INFINITY; 3];
            let mut max = [f32::NEG_INFINITY; 3];
            for q in data.bone_rotations(bone.index).unwrap_or_default() {
                let angles = quat_to_euler_zyx(*q);
                for axis in 0..3 {
                    min[axis] = min[axis].min(angles[axis]);
                    max[axis] = max[axis].max(angles[axis]);
                }
            }
            RotationRange {
                bone: bone.name.clone(),
                min,
                max,
            }
        })
        .collect())
}

/// Multi-line report of `rotation_ranges`
pub fn format_ranges(ranges: &[RotationRange]) -> String {
    ranges.iter().map(|r| format!("{}\n", r)).collect()
}
