//! Joint trails: the path a bone traces through a clip

use crate::anim_data::AnimData;
use crate::skeleton::Skeleton;
use glam::Vec3;
use mocap_core::{MocapError, Result};

/// World position of `bone_name` at every frame, with the root at its
/// recorded translation and no scene offset.
pub fn joint_trail(skeleton: &Skeleton, data: &AnimData, bone_name: &str) -> Result<Vec<Vec3>> {
    let bone = skeleton
        .bone_by_name(bone_name)
        .ok_or_else(|| MocapError::BoneNotFound(bone_name.to_string()))?;
    if skeleton.bone_count() != data.num_bones() {
        return Err(MocapError::SkeletonMismatch {
            expected: skeleton.bone_count(),
            got: data.num_bones(),
        });
    }

    (0..data.num_frames())
        .map(|frame| {
            let positions = skeleton.world_positions_for(&data.frame_pose(frame), Vec3::ZERO)?;
            Ok(positions[bone.index])
        })
        .collect()
}

/// Consecutive point pairs, ready for a line-list renderer
pub fn trail_segments(points: &[Vec3]) -> Vec<[Vec3; 2]> {
    points.windows(2).map(|w| [w[0], w[1]]).collect()
}

/// Total distance travelled along the trail
pub fn trail_length(points: &[Vec3]) -> f32 {
    points.windows(2).map(|w| w[0].distance(w[1])).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_bvh_from_str;

    const STEP: &str = "HIERARCHY
ROOT Hips
{
  OFFSET 0 0 0
  CHANNELS 6 Xposition Yposition Zposition Zrotation Yrotation Xrotation
  JOINT Head
  {
    OFFSET 0 2 0
    CHANNELS 3 Zrotation Yrotation Xrotation
    End Site
    {
      OFFSET 0 1 0
    }
  }
}
MOTION
Frames: 4
Frame Time: 0.1
0 0 0 0 0 0 0 0 0
1 0 0 0 0 0 0 0 0
1 0 0 90 0 0 0 0 0
1 0 3 90 0 0 0 0 0
";

    #[test]
    fn trail_has_one_point_per_frame() {
        let clip = load_bvh_from_str(STEP, None).unwrap();
        let trail = joint_trail(&clip.skeleton, &clip.data, "Head").unwrap();
        assert_eq!(trail.len(), clip.data.num_frames());

        let expected = [
            Vec3::new(0.0, 2.0, 0.0),
            Vec3::new(1.0, 2.0, 0.0),
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(-1.0, 0.0, 3.0),
        ];
        for (got, want) in trail.iter().zip(expected) {
            assert!((*got - want).length() < 1e-4, "got {:?}, expected {:?}", got, want);
        }
    }

    #[test]
    fn segments_and_length() {
        let points = [Vec3::ZERO, Vec3::X, Vec3::new(1.0, 2.0, 0.0)];
        let segments = trail_segments(&points);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1], [Vec3::X, Vec3::new(1.0, 2.0, 0.0)]);
        assert!((trail_length(&points) - 3.0).abs() < 1e-6);
        assert!(trail_segments(&points[..1]).is_empty());
    }

    #[test]
    fn unknown_bone_is_an_error() {
        let clip = load_bvh_from_str(STEP, None).unwrap();
        assert!(matches!(
            joint_trail(&clip.skeleton, &clip.data, "Tail"),
            Err(MocapError::BoneNotFound(_))
        ));
    }
}
