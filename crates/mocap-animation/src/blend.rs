//! Segment compatibility scoring and cross-fade blending
//!
//! Two clips are joined by overlapping the tail of `a` with the head of `b`.
//! `b` is first shifted so its root starts where `a`'s root ends; inside the
//! overlap window translations are lerped and rotations slerped.

use crate::anim_data::AnimData;
use crate::skeleton::Skeleton;
use glam::{Quat, Vec3};
use mocap_core::{MocapError, Result};
use tracing::{debug, warn};

/// Score returned when the two poses coincide exactly
pub const MAX_COMPATIBILITY: f32 = f32::MAX;

/// Overlap window used when none is configured
pub const DEFAULT_OVERLAP_FRAMES: usize = 50;

/// Weight of the incoming clip at step `k` of an `overlap`-frame window.
///
/// Rises linearly and never reaches 0 or 1 inside the window, so both clips
/// contribute to every overlapped frame.
pub fn blend_weight(k: usize, overlap: usize) -> f32 {
    (k + 1) as f32 / (overlap + 1) as f32
}

/// How well `b` can follow `a`: `100 / total joint distance` between `a`'s
/// last pose and `b`'s first pose, with both roots at `a`'s final position.
///
/// Higher is better. Identical poses score `MAX_COMPATIBILITY`.
pub fn compatibility(skeleton: &Skeleton, a: &AnimData, b: &AnimData) -> Result<f32> {
    check_pair(a, b)?;
    if skeleton.bone_count() != a.num_bones() {
        return Err(MocapError::SkeletonMismatch {
            expected: skeleton.bone_count(),
            got: a.num_bones(),
        });
    }

    let end_of_a = a.frame_pose(a.num_frames() - 1);
    let mut start_of_b = b.frame_pose(0);
    start_of_b.root_translation = end_of_a.root_translation;

    let pa = skeleton.world_positions_for(&end_of_a, Vec3::ZERO)?;
    let pb = skeleton.world_positions_for(&start_of_b, Vec3::ZERO)?;
    let total: f32 = pa.iter().zip(&pb).map(|(p, q)| p.distance(*q)).sum();
    Ok(score_from_distance(total))
}

fn score_from_distance(total: f32) -> f32 {
    if total.is_nan() {
        return 0.0;
    }
    if total <= 0.0 {
        return MAX_COMPATIBILITY;
    }
    let score = 100.0 / total;
    if score.is_finite() {
        score
    } else {
        MAX_COMPATIBILITY
    }
}

/// Join `b` onto the end of `a` with an `overlap`-frame cross-fade.
///
/// The result has `len(a) + len(b) - overlap` frames at `a`'s fps. Inputs are
/// left untouched.
pub fn blend(a: &AnimData, b: &AnimData, overlap: usize) -> Result<AnimData> {
    check_pair(a, b)?;
    if a.num_frames() < overlap || b.num_frames() < overlap {
        return Err(MocapError::BlendError(format!(
            "segments of {} and {} frames cannot overlap by {} frames",
            a.num_frames(),
            b.num_frames(),
            overlap
        )));
    }
    if (a.fps() - b.fps()).abs() > 1e-3 {
        warn!(a_fps = a.fps(), b_fps = b.fps(), "blending clips with different fps; keeping the first");
    }

    let window_start = a.num_frames() - overlap;
    let total = a.num_frames() + b.num_frames() - overlap;
    let shift = a.translations()[a.num_frames() - 1] - b.translations()[0];

    let translations: Vec<Vec3> = cross_fade(
        &a.translations()[..],
        &b.translations().iter().map(|t| *t + shift).collect::<Vec<_>>(),
        window_start,
        overlap,
        |ta, tb, w| ta.lerp(tb, w),
    );

    let rotations: Vec<Vec<Quat>> = (0..a.num_bones())
        .map(|bone| {
            let ra = a.bone_rotations(bone).unwrap_or_default();
            let rb = b.bone_rotations(bone).unwrap_or_default();
            cross_fade(ra, rb, window_start, overlap, |qa, qb, w| qa.slerp(qb, w))
        })
        .collect();

    debug!(
        a_frames = a.num_frames(),
        b_frames = b.num_frames(),
        overlap,
        total,
        "blended segments"
    );
    Ok(AnimData::from_tracks(a.fps(), rotations, translations))
}

/// `a[..window_start]`, then `overlap` mixed frames, then the rest of `b`
fn cross_fade<T: Copy>(
    a: &[T],
    b: &[T],
    window_start: usize,
    overlap: usize,
    mix: impl Fn(T, T, f32) -> T,
) -> Vec<T> {
    let mut out = Vec::with_capacity(a.len() + b.len() - overlap);
    out.extend_from_slice(&a[..window_start]);
    for k in 0..overlap {
        out.push(mix(a[window_start + k], b[k], blend_weight(k, overlap)));
    }
    out.extend_from_slice(&b[overlap..]);
    out
}

fn check_pair(a: &AnimData, b: &AnimData) -> Result<()> {
    if a.num_bones() != b.num_bones() {
        return Err(MocapError::SkeletonMismatch {
            expected: a.num_bones(),
            got: b.num_bones(),
        });
    }
    if a.num_frames() == 0 || b.num_frames() == 0 {
        return Err(MocapError::BlendError("cannot blend an empty clip".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_bvh_from_str;

    const SKELETON: &str = "HIERARCHY
ROOT Hips
{
  OFFSET 0 0 0
  CHANNELS 6 Xposition Yposition Zposition Zrotation Yrotation Xrotation
  JOINT Chest
  {
    OFFSET 0 5 0
    CHANNELS 3 Zrotation Yrotation Xrotation
    End Site
    {
      OFFSET 0 1 0
    }
  }
}
MOTION
Frames: 1
Frame Time: 0.1
0 0 0 0 0 0 0 0 0
";

    fn skeleton() -> Skeleton {
        load_bvh_from_str(SKELETON, None).unwrap().skeleton
    }

    /// Root moving along X from `x0` by `step` per frame, chest bent by `angle`
    fn clip(frames: usize, x0: f32, step: f32, angle: f32) -> AnimData {
        let mut data = AnimData::new(2, frames, 10.0);
        data.put_translations((0..frames).map(|f| Vec3::new(x0 + step * f as f32, 0.0, 0.0)).collect())
            .unwrap();
        data.put_bone_rotations(1, vec![Quat::from_rotation_z(angle); frames])
            .unwrap();
        data
    }

    #[test]
    fn weights_rise_strictly_inside_window() {
        assert!((blend_weight(0, 3) - 0.25).abs() < 1e-6);
        assert!((blend_weight(2, 3) - 0.75).abs() < 1e-6);
        let weights: Vec<f32> = (0..50).map(|k| blend_weight(k, 50)).collect();
        assert!(weights.windows(2).all(|w| w[1] > w[0]));
        assert!(weights[0] > 0.0 && weights[49] < 1.0);
    }

    #[test]
    fn blend_length_and_continuity() {
        let a = clip(10, 0.0, 1.0, 0.0);
        let b = clip(8, 100.0, 2.0, 0.5);
        let out = blend(&a, &b, 3).unwrap();
        assert_eq!(out.num_frames(), 10 + 8 - 3);
        assert_eq!(out.num_bones(), 2);

        // Frames before the window come straight from a
        for f in 0..7 {
            assert_eq!(out.translation(f), a.translation(f));
            assert_eq!(out.rotation(1, f), a.rotation(1, f));
        }
        // First frame after the window is b's frame `overlap`, shifted
        let shift = a.last_translation().unwrap() - b.first_translation().unwrap();
        assert!((out.translation(10) - (b.translation(3) + shift)).length() < 1e-5);
        assert_eq!(out.rotation(1, 10), b.rotation(1, 3));
        assert!((out.last_translation().unwrap() - (b.last_translation().unwrap() + shift)).length() < 1e-4);
    }

    #[test]
    fn window_mixes_both_clips() {
        let a = clip(4, 0.0, 0.0, 0.0);
        let b = clip(4, 0.0, 0.0, 1.0);
        let out = blend(&a, &b, 4).unwrap();
        assert_eq!(out.num_frames(), 4);
        for k in 0..4 {
            let expected = Quat::from_rotation_z(blend_weight(k, 4));
            assert!((out.rotation(1, k).dot(expected).abs() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn zero_overlap_concatenates() {
        let a = clip(3, 0.0, 1.0, 0.0);
        let b = clip(2, 0.0, 1.0, 0.0);
        let out = blend(&a, &b, 0).unwrap();
        assert_eq!(out.num_frames(), 5);
        assert_eq!(out.translation(3), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(out.translation(4), Vec3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn blend_rejects_bad_inputs() {
        let a = clip(10, 0.0, 1.0, 0.0);
        assert!(matches!(blend(&a, &clip(2, 0.0, 1.0, 0.0), 3), Err(MocapError::BlendError(_))));
        assert!(matches!(
            blend(&a, &AnimData::new(3, 10, 10.0), 3),
            Err(MocapError::SkeletonMismatch { .. })
        ));
        assert!(blend(&a, &AnimData::new(2, 0, 10.0), 0).is_err());
    }

    #[test]
    fn blend_keeps_inputs_untouched() {
        let a = clip(6, 0.0, 1.0, 0.2);
        let b = clip(6, 5.0, 1.0, -0.2);
        let (a0, b0) = (a.clone(), b.clone());
        blend(&a, &b, 2).unwrap();
        assert_eq!(a, a0);
        assert_eq!(b, b0);
    }

    #[test]
    fn identical_boundary_poses_are_maximally_compatible() {
        let skel = skeleton();
        let a = clip(5, 0.0, 1.0, 0.3);
        // b starts elsewhere but the root is moved onto a's end before comparing
        let b = clip(5, 50.0, 1.0, 0.3);
        let score = compatibility(&skel, &a, &b).unwrap();
        assert_eq!(score, MAX_COMPATIBILITY);
        assert!(score.is_finite());
    }

    #[test]
    fn compatibility_is_inverse_distance_and_deterministic() {
        let skel = skeleton();
        let a = clip(5, 0.0, 1.0, 0.0);
        let b = clip(5, 0.0, 1.0, std::f32::consts::FRAC_PI_2);
        // Bending the last bone moves no bone position; bending the root does
        let mut c = b.clone();
        c.put_bone_rotations(0, vec![Quat::from_rotation_z(std::f32::consts::FRAC_PI_2); 5])
            .unwrap();

        assert_eq!(compatibility(&skel, &a, &b).unwrap(), MAX_COMPATIBILITY);
        // root rotated 90 deg about Z moves the chest from (0,5,0) to (-5,0,0)
        let expected = 100.0 / (50.0f32).sqrt();
        let first = compatibility(&skel, &a, &c).unwrap();
        assert!((first - expected).abs() < 1e-3, "score {}", first);
        assert_eq!(first, compatibility(&skel, &a, &c).unwrap());
    }

    #[test]
    fn compatibility_rejects_foreign_clips() {
        let skel = skeleton();
        let a = clip(5, 0.0, 1.0, 0.0);
        assert!(compatibility(&skel, &a, &AnimData::new(4, 5, 10.0)).is_err());
        assert!(compatibility(&skel, &AnimData::new(2, 0, 10.0), &a).is_err());
    }
}
