//! Dance creation from a library of motion segments
//!
//! Starting from a random segment, each step scores every segment against the
//! current tail, keeps the ones above a decaying threshold and blends one of
//! them on at random. The result is locally plausible, not optimal.

use crate::anim_data::AnimData;
use crate::blend::{blend, compatibility, DEFAULT_OVERLAP_FRAMES};
use crate::skeleton::Skeleton;
use mocap_core::{MocapError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

/// Tuning knobs for segment selection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DanceParams {
    /// Compatibility score a candidate must reach on the first try
    pub initial_threshold: f32,
    /// Factor applied to the threshold while nothing qualifies
    pub threshold_decay: f32,
    /// Below this many qualifying candidates, the best-scoring ones are used
    pub min_candidates: usize,
    /// Cross-fade window between consecutive segments
    pub overlap_frames: usize,
}

impl Default for DanceParams {
    fn default() -> Self {
        Self {
            initial_threshold: 2.0,
            threshold_decay: 0.5,
            min_candidates: 3,
            overlap_frames: DEFAULT_OVERLAP_FRAMES,
        }
    }
}

impl DanceParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.initial_threshold > 0.0 && self.initial_threshold.is_finite()) {
            return Err(MocapError::ConfigError(format!(
                "initial_threshold must be positive, got {}",
                self.initial_threshold
            )));
        }
        if !(self.threshold_decay > 0.0 && self.threshold_decay < 1.0) {
            return Err(MocapError::ConfigError(format!(
                "threshold_decay must be in (0, 1), got {}",
                self.threshold_decay
            )));
        }
        if self.min_candidates == 0 {
            return Err(MocapError::ConfigError("min_candidates must be at least 1".into()));
        }
        Ok(())
    }
}

/// A segment and its compatibility with the current tail
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub segment: usize,
    pub score: f32,
}

/// Candidates eligible for the next pick.
///
/// The threshold starts at `initial_threshold` and decays until something
/// passes. If fewer than `min_candidates` pass, the top `min_candidates`
/// scores are returned instead.
pub fn qualifying_candidates(scored: &[Candidate], params: &DanceParams) -> Vec<Candidate> {
    let mut threshold = params.initial_threshold;
    let mut passing = loop {
        let passing: Vec<Candidate> = scored.iter().filter(|c| c.score >= threshold).copied().collect();
        if !passing.is_empty() || threshold < f32::MIN_POSITIVE {
            break passing;
        }
        threshold *= params.threshold_decay;
    };

    if passing.len() < params.min_candidates {
        let mut ranked = scored.to_vec();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.truncate(params.min_candidates);
        passing = ranked;
    }
    passing
}

/// A generated dance and the segments it was stitched from
#[derive(Debug, Clone)]
pub struct DanceSequence {
    pub data: AnimData,
    /// Segment indices in playback order
    pub picks: Vec<usize>,
}

pub struct DanceCreator {
    skeleton: Skeleton,
    segments: Vec<AnimData>,
    /// Segments long enough for the overlap window
    usable: Vec<usize>,
    params: DanceParams,
    rng: StdRng,
}

impl DanceCreator {
    /// Creator with an entropy-seeded RNG
    pub fn new(skeleton: Skeleton, segments: Vec<AnimData>, params: DanceParams) -> Result<Self> {
        Self::build(skeleton, segments, params, StdRng::from_entropy())
    }

    /// Creator whose choices are reproducible for a given seed
    pub fn with_seed(
        skeleton: Skeleton,
        segments: Vec<AnimData>,
        params: DanceParams,
        seed: u64,
    ) -> Result<Self> {
        Self::build(skeleton, segments, params, StdRng::seed_from_u64(seed))
    }

    fn build(skeleton: Skeleton, segments: Vec<AnimData>, params: DanceParams, rng: StdRng) -> Result<Self> {
        params.validate()?;
        if let Some(foreign) = segments.iter().find(|s| s.num_bones() != skeleton.bone_count()) {
            return Err(MocapError::SkeletonMismatch {
                expected: skeleton.bone_count(),
                got: foreign.num_bones(),
            });
        }

        let usable: Vec<usize> = (0..segments.len())
            .filter(|&i| {
                let long_enough = segments[i].num_frames() >= params.overlap_frames.max(1);
                if !long_enough {
                    warn!(
                        segment = i,
                        frames = segments[i].num_frames(),
                        overlap = params.overlap_frames,
                        "segment shorter than the blend window; skipping"
                    );
                }
                long_enough
            })
            .collect();
        if usable.is_empty() {
            return Err(MocapError::BlendError(format!(
                "none of the {} segments is at least {} frames long",
                segments.len(),
                params.overlap_frames
            )));
        }

        Ok(Self {
            skeleton,
            segments,
            usable,
            params,
            rng,
        })
    }

    pub fn segments(&self) -> &[AnimData] {
        &self.segments
    }

    pub fn params(&self) -> &DanceParams {
        &self.params
    }

    /// Score every usable segment against the end of `tail`
    pub fn candidates(&self, tail: &AnimData) -> Result<Vec<Candidate>> {
        self.usable
            .iter()
            .map(|&segment| {
                let score = compatibility(&self.skeleton, tail, &self.segments[segment])?;
                Ok(Candidate { segment, score })
            })
            .collect()
    }

    /// Stitch `num_segments` segments into one clip
    pub fn select_sequence(&mut self, num_segments: usize) -> Result<AnimData> {
        Ok(self.select_sequence_traced(num_segments)?.data)
    }

    /// `select_sequence`, also reporting which segments were picked
    pub fn select_sequence_traced(&mut self, num_segments: usize) -> Result<DanceSequence> {
        if num_segments == 0 {
            return Err(MocapError::BlendError("a dance needs at least one segment".into()));
        }

        let first = self.usable[self.rng.gen_range(0..self.usable.len())];
        let mut picks = vec![first];
        let mut sequence = self.segments[first].clone();

        for step in 1..num_segments {
            let scored = self.candidates(&sequence)?;
            let eligible = qualifying_candidates(&scored, &self.params);
            let chosen = eligible[self.rng.gen_range(0..eligible.len())];
            debug!(
                step,
                segment = chosen.segment,
                score = chosen.score,
                eligible = eligible.len(),
                "picked next segment"
            );
            sequence = blend(&sequence, &self.segments[chosen.segment], self.params.overlap_frames)?;
            picks.push(chosen.segment);
        }

        info!(
            segments = picks.len(),
            frames = sequence.num_frames(),
            "dance sequence created"
        );
        Ok(DanceSequence { data: sequence, picks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_bvh_from_str;
    use glam::{Quat, Vec3};

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

    /// Root turned by `start` on the first frame and by `end` on the rest
    fn segment(frames: usize, start: f32, end: f32) -> AnimData {
        let mut data = AnimData::new(2, frames, 10.0);
        let mut track = vec![Quat::from_rotation_z(end); frames];
        track[0] = Quat::from_rotation_z(start);
        data.put_bone_rotations(0, track).unwrap();
        data.put_translations((0..frames).map(|f| Vec3::new(f as f32, 0.0, 0.0)).collect())
            .unwrap();
        data
    }

    fn params(overlap: usize) -> DanceParams {
        DanceParams {
            overlap_frames: overlap,
            ..DanceParams::default()
        }
    }

    fn scored(scores: &[f32]) -> Vec<Candidate> {
        scores
            .iter()
            .enumerate()
            .map(|(segment, &score)| Candidate { segment, score })
            .collect()
    }

    #[test]
    fn default_params() {
        let p = DanceParams::default();
        assert_eq!(p.initial_threshold, 2.0);
        assert_eq!(p.threshold_decay, 0.5);
        assert_eq!(p.min_candidates, 3);
        assert_eq!(p.overlap_frames, 50);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn invalid_params_rejected() {
        let mut p = DanceParams::default();
        p.threshold_decay = 1.0;
        assert!(p.validate().is_err());
        p = DanceParams::default();
        p.initial_threshold = 0.0;
        assert!(p.validate().is_err());
        p = DanceParams::default();
        p.min_candidates = 0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn threshold_passes_enough_candidates() {
        let picked = qualifying_candidates(&scored(&[5.0, 2.5, 0.1, 3.0]), &DanceParams::default());
        let ids: Vec<usize> = picked.iter().map(|c| c.segment).collect();
        assert_eq!(ids, vec![0, 1, 3]);
    }

    #[test]
    fn falls_back_to_top_scores() {
        // Only one passes 2.0, so the best three are used
        let picked = qualifying_candidates(&scored(&[0.3, 9.0, 0.5, 0.1, 0.4]), &DanceParams::default());
        let ids: Vec<usize> = picked.iter().map(|c| c.segment).collect();
        assert_eq!(ids, vec![1, 2, 4]);
    }

    #[test]
    fn threshold_decays_until_something_qualifies() {
        let p = DanceParams {
            min_candidates: 1,
            ..DanceParams::default()
        };
        // 2.0 -> 1.0 -> 0.5 -> 0.25: only 0.3 passes at 0.25
        let picked = qualifying_candidates(&scored(&[0.3, 0.2, 0.1]), &p);
        assert_eq!(picked, vec![Candidate { segment: 0, score: 0.3 }]);
    }

    #[test]
    fn all_zero_scores_still_yield_candidates() {
        let picked = qualifying_candidates(&scored(&[0.0, 0.0]), &DanceParams::default());
        assert_eq!(picked.len(), 2);
        assert!(qualifying_candidates(&[], &DanceParams::default()).is_empty());
    }

    #[test]
    fn sequence_length_follows_overlap() {
        let segs = vec![segment(6, 0.0, 0.0), segment(8, 0.0, 0.0), segment(10, 0.0, 0.0)];
        let mut creator = DanceCreator::with_seed(skeleton(), segs, params(2), 7).unwrap();
        let dance = creator.select_sequence_traced(4).unwrap();
        assert_eq!(dance.picks.len(), 4);
        let expected: usize = dance.picks.iter().map(|&i| creator.segments()[i].num_frames()).sum::<usize>() - 3 * 2;
        assert_eq!(dance.data.num_frames(), expected);
    }

    #[test]
    fn seeded_creators_are_reproducible() {
        let segs = || vec![segment(5, 0.0, 0.4), segment(5, 0.4, 1.0), segment(5, 1.0, 0.0), segment(5, 0.2, 0.2)];
        let mut a = DanceCreator::with_seed(skeleton(), segs(), params(2), 42).unwrap();
        let mut b = DanceCreator::with_seed(skeleton(), segs(), params(2), 42).unwrap();
        let da = a.select_sequence_traced(6).unwrap();
        let db = b.select_sequence_traced(6).unwrap();
        assert_eq!(da.picks, db.picks);
        assert_eq!(da.data, db.data);
    }

    #[test]
    fn prefers_compatible_segments() {
        // Segment 1 starts exactly where every segment ends; the others start
        // turned away. Only a perfect match clears the threshold.
        let segs = vec![segment(4, 2.0, 0.0), segment(4, 0.0, 0.0), segment(4, -2.0, 0.0)];
        let p = DanceParams {
            initial_threshold: 1000.0,
            min_candidates: 1,
            overlap_frames: 1,
            ..DanceParams::default()
        };
        let mut creator = DanceCreator::with_seed(skeleton(), segs, p, 3).unwrap();
        let dance = creator.select_sequence_traced(5).unwrap();
        assert!(dance.picks[1..].iter().all(|&i| i == 1), "picks {:?}", dance.picks);
    }

    #[test]
    fn short_segments_are_skipped() {
        let segs = vec![segment(2, 0.0, 0.0), segment(10, 0.0, 0.0)];
        let mut creator = DanceCreator::with_seed(skeleton(), segs, params(5), 1).unwrap();
        let dance = creator.select_sequence_traced(3).unwrap();
        assert!(dance.picks.iter().all(|&i| i == 1));
        assert_eq!(dance.data.num_frames(), 10 * 3 - 5 * 2);
    }

    #[test]
    fn rejects_unusable_libraries() {
        assert!(DanceCreator::with_seed(skeleton(), vec![segment(2, 0.0, 0.0)], params(5), 1).is_err());
        assert!(DanceCreator::with_seed(skeleton(), vec![], params(5), 1).is_err());
        assert!(matches!(
            DanceCreator::with_seed(skeleton(), vec![AnimData::new(3, 10, 10.0)], params(5), 1),
            Err(MocapError::SkeletonMismatch { .. })
        ));
        let mut creator = DanceCreator::new(skeleton(), vec![segment(6, 0.0, 0.0)], params(2)).unwrap();
        assert!(creator.select_sequence(0).is_err());
        assert_eq!(creator.select_sequence(1).unwrap().num_frames(), 6);
    }
}
