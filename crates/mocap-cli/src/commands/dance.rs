//! Dance creation command

use super::Settings;
use anyhow::{Context, Result};
use mocap_animation::dance::DanceCreator;
use mocap_animation::load_segment_library;
use std::path::Path;

pub fn run(
    manifest: &Path,
    segments: usize,
    seed: Option<u64>,
    overlap: Option<usize>,
    settings: &Settings,
) -> Result<()> {
    let library = load_segment_library(manifest, settings.config.target_height)
        .with_context(|| format!("Failed to load segments from {}", manifest.display()))?;

    let mut params = settings.config.dance.params();
    if let Some(overlap) = overlap {
        params.overlap_frames = overlap;
    }

    let names: Vec<String> = library.segments.iter().map(|s| s.name.clone()).collect();
    let data = library.segment_data();
    let mut creator = match seed.or(settings.config.dance.seed) {
        Some(seed) => DanceCreator::with_seed(library.skeleton, data, params, seed)?,
        None => DanceCreator::new(library.skeleton, data, params)?,
    };

    let dance = creator.select_sequence_traced(segments)?;
    for (i, &pick) in dance.picks.iter().enumerate() {
        println!("{:>3}. {}", i + 1, names[pick]);
    }
    println!(
        "{} frames at {:.2} fps ({:.2}s), overlap {} frames",
        dance.data.num_frames(),
        dance.data.fps(),
        dance.data.duration(),
        params.overlap_frames
    );
    Ok(())
}
