//! Rotation ranges command

use super::Settings;
use anyhow::Result;
use mocap_animation::ranges::{format_ranges, rotation_ranges};
use std::path::Path;

pub fn run(file: &Path, settings: &Settings) -> Result<()> {
    let clip = settings.load_clip(file)?;
    let ranges = rotation_ranges(&clip.skeleton, &clip.data)?;
    println!("{:<15} {:^25} {:^25}", "bone", "min (x y z)", "max (x y z)");
    print!("{}", format_ranges(&ranges));
    Ok(())
}
