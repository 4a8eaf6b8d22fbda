//! Joint trail command

use super::Settings;
use anyhow::Result;
use mocap_animation::trail::{joint_trail, trail_length};
use std::path::Path;

pub fn run(file: &Path, bone: &str, settings: &Settings) -> Result<()> {
    let clip = settings.load_clip(file)?;
    let points = joint_trail(&clip.skeleton, &clip.data, bone)?;

    for (frame, p) in points.iter().enumerate() {
        println!("{:>5} {:>10.3} {:>10.3} {:>10.3}", frame, p.x, p.y, p.z);
    }
    println!("{} points, path length {:.3}", points.len(), trail_length(&points));
    Ok(())
}
