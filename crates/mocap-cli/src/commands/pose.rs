//! Pose command

use super::Settings;
use anyhow::{bail, Result};
use glam::Vec3;
use mocap_animation::MocapPlayer;
use std::path::PathBuf;

pub struct PoseArgs {
    pub file: PathBuf,
    pub frame: usize,
    pub bone: Option<String>,
    pub root_offset: Option<[f32; 3]>,
    pub pin_root: bool,
}

pub fn run(args: PoseArgs, settings: &Settings) -> Result<()> {
    let clip = settings.load_clip(&args.file)?;
    let mut player = MocapPlayer::new(clip.skeleton, clip.data)?;
    settings.config.playback.apply_to(&mut player)?;
    if let Some(offset) = args.root_offset {
        player.set_root_offset(Vec3::from_array(offset));
    }
    if args.pin_root {
        player.set_pin_at_root(true);
    }

    player.goto_frame(args.frame);
    let frame = player.current_frame().unwrap_or_default();
    let skeleton = player.skeleton();
    let positions = skeleton.world_positions();

    let bones: Vec<_> = match &args.bone {
        Some(name) => match skeleton.bone_by_name(name) {
            Some(bone) => vec![bone],
            None => bail!("Bone '{}' not found", name),
        },
        None => skeleton.collect_bones(),
    };

    println!("Frame {} of {}", frame, player.num_frames());
    for bone in bones {
        let p = positions[bone.index];
        println!("{:<24} ({:>9.3}, {:>9.3}, {:>9.3})", bone.name, p.x, p.y, p.z);
    }
    Ok(())
}
