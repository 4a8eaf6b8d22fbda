//! Info command

use super::Settings;
use anyhow::Result;
use mocap_animation::Dof;
use std::path::Path;

pub fn run(file: &Path, settings: &Settings) -> Result<()> {
    let clip = settings.load_clip(file)?;
    let skeleton = &clip.skeleton;
    let data = &clip.data;

    println!("File:     {}", file.display());
    println!("Bones:    {}", skeleton.bone_count());
    println!("Frames:   {}", data.num_frames());
    println!("FPS:      {:.2}", data.fps());
    println!("Duration: {:.2}s", data.duration());
    if (skeleton.scale_factor() - 1.0).abs() > f32::EPSILON {
        println!("Scale:    {:.4}", skeleton.scale_factor());
    }
    println!();

    for bone in skeleton.collect_bones() {
        let depth = ancestors(skeleton, bone.index);
        let dof = match bone.dof {
            Dof::Fixed => "fixed",
            Dof::Rotation => "rot",
            Dof::RotationTranslation => "rot+pos",
        };
        println!(
            "{:>3} {}{:<width$} {:<8} ({:.2}, {:.2}, {:.2})",
            bone.index,
            "  ".repeat(depth),
            bone.name,
            dof,
            bone.offset.x,
            bone.offset.y,
            bone.offset.z,
            width = 24usize.saturating_sub(depth * 2),
        );
    }

    Ok(())
}

fn ancestors(skeleton: &mocap_animation::Skeleton, index: usize) -> usize {
    let mut depth = 0;
    let mut current = skeleton.bone(index).and_then(|b| b.parent);
    while let Some(parent) = current {
        depth += 1;
        current = skeleton.bone(parent).and_then(|b| b.parent);
    }
    depth
}
