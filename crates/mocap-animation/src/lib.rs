//! Skeletal animation for BVH motion capture
//!
//! Provides the runtime side of the toolkit:
//! - **Playback**: a skeleton, bone-major animation data and a frame driver
//! - **Recombination**: segment compatibility scoring, cross-fade blending and
//!   dance creation from a segment library
//! - **Analysis**: per-bone rotation ranges and joint trails

pub mod anim_data;
pub mod blend;
pub mod config;
pub mod dance;
pub mod loader;
pub mod multi_take;
pub mod player;
pub mod ranges;
pub mod skeleton;
pub mod trail;

pub use anim_data::{AnimData, FramePose, DEFAULT_FPS};
pub use config::MocapConfig;
pub use loader::{load_bvh, load_segment_library, LoadedClip, SegmentLibrary};
pub use player::{EndBehavior, FrameListener, MocapPlayer};
pub use skeleton::{Bone, Dof, Skeleton};

use mocap_core::Result;
use std::path::Path;
use tracing::info;

/// Load a BVH file and wrap it in a player configured from `config`.
pub fn open_player<P: AsRef<Path>>(path: P, config: &MocapConfig) -> Result<MocapPlayer> {
    let path = path.as_ref();
    let clip = load_bvh(path, config.target_height)?;
    info!(
        path = %path.display(),
        bones = clip.skeleton.bone_count(),
        frames = clip.data.num_frames(),
        fps = clip.data.fps(),
        "loaded clip"
    );
    let mut player = MocapPlayer::new(clip.skeleton, clip.data)?;
    config.playback.apply_to(&mut player)?;
    Ok(player)
}
