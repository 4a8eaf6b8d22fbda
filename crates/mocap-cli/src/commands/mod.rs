//! CLI command implementations

pub mod dance;
pub mod info;
pub mod play;
pub mod pose;
pub mod ranges;
pub mod trail;

use anyhow::{Context, Result};
use mocap_animation::loader::LoadedClip;
use mocap_animation::{load_bvh, MocapConfig};
use std::path::Path;

/// Resolved settings: file and environment layers plus command-line flags
pub struct Settings {
    pub config: MocapConfig,
}

impl Settings {
    pub fn load(path: Option<&Path>, height: Option<f32>) -> Result<Self> {
        let mut config = MocapConfig::load(path).context("Failed to load settings")?;
        if height.is_some() {
            config.target_height = height;
        }
        config.validate().context("Invalid settings")?;
        Ok(Self { config })
    }

    pub fn load_clip(&self, file: &Path) -> Result<LoadedClip> {
        load_bvh(file, self.config.target_height)
            .with_context(|| format!("Failed to load {}", file.display()))
    }
}
