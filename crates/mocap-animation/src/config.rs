//! Layered settings
//!
//! Settings are resolved with increasing precedence:
//! 1. Built-in defaults
//! 2. A TOML file: an explicit path, or `mocap.toml` in the working directory
//! 3. Environment variables: `MOCAP_TARGET_HEIGHT`, `MOCAP_PLAYBACK_FPS`,
//!    `MOCAP_SEED`
//!
//! Command-line flags are applied on top by the caller.
//!
//! ```toml
//! target_height = 170.0
//!
//! [playback]
//! fps = 30.0
//! pin_at_root = false
//! end_behavior = "loop"   # or "stop"
//! root_offset = [0.0, 0.0, 0.0]
//!
//! [dance]
//! overlap_frames = 50
//! seed = 7
//! ```

use crate::dance::DanceParams;
use crate::player::{EndBehavior, MocapPlayer};
use glam::Vec3;
use mocap_core::{MocapError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "mocap.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MocapConfig {
    /// Normalize loaded skeletons to this height; `None` keeps source units
    #[serde(default)]
    pub target_height: Option<f32>,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub dance: DanceConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Playback rate; `None` plays at the clip's own fps
    #[serde(default)]
    pub fps: Option<f32>,
    #[serde(default)]
    pub pin_at_root: bool,
    #[serde(default)]
    pub end_behavior: EndBehavior,
    #[serde(default)]
    pub root_offset: [f32; 3],
}

impl PlaybackConfig {
    /// Configure a player; without an fps setting it plays at the clip's rate
    pub fn apply_to(&self, player: &mut MocapPlayer) -> Result<()> {
        let fps = self.fps.unwrap_or_else(|| player.data().fps());
        player.set_playback_fps(fps)?;
        player.set_pin_at_root(self.pin_at_root);
        player.set_end_behavior(self.end_behavior);
        player.set_root_offset(Vec3::from_array(self.root_offset));
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DanceConfig {
    #[serde(default = "default_initial_threshold")]
    pub initial_threshold: f32,
    #[serde(default = "default_threshold_decay")]
    pub threshold_decay: f32,
    #[serde(default = "default_min_candidates")]
    pub min_candidates: usize,
    #[serde(default = "default_overlap_frames")]
    pub overlap_frames: usize,
    /// Fixed RNG seed for reproducible dances
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for DanceConfig {
    fn default() -> Self {
        Self {
            initial_threshold: default_initial_threshold(),
            threshold_decay: default_threshold_decay(),
            min_candidates: default_min_candidates(),
            overlap_frames: default_overlap_frames(),
            seed: None,
        }
    }
}

impl DanceConfig {
    pub fn params(&self) -> DanceParams {
        DanceParams {
            initial_threshold: self.initial_threshold,
            threshold_decay: self.threshold_decay,
            min_candidates: self.min_candidates,
            overlap_frames: self.overlap_frames,
        }
    }
}

fn default_initial_threshold() -> f32 {
    DanceParams::default().initial_threshold
}
fn default_threshold_decay() -> f32 {
    DanceParams::default().threshold_decay
}
fn default_min_candidates() -> usize {
    DanceParams::default().min_candidates
}
fn default_overlap_frames() -> usize {
    DanceParams::default().overlap_frames
}

impl MocapConfig {
    /// Load with layered precedence: defaults < file < environment.
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_file(path)?,
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                if local.exists() {
                    Self::load_file(&local)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse settings text; no environment overrides
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: MocapConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MocapConfig = toml::from_str(&content).map_err(|e| {
            MocapError::ConfigError(format!("Failed to parse config {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "loaded settings file");
        Ok(config)
    }

    /// Apply `MOCAP_*` overrides looked up through `var`
    pub fn apply_overrides<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = var("MOCAP_TARGET_HEIGHT") {
            self.target_height = Some(parse_override("MOCAP_TARGET_HEIGHT", &value)?);
        }
        if let Some(value) = var("MOCAP_PLAYBACK_FPS") {
            self.playback.fps = Some(parse_override("MOCAP_PLAYBACK_FPS", &value)?);
        }
        if let Some(value) = var("MOCAP_SEED") {
            self.dance.seed = Some(parse_override("MOCAP_SEED", &value)?);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(height) = self.target_height {
            if !(height > 0.0 && height.is_finite()) {
                return Err(MocapError::ConfigError(format!(
                    "target_height must be positive, got {}",
                    height
                )));
            }
        }
        if let Some(fps) = self.playback.fps {
            if !(fps > 0.0 && fps.is_finite()) {
                return Err(MocapError::ConfigError(format!(
                    "playback fps must be positive, got {}",
                    fps
                )));
            }
        }
        self.dance.params().validate()
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| MocapError::ConfigError(format!("{} has invalid value '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_when_empty() {
        let config = MocapConfig::from_toml_str("").unwrap();
        assert_eq!(config.target_height, None);
        assert_eq!(config.playback.fps, None);
        assert!(!config.playback.pin_at_root);
        assert_eq!(config.playback.end_behavior, EndBehavior::Loop);
        assert_eq!(config.dance.params(), DanceParams::default());
        assert_eq!(config.dance.seed, None);
    }

    #[test]
    fn parses_all_sections() {
        let config = MocapConfig::from_toml_str(
            r#"
target_height = 170.0

[playback]
fps = 30.0
pin_at_root = true
end_behavior = "stop"
root_offset = [1.0, 0.0, -2.0]

[dance]
overlap_frames = 20
threshold_decay = 0.2
seed = 9
"#,
        )
        .unwrap();
        assert_eq!(config.target_height, Some(170.0));
        assert_eq!(config.playback.fps, Some(30.0));
        assert!(config.playback.pin_at_root);
        assert_eq!(config.playback.end_behavior, EndBehavior::Stop);
        assert_eq!(config.playback.root_offset, [1.0, 0.0, -2.0]);
        let params = config.dance.params();
        assert_eq!(params.overlap_frames, 20);
        assert_eq!(params.threshold_decay, 0.2);
        assert_eq!(params.initial_threshold, 2.0);
        assert_eq!(config.dance.seed, Some(9));
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(MocapConfig::from_toml_str("target_height = -1.0").is_err());
        assert!(MocapConfig::from_toml_str("[playback]\nfps = 0.0").is_err());
        assert!(MocapConfig::from_toml_str("[dance]\nthreshold_decay = 1.5").is_err());
        assert!(matches!(
            MocapConfig::from_toml_str("target_height = \"tall\""),
            Err(MocapError::TomlParseError(_))
        ));
    }

    #[test]
    fn environment_overrides_file() {
        let mut config = MocapConfig::from_toml_str("target_height = 170.0").unwrap();
        let env: HashMap<&str, &str> = [("MOCAP_TARGET_HEIGHT", "1.8"), ("MOCAP_SEED", " 42 ")]
            .into_iter()
            .collect();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.target_height, Some(1.8));
        assert_eq!(config.dance.seed, Some(42));
        assert_eq!(config.playback.fps, None);
    }

    #[test]
    fn bad_environment_value_is_an_error() {
        let mut config = MocapConfig::default();
        let result = config.apply_overrides(|key| (key == "MOCAP_PLAYBACK_FPS").then(|| "fast".to_string()));
        assert!(matches!(result, Err(MocapError::ConfigError(_))));
    }

    #[test]
    fn load_reads_explicit_file() {
        let dir = std::env::temp_dir().join(format!("mocap_config_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.toml");
        std::fs::write(&path, "[playback]\npin_at_root = true\n").unwrap();

        let config = MocapConfig::load(Some(path.as_path())).unwrap();
        assert!(config.playback.pin_at_root);
        assert!(MocapConfig::load(Some(dir.join("missing.toml").as_path())).is_err());

        std::fs::remove_dir_all(&dir).ok();
    }
}
