//! Error types for the mocap toolkit

use thiserror::Error;

/// The main error type for mocap operations
#[derive(Debug, Error)]
pub enum MocapError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("BVH parse error at line {line}: {message}")]
    BvhParseError { line: usize, message: String },

    #[error("Manifest error at line {line}: {message}")]
    ManifestError { line: usize, message: String },

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),

    #[error("Skeleton mismatch: expected {expected} bones, got {got}")]
    SkeletonMismatch { expected: usize, got: usize },

    #[error("Track length mismatch: expected {expected} frames, got {got}")]
    TrackLengthMismatch { expected: usize, got: usize },

    #[error("Bone index {index} out of range (skeleton has {count} bones)")]
    BoneOutOfRange { index: usize, count: usize },

    #[error("Bone not found: {0}")]
    BoneNotFound(String),

    #[error("Invalid frame range [{start}, {end}) for clip with {num_frames} frames")]
    InvalidFrameRange {
        start: usize,
        end: usize,
        num_frames: usize,
    },

    #[error("Take {index} out of range ({count} takes loaded)")]
    TakeOutOfRange { index: usize, count: usize },

    #[error("Blend error: {0}")]
    BlendError(String),

    #[error("Animation error: {0}")]
    AnimationError(String),

    #[error("Operation cancelled")]
    Cancelled,
}

/// Result type alias for mocap operations
pub type Result<T> = std::result::Result<T, MocapError>;

impl MocapError {
    /// Shorthand for a BVH parse failure at a 1-based line number
    pub fn bvh(line: usize, message: impl Into<String>) -> Self {
        MocapError::BvhParseError {
            line,
            message: message.into(),
        }
    }

    /// Shorthand for a manifest failure at a 1-based line number
    pub fn manifest(line: usize, message: impl Into<String>) -> Self {
        MocapError::ManifestError {
            line,
            message: message.into(),
        }
    }
}

impl From<toml::de::Error> for MocapError {
    fn from(err: toml::de::Error) -> Self {
        MocapError::TomlParseError(err.to_string())
    }
}
