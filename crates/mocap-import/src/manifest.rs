//! Segment manifest parsing
//!
//! A manifest lists the clip segments used for dance creation, one per line:
//! ```text
//! # file          start  end
//! walk.bvh        0      120
//! spin.bvh        40     200   # trailing comments are fine
//! ```
//! `end` is exclusive.

use crate::types::SegmentSpec;
use mocap_core::{MocapError, Result};
use std::path::Path;

/// Read and parse a manifest file
pub fn import_manifest<P: AsRef<Path>>(path: P) -> Result<Vec<SegmentSpec>> {
    let content = std::fs::read_to_string(path.as_ref())?;
    parse_manifest(&content)
}

/// Parse manifest text. An empty manifest is an error.
pub fn parse_manifest(content: &str) -> Result<Vec<SegmentSpec>> {
    let mut segments = Vec::new();

    for (i, raw) in content.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.split('#').next().unwrap_or_default();
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }
        if parts.len() != 3 {
            return Err(MocapError::manifest(
                line_no,
                format!("expected '<file> <start> <end>', found {} fields", parts.len()),
            ));
        }

        let start = parse_frame(line_no, parts[1])?;
        let end = parse_frame(line_no, parts[2])?;
        if end <= start {
            return Err(MocapError::manifest(
                line_no,
                format!("segment end {} must be after start {}", end, start),
            ));
        }

        segments.push(SegmentSpec {
            file: parts[0].to_string(),
            start,
            end,
        });
    }

    if segments.is_empty() {
        return Err(MocapError::manifest(0, "manifest lists no segments"));
    }
    Ok(segments)
}

fn parse_frame(line_no: usize, token: &str) -> Result<usize> {
    token
        .parse()
        .map_err(|_| MocapError::manifest(line_no, format!("invalid frame number '{}'", token)))
}
