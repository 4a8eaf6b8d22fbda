//! BVH (Biovision Hierarchy) text parser
//!
//! The parser is strictly line-oriented: every keyword sits on its own line,
//! blank lines are ignored, and any structural violation aborts with the
//! offending 1-based line number. Nothing is returned on failure.

use crate::types::{ImportedBvh, ImportedJoint, ImportedMotion};
use mocap_core::{MocapError, Result};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Rotation channel layout the toolkit reads every joint with
const ROTATION_LAYOUT: [&str; 3] = ["Zrotation", "Yrotation", "Xrotation"];

/// Options for a single parse
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Raised by another thread to abort a long parse
    pub cancel: Option<Arc<AtomicBool>>,
}

impl ParseOptions {
    pub fn with_cancel(flag: Arc<AtomicBool>) -> Self {
        Self { cancel: Some(flag) }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }
}

/// Read and parse a BVH file
pub fn import_bvh<P: AsRef<Path>>(path: P) -> Result<ImportedBvh> {
    import_bvh_with(path, &ParseOptions::default())
}

/// Read and parse a BVH file with explicit options
pub fn import_bvh_with<P: AsRef<Path>>(path: P, options: &ParseOptions) -> Result<ImportedBvh> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let bvh = parse_bvh_with(&text, options)?;
    debug!(
        "imported {}: {} joints, {} channels, {} frames",
        path.display(),
        bvh.joint_count(),
        bvh.channel_count,
        bvh.motion.frame_count()
    );
    Ok(bvh)
}

/// Parse BVH text
pub fn parse_bvh(text: &str) -> Result<ImportedBvh> {
    parse_bvh_with(text, &ParseOptions::default())
}

/// Parse BVH text with explicit options
pub fn parse_bvh_with(text: &str, options: &ParseOptions) -> Result<ImportedBvh> {
    let parser = Parser {
        reader: LineReader {
            lines: text.lines().enumerate(),
            options,
            line_no: 0,
        },
        channel_counter: 0,
        max_end_site: 0.0,
    };
    parser.parse()
}

/// Yields trimmed, non-blank lines together with their 1-based number
struct LineReader<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
    options: &'a ParseOptions,
    /// Number of the last line consumed
    line_no: usize,
}

impl<'a> LineReader<'a> {
    fn next_line(&mut self) -> Result<Option<(usize, &'a str)>> {
        for (i, raw) in self.lines.by_ref() {
            if self.options.is_cancelled() {
                return Err(MocapError::Cancelled);
            }
            self.line_no = i + 1;
            let line = raw.trim();
            if !line.is_empty() {
                return Ok(Some((i + 1, line)));
            }
        }
        Ok(None)
    }

    fn expect_line(&mut self, what: &str) -> Result<(usize, &'a str)> {
        match self.next_line()? {
            Some(found) => Ok(found),
            None => Err(MocapError::bvh(
                self.line_no + 1,
                format!("unexpected end of file, expected {}", what),
            )),
        }
    }
}

struct Parser<'a> {
    reader: LineReader<'a>,
    /// Running channel index; each joint takes its declared channel count
    channel_counter: usize,
    max_end_site: f32,
}

impl<'a> Parser<'a> {
    fn parse(mut self) -> Result<ImportedBvh> {
        let (line_no, line) = self.reader.expect_line("HIERARCHY")?;
        if line != "HIERARCHY" {
            return Err(MocapError::bvh(
                line_no,
                format!("expected HIERARCHY, found '{}'", line),
            ));
        }

        let (line_no, line) = self.reader.expect_line("ROOT")?;
        let (name, opened) = split_header(line, "ROOT").ok_or_else(|| {
            MocapError::bvh(line_no, format!("expected ROOT <name>, found '{}'", line))
        })?;
        let root = self.parse_joint(name, line_no, true, opened)?;

        if self.channel_counter == 0 {
            return Err(MocapError::bvh(line_no, "hierarchy declares no channels"));
        }

        let (line_no, line) = self.reader.expect_line("MOTION")?;
        if line != "MOTION" {
            return Err(MocapError::bvh(
                line_no,
                format!("expected MOTION, found '{}'", line),
            ));
        }
        let motion = self.parse_motion()?;

        Ok(ImportedBvh {
            root,
            channel_count: self.channel_counter,
            max_end_site: self.max_end_site,
            motion,
        })
    }

    fn parse_joint(
        &mut self,
        name: &str,
        header_line: usize,
        is_root: bool,
        opened: bool,
    ) -> Result<ImportedJoint> {
        if !opened {
            self.expect_open_brace()?;
        }

        let mut offset = None;
        let mut channels: Option<(Vec<String>, usize)> = None;
        let mut children = Vec::new();
        let mut end_site = None;

        loop {
            let (line_no, line) = self.reader.expect_line("'}'")?;
            let keyword = line.split_whitespace().next().unwrap_or_default();
            match keyword {
                "OFFSET" => {
                    if offset.is_some() {
                        return Err(MocapError::bvh(
                            line_no,
                            format!("joint '{}' declares OFFSET twice", name),
                        ));
                    }
                    offset = Some(parse_offset(line_no, line)?);
                }
                "CHANNELS" => {
                    if channels.is_some() {
                        return Err(MocapError::bvh(
                            line_no,
                            format!("joint '{}' declares CHANNELS twice", name),
                        ));
                    }
                    let names = parse_channels(line_no, line, name, is_root)?;
                    let channel_offset = self.channel_counter;
                    self.channel_counter += names.len();
                    channels = Some((names, channel_offset));
                }
                "JOINT" => {
                    let (child_name, child_opened) =
                        split_header(line, "JOINT").ok_or_else(|| {
                            MocapError::bvh(line_no, "expected JOINT <name>")
                        })?;
                    let child = self.parse_joint(child_name, line_no, false, child_opened)?;
                    children.push(child);
                }
                "End" => {
                    if end_site.is_some() {
                        return Err(MocapError::bvh(
                            line_no,
                            format!("joint '{}' has more than one End Site", name),
                        ));
                    }
                    end_site = Some(self.parse_end_site(line_no, line)?);
                }
                "}" => break,
                _ => {
                    return Err(MocapError::bvh(
                        line_no,
                        format!("unexpected '{}' in joint '{}'", line, name),
                    ))
                }
            }
        }

        let offset = offset.ok_or_else(|| {
            MocapError::bvh(header_line, format!("joint '{}' has no OFFSET", name))
        })?;
        let (channels, channel_offset) = channels.unwrap_or((Vec::new(), self.channel_counter));

        Ok(ImportedJoint {
            name: name.to_string(),
            offset,
            channels,
            channel_offset,
            children,
            end_site,
        })
    }

    fn parse_end_site(&mut self, line_no: usize, line: &str) -> Result<[f32; 3]> {
        let rest = line
            .strip_prefix("End Site")
            .map(str::trim)
            .ok_or_else(|| MocapError::bvh(line_no, format!("expected End Site, found '{}'", line)))?;
        match rest {
            "" => self.expect_open_brace()?,
            "{" => {}
            _ => {
                return Err(MocapError::bvh(
                    line_no,
                    format!("unexpected '{}' after End Site", rest),
                ))
            }
        }

        let (offset_line, text) = self.reader.expect_line("OFFSET")?;
        if !text.starts_with("OFFSET") {
            return Err(MocapError::bvh(
                offset_line,
                format!("expected End Site OFFSET, found '{}'", text),
            ));
        }
        let offset = parse_offset(offset_line, text)?;

        let (close_line, text) = self.reader.expect_line("'}'")?;
        if text != "}" {
            return Err(MocapError::bvh(
                close_line,
                format!("expected '}}' closing End Site, found '{}'", text),
            ));
        }

        let length = offset.iter().map(|v| v * v).sum::<f32>().sqrt();
        self.max_end_site = self.max_end_site.max(length);
        Ok(offset)
    }

    fn expect_open_brace(&mut self) -> Result<()> {
        let (line_no, line) = self.reader.expect_line("'{'")?;
        if line != "{" {
            return Err(MocapError::bvh(
                line_no,
                format!("expected '{{', found '{}'", line),
            ));
        }
        Ok(())
    }

    fn parse_motion(&mut self) -> Result<ImportedMotion> {
        let (line_no, line) = self.reader.expect_line("Frames:")?;
        let frames_text = line.strip_prefix("Frames:").ok_or_else(|| {
            MocapError::bvh(line_no, format!("expected 'Frames: N', found '{}'", line))
        })?;
        let frame_count: usize = frames_text.trim().parse().map_err(|_| {
            MocapError::bvh(line_no, format!("invalid frame count '{}'", frames_text.trim()))
        })?;
        if frame_count == 0 {
            return Err(MocapError::bvh(line_no, "clip declares zero frames"));
        }

        let (line_no, line) = self.reader.expect_line("Frame Time:")?;
        let time_text = line.strip_prefix("Frame Time:").ok_or_else(|| {
            MocapError::bvh(line_no, format!("expected 'Frame Time: T', found '{}'", line))
        })?;
        let frame_time: f32 = time_text.trim().parse().map_err(|_| {
            MocapError::bvh(line_no, format!("invalid frame time '{}'", time_text.trim()))
        })?;
        if !(frame_time > 0.0 && frame_time.is_finite()) {
            return Err(MocapError::bvh(
                line_no,
                format!("frame time must be positive, got {}", frame_time),
            ));
        }

        let mut frames = Vec::with_capacity(frame_count);
        while let Some((line_no, line)) = self.reader.next_line()? {
            if frames.len() == frame_count {
                return Err(MocapError::bvh(
                    line_no,
                    format!("more motion lines than the declared {} frames", frame_count),
                ));
            }
            let row = line
                .split_whitespace()
                .map(|token| {
                    parse_finite(token).ok_or_else(|| {
                        MocapError::bvh(line_no, format!("invalid channel value '{}'", token))
                    })
                })
                .collect::<Result<Vec<f32>>>()?;
            if row.len() != self.channel_counter {
                return Err(MocapError::bvh(
                    line_no,
                    format!(
                        "expected {} channel values, found {}",
                        self.channel_counter,
                        row.len()
                    ),
                ));
            }
            frames.push(row);
        }

        if frames.len() < frame_count {
            return Err(MocapError::bvh(
                self.reader.line_no,
                format!(
                    "declared {} frames but found {}",
                    frame_count,
                    frames.len()
                ),
            ));
        }

        Ok(ImportedMotion { frame_time, frames })
    }
}

/// Split `ROOT Hips` / `JOINT Chest {` into the name and whether the block
/// was opened on the same line.
fn split_header<'l>(line: &'l str, keyword: &str) -> Option<(&'l str, bool)> {
    let rest = line.strip_prefix(keyword)?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim();
    let (name, opened) = match rest.strip_suffix('{') {
        Some(name) => (name.trim_end(), true),
        None => (rest, false),
    };
    if name.is_empty() {
        None
    } else {
        Some((name, opened))
    }
}

fn parse_offset(line_no: usize, line: &str) -> Result<[f32; 3]> {
    let values: Vec<&str> = line.split_whitespace().skip(1).collect();
    if values.len() != 3 {
        return Err(MocapError::bvh(
            line_no,
            format!("OFFSET needs 3 values, found {}", values.len()),
        ));
    }
    let mut out = [0.0f32; 3];
    for (slot, token) in out.iter_mut().zip(values) {
        *slot = parse_finite(token)
            .ok_or_else(|| MocapError::bvh(line_no, format!("invalid OFFSET value '{}'", token)))?;
    }
    Ok(out)
}

/// A float token; `NaN` and infinities are rejected like any other bad number.
fn parse_finite(token: &str) -> Option<f32> {
    token.parse::<f32>().ok().filter(|v| v.is_finite())
}

fn parse_channels(line_no: usize, line: &str, joint: &str, is_root: bool) -> Result<Vec<String>> {
    let mut tokens = line.split_whitespace().skip(1);
    let declared = tokens.next().ok_or_else(|| {
        MocapError::bvh(line_no, "CHANNELS needs a count")
    })?;
    let declared: usize = declared
        .parse()
        .map_err(|_| MocapError::bvh(line_no, format!("invalid channel count '{}'", declared)))?;
    let names: Vec<String> = tokens.map(String::from).collect();

    if names.len() != declared {
        return Err(MocapError::bvh(
            line_no,
            format!(
                "CHANNELS declares {} channels but names {}",
                declared,
                names.len()
            ),
        ));
    }
    match declared {
        0 | 3 => {}
        6 if is_root => {}
        6 => {
            return Err(MocapError::bvh(
                line_no,
                format!("joint '{}' has translation channels; only the root may", joint),
            ))
        }
        n => {
            return Err(MocapError::bvh(
                line_no,
                format!("joint '{}' declares {} channels; expected 0, 3 or 6", joint, n),
            ))
        }
    }

    let rotation = if declared == 6 { &names[3..] } else { &names[..] };
    if !rotation.is_empty()
        && !rotation
            .iter()
            .zip(ROTATION_LAYOUT)
            .all(|(got, want)| got.eq_ignore_ascii_case(want))
    {
        warn!(
            "joint '{}' declares rotation channels {:?}; reading them as Z Y X",
            joint, rotation
        );
    }

    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_JOINTS: &str = "HIERARCHY
ROOT Hips
{
  OFFSET 0.0 0.0 0.0
  CHANNELS 6 Xposition Yposition Zposition Zrotation Yrotation Xrotation
  JOINT Chest
  {
    OFFSET 0.0 5.0 0.0
    CHANNELS 3 Zrotation Yrotation Xrotation
    End Site
    {
      OFFSET 0.0 3.0 4.0
    }
  }
}
MOTION
Frames: 3
Frame Time: 0.04
1.0 2.0 3.0 0.0 0.0 0.0 90.0 0.0 0.0
1.5 2.0 3.0 0.0 0.0 0.0 45.0 0.0 0.0
2.0 2.0 3.0 10.0 20.0 30.0 0.0 0.0 0.0
";

    fn with_motion(frames: &str, rows: &[&str]) -> String {
        let hierarchy = TWO_JOINTS.split("MOTION").next().unwrap();
        format!(
            "{}MOTION\nFrames: {}\nFrame Time: 0.04\n{}\n",
            hierarchy,
            frames,
            rows.join("\n")
        )
    }

    #[test]
    fn parses_hierarchy_and_channel_offsets() {
        let bvh = parse_bvh(TWO_JOINTS).unwrap();
        assert_eq!(bvh.root.name, "Hips");
        assert_eq!(bvh.root.channel_count(), 6);
        assert_eq!(bvh.root.channel_offset, 0);
        assert_eq!(bvh.root.children.len(), 1);

        let chest = &bvh.root.children[0];
        assert_eq!(chest.name, "Chest");
        assert_eq!(chest.offset, [0.0, 5.0, 0.0]);
        assert_eq!(chest.channel_offset, 6);
        assert_eq!(chest.end_site, Some([0.0, 3.0, 4.0]));

        assert_eq!(bvh.channel_count, 9);
        assert_eq!(bvh.joint_count(), 2);
        assert!((bvh.max_end_site - 5.0).abs() < 1e-6);
    }

    #[test]
    fn parses_motion_table() {
        let bvh = parse_bvh(TWO_JOINTS).unwrap();
        assert_eq!(bvh.motion.frame_count(), 3);
        assert!((bvh.motion.frame_time - 0.04).abs() < 1e-7);
        assert!((bvh.fps() - 25.0).abs() < 1e-3);
        assert_eq!(bvh.motion.frames[1][0], 1.5);
        assert_eq!(bvh.motion.frames[2][8], 0.0);
        assert_eq!(bvh.motion.frames[0][6], 90.0);
    }

    #[test]
    fn parsing_twice_is_identical() {
        let a = parse_bvh(TWO_JOINTS).unwrap();
        let b = parse_bvh(TWO_JOINTS).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn normalization_scale_uses_longest_end_site() {
        let bvh = parse_bvh(TWO_JOINTS).unwrap();
        // 1.8 / (10 * 5)
        let scale = bvh.normalization_scale(1.8).unwrap();
        assert!((scale - 0.036).abs() < 1e-6);
    }

    #[test]
    fn accepts_brace_on_header_line_and_blank_lines() {
        let text = "HIERARCHY\n\nROOT Hips {\n OFFSET 0 0 0\n CHANNELS 3 Zrotation Yrotation Xrotation\n End Site {\n OFFSET 0 1 0\n }\n}\n\nMOTION\nFrames: 1\nFrame Time: 0.1\n1 2 3\n\n";
        let bvh = parse_bvh(text).unwrap();
        assert_eq!(bvh.root.name, "Hips");
        assert_eq!(bvh.motion.frames, vec![vec![1.0, 2.0, 3.0]]);
    }

    #[test]
    fn rejects_missing_hierarchy_keyword() {
        let text = TWO_JOINTS.replacen("HIERARCHY", "HIERARCH", 1);
        let err = parse_bvh(&text).unwrap_err();
        assert!(matches!(err, MocapError::BvhParseError { line: 1, .. }));
    }

    #[test]
    fn rejects_missing_motion_section() {
        let text = TWO_JOINTS.split("MOTION").next().unwrap().to_string();
        assert!(parse_bvh(&text).is_err());
    }

    #[test]
    fn rejects_short_motion_section() {
        let text = with_motion(
            "5",
            &[
                "0 0 0 0 0 0 0 0 0",
                "0 0 0 0 0 0 0 0 0",
                "0 0 0 0 0 0 0 0 0",
                "0 0 0 0 0 0 0 0 0",
            ],
        );
        let err = parse_bvh(&text).unwrap_err();
        assert!(err.to_string().contains("declared 5 frames but found 4"), "{}", err);
    }

    #[test]
    fn rejects_extra_motion_lines() {
        let text = with_motion("1", &["0 0 0 0 0 0 0 0 0", "0 0 0 0 0 0 0 0 0"]);
        assert!(parse_bvh(&text).is_err());
    }

    #[test]
    fn rejects_non_numeric_channel_value() {
        let text = with_motion("2", &["0 0 0 0 0 0 0 0 0", "0 0 0 abc 0 0 0 0 0"]);
        let err = parse_bvh(&text).unwrap_err();
        assert!(err.to_string().contains("invalid channel value 'abc'"), "{}", err);
    }

    #[test]
    fn rejects_non_finite_channel_value() {
        for bad in ["NaN", "inf", "-inf", "infinity"] {
            let row = format!("0 0 0 {} 0 0 0 0 0", bad);
            let text = with_motion("2", &["0 0 0 0 0 0 0 0 0", &row]);
            let err = parse_bvh(&text).unwrap_err();
            assert!(matches!(err, MocapError::BvhParseError { line: 20, .. }), "{}", err);
            assert!(err.to_string().contains("invalid channel value"), "{}", err);
        }
    }

    #[test]
    fn rejects_non_finite_offset() {
        let text = TWO_JOINTS.replacen("OFFSET 0.0 5.0 0.0", "OFFSET nan 5.0 0.0", 1);
        let err = parse_bvh(&text).unwrap_err();
        assert!(matches!(err, MocapError::BvhParseError { line: 8, .. }), "{}", err);

        let text = TWO_JOINTS.replacen("OFFSET 0.0 3.0 4.0", "OFFSET 0.0 inf 4.0", 1);
        assert!(parse_bvh(&text).is_err());
    }

    #[test]
    fn rejects_wrong_value_count() {
        let text = with_motion("1", &["0 0 0 0 0 0 0 0"]);
        assert!(parse_bvh(&text).is_err());
        let text = with_motion("1", &["0 0 0 0 0 0 0 0 0 0"]);
        assert!(parse_bvh(&text).is_err());
    }

    #[test]
    fn rejects_translation_on_child_joint() {
        let text = TWO_JOINTS.replacen(
            "CHANNELS 3 Zrotation Yrotation Xrotation",
            "CHANNELS 6 Xposition Yposition Zposition Zrotation Yrotation Xrotation",
            1,
        );
        let err = parse_bvh(&text).unwrap_err();
        assert!(err.to_string().contains("only the root"), "{}", err);
    }

    #[test]
    fn rejects_unsupported_channel_count() {
        let text = TWO_JOINTS.replacen(
            "CHANNELS 3 Zrotation Yrotation Xrotation",
            "CHANNELS 2 Zrotation Yrotation",
            1,
        );
        assert!(parse_bvh(&text).is_err());
    }

    #[test]
    fn rejects_channel_name_count_mismatch() {
        let text = TWO_JOINTS.replacen(
            "CHANNELS 3 Zrotation Yrotation Xrotation",
            "CHANNELS 3 Zrotation Yrotation",
            1,
        );
        assert!(parse_bvh(&text).is_err());
    }

    #[test]
    fn rejects_zero_frames() {
        let text = with_motion("0", &[]);
        assert!(parse_bvh(&text).is_err());
    }

    #[test]
    fn raised_cancel_flag_aborts() {
        let flag = Arc::new(AtomicBool::new(true));
        let err = parse_bvh_with(TWO_JOINTS, &ParseOptions::with_cancel(flag)).unwrap_err();
        assert!(matches!(err, MocapError::Cancelled));
    }

    #[test]
    fn import_reads_from_disk() {
        let dir = std::env::temp_dir().join(format!("mocap_bvh_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("two.bvh");
        std::fs::write(&path, TWO_JOINTS).unwrap();

        let bvh = import_bvh(&path).unwrap();
        assert_eq!(bvh.motion.frame_count(), 3);

        assert!(import_bvh(dir.join("missing.bvh")).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }
}
