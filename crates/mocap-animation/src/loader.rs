//! BVH clip and segment library loading
//!
//! The import crate hands over a joint tree and a frame-major motion table.
//! Here that becomes a `Skeleton` plus bone-major `AnimData`: rotation channels
//! are converted from degrees to quaternions bone by bone, and the root's
//! translation channels go to the shared translation track.

use crate::anim_data::AnimData;
use crate::skeleton::{Dof, Skeleton};
use glam::Vec3;
use mocap_core::{MocapError, Result};
use mocap_import::{ImportedBvh, ParseOptions, SegmentSpec};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// A skeleton together with the motion recorded for it
#[derive(Debug, Clone)]
pub struct LoadedClip {
    pub skeleton: Skeleton,
    pub data: AnimData,
}

/// Load a BVH file, optionally normalizing the skeleton to `target_height`.
pub fn load_bvh<P: AsRef<Path>>(path: P, target_height: Option<f32>) -> Result<LoadedClip> {
    load_bvh_with(path, target_height, &ParseOptions::default())
}

/// `load_bvh` with parse options (cancellation)
pub fn load_bvh_with<P: AsRef<Path>>(
    path: P,
    target_height: Option<f32>,
    options: &ParseOptions,
) -> Result<LoadedClip> {
    let bvh = mocap_import::import_bvh_with(path, options)?;
    clip_from_imported(&bvh, target_height)
}

/// Load a clip from BVH text
pub fn load_bvh_from_str(text: &str, target_height: Option<f32>) -> Result<LoadedClip> {
    let bvh = mocap_import::parse_bvh(text)?;
    clip_from_imported(&bvh, target_height)
}

/// Build the runtime skeleton and bone-major animation from a parsed BVH.
pub fn clip_from_imported(bvh: &ImportedBvh, target_height: Option<f32>) -> Result<LoadedClip> {
    let mut skeleton = Skeleton::from_imported(&bvh.root)?;

    if let Some(height) = target_height {
        match bvh.normalization_scale(height) {
            Some(scale) => {
                debug!(target_height = height, scale, "normalizing skeleton height");
                skeleton.scale(scale);
            }
            None => warn!("no End Site to measure; skipping height normalization"),
        }
    }

    let frames = &bvh.motion.frames;
    let num_frames = frames.len();
    let mut data = AnimData::new(skeleton.bone_count(), num_frames, bvh.fps());

    let joints = bvh.root.walk();
    let mut packed = Vec::with_capacity(num_frames * 3);
    for (bone, joint) in skeleton.bones().iter().zip(joints) {
        let base = joint.channel_offset;
        let rotation_base = match bone.dof {
            Dof::Fixed => continue,
            Dof::Rotation => base,
            Dof::RotationTranslation => {
                let track = frames
                    .iter()
                    .map(|row| Vec3::new(row[base], row[base + 1], row[base + 2]))
                    .collect();
                data.put_translations(track)?;
                base + 3
            }
        };

        packed.clear();
        for row in frames {
            packed.extend(row[rotation_base..rotation_base + 3].iter().map(|deg| deg.to_radians()));
        }
        data.put_bone_euler(bone.index, &packed)?;
    }

    Ok(LoadedClip { skeleton, data })
}

/// A named sub-range of a loaded clip
#[derive(Debug, Clone)]
pub struct Segment {
    pub name: String,
    pub data: AnimData,
}

/// Segments cut from one or more BVH files that share a skeleton
#[derive(Debug, Clone)]
pub struct SegmentLibrary {
    /// Skeleton of the first file loaded
    pub skeleton: Skeleton,
    pub segments: Vec<Segment>,
}

impl SegmentLibrary {
    /// Clones of every segment's animation, in manifest order
    pub fn segment_data(&self) -> Vec<AnimData> {
        self.segments.iter().map(|s| s.data.clone()).collect()
    }
}

/// Load every segment listed in a manifest.
///
/// Paths in the manifest are resolved against the manifest's directory.
pub fn load_segment_library<P: AsRef<Path>>(
    manifest: P,
    target_height: Option<f32>,
) -> Result<SegmentLibrary> {
    let manifest = manifest.as_ref();
    let specs = mocap_import::import_manifest(manifest)?;
    let base_dir = manifest.parent().unwrap_or_else(|| Path::new("."));
    build_segment_library(&specs, base_dir, target_height)
}

/// Cut segments from their files. Each file is parsed once, however many
/// segments reference it.
pub fn build_segment_library(
    specs: &[SegmentSpec],
    base_dir: &Path,
    target_height: Option<f32>,
) -> Result<SegmentLibrary> {
    let mut cache: HashMap<&str, AnimData> = HashMap::new();
    let mut skeleton: Option<Skeleton> = None;
    let mut segments = Vec::with_capacity(specs.len());

    for entry in specs {
        if !cache.contains_key(entry.file.as_str()) {
            let clip = load_bvh(base_dir.join(&entry.file), target_height)?;
            let bone_count = clip.skeleton.bone_count();
            match skeleton.as_ref().map(Skeleton::bone_count) {
                None => skeleton = Some(clip.skeleton),
                Some(expected) if expected != bone_count => {
                    return Err(MocapError::SkeletonMismatch {
                        expected,
                        got: bone_count,
                    });
                }
                Some(_) => {}
            }
            debug!(file = %entry.file, frames = clip.data.num_frames(), "cached clip");
            cache.insert(entry.file.as_str(), clip.data);
        }

        let source = &cache[entry.file.as_str()];
        segments.push(Segment {
            name: entry.label(),
            data: source.sub_copy(entry.start, entry.end)?,
        });
    }

    let skeleton = skeleton.ok_or_else(|| MocapError::ConfigError("manifest lists no segments".into()))?;
    info!(
        segments = segments.len(),
        files = cache.len(),
        bones = skeleton.bone_count(),
        "loaded segment library"
    );
    Ok(SegmentLibrary { skeleton, segments })
}
