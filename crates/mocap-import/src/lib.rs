//! Mocap Import - Text importers
//!
//! This crate turns the toolkit's input text formats into plain data:
//! BVH files into a joint tree plus a frame-major motion table, and segment
//! manifests into `(file, start, end)` entries. Conversion into playable
//! skeletons and bone-major animation data happens in `mocap-animation`.

mod bvh;
mod manifest;
mod types;

pub use bvh::{import_bvh, import_bvh_with, parse_bvh, parse_bvh_with, ParseOptions};
pub use manifest::{import_manifest, parse_manifest};
pub use types::{ImportedBvh, ImportedJoint, ImportedMotion, SegmentSpec, HEIGHT_UNIT_FACTOR};
