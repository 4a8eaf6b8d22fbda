//! Import result types

/// Empirical unit factor between BVH corpus units and the target height unit.
///
/// `scale = target_height / (HEIGHT_UNIT_FACTOR * max_end_site)`. Existing
/// corpora were tuned against this value, so it must stay 10.
pub const HEIGHT_UNIT_FACTOR: f32 = 10.0;

/// Result of parsing a BVH file
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedBvh {
    /// Root of the joint hierarchy
    pub root: ImportedJoint,
    /// Total number of channels across all joints (values per motion line)
    pub channel_count: usize,
    /// Longest End Site offset seen in the hierarchy
    pub max_end_site: f32,
    /// Frame-major motion table
    pub motion: ImportedMotion,
}

impl ImportedBvh {
    /// Number of joints (End Sites are not joints)
    pub fn joint_count(&self) -> usize {
        self.root.joint_count()
    }

    /// Frames per second declared by the MOTION header
    pub fn fps(&self) -> f32 {
        1.0 / self.motion.frame_time
    }

    /// Uniform scale that normalizes the skeleton to `target_height`.
    ///
    /// Returns `None` when the hierarchy has no End Site to measure against.
    pub fn normalization_scale(&self, target_height: f32) -> Option<f32> {
        if self.max_end_site <= 0.0 {
            return None;
        }
        Some(target_height / (HEIGHT_UNIT_FACTOR * self.max_end_site))
    }
}

/// A joint from the HIERARCHY section
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedJoint {
    pub name: String,
    /// Fixed offset from the parent joint in bind pose
    pub offset: [f32; 3],
    /// Channel names in file order (e.g. `Xposition`, `Zrotation`)
    pub channels: Vec<String>,
    /// Index of this joint's first channel within a motion line
    pub channel_offset: usize,
    pub children: Vec<ImportedJoint>,
    /// Offset of the terminating End Site, if any
    pub end_site: Option<[f32; 3]>,
}

impl ImportedJoint {
    /// Channels declared by this joint (0, 3 or 6)
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of joints in this subtree, including self
    pub fn joint_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.joint_count()).sum::<usize>()
    }

    /// Pre-order traversal of this subtree
    pub fn walk(&self) -> Vec<&ImportedJoint> {
        let mut out = Vec::with_capacity(self.joint_count());
        self.walk_into(&mut out);
        out
    }

    fn walk_into<'a>(&'a self, out: &mut Vec<&'a ImportedJoint>) {
        out.push(self);
        for child in &self.children {
            child.walk_into(out);
        }
    }
}

/// The MOTION section: one row per frame, channels in joint-declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedMotion {
    /// Seconds per frame
    pub frame_time: f32,
    pub frames: Vec<Vec<f32>>,
}

impl ImportedMotion {
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

/// One manifest entry: a frame range `[start, end)` of a BVH file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentSpec {
    /// Path as written in the manifest (relative to the manifest's directory)
    pub file: String,
    pub start: usize,
    pub end: usize,
}

impl SegmentSpec {
    /// Display name used for loaded segments, e.g. `walk.bvh[10..120]`
    pub fn label(&self) -> String {
        format!("{}[{}..{}]", self.file, self.start, self.end)
    }
}
