//! Runtime skeleton: bone hierarchy, pose state and forward kinematics
//!
//! Bones live in a flat array in pre-order (parents before children), so a
//! single forward pass is enough to accumulate world transforms:
//! 1. Playback writes each bone's local rotation (and the root translation)
//! 2. `world_transforms()` walks the array root-to-leaf
//! 3. `world[i] = world[parent[i]] * offset[i] * rotation[i]`
//!
//! A bone's own rotation never moves its own position, only its descendants.

use crate::anim_data::{AnimData, FramePose};
use glam::{Quat, Vec3};
use mocap_core::{MocapError, Result};
use mocap_import::ImportedJoint;

/// Degrees of freedom of a joint, as declared by its BVH channel count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dof {
    /// No channels; the bone keeps its bind pose
    Fixed,
    /// Z, Y, X rotation
    Rotation,
    /// X, Y, Z translation followed by Z, Y, X rotation (root only)
    RotationTranslation,
}

impl Dof {
    pub fn from_channel_count(count: usize) -> Option<Self> {
        match count {
            0 => Some(Dof::Fixed),
            3 => Some(Dof::Rotation),
            6 => Some(Dof::RotationTranslation),
            _ => None,
        }
    }

    pub fn channel_count(self) -> usize {
        match self {
            Dof::Fixed => 0,
            Dof::Rotation => 3,
            Dof::RotationTranslation => 6,
        }
    }
}

/// A single bone with its bind-pose offset and current local pose
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    /// Position in the bone-major animation table
    pub index: usize,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub dof: Dof,
    /// Fixed offset from the parent in bind pose
    pub offset: Vec3,
    /// Current local rotation
    pub rotation: Quat,
    /// Current translation; only ever non-zero on the root
    pub translation: Vec3,
}

impl Bone {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Accumulated world-space transform of a bone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldTransform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl WorldTransform {
    const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    /// Append a local translate-then-rotate step
    fn then(&self, translation: Vec3, rotation: Quat) -> Self {
        Self {
            position: self.position + self.rotation * translation,
            rotation: self.rotation * rotation,
        }
    }
}

/// Bone hierarchy with exactly one root at index 0
#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    bones: Vec<Bone>,
    /// Applied to root translations when posing; set by `scale()`
    scale_factor: f32,
}

impl Skeleton {
    /// Build a skeleton from an imported joint tree.
    ///
    /// Bone indices follow declaration (pre-order) order, which is also the
    /// bone order of the `AnimData` produced from the same file.
    pub fn from_imported(root: &ImportedJoint) -> Result<Self> {
        let mut bones = Vec::with_capacity(root.joint_count());
        push_joint(&mut bones, root, None)?;
        Ok(Self {
            bones,
            scale_factor: 1.0,
        })
    }

    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    pub fn root(&self) -> &Bone {
        &self.bones[0]
    }

    /// Bones in pre-order, indexed by `Bone::index`
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn bone(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index)
    }

    pub fn bone_by_name(&self, name: &str) -> Option<&Bone> {
        self.bones.iter().find(|b| b.name == name)
    }

    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    /// Pre-order traversal from the root, following each bone's child list
    pub fn collect_bones(&self) -> Vec<&Bone> {
        let mut out = Vec::with_capacity(self.bones.len());
        let mut stack = vec![0usize];
        while let Some(index) = stack.pop() {
            let bone = &self.bones[index];
            out.push(bone);
            stack.extend(bone.children.iter().rev());
        }
        out
    }

    /// Uniformly scale every bone offset and the root translation.
    pub fn scale(&mut self, factor: f32) {
        for bone in &mut self.bones {
            bone.offset *= factor;
        }
        self.scale_factor *= factor;
    }

    /// Set one bone's local pose.
    ///
    /// Bones without channels are left untouched. For the root, the stored
    /// translation is `translation * scale_factor + root_offset`; both
    /// arguments are ignored on other bones.
    pub fn set_pose(
        &mut self,
        index: usize,
        rotation: Quat,
        translation: Option<Vec3>,
        root_offset: Option<Vec3>,
    ) -> Result<()> {
        if index >= self.bones.len() {
            return Err(MocapError::BoneOutOfRange {
                index,
                count: self.bones.len(),
            });
        }
        self.pose_bone(index, rotation, translation, root_offset);
        Ok(())
    }

    pub(crate) fn pose_bone(
        &mut self,
        index: usize,
        rotation: Quat,
        translation: Option<Vec3>,
        root_offset: Option<Vec3>,
    ) {
        let scale = self.scale_factor;
        let bone = &mut self.bones[index];
        if bone.dof == Dof::Fixed {
            return;
        }
        bone.rotation = rotation;
        if bone.is_root() {
            bone.translation = translation.unwrap_or(Vec3::ZERO) * scale
                + root_offset.unwrap_or(Vec3::ZERO);
        }
    }

    /// Apply one frame of `data` to every bone.
    ///
    /// With `pin_root` the root keeps its current pose, so the figure stays
    /// in place while the rest of the body animates.
    pub fn apply_frame(
        &mut self,
        data: &AnimData,
        frame: usize,
        root_offset: Vec3,
        pin_root: bool,
    ) -> Result<()> {
        if data.num_bones() != self.bones.len() {
            return Err(MocapError::SkeletonMismatch {
                expected: self.bones.len(),
                got: data.num_bones(),
            });
        }
        if frame >= data.num_frames() {
            return Err(MocapError::InvalidFrameRange {
                start: frame,
                end: frame + 1,
                num_frames: data.num_frames(),
            });
        }
        self.apply_frame_unchecked(data, frame, root_offset, pin_root);
        Ok(())
    }

    /// `apply_frame` for callers that already validated bone count and frame
    pub(crate) fn apply_frame_unchecked(
        &mut self,
        data: &AnimData,
        frame: usize,
        root_offset: Vec3,
        pin_root: bool,
    ) {
        for index in 0..self.bones.len() {
            if index == 0 {
                if !pin_root {
                    self.pose_bone(
                        0,
                        data.rotation(0, frame),
                        Some(data.translation(frame)),
                        Some(root_offset),
                    );
                }
            } else {
                self.pose_bone(index, data.rotation(index, frame), None, None);
            }
        }
    }

    /// Reset every rotation to identity. Translations are kept.
    pub fn reset(&mut self) {
        for bone in &mut self.bones {
            bone.rotation = Quat::IDENTITY;
        }
    }

    /// World transforms of all bones for the current pose
    pub fn world_transforms(&self) -> Vec<WorldTransform> {
        self.compose(|bone| (bone.translation, bone.rotation))
    }

    /// World positions of all bones for the current pose
    pub fn world_positions(&self) -> Vec<Vec3> {
        self.world_transforms().iter().map(|t| t.position).collect()
    }

    /// World position of one bone for the current pose.
    ///
    /// Only the chain from the root to `index` is evaluated.
    pub fn world_position(&self, index: usize) -> Option<Vec3> {
        self.world_transform(index).map(|t| t.position)
    }

    /// World orientation of one bone for the current pose
    pub fn world_rotation(&self, index: usize) -> Option<Quat> {
        self.world_transform(index).map(|t| t.rotation)
    }

    fn world_transform(&self, index: usize) -> Option<WorldTransform> {
        self.bones.get(index)?;
        let mut chain = vec![index];
        let mut current = index;
        while let Some(parent) = self.bones[current].parent {
            chain.push(parent);
            current = parent;
        }

        let mut world = WorldTransform::IDENTITY;
        for &i in chain.iter().rev() {
            let bone = &self.bones[i];
            world = world.then(bone.offset + bone.translation, bone.rotation);
        }
        Some(world)
    }

    /// World positions for an arbitrary pose, without touching the skeleton.
    ///
    /// The root translation is scaled and offset exactly as `set_pose` would.
    pub fn world_positions_for(&self, pose: &FramePose, root_offset: Vec3) -> Result<Vec<Vec3>> {
        if pose.rotations.len() != self.bones.len() {
            return Err(MocapError::SkeletonMismatch {
                expected: self.bones.len(),
                got: pose.rotations.len(),
            });
        }
        let root_translation = pose.root_translation * self.scale_factor + root_offset;
        let transforms = self.compose(|bone| {
            let rotation = match bone.dof {
                Dof::Fixed => Quat::IDENTITY,
                _ => pose.rotations[bone.index],
            };
            let translation = if bone.is_root() && bone.dof != Dof::Fixed {
                root_translation
            } else {
                Vec3::ZERO
            };
            (translation, rotation)
        });
        Ok(transforms.iter().map(|t| t.position).collect())
    }

    /// Forward pass over the pre-ordered bones. `local` supplies each bone's
    /// (translation, rotation); the bind offset is added here.
    fn compose<F>(&self, local: F) -> Vec<WorldTransform>
    where
        F: Fn(&Bone) -> (Vec3, Quat),
    {
        let mut world: Vec<WorldTransform> = Vec::with_capacity(self.bones.len());
        for bone in &self.bones {
            let (translation, rotation) = local(bone);
            let parent = match bone.parent {
                Some(p) => world[p],
                None => WorldTransform::IDENTITY,
            };
            world.push(parent.then(bone.offset + translation, rotation));
        }
        world
    }
}

fn push_joint(bones: &mut Vec<Bone>, joint: &ImportedJoint, parent: Option<usize>) -> Result<usize> {
    let dof = Dof::from_channel_count(joint.channel_count()).ok_or_else(|| {
        MocapError::AnimationError(format!(
            "joint '{}' has {} channels; expected 0, 3 or 6",
            joint.name,
            joint.channel_count()
        ))
    })?;
    if dof == Dof::RotationTranslation && parent.is_some() {
        return Err(MocapError::AnimationError(format!(
            "joint '{}' has translation channels but is not the root",
            joint.name
        )));
    }

    let index = bones.len();
    bones.push(Bone {
        name: joint.name.clone(),
        index,
        parent,
        children: Vec::new(),
        dof,
        offset: Vec3::from_array(joint.offset),
        rotation: Quat::IDENTITY,
        translation: Vec3::ZERO,
    });

    for child in &joint.children {
        let child_index = push_joint(bones, child, Some(index))?;
        bones[index].children.push(child_index);
    }
    Ok(index)
}
