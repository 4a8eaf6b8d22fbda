//! Frame-based playback driver
//!
//! Maps accumulated wall-clock time to a frame index at the playback fps,
//! which is independent of how often `update` is called. Every pose-applying
//! operation writes the frame into the skeleton and then notifies listeners.

use crate::anim_data::{AnimData, DEFAULT_FPS};
use crate::skeleton::Skeleton;
use glam::Vec3;
use mocap_core::{MocapError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Receives the index of every frame the player applies
pub trait FrameListener {
    fn frame_update(&mut self, frame: usize);
}

impl<F: FnMut(usize)> FrameListener for F {
    fn frame_update(&mut self, frame: usize) {
        self(frame)
    }
}

/// What `update` does once time runs past the last frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndBehavior {
    /// Rewind to the start and keep playing
    #[default]
    Loop,
    /// Stop on the last frame
    Stop,
}

pub struct MocapPlayer {
    skeleton: Skeleton,
    data: AnimData,
    playback_fps: f32,
    playing: bool,
    /// Seconds since frame 0
    time: f64,
    /// `None` until a frame is applied, and again after a loop rewind
    frame: Option<usize>,
    root_offset: Vec3,
    pin_at_root: bool,
    end_behavior: EndBehavior,
    listeners: Vec<Box<dyn FrameListener>>,
}

impl MocapPlayer {
    /// Wrap a skeleton and its animation. Nothing is applied until the first
    /// `update` or `goto_*` call.
    pub fn new(skeleton: Skeleton, data: AnimData) -> Result<Self> {
        if data.num_bones() != skeleton.bone_count() {
            return Err(MocapError::SkeletonMismatch {
                expected: skeleton.bone_count(),
                got: data.num_bones(),
            });
        }
        if data.num_frames() == 0 {
            return Err(MocapError::AnimationError("cannot play a clip with no frames".into()));
        }
        Ok(Self {
            skeleton,
            data,
            playback_fps: DEFAULT_FPS,
            playing: false,
            time: 0.0,
            frame: None,
            root_offset: Vec3::ZERO,
            pin_at_root: false,
            end_behavior: EndBehavior::default(),
            listeners: Vec::new(),
        })
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    pub fn data(&self) -> &AnimData {
        &self.data
    }

    pub fn num_frames(&self) -> usize {
        self.data.num_frames()
    }

    pub fn current_frame(&self) -> Option<usize> {
        self.frame
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    pub fn playback_fps(&self) -> f32 {
        self.playback_fps
    }

    /// Change the playback rate, keeping the current frame on screen
    pub fn set_playback_fps(&mut self, fps: f32) -> Result<()> {
        if !(fps > 0.0 && fps.is_finite()) {
            return Err(MocapError::AnimationError(format!("invalid playback fps {}", fps)));
        }
        self.playback_fps = fps;
        self.sync_time();
        Ok(())
    }

    pub fn root_offset(&self) -> Vec3 {
        self.root_offset
    }

    /// Placement of the figure in the scene, added to the root translation
    pub fn set_root_offset(&mut self, offset: Vec3) {
        self.root_offset = offset;
    }

    pub fn pin_at_root(&self) -> bool {
        self.pin_at_root
    }

    /// Keep the root bone fixed while everything else animates
    pub fn set_pin_at_root(&mut self, pin: bool) {
        self.pin_at_root = pin;
    }

    pub fn end_behavior(&self) -> EndBehavior {
        self.end_behavior
    }

    pub fn set_end_behavior(&mut self, behavior: EndBehavior) {
        self.end_behavior = behavior;
    }

    pub fn register_listener(&mut self, listener: Box<dyn FrameListener>) {
        self.listeners.push(listener);
    }

    /// Advance by one system tick.
    ///
    /// Returns the frame applied during this tick, if any.
    pub fn update(&mut self, system_fps: f32) -> Option<usize> {
        if !self.playing || !(system_fps > 0.0 && system_fps.is_finite()) {
            return None;
        }
        self.time += 1.0 / system_fps as f64;
        let target = (self.time * self.playback_fps as f64).round() as usize;

        if target >= self.num_frames() {
            match self.end_behavior {
                EndBehavior::Loop => {
                    debug!("playback wrapped to start");
                    self.time = 0.0;
                    self.frame = None;
                    None
                }
                EndBehavior::Stop => {
                    self.playing = false;
                    let last = self.num_frames() - 1;
                    self.time = last as f64 / self.playback_fps as f64;
                    if self.frame == Some(last) {
                        None
                    } else {
                        self.show_frame(last);
                        Some(last)
                    }
                }
            }
        } else if self.frame.map_or(true, |current| target > current) {
            self.show_frame(target);
            Some(target)
        } else {
            None
        }
    }

    /// Jump to a frame, clamped to the clip
    pub fn goto_frame(&mut self, frame: usize) {
        let frame = frame.min(self.num_frames() - 1);
        self.show_frame(frame);
        self.sync_time();
    }

    /// Jump to the frame shown at `seconds`, clamped to the clip
    pub fn goto_time(&mut self, seconds: f64) {
        let frame = (seconds * self.playback_fps as f64).max(0.0) as usize;
        self.goto_frame(frame);
    }

    /// Step one frame forward, wrapping from the last frame to the first
    pub fn frame_forward(&mut self) {
        let next = match self.frame {
            Some(f) if f + 1 < self.num_frames() => f + 1,
            _ => 0,
        };
        self.goto_frame(next);
    }

    /// Step one frame back, wrapping from the first frame to the last
    pub fn frame_backward(&mut self) {
        let previous = match self.frame {
            Some(f) if f > 0 => f - 1,
            _ => self.num_frames() - 1,
        };
        self.goto_frame(previous);
    }

    /// Stop and show frame 0
    pub fn reset(&mut self) {
        self.playing = false;
        self.time = 0.0;
        self.frame = None;
        self.goto_frame(0);
    }

    fn sync_time(&mut self) {
        self.time = match self.frame {
            Some(f) => f as f64 / self.playback_fps as f64,
            None => 0.0,
        };
    }

    fn show_frame(&mut self, frame: usize) {
        self.skeleton
            .apply_frame_unchecked(&self.data, frame, self.root_offset, self.pin_at_root);
        self.frame = Some(frame);
        for listener in &mut self.listeners {
            listener.frame_update(frame);
        }
    }
}
