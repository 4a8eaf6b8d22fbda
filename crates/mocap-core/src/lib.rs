//! Mocap Core - Foundational types for the mocap toolkit
//!
//! This crate provides what every other mocap crate depends on:
//! - `MocapError` and the `Result` alias
//! - Euler ZYX <-> quaternion conversion used by the BVH channel layout

mod error;
pub mod math;

pub use error::{MocapError, Result};
pub use math::{euler_to_quat, quat_to_euler_zyx};
