//! Euler ZYX <-> quaternion conversion
//!
//! BVH rotation channels are read as Z, Y, X (in that order) and composed as
//! `Rz * Ry * Rx`. Angles are in radians and always passed as `[z, y, x]`.

use glam::Quat;
use std::f32::consts::FRAC_PI_2;

/// Half-sine of the Y angle above which the extraction treats the rotation as
/// gimbal-locked (Y within ~2.6 degrees of +-90).
pub const GIMBAL_LOCK_THRESHOLD: f32 = 0.499;

/// Compose a quaternion from Euler angles given in `[z, y, x]` order.
///
/// Three single-axis rotations are built and multiplied as `Rz * Ry * Rx`.
pub fn euler_to_quat(angles: [f32; 3]) -> Quat {
    let [z, y, x] = angles;
    let qz = Quat::from_rotation_z(z);
    let qy = Quat::from_rotation_y(y);
    let qx = Quat::from_rotation_x(x);
    qz * qy * qx
}

/// Extract `[z, y, x]` Euler angles from a quaternion composed as `Rz * Ry * Rx`.
///
/// The input is normalized first. Near `y = +-pi/2` the Z and X axes coincide;
/// in that case `x` is pinned to zero and the whole twist is reported on `z`.
pub fn quat_to_euler_zyx(q: Quat) -> [f32; 3] {
    let q = if q.length_squared() > 0.0 {
        q.normalize()
    } else {
        Quat::IDENTITY
    };
    let (qx, qy, qz, qw) = (q.x, q.y, q.z, q.w);

    let test = qw * qy - qx * qz;
    if test > GIMBAL_LOCK_THRESHOLD {
        // north pole
        return [2.0 * qz.atan2(qw), FRAC_PI_2, 0.0];
    }
    if test < -GIMBAL_LOCK_THRESHOLD {
        // south pole
        return [2.0 * qz.atan2(qw), -FRAC_PI_2, 0.0];
    }

    let sx = qx * qx;
    let sy = qy * qy;
    let sz = qz * qz;
    let z = (2.0 * (qw * qz + qx * qy)).atan2(1.0 - 2.0 * (sy + sz));
    let y = (2.0 * test).clamp(-1.0, 1.0).asin();
    let x = (2.0 * (qw * qx + qy * qz)).atan2(1.0 - 2.0 * (sx + sy));
    [z, y, x]
}
