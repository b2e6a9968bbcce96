//! Small linear algebra vocabulary for the launch engine
//!
//! Quaternion rotation, world-plane projection and normalisation are kept here
//! as pure functions so the streaming code never does vector math inline.

use nalgebra::{Quaternion, Vector2, Vector3};

use super::{Attitude, DeviceAccel};

pub type Vec3 = Vector3<f64>;
pub type PlaneVec = Vector2<f64>;
pub type Quat = Quaternion<f64>;

/// Magnitudes at or below this are treated as zero when normalising.
pub const NORM_EPSILON: f64 = 1e-9;

pub fn accel_vector(accel: &DeviceAccel) -> Vec3 {
    Vec3::new(accel.x, accel.y, accel.z)
}

/// nalgebra stores quaternions as (w, i, j, k); attitudes arrive as (x, y, z, w).
pub fn attitude_quat(attitude: &Attitude) -> Quat {
    Quat::new(attitude.w, attitude.x, attitude.y, attitude.z)
}

/// Sandwich product v' = q·v·q⁻¹, with the conjugate standing in for the inverse.
///
/// The quaternion is assumed to be unit length and is not renormalised; a
/// non-unit input scales the result by |q|².
pub fn rotate(q: &Quat, v: &Vec3) -> Vec3 {
    let pure = Quat::from_imag(*v);
    (q * pure * q.conjugate()).imag()
}

/// Rotate a device-frame acceleration into the world frame.
pub fn device_to_world(accel: &DeviceAccel, attitude: &Attitude) -> Vec3 {
    rotate(&attitude_quat(attitude), &accel_vector(accel))
}

/// World-plane (x, y) components.
pub fn planar(v: &Vec3) -> PlaneVec {
    v.xy()
}

/// Euclidean norm of the world-plane components.
pub fn planar_norm(v: &Vec3) -> f64 {
    planar(v).norm()
}

/// Unit vector in the direction of `v`, or `None` when `v` is (near) zero.
pub fn unit_planar(v: &PlaneVec) -> Option<PlaneVec> {
    v.try_normalize(NORM_EPSILON)
}
