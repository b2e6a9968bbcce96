pub mod linalg;

pub use linalg::*;

use serde::{Deserialize, Serialize};

/// Location fix pushed by the location source (~1 Hz, irregular)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub timestamp: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,         // metres
    pub speed: f64,            // m/s, negative when the source has no valid speed
    pub horizontal_accuracy: f64, // metres, negative when invalid
}

impl LocationSample {
    pub fn new(
        timestamp: f64,
        latitude: f64,
        longitude: f64,
        altitude: f64,
        speed: f64,
        horizontal_accuracy: f64,
    ) -> Self {
        Self {
            timestamp,
            latitude,
            longitude,
            altitude,
            speed,
            horizontal_accuracy,
        }
    }
}

/// Gravity-removed acceleration in the device frame, in g
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceAccel {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Device attitude relative to the world frame
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attitude {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Attitude {
    pub fn identity() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

impl Default for Attitude {
    fn default() -> Self {
        Self::identity()
    }
}

/// Device-motion sample pushed by the inertial source (~100 Hz).
///
/// Acceleration and attitude travel together, so they can never drift out of
/// alignment with each other.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InertialSample {
    pub timestamp: f64,
    pub accel: DeviceAccel,
    pub attitude: Attitude,
}

impl InertialSample {
    pub fn new(timestamp: f64, accel: DeviceAccel, attitude: Attitude) -> Self {
        Self {
            timestamp,
            accel,
            attitude,
        }
    }
}

/// Ground speed reading, m/s
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeedSample {
    pub timestamp: f64,
    pub speed: f64,
}

impl SpeedSample {
    pub fn new(timestamp: f64, speed: f64) -> Self {
        Self { timestamp, speed }
    }
}

impl From<&LocationSample> for SpeedSample {
    fn from(fix: &LocationSample) -> Self {
        Self {
            timestamp: fix.timestamp,
            speed: fix.speed.max(0.0),
        }
    }
}
