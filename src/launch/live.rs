use crate::config::LaunchConfig;
use crate::types::{device_to_world, planar, unit_planar, InertialSample, PlaneVec};

/// Low-pass weight given to each new forward-acceleration reading
pub const LIVE_FILTER_ALPHA: f64 = 0.1;

/// Streaming preview of a launch timing.
///
/// Integrates low-pass filtered forward acceleration as samples arrive, so a
/// dashboard can show a running velocity before the capture is finalized.
/// The authoritative figure is still the post-capture [`LaunchReport`].
///
/// [`LaunchReport`]: super::LaunchReport
#[derive(Debug, Clone)]
pub struct LiveLaunchEstimator {
    forward: PlaneVec,
    gravity: f64,
    target_speed_mps: f64,
    alpha: f64,
    filtered_accel: f64,
    velocity: f64,
    elapsed_secs: f64,
    last_timestamp: Option<f64>,
    finished: bool,
}

impl LiveLaunchEstimator {
    /// `None` when `forward` has no usable direction.
    pub fn new(forward: PlaneVec, config: &LaunchConfig) -> Option<Self> {
        Some(Self {
            forward: unit_planar(&forward)?,
            gravity: config.gravity,
            target_speed_mps: config.target_speed_mps,
            alpha: LIVE_FILTER_ALPHA,
            filtered_accel: 0.0,
            velocity: 0.0,
            elapsed_secs: 0.0,
            last_timestamp: None,
            finished: false,
        })
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feed one sample. Returns the elapsed time on the update that first
    /// reaches the target speed; later updates are ignored.
    pub fn update(&mut self, sample: &InertialSample) -> Option<f64> {
        if self.finished {
            return None;
        }

        let world = device_to_world(&sample.accel, &sample.attitude);
        let forward_accel = (planar(&world) * self.gravity).dot(&self.forward);
        self.filtered_accel =
            self.alpha * forward_accel + (1.0 - self.alpha) * self.filtered_accel;

        let dt = match self.last_timestamp.replace(sample.timestamp) {
            Some(prev) if sample.timestamp > prev => sample.timestamp - prev,
            _ => return None,
        };

        self.velocity = (self.velocity + self.filtered_accel * dt).max(0.0);
        self.elapsed_secs += dt;

        if self.velocity >= self.target_speed_mps {
            self.finished = true;
            return Some(self.elapsed_secs);
        }
        None
    }
}
