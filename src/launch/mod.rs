//! Launch timing engine ("0-60").
//!
//! Samples are only buffered while armed; all analysis is deferred to
//! [`LaunchEngine::finalize`], which runs the [`pipeline`] once over the
//! captured buffers.

pub mod live;
pub mod pipeline;

pub use live::LiveLaunchEstimator;
pub use pipeline::{LaunchReport, VelocityPoint};

use log::{info, trace, warn};
use serde::{Deserialize, Serialize};

use crate::config::LaunchConfig;
use crate::error::LaunchError;
use crate::types::{InertialSample, SpeedSample};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LaunchPhase {
    /// Not capturing; samples are ignored
    Disarmed,
    /// Buffering inertial and ground-speed samples
    Armed,
    /// Ground speed reached the target; buffers are frozen awaiting finalize
    Captured,
}

/// Buffers for one launch capture.
///
/// The engine exclusively owns these; `ingest*` are the only writers and
/// callers must not interleave calls from two producers without serializing
/// them first.
pub struct LaunchEngine {
    config: LaunchConfig,
    phase: LaunchPhase,
    inertial: Vec<InertialSample>,
    speeds: Vec<SpeedSample>,
}

impl LaunchEngine {
    pub fn new(config: LaunchConfig) -> Self {
        Self {
            config,
            phase: LaunchPhase::Disarmed,
            inertial: Vec::new(),
            speeds: Vec::new(),
        }
    }

    pub fn phase(&self) -> LaunchPhase {
        self.phase
    }

    pub fn is_armed(&self) -> bool {
        self.phase == LaunchPhase::Armed
    }

    /// Ground speed has reached the target and ingestion has halted.
    pub fn is_capture_complete(&self) -> bool {
        self.phase == LaunchPhase::Captured
    }

    /// (inertial, ground speed) buffer sizes
    pub fn buffer_sizes(&self) -> (usize, usize) {
        (self.inertial.len(), self.speeds.len())
    }

    /// Clear all buffers and start capturing.
    pub fn arm(&mut self) {
        self.inertial.clear();
        self.speeds.clear();
        self.phase = LaunchPhase::Armed;
        info!(
            "Launch engine armed (target {:.2} m/s)",
            self.config.target_speed_mps
        );
    }

    /// Arm only if the vehicle is currently stationary.
    pub fn arm_from_rest(&mut self, ground_speed: f64) -> Result<(), LaunchError> {
        if ground_speed > self.config.rest_speed_mps {
            warn!("Refusing to arm: ground speed {:.2} m/s", ground_speed);
            return Err(LaunchError::NotAtRest {
                speed: ground_speed,
            });
        }
        self.arm();
        Ok(())
    }

    /// Buffer one inertial sample. Returns `false` if the sample was ignored.
    pub fn ingest(&mut self, sample: InertialSample) -> bool {
        if !self.is_armed() {
            trace!(
                "Inertial sample at {:.3} ignored ({:?})",
                sample.timestamp,
                self.phase
            );
            return false;
        }
        self.inertial.push(sample);
        true
    }

    /// Buffer one ground-speed sample and check the stop condition.
    pub fn ingest_speed(&mut self, sample: SpeedSample) -> bool {
        if !self.is_armed() {
            return false;
        }
        self.speeds.push(sample);

        if sample.speed >= self.config.target_speed_mps {
            self.phase = LaunchPhase::Captured;
            info!(
                "Target speed reached at {:.3} ({} inertial, {} speed samples)",
                sample.timestamp,
                self.inertial.len(),
                self.speeds.len()
            );
        }
        true
    }

    /// Lockstep ingestion from a source that reports ground speed with every
    /// inertial sample.
    ///
    /// Only at-rest readings and the reading that reaches the target are
    /// kept as speed samples, stamped with the inertial timestamp. The anchor
    /// is then the last moment at rest and matches an inertial sample exactly.
    /// Keeping every reading would put the anchor one sample before the
    /// crossing and leave nothing to integrate.
    pub fn ingest_paired(&mut self, sample: InertialSample, ground_speed: f64) -> bool {
        let timestamp = sample.timestamp;
        if !self.ingest(sample) {
            return false;
        }
        if ground_speed <= self.config.rest_speed_mps
            || ground_speed >= self.config.target_speed_mps
        {
            self.ingest_speed(SpeedSample::new(timestamp, ground_speed));
        }
        true
    }

    /// Run the analysis over the captured buffers and disarm.
    ///
    /// There is no partial result: either a full report or the reason the
    /// capture could not be timed. Buffers are released either way; a new
    /// attempt needs a fresh `arm`.
    pub fn finalize(&mut self) -> Result<LaunchReport, LaunchError> {
        if self.phase == LaunchPhase::Disarmed {
            return Err(LaunchError::NotArmed);
        }

        let inertial = std::mem::take(&mut self.inertial);
        let speeds = std::mem::take(&mut self.speeds);
        self.phase = LaunchPhase::Disarmed;

        let result = pipeline::run(&inertial, &speeds, &self.config);
        match &result {
            Ok(report) => info!(
                "Launch timed: {:.2}s (launch @{}, anchor @{}, peak {:.2} g)",
                report.elapsed_secs,
                report.launch_index,
                report.anchor_index,
                report.peak_forward_accel_g
            ),
            Err(e) => warn!("Launch capture failed: {}", e),
        }
        result
    }
}

impl Default for LaunchEngine {
    fn default() -> Self {
        Self::new(LaunchConfig::default())
    }
}
