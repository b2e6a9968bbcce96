use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{TResult, TelemetryError};
use crate::units::{mph_to_mps, GRAVITY};

// ─── Drive aggregator ────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    // ── Timer ──
    pub tick_period_secs: f64,

    // ── Speed ──
    pub moving_floor_mph: f64,

    // ── Acceleration (accepted time delta is exclusive on both ends) ──
    pub accel_min_dt_secs: f64,
    pub accel_max_dt_secs: f64,

    // ── Elevation ──
    pub elevation_noise_ft: f64,

    // ── Distance gating ──
    pub max_accuracy_m: f64,
    pub distance_floor_mph: f64,
    pub max_step_m: f64,

    // ── Downsampling ──
    pub route_stride: u64,
    pub detail_stride: u64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            tick_period_secs: 1.0,
            moving_floor_mph: 0.5,
            accel_min_dt_secs: 0.1,
            accel_max_dt_secs: 2.0,
            elevation_noise_ft: 5.0,
            max_accuracy_m: 50.0,
            distance_floor_mph: 1.0,
            max_step_m: 100.0,
            route_stride: 3,
            detail_stride: 5,
        }
    }
}

impl AggregatorConfig {
    pub fn validate(&self) -> TResult<()> {
        if self.tick_period_secs <= 0.0 {
            return Err(invalid("tick_period_secs must be positive"));
        }
        if self.accel_min_dt_secs < 0.0 || self.accel_min_dt_secs >= self.accel_max_dt_secs {
            return Err(invalid("acceleration window must satisfy 0 <= min < max"));
        }
        if self.elevation_noise_ft < 0.0 {
            return Err(invalid("elevation_noise_ft must not be negative"));
        }
        if self.max_accuracy_m <= 0.0 || self.max_step_m <= 0.0 {
            return Err(invalid("distance gates must be positive"));
        }
        if self.route_stride == 0 || self.detail_stride == 0 {
            return Err(invalid("downsampling strides must be at least 1"));
        }
        Ok(())
    }
}

// ─── Launch timing ───────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    // ── Detection ──
    pub launch_threshold_g: f64,
    pub detection_window: usize,

    // ── Heading ──
    pub heading_window: usize,

    // ── Integration ──
    pub gravity: f64,
    pub target_speed_mps: f64,
    pub anchor_tolerance_secs: f64,

    // ── Arming ──
    pub rest_speed_mps: f64,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            launch_threshold_g: 0.5,
            detection_window: 30,
            heading_window: 50,
            gravity: GRAVITY,
            target_speed_mps: 26.82,
            anchor_tolerance_secs: 0.05,
            rest_speed_mps: 0.0,
        }
    }
}

impl LaunchConfig {
    /// Same tuning, different target speed.
    pub fn with_target_mph(mut self, target_mph: f64) -> Self {
        self.target_speed_mps = mph_to_mps(target_mph);
        self
    }

    pub fn validate(&self) -> TResult<()> {
        if self.launch_threshold_g <= 0.0 {
            return Err(invalid("launch_threshold_g must be positive"));
        }
        if self.detection_window == 0 || self.heading_window == 0 {
            return Err(invalid("detection and heading windows must be at least 1"));
        }
        if self.gravity <= 0.0 || self.target_speed_mps <= 0.0 {
            return Err(invalid("gravity and target speed must be positive"));
        }
        if self.anchor_tolerance_secs < 0.0 || self.rest_speed_mps < 0.0 {
            return Err(invalid("tolerances must not be negative"));
        }
        Ok(())
    }
}

// ─── File-backed configuration ───────────────────────────────────────────────

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub aggregator: AggregatorConfig,
    pub launch: LaunchConfig,
}

impl TrackerConfig {
    /// Load a JSON config file; missing fields keep their defaults.
    pub fn load(path: &Path) -> TResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| TelemetryError::StorageError(format!("{}: {}", path.display(), e)))?;
        let config: TrackerConfig = serde_json::from_str(&text)
            .map_err(|e| TelemetryError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> TResult<()> {
        self.aggregator.validate()?;
        self.launch.validate()
    }
}

fn invalid(msg: &str) -> TelemetryError {
    TelemetryError::InvalidConfig(msg.to_string())
}
