use chrono::Utc;
use geo::{HaversineDistance, Point};
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use crate::config::AggregatorConfig;
use crate::error::{TResult, TelemetryError};
use crate::summary::{CoordinatePoint, DriveSummary, ElevationPoint, SpeedPoint};
use crate::types::LocationSample;
use crate::units::{meters_to_feet, meters_to_miles, mps_to_mph};

/// Session state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Created or reset, nothing recorded
    Idle,
    /// Accepting location fixes
    Recording,
    /// Summary emitted; fixes are rejected until the next start
    Stopped,
}

/// Point-in-time copy of the running aggregates, handed to display consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveStats {
    pub state: SessionState,
    pub elapsed_secs: f64,
    pub distance_miles: f64,
    pub current_speed_mph: f64,
    pub top_speed_mph: f64,
    pub average_speed_mph: f64,
    pub greatest_acceleration: f64,
    pub current_elevation_ft: f64,
    pub elevation_gain_ft: f64,
    pub elevation_loss_ft: f64,
    pub fixes_ingested: u64,
    pub fixes_with_distance: u64,
}

/// Running statistics for one recorded drive.
///
/// The session is the single owner of its state: `ingest` and `tick` are the
/// only mutators and callers serialize access to them.
pub struct DriveSession {
    config: AggregatorConfig,
    state: SessionState,
    session_id: String,
    start_time: String,

    elapsed_secs: f64,
    distance_miles: f64,
    current_speed_mph: f64,
    top_speed_mph: f64,
    average_speed_mph: f64,
    greatest_acceleration: f64, // mph/s

    current_elevation_ft: f64,
    min_elevation_ft: f64,
    max_elevation_ft: f64,
    elevation_gain_ft: f64,
    elevation_loss_ft: f64,

    // Previous-sample memory
    last_fix: Option<LocationSample>,
    last_speed: Option<(f64, f64)>, // (mph, timestamp)
    last_elevation_ft: Option<f64>,

    // Average speed over moving samples
    moving_speed_sum: f64,
    moving_speed_count: u64,

    fixes_ingested: u64,
    fixes_with_distance: u64,

    route_coordinates: Vec<CoordinatePoint>,
    speed_samples: Vec<SpeedPoint>,
    elevation_samples: Vec<ElevationPoint>,
}

impl DriveSession {
    /// Create new session in Idle state
    pub fn new(config: AggregatorConfig) -> Self {
        let now = Utc::now();
        Self {
            config,
            state: SessionState::Idle,
            session_id: format!("session_{}", now.timestamp_millis()),
            start_time: now.to_rfc3339(),
            elapsed_secs: 0.0,
            distance_miles: 0.0,
            current_speed_mph: 0.0,
            top_speed_mph: 0.0,
            average_speed_mph: 0.0,
            greatest_acceleration: 0.0,
            current_elevation_ft: 0.0,
            min_elevation_ft: f64::INFINITY,
            max_elevation_ft: f64::NEG_INFINITY,
            elevation_gain_ft: 0.0,
            elevation_loss_ft: 0.0,
            last_fix: None,
            last_speed: None,
            last_elevation_ft: None,
            moving_speed_sum: 0.0,
            moving_speed_count: 0,
            fixes_ingested: 0,
            fixes_with_distance: 0,
            route_coordinates: Vec::new(),
            speed_samples: Vec::new(),
            elevation_samples: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == SessionState::Recording
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    // ── Lifecycle ────────────────────────────────────────────────────────

    /// Idle/Stopped → Recording. Every running aggregate starts from zero.
    pub fn start(&mut self) -> TResult<()> {
        if self.state == SessionState::Recording {
            return Err(TelemetryError::AlreadyRecording);
        }

        let config = self.config.clone();
        *self = Self::new(config);
        self.state = SessionState::Recording;
        info!("Drive session {} started", self.session_id);
        Ok(())
    }

    /// Recording → Stopped, freezing the aggregates into a summary.
    pub fn stop(&mut self) -> TResult<DriveSummary> {
        if self.state != SessionState::Recording {
            return Err(TelemetryError::NotRecording);
        }

        self.state = SessionState::Stopped;
        let summary = self.build_summary();
        info!(
            "Drive session {} stopped: {:.2} mi in {:.0}s, top {:.1} mph ({} fixes)",
            self.session_id,
            summary.distance,
            summary.duration,
            summary.top_speed,
            self.fixes_ingested
        );
        Ok(summary)
    }

    /// Discard everything and return to Idle.
    pub fn reset(&mut self) {
        let config = self.config.clone();
        *self = Self::new(config);
    }

    // ── Timer ────────────────────────────────────────────────────────────

    /// Scheduled tick: advance the session clock and refresh the average speed.
    pub fn tick(&mut self) {
        if !self.is_recording() {
            return;
        }
        self.elapsed_secs += self.config.tick_period_secs;
        self.average_speed_mph = if self.moving_speed_count == 0 {
            0.0
        } else {
            self.moving_speed_sum / self.moving_speed_count as f64
        };
    }

    // ── Ingestion ────────────────────────────────────────────────────────

    /// Fold one location fix into the running statistics.
    ///
    /// Returns `false` when the session is not recording and the fix was
    /// ignored. Implausible readings are dropped per aggregate, never as an
    /// error.
    pub fn ingest(&mut self, fix: &LocationSample) -> bool {
        if !self.is_recording() {
            trace!("Fix at {:.3} ignored: session not recording", fix.timestamp);
            return false;
        }

        self.fixes_ingested += 1;
        let speed_mph = mps_to_mph(fix.speed);
        let elevation_ft = meters_to_feet(fix.altitude);

        self.update_speed(speed_mph);
        self.update_acceleration(speed_mph, fix.timestamp);
        self.update_elevation(elevation_ft);
        self.sample_series(fix, speed_mph, elevation_ft);
        self.update_distance(fix, speed_mph);

        self.last_fix = Some(fix.clone());
        true
    }

    fn update_speed(&mut self, speed_mph: f64) {
        self.current_speed_mph = speed_mph;

        if speed_mph > self.config.moving_floor_mph {
            self.moving_speed_sum += speed_mph;
            self.moving_speed_count += 1;
            if speed_mph > self.top_speed_mph {
                self.top_speed_mph = speed_mph;
            }
        }
    }

    fn update_acceleration(&mut self, speed_mph: f64, timestamp: f64) {
        if let Some((last_mph, last_ts)) = self.last_speed {
            let dt = timestamp - last_ts;
            if dt > self.config.accel_min_dt_secs && dt < self.config.accel_max_dt_secs {
                let acceleration = (speed_mph - last_mph) / dt;
                // Braking is not tracked; the floor of 0 keeps it out.
                if acceleration > self.greatest_acceleration {
                    self.greatest_acceleration = acceleration;
                }
            } else {
                debug!("Acceleration skipped: dt {:.3}s outside window", dt);
            }
        }
        self.last_speed = Some((speed_mph, timestamp));
    }

    fn update_elevation(&mut self, elevation_ft: f64) {
        self.current_elevation_ft = elevation_ft;
        self.min_elevation_ft = self.min_elevation_ft.min(elevation_ft);
        self.max_elevation_ft = self.max_elevation_ft.max(elevation_ft);

        if let Some(last) = self.last_elevation_ft {
            let delta = elevation_ft - last;
            if delta > self.config.elevation_noise_ft {
                self.elevation_gain_ft += delta;
            } else if delta < -self.config.elevation_noise_ft {
                self.elevation_loss_ft += delta.abs();
            } else {
                trace!("Elevation delta {:.1} ft within noise floor", delta);
            }
        }
        self.last_elevation_ft = Some(elevation_ft);
    }

    /// Downsampled series are stamped with the timer-driven session clock, not
    /// the fix's own timestamp.
    fn sample_series(&mut self, fix: &LocationSample, speed_mph: f64, elevation_ft: f64) {
        let timestamp = self.elapsed_secs;

        if self.fixes_ingested % self.config.route_stride == 0 {
            self.route_coordinates.push(CoordinatePoint {
                latitude: fix.latitude,
                longitude: fix.longitude,
                timestamp,
            });
        }

        if self.fixes_ingested % self.config.detail_stride == 0 {
            self.speed_samples.push(SpeedPoint {
                speed: speed_mph,
                timestamp,
            });
            self.elevation_samples.push(ElevationPoint {
                elevation: elevation_ft,
                timestamp,
            });
        }
    }

    fn update_distance(&mut self, fix: &LocationSample, speed_mph: f64) {
        let Some(last) = self.last_fix.as_ref() else {
            return;
        };

        let accuracy = fix.horizontal_accuracy;
        if accuracy < 0.0 || accuracy >= self.config.max_accuracy_m {
            debug!("Distance skipped: accuracy {:.1} m", accuracy);
            return;
        }
        if speed_mph <= self.config.distance_floor_mph {
            return;
        }

        let step_m = Point::new(last.longitude, last.latitude)
            .haversine_distance(&Point::new(fix.longitude, fix.latitude));

        // The jump bound is per second of fix spacing, never less than one second.
        let spacing = (fix.timestamp - last.timestamp).max(1.0);
        let max_step = self.config.max_step_m * spacing;
        if step_m >= max_step {
            debug!(
                "Distance skipped: {:.1} m jump exceeds {:.1} m bound",
                step_m, max_step
            );
            return;
        }

        self.distance_miles += meters_to_miles(step_m);
        self.fixes_with_distance += 1;
    }

    // ── Read side ────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> LiveStats {
        LiveStats {
            state: self.state,
            elapsed_secs: self.elapsed_secs,
            distance_miles: self.distance_miles,
            current_speed_mph: self.current_speed_mph,
            top_speed_mph: self.top_speed_mph,
            average_speed_mph: self.average_speed_mph,
            greatest_acceleration: self.greatest_acceleration,
            current_elevation_ft: self.current_elevation_ft,
            elevation_gain_ft: self.elevation_gain_ft,
            elevation_loss_ft: self.elevation_loss_ft,
            fixes_ingested: self.fixes_ingested,
            fixes_with_distance: self.fixes_with_distance,
        }
    }

    fn build_summary(&self) -> DriveSummary {
        DriveSummary {
            id: self.session_id.clone(),
            date: self.start_time.clone(),
            duration: self.elapsed_secs,
            distance: self.distance_miles,
            top_speed: self.top_speed_mph,
            average_speed: self.average_speed_mph,
            greatest_acceleration: self.greatest_acceleration,
            elevation_gain: self.elevation_gain_ft,
            elevation_loss: self.elevation_loss_ft,
            min_elevation: finite_or_zero(self.min_elevation_ft),
            max_elevation: finite_or_zero(self.max_elevation_ft),
            route_coordinates: self.route_coordinates.clone(),
            speed_samples: self.speed_samples.clone(),
            elevation_samples: self.elevation_samples.clone(),
        }
    }
}

impl Default for DriveSession {
    fn default() -> Self {
        Self::new(AggregatorConfig::default())
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
