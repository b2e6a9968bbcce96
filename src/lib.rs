// Drive Tracker
// Drive statistics from location fixes and inertial launch timing

pub mod config;
pub mod display;
pub mod error;
pub mod launch;
pub mod live_status;
pub mod recording;
pub mod session;
pub mod sources;
pub mod summary;
pub mod top_speed;
pub mod types;
pub mod units;

pub use config::{AggregatorConfig, LaunchConfig, TrackerConfig};
pub use error::{LaunchError, TResult, TelemetryError};
pub use launch::{LaunchEngine, LaunchPhase, LaunchReport, LiveLaunchEstimator};
pub use session::{DriveSession, LiveStats, SessionState};
pub use summary::DriveSummary;
pub use top_speed::TopSpeedTest;
pub use types::{InertialSample, LocationSample, SpeedSample};
