use thiserror::Error;

/// Drive session and storage errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TelemetryError {
    #[error("Session already recording")]
    AlreadyRecording,

    #[error("Session not recording")]
    NotRecording,

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Result type for session and storage operations
pub type TResult<T> = Result<T, TelemetryError>;

/// Reasons a launch capture could not produce a timing.
///
/// These are surfaced to the user as-is; a failed capture never turns into a
/// zero or partial time.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LaunchError {
    #[error("Launch engine is not armed")]
    NotArmed,

    #[error("Vehicle is not at rest ({speed:.2} m/s)")]
    NotAtRest { speed: f64 },

    #[error("Launch not detected")]
    LaunchNotDetected,

    #[error("Forward direction could not be established")]
    DegenerateForwardVector,

    #[error("No ground-speed sample below the target velocity")]
    AnchorNotFound,

    #[error("No inertial sample aligned with anchor timestamp {timestamp:.3}")]
    AnchorNotAligned { timestamp: f64 },

    #[error("Inertial timestamps go backwards at sample {index}")]
    NonMonotonicTimestamps { index: usize },

    #[error("Target velocity not reached (peak {peak_velocity:.2} m/s)")]
    TargetNotReached { peak_velocity: f64 },
}
