//! Recorded sensor logs used to replay drives and launches offline.
//!
//! Logs are plain JSON, optionally gzip-compressed (`.gz` extension).

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{TResult, TelemetryError};
use crate::sources::LaunchEvent;
use crate::types::{InertialSample, LocationSample, SpeedSample};

/// Location fixes for one drive, in arrival order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriveRecording {
    pub locations: Vec<LocationSample>,
}

/// Inertial stream plus ground-speed telemetry for one launch attempt
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LaunchRecording {
    pub inertial: Vec<InertialSample>,
    #[serde(default)]
    pub speeds: Vec<SpeedSample>,
}

impl LaunchRecording {
    /// Merge both streams into one timestamp-ordered event list.
    /// An inertial sample sorts ahead of a speed sample with the same timestamp.
    pub fn events(&self) -> Vec<LaunchEvent> {
        let mut events: Vec<LaunchEvent> = self
            .inertial
            .iter()
            .cloned()
            .map(LaunchEvent::Inertial)
            .chain(self.speeds.iter().copied().map(LaunchEvent::Speed))
            .collect();
        events.sort_by(|a, b| {
            a.timestamp()
                .total_cmp(&b.timestamp())
                .then(a.is_speed().cmp(&b.is_speed()))
        });
        events
    }
}

/// Inertial samples of a merged event list, in the order the engine buffers
/// them. Indices in a `LaunchReport` refer to this sequence.
pub fn inertial_in_order(events: &[LaunchEvent]) -> Vec<InertialSample> {
    events
        .iter()
        .filter_map(|e| match e {
            LaunchEvent::Inertial(s) => Some(s.clone()),
            LaunchEvent::Speed(_) => None,
        })
        .collect()
}

/// First ground-speed reading of a merged event list.
pub fn first_speed(events: &[LaunchEvent]) -> Option<f64> {
    events.iter().find_map(|e| match e {
        LaunchEvent::Speed(s) => Some(s.speed),
        LaunchEvent::Inertial(_) => None,
    })
}

fn is_gzip(path: &Path) -> bool {
    path.extension().map(|e| e == "gz").unwrap_or(false)
}

/// Parse a JSON document from any reader.
pub fn parse_json<T: DeserializeOwned, R: Read>(reader: R) -> TResult<T> {
    serde_json::from_reader(BufReader::new(reader))
        .map_err(|e| TelemetryError::StorageError(format!("Failed to parse log: {}", e)))
}

/// Load a `.json` or `.json.gz` log.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> TResult<T> {
    let file = File::open(path)
        .map_err(|e| TelemetryError::StorageError(format!("{}: {}", path.display(), e)))?;

    if is_gzip(path) {
        parse_json(GzDecoder::new(file))
    } else {
        parse_json(file)
    }
}
