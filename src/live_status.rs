use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::display::LiveDisplay;
use crate::session::{LiveStats, SessionState};

/// Dashboard status file, rewritten periodically while a drive records
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LiveStatus {
    pub timestamp: f64,
    pub session_id: String,
    pub state: SessionState,
    // Formatted readouts
    pub time: String,
    pub speed_mph: String,
    pub distance_mi: String,
    pub top_speed_mph: String,
    pub average_speed_mph: String,
    pub acceleration_mph_s: String,
    pub elevation_ft: String,
    pub elevation_gain_ft: String,
    // Raw values
    pub stats: LiveStats,
}

impl LiveStatus {
    pub fn new(session_id: &str, stats: LiveStats) -> Self {
        let display = LiveDisplay::from(&stats);
        Self {
            timestamp: current_timestamp(),
            session_id: session_id.to_string(),
            state: stats.state,
            time: display.time,
            speed_mph: display.speed,
            distance_mi: display.distance,
            top_speed_mph: display.top_speed,
            average_speed_mph: display.average_speed,
            acceleration_mph_s: display.acceleration,
            elevation_ft: display.elevation,
            elevation_gain_ft: display.elevation_gain,
            stats,
        }
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

pub fn current_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
