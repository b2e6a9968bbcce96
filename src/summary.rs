use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::{TResult, TelemetryError};

/// Route point, tagged with elapsed session seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatePoint {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedPoint {
    pub speed: f64, // mph
    pub timestamp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElevationPoint {
    pub elevation: f64, // feet
    pub timestamp: f64,
}

/// Frozen record of a finished drive.
///
/// Field names and units (miles, mph, feet, mph/s) are what storage and the
/// summary screens read, so they are serialised in camelCase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveSummary {
    pub id: String,
    pub date: String,
    pub duration: f64,
    pub distance: f64,
    pub top_speed: f64,
    pub average_speed: f64,
    pub greatest_acceleration: f64,
    pub elevation_gain: f64,
    pub elevation_loss: f64,
    pub min_elevation: f64,
    pub max_elevation: f64,
    pub route_coordinates: Vec<CoordinatePoint>,
    pub speed_samples: Vec<SpeedPoint>,
    pub elevation_samples: Vec<ElevationPoint>,
}

impl DriveSummary {
    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Serialize to JSON bytes
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn start_time(&self) -> TResult<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.date)
            .map_err(|e| TelemetryError::InvalidTimestamp(format!("{}: {}", self.date, e)))
    }
}

// ─── GPX export ──────────────────────────────────────────────────────────────

/// GPX track format for mapping applications
#[derive(Debug, Serialize)]
pub struct GpxTrack {
    pub name: String,
    pub description: String,
    pub track_points: Vec<GpxPoint>,
}

#[derive(Debug, Serialize)]
pub struct GpxPoint {
    pub lat: f64,
    pub lon: f64,
    pub time: String,
}

impl GpxTrack {
    /// Generate GPX document XML string
    pub fn to_gpx_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str("<gpx version=\"1.1\" creator=\"DriveTracker\">\n");
        xml.push_str("  <metadata>\n");
        xml.push_str(&format!("    <name>{}</name>\n", self.name));
        xml.push_str(&format!("    <desc>{}</desc>\n", self.description));
        xml.push_str("  </metadata>\n");
        xml.push_str("  <trk>\n");
        xml.push_str(&format!("    <name>{}</name>\n", self.name));
        xml.push_str("    <trkseg>\n");

        for point in &self.track_points {
            xml.push_str(&format!(
                "      <trkpt lat=\"{}\" lon=\"{}\">\n",
                point.lat, point.lon
            ));
            xml.push_str(&format!("        <time>{}</time>\n", point.time));
            xml.push_str("      </trkpt>\n");
        }

        xml.push_str("    </trkseg>\n");
        xml.push_str("  </trk>\n");
        xml.push_str("</gpx>\n");

        xml
    }
}

/// Build a GPX track from the downsampled route. Point times are the session
/// start plus each point's elapsed offset.
pub fn create_gpx_track(summary: &DriveSummary) -> TResult<GpxTrack> {
    let start = summary.start_time()?;

    let track_points = summary
        .route_coordinates
        .iter()
        .map(|point| {
            let offset = Duration::milliseconds((point.timestamp * 1000.0).round() as i64);
            GpxPoint {
                lat: point.latitude,
                lon: point.longitude,
                time: (start + offset).to_rfc3339(),
            }
        })
        .collect();

    Ok(GpxTrack {
        name: format!("Drive {}", summary.id),
        description: format!(
            "{:.2} mi, top speed {:.1} mph, recorded from {}",
            summary.distance, summary.top_speed, summary.date
        ),
        track_points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_summary() -> DriveSummary {
        DriveSummary {
            id: "session_1".to_string(),
            date: "2025-11-19T12:00:00+00:00".to_string(),
            duration: 120.0,
            distance: 1.25,
            top_speed: 45.0,
            average_speed: 30.0,
            greatest_acceleration: 4.2,
            elevation_gain: 60.0,
            elevation_loss: 12.0,
            min_elevation: 300.0,
            max_elevation: 360.0,
            route_coordinates: vec![
                CoordinatePoint {
                    latitude: 40.0,
                    longitude: -120.0,
                    timestamp: 3.0,
                },
                CoordinatePoint {
                    latitude: 40.01,
                    longitude: -120.01,
                    timestamp: 6.0,
                },
            ],
            speed_samples: vec![SpeedPoint {
                speed: 30.0,
                timestamp: 5.0,
            }],
            elevation_samples: vec![ElevationPoint {
                elevation: 320.0,
                timestamp: 5.0,
            }],
        }
    }

    #[test]
    fn test_json_uses_camel_case_keys() {
        let json = sample_summary().to_json().unwrap();
        for key in [
            "\"topSpeed\"",
            "\"averageSpeed\"",
            "\"greatestAcceleration\"",
            "\"elevationGain\"",
            "\"elevationLoss\"",
            "\"minElevation\"",
            "\"maxElevation\"",
            "\"routeCoordinates\"",
            "\"speedSamples\"",
            "\"elevationSamples\"",
        ] {
            assert!(json.contains(key), "missing {}", key);
        }
    }

    #[test]
    fn test_json_round_trip() {
        let summary = sample_summary();
        let bytes = summary.to_json_bytes().unwrap();
        let parsed = DriveSummary::from_json(std::str::from_utf8(&bytes).unwrap()).unwrap();
        assert_eq!(parsed, summary);
    }

    #[test]
    fn test_gpx_generation() {
        let track = create_gpx_track(&sample_summary()).unwrap();
        assert_eq!(track.track_points.len(), 2);
        assert_eq!(track.track_points[0].time, "2025-11-19T12:00:03+00:00");

        let xml = track.to_gpx_xml();
        assert!(xml.contains("<trkpt lat=\"40\" lon=\"-120\">"));
        assert!(xml.contains("gpx version=\"1.1\""));
    }

    #[test]
    fn test_gpx_rejects_bad_date() {
        let mut summary = sample_summary();
        summary.date = "yesterday".to_string();
        assert!(matches!(
            create_gpx_track(&summary),
            Err(TelemetryError::InvalidTimestamp(_))
        ));
    }
}
