//! Text formatting for drive statistics.

use crate::session::LiveStats;
use crate::summary::DriveSummary;

/// `MM:SS`, or `H:MM:SS` once the drive passes an hour.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

pub fn format_speed(mph: f64) -> String {
    format!("{:.1}", mph)
}

pub fn format_distance(miles: f64) -> String {
    format!("{:.2}", miles)
}

pub fn format_acceleration(mph_per_sec: f64) -> String {
    format!("{:.1}", mph_per_sec)
}

pub fn format_elevation(feet: f64) -> String {
    format!("{:.0}", feet)
}

/// Dashboard strings for a live snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct LiveDisplay {
    pub time: String,
    pub speed: String,
    pub distance: String,
    pub top_speed: String,
    pub average_speed: String,
    pub acceleration: String,
    pub elevation: String,
    pub elevation_gain: String,
}

impl From<&LiveStats> for LiveDisplay {
    fn from(stats: &LiveStats) -> Self {
        Self {
            time: format_duration(stats.elapsed_secs),
            speed: format_speed(stats.current_speed_mph),
            distance: format_distance(stats.distance_miles),
            top_speed: format_speed(stats.top_speed_mph),
            average_speed: format_speed(stats.average_speed_mph),
            acceleration: format_acceleration(stats.greatest_acceleration),
            elevation: format_elevation(stats.current_elevation_ft),
            elevation_gain: format_elevation(stats.elevation_gain_ft),
        }
    }
}

/// Plain-text summary suitable for sharing a drive.
pub fn share_text(summary: &DriveSummary) -> String {
    format!(
        "Drive Summary\n\n\
         Distance: {} mi\n\
         Duration: {}\n\
         Top Speed: {} mph\n\
         Avg Speed: {} mph\n\
         Max Acceleration: {} mph/s\n\
         Elevation Gain: {} ft",
        format_distance(summary.distance),
        format_duration(summary.duration),
        format_speed(summary.top_speed),
        format_speed(summary.average_speed),
        format_acceleration(summary.greatest_acceleration),
        format_elevation(summary.elevation_gain),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::DriveSession;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "00:00");
        assert_eq!(format_duration(75.0), "01:15");
        assert_eq!(format_duration(3599.0), "59:59");
        assert_eq!(format_duration(3725.0), "1:02:05");
    }

    #[test]
    fn test_number_formats() {
        assert_eq!(format_speed(61.27), "61.3");
        assert_eq!(format_distance(12.3456), "12.35");
        assert_eq!(format_elevation(1234.6), "1235");
        assert_eq!(format_acceleration(4.04), "4.0");
    }

    #[test]
    fn test_live_display_from_idle_session() {
        let session = DriveSession::default();
        let display = LiveDisplay::from(&session.snapshot());
        assert_eq!(display.time, "00:00");
        assert_eq!(display.distance, "0.00");
        assert_eq!(display.speed, "0.0");
    }

    #[test]
    fn test_share_text() {
        let mut session = DriveSession::default();
        session.start().unwrap();
        for _ in 0..90 {
            session.tick();
        }
        let text = share_text(&session.stop().unwrap());
        assert!(text.starts_with("Drive Summary"));
        assert!(text.contains("Distance: 0.00 mi"));
        assert!(text.contains("Duration: 01:30"));
        assert!(text.contains("Elevation Gain: 0 ft"));
    }
}
