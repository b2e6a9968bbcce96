//! Unit conventions shared by the aggregator and the launch engine.
//!
//! Location fixes arrive in SI units (metres, m/s). Drive summaries are
//! reported in miles, mph and feet. Inertial samples are in g.

pub const MPS_TO_MPH: f64 = 2.23694;
pub const METERS_TO_FEET: f64 = 3.28084;
pub const METERS_PER_MILE: f64 = 1609.34;
pub const GRAVITY: f64 = 9.81; // m/s²

/// Instantaneous speed in mph. Negative speeds mark an invalid reading and clamp to 0.
pub fn mps_to_mph(speed_mps: f64) -> f64 {
    speed_mps.max(0.0) * MPS_TO_MPH
}

pub fn mph_to_mps(speed_mph: f64) -> f64 {
    speed_mph / MPS_TO_MPH
}

pub fn meters_to_feet(meters: f64) -> f64 {
    meters * METERS_TO_FEET
}

pub fn meters_to_miles(meters: f64) -> f64 {
    meters / METERS_PER_MILE
}
