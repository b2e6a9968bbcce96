// pipeline.rs: post-capture launch analysis
//
// Pure functions over already-buffered samples. Nothing here touches the
// engine's arming state; `run` is the whole pipeline in order:
//   world-frame rotation → launch detection → forward heading
//   → anchor selection → forward integration.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::LaunchConfig;
use crate::error::LaunchError;
use crate::types::{
    device_to_world, planar, planar_norm, unit_planar, InertialSample, PlaneVec, SpeedSample, Vec3,
};

/// Inertial sample rotated into the world frame
#[derive(Clone, Debug, PartialEq)]
pub struct WorldSample {
    pub timestamp: f64,
    pub accel: Vec3, // g
    pub horizontal: f64,
}

/// One step of the integrated run
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VelocityPoint {
    pub time: f64,  // seconds since the anchor
    pub speed: f64, // m/s
}

/// Successful timing of a launch
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaunchReport {
    pub elapsed_secs: f64,
    pub forward: [f64; 2],
    pub launch_index: usize,
    pub anchor_index: usize,
    pub anchor_timestamp: f64,
    pub peak_forward_accel_g: f64,
    pub velocity_trace: Vec<VelocityPoint>,
    pub inertial_samples: usize,
    pub speed_samples: usize,
}

impl LaunchReport {
    pub fn forward_vector(&self) -> PlaneVec {
        PlaneVec::new(self.forward[0], self.forward[1])
    }
}

/// Result of integrating from the anchor to the target crossing
#[derive(Clone, Debug, PartialEq)]
pub struct Integration {
    pub elapsed_secs: f64,
    pub crossing_index: usize,
    pub peak_forward_accel_g: f64,
    pub trace: Vec<VelocityPoint>,
}

// ─── Stages ──────────────────────────────────────────────────────────────────

pub fn to_world_frame(samples: &[InertialSample]) -> Vec<WorldSample> {
    samples
        .iter()
        .map(|s| {
            let accel = device_to_world(&s.accel, &s.attitude);
            WorldSample {
                timestamp: s.timestamp,
                horizontal: planar_norm(&accel),
                accel,
            }
        })
        .collect()
}

/// First index whose horizontal magnitude, and the mean over the `window`
/// samples starting there, both exceed `threshold`.
///
/// Candidates without a full window left in the buffer cannot qualify.
pub fn detect_launch(world: &[WorldSample], threshold: f64, window: usize) -> Option<usize> {
    if window == 0 || world.len() < window {
        return None;
    }

    (0..=world.len() - window).find(|&i| {
        world[i].horizontal > threshold && {
            let sum: f64 = world[i..i + window].iter().map(|w| w.horizontal).sum();
            sum / window as f64 > threshold
        }
    })
}

/// Unit world-plane direction of the summed acceleration over `window`
/// samples from the launch index (truncated at the end of the buffer).
pub fn forward_direction(
    world: &[WorldSample],
    launch_index: usize,
    window: usize,
) -> Result<PlaneVec, LaunchError> {
    let end = (launch_index + window).min(world.len());
    let sum = world[launch_index.min(end)..end]
        .iter()
        .fold(PlaneVec::zeros(), |acc, w| acc + planar(&w.accel));

    unit_planar(&sum).ok_or(LaunchError::DegenerateForwardVector)
}

/// Latest ground-speed sample still below the target, scanning from the end.
pub fn find_anchor(speeds: &[SpeedSample], target: f64) -> Option<&SpeedSample> {
    speeds.iter().rev().find(|s| s.speed < target)
}

/// World sample matching the anchor timestamp: an exact match first, else the
/// nearest sample within `tolerance` seconds.
pub fn anchor_index(world: &[WorldSample], timestamp: f64, tolerance: f64) -> Option<usize> {
    if let Some(i) = world.iter().rposition(|w| w.timestamp == timestamp) {
        return Some(i);
    }

    let (i, gap) = world
        .iter()
        .enumerate()
        .map(|(i, w)| (i, (w.timestamp - timestamp).abs()))
        .min_by(|a, b| a.1.total_cmp(&b.1))?;

    if gap <= tolerance {
        debug!("Anchor {:.3} matched sample {} ({:.4}s away)", timestamp, i, gap);
        Some(i)
    } else {
        None
    }
}

/// Integrate forward acceleration from `start` until the velocity reaches
/// `target` (m/s).
pub fn integrate_forward(
    world: &[WorldSample],
    start: usize,
    forward: &PlaneVec,
    gravity: f64,
    target: f64,
) -> Result<Integration, LaunchError> {
    let t0 = world[start].timestamp;
    let mut velocity = 0.0;
    let mut peak_velocity = 0.0_f64;
    let mut peak_accel = 0.0_f64;
    let mut trace = vec![VelocityPoint {
        time: 0.0,
        speed: 0.0,
    }];

    for i in start + 1..world.len() {
        let prev = &world[i - 1];
        let curr = &world[i];

        let dt = curr.timestamp - prev.timestamp;
        if dt < 0.0 {
            return Err(LaunchError::NonMonotonicTimestamps { index: i });
        }

        let forward_accel = (planar(&curr.accel) * gravity).dot(forward);
        peak_accel = peak_accel.max(forward_accel / gravity);

        velocity += forward_accel * dt;
        peak_velocity = peak_velocity.max(velocity);
        trace.push(VelocityPoint {
            time: curr.timestamp - t0,
            speed: velocity,
        });

        if velocity >= target {
            return Ok(Integration {
                elapsed_secs: curr.timestamp - t0,
                crossing_index: i,
                peak_forward_accel_g: peak_accel,
                trace,
            });
        }
    }

    Err(LaunchError::TargetNotReached { peak_velocity })
}

// ─── Whole pipeline ──────────────────────────────────────────────────────────

pub fn run(
    inertial: &[InertialSample],
    speeds: &[SpeedSample],
    config: &LaunchConfig,
) -> Result<LaunchReport, LaunchError> {
    let world = to_world_frame(inertial);

    let launch_index = detect_launch(&world, config.launch_threshold_g, config.detection_window)
        .ok_or(LaunchError::LaunchNotDetected)?;
    debug!("Launch detected at sample {}", launch_index);

    let forward = forward_direction(&world, launch_index, config.heading_window)?;

    let anchor = find_anchor(speeds, config.target_speed_mps).ok_or(LaunchError::AnchorNotFound)?;
    let start = anchor_index(&world, anchor.timestamp, config.anchor_tolerance_secs).ok_or(
        LaunchError::AnchorNotAligned {
            timestamp: anchor.timestamp,
        },
    )?;

    let integration = integrate_forward(
        &world,
        start,
        &forward,
        config.gravity,
        config.target_speed_mps,
    )?;

    Ok(LaunchReport {
        elapsed_secs: integration.elapsed_secs,
        forward: [forward.x, forward.y],
        launch_index,
        anchor_index: start,
        anchor_timestamp: world[start].timestamp,
        peak_forward_accel_g: integration.peak_forward_accel_g,
        velocity_trace: integration.trace,
        inertial_samples: inertial.len(),
        speed_samples: speeds.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Attitude, DeviceAccel};
    use approx::assert_abs_diff_eq;

    const DT: f64 = 0.01;

    fn flat(timestamp: f64, x: f64, y: f64) -> InertialSample {
        InertialSample::new(timestamp, DeviceAccel { x, y, z: 0.0 }, Attitude::identity())
    }

    fn world_from(magnitudes: &[f64]) -> Vec<WorldSample> {
        let samples: Vec<_> = magnitudes
            .iter()
            .enumerate()
            .map(|(i, &m)| flat(i as f64 * DT, m, 0.0))
            .collect();
        to_world_frame(&samples)
    }

    #[test]
    fn test_sustained_spike_detected_at_first_index() {
        let mut mags = vec![0.05; 100];
        for m in mags.iter_mut().skip(40).take(35) {
            *m = 0.8;
        }
        assert_eq!(detect_launch(&world_from(&mags), 0.5, 30), Some(40));
    }

    #[test]
    fn test_short_spike_not_detected() {
        let mut mags = vec![0.05; 100];
        for m in mags.iter_mut().skip(40).take(20) {
            *m = 0.6;
        }
        assert_eq!(detect_launch(&world_from(&mags), 0.5, 30), None);
    }

    #[test]
    fn test_isolated_bump_skipped_for_later_launch() {
        let mut mags = vec![0.05; 120];
        mags[10] = 2.0; // pothole: one sample above threshold
        for m in mags.iter_mut().skip(60).take(40) {
            *m = 0.7;
        }
        assert_eq!(detect_launch(&world_from(&mags), 0.5, 30), Some(60));
    }

    #[test]
    fn test_spike_at_buffer_end_needs_full_window() {
        let mut mags = vec![0.05; 50];
        for m in mags.iter_mut().skip(25) {
            *m = 0.9;
        }
        // Only 25 samples remain from the first spike sample
        assert_eq!(detect_launch(&world_from(&mags), 0.5, 30), None);
        assert_eq!(detect_launch(&world_from(&mags), 0.5, 25), Some(25));
    }

    #[test]
    fn test_vertical_acceleration_ignored() {
        let samples: Vec<_> = (0..60)
            .map(|i| {
                let accel = DeviceAccel { x: 0.0, y: 0.0, z: 1.5 };
                InertialSample::new(i as f64 * DT, accel, Attitude::identity())
            })
            .collect();
        assert_eq!(detect_launch(&to_world_frame(&samples), 0.5, 30), None);
    }

    #[test]
    fn test_forward_direction() {
        let samples: Vec<_> = (0..60).map(|i| flat(i as f64 * DT, 0.3, 0.4)).collect();
        let world = to_world_frame(&samples);
        let forward = forward_direction(&world, 5, 50).unwrap();
        assert_abs_diff_eq!(forward.x, 0.6, epsilon = 1e-12);
        assert_abs_diff_eq!(forward.y, 0.8, epsilon = 1e-12);

        // Window running past the end is truncated
        assert!(forward_direction(&world, 40, 50).is_ok());
    }

    #[test]
    fn test_degenerate_forward_direction() {
        // Equal and opposite pushes cancel out
        let samples: Vec<_> = (0..50)
            .map(|i| flat(i as f64 * DT, if i % 2 == 0 { 1.0 } else { -1.0 }, 0.0))
            .collect();
        let world = to_world_frame(&samples);
        assert_eq!(
            forward_direction(&world, 0, 50),
            Err(LaunchError::DegenerateForwardVector)
        );
    }

    #[test]
    fn test_find_anchor_scans_from_end() {
        let speeds = vec![
            SpeedSample::new(0.0, 0.0),
            SpeedSample::new(1.0, 10.0),
            SpeedSample::new(2.0, 25.0),
            SpeedSample::new(3.0, 27.5),
        ];
        assert_eq!(find_anchor(&speeds, 26.82).map(|s| s.timestamp), Some(2.0));
        assert!(find_anchor(&speeds[3..], 26.82).is_none());
        assert!(find_anchor(&[], 26.82).is_none());
    }

    #[test]
    fn test_anchor_index_exact_then_nearest() {
        let world = world_from(&[0.0; 10]);
        assert_eq!(anchor_index(&world, world[4].timestamp, 0.0), Some(4));
        assert_eq!(anchor_index(&world, 0.0512, 0.005), Some(5));
        assert_eq!(anchor_index(&world, 0.5, 0.05), None);
        assert_eq!(anchor_index(&[], 0.0, 1.0), None);
    }

    #[test]
    fn test_constant_one_g_integration() {
        let samples: Vec<_> = (0..400).map(|i| flat(i as f64 * DT, 1.0, 0.0)).collect();
        let world = to_world_frame(&samples);
        let forward = PlaneVec::new(1.0, 0.0);

        let run = integrate_forward(&world, 0, &forward, 9.81, 26.82).unwrap();

        // v(t) = 9.81 t along the whole trace
        for point in &run.trace {
            assert_abs_diff_eq!(point.speed, 9.81 * point.time, epsilon = 1e-9);
        }
        // Crossing lands on the first sample at or past 26.82 / 9.81 s
        let exact = 26.82 / 9.81;
        assert!(run.elapsed_secs >= exact - 1e-9);
        assert!(run.elapsed_secs < exact + DT);
        assert_abs_diff_eq!(run.peak_forward_accel_g, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_integration_rejects_backwards_time() {
        let mut samples: Vec<_> = (0..10).map(|i| flat(i as f64 * DT, 1.0, 0.0)).collect();
        samples[6].timestamp = 0.0;
        let world = to_world_frame(&samples);
        assert_eq!(
            integrate_forward(&world, 0, &PlaneVec::new(1.0, 0.0), 9.81, 26.82),
            Err(LaunchError::NonMonotonicTimestamps { index: 6 })
        );
    }

    #[test]
    fn test_integration_reports_shortfall() {
        let samples: Vec<_> = (0..100).map(|i| flat(i as f64 * DT, 0.1, 0.0)).collect();
        let world = to_world_frame(&samples);
        match integrate_forward(&world, 0, &PlaneVec::new(1.0, 0.0), 9.81, 26.82) {
            Err(LaunchError::TargetNotReached { peak_velocity }) => {
                assert_abs_diff_eq!(peak_velocity, 0.981 * 0.99, epsilon = 1e-9)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_run_reports_launch_and_anchor() {
        // 0.5 s at rest, then a steady 1 g launch along world +y
        let samples: Vec<_> = (0..400)
            .map(|i| {
                let t = i as f64 * DT;
                if i < 50 {
                    flat(t, 0.0, 0.0)
                } else {
                    flat(t, 0.0, 1.0)
                }
            })
            .collect();
        let speeds = vec![SpeedSample::new(samples[49].timestamp, 0.0)];

        let report = run(&samples, &speeds, &LaunchConfig::default()).unwrap();
        assert_eq!(report.launch_index, 50);
        assert_eq!(report.anchor_index, 49);
        assert_abs_diff_eq!(report.forward[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(report.forward[1], 1.0, epsilon = 1e-12);
        assert!((report.elapsed_secs - 26.82 / 9.81).abs() < DT);
        assert_eq!(report.inertial_samples, 400);
    }

    #[test]
    fn test_run_failures() {
        let config = LaunchConfig::default();
        let quiet: Vec<_> = (0..100).map(|i| flat(i as f64 * DT, 0.01, 0.0)).collect();
        assert_eq!(
            run(&quiet, &[SpeedSample::new(0.0, 0.0)], &config),
            Err(LaunchError::LaunchNotDetected)
        );
        assert_eq!(run(&[], &[], &config), Err(LaunchError::LaunchNotDetected));

        let launch: Vec<_> = (0..100).map(|i| flat(i as f64 * DT, 1.0, 0.0)).collect();
        assert_eq!(run(&launch, &[], &config), Err(LaunchError::AnchorNotFound));
        assert_eq!(
            run(&launch, &[SpeedSample::new(7.0, 0.0)], &config),
            Err(LaunchError::AnchorNotAligned { timestamp: 7.0 })
        );
    }
}
