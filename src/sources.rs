//! Async plumbing between sample producers and the single-owner aggregators.
//!
//! Producers (live sources, log replays, the session clock) push into an mpsc
//! channel; one consumer task owns the [`DriveSession`] or [`LaunchEngine`]
//! and applies events strictly in arrival order.

use log::{debug, info, warn};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::sync::watch;
use tokio::time::{interval, sleep, Duration};

use crate::error::{LaunchError, TResult};
use crate::launch::{LaunchEngine, LaunchReport};
use crate::session::{DriveSession, LiveStats};
use crate::summary::DriveSummary;
use crate::types::{InertialSample, LocationSample, SpeedSample};

#[derive(Clone, Debug)]
pub enum DriveEvent {
    Location(LocationSample),
    Tick,
    Stop,
}

#[derive(Clone, Debug)]
pub enum LaunchEvent {
    Inertial(InertialSample),
    Speed(SpeedSample),
}

impl LaunchEvent {
    pub fn timestamp(&self) -> f64 {
        match self {
            LaunchEvent::Inertial(s) => s.timestamp,
            LaunchEvent::Speed(s) => s.timestamp,
        }
    }

    pub fn is_speed(&self) -> bool {
        matches!(self, LaunchEvent::Speed(_))
    }
}

// ─── Producers ───────────────────────────────────────────────────────────────

/// Sleep for the recorded gap between samples, scaled by `speedup`.
/// A non-positive `speedup` replays as fast as possible.
async fn pace(last: &mut Option<f64>, timestamp: f64, speedup: f64) {
    if let Some(prev) = last.replace(timestamp) {
        let gap = timestamp - prev;
        if speedup > 0.0 && gap > 0.0 {
            sleep(Duration::from_secs_f64(gap / speedup)).await;
        }
    }
}

/// Replay recorded fixes at their recorded cadence, then send `Stop`.
/// Returns the number of fixes delivered.
pub async fn replay_locations(
    samples: Vec<LocationSample>,
    tx: Sender<DriveEvent>,
    speedup: f64,
) -> usize {
    let mut last = None;
    let mut sent = 0usize;

    for fix in samples {
        pace(&mut last, fix.timestamp, speedup).await;
        if tx.send(DriveEvent::Location(fix)).await.is_err() {
            warn!("[replay] Channel closed after {} fixes", sent);
            return sent;
        }
        sent += 1;
    }

    info!("[replay] {} fixes delivered", sent);
    let _ = tx.send(DriveEvent::Stop).await;
    sent
}

/// Instant replay that derives session ticks from the recorded timestamps
/// instead of the wall clock, then sends `Stop`.
pub async fn replay_with_log_clock(
    samples: Vec<LocationSample>,
    tx: Sender<DriveEvent>,
    tick_period: f64,
) -> usize {
    let mut next_tick: Option<f64> = None;
    let mut sent = 0usize;

    for fix in samples {
        let due = next_tick.get_or_insert(fix.timestamp + tick_period);
        while tick_period > 0.0 && fix.timestamp >= *due {
            if tx.send(DriveEvent::Tick).await.is_err() {
                return sent;
            }
            *due += tick_period;
        }
        if tx.send(DriveEvent::Location(fix)).await.is_err() {
            warn!("[replay] Channel closed after {} fixes", sent);
            return sent;
        }
        sent += 1;
    }

    info!("[replay] {} fixes delivered", sent);
    let _ = tx.send(DriveEvent::Stop).await;
    sent
}

/// Session clock: one `Tick` per `period` until the consumer goes away.
pub async fn tick_loop(tx: Sender<DriveEvent>, period: Duration) {
    let mut ticker = interval(period);
    ticker.tick().await; // first tick completes immediately
    let mut ticks = 0u64;

    loop {
        ticker.tick().await;
        match tx.try_send(DriveEvent::Tick) {
            Ok(_) => ticks += 1,
            Err(TrySendError::Closed(_)) => {
                debug!("[clock] Channel closed after {} ticks", ticks);
                break;
            }
            Err(TrySendError::Full(_)) => {
                // Consumer is behind, drop this tick
            }
        }
    }
}

/// Replay a merged inertial/speed stream.
pub async fn replay_launch(
    events: Vec<LaunchEvent>,
    tx: Sender<LaunchEvent>,
    speedup: f64,
) -> usize {
    let mut last = None;
    let mut sent = 0usize;

    for event in events {
        pace(&mut last, event.timestamp(), speedup).await;
        if tx.send(event).await.is_err() {
            debug!("[replay] Launch channel closed after {} events", sent);
            break;
        }
        sent += 1;
    }
    sent
}

// ─── Consumers ───────────────────────────────────────────────────────────────

/// Drive the session from `rx` until `Stop` or until every producer is gone,
/// then stop the session and return its summary.
///
/// When `status` is given, a fresh snapshot is published after each event.
pub async fn run_aggregator(
    mut session: DriveSession,
    mut rx: Receiver<DriveEvent>,
    status: Option<watch::Sender<LiveStats>>,
) -> TResult<DriveSummary> {
    while let Some(event) = rx.recv().await {
        match event {
            DriveEvent::Location(fix) => {
                session.ingest(&fix);
            }
            DriveEvent::Tick => session.tick(),
            DriveEvent::Stop => break,
        }
        if let Some(tx) = &status {
            tx.send_replace(session.snapshot());
        }
    }

    let summary = session.stop()?;
    if let Some(tx) = &status {
        tx.send_replace(session.snapshot());
    }
    Ok(summary)
}

/// Feed an armed engine until capture completes or the stream ends, then
/// finalize it.
pub async fn run_launch_capture(
    engine: &mut LaunchEngine,
    mut rx: Receiver<LaunchEvent>,
) -> Result<LaunchReport, LaunchError> {
    while let Some(event) = rx.recv().await {
        match event {
            LaunchEvent::Inertial(sample) => {
                engine.ingest(sample);
            }
            LaunchEvent::Speed(sample) => {
                engine.ingest_speed(sample);
            }
        }
        if engine.is_capture_complete() {
            break;
        }
    }

    if !engine.is_capture_complete() {
        let (inertial, speeds) = engine.buffer_sizes();
        warn!(
            "Launch stream ended before target speed ({} inertial, {} speed samples)",
            inertial, speeds
        );
    }
    engine.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionState;
    use crate::types::{Attitude, DeviceAccel};
    use crate::units::mph_to_mps;
    use tokio::sync::mpsc;

    fn fix(timestamp: f64, lat: f64, speed_mph: f64) -> LocationSample {
        LocationSample::new(timestamp, lat, -122.0, 10.0, mph_to_mps(speed_mph), 5.0)
    }

    #[tokio::test]
    async fn test_replay_then_aggregate() {
        let mut session = DriveSession::default();
        session.start().unwrap();

        let fixes: Vec<_> = (0..6)
            .map(|i| fix(i as f64, 37.0 + i as f64 * 0.0001, 20.0 + i as f64))
            .collect();

        let (tx, rx) = mpsc::channel(16);
        let (status_tx, status_rx) = watch::channel(session.snapshot());
        let producer = tokio::spawn(replay_locations(fixes, tx, 0.0));

        let summary = run_aggregator(session, rx, Some(status_tx)).await.unwrap();
        assert_eq!(producer.await.unwrap(), 6);

        assert!((summary.top_speed - 25.0).abs() < 1e-9);
        assert!(summary.distance > 0.0);

        let last = status_rx.borrow().clone();
        assert_eq!(last.state, SessionState::Stopped);
        assert_eq!(last.fixes_ingested, 6);
    }

    #[tokio::test]
    async fn test_ticks_advance_session_clock() {
        let mut session = DriveSession::default();
        session.start().unwrap();

        let (tx, rx) = mpsc::channel(16);
        for _ in 0..3 {
            tx.send(DriveEvent::Tick).await.unwrap();
        }
        tx.send(DriveEvent::Stop).await.unwrap();

        let summary = run_aggregator(session, rx, None).await.unwrap();
        assert_eq!(summary.duration, 3.0);
    }

    #[tokio::test]
    async fn test_log_clock_ticks_follow_timestamps() {
        let mut session = DriveSession::default();
        session.start().unwrap();

        // 0 .. 9.5 s of fixes at 2 Hz
        let fixes: Vec<_> = (0..20).map(|i| fix(i as f64 * 0.5, 37.0, 10.0)).collect();
        let (tx, rx) = mpsc::channel(64);
        let producer = tokio::spawn(replay_with_log_clock(fixes, tx, 1.0));

        let summary = run_aggregator(session, rx, None).await.unwrap();
        assert_eq!(producer.await.unwrap(), 20);
        assert_eq!(summary.duration, 9.0);
        assert!((summary.average_speed - 10.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_aggregator_requires_recording_session() {
        let (tx, rx) = mpsc::channel(1);
        drop(tx);
        let result = run_aggregator(DriveSession::default(), rx, None).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_tick_loop_stops_when_consumer_drops() {
        let (tx, mut rx) = mpsc::channel(4);
        let clock = tokio::spawn(tick_loop(tx, Duration::from_millis(5)));

        for _ in 0..3 {
            assert!(matches!(rx.recv().await, Some(DriveEvent::Tick)));
        }
        drop(rx);
        clock.await.unwrap();
    }

    #[tokio::test]
    async fn test_launch_capture_over_channel() {
        let mut engine = LaunchEngine::default();
        engine.arm_from_rest(0.0).unwrap();

        let dt = 0.01;
        let mut events = Vec::new();
        for i in 0..=400 {
            let t = i as f64 * dt;
            let x = if i < 100 { 0.0 } else { 1.0 };
            events.push(LaunchEvent::Inertial(InertialSample::new(
                t,
                DeviceAccel { x, y: 0.0, z: 0.0 },
                Attitude::identity(),
            )));
            if i == 50 {
                events.push(LaunchEvent::Speed(SpeedSample::new(t, 0.0)));
            }
        }
        events.push(LaunchEvent::Speed(SpeedSample::new(4.0, 27.0)));
        // Anything after the target is never consumed
        events.push(LaunchEvent::Speed(SpeedSample::new(4.1, 28.0)));

        let (tx, rx) = mpsc::channel(64);
        let producer = tokio::spawn(replay_launch(events, tx, 0.0));
        let report = run_launch_capture(&mut engine, rx).await.unwrap();
        producer.await.unwrap();

        assert_eq!(report.launch_index, 100);
        assert_eq!(report.anchor_index, 50);
        assert_eq!(report.speed_samples, 2);
        assert!(report.elapsed_secs > 3.2 && report.elapsed_secs < 3.25);
    }

    #[tokio::test]
    async fn test_launch_stream_ends_early() {
        let mut engine = LaunchEngine::default();
        engine.arm();
        let (tx, rx) = mpsc::channel(4);
        drop(tx);
        assert_eq!(
            run_launch_capture(&mut engine, rx).await,
            Err(LaunchError::LaunchNotDetected)
        );
    }
}
