use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use log::{info, warn};
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Duration};

use drive_tracker_rs::display::share_text;
use drive_tracker_rs::live_status::LiveStatus;
use drive_tracker_rs::recording::{load_json, DriveRecording};
use drive_tracker_rs::sources::{self, DriveEvent};
use drive_tracker_rs::summary::create_gpx_track;
use drive_tracker_rs::{DriveSession, LiveStats, SessionState, TrackerConfig};

#[derive(Parser, Debug)]
#[command(name = "drive_tracker")]
#[command(about = "Replay a recorded drive and produce its summary", long_about = None)]
struct Args {
    /// Path to a drive log (*.json or *.json.gz) with a `locations` array
    #[arg(long)]
    log: PathBuf,

    /// Output directory
    #[arg(long, default_value = "drive_sessions")]
    output_dir: PathBuf,

    /// Replay speed multiplier (0 = as fast as possible, clocked by the log)
    #[arg(long, default_value = "1.0")]
    speedup: f64,

    /// JSON config overriding the default thresholds
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also write a GPX track of the route
    #[arg(long, default_value_t = false)]
    gpx: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => TrackerConfig::load(path)?,
        None => TrackerConfig::default(),
    };
    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;

    let recording: DriveRecording = load_json(&args.log)?;
    info!(
        "Loaded {} fixes from {}",
        recording.locations.len(),
        args.log.display()
    );

    let mut session = DriveSession::new(config.aggregator.clone());
    session.start()?;
    let session_id = session.session_id().to_string();
    info!("Recording {}", session_id);

    let (tx, rx) = mpsc::channel::<DriveEvent>(256);
    let (status_tx, status_rx) = watch::channel(session.snapshot());

    // Session clock runs at replay speed so elapsed time matches the log
    let producer = if args.speedup > 0.0 {
        let period = config.aggregator.tick_period_secs / args.speedup;
        tokio::spawn(sources::tick_loop(
            tx.clone(),
            Duration::from_secs_f64(period),
        ));
        tokio::spawn(sources::replay_locations(
            recording.locations,
            tx,
            args.speedup,
        ))
    } else {
        tokio::spawn(sources::replay_with_log_clock(
            recording.locations,
            tx,
            config.aggregator.tick_period_secs,
        ))
    };
    let status_writer = tokio::spawn(write_status(
        status_rx,
        session_id,
        args.output_dir.join("live_status.json"),
    ));

    let summary = sources::run_aggregator(session, rx, Some(status_tx)).await?;
    let delivered = producer.await?;
    if let Err(e) = status_writer.await {
        warn!("Status writer failed: {}", e);
    }

    let filename = args
        .output_dir
        .join(format!("drive_{}.json", Utc::now().format("%Y%m%d_%H%M%S")));
    std::fs::write(&filename, summary.to_json()?)?;
    info!("Saved summary of {} fixes to {}", delivered, filename.display());

    if args.gpx {
        let track = create_gpx_track(&summary)?;
        let gpx_path = filename.with_extension("gpx");
        std::fs::write(&gpx_path, track.to_gpx_xml())?;
        info!("Saved GPX track to {}", gpx_path.display());
    }

    println!("{}", share_text(&summary));
    Ok(())
}

/// Rewrites the dashboard status file every 2 s, and once more after the
/// session stops.
async fn write_status(mut rx: watch::Receiver<LiveStats>, session_id: String, path: PathBuf) {
    let mut ticker = interval(Duration::from_secs(2));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let stats = rx.borrow().clone();
                save_status(&session_id, &stats, &path);
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                if rx.borrow().state == SessionState::Stopped {
                    break;
                }
            }
        }
    }

    let stats = rx.borrow().clone();
    save_status(&session_id, &stats, &path);
}

fn save_status(session_id: &str, stats: &LiveStats, path: &Path) {
    let status = LiveStatus::new(session_id, stats.clone());
    if let Err(e) = status.save(path) {
        warn!("Failed to write {}: {}", path.display(), e);
    }
}
