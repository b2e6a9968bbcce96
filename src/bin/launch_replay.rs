use anyhow::Result;
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;
use tokio::sync::mpsc;

use drive_tracker_rs::recording::{first_speed, inertial_in_order, load_json, LaunchRecording};
use drive_tracker_rs::sources::{self, LaunchEvent};
use drive_tracker_rs::{LaunchEngine, LiveLaunchEstimator, TrackerConfig};

#[derive(Parser, Debug)]
#[command(name = "launch_replay")]
#[command(about = "Time a recorded launch from its inertial log", long_about = None)]
struct Args {
    /// Path to a launch log (*.json or *.json.gz) with `inertial` and `speeds`
    #[arg(long)]
    log: PathBuf,

    /// Target speed in mph
    #[arg(long, default_value = "60.0")]
    target_mph: f64,

    /// JSON config overriding the default thresholds
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let base = match &args.config {
        Some(path) => TrackerConfig::load(path)?,
        None => TrackerConfig::default(),
    };
    let config = base.launch.with_target_mph(args.target_mph);
    config.validate()?;

    let recording: LaunchRecording = load_json(&args.log)?;
    info!(
        "Loaded {} inertial and {} speed samples from {}",
        recording.inertial.len(),
        recording.speeds.len(),
        args.log.display()
    );

    // Engine indices refer to the timestamp-ordered stream, not the file order
    let events = recording.events();
    let inertial = inertial_in_order(&events);

    let mut engine = LaunchEngine::new(config.clone());
    engine.arm_from_rest(first_speed(&events).unwrap_or(0.0))?;

    let (tx, rx) = mpsc::channel::<LaunchEvent>(1024);
    let producer = tokio::spawn(sources::replay_launch(events, tx, 0.0));

    let outcome = sources::run_launch_capture(&mut engine, rx).await;
    producer.await?;

    match outcome {
        Ok(report) => {
            // Streaming estimate along the same heading, for comparison
            if let Some(mut live) = LiveLaunchEstimator::new(report.forward_vector(), &config) {
                let preview = inertial
                    .iter()
                    .skip(report.anchor_index)
                    .find_map(|s| live.update(s));
                match preview {
                    Some(secs) => info!("Live estimate: {:.2}s", secs),
                    None => info!("Live estimate never reached target"),
                }
            }

            println!("{}", serde_json::to_string_pretty(&report)?);
            println!(
                "0-{:.0} mph: {:.2}s",
                args.target_mph, report.elapsed_secs
            );
        }
        Err(e) => {
            warn!("No timing: {}", e);
            println!("Launch not timed: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
