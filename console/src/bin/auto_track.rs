//! Headless auto-tracking loop.
//!
//! Captures the joint baseline, subscribes the four quadrant cameras and
//! runs the tracking controller at the configured rate until interrupted
//! or the runtime limit expires.

use anyhow::{Context, Result};
use clap::Parser;
use gz_bridge::GzTransport;
use heliotrack::{
    CommandPublisher, QuadrantReader, StepLadder, SunTracker, TrackerCallbackEvent, TrackerConfig,
};
use shared::photometry::CaptureRegion;
use shared::TopicSet;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless quadrant tracking for the dish")]
struct Args {
    #[arg(long, default_value = "plate", help = "Prefix of the camera topics")]
    image_prefix: String,

    #[arg(long, default_value = "three_link_model", help = "Simulator model name")]
    model: String,

    #[arg(
        long,
        default_value = "three_link_with_tracker_plate_world",
        help = "Simulator world name"
    )]
    world: String,

    #[arg(long, default_value = "joint_azimuth")]
    azimuth_joint: String,

    #[arg(long, default_value = "joint_elevation")]
    elevation_joint: String,

    #[arg(long, default_value_t = 0.00005, help = "Finest correction step (rad)")]
    step_1: f64,

    #[arg(long, default_value_t = 0.0005)]
    step_2: f64,

    #[arg(long, default_value_t = 0.002)]
    step_3: f64,

    #[arg(long, default_value_t = 0.003, help = "Coarsest correction step (rad)")]
    step_4: f64,

    #[arg(long, default_value_t = 1.0, help = "First step-regime boundary")]
    thresh_1: f64,

    #[arg(long, default_value_t = 5.0)]
    thresh_2: f64,

    #[arg(long, default_value_t = 15.0)]
    thresh_3: f64,

    #[arg(long, default_value_t = 0.00001, help = "Dead-band on luminance differences")]
    eps: f64,

    #[arg(long, default_value_t = 40.0, help = "Control tick frequency in Hz")]
    control_freq_hz: f64,

    #[arg(long, default_value_t = 3.0, help = "Baseline read timeout in seconds")]
    baseline_timeout_secs: f64,

    #[arg(
        long,
        help = "Average luminance over a centered window with sides this fraction of the frame"
    )]
    center_fraction: Option<f64>,

    #[arg(
        short = 't',
        long,
        help = "Maximum runtime in seconds (runs indefinitely if not specified)"
    )]
    max_runtime_secs: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let topics = TopicSet {
        image_prefix: args.image_prefix,
        model: args.model,
        world: args.world,
    };
    let config = TrackerConfig {
        steps: StepLadder {
            step_1: args.step_1,
            step_2: args.step_2,
            step_3: args.step_3,
            step_4: args.step_4,
            thresh_1: args.thresh_1,
            thresh_2: args.thresh_2,
            thresh_3: args.thresh_3,
        },
        eps: args.eps,
        control_freq_hz: args.control_freq_hz,
        azimuth_joint: args.azimuth_joint,
        elevation_joint: args.elevation_joint,
        baseline_timeout_secs: args.baseline_timeout_secs,
        region: match args.center_fraction {
            Some(fraction) => CaptureRegion::Center { fraction },
            None => CaptureRegion::Full,
        },
    };

    info!("Subscribing quadrant cameras under {}/", topics.image_prefix);
    let mut transport = GzTransport::new(topics.clone());
    let reader = QuadrantReader::new(config.region);
    reader
        .attach(&mut transport, &topics)
        .context("Failed to subscribe camera topics")?;
    let transport = Arc::new(transport);

    let mut publisher = CommandPublisher::new(
        topics.position_command(&config.azimuth_joint),
        topics.position_command(&config.elevation_joint),
    );

    let mut tracker = SunTracker::new(config)?;
    let _callback_id = tracker.register_callback(|event| match event {
        TrackerCallbackEvent::TrackingStarted { baseline } => {
            info!(
                "TRACKING STARTED - azimuth {:.4} rad, elevation {:.4} rad",
                baseline.azimuth, baseline.elevation
            );
        }
        TrackerCallbackEvent::TickCompleted { report } => {
            info!(
                "Q1={:.3} Q2={:.3} Q3={:.3} Q4={:.3}  d12={:.3} d14={:.3}  {:?}  cmd az={:.4} el={:.4}",
                report.reading.q1,
                report.reading.q2,
                report.reading.q3,
                report.reading.q4,
                report.diffs.d12,
                report.diffs.d14,
                report.azimuth_mode,
                report.commands.azimuth,
                report.commands.elevation,
            );
        }
        TrackerCallbackEvent::WaitingForSensors => {
            info!("Waiting for all four cameras...");
        }
        TrackerCallbackEvent::TrackingStopped => {
            info!("Tracking stopped");
        }
    });

    info!("Reading joint baseline...");
    tracker
        .start(transport.as_ref())
        .context("Tracking did not start")?;
    publisher.attach(transport.clone());

    let interval = tracker.config().tick_interval();
    let started = Instant::now();
    loop {
        if let Some(max_secs) = args.max_runtime_secs {
            if started.elapsed() >= Duration::from_secs(max_secs) {
                info!("Runtime limit reached");
                break;
            }
        }

        let tick_started = Instant::now();
        if let Some(commands) = tracker.tick(&reader.snapshot()) {
            publisher.publish(&commands);
        }
        if let Some(remaining) = interval.checked_sub(tick_started.elapsed()) {
            thread::sleep(remaining);
        }
    }

    tracker.stop();
    publisher.detach();
    Ok(())
}
