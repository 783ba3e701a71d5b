//! Prints the four quadrant luminances at a fixed rate.
//!
//! Observation only: no baseline read, no commands. Useful for checking
//! camera wiring and light placement before starting the tracker.

use anyhow::{Context, Result};
use clap::Parser;
use gz_bridge::GzTransport;
use heliotrack::QuadrantReader;
use shared::photometry::CaptureRegion;
use shared::TopicSet;
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Quadrant luminance readout")]
struct Args {
    #[arg(long, default_value = "plate", help = "Prefix of the camera topics")]
    image_prefix: String,

    #[arg(long, default_value_t = 2.0, help = "Readout rate in Hz")]
    rate_hz: f64,

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

fn format_channel(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{value:.4}"),
        None => "---".to_string(),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    anyhow::ensure!(args.rate_hz > 0.0, "readout rate must be positive");

    let topics = TopicSet {
        image_prefix: args.image_prefix,
        ..TopicSet::default()
    };
    let region = match args.center_fraction {
        Some(fraction) => CaptureRegion::Center { fraction },
        None => CaptureRegion::Full,
    };

    let mut transport = GzTransport::new(topics.clone());
    let reader = QuadrantReader::new(region);
    reader
        .attach(&mut transport, &topics)
        .context("Failed to subscribe camera topics")?;

    let interval = Duration::from_secs_f64(1.0 / args.rate_hz);
    let started = Instant::now();
    loop {
        if let Some(max_secs) = args.max_runtime_secs {
            if started.elapsed() >= Duration::from_secs(max_secs) {
                break;
            }
        }

        let snapshot = reader.snapshot();
        info!(
            "Q1={}  Q2={}  Q3={}  Q4={}",
            format_channel(snapshot.q1),
            format_channel(snapshot.q2),
            format_channel(snapshot.q3),
            format_channel(snapshot.q4),
        );
        thread::sleep(interval);
    }

    Ok(())
}
