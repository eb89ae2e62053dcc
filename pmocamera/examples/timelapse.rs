//! Example: timelapse
//!
//! Run with: cargo run -p pmocamera --example timelapse -- [frames] [interval_secs]

use anyhow::{Context, Result};
use pmocamera::{Camera, CameraConfig};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut args = std::env::args().skip(1);
    let frames: usize = match args.next() {
        Some(arg) => arg.parse().context("frames must be a number")?,
        None => 5,
    };
    let interval: u64 = match args.next() {
        Some(arg) => arg.parse().context("interval must be a number of seconds")?,
        None => 2,
    };

    let mut camera = Camera::builder().config(CameraConfig::from_env()?).build()?;
    camera.connect().await?;

    let outcomes = camera
        .timelapse_with_progress(frames, Duration::from_secs(interval), |i, n, outcome| {
            let status = if outcome.is_done() { "ok" } else { "failed" };
            println!("[{}/{}] {}", i + 1, n, status);
        })
        .await?;

    let taken = outcomes.iter().filter(|o| o.is_done()).count();
    println!("\n{} of {} frames taken", taken, outcomes.len());
    for value in outcomes.iter().filter_map(|o| o.value()) {
        println!("  {}", value);
    }

    Ok(())
}
