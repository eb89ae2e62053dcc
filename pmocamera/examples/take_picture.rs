//! Example: find a camera on the network and take one picture
//!
//! Run with: cargo run -p pmocamera --example take_picture
//!
//! Timings can be tuned with `PMOCAMERA__*` variables, for instance
//! `PMOCAMERA__SETTLING_DELAY_MS=1000`.

use anyhow::Result;
use pmocamera::{Camera, CameraConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut camera = Camera::builder().config(CameraConfig::from_env()?).build()?;
    camera.connect().await?;

    println!("Camera API:");
    for signature in camera.api()? {
        println!("  {}", signature);
    }

    let outcome = camera.picture().await?;
    match outcome.value() {
        Some(value) => println!("\n{}", serde_json::to_string_pretty(value)?),
        None => println!("\nNo picture: {:?}", outcome.error()),
    }

    Ok(())
}
