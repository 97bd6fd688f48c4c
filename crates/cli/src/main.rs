//! tether command-line tool
//!
//! Drains photos from a camera in tethered mode and saves each one into the
//! output directory as it arrives. The capture engine reconnects on its own;
//! this binary only wires up configuration, logging, Ctrl+C, and persistence.

mod config;
mod driver;
mod writer;

use anyhow::{Context, Result};
use clap::Parser;
use config::CliConfig;
use std::path::PathBuf;
use std::time::Instant;
use tether::{CancellationToken, Tether, setup_logging};
use tokio::signal;
use tracing::{error, info};
use writer::CaptureWriter;

#[derive(Parser, Debug)]
#[command(name = "tether")]
#[command(
    author,
    version,
    about = "Tethered capture - download photos from a camera as they are taken"
)]
#[command(long_about = "
Continuously downloads photos from a camera running in tethered mode and
saves them into the output directory, reconnecting automatically when the
camera drops off the bus.

EXAMPLES:
    # Save photos to ./tether
    tether

    # Custom output directory with verbose logging
    tether --output ~/shoots/today --verbose

    # Leave the originals on the camera's storage
    tether --keep-on-camera

CONFIGURATION:
    The tool looks for configuration files in the following order:
    1. Path specified with --config
    2. ~/.config/tether/config.toml
    3. /etc/tether/config.toml
    4. Built-in defaults
")]
struct Args {
    /// Photo download directory
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Enable verbose log output (same as --log-level debug)
    #[arg(short, long)]
    verbose: bool,

    /// Leave captured files on the camera's storage
    #[arg(long)]
    keep_on_camera: bool,

    /// Save default configuration to the default location and exit
    #[arg(long)]
    save_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.save_config {
        let config = CliConfig::default();
        let path = CliConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let config = if let Some(ref path) = args.config {
        CliConfig::load(Some(path.clone())).context("Failed to load configuration")?
    } else {
        CliConfig::load_or_default()
    };

    let log_level = if args.verbose {
        "debug"
    } else {
        args.log_level
            .as_deref()
            .unwrap_or(&config.general.log_level)
    };
    setup_logging(log_level).context("Failed to setup logging")?;

    let output_dir = args
        .output
        .unwrap_or_else(|| config.capture.output_dir.clone());
    std::fs::create_dir_all(&output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            output_dir.display()
        )
    })?;

    let mut engine_config = config.engine_config();
    if args.keep_on_camera {
        engine_config.delete_after_fetch = false;
    }

    let camera = driver::open_driver()?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl+C, shutting down gracefully...");
                cancel.cancel();
            }
        });
    }

    info!("tether v{}", env!("CARGO_PKG_VERSION"));
    info!("Saving photos to: {}", output_dir.display());

    let handle = Tether::new(camera).with_config(engine_config).start(cancel);
    let captures = handle.captures();
    let mut writer = CaptureWriter::new(&output_dir);

    while let Ok(capture) = captures.recv().await {
        let start = Instant::now();
        match writer.save(&capture) {
            Ok(path) => {
                info!(
                    path = %path.display(),
                    bytes = capture.len(),
                    elapsed = ?start.elapsed(),
                    "downloaded and saved photo"
                );
            }
            Err(e) => {
                // One bad save must not stop the shoot.
                error!("Failed to save capture: {:#}", e);
            }
        }
    }

    info!("Capture stream closed, shutting down");
    if handle.join().is_err() {
        error!("Capture thread panicked");
    }

    Ok(())
}
