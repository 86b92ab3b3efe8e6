//! `spatialfuse` – multi-camera spatial detection fusion.
//!
//! The binary wires the whole stack together:
//!
//! 1. Initialises structured logging (`tracing-subscriber`, compact or JSON).
//! 2. Loads `spatialfuse.toml` (or defaults) and the JSON extrinsics map.
//! 3. Builds a [`FusionEngine`] with one intake queue per calibrated camera
//!    and spawns its worker loop.
//! 4. Intercepts **Ctrl-C** to flip the shutdown flag; the engine flushes
//!    its partial windows before exiting.
//! 5. Subscribes to the fusion bus and logs a one-line summary per frame.
//!
//! With `--demo`, synthetic camera threads feed the intake queues so the
//! pipeline runs without any hardware attached.
//!
//! Usage: `spatialfuse [CONFIG_PATH] [--demo]`

mod config;
mod sim;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use spatialfuse_engine::FusionEngine;
use spatialfuse_types::{FuseError, FusionFrame};
use tracing::{error, info, warn};

use crate::config::Config;

#[tokio::main]
async fn main() {
    init_logging();
    print_banner();

    if let Err(err) = run().await {
        error!(%err, "spatialfuse exited with an error");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), FuseError> {
    let (config_path, demo) = parse_args();

    let config = Config::load(&config_path)?;
    info!(?config_path, ?config, "configuration loaded");

    let extrinsics = config::load_extrinsics(std::path::Path::new(&config.extrinsics_path))?;
    info!(cameras = extrinsics.len(), "extrinsic calibrations loaded");

    let engine = FusionEngine::new(extrinsics, config.engine_config());
    let mut frames = engine.bus().subscribe();

    // ── Shared shutdown flag, flipped by Ctrl-C ───────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || {
            shutdown.store(true, Ordering::Release);
        })
        .map_err(|e| FuseError::Config(format!("cannot install Ctrl-C handler: {e}")))?;
    }

    // ── Demo producers ────────────────────────────────────────────────────
    let sim_handles = if demo {
        let producers = engine
            .camera_ids()
            .iter()
            .filter_map(|id| engine.intake(id))
            .collect();
        sim::spawn_producers(producers, config.target_fps, Arc::clone(&shutdown))
    } else {
        Vec::new()
    };

    // ── Engine worker loop ────────────────────────────────────────────────
    let engine_handle = tokio::spawn(engine.run(Arc::clone(&shutdown)));

    // ── Subscriber: one summary line per fused frame ──────────────────────
    loop {
        match frames.recv().await {
            Ok(output) => match serde_json::from_slice::<FusionFrame>(&output.payload) {
                Ok(frame) => {
                    let objects = frame.groups.len();
                    let detections: usize =
                        frame.groups.iter().map(|g| g.members.len()).sum();
                    info!(
                        window_start_ms = frame.window_start_ms,
                        objects, detections, "fused frame"
                    );
                }
                Err(e) => warn!(%e, "undecodable frame payload"),
            },
            Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                warn!(lagged_by = n, "frame subscriber fell behind");
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }

    engine_handle
        .await
        .map_err(|e| FuseError::Channel(format!("engine task failed: {e}")))?;
    for handle in sim_handles {
        let _ = handle.join();
    }
    info!("spatialfuse stopped");
    Ok(())
}

/// `spatialfuse [CONFIG_PATH] [--demo]`
fn parse_args() -> (PathBuf, bool) {
    let mut config_path = PathBuf::from("spatialfuse.toml");
    let mut demo = false;
    for arg in std::env::args().skip(1) {
        if arg == "--demo" {
            demo = true;
        } else {
            config_path = PathBuf::from(arg);
        }
    }
    (config_path, demo)
}

/// Initialise tracing-subscriber from `RUST_LOG` (default "info").
/// Set `SPATIALFUSE_LOG_FORMAT=json` to emit newline-delimited JSON logs
/// suitable for log aggregators.
fn init_logging() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("SPATIALFUSE_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }
}

fn print_banner() {
    println!();
    println!("  {}", "spatialfuse".bold().cyan());
    println!("  {}", "multi-camera spatial detection fusion".dimmed());
    println!();
}
