use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use posture_core::{
    detection::DEFAULT_CONFIDENCE_THRESHOLD,
    pipeline::{Monitor, MonitorConfig},
    runtime::configure_ort_dylib,
};

// ── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "posture-watch",
    version,
    about = "Webcam posture monitoring with on-screen feedback",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full monitor: pose inference, posture verdict, overlay, alert.
    Monitor {
        /// Capture device index
        #[arg(short, long, default_value_t = 0)]
        camera: i32,

        /// YOLOv8-pose ONNX model path
        #[arg(long, default_value = "models/yolov8n-pose.onnx")]
        model: PathBuf,

        /// Person confidence threshold (0–1), fixed for the session
        #[arg(long, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
        confidence: f32,

        /// Suppress the audible poor-posture tone
        #[arg(long)]
        mute: bool,
    },

    /// Debug view: draw the detected skeleton only, no posture verdict.
    Pose {
        /// Capture device index
        #[arg(short, long, default_value_t = 0)]
        camera: i32,

        /// YOLOv8-pose ONNX model path
        #[arg(long, default_value = "models/yolov8n-pose.onnx")]
        model: PathBuf,

        /// Person confidence threshold (0–1)
        #[arg(long, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
        confidence: f32,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    // Respect RUST_LOG; default to info
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Monitor {
            camera,
            model,
            confidence,
            mute,
        } => cmd_monitor(camera, model, confidence, mute),
        Commands::Pose {
            camera,
            model,
            confidence,
        } => cmd_pose(camera, model, confidence),
    }
}

// ── Monitor ───────────────────────────────────────────────────────────────────

fn cmd_monitor(camera: i32, model: PathBuf, confidence: f32, mute: bool) -> Result<()> {
    info!("posture monitor");
    info!("  camera : {camera}");
    info!("  model  : {}", model.display());

    configure_ort_dylib();

    let mut monitor = Monitor::new(MonitorConfig {
        camera_index: camera,
        model_path: model,
        confidence_threshold: confidence,
        mute,
        annotate: true,
    })?;

    let pb = spinner("Monitoring posture… press q in the video window to stop");
    monitor.run().context("monitor loop failed")?;
    pb.finish_with_message("Done.");
    Ok(())
}

// ── Landmarks-only debug view ────────────────────────────────────────────────

fn cmd_pose(camera: i32, model: PathBuf, confidence: f32) -> Result<()> {
    info!("pose debug view");
    info!("  camera : {camera}");
    info!("  model  : {}", model.display());

    configure_ort_dylib();

    let mut monitor = Monitor::new(MonitorConfig {
        camera_index: camera,
        model_path: model,
        confidence_threshold: confidence,
        mute: true,
        annotate: false,
    })?;

    let pb = spinner("Drawing landmarks… press q in the video window to stop");
    monitor.run().context("pose view failed")?;
    pb.finish_with_message("Done.");
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed_precise}]")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}
