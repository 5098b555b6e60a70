//! pipeline — the per-frame monitor loop
//!
//! Pulls frames from the camera, runs pose inference, classifies, renders
//! the overlay, and displays, until the quit key or a cancel flag. Failing
//! to open the camera or the model is fatal at startup; once frames are
//! flowing, every failure is contained to its own iteration.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use opencv::core::Mat;
use opencv::prelude::*;
use tracing::{info, warn};

use crate::alert::Alerter;
use crate::detection::{DEFAULT_CONFIDENCE_THRESHOLD, PoseEstimator, PoseLandmarks};
use crate::overlay;
use crate::posture::{self, PostureVerdict};
use crate::video::{self, CameraFeed, FRAME_HEIGHT, FRAME_WIDTH, VideoWindow};

/// Display window title.
const WINDOW_TITLE: &str = "posture-watch live view";
/// Timing log cadence, in frames.
const TIMING_LOG_STRIDE: u64 = 300;

// ── Configuration ────────────────────────────────────────────────────────────

/// How the monitor loop is parameterised at startup. Nothing here changes
/// while the loop runs.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub camera_index: i32,
    pub model_path: PathBuf,
    pub confidence_threshold: f32,
    /// Suppress the audible alert.
    pub mute: bool,
    /// Draw caption, stats and alerts; `false` leaves only the skeleton,
    /// for the landmarks-only debug phase.
    pub annotate: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            camera_index: 0,
            model_path: PathBuf::from("models/yolov8n-pose.onnx"),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            mute: false,
            annotate: true,
        }
    }
}

// ── Per-frame analysis ───────────────────────────────────────────────────────

/// What one frame produced: an explicit value the loop inspects to decide
/// skip-vs-render-vs-alert, instead of error control flow.
#[derive(Debug, Clone)]
pub enum FrameAnalysis {
    /// The pose model saw no human figure.
    NoPose,
    /// Landmarks plus the posture verdict computed from their raw values.
    Judged {
        landmarks: PoseLandmarks,
        verdict: PostureVerdict,
    },
}

/// Classify one frame's inference result. Pure: no drawing, no I/O.
pub fn analyze(landmarks: Option<PoseLandmarks>) -> FrameAnalysis {
    match landmarks {
        None => FrameAnalysis::NoPose,
        Some(landmarks) => {
            let verdict = posture::judge(
                landmarks.left_shoulder(),
                landmarks.right_shoulder(),
                landmarks.nose(),
            );
            FrameAnalysis::Judged { landmarks, verdict }
        }
    }
}

// ── Monitor ──────────────────────────────────────────────────────────────────

pub struct Monitor {
    config: MonitorConfig,
    estimator: PoseEstimator,
    alerter: Alerter,
    cancel: Option<Arc<AtomicBool>>,
    prof_frames: u64,
    prof_detect: Duration,
}

impl Monitor {
    /// Load the pose model and prepare the loop. The model failing to load
    /// is unrecoverable within a run.
    pub fn new(config: MonitorConfig) -> Result<Self> {
        let estimator = PoseEstimator::load(&config.model_path, config.confidence_threshold)
            .with_context(|| format!("failed to load pose model: {}", config.model_path.display()))?;
        let alerter = if config.mute || !config.annotate {
            Alerter::disabled()
        } else {
            Alerter::new()
        };
        Ok(Self {
            config,
            estimator,
            alerter,
            cancel: None,
            prof_frames: 0,
            prof_detect: Duration::ZERO,
        })
    }

    /// Attach an external stop flag, checked once per iteration.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Run until the quit key or the cancel flag. The capture device and the
    /// display window are owned here and released exactly once on exit.
    pub fn run(&mut self) -> Result<()> {
        let mut camera = CameraFeed::open(self.config.camera_index)?;
        let window = VideoWindow::open(WINDOW_TITLE)?;
        info!(camera = self.config.camera_index, "monitoring started");

        loop {
            if self.cancelled() {
                break;
            }
            if let Err(e) = self.step(&mut camera, &window) {
                warn!("frame processing error: {e:#}");
            }
            if window.quit_requested()? {
                break;
            }
        }

        info!(frames = self.prof_frames, "monitoring stopped");
        Ok(())
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// One loop iteration. Any error returned here is logged by the loop
    /// and the next frame proceeds normally.
    fn step(&mut self, camera: &mut CameraFeed, window: &VideoWindow) -> Result<()> {
        let Some(frame) = camera.read_frame()? else {
            warn!("frame read failed, skipping iteration");
            return Ok(());
        };

        let working = video::resize_to_working(&frame)?;
        let rgb = video::bgr_to_rgb(&working)?;

        let detect_start = Instant::now();
        let landmarks = match self.detect(&rgb) {
            Ok(landmarks) => landmarks,
            Err(e) => {
                warn!("pose inference error: {e:#}");
                None
            }
        };
        self.prof_detect += detect_start.elapsed();

        let analysis = analyze(landmarks);

        let mut display = video::rgb_to_bgr(&rgb)?;
        match &analysis {
            FrameAnalysis::NoPose => {
                warn!("no human figure detected");
            }
            FrameAnalysis::Judged { landmarks, verdict } => {
                if self.config.annotate {
                    overlay::draw_verdict(&mut display, verdict)?;
                    if !verdict.is_good {
                        self.alerter.beep();
                    }
                }
                overlay::draw_skeleton(&mut display, landmarks)?;
            }
        }
        if self.config.annotate {
            overlay::draw_stats_panel(&mut display)?;
        }

        window.show(&display)?;

        self.prof_frames += 1;
        if self.prof_frames % TIMING_LOG_STRIDE == 0 {
            info!(
                frames = self.prof_frames,
                detect_ms_per_frame = format!(
                    "{:.2}",
                    self.prof_detect.as_secs_f64() * 1000.0 / self.prof_frames as f64
                ),
                "monitor timings"
            );
        }
        Ok(())
    }

    fn detect(&mut self, rgb: &Mat) -> Result<Option<PoseLandmarks>> {
        let bytes = rgb.data_bytes().context("frame buffer not contiguous")?;
        self.estimator
            .detect(bytes, FRAME_WIDTH as u32, FRAME_HEIGHT as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{KP_LEFT_SHOULDER, KP_NOSE, KP_RIGHT_SHOULDER, Keypoint, NUM_KEYPOINTS};
    use crate::geometry::Point2D;

    fn landmarks_with(nose: Point2D, left: Point2D, right: Point2D) -> PoseLandmarks {
        let mut keypoints = [Keypoint {
            point: Point2D::new(0.5, 0.5),
            score: 0.9,
        }; NUM_KEYPOINTS];
        keypoints[KP_NOSE].point = nose;
        keypoints[KP_LEFT_SHOULDER].point = left;
        keypoints[KP_RIGHT_SHOULDER].point = right;
        PoseLandmarks {
            keypoints,
            confidence: 0.9,
        }
    }

    #[test]
    fn absent_landmarks_map_to_no_pose() {
        assert!(matches!(analyze(None), FrameAnalysis::NoPose));
    }

    #[test]
    fn present_landmarks_are_judged() {
        let landmarks = landmarks_with(
            Point2D::new(0.50, 0.10),
            Point2D::new(0.30, 0.50),
            Point2D::new(0.70, 0.50),
        );
        match analyze(Some(landmarks)) {
            FrameAnalysis::Judged { verdict, .. } => assert!(verdict.is_good),
            FrameAnalysis::NoPose => panic!("expected a judged frame"),
        }
    }
}
