//! video — webcam capture and windowed display
//!
//! OpenCV bridge: open a capture device by index, pull BGR frames, normalize
//! them to the fixed working resolution, shuttle between BGR (capture and
//! display order) and RGB (the pose model's input order), and present
//! composed frames in a highgui window with a polled quit key.

use anyhow::{Context, Result, bail};
use opencv::{
    core::{Mat, Size},
    highgui, imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};
use tracing::{debug, info};

/// Fixed working resolution every frame is resized to before inference,
/// stabilizing the landmark coordinate scale.
pub const FRAME_WIDTH: i32 = 1280;
pub const FRAME_HEIGHT: i32 = 960;

/// Key that ends the monitor loop.
const QUIT_KEY: char = 'q';
/// highgui poll interval in milliseconds.
const POLL_DELAY_MS: i32 = 10;

// ── Capture ──────────────────────────────────────────────────────────────────

/// Exclusive owner of one capture device for the lifetime of the loop.
pub struct CameraFeed {
    capture: VideoCapture,
    index: i32,
}

impl CameraFeed {
    /// Open capture device `index` with the platform-preferred backend.
    /// Failure here is fatal: the loop would never produce frames.
    pub fn open(index: i32) -> Result<Self> {
        let capture = VideoCapture::new(index, videoio::CAP_ANY)
            .with_context(|| format!("could not create capture for device {index}"))?;
        if !capture
            .is_opened()
            .context("could not query capture state")?
        {
            bail!("failed to open camera device {index}");
        }
        info!(index, "camera opened");
        Ok(Self { capture, index })
    }

    /// Read one BGR frame. A failed or empty read is transient: the caller
    /// skips the iteration and tries again next frame.
    pub fn read_frame(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        let grabbed = self
            .capture
            .read(&mut frame)
            .context("capture read failed")?;
        if !grabbed || frame.empty() {
            debug!(index = self.index, "empty frame from capture");
            return Ok(None);
        }
        Ok(Some(frame))
    }
}

// ── Frame conversion ─────────────────────────────────────────────────────────

/// Resize a captured frame to the fixed working resolution.
pub fn resize_to_working(frame: &Mat) -> Result<Mat> {
    let mut resized = Mat::default();
    imgproc::resize(
        frame,
        &mut resized,
        Size::new(FRAME_WIDTH, FRAME_HEIGHT),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )
    .context("working-resolution resize failed")?;
    Ok(resized)
}

/// BGR capture order → the RGB order the pose model expects. Pure format
/// adaptation, no semantic content.
pub fn bgr_to_rgb(frame: &Mat) -> Result<Mat> {
    let mut rgb = Mat::default();
    imgproc::cvt_color_def(frame, &mut rgb, imgproc::COLOR_BGR2RGB)
        .context("BGR to RGB conversion failed")?;
    Ok(rgb)
}

/// RGB model order back to BGR for display composition.
pub fn rgb_to_bgr(frame: &Mat) -> Result<Mat> {
    let mut bgr = Mat::default();
    imgproc::cvt_color_def(frame, &mut bgr, imgproc::COLOR_RGB2BGR)
        .context("RGB to BGR conversion failed")?;
    Ok(bgr)
}

// ── Display ──────────────────────────────────────────────────────────────────

/// A highgui window plus the per-iteration quit-key poll.
pub struct VideoWindow {
    name: String,
}

impl VideoWindow {
    pub fn open(name: &str) -> Result<Self> {
        highgui::named_window_def(name).context("could not create display window")?;
        Ok(Self {
            name: name.to_owned(),
        })
    }

    pub fn show(&self, frame: &Mat) -> Result<()> {
        highgui::imshow(&self.name, frame).context("could not display frame")
    }

    /// Poll the quit key once. Coarse-grained: at most one frame of latency
    /// between the key press and the loop reacting.
    pub fn quit_requested(&self) -> Result<bool> {
        let key = highgui::wait_key(POLL_DELAY_MS).context("key poll failed")?;
        Ok(key == QUIT_KEY as i32)
    }
}

impl Drop for VideoWindow {
    fn drop(&mut self) {
        let _ = highgui::destroy_window(&self.name);
    }
}
