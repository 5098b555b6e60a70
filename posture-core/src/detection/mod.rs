//! detection — YOLOv8-pose landmark inference
//!
//! Loads yolov8n-pose.onnx, runs it over a 640×640 resize of the working
//! frame, and returns the 17 COCO keypoints of the highest-scoring person as
//! normalized [0,1] coordinates. The model's loosely-shaped tensor output is
//! translated into [`PoseLandmarks`] here and nowhere else.

use anyhow::{Context, Result, ensure};
use fast_image_resize as fr;
use ort::execution_providers as ep;
use ort::session::Session;
use ort::value::Tensor;
use rayon::prelude::*;
use std::path::Path;
use tracing::debug;

use crate::geometry::Point2D;

// ── Constants ────────────────────────────────────────────────────────────────

/// YOLOv8-pose input size (square).
const POSE_INPUT_SIZE: u32 = 640;
/// Number of proposals in the YOLOv8 output grid.
const NUM_PROPOSALS: usize = 8400;
/// Values per proposal: 4 box coords + 1 person score + 17 × (x, y, score).
const PROPOSAL_CHANNELS: usize = 56;
/// Channel row where the keypoint triplets start.
const KEYPOINT_CHANNEL_BASE: usize = 5;
/// Number of COCO keypoints per person.
pub const NUM_KEYPOINTS: usize = 17;
/// Default person confidence threshold, fixed once at startup.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// COCO keypoint indices consumed by the posture judge.
pub const KP_NOSE: usize = 0;
pub const KP_LEFT_SHOULDER: usize = 5;
pub const KP_RIGHT_SHOULDER: usize = 6;

/// COCO-pose skeleton connection pairs (keypoint indices), used by the
/// overlay to draw limbs between detected keypoints.
pub const COCO_SKELETON: [[usize; 2]; 19] = [
    [15, 13],
    [13, 11],
    [16, 14],
    [14, 12],
    [11, 12],
    [5, 11],
    [6, 12],
    [5, 6],
    [5, 7],
    [6, 8],
    [7, 9],
    [8, 10],
    [1, 2],
    [0, 1],
    [0, 2],
    [1, 3],
    [2, 4],
    [3, 5],
    [4, 6],
];

// ── Public types ─────────────────────────────────────────────────────────────

/// One keypoint: normalized position plus the model's per-keypoint score.
#[derive(Debug, Clone, Copy)]
pub struct Keypoint {
    pub point: Point2D,
    pub score: f32,
}

/// The named landmark set for the best person in a frame. Valid for that
/// frame only; nothing here is carried across frames.
#[derive(Debug, Clone)]
pub struct PoseLandmarks {
    pub keypoints: [Keypoint; NUM_KEYPOINTS],
    pub confidence: f32,
}

impl PoseLandmarks {
    pub fn nose(&self) -> Point2D {
        self.keypoints[KP_NOSE].point
    }

    pub fn left_shoulder(&self) -> Point2D {
        self.keypoints[KP_LEFT_SHOULDER].point
    }

    pub fn right_shoulder(&self) -> Point2D {
        self.keypoints[KP_RIGHT_SHOULDER].point
    }
}

// ── Estimator ────────────────────────────────────────────────────────────────

/// Wraps the YOLOv8-pose ONNX session plus reusable preprocessing buffers.
pub struct PoseEstimator {
    session: Session,
    confidence_threshold: f32,
    resizer: fr::Resizer,
    resize_buf: Vec<u8>,
}

impl PoseEstimator {
    /// Load a YOLOv8-pose ONNX model from `model_path`. The confidence
    /// threshold is set once here and never changes for the session.
    pub fn load<P: AsRef<Path>>(model_path: P, confidence_threshold: f32) -> Result<Self> {
        let session =
            build_ort_session(model_path.as_ref(), "failed to load YOLOv8-pose ONNX model")?;
        Ok(Self {
            session,
            confidence_threshold: confidence_threshold.clamp(0.0, 1.0),
            resizer: fr::Resizer::new(),
            resize_buf: vec![0u8; (POSE_INPUT_SIZE * POSE_INPUT_SIZE * 3) as usize],
        })
    }

    /// Run inference on one packed-RGB frame. Returns `None` when no person
    /// clears the confidence threshold, a distinct non-error case.
    pub fn detect(&mut self, rgb: &[u8], width: u32, height: u32) -> Result<Option<PoseLandmarks>> {
        let input_tensor = self.preprocess(rgb, width, height)?;

        let outputs = self
            .session
            .run(ort::inputs!["images" => input_tensor])
            .context("pose inference failed")?;

        // YOLOv8-pose output: [1, 56, 8400], column-major over proposals.
        let (_shape, data) = outputs["output0"]
            .try_extract_tensor::<f32>()
            .context("failed to extract pose output tensor")?;
        ensure!(
            data.len() >= PROPOSAL_CHANNELS * NUM_PROPOSALS,
            "unexpected pose output length {}",
            data.len()
        );

        Ok(decode_pose(data, self.confidence_threshold))
    }

    fn preprocess(&mut self, rgb: &[u8], width: u32, height: u32) -> Result<ort::value::DynValue> {
        ensure!(
            rgb.len() == (width * height * 3) as usize,
            "frame buffer does not match {width}x{height} RGB"
        );

        let src = fr::images::ImageRef::new(width, height, rgb, fr::PixelType::U8x3)
            .context("failed to create pose resize source")?;

        let mut dst = fr::images::Image::from_vec_u8(
            POSE_INPUT_SIZE,
            POSE_INPUT_SIZE,
            std::mem::take(&mut self.resize_buf),
            fr::PixelType::U8x3,
        )
        .context("failed to create pose resize destination")?;

        let options = fr::ResizeOptions::new()
            .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Bilinear));
        self.resizer
            .resize(&src, &mut dst, Some(&options))
            .context("pose input downscale failed")?;

        self.resize_buf = dst.into_vec();
        let raw = &self.resize_buf;

        // NCHW float tensor: [1, 3, 640, 640].
        let size = (POSE_INPUT_SIZE * POSE_INPUT_SIZE) as usize;
        let mut tensor_data = vec![0f32; 3 * size];

        let (r_plane, gb_plane) = tensor_data.split_at_mut(size);
        let (g_plane, b_plane) = gb_plane.split_at_mut(size);
        rayon::join(
            || {
                r_plane
                    .par_iter_mut()
                    .enumerate()
                    .for_each(|(idx, out)| *out = raw[idx * 3] as f32 / 255.0)
            },
            || {
                rayon::join(
                    || {
                        g_plane
                            .par_iter_mut()
                            .enumerate()
                            .for_each(|(idx, out)| *out = raw[idx * 3 + 1] as f32 / 255.0)
                    },
                    || {
                        b_plane
                            .par_iter_mut()
                            .enumerate()
                            .for_each(|(idx, out)| *out = raw[idx * 3 + 2] as f32 / 255.0)
                    },
                )
            },
        );

        let shape = [1usize, 3, POSE_INPUT_SIZE as usize, POSE_INPUT_SIZE as usize];
        Ok(Tensor::from_array((shape, tensor_data.into_boxed_slice()))
            .context("failed to create pose input tensor")?
            .into_dyn())
    }
}

fn build_ort_session(model_path: &Path, load_error: &'static str) -> Result<Session> {
    let mut builder = Session::builder().context("failed to create ORT session builder")?;
    builder = builder
        .with_intra_threads(1)
        .context("failed to set ORT intra threads")?;
    builder = builder
        .with_inter_threads(1)
        .context("failed to set ORT inter threads")?;
    builder = builder
        .with_parallel_execution(false)
        .context("failed to set ORT parallel execution")?;
    builder = builder
        .with_execution_providers([ep::CPUExecutionProvider::default().build()])
        .context("failed to register execution providers")?;
    builder.commit_from_file(model_path).context(load_error)
}

// ── Output decode ────────────────────────────────────────────────────────────

/// Pick the highest-scoring proposal above `confidence_threshold` and lift
/// its keypoints out of the column-major `[1, 56, 8400]` layout, normalizing
/// pixel coordinates from 640-space into [0,1].
fn decode_pose(data: &[f32], confidence_threshold: f32) -> Option<PoseLandmarks> {
    let mut best: Option<(usize, f32)> = None;
    for i in 0..NUM_PROPOSALS {
        let score = data[4 * NUM_PROPOSALS + i];
        if score >= confidence_threshold && best.is_none_or(|(_, s)| score > s) {
            best = Some((i, score));
        }
    }
    let (idx, confidence) = best?;

    let keypoints = std::array::from_fn(|k| {
        let row = KEYPOINT_CHANNEL_BASE + 3 * k;
        let x = data[row * NUM_PROPOSALS + idx] / POSE_INPUT_SIZE as f32;
        let y = data[(row + 1) * NUM_PROPOSALS + idx] / POSE_INPUT_SIZE as f32;
        let score = data[(row + 2) * NUM_PROPOSALS + idx];
        Keypoint {
            point: Point2D::new(x.clamp(0.0, 1.0), y.clamp(0.0, 1.0)),
            score,
        }
    });

    debug!(confidence, "pose decoded");
    Some(PoseLandmarks {
        keypoints,
        confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_output() -> Vec<f32> {
        vec![0f32; PROPOSAL_CHANNELS * NUM_PROPOSALS]
    }

    fn set_keypoint(data: &mut [f32], proposal: usize, kp: usize, x: f32, y: f32, score: f32) {
        let row = KEYPOINT_CHANNEL_BASE + 3 * kp;
        data[row * NUM_PROPOSALS + proposal] = x;
        data[(row + 1) * NUM_PROPOSALS + proposal] = y;
        data[(row + 2) * NUM_PROPOSALS + proposal] = score;
    }

    #[test]
    fn below_threshold_output_yields_no_landmarks() {
        let mut data = empty_output();
        data[4 * NUM_PROPOSALS + 11] = 0.3;
        assert!(decode_pose(&data, 0.5).is_none());
    }

    #[test]
    fn keypoints_are_normalized_from_input_space() {
        let mut data = empty_output();
        data[4 * NUM_PROPOSALS + 7] = 0.9;
        set_keypoint(&mut data, 7, KP_NOSE, 320.0, 64.0, 0.8);
        set_keypoint(&mut data, 7, KP_LEFT_SHOULDER, 192.0, 320.0, 0.9);
        set_keypoint(&mut data, 7, KP_RIGHT_SHOULDER, 448.0, 320.0, 0.9);

        let landmarks = decode_pose(&data, 0.5).expect("proposal above threshold");
        assert!((landmarks.confidence - 0.9).abs() < 1e-6);
        assert!((landmarks.nose().x - 0.5).abs() < 1e-6);
        assert!((landmarks.nose().y - 0.1).abs() < 1e-6);
        assert!((landmarks.left_shoulder().x - 0.3).abs() < 1e-6);
        assert!((landmarks.right_shoulder().x - 0.7).abs() < 1e-6);
    }

    #[test]
    fn highest_scoring_proposal_wins() {
        let mut data = empty_output();
        data[4 * NUM_PROPOSALS + 3] = 0.6;
        set_keypoint(&mut data, 3, KP_NOSE, 64.0, 64.0, 0.5);
        data[4 * NUM_PROPOSALS + 9] = 0.8;
        set_keypoint(&mut data, 9, KP_NOSE, 576.0, 576.0, 0.5);

        let landmarks = decode_pose(&data, 0.5).expect("two proposals above threshold");
        assert!((landmarks.confidence - 0.8).abs() < 1e-6);
        assert!((landmarks.nose().x - 0.9).abs() < 1e-6);
    }

    #[test]
    fn out_of_frame_keypoints_are_clamped() {
        let mut data = empty_output();
        data[4 * NUM_PROPOSALS] = 0.7;
        set_keypoint(&mut data, 0, KP_NOSE, -12.0, 700.0, 0.4);

        let landmarks = decode_pose(&data, 0.5).expect("proposal above threshold");
        assert_eq!(landmarks.nose().x, 0.0);
        assert_eq!(landmarks.nose().y, 1.0);
    }
}
