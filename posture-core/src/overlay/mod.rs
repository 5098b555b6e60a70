//! overlay — status caption, per-metric stats, skeleton drawing
//!
//! All drawing happens on the BGR display frame after classification. The
//! numeric transforms here are display-only: the judge has already run on
//! the raw values by the time anything in this module is called.

use anyhow::{Context, Result};
use opencv::{
    core::{Mat, Point, Scalar},
    imgproc,
    prelude::*,
};

use crate::detection::{COCO_SKELETON, PoseLandmarks};
use crate::posture::PostureVerdict;
use crate::video::{FRAME_HEIGHT, FRAME_WIDTH};

// ── Palette (BGR) ────────────────────────────────────────────────────────────

/// Colour for passing metrics and the good-posture caption.
const AFFIRMATIVE: [f64; 3] = [255.0, 0.0, 0.0];
/// Colour for failing metrics and the poor-posture caption.
const WARNING: [f64; 3] = [0.0, 0.0, 255.0];
/// Skeleton limb colour.
const LIMB: [f64; 3] = [0.0, 255.0, 0.0];

fn bgr(colour: [f64; 3]) -> Scalar {
    Scalar::new(colour[0], colour[1], colour[2], 0.0)
}

/// Keypoints below this score are left undrawn.
const KEYPOINT_DRAW_THRESHOLD: f32 = 0.25;
/// Radius of a drawn keypoint, in pixels.
const KEYPOINT_RADIUS: i32 = 4;

/// Stats-panel row labels, in metric order.
const METRIC_LABELS: [&str; 3] = ["Head:", "Shoulder:", "Body:"];
/// First stats row y position; rows descend in fixed steps.
const STATS_ROW_BASE: i32 = 130;
const STATS_ROW_STEP: i32 = 50;

// ── Display transforms ───────────────────────────────────────────────────────

/// Metric values as rendered: distances scaled x100 to read as percentages,
/// tilt re-zeroed as `180 - raw` so upright reads near 0 instead of near 180.
pub fn display_values(verdict: &PostureVerdict) -> [f32; 3] {
    [
        verdict.checks[0].value * 100.0,
        180.0 - verdict.checks[1].value,
        verdict.checks[2].value * 100.0,
    ]
}

// ── Drawing ──────────────────────────────────────────────────────────────────

/// Draw the large status caption plus the three metric values, each coloured
/// by its own predicate outcome.
pub fn draw_verdict(frame: &mut Mat, verdict: &PostureVerdict) -> Result<()> {
    let (caption, colour) = if verdict.is_good {
        ("Good posture", AFFIRMATIVE)
    } else {
        ("Poor Posture", WARNING)
    };
    put_text(frame, caption, Point::new(80, 80), 3.0, bgr(colour))?;

    for (row, (value, check)) in display_values(verdict)
        .iter()
        .zip(verdict.checks.iter())
        .enumerate()
    {
        let colour = if check.passed { AFFIRMATIVE } else { WARNING };
        put_text(
            frame,
            &format!("{}", value.floor() as i64),
            Point::new(1200, STATS_ROW_BASE + STATS_ROW_STEP * row as i32),
            1.0,
            bgr(colour),
        )?;
    }
    Ok(())
}

/// Draw the stats header and row labels. Rendered every annotated frame,
/// with or without a detected figure.
pub fn draw_stats_panel(frame: &mut Mat) -> Result<()> {
    put_text(frame, "Stats", Point::new(1100, 50), 2.0, bgr(AFFIRMATIVE))?;
    for (row, label) in METRIC_LABELS.iter().enumerate() {
        put_text(
            frame,
            label,
            Point::new(950, STATS_ROW_BASE + STATS_ROW_STEP * row as i32),
            1.0,
            bgr(AFFIRMATIVE),
        )?;
    }
    Ok(())
}

/// Draw the skeletal landmark overlay: COCO connection lines plus a circle
/// per confident keypoint.
pub fn draw_skeleton(frame: &mut Mat, landmarks: &PoseLandmarks) -> Result<()> {
    for [a, b] in COCO_SKELETON {
        let (ka, kb) = (&landmarks.keypoints[a], &landmarks.keypoints[b]);
        if ka.score < KEYPOINT_DRAW_THRESHOLD || kb.score < KEYPOINT_DRAW_THRESHOLD {
            continue;
        }
        imgproc::line(
            frame,
            to_pixel(ka.point.x, ka.point.y),
            to_pixel(kb.point.x, kb.point.y),
            bgr(LIMB),
            2,
            imgproc::LINE_8,
            0,
        )
        .context("failed to draw skeleton limb")?;
    }

    for kp in &landmarks.keypoints {
        if kp.score < KEYPOINT_DRAW_THRESHOLD {
            continue;
        }
        imgproc::circle(
            frame,
            to_pixel(kp.point.x, kp.point.y),
            KEYPOINT_RADIUS,
            bgr(WARNING),
            imgproc::FILLED,
            imgproc::LINE_8,
            0,
        )
        .context("failed to draw keypoint")?;
    }
    Ok(())
}

fn to_pixel(x: f32, y: f32) -> Point {
    Point::new(
        (x * FRAME_WIDTH as f32) as i32,
        (y * FRAME_HEIGHT as f32) as i32,
    )
}

fn put_text(frame: &mut Mat, text: &str, origin: Point, scale: f64, colour: Scalar) -> Result<()> {
    imgproc::put_text(
        frame,
        text,
        origin,
        imgproc::FONT_HERSHEY_COMPLEX,
        scale,
        colour,
        2,
        imgproc::LINE_8,
        false,
    )
    .context("failed to draw text")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posture::{PostureMetrics, classify};

    #[test]
    fn distances_render_as_percentages_and_tilt_re_zeroes() {
        let verdict = classify(PostureMetrics {
            shoulder_distance: 0.40,
            shoulder_tilt_degrees: 180.0,
            nose_shoulder_distance: 0.4472,
        });
        let values = display_values(&verdict);
        assert!((values[0] - 40.0).abs() < 1e-3);
        assert!((values[1] - 0.0).abs() < 1e-3);
        assert!((values[2] - 44.72).abs() < 1e-2);
    }

    #[test]
    fn display_transform_keeps_the_raw_verdict() {
        // A tilt of 178 passes on the raw value even though it renders as 2.
        let verdict = classify(PostureMetrics {
            shoulder_distance: 0.40,
            shoulder_tilt_degrees: 178.0,
            nose_shoulder_distance: 0.40,
        });
        assert!(verdict.is_good);
        assert!((display_values(&verdict)[1] - 2.0).abs() < 1e-3);
    }
}
