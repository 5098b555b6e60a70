//! posture — geometric posture classification
//!
//! Three measurements derived from the shoulder and nose landmarks, each
//! compared against a fixed threshold; the verdict is the plain conjunction.
//! The judge always sees raw normalized values; the overlay applies its own
//! display transforms afterwards, never the other way around.

use crate::geometry::{Point2D, distance, tilt_angle};

// ── Thresholds ───────────────────────────────────────────────────────────────

/// Lower bound (exclusive) on normalized shoulder separation.
pub const SHOULDER_DISTANCE_MIN: f32 = 0.35;
/// Upper bound (exclusive) on normalized shoulder separation.
pub const SHOULDER_DISTANCE_MAX: f32 = 0.45;
/// Minimum (inclusive) raw shoulder tilt in degrees.
pub const SHOULDER_TILT_MIN_DEGREES: f32 = 178.0;
/// Lower bound (exclusive) on normalized nose-to-left-shoulder distance.
pub const NOSE_SHOULDER_DISTANCE_MIN: f32 = 0.35;

// ── Types ────────────────────────────────────────────────────────────────────

/// The three measurements derived from one frame's landmarks.
#[derive(Debug, Clone, Copy)]
pub struct PostureMetrics {
    pub shoulder_distance: f32,
    pub shoulder_tilt_degrees: f32,
    pub nose_shoulder_distance: f32,
}

/// One metric's raw value plus its threshold outcome.
#[derive(Debug, Clone, Copy)]
pub struct MetricCheck {
    pub value: f32,
    pub passed: bool,
}

/// Per-frame classification result. `checks` is ordered: shoulder distance,
/// shoulder tilt, nose-to-shoulder distance.
#[derive(Debug, Clone, Copy)]
pub struct PostureVerdict {
    pub is_good: bool,
    pub checks: [MetricCheck; 3],
}

// ── Classification ───────────────────────────────────────────────────────────

/// Derive the metrics for one frame and classify them.
///
/// Callers guarantee all three landmarks are present; there is no defined
/// behavior for absent landmarks at this level.
pub fn judge(left_shoulder: Point2D, right_shoulder: Point2D, nose: Point2D) -> PostureVerdict {
    classify(PostureMetrics {
        shoulder_distance: distance(left_shoulder, right_shoulder),
        shoulder_tilt_degrees: tilt_angle(left_shoulder, right_shoulder),
        nose_shoulder_distance: distance(nose, left_shoulder),
    })
}

/// Evaluate the three threshold predicates. Any single failing metric marks
/// the posture as poor; no weighting, no smoothing across frames.
pub fn classify(metrics: PostureMetrics) -> PostureVerdict {
    let separation_ok = metrics.shoulder_distance > SHOULDER_DISTANCE_MIN
        && metrics.shoulder_distance < SHOULDER_DISTANCE_MAX;
    let tilt_ok = metrics.shoulder_tilt_degrees >= SHOULDER_TILT_MIN_DEGREES;
    let nose_ok = metrics.nose_shoulder_distance > NOSE_SHOULDER_DISTANCE_MIN;

    PostureVerdict {
        is_good: separation_ok && tilt_ok && nose_ok,
        checks: [
            MetricCheck {
                value: metrics.shoulder_distance,
                passed: separation_ok,
            },
            MetricCheck {
                value: metrics.shoulder_tilt_degrees,
                passed: tilt_ok,
            },
            MetricCheck {
                value: metrics.nose_shoulder_distance,
                passed: nose_ok,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(shoulder: f32, tilt: f32, nose: f32) -> PostureMetrics {
        PostureMetrics {
            shoulder_distance: shoulder,
            shoulder_tilt_degrees: tilt,
            nose_shoulder_distance: nose,
        }
    }

    #[test]
    fn all_predicates_passing_is_good() {
        let verdict = classify(metrics(0.40, 180.0, 0.45));
        assert!(verdict.is_good);
        assert!(verdict.checks.iter().all(|c| c.passed));
    }

    #[test]
    fn each_predicate_independently_flips_the_verdict() {
        // Violating any single metric marks the posture as poor.
        let bad_separation = classify(metrics(0.50, 180.0, 0.45));
        assert!(!bad_separation.is_good);
        assert!(!bad_separation.checks[0].passed);
        assert!(bad_separation.checks[1].passed);
        assert!(bad_separation.checks[2].passed);

        let bad_tilt = classify(metrics(0.40, 170.0, 0.45));
        assert!(!bad_tilt.is_good);
        assert!(!bad_tilt.checks[1].passed);

        let bad_nose = classify(metrics(0.40, 180.0, 0.10));
        assert!(!bad_nose.is_good);
        assert!(!bad_nose.checks[2].passed);
    }

    #[test]
    fn shoulder_distance_bounds_are_strict() {
        assert!(!classify(metrics(0.35, 180.0, 0.45)).checks[0].passed);
        assert!(!classify(metrics(0.45, 180.0, 0.45)).checks[0].passed);
        assert!(classify(metrics(0.351, 180.0, 0.45)).checks[0].passed);
    }

    #[test]
    fn tilt_threshold_is_inclusive() {
        assert!(classify(metrics(0.40, 178.0, 0.45)).checks[1].passed);
        assert!(!classify(metrics(0.40, 177.9, 0.45)).checks[1].passed);
    }

    #[test]
    fn nose_distance_bound_is_strict() {
        assert!(!classify(metrics(0.40, 180.0, 0.35)).checks[2].passed);
        assert!(classify(metrics(0.40, 180.0, 0.351)).checks[2].passed);
    }

    #[test]
    fn upright_subject_judged_good() {
        // Level shoulders 0.40 apart, nose well above the shoulder line.
        let left = Point2D::new(0.30, 0.50);
        let right = Point2D::new(0.70, 0.50);
        let nose = Point2D::new(0.50, 0.10);

        let verdict = judge(left, right, nose);
        assert!(verdict.is_good);
        assert!((verdict.checks[0].value - 0.40).abs() < 1e-4);
        assert!((verdict.checks[1].value - 180.0).abs() < 1e-4);
        assert!((verdict.checks[2].value - 0.4472).abs() < 1e-3);
    }

    #[test]
    fn tucked_nose_judged_poor() {
        // Same shoulders, nose dropped next to the left shoulder: only the
        // nose-distance predicate fails, and that alone flips the verdict.
        let left = Point2D::new(0.30, 0.50);
        let right = Point2D::new(0.70, 0.50);
        let nose = Point2D::new(0.32, 0.48);

        let verdict = judge(left, right, nose);
        assert!(!verdict.is_good);
        assert!(verdict.checks[0].passed);
        assert!(verdict.checks[1].passed);
        assert!(!verdict.checks[2].passed);
        assert!((verdict.checks[2].value - 0.0283).abs() < 1e-3);
    }
}
