// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Failure classification and retry policy for batch scanning.
//
// Classifies errors into Recalibrate (retry with a relaxed configuration),
// SceneRejected (the photo itself is the problem), Permanent and Cancelled.
// Only calibration failures trigger automatic retries.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{DetectionConfig, PeakThreshold};
use crate::error::BlattwerkError;

/// Lower bound for the gradient threshold when relaxing.
const MIN_GRADIENT_THRESHOLD: f32 = 1.0;

/// Factor applied to the gradient threshold on each relaxation.
const GRADIENT_RELAX_FACTOR: f32 = 0.8;

/// Added to the legacy peak bias on each relaxation.
const LEGACY_BIAS_STEP: u32 = 10;

/// Classification of per-image failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Thresholds too strict for this photo; retry with relaxed settings.
    Recalibrate,
    /// The scene has no clean sheet quadrilateral; retrying will not help.
    SceneRejected,
    /// Bad input or setup (unreadable file, invalid config).
    Permanent,
    /// The caller aborted this image.
    Cancelled,
}

/// Classify a `BlattwerkError` for retry decisions.
pub fn classify_error(err: &BlattwerkError) -> FailureClass {
    match err {
        BlattwerkError::ThresholdTooStrict { .. } => FailureClass::Recalibrate,

        BlattwerkError::AmbiguousEdgeSet { .. }
        | BlattwerkError::InsufficientCorners { .. }
        | BlattwerkError::DegenerateHomography(_) => FailureClass::SceneRejected,

        BlattwerkError::InvalidConfig(_)
        | BlattwerkError::ImageError(_)
        | BlattwerkError::Io(_)
        | BlattwerkError::Serialization(_) => FailureClass::Permanent,

        BlattwerkError::Cancelled => FailureClass::Cancelled,
    }
}

/// One-line operator guidance for a failure.
pub fn suggestion(err: &BlattwerkError) -> &'static str {
    match err {
        BlattwerkError::ThresholdTooStrict { .. } => {
            "Increase hough.peak_divisor or lower preprocess.gradient_threshold."
        }
        BlattwerkError::AmbiguousEdgeSet { .. } => {
            "Too many strong straight edges; photograph the sheet against a plainer background."
        }
        BlattwerkError::InsufficientCorners { .. } => {
            "Sheet corners fall outside the frame; keep the whole sheet in view or raise corners.boundary_tolerance."
        }
        BlattwerkError::DegenerateHomography(_) => {
            "Detected corners are collinear or duplicated; retake the photo with the sheet fully visible."
        }
        BlattwerkError::InvalidConfig(_) => "Fix the configuration file and run again.",
        BlattwerkError::ImageError(_) => "Check that the input is a readable raster image.",
        BlattwerkError::Io(_) => "Check file paths and permissions.",
        BlattwerkError::Serialization(_) => "The configuration file is not valid JSON.",
        BlattwerkError::Cancelled => "The image was aborted (timeout or cancellation).",
    }
}

/// Configuration loosened to recover from `err`, or `None` when relaxing
/// thresholds cannot help.
pub fn relaxed_config(config: &DetectionConfig, err: &BlattwerkError) -> Option<DetectionConfig> {
    if classify_error(err) != FailureClass::Recalibrate {
        return None;
    }
    let mut relaxed = config.clone();
    match &mut relaxed.hough.peak_threshold {
        PeakThreshold::Divisor => {
            relaxed.hough.peak_divisor = config.hough.peak_divisor.saturating_add(1);
        }
        PeakThreshold::Legacy { bias } => *bias = bias.saturating_add(LEGACY_BIAS_STEP),
    }
    relaxed.preprocess.gradient_threshold = (config.preprocess.gradient_threshold
        * GRADIENT_RELAX_FACTOR)
        .max(MIN_GRADIENT_THRESHOLD);
    debug!(
        peak_divisor = relaxed.hough.peak_divisor,
        rule = ?relaxed.hough.peak_threshold,
        gradient_threshold = relaxed.preprocess.gradient_threshold,
        "Relaxed detection thresholds"
    );
    Some(relaxed)
}

/// Retry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first run.
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 2 }
    }
}

/// Result of evaluating whether to retry.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    /// Run again with this configuration.
    Retry(DetectionConfig),
    /// Do not retry: the failure is not a calibration issue.
    GiveUp(FailureClass),
    /// Maximum retries exhausted.
    Exhausted,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// Decide what to do after `attempt` (0-based) failed with `err` while
    /// running with `config`.
    pub fn decide(
        &self,
        attempt: u32,
        err: &BlattwerkError,
        config: &DetectionConfig,
    ) -> RetryDecision {
        let class = classify_error(err);
        if class != FailureClass::Recalibrate {
            debug!(?class, "Failure is not retriable");
            return RetryDecision::GiveUp(class);
        }
        if attempt >= self.max_retries {
            warn!(attempt, max = self.max_retries, "Retries exhausted");
            return RetryDecision::Exhausted;
        }
        match relaxed_config(config, err) {
            Some(relaxed) => {
                info!(attempt = attempt + 1, "Retrying with relaxed thresholds");
                RetryDecision::Retry(relaxed)
            }
            None => RetryDecision::GiveUp(class),
        }
    }
}
