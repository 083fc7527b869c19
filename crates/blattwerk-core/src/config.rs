// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Detection configuration. Every tunable of the pipeline lives here so one
// binary can serve several document/camera profiles.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BlattwerkError, Result};
use crate::types::{AngleRange, TargetSize};

/// Complete pipeline configuration.
///
/// Missing sections or fields in a JSON document fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub preprocess: PreprocessConfig,
    pub hough: HoughConfig,
    pub corners: CornerConfig,
    /// Size of the rectified output.
    pub target: TargetSize,
}

/// Smoothing and edge-strength settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Gaussian sigma; 0 disables smoothing.
    pub blur_sigma: f32,
    /// Minimum gradient magnitude for a pixel to vote.
    pub gradient_threshold: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 2.0,
            gradient_threshold: 20.0,
        }
    }
}

/// Neighbourhood used to merge accumulator peaks into one edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClusterWindow {
    /// Independent angle and distance windows (strict `<` on both axes).
    Rectangular { angle: u32, distance: u32 },
    /// Single radius in mixed (bucket, pixel) units.
    Euclidean { radius: f64 },
}

impl ClusterWindow {
    /// Whether two cells fall into the same cluster.
    pub fn contains(&self, d_angle: i64, d_distance: i64) -> bool {
        match *self {
            Self::Rectangular { angle, distance } => {
                d_angle.abs() < angle as i64 && d_distance.abs() < distance as i64
            }
            Self::Euclidean { radius } => {
                ((d_angle * d_angle + d_distance * d_distance) as f64).sqrt() < radius
            }
        }
    }
}

impl Default for ClusterWindow {
    fn default() -> Self {
        Self::Rectangular {
            angle: 20,
            distance: 100,
        }
    }
}

/// How the peak threshold is derived from the accumulator maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PeakThreshold {
    /// `floor(max_votes / peak_divisor)`.
    #[default]
    Divisor,
    /// `floor(max_votes / sqrt(2)) - bias`, saturating at zero.
    Legacy { bias: u32 },
}

/// Accumulator and edge selection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoughConfig {
    pub angle_range: AngleRange,
    /// `Q`: cells below `max_votes / Q` are discarded.
    pub peak_divisor: u32,
    pub peak_threshold: PeakThreshold,
    pub cluster_window: ClusterWindow,
    /// Two angle gaps closer than this (degrees) mark near-parallel lines.
    pub parallel_tolerance_deg: f64,
}

impl Default for HoughConfig {
    fn default() -> Self {
        Self {
            angle_range: AngleRange::Full,
            peak_divisor: 3,
            peak_threshold: PeakThreshold::Divisor,
            cluster_window: ClusterWindow::default(),
            parallel_tolerance_deg: 2.0,
        }
    }
}

impl HoughConfig {
    /// Minimum votes for an accumulator cell to be considered a peak.
    pub fn min_peak_votes(&self, max_votes: u32) -> u32 {
        match self.peak_threshold {
            PeakThreshold::Divisor => max_votes / self.peak_divisor.max(1),
            PeakThreshold::Legacy { bias } => {
                let scaled = (max_votes as f64 / std::f64::consts::SQRT_2).floor() as u32;
                scaled.saturating_sub(bias)
            }
        }
    }
}

/// Intersection bounds and corner refinement settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CornerConfig {
    /// `D`: intersections may lie this far outside the image.
    pub boundary_tolerance: i32,
    /// Corners darker than this are nudged into the sheet.
    pub brightness_threshold: u8,
    /// Nudge distance in pixels, per axis.
    pub nudge_shift: i32,
}

impl Default for CornerConfig {
    fn default() -> Self {
        Self {
            boundary_tolerance: 20,
            brightness_threshold: 125,
            nudge_shift: 3,
        }
    }
}

impl DetectionConfig {
    /// Parse a JSON document and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&data)?;
        debug!(path = %path.display(), "Detection config loaded");
        Ok(config)
    }

    /// Pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        let p = &self.preprocess;
        if !p.blur_sigma.is_finite() || p.blur_sigma < 0.0 {
            return Err(invalid(format!(
                "blur_sigma must be finite and >= 0, got {}",
                p.blur_sigma
            )));
        }
        if !p.gradient_threshold.is_finite() || p.gradient_threshold < 0.0 {
            return Err(invalid(format!(
                "gradient_threshold must be finite and >= 0, got {}",
                p.gradient_threshold
            )));
        }

        let h = &self.hough;
        if h.peak_divisor == 0 {
            return Err(invalid("peak_divisor must be at least 1".into()));
        }
        match h.cluster_window {
            ClusterWindow::Rectangular { angle, distance } if angle == 0 || distance == 0 => {
                return Err(invalid("cluster window sides must be non-zero".into()));
            }
            ClusterWindow::Euclidean { radius } if !radius.is_finite() || radius <= 0.0 => {
                return Err(invalid(format!(
                    "cluster radius must be positive, got {radius}"
                )));
            }
            _ => {}
        }
        if !h.parallel_tolerance_deg.is_finite() || h.parallel_tolerance_deg < 0.0 {
            return Err(invalid(format!(
                "parallel_tolerance_deg must be >= 0, got {}",
                h.parallel_tolerance_deg
            )));
        }

        let c = &self.corners;
        if c.boundary_tolerance < 0 {
            return Err(invalid("boundary_tolerance must be >= 0".into()));
        }
        if c.nudge_shift < 0 {
            return Err(invalid("nudge_shift must be >= 0".into()));
        }

        if self.target.width < 2 || self.target.height < 2 {
            return Err(invalid(format!(
                "target must be at least 2x2, got {}x{}",
                self.target.width, self.target.height
            )));
        }
        Ok(())
    }
}

fn invalid(msg: String) -> BlattwerkError {
    BlattwerkError::InvalidConfig(msg)
}
