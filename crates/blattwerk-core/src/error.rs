// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Blattwerk.

use thiserror::Error;

/// Top-level error type for all Blattwerk operations.
///
/// Every variant is scoped to a single image: a batch driver reports it and
/// moves on to the next input.
#[derive(Debug, Error)]
pub enum BlattwerkError {
    // -- Detection errors --
    #[error(
        "only {found} dominant edge(s) survived clustering (need 4); raise the peak divisor or lower the gradient threshold"
    )]
    ThresholdTooStrict { found: usize },

    #[error("could not reduce {candidates} strong edges to the four sheet sides")]
    AmbiguousEdgeSet { candidates: usize },

    #[error("only {found} valid corner(s) inside the image (need 4)")]
    InsufficientCorners { found: usize },

    #[error("degenerate homography: {0}")]
    DegenerateHomography(String),

    // -- Setup errors --
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("scan cancelled")]
    Cancelled,

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BlattwerkError {
    /// Stable snake_case name of the variant, used in batch reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ThresholdTooStrict { .. } => "threshold_too_strict",
            Self::AmbiguousEdgeSet { .. } => "ambiguous_edge_set",
            Self::InsufficientCorners { .. } => "insufficient_corners",
            Self::DegenerateHomography(_) => "degenerate_homography",
            Self::InvalidConfig(_) => "invalid_config",
            Self::ImageError(_) => "image_error",
            Self::Cancelled => "cancelled",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BlattwerkError>;
