// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document scanner: runs detection, rectification and annotation for one
// photograph.
//
// Each stage consumes the previous stage's output only; the scanner itself
// holds nothing but its configuration, so one instance can serve many
// images concurrently.

use blattwerk_core::config::DetectionConfig;
use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::{HoughEdge, Line, OrderedCorners};
use image::{DynamicImage, RgbImage};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::annotate::annotate;
use crate::cancel::CancelToken;
use crate::detect::{
    CornerSolution, dominant_edges, gradient_magnitude, grayscale, reconstruct_lines, smooth,
    solve_corners,
};
use crate::rectify::{Homography, warp};

/// Where the sheet is in the source photograph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    /// The four Hough peaks the sides came from.
    pub edges: [HoughEdge; 4],
    /// The sides, with their corner endpoints attached.
    pub segments: [Line; 4],
    pub corners: OrderedCorners,
}

/// Everything produced for one photograph.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub detection: Detection,
    pub homography: Homography,
    /// The sheet, rectified to the configured target size.
    pub rectified: RgbImage,
    /// Copy of the source with the detected sides drawn on it.
    pub marked: RgbImage,
}

/// Sheet detector and rectifier.
#[derive(Debug, Clone, Default)]
pub struct DocumentScanner {
    config: DetectionConfig,
}

impl DocumentScanner {
    /// Create a scanner, rejecting invalid configurations.
    pub fn new(config: DetectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Locate the sheet: gradient map, Hough edges, lines, corners.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn detect(&self, image: &RgbImage, cancel: &CancelToken) -> Result<Detection> {
        if image.width() == 0 || image.height() == 0 {
            return Err(BlattwerkError::ImageError("image has no pixels".into()));
        }
        cancel.check()?;

        let gray = grayscale(image);
        let smoothed = smooth(&gray, self.config.preprocess.blur_sigma);
        let gradient = gradient_magnitude(&smoothed);
        cancel.check()?;

        let edges = dominant_edges(
            &gradient,
            self.config.preprocess.gradient_threshold,
            &self.config.hough,
            cancel,
        )?;
        debug!(?edges, "Dominant edges selected");

        let lines = reconstruct_lines(&edges, self.config.hough.angle_range);
        cancel.check()?;

        let CornerSolution { segments, corners } =
            solve_corners(&lines, image, &self.config.corners)?;
        Ok(Detection {
            edges,
            segments,
            corners,
        })
    }

    /// Warp the quadrilateral `corners` of `image` onto the target rectangle.
    pub fn rectify(
        &self,
        image: &RgbImage,
        corners: &OrderedCorners,
        cancel: &CancelToken,
    ) -> Result<(Homography, RgbImage)> {
        let homography = Homography::for_target(corners, self.config.target)?;
        cancel.check()?;
        let rectified = warp(image, &homography, self.config.target, cancel)?;
        Ok((homography, rectified))
    }

    /// Detect, rectify and annotate without a cancellation handle.
    pub fn scan(&self, image: &DynamicImage) -> Result<ScanOutcome> {
        self.scan_with_cancel(image, &CancelToken::new())
    }

    /// Detect, rectify and annotate. Gray inputs are expanded to RGB first.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn scan_with_cancel(
        &self,
        image: &DynamicImage,
        cancel: &CancelToken,
    ) -> Result<ScanOutcome> {
        let rgb = image.to_rgb8();
        let detection = self.detect(&rgb, cancel)?;
        let (homography, rectified) = self.rectify(&rgb, &detection.corners, cancel)?;
        let marked = annotate(&rgb, &detection.segments);

        let c = &detection.corners;
        info!(
            tl = %c.top_left,
            tr = %c.top_right,
            bl = %c.bottom_left,
            br = %c.bottom_right,
            "Sheet rectified"
        );
        Ok(ScanOutcome {
            detection,
            homography,
            rectified,
            marked,
        })
    }
}
