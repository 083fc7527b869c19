// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective rectification: homography solving and inverse warping.

pub mod homography;
pub mod warp;

pub use homography::Homography;
pub use warp::{sample_bilinear, warp};
