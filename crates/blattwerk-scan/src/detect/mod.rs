// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sheet detection: gradient map, Hough voting, line reconstruction and
// corner solving.

pub mod corners;
pub mod hough;
pub mod lines;
pub mod preprocess;

pub use corners::{CornerSolution, solve_corners};
pub use hough::{HoughSpace, dominant_edges, extract_edges, select_document_edges};
pub use lines::reconstruct_lines;
pub use preprocess::{GradientMap, gradient_magnitude, grayscale, smooth};
