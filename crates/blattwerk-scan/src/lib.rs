// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// blattwerk-scan: Sheet detection and rectification for Blattwerk.
//
// Finds the four sides of a bright document in a photograph by Hough voting
// over a gradient map, intersects them into ordered corners, and warps the
// enclosed quadrilateral onto a fixed-size rectangle. Also provides the
// diagnostic overlay, per-image cancellation and image file helpers.

pub mod annotate;
pub mod cancel;
pub mod detect;
pub mod io;
pub mod pipeline;
pub mod rectify;

// Re-export the primary types so callers can use `blattwerk_scan::DocumentScanner` etc.
pub use annotate::annotate;
pub use cancel::CancelToken;
pub use pipeline::{Detection, DocumentScanner, ScanOutcome};
pub use rectify::Homography;
