// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Diagnostic overlay: detected sides in red, their endpoints circled in
// yellow.

use blattwerk_core::types::Line;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};

const SEGMENT_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const ENDPOINT_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
const ENDPOINT_RADIUS: i32 = 5;

/// Copy of `source` with `segments` drawn on top.
pub fn annotate(source: &RgbImage, segments: &[Line; 4]) -> RgbImage {
    let mut marked = source.clone();
    for segment in segments {
        if let [start, end] = segment.endpoints() {
            draw_line_segment_mut(
                &mut marked,
                (start.x as f32, start.y as f32),
                (end.x as f32, end.y as f32),
                SEGMENT_COLOR,
            );
        }
        for point in segment.endpoints() {
            draw_hollow_circle_mut(&mut marked, (point.x, point.y), ENDPOINT_RADIUS, ENDPOINT_COLOR);
        }
    }
    marked
}
