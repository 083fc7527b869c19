// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Polar (angle, distance) edges to Cartesian lines.

use blattwerk_core::types::{AngleRange, HoughEdge, Line};
use tracing::debug;

/// Line described by `edge`, with the vote-time rotation of `range` undone.
///
/// Angles that are a multiple of 180 degrees give the vertical line
/// `x = distance * cos(theta)`; any other angle gives
/// `y = -cot(theta) * x + distance / sin(theta)`.
pub fn edge_to_line(edge: &HoughEdge, range: AngleRange) -> Line {
    let degrees = range.degrees(edge.angle);
    let distance = edge.distance as f64;

    if degrees % 180 == 0 {
        let offset = if degrees == 0 { distance } else { -distance };
        return Line::vertical(offset as i32);
    }

    let theta = (degrees as f64).to_radians();
    Line::sloped(-theta.cos() / theta.sin(), distance / theta.sin())
}

/// Reconstruct the four sheet sides.
pub fn reconstruct_lines(edges: &[HoughEdge; 4], range: AngleRange) -> [Line; 4] {
    let lines = edges.map(|edge| edge_to_line(&edge, range));
    for (i, line) in lines.iter().enumerate() {
        debug!(index = i, %line, "Reconstructed line");
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_degrees_is_vertical() {
        let line = edge_to_line(&HoughEdge::new(180, 50, 1), AngleRange::Full);
        assert!(line.is_vertical);
        assert_eq!(line.vertical_offset, 50);

        let line = edge_to_line(&HoughEdge::new(0, 30, 1), AngleRange::Half);
        assert!(line.is_vertical);
        assert_eq!(line.vertical_offset, 30);
    }

    #[test]
    fn half_turn_is_vertical_on_the_negative_side() {
        // Bucket 0 of the full range is -180 degrees.
        let line = edge_to_line(&HoughEdge::new(0, 5, 1), AngleRange::Full);
        assert!(line.is_vertical);
        assert_eq!(line.vertical_offset, -5);
    }

    #[test]
    fn ninety_degrees_is_horizontal() {
        let line = edge_to_line(&HoughEdge::new(270, 60, 1), AngleRange::Full);
        assert!(!line.is_vertical);
        assert!(line.slope.abs() < 1e-9);
        assert!((line.intercept - 60.0).abs() < 1e-9);
    }

    #[test]
    fn diagonal_line() {
        // x cos45 + y sin45 = 100  =>  y = -x + 100 * sqrt(2)
        let line = edge_to_line(&HoughEdge::new(225, 100, 1), AngleRange::Full);
        assert!((line.slope + 1.0).abs() < 1e-9);
        assert!((line.intercept - 100.0 * 2f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn negative_angles_stay_on_their_line() {
        // -10 degrees, distance 200: points on the line satisfy the polar form.
        let theta = (-10f64).to_radians();
        let line = edge_to_line(&HoughEdge::new(170, 200, 1), AngleRange::Full);
        for x in [0.0, 150.0, 300.0] {
            let y = line.y_at(x).expect("not vertical");
            assert!((x * theta.cos() + y * theta.sin() - 200.0).abs() < 1e-6);
        }
    }

    #[test]
    fn four_edges_keep_their_order() {
        let edges = [
            HoughEdge::new(180, 50, 9),
            HoughEdge::new(180, 350, 9),
            HoughEdge::new(270, 60, 9),
            HoughEdge::new(270, 440, 9),
        ];
        let lines = reconstruct_lines(&edges, AngleRange::Full);
        assert_eq!(lines[0].vertical_offset, 50);
        assert_eq!(lines[1].vertical_offset, 350);
        assert!((lines[2].intercept - 60.0).abs() < 1e-9);
        assert!((lines[3].intercept - 440.0).abs() < 1e-9);
    }
}
