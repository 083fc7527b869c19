// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Corner solving: pairwise line intersection, ordering into
// TL/TR/BL/BR, brightness-guided refinement and orientation normalization.

use blattwerk_core::config::CornerConfig;
use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::{CornerRole, Line, OrderedCorners, Point};
use image::RgbImage;
use tracing::{debug, instrument, warn};

use super::preprocess::luma;

/// Output of the corner solver.
#[derive(Debug, Clone, PartialEq)]
pub struct CornerSolution {
    /// The four sides with their attached endpoints.
    pub segments: [Line; 4],
    pub corners: OrderedCorners,
}

/// Intersection of two non-parallel lines.
///
/// A vertical line contributes its `x`; otherwise `y` is the mean of both
/// lines' predictions so either side yields the same point.
fn intersection(a: &Line, b: &Line) -> Option<(f64, f64)> {
    if a.is_parallel_to(b) {
        return None;
    }
    let (x, y) = if a.is_vertical {
        let x = a.vertical_offset as f64;
        (x, b.y_at(x)?)
    } else if b.is_vertical {
        let x = b.vertical_offset as f64;
        (x, a.y_at(x)?)
    } else {
        let x = (b.intercept - a.intercept) / (a.slope - b.slope);
        (x, (a.slope * x + a.intercept + b.slope * x + b.intercept) / 2.0)
    };
    (x.is_finite() && y.is_finite()).then_some((x, y))
}

/// Intersect every ordered pair of lines.
///
/// Points inside the image grown by `tolerance` on every side are rounded,
/// clamped into the image, attached to the first line of the pair and
/// collected into the returned pool. A line stops taking part once it holds
/// two endpoints.
pub fn intersect_lines(
    lines: &[Line; 4],
    width: u32,
    height: u32,
    tolerance: i32,
) -> ([Line; 4], Vec<Point>) {
    let mut segments = *lines;
    let mut pool = Vec::with_capacity(8);
    let (min, max_x, max_y) = (
        -(tolerance as f64),
        (width as i64 + tolerance as i64) as f64,
        (height as i64 + tolerance as i64) as f64,
    );

    for i in 0..segments.len() {
        for j in 0..segments.len() {
            if i == j || segments[i].has_both_endpoints() {
                continue;
            }
            let Some((x, y)) = intersection(&segments[i], &segments[j]) else {
                continue;
            };
            if x < min || x >= max_x || y < min || y >= max_y {
                continue;
            }
            let point = Point::new(x.round() as i32, y.round() as i32).clamped(width, height);
            segments[i].attach_endpoint(point);
            pool.push(point);
        }
    }

    debug!(pool = pool.len(), "Line intersections collected");
    (segments, pool)
}

/// Collapse the doubled intersection pool into four corners.
///
/// The pool is sorted by distance from the image origin and every other
/// entry is kept. Labels follow that order: TL, TR, BL, BR.
pub fn order_corners(pool: &[Point]) -> Result<OrderedCorners> {
    let mut sorted = pool.to_vec();
    sorted.sort_by_key(Point::origin_distance_sq);
    let picked: Vec<Point> = sorted.iter().step_by(2).take(4).copied().collect();

    match <[Point; 4]>::try_from(picked) {
        Ok(points) => Ok(OrderedCorners::from_array(points)),
        Err(picked) => {
            warn!(found = picked.len(), pool = pool.len(), "Too few corners");
            Err(BlattwerkError::InsufficientCorners {
                found: picked.len(),
            })
        }
    }
}

/// Pull corners that landed on the dark background back onto the sheet.
pub fn refine_corners(
    corners: OrderedCorners,
    image: &RgbImage,
    brightness_threshold: u8,
    shift: i32,
) -> OrderedCorners {
    let (width, height) = image.dimensions();
    let mut refined = corners;
    for role in CornerRole::ALL {
        let point = corners.get(role).clamped(width, height);
        let brightness = luma(image.get_pixel(point.x as u32, point.y as u32));
        if brightness < brightness_threshold as f32 {
            let (dx, dy) = role.inward();
            let nudged = Point::new(point.x + dx * shift, point.y + dy * shift);
            debug!(?role, from = %point, to = %nudged, brightness, "Nudged dark corner");
            refined.set(role, nudged.clamped(width, height));
        }
    }
    refined
}

/// Mirror left and right for landscape frames or when the labelled top-left
/// sits right of the top-right.
pub fn normalize_orientation(corners: OrderedCorners, width: u32, height: u32) -> OrderedCorners {
    if width > height || corners.top_left.x > corners.top_right.x {
        debug!(width, height, "Swapping left and right corners");
        corners.mirrored()
    } else {
        corners
    }
}

/// Intersect, order, refine and orient in one pass.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn solve_corners(
    lines: &[Line; 4],
    image: &RgbImage,
    config: &CornerConfig,
) -> Result<CornerSolution> {
    let (width, height) = image.dimensions();
    let (segments, pool) = intersect_lines(lines, width, height, config.boundary_tolerance);
    let ordered = order_corners(&pool)?;
    let refined = refine_corners(
        ordered,
        image,
        config.brightness_threshold,
        config.nudge_shift,
    );
    let corners = normalize_orientation(refined, width, height);
    debug!(
        tl = %corners.top_left,
        tr = %corners.top_right,
        bl = %corners.bottom_left,
        br = %corners.bottom_right,
        "Corners solved"
    );
    Ok(CornerSolution { segments, corners })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn through(p: (f64, f64), q: (f64, f64)) -> Line {
        let slope = (q.1 - p.1) / (q.0 - p.0);
        Line::sloped(slope, p.1 - slope * p.0)
    }

    fn axis_aligned() -> [Line; 4] {
        [
            Line::vertical(50),
            Line::vertical(350),
            Line::sloped(0.0, 60.0),
            Line::sloped(0.0, 440.0),
        ]
    }

    fn bright(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([255, 255, 255]))
    }

    #[test]
    fn axis_aligned_rectangle_corners() {
        let solution =
            solve_corners(&axis_aligned(), &bright(400, 500), &CornerConfig::default())
                .expect("solve");
        assert_eq!(
            solution.corners.to_array(),
            [
                Point::new(50, 60),
                Point::new(350, 60),
                Point::new(50, 440),
                Point::new(350, 440)
            ]
        );
        for segment in &solution.segments {
            assert_eq!(segment.endpoint_count(), 2);
        }
        assert_eq!(
            solution.segments[0].endpoints(),
            &[Point::new(50, 60), Point::new(50, 440)]
        );
    }

    #[test]
    fn convex_quadrilateral_corners_within_a_pixel() {
        let (tl, tr, bl, br) = ((100.0, 80.0), (300.0, 90.0), (90.0, 400.0), (310.0, 390.0));
        let lines = [
            through(tl, bl),
            through(tr, br),
            through(tl, tr),
            through(bl, br),
        ];
        let solution =
            solve_corners(&lines, &bright(400, 500), &CornerConfig::default()).expect("solve");

        let expected = [tl, tr, bl, br];
        for (found, want) in solution.corners.to_array().iter().zip(expected) {
            assert!((found.x as f64 - want.0).abs() <= 1.0, "{found} vs {want:?}");
            assert!((found.y as f64 - want.1).abs() <= 1.0, "{found} vs {want:?}");
        }
    }

    #[test]
    fn every_corner_appears_twice_in_the_pool() {
        let (_, pool) = intersect_lines(&axis_aligned(), 400, 500, 20);
        assert_eq!(pool.len(), 8);
        for p in &pool {
            assert_eq!(pool.iter().filter(|q| *q == p).count(), 2);
        }
    }

    #[test]
    fn intersections_just_outside_are_clamped() {
        let lines = [
            Line::vertical(-10),
            Line::vertical(350),
            Line::sloped(0.0, 60.0),
            Line::sloped(0.0, 510.0),
        ];
        let (_, pool) = intersect_lines(&lines, 400, 500, 20);
        assert!(pool.contains(&Point::new(0, 60)));
        assert!(pool.contains(&Point::new(0, 499)));
        assert!(pool.contains(&Point::new(350, 499)));
    }

    #[test]
    fn intersections_beyond_tolerance_are_dropped() {
        let lines = [
            Line::vertical(-30),
            Line::vertical(350),
            Line::sloped(0.0, 60.0),
            Line::sloped(0.0, 440.0),
        ];
        let (segments, pool) = intersect_lines(&lines, 400, 500, 20);
        assert_eq!(pool.len(), 4);
        assert_eq!(segments[0].endpoint_count(), 0);

        let err = order_corners(&pool).unwrap_err();
        assert!(matches!(err, BlattwerkError::InsufficientCorners { found: 2 }));
    }

    #[test]
    fn near_parallel_lines_give_no_corners() {
        let lines = [
            Line::sloped(0.0, 100.0),
            Line::sloped(0.001, 150.0),
            Line::sloped(0.002, 200.0),
            Line::sloped(0.003, 250.0),
        ];
        let (_, pool) = intersect_lines(&lines, 400, 500, 20);
        assert!(pool.is_empty());
        assert!(matches!(
            order_corners(&pool),
            Err(BlattwerkError::InsufficientCorners { found: 0 })
        ));
    }

    #[test]
    fn dark_corners_move_inward() {
        let dark = RgbImage::new(400, 500);
        let corners = OrderedCorners::from_array([
            Point::new(50, 60),
            Point::new(350, 60),
            Point::new(50, 440),
            Point::new(350, 440),
        ]);
        let refined = refine_corners(corners, &dark, 125, 3);
        assert_eq!(
            refined.to_array(),
            [
                Point::new(53, 63),
                Point::new(347, 63),
                Point::new(53, 437),
                Point::new(347, 437)
            ]
        );

        // Bright corners stay put.
        assert_eq!(refine_corners(corners, &bright(400, 500), 125, 3), corners);
    }

    #[test]
    fn nudged_corners_stay_in_the_image() {
        let dark = RgbImage::new(10, 10);
        let corners = OrderedCorners::from_array([
            Point::new(9, 0),
            Point::new(0, 0),
            Point::new(9, 9),
            Point::new(0, 9),
        ]);
        let refined = refine_corners(corners, &dark, 125, 3);
        for p in refined.to_array() {
            assert!((0..10).contains(&p.x) && (0..10).contains(&p.y), "{p}");
        }
    }

    #[test]
    fn orientation_swaps_mirrored_or_landscape_frames() {
        let upright = OrderedCorners::from_array([
            Point::new(50, 60),
            Point::new(350, 60),
            Point::new(50, 440),
            Point::new(350, 440),
        ]);
        assert_eq!(normalize_orientation(upright, 400, 500), upright);
        assert_eq!(normalize_orientation(upright, 600, 500), upright.mirrored());

        let mirrored = upright.mirrored();
        assert_eq!(normalize_orientation(mirrored, 400, 500), upright);
    }
}
