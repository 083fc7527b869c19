// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Four-point homography from the rectified target rectangle to the source
// photograph.

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::{OrderedCorners, TargetSize};
use nalgebra::{Matrix3, SMatrix, SVector};
use tracing::{debug, instrument, warn};

/// Systems whose reciprocal condition number falls below this are rejected.
const MIN_RCOND: f64 = 1e-10;

/// Determinant floor for the normalized 3x3 matrix.
const MIN_DETERMINANT: f64 = 1e-10;

/// Projective denominators closer to zero than this count as vanishing.
const MIN_DENOMINATOR: f64 = 1e-9;

/// Projective map from target `(u, v)` to source `(x, y)`:
///
/// ```text
/// x = (a u + b v + c) / (g u + h v + 1)
/// y = (d u + e v + f) / (g u + h v + 1)
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    coefficients: [f64; 8],
}

/// Translate the centroid to the origin and scale to a mean distance of
/// sqrt(2). Returns the transform and the normalized points.
fn normalize_points(points: &[(f64, f64); 4]) -> (Matrix3<f64>, [(f64, f64); 4]) {
    let cx = points.iter().map(|p| p.0).sum::<f64>() / 4.0;
    let cy = points.iter().map(|p| p.1).sum::<f64>() / 4.0;
    let mean_dist = points
        .iter()
        .map(|p| ((p.0 - cx).powi(2) + (p.1 - cy).powi(2)).sqrt())
        .sum::<f64>()
        / 4.0;
    let s = if mean_dist > 1e-15 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    let transform = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let normalized = points.map(|p| (s * (p.0 - cx), s * (p.1 - cy)));
    (transform, normalized)
}

fn degenerate(msg: impl Into<String>) -> BlattwerkError {
    let msg = msg.into();
    warn!(reason = %msg, "Degenerate homography");
    BlattwerkError::DegenerateHomography(msg)
}

impl Homography {
    /// Solve the eight coefficients from four `target -> source`
    /// correspondences.
    ///
    /// Both point sets are normalized before the 8x8 system is solved by SVD,
    /// then the result is mapped back to pixel coordinates.
    #[instrument(skip_all)]
    pub fn from_correspondences(
        target: [(f64, f64); 4],
        source: [(f64, f64); 4],
    ) -> Result<Self> {
        if target
            .iter()
            .chain(source.iter())
            .any(|p| !p.0.is_finite() || !p.1.is_finite())
        {
            return Err(degenerate("non-finite corner coordinate"));
        }

        let (t_target, target_n) = normalize_points(&target);
        let (t_source, source_n) = normalize_points(&source);

        let mut a = SMatrix::<f64, 8, 8>::zeros();
        let mut b = SVector::<f64, 8>::zeros();
        for (i, (&(u, v), &(x, y))) in target_n.iter().zip(source_n.iter()).enumerate() {
            let (rx, ry) = (2 * i, 2 * i + 1);
            // [u v 1 0 0 0 -ux -vx] . p = x
            a[(rx, 0)] = u;
            a[(rx, 1)] = v;
            a[(rx, 2)] = 1.0;
            a[(rx, 6)] = -u * x;
            a[(rx, 7)] = -v * x;
            b[rx] = x;
            // [0 0 0 u v 1 -uy -vy] . p = y
            a[(ry, 3)] = u;
            a[(ry, 4)] = v;
            a[(ry, 5)] = 1.0;
            a[(ry, 6)] = -u * y;
            a[(ry, 7)] = -v * y;
            b[ry] = y;
        }

        let svd = a.svd(true, true);
        let sigma_max = svd.singular_values.max();
        let sigma_min = svd.singular_values.min();
        let rcond = if sigma_max > 0.0 {
            sigma_min / sigma_max
        } else {
            0.0
        };
        if !(rcond >= MIN_RCOND) {
            return Err(degenerate(format!(
                "correspondence system is singular (rcond {rcond:.3e})"
            )));
        }
        let p = svd
            .solve(&b, f64::EPSILON)
            .map_err(|e| degenerate(format!("SVD solve failed: {e}")))?;

        let h_norm = Matrix3::new(p[0], p[1], p[2], p[3], p[4], p[5], p[6], p[7], 1.0);
        let det = h_norm.determinant();
        if !det.is_finite() || det.abs() < MIN_DETERMINANT {
            return Err(degenerate(format!(
                "normalized matrix is singular (det {det:.3e})"
            )));
        }

        let t_source_inv = t_source
            .try_inverse()
            .ok_or_else(|| degenerate("source normalization not invertible"))?;
        let h = t_source_inv * h_norm * t_target;
        let scale = h[(2, 2)];
        if !scale.is_finite() || scale.abs() < MIN_DENOMINATOR {
            return Err(degenerate("target origin maps to infinity"));
        }
        let h = h / scale;

        let homography = Self {
            coefficients: [
                h[(0, 0)],
                h[(0, 1)],
                h[(0, 2)],
                h[(1, 0)],
                h[(1, 1)],
                h[(1, 2)],
                h[(2, 0)],
                h[(2, 1)],
            ],
        };

        // Positive at every target corner means positive over the whole
        // rectangle, so the warp never crosses the horizon line.
        for &(u, v) in &target {
            let w = homography.denominator(u, v);
            if !(w > MIN_DENOMINATOR) {
                return Err(degenerate(format!(
                    "projective denominator {w:.3e} at target ({u}, {v})"
                )));
            }
        }

        debug!(coefficients = ?homography.coefficients, rcond, "Homography solved");
        Ok(homography)
    }

    /// Homography taking the `target` rectangle onto the detected corners.
    pub fn for_target(corners: &OrderedCorners, target: TargetSize) -> Result<Self> {
        let (w, h) = (
            target.width.saturating_sub(1) as f64,
            target.height.saturating_sub(1) as f64,
        );
        let destination = [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)];
        let source = corners
            .to_array()
            .map(|p| (p.x as f64, p.y as f64));
        Self::from_correspondences(destination, source)
    }

    /// `[a, b, c, d, e, f, g, h]`.
    pub fn coefficients(&self) -> [f64; 8] {
        self.coefficients
    }

    /// The full 3x3 matrix with a unit bottom-right entry.
    pub fn to_matrix(&self) -> Matrix3<f64> {
        let [a, b, c, d, e, f, g, h] = self.coefficients;
        Matrix3::new(a, b, c, d, e, f, g, h, 1.0)
    }

    fn denominator(&self, u: f64, v: f64) -> f64 {
        let [.., g, h] = self.coefficients;
        g * u + h * v + 1.0
    }

    /// Source position of target pixel `(u, v)`.
    #[inline]
    pub fn map_to_source(&self, u: f64, v: f64) -> (f64, f64) {
        let [a, b, c, d, e, f, ..] = self.coefficients;
        let w = self.denominator(u, v);
        ((a * u + b * v + c) / w, (d * u + e * v + f) / w)
    }

    /// Target position of source pixel `(x, y)`, from the adjugate of the
    /// coefficient matrix. `None` where the inverse is undefined.
    pub fn map_to_target(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let [a, b, c, d, e, f, g, h] = self.coefficients;
        let (ia, ib, ic) = (e - f * h, c * h - b, b * f - c * e);
        let (id, ie, i_f) = (f * g - d, a - c * g, c * d - a * f);
        let (ig, ih, ii) = (d * h - e * g, b * g - a * h, a * e - b * d);

        let w = ig * x + ih * y + ii;
        if !w.is_finite() || w.abs() < f64::EPSILON {
            return None;
        }
        let u = (ia * x + ib * y + ic) / w;
        let v = (id * x + ie * y + i_f) / w;
        (u.is_finite() && v.is_finite()).then_some((u, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blattwerk_core::types::Point;

    fn close(a: (f64, f64), b: (f64, f64), tol: f64) -> bool {
        (a.0 - b.0).abs() <= tol && (a.1 - b.1).abs() <= tol
    }

    fn skewed_corners() -> OrderedCorners {
        OrderedCorners::from_array([
            Point::new(50, 60),
            Point::new(360, 55),
            Point::new(40, 400),
            Point::new(370, 395),
        ])
    }

    #[test]
    fn identity_for_matching_squares() {
        let square = [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (10.0, 10.0)];
        let hom = Homography::from_correspondences(square, square).expect("solve");
        for (u, v) in [(0.0, 0.0), (3.5, 7.25), (10.0, 10.0)] {
            assert!(close(hom.map_to_source(u, v), (u, v), 1e-9));
        }
        let m = hom.to_matrix();
        assert!((m - Matrix3::identity()).abs().max() < 1e-9);
    }

    #[test]
    fn pure_scaling() {
        let target = [(0.0, 0.0), (100.0, 0.0), (0.0, 50.0), (100.0, 50.0)];
        let source = [(0.0, 0.0), (200.0, 0.0), (0.0, 150.0), (200.0, 150.0)];
        let hom = Homography::from_correspondences(target, source).expect("solve");
        let [a, b, _, d, e, _, g, h] = hom.coefficients();
        assert!((a - 2.0).abs() < 1e-9 && (e - 3.0).abs() < 1e-9);
        assert!(b.abs() < 1e-9 && d.abs() < 1e-9);
        assert!(g.abs() < 1e-12 && h.abs() < 1e-12);
    }

    #[test]
    fn target_corners_land_on_source_corners() {
        let corners = skewed_corners();
        let hom = Homography::for_target(&corners, TargetSize::new(410, 594)).expect("solve");

        let targets = [(0.0, 0.0), (409.0, 0.0), (0.0, 593.0), (409.0, 593.0)];
        for ((u, v), p) in targets.into_iter().zip(corners.to_array()) {
            let mapped = hom.map_to_source(u, v);
            assert!(
                close(mapped, (p.x as f64, p.y as f64), 1e-6),
                "({u}, {v}) -> {mapped:?}, expected {p}"
            );
        }
    }

    #[test]
    fn inverse_undoes_forward_mapping() {
        let hom =
            Homography::for_target(&skewed_corners(), TargetSize::new(410, 594)).expect("solve");
        for (u, v) in [(0.0, 0.0), (204.5, 296.5), (17.0, 580.0), (409.0, 1.0)] {
            let (x, y) = hom.map_to_source(u, v);
            let back = hom.map_to_target(x, y).expect("invertible");
            assert!(close(back, (u, v), 1e-6), "({u}, {v}) came back as {back:?}");
        }
    }

    #[test]
    fn duplicate_corners_are_degenerate() {
        let corners = OrderedCorners::from_array([
            Point::new(50, 60),
            Point::new(50, 60),
            Point::new(40, 400),
            Point::new(370, 395),
        ]);
        let err = Homography::for_target(&corners, TargetSize::default()).unwrap_err();
        assert!(matches!(err, BlattwerkError::DegenerateHomography(_)));
    }

    #[test]
    fn collinear_corners_are_degenerate() {
        let corners = OrderedCorners::from_array([
            Point::new(10, 10),
            Point::new(20, 20),
            Point::new(30, 30),
            Point::new(40, 40),
        ]);
        let err = Homography::for_target(&corners, TargetSize::default()).unwrap_err();
        assert!(matches!(err, BlattwerkError::DegenerateHomography(_)));
    }

    #[test]
    fn crossed_corners_are_degenerate() {
        // Top edge reversed: the quad is a bow-tie.
        let corners = OrderedCorners::from_array([
            Point::new(300, 50),
            Point::new(50, 50),
            Point::new(50, 400),
            Point::new(300, 400),
        ]);
        let err = Homography::for_target(&corners, TargetSize::default()).unwrap_err();
        assert!(matches!(err, BlattwerkError::DegenerateHomography(_)));
    }

    #[test]
    fn non_finite_input_is_rejected() {
        let square = [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (10.0, 10.0)];
        let mut bad = square;
        bad[2] = (f64::NAN, 3.0);
        assert!(Homography::from_correspondences(square, bad).is_err());
    }
}
