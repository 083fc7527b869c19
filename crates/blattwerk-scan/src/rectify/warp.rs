// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Inverse-mapped perspective warp with bilinear resampling.

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::TargetSize;
use image::RgbImage;
use rayon::prelude::*;
use tracing::{debug, instrument};

use super::homography::Homography;
use crate::cancel::CancelToken;

#[inline]
fn pixel_at(image: &RgbImage, x: i64, y: i64) -> [f64; 3] {
    let cx = x.clamp(0, image.width() as i64 - 1) as u32;
    let cy = y.clamp(0, image.height() as i64 - 1) as u32;
    let [r, g, b] = image.get_pixel(cx, cy).0;
    [r as f64, g as f64, b as f64]
}

/// Bilinear sample of every channel at a fractional position.
///
/// Neighbours outside the image repeat the nearest edge pixel. An empty
/// image samples as black.
pub fn sample_bilinear(image: &RgbImage, x: f64, y: f64) -> [f64; 3] {
    if image.width() == 0 || image.height() == 0 {
        return [0.0; 3];
    }
    let x0 = x.floor();
    let y0 = y.floor();
    let (dx, dy) = (x - x0, y - y0);
    let (xi, yi) = (x0 as i64, y0 as i64);

    let p00 = pixel_at(image, xi, yi);
    let p10 = pixel_at(image, xi + 1, yi);
    let p01 = pixel_at(image, xi, yi + 1);
    let p11 = pixel_at(image, xi + 1, yi + 1);

    let mut out = [0.0; 3];
    for c in 0..3 {
        let top = p00[c] * (1.0 - dx) + p10[c] * dx;
        let bottom = p01[c] * (1.0 - dx) + p11[c] * dx;
        out[c] = top * (1.0 - dy) + bottom * dy;
    }
    out
}

/// Render the `target`-sized rectified image.
///
/// Each output pixel is the bilinear sample at its source position. Rows are
/// filled in parallel and the token is polled once per row.
#[instrument(skip_all, fields(width = target.width, height = target.height))]
pub fn warp(
    source: &RgbImage,
    homography: &Homography,
    target: TargetSize,
    cancel: &CancelToken,
) -> Result<RgbImage> {
    if source.width() == 0 || source.height() == 0 {
        return Err(BlattwerkError::ImageError("cannot warp an empty image".into()));
    }

    let row_len = target.width as usize * 3;
    let mut buffer = vec![0u8; row_len * target.height as usize];

    buffer
        .par_chunks_mut(row_len.max(1))
        .enumerate()
        .try_for_each(|(v, row)| {
            cancel.check()?;
            for (u, px) in row.chunks_exact_mut(3).enumerate() {
                let (x, y) = homography.map_to_source(u as f64, v as f64);
                let sample = sample_bilinear(source, x, y);
                for (out, value) in px.iter_mut().zip(sample) {
                    *out = value.round().clamp(0.0, 255.0) as u8;
                }
            }
            Ok::<(), BlattwerkError>(())
        })?;

    debug!("Warp complete");
    RgbImage::from_raw(target.width, target.height, buffer)
        .ok_or_else(|| BlattwerkError::ImageError("rectified buffer size mismatch".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use blattwerk_core::types::{OrderedCorners, Point};
    use image::Rgb;

    #[test]
    fn exact_at_integer_coordinates() {
        let img = RgbImage::from_fn(4, 3, |x, y| Rgb([(x * 10) as u8, (y * 20) as u8, 7]));
        assert_eq!(sample_bilinear(&img, 2.0, 1.0), [20.0, 20.0, 7.0]);
        assert_eq!(sample_bilinear(&img, 3.0, 2.0), [30.0, 40.0, 7.0]);
    }

    #[test]
    fn midpoint_is_the_mean() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([10, 20, 30]));
        img.put_pixel(1, 0, Rgb([20, 40, 60]));
        assert_eq!(sample_bilinear(&img, 0.5, 0.0), [15.0, 30.0, 45.0]);
    }

    #[test]
    fn outside_samples_repeat_the_edge() {
        let img = RgbImage::from_fn(3, 3, |x, _| Rgb([(x * 100) as u8, 0, 0]));
        assert_eq!(sample_bilinear(&img, -5.0, 1.0)[0], 0.0);
        assert_eq!(sample_bilinear(&img, 9.5, 1.0)[0], 200.0);
    }

    #[test]
    fn empty_image_samples_as_black() {
        assert_eq!(sample_bilinear(&RgbImage::new(0, 0), 0.5, 0.5), [0.0; 3]);
        assert_eq!(sample_bilinear(&RgbImage::new(4, 0), 1.0, 0.0), [0.0; 3]);
    }

    #[test]
    fn warp_of_the_full_frame_is_a_copy() {
        let src = RgbImage::from_fn(20, 30, |x, y| Rgb([x as u8, y as u8, (x + y) as u8]));
        let corners = OrderedCorners::from_array([
            Point::new(0, 0),
            Point::new(19, 0),
            Point::new(0, 29),
            Point::new(19, 29),
        ]);
        let target = TargetSize::new(20, 30);
        let hom = Homography::for_target(&corners, target).expect("solve");
        let out = warp(&src, &hom, target, &CancelToken::new()).expect("warp");
        assert_eq!(out, src);
    }

    #[test]
    fn output_has_target_size() {
        let src = RgbImage::from_pixel(50, 50, Rgb([9, 9, 9]));
        let corners = OrderedCorners::from_array([
            Point::new(5, 5),
            Point::new(45, 8),
            Point::new(4, 40),
            Point::new(44, 44),
        ]);
        let target = TargetSize::new(33, 21);
        let hom = Homography::for_target(&corners, target).expect("solve");
        let out = warp(&src, &hom, target, &CancelToken::new()).expect("warp");
        assert_eq!(out.dimensions(), (33, 21));
        assert!(out.pixels().all(|p| *p == Rgb([9, 9, 9])));
    }

    #[test]
    fn cancelled_warp_stops() {
        let src = RgbImage::new(10, 10);
        let corners = OrderedCorners::from_array([
            Point::new(0, 0),
            Point::new(9, 0),
            Point::new(0, 9),
            Point::new(9, 9),
        ]);
        let target = TargetSize::new(10, 10);
        let hom = Homography::for_target(&corners, target).expect("solve");
        let token = CancelToken::new();
        token.cancel();
        assert!(matches!(
            warp(&src, &hom, target, &token),
            Err(BlattwerkError::Cancelled)
        ));
    }
}
