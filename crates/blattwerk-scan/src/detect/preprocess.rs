// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Preprocessing: luma conversion, Gaussian smoothing and the cross-shaped
// gradient magnitude used for voting.

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::filter::gaussian_blur_f32;
use rayon::prelude::*;
use tracing::{debug, instrument};

/// Luma of an RGB pixel with the standard 0.299/0.587/0.114 weights.
pub fn luma(pixel: &Rgb<u8>) -> f32 {
    let [r, g, b] = pixel.0;
    0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
}

/// Convert to an 8-bit grayscale image.
pub fn grayscale(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([luma(image.get_pixel(x, y)).round().clamp(0.0, 255.0) as u8])
    })
}

/// Gaussian blur with the given sigma. A sigma of zero returns a copy.
pub fn smooth(gray: &GrayImage, sigma: f32) -> GrayImage {
    if sigma <= 0.0 {
        return gray.clone();
    }
    gaussian_blur_f32(gray, sigma)
}

/// Per-pixel edge strength, same extent as the source. Border pixels are 0.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientMap {
    width: u32,
    height: u32,
    magnitudes: Vec<f32>,
}

impl GradientMap {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Magnitude at `(x, y)`.
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.magnitudes[y as usize * self.width as usize + x as usize]
    }

    /// One row of magnitudes.
    pub fn row(&self, y: u32) -> &[f32] {
        let start = y as usize * self.width as usize;
        &self.magnitudes[start..start + self.width as usize]
    }

    pub fn max_magnitude(&self) -> f32 {
        self.magnitudes.iter().copied().fold(0.0, f32::max)
    }
}

/// Cross-shaped central difference: `dx = I(x+1) - I(x-1)`,
/// `dy = I(y+1) - I(y-1)`, magnitude `sqrt(dx^2 + dy^2)`.
#[instrument(skip_all, fields(width = gray.width(), height = gray.height()))]
pub fn gradient_magnitude(gray: &GrayImage) -> GradientMap {
    let (width, height) = (gray.width() as usize, gray.height() as usize);
    let mut magnitudes = vec![0.0f32; width * height];

    if width >= 3 && height >= 3 {
        let pixels = gray.as_raw();
        magnitudes
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row_out)| {
                if y == 0 || y == height - 1 {
                    return;
                }
                let row = y * width;
                for x in 1..width - 1 {
                    let dx = pixels[row + x + 1] as f32 - pixels[row + x - 1] as f32;
                    let dy = pixels[row + width + x] as f32 - pixels[row - width + x] as f32;
                    row_out[x] = (dx * dx + dy * dy).sqrt();
                }
            });
    }

    let map = GradientMap {
        width: width as u32,
        height: height as u32,
        magnitudes,
    };
    debug!(max = map.max_magnitude(), "Gradient magnitude computed");
    map
}
