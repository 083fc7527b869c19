// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the blattwerk-scan crate: the Hough voting pass on
// its own and the full detect + rectify + annotate pipeline.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, Rgb, RgbImage};

use blattwerk_core::types::AngleRange;
use blattwerk_scan::detect::{HoughSpace, gradient_magnitude, grayscale, smooth};
use blattwerk_scan::{CancelToken, DocumentScanner};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// 640x800 dark frame with a bright axis-aligned sheet.
fn synthetic_photo() -> RgbImage {
    let mut img = RgbImage::from_pixel(640, 800, Rgb([30, 30, 30]));
    for y in 90..710 {
        for x in 80..560 {
            img.put_pixel(x, y, Rgb([235, 235, 235]));
        }
    }
    img
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_hough_vote(c: &mut Criterion) {
    let gradient = gradient_magnitude(&smooth(&grayscale(&synthetic_photo()), 2.0));
    let cancel = CancelToken::new();

    c.bench_function("hough_vote (640x800, full range)", |b| {
        b.iter(|| {
            let space = HoughSpace::vote(black_box(&gradient), 20.0, AngleRange::Full, &cancel);
            black_box(space.map(|s| s.max_votes()).ok());
        });
    });
}

fn bench_full_scan(c: &mut Criterion) {
    let photo = DynamicImage::ImageRgb8(synthetic_photo());
    let scanner = DocumentScanner::default();

    c.bench_function("scan (640x800 -> 410x594)", |b| {
        b.iter(|| {
            let outcome = scanner.scan(black_box(&photo));
            black_box(outcome.map(|o| o.rectified).ok());
        });
    });
}

criterion_group!(benches, bench_hough_vote, bench_full_scan);
criterion_main!(benches);
