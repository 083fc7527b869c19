// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch driver: scans each input independently on the rayon pool, retrying
// calibration failures with relaxed thresholds.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use blattwerk_core::config::DetectionConfig;
use blattwerk_core::error::Result;
use blattwerk_core::recovery::{RetryDecision, RetryPolicy, suggestion};
use blattwerk_scan::io::{load_image, save_image};
use blattwerk_scan::{CancelToken, DocumentScanner, ScanOutcome};
use image::DynamicImage;
use rayon::prelude::*;
use tracing::{info, info_span, warn};

use crate::report::{BatchReport, ImageReport, ImageStatus};

/// Per-run settings shared by every image.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Output directory; `None` writes next to each input.
    pub out_dir: Option<PathBuf>,
    pub retry: RetryPolicy,
    /// Per-image deadline.
    pub timeout: Option<Duration>,
}

/// `<stem>_marked.png` and `<stem>_rectified.png` for `input`.
pub fn output_paths(input: &Path, out_dir: Option<&Path>) -> (PathBuf, PathBuf) {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "scan".to_string());
    let dir = out_dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    (
        dir.join(format!("{stem}_marked.png")),
        dir.join(format!("{stem}_rectified.png")),
    )
}

/// Scan `image`, relaxing the configuration after calibration failures.
/// Returns the number of attempts alongside the final result.
fn scan_with_retries(
    image: &DynamicImage,
    config: &DetectionConfig,
    policy: &RetryPolicy,
    cancel: &CancelToken,
) -> (u32, Result<ScanOutcome>) {
    let mut current = config.clone();
    let mut attempt = 0;
    loop {
        let result =
            DocumentScanner::new(current.clone()).and_then(|s| s.scan_with_cancel(image, cancel));
        let err = match result {
            Ok(outcome) => return (attempt + 1, Ok(outcome)),
            Err(err) => err,
        };
        match policy.decide(attempt, &err, &current) {
            RetryDecision::Retry(next) => {
                current = next;
                attempt += 1;
            }
            RetryDecision::GiveUp(_) | RetryDecision::Exhausted => {
                return (attempt + 1, Err(err));
            }
        }
    }
}

/// Load, scan and save one input. Failures are recorded, never raised.
pub fn process_image(
    input: &Path,
    config: &DetectionConfig,
    options: &BatchOptions,
) -> ImageReport {
    let _span = info_span!("image", path = %input.display()).entered();
    let started = Instant::now();
    let cancel = options
        .timeout
        .map_or_else(CancelToken::new, CancelToken::with_timeout);

    let mut attempts = 0;
    let mut outputs = Vec::new();
    let result = load_image(input).and_then(|image| {
        let (runs, outcome) = scan_with_retries(&image, config, &options.retry, &cancel);
        attempts = runs;
        let outcome = outcome?;

        let (marked_path, rectified_path) = output_paths(input, options.out_dir.as_deref());
        save_image(&outcome.marked, &marked_path)?;
        outputs.push(marked_path);
        save_image(&outcome.rectified, &rectified_path)?;
        outputs.push(rectified_path);
        Ok(outcome.detection.corners)
    });

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match result {
        Ok(corners) => {
            info!(attempts, elapsed_ms, "Scanned");
            ImageReport {
                input: input.to_path_buf(),
                status: ImageStatus::Ok,
                error: None,
                corners: Some(corners),
                attempts,
                outputs,
                elapsed_ms,
            }
        }
        Err(err) => {
            warn!(
                kind = err.kind(),
                error = %err,
                hint = suggestion(&err),
                attempts,
                "Scan failed"
            );
            ImageReport {
                input: input.to_path_buf(),
                status: ImageStatus::Failed,
                error: Some((&err).into()),
                corners: None,
                attempts,
                outputs,
                elapsed_ms,
            }
        }
    }
}

/// Process every input in parallel on the current rayon pool. The report
/// keeps the input order.
pub fn run_batch(inputs: &[PathBuf], config: &DetectionConfig, options: &BatchOptions) -> BatchReport {
    let images = inputs
        .par_iter()
        .map(|input| process_image(input, config, options))
        .collect();
    let report = BatchReport::new(images);
    info!(
        total = inputs.len(),
        succeeded = report.succeeded(),
        failed = report.failed(),
        "Batch finished"
    );
    report
}
