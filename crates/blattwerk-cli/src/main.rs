// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Blattwerk: batch paper sheet detection and rectification.
//
// Entry point. Initialises logging, resolves the detection configuration and
// runs every input through the scanner. Exit code 0 when every image was
// rectified, 1 when at least one failed, 2 on usage or configuration errors.

mod batch;
mod report;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use blattwerk_core::config::DetectionConfig;
use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::recovery::RetryPolicy;
use blattwerk_core::types::{PaperSize, TargetSize};
use clap::Parser;
use tracing::{error, info};

use batch::{BatchOptions, run_batch};
use report::BatchReport;

#[derive(Debug, Parser)]
#[command(name = "blattwerk")]
#[command(about = "Find the paper sheet in each photo and write a rectified copy")]
#[command(version)]
struct Cli {
    /// Input photographs.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Detection configuration (JSON). Missing fields take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory (default: next to each input).
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Derive the output size from a paper size: a3, a4, a5, letter, legal or WxH in mm.
    #[arg(long)]
    paper: Option<PaperSize>,

    /// Resolution used with --paper.
    #[arg(long, default_value_t = 50.0)]
    dpi: f32,

    /// Retries with relaxed thresholds when too few edges are found.
    #[arg(long, default_value_t = 2)]
    retries: u32,

    /// Per-image time limit in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Number of worker threads (default: one per core).
    #[arg(long)]
    jobs: Option<usize>,

    /// Write a JSON report of the batch to this file.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Debug-level logging (RUST_LOG takes precedence).
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(inputs = cli.inputs.len(), "Blattwerk starting");

    match run(&cli) {
        Ok(report) if report.all_succeeded() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(err) => {
            error!(error = %err, "Cannot start batch");
            ExitCode::from(2)
        }
    }
}

/// Configuration file, then command-line overrides.
fn resolve_config(cli: &Cli) -> Result<DetectionConfig> {
    let mut config = match &cli.config {
        Some(path) => DetectionConfig::from_json_file(path)?,
        None => DetectionConfig::default(),
    };
    if let Some(paper) = cli.paper {
        if !cli.dpi.is_finite() || cli.dpi <= 0.0 {
            return Err(BlattwerkError::InvalidConfig(format!(
                "dpi must be positive, got {}",
                cli.dpi
            )));
        }
        config.target = TargetSize::for_paper(paper, cli.dpi);
        info!(
            ?paper,
            dpi = cli.dpi,
            width = config.target.width,
            height = config.target.height,
            "Target size from paper"
        );
    }
    config.validate()?;
    Ok(config)
}

fn run(cli: &Cli) -> Result<BatchReport> {
    let config = resolve_config(cli)?;
    if let Some(dir) = &cli.out_dir {
        std::fs::create_dir_all(dir)?;
    }
    let options = BatchOptions {
        out_dir: cli.out_dir.clone(),
        retry: RetryPolicy::new(cli.retries),
        timeout: cli.timeout_ms.map(Duration::from_millis),
    };

    let report = match cli.jobs {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| BlattwerkError::InvalidConfig(format!("worker pool: {e}")))?;
            pool.install(|| run_batch(&cli.inputs, &config, &options))
        }
        None => run_batch(&cli.inputs, &config, &options),
    };

    if let Some(path) = &cli.report {
        report.write_json(path)?;
        info!(path = %path.display(), "Report written");
    }
    Ok(report)
}
