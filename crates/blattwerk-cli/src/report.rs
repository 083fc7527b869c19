// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch report: one entry per input image, written as JSON on request.

use std::path::{Path, PathBuf};

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::recovery::{FailureClass, classify_error, suggestion};
use blattwerk_core::types::OrderedCorners;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStatus {
    Ok,
    Failed,
}

/// Why an image failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Stable error name (`BlattwerkError::kind`).
    pub kind: String,
    pub message: String,
    pub class: FailureClass,
    pub suggestion: String,
}

impl From<&BlattwerkError> for ErrorReport {
    fn from(err: &BlattwerkError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
            class: classify_error(err),
            suggestion: suggestion(err).to_string(),
        }
    }
}

/// Outcome for one input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageReport {
    pub input: PathBuf,
    pub status: ImageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corners: Option<OrderedCorners>,
    /// Detection runs, including retries.
    pub attempts: u32,
    /// Files written for this input.
    pub outputs: Vec<PathBuf>,
    pub elapsed_ms: u64,
}

/// Results of a whole run, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub generated_at: DateTime<Utc>,
    pub images: Vec<ImageReport>,
}

impl BatchReport {
    pub fn new(images: Vec<ImageReport>) -> Self {
        Self {
            generated_at: Utc::now(),
            images,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.images
            .iter()
            .filter(|r| r.status == ImageStatus::Ok)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.images.len() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }

    /// Write the report as pretty-printed JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), "Batch report written");
        Ok(())
    }
}
