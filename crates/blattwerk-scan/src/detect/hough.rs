// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Hough accumulator: (angle, distance) voting, greedy peak clustering and
// reduction of the candidate set to the four sheet sides.

use blattwerk_core::config::{ClusterWindow, HoughConfig};
use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::{AngleRange, HoughEdge};
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use super::preprocess::GradientMap;
use crate::cancel::CancelToken;

/// Number of strongest candidates kept before the parallel-pair heuristic.
const MAX_CANDIDATES: usize = 5;

/// Vote counts indexed by angle bucket and distance.
///
/// Cells are stored distance-major: `cells[distance * buckets + angle]`, so
/// iterating the slice visits the accumulator in raster order.
#[derive(Debug, Clone, PartialEq)]
pub struct HoughSpace {
    range: AngleRange,
    max_distance: usize,
    cells: Vec<u32>,
}

impl HoughSpace {
    /// Vote every pixel whose gradient magnitude exceeds `gradient_threshold`.
    ///
    /// Rows are voted in parallel into per-worker partial accumulators which
    /// are summed afterwards, so the result does not depend on scheduling.
    #[instrument(skip_all, fields(width = gradient.width(), height = gradient.height(), range = ?range))]
    pub fn vote(
        gradient: &GradientMap,
        gradient_threshold: f32,
        range: AngleRange,
        cancel: &CancelToken,
    ) -> Result<Self> {
        let (width, height) = (gradient.width() as f64, gradient.height() as f64);
        let max_distance = (width * width + height * height).sqrt() as usize;
        let buckets = range.buckets();
        let len = buckets * max_distance;

        // (cos, sin, storage bucket) per raw angle.
        let table: Vec<(f64, f64, usize)> = (0..buckets)
            .map(|degrees| {
                let theta = (degrees as f64).to_radians();
                (theta.cos(), theta.sin(), range.bucket_for(degrees))
            })
            .collect();

        let cells = (0..gradient.height())
            .into_par_iter()
            .try_fold(
                || vec![0u32; len],
                |mut acc, y| {
                    cancel.check()?;
                    for (x, &magnitude) in gradient.row(y).iter().enumerate() {
                        if magnitude <= gradient_threshold {
                            continue;
                        }
                        let (xf, yf) = (x as f64, y as f64);
                        for &(cos, sin, bucket) in &table {
                            let distance = (xf * cos + yf * sin).round();
                            if distance >= 0.0 && (distance as usize) < max_distance {
                                acc[distance as usize * buckets + bucket] += 1;
                            }
                        }
                    }
                    Ok::<_, BlattwerkError>(acc)
                },
            )
            .try_reduce(
                || vec![0u32; len],
                |mut total, partial| {
                    for (cell, votes) in total.iter_mut().zip(partial) {
                        *cell += votes;
                    }
                    Ok::<_, BlattwerkError>(total)
                },
            )?;

        let space = Self {
            range,
            max_distance,
            cells,
        };
        debug!(
            max_distance,
            max_votes = space.max_votes(),
            "Hough voting complete"
        );
        Ok(space)
    }

    /// Build a space from raw cells (distance-major).
    #[cfg(test)]
    pub(crate) fn from_cells(range: AngleRange, max_distance: usize, cells: Vec<u32>) -> Self {
        assert_eq!(cells.len(), range.buckets() * max_distance);
        Self {
            range,
            max_distance,
            cells,
        }
    }

    pub fn angle_range(&self) -> AngleRange {
        self.range
    }

    pub fn angle_buckets(&self) -> usize {
        self.range.buckets()
    }

    /// Exclusive upper bound of the distance axis (image diagonal).
    pub fn max_distance(&self) -> usize {
        self.max_distance
    }

    /// Votes in one cell.
    pub fn votes(&self, angle: usize, distance: usize) -> u32 {
        self.cells[distance * self.angle_buckets() + angle]
    }

    pub fn max_votes(&self) -> u32 {
        self.cells.iter().copied().max().unwrap_or(0)
    }

    /// Copy with every cell below `threshold` and the `distance == 0` row
    /// zeroed, for inspecting what peak extraction sees.
    pub fn thresholded(&self, threshold: u32) -> Self {
        let buckets = self.angle_buckets();
        let cells = self
            .cells
            .iter()
            .enumerate()
            .map(|(i, &votes)| {
                if i < buckets || votes < threshold {
                    0
                } else {
                    votes
                }
            })
            .collect();
        Self {
            range: self.range,
            max_distance: self.max_distance,
            cells,
        }
    }
}

/// Threshold the accumulator (`max_votes / Q` unless the legacy rule is
/// configured) and greedily cluster the surviving cells into edges, in raster
/// order.
///
/// The `distance == 0` row is never an edge. A cell inside the window of an
/// accepted edge joins that cluster and replaces its representative when it
/// has more votes.
#[instrument(skip_all, fields(peak_divisor = config.peak_divisor, rule = ?config.peak_threshold))]
pub fn extract_edges(space: &HoughSpace, config: &HoughConfig) -> Result<Vec<HoughEdge>> {
    let max_votes = space.max_votes();
    if max_votes == 0 {
        warn!("Accumulator is empty; no gradient-strong pixels voted");
        return Err(BlattwerkError::ThresholdTooStrict { found: 0 });
    }
    let threshold = config.min_peak_votes(max_votes);
    debug!(max_votes, threshold, "Peak threshold");

    let buckets = space.angle_buckets();
    let mut edges: Vec<HoughEdge> = Vec::new();
    for distance in 1..space.max_distance() {
        for angle in 0..buckets {
            let votes = space.votes(angle, distance);
            if votes == 0 || votes < threshold {
                continue;
            }
            merge_or_push(
                &mut edges,
                HoughEdge::new(angle, distance, votes),
                &config.cluster_window,
            );
        }
    }

    debug!(edges = edges.len(), "Peak clustering complete");
    Ok(edges)
}

fn merge_or_push(edges: &mut Vec<HoughEdge>, candidate: HoughEdge, window: &ClusterWindow) {
    let mut is_new = true;
    for edge in edges.iter_mut() {
        let d_angle = edge.angle as i64 - candidate.angle as i64;
        let d_distance = edge.distance as i64 - candidate.distance as i64;
        if window.contains(d_angle, d_distance) {
            is_new = false;
            if candidate.votes > edge.votes {
                *edge = candidate;
                break;
            }
        }
    }
    if is_new {
        edges.push(candidate);
    }
}

/// Reduce the clustered edges to exactly four sheet sides.
///
/// More than four candidates are cut to the strongest five; one of those is
/// removed by looking at which angles pair up as near-parallel sides.
pub fn select_document_edges(
    edges: &[HoughEdge],
    parallel_tolerance_deg: f64,
) -> Result<[HoughEdge; 4]> {
    let found = edges.len();
    if found < 4 {
        warn!(found, "Too few dominant edges");
        return Err(BlattwerkError::ThresholdTooStrict { found });
    }
    if found == 4 {
        return Ok([edges[0], edges[1], edges[2], edges[3]]);
    }

    let mut candidates = edges.to_vec();
    candidates.sort_by(|a, b| b.votes.cmp(&a.votes));
    candidates.truncate(MAX_CANDIDATES);
    candidates.sort_by_key(|edge| edge.angle);

    let removed = candidates.remove(spurious_edge(&candidates, parallel_tolerance_deg));
    info!(
        angle = removed.angle,
        distance = removed.distance,
        votes = removed.votes,
        "Discarded spurious edge"
    );

    <[HoughEdge; 4]>::try_from(candidates).map_err(|rest| {
        warn!(found, kept = rest.len(), "Edge set did not reduce to four");
        BlattwerkError::AmbiguousEdgeSet { candidates: found }
    })
}

/// Index of the edge to drop from five angle-sorted candidates.
///
/// Two consecutive gaps that differ by more than the tolerance mark a pair
/// of near-parallel sides; gaps within tolerance mean three neighbouring
/// lines are mutually near-parallel and the weakest of them goes.
fn spurious_edge(edges: &[HoughEdge], tolerance: f64) -> usize {
    let gap = |i: usize| (edges[i].angle as f64 - edges[i + 1].angle as f64).abs();
    let (g0, g1, g2, g3) = (gap(0), gap(1), gap(2), gap(3));

    let weakest_of_three = |first: usize| {
        let (a, b, c) = (
            edges[first].votes,
            edges[first + 1].votes,
            edges[first + 2].votes,
        );
        if a < b && a < c {
            first
        } else if b < c {
            first + 1
        } else {
            first + 2
        }
    };

    if (g0 - g1).abs() > tolerance {
        if g0 < g1 {
            // 0 and 1 pair up.
            if (g2 - g3).abs() > tolerance {
                if g2 < g3 { 4 } else { 2 }
            } else {
                weakest_of_three(2)
            }
        } else {
            // 1/2 and 3/4 pair up.
            0
        }
    } else {
        weakest_of_three(0)
    }
}

/// Accumulate and reduce to the four sheet sides in one call.
pub fn dominant_edges(
    gradient: &GradientMap,
    gradient_threshold: f32,
    config: &HoughConfig,
    cancel: &CancelToken,
) -> Result<[HoughEdge; 4]> {
    let space = HoughSpace::vote(gradient, gradient_threshold, config.angle_range, cancel)?;
    cancel.check()?;
    let edges = extract_edges(&space, config)?;
    select_document_edges(&edges, config.parallel_tolerance_deg)
}
