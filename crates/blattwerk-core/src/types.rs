// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core geometry types for the Blattwerk sheet detector.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pixel coordinate. Once accepted as a corner it lies inside the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared distance from the image origin (top-left).
    pub fn origin_distance_sq(&self) -> i64 {
        let (x, y) = (self.x as i64, self.y as i64);
        x * x + y * y
    }

    /// Clamp into `[0, width) x [0, height)`.
    pub fn clamped(self, width: u32, height: u32) -> Self {
        Self {
            x: self.x.clamp(0, width.saturating_sub(1) as i32),
            y: self.y.clamp(0, height.saturating_sub(1) as i32),
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Parametrization of the accumulator's angle axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleRange {
    /// 360 one-degree buckets; votes are stored rotated by 180 degrees so a
    /// near-vertical edge keeps its votes in one contiguous band.
    #[default]
    Full,
    /// 180 one-degree buckets, no rotation.
    Half,
}

impl AngleRange {
    /// Number of angle buckets.
    pub fn buckets(self) -> usize {
        match self {
            Self::Full => 360,
            Self::Half => 180,
        }
    }

    /// Rotation applied at vote time, in buckets.
    pub fn offset(self) -> usize {
        match self {
            Self::Full => 180,
            Self::Half => 0,
        }
    }

    /// Bucket that stores votes for the raw angle `degrees`.
    pub fn bucket_for(self, degrees: usize) -> usize {
        (degrees + self.offset()) % self.buckets()
    }

    /// Line angle in degrees represented by `bucket` (offset undone).
    pub fn degrees(self, bucket: usize) -> i32 {
        bucket as i32 - self.offset() as i32
    }
}

/// A dominant line candidate in Hough space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoughEdge {
    /// Angle bucket index (still carrying the vote-time rotation).
    pub angle: usize,
    /// Perpendicular distance from the origin, in pixels.
    pub distance: usize,
    pub votes: u32,
}

impl HoughEdge {
    pub const fn new(angle: usize, distance: usize, votes: u32) -> Self {
        Self {
            angle,
            distance,
            votes,
        }
    }
}

/// A document side in Cartesian form, with up to two attached endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub slope: f64,
    pub intercept: f64,
    pub is_vertical: bool,
    /// `x` of a vertical line.
    pub vertical_offset: i32,
    endpoints: [Point; 2],
    endpoint_count: usize,
}

impl Line {
    /// Non-vertical line `y = slope * x + intercept`.
    pub fn sloped(slope: f64, intercept: f64) -> Self {
        Self {
            slope,
            intercept,
            is_vertical: false,
            vertical_offset: 0,
            endpoints: [Point::default(); 2],
            endpoint_count: 0,
        }
    }

    /// Vertical line `x = offset`.
    pub fn vertical(offset: i32) -> Self {
        Self {
            slope: 0.0,
            intercept: 0.0,
            is_vertical: true,
            vertical_offset: offset,
            endpoints: [Point::default(); 2],
            endpoint_count: 0,
        }
    }

    /// Endpoints attached so far (0, 1 or 2).
    pub fn endpoints(&self) -> &[Point] {
        &self.endpoints[..self.endpoint_count]
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoint_count
    }

    pub fn has_both_endpoints(&self) -> bool {
        self.endpoint_count >= 2
    }

    /// Attach the next endpoint. Returns `false` once both ends are set.
    pub fn attach_endpoint(&mut self, point: Point) -> bool {
        if self.has_both_endpoints() {
            return false;
        }
        self.endpoints[self.endpoint_count] = point;
        self.endpoint_count += 1;
        true
    }

    /// `y` at `x`, or `None` for a vertical line.
    pub fn y_at(&self, x: f64) -> Option<f64> {
        if self.is_vertical {
            None
        } else {
            Some(self.slope * x + self.intercept)
        }
    }

    /// Whether the two lines can never meet.
    pub fn is_parallel_to(&self, other: &Line) -> bool {
        match (self.is_vertical, other.is_vertical) {
            (true, true) => true,
            (false, false) => (self.slope - other.slope).abs() < 1e-12,
            _ => false,
        }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_vertical {
            write!(f, "x = {}", self.vertical_offset)
        } else {
            let op = if self.intercept >= 0.0 { '+' } else { '-' };
            write!(f, "y = {:.4}x {} {:.2}", self.slope, op, self.intercept.abs())
        }
    }
}

/// Semantic role of a sheet corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CornerRole {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl CornerRole {
    /// All roles in labelling order.
    pub const ALL: [CornerRole; 4] = [
        Self::TopLeft,
        Self::TopRight,
        Self::BottomLeft,
        Self::BottomRight,
    ];

    /// Unit step pointing from this corner into the sheet.
    pub fn inward(self) -> (i32, i32) {
        match self {
            Self::TopLeft => (1, 1),
            Self::TopRight => (-1, 1),
            Self::BottomLeft => (1, -1),
            Self::BottomRight => (-1, -1),
        }
    }
}

/// The four sheet corners labelled in document space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedCorners {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_left: Point,
    pub bottom_right: Point,
}

impl OrderedCorners {
    /// Build from `[top_left, top_right, bottom_left, bottom_right]`.
    pub fn from_array(points: [Point; 4]) -> Self {
        let [top_left, top_right, bottom_left, bottom_right] = points;
        Self {
            top_left,
            top_right,
            bottom_left,
            bottom_right,
        }
    }

    /// `[top_left, top_right, bottom_left, bottom_right]`.
    pub fn to_array(&self) -> [Point; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_left,
            self.bottom_right,
        ]
    }

    pub fn get(&self, role: CornerRole) -> Point {
        match role {
            CornerRole::TopLeft => self.top_left,
            CornerRole::TopRight => self.top_right,
            CornerRole::BottomLeft => self.bottom_left,
            CornerRole::BottomRight => self.bottom_right,
        }
    }

    pub fn set(&mut self, role: CornerRole, point: Point) {
        match role {
            CornerRole::TopLeft => self.top_left = point,
            CornerRole::TopRight => self.top_right = point,
            CornerRole::BottomLeft => self.bottom_left = point,
            CornerRole::BottomRight => self.bottom_right = point,
        }
    }

    /// Mirror left and right (TL <-> TR, BL <-> BR).
    pub fn mirrored(self) -> Self {
        Self {
            top_left: self.top_right,
            top_right: self.top_left,
            bottom_left: self.bottom_right,
            bottom_right: self.bottom_left,
        }
    }
}

/// Standard paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Custom { width_mm: u32, height_mm: u32 },
}

impl PaperSize {
    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A3 => (297, 420),
            Self::A5 => (148, 210),
            Self::Letter => (216, 279),
            Self::Legal => (216, 356),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }
}

impl FromStr for PaperSize {
    type Err = String;

    /// Accepts `a3`, `a4`, `a5`, `letter`, `legal` or `<w>x<h>` in millimetres.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "a4" => return Ok(Self::A4),
            "a3" => return Ok(Self::A3),
            "a5" => return Ok(Self::A5),
            "letter" => return Ok(Self::Letter),
            "legal" => return Ok(Self::Legal),
            _ => {}
        }
        let (w, h) = normalized
            .split_once('x')
            .ok_or_else(|| format!("unknown paper size: '{s}' (expected a3, a4, a5, letter, legal or WxH in mm)"))?;
        let width_mm: u32 = w
            .trim()
            .parse()
            .map_err(|_| format!("invalid paper width in '{s}'"))?;
        let height_mm: u32 = h
            .trim()
            .parse()
            .map_err(|_| format!("invalid paper height in '{s}'"))?;
        if width_mm == 0 || height_mm == 0 {
            return Err(format!("paper dimensions must be non-zero: '{s}'"));
        }
        Ok(Self::Custom {
            width_mm,
            height_mm,
        })
    }
}

/// Size of the rectified output image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Pixel size of `paper` rendered at `dpi`.
    pub fn for_paper(paper: PaperSize, dpi: f32) -> Self {
        let (w_mm, h_mm) = paper.dimensions_mm();
        Self {
            width: (w_mm as f32 * dpi / 25.4).round().max(1.0) as u32,
            height: (h_mm as f32 * dpi / 25.4).round().max(1.0) as u32,
        }
    }
}

impl Default for TargetSize {
    /// 410 x 594, an A4-like sheet at roughly 50 DPI.
    fn default() -> Self {
        Self::new(410, 594)
    }
}
