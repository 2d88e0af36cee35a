//! Corner geometry for the warped banner
//!
//! A warp is described by the four destination corners of the banner's
//! source rectangle. Coordinates are pixels in the container's local frame
//! unless a conversion below says otherwise.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 2D point in pixels
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    #[inline]
    pub fn sub(self, other: Point) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }

    /// Squared distance to another point
    #[inline]
    pub fn distance_sq(self, other: Point) -> f64 {
        let d = self.sub(other);
        d.x * d.x + d.y * d.y
    }
}

/// Identifies one of the four corners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CornerKey {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl CornerKey {
    pub const ALL: [CornerKey; 4] = [
        CornerKey::TopLeft,
        CornerKey::TopRight,
        CornerKey::BottomLeft,
        CornerKey::BottomRight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CornerKey::TopLeft => "topLeft",
            CornerKey::TopRight => "topRight",
            CornerKey::BottomLeft => "bottomLeft",
            CornerKey::BottomRight => "bottomRight",
        }
    }
}

impl fmt::Display for CornerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four destination corners of a quadrilateral.
///
/// No ordering or convexity is enforced; self-intersecting and degenerate
/// quads are valid values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CornerPoints {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_left: Point,
    pub bottom_right: Point,
}

impl CornerPoints {
    pub fn get(&self, key: CornerKey) -> Point {
        match key {
            CornerKey::TopLeft => self.top_left,
            CornerKey::TopRight => self.top_right,
            CornerKey::BottomLeft => self.bottom_left,
            CornerKey::BottomRight => self.bottom_right,
        }
    }

    /// Copy with a single corner replaced
    pub fn with(mut self, key: CornerKey, point: Point) -> Self {
        match key {
            CornerKey::TopLeft => self.top_left = point,
            CornerKey::TopRight => self.top_right = point,
            CornerKey::BottomLeft => self.bottom_left = point,
            CornerKey::BottomRight => self.bottom_right = point,
        }
        self
    }

    /// Apply `f` to every corner
    pub fn map(&self, f: impl Fn(Point) -> Point) -> Self {
        Self {
            top_left: f(self.top_left),
            top_right: f(self.top_right),
            bottom_left: f(self.bottom_left),
            bottom_right: f(self.bottom_right),
        }
    }

    /// Corners in outline order: TL, TR, BR, BL
    pub fn outline(&self) -> [Point; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }
}

/// Move one corner to a new position, leaving the other three untouched.
///
/// Mouse and touch drags both commit through this function.
pub fn apply_drag(corners: &CornerPoints, key: CornerKey, point: Point) -> CornerPoints {
    corners.with(key, point)
}

/// Corners of the untransformed `width` x `height` rectangle
pub fn default_corners(width: f64, height: f64) -> CornerPoints {
    CornerPoints {
        top_left: Point::new(0.0, 0.0),
        top_right: Point::new(width, 0.0),
        bottom_left: Point::new(0.0, height),
        bottom_right: Point::new(width, height),
    }
}

/// Re-express corners around the rectangle's center
pub fn corners_to_relative(corners: &CornerPoints, width: f64, height: f64) -> CornerPoints {
    let (cx, cy) = (width / 2.0, height / 2.0);
    corners.map(|p| p.offset(-cx, -cy))
}

/// Inverse of [`corners_to_relative`]
pub fn corners_from_relative(corners: &CornerPoints, width: f64, height: f64) -> CornerPoints {
    let (cx, cy) = (width / 2.0, height / 2.0);
    corners.map(|p| p.offset(cx, cy))
}

/// Express corners as percentages of the rectangle's width and height
pub fn corners_to_percent(corners: &CornerPoints, width: f64, height: f64) -> CornerPoints {
    corners.map(|p| Point::new(p.x / width * 100.0, p.y / height * 100.0))
}

/// Inverse of [`corners_to_percent`]
pub fn corners_from_percent(corners: &CornerPoints, width: f64, height: f64) -> CornerPoints {
    corners.map(|p| Point::new(p.x * width / 100.0, p.y * height / 100.0))
}
