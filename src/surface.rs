//! Measured layout of the warp container
//!
//! The host layout reports where the container sits on screen and how large
//! the viewport is. Corners live in the container's local frame; pointer
//! events arrive in screen coordinates.

use serde::{Deserialize, Serialize};

use crate::corners::Point;
use crate::error::WarpError;

/// The container's bounding rectangle in screen coordinates
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct SurfaceRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl SurfaceRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Whether the host has laid the container out yet
    pub fn is_measured(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    pub fn same_size(&self, other: &SurfaceRect) -> bool {
        self.width == other.width && self.height == other.height
    }

    #[inline]
    pub fn to_local(&self, screen: Point) -> Point {
        screen.offset(-self.left, -self.top)
    }

    #[inline]
    pub fn to_screen(&self, local: Point) -> Point {
        local.offset(self.left, self.top)
    }
}

/// Visible screen area in pixels
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// A layout report from the host
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Measurement {
    pub rect: SurfaceRect,
    pub viewport: Viewport,
}

impl Measurement {
    /// Reject values no layout engine would produce
    pub fn validate(&self) -> Result<(), WarpError> {
        let r = &self.rect;
        let v = &self.viewport;
        let finite = [r.left, r.top, r.width, r.height, v.width, v.height]
            .iter()
            .all(|n| n.is_finite());
        if !finite || r.width < 0.0 || r.height < 0.0 || v.width < 0.0 || v.height < 0.0 {
            return Err(WarpError::InvalidMeasurement {
                width: r.width,
                height: r.height,
            });
        }
        Ok(())
    }
}

/// Region a dragged corner may occupy, in the container's local frame.
///
/// Covers the whole viewport, so corners may leave the container but not
/// the screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragBounds {
    pub min: Point,
    pub max: Point,
}

impl DragBounds {
    pub fn for_viewport(rect: &SurfaceRect, viewport: &Viewport) -> Self {
        Self {
            min: Point::new(-rect.left, -rect.top),
            max: Point::new(viewport.width - rect.left, viewport.height - rect.top),
        }
    }

    pub fn clamp(&self, p: Point) -> Point {
        // max/min rather than f64::clamp, which panics if min > max
        Point::new(
            self.min.x.max(self.max.x.min(p.x)),
            self.min.y.max(self.max.y.min(p.y)),
        )
    }
}

/// Aspect ratio (width / height) for a banner design.
///
/// Uses the SVG `view_box` ("minX minY width height") when its size is
/// positive, otherwise the design's physical dimensions.
pub fn aspect_ratio(view_box: &str, width: f64, height: f64) -> f64 {
    let parts: Vec<f64> = view_box
        .split_whitespace()
        .map(|s| s.parse().unwrap_or(0.0))
        .collect();
    let vb_width = parts.get(2).copied().unwrap_or(0.0);
    let vb_height = parts.get(3).copied().unwrap_or(0.0);

    if vb_width > 0.0 && vb_height > 0.0 {
        vb_width / vb_height
    } else {
        width / height
    }
}
