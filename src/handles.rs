//! Corner handle and guide-line state for the UI

use serde::Serialize;

use crate::corners::{CornerKey, CornerPoints, Point};
use crate::surface::SurfaceRect;

impl CornerKey {
    pub fn label(&self) -> &'static str {
        match self {
            CornerKey::TopLeft => "Top Left",
            CornerKey::TopRight => "Top Right",
            CornerKey::BottomLeft => "Bottom Left",
            CornerKey::BottomRight => "Bottom Right",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            CornerKey::TopLeft => "↖",
            CornerKey::TopRight => "↗",
            CornerKey::BottomLeft => "↙",
            CornerKey::BottomRight => "↘",
        }
    }

    /// CSS cursor shown over the handle
    pub fn cursor(&self) -> &'static str {
        match self {
            CornerKey::TopLeft => "nw-resize",
            CornerKey::TopRight => "ne-resize",
            CornerKey::BottomLeft => "sw-resize",
            CornerKey::BottomRight => "se-resize",
        }
    }
}

/// A draggable corner handle, positioned in screen coordinates
#[derive(Debug, Clone, Serialize)]
pub struct CornerHandle {
    pub corner: CornerKey,
    pub label: &'static str,
    pub icon: &'static str,
    pub cursor: &'static str,
    /// Center of the handle (the corner itself)
    pub x: f64,
    pub y: f64,
    /// Top-left of the handle box
    pub left: f64,
    pub top: f64,
    pub size: f64,
    pub active: bool,
}

/// Build the four handles for the current corners
pub fn corner_handles(
    corners: &CornerPoints,
    rect: &SurfaceRect,
    size: f64,
    active: Option<CornerKey>,
) -> Vec<CornerHandle> {
    CornerKey::ALL
        .iter()
        .map(|&corner| {
            let center = rect.to_screen(corners.get(corner));
            CornerHandle {
                corner,
                label: corner.label(),
                icon: corner.icon(),
                cursor: corner.cursor(),
                x: center.x,
                y: center.y,
                left: center.x - size / 2.0,
                top: center.y - size / 2.0,
                size,
                active: active == Some(corner),
            }
        })
        .collect()
}

/// Find the handle under a screen-space press.
///
/// Each handle owns a `hit_area` square centered on its corner; where
/// squares overlap the nearest corner wins.
pub fn hit_test(
    corners: &CornerPoints,
    rect: &SurfaceRect,
    screen: Point,
    hit_area: f64,
) -> Option<CornerKey> {
    let half = hit_area / 2.0;
    let local = rect.to_local(screen);

    CornerKey::ALL
        .into_iter()
        .filter(|&key| {
            let c = corners.get(key);
            (local.x - c.x).abs() <= half && (local.y - c.y).abs() <= half
        })
        .min_by(|&a, &b| {
            let da = local.distance_sq(corners.get(a));
            let db = local.distance_sq(corners.get(b));
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })
}

/// Dashed outline and diagonals drawn over the warped banner
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GuideLines {
    /// TL, TR, BR, BL in screen coordinates
    pub outline: [Point; 4],
    pub diagonals: [[Point; 2]; 2],
}

pub fn guide_lines(corners: &CornerPoints, rect: &SurfaceRect) -> GuideLines {
    let [tl, tr, br, bl] = corners.outline().map(|p| rect.to_screen(p));
    GuideLines {
        outline: [tl, tr, br, bl],
        diagonals: [[tl, br], [tr, bl]],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corners::default_corners;

    #[test]
    fn test_handle_positions() {
        let rect = SurfaceRect::new(10.0, 20.0, 300.0, 100.0);
        let handles = corner_handles(&default_corners(300.0, 100.0), &rect, 32.0, None);
        assert_eq!(handles.len(), 4);

        let tr = &handles[1];
        assert_eq!(tr.corner, CornerKey::TopRight);
        assert_eq!(tr.label, "Top Right");
        assert_eq!((tr.x, tr.y), (310.0, 20.0));
        assert_eq!((tr.left, tr.top), (294.0, 4.0));
        assert!(handles.iter().all(|h| !h.active));
    }

    #[test]
    fn test_active_handle() {
        let rect = SurfaceRect::new(0.0, 0.0, 100.0, 100.0);
        let handles = corner_handles(
            &default_corners(100.0, 100.0),
            &rect,
            32.0,
            Some(CornerKey::BottomLeft),
        );
        let active: Vec<_> = handles.iter().filter(|h| h.active).map(|h| h.corner).collect();
        assert_eq!(active, vec![CornerKey::BottomLeft]);
    }

    #[test]
    fn test_hit_test() {
        let rect = SurfaceRect::new(10.0, 10.0, 200.0, 100.0);
        let corners = default_corners(200.0, 100.0);

        assert_eq!(
            hit_test(&corners, &rect, Point::new(210.0, 10.0), 44.0),
            Some(CornerKey::TopRight)
        );
        assert_eq!(
            hit_test(&corners, &rect, Point::new(30.0, 128.0), 44.0),
            Some(CornerKey::BottomLeft)
        );
        assert_eq!(hit_test(&corners, &rect, Point::new(110.0, 60.0), 44.0), None);
    }

    #[test]
    fn test_hit_test_prefers_nearest() {
        let rect = SurfaceRect::new(0.0, 0.0, 30.0, 30.0);
        let corners = default_corners(30.0, 30.0);
        assert_eq!(
            hit_test(&corners, &rect, Point::new(18.0, 4.0), 44.0),
            Some(CornerKey::TopRight)
        );
    }

    #[test]
    fn test_guide_lines() {
        let rect = SurfaceRect::new(5.0, 5.0, 100.0, 50.0);
        let guides = guide_lines(&default_corners(100.0, 50.0), &rect);
        assert_eq!(guides.outline[2], Point::new(105.0, 55.0));
        assert_eq!(guides.diagonals[1], [Point::new(105.0, 5.0), Point::new(5.0, 55.0)]);
    }
}
