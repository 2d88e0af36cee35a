//! Perspective transformation for the warped banner
//!
//! This module computes the projective (homography) transform that maps the
//! banner's source rectangle onto four arbitrarily placed corners, embedded in
//! a 4x4 column-major matrix that a CSS `matrix3d()` transform can consume.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::corners::{CornerPoints, Point};

/// Below this the quad is treated as degenerate
const DEGENERATE_EPSILON: f64 = 1e-10;

/// A 4x4 transform stored in column-major order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix3d(pub [f64; 16]);

impl Matrix3d {
    pub const IDENTITY: Matrix3d = Matrix3d([
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]);

    pub fn as_array(&self) -> &[f64; 16] {
        &self.0
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Map a point in the source rectangle's pixel frame through the
    /// transform, including the perspective divide
    #[inline]
    pub fn transform_point(&self, p: Point) -> Point {
        let m = &self.0;
        let w = m[3] * p.x + m[7] * p.y + m[15];
        if w.abs() < DEGENERATE_EPSILON {
            return p; // Avoid division by zero
        }
        Point::new(
            (m[0] * p.x + m[4] * p.y + m[12]) / w,
            (m[1] * p.x + m[5] * p.y + m[13]) / w,
        )
    }
}

impl Default for Matrix3d {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Formats as a CSS transform value, e.g. `matrix3d(1,0,0,0,...)`
impl fmt::Display for Matrix3d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("matrix3d(")?;
        for (i, v) in self.as_array().iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            // Normalize negative zero so the output reads like the identity
            let v = if *v == 0.0 { 0.0 } else { *v };
            write!(f, "{}", v)?;
        }
        f.write_str(")")
    }
}

/// Compute the transform that maps the source rectangle
/// (0,0), (w,0), (w,h), (0,h) onto `dst` top-left, top-right, bottom-right
/// and bottom-left respectively.
///
/// The homography is solved from the unit square (Heckbert's square-to-quad
/// derivation) and then pre-scaled by 1/w, 1/h so the result operates on
/// source pixel coordinates. A degenerate quad (any three corners collinear,
/// or zero area) yields [`Matrix3d::IDENTITY`].
///
/// `src_width` and `src_height` must be non-zero.
pub fn compute_projective_transform(src_width: f64, src_height: f64, dst: &CornerPoints) -> Matrix3d {
    let (u0, v0) = (dst.top_left.x, dst.top_left.y);
    let (u1, v1) = (dst.top_right.x, dst.top_right.y);
    let (u2, v2) = (dst.bottom_right.x, dst.bottom_right.y);
    let (u3, v3) = (dst.bottom_left.x, dst.bottom_left.y);

    // Difference vectors between adjacent destination corners
    let du1 = u1 - u2;
    let du2 = u3 - u2;
    let du3 = u0 - u1 + u2 - u3;
    let dv1 = v1 - v2;
    let dv2 = v3 - v2;
    let dv3 = v0 - v1 + v2 - v3;

    let det = du1 * dv2 - dv1 * du2;
    if det.abs() < DEGENERATE_EPSILON || has_collinear_corners(dst) {
        return Matrix3d::IDENTITY;
    }

    // Perspective coefficients
    let g = (du3 * dv2 - dv3 * du2) / det;
    let h = (du1 * dv3 - dv1 * du3) / det;

    // Affine coefficients
    let a = u1 - u0 + g * u1;
    let b = u3 - u0 + h * u3;
    let c = u0;
    let d = v1 - v0 + g * v1;
    let e = v3 - v0 + h * v3;
    let f = v0;

    // Normalize the source rectangle to the unit square
    let sx = 1.0 / src_width;
    let sy = 1.0 / src_height;

    Matrix3d([
        a * sx, d * sx, 0.0, g * sx, //
        b * sy, e * sy, 0.0, h * sy, //
        0.0, 0.0, 1.0, 0.0, //
        c, f, 0.0, 1.0,
    ])
}

/// Compute the transform and return it ready for the rendering surface
pub fn matrix3d_from_corners(width: f64, height: f64, corners: &CornerPoints) -> Matrix3d {
    compute_projective_transform(width, height, corners)
}

/// True if any three of the four corners lie on one line
fn has_collinear_corners(q: &CornerPoints) -> bool {
    let [p0, p1, p2, p3] = q.outline();
    [(p0, p1, p2), (p1, p2, p3), (p2, p3, p0), (p3, p0, p1)]
        .into_iter()
        .any(|(a, b, c)| cross(b.sub(a), c.sub(a)).abs() < DEGENERATE_EPSILON)
}

#[inline]
fn cross(a: Point, b: Point) -> f64 {
    a.x * b.y - a.y * b.x
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corners::default_corners;

    fn quad(tl: (f64, f64), tr: (f64, f64), bl: (f64, f64), br: (f64, f64)) -> CornerPoints {
        CornerPoints {
            top_left: Point::new(tl.0, tl.1),
            top_right: Point::new(tr.0, tr.1),
            bottom_left: Point::new(bl.0, bl.1),
            bottom_right: Point::new(br.0, br.1),
        }
    }

    fn assert_maps_to(m: &Matrix3d, from: Point, to: Point) {
        let p = m.transform_point(from);
        let scale = to.x.abs().max(to.y.abs()).max(1.0);
        assert!(
            (p.x - to.x).abs() / scale < 1e-6 && (p.y - to.y).abs() / scale < 1e-6,
            "{from:?} mapped to {p:?}, expected {to:?}"
        );
    }

    fn assert_round_trip(w: f64, h: f64, dst: &CornerPoints) {
        let m = compute_projective_transform(w, h, dst);
        assert!(!m.is_identity() || *dst == default_corners(w, h));
        assert_maps_to(&m, Point::new(0.0, 0.0), dst.top_left);
        assert_maps_to(&m, Point::new(w, 0.0), dst.top_right);
        assert_maps_to(&m, Point::new(w, h), dst.bottom_right);
        assert_maps_to(&m, Point::new(0.0, h), dst.bottom_left);
    }

    #[test]
    fn test_default_corners_give_identity() {
        for &(w, h) in &[(1.0, 1.0), (100.0, 50.0), (2560.0, 314.0), (0.5, 1234.5)] {
            let m = compute_projective_transform(w, h, &default_corners(w, h));
            for (got, want) in m.as_array().iter().zip(Matrix3d::IDENTITY.as_array()) {
                assert!((got - want).abs() < 1e-9, "{w}x{h}: {m:?}");
            }
        }
    }

    #[test]
    fn test_uniform_scale() {
        let dst = quad((0.0, 0.0), (200.0, 0.0), (0.0, 100.0), (200.0, 100.0));
        let m = compute_projective_transform(100.0, 50.0, &dst);
        assert_maps_to(&m, Point::new(100.0, 50.0), Point::new(200.0, 100.0));
        assert_maps_to(&m, Point::new(50.0, 25.0), Point::new(100.0, 50.0));
    }

    #[test]
    fn test_corner_round_trip() {
        assert_round_trip(
            100.0,
            50.0,
            &quad((10.0, 5.0), (220.0, -30.0), (-15.0, 90.0), (180.0, 140.0)),
        );
        assert_round_trip(
            640.0,
            78.0,
            &quad((40.0, 60.0), (600.0, 10.0), (55.0, 120.0), (610.0, 200.0)),
        );
        // Corners well outside the container
        assert_round_trip(
            300.0,
            300.0,
            &quad((-400.0, -250.0), (900.0, -100.0), (-350.0, 700.0), (1000.0, 800.0)),
        );
    }

    #[test]
    fn test_affine_quad_has_no_perspective_terms() {
        // A parallelogram is an affine image of the rectangle
        let dst = quad((10.0, 10.0), (110.0, 30.0), (30.0, 60.0), (130.0, 80.0));
        let m = compute_projective_transform(100.0, 50.0, &dst);
        assert!(m.0[3].abs() < 1e-12);
        assert!(m.0[7].abs() < 1e-12);
        assert_round_trip(100.0, 50.0, &dst);
    }

    #[test]
    fn test_z_axis_left_untouched() {
        let dst = quad((5.0, 0.0), (90.0, 12.0), (0.0, 70.0), (100.0, 60.0));
        let m = compute_projective_transform(100.0, 60.0, &dst);
        assert_eq!(m.0[2], 0.0);
        assert_eq!(m.0[6], 0.0);
        assert_eq!(m.0[10], 1.0);
        assert_eq!(m.0[14], 0.0);
        assert_eq!(m.0[8], 0.0);
        assert_eq!(m.0[9], 0.0);
        assert_eq!(m.0[11], 0.0);
        assert_eq!(m.0[15], 1.0);
    }

    #[test]
    fn test_collinear_right_side_is_identity() {
        // top-right, bottom-right and bottom-left on one line
        let dst = quad((0.0, 0.0), (100.0, 0.0), (0.0, 100.0), (50.0, 50.0));
        let m = compute_projective_transform(100.0, 100.0, &dst);
        assert_eq!(
            m.0,
            [1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0]
        );
    }

    #[test]
    fn test_collinear_top_edge_is_identity() {
        // top-left, top-right and bottom-right on one line
        let dst = quad((0.0, 0.0), (100.0, 0.0), (0.0, 80.0), (200.0, 0.0));
        assert!(compute_projective_transform(100.0, 80.0, &dst).is_identity());
    }

    #[test]
    fn test_collapsed_quad_is_identity() {
        let p = (42.0, 17.0);
        assert!(compute_projective_transform(100.0, 50.0, &quad(p, p, p, p)).is_identity());

        let flat = quad((0.0, 0.0), (100.0, 0.0), (25.0, 0.0), (75.0, 0.0));
        assert!(compute_projective_transform(100.0, 50.0, &flat).is_identity());
    }

    #[test]
    fn test_self_intersecting_quad_is_finite() {
        // Bow-tie: bottom corners swapped
        let dst = quad((0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0));
        let m = compute_projective_transform(100.0, 100.0, &dst);
        assert!(m.0.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_css_formatting() {
        assert_eq!(
            Matrix3d::IDENTITY.to_string(),
            "matrix3d(1,0,0,0,0,1,0,0,0,0,1,0,0,0,0,1)"
        );

        let dst = quad((0.0, 0.0), (200.0, 0.0), (0.0, 100.0), (200.0, 100.0));
        let css = matrix3d_from_corners(100.0, 50.0, &dst).to_string();
        assert_eq!(css, "matrix3d(2,0,0,0,0,2,0,0,0,0,1,0,0,0,0,1)");
    }

    #[test]
    fn test_translation() {
        let dst = default_corners(80.0, 40.0).map(|p| p.offset(15.0, -5.0));
        let m = matrix3d_from_corners(80.0, 40.0, &dst);
        assert!((m.0[12] - 15.0).abs() < 1e-12);
        assert!((m.0[13] + 5.0).abs() < 1e-12);
        assert_maps_to(&m, Point::new(40.0, 20.0), Point::new(55.0, 15.0));
    }
}
