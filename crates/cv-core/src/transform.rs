//! Object transforms and the matrix math behind grouping.
//!
//! A transform places an object's unscaled local box (centred on the
//! origin) onto its parent's coordinate space:
//!
//! ```text
//! M = T(center) · R(angle) · S(scaleX · flipX, scaleY · flipY)
//! ```
//!
//! `left`/`top` address the object's top-left origin point, which is
//! where the box corner lands after rotation and scaling. Flips mirror
//! around the centre and never move it.

use kurbo::{Affine, Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Geometric transform of a drawable object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    pub left: f64,
    pub top: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Rotation in degrees, clockwise in screen space.
    pub angle: f64,
    pub flip_x: bool,
    pub flip_y: bool,
}

impl Default for Transform {
    fn default() -> Self {
        Self::at(0.0, 0.0)
    }
}

impl Transform {
    /// Identity transform with the origin at `(left, top)`.
    pub const fn at(left: f64, top: f64) -> Self {
        Self {
            left,
            top,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
            flip_x: false,
            flip_y: false,
        }
    }

    /// Size after scaling (the "effective size" shown in the properties panel).
    pub fn effective_size(&self, size: Size) -> Size {
        Size::new(size.width * self.scale_x, size.height * self.scale_y)
    }

    /// Offset from the top-left origin point to the centre.
    fn center_offset(&self, size: Size) -> Vec2 {
        let eff = self.effective_size(size);
        let half = Vec2::new(eff.width / 2.0, eff.height / 2.0);
        rotate_vec(half, self.angle)
    }

    /// Centre of the object in parent coordinates.
    pub fn center(&self, size: Size) -> Point {
        Point::new(self.left, self.top) + self.center_offset(size)
    }

    /// Move the object so its centre lands on `center`.
    pub fn set_center(&mut self, size: Size, center: Point) {
        let origin = center - self.center_offset(size);
        self.left = origin.x;
        self.top = origin.y;
    }

    /// Full local → parent matrix for an object of unscaled `size`.
    pub fn matrix(&self, size: Size) -> Affine {
        let sx = if self.flip_x { -self.scale_x } else { self.scale_x };
        let sy = if self.flip_y { -self.scale_y } else { self.scale_y };
        Affine::translate(self.center(size).to_vec2())
            * Affine::rotate(self.angle.to_radians())
            * Affine::scale_non_uniform(sx, sy)
    }

    /// Decompose a local → parent matrix back into a transform.
    ///
    /// Uses a QR decomposition: rotation comes from the first column,
    /// `scaleX` is its length, `scaleY` is `det / scaleX`. A negative
    /// determinant becomes `flipY`. Skew is discarded.
    pub fn from_matrix(m: Affine, size: Size) -> Self {
        let [a, b, c, d, e, f] = m.as_coeffs();
        let scale_x = a.hypot(b);
        let mut t = Self::at(0.0, 0.0);
        if scale_x <= f64::EPSILON {
            t.scale_x = 0.0;
            t.scale_y = 0.0;
            t.set_center(size, Point::new(e, f));
            return t;
        }
        let det = a * d - c * b;
        let scale_y = det / scale_x;
        t.angle = normalize_degrees(b.atan2(a).to_degrees());
        t.scale_x = scale_x;
        t.scale_y = scale_y.abs();
        t.flip_y = scale_y < 0.0;
        t.set_center(size, Point::new(e, f));
        t
    }
}

/// Rotate a vector by `degrees` (clockwise in screen space, y down).
pub fn rotate_vec(v: Vec2, degrees: f64) -> Vec2 {
    let (sin, cos) = degrees.to_radians().sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// Wrap an angle into `[0, 360)`.
pub fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs.
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Smallest absolute difference between two angles, in degrees.
pub fn angle_distance(a: f64, b: f64) -> f64 {
    let d = normalize_degrees(a - b);
    d.min(360.0 - d)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_point_eq(a: Point, b: Point) {
        assert!((a.x - b.x).abs() < 1e-6 && (a.y - b.y).abs() < 1e-6, "{a:?} != {b:?}");
    }

    #[test]
    fn center_of_unrotated_box() {
        let t = Transform::at(10.0, 20.0);
        assert_point_eq(t.center(Size::new(100.0, 50.0)), Point::new(60.0, 45.0));
    }

    #[test]
    fn center_rotates_around_origin_point() {
        let mut t = Transform::at(0.0, 0.0);
        t.angle = 90.0;
        // Box extends down-left of the origin once rotated 90° clockwise.
        assert_point_eq(t.center(Size::new(100.0, 50.0)), Point::new(-25.0, 50.0));
    }

    #[test]
    fn set_center_is_inverse_of_center() {
        let size = Size::new(40.0, 30.0);
        let mut t = Transform::at(3.0, 4.0);
        t.angle = 33.0;
        t.scale_x = 2.0;
        t.scale_y = 0.5;
        t.set_center(size, Point::new(100.0, 200.0));
        assert_point_eq(t.center(size), Point::new(100.0, 200.0));
    }

    #[test]
    fn matrix_maps_local_origin_to_center() {
        let size = Size::new(80.0, 60.0);
        let mut t = Transform::at(5.0, 7.0);
        t.angle = 120.0;
        t.scale_x = 1.5;
        assert_point_eq(t.matrix(size) * Point::ZERO, t.center(size));
    }

    #[test]
    fn decompose_roundtrip() {
        let size = Size::new(80.0, 60.0);
        let mut t = Transform::at(12.0, -4.0);
        t.angle = 210.0;
        t.scale_x = 1.25;
        t.scale_y = 0.75;
        let back = Transform::from_matrix(t.matrix(size), size);
        assert!(angle_distance(back.angle, t.angle) < EPS);
        assert!((back.scale_x - t.scale_x).abs() < EPS);
        assert!((back.scale_y - t.scale_y).abs() < EPS);
        assert!(!back.flip_x && !back.flip_y);
        assert!((back.left - t.left).abs() < 1e-6);
        assert!((back.top - t.top).abs() < 1e-6);
    }

    #[test]
    fn decompose_flip_is_visually_equivalent() {
        let size = Size::new(10.0, 20.0);
        let mut t = Transform::at(0.0, 0.0);
        t.flip_x = true;
        t.angle = 30.0;
        let m = t.matrix(size);
        let back = Transform::from_matrix(m, size);
        let probe = Point::new(3.0, -7.0);
        assert_point_eq(back.matrix(size) * probe, m * probe);
    }

    #[test]
    fn normalize_wraps_negative_angles() {
        assert!((normalize_degrees(-90.0) - 270.0).abs() < EPS);
        assert!((normalize_degrees(720.0)).abs() < EPS);
        assert!((angle_distance(359.0, 1.0) - 2.0).abs() < EPS);
    }
}
