//! Types, aliases and helper operations for doing math with `ultraviolet`.
//!
//! All simulation math is in raster screen space: x grows right, y grows
//! down, and gravity is an acceleration in positive y.
use std::f64::consts::{PI, TAU};
pub use ultraviolet as uv;

pub type Vec2 = uv::DVec2;

/// A wrapper type to indicate a vector should always be normalized.
#[derive(Clone, Copy, Debug)]
pub struct Unit<T>(T);

impl Unit<Vec2> {
    pub fn new_normalize(v: Vec2) -> Self {
        Unit(v.normalized())
    }

    pub const fn new_unchecked(v: Vec2) -> Self {
        Unit(v)
    }

    pub fn unit_x() -> Self {
        Unit(Vec2::unit_x())
    }

    pub fn unit_y() -> Self {
        Unit(Vec2::unit_y())
    }
}

impl<T> std::ops::Deref for Unit<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> std::ops::Neg for Unit<T>
where
    T: std::ops::Neg,
{
    type Output = Unit<<T as std::ops::Neg>::Output>;

    fn neg(self) -> Self::Output {
        Unit(-self.0)
    }
}

// Vec2 utils

#[inline]
pub fn left_normal(v: Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}

#[inline]
pub fn right_normal(v: Vec2) -> Vec2 {
    Vec2::new(v.y, -v.x)
}

/// Perpendicular dot product, the 2D stand-in for a cross product.
///
/// Sign convention follows screen space: `perp_dot(v, right_normal(v))`
/// is positive.
#[inline]
pub fn perp_dot(a: Vec2, b: Vec2) -> f64 {
    b.x * a.y - b.y * a.x
}

/// Rotate a vector by an angle in radians.
/// Positive angles turn counterclockwise as seen on screen.
#[inline]
pub fn rotate(v: Vec2, angle: f64) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    Vec2::new(cos * v.x + sin * v.y, cos * v.y - sin * v.x)
}

const ANGLE_WRAP_EPS: f64 = 1e-6;

/// Wrap an angle into `(-π, π]`.
///
/// The epsilon keeps a value sitting exactly on ±π from flapping between
/// its two equivalent representations across steps.
pub fn wrap_angle(mut angle: f64) -> f64 {
    // a runaway spin reduces in one step instead of one turn at a time
    if angle.abs() > PI + TAU {
        angle %= TAU;
    }
    if angle > PI + ANGLE_WRAP_EPS {
        angle -= TAU;
    } else if angle < -PI - ANGLE_WRAP_EPS {
        angle += TAU;
    }
    angle
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotate_quarter_turns() {
        let v = Vec2::new(1.0, 0.0);
        // counterclockwise on screen means y decreases first
        let up = rotate(v, PI / 2.0);
        assert!(up.x.abs() < 1e-12 && (up.y + 1.0).abs() < 1e-12);
        let back = rotate(up, -PI / 2.0);
        assert!((back - v).mag() < 1e-12);
    }

    #[test]
    fn perp_dot_sign() {
        let v = Vec2::new(3.0, 1.0);
        assert!(perp_dot(v, right_normal(v)) > 0.0);
        assert!(perp_dot(v, left_normal(v)) < 0.0);
        assert_eq!(perp_dot(v, v * 2.0), 0.0);
    }

    #[test]
    fn wrap_angle_range() {
        assert!((wrap_angle(3.0 * PI) - PI).abs() < 1e-9);
        assert!((wrap_angle(-3.0 * PI) + PI).abs() < 1e-5);
        assert_eq!(wrap_angle(0.5), 0.5);
        // exactly π stays put
        assert_eq!(wrap_angle(PI), PI);
    }

    #[test]
    fn wrap_angle_handles_runaway_spins() {
        let huge = 1.0e9;
        let wrapped = wrap_angle(huge);
        assert!(wrapped > -PI - 1e-5 && wrapped <= PI + 1e-5);
        assert!((wrapped.sin() - huge.sin()).abs() < 1e-6);
    }
}
