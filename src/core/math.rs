//! Angular arithmetic helpers.
//!
//! All headings in the crate live in the half-open interval (-π, π];
//! [`normalize_angle`] is the single place that enforces it.

use std::f32::consts::PI;

/// Normalize an angle to (-π, π].
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    let mut a = angle % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a <= -PI {
        a += 2.0 * PI;
    }
    a
}

/// Shortest signed angular difference from `a` to `b`.
///
/// Returns the angle to add to `a` to reach `b`, taking the short way
/// around the circle.
#[inline]
pub fn angle_diff(a: f32, b: f32) -> f32 {
    normalize_angle(b - a)
}
