// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! 2D vector used for agent positions, headings and sensing offsets.

use core::ops::{Add, AddAssign, Mul, Neg, Sub};
use serde::{Deserialize, Serialize};

/// Plain `(x, y)` pair of `f32`.
///
/// `#[repr(C)]` so agent state can be uploaded to the GPU without repacking.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(C)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Unit vector in the same direction, or `None` for zero/non-finite input.
    #[inline]
    pub fn try_normalized(self) -> Option<Vec2> {
        let len = self.length();
        if len.is_finite() && len > f32::EPSILON {
            Some(Vec2::new(self.x / len, self.y / len))
        } else {
            None
        }
    }

    /// Rotate counter-clockwise (in a y-up frame) by `degrees`.
    ///
    /// In the image frame (y down) a positive angle turns clockwise, i.e. to the right.
    #[inline]
    pub fn rotate_degrees(self, degrees: f32) -> Vec2 {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Vec2::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    #[inline]
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    #[inline]
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    #[inline]
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    #[inline]
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

impl From<(f32, f32)> for Vec2 {
    fn from((x, y): (f32, f32)) -> Self {
        Vec2::new(x, y)
    }
}

impl From<Vec2> for (f32, f32) {
    fn from(v: Vec2) -> Self {
        (v.x, v.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec2, b: Vec2) -> bool {
        (a.x - b.x).abs() < 1e-5 && (a.y - b.y).abs() < 1e-5
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let v = Vec2::new(1.0, 0.0).rotate_degrees(90.0);
        assert!(approx(v, Vec2::new(0.0, 1.0)));
        let back = v.rotate_degrees(-90.0);
        assert!(approx(back, Vec2::new(1.0, 0.0)));
    }

    #[test]
    fn test_rotation_preserves_length() {
        let v = Vec2::new(0.6, 0.8).rotate_degrees(37.5);
        assert!((v.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_degenerate() {
        assert_eq!(Vec2::ZERO.try_normalized(), None);
        assert_eq!(Vec2::new(f32::NAN, 1.0).try_normalized(), None);
        let n = Vec2::new(3.0, 4.0).try_normalized().unwrap();
        assert!(approx(n, Vec2::new(0.6, 0.8)));
    }
}
