// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

/// Linear RGBA color with channels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[repr(C)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Rgba = Rgba::new(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Rgba = Rgba::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_array(c: [f32; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// `self + other * scale`, per channel, clamped to `[0, 1]`.
    #[inline]
    pub fn add_scaled(self, other: Rgba, scale: f32) -> Rgba {
        Rgba::new(
            (self.r + other.r * scale).clamp(0.0, 1.0),
            (self.g + other.g * scale).clamp(0.0, 1.0),
            (self.b + other.b * scale).clamp(0.0, 1.0),
            (self.a + other.a * scale).clamp(0.0, 1.0),
        )
    }

    /// Quantize to 8-bit channels (round-to-nearest; NaN maps to 0).
    #[inline]
    pub fn to_rgba8(self) -> [u8; 4] {
        #[inline]
        fn q(c: f32) -> u8 {
            (c.clamp(0.0, 1.0) * 255.0).round() as u8
        }
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    pub fn is_valid(self) -> bool {
        self.to_array()
            .iter()
            .all(|c| c.is_finite() && (0.0..=1.0).contains(c))
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Rgba::WHITE
    }
}
