// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Pixel-level rendering rules shared by the CPU renderer and mirrored by the GPU shaders.

use crate::types::{DomainBounds, Rgba, Vec2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderParams {
    /// Disk radius in pixels; 0 disables the agent overlay
    pub agent_radius: f32,
    pub agent_color: Rgba,
    pub trail_color: Rgba,
    pub background_color: Rgba,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            agent_radius: 1.0,
            agent_color: Rgba::WHITE,
            trail_color: Rgba::WHITE,
            background_color: Rgba::BLACK,
        }
    }
}

/// `background + intensity * trail_color`, clamped, as RGBA8.
#[inline]
pub fn shade_trail(intensity: f32, params: &RenderParams) -> [u8; 4] {
    params
        .background_color
        .add_scaled(params.trail_color, intensity.max(0.0))
        .to_rgba8()
}

/// Pixels covered by a filled disk: every pixel whose center lies within `radius` of `center`,
/// plus the pixel containing `center`. Clipped to the domain.
pub fn disk_pixels(center: Vec2, radius: f32, bounds: DomainBounds) -> impl Iterator<Item = (u32, u32)> {
    let r = if radius.is_finite() { radius.max(0.0) } else { 0.0 };
    let enabled = r > 0.0 && center.is_finite();
    let home = bounds.cell_of(center);

    let (x0, x1, y0, y1) = if enabled {
        (
            (center.x - r).floor().max(0.0) as u32,
            ((center.x + r).ceil().max(0.0) as u32).min(bounds.width),
            (center.y - r).floor().max(0.0) as u32,
            ((center.y + r).ceil().max(0.0) as u32).min(bounds.height),
        )
    } else {
        (0, 0, 0, 0)
    };
    let r2 = r * r;

    (y0..y1)
        .flat_map(move |y| (x0..x1).map(move |x| (x, y)))
        .filter(move |&(x, y)| {
            let dx = x as f32 + 0.5 - center.x;
            let dy = y as f32 + 0.5 - center.y;
            dx * dx + dy * dy <= r2
                || home == Some((x as usize, y as usize))
        })
}
