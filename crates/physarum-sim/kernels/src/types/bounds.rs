// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Domain extent and boundary handling for agent positions.

use super::error::{Result, SimulationError};
use super::vector::Vec2;
use serde::{Deserialize, Serialize};

/// What happens when an agent steps outside the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryPolicy {
    /// Clamp back inside and negate the crossing component of the heading
    #[default]
    Bounce,
    /// Toroidal domain
    Wrap,
}

impl std::fmt::Display for BoundaryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoundaryPolicy::Bounce => write!(f, "bounce"),
            BoundaryPolicy::Wrap => write!(f, "wrap"),
        }
    }
}

impl std::str::FromStr for BoundaryPolicy {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "bounce" | "clamp" => Ok(BoundaryPolicy::Bounce),
            "wrap" | "torus" => Ok(BoundaryPolicy::Wrap),
            other => Err(SimulationError::InvalidConfiguration(format!(
                "unknown boundary policy '{}' (expected bounce or wrap)",
                other
            ))),
        }
    }
}

/// Half-open rectangle `[0, width) × [0, height)` matching the trail grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainBounds {
    pub width: u32,
    pub height: u32,
}

impl DomainBounds {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SimulationError::InvalidConfiguration(format!(
                "domain must be non-empty, got {}x{}",
                width, height
            )));
        }
        Ok(Self { width, height })
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    #[inline]
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= 0.0 && p.y >= 0.0 && p.x < self.width as f32 && p.y < self.height as f32
    }

    /// Nearest-cell index `(floor(x), floor(y))`, if inside the domain.
    #[inline]
    pub fn cell_of(&self, p: Vec2) -> Option<(usize, usize)> {
        if self.contains(p) {
            Some((p.x as usize, p.y as usize))
        } else {
            None
        }
    }

    /// Flat row-major index of the cell containing `p`.
    #[inline]
    pub fn linear_index(&self, p: Vec2) -> Option<usize> {
        self.cell_of(p)
            .map(|(x, y)| y * self.width as usize + x)
    }

    /// Wrap `p` onto the torus. Result is always inside the domain.
    #[inline]
    pub fn wrap(&self, p: Vec2) -> Vec2 {
        let w = self.width as f32;
        let h = self.height as f32;
        Vec2::new(
            wrap_axis(p.x, w),
            wrap_axis(p.y, h),
        )
    }

    /// Apply the boundary policy to a proposed `position` travelling along `direction`.
    ///
    /// Returns the in-bounds position and the (possibly reflected) heading.
    #[inline]
    pub fn resolve(&self, policy: BoundaryPolicy, position: Vec2, direction: Vec2) -> (Vec2, Vec2) {
        match policy {
            BoundaryPolicy::Wrap => (self.wrap(position), direction),
            BoundaryPolicy::Bounce => {
                let (x, dx) = bounce_axis(position.x, direction.x, self.width as f32);
                let (y, dy) = bounce_axis(position.y, direction.y, self.height as f32);
                (Vec2::new(x, y), Vec2::new(dx, dy))
            }
        }
    }
}

/// Largest `f32` strictly below `limit` (limit > 0).
#[inline]
fn below(limit: f32) -> f32 {
    f32::from_bits(limit.to_bits() - 1)
}

#[inline]
fn wrap_axis(v: f32, limit: f32) -> f32 {
    let r = v.rem_euclid(limit);
    // rem_euclid can round up to `limit` for tiny negative inputs
    if r >= limit {
        0.0
    } else {
        r
    }
}

#[inline]
fn bounce_axis(v: f32, d: f32, limit: f32) -> (f32, f32) {
    if v < 0.0 {
        (0.0, d.abs())
    } else if v >= limit {
        (below(limit), -d.abs())
    } else {
        (v, d)
    }
}
