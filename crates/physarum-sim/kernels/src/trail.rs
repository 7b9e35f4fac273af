// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Trail Field
//!
//! Dense `height × width` grid of non-negative trail intensity, one cell per domain pixel.
//!
//! Per tick the field is mutated twice: deposits are added (nearest cell), then every cell is
//! decayed and blended with the mean of its neighborhood. The stencil reads the previous
//! values only (`values` → `scratch`, then swap), so update order never matters.

use crate::types::{DomainBounds, Result, SimulationError, Vec2};
use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

/// How the stencil and sampling treat cells beyond the domain edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeTopology {
    /// Out-of-bounds neighbors are skipped (divisor shrinks); samples read 0
    #[default]
    Clamped,
    /// Toroidal: edges see the opposite side
    Wrapped,
}

#[derive(Debug, Clone)]
pub struct TrailField {
    bounds: DomainBounds,
    topology: EdgeTopology,
    blur_radius: u32,
    values: Array2<f32>,
    scratch: Array2<f32>,
}

impl TrailField {
    /// All-zero field covering `bounds`.
    pub fn new(bounds: DomainBounds, topology: EdgeTopology, blur_radius: u32) -> Result<Self> {
        if blur_radius == 0 {
            return Err(SimulationError::InvalidConfiguration(
                "blur_radius must be at least 1".to_string(),
            ));
        }
        let shape = (bounds.height as usize, bounds.width as usize);
        Ok(Self {
            bounds,
            topology,
            blur_radius,
            values: Array2::zeros(shape),
            scratch: Array2::zeros(shape),
        })
    }

    #[inline]
    pub fn bounds(&self) -> DomainBounds {
        self.bounds
    }

    #[inline]
    pub fn topology(&self) -> EdgeTopology {
        self.topology
    }

    #[inline]
    pub fn blur_radius(&self) -> u32 {
        self.blur_radius
    }

    /// Row-major view (`[[y, x]]`).
    #[inline]
    pub fn values(&self) -> &Array2<f32> {
        &self.values
    }

    /// Contiguous row-major slice, `y * width + x`.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        // Owned, never transposed: always standard layout
        self.values.as_slice().unwrap_or(&[])
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        self.values.get([y, x]).copied()
    }

    /// Nearest-cell read. Outside the domain: 0 when clamped, wrapped otherwise.
    #[inline]
    pub fn sample(&self, position: Vec2) -> f32 {
        let p = match self.topology {
            EdgeTopology::Clamped => position,
            EdgeTopology::Wrapped if position.is_finite() => self.bounds.wrap(position),
            EdgeTopology::Wrapped => return 0.0,
        };
        match self.bounds.cell_of(p) {
            Some((x, y)) => self.values[[y, x]],
            None => 0.0,
        }
    }

    /// Add `amount` to the cell containing `position`. Out-of-bounds deposits are dropped.
    pub fn deposit(&mut self, position: Vec2, amount: f32) {
        if let Some((x, y)) = self.bounds.cell_of(position) {
            self.values[[y, x]] += amount;
        }
    }

    /// Add `amount` to the cell at flat index `y * width + x`.
    #[inline]
    pub fn deposit_at(&mut self, index: usize, amount: f32) {
        let w = self.bounds.width as usize;
        if let Some(cell) = self.values.get_mut([index / w, index % w]) {
            *cell += amount;
        }
    }

    /// `v' = decay_rate * ((1 - blur_ratio) * v + blur_ratio * mean(neighborhood))`
    ///
    /// Parameters are assumed validated to `[0, 1]`.
    pub fn decay_and_diffuse(&mut self, decay_rate: f32, blur_ratio: f32) {
        let src = &self.values;
        let (h, w) = src.dim();
        let r = self.blur_radius as isize;
        let wrapped = self.topology == EdgeTopology::Wrapped;

        Zip::indexed(&mut self.scratch).par_for_each(|(y, x), out| {
            let mut sum = 0.0f32;
            let mut count = 0u32;
            for dy in -r..=r {
                for dx in -r..=r {
                    let nx = x as isize + dx;
                    let ny = y as isize + dy;
                    let (nx, ny) = if wrapped {
                        (nx.rem_euclid(w as isize), ny.rem_euclid(h as isize))
                    } else if nx < 0 || ny < 0 || nx >= w as isize || ny >= h as isize {
                        continue;
                    } else {
                        (nx, ny)
                    };
                    sum += src[[ny as usize, nx as usize]];
                    count += 1;
                }
            }
            // The center cell is always counted
            let mean = sum / count.max(1) as f32;
            let v = src[[y, x]];
            *out = (decay_rate * ((1.0 - blur_ratio) * v + blur_ratio * mean)).max(0.0);
        });

        std::mem::swap(&mut self.values, &mut self.scratch);
    }

    /// Overwrite every cell from a row-major slice (GPU read-back).
    pub fn copy_from_slice(&mut self, data: &[f32]) -> Result<()> {
        if data.len() != self.bounds.cell_count() {
            return Err(SimulationError::BackendError(format!(
                "trail read-back size mismatch: expected {}, got {}",
                self.bounds.cell_count(),
                data.len()
            )));
        }
        for (cell, v) in self.values.iter_mut().zip(data) {
            *cell = *v;
        }
        Ok(())
    }

    pub fn total(&self) -> f64 {
        self.values.iter().map(|&v| v as f64).sum()
    }

    pub fn max_value(&self) -> f32 {
        self.values.iter().copied().fold(0.0, f32::max)
    }

    pub fn clear(&mut self) {
        self.values.fill(0.0);
        self.scratch.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(w: u32, h: u32, topology: EdgeTopology) -> TrailField {
        TrailField::new(DomainBounds::new(w, h).unwrap(), topology, 1).unwrap()
    }

    #[test]
    fn test_new_field_is_zero() {
        let f = field(4, 3, EdgeTopology::Clamped);
        assert_eq!(f.values().dim(), (3, 4));
        assert!(f.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_deposit_nearest_cell_accumulates() {
        let mut f = field(4, 4, EdgeTopology::Clamped);
        f.deposit(Vec2::new(1.9, 2.1), 1.0);
        f.deposit(Vec2::new(1.0, 2.99), 0.5);
        assert_eq!(f.get(1, 2), Some(1.5));
        assert_eq!(f.total(), 1.5);
    }

    #[test]
    fn test_out_of_bounds_deposit_dropped() {
        let mut f = field(4, 4, EdgeTopology::Clamped);
        f.deposit(Vec2::new(4.0, 0.0), 1.0);
        f.deposit(Vec2::new(-0.1, 0.0), 1.0);
        assert_eq!(f.total(), 0.0);
    }

    #[test]
    fn test_sample_outside_clamped_is_zero() {
        let mut f = field(4, 4, EdgeTopology::Clamped);
        f.deposit(Vec2::new(0.0, 0.0), 2.0);
        assert_eq!(f.sample(Vec2::new(-1.0, 0.0)), 0.0);
        assert_eq!(f.sample(Vec2::new(0.5, 0.5)), 2.0);
    }

    #[test]
    fn test_sample_wrapped() {
        let mut f = field(4, 4, EdgeTopology::Wrapped);
        f.deposit(Vec2::new(3.5, 0.5), 2.0);
        assert_eq!(f.sample(Vec2::new(-0.5, 4.5)), 2.0);
    }

    #[test]
    fn test_pure_decay_without_blur() {
        let mut f = field(3, 3, EdgeTopology::Clamped);
        f.deposit(Vec2::new(1.0, 1.0), 1.0);
        f.decay_and_diffuse(0.5, 0.0);
        assert_eq!(f.get(1, 1), Some(0.5));
        assert_eq!(f.get(0, 0), Some(0.0));
    }

    #[test]
    fn test_full_blur_interior_mean() {
        let mut f = field(3, 3, EdgeTopology::Clamped);
        f.deposit(Vec2::new(1.0, 1.0), 9.0);
        f.decay_and_diffuse(1.0, 1.0);
        // Every cell of a 3x3 grid has the center in its neighborhood
        assert!((f.get(1, 1).unwrap() - 1.0).abs() < 1e-6);
        // Corner: 4 in-bounds neighbors
        assert!((f.get(0, 0).unwrap() - 9.0 / 4.0).abs() < 1e-6);
        // Edge: 6 in-bounds neighbors
        assert!((f.get(1, 0).unwrap() - 9.0 / 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_wrapped_blur_conserves_mass() {
        let mut f = field(5, 5, EdgeTopology::Wrapped);
        f.deposit(Vec2::new(0.0, 0.0), 9.0);
        f.decay_and_diffuse(1.0, 1.0);
        assert!((f.total() - 9.0).abs() < 1e-4);
        assert!((f.get(4, 4).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_decay_converges_to_zero() {
        let mut f = field(8, 8, EdgeTopology::Clamped);
        f.deposit(Vec2::new(4.0, 4.0), 100.0);
        let mut prev = f.max_value();
        for _ in 0..200 {
            f.decay_and_diffuse(0.9, 0.3);
            let m = f.max_value();
            assert!(m <= prev);
            prev = m;
        }
        assert!(prev < 1e-6);
    }

    #[test]
    fn test_copy_from_slice_size_checked() {
        let mut f = field(2, 2, EdgeTopology::Clamped);
        assert!(f.copy_from_slice(&[1.0; 3]).is_err());
        f.copy_from_slice(&[0.0, 1.0, 2.0, 3.0]).unwrap();
        assert_eq!(f.get(1, 1), Some(3.0));
    }

    #[test]
    fn test_zero_blur_radius_rejected() {
        assert!(TrailField::new(DomainBounds::new(2, 2).unwrap(), EdgeTopology::Clamped, 0).is_err());
    }
}
