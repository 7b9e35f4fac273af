// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Presentation surface seam: receives the output image after every tick.
//!
//! Window creation, texture upload and display live outside this crate; implementors only
//! need to accept a read-only frame.

use image::RgbaImage;
use parking_lot::Mutex;
use physarum_sim_kernels::Result;
use std::sync::Arc;

pub trait PresentationSurface: Send {
    /// Name for logging
    fn surface_name(&self) -> &str;

    /// Present the frame produced by tick `tick`. The frame must not be retained by reference.
    fn present(&mut self, frame: &RgbaImage, tick: u64) -> Result<()>;
}

/// Keeps a copy of the most recent frame for polling consumers (API handlers, tests).
#[derive(Clone, Default)]
pub struct LatestFrameSurface {
    latest: Arc<Mutex<Option<(u64, RgbaImage)>>>,
}

impl LatestFrameSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tick number and a copy of the last presented frame
    pub fn latest(&self) -> Option<(u64, RgbaImage)> {
        self.latest.lock().clone()
    }

    pub fn latest_tick(&self) -> Option<u64> {
        self.latest.lock().as_ref().map(|(tick, _)| *tick)
    }
}

impl PresentationSurface for LatestFrameSurface {
    fn surface_name(&self) -> &str {
        "latest-frame"
    }

    fn present(&mut self, frame: &RgbaImage, tick: u64) -> Result<()> {
        let mut slot = self.latest.lock();
        match slot.as_mut() {
            // Reuse the allocation when the size is unchanged
            Some((t, buf)) if buf.dimensions() == frame.dimensions() => {
                *t = tick;
                buf.copy_from_slice(frame.as_raw());
            }
            _ => *slot = Some((tick, frame.clone())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_frame_shared_across_clones() {
        let surface = LatestFrameSurface::new();
        let mut writer = surface.clone();
        assert!(surface.latest().is_none());

        let mut frame = RgbaImage::new(2, 2);
        frame.put_pixel(1, 0, image::Rgba([1, 2, 3, 4]));
        writer.present(&frame, 7).unwrap();
        frame.put_pixel(1, 0, image::Rgba([9, 9, 9, 9]));
        writer.present(&frame, 8).unwrap();

        let (tick, copy) = surface.latest().unwrap();
        assert_eq!(tick, 8);
        assert_eq!(copy.get_pixel(1, 0).0, [9, 9, 9, 9]);
    }
}
