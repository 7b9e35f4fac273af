// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! PNG sequence output

use image::RgbaImage;
use physarum_sim_engine::PresentationSurface;
use physarum_sim_kernels::{Result, SimulationError};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Writes every `interval`-th frame as `frame_<tick>.png`
pub struct PngSequenceSurface {
    dir: PathBuf,
    interval: u64,
    frames_written: Arc<AtomicU64>,
}

impl PngSequenceSurface {
    /// Creates `dir` if needed. `interval` must be at least 1.
    pub fn new(dir: impl Into<PathBuf>, interval: u64) -> Result<Self> {
        if interval == 0 {
            return Err(SimulationError::InvalidParameter {
                name: "frame_interval".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            SimulationError::SurfaceError(format!("Failed to create frame directory {}: {}", dir.display(), e))
        })?;
        Ok(Self {
            dir,
            interval,
            frames_written: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Shared counter, readable after the surface has been handed to a runner
    pub fn frames_written(&self) -> Arc<AtomicU64> {
        self.frames_written.clone()
    }

    pub fn frame_path(&self, tick: u64) -> PathBuf {
        self.dir.join(format!("frame_{:06}.png", tick))
    }
}

impl PresentationSurface for PngSequenceSurface {
    fn surface_name(&self) -> &str {
        "png-sequence"
    }

    fn present(&mut self, frame: &RgbaImage, tick: u64) -> Result<()> {
        if tick % self.interval != 0 {
            return Ok(());
        }
        let path = self.frame_path(tick);
        frame
            .save(&path)
            .map_err(|e| SimulationError::SurfaceError(format!("Failed to write {}: {}", path.display(), e)))?;
        self.frames_written.fetch_add(1, Ordering::Relaxed);
        debug!("[HEADLESS] Wrote {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::tempdir;

    #[test]
    fn test_zero_interval_rejected() {
        let dir = tempdir().unwrap();
        assert!(PngSequenceSurface::new(dir.path(), 0).is_err());
    }

    #[test]
    fn test_interval_filters_ticks() {
        let dir = tempdir().unwrap();
        let mut surface = PngSequenceSurface::new(dir.path().join("frames"), 2).unwrap();
        let frame = RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 255]));

        for tick in 1..=5 {
            surface.present(&frame, tick).unwrap();
        }

        assert_eq!(surface.frames_written().load(Ordering::Relaxed), 2);
        assert!(surface.frame_path(2).exists());
        assert!(surface.frame_path(4).exists());
        assert!(!surface.frame_path(3).exists());

        let written = image::open(surface.frame_path(4)).unwrap().to_rgba8();
        assert_eq!(written.dimensions(), (4, 3));
        assert_eq!(*written.get_pixel(1, 1), Rgba([10, 20, 30, 255]));
    }
}
