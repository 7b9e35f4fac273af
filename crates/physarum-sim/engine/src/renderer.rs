// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! CPU renderer: trail field + agent disks → RGBA8 frame.
//!
//! Reads the field and agents only. Rows are shaded in parallel; the disk overlay is serial
//! so overlapping agents resolve the same way every run.

use image::{Rgba as Pixel, RgbaImage};
use physarum_sim_kernels::{disk_pixels, shade_trail, Agent, RenderParams, TrailField};
use rayon::prelude::*;

pub fn render_frame(trail: &TrailField, agents: &[Agent], params: &RenderParams, frame: &mut RgbaImage) {
    let bounds = trail.bounds();
    let width = bounds.width as usize;
    let cells = trail.as_slice();

    frame
        .par_chunks_mut(width * 4)
        .zip(cells.par_chunks(width))
        .for_each(|(row, values)| {
            for (pixel, &intensity) in row.chunks_exact_mut(4).zip(values) {
                pixel.copy_from_slice(&shade_trail(intensity, params));
            }
        });

    if params.agent_radius > 0.0 {
        let color = Pixel(params.agent_color.to_rgba8());
        for agent in agents {
            for (x, y) in disk_pixels(agent.position, params.agent_radius, bounds) {
                frame.put_pixel(x, y, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use physarum_sim_kernels::{DomainBounds, EdgeTopology, Rgba, Vec2};

    #[test]
    fn test_background_trail_and_agent_layers() {
        let mut trail = TrailField::new(DomainBounds::new(6, 4).unwrap(), EdgeTopology::Clamped, 1).unwrap();
        trail.deposit(Vec2::new(1.0, 1.0), 0.5);
        let params = RenderParams {
            agent_radius: 0.4,
            agent_color: Rgba::new(0.0, 1.0, 0.0, 1.0),
            trail_color: Rgba::new(1.0, 0.0, 0.0, 0.0),
            background_color: Rgba::new(0.0, 0.0, 0.2, 1.0),
        };
        let agents = [Agent::new(Vec2::new(4.5, 2.5), Vec2::new(1.0, 0.0), 0.0)];
        let mut frame = RgbaImage::new(6, 4);
        render_frame(&trail, &agents, &params, &mut frame);

        assert_eq!(frame.get_pixel(0, 0).0, [0, 0, 51, 255]);
        assert_eq!(frame.get_pixel(1, 1).0, [128, 0, 51, 255]);
        assert_eq!(frame.get_pixel(4, 2).0, [0, 255, 0, 255]);
    }

    #[test]
    fn test_render_leaves_field_untouched() {
        let mut trail = TrailField::new(DomainBounds::new(4, 4).unwrap(), EdgeTopology::Clamped, 1).unwrap();
        trail.deposit(Vec2::new(2.0, 2.0), 3.0);
        let before = trail.as_slice().to_vec();
        let mut frame = RgbaImage::new(4, 4);
        render_frame(&trail, &[], &RenderParams::default(), &mut frame);
        assert_eq!(trail.as_slice(), &before[..]);
    }
}
