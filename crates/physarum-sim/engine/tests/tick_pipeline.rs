// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end tick pipeline behavior on the CPU backend.

use physarum_sim_engine::*;
use physarum_sim_kernels::{Agent, AgentParams, BoundaryPolicy, Vec2};

fn settings(num_agents: usize, seed: u64) -> SimulationSettings {
    SimulationSettings {
        num_agents,
        width: 48,
        height: 32,
        seed,
        backend: BackendType::CPU,
        ..Default::default()
    }
}

#[test]
fn same_seed_and_deltas_are_bit_identical() {
    let deltas = [0.016f32, 0.02, 0.016, 0.033, 0.0, 0.016];
    let run = || {
        let mut sim = Simulation::new(settings(500, 42)).unwrap();
        for dt in deltas {
            sim.tick(dt).unwrap();
        }
        (
            sim.agents().to_vec(),
            sim.trail().as_slice().to_vec(),
            sim.frame().as_raw().clone(),
        )
    };
    let (agents_a, trail_a, frame_a) = run();
    let (agents_b, trail_b, frame_b) = run();
    assert_eq!(agents_a, agents_b);
    assert_eq!(trail_a, trail_b);
    assert_eq!(frame_a, frame_b);
}

#[test]
fn different_seeds_diverge() {
    let a = Simulation::new(settings(50, 1)).unwrap();
    let b = Simulation::new(settings(50, 2)).unwrap();
    assert_ne!(a.agents(), b.agents());
}

#[test]
fn diagnostics_do_not_change_trajectory() {
    let mut plain = Simulation::new(settings(200, 9)).unwrap();
    let mut probed = Simulation::new(SimulationSettings {
        diagnostics_enabled: true,
        ..settings(200, 9)
    })
    .unwrap();

    for _ in 0..10 {
        plain.tick(0.02).unwrap();
        probed.tick(0.02).unwrap();
    }
    assert_eq!(plain.agents(), probed.agents());
    assert_eq!(plain.trail().as_slice(), probed.trail().as_slice());
    assert!(plain.diagnostics().samples().is_empty());
    assert_eq!(probed.diagnostics().samples().len(), 50);
    assert_eq!(probed.diagnostics().flattened().len(), 150);
}

#[test]
fn agents_sense_previous_tick_field() {
    let mut s = settings(0, 0);
    s.params.blur_ratio = 0.0;
    s.params.decay_rate = 1.0;
    s.params.agent = AgentParams {
        fov_degrees: 90.0,
        turn_ratio: 45.0,
        sensor_distance: 2.0,
        deposit_amount: 1.0,
        boundary: BoundaryPolicy::Bounce,
    };

    // B sits exactly on A's left sensing cell
    let a = Agent::new(Vec2::new(5.0, 5.0), Vec2::new(1.0, 0.0), 0.0);
    let b = Agent::new(Vec2::new(6.5, 3.5), Vec2::new(0.0, 1.0), 0.0);
    let mut sim = Simulation::from_agents(s, vec![a, b]).unwrap();

    sim.tick(1.0).unwrap();
    assert_eq!(sim.agents()[0].direction, Vec2::new(1.0, 0.0));

    sim.tick(1.0).unwrap();
    let turned = Vec2::new(1.0, 0.0).rotate_degrees(-45.0);
    let d = sim.agents()[0].direction;
    assert!((d.x - turned.x).abs() < 1e-6 && (d.y - turned.y).abs() < 1e-6);
}

#[test]
fn live_update_affects_next_tick_only() {
    let mut sim = Simulation::new(settings(100, 5)).unwrap();
    sim.tick(0.02).unwrap();
    let before = sim.trail().total();

    sim.apply_parameter_update(ParameterUpdate::DecayRate(0.0)).unwrap();
    assert_eq!(sim.trail().total(), before);

    sim.tick(0.02).unwrap();
    assert_eq!(sim.trail().total(), 0.0);
}

#[test]
fn frame_reflects_trail_and_background() {
    let mut s = settings(0, 0);
    s.params.render.background_color = physarum_sim_kernels::Rgba::new(0.0, 0.0, 0.0, 1.0);
    let mut sim = Simulation::new(s).unwrap();
    sim.tick(0.1).unwrap();
    assert!(sim.frame().pixels().all(|p| p.0 == [0, 0, 0, 255]));
}
