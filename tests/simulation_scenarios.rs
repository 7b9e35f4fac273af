// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Whole-simulation scenarios through the umbrella crate's public API

use physarum::prelude::*;
use proptest::prelude::*;

fn small(num_agents: usize, width: u32, height: u32) -> SimulationSettings {
    SimulationSettings {
        num_agents,
        width,
        height,
        seed: 11,
        ..Default::default()
    }
}

#[test]
fn single_deposit_stays_put_without_decay_or_blur() {
    let mut settings = small(1, 10, 10);
    settings.min_agent_velocity = 0.0;
    settings.max_agent_velocity = 0.0;
    settings.params.decay_rate = 1.0;
    settings.params.blur_ratio = 0.0;

    let mut sim = Simulation::new(settings).unwrap();
    sim.tick(0.1).unwrap();
    sim.apply_parameter_update(ParameterUpdate::DepositAmount(0.0)).unwrap();
    for _ in 0..4 {
        sim.tick(0.1).unwrap();
    }

    let values = sim.trail().as_slice();
    assert_eq!(values.iter().filter(|&&v| v == 1.0).count(), 1);
    assert_eq!(values.iter().filter(|&&v| v == 0.0).count(), 99);

    // The deposit sits under the (stationary) agent
    let agent = sim.agents()[0];
    let (x, y) = DomainBounds::new(10, 10).unwrap().cell_of(agent.position).unwrap();
    assert_eq!(sim.trail().get(x, y), Some(1.0));
}

#[test]
fn zero_agents_leave_field_empty_and_frame_plain() {
    let mut settings = small(0, 12, 7);
    settings.params.render.background_color = Rgba::new(0.0, 0.5, 0.0, 1.0);
    let mut sim = Simulation::new(settings).unwrap();

    for _ in 0..10 {
        let report = sim.tick(1.0 / 60.0).unwrap();
        assert_eq!(report.deposits_committed, 0);
    }

    assert!(sim.trail().as_slice().iter().all(|&v| v == 0.0));
    assert_eq!(sim.frame().dimensions(), (12, 7));
    assert!(sim.frame().pixels().all(|p| p.0 == [0, 128, 0, 255]));
    assert_eq!(sim.tick_count(), 10);
}

#[test]
fn zero_fov_never_turns() {
    let mut settings = small(64, 40, 40);
    settings.params.agent.fov_degrees = 0.0;
    settings.params.agent.turn_ratio = 720.0;
    settings.params.agent.boundary = BoundaryPolicy::Wrap;
    settings.edge_topology = EdgeTopology::Wrapped;

    let mut sim = Simulation::new(settings).unwrap();
    let initial: Vec<Vec2> = sim.agents().iter().map(|a| a.direction).collect();

    for _ in 0..30 {
        sim.tick(0.05).unwrap();
    }

    for (before, agent) in initial.iter().zip(sim.agents()) {
        assert!((before.x - agent.direction.x).abs() < 1e-5);
        assert!((before.y - agent.direction.y).abs() < 1e-5);
    }
}

#[test]
fn zero_velocity_agents_stay_but_keep_turning() {
    let mut settings = small(20, 32, 32);
    settings.min_agent_velocity = 0.0;
    settings.max_agent_velocity = 0.0;
    let mut sim = Simulation::new(settings).unwrap();
    let start: Vec<Vec2> = sim.agents().iter().map(|a| a.position).collect();

    for _ in 0..20 {
        sim.tick(0.1).unwrap();
    }

    for (p, agent) in start.iter().zip(sim.agents()) {
        assert_eq!(*p, agent.position);
        assert!((agent.direction.length() - 1.0).abs() < 1e-5);
    }
}

#[test]
fn field_decays_toward_zero_once_deposits_stop() {
    let mut sim = Simulation::new(small(200, 32, 32)).unwrap();
    for _ in 0..10 {
        sim.tick(1.0 / 30.0).unwrap();
    }
    let loaded = sim.trail().total();
    assert!(loaded > 0.0);

    sim.apply_parameter_update(ParameterUpdate::DepositAmount(0.0)).unwrap();
    sim.apply_parameter_update(ParameterUpdate::DecayRate(0.8)).unwrap();
    let mut previous = loaded;
    for _ in 0..60 {
        sim.tick(1.0 / 30.0).unwrap();
        let total = sim.trail().total();
        assert!(total <= previous);
        previous = total;
    }
    assert!(sim.trail().max_value() < 1e-3);
}

#[test]
fn non_finite_delta_is_rejected_without_advancing() {
    let mut sim = Simulation::new(small(10, 16, 16)).unwrap();
    assert!(sim.tick(f32::NAN).is_err());
    assert!(sim.tick(-1.0).is_err());
    assert_eq!(sim.tick_count(), 0);
}

#[test]
fn invalid_configuration_fails_before_allocation() {
    let mut settings = small(10, 0, 16);
    assert!(matches!(
        Simulation::new(settings.clone()),
        Err(SimulationError::InvalidConfiguration(_))
    ));

    settings.width = 16;
    settings.min_agent_velocity = 50.0;
    settings.max_agent_velocity = 10.0;
    assert!(Simulation::new(settings).is_err());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn invariants_hold_for_arbitrary_settings(
        seed in any::<u64>(),
        agents in 0usize..80,
        width in 4u32..40,
        height in 4u32..40,
        decay in 0.0f32..=1.0,
        blur in 0.0f32..=1.0,
        fov in 0.0f32..=180.0,
        wrap in any::<bool>(),
        dt in 0.0f32..0.5,
    ) {
        let mut settings = small(agents, width, height);
        settings.seed = seed;
        settings.params.decay_rate = decay;
        settings.params.blur_ratio = blur;
        settings.params.agent.fov_degrees = fov;
        settings.params.agent.boundary = if wrap { BoundaryPolicy::Wrap } else { BoundaryPolicy::Bounce };

        let bounds = DomainBounds::new(width, height).unwrap();
        let mut sim = Simulation::new(settings).unwrap();
        for _ in 0..8 {
            sim.tick(dt).unwrap();
            prop_assert!(sim.trail().as_slice().iter().all(|v| *v >= 0.0 && v.is_finite()));
            for agent in sim.agents() {
                prop_assert!((agent.direction.length() - 1.0).abs() < 1e-4);
                prop_assert!(bounds.contains(agent.position));
            }
        }
    }
}
