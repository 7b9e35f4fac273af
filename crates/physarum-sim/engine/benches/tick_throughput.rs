// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Tick throughput benchmarks
//!
//! Purpose:
//! - Track the cost of one full CPU tick (agent update, deposit commit,
//!   decay/diffuse, render) as the agent population grows.
//! - Isolate the stencil pass, which dominates for sparse populations.
//!
//! Notes:
//! - Fixed seeds and a fixed delta keep runs comparable.
//! - No I/O; frames stay in memory.

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use physarum_sim_engine::{BackendType, Simulation, SimulationSettings};
use physarum_sim_kernels::{DomainBounds, EdgeTopology, TrailField};

const DT: f32 = 1.0 / 60.0;

fn bench_settings(num_agents: usize, side: u32) -> SimulationSettings {
    SimulationSettings {
        num_agents,
        width: side,
        height: side,
        seed: 42,
        backend: BackendType::CPU,
        ..SimulationSettings::default()
    }
}

fn bench_cpu_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu_tick");
    group.sample_size(20);
    group.warm_up_time(Duration::from_millis(500));
    group.measurement_time(Duration::from_secs(2));

    for &agent_count in &[1_000usize, 10_000, 100_000] {
        let mut simulation = match Simulation::new(bench_settings(agent_count, 256)) {
            Ok(sim) => sim,
            Err(e) => panic!("failed to build benchmark simulation: {e}"),
        };

        group.throughput(Throughput::Elements(agent_count as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(agent_count),
            &agent_count,
            |b, _| {
                b.iter(|| {
                    let report = simulation.tick(black_box(DT)).expect("tick");
                    black_box(report.deposits_committed);
                });
            },
        );
    }

    group.finish();
}

fn bench_decay_diffuse(c: &mut Criterion) {
    let mut group = c.benchmark_group("decay_diffuse");
    group.sample_size(20);
    group.warm_up_time(Duration::from_millis(500));
    group.measurement_time(Duration::from_secs(2));

    for &(side, radius) in &[(256u32, 1u32), (512, 1), (512, 2)] {
        let bounds = DomainBounds::new(side, side).expect("bounds");
        let mut field = TrailField::new(bounds, EdgeTopology::Clamped, radius).expect("field");
        for i in (0..bounds.cell_count()).step_by(7) {
            field.deposit_at(i, 1.0);
        }

        group.throughput(Throughput::Elements(bounds.cell_count() as u64));
        group.bench_with_input(
            BenchmarkId::new(format!("r{radius}"), side),
            &side,
            |b, _| {
                b.iter(|| {
                    field.decay_and_diffuse(black_box(0.95), black_box(0.25));
                    black_box(field.total());
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_cpu_tick, bench_decay_diffuse);
criterion_main!(benches);
