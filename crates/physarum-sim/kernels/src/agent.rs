// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Agent Step Rule
//!
//! Pure per-agent update: sense → turn → move → boundary → deposit.
//!
//! The step reads the trail field committed at the end of the previous tick and never writes
//! it. The deposit is returned as a pending `(cell, amount)` pair which the backend commits
//! after every agent has moved.

use crate::trail::TrailField;
use crate::types::{BoundaryPolicy, DomainBounds, Result, SimulationError, Vec2};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of sensing positions per agent (left, forward, right).
pub const SENSOR_COUNT: usize = 3;

/// Motile agent state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub position: Vec2,
    /// Unit heading
    pub direction: Vec2,
    /// Distance per second, fixed at creation
    pub velocity: f32,
}

impl Agent {
    pub fn new(position: Vec2, direction: Vec2, velocity: f32) -> Self {
        Self {
            position,
            direction,
            velocity,
        }
    }

    /// Random agent: uniform position, heading drawn from `[-1, 1]²` then normalized,
    /// velocity uniform in `[min_velocity, max_velocity]`.
    pub fn random<R: Rng + ?Sized>(
        rng: &mut R,
        bounds: DomainBounds,
        min_velocity: f32,
        max_velocity: f32,
    ) -> Self {
        let position = bounds.wrap(Vec2::new(
            rng.gen_range(0.0..bounds.width as f32),
            rng.gen_range(0.0..bounds.height as f32),
        ));
        let direction = loop {
            let candidate = Vec2::new(rng.gen_range(-1.0..=1.0), rng.gen_range(-1.0..=1.0));
            if let Some(unit) = candidate.try_normalized() {
                break unit;
            }
        };
        let velocity = if max_velocity > min_velocity {
            rng.gen_range(min_velocity..=max_velocity)
        } else {
            min_velocity
        };
        Self::new(position, direction, velocity)
    }
}

/// Steering parameters. `fov_degrees`, `turn_ratio` and `deposit_amount` are live-adjustable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentParams {
    /// Full angle between left and right sensors
    pub fov_degrees: f32,
    /// Turn rate in degrees per second
    pub turn_ratio: f32,
    pub sensor_distance: f32,
    pub deposit_amount: f32,
    pub boundary: BoundaryPolicy,
}

impl Default for AgentParams {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            turn_ratio: 90.0,
            sensor_distance: 9.0,
            deposit_amount: 1.0,
            boundary: BoundaryPolicy::Bounce,
        }
    }
}

impl AgentParams {
    pub fn validate(&self) -> Result<()> {
        check_non_negative("agent_fov", self.fov_degrees)?;
        check_non_negative("agent_turn_ratio", self.turn_ratio)?;
        check_non_negative("sensor_distance", self.sensor_distance)?;
        check_non_negative("deposit_amount", self.deposit_amount)?;
        if self.fov_degrees > 360.0 {
            return Err(SimulationError::InvalidParameter {
                name: "agent_fov".to_string(),
                reason: format!("must be at most 360 degrees, got {}", self.fov_degrees),
            });
        }
        Ok(())
    }
}

fn check_non_negative(name: &str, value: f32) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(SimulationError::InvalidParameter {
            name: name.to_string(),
            reason: format!("must be finite and non-negative, got {}", value),
        });
    }
    Ok(())
}

/// Trail intensity at the three sensing positions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorReadings {
    pub left: f32,
    pub forward: f32,
    pub right: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Steer {
    Straight,
    Left,
    Right,
}

impl Steer {
    /// Signed turn in degrees for this tick. Left is negative.
    #[inline]
    pub fn angle(self, turn_ratio: f32, dt: f32) -> f32 {
        match self {
            Steer::Straight => 0.0,
            Steer::Left => -turn_ratio * dt,
            Steer::Right => turn_ratio * dt,
        }
    }
}

/// Forward wins ties with either side; an exact left/right tie turns right.
#[inline]
pub fn steer(r: SensorReadings) -> Steer {
    if r.forward >= r.left && r.forward >= r.right {
        Steer::Straight
    } else if r.left > r.right {
        Steer::Left
    } else {
        Steer::Right
    }
}

/// `[left, forward, right]` sensing positions at `sensor_distance` along the heading rotated
/// by `-fov/2`, `0`, `+fov/2`.
#[inline]
pub fn sensor_positions(agent: &Agent, params: &AgentParams) -> [Vec2; SENSOR_COUNT] {
    let half = params.fov_degrees * 0.5;
    let d = params.sensor_distance;
    [
        agent.position + agent.direction.rotate_degrees(-half) * d,
        agent.position + agent.direction * d,
        agent.position + agent.direction.rotate_degrees(half) * d,
    ]
}

/// Result of stepping one agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub agent: Agent,
    /// Flat cell index and amount to add during the deposit commit
    pub deposit: Option<(usize, f32)>,
    pub sensors: [Vec2; SENSOR_COUNT],
    /// Update produced a non-finite state; `agent` is the unchanged previous state
    pub rejected: bool,
}

/// Advance one agent by `dt` seconds against the committed field.
pub fn step_agent(agent: &Agent, field: &TrailField, params: &AgentParams, dt: f32) -> StepOutcome {
    let sensors = sensor_positions(agent, params);
    let readings = SensorReadings {
        left: field.sample(sensors[0]),
        forward: field.sample(sensors[1]),
        right: field.sample(sensors[2]),
    };

    let angle = steer(readings).angle(params.turn_ratio, dt);
    let turned = if angle == 0.0 {
        agent.direction
    } else {
        agent.direction.rotate_degrees(angle)
    };

    let bounds = field.bounds();
    // Reject before the boundary step, which would otherwise clamp infinities back in
    let proposed = turned.try_normalized().and_then(|direction| {
        let moved = agent.position + direction * (agent.velocity * dt);
        if !moved.is_finite() {
            return None;
        }
        let (position, direction) = bounds.resolve(params.boundary, moved, direction);
        Some(Agent::new(position, direction, agent.velocity))
    });

    match proposed {
        Some(next) if next.direction.is_finite() && bounds.contains(next.position) => {
            let deposit = if params.deposit_amount > 0.0 {
                bounds
                    .linear_index(next.position)
                    .map(|cell| (cell, params.deposit_amount))
            } else {
                None
            };
            StepOutcome {
                agent: next,
                deposit,
                sensors,
                rejected: false,
            }
        }
        _ => StepOutcome {
            agent: *agent,
            deposit: None,
            sensors,
            rejected: true,
        },
    }
}
