// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Parameter update queue for live-adjustable simulation parameters.

Any thread may push updates; the tick loop drains them between ticks, so the kernels
never observe a parameter change in the middle of a tick.

Copyright 2025 Neuraville Inc.
Licensed under the Apache License, Version 2.0
*/

use crate::backend::SimulationParams;
use parking_lot::Mutex;
use physarum_sim_kernels::{Result, SimulationError};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;

/// A single live parameter change
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterUpdate {
    DecayRate(f32),
    BlurRatio(f32),
    /// Degrees
    AgentFov(f32),
    /// Degrees per second
    AgentTurnRatio(f32),
    DepositAmount(f32),
}

impl ParameterUpdate {
    /// Names accepted by [`ParameterUpdate::from_name_value`]
    pub const NAMES: [&'static str; 5] = [
        "decay_rate",
        "blur_ratio",
        "agent_fov",
        "agent_turn_ratio",
        "deposit_amount",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ParameterUpdate::DecayRate(_) => "decay_rate",
            ParameterUpdate::BlurRatio(_) => "blur_ratio",
            ParameterUpdate::AgentFov(_) => "agent_fov",
            ParameterUpdate::AgentTurnRatio(_) => "agent_turn_ratio",
            ParameterUpdate::DepositAmount(_) => "deposit_amount",
        }
    }

    /// Parse `name = value` from an API or CLI layer.
    pub fn from_name_value(name: &str, value: &Value) -> Result<Self> {
        let v = value
            .as_f64()
            .or_else(|| value.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
            .ok_or_else(|| SimulationError::InvalidParameter {
                name: name.to_string(),
                reason: format!("expected a number, got {}", value),
            })? as f32;

        match name {
            "decay_rate" => Ok(ParameterUpdate::DecayRate(v)),
            "blur_ratio" => Ok(ParameterUpdate::BlurRatio(v)),
            "agent_fov" | "fov_degrees" => Ok(ParameterUpdate::AgentFov(v)),
            "agent_turn_ratio" | "turn_ratio" => Ok(ParameterUpdate::AgentTurnRatio(v)),
            "deposit_amount" => Ok(ParameterUpdate::DepositAmount(v)),
            _ => Err(SimulationError::InvalidParameter {
                name: name.to_string(),
                reason: format!("not live-adjustable (expected one of {:?})", Self::NAMES),
            }),
        }
    }

    /// `params` with this update applied, or an error leaving the caller's copy unchanged.
    pub fn apply_to(&self, params: &SimulationParams) -> Result<SimulationParams> {
        let mut next = *params;
        match *self {
            ParameterUpdate::DecayRate(v) => {
                check_unit_interval("decay_rate", v)?;
                next.decay_rate = v;
            }
            ParameterUpdate::BlurRatio(v) => {
                check_unit_interval("blur_ratio", v)?;
                next.blur_ratio = v;
            }
            ParameterUpdate::AgentFov(v) => next.agent.fov_degrees = v,
            ParameterUpdate::AgentTurnRatio(v) => next.agent.turn_ratio = v,
            ParameterUpdate::DepositAmount(v) => next.agent.deposit_amount = v,
        }
        next.agent.validate()?;
        Ok(next)
    }
}

pub(crate) fn check_unit_interval(name: &str, value: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(SimulationError::InvalidParameter {
            name: name.to_string(),
            reason: format!("must be within [0, 1], got {}", value),
        });
    }
    Ok(())
}

/// Thread-safe queue for parameter updates
///
/// - Control thread: pushes updates (short lock on the queue)
/// - Tick thread: drains between ticks
pub struct ParameterUpdateQueue {
    queue: Arc<Mutex<VecDeque<ParameterUpdate>>>,
}

impl ParameterUpdateQueue {
    pub fn new() -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::with_capacity(16))),
        }
    }

    pub fn push(&self, update: ParameterUpdate) {
        self.queue.lock().push_back(update);
    }

    /// Drain all pending updates in push order
    pub fn drain_all(&self) -> Vec<ParameterUpdate> {
        self.queue.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl Default for ParameterUpdateQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ParameterUpdateQueue {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
        }
    }
}
