// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # WGPU Backend
//!
//! GPU-accelerated backend using WGPU (cross-platform GPU compute library).
//! Supports Metal (macOS), Vulkan (Linux), DirectX 12 (Windows).
//!
//! State lives on the device between ticks. Deposits accumulate in a fixed-point `u32`
//! buffer via `atomicAdd` (scaled by 1000) and are folded into the trail by the commit pass.
//! The trail uses two buffers in ping-pong; decay/diffuse reads one and writes the other.
//! After each tick the agents, committed trail, frame and rejection counter are read back so
//! the host buffers always reflect the last completed tick.

use super::{ComputeBackend, Kernel, PassStats, SimulationBuffers, SimulationParams};
use physarum_sim_kernels::{Agent, BoundaryPolicy, EdgeTopology, Result, SimulationError, Vec2};
use tracing::{debug, info};
use wgpu::util::DeviceExt;

/// Threads per workgroup in every shader
const WORKGROUP_SIZE: u32 = 256;
/// Per-dimension dispatch limit
const MAX_WORKGROUPS_PER_DIM: u32 = 65_535;
/// Smallest buffer we allocate (zero-sized bindings are invalid)
const MIN_BUFFER_BYTES: u64 = 32;
/// Must match `FIXED_POINT_SCALE` in `agent_update.wgsl` and `commit_deposits.wgsl`
const FIXED_POINT_SCALE: f64 = 1000.0;

/// Reject deposit amounts the fixed-point accumulator cannot represent.
///
/// A non-zero amount must be at least one fixed-point unit, and `agent_count` agents
/// depositing into the same cell must not overflow a `u32`.
fn check_fixed_point_deposit(amount: f32, agent_count: u32) -> Result<()> {
    if amount == 0.0 {
        return Ok(());
    }
    let scaled = amount as f64 * FIXED_POINT_SCALE;
    let reason = if scaled < 1.0 {
        format!(
            "{} is below the GPU deposit resolution of {}",
            amount,
            1.0 / FIXED_POINT_SCALE
        )
    } else if scaled.round() * agent_count.max(1) as f64 > u32::MAX as f64 {
        format!(
            "{} x {} agents overflows the GPU deposit accumulator (max {} per cell)",
            amount,
            agent_count,
            u32::MAX as f64 / FIXED_POINT_SCALE
        )
    } else {
        return Ok(());
    };
    Err(SimulationError::InvalidParameter {
        name: "deposit_amount".to_string(),
        reason,
    })
}

/// Agent layout shared with `agent_update.wgsl` / `render_agents.wgsl` (32-byte stride)
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct GpuAgent {
    px: f32,
    py: f32,
    dx: f32,
    dy: f32,
    velocity: f32,
    _pad: [f32; 3],
}

impl From<&Agent> for GpuAgent {
    fn from(a: &Agent) -> Self {
        Self {
            px: a.position.x,
            py: a.position.y,
            dx: a.direction.x,
            dy: a.direction.y,
            velocity: a.velocity,
            _pad: [0.0; 3],
        }
    }
}

impl From<&GpuAgent> for Agent {
    fn from(g: &GpuAgent) -> Self {
        Agent::new(Vec2::new(g.px, g.py), Vec2::new(g.dx, g.dy), g.velocity)
    }
}

/// Uniform block shared by every shader (`struct Params`)
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct GpuParams {
    width: u32,
    height: u32,
    agent_count: u32,
    blur_radius: u32,
    dt: f32,
    decay_rate: f32,
    blur_ratio: f32,
    fov_degrees: f32,
    turn_ratio: f32,
    sensor_distance: f32,
    deposit_amount: f32,
    agent_radius: f32,
    boundary_wrap: u32,
    topology_wrap: u32,
    diag_limit: u32,
    _pad: u32,
    agent_color: [f32; 4],
    trail_color: [f32; 4],
    background_color: [f32; 4],
}

struct Pipelines {
    agent_update: wgpu::ComputePipeline,
    commit_deposits: wgpu::ComputePipeline,
    decay_diffuse: wgpu::ComputePipeline,
    render_field: wgpu::ComputePipeline,
    render_agents: wgpu::ComputePipeline,
}

/// Device buffers (persistent after `bind`)
struct GpuBuffers {
    params: wgpu::Buffer,
    agents: wgpu::Buffer,
    /// Ping-pong pair; `WgpuBackend::current` indexes the committed field
    trail: [wgpu::Buffer; 2],
    deposits: wgpu::Buffer,
    frame: wgpu::Buffer,
    diagnostics: wgpu::Buffer,
    rejected: wgpu::Buffer,
}

/// Bind groups indexed by which trail buffer is current
struct BindGroups {
    agent_update: [wgpu::BindGroup; 2],
    commit_deposits: [wgpu::BindGroup; 2],
    decay_diffuse: [wgpu::BindGroup; 2],
    render_field: [wgpu::BindGroup; 2],
    render_agents: wgpu::BindGroup,
}

/// WGPU backend for GPU acceleration
pub struct WgpuBackend {
    /// Backend name for logging
    name: String,

    device: wgpu::Device,
    queue: wgpu::Queue,
    pipelines: Pipelines,
    buffers: Option<GpuBuffers>,
    bind_groups: Option<BindGroups>,

    /// Index of the trail buffer holding the committed field
    current: usize,
    agent_count: u32,
    cell_count: u32,
    /// Maximum agents sampled by the diagnostics buffer
    diag_capacity: u32,
    diagnostics_enabled: bool,
    params: GpuParams,
}

impl WgpuBackend {
    /// Create a new WGPU backend (device + pipelines). Buffers are allocated in `bind`.
    pub fn new(agent_capacity: usize, cell_capacity: usize) -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| SimulationError::BackendError("Failed to find WGPU adapter".to_string()))?;

        let adapter_info = adapter.get_info();
        let name = format!("WGPU ({} - {:?})", adapter_info.name, adapter_info.backend);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Physarum Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
            None,
        ))
        .map_err(|e| SimulationError::BackendError(format!("Failed to create device: {}", e)))?;

        let pipelines = Self::initialize_pipelines(&device);
        info!(
            "[WGPU-BACKEND] {} ready for {} agents, {} cells",
            name, agent_capacity, cell_capacity
        );

        Ok(Self {
            name,
            device,
            queue,
            pipelines,
            buffers: None,
            bind_groups: None,
            current: 0,
            agent_count: 0,
            cell_count: 0,
            diag_capacity: 0,
            diagnostics_enabled: false,
            params: bytemuck::Zeroable::zeroed(),
        })
    }

    fn initialize_pipelines(device: &wgpu::Device) -> Pipelines {
        let build = |label: &str, source: &str, entry_point: &str| {
            let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: None, // Auto-layout from shader
                module: &module,
                entry_point,
            })
        };

        let pipelines = Pipelines {
            agent_update: build(
                "Agent Update",
                include_str!("shaders/agent_update.wgsl"),
                "agent_update_main",
            ),
            commit_deposits: build(
                "Commit Deposits",
                include_str!("shaders/commit_deposits.wgsl"),
                "commit_deposits_main",
            ),
            decay_diffuse: build(
                "Decay Diffuse",
                include_str!("shaders/decay_diffuse.wgsl"),
                "decay_diffuse_main",
            ),
            render_field: build(
                "Render Field",
                include_str!("shaders/render_field.wgsl"),
                "render_field_main",
            ),
            render_agents: build(
                "Render Agents",
                include_str!("shaders/render_agents.wgsl"),
                "render_agents_main",
            ),
        };
        debug!("[WGPU-BACKEND] 5 compute pipelines created");
        pipelines
    }

    fn encode_params(&mut self, buffers: &SimulationBuffers, params: &SimulationParams, dt: f32) {
        let bounds = buffers.trail.bounds();
        let diag_limit = if self.diagnostics_enabled {
            self.diag_capacity
        } else {
            0
        };
        self.params = GpuParams {
            width: bounds.width,
            height: bounds.height,
            agent_count: self.agent_count,
            blur_radius: buffers.trail.blur_radius(),
            dt,
            decay_rate: params.decay_rate,
            blur_ratio: params.blur_ratio,
            fov_degrees: params.agent.fov_degrees,
            turn_ratio: params.agent.turn_ratio,
            sensor_distance: params.agent.sensor_distance,
            deposit_amount: params.agent.deposit_amount,
            agent_radius: params.render.agent_radius,
            boundary_wrap: (params.agent.boundary == BoundaryPolicy::Wrap) as u32,
            topology_wrap: (buffers.trail.topology() == EdgeTopology::Wrapped) as u32,
            diag_limit,
            _pad: 0,
            agent_color: params.render.agent_color.to_array(),
            trail_color: params.render.trail_color.to_array(),
            background_color: params.render.background_color.to_array(),
        };
    }

    fn write_params(&self) -> Result<()> {
        let buffers = self.gpu_buffers()?;
        self.queue
            .write_buffer(&buffers.params, 0, bytemuck::bytes_of(&self.params));
        Ok(())
    }

    fn gpu_buffers(&self) -> Result<&GpuBuffers> {
        self.buffers
            .as_ref()
            .ok_or_else(|| SimulationError::BackendError("WGPU buffers not bound".to_string()))
    }

    fn create_bind_groups(&self, buffers: &GpuBuffers) -> BindGroups {
        let group = |label: &str, pipeline: &wgpu::ComputePipeline, resources: &[&wgpu::Buffer]| {
            let layout = pipeline.get_bind_group_layout(0);
            let entries: Vec<wgpu::BindGroupEntry> = resources
                .iter()
                .enumerate()
                .map(|(binding, buffer)| wgpu::BindGroupEntry {
                    binding: binding as u32,
                    resource: buffer.as_entire_binding(),
                })
                .collect();
            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &layout,
                entries: &entries,
            })
        };

        let p = &self.pipelines;
        let b = buffers;
        let per_parity = |cur: usize| {
            let other = 1 - cur;
            (
                group(
                    "Agent Update Bind Group",
                    &p.agent_update,
                    &[&b.params, &b.agents, &b.trail[cur], &b.deposits, &b.diagnostics, &b.rejected],
                ),
                group(
                    "Commit Deposits Bind Group",
                    &p.commit_deposits,
                    &[&b.params, &b.trail[cur], &b.deposits],
                ),
                group(
                    "Decay Diffuse Bind Group",
                    &p.decay_diffuse,
                    &[&b.params, &b.trail[cur], &b.trail[other]],
                ),
                group(
                    "Render Field Bind Group",
                    &p.render_field,
                    &[&b.params, &b.trail[cur], &b.frame],
                ),
            )
        };

        let (au0, cd0, dd0, rf0) = per_parity(0);
        let (au1, cd1, dd1, rf1) = per_parity(1);

        BindGroups {
            agent_update: [au0, au1],
            commit_deposits: [cd0, cd1],
            decay_diffuse: [dd0, dd1],
            render_field: [rf0, rf1],
            render_agents: group(
                "Render Agents Bind Group",
                &p.render_agents,
                &[&b.params, &b.agents, &b.frame],
            ),
        }
    }

    /// Split `count` invocations into a (x, y) workgroup grid within the per-dimension limit.
    fn workgroups(count: u32) -> (u32, u32) {
        let groups = (count + WORKGROUP_SIZE - 1) / WORKGROUP_SIZE;
        if groups <= MAX_WORKGROUPS_PER_DIM {
            (groups, 1)
        } else {
            (
                MAX_WORKGROUPS_PER_DIM,
                (groups + MAX_WORKGROUPS_PER_DIM - 1) / MAX_WORKGROUPS_PER_DIM,
            )
        }
    }

    /// Encode one or more passes, submit, and block until the device is idle.
    fn run_passes(&self, label: &str, passes: &[(&wgpu::ComputePipeline, &wgpu::BindGroup, u32)]) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) });

        for (pipeline, bind_group, count) in passes {
            if *count == 0 {
                continue;
            }
            let (x, y) = Self::workgroups(*count);
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(label),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(pipeline);
            compute_pass.set_bind_group(0, bind_group, &[]);
            compute_pass.dispatch_workgroups(x, y, 1);
        }

        self.queue.submit(Some(encoder.finish()));
        // Barrier between stages
        self.device.poll(wgpu::Maintain::Wait);
    }

    /// Copy `count` elements of a device buffer to the host (blocking).
    fn read_pod<T: bytemuck::Pod>(&self, source: &wgpu::Buffer, count: usize) -> Result<Vec<T>> {
        let size = (count * std::mem::size_of::<T>()) as u64;
        if size == 0 {
            return Ok(Vec::new());
        }
        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Staging"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback"),
            });
        encoder.copy_buffer_to_buffer(source, 0, &staging_buffer, 0, size);
        self.queue.submit(Some(encoder.finish()));

        let buffer_slice = staging_buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });

        self.device.poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|_| SimulationError::BackendError("Failed to receive buffer map result".to_string()))?
            .map_err(|e| SimulationError::BackendError(format!("Failed to map buffer: {:?}", e)))?;

        let data = buffer_slice.get_mapped_range();
        let values: Vec<T> = bytemuck::cast_slice(&data).to_vec();
        drop(data);
        staging_buffer.unmap();
        Ok(values)
    }
}

impl ComputeBackend for WgpuBackend {
    fn backend_name(&self) -> &str {
        &self.name
    }

    fn bind(&mut self, buffers: &SimulationBuffers, params: &SimulationParams) -> Result<()> {
        let agent_count = u32::try_from(buffers.agents.len())
            .map_err(|_| SimulationError::BackendError("agent count exceeds u32".to_string()))?;
        let cell_count = u32::try_from(buffers.trail.bounds().cell_count())
            .map_err(|_| SimulationError::BackendError("cell count exceeds u32".to_string()))?;
        check_fixed_point_deposit(params.agent.deposit_amount, agent_count)?;
        self.agent_count = agent_count;
        self.cell_count = cell_count;
        self.diag_capacity = buffers.diagnostics.agent_limit().min(buffers.agents.len()) as u32;
        self.diagnostics_enabled = buffers.diagnostics.is_enabled();
        self.current = 0;

        let storage = wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST;

        let init = |label: &str, contents: &[u8]| {
            if contents.len() as u64 >= MIN_BUFFER_BYTES {
                self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents,
                    usage: storage,
                })
            } else {
                let mut padded = contents.to_vec();
                padded.resize(MIN_BUFFER_BYTES as usize, 0);
                self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents: &padded,
                    usage: storage,
                })
            }
        };
        let zeroed = |label: &str, bytes: u64| {
            self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: bytes.max(MIN_BUFFER_BYTES),
                usage: storage,
                mapped_at_creation: false,
            })
        };

        let gpu_agents: Vec<GpuAgent> = buffers.agents.iter().map(GpuAgent::from).collect();
        let cells = cell_count as u64;

        let gpu_buffers = GpuBuffers {
            params: self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Physarum Params"),
                size: std::mem::size_of::<GpuParams>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }),
            agents: init("Agents", bytemuck::cast_slice(&gpu_agents)),
            trail: [
                init("Trail A", bytemuck::cast_slice(buffers.trail.as_slice())),
                zeroed("Trail B", cells * 4),
            ],
            deposits: zeroed("Deposits (fixed-point)", cells * 4),
            frame: zeroed("Frame", cells * 4),
            diagnostics: zeroed("Diagnostics", self.diag_capacity as u64 * 3 * 8),
            rejected: zeroed("Rejected Counter", 4),
        };

        let bind_groups = self.create_bind_groups(&gpu_buffers);
        self.buffers = Some(gpu_buffers);
        self.bind_groups = Some(bind_groups);

        self.encode_params(buffers, params, 0.0);
        self.write_params()?;

        info!(
            "[WGPU-BACKEND] Bound {} agents, {} cells",
            agent_count, cell_count
        );
        Ok(())
    }

    fn update_parameters(&mut self, params: &SimulationParams) -> Result<()> {
        check_fixed_point_deposit(params.agent.deposit_amount, self.agent_count)?;
        self.params.decay_rate = params.decay_rate;
        self.params.blur_ratio = params.blur_ratio;
        self.params.fov_degrees = params.agent.fov_degrees;
        self.params.turn_ratio = params.agent.turn_ratio;
        self.params.deposit_amount = params.agent.deposit_amount;
        self.write_params()
    }

    fn dispatch(
        &mut self,
        kernel: Kernel,
        buffers: &mut SimulationBuffers,
        params: &SimulationParams,
        dt: f32,
    ) -> Result<PassStats> {
        if kernel == Kernel::AgentUpdate {
            self.diagnostics_enabled = buffers.diagnostics.is_enabled();
            self.encode_params(buffers, params, dt);
            self.write_params()?;
        }

        let groups = self
            .bind_groups
            .as_ref()
            .ok_or_else(|| SimulationError::BackendError("WGPU bind groups not created".to_string()))?;
        let p = &self.pipelines;
        let cur = self.current;

        match kernel {
            Kernel::AgentUpdate => self.run_passes(
                "Agent Update",
                &[(&p.agent_update, &groups.agent_update[cur], self.agent_count)],
            ),
            Kernel::CommitDeposits => self.run_passes(
                "Commit Deposits",
                &[(&p.commit_deposits, &groups.commit_deposits[cur], self.cell_count)],
            ),
            Kernel::DecayDiffuse => {
                self.run_passes(
                    "Decay Diffuse",
                    &[(&p.decay_diffuse, &groups.decay_diffuse[cur], self.cell_count)],
                );
                self.current = 1 - cur;
            }
            Kernel::Render => self.run_passes(
                "Render",
                &[
                    (&p.render_field, &groups.render_field[cur], self.cell_count),
                    (&p.render_agents, &groups.render_agents, self.agent_count),
                ],
            ),
        }

        Ok(PassStats::default())
    }

    fn synchronize(&mut self, buffers: &mut SimulationBuffers) -> Result<PassStats> {
        let gpu = self.gpu_buffers()?;
        let cells = self.cell_count as usize;

        let gpu_agents: Vec<GpuAgent> = self.read_pod(&gpu.agents, self.agent_count as usize)?;
        for (host, device) in buffers.agents.iter_mut().zip(&gpu_agents) {
            *host = Agent::from(device);
        }

        let trail: Vec<f32> = self.read_pod(&gpu.trail[self.current], cells)?;
        buffers.trail.copy_from_slice(&trail)?;

        let pixels: Vec<u32> = self.read_pod(&gpu.frame, cells)?;
        let frame_bytes: &[u8] = bytemuck::cast_slice(&pixels);
        if frame_bytes.len() != buffers.frame.len() {
            return Err(SimulationError::BackendError(format!(
                "frame read-back size mismatch: expected {}, got {}",
                buffers.frame.len(),
                frame_bytes.len()
            )));
        }
        buffers.frame.copy_from_slice(frame_bytes);

        if self.diagnostics_enabled && self.diag_capacity > 0 {
            let points: Vec<[f32; 2]> = self.read_pod(&gpu.diagnostics, self.diag_capacity as usize * 3)?;
            buffers.diagnostics.begin_tick();
            for (index, chunk) in points.chunks_exact(3).enumerate() {
                let positions = [
                    Vec2::new(chunk[0][0], chunk[0][1]),
                    Vec2::new(chunk[1][0], chunk[1][1]),
                    Vec2::new(chunk[2][0], chunk[2][1]),
                ];
                buffers.diagnostics.record(index, positions);
            }
        }

        let rejected: Vec<u32> = self.read_pod(&gpu.rejected, 1)?;
        let agents_rejected = rejected.first().copied().unwrap_or(0) as usize;
        if agents_rejected > 0 {
            self.queue
                .write_buffer(&gpu.rejected, 0, bytemuck::bytes_of(&0u32));
            buffers.diagnostics.add_rejected(agents_rejected as u64);
        }

        // Every accepted agent deposits inside the domain; bind/update_parameters keep the
        // fixed-point sum within u32 and every non-zero amount above the resolution
        let deposits_committed = if self.params.deposit_amount > 0.0 {
            (self.agent_count as usize).saturating_sub(agents_rejected)
        } else {
            0
        };

        Ok(PassStats {
            agents_rejected,
            deposits_committed,
        })
    }
}
