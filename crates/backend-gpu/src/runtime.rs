//! Accelerator execution of the reduction workload via wgpu.
//!
//! Maps to Metal on macOS and Vulkan/DX12 elsewhere. Dispatch and readback
//! dominate the cost of a single invocation, which is why this backend is
//! paired with the growth-only search instead of the adaptive one.

use anyhow::{anyhow, ensure, Result};
use bytemuck::cast_slice;
use pollster::block_on;
use std::hint::black_box;
use std::sync::mpsc;
use std::time::{Duration, Instant};
use stressforge_kernels::workload::WorkloadKernel;
use tracing::info;
use wgpu::util::DeviceExt;

const WORKGROUP_SIZE: u32 = 64;

/// Information about the selected accelerator device.
#[derive(Debug, Clone)]
pub struct AcceleratorInfo {
    pub name: String,
    pub backend: String,
}

pub struct AcceleratorContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    info: AcceleratorInfo,
}

impl AcceleratorContext {
    pub fn new() -> Result<Self> {
        let instance = wgpu::Instance::default();
        let adapter = block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| anyhow!("no suitable accelerator adapter found"))?;

        let adapter_info = adapter.get_info();
        let (device, queue) = block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("StressForge Accelerator"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
            None,
        ))?;

        let info = AcceleratorInfo {
            name: adapter_info.name.clone(),
            backend: format!("{:?}", adapter_info.backend),
        };
        info!(device = %info.name, backend = %info.backend, "accelerator context ready");

        Ok(Self {
            device,
            queue,
            info,
        })
    }

    pub fn info(&self) -> &AcceleratorInfo {
        &self.info
    }
}

/// Square-then-add reduction executed on the accelerator.
///
/// Uploads `v[i] = i + 1`, squares on the device, then runs `size - 1`
/// adjacent-add rounds ping-ponging between two storage buffers inside one
/// compute pass. Every round combines over the full buffer; the stale tail
/// past the logical length never feeds back into element zero, the only
/// value the reduction depends on. The final square root happens on the
/// host after readback.
pub struct AcceleratorReduction {
    context: AcceleratorContext,
    square_pipeline: wgpu::ComputePipeline,
    square_layout: wgpu::BindGroupLayout,
    combine_pipeline: wgpu::ComputePipeline,
    combine_layout: wgpu::BindGroupLayout,
}

impl AcceleratorReduction {
    pub fn new() -> Result<Self> {
        let context = AcceleratorContext::new()?;
        let device = &context.device;

        let square_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("square_layout"),
            entries: &[storage_entry(0, false)],
        });
        let combine_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("combine_layout"),
            entries: &[storage_entry(0, true), storage_entry(1, false)],
        });

        let square_pipeline = build_pipeline(
            device,
            "square",
            &square_layout,
            &square_shader_source(WORKGROUP_SIZE),
        );
        let combine_pipeline = build_pipeline(
            device,
            "combine",
            &combine_layout,
            &combine_shader_source(WORKGROUP_SIZE),
        );

        Ok(Self {
            context,
            square_pipeline,
            square_layout,
            combine_pipeline,
            combine_layout,
        })
    }

    pub fn info(&self) -> &AcceleratorInfo {
        self.context.info()
    }
}

impl WorkloadKernel for AcceleratorReduction {
    fn name(&self) -> &'static str {
        "accelerator-square-sum"
    }

    fn run(&self, size: u32) -> Result<Duration> {
        ensure!(size >= 2, "workload size must be at least 2, got {size}");
        let device = &self.context.device;
        let start = Instant::now();

        let values: Vec<f32> = (1..=size).map(|i| i as f32).collect();
        let buffer_size = (values.len() * std::mem::size_of::<f32>()) as u64;

        let buffer_a = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("reduction_a"),
            contents: cast_slice(&values),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        });
        let buffer_b = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("reduction_b"),
            size: buffer_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("staging"),
            size: std::mem::size_of::<f32>() as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let square_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("square_group"),
            layout: &self.square_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer_a.as_entire_binding(),
            }],
        });
        let forward = self.combine_group("combine_forward", &buffer_a, &buffer_b);
        let backward = self.combine_group("combine_backward", &buffer_b, &buffer_a);

        let workgroups = size.div_ceil(WORKGROUP_SIZE).max(1);
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("reduction_encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("reduction_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.square_pipeline);
            pass.set_bind_group(0, &square_group, &[]);
            pass.dispatch_workgroups(workgroups, 1, 1);

            pass.set_pipeline(&self.combine_pipeline);
            for round in 0..size - 1 {
                let group = if round % 2 == 0 { &forward } else { &backward };
                pass.set_bind_group(0, group, &[]);
                pass.dispatch_workgroups(workgroups, 1, 1);
            }
        }

        // After an odd number of rounds the result sits in the ping buffer.
        let final_buffer = if (size - 1) % 2 == 1 {
            &buffer_b
        } else {
            &buffer_a
        };
        encoder.copy_buffer_to_buffer(
            final_buffer,
            0,
            &staging,
            0,
            std::mem::size_of::<f32>() as u64,
        );
        self.context.queue.submit(Some(encoder.finish()));
        device.poll(wgpu::Maintain::Wait);

        let slice = staging.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = sender.send(res);
        });
        device.poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|_| anyhow!("failed to receive accelerator map signal"))??;
        let data = slice.get_mapped_range();
        let result = cast_slice::<u8, f32>(&data)[0];
        drop(data);
        staging.unmap();
        black_box(result.sqrt());

        Ok(start.elapsed())
    }
}

impl AcceleratorReduction {
    fn combine_group(
        &self,
        label: &str,
        input: &wgpu::Buffer,
        output: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        self.context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &self.combine_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: input.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: output.as_entire_binding(),
                    },
                ],
            })
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn build_pipeline(
    device: &wgpu::Device,
    name: &str,
    layout: &wgpu::BindGroupLayout,
    source: &str,
) -> wgpu::ComputePipeline {
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(name),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(name),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    });
    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(name),
        layout: Some(&pipeline_layout),
        module: &module,
        entry_point: "main",
    })
}

fn square_shader_source(workgroup: u32) -> String {
    format!(
        r#"
@group(0) @binding(0)
var<storage, read_write> data: array<f32>;

@compute @workgroup_size({workgroup}, 1, 1)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {{
  let i = gid.x;
  if (i >= arrayLength(&data)) {{
    return;
  }}
  let x = data[i];
  data[i] = x * x;
}}
"#
    )
}

fn combine_shader_source(workgroup: u32) -> String {
    format!(
        r#"
@group(0) @binding(0)
var<storage, read> input: array<f32>;

@group(0) @binding(1)
var<storage, read_write> output: array<f32>;

@compute @workgroup_size({workgroup}, 1, 1)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {{
  let i = gid.x;
  let n = arrayLength(&input);
  if (i >= n) {{
    return;
  }}
  if (i + 1u < n) {{
    output[i] = input[i] + input[i + 1u];
  }} else {{
    output[i] = input[i];
  }}
}}
"#
    )
}
