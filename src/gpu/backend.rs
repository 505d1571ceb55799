//! wgpu draw sink
//!
//! Every program gets its own pipeline, vertex/index buffers and uniform
//! buffer. `submit()` uploads the live bytes of a renderer and queues the
//! draw; `encode()` replays the queued draws in one render pass, in
//! submission order.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};
use wgpu::util::DeviceExt;

use crate::core::{
    AttributeFormat, DepthVertex, DrawCall, DrawSink, FlatVertex, GraphicsOptions, NodeShape,
    PackedColor, ProgramKind, RenderError, Result, Topology, Uniforms, VertexLayout,
};
use crate::node::texture::{circle_texture, CIRCLE_TEXTURE_SIZE};
use crate::node::PointVertex;

/// Smallest buffer allocation in bytes
const MIN_BUFFER_SIZE: u64 = 1024;

/// Acquire a device and queue from the default adapter.
pub async fn request_device() -> Result<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .ok_or_else(|| RenderError::BackendUnavailable("no compatible GPU adapter found".into()))?;

    let info = adapter.get_info();
    info!(adapter = %info.name, backend = ?info.backend, "GPU adapter acquired");

    adapter
        .request_device(&wgpu::DeviceDescriptor::default(), None)
        .await
        .map_err(|e| RenderError::BackendUnavailable(format!("device request failed: {e}")))
}

fn vertex_format(format: AttributeFormat) -> wgpu::VertexFormat {
    match format {
        AttributeFormat::Float32 => wgpu::VertexFormat::Float32,
        AttributeFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
        AttributeFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
        AttributeFormat::Unorm8x4 => wgpu::VertexFormat::Unorm8x4,
    }
}

fn vertex_attributes(layout: VertexLayout) -> Vec<wgpu::VertexAttribute> {
    layout
        .attributes
        .iter()
        .map(|attr| wgpu::VertexAttribute {
            offset: attr.offset as wgpu::BufferAddress,
            shader_location: attr.location,
            format: vertex_format(attr.format),
        })
        .collect()
}

fn primitive_topology(topology: Topology) -> wgpu::PrimitiveTopology {
    match topology {
        Topology::Points => wgpu::PrimitiveTopology::PointList,
        Topology::Lines => wgpu::PrimitiveTopology::LineList,
        Topology::Triangles => wgpu::PrimitiveTopology::TriangleList,
    }
}

fn grown_size(required: u64) -> u64 {
    required.max(MIN_BUFFER_SIZE).next_power_of_two()
}

/// Static description of one program variant.
struct ProgramSpec {
    kind: ProgramKind,
    layout: VertexLayout,
    topology: Topology,
    instanced: bool,
    vs_entry: &'static str,
    fs_entry: &'static str,
}

fn program_specs() -> Vec<ProgramSpec> {
    let mut specs: Vec<ProgramSpec> = NodeShape::ALL
        .iter()
        .map(|&shape| ProgramSpec {
            kind: ProgramKind::Nodes(shape),
            layout: PointVertex::LAYOUT,
            // point sprites are 1px in wgpu; nodes are instanced quads
            topology: Topology::Triangles,
            instanced: true,
            vs_entry: "vs_main",
            fs_entry: shape.fragment_entry(),
        })
        .collect();

    specs.extend([
        ProgramSpec {
            kind: ProgramKind::DirectedNodes,
            layout: DepthVertex::LAYOUT,
            topology: Topology::Triangles,
            instanced: false,
            vs_entry: "vs_depth",
            fs_entry: "fs_main",
        },
        ProgramSpec {
            kind: ProgramKind::StraightLinks,
            layout: DepthVertex::LAYOUT,
            topology: Topology::Lines,
            instanced: false,
            vs_entry: "vs_depth",
            fs_entry: "fs_main",
        },
        ProgramSpec {
            kind: ProgramKind::CurvedLinks,
            layout: FlatVertex::LAYOUT,
            topology: Topology::Lines,
            instanced: false,
            vs_entry: "vs_flat",
            fs_entry: "fs_main",
        },
        ProgramSpec {
            kind: ProgramKind::Arrows,
            layout: FlatVertex::LAYOUT,
            topology: Topology::Triangles,
            instanced: false,
            vs_entry: "vs_flat",
            fs_entry: "fs_main",
        },
    ]);
    specs
}

/// GPU resources of one program.
struct Program {
    pipeline: wgpu::RenderPipeline,
    instanced: bool,
    bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
    vertex_buffer: wgpu::Buffer,
    index_buffer: Option<wgpu::Buffer>,
}

#[derive(Clone, Copy, Debug)]
struct QueuedDraw {
    program: ProgramKind,
    element_count: u32,
    indexed: bool,
}

/// Draw sink that renders through wgpu.
pub struct GpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    target_format: wgpu::TextureFormat,
    clear_color: Option<PackedColor>,
    programs: HashMap<ProgramKind, Program>,
    queued: Vec<QueuedDraw>,
    /// Bytes written to GPU buffers since construction
    bytes_uploaded: u64,
}

impl GpuBackend {
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        target_format: wgpu::TextureFormat,
        options: &GraphicsOptions,
    ) -> Self {
        let node_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("nodelink_nodes_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("nodes.wgsl").into()),
        });
        let line_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("nodelink_lines_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("lines.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("nodelink_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("nodelink_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let texture = device.create_texture_with_data(
            &queue,
            &wgpu::TextureDescriptor {
                label: Some("nodelink_circle_texture"),
                size: wgpu::Extent3d {
                    width: CIRCLE_TEXTURE_SIZE,
                    height: CIRCLE_TEXTURE_SIZE,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &circle_texture(CIRCLE_TEXTURE_SIZE),
        );
        let texture_view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("nodelink_circle_sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let blend = options
            .enable_blending
            .then_some(wgpu::BlendState::ALPHA_BLENDING);

        let programs = program_specs()
            .into_iter()
            .map(|spec| {
                let shader = if matches!(spec.kind, ProgramKind::Nodes(_)) {
                    &node_shader
                } else {
                    &line_shader
                };
                let label = spec.kind.label();
                let attributes = vertex_attributes(spec.layout);

                let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(label),
                    layout: Some(&pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: shader,
                        entry_point: Some(spec.vs_entry),
                        buffers: &[wgpu::VertexBufferLayout {
                            array_stride: spec.layout.stride as wgpu::BufferAddress,
                            step_mode: if spec.instanced {
                                wgpu::VertexStepMode::Instance
                            } else {
                                wgpu::VertexStepMode::Vertex
                            },
                            attributes: &attributes,
                        }],
                        compilation_options: Default::default(),
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: shader,
                        entry_point: Some(spec.fs_entry),
                        targets: &[Some(wgpu::ColorTargetState {
                            format: target_format,
                            blend,
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                        compilation_options: Default::default(),
                    }),
                    primitive: wgpu::PrimitiveState {
                        topology: primitive_topology(spec.topology),
                        ..Default::default()
                    },
                    depth_stencil: None,
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                    cache: None,
                });

                let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{label}_uniforms")),
                    contents: bytemuck::bytes_of(&Uniforms::default()),
                    usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::UNIFORM,
                });

                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("{label}_bind_group")),
                    layout: &bind_group_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: uniform_buffer.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(&texture_view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::Sampler(&sampler),
                        },
                    ],
                });

                let vertex_buffer = Self::create_buffer(
                    &device,
                    &format!("{label}_vertices"),
                    MIN_BUFFER_SIZE,
                    wgpu::BufferUsages::VERTEX,
                );

                let program = Program {
                    pipeline,
                    instanced: spec.instanced,
                    bind_group,
                    uniform_buffer,
                    vertex_buffer,
                    index_buffer: None,
                };
                (spec.kind, program)
            })
            .collect::<HashMap<_, _>>();

        debug!(programs = programs.len(), ?target_format, "GPU backend created");

        Self {
            device,
            queue,
            target_format,
            clear_color: options.clear_color.then_some(options.clear_color_value),
            programs,
            queued: Vec::new(),
            bytes_uploaded: 0,
        }
    }

    fn create_buffer(
        device: &wgpu::Device,
        label: &str,
        size: u64,
        usage: wgpu::BufferUsages,
    ) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    #[inline]
    pub fn target_format(&self) -> wgpu::TextureFormat {
        self.target_format
    }

    #[inline]
    pub fn bytes_uploaded(&self) -> u64 {
        self.bytes_uploaded
    }

    /// Draws submitted since the last `encode()`.
    pub fn queued_draws(&self) -> usize {
        self.queued.len()
    }

    /// Record one render pass into `view` replaying every queued draw, then
    /// forget them.
    pub fn encode(&mut self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        let load = match self.clear_color {
            Some(color) => {
                let [r, g, b, a] = color.to_f32_array();
                wgpu::LoadOp::Clear(wgpu::Color {
                    r: r as f64,
                    g: g as f64,
                    b: b as f64,
                    a: a as f64,
                })
            }
            None => wgpu::LoadOp::Load,
        };

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("nodelink_render_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        for draw in self.queued.drain(..) {
            let Some(program) = self.programs.get(&draw.program) else {
                continue;
            };
            render_pass.set_pipeline(&program.pipeline);
            render_pass.set_bind_group(0, &program.bind_group, &[]);
            render_pass.set_vertex_buffer(0, program.vertex_buffer.slice(..));

            match (&program.index_buffer, draw.indexed) {
                (Some(indices), true) => {
                    render_pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                    render_pass.draw_indexed(0..draw.element_count, 0, 0..1);
                }
                _ if program.instanced => render_pass.draw(0..6, 0..draw.element_count),
                _ => render_pass.draw(0..draw.element_count, 0..1),
            }
        }
    }

    /// Render queued draws into an offscreen texture of the given size and
    /// wait for the GPU to finish. Returns whether the queue drained.
    pub fn render_offscreen(&mut self, width: u32, height: u32) -> bool {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("nodelink_offscreen_target"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.target_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("nodelink_offscreen_encoder"),
            });
        self.encode(&mut encoder, &view);
        self.queue.submit(Some(encoder.finish()));
        let status = self.device.poll(wgpu::Maintain::Wait);
        let drained = status.is_queue_empty();
        debug!(queue_empty = drained, "Offscreen frame finished");
        drained
    }
}

impl DrawSink for GpuBackend {
    fn submit(&mut self, call: DrawCall<'_>) -> Result<()> {
        let label = call.program.label();
        let program = self
            .programs
            .get_mut(&call.program)
            .ok_or_else(|| RenderError::BackendUnavailable(format!("no pipeline for {label}")))?;

        let vertex_bytes = call.vertices.len() as u64;
        if vertex_bytes > program.vertex_buffer.size() {
            let size = grown_size(vertex_bytes);
            debug!(program = label, size, "Vertex buffer grown");
            program.vertex_buffer = Self::create_buffer(
                &self.device,
                &format!("{label}_vertices"),
                size,
                wgpu::BufferUsages::VERTEX,
            );
        }
        self.queue
            .write_buffer(&program.vertex_buffer, 0, call.vertices);

        let mut index_bytes = 0;
        if let Some(indices) = call.indices {
            index_bytes = std::mem::size_of_val(indices) as u64;
            let too_small = program
                .index_buffer
                .as_ref()
                .map_or(true, |buffer| index_bytes > buffer.size());
            if too_small {
                let size = grown_size(index_bytes);
                debug!(program = label, size, "Index buffer grown");
                program.index_buffer = Some(Self::create_buffer(
                    &self.device,
                    &format!("{label}_indices"),
                    size,
                    wgpu::BufferUsages::INDEX,
                ));
            }
            if let Some(buffer) = &program.index_buffer {
                self.queue
                    .write_buffer(buffer, 0, bytemuck::cast_slice(indices));
            }
        }

        if let Some(uniforms) = call.uniforms {
            self.queue
                .write_buffer(&program.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
        }

        self.bytes_uploaded += vertex_bytes + index_bytes;
        self.queued.push(QueuedDraw {
            program: call.program,
            element_count: call.element_count,
            indexed: call.indices.is_some(),
        });
        Ok(())
    }
}
