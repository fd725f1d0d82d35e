//! GPU layer. `Gfx` owns the window surface and device for the whole run;
//! `SceneRenderer` owns the point-field pipelines and post chain and is
//! mounted only while the cinematic plays, so its teardown releases the heavy
//! buffers while the HUD keeps drawing through the remaining stages.

pub mod camera;
pub mod point_field;
pub mod post;

use std::sync::Arc;

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};
use tracing::{debug, info};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::config::Configuration;
use crate::sequencer::params::{ColorCell, Param, ParamSet};
use camera::CameraRig;
use point_field::PointField;
use post::PostChain;

/// Surface, device and queue; alive from window creation to exit.
pub struct Gfx {
    pub surface: wgpu::Surface<'static>,
    pub surface_config: wgpu::SurfaceConfiguration,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl Gfx {
    pub fn new(window: Arc<Window>) -> Result<Self> {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window.clone())
            .context("failed to create surface")?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to acquire GPU adapter")?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|fmt| fmt.is_srgb())
            .unwrap_or(caps.formats[0]);

        let limits = adapter.limits();
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("landing-device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits,
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
        }))
        .context("failed to acquire GPU device")?;

        let size = window.inner_size();
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);
        info!(
            width = surface_config.width,
            height = surface_config.height,
            format = ?surface_config.format,
            "surface configured",
        );

        Ok(Self {
            surface,
            surface_config,
            device,
            queue,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
    }

    pub fn aspect(&self) -> f32 {
        self.surface_config.width as f32 / self.surface_config.height.max(1) as f32
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct SceneUniforms {
    view_proj: [[f32; 4]; 4],
    near_color: [f32; 4],
    far_color: [f32; 4],
    viewport: [f32; 2],
    time: f32,
    opacity: f32,
    pulse: f32,
    collapse: f32,
    corruption: f32,
    form: f32,
    danger: f32,
    flow: f32,
    tunnel_length: f32,
    _pad: f32,
}

/// Palette cells are RGB; the shader wants vec4. Alpha comes from the opacity
/// uniform, so the padded component is always 1.
fn opaque(c: [f32; 3]) -> [f32; 4] {
    [c[0], c[1], c[2], 1.0]
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct PointInstance {
    position: [f32; 3],
    size: f32,
    color: [f32; 3],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct LineVertex {
    position: [f32; 3],
    color: [f32; 3],
}

impl PointInstance {
    const ATTRS: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32, 2 => Float32x3];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

impl LineVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Point-field renderer plus post chain. Dropped wholesale on unmount.
pub struct SceneRenderer {
    point_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    instance_buffer: wgpu::Buffer,
    instance_count: u32,
    line_buffer: wgpu::Buffer,
    line_count: u32,
    post: PostChain,
    tunnel_length: f32,
    stopped: bool,
}

impl SceneRenderer {
    pub fn new(gfx: &Gfx, cfg: &Configuration, field: &PointField) -> Result<Self> {
        let device = &gfx.device;
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("point-field-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/points.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene-bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        // Additive blending so dense regions of the field glow.
        let additive = wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent::OVER,
        };

        let point_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("point-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_point"),
                buffers: &[PointInstance::layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_point"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: post::SCENE_FORMAT,
                    blend: Some(additive),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let line_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("line-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_line"),
                buffers: &[LineVertex::layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_line"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: post::SCENE_FORMAT,
                    blend: Some(additive),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("scene-uniforms"),
            contents: bytemuck::bytes_of(&SceneUniforms::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene-bind-group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let instances: Vec<PointInstance> = field
            .points
            .iter()
            .map(|p| PointInstance {
                position: p.position.to_array(),
                size: p.size,
                color: p.color,
            })
            .collect();
        let lines: Vec<LineVertex> = field
            .links
            .iter()
            .flat_map(|&(a, b)| {
                [a, b].map(|idx| {
                    let p = &field.points[idx as usize];
                    LineVertex {
                        position: p.position.to_array(),
                        color: p.color,
                    }
                })
            })
            .collect();

        // Zero-length buffers are invalid; keep one dummy element and a zero
        // draw count when the field is empty.
        let dummy_instance = PointInstance::zeroed();
        let instance_bytes: &[u8] = if instances.is_empty() {
            bytemuck::bytes_of(&dummy_instance)
        } else {
            bytemuck::cast_slice(&instances)
        };
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("point-instances"),
            contents: instance_bytes,
            usage: wgpu::BufferUsages::VERTEX,
        });
        let dummy_line = LineVertex::zeroed();
        let line_bytes: &[u8] = if lines.is_empty() {
            bytemuck::bytes_of(&dummy_line)
        } else {
            bytemuck::cast_slice(&lines)
        };
        let line_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("line-vertices"),
            contents: line_bytes,
            usage: wgpu::BufferUsages::VERTEX,
        });

        let post = PostChain::new(
            device,
            gfx.surface_config.format,
            gfx.surface_config.width,
            gfx.surface_config.height,
            &cfg.post,
        );

        debug!(
            points = instances.len(),
            line_vertices = lines.len(),
            "scene renderer mounted"
        );

        Ok(Self {
            point_pipeline,
            line_pipeline,
            uniform_buffer,
            bind_group,
            instance_buffer,
            instance_count: instances.len() as u32,
            line_buffer,
            line_count: lines.len() as u32,
            post,
            tunnel_length: cfg.point_field.tunnel_length,
            stopped: false,
        })
    }

    pub fn resize(&mut self, gfx: &Gfx) {
        self.post
            .resize(&gfx.device, gfx.surface_config.width, gfx.surface_config.height);
    }

    /// Mark the renderer stopped; later `render` calls are no-ops. Safe to
    /// call more than once.
    pub fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            debug!("scene renderer stopped");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Draw the field into the offscreen target and run the post chain into
    /// `target`. Empty geometry draws nothing but the passes still clear.
    pub fn render(
        &mut self,
        gfx: &Gfx,
        encoder: &mut wgpu::CommandEncoder,
        params: &ParamSet,
        rig: &CameraRig,
        target: &wgpu::TextureView,
    ) {
        if self.stopped {
            return;
        }

        let uniforms = SceneUniforms {
            view_proj: rig.view_proj(gfx.aspect()).to_cols_array_2d(),
            near_color: opaque(params.color(ColorCell::Near)),
            far_color: opaque(params.color(ColorCell::Far)),
            viewport: [
                gfx.surface_config.width as f32,
                gfx.surface_config.height as f32,
            ],
            time: params.get(Param::Time),
            opacity: params.get(Param::Opacity),
            pulse: params.get(Param::Pulse),
            collapse: params.get(Param::Collapse),
            corruption: params.get(Param::Corruption),
            form: params.get(Param::Form),
            danger: params.get(Param::Danger),
            flow: params.get(Param::Flow),
            tunnel_length: self.tunnel_length,
            _pad: 0.0,
        };
        gfx.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: self.post.scene_view(),
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            if self.line_count > 0 {
                pass.set_pipeline(&self.line_pipeline);
                pass.set_bind_group(0, &self.bind_group, &[]);
                pass.set_vertex_buffer(0, self.line_buffer.slice(..));
                pass.draw(0..self.line_count, 0..1);
            }
            if self.instance_count > 0 {
                pass.set_pipeline(&self.point_pipeline);
                pass.set_bind_group(0, &self.bind_group, &[]);
                pass.set_vertex_buffer(0, self.instance_buffer.slice(..));
                pass.draw(0..6, 0..self.instance_count);
            }
        }

        self.post.run(&gfx.queue, encoder, params, target);
    }
}
