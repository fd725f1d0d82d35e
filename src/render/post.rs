//! Post-processing chain: brightpass, separable Gaussian blur, composite.
//! The scene renders into an HDR offscreen target; the composite pass adds
//! bloom, vignette, scanline glitch and the TV-static burst, all driven by
//! parameter cells the sequencer writes.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::config::PostConfig;
use crate::sequencer::params::{Param, ParamSet};

pub const SCENE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct PostUniforms {
    texel: [f32; 2],
    direction: [f32; 2],
    bloom_strength: f32,
    bloom_threshold: f32,
    vignette: f32,
    corruption: f32,
    static_burst: f32,
    time: f32,
    _pad: [f32; 2],
}

struct PostTarget {
    view: wgpu::TextureView,
}

impl PostTarget {
    fn new(device: &wgpu::Device, label: &str, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SCENE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        Self {
            view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
        }
    }
}

/// One blit pass: a pipeline plus a per-pass uniform buffer. The bind group is
/// rebuilt on resize because it captures texture views.
struct Blit {
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

pub struct PostChain {
    cfg: PostConfig,
    bright_pipeline: wgpu::RenderPipeline,
    blur_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    scene: PostTarget,
    bright: PostTarget,
    blur_a: PostTarget,
    blur_b: PostTarget,
    brightpass: Blit,
    blur_h: Blit,
    blur_v: Blit,
    composite: Blit,
    size: (u32, u32),
}

impl PostChain {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        cfg: &PostConfig,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("post-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/post.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("post-bgl"),
            entries: &[
                texture_entry(0),
                texture_entry(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("post-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let make_pipeline = |label: &str, entry: &str, format: wgpu::TextureFormat| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_fullscreen"),
                    buffers: &[],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(entry),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            })
        };

        let bright_pipeline = make_pipeline("post-brightpass", "fs_brightpass", SCENE_FORMAT);
        let blur_pipeline = make_pipeline("post-blur", "fs_blur", SCENE_FORMAT);
        let composite_pipeline = make_pipeline("post-composite", "fs_composite", surface_format);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("post-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let scene = PostTarget::new(device, "post-scene", width, height);
        let bright = PostTarget::new(device, "post-bright", width, height);
        let blur_a = PostTarget::new(device, "post-blur-a", width, height);
        let blur_b = PostTarget::new(device, "post-blur-b", width, height);

        let make_blit = |label: &str, a: &wgpu::TextureView, b: &wgpu::TextureView| {
            let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::bytes_of(&PostUniforms::zeroed()),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(a),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(b),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                ],
            });
            Blit {
                uniform_buffer,
                bind_group,
            }
        };

        let brightpass = make_blit("post-brightpass-bind", &scene.view, &scene.view);
        let blur_h = make_blit("post-blur-h-bind", &bright.view, &bright.view);
        let blur_v = make_blit("post-blur-v-bind", &blur_a.view, &blur_a.view);
        let composite = make_blit("post-composite-bind", &scene.view, &blur_b.view);

        Self {
            cfg: cfg.clone(),
            bright_pipeline,
            blur_pipeline,
            composite_pipeline,
            bind_group_layout,
            sampler,
            scene,
            bright,
            blur_a,
            blur_b,
            brightpass,
            blur_h,
            blur_v,
            composite,
            size: (width.max(1), height.max(1)),
        }
    }

    /// Offscreen HDR view the scene pass renders into.
    pub fn scene_view(&self) -> &wgpu::TextureView {
        &self.scene.view
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.size = (width.max(1), height.max(1));
        self.scene = PostTarget::new(device, "post-scene", width, height);
        self.bright = PostTarget::new(device, "post-bright", width, height);
        self.blur_a = PostTarget::new(device, "post-blur-a", width, height);
        self.blur_b = PostTarget::new(device, "post-blur-b", width, height);
        self.rebind(device);
    }

    fn rebind(&mut self, device: &wgpu::Device) {
        let rebuild = |blit: &mut Blit, label: &str, a: &wgpu::TextureView, b: &wgpu::TextureView| {
            blit.bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &self.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(a),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(b),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: blit.uniform_buffer.as_entire_binding(),
                    },
                ],
            });
        };
        rebuild(
            &mut self.brightpass,
            "post-brightpass-bind",
            &self.scene.view,
            &self.scene.view,
        );
        rebuild(
            &mut self.blur_h,
            "post-blur-h-bind",
            &self.bright.view,
            &self.bright.view,
        );
        rebuild(
            &mut self.blur_v,
            "post-blur-v-bind",
            &self.blur_a.view,
            &self.blur_a.view,
        );
        rebuild(
            &mut self.composite,
            "post-composite-bind",
            &self.scene.view,
            &self.blur_b.view,
        );
    }

    /// Run the chain, compositing into `target` (normally the surface view).
    pub fn run(
        &self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        params: &ParamSet,
        target: &wgpu::TextureView,
    ) {
        let texel = [1.0 / self.size.0 as f32, 1.0 / self.size.1 as f32];
        let base = PostUniforms {
            texel,
            direction: [0.0, 0.0],
            bloom_strength: self.cfg.bloom_strength,
            bloom_threshold: self.cfg.bloom_threshold,
            vignette: params.get(Param::Vignette),
            corruption: (params.get(Param::Corruption) * 0.1).min(1.5),
            static_burst: params.get(Param::StaticBurst),
            time: params.get(Param::Time),
            _pad: [0.0; 2],
        };
        queue.write_buffer(
            &self.brightpass.uniform_buffer,
            0,
            bytemuck::bytes_of(&base),
        );
        queue.write_buffer(
            &self.blur_h.uniform_buffer,
            0,
            bytemuck::bytes_of(&PostUniforms {
                direction: [1.0, 0.0],
                ..base
            }),
        );
        queue.write_buffer(
            &self.blur_v.uniform_buffer,
            0,
            bytemuck::bytes_of(&PostUniforms {
                direction: [0.0, 1.0],
                ..base
            }),
        );
        queue.write_buffer(&self.composite.uniform_buffer, 0, bytemuck::bytes_of(&base));

        self.blit(
            encoder,
            "post-brightpass",
            &self.bright_pipeline,
            &self.brightpass.bind_group,
            &self.bright.view,
        );
        self.blit(
            encoder,
            "post-blur-h",
            &self.blur_pipeline,
            &self.blur_h.bind_group,
            &self.blur_a.view,
        );
        self.blit(
            encoder,
            "post-blur-v",
            &self.blur_pipeline,
            &self.blur_v.bind_group,
            &self.blur_b.view,
        );
        self.blit(
            encoder,
            "post-composite",
            &self.composite_pipeline,
            &self.composite.bind_group,
            target,
        );
    }

    fn blit(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        label: &str,
        pipeline: &wgpu::RenderPipeline,
        bind_group: &wgpu::BindGroup,
        target: &wgpu::TextureView,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
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
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}
