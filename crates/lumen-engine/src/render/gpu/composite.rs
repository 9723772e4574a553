use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::lighting::{GpuLight, LightSample};
use crate::render::deferred::{ColorAttachment, GBufferReader, GBufferStorage, LightingCompositeProgram};
use crate::render::{RenderError, RenderTarget};

use super::attachments::GpuGBuffer;
use super::quad::{QuadVertex, QUAD_INDICES, QUAD_VERTICES};

/// Uniform header, followed by `slots` [`GpuLight`] records.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct CompositeHeader {
    camera_world: [[f32; 4]; 4],
    /// x = attenuation constant.
    params: [f32; 4],
}

/// WGSL source specialized for `light_count` lights.
pub(super) fn specialize_source(light_count: usize) -> String {
    include_str!("shaders/composite.wgsl")
        .replace("{{LIGHT_COUNT}}", &light_count.to_string())
        .replace("{{LIGHT_SLOTS}}", &light_slots(light_count).to_string())
}

/// WGSL arrays cannot be empty; a zero-light program keeps one unused slot.
#[inline]
fn light_slots(light_count: usize) -> usize {
    light_count.max(1)
}

fn uniform_size(light_count: usize) -> u64 {
    (std::mem::size_of::<CompositeHeader>() + light_slots(light_count) * std::mem::size_of::<GpuLight>()) as u64
}

/// Full-screen lighting composite into the display target.
pub(super) struct CompositeRenderer {
    light_count: usize,
    surface_format: wgpu::TextureFormat,

    pipeline: Option<wgpu::RenderPipeline>,

    bind_group_layout: Option<wgpu::BindGroupLayout>,
    bind_group: Option<wgpu::BindGroup>,
    /// G-buffer generation `bind_group` was built against.
    bound_generation: Option<u64>,
    uniform: Option<wgpu::Buffer>,

    quad_vbo: Option<wgpu::Buffer>,
    quad_ibo: Option<wgpu::Buffer>,
}

impl CompositeRenderer {
    pub(super) fn new(program: &LightingCompositeProgram, surface_format: wgpu::TextureFormat) -> Self {
        Self {
            light_count: program.light_count(),
            surface_format,
            pipeline: None,
            bind_group_layout: None,
            bind_group: None,
            bound_generation: None,
            uniform: None,
            quad_vbo: None,
            quad_ibo: None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(super) fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: &mut RenderTarget<'_>,
        gbuffer: &GBufferReader<'_, GpuGBuffer>,
        program: &LightingCompositeProgram,
        lights: &[LightSample],
        camera_world: Mat4,
    ) -> Result<(), RenderError> {
        program.validate(lights.len())?;

        self.ensure_pipeline(device);
        self.ensure_static_buffers(device);
        self.ensure_bindings(device, gbuffer);

        self.write_uniform(queue, program, lights, camera_world);

        let Some(pipeline) = self.pipeline.as_ref() else { return Ok(()) };
        let Some(bind_group) = self.bind_group.as_ref() else { return Ok(()) };
        let Some(quad_vbo) = self.quad_vbo.as_ref() else { return Ok(()) };
        let Some(quad_ibo) = self.quad_ibo.as_ref() else { return Ok(()) };

        let c = program.config().clear_color;
        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("lumen composite pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: c.x as f64,
                        g: c.y as f64,
                        b: c.z as f64,
                        a: c.w as f64,
                    }),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.set_vertex_buffer(0, quad_vbo.slice(..));
        rpass.set_index_buffer(quad_ibo.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..1);
        Ok(())
    }

    fn ensure_pipeline(&mut self, device: &wgpu::Device) {
        if self.pipeline.is_some() {
            return;
        }

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("lumen composite shader"),
            source: wgpu::ShaderSource::Wgsl(specialize_source(self.light_count).into()),
        });

        let gbuffer_texture = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lumen composite bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(uniform_size(self.light_count)),
                    },
                    count: None,
                },
                gbuffer_texture(1),
                gbuffer_texture(2),
                gbuffer_texture(3),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lumen composite pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("lumen composite pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[QuadVertex::layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),

            multiview_mask: None,
            cache: None,
        });

        log::debug!(
            "composite pipeline created ({} lights, {:?})",
            self.light_count,
            self.surface_format
        );

        self.pipeline = Some(pipeline);
        self.bind_group_layout = Some(bind_group_layout);

        self.bind_group = None;
        self.bound_generation = None;
        self.uniform = None;
    }

    /// Rebuilds the bind group whenever the G-buffer was reallocated.
    fn ensure_bindings(&mut self, device: &wgpu::Device, gbuffer: &GBufferReader<'_, GpuGBuffer>) {
        if self.bind_group.is_some() && self.bound_generation == Some(gbuffer.generation()) {
            return;
        }
        let Some(bgl) = self.bind_group_layout.as_ref() else { return };

        let uniform = match self.uniform.take() {
            Some(buffer) => buffer,
            None => device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("lumen composite ubo"),
                size: uniform_size(self.light_count),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }),
        };

        let view = |a: ColorAttachment| gbuffer.storage().color(a).view();
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lumen composite bind group"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(view(ColorAttachment::Albedo)),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(view(ColorAttachment::NormalEmissive)),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(view(ColorAttachment::FragPos)),
                },
            ],
        });

        self.uniform = Some(uniform);
        self.bind_group = Some(bind_group);
        self.bound_generation = Some(gbuffer.generation());
    }

    fn ensure_static_buffers(&mut self, device: &wgpu::Device) {
        if self.quad_vbo.is_some() && self.quad_ibo.is_some() {
            return;
        }

        self.quad_vbo = Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("lumen composite quad vbo"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        }));

        self.quad_ibo = Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("lumen composite quad ibo"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        }));
    }

    fn write_uniform(
        &self,
        queue: &wgpu::Queue,
        program: &LightingCompositeProgram,
        lights: &[LightSample],
        camera_world: Mat4,
    ) {
        let Some(ubo) = self.uniform.as_ref() else { return };
        queue.write_buffer(ubo, 0, &uniform_bytes(program, lights, camera_world));
    }
}

/// Uniform contents: header then one record per slot, unused slots zeroed.
fn uniform_bytes(program: &LightingCompositeProgram, lights: &[LightSample], camera_world: Mat4) -> Vec<u8> {
    let header = CompositeHeader {
        camera_world: camera_world.to_cols_array_2d(),
        params: [program.attenuation(), 0.0, 0.0, 0.0],
    };

    let mut records: Vec<GpuLight> = lights.iter().map(|l| l.to_gpu()).collect();
    records.resize(light_slots(program.light_count()), GpuLight::zeroed());

    let mut bytes = Vec::with_capacity(uniform_size(program.light_count()) as usize);
    bytes.extend_from_slice(bytemuck::bytes_of(&header));
    bytes.extend_from_slice(bytemuck::cast_slice(&records));
    bytes
}
