use std::ops::Range;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::render::deferred::{ColorAttachment, GBufferStorage, GeometryInstance, ViewTransforms};
use crate::render::RenderError;
use crate::scene::{Camera, Mesh, MeshVertex, Scene};

use super::attachments::{GpuGBuffer, GBUFFER_COLOR_FORMAT, GBUFFER_DEPTH_FORMAT};

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct CameraUniform {
    projection: [[f32; 4]; 4],
}

struct MeshBuffers {
    vbo: wgpu::Buffer,
    ibo: wgpu::Buffer,
    index_count: u32,
}

/// Geometry pass: one pipeline for every opaque instance, surface parameters
/// in the instance buffer.
///
/// Mesh buffers are uploaded the first time a mesh index is seen. Meshes in a
/// [`Scene`] are append-only, so one renderer should serve one scene.
#[derive(Default)]
pub(super) struct GeometryRenderer {
    pipeline: Option<wgpu::RenderPipeline>,

    bind_group_layout: Option<wgpu::BindGroupLayout>,
    bind_group: Option<wgpu::BindGroup>,
    camera_ubo: Option<wgpu::Buffer>,

    meshes: Vec<MeshBuffers>,

    instance_vbo: Option<wgpu::Buffer>,
    instance_capacity: usize,
}

impl GeometryRenderer {
    pub(super) fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        gbuffer: &GpuGBuffer,
        scene: &Scene,
        camera: &Camera,
    ) -> Result<(), RenderError> {
        self.ensure_pipeline(device);
        self.ensure_bindings(device);
        self.ensure_meshes(device, scene.meshes());

        // Instances grouped by mesh so each mesh is one instanced draw.
        let view = camera.view_matrix();
        let mut instances: Vec<(usize, GeometryInstance)> = scene
            .visible_objects()
            .map(|o| {
                let transforms = ViewTransforms::new(o.transform, view);
                (o.mesh.index(), GeometryInstance::new(&transforms, &o.material))
            })
            .collect();
        if let Some((mesh, _)) = instances.iter().find(|(mesh, _)| *mesh >= self.meshes.len()) {
            return Err(RenderError::Configuration(format!("object references unknown mesh {mesh}")));
        }
        instances.sort_by_key(|(mesh, _)| *mesh);
        let batches = batch_by_mesh(&instances);

        self.write_camera_uniform(queue, camera);
        self.ensure_instance_capacity(device, instances.len());

        let Some(instance_vbo) = self.instance_vbo.as_ref() else { return Ok(()) };
        if !instances.is_empty() {
            let raw: Vec<GeometryInstance> = instances.iter().map(|(_, inst)| *inst).collect();
            queue.write_buffer(instance_vbo, 0, bytemuck::cast_slice(&raw));
        }

        let Some(pipeline) = self.pipeline.as_ref() else { return Ok(()) };
        let Some(bind_group) = self.bind_group.as_ref() else { return Ok(()) };

        let clear = wgpu::Operations {
            load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
            store: wgpu::StoreOp::Store,
        };
        let color_attachments = ColorAttachment::ALL.map(|a| {
            Some(wgpu::RenderPassColorAttachment {
                view: gbuffer.color(a).view(),
                resolve_target: None,
                ops: clear,
                depth_slice: None,
            })
        });

        // The pass runs even with no instances so the attachments are cleared.
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("lumen geometry pass"),
            color_attachments: &color_attachments,
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: gbuffer.depth().view(),
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.set_vertex_buffer(1, instance_vbo.slice(..));

        for (mesh, range) in batches {
            let buffers = &self.meshes[mesh];
            rpass.set_vertex_buffer(0, buffers.vbo.slice(..));
            rpass.set_index_buffer(buffers.ibo.slice(..), wgpu::IndexFormat::Uint32);
            rpass.draw_indexed(0..buffers.index_count, 0, range);
        }
        Ok(())
    }

    fn ensure_pipeline(&mut self, device: &wgpu::Device) {
        if self.pipeline.is_some() {
            return;
        }

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("lumen gbuffer shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/gbuffer.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lumen gbuffer bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<CameraUniform>() as u64),
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lumen gbuffer pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let target = Some(wgpu::ColorTargetState {
            format: GBUFFER_COLOR_FORMAT,
            blend: None,
            write_mask: wgpu::ColorWrites::ALL,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("lumen gbuffer pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[MeshVertex::layout(), GeometryInstance::layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[target.clone(), target.clone(), target],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: Some(wgpu::DepthStencilState {
                format: GBUFFER_DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),

            multiview_mask: None,
            cache: None,
        });

        log::debug!("geometry pipeline created");

        self.pipeline = Some(pipeline);
        self.bind_group_layout = Some(bind_group_layout);

        self.bind_group = None;
        self.camera_ubo = None;
    }

    fn ensure_bindings(&mut self, device: &wgpu::Device) {
        if self.bind_group.is_some() && self.camera_ubo.is_some() {
            return;
        }
        let Some(bgl) = self.bind_group_layout.as_ref() else { return };

        let camera_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lumen gbuffer camera ubo"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lumen gbuffer bind group"),
            layout: bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_ubo.as_entire_binding(),
            }],
        });

        self.camera_ubo = Some(camera_ubo);
        self.bind_group = Some(bind_group);
    }

    fn ensure_meshes(&mut self, device: &wgpu::Device, meshes: &[Mesh]) {
        for (index, mesh) in meshes.iter().enumerate().skip(self.meshes.len()) {
            let vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("lumen mesh vbo"),
                contents: bytemuck::cast_slice(&mesh.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let ibo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("lumen mesh ibo"),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            log::debug!(
                "uploaded mesh {index}: {} vertices, {} triangles",
                mesh.vertices.len(),
                mesh.triangle_count()
            );
            self.meshes.push(MeshBuffers {
                vbo,
                ibo,
                index_count: mesh.indices.len() as u32,
            });
        }
    }

    fn write_camera_uniform(&self, queue: &wgpu::Queue, camera: &Camera) {
        let Some(ubo) = self.camera_ubo.as_ref() else { return };
        let u = CameraUniform {
            projection: camera.projection_matrix().to_cols_array_2d(),
        };
        queue.write_buffer(ubo, 0, bytemuck::bytes_of(&u));
    }

    fn ensure_instance_capacity(&mut self, device: &wgpu::Device, required_instances: usize) {
        if required_instances <= self.instance_capacity && self.instance_vbo.is_some() {
            return;
        }

        let new_cap = required_instances.next_power_of_two().max(64);
        let new_size = (new_cap * std::mem::size_of::<GeometryInstance>()) as u64;

        self.instance_vbo = Some(device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lumen gbuffer instance vbo"),
            size: new_size,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.instance_capacity = new_cap;
    }
}

/// Consecutive runs of equal mesh index, as `(mesh, instance range)`.
fn batch_by_mesh<T>(sorted: &[(usize, T)]) -> Vec<(usize, Range<u32>)> {
    let mut batches = Vec::new();
    let mut i = 0;
    while i < sorted.len() {
        let mesh = sorted[i].0;
        let mut j = i + 1;
        while j < sorted.len() && sorted[j].0 == mesh {
            j += 1;
        }
        batches.push((mesh, i as u32..j as u32));
        i = j;
    }
    batches
}
