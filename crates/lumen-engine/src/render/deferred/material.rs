//! Geometry-pass surface contract.
//!
//! Vertex stage:
//! - `view_normal = normalize(normal_matrix * normal)` where `normal_matrix`
//!   is the inverse-transpose of the model-view upper 3x3
//! - `view_pos = (model_view * vec4(position, 1)).xyz`
//!
//! Fragment stage writes every covered pixel unconditionally (no discard, no
//! blending):
//! - albedo          = (base_color, 1)
//! - normal_emissive = (view_normal, emissive)
//! - frag_pos        = (view_pos, 0)
//!
//! `shaders/gbuffer.wgsl` implements the same contract on the GPU.

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec3, Vec4};

use crate::scene::SurfaceMaterial;

/// Values of one G-buffer pixel across the three color attachments.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GBufferTexel {
    pub albedo: Vec4,
    pub normal_emissive: Vec4,
    pub frag_pos: Vec4,
}

impl GBufferTexel {
    /// Clear value. Alpha is zero in every attachment so uncovered pixels
    /// carry no emissive term.
    pub const CLEAR: GBufferTexel = GBufferTexel {
        albedo: Vec4::ZERO,
        normal_emissive: Vec4::ZERO,
        frag_pos: Vec4::ZERO,
    };

    #[inline]
    pub fn emissive(&self) -> f32 {
        self.normal_emissive.w
    }
}

impl Default for GBufferTexel {
    fn default() -> Self {
        Self::CLEAR
    }
}

/// Model-view and normal matrices of one instance for the current camera.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewTransforms {
    pub model_view: Mat4,
    pub normal_matrix: Mat3,
}

impl ViewTransforms {
    pub fn new(model: Mat4, view: Mat4) -> Self {
        let model_view = view * model;
        let normal_matrix = Mat3::from_mat4(model_view).inverse().transpose();
        Self {
            model_view,
            normal_matrix,
        }
    }

    /// Vertex stage: returns `(view_normal, view_pos)`.
    #[inline]
    pub fn vertex(&self, position: Vec3, normal: Vec3) -> (Vec3, Vec3) {
        let view_normal = (self.normal_matrix * normal).normalize_or_zero();
        let view_pos = self.model_view.transform_point3(position);
        (view_normal, view_pos)
    }
}

/// Fragment stage.
#[inline]
pub fn shade_fragment(view_normal: Vec3, view_pos: Vec3, material: &SurfaceMaterial) -> GBufferTexel {
    GBufferTexel {
        albedo: material.base_color.extend(1.0),
        normal_emissive: view_normal.extend(material.emissive),
        frag_pos: view_pos.extend(0.0),
    }
}

/// Per-instance vertex data for the GPU geometry pass.
///
/// Matrices are column-major. The normal matrix columns are padded to vec4.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct GeometryInstance {
    pub model_view: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 3],
    /// rgb = base color, a = emissive intensity.
    pub surface: [f32; 4],
}

impl GeometryInstance {
    const ATTRS: [wgpu::VertexAttribute; 8] = wgpu::vertex_attr_array![
        2 => Float32x4, // model_view col 0
        3 => Float32x4, // model_view col 1
        4 => Float32x4, // model_view col 2
        5 => Float32x4, // model_view col 3
        6 => Float32x4, // normal_matrix col 0
        7 => Float32x4, // normal_matrix col 1
        8 => Float32x4, // normal_matrix col 2
        9 => Float32x4  // surface
    ];

    pub fn new(transforms: &ViewTransforms, material: &SurfaceMaterial) -> Self {
        let n = transforms.normal_matrix;
        Self {
            model_view: transforms.model_view.to_cols_array_2d(),
            normal_matrix: [
                n.x_axis.extend(0.0).to_array(),
                n.y_axis.extend(0.0).to_array(),
                n.z_axis.extend(0.0).to_array(),
            ],
            surface: material.base_color.extend(material.emissive).to_array(),
        }
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GeometryInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}
