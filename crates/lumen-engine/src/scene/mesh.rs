use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Vertex format shared by every mesh: object-space position and normal.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl MeshVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x3  // normal
    ];

    #[inline]
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
        }
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Indexed triangle list. Front faces wind counter-clockwise.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Axis-aligned unit cube centered at the origin, with per-face normals.
    pub fn cube() -> Self {
        // (normal, u, v) with u × v = normal, so corners walked in
        // (-u-v, +u-v, +u+v, -u+v) order are counter-clockwise seen from outside.
        let faces = [
            (Vec3::X, Vec3::Y, Vec3::Z),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::Z, Vec3::X),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::Y, Vec3::X),
        ];

        let mut mesh = Mesh::default();
        for (normal, u, v) in faces {
            let base = mesh.vertices.len() as u32;
            let center = normal * 0.5;
            for (su, sv) in [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)] {
                mesh.vertices
                    .push(MeshVertex::new(center + u * su + v * sv, normal));
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        mesh
    }

    /// UV sphere centered at the origin.
    ///
    /// `segments` runs around the Y axis, `rings` from pole to pole.
    pub fn uv_sphere(radius: f32, segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);

        let mut mesh = Mesh::default();
        for r in 0..=rings {
            let theta = r as f32 / rings as f32 * std::f32::consts::PI;
            for s in 0..=segments {
                let phi = s as f32 / segments as f32 * std::f32::consts::TAU;
                let normal = Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
                mesh.vertices.push(MeshVertex::new(normal * radius, normal));
            }
        }

        let stride = segments + 1;
        for r in 0..rings {
            for s in 0..segments {
                let a = r * stride + s;
                let b = (r + 1) * stride + s;
                let c = b + 1;
                let d = a + 1;
                mesh.indices.extend_from_slice(&[a, c, b, a, d, c]);
            }
        }
        mesh
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Iterates triangles as vertex triples.
    pub fn triangles(&self) -> impl Iterator<Item = [&MeshVertex; 3]> + '_ {
        self.indices.chunks_exact(3).filter_map(|tri| {
            Some([
                self.vertices.get(tri[0] as usize)?,
                self.vertices.get(tri[1] as usize)?,
                self.vertices.get(tri[2] as usize)?,
            ])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face_normal(tri: [&MeshVertex; 3]) -> Vec3 {
        let [a, b, c] = tri.map(|v| Vec3::from_array(v.position));
        (b - a).cross(c - a)
    }

    #[test]
    fn cube_has_six_faces() {
        let cube = Mesh::cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.triangle_count(), 12);
    }

    #[test]
    fn cube_winding_is_counter_clockwise_from_outside() {
        for tri in Mesh::cube().triangles() {
            let n = Vec3::from_array(tri[0].normal);
            assert!(face_normal(tri).dot(n) > 0.0);
        }
    }

    #[test]
    fn cube_vertices_lie_on_unit_box() {
        for v in Mesh::cube().vertices {
            let p = Vec3::from_array(v.position);
            assert!((p.abs().max_element() - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn sphere_winding_faces_outward() {
        let sphere = Mesh::uv_sphere(0.1, 12, 8);
        for tri in sphere.triangles() {
            let n = face_normal(tri);
            // Pole triangles are degenerate.
            if n.length() < 1e-9 {
                continue;
            }
            let centroid = tri
                .iter()
                .map(|v| Vec3::from_array(v.position))
                .sum::<Vec3>();
            assert!(n.dot(centroid) > 0.0);
        }
    }
}
