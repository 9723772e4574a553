//! Scanline-free triangle rasterizer for the software geometry pass.
//!
//! Conventions match wgpu: counter-clockwise front faces, back faces culled,
//! depth range `[0, 1]` with `Less` comparison, pixel centers at `+0.5`.
//! Triangles with any vertex at or behind the eye plane are dropped (no
//! near-plane clipping).

use glam::{Mat4, Vec2, Vec3};

use crate::render::deferred::material::{shade_fragment, ViewTransforms};
use crate::render::deferred::GBufferStorage;
use crate::scene::{Mesh, MeshVertex, SurfaceMaterial};

use super::SoftwareGBuffer;

const MIN_CLIP_W: f32 = 1e-5;

/// Vertex stage output.
#[derive(Debug, Copy, Clone)]
struct ClipVertex {
    screen: Vec2,
    depth: f32,
    inv_w: f32,
    view_normal: Vec3,
    view_pos: Vec3,
}

/// Draws one mesh instance into `gbuffer`.
pub(crate) fn draw_mesh(
    gbuffer: &mut SoftwareGBuffer,
    mesh: &Mesh,
    model: Mat4,
    view: Mat4,
    projection: Mat4,
    material: &SurfaceMaterial,
) {
    let transforms = ViewTransforms::new(model, view);
    let size = gbuffer.size();
    let extent = Vec2::new(size.width as f32, size.height as f32);

    for tri in mesh.triangles() {
        let [Some(a), Some(b), Some(c)] =
            tri.map(|v| project(v, &transforms, projection, extent))
        else {
            continue;
        };
        draw_triangle(gbuffer, [a, b, c], material);
    }
}

fn project(vertex: &MeshVertex, transforms: &ViewTransforms, projection: Mat4, extent: Vec2) -> Option<ClipVertex> {
    let (view_normal, view_pos) =
        transforms.vertex(Vec3::from_array(vertex.position), Vec3::from_array(vertex.normal));
    let clip = projection * view_pos.extend(1.0);
    if clip.w <= MIN_CLIP_W {
        return None;
    }

    let inv_w = 1.0 / clip.w;
    let ndc = clip.truncate() * inv_w;
    Some(ClipVertex {
        screen: Vec2::new((ndc.x * 0.5 + 0.5) * extent.x, (0.5 - ndc.y * 0.5) * extent.y),
        depth: ndc.z,
        inv_w,
        view_normal,
        view_pos,
    })
}

/// Twice the signed area of `(a, b, p)` in screen space (y down).
#[inline]
fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

fn draw_triangle(gbuffer: &mut SoftwareGBuffer, [a, b, c]: [ClipVertex; 3], material: &SurfaceMaterial) {
    // Y is flipped relative to NDC, so a counter-clockwise front face has
    // negative area here.
    let area = edge(a.screen, b.screen, c.screen);
    if area.is_nan() || area >= 0.0 {
        return;
    }

    let size = gbuffer.size();
    let min = a.screen.min(b.screen).min(c.screen).floor().max(Vec2::ZERO);
    let max = a.screen.max(b.screen).max(c.screen).ceil();
    let x_end = (max.x.max(0.0) as u32).min(size.width);
    let y_end = (max.y.max(0.0) as u32).min(size.height);

    for y in min.y as u32..y_end {
        for x in min.x as u32..x_end {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let w0 = edge(b.screen, c.screen, p) / area;
            let w1 = edge(c.screen, a.screen, p) / area;
            let w2 = edge(a.screen, b.screen, p) / area;
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }

            let depth = w0 * a.depth + w1 * b.depth + w2 * c.depth;
            if !(0.0..=1.0).contains(&depth) || depth >= gbuffer.depth_at(x, y) {
                continue;
            }

            // Perspective-correct weights.
            let (p0, p1, p2) = (w0 * a.inv_w, w1 * b.inv_w, w2 * c.inv_w);
            let sum = p0 + p1 + p2;
            let (p0, p1, p2) = (p0 / sum, p1 / sum, p2 / sum);

            let view_normal = (a.view_normal * p0 + b.view_normal * p1 + c.view_normal * p2).normalize_or_zero();
            let view_pos = a.view_pos * p0 + b.view_pos * p1 + c.view_pos * p2;

            gbuffer.write(x, y, depth, shade_fragment(view_normal, view_pos, material));
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec4;

    use super::*;
    use crate::coords::ViewportSize;
    use crate::render::deferred::GBufferTexel;
    use crate::scene::Camera;

    fn gbuffer(w: u32, h: u32) -> SoftwareGBuffer {
        SoftwareGBuffer::allocate(ViewportSize::new(w, h)).unwrap()
    }

    fn quad(z: f32, normal: Vec3, ccw: bool) -> Mesh {
        let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
        let vertices = corners
            .iter()
            .map(|&(x, y)| MeshVertex::new(Vec3::new(x, y, z), normal))
            .collect();
        let indices = if ccw {
            vec![0, 1, 2, 0, 2, 3]
        } else {
            vec![0, 2, 1, 0, 3, 2]
        };
        Mesh { vertices, indices }
    }

    fn covered(gb: &SoftwareGBuffer) -> usize {
        gb.albedo
            .as_slice()
            .iter()
            .filter(|a| a.w == 1.0)
            .count()
    }

    fn camera() -> Camera {
        Camera::looking_at(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, 60.0)
    }

    // ── coverage ──────────────────────────────────────────────────────────

    #[test]
    fn front_facing_quad_is_drawn() {
        let mut gb = gbuffer(32, 32);
        let cam = camera();
        let material = SurfaceMaterial::new(Vec3::new(0.5, 0.25, 1.0), 0.75);
        draw_mesh(&mut gb, &quad(0.0, Vec3::Z, true), Mat4::IDENTITY, cam.view_matrix(), cam.projection_matrix(), &material);

        assert!(covered(&gb) > 0);
        let t = gb.texel(16, 16).unwrap();
        assert_eq!(t.albedo, Vec4::new(0.5, 0.25, 1.0, 1.0));
        assert_eq!(t.emissive(), 0.75);
        assert!((t.normal_emissive.truncate() - Vec3::Z).length() < 1e-5);
        // View-space position: quad is 3 units in front of the camera.
        assert!((t.frag_pos.z + 3.0).abs() < 1e-3);
        assert_eq!(t.frag_pos.w, 0.0);
    }

    #[test]
    fn back_facing_quad_is_culled() {
        let mut gb = gbuffer(32, 32);
        let cam = camera();
        draw_mesh(&mut gb, &quad(0.0, Vec3::Z, false), Mat4::IDENTITY, cam.view_matrix(), cam.projection_matrix(), &SurfaceMaterial::default());
        assert_eq!(covered(&gb), 0);
        assert_eq!(gb.texel(16, 16), Some(GBufferTexel::CLEAR));
    }

    #[test]
    fn geometry_behind_camera_is_dropped() {
        let mut gb = gbuffer(16, 16);
        let cam = camera();
        draw_mesh(&mut gb, &quad(5.0, Vec3::Z, true), Mat4::IDENTITY, cam.view_matrix(), cam.projection_matrix(), &SurfaceMaterial::default());
        assert_eq!(covered(&gb), 0);
    }

    // ── depth ─────────────────────────────────────────────────────────────

    #[test]
    fn nearer_surface_wins_regardless_of_draw_order() {
        let cam = camera();
        let near = SurfaceMaterial::diffuse(Vec3::X);
        let far = SurfaceMaterial::diffuse(Vec3::Y);

        for near_first in [true, false] {
            let mut gb = gbuffer(16, 16);
            let mut draw = |z: f32, m: &SurfaceMaterial| {
                draw_mesh(&mut gb, &quad(z, Vec3::Z, true), Mat4::IDENTITY, cam.view_matrix(), cam.projection_matrix(), m);
            };
            if near_first {
                draw(0.5, &near);
                draw(-0.5, &far);
            } else {
                draw(-0.5, &far);
                draw(0.5, &near);
            }
            assert_eq!(gb.texel(8, 8).map(|t| t.albedo), Some(Vec4::new(1.0, 0.0, 0.0, 1.0)));
        }
    }
}
