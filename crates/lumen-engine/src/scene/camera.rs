use glam::{Mat4, Vec3};

use crate::coords::ViewportSize;

/// Perspective camera.
///
/// The geometry pass uses [`view_matrix`](Self::view_matrix) and
/// [`projection_matrix`](Self::projection_matrix); the lighting composite uses
/// [`world_transform`](Self::world_transform) to move view-space G-buffer data
/// back into world space.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view, radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    aspect: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 1.0, 2.0),
            target: Vec3::new(0.0, 0.5, 0.0),
            up: Vec3::Y,
            fov_y: 75f32.to_radians(),
            near: 0.1,
            far: 2000.0,
            aspect: 1.0,
        }
    }
}

impl Camera {
    /// Creates a camera at `position` looking at `target` with a vertical FOV in degrees.
    pub fn looking_at(position: Vec3, target: Vec3, fov_y_degrees: f32) -> Self {
        Self {
            position,
            target,
            fov_y: fov_y_degrees.to_radians(),
            ..Self::default()
        }
    }

    #[inline]
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Recomputes the aspect ratio from a viewport size.
    ///
    /// Degenerate sizes are ignored so the last valid projection survives a
    /// minimized window.
    pub fn set_aspect(&mut self, size: ViewportSize) {
        if size.is_degenerate() {
            return;
        }
        self.aspect = size.aspect();
    }

    /// World → view transform.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// View → clip transform (wgpu depth range `[0, 1]`).
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    /// View → world transform (the camera's placement in the world).
    pub fn world_transform(&self) -> Mat4 {
        self.view_matrix().inverse()
    }

    /// World → clip transform.
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_transform_places_camera_at_position() {
        let cam = Camera::looking_at(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO, 60.0);
        let origin = cam.world_transform().transform_point3(Vec3::ZERO);
        assert!((origin - cam.position).length() < 1e-5);
    }

    #[test]
    fn world_transform_inverts_view() {
        let cam = Camera::default();
        let p = Vec3::new(0.3, -0.2, 1.5);
        let back = cam.world_transform().transform_point3(cam.view_matrix().transform_point3(p));
        assert!((back - p).length() < 1e-5);
    }

    #[test]
    fn set_aspect_ignores_degenerate_size() {
        let mut cam = Camera::default();
        cam.set_aspect(ViewportSize::new(200, 100));
        assert_eq!(cam.aspect(), 2.0);
        cam.set_aspect(ViewportSize::new(0, 100));
        assert_eq!(cam.aspect(), 2.0);
    }
}
