use glam::Vec3;

/// Per-instance surface parameters written by the geometry pass.
///
/// Instances that differ only in color or emissive share one pipeline; these
/// values travel in the per-instance buffer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SurfaceMaterial {
    /// Linear RGB base color.
    pub base_color: Vec3,
    /// Emissive intensity. `0.0` means the surface is only lit by point lights.
    pub emissive: f32,
}

impl SurfaceMaterial {
    #[inline]
    pub const fn new(base_color: Vec3, emissive: f32) -> Self {
        Self { base_color, emissive }
    }

    /// Non-emissive surface.
    #[inline]
    pub const fn diffuse(base_color: Vec3) -> Self {
        Self::new(base_color, 0.0)
    }

    /// Fully emissive surface, as used for light markers.
    #[inline]
    pub const fn emissive(base_color: Vec3, intensity: f32) -> Self {
        Self::new(base_color, intensity)
    }
}

impl Default for SurfaceMaterial {
    fn default() -> Self {
        Self::diffuse(Vec3::ONE)
    }
}
