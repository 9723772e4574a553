use glam::Vec3;

/// Unshadowed point light.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointLight {
    /// Intensity multiplier. Expected `>= 0`; negative values are passed
    /// through unclamped and give an undefined-looking (darkening) result.
    pub brightness: f32,
    /// Linear RGB color.
    pub color: Vec3,
    /// World-space position, rewritten every frame by the animation policy.
    pub position: Vec3,
    /// Per-light seed for deterministic animation.
    pub seed: u32,
}

impl PointLight {
    pub fn new(brightness: f32, color: Vec3) -> Self {
        Self {
            brightness,
            color,
            position: Vec3::ZERO,
            seed: 0,
        }
    }

    #[inline]
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    #[inline]
    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }
}

impl Default for PointLight {
    fn default() -> Self {
        Self::new(1.0, Vec3::ONE)
    }
}
