use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use super::{LightAnimation, PointLight};

/// Immutable per-frame view of one light, in world space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LightSample {
    pub brightness: f32,
    pub color: Vec3,
    pub position: Vec3,
}

impl LightSample {
    /// GPU layout used by the composite uniform.
    #[inline]
    pub fn to_gpu(self) -> GpuLight {
        GpuLight {
            position_brightness: self.position.extend(self.brightness).to_array(),
            color: self.color.extend(0.0).to_array(),
        }
    }
}

/// std140-compatible light record (32 bytes).
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct GpuLight {
    pub position_brightness: [f32; 4],
    pub color: [f32; 4],
}

/// Fixed-size collection of point lights.
///
/// The count is set at construction and never changes: the lighting composite
/// is specialized for it. Only light attributes change between frames.
#[derive(Debug, Clone, Default)]
pub struct LightSet {
    lights: Vec<PointLight>,
}

impl LightSet {
    pub fn new(lights: Vec<PointLight>) -> Self {
        Self { lights }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.lights.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    #[inline]
    pub fn lights(&self) -> &[PointLight] {
        &self.lights
    }

    /// Mutable access to light attributes. The slice length cannot change.
    #[inline]
    pub fn lights_mut(&mut self) -> &mut [PointLight] {
        &mut self.lights
    }

    /// Moves every light to where `animation` puts it at `time` seconds.
    pub fn animate(&mut self, animation: &impl LightAnimation, time: f32) {
        for light in &mut self.lights {
            light.position = animation.position(light.seed, time);
        }
    }

    /// Builds the ordered snapshot (insertion order) for this frame.
    pub fn snapshot(&self) -> Vec<LightSample> {
        self.lights
            .iter()
            .map(|l| LightSample {
                brightness: l.brightness,
                color: l.color,
                position: l.position,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lighting::SeededOrbit;

    fn set() -> LightSet {
        LightSet::new(vec![
            PointLight::new(1.0, Vec3::X).with_seed(1),
            PointLight::new(2.0, Vec3::Y).with_seed(2),
            PointLight::new(0.5, Vec3::Z).with_seed(3),
        ])
    }

    #[test]
    fn snapshot_preserves_insertion_order() {
        let snap = set().snapshot();
        let brightness: Vec<f32> = snap.iter().map(|s| s.brightness).collect();
        assert_eq!(brightness, vec![1.0, 2.0, 0.5]);
    }

    #[test]
    fn snapshot_is_rebuilt_after_animation() {
        let mut lights = set();
        let orbit = SeededOrbit::default();
        lights.animate(&orbit, 0.0);
        let before = lights.snapshot();
        lights.animate(&orbit, 1.5);
        let after = lights.snapshot();
        assert_eq!(before.len(), after.len());
        assert_ne!(before[0].position, after[0].position);
    }

    #[test]
    fn gpu_light_packs_brightness_in_w() {
        let gpu = LightSample {
            brightness: 3.0,
            color: Vec3::new(0.1, 0.2, 0.3),
            position: Vec3::new(1.0, 2.0, 4.0),
        }
        .to_gpu();
        assert_eq!(gpu.position_brightness, [1.0, 2.0, 4.0, 3.0]);
        assert_eq!(gpu.color, [0.1, 0.2, 0.3, 0.0]);
        assert_eq!(std::mem::size_of::<GpuLight>(), 32);
    }
}
