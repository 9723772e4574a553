use glam::Vec3;

/// Light motion policy.
///
/// Implementations must be pure functions of `(seed, time)` so that replays
/// with the same seeds produce identical frames.
pub trait LightAnimation {
    fn position(&self, seed: u32, time: f32) -> Vec3;
}

/// Horizontal orbit with a vertical bob, parameterized per light by its seed.
///
/// Every light stays within `max_radius` of `center` horizontally and within
/// `bob_amplitude` of `center.y + height` vertically.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SeededOrbit {
    pub center: Vec3,
    pub min_radius: f32,
    pub max_radius: f32,
    pub height: f32,
    pub bob_amplitude: f32,
    /// Upper bound on angular speed, radians per second.
    pub max_speed: f32,
}

impl Default for SeededOrbit {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            min_radius: 0.8,
            max_radius: 2.0,
            height: 0.5,
            bob_amplitude: 0.5,
            max_speed: 1.0,
        }
    }
}

impl LightAnimation for SeededOrbit {
    fn position(&self, seed: u32, time: f32) -> Vec3 {
        let radius = lerp(self.min_radius, self.max_radius, unit(seed, 0));
        let phase = unit(seed, 1) * std::f32::consts::TAU;
        let direction = if unit(seed, 2) < 0.5 { -1.0 } else { 1.0 };
        let speed = direction * self.max_speed * lerp(0.25, 1.0, unit(seed, 3));
        let bob_phase = unit(seed, 4) * std::f32::consts::TAU;
        let bob_freq = lerp(0.5, 1.5, unit(seed, 5));

        let angle = phase + speed * time;
        let bob = self.bob_amplitude * (bob_phase + bob_freq * time).sin();

        self.center + Vec3::new(radius * angle.cos(), self.height + bob, radius * angle.sin())
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Maps `(seed, salt)` to `[0, 1)` via a 32-bit integer hash.
fn unit(seed: u32, salt: u32) -> f32 {
    let mut x = seed ^ salt.wrapping_mul(0x9E37_79B9);
    x ^= x >> 16;
    x = x.wrapping_mul(0x7FEB_352D);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846C_A68B);
    x ^= x >> 16;
    (x >> 8) as f32 / (1u32 << 24) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_and_time_is_deterministic() {
        let orbit = SeededOrbit::default();
        assert_eq!(orbit.position(7, 3.25), orbit.position(7, 3.25));
    }

    #[test]
    fn different_seeds_diverge() {
        let orbit = SeededOrbit::default();
        assert_ne!(orbit.position(1, 0.0), orbit.position(2, 0.0));
    }

    #[test]
    fn motion_stays_bounded() {
        let orbit = SeededOrbit::default();
        for seed in 0..32 {
            for step in 0..200 {
                let p = orbit.position(seed, step as f32 * 0.37);
                let horizontal = Vec3::new(p.x, 0.0, p.z).length();
                assert!(horizontal <= orbit.max_radius + 1e-4);
                assert!(horizontal >= orbit.min_radius - 1e-4);
                assert!((p.y - orbit.height).abs() <= orbit.bob_amplitude + 1e-4);
            }
        }
    }

    #[test]
    fn unit_is_in_range() {
        for seed in 0..1000 {
            let u = unit(seed, 3);
            assert!((0.0..1.0).contains(&u));
        }
    }
}
