//! Lighting composite program.
//!
//! Runs once per display pixel over a full-screen quad:
//!
//! ```text
//! normal_w = (camera_world * vec4(normal_v, 0)).xyz
//! pos_w    = (camera_world * vec4(pos_v, 1)).xyz
//! for each light:
//!     d        = light.pos - pos_w
//!     ndotl    = max(dot(normal_w, normalize(d)), 0)
//!     atten    = 1 / (1 + k * |d|)
//!     contrib += light.color * ndotl * atten * light.brightness
//! out = vec4(albedo * contrib + albedo * emissive, 1)
//! ```
//!
//! No shadowing, no clamping of the accumulated contribution, no tone mapping:
//! values above 1 reach the display target as computed.

use glam::{Mat4, Vec3, Vec4};

use crate::lighting::LightSample;
use crate::render::RenderError;

use super::GBufferTexel;

/// Distance attenuation constant `k`.
pub const DEFAULT_ATTENUATION: f32 = 10.0;

/// Largest light count a composite program can be specialized for.
///
/// Lights live in a uniform buffer (32 bytes each); this keeps the buffer
/// well under the 64 KiB default uniform binding limit.
pub const MAX_LIGHTS: usize = 1024;

/// Tunables of the lighting composite.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CompositeConfig {
    /// Attenuation constant `k` in `1 / (1 + k * distance)`.
    pub attenuation: f32,
    /// Display clear color. Every pixel is overwritten by the composite, so
    /// this only shows if the full-screen pass is skipped.
    pub clear_color: Vec4,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            attenuation: DEFAULT_ATTENUATION,
            clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
        }
    }
}

/// Composite program specialized for a fixed light count.
#[derive(Debug, Clone, PartialEq)]
pub struct LightingCompositeProgram {
    light_count: usize,
    config: CompositeConfig,
}

impl LightingCompositeProgram {
    /// Specializes the program for exactly `light_count` lights.
    pub fn specialize(light_count: usize, config: CompositeConfig) -> Result<Self, RenderError> {
        if light_count > MAX_LIGHTS {
            return Err(RenderError::Configuration(format!(
                "composite program supports at most {MAX_LIGHTS} lights, got {light_count}"
            )));
        }
        if !config.attenuation.is_finite() || config.attenuation < 0.0 {
            return Err(RenderError::Configuration(format!(
                "attenuation constant must be finite and non-negative, got {}",
                config.attenuation
            )));
        }

        log::info!("lighting composite specialized for {light_count} lights");
        Ok(Self { light_count, config })
    }

    #[inline]
    pub fn light_count(&self) -> usize {
        self.light_count
    }

    #[inline]
    pub fn config(&self) -> &CompositeConfig {
        &self.config
    }

    #[inline]
    pub fn attenuation(&self) -> f32 {
        self.config.attenuation
    }

    /// Checks a light list length against the specialization.
    pub fn validate(&self, light_count: usize) -> Result<(), RenderError> {
        if light_count == self.light_count {
            Ok(())
        } else {
            Err(RenderError::light_count_mismatch(self.light_count, light_count))
        }
    }

    /// Evaluates one pixel.
    #[inline]
    pub fn shade(&self, texel: &GBufferTexel, lights: &[LightSample], camera_world: Mat4) -> Vec4 {
        composite_pixel(texel, lights, camera_world, self.config.attenuation)
    }
}

/// Reference evaluation of the composite for one pixel.
///
/// Mirrors `shaders/composite.wgsl`. A light exactly at the fragment position
/// contributes nothing here (the direction is undefined).
pub fn composite_pixel(
    texel: &GBufferTexel,
    lights: &[LightSample],
    camera_world: Mat4,
    attenuation: f32,
) -> Vec4 {
    let albedo = texel.albedo.truncate();
    let normal_w = camera_world.transform_vector3(texel.normal_emissive.truncate());
    let pos_w = camera_world.transform_point3(texel.frag_pos.truncate());

    let contribution = lights.iter().fold(Vec3::ZERO, |acc, light| {
        let to_light = light.position - pos_w;
        let distance = to_light.length();
        let ndotl = normal_w.dot(to_light.normalize_or_zero()).max(0.0);
        let atten = 1.0 / (1.0 + attenuation * distance);
        acc + light.color * (ndotl * atten * light.brightness)
    });

    let direct = albedo * contribution;
    let emissive = albedo * texel.emissive();
    (direct + emissive).extend(1.0)
}
