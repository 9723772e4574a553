//! Point lights and their per-frame snapshot.
//!
//! Lights are owned by the application. Each frame an animation policy moves
//! them, then [`LightSet::snapshot`] produces the immutable list handed to the
//! lighting composite.

mod animation;
mod light;
mod light_set;

pub use animation::{LightAnimation, SeededOrbit};
pub use light::PointLight;
pub use light_set::{GpuLight, LightSample, LightSet};
