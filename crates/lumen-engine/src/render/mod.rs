//! Deferred rendering subsystem.
//!
//! Frame structure:
//! - the geometry pass rasterizes the scene once into the G-buffer
//! - the lighting composite reads the G-buffer and lights every display pixel
//!
//! `deferred` holds the backend-agnostic core (attachment set, shading
//! contracts, frame orchestration). `gpu` records it with wgpu; `software` runs
//! the same contracts on the CPU for headless use and tests.

mod error;
mod target;

pub mod deferred;
pub mod gpu;
pub mod software;

pub use error::RenderError;
pub use target::RenderTarget;
