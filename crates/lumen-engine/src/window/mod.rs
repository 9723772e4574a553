//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and the single viewer window, which is wired to
//! its own [`Gpu`](crate::device::Gpu).

mod runtime;

pub use runtime::{RedrawPolicy, Runtime, RuntimeConfig, RuntimeCtx};
