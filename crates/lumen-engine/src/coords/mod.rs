//! Pixel-space types shared by the runtime and the renderers.
//!
//! Canonical space for render targets:
//! - physical pixels
//! - origin top-left
//! - +X right, +Y down

mod viewport;

pub use viewport::ViewportSize;
