//! Lumen engine crate.
//!
//! A deferred shading renderer: a geometry pass fills a G-buffer, a lighting
//! composite shades every pixel from it. Plus the platform + GPU runtime it
//! runs on.

pub mod coords;
pub mod core;
pub mod device;
pub mod lighting;
pub mod logging;
pub mod render;
pub mod scene;
pub mod time;
pub mod window;
