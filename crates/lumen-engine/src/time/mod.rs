//! Time subsystem.
//!
//! Provides frame timing without coupling to the runtime:
//! - one `FrameClock` per window
//! - call `tick()` once per frame to obtain `FrameTime`
//!
//! `FrameTime::elapsed` is the time source for light animation.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
