//! Backend-agnostic deferred shading core.
//!
//! - [`gbuffer`]: the attachment set and its write/read handles
//! - [`material`]: what the geometry pass writes per surface
//! - [`composite`]: the full-screen lighting program
//! - [`orchestrator`]: per-frame `CheckResize → GeometryPass → CompositePass`

mod backend;
pub mod composite;
pub mod gbuffer;
pub mod material;
mod orchestrator;

pub use backend::DeferredBackend;
pub use composite::{CompositeConfig, LightingCompositeProgram};
pub use gbuffer::{
    ColorAttachment, GBufferAttachmentSet, GBufferReader, GBufferStorage, GBufferWriter,
    COLOR_ATTACHMENT_COUNT,
};
pub use material::{GBufferTexel, GeometryInstance, ViewTransforms};
pub use orchestrator::{FrameOrchestrator, FrameOutcome, FrameStart, PreparedFrame};
