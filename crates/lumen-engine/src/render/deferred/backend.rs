use glam::Mat4;

use crate::coords::ViewportSize;
use crate::lighting::LightSample;
use crate::render::RenderError;
use crate::scene::{Camera, Scene};

use super::{GBufferReader, GBufferStorage, GBufferWriter, LightingCompositeProgram};

/// Rendering framework behind the frame orchestrator.
///
/// A backend owns its pipelines and the specialized composite program. The
/// orchestrator owns the G-buffer and hands the backend a writer for the
/// geometry pass and a reader for the composite pass of the same frame.
pub trait DeferredBackend {
    type Storage: GBufferStorage;
    /// Display target the composite pass writes to.
    type Target<'t>;

    fn composite_program(&self) -> &LightingCompositeProgram;

    /// Allocates a full attachment set at `size`. Must not touch any
    /// previously returned storage.
    fn allocate_gbuffer(&mut self, size: ViewportSize) -> Result<Self::Storage, RenderError>;

    /// Clears every attachment (alpha 0, depth 1) and draws all visible
    /// opaque instances of `scene`.
    fn geometry_pass(
        &mut self,
        target: &mut Self::Target<'_>,
        gbuffer: &mut GBufferWriter<'_, Self::Storage>,
        scene: &Scene,
        camera: &Camera,
    ) -> Result<(), RenderError>;

    /// Clears the display target (alpha 1) and runs the lighting composite
    /// over every pixel.
    fn composite_pass(
        &mut self,
        target: &mut Self::Target<'_>,
        gbuffer: &GBufferReader<'_, Self::Storage>,
        lights: &[LightSample],
        camera_world: Mat4,
    ) -> Result<(), RenderError>;
}
