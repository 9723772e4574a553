//! Per-frame sequencing of the deferred renderer.
//!
//! ```text
//! begin_frame ── CheckResize ──► FrameStart::Ready(PreparedFrame)
//!      │                               │
//!      └─► FrameStart::Skipped         └─ render: GeometryPass → CompositePass
//! ```
//!
//! The passes are only reachable through a [`PreparedFrame`], which exists
//! only after the resize check succeeded for that frame.

use crate::coords::ViewportSize;
use crate::lighting::LightSet;
use crate::render::RenderError;
use crate::scene::{Camera, Scene};

use super::{DeferredBackend, GBufferAttachmentSet};

/// What a single [`FrameOrchestrator::render_frame`] call did.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Both passes ran. `resized` is set when the attachments were
    /// reallocated this frame.
    Rendered { resized: bool },
    /// Zero-sized viewport; nothing was touched.
    Skipped,
}

/// Result of the resize check.
pub enum FrameStart<'a, B: DeferredBackend> {
    Ready(PreparedFrame<'a, B>),
    Skipped(ViewportSize),
}

/// Drives `CheckResize → GeometryPass → CompositePass` for one backend.
pub struct FrameOrchestrator<B: DeferredBackend> {
    gbuffer: GBufferAttachmentSet<B::Storage>,
    light_count: usize,
    /// Set while frames are being skipped for a zero-sized viewport.
    skipping: bool,
    /// Size of the last failed reallocation, for one warning per target size.
    failed_resize: Option<ViewportSize>,
}

impl<B: DeferredBackend> FrameOrchestrator<B> {
    /// Validates `lights` against the backend's composite specialization and
    /// allocates placeholder attachments. The first non-degenerate frame
    /// resizes them to the viewport.
    pub fn new(backend: &mut B, lights: &LightSet) -> Result<Self, RenderError> {
        backend.composite_program().validate(lights.len())?;
        let storage = backend.allocate_gbuffer(ViewportSize::PLACEHOLDER)?;
        Ok(Self {
            gbuffer: GBufferAttachmentSet::new(storage),
            light_count: lights.len(),
            skipping: false,
            failed_resize: None,
        })
    }

    #[inline]
    pub fn gbuffer(&self) -> &GBufferAttachmentSet<B::Storage> {
        &self.gbuffer
    }

    #[inline]
    pub fn light_count(&self) -> usize {
        self.light_count
    }

    /// CheckResize.
    ///
    /// - degenerate `viewport`: `Skipped`, attachments and camera untouched
    /// - size changed: attachments are reallocated first; the camera aspect
    ///   follows only if that succeeded
    /// - allocation failure: the previous attachments stay, the error is
    ///   returned and the next frame retries
    pub fn begin_frame(
        &mut self,
        backend: &mut B,
        viewport: ViewportSize,
        camera: &mut Camera,
    ) -> Result<FrameStart<'_, B>, RenderError> {
        if viewport.is_degenerate() {
            if !self.skipping {
                log::warn!(
                    "viewport is {}x{}, skipping frames until it has an area",
                    viewport.width,
                    viewport.height
                );
                self.skipping = true;
            }
            return Ok(FrameStart::Skipped(viewport));
        }
        if self.skipping {
            log::info!("viewport restored to {}x{}", viewport.width, viewport.height);
            self.skipping = false;
        }

        let resized = match self
            .gbuffer
            .resize_with(viewport, |size| backend.allocate_gbuffer(size))
        {
            Ok(resized) => resized,
            Err(err) => {
                if self.failed_resize != Some(viewport) {
                    let kept = self.gbuffer.size();
                    log::warn!("{err}; keeping {}x{} attachments", kept.width, kept.height);
                    self.failed_resize = Some(viewport);
                }
                return Err(err);
            }
        };
        self.failed_resize = None;

        if resized {
            log::debug!(
                "gbuffer reallocated at {}x{} (generation {})",
                viewport.width,
                viewport.height,
                self.gbuffer.generation()
            );
        }
        camera.set_aspect(viewport);

        Ok(FrameStart::Ready(PreparedFrame {
            gbuffer: &mut self.gbuffer,
            light_count: self.light_count,
            resized,
        }))
    }

    /// Resize check and both passes in one call, for backends whose target
    /// is available before the resize check.
    pub fn render_frame(
        &mut self,
        backend: &mut B,
        target: &mut B::Target<'_>,
        viewport: ViewportSize,
        scene: &Scene,
        camera: &mut Camera,
        lights: &LightSet,
    ) -> Result<FrameOutcome, RenderError> {
        match self.begin_frame(backend, viewport, camera)? {
            FrameStart::Skipped(_) => Ok(FrameOutcome::Skipped),
            FrameStart::Ready(frame) => {
                let resized = frame.resized();
                frame.render(backend, target, scene, camera, lights)?;
                Ok(FrameOutcome::Rendered { resized })
            }
        }
    }
}

/// A frame whose attachments match the viewport. Consumed by
/// [`render`](Self::render).
pub struct PreparedFrame<'a, B: DeferredBackend> {
    gbuffer: &'a mut GBufferAttachmentSet<B::Storage>,
    light_count: usize,
    resized: bool,
}

impl<'a, B: DeferredBackend> PreparedFrame<'a, B> {
    #[inline]
    pub fn size(&self) -> ViewportSize {
        self.gbuffer.size()
    }

    /// `true` when CheckResize reallocated the attachments this frame.
    #[inline]
    pub fn resized(&self) -> bool {
        self.resized
    }

    /// GeometryPass then CompositePass.
    pub fn render(
        self,
        backend: &mut B,
        target: &mut B::Target<'_>,
        scene: &Scene,
        camera: &Camera,
        lights: &LightSet,
    ) -> Result<(), RenderError> {
        if lights.len() != self.light_count {
            return Err(RenderError::light_count_mismatch(self.light_count, lights.len()));
        }
        let snapshot = lights.snapshot();

        let mut writer = self.gbuffer.begin_write();
        backend.geometry_pass(target, &mut writer, scene, camera)?;
        let reader = writer.finish();

        backend.composite_pass(target, &reader, &snapshot, camera.world_transform())
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec3};

    use super::*;
    use crate::lighting::{LightSample, PointLight};
    use crate::render::deferred::{
        ColorAttachment, CompositeConfig, GBufferReader, GBufferStorage, GBufferWriter,
        LightingCompositeProgram,
    };

    #[derive(Debug)]
    struct FakeStorage(ViewportSize);

    impl GBufferStorage for FakeStorage {
        type Texture = ViewportSize;
        type DepthTexture = ViewportSize;

        fn size(&self) -> ViewportSize {
            self.0
        }
        fn color(&self, _: ColorAttachment) -> &ViewportSize {
            &self.0
        }
        fn depth(&self) -> &ViewportSize {
            &self.0
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Allocate(ViewportSize),
        Geometry(ViewportSize),
        Composite(ViewportSize, usize),
    }

    struct Recording {
        program: LightingCompositeProgram,
        calls: Vec<Call>,
        max_dimension: u32,
    }

    impl Recording {
        fn new(light_count: usize) -> Self {
            Self {
                program: LightingCompositeProgram::specialize(light_count, CompositeConfig::default())
                    .unwrap(),
                calls: Vec::new(),
                max_dimension: u32::MAX,
            }
        }
    }

    impl DeferredBackend for Recording {
        type Storage = FakeStorage;
        type Target<'t> = Vec<&'static str>;

        fn composite_program(&self) -> &LightingCompositeProgram {
            &self.program
        }

        fn allocate_gbuffer(&mut self, size: ViewportSize) -> Result<FakeStorage, RenderError> {
            self.calls.push(Call::Allocate(size));
            if size.width > self.max_dimension || size.height > self.max_dimension {
                return Err(RenderError::ResourceExhaustion {
                    size,
                    reason: "too large".into(),
                });
            }
            Ok(FakeStorage(size))
        }

        fn geometry_pass(
            &mut self,
            target: &mut Self::Target<'_>,
            gbuffer: &mut GBufferWriter<'_, FakeStorage>,
            _scene: &Scene,
            _camera: &Camera,
        ) -> Result<(), RenderError> {
            target.push("geometry");
            self.calls.push(Call::Geometry(gbuffer.size()));
            Ok(())
        }

        fn composite_pass(
            &mut self,
            target: &mut Self::Target<'_>,
            gbuffer: &GBufferReader<'_, FakeStorage>,
            lights: &[LightSample],
            _camera_world: Mat4,
        ) -> Result<(), RenderError> {
            target.push("composite");
            self.calls.push(Call::Composite(gbuffer.size(), lights.len()));
            Ok(())
        }
    }

    fn lights(n: usize) -> LightSet {
        LightSet::new((0..n).map(|_| PointLight::new(1.0, Vec3::ONE)).collect())
    }

    // ── sequencing ────────────────────────────────────────────────────────

    #[test]
    fn passes_run_in_order_after_resize() {
        let mut backend = Recording::new(2);
        let set = lights(2);
        let mut orch = FrameOrchestrator::new(&mut backend, &set).unwrap();
        let mut camera = Camera::default();
        let mut target = Vec::new();
        let size = ViewportSize::new(100, 100);

        let outcome = orch
            .render_frame(&mut backend, &mut target, size, &Scene::new(), &mut camera, &set)
            .unwrap();

        assert_eq!(outcome, FrameOutcome::Rendered { resized: true });
        assert_eq!(target, vec!["geometry", "composite"]);
        assert_eq!(
            backend.calls,
            vec![
                Call::Allocate(ViewportSize::PLACEHOLDER),
                Call::Allocate(size),
                Call::Geometry(size),
                Call::Composite(size, 2),
            ]
        );
    }

    #[test]
    fn unchanged_viewport_does_not_reallocate() {
        let mut backend = Recording::new(0);
        let set = lights(0);
        let mut orch = FrameOrchestrator::new(&mut backend, &set).unwrap();
        let mut camera = Camera::default();
        let size = ViewportSize::new(64, 48);

        for _ in 0..3 {
            orch.render_frame(&mut backend, &mut Vec::new(), size, &Scene::new(), &mut camera, &set)
                .unwrap();
        }
        let allocations = backend
            .calls
            .iter()
            .filter(|c| matches!(c, Call::Allocate(_)))
            .count();
        assert_eq!(allocations, 2);
        assert_eq!(orch.gbuffer().generation(), 1);
    }

    #[test]
    fn resize_updates_attachments_and_aspect_together() {
        let mut backend = Recording::new(1);
        let set = lights(1);
        let mut orch = FrameOrchestrator::new(&mut backend, &set).unwrap();
        let mut camera = Camera::default();
        let scene = Scene::new();

        orch.render_frame(&mut backend, &mut Vec::new(), ViewportSize::new(100, 100), &scene, &mut camera, &set)
            .unwrap();
        orch.render_frame(&mut backend, &mut Vec::new(), ViewportSize::new(200, 150), &scene, &mut camera, &set)
            .unwrap();

        assert_eq!(orch.gbuffer().size(), ViewportSize::new(200, 150));
        assert_eq!(camera.aspect(), 200.0 / 150.0);
        assert_eq!(backend.calls.last(), Some(&Call::Composite(ViewportSize::new(200, 150), 1)));
    }

    // ── degenerate / failure ──────────────────────────────────────────────

    #[test]
    fn degenerate_viewport_skips_without_touching_state() {
        let mut backend = Recording::new(1);
        let set = lights(1);
        let mut orch = FrameOrchestrator::new(&mut backend, &set).unwrap();
        let mut camera = Camera::default();
        let scene = Scene::new();

        orch.render_frame(&mut backend, &mut Vec::new(), ViewportSize::new(100, 50), &scene, &mut camera, &set)
            .unwrap();
        let calls_before = backend.calls.len();
        let aspect_before = camera.aspect();

        let mut target = Vec::new();
        for size in [ViewportSize::new(0, 50), ViewportSize::new(100, 0), ViewportSize::new(0, 0)] {
            let outcome = orch
                .render_frame(&mut backend, &mut target, size, &scene, &mut camera, &set)
                .unwrap();
            assert_eq!(outcome, FrameOutcome::Skipped);
        }

        assert!(target.is_empty());
        assert_eq!(backend.calls.len(), calls_before);
        assert_eq!(orch.gbuffer().size(), ViewportSize::new(100, 50));
        assert_eq!(camera.aspect(), aspect_before);
    }

    #[test]
    fn failed_allocation_keeps_previous_attachments_and_retries() {
        let mut backend = Recording::new(1);
        let set = lights(1);
        let mut orch = FrameOrchestrator::new(&mut backend, &set).unwrap();
        let mut camera = Camera::default();
        let scene = Scene::new();

        orch.render_frame(&mut backend, &mut Vec::new(), ViewportSize::new(100, 100), &scene, &mut camera, &set)
            .unwrap();
        backend.max_dimension = 150;

        let big = ViewportSize::new(400, 100);
        let mut target = Vec::new();
        let err = orch
            .render_frame(&mut backend, &mut target, big, &scene, &mut camera, &set)
            .unwrap_err();
        assert!(matches!(err, RenderError::ResourceExhaustion { .. }));
        assert!(err.is_recoverable());
        assert!(target.is_empty());
        assert_eq!(orch.gbuffer().size(), ViewportSize::new(100, 100));
        assert_eq!(camera.aspect(), 1.0);

        backend.max_dimension = u32::MAX;
        let outcome = orch
            .render_frame(&mut backend, &mut target, big, &scene, &mut camera, &set)
            .unwrap();
        assert_eq!(outcome, FrameOutcome::Rendered { resized: true });
        assert_eq!(orch.gbuffer().size(), big);
        assert_eq!(camera.aspect(), 4.0);
    }

    // ── configuration ─────────────────────────────────────────────────────

    #[test]
    fn mismatched_light_set_is_rejected_at_setup() {
        let mut backend = Recording::new(3);
        let r = FrameOrchestrator::new(&mut backend, &lights(2));
        assert!(matches!(r, Err(RenderError::Configuration(_))));
        assert!(backend.calls.is_empty());
    }

    #[test]
    fn mismatched_light_set_is_rejected_before_any_pass() {
        let mut backend = Recording::new(2);
        let mut orch = FrameOrchestrator::new(&mut backend, &lights(2)).unwrap();
        let mut camera = Camera::default();
        let mut target = Vec::new();

        let err = orch
            .render_frame(
                &mut backend,
                &mut target,
                ViewportSize::new(10, 10),
                &Scene::new(),
                &mut camera,
                &lights(5),
            )
            .unwrap_err();
        assert!(!err.is_recoverable());
        assert!(target.is_empty());
    }
}
