//! CPU reference backend.
//!
//! Implements the full [`DeferredBackend`] contract without a GPU: the
//! geometry pass rasterizes into `f32` planes, the composite pass evaluates
//! [`composite_pixel`](crate::render::deferred::composite::composite_pixel)
//! for every display pixel. Used by tests and headless runs.

mod plane;
mod raster;

use glam::{Mat4, Vec4};

use crate::coords::ViewportSize;
use crate::lighting::LightSample;
use crate::render::deferred::{
    ColorAttachment, CompositeConfig, DeferredBackend, GBufferReader, GBufferStorage, GBufferTexel,
    GBufferWriter, LightingCompositeProgram,
};
use crate::render::RenderError;
use crate::scene::{Camera, Scene};

pub use plane::{Framebuffer, Plane};

/// Depth clear value (far plane).
const DEPTH_CLEAR: f32 = 1.0;

/// G-buffer held in main memory.
#[derive(Debug, Clone)]
pub struct SoftwareGBuffer {
    albedo: Plane<Vec4>,
    normal_emissive: Plane<Vec4>,
    frag_pos: Plane<Vec4>,
    depth: Plane<f32>,
}

impl SoftwareGBuffer {
    pub fn allocate(size: ViewportSize) -> Result<Self, RenderError> {
        Ok(Self {
            albedo: Plane::try_filled(size, Vec4::ZERO)?,
            normal_emissive: Plane::try_filled(size, Vec4::ZERO)?,
            frag_pos: Plane::try_filled(size, Vec4::ZERO)?,
            depth: Plane::try_filled(size, DEPTH_CLEAR)?,
        })
    }

    /// Clears colors to zero (alpha 0) and depth to the far plane.
    pub fn clear(&mut self) {
        self.albedo.fill(GBufferTexel::CLEAR.albedo);
        self.normal_emissive.fill(GBufferTexel::CLEAR.normal_emissive);
        self.frag_pos.fill(GBufferTexel::CLEAR.frag_pos);
        self.depth.fill(DEPTH_CLEAR);
    }

    /// All three color attachments at one pixel.
    pub fn texel(&self, x: u32, y: u32) -> Option<GBufferTexel> {
        Some(GBufferTexel {
            albedo: self.albedo.get(x, y)?,
            normal_emissive: self.normal_emissive.get(x, y)?,
            frag_pos: self.frag_pos.get(x, y)?,
        })
    }

    #[inline]
    fn depth_at(&self, x: u32, y: u32) -> f32 {
        self.depth.get(x, y).unwrap_or(DEPTH_CLEAR)
    }

    fn write(&mut self, x: u32, y: u32, depth: f32, texel: GBufferTexel) {
        self.depth.set(x, y, depth);
        self.albedo.set(x, y, texel.albedo);
        self.normal_emissive.set(x, y, texel.normal_emissive);
        self.frag_pos.set(x, y, texel.frag_pos);
    }
}

impl GBufferStorage for SoftwareGBuffer {
    type Texture = Plane<Vec4>;
    type DepthTexture = Plane<f32>;

    fn size(&self) -> ViewportSize {
        self.albedo.size()
    }

    fn color(&self, attachment: ColorAttachment) -> &Plane<Vec4> {
        match attachment {
            ColorAttachment::Albedo => &self.albedo,
            ColorAttachment::NormalEmissive => &self.normal_emissive,
            ColorAttachment::FragPos => &self.frag_pos,
        }
    }

    fn depth(&self) -> &Plane<f32> {
        &self.depth
    }
}

/// Deferred backend that renders into a [`Framebuffer`].
#[derive(Debug, Clone)]
pub struct SoftwareBackend {
    program: LightingCompositeProgram,
    max_dimension: u32,
}

impl SoftwareBackend {
    /// Same as the wgpu downlevel default for 2D textures.
    pub const DEFAULT_MAX_DIMENSION: u32 = 8192;

    pub fn new(light_count: usize, config: CompositeConfig) -> Result<Self, RenderError> {
        Ok(Self {
            program: LightingCompositeProgram::specialize(light_count, config)?,
            max_dimension: Self::DEFAULT_MAX_DIMENSION,
        })
    }

    /// Caps attachment width/height, emulating a device texture limit.
    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    /// Empty display target. The composite pass sizes it to the G-buffer.
    pub fn framebuffer(&self) -> Framebuffer {
        Framebuffer::empty()
    }
}

impl DeferredBackend for SoftwareBackend {
    type Storage = SoftwareGBuffer;
    type Target<'t> = Framebuffer;

    fn composite_program(&self) -> &LightingCompositeProgram {
        &self.program
    }

    fn allocate_gbuffer(&mut self, size: ViewportSize) -> Result<SoftwareGBuffer, RenderError> {
        if size.width > self.max_dimension || size.height > self.max_dimension {
            return Err(RenderError::ResourceExhaustion {
                size,
                reason: format!("exceeds max texture dimension {}", self.max_dimension),
            });
        }
        SoftwareGBuffer::allocate(size)
    }

    fn geometry_pass(
        &mut self,
        _target: &mut Self::Target<'_>,
        gbuffer: &mut GBufferWriter<'_, SoftwareGBuffer>,
        scene: &Scene,
        camera: &Camera,
    ) -> Result<(), RenderError> {
        let storage = gbuffer.storage_mut();
        storage.clear();

        let view = camera.view_matrix();
        let projection = camera.projection_matrix();
        for object in scene.visible_objects() {
            let mesh = scene.mesh(object.mesh).ok_or_else(|| {
                RenderError::Configuration(format!("object references unknown mesh {}", object.mesh.index()))
            })?;
            raster::draw_mesh(storage, mesh, object.transform, view, projection, &object.material);
        }
        Ok(())
    }

    fn composite_pass(
        &mut self,
        target: &mut Self::Target<'_>,
        gbuffer: &GBufferReader<'_, SoftwareGBuffer>,
        lights: &[LightSample],
        camera_world: Mat4,
    ) -> Result<(), RenderError> {
        let clear = self.program.config().clear_color;
        let size = gbuffer.size();
        if target.size() == size {
            target.fill(clear);
        } else {
            *target = Framebuffer::try_filled(size, clear)?;
        }

        let storage = gbuffer.storage();
        for y in 0..size.height {
            for x in 0..size.width {
                if let Some(texel) = storage.texel(x, y) {
                    target.set(x, y, self.program.shade(&texel, lights, camera_world));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::lighting::{LightSet, PointLight};
    use crate::render::deferred::{FrameOrchestrator, FrameOutcome};
    use crate::scene::{Mesh, SurfaceMaterial};

    const CUBE_COLOR: Vec3 = Vec3::new(0.8, 0.3, 0.2);

    struct Harness {
        backend: SoftwareBackend,
        orchestrator: FrameOrchestrator<SoftwareBackend>,
        framebuffer: Framebuffer,
        scene: Scene,
        camera: Camera,
        lights: LightSet,
    }

    impl Harness {
        fn new(material: SurfaceMaterial, lights: Vec<PointLight>) -> Self {
            let lights = LightSet::new(lights);
            let mut backend = SoftwareBackend::new(lights.len(), CompositeConfig::default()).unwrap();
            let orchestrator = FrameOrchestrator::new(&mut backend, &lights).unwrap();

            let mut scene = Scene::new();
            let cube = scene.add_mesh(Mesh::cube());
            scene.spawn(cube, Mat4::IDENTITY, material);

            Self {
                framebuffer: backend.framebuffer(),
                backend,
                orchestrator,
                scene,
                camera: Camera::looking_at(Vec3::new(0.0, 1.5, 3.0), Vec3::ZERO, 75.0),
                lights,
            }
        }

        fn render(&mut self, size: ViewportSize) -> Result<FrameOutcome, RenderError> {
            self.orchestrator.render_frame(
                &mut self.backend,
                &mut self.framebuffer,
                size,
                &self.scene,
                &mut self.camera,
                &self.lights,
            )
        }

        fn pixel_of(&self, world: Vec3) -> (u32, u32) {
            let size = self.framebuffer.size();
            let ndc = self.camera.view_projection_matrix().project_point3(world);
            let x = (ndc.x * 0.5 + 0.5) * size.width as f32;
            let y = (0.5 - ndc.y * 0.5) * size.height as f32;
            (x as u32, y as u32)
        }

        fn texel(&self, (x, y): (u32, u32)) -> GBufferTexel {
            self.orchestrator.gbuffer().read().storage().texel(x, y).unwrap()
        }

        fn output(&self, (x, y): (u32, u32)) -> Vec4 {
            self.framebuffer.get(x, y).unwrap()
        }
    }

    fn overhead_light() -> PointLight {
        PointLight::new(1.0, Vec3::ONE).with_position(Vec3::new(0.0, 5.0, 0.0))
    }

    // ── end to end ────────────────────────────────────────────────────────

    #[test]
    fn lit_top_face_is_positive_and_front_face_is_black() {
        let mut h = Harness::new(SurfaceMaterial::diffuse(CUBE_COLOR), vec![overhead_light()]);
        assert_eq!(h.render(ViewportSize::new(128, 128)), Ok(FrameOutcome::Rendered { resized: true }));

        let top = h.pixel_of(Vec3::new(0.0, 0.5, 0.0));
        let top_out = h.output(top);
        assert!(top_out.truncate().is_finite());
        assert!(top_out.x > 0.0 && top_out.y > 0.0 && top_out.z > 0.0, "{top_out:?}");
        assert_eq!(top_out.w, 1.0);

        // The front face (+Z) points away from the overhead light.
        let front = h.pixel_of(Vec3::new(0.0, 0.0, 0.5));
        let front_texel = h.texel(front);
        assert_eq!(front_texel.albedo.w, 1.0, "front face not covered");
        let world_normal = h
            .camera
            .world_transform()
            .transform_vector3(front_texel.normal_emissive.truncate());
        assert!((world_normal - Vec3::Z).length() < 1e-4, "{world_normal:?}");
        assert_eq!(h.output(front), Vec4::new(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn background_is_black_with_alpha_one() {
        let mut h = Harness::new(SurfaceMaterial::diffuse(CUBE_COLOR), vec![overhead_light()]);
        h.render(ViewportSize::new(64, 64)).unwrap();
        assert_eq!(h.texel((0, 0)), GBufferTexel::CLEAR);
        assert_eq!(h.output((0, 0)), Vec4::new(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn emissive_cube_without_lights_shows_albedo_times_emissive() {
        let mut h = Harness::new(SurfaceMaterial::new(CUBE_COLOR, 2.0), Vec::new());
        h.render(ViewportSize::new(64, 64)).unwrap();

        let top = h.pixel_of(Vec3::new(0.0, 0.5, 0.0));
        assert_eq!(h.output(top), (CUBE_COLOR * 2.0).extend(1.0));
    }

    #[test]
    fn light_order_does_not_change_the_image() {
        let lights = vec![
            overhead_light(),
            PointLight::new(0.7, Vec3::new(1.0, 0.2, 0.2)).with_position(Vec3::new(2.0, 1.0, 1.0)),
            PointLight::new(1.5, Vec3::new(0.1, 0.4, 1.0)).with_position(Vec3::new(-1.0, 2.0, 2.0)),
        ];
        let mut reversed = lights.clone();
        reversed.reverse();

        let mut a = Harness::new(SurfaceMaterial::diffuse(CUBE_COLOR), lights);
        let mut b = Harness::new(SurfaceMaterial::diffuse(CUBE_COLOR), reversed);
        a.render(ViewportSize::new(48, 48)).unwrap();
        b.render(ViewportSize::new(48, 48)).unwrap();

        for (pa, pb) in a.framebuffer.as_slice().iter().zip(b.framebuffer.as_slice()) {
            assert!((*pa - *pb).abs().max_element() < 1e-5);
        }
    }

    // ── resize ────────────────────────────────────────────────────────────

    #[test]
    fn resize_reallocates_every_attachment_in_the_same_frame() {
        let mut h = Harness::new(SurfaceMaterial::diffuse(CUBE_COLOR), vec![overhead_light()]);
        h.render(ViewportSize::new(100, 100)).unwrap();
        let outcome = h.render(ViewportSize::new(200, 150)).unwrap();

        assert_eq!(outcome, FrameOutcome::Rendered { resized: true });
        let expected = ViewportSize::new(200, 150);
        let reader = h.orchestrator.gbuffer().read();
        for attachment in ColorAttachment::ALL {
            assert_eq!(reader.attachment_texture(attachment).size(), expected);
        }
        assert_eq!(reader.depth_texture().size(), expected);
        assert_eq!(h.framebuffer.size(), expected);
        assert_eq!(h.camera.aspect(), 200.0 / 150.0);
    }

    #[test]
    fn degenerate_resize_renders_nothing() {
        let mut h = Harness::new(SurfaceMaterial::diffuse(CUBE_COLOR), vec![overhead_light()]);
        h.render(ViewportSize::new(80, 60)).unwrap();
        let image = h.framebuffer.clone();
        let aspect = h.camera.aspect();

        h.lights.lights_mut()[0].position = Vec3::new(0.0, 1.0, 5.0);
        assert_eq!(h.render(ViewportSize::new(0, 60)), Ok(FrameOutcome::Skipped));

        assert_eq!(h.orchestrator.gbuffer().size(), ViewportSize::new(80, 60));
        assert_eq!(h.camera.aspect(), aspect);
        assert_eq!(h.framebuffer, image);
    }

    #[test]
    fn oversized_viewport_keeps_previous_attachments() {
        let mut h = Harness::new(SurfaceMaterial::diffuse(CUBE_COLOR), vec![overhead_light()]);
        h.backend = h.backend.clone().with_max_dimension(64);
        h.render(ViewportSize::new(32, 32)).unwrap();

        let err = h.render(ViewportSize::new(128, 32)).unwrap_err();
        assert!(matches!(err, RenderError::ResourceExhaustion { .. }));
        assert_eq!(h.orchestrator.gbuffer().size(), ViewportSize::new(32, 32));
        assert_eq!(h.framebuffer.size(), ViewportSize::new(32, 32));

        // Next frame at a supported size proceeds normally.
        assert!(h.render(ViewportSize::new(64, 64)).is_ok());
    }
}
