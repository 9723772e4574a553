//! Deferred shading viewer: a cube lit by orbiting point lights.

use anyhow::Result;
use glam::{Mat4, Vec3};
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{Key, NamedKey};
use winit::window::WindowId;

use lumen_engine::core::{App, AppControl, FrameCtx};
use lumen_engine::device::{Gpu, GpuInit};
use lumen_engine::lighting::{LightSet, PointLight, SeededOrbit};
use lumen_engine::logging::{init_logging, LoggingConfig};
use lumen_engine::render::deferred::{CompositeConfig, FrameOrchestrator, FrameStart};
use lumen_engine::render::gpu::WgpuBackend;
use lumen_engine::render::RenderError;
use lumen_engine::scene::{Camera, Mesh, ObjectId, Scene, SurfaceMaterial};
use lumen_engine::window::{Runtime, RuntimeConfig};

/// Light marker sphere radius.
const MARKER_RADIUS: f32 = 0.1;

#[derive(Debug, Clone)]
struct ViewerConfig {
    light_count: usize,
    /// Base seed; light `i` animates with `seed + i`.
    seed: u32,
    light_brightness: f32,
    cube_color: Vec3,
    /// Camera orbit speed, radians per second.
    orbit_speed: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            light_count: 8,
            seed: 1,
            light_brightness: 3.0,
            cube_color: Vec3::ONE,
            orbit_speed: 0.15,
        }
    }
}

struct Renderer {
    backend: WgpuBackend,
    orchestrator: FrameOrchestrator<WgpuBackend>,
}

impl Renderer {
    fn new(gpu: &Gpu<'_>, lights: &LightSet) -> Result<Self, RenderError> {
        let mut backend = WgpuBackend::new(
            gpu.device(),
            gpu.queue(),
            gpu.surface_format(),
            lights.len(),
            CompositeConfig::default(),
        )?;
        let orchestrator = FrameOrchestrator::new(&mut backend, lights)?;
        Ok(Self { backend, orchestrator })
    }
}

struct Viewer {
    config: ViewerConfig,
    scene: Scene,
    camera: Camera,
    lights: LightSet,
    animation: SeededOrbit,
    /// One marker object per light, same order as the light set.
    markers: Vec<ObjectId>,
    orbit_angle: f32,
    renderer: Option<Renderer>,
}

impl Viewer {
    fn new(config: ViewerConfig) -> Self {
        let mut scene = Scene::new();
        let cube = scene.add_mesh(Mesh::cube());
        scene.spawn(cube, Mat4::IDENTITY, SurfaceMaterial::diffuse(config.cube_color));

        let lights = LightSet::new(
            (0..config.light_count)
                .map(|i| {
                    let hue = i as f32 / config.light_count.max(1) as f32;
                    PointLight::new(config.light_brightness, hue_to_rgb(hue))
                        .with_seed(config.seed.wrapping_add(i as u32))
                })
                .collect(),
        );

        let sphere = scene.add_mesh(Mesh::uv_sphere(MARKER_RADIUS, 16, 8));
        let markers = lights
            .lights()
            .iter()
            .map(|_| scene.spawn(sphere, Mat4::IDENTITY, SurfaceMaterial::emissive(Vec3::ONE, 1.0)))
            .collect();

        Self {
            config,
            scene,
            camera: Camera::default(),
            lights,
            animation: SeededOrbit::default(),
            markers,
            orbit_angle: 0.0,
            renderer: None,
        }
    }

    /// Advances lights, markers and the camera orbit to `elapsed` seconds.
    fn update(&mut self, elapsed: f32, dt: f32) {
        self.lights.animate(&self.animation, elapsed);
        for (light, id) in self.lights.lights().iter().zip(&self.markers) {
            if let Some(object) = self.scene.object_mut(*id) {
                object.transform = Mat4::from_translation(light.position);
            }
        }

        // Orbit the initial eye position (0, 1, 2) around the target.
        self.orbit_angle += self.config.orbit_speed * dt;
        let target = self.camera.target;
        self.camera.position = target + Vec3::new(2.0 * self.orbit_angle.sin(), 0.5, 2.0 * self.orbit_angle.cos());
    }
}

impl App for Viewer {
    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed && event.logical_key == Key::Named(NamedKey::Escape) =>
            {
                AppControl::Exit
            }
            _ => AppControl::Continue,
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        self.update(ctx.time.elapsed, ctx.time.dt);

        if self.renderer.is_none() {
            match Renderer::new(ctx.gpu, &self.lights) {
                Ok(r) => self.renderer = Some(r),
                Err(err) => {
                    log::error!("cannot set up renderer: {err}");
                    return AppControl::Exit;
                }
            }
        }

        let Self {
            scene,
            camera,
            lights,
            renderer: Some(Renderer { backend, orchestrator }),
            ..
        } = self
        else {
            return AppControl::Exit;
        };

        let viewport = ctx.window.viewport_size();
        let frame = match orchestrator.begin_frame(backend, viewport, camera) {
            Ok(FrameStart::Ready(frame)) => frame,
            Ok(FrameStart::Skipped(_)) => return AppControl::Continue,
            Err(err) => return on_render_error(err),
        };

        match ctx.render(|target| frame.render(backend, target, scene, camera, lights)) {
            Ok(control) => control,
            Err(err) => on_render_error(err),
        }
    }
}

/// Recoverable errors cost one frame; anything else ends the session.
fn on_render_error(err: RenderError) -> AppControl {
    if err.is_recoverable() {
        AppControl::Continue
    } else {
        log::error!("{err}");
        AppControl::Exit
    }
}

/// Fully saturated color for `hue` in `[0, 1)`.
fn hue_to_rgb(hue: f32) -> Vec3 {
    let h = hue.rem_euclid(1.0) * 6.0;
    let channel = |offset: f32| (((h + offset) % 6.0 - 3.0).abs() - 1.0).clamp(0.0, 1.0);
    Vec3::new(channel(0.0), channel(4.0), channel(2.0))
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = ViewerConfig::default();
    log::info!("starting viewer with {} lights", config.light_count);

    Runtime::run(
        RuntimeConfig {
            title: "lumen viewer".to_string(),
            ..RuntimeConfig::default()
        },
        GpuInit::default(),
        Viewer::new(config),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hue_wheel_primaries() {
        let close = |a: Vec3, b: Vec3| (a - b).abs().max_element() < 1e-5;
        assert!(close(hue_to_rgb(0.0), Vec3::X));
        assert!(close(hue_to_rgb(1.0 / 3.0), Vec3::Y));
        assert!(close(hue_to_rgb(2.0 / 3.0), Vec3::Z));
    }

    #[test]
    fn markers_follow_lights() {
        let mut viewer = Viewer::new(ViewerConfig::default());
        viewer.update(2.5, 0.016);
        for (light, id) in viewer.lights.lights().iter().zip(&viewer.markers) {
            let object = viewer.scene.object(*id).unwrap();
            assert_eq!(object.transform, Mat4::from_translation(light.position));
            assert_eq!(object.material.emissive, 1.0);
        }
    }

    #[test]
    fn camera_starts_on_initial_orbit() {
        let mut viewer = Viewer::new(ViewerConfig::default());
        viewer.update(0.0, 0.0);
        assert_eq!(viewer.camera.position, Vec3::new(0.0, 1.0, 2.0));
    }
}
