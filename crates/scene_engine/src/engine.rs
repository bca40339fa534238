//! Core engine implementation

use std::collections::HashSet;

use thiserror::Error;

use crate::application::Application;
use crate::core::config::ApplicationConfig;
use crate::foundation::math::{Mat4, Vec3};
use crate::foundation::time::FrameTimer;
use crate::render::assets::Assets;
use crate::render::camera::Camera;
use crate::render::frame::{FrameError, FrameLifecycle, FramePhase, FrameStats, LightUploadMode, RenderBackend};
use crate::render::lighting::LightTierManager;
use crate::render::material::Material;
use crate::render::shader::{try_set, ProgramCompiler, Shader, ShaderKind, UniformValue};
use crate::render::texture::TextureBackend;
use crate::scene::{
    CommandQueue, FactoryError, InputContext, Scene, SceneCommand, SceneObjectFactory, SceneObjectRegistry,
};

/// Main engine struct
///
/// Owns the scene, the render assets and the frame lifecycle. Everything
/// runs on one thread; the lifecycle decides when the scene's structure may
/// change.
#[derive(Debug)]
pub struct Engine {
    config: ApplicationConfig,
    scene: Scene,
    assets: Assets,
    factory: SceneObjectFactory,
    camera: Camera,
    commands: CommandQueue,
    input: InputContext,
    lifecycle: FrameLifecycle,
    timer: FrameTimer,
    default_material: Material,
    last_stats: FrameStats,
    running: bool,
}

impl Engine {
    /// Create an engine over already loaded assets
    ///
    /// Fails when the configuration is invalid or no shader is available.
    pub fn new(config: ApplicationConfig, assets: Assets) -> Result<Self, EngineError> {
        log::info!("Initializing engine...");

        config
            .validate()
            .map_err(|e| EngineError::InitializationFailed(format!("Configuration: {e}")))?;
        if assets.shaders.is_empty() {
            return Err(EngineError::InitializationFailed(
                "no shader program available".to_string(),
            ));
        }

        let scene = Scene::new(&config.lighting);
        let factory = SceneObjectFactory::new(config.scene.default_shader.clone());
        let timer = FrameTimer::new(config.engine.target_fps);

        Ok(Self {
            config,
            scene,
            assets,
            factory,
            camera: Camera::default(),
            commands: CommandQueue::new(),
            input: InputContext::default(),
            lifecycle: FrameLifecycle::new(),
            timer,
            default_material: Material::default(),
            last_stats: FrameStats::default(),
            running: true,
        })
    }

    /// Load assets as configured, then create the engine
    pub fn with_compiler(
        config: ApplicationConfig,
        compiler: &mut dyn ProgramCompiler,
        texture_backend: Box<dyn TextureBackend>,
    ) -> Result<Self, EngineError> {
        let assets = Assets::load(&config.assets, compiler, texture_backend)
            .map_err(|e| EngineError::InitializationFailed(format!("Shaders: {e}")))?;
        Self::new(config, assets)
    }

    /// Run the main loop until the backend closes or [`Engine::quit`] is called
    pub fn run<A: Application>(&mut self, app: &mut A, backend: &mut dyn RenderBackend) -> Result<(), EngineError> {
        app.initialize(self)
            .map_err(|e| EngineError::ApplicationError(format!("App initialization: {e}")))?;

        log::info!("Starting main loop...");
        self.running = true;
        self.timer.reset();

        while self.running && !backend.should_close() {
            let delta_time = self.timer.tick();

            app.update(self, delta_time)
                .map_err(|e| EngineError::ApplicationError(format!("App update: {e}")))?;
            self.update_inputs(delta_time);

            self.run_frame(backend, |engine| {
                if let Err(e) = app.ui(engine) {
                    log::error!("UI pass failed: {}", e);
                }
            })?;
        }

        app.cleanup(self);
        log::info!(
            "Engine shutdown complete after {} frames ({:.1} fps average)",
            self.timer.frame_count(),
            self.timer.average_fps()
        );
        Ok(())
    }

    /// Execute one frame: cleanup, draw, light upload, overlay, present
    ///
    /// `ui` runs during the overlay phase. Per-object problems are logged
    /// and counted in the returned stats; only an out-of-order call (for
    /// example from inside `ui`) is an error. A frame that fails after it
    /// started is abandoned and the lifecycle drops back to `Idle`.
    pub fn run_frame<F>(&mut self, backend: &mut dyn RenderBackend, ui: F) -> Result<FrameStats, EngineError>
    where
        F: FnOnce(&mut Self),
    {
        self.lifecycle.advance(FramePhase::Cleanup)?;
        match self.finish_frame(backend, ui) {
            Ok(stats) => Ok(stats),
            Err(e) => {
                self.lifecycle.reset();
                Err(e)
            }
        }
    }

    fn finish_frame<F>(&mut self, backend: &mut dyn RenderBackend, ui: F) -> Result<FrameStats, EngineError>
    where
        F: FnOnce(&mut Self),
    {
        let mut stats = FrameStats {
            frame: self.lifecycle.frame(),
            ..FrameStats::default()
        };

        stats.objects_swept = self.scene.sweep();
        stats.commands_applied = self.commands.apply(&mut self.factory, &mut self.scene, &self.assets);
        if self.config.engine.debug_mode {
            if let Err(e) = self.scene.objects.check_consistency() {
                log::error!("Registry inconsistent after cleanup of frame {}: {}", stats.frame, e);
            }
            stats.registry_checked = true;
        }

        self.lifecycle.advance(FramePhase::Draw)?;
        backend.begin_frame();
        self.draw(backend, &mut stats);

        self.lifecycle.advance(FramePhase::LightUpload)?;
        self.upload_helper_lights(&mut stats);

        self.lifecycle.advance(FramePhase::UiOverlay)?;
        ui(self);

        self.lifecycle.advance(FramePhase::Present)?;
        backend.present();
        self.lifecycle.advance(FramePhase::Idle)?;

        log::trace!("Frame {} stats: {:?}", stats.frame, stats);
        self.last_stats = stats;
        Ok(stats)
    }

    fn draw(&mut self, backend: &mut dyn RenderBackend, stats: &mut FrameStats) {
        let ambient = self.config.lighting.global_ambient();
        let batched = self.config.scene.light_upload_mode == LightUploadMode::Batched;
        self.draw_grid(backend, stats);

        let objects = &self.scene.objects;
        let lights = &mut self.scene.lights;

        if batched {
            let mut uploaded = HashSet::new();
            for (_, object) in objects.iter_live() {
                let Some(shader) = object.shader() else {
                    continue;
                };
                if shader.kind() == ShaderKind::Basic && uploaded.insert(shader.name().to_string()) {
                    upload_lighting(shader, lights, objects, ambient, stats);
                }
            }
        }

        for (_, object) in objects.iter_live() {
            if object.is_marked_for_deletion() {
                continue;
            }
            let Some(shader) = object.shader() else {
                log::warn!("Object '{}' has no shader, skipping draw", object.name());
                stats.skipped += 1;
                continue;
            };
            let material = object.material().unwrap_or(&self.default_material);

            shader.bind();
            if !batched && shader.kind() == ShaderKind::Basic {
                upload_lighting(shader, lights, objects, ambient, stats);
            }
            stats.missing_uniforms += shader.set_material(material, &self.assets.textures);
            stats.missing_uniforms += shader.set_matrices(&object.transform.model_matrix(), &self.camera);

            backend.draw_mesh(object.mesh());
            stats.drawn += 1;
        }
    }

    fn draw_grid(&self, backend: &mut dyn RenderBackend, stats: &mut FrameStats) {
        let Some(name) = self.config.scene.grid_shader.as_deref() else {
            return;
        };
        let Some(shader) = self.assets.shaders.get(name) else {
            log::trace!("Grid shader '{}' not loaded, skipping grid", name);
            return;
        };
        if shader.kind() != ShaderKind::Grid {
            log::warn!("Shader '{}' is not a grid shader, skipping grid", name);
            return;
        }
        let Some(mesh) = self.factory.meshes().get("grid") else {
            log::warn!("Grid mesh missing, skipping grid");
            return;
        };

        shader.bind();
        stats.missing_uniforms += shader.set_matrices(&Mat4::identity(), &self.camera);
        backend.draw_mesh(&mesh);
        stats.grid_drawn = true;
    }

    fn upload_helper_lights(&mut self, stats: &mut FrameStats) {
        let Some(helper) = self.assets.shaders.helper() else {
            return;
        };
        if helper.kind() == ShaderKind::Basic {
            let ambient = self.config.lighting.global_ambient();
            upload_lighting(&helper, &mut self.scene.lights, &self.scene.objects, ambient, stats);
        }
    }

    /// Advance input time and run every object's input behaviour
    pub fn update_inputs(&mut self, delta_time: f32) {
        self.input.advance(delta_time);
        self.scene.objects.update_inputs(&self.input);
    }

    /// Queue a creation request for the next cleanup phase
    pub fn queue_command(&mut self, command: SceneCommand) {
        self.commands.push(command);
    }

    /// Flag an object for deletion; it disappears at the next cleanup
    pub fn delete_object(&mut self, name: &str) -> bool {
        self.scene.delete_object(name)
    }

    /// Build scene content directly through the factory
    ///
    /// Only allowed before the first frame and during cleanup; at any other
    /// time use [`Engine::queue_command`].
    pub fn build_scene<R, F>(&mut self, build: F) -> Result<R, EngineError>
    where
        F: FnOnce(&mut SceneObjectFactory, &mut Scene, &Assets) -> Result<R, FactoryError>,
    {
        let phase = self.lifecycle.phase();
        let before_first_frame = phase == FramePhase::Idle && self.lifecycle.frame() == 0;
        if !before_first_frame && !phase.allows_structural_changes() {
            log::warn!("Scene structure cannot change during {}", phase);
            return Err(EngineError::SceneLocked(phase));
        }
        Ok(build(&mut self.factory, &mut self.scene, &self.assets)?)
    }

    /// Populate the startup scene: a spot light, a point light and two cubes
    pub fn setup_default_scene(&mut self) -> Result<(), EngineError> {
        self.build_scene(|factory, scene, assets| factory.setup_default_scene(scene, assets))
    }

    /// Request engine shutdown
    pub fn quit(&mut self) {
        log::info!("Engine shutdown requested");
        self.running = false;
    }

    /// Whether the main loop keeps going
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Active configuration
    pub fn config(&self) -> &ApplicationConfig {
        &self.config
    }

    /// Scene objects and lights
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Mutable scene access for transform, material and light edits
    ///
    /// Adding objects through this outside of cleanup bypasses the frame
    /// ordering; prefer [`Engine::queue_command`] for that.
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Shaders, materials and textures
    pub fn assets(&self) -> &Assets {
        &self.assets
    }

    /// Mutable asset access
    pub fn assets_mut(&mut self) -> &mut Assets {
        &mut self.assets
    }

    /// Object factory
    pub fn factory(&self) -> &SceneObjectFactory {
        &self.factory
    }

    /// Active camera
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Mutable camera
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Input state shared by all behaviours
    pub fn input(&self) -> &InputContext {
        &self.input
    }

    /// Mutable input state, e.g. to change rotation speed
    pub fn input_mut(&mut self) -> &mut InputContext {
        &mut self.input
    }

    /// Current frame phase
    pub fn phase(&self) -> FramePhase {
        self.lifecycle.phase()
    }

    /// Frames started so far
    pub fn frame_count(&self) -> u64 {
        self.lifecycle.frame()
    }

    /// Commands waiting for the next cleanup
    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }

    /// Stats of the last completed frame
    pub fn last_frame_stats(&self) -> FrameStats {
        self.last_stats
    }
}

/// Write global ambient and every light into `shader`'s program
fn upload_lighting(
    shader: &Shader,
    lights: &mut LightTierManager,
    objects: &SceneObjectRegistry,
    ambient: Vec3,
    stats: &mut FrameStats,
) {
    let program = shader.program();
    if !try_set(program, "globalAmbient", UniformValue::Vec3(ambient)) {
        stats.missing_uniforms += 1;
    }
    let report = lights.upload(objects, program);
    stats.lights_uploaded += report.lights_written;
    stats.missing_uniforms += report.missing_uniforms;
}

/// Engine-level errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Initialization error
    #[error("Engine initialization failed: {0}")]
    InitializationFailed(String),

    /// Frame phases were entered out of order
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    /// Factory could not build the requested content
    #[error("Scene error: {0}")]
    Scene(#[from] FactoryError),

    /// Structural change attempted outside of cleanup
    #[error("Scene structure is locked during {0}")]
    SceneLocked(FramePhase),

    /// Application error
    #[error("Application error: {0}")]
    ApplicationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::AppError;
    use crate::render::frame::HeadlessBackend;
    use crate::render::lighting::LightType;
    use crate::render::mesh::Mesh;
    use crate::render::shader::RecordingCompiler;
    use crate::scene::{Mobility, SceneObject};
    use std::path::Path;
    use std::rc::Rc;

    const SHADERS: &str = r#"{
        "shaders": [
            { "name": "basic", "type": "GLSL",
              "stages": { "vertex": "basic.vert", "fragment": "basic.frag" } },
            { "name": "light", "type": "GLSL", "helper": true,
              "stages": { "vertex": "light.vert", "fragment": "light.frag" } }
        ]
    }"#;

    const MATERIALS: &str = r#"{
        "materials": [
            { "name": "leather", "ambient": [0.2, 0.1, 0.05], "diffuse": [0.6, 0.3, 0.1],
              "specular": [0.1, 0.1, 0.1], "shininess": 4.0 },
            { "name": "gold", "ambient": [0.25, 0.2, 0.07], "diffuse": [0.75, 0.6, 0.22],
              "specular": [0.63, 0.55, 0.37], "shininess": 51.2 }
        ]
    }"#;

    fn engine_with(mode: LightUploadMode, compiler: RecordingCompiler) -> (Engine, RecordingCompiler) {
        let mut compiler = compiler;
        let mut assets = Assets::headless();
        assets.shaders.load_str(SHADERS, Path::new("shaders"), &mut compiler).unwrap();
        assets.materials.load_str(MATERIALS, &mut assets.textures).unwrap();

        let mut config = ApplicationConfig::default();
        config.scene.light_upload_mode = mode;
        let mut engine = Engine::new(config, assets).unwrap();
        engine.setup_default_scene().unwrap();
        (engine, compiler)
    }

    fn engine(mode: LightUploadMode) -> (Engine, RecordingCompiler) {
        engine_with(mode, RecordingCompiler::new(16))
    }

    #[test]
    fn test_default_scene_frame() {
        let (mut engine, compiler) = engine(LightUploadMode::PerObject);
        let mut backend = HeadlessBackend::new();

        let stats = engine.run_frame(&mut backend, |_| {}).unwrap();

        assert_eq!(stats.frame, 1);
        assert_eq!(stats.drawn, 4);
        assert_eq!(stats.skipped, 0);
        assert_eq!(stats.missing_uniforms, 0);
        // Two lights per object plus the helper program
        assert_eq!(stats.lights_uploaded, 10);
        assert_eq!(backend.draw_calls(), 4);
        assert_eq!(engine.phase(), FramePhase::Idle);

        let basic = compiler.program("basic").unwrap();
        assert_eq!(basic.value("activeLightCount"), Some(UniformValue::Uint(2)));
        assert!(basic.was_written("globalAmbient"));
        let helper = compiler.program("light").unwrap();
        assert_eq!(helper.value("activeLightCount"), Some(UniformValue::Uint(2)));
    }

    #[test]
    fn test_batched_upload_once_per_program() {
        let (mut engine, compiler) = engine(LightUploadMode::Batched);
        let mut backend = HeadlessBackend::new();

        let stats = engine.run_frame(&mut backend, |_| {}).unwrap();

        assert_eq!(stats.drawn, 4);
        assert_eq!(stats.lights_uploaded, 4);
        assert_eq!(compiler.program("basic").unwrap().bind_count(), 5);
    }

    #[test]
    fn test_deletion_during_overlay_applies_next_frame() {
        let (mut engine, _compiler) = engine(LightUploadMode::PerObject);
        let mut backend = HeadlessBackend::new();

        let first = engine
            .run_frame(&mut backend, |engine| {
                assert!(engine.delete_object("cube_1"));
            })
            .unwrap();
        assert_eq!(first.drawn, 4);
        assert!(engine.scene().objects.find_by_name("cube_1").is_some());

        let second = engine.run_frame(&mut backend, |_| {}).unwrap();
        assert_eq!(second.objects_swept, 1);
        assert_eq!(second.drawn, 3);
        assert!(engine.scene().objects.find_by_name("cube_1").is_none());
    }

    #[test]
    fn test_deleting_light_marker_shrinks_light_count() {
        let (mut engine, compiler) = engine(LightUploadMode::PerObject);
        let mut backend = HeadlessBackend::new();

        engine.delete_object("spot_1");
        engine.run_frame(&mut backend, |_| {}).unwrap();

        let basic = compiler.program("basic").unwrap();
        assert_eq!(basic.value("activeLightCount"), Some(UniformValue::Uint(1)));
        assert_eq!(engine.scene().lights.total_active_count(), 1);
    }

    #[test]
    fn test_queued_commands_wait_for_cleanup() {
        let (mut engine, _compiler) = engine(LightUploadMode::PerObject);
        let mut backend = HeadlessBackend::new();

        engine
            .run_frame(&mut backend, |engine| {
                engine.queue_command(SceneCommand::CreateSphere { position: Vec3::zeros() });
                engine.queue_command(SceneCommand::CreateLight {
                    light_type: LightType::Point,
                    position: Vec3::new(0.0, 20.0, 0.0),
                    mobility: Mobility::Dynamic,
                });
                assert!(engine.scene().objects.find_by_name("sphere_1").is_none());
            })
            .unwrap();
        assert_eq!(engine.pending_commands(), 2);

        let stats = engine.run_frame(&mut backend, |_| {}).unwrap();
        assert_eq!(stats.commands_applied, 2);
        assert_eq!(stats.drawn, 6);
        assert_eq!(engine.pending_commands(), 0);
        assert_eq!(engine.scene().lights.total_active_count(), 3);
    }

    #[test]
    fn test_structure_locked_during_overlay() {
        let (mut engine, _compiler) = engine(LightUploadMode::PerObject);
        let mut backend = HeadlessBackend::new();

        engine
            .run_frame(&mut backend, |engine| {
                let result = engine.build_scene(|factory, scene, assets| factory.create_cube(scene, assets));
                assert!(matches!(result, Err(EngineError::SceneLocked(FramePhase::UiOverlay))));
                assert!(matches!(
                    engine.run_frame(&mut HeadlessBackend::new(), |_| {}),
                    Err(EngineError::Frame(_))
                ));
            })
            .unwrap();
        assert_eq!(engine.phase(), FramePhase::Idle);
    }

    #[test]
    fn test_object_without_shader_is_skipped() {
        let (mut engine, _compiler) = engine(LightUploadMode::PerObject);
        let mut backend = HeadlessBackend::new();
        engine
            .scene_mut()
            .objects
            .create(SceneObject::new("bare", Rc::new(Mesh::triangle())))
            .unwrap();

        let stats = engine.run_frame(&mut backend, |_| {}).unwrap();
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.drawn, 4);
    }

    #[test]
    fn test_missing_light_uniform_does_not_abort_frame() {
        let (mut engine, compiler) =
            engine_with(LightUploadMode::PerObject, RecordingCompiler::new(16).without_uniform("lights[0].cutOff"));
        let mut backend = HeadlessBackend::new();

        let stats = engine.run_frame(&mut backend, |_| {}).unwrap();

        assert_eq!(stats.drawn, 4);
        assert_eq!(stats.missing_uniforms, 5);
        let basic = compiler.program("basic").unwrap();
        assert!(basic.was_written("lights[0].outerCutOff"));
        assert_eq!(basic.value("activeLightCount"), Some(UniformValue::Uint(2)));
    }

    #[test]
    fn test_missing_materials_fall_back_to_default() {
        let mut compiler = RecordingCompiler::new(4);
        let mut assets = Assets::headless();
        assets.shaders.load_str(SHADERS, Path::new("shaders"), &mut compiler).unwrap();
        let mut engine = Engine::new(ApplicationConfig::default(), assets).unwrap();
        engine
            .build_scene(|factory, scene, assets| factory.create_cube(scene, assets))
            .unwrap();

        let stats = engine.run_frame(&mut HeadlessBackend::new(), |_| {}).unwrap();
        assert_eq!(stats.drawn, 1);
        let basic = compiler.program("basic").unwrap();
        assert_eq!(basic.value("material.shininess"), Some(UniformValue::Float(8.0)));
    }

    const GRID_SHADERS: &str = r#"{
        "shaders": [
            { "name": "basic", "type": "GLSL",
              "stages": { "vertex": "basic.vert", "fragment": "basic.frag" } },
            { "name": "grid", "type": "grid",
              "stages": { "vertex": "grid.vert", "fragment": "grid.frag" } }
        ]
    }"#;

    fn bare_engine(config: ApplicationConfig, shaders: &str) -> (Engine, RecordingCompiler) {
        let mut compiler = RecordingCompiler::new(16);
        let mut assets = Assets::headless();
        assets.shaders.load_str(shaders, Path::new("shaders"), &mut compiler).unwrap();
        (Engine::new(config, assets).unwrap(), compiler)
    }

    #[test]
    fn test_replacement_light_fits_slot_freed_in_same_cleanup() {
        let mut config = ApplicationConfig::default();
        config.lighting = config.lighting.with_capacities(24, 1);
        let (mut engine, _compiler) = bare_engine(config, SHADERS);
        engine
            .build_scene(|factory, scene, assets| {
                factory.create_light_at(scene, assets, LightType::Point, Vec3::new(0.0, 5.0, 0.0), Mobility::Dynamic)
            })
            .unwrap();
        assert!(!engine.scene().lights.has_room(crate::render::lighting::LightTier::Dynamic));

        let mut backend = HeadlessBackend::new();
        engine
            .run_frame(&mut backend, |engine| {
                assert!(engine.delete_object("point_1"));
                engine.queue_command(SceneCommand::CreateLight {
                    light_type: LightType::Point,
                    position: Vec3::new(3.0, 5.0, 0.0),
                    mobility: Mobility::Dynamic,
                });
            })
            .unwrap();

        let stats = engine.run_frame(&mut backend, |_| {}).unwrap();
        assert_eq!(stats.objects_swept, 1);
        assert_eq!(stats.commands_applied, 1);
        assert_eq!(engine.scene().objects.names(), vec!["point_2"]);
        assert_eq!(engine.scene().lights.active_count(crate::render::lighting::LightTier::Dynamic), 1);
        // One light for the drawn marker plus one for the helper program
        assert_eq!(stats.lights_uploaded, 2);
    }

    #[test]
    fn test_grid_drawn_before_objects() {
        let (mut engine, compiler) = bare_engine(ApplicationConfig::default(), GRID_SHADERS);
        engine
            .build_scene(|factory, scene, assets| factory.create_cube(scene, assets))
            .unwrap();
        let mut backend = HeadlessBackend::new();

        let stats = engine.run_frame(&mut backend, |_| {}).unwrap();

        assert!(stats.grid_drawn);
        assert_eq!(stats.drawn, 1);
        assert_eq!(backend.draw_calls(), 2);
        let grid = compiler.program("grid").unwrap();
        assert_eq!(grid.bind_count(), 1);
        assert!(grid.was_written("u_view"));
        assert!(grid.was_written("u_projection"));
        assert!(!grid.was_written("activeLightCount"));
    }

    #[test]
    fn test_grid_disabled_or_not_a_grid_shader() {
        let mut config = ApplicationConfig::default();
        config.scene.grid_shader = None;
        let (mut engine, _compiler) = bare_engine(config, GRID_SHADERS);
        let stats = engine.run_frame(&mut HeadlessBackend::new(), |_| {}).unwrap();
        assert!(!stats.grid_drawn);

        let mut config = ApplicationConfig::default();
        config.scene.grid_shader = Some("basic".to_string());
        let (mut engine, _compiler) = bare_engine(config, GRID_SHADERS);
        let mut backend = HeadlessBackend::new();
        let stats = engine.run_frame(&mut backend, |_| {}).unwrap();
        assert!(!stats.grid_drawn);
        assert_eq!(backend.draw_calls(), 0);
    }

    #[test]
    fn test_failed_frame_returns_to_idle() {
        let (mut engine, _compiler) = engine(LightUploadMode::PerObject);
        let mut backend = HeadlessBackend::new();

        let result = engine.run_frame(&mut backend, |engine| {
            engine.lifecycle.advance(FramePhase::Present).unwrap();
        });
        assert!(matches!(result, Err(EngineError::Frame(_))));
        assert_eq!(engine.phase(), FramePhase::Idle);

        let stats = engine.run_frame(&mut backend, |_| {}).unwrap();
        assert_eq!(stats.frame, 2);
        assert_eq!(stats.drawn, 4);
    }

    #[test]
    fn test_debug_mode_checks_registry() {
        let mut config = ApplicationConfig::default();
        config.engine.debug_mode = true;
        let (mut engine, _compiler) = bare_engine(config, SHADERS);
        let stats = engine.run_frame(&mut HeadlessBackend::new(), |_| {}).unwrap();
        assert!(stats.registry_checked);

        let mut config = ApplicationConfig::default();
        config.engine.debug_mode = false;
        let (mut engine, _compiler) = bare_engine(config, SHADERS);
        let stats = engine.run_frame(&mut HeadlessBackend::new(), |_| {}).unwrap();
        assert!(!stats.registry_checked);
    }

    #[test]
    fn test_no_shader_fails_initialization() {
        let result = Engine::new(ApplicationConfig::default(), Assets::headless());
        assert!(matches!(result, Err(EngineError::InitializationFailed(_))));
    }

    #[derive(Default)]
    struct CountingApp {
        updates: u32,
        overlays: u32,
        cleaned: bool,
    }

    impl Application for CountingApp {
        fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
            engine.input_mut().rotation_speed = 1.0;
            Ok(())
        }

        fn update(&mut self, _engine: &mut Engine, delta_time: f32) -> Result<(), AppError> {
            assert!(delta_time > 0.0);
            self.updates += 1;
            Ok(())
        }

        fn ui(&mut self, engine: &mut Engine) -> Result<(), AppError> {
            assert_eq!(engine.phase(), FramePhase::UiOverlay);
            self.overlays += 1;
            Ok(())
        }

        fn cleanup(&mut self, _engine: &mut Engine) {
            self.cleaned = true;
        }
    }

    #[test]
    fn test_run_until_backend_closes() {
        let (mut engine, _compiler) = engine(LightUploadMode::PerObject);
        let mut backend = HeadlessBackend::with_frame_limit(3);
        let mut app = CountingApp::default();

        engine.run(&mut app, &mut backend).unwrap();

        assert_eq!(app.updates, 3);
        assert_eq!(app.overlays, 3);
        assert!(app.cleaned);
        assert_eq!(backend.frames_presented(), 3);
        assert_eq!(engine.frame_count(), 3);
    }
}
