//! Headless scene editor demo
//!
//! Builds the default scene, then plays scripted editor actions: dynamic
//! lights are spawned from the overlay until their tier is full, the oldest
//! one is deleted to make room, cubes are added and removed, and light
//! colours are tweaked while objects spin and orbit.
//!
//! Usage: `editor_app [config.toml|config.ron] [frames]`

use std::collections::VecDeque;
use std::path::Path;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scene_engine::foundation::logging;
use scene_engine::prelude::*;
use scene_engine::scene::{InputBehavior, OrbitBehavior, SpinBehavior};

const DEFAULT_FRAMES: u64 = 600;
const SPAWN_INTERVAL: u64 = 20;
const CUBE_INTERVAL: u64 = 90;
const STATS_INTERVAL: u64 = 120;
/// Matches `MAX_LIGHTS` of the forward-lit shader
const SHADER_MAX_LIGHTS: usize = 64;

struct EditorApp {
    rng: StdRng,
    frame: u64,
    spawned_cubes: VecDeque<String>,
    orbit: Rc<OrbitBehavior>,
}

impl EditorApp {
    fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            frame: 0,
            spawned_cubes: VecDeque::new(),
            orbit: Rc::new(OrbitBehavior::new(Vec3::zeros(), 0.0)),
        }
    }

    fn random_position(&mut self) -> Vec3 {
        Vec3::new(
            self.rng.gen_range(-30.0..30.0),
            self.rng.gen_range(2.0..20.0),
            self.rng.gen_range(-30.0..30.0),
        )
    }

    /// Live, unflagged dynamic light markers, oldest id first
    fn dynamic_markers(engine: &Engine) -> Vec<(ObjectId, String)> {
        let mut markers: Vec<(ObjectId, String)> = engine
            .scene()
            .objects
            .iter_live()
            .filter(|(_, object)| object.mobility() == Mobility::Dynamic && !object.is_marked_for_deletion())
            .map(|(handle, object)| (handle.id, object.name().to_string()))
            .collect();
        markers.sort();
        markers
    }

    fn spawn_dynamic_light(&mut self, engine: &mut Engine) {
        if !engine.scene().lights.has_room(LightTier::Dynamic) {
            let oldest = Self::dynamic_markers(engine).into_iter().next();
            if let Some((_, name)) = oldest {
                log::info!("Dynamic tier full, deleting {}", name);
                engine.delete_object(&name);
            }
            return;
        }

        let light_type = if self.rng.gen_bool(0.5) {
            LightType::Point
        } else {
            LightType::Spot
        };
        let position = self.random_position();
        engine.queue_command(SceneCommand::CreateLight {
            light_type,
            position,
            mobility: Mobility::Dynamic,
        });
    }

    fn tweak_light_colours(&mut self, engine: &mut Engine) {
        let keys: Vec<LightKey> = engine.scene().lights.iter().filter_map(Light::key).collect();
        if keys.is_empty() {
            return;
        }
        let key = keys[self.rng.gen_range(0..keys.len())];
        let colour = Vec3::new(self.rng.gen(), self.rng.gen(), self.rng.gen());
        if let Some(light) = engine.scene_mut().lights.get_mut(key) {
            light.data.diffuse = colour;
        }
    }

    fn attach_behaviours(&self, engine: &mut Engine) {
        let objects = &mut engine.scene_mut().objects;
        if let Some(cube) = objects.find_by_name_mut("cube_1") {
            cube.set_input(Some(Rc::new(SpinBehavior::yaw(45.0))));
        }
        if let Some(marker) = objects.find_by_name_mut("point_1") {
            marker.set_input(Some(Rc::clone(&self.orbit) as Rc<dyn InputBehavior>));
        }
    }
}

impl Application for EditorApp {
    fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
        engine.setup_default_scene()?;
        engine.input_mut().radius = 20.0;
        self.attach_behaviours(engine);
        log::info!("Editor ready: {:?}", engine.scene().objects.names());
        Ok(())
    }

    fn update(&mut self, engine: &mut Engine, _delta_time: f32) -> Result<(), AppError> {
        self.frame += 1;
        if self.frame % CUBE_INTERVAL == 0 {
            if let Some(name) = self.spawned_cubes.pop_front() {
                engine.delete_object(&name);
            }
        }
        Ok(())
    }

    fn ui(&mut self, engine: &mut Engine) -> Result<(), AppError> {
        if self.frame % SPAWN_INTERVAL == 0 {
            self.spawn_dynamic_light(engine);
            self.tweak_light_colours(engine);
        }
        if self.frame % CUBE_INTERVAL == CUBE_INTERVAL / 2 {
            let position = self.random_position();
            engine.queue_command(SceneCommand::CreateCube { position });
            let issued = engine.factory().names().issued("cube");
            self.spawned_cubes.push_back(format!("cube_{}", issued + 1));
        }

        if self.frame % STATS_INTERVAL == 0 {
            let stats = engine.last_frame_stats();
            let lights = &engine.scene().lights;
            log::info!(
                "frame {}: {} objects, lights static/stationary/dynamic {}/{}/{}, drawn {}, lights uploaded {}",
                stats.frame,
                engine.scene().objects.len(),
                lights.active_count(LightTier::Static),
                lights.active_count(LightTier::Stationary),
                lights.active_count(LightTier::Dynamic),
                stats.drawn,
                stats.lights_uploaded,
            );
        }
        Ok(())
    }

    fn cleanup(&mut self, engine: &mut Engine) {
        if let Err(e) = engine.scene().objects.check_consistency() {
            log::error!("Registry inconsistent at shutdown: {}", e);
        }
        log::info!(
            "Editor closed after {} frames with {} objects and {} lights",
            engine.frame_count(),
            engine.scene().objects.len(),
            engine.scene().lights.total_active_count()
        );
    }
}

fn load_config(path: Option<&str>) -> ApplicationConfig {
    let default_path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/editor.toml");
    let path = path.unwrap_or(default_path);
    let mut config = ApplicationConfig::load_from_file(path).unwrap_or_else(|e| {
        eprintln!("Could not load {path} ({e}), using defaults");
        ApplicationConfig::default()
    });

    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let resolve = |relative: &str| root.join(relative).to_string_lossy().into_owned();
    config.assets.materials_path = resolve("config/materials.json");
    config.assets.shaders_path = resolve("config/shaders.json");
    config.assets.shaders_dir = resolve("shaders");
    config.assets.assets_dir = resolve("assets");
    config
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    let config = load_config(args.get(1).map(String::as_str));
    let frames = args
        .get(2)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(DEFAULT_FRAMES);

    logging::init_with_level(&config.engine.log_level);
    log::info!("Starting editor demo for {} frames", frames);

    let mut compiler = RecordingCompiler::new(SHADER_MAX_LIGHTS);
    let mut engine = Engine::with_compiler(config, &mut compiler, Box::new(NullTextureBackend::new()))?;
    let mut backend = HeadlessBackend::with_frame_limit(frames);
    let mut app = EditorApp::new(0x5eed);

    engine.run(&mut app, &mut backend)?;

    log::info!(
        "Presented {} frames, {} draw calls, {} triangles",
        backend.frames_presented(),
        backend.draw_calls(),
        backend.triangles()
    );
    Ok(())
}
