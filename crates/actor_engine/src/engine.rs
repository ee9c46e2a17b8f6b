//! Core engine implementation

use std::path::Path;

use log::{debug, info};
use thiserror::Error;

use crate::{
    actor::TemplateRegistry,
    component::ComponentRegistry,
    config::{Config, ConfigError, GameConfig},
    foundation::time::FrameClock,
    physics::ContactBridge,
    resources::{ResourceDirectory, ResourceError},
    runtime::Runtime,
    scene::{SceneBlueprint, SceneManager},
};

/// Main engine struct
///
/// The engine owns the runtime and drives the frame loop:
/// actor pipeline, event subscriptions, physics step with contact dispatch,
/// then any requested scene change.
pub struct Engine {
    runtime: Runtime,
    config: GameConfig,
    clock: FrameClock,
    running: bool,
}

impl Engine {
    /// Create an engine and load the configured initial scene
    pub fn new(
        config: GameConfig,
        components: ComponentRegistry,
        templates: TemplateRegistry,
        scenes: Vec<SceneBlueprint>,
    ) -> Result<Self, EngineError> {
        info!("Initializing engine...");
        config.validate()?;

        let scenes = SceneManager::with_blueprints(config.camera.clone(), scenes);
        let runtime = Runtime::new(&config, components, templates, scenes);
        runtime.scenes.load_initial(&config.initial_scene)?;

        Ok(Self {
            runtime,
            clock: FrameClock::new(config.physics.timestep),
            config,
            running: true,
        })
    }

    /// Create an engine from a resources directory
    ///
    /// Reads `game.toml`, every template and every scene below `dir`.
    pub fn from_resources(dir: impl AsRef<Path>, components: ComponentRegistry) -> Result<Self, EngineError> {
        let directory = ResourceDirectory::new(dir.as_ref());
        info!("Loading resources from {}", directory.root().display());

        let config = GameConfig::load_from_file(directory.config_path())?;
        let templates = directory.load_templates(&components)?;
        let scenes = directory.load_scenes(&components, &templates)?;
        Self::new(config, components, templates, scenes)
    }

    /// Run frames until quit is requested or the frame limit is reached
    pub fn run(&mut self) -> Result<(), EngineError> {
        info!("Starting main loop...");
        while self.running {
            self.run_frame()?;
        }
        info!(
            "Engine shutdown complete after {} frames ({:.1} fps)",
            self.clock.frame_count(),
            self.clock.average_fps()
        );
        Ok(())
    }

    /// Run exactly one frame
    pub fn run_frame(&mut self) -> Result<(), EngineError> {
        let scene = self.runtime.current_scene();
        scene.update_actors(&self.runtime);
        self.check_fault()?;

        self.runtime.events().process_subscriptions();

        let contacts = self.runtime.physics_mut().step();
        if !contacts.is_empty() {
            debug!("Dispatching {} contact events", contacts.len());
        }
        ContactBridge::dispatch_all(&self.runtime, &*scene, &contacts);
        self.check_fault()?;

        self.runtime.scenes.load_new_scene(&self.runtime)?;
        self.check_fault()?;

        self.clock.tick();
        let frame_limit_reached = self
            .config
            .max_frames
            .is_some_and(|limit| self.clock.frame_count() >= limit);
        if self.runtime.quit_requested() || frame_limit_reached {
            self.running = false;
        }
        Ok(())
    }

    /// Request engine shutdown
    pub fn quit(&mut self) {
        info!("Engine shutdown requested");
        self.running = false;
    }

    /// True until the loop has been asked to stop
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Shared simulation state
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Active configuration
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Frames completed so far
    pub fn frame_count(&self) -> u64 {
        self.clock.frame_count()
    }

    /// Frame clock
    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    fn check_fault(&mut self) -> Result<(), EngineError> {
        match self.runtime.take_fault() {
            Some(fault) => {
                self.running = false;
                Err(EngineError::Resource(fault))
            }
            None => Ok(()),
        }
    }
}

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration could not be loaded or is incomplete
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Missing or malformed content, at load time or raised by a hook
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(config: GameConfig) -> Result<Engine, EngineError> {
        Engine::new(
            config,
            ComponentRegistry::with_builtins(),
            TemplateRegistry::new(),
            vec![SceneBlueprint::new("basic")],
        )
    }

    #[test]
    fn test_missing_initial_scene_setting() {
        let err = engine(GameConfig::default()).err().unwrap();
        assert!(matches!(err, EngineError::Config(ConfigError::MissingSetting("initial_scene"))));
    }

    #[test]
    fn test_unknown_initial_scene() {
        let err = engine(GameConfig::new("elsewhere")).err().unwrap();
        assert!(matches!(err, EngineError::Resource(ResourceError::MissingScene(_))));
    }

    #[test]
    fn test_frame_limit_stops_loop() {
        let mut engine = engine(GameConfig::new("basic").with_max_frames(3)).unwrap();
        engine.run().unwrap();
        assert_eq!(engine.frame_count(), 3);
        assert!(!engine.is_running());
    }

    #[test]
    fn test_quit_request_stops_after_frame() {
        let mut engine = engine(GameConfig::new("basic")).unwrap();
        engine.runtime().request_quit();
        engine.run().unwrap();
        assert_eq!(engine.frame_count(), 1);
    }
}
