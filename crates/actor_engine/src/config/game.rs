//! Game-level settings: the scene to start in, physics stepping and camera

use serde::{Deserialize, Serialize};

use super::{Config, ConfigError};
use crate::foundation::math::Vec2;

/// Top-level game configuration (`resources/game.toml` or `.ron`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    /// Title reported at startup
    pub game_title: String,
    /// Scene loaded when the engine starts; required
    pub initial_scene: String,
    /// Default log filter, overridden by `RUST_LOG`
    pub log_level: String,
    /// Stop after this many frames; run until quit when absent
    pub max_frames: Option<u64>,
    /// Physics stepping parameters
    pub physics: PhysicsConfig,
    /// Camera viewport defaults
    pub camera: CameraConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            game_title: String::new(),
            initial_scene: String::new(),
            log_level: "info".to_string(),
            max_frames: None,
            physics: PhysicsConfig::default(),
            camera: CameraConfig::default(),
        }
    }
}

impl Config for GameConfig {}

impl GameConfig {
    /// Create a configuration that starts in `initial_scene`
    pub fn new(initial_scene: impl Into<String>) -> Self {
        Self {
            initial_scene: initial_scene.into(),
            ..Self::default()
        }
    }

    /// Limit the run to a fixed number of frames
    pub fn with_max_frames(mut self, frames: u64) -> Self {
        self.max_frames = Some(frames);
        self
    }

    /// Set the default log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Check required settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_scene.trim().is_empty() {
            return Err(ConfigError::MissingSetting("initial_scene"));
        }
        Ok(())
    }
}

/// Fixed-step physics parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PhysicsConfig {
    /// World gravity; positive y points down the screen
    pub gravity: [f32; 2],
    /// Seconds simulated per step (one step per frame)
    pub timestep: f32,
    /// Velocity solver iterations
    pub velocity_iterations: u32,
    /// Position solver iterations
    pub position_iterations: u32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, 9.8],
            timestep: 1.0 / 60.0,
            velocity_iterations: 8,
            position_iterations: 3,
        }
    }
}

impl PhysicsConfig {
    /// Gravity as a vector
    pub fn gravity(&self) -> Vec2 {
        Vec2::new(self.gravity[0], self.gravity[1])
    }
}

/// Camera defaults handed to every scene
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// Viewport width in pixels
    pub x_resolution: u32,
    /// Viewport height in pixels
    pub y_resolution: u32,
    /// Horizontal offset from the camera target
    pub cam_offset_x: f32,
    /// Vertical offset from the camera target
    pub cam_offset_y: f32,
    /// Initial zoom
    pub zoom_factor: f32,
    /// Interpolation factor toward the target each frame
    pub cam_ease_factor: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            x_resolution: 640,
            y_resolution: 360,
            cam_offset_x: 0.0,
            cam_offset_y: 0.0,
            zoom_factor: 1.0,
            cam_ease_factor: 1.0,
        }
    }
}
