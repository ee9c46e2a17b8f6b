//! Scene camera state
//!
//! Gameplay code moves and zooms the camera; a renderer (not part of this
//! crate) reads it.

use crate::config::CameraConfig;
use crate::foundation::math::Vec2;

/// View transform of one scene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// World-space target position
    pub position: Vec2,
    /// Offset applied on top of the target
    pub offset: Vec2,
    /// Zoom factor, 1.0 is unscaled
    pub zoom: f32,
    /// Fraction of the remaining distance covered per frame
    pub ease: f32,
    /// Viewport width in pixels
    pub width: u32,
    /// Viewport height in pixels
    pub height: u32,
}

impl Camera {
    /// Camera matching the configured viewport
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            position: Vec2::zeros(),
            offset: Vec2::new(config.cam_offset_x, config.cam_offset_y),
            zoom: config.zoom_factor,
            ease: config.cam_ease_factor,
            width: config.x_resolution,
            height: config.y_resolution,
        }
    }

    /// Viewport size in world units at the current zoom
    pub fn view_extent(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32) / self.zoom
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}
