//! Render configuration.
//!
//! Everything a thumbnail render needs besides the splats: the camera, the
//! splat cap and the JPEG quality. Loaded from JSON (missing fields take
//! the defaults below), then optionally overridden from the command line,
//! then validated once before any rendering starts.
//!
//! ```json
//! {
//!   "camera": { "width": 640, "height": 360, "fov_degrees": 60.0 },
//!   "max_splats": 50000
//! }
//! ```

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::core::Camera;
use crate::io::DEFAULT_JPEG_QUALITY;
use crate::render::DEFAULT_MAX_SPLATS;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Camera section of [`RenderConfig`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub width: u32,
    pub height: u32,
    pub position: [f32; 3],
    pub look_at: [f32; 3],
    pub up: [f32; 3],
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    /// Slightly raised, looking down +Z. Up is -Y: trained scenes are
    /// usually stored Y-down.
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            position: [0.0, 0.5, 2.0],
            look_at: [0.0, 0.5, 10.0],
            up: [0.0, -1.0, 0.0],
            fov_degrees: 50.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl CameraConfig {
    pub fn to_camera(&self) -> Camera {
        Camera::new(
            Vector3::from(self.position),
            Vector3::from(self.look_at),
            Vector3::from(self.up),
            self.fov_degrees,
            self.near,
            self.far,
            self.width,
            self.height,
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub camera: CameraConfig,
    /// Keep at most this many splats (highest opacity first).
    pub max_splats: usize,
    pub jpeg_quality: u8,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            max_splats: DEFAULT_MAX_SPLATS,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Command-line values that replace config fields when set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Overrides {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fov_degrees: Option<f32>,
    pub max_splats: Option<usize>,
}

impl RenderConfig {
    /// Parse a JSON config. Does not validate.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, otherwise start from defaults; then apply
    /// overrides and validate the result.
    pub fn resolve(path: Option<&Path>, overrides: &Overrides) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_json(&fs::read_to_string(p)?)?,
            None => Self::default(),
        };
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(w) = overrides.width {
            self.camera.width = w;
        }
        if let Some(h) = overrides.height {
            self.camera.height = h;
        }
        if let Some(fov) = overrides.fov_degrees {
            self.camera.fov_degrees = fov;
        }
        if let Some(n) = overrides.max_splats {
            self.max_splats = n;
        }
    }

    pub fn camera(&self) -> Camera {
        self.camera.to_camera()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let cam = &self.camera;
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if cam.width == 0 || cam.height == 0 {
            return invalid(format!("image size {}x{} is empty", cam.width, cam.height));
        }
        if !(cam.fov_degrees > 0.0 && cam.fov_degrees < 180.0) {
            return invalid(format!("fov_degrees {} outside (0, 180)", cam.fov_degrees));
        }
        if !(cam.near > 0.0) {
            return invalid(format!("near {} must be positive", cam.near));
        }
        if !(cam.far > cam.near) {
            return invalid(format!("far {} must exceed near {}", cam.far, cam.near));
        }
        let finite = |v: &[f32; 3]| v.iter().all(|c| c.is_finite());
        if !(finite(&cam.position) && finite(&cam.look_at) && finite(&cam.up)) {
            return invalid("camera vectors must be finite".to_string());
        }
        if self.camera().basis().is_none() {
            return invalid(
                "camera look direction is degenerate (look_at == position or up parallel to view)"
                    .to_string(),
            );
        }
        if self.max_splats == 0 {
            return invalid("max_splats must be at least 1".to_string());
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return invalid(format!("jpeg_quality {} outside 1..=100", self.jpeg_quality));
        }
        Ok(())
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
