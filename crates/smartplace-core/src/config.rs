//! Configuration loading and validation
//!
//! Every field has a default so an absent or partial `smartplace.toml` still
//! yields a complete configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArConfig {
    #[serde(default)]
    pub scene: SceneConfig,
    #[serde(default)]
    pub placement: PlacementConfig,
    #[serde(default)]
    pub transform: TransformConfig,
    #[serde(default)]
    pub lighting: LightingConfig,
    #[serde(default)]
    pub depth: DepthConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub video: VideoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Vertical field of view in degrees
    #[serde(default = "default_fov")]
    pub fov_degrees: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
    /// Camera height above the ground plane
    #[serde(default = "default_eye_height")]
    pub eye_height: f32,
    /// Camera distance back from the origin along +Z
    #[serde(default = "default_camera_distance")]
    pub camera_distance: f32,
    /// Edge length of the square ground plane
    #[serde(default = "default_ground_size")]
    pub ground_size: f32,
    #[serde(default = "default_ambient_intensity")]
    pub ambient_intensity: f32,
    #[serde(default = "default_directional_intensity")]
    pub directional_intensity: f32,
    #[serde(default = "default_hemisphere_intensity")]
    pub hemisphere_intensity: f32,
    /// Opacity of the shadow-receiving ground plane
    #[serde(default = "default_shadow_opacity")]
    pub shadow_opacity: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            fov_degrees: default_fov(),
            near: default_near(),
            far: default_far(),
            eye_height: default_eye_height(),
            camera_distance: default_camera_distance(),
            ground_size: default_ground_size(),
            ambient_intensity: default_ambient_intensity(),
            directional_intensity: default_directional_intensity(),
            hemisphere_intensity: default_hemisphere_intensity(),
            shadow_opacity: default_shadow_opacity(),
        }
    }
}

fn default_fov() -> f32 {
    75.0
}

fn default_near() -> f32 {
    0.1
}

fn default_far() -> f32 {
    1000.0
}

fn default_eye_height() -> f32 {
    1.6
}

fn default_camera_distance() -> f32 {
    3.0
}

fn default_ground_size() -> f32 {
    100.0
}

fn default_ambient_intensity() -> f32 {
    0.6
}

fn default_directional_intensity() -> f32 {
    0.8
}

fn default_hemisphere_intensity() -> f32 {
    0.4
}

fn default_shadow_opacity() -> f32 {
    0.3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementConfig {
    /// Lift applied above the ray hit so the model rests on the plane
    #[serde(default = "default_vertical_offset")]
    pub vertical_offset: f32,
    /// Touch movement (logical px) beyond which a touch counts as a drag
    #[serde(default = "default_drag_threshold")]
    pub tap_drag_threshold: f32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            vertical_offset: default_vertical_offset(),
            tap_drag_threshold: default_drag_threshold(),
        }
    }
}

fn default_vertical_offset() -> f32 {
    0.5
}

fn default_drag_threshold() -> f32 {
    10.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    #[serde(default = "default_rotation_step")]
    pub rotation_step_degrees: f32,
    /// Exclusive lower bound for the uniform scale
    #[serde(default = "default_min_scale")]
    pub min_scale: f32,
    /// Exclusive upper bound for the uniform scale
    #[serde(default = "default_max_scale")]
    pub max_scale: f32,
    /// Delta applied by the scale up/down buttons
    #[serde(default = "default_scale_step")]
    pub scale_step: f32,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            rotation_step_degrees: default_rotation_step(),
            min_scale: default_min_scale(),
            max_scale: default_max_scale(),
            scale_step: default_scale_step(),
        }
    }
}

fn default_rotation_step() -> f32 {
    45.0
}

fn default_min_scale() -> f32 {
    0.1
}

fn default_max_scale() -> f32 {
    5.0
}

fn default_scale_step() -> f32 {
    0.1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightingConfig {
    /// Seconds between lighting adaptations
    #[serde(default = "default_lighting_interval")]
    pub interval_secs: f32,
    #[serde(default = "default_min_intensity")]
    pub min_intensity: f32,
    #[serde(default = "default_max_intensity")]
    pub max_intensity: f32,
    /// Intensity used when no estimate is available
    #[serde(default = "default_directional_intensity")]
    pub default_intensity: f32,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_lighting_interval(),
            min_intensity: default_min_intensity(),
            max_intensity: default_max_intensity(),
            default_intensity: default_directional_intensity(),
        }
    }
}

fn default_lighting_interval() -> f32 {
    2.0
}

fn default_min_intensity() -> f32 {
    0.4
}

fn default_max_intensity() -> f32 {
    1.2
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthConfig {
    /// Depth returned when estimation fails
    #[serde(default = "default_depth")]
    pub default_depth: f32,
    #[serde(default = "default_min_depth")]
    pub min_depth: f32,
    /// Depth at which the placed model keeps its normalized size
    #[serde(default = "default_reference_depth")]
    pub reference_depth: f32,
}

impl Default for DepthConfig {
    fn default() -> Self {
        Self {
            default_depth: default_depth(),
            min_depth: default_min_depth(),
            reference_depth: default_reference_depth(),
        }
    }
}

fn default_depth() -> f32 {
    2.0
}

fn default_min_depth() -> f32 {
    1.0
}

fn default_reference_depth() -> f32 {
    3.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Remote search is skipped entirely when disabled
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_search_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_token: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: default_search_url(),
            api_token: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_search_url() -> String {
    "https://api.sketchfab.com/v3".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    #[serde(default = "default_ideal_width")]
    pub ideal_width: u32,
    #[serde(default = "default_ideal_height")]
    pub ideal_height: u32,
    /// Width frames are downscaled to before they reach the scene
    #[serde(default = "default_capture_width")]
    pub capture_width: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            ideal_width: default_ideal_width(),
            ideal_height: default_ideal_height(),
            capture_width: default_capture_width(),
        }
    }
}

fn default_ideal_width() -> u32 {
    1920
}

fn default_ideal_height() -> u32 {
    1080
}

fn default_capture_width() -> u32 {
    640
}

impl ArConfig {
    /// Parse a TOML document
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ArConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document, falling back to defaults on any failure
    pub fn from_toml_or_default(content: Option<&str>) -> Self {
        match content {
            Some(content) => match Self::from_toml(content) {
                Ok(config) => {
                    info!("Loaded configuration");
                    config
                }
                Err(e) => {
                    warn!(error = %e, "Invalid configuration, using defaults");
                    Self::default()
                }
            },
            None => {
                info!("Configuration not found, using defaults");
                Self::default()
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.transform;
        if !(t.min_scale > 0.0 && t.min_scale < t.max_scale) {
            return Err(ConfigError::Invalid(format!(
                "transform scale bounds must satisfy 0 < min_scale < max_scale (got {} / {})",
                t.min_scale, t.max_scale
            )));
        }
        let l = &self.lighting;
        if l.min_intensity > l.max_intensity {
            return Err(ConfigError::Invalid(format!(
                "lighting min_intensity {} exceeds max_intensity {}",
                l.min_intensity, l.max_intensity
            )));
        }
        if l.interval_secs <= 0.0 {
            return Err(ConfigError::Invalid("lighting interval_secs must be positive".into()));
        }
        let s = &self.scene;
        if !(s.near > 0.0 && s.near < s.far) {
            return Err(ConfigError::Invalid(format!(
                "scene clip planes must satisfy 0 < near < far (got {} / {})",
                s.near, s.far
            )));
        }
        Ok(())
    }
}
