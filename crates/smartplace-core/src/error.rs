//! Error taxonomy shared by every SmartPlace3D component
//!
//! Errors fall into two groups. `Permission` and `Initialization` are fatal to
//! an AR session and halt entry into AR mode. Everything else is recoverable:
//! model and upload failures are shown to the user, search and heuristic
//! failures are swallowed where they happen and only logged.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArError {
    /// Camera access was denied or no camera could be opened
    #[error("Camera access required for AR mode. Please grant camera permissions and reload.")]
    Permission(String),
    /// The render surface (window / GPU context) is unavailable
    #[error("Failed to initialize AR scene: {0}")]
    Initialization(String),
    /// Bad URL, unsupported asset or network failure while loading a model
    #[error("Failed to load 3D model")]
    ModelLoad(String),
    /// Uploaded file is not a glTF asset
    #[error("Invalid file format: {0} (only .glb and .gltf files are supported)")]
    InvalidFormat(String),
    /// Remote model search failed or returned nothing usable
    #[error("Model search failed: {0}")]
    Search(String),
    /// A lighting/depth/surface heuristic could not produce a value
    #[error("Heuristic estimate unavailable: {0}")]
    Heuristic(String),
    /// Configuration could not be used; defaults apply
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<crate::config::ConfigError> for ArError {
    fn from(e: crate::config::ConfigError) -> Self {
        ArError::Config(e.to_string())
    }
}

impl ArError {
    /// Whether the error ends the AR session
    pub fn is_fatal(&self) -> bool {
        matches!(self, ArError::Permission(_) | ArError::Initialization(_))
    }

    /// Whether the error should be shown to the user at all
    pub fn is_user_visible(&self) -> bool {
        !matches!(
            self,
            ArError::Search(_) | ArError::Heuristic(_) | ArError::Config(_)
        )
    }

    /// Underlying detail, for logs
    pub fn detail(&self) -> &str {
        match self {
            ArError::Permission(d)
            | ArError::Initialization(d)
            | ArError::ModelLoad(d)
            | ArError::InvalidFormat(d)
            | ArError::Search(d)
            | ArError::Heuristic(d)
            | ArError::Config(d) => d,
        }
    }
}
