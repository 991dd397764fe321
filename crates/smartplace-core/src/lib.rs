//! SmartPlace3D Core - Model catalog, configuration and AR heuristics
//!
//! This crate holds everything that does not need a renderer:
//! - Model catalog (presets, upload validation, prompt fallbacks)
//! - Remote model search request/response types
//! - Lighting, depth and surface heuristics over camera frames
//! - Transform policy, camera device helpers and snapshot naming
//! - TOML configuration and the shared error type

pub mod camera;
pub mod config;
pub mod error;
pub mod frame;
pub mod heuristics;
pub mod model;
pub mod search;
pub mod session;
pub mod snapshot;
pub mod transform;

pub use camera::{capture_size, StreamConstraints, VideoInputDevice};
pub use config::{ArConfig, ConfigError};
pub use error::ArError;
pub use frame::VideoFrame;
pub use heuristics::{SurfaceKind, SurfaceRegion};
pub use model::{ModelFormat, ModelResource, ModelSource, Preset};
pub use session::{SessionId, SessionInfo, StreamStatus};
pub use transform::ScaleLimits;
