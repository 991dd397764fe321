//! SmartPlace3D Scene - AR scene graph and interaction
//!
//! This crate owns everything that happens while an AR session runs: the
//! camera and video background, model loading and normalization, tap-to-place,
//! transform controls and the video-driven lighting heuristics. The browser
//! frontend (smartplace-web) feeds it camera frames and user commands.

pub mod background;
pub mod camera;
pub mod controls;
pub mod ground;
pub mod lighting;
pub mod models;
pub mod placement;
pub mod scene;
pub mod types;

use bevy::prelude::*;

/// Plugin that sets up the AR scene and its interaction systems
pub struct ArScenePlugin;

impl Plugin for ArScenePlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<AppMode>()
            .init_resource::<ArSettings>()
            .init_resource::<LatestVideoFrame>()
            .init_resource::<SurfaceRegions>()
            .init_resource::<ErrorBanner>()
            .add_message::<LoadModelRequest>()
            .add_message::<PlacementTap>()
            .add_message::<ModelPlaced>()
            .add_message::<TransformCommand>()
            .add_message::<SessionError>()
            .add_plugins(ground::GroundPlugin)
            .add_plugins(camera::CameraPlugin)
            .add_plugins(scene::SceneSetupPlugin)
            .add_plugins(models::ModelsPlugin)
            .add_plugins(placement::PlacementPlugin)
            .add_plugins(controls::ControlsPlugin)
            .add_plugins(lighting::LightingPlugin);
    }
}

// Re-export commonly used types
pub use types::*;
pub use camera::{ArCamera, BackgroundCamera};
pub use models::PlacedModel;
