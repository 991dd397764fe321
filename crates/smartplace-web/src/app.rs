//! Bevy application setup

use bevy::asset::io::memory::MemoryAssetReader;
use bevy::asset::io::{AssetSource, ErasedAssetReader};
use bevy::prelude::*;
use tracing::{info};
use bevy_egui::{EguiGlobalSettings, EguiPlugin, PrimaryEguiContext};
use bevy_picking::DefaultPickingPlugins;
use smartplace_core::model::UPLOAD_SOURCE;
use smartplace_core::ModelResource;
use smartplace_scene::{ArScenePlugin, ErrorBanner, SessionRequest};

use crate::file_picker::{FilePickerPlugin, UploadStore};
use crate::network::NetworkPlugin;
use crate::ui::UiPlugin;
use crate::video::VideoPlugin;

/// Message shown when AR mode is requested with nothing selected
pub const NO_MODEL_SELECTED: &str = "Please select or upload a 3D model first";

/// Render order of the egui overlay; above the AR camera
const OVERLAY_CAMERA_ORDER: isize = 10;

/// The model the next AR session will show
#[derive(Debug, Clone, Resource, Default)]
pub struct ModelSelection {
    pub selected: Option<ModelResource>,
}

impl ModelSelection {
    pub fn select(&mut self, resource: ModelResource) {
        info!(name = %resource.display_name(), url = %resource.url, "Model selected");
        self.selected = Some(resource);
    }

    pub fn is_selected(&self, url: &str) -> bool {
        self.selected.as_ref().is_some_and(|m| m.url == url)
    }

    /// Session request for the selected model, or the user-facing reason there is none
    pub fn session_request(&self, camera_id: Option<String>) -> Result<SessionRequest, &'static str> {
        let model = self.selected.clone().ok_or(NO_MODEL_SELECTED)?;
        Ok(SessionRequest { model, camera_id })
    }
}

/// Show a message that is not tied to an [`smartplace_core::ArError`]
pub fn show_message(banner: &mut ErrorBanner, message: &str) {
    banner.0 = Some(message.to_string());
}

/// Marker for the camera egui draws with
#[derive(Component)]
pub struct OverlayCamera;

fn spawn_overlay_camera(mut commands: Commands) {
    commands.spawn((
        Camera2d,
        Camera {
            order: OVERLAY_CAMERA_ORDER,
            clear_color: ClearColorConfig::None,
            ..default()
        },
        OverlayCamera,
        PrimaryEguiContext,
        Name::new("overlay_camera"),
    ));
}

/// Run the Bevy application
pub fn run() {
    let uploads = UploadStore::default();
    let upload_root = uploads.dir.clone();

    App::new()
        .insert_resource(ClearColor(Color::BLACK))
        // Uploaded models are served from memory; must be registered before AssetPlugin
        .register_asset_source(
            UPLOAD_SOURCE,
            AssetSource::build().with_reader(move || -> Box<dyn ErasedAssetReader> {
                Box::new(MemoryAssetReader {
                    root: upload_root.clone(),
                })
            }),
        )
        .add_plugins(DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "SmartPlace3D".to_string(),
                    canvas: Some("#smartplace-canvas".to_string()),
                    fit_canvas_to_parent: true,
                    prevent_default_event_handling: false,
                    ..default()
                }),
                ..default()
            })
            .set(AssetPlugin {
                // Don't look for .meta files - model hosts don't have them
                meta_check: bevy::asset::AssetMetaCheck::Never,
                ..default()
            })
        )
        // bevy_egui detects bevy_picking's PickingPlugin; add it first
        .add_plugins(DefaultPickingPlugins)
        // The first camera is the video background, so egui gets its own overlay camera
        .insert_resource(EguiGlobalSettings {
            auto_create_primary_context: false,
            ..default()
        })
        .add_plugins(EguiPlugin::default())
        .add_plugins(ArScenePlugin)
        .insert_resource(uploads)
        .init_resource::<ModelSelection>()
        .add_plugins(NetworkPlugin)
        .add_plugins(VideoPlugin)
        .add_plugins(FilePickerPlugin)
        .add_plugins(UiPlugin)
        .add_systems(Startup, spawn_overlay_camera)
        .run();
}
