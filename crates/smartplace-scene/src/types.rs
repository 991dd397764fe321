//! Shared types for the AR session, video frames and scene messages

use bevy::prelude::*;
use smartplace_core::{
    ArConfig, ArError, ModelResource, SessionInfo, SurfaceRegion, VideoFrame,
};

/// Top-level application mode
#[derive(States, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AppMode {
    /// Model selection, prompt search and upload
    #[default]
    Selecting,
    /// Live camera feed with the AR scene on top
    Ar,
}

/// Loaded configuration, replaced when the config file arrives
#[derive(Debug, Clone, Resource, Default)]
pub struct ArSettings(pub ArConfig);

/// What the next AR session should show; inserted before entering AR mode
#[derive(Debug, Clone, Resource)]
pub struct SessionRequest {
    pub model: ModelResource,
    /// Selected camera device, `None` for the default rear camera
    pub camera_id: Option<String>,
}

/// Per-session context, present only while in AR mode
#[derive(Debug, Clone, Resource)]
pub struct ArSession {
    pub info: SessionInfo,
    /// Model selected for this session, reloaded after a delete
    pub model: ModelResource,
}

impl ArSession {
    pub fn start(request: &SessionRequest) -> Self {
        Self {
            info: SessionInfo::start(request.camera_id.clone()),
            model: request.model.clone(),
        }
    }

    pub fn is_placed(&self) -> bool {
        self.info.placed
    }

    pub fn is_model_ready(&self) -> bool {
        self.info.model_ready
    }
}

/// Marker for every entity owned by an AR session; despawned on teardown
#[derive(Component)]
pub struct ArSessionEntity;

/// Most recent camera frame pushed by the video source
#[derive(Debug, Clone, Resource, Default)]
pub struct LatestVideoFrame {
    pub frame: Option<VideoFrame>,
    /// Bumped on every new frame
    pub generation: u64,
}

impl LatestVideoFrame {
    pub fn push(&mut self, frame: VideoFrame) {
        self.frame = Some(frame);
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn clear(&mut self) {
        self.frame = None;
    }

    pub fn get(&self) -> Option<&VideoFrame> {
        self.frame.as_ref()
    }
}

/// Heuristic floor regions; informational only
#[derive(Debug, Clone, Resource, Default)]
pub struct SurfaceRegions {
    pub regions: Vec<SurfaceRegion>,
    pub computed: bool,
}

/// The single latest user-visible error
#[derive(Debug, Clone, Resource, Default)]
pub struct ErrorBanner(pub Option<String>);

impl ErrorBanner {
    pub fn show(&mut self, error: &ArError) {
        self.0 = Some(error.to_string());
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }
}

/// A snapshot is being captured; overlays stay hidden until it completes
#[derive(Debug, Clone, Resource)]
pub struct SnapshotInProgress {
    pub file_name: String,
}

/// Request to load a model into the running session, replacing any current one
#[derive(Message, Debug, Clone)]
pub struct LoadModelRequest(pub ModelResource);

/// A tap on the scene, in logical window coordinates
#[derive(Message, Debug, Clone, Copy)]
pub struct PlacementTap {
    pub position: Vec2,
}

/// Emitted once a model has been anchored on the ground
#[derive(Message, Debug, Clone, Copy)]
pub struct ModelPlaced {
    pub entity: Entity,
    /// Ground intersection, before the vertical offset
    pub point: Vec3,
}

/// Edits applied to the placed model
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub enum TransformCommand {
    Rotate,
    Scale(f32),
    Delete,
    Snapshot,
}

/// An error raised while a session runs
#[derive(Message, Debug, Clone)]
pub struct SessionError(pub ArError);
