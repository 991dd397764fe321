//! AR session identity and lifecycle state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique id for one entry into AR mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Camera stream lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StreamStatus {
    #[default]
    Idle,
    Requesting,
    Live,
    Stopped,
    Denied,
}

impl StreamStatus {
    pub fn is_live(&self) -> bool {
        matches!(self, StreamStatus::Live)
    }
}

/// Bookkeeping for a running session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub started_at: DateTime<Utc>,
    /// Selected camera device, `None` for the default rear camera
    pub camera_id: Option<String>,
    pub stream: StreamStatus,
    pub model_ready: bool,
    pub placed: bool,
}

impl SessionInfo {
    pub fn start(camera_id: Option<String>) -> Self {
        Self {
            id: SessionId::new(),
            started_at: Utc::now(),
            camera_id,
            stream: StreamStatus::Requesting,
            model_ready: false,
            placed: false,
        }
    }

    /// Taps are only honoured once the model is ready and nothing is placed
    pub fn accepts_placement(&self) -> bool {
        self.model_ready && !self.placed
    }
}
