//! Camera device enumeration and stream constraints

use serde::{Deserialize, Serialize};

use crate::config::VideoConfig;

/// A video input device reported by the browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoInputDevice {
    pub id: String,
    pub label: String,
}

impl VideoInputDevice {
    /// Rear cameras are preferred for AR
    pub fn is_rear_facing(&self) -> bool {
        let label = self.label.to_lowercase();
        label.contains("back") || label.contains("rear")
    }

    /// Label shown in the selector; browsers hide labels until permission is granted
    pub fn display_label(&self, index: usize) -> String {
        if self.label.trim().is_empty() {
            format!("Camera {}", index + 1)
        } else {
            self.label.clone()
        }
    }

    pub fn hint(&self) -> &'static str {
        if self.is_rear_facing() {
            "Rear Camera (Recommended for AR)"
        } else {
            "Front Camera"
        }
    }
}

/// `facingMode` requested when no device is chosen
pub const REAR_FACING_MODE: &str = "environment";

/// Constraints passed to `getUserMedia`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConstraints {
    /// Exact device, or `None` to pick by facing mode
    pub device_id: Option<String>,
    pub facing: &'static str,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl StreamConstraints {
    pub fn for_selection(device_id: Option<&str>, config: &VideoConfig) -> Self {
        Self {
            device_id: device_id.filter(|id| !id.is_empty()).map(str::to_string),
            facing: REAR_FACING_MODE,
            ideal_width: config.ideal_width,
            ideal_height: config.ideal_height,
        }
    }
}

/// Scaled capture size for a stream, keeping aspect ratio and never upscaling
pub fn capture_size(stream_width: u32, stream_height: u32, max_width: u32) -> (u32, u32) {
    if stream_width == 0 || stream_height == 0 {
        return (0, 0);
    }
    if max_width == 0 || stream_width <= max_width {
        return (stream_width, stream_height);
    }
    let height = (stream_height as u64 * max_width as u64 / stream_width as u64).max(1) as u32;
    (max_width, height)
}
