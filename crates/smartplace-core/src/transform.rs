//! Transform edit policy for the placed model

use crate::config::TransformConfig;

/// Open interval the uniform scale must stay inside
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleLimits {
    pub min: f32,
    pub max: f32,
}

impl Default for ScaleLimits {
    fn default() -> Self {
        Self::from(&TransformConfig::default())
    }
}

impl From<&TransformConfig> for ScaleLimits {
    fn from(config: &TransformConfig) -> Self {
        Self {
            min: config.min_scale,
            max: config.max_scale,
        }
    }
}

impl ScaleLimits {
    /// Strictly inside (min, max)
    pub fn admits(&self, scale: f32) -> bool {
        scale > self.min && scale < self.max
    }

    /// New scale after adding `delta`, or `None` when the result would leave
    /// the interval. Out-of-range results are rejected, never clamped.
    pub fn apply_delta(&self, current: f32, delta: f32) -> Option<f32> {
        let next = current + delta;
        self.admits(next).then_some(next)
    }
}

/// Yaw increment in radians
pub fn rotation_step(config: &TransformConfig) -> f32 {
    config.rotation_step_degrees.to_radians()
}
