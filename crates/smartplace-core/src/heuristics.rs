//! Lighting, depth and surface heuristics
//!
//! Placeholders for real light/plane/depth estimation. The contract is a
//! bounded output, no panics and a fixed fallback value, not accuracy.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{DepthConfig, LightingConfig};
use crate::error::ArError;
use crate::frame::VideoFrame;

/// Fraction of the frame height, from the bottom, assumed to be floor
const FLOOR_FRACTION: f32 = 0.3;
const FLOOR_CONFIDENCE: f32 = 0.8;
/// Scene-space Z span mapped onto one unit of pseudo-depth
const DEPTH_Z_SPAN: f32 = 5.0;

/// Map a mean luma in [0, 255] linearly onto the configured intensity range
pub fn intensity_from_luma(luma: f32, config: &LightingConfig) -> f32 {
    let brightness = (luma / 255.0).clamp(0.0, 1.0);
    let span = config.max_intensity - config.min_intensity;
    (config.min_intensity + brightness * span).clamp(config.min_intensity, config.max_intensity)
}

/// Light intensity for a frame, or an error if the frame is unusable
pub fn estimate_light_intensity(
    frame: Option<&VideoFrame>,
    config: &LightingConfig,
) -> Result<f32, ArError> {
    let frame = frame.ok_or_else(|| ArError::Heuristic("no video frame available".into()))?;
    let luma = frame.mean_luma()?;
    if !luma.is_finite() {
        return Err(ArError::Heuristic("non-finite luma".into()));
    }
    Ok(intensity_from_luma(luma, config))
}

/// Light intensity for a frame, falling back to the default on failure
pub fn light_intensity_or_default(frame: Option<&VideoFrame>, config: &LightingConfig) -> f32 {
    match estimate_light_intensity(frame, config) {
        Ok(intensity) => intensity,
        Err(e) => {
            warn!(error = %e, "Lighting adaptation failed");
            config.default_intensity
        }
    }
}

/// Pseudo-depth derived from the placement point's scene-space Z.
///
/// Needs a live frame even though only the point is used, so depth stays
/// tied to an active camera stream.
pub fn estimate_depth(
    frame: Option<&VideoFrame>,
    placement_z: f32,
    config: &DepthConfig,
) -> Result<f32, ArError> {
    let frame = frame.ok_or_else(|| ArError::Heuristic("no video frame available".into()))?;
    frame.check()?;
    if !placement_z.is_finite() {
        return Err(ArError::Heuristic(format!("non-finite placement z {placement_z}")));
    }
    let normalized = placement_z / DEPTH_Z_SPAN;
    Ok((config.reference_depth - normalized).max(config.min_depth))
}

/// Pseudo-depth, falling back to the default on failure
pub fn depth_or_default(frame: Option<&VideoFrame>, placement_z: f32, config: &DepthConfig) -> f32 {
    match estimate_depth(frame, placement_z, config) {
        Ok(depth) => depth,
        Err(e) => {
            warn!(error = %e, "Depth estimation failed");
            config.default_depth
        }
    }
}

/// Scale multiplier applied to a freshly placed model for a given depth
pub fn depth_scale_factor(depth: f32, config: &DepthConfig) -> f32 {
    depth / config.reference_depth
}

/// Kind of surface a region was classified as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceKind {
    Floor,
}

/// Axis-aligned rectangle in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionBounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Heuristic surface region; informational only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceRegion {
    pub kind: SurfaceKind,
    /// Top edge of the region in frame pixels
    pub y: f32,
    pub confidence: f32,
    pub bounds: RegionBounds,
}

/// Assume the bottom 30% of the frame is floor
pub fn estimate_surface_regions(frame: Option<&VideoFrame>) -> Result<Vec<SurfaceRegion>, ArError> {
    let frame = frame.ok_or_else(|| ArError::Heuristic("no video frame available".into()))?;
    frame.check()?;
    let width = frame.width as f32;
    let height = frame.height as f32;
    let top = height * (1.0 - FLOOR_FRACTION);
    Ok(vec![SurfaceRegion {
        kind: SurfaceKind::Floor,
        y: top,
        confidence: FLOOR_CONFIDENCE,
        bounds: RegionBounds {
            x: 0.0,
            y: top,
            width,
            height: height * FLOOR_FRACTION,
        },
    }])
}

/// Surface regions, empty on failure
pub fn surface_regions_or_empty(frame: Option<&VideoFrame>) -> Vec<SurfaceRegion> {
    estimate_surface_regions(frame).unwrap_or_else(|e| {
        warn!(error = %e, "Surface detection failed");
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intensity_bounds_for_all_luma() {
        let config = LightingConfig::default();
        for luma in 0..=255u32 {
            let intensity = intensity_from_luma(luma as f32, &config);
            assert!((0.4..=1.2).contains(&intensity), "luma {luma} -> {intensity}");
        }
        assert_eq!(intensity_from_luma(0.0, &config), 0.4);
        assert!((intensity_from_luma(255.0, &config) - 1.2).abs() < 1e-6);
    }

    #[test]
    fn test_intensity_from_frames() {
        let config = LightingConfig::default();
        for value in [0u8, 17, 128, 200, 255] {
            let frame = VideoFrame::filled(8, 8, [value, value, value, 255]);
            let intensity = light_intensity_or_default(Some(&frame), &config);
            assert!((0.4..=1.2).contains(&intensity));
        }
    }

    #[test]
    fn test_intensity_failure_returns_default() {
        let config = LightingConfig::default();
        assert_eq!(light_intensity_or_default(None, &config), 0.8);

        let broken = VideoFrame {
            width: 4,
            height: 4,
            rgba: vec![255; 3],
        };
        assert_eq!(light_intensity_or_default(Some(&broken), &config), 0.8);
    }

    #[test]
    fn test_depth_never_below_one() {
        let config = DepthConfig::default();
        let frame = VideoFrame::filled(4, 4, [10, 10, 10, 255]);
        for z in [-100.0, -5.0, 0.0, 1.0, 5.0, 10.0, 15.0, 1000.0] {
            let depth = depth_or_default(Some(&frame), z, &config);
            assert!(depth >= 1.0, "z {z} -> {depth}");
        }
        assert_eq!(depth_or_default(Some(&frame), 0.0, &config), 3.0);
        assert_eq!(depth_or_default(Some(&frame), 5.0, &config), 2.0);
        assert_eq!(depth_or_default(Some(&frame), 50.0, &config), 1.0);
    }

    #[test]
    fn test_depth_failure_returns_two() {
        let config = DepthConfig::default();
        assert_eq!(depth_or_default(None, 1.0, &config), 2.0);

        let frame = VideoFrame::filled(4, 4, [10, 10, 10, 255]);
        assert_eq!(depth_or_default(Some(&frame), f32::NAN, &config), 2.0);
    }

    #[test]
    fn test_depth_scale_factor() {
        let config = DepthConfig::default();
        assert_eq!(depth_scale_factor(3.0, &config), 1.0);
        assert!((depth_scale_factor(2.0, &config) - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_floor_region_covers_bottom_thirty_percent() {
        let frame = VideoFrame::filled(100, 50, [0; 4]);
        let regions = estimate_surface_regions(Some(&frame)).unwrap();
        assert_eq!(regions.len(), 1);
        let floor = &regions[0];
        assert_eq!(floor.kind, SurfaceKind::Floor);
        assert_eq!(floor.confidence, 0.8);
        assert_eq!(floor.bounds.x, 0.0);
        assert_eq!(floor.bounds.width, 100.0);
        assert!((floor.bounds.y - 35.0).abs() < 1e-4);
        assert!((floor.bounds.height - 15.0).abs() < 1e-4);
    }

    #[test]
    fn test_surface_failure_is_empty() {
        assert!(surface_regions_or_empty(None).is_empty());
    }
}
