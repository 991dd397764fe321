//! Shadow-only ground material

use bevy::asset::embedded_asset;
use bevy::prelude::*;
use bevy::render::render_resource::AsBindGroup;
use bevy::shader::ShaderRef;

const SHADER_PATH: &str = "embedded://smartplace_scene/shaders/shadow_catcher.wgsl";

/// Plugin registering [`ShadowCatcherMaterial`] and its shader
pub struct GroundPlugin;

impl Plugin for GroundPlugin {
    fn build(&self, app: &mut App) {
        embedded_asset!(app, "shaders/shadow_catcher.wgsl");
        app.add_plugins(MaterialPlugin::<ShadowCatcherMaterial>::default());
    }
}

/// Transparent everywhere except where a shadow-casting directional light is
/// occluded; there it draws `color` with alpha scaled by how shadowed it is.
#[derive(Asset, TypePath, AsBindGroup, Debug, Clone)]
pub struct ShadowCatcherMaterial {
    #[uniform(0)]
    pub color: LinearRgba,
}

impl ShadowCatcherMaterial {
    /// Black shadows at the given peak opacity
    pub fn new(opacity: f32) -> Self {
        Self {
            color: LinearRgba::new(0.0, 0.0, 0.0, opacity.clamp(0.0, 1.0)),
        }
    }
}

impl Material for ShadowCatcherMaterial {
    fn fragment_shader() -> ShaderRef {
        SHADER_PATH.into()
    }

    fn alpha_mode(&self) -> AlphaMode {
        AlphaMode::Blend
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shadow_catcher_is_blended_black() {
        let material = ShadowCatcherMaterial::new(0.3);
        assert_eq!(material.color, LinearRgba::new(0.0, 0.0, 0.0, 0.3));
        assert_eq!(material.alpha_mode(), AlphaMode::Blend);
    }

    #[test]
    fn test_shadow_catcher_opacity_clamped() {
        assert_eq!(ShadowCatcherMaterial::new(1.7).color.alpha, 1.0);
        assert_eq!(ShadowCatcherMaterial::new(-0.2).color.alpha, 0.0);
    }
}
