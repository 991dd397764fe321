//! Light adaptation, depth refinement and surface detection from video frames

use bevy::prelude::*;
use tracing::{debug, info};
use smartplace_core::heuristics::{
    depth_or_default, depth_scale_factor, light_intensity_or_default, surface_regions_or_empty,
};
use smartplace_core::transform::ScaleLimits;

use crate::models::PlacedModel;
use crate::types::{ArSession, ArSettings, LatestVideoFrame, ModelPlaced, SurfaceRegions};

/// Illuminance in lux for one unit of scene light intensity
pub const DIRECTIONAL_LUX_PER_UNIT: f32 = 10_000.0;
/// Ambient brightness for one unit of scene light intensity
pub const AMBIENT_BRIGHTNESS_PER_UNIT: f32 = 500.0;

/// Marker for the shadow-casting key light adapted to the video brightness
#[derive(Component)]
pub struct MainDirectionalLight;

/// Marker for the downward sky fill standing in for a hemisphere light
#[derive(Component)]
pub struct HemisphereFill;

/// Repeating timer driving light adaptation; removed on teardown
#[derive(Resource)]
pub struct LightingTimer(pub Timer);

impl LightingTimer {
    pub fn new(interval_secs: f32) -> Self {
        Self(Timer::from_seconds(interval_secs.max(0.1), TimerMode::Repeating))
    }
}

/// Plugin for video-driven lighting and depth heuristics
pub struct LightingPlugin;

impl Plugin for LightingPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (adapt_lighting, refine_depth, detect_surfaces).run_if(resource_exists::<ArSession>),
        );
    }
}

/// Set the key light from the mean brightness of the video, every interval
pub fn adapt_lighting(
    time: Res<Time>,
    timer: Option<ResMut<LightingTimer>>,
    session: Res<ArSession>,
    latest: Res<LatestVideoFrame>,
    settings: Res<ArSettings>,
    mut lights: Query<&mut DirectionalLight, With<MainDirectionalLight>>,
) {
    let Some(mut timer) = timer else { return };
    if !session.info.stream.is_live() {
        return;
    }
    timer.0.tick(time.delta());
    if !timer.0.just_finished() {
        return;
    }

    let intensity = light_intensity_or_default(latest.get(), &settings.0.lighting);
    for mut light in lights.iter_mut() {
        light.illuminance = intensity * DIRECTIONAL_LUX_PER_UNIT;
    }
    debug!(intensity, "Lighting adapted");
}

/// Scale a freshly placed model by its pseudo-depth, once per placement
pub fn refine_depth(
    mut placements: MessageReader<ModelPlaced>,
    latest: Res<LatestVideoFrame>,
    settings: Res<ArSettings>,
    mut models: Query<&mut Transform, With<PlacedModel>>,
) {
    let limits = ScaleLimits::from(&settings.0.transform);
    for placed in placements.read() {
        let depth = depth_or_default(latest.get(), placed.point.z, &settings.0.depth);
        let factor = depth_scale_factor(depth, &settings.0.depth);
        let Ok(mut transform) = models.get_mut(placed.entity) else { continue };

        let scale = transform.scale.x * factor;
        if limits.admits(scale) {
            transform.scale = Vec3::splat(scale);
            debug!(depth, scale, "Depth refinement applied");
        } else {
            debug!(depth, scale, "Depth refinement out of scale range, skipped");
        }
    }
}

/// Estimate floor regions once the first frame of a session arrives
pub fn detect_surfaces(latest: Res<LatestVideoFrame>, mut surfaces: ResMut<SurfaceRegions>) {
    if surfaces.computed || latest.get().is_none() {
        return;
    }
    surfaces.regions = surface_regions_or_empty(latest.get());
    surfaces.computed = true;
    info!(regions = surfaces.regions.len(), "Surface detection complete");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SessionRequest;
    use smartplace_core::model::find_preset;
    use bevy::time::TimeUpdateStrategy;
    use smartplace_core::{StreamStatus, VideoFrame};
    use std::time::Duration;

    fn session() -> ArSession {
        ArSession::start(&SessionRequest {
            model: find_preset("Avocado").unwrap().to_resource(),
            camera_id: None,
        })
    }

    #[test]
    fn test_depth_refinement_scales_placed_model() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .add_message::<ModelPlaced>()
            .init_resource::<ArSettings>()
            .init_resource::<LatestVideoFrame>()
            .add_systems(Update, refine_depth);

        app.world_mut()
            .resource_mut::<LatestVideoFrame>()
            .push(VideoFrame::filled(4, 4, [50, 50, 50, 255]));
        let entity = app
            .world_mut()
            .spawn((PlacedModel { name: "Avocado".into() }, Transform::default()))
            .id();

        // z = 5 gives depth 2, so scale 2/3
        app.world_mut().write_message(ModelPlaced {
            entity,
            point: Vec3::new(0.0, 0.0, 5.0),
        });
        app.update();

        let scale = app.world().get::<Transform>(entity).unwrap().scale.x;
        assert!((scale - 2.0 / 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_depth_refinement_without_frame_uses_default_depth() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .add_message::<ModelPlaced>()
            .init_resource::<ArSettings>()
            .init_resource::<LatestVideoFrame>()
            .add_systems(Update, refine_depth);

        let entity = app
            .world_mut()
            .spawn((PlacedModel { name: "Avocado".into() }, Transform::default()))
            .id();
        app.world_mut().write_message(ModelPlaced {
            entity,
            point: Vec3::ZERO,
        });
        app.update();

        let scale = app.world().get::<Transform>(entity).unwrap().scale.x;
        assert!((scale - 2.0 / 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_lighting_waits_for_live_stream() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(200)))
            .init_resource::<ArSettings>()
            .init_resource::<LatestVideoFrame>()
            .insert_resource(session())
            .insert_resource(LightingTimer::new(2.0))
            .add_systems(Update, adapt_lighting);

        let light = app
            .world_mut()
            .spawn((
                DirectionalLight {
                    illuminance: 1234.0,
                    ..default()
                },
                MainDirectionalLight,
            ))
            .id();

        for _ in 0..20 {
            app.update();
        }
        assert_eq!(app.world().get::<DirectionalLight>(light).unwrap().illuminance, 1234.0);
        assert_eq!(app.world().resource::<LightingTimer>().0.elapsed(), Duration::ZERO);

        app.world_mut().resource_mut::<ArSession>().info.stream = StreamStatus::Live;
        app.world_mut()
            .resource_mut::<LatestVideoFrame>()
            .push(VideoFrame::filled(4, 4, [255, 255, 255, 255]));
        for _ in 0..12 {
            app.update();
        }

        let illuminance = app.world().get::<DirectionalLight>(light).unwrap().illuminance;
        assert!((illuminance - 1.2 * DIRECTIONAL_LUX_PER_UNIT).abs() < 1.0);
    }

    #[test]
    fn test_surfaces_detected_once() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<LatestVideoFrame>()
            .init_resource::<SurfaceRegions>()
            .add_systems(Update, detect_surfaces);

        app.update();
        assert!(!app.world().resource::<SurfaceRegions>().computed);

        app.world_mut()
            .resource_mut::<LatestVideoFrame>()
            .push(VideoFrame::filled(10, 10, [0, 0, 0, 255]));
        app.update();
        let surfaces = app.world().resource::<SurfaceRegions>();
        assert!(surfaces.computed);
        assert_eq!(surfaces.regions.len(), 1);
    }
}
