//! AR session lifecycle - scene setup, teardown and resize

use bevy::light::NotShadowCaster;
use bevy::prelude::*;
use tracing::{info, warn, error};
use bevy::window::{PrimaryWindow, WindowResized};
use smartplace_core::ArError;

use crate::background::{fit_video_background, spawn_video_background, update_video_texture, VideoTexture};
use crate::camera::{ar_camera_transform, ar_projection, ArCamera, BackgroundCamera, AR_CAMERA_ORDER};
use crate::ground::ShadowCatcherMaterial;
use crate::lighting::{
    HemisphereFill, LightingTimer, MainDirectionalLight, AMBIENT_BRIGHTNESS_PER_UNIT,
    DIRECTIONAL_LUX_PER_UNIT,
};
use crate::models::PlacedModel;
use crate::types::{
    AppMode, ArSession, ArSessionEntity, ArSettings, ErrorBanner, LatestVideoFrame,
    LoadModelRequest, SessionError, SessionRequest, SnapshotInProgress, SurfaceRegions,
};

/// Ground tint mixed into the ambient term, #444444
const HEMISPHERE_GROUND_COLOR: Color = Color::srgb(0.267, 0.267, 0.267);
/// Height of the hemisphere fill light above the ground
const HEMISPHERE_HEIGHT: f32 = 10.0;

/// Marker for the shadow-receiving ground plane
#[derive(Component)]
pub struct GroundPlane;

/// Plugin for session setup and teardown
pub struct SceneSetupPlugin;

impl Plugin for SceneSetupPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(AppMode::Ar), setup_ar_scene)
            .add_systems(OnExit(AppMode::Ar), teardown_ar_scene)
            .add_systems(
                Update,
                (
                    handle_resize,
                    update_video_texture,
                    fit_video_background.after(update_video_texture),
                )
                    .run_if(in_state(AppMode::Ar)),
            )
            .add_systems(Update, report_session_errors);
    }
}

/// Build the scene for a new session: camera, lights, ground and video background
pub fn setup_ar_scene(
    mut commands: Commands,
    request: Option<Res<SessionRequest>>,
    settings: Res<ArSettings>,
    windows: Query<&Window, With<PrimaryWindow>>,
    background_cameras: Query<Entity, With<BackgroundCamera>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut shadow_materials: ResMut<Assets<ShadowCatcherMaterial>>,
    mut images: ResMut<Assets<Image>>,
    mut errors: MessageWriter<SessionError>,
    mut loads: MessageWriter<LoadModelRequest>,
) {
    let Some(request) = request else {
        errors.write(SessionError(ArError::Initialization(
            "no model selected for the session".to_string(),
        )));
        return;
    };
    let Ok(window) = windows.single() else {
        errors.write(SessionError(ArError::Initialization(
            "no primary window to render into".to_string(),
        )));
        return;
    };
    let Ok(background_camera) = background_cameras.single() else {
        errors.write(SessionError(ArError::Initialization(
            "background camera missing".to_string(),
        )));
        return;
    };

    let config = &settings.0.scene;
    let session = ArSession::start(&request);
    info!(session = %session.info.id, model = %request.model.display_name(), "Starting AR session");

    // Camera - draws over the video background without clearing it
    let aspect_ratio = window.width() / window.height().max(1.0);
    commands.spawn((
        Camera3d::default(),
        Camera {
            order: AR_CAMERA_ORDER,
            clear_color: ClearColorConfig::None,
            ..default()
        },
        Projection::Perspective(ar_projection(config, aspect_ratio)),
        ar_camera_transform(config),
        ArCamera,
        ArSessionEntity,
        Name::new("ar_camera"),
    ));

    // Ambient term, tinted toward the hemisphere ground colour
    let ambient_color = Color::WHITE.mix(&HEMISPHERE_GROUND_COLOR, config.hemisphere_intensity * 0.5);
    commands.insert_resource(AmbientLight {
        color: ambient_color,
        brightness: config.ambient_intensity * AMBIENT_BRIGHTNESS_PER_UNIT,
        ..default()
    });

    // Key light, adapted to the video brightness
    commands.spawn((
        DirectionalLight {
            illuminance: config.directional_intensity * DIRECTIONAL_LUX_PER_UNIT,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(5.0, 10.0, 7.0).looking_at(Vec3::ZERO, Vec3::Y),
        MainDirectionalLight,
        ArSessionEntity,
        Name::new("key_light"),
    ));

    // Sky fill standing in for a hemisphere light
    commands.spawn((
        DirectionalLight {
            illuminance: config.hemisphere_intensity * DIRECTIONAL_LUX_PER_UNIT,
            color: Color::WHITE,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_xyz(0.0, HEMISPHERE_HEIGHT, 0.0).looking_at(Vec3::ZERO, Vec3::Z),
        HemisphereFill,
        ArSessionEntity,
        Name::new("hemisphere_fill"),
    ));

    // Invisible ground; only shadows show on it
    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(config.ground_size, config.ground_size))),
        MeshMaterial3d(shadow_materials.add(ShadowCatcherMaterial::new(config.shadow_opacity))),
        Transform::default(),
        NotShadowCaster,
        GroundPlane,
        ArSessionEntity,
        Name::new("ground_plane"),
    ));

    let video = spawn_video_background(&mut commands, &mut images, background_camera);
    commands.insert_resource(video);
    commands.insert_resource(LightingTimer::new(settings.0.lighting.interval_secs));
    commands.insert_resource(SurfaceRegions::default());
    commands.insert_resource(LatestVideoFrame::default());
    loads.write(LoadModelRequest(request.model.clone()));
    commands.insert_resource(session);
}

/// Despawn everything the session owns and drop its resources.
///
/// Safe to run more than once and after a partial setup.
pub fn teardown_ar_scene(
    mut commands: Commands,
    session: Option<Res<ArSession>>,
    entities: Query<Entity, With<ArSessionEntity>>,
    stray_models: Query<Entity, (With<PlacedModel>, Without<ArSessionEntity>)>,
    video: Option<Res<VideoTexture>>,
    mut images: ResMut<Assets<Image>>,
) {
    if let Some(session) = session {
        info!(session = %session.info.id, "Ending AR session");
    }
    for entity in entities.iter().chain(stray_models.iter()) {
        if let Ok(mut entity) = commands.get_entity(entity) {
            entity.despawn();
        }
    }
    if let Some(video) = video {
        images.remove(&video.handle);
    }
    commands.remove_resource::<VideoTexture>();
    commands.remove_resource::<LightingTimer>();
    commands.remove_resource::<ArSession>();
    commands.remove_resource::<SnapshotInProgress>();
    commands.insert_resource(LatestVideoFrame::default());
    commands.insert_resource(SurfaceRegions::default());
    commands.insert_resource(AmbientLight::default());
}

/// Keep the AR camera's aspect ratio in step with the window
pub fn handle_resize(
    mut resized: MessageReader<WindowResized>,
    windows: Query<(), With<PrimaryWindow>>,
    mut cameras: Query<&mut Projection, With<ArCamera>>,
) {
    let Some(event) = resized.read().filter(|e| windows.contains(e.window)).last() else {
        return;
    };
    if event.height <= 0.0 {
        return;
    }
    for mut projection in cameras.iter_mut() {
        if let Projection::Perspective(perspective) = &mut *projection {
            perspective.aspect_ratio = event.width / event.height;
        }
    }
}

/// Show session errors to the user; fatal ones end the session
pub fn report_session_errors(
    mut errors: MessageReader<SessionError>,
    mut banner: ResMut<ErrorBanner>,
    state: Res<State<AppMode>>,
    mut next_state: ResMut<NextState<AppMode>>,
) {
    for SessionError(error) in errors.read() {
        if error.is_user_visible() {
            error!(error = %error, detail = error.detail(), "Session error");
            banner.show(error);
        } else {
            warn!(error = %error, "Session error");
        }
        if error.is_fatal() && *state.get() == AppMode::Ar {
            next_state.set(AppMode::Selecting);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::RunSystemOnce;
    use smartplace_core::model::find_preset;

    fn teardown_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins).init_resource::<Assets<Image>>();
        app
    }

    #[test]
    fn test_teardown_despawns_session_entities() {
        let mut app = teardown_app();
        let session_entity = app.world_mut().spawn(ArSessionEntity).id();
        let model = app
            .world_mut()
            .spawn((PlacedModel { name: "Chair".into() }, ArSessionEntity))
            .id();
        let persistent = app.world_mut().spawn(BackgroundCamera).id();
        app.world_mut().insert_resource(ArSession::start(&SessionRequest {
            model: find_preset("Wooden Chair").unwrap().to_resource(),
            camera_id: None,
        }));
        app.world_mut().insert_resource(LightingTimer::new(2.0));
        app.world_mut().insert_resource(SnapshotInProgress {
            file_name: "smartplace3d-1.png".into(),
        });

        app.world_mut().run_system_once(teardown_ar_scene).unwrap();

        assert!(app.world().get_entity(session_entity).is_err());
        assert!(app.world().get_entity(model).is_err());
        assert!(app.world().get_entity(persistent).is_ok());
        assert!(!app.world().contains_resource::<ArSession>());
        assert!(!app.world().contains_resource::<LightingTimer>());
        assert!(!app.world().contains_resource::<SnapshotInProgress>());
    }

    #[test]
    fn test_setup_ground_catches_shadows() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<Assets<Image>>()
            .init_resource::<Assets<Mesh>>()
            .init_resource::<Assets<ShadowCatcherMaterial>>()
            .init_resource::<ArSettings>()
            .add_message::<SessionError>()
            .add_message::<LoadModelRequest>();
        app.world_mut().spawn((Window::default(), PrimaryWindow));
        app.world_mut().spawn(BackgroundCamera);
        app.world_mut().insert_resource(SessionRequest {
            model: find_preset("Lantern").unwrap().to_resource(),
            camera_id: None,
        });

        app.world_mut().run_system_once(setup_ar_scene).unwrap();
        assert!(app.world().contains_resource::<ArSession>());

        let mut grounds = app
            .world_mut()
            .query_filtered::<&MeshMaterial3d<ShadowCatcherMaterial>, (With<GroundPlane>, With<NotShadowCaster>)>();
        let handle = grounds.single(app.world()).unwrap().0.clone();
        let material = app
            .world()
            .resource::<Assets<ShadowCatcherMaterial>>()
            .get(&handle)
            .unwrap();
        let opacity = ArSettings::default().0.scene.shadow_opacity;
        assert!((material.color.alpha - opacity).abs() < 1e-6);
        assert_eq!(material.color.red, 0.0);
        assert_eq!(material.alpha_mode(), AlphaMode::Blend);
    }

    #[test]
    fn test_teardown_is_idempotent() {
        let mut app = teardown_app();
        app.world_mut().run_system_once(teardown_ar_scene).unwrap();
        app.world_mut().run_system_once(teardown_ar_scene).unwrap();
        assert!(!app.world().contains_resource::<ArSession>());
        assert!(app.world().resource::<LatestVideoFrame>().get().is_none());
    }
}
