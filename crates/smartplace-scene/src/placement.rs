//! Tap-to-place: pointer taps become ground-plane placements

use bevy::prelude::*;
use tracing::{debug, info};
use bevy::window::PrimaryWindow;
use bevy_egui::EguiContexts;

use crate::camera::{intersect_ground, ray_through_ndc, screen_to_ndc, ArCamera};
use crate::models::{ModelLoading, PlacedModel};
use crate::types::{AppMode, ArSession, ArSettings, ModelPlaced, PlacementTap};

/// Plugin for tap detection and placement
pub struct PlacementPlugin;

impl Plugin for PlacementPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TouchState>()
            .add_systems(
                Update,
                (detect_taps, handle_placement_taps)
                    .chain()
                    .run_if(in_state(AppMode::Ar)),
            )
            .add_systems(OnExit(AppMode::Ar), reset_touch_state);
    }
}

/// Track touch state for tap detection
#[derive(Resource, Default)]
pub struct TouchState {
    /// Position where touch started
    start_position: Option<Vec2>,
    /// Whether this touch has moved significantly (is a drag, not a tap)
    is_dragging: bool,
}

impl TouchState {
    pub fn begin(&mut self, position: Vec2) {
        self.start_position = Some(position);
        self.is_dragging = false;
    }

    pub fn moved_to(&mut self, position: Vec2, threshold: f32) {
        if let Some(start) = self.start_position {
            if position.distance(start) > threshold {
                self.is_dragging = true;
            }
        }
    }

    /// End the touch, returning the tap position unless it was a drag
    pub fn release(&mut self) -> Option<Vec2> {
        let tap = (!self.is_dragging).then_some(self.start_position).flatten();
        self.start_position = None;
        self.is_dragging = false;
        tap
    }
}

fn reset_touch_state(mut touch_state: ResMut<TouchState>) {
    *touch_state = TouchState::default();
}

/// Turn mouse clicks and touch taps outside the UI into [`PlacementTap`]s
pub fn detect_taps(
    mouse_button: Res<ButtonInput<MouseButton>>,
    touch_input: Res<Touches>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut contexts: EguiContexts,
    mut touch_state: ResMut<TouchState>,
    settings: Res<ArSettings>,
    mut taps: MessageWriter<PlacementTap>,
) {
    let egui_wants_pointer = contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_pointer_input() || ctx.is_pointer_over_area())
        .unwrap_or(false);
    if egui_wants_pointer {
        return;
    }

    let threshold = settings.0.placement.tap_drag_threshold;
    if let Some(touch) = touch_input.iter().next() {
        if touch_input.just_pressed(touch.id()) {
            touch_state.begin(touch.position());
        } else {
            touch_state.moved_to(touch.position(), threshold);
        }
    }

    for touch in touch_input.iter_just_released() {
        touch_state.moved_to(touch.position(), threshold);
        if let Some(position) = touch_state.release() {
            taps.write(PlacementTap { position });
        }
    }

    if mouse_button.just_pressed(MouseButton::Left) {
        if let Some(position) = windows.single().ok().and_then(|w| w.cursor_position()) {
            taps.write(PlacementTap { position });
        }
    }
}

/// Anchor the loaded model where a tap's ray meets the ground plane.
///
/// Ignored while the model is still loading, once a model is placed, or when
/// the ray misses the ground.
pub fn handle_placement_taps(
    mut taps: MessageReader<PlacementTap>,
    session: Option<ResMut<ArSession>>,
    settings: Res<ArSettings>,
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&Transform, &Projection), With<ArCamera>>,
    mut models: Query<
        (Entity, &mut Transform, &mut Visibility),
        (With<PlacedModel>, Without<ModelLoading>, Without<ArCamera>),
    >,
    mut placed: MessageWriter<ModelPlaced>,
) {
    let Some(mut session) = session else {
        taps.clear();
        return;
    };

    for tap in taps.read() {
        if !session.info.accepts_placement() {
            continue;
        }
        let Ok(window) = windows.single() else { continue };
        let Ok((camera, projection)) = cameras.single() else { continue };
        let Projection::Perspective(perspective) = projection else { continue };

        let viewport = Vec2::new(window.width(), window.height());
        let Some(ndc) = screen_to_ndc(tap.position, viewport) else { continue };
        let Some(ray) = ray_through_ndc(camera, perspective.fov, viewport.x / viewport.y, ndc) else {
            continue;
        };
        let Some(point) = intersect_ground(ray, settings.0.scene.ground_size / 2.0) else {
            debug!(x = tap.position.x, y = tap.position.y, "Tap missed the ground plane");
            continue;
        };

        let Ok((entity, mut transform, mut visibility)) = models.single_mut() else { continue };
        transform.translation = point + Vec3::Y * settings.0.placement.vertical_offset;
        *visibility = Visibility::Inherited;
        session.info.placed = true;
        placed.write(ModelPlaced { entity, point });
        info!(session = %session.info.id, position = %transform.translation, "Model placed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{ar_camera_transform, ar_projection};
    use crate::controls::apply_transform_commands;
    use crate::types::{LoadModelRequest, SessionRequest, TransformCommand};
    use smartplace_core::model::find_preset;

    fn placement_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .add_message::<PlacementTap>()
            .add_message::<ModelPlaced>()
            .init_resource::<ArSettings>()
            .add_systems(Update, handle_placement_taps);

        let chair = find_preset("Wooden Chair").unwrap().to_resource();
        app.world_mut().insert_resource(ArSession::start(&SessionRequest {
            model: chair,
            camera_id: None,
        }));

        let config = app.world().resource::<ArSettings>().0.scene.clone();
        app.world_mut().spawn((Window::default(), PrimaryWindow));
        app.world_mut().spawn((
            ar_camera_transform(&config),
            Projection::Perspective(ar_projection(&config, 1280.0 / 720.0)),
            ArCamera,
        ));
        app
    }

    fn spawn_model(app: &mut App) -> Entity {
        app.world_mut()
            .spawn((
                PlacedModel {
                    name: "Wooden Chair".into(),
                },
                Transform::default(),
                Visibility::Hidden,
            ))
            .id()
    }

    fn set_model_ready(app: &mut App, ready: bool) {
        app.world_mut().resource_mut::<ArSession>().info.model_ready = ready;
    }

    fn tap(app: &mut App, position: Vec2) {
        app.world_mut().write_message(PlacementTap { position });
        app.update();
    }

    fn window_center(app: &mut App) -> Vec2 {
        let mut windows = app.world_mut().query::<&Window>();
        let window = windows.single(app.world()).unwrap();
        Vec2::new(window.width(), window.height()) / 2.0
    }

    #[test]
    fn test_center_tap_places_chair_above_ground() {
        let mut app = placement_app();
        let model = spawn_model(&mut app);
        set_model_ready(&mut app, true);

        let center = window_center(&mut app);
        tap(&mut app, center);

        let transform = app.world().get::<Transform>(model).unwrap();
        assert!(transform.translation.distance(Vec3::new(0.0, 0.5, 0.0)) < 1e-3);
        assert_eq!(app.world().get::<Visibility>(model), Some(&Visibility::Inherited));
        assert!(app.world().resource::<ArSession>().is_placed());

        let placed = app.world().resource::<Messages<ModelPlaced>>();
        assert_eq!(placed.len(), 1);

        // A second tap is ignored
        tap(&mut app, Vec2::new(100.0, 700.0));
        let transform = app.world().get::<Transform>(model).unwrap();
        assert!(transform.translation.distance(Vec3::new(0.0, 0.5, 0.0)) < 1e-3);
    }

    #[test]
    fn test_tap_places_again_after_delete() {
        let mut app = placement_app();
        app.add_message::<TransformCommand>()
            .add_message::<LoadModelRequest>()
            .add_systems(Update, apply_transform_commands.after(handle_placement_taps));
        let first = spawn_model(&mut app);
        set_model_ready(&mut app, true);

        let center = window_center(&mut app);
        tap(&mut app, center);
        assert!(app.world().resource::<ArSession>().is_placed());

        app.world_mut().write_message(TransformCommand::Delete);
        app.update();
        assert!(app.world().get_entity(first).is_err());
        assert!(!app.world().resource::<ArSession>().is_placed());
        assert_eq!(app.world().resource::<Messages<LoadModelRequest>>().len(), 1);

        // Reloaded model arrives; the next tap anchors it below the centre
        let second = spawn_model(&mut app);
        set_model_ready(&mut app, true);
        tap(&mut app, center + Vec2::new(0.0, 150.0));

        assert!(app.world().resource::<ArSession>().is_placed());
        let translation = app.world().get::<Transform>(second).unwrap().translation;
        assert!((translation.y - 0.5).abs() < 1e-3);
        assert!(translation.z > 0.1);
        assert_eq!(app.world().get::<Visibility>(second), Some(&Visibility::Inherited));
    }

    #[test]
    fn test_tap_before_model_ready_is_ignored() {
        let mut app = placement_app();
        let model = spawn_model(&mut app);

        let center = window_center(&mut app);
        tap(&mut app, center);

        assert!(!app.world().resource::<ArSession>().is_placed());
        assert_eq!(app.world().get::<Visibility>(model), Some(&Visibility::Hidden));
    }

    #[test]
    fn test_tap_above_horizon_is_ignored() {
        let mut app = placement_app();
        let model = spawn_model(&mut app);
        set_model_ready(&mut app, true);

        tap(&mut app, Vec2::new(640.0, 0.0));

        assert!(!app.world().resource::<ArSession>().is_placed());
        assert_eq!(app.world().get::<Transform>(model).unwrap().translation, Vec3::ZERO);
    }

    #[test]
    fn test_touch_drag_is_not_a_tap() {
        let mut state = TouchState::default();
        state.begin(Vec2::new(10.0, 10.0));
        state.moved_to(Vec2::new(15.0, 12.0), 10.0);
        assert_eq!(state.release(), Some(Vec2::new(10.0, 10.0)));

        state.begin(Vec2::new(10.0, 10.0));
        state.moved_to(Vec2::new(40.0, 10.0), 10.0);
        state.moved_to(Vec2::new(10.0, 10.0), 10.0);
        assert_eq!(state.release(), None);
        assert_eq!(state.release(), None);
    }
}
