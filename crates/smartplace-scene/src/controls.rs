//! Rotate, scale, delete and snapshot of the placed model

use bevy::prelude::*;
use tracing::{debug, info, warn};
use bevy::render::view::screenshot::{save_to_disk, Screenshot, ScreenshotCaptured};
use bevy::window::PrimaryWindow;
use chrono::Utc;
use smartplace_core::snapshot::snapshot_file_name;
use smartplace_core::transform::{rotation_step, ScaleLimits};

use crate::models::PlacedModel;
use crate::types::{ArSession, ArSettings, LoadModelRequest, SnapshotInProgress, TransformCommand};

/// Plugin for transform controls
pub struct ControlsPlugin;

impl Plugin for ControlsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            apply_transform_commands.run_if(resource_exists::<ArSession>),
        );
    }
}

/// Apply queued [`TransformCommand`]s to the placed model.
///
/// Rotate, scale and delete are no-ops until a model is placed. A delete
/// reloads the session's model so the next tap can place it again.
///
/// A snapshot captures the frame rendered this update. [`SnapshotInProgress`]
/// is inserted before the UI pass runs, so overlays skip drawing into it.
pub fn apply_transform_commands(
    mut commands: Commands,
    mut transform_commands: MessageReader<TransformCommand>,
    mut session: ResMut<ArSession>,
    settings: Res<ArSettings>,
    windows: Query<(), With<PrimaryWindow>>,
    snapshot: Option<Res<SnapshotInProgress>>,
    mut models: Query<(Entity, &mut Transform), With<PlacedModel>>,
    mut loads: MessageWriter<LoadModelRequest>,
) {
    let config = &settings.0.transform;
    let limits = ScaleLimits::from(config);

    let mut capturing = snapshot.is_some();

    for command in transform_commands.read() {
        if let TransformCommand::Snapshot = command {
            if windows.is_empty() {
                warn!("No render surface, snapshot skipped");
                continue;
            }
            if capturing {
                debug!("Snapshot already in progress");
                continue;
            }
            let file_name = snapshot_file_name(Utc::now());
            info!(file = %file_name, "Capturing snapshot");
            commands.insert_resource(SnapshotInProgress {
                file_name: file_name.clone(),
            });
            commands
                .spawn(Screenshot::primary_window())
                .observe(save_to_disk(file_name))
                .observe(finish_snapshot);
            capturing = true;
            continue;
        }

        if !session.is_placed() {
            debug!(?command, "No model placed, command ignored");
            continue;
        }
        let Ok((entity, mut transform)) = models.single_mut() else { continue };

        match *command {
            TransformCommand::Rotate => {
                transform.rotate_y(rotation_step(config));
            }
            TransformCommand::Scale(delta) => match limits.apply_delta(transform.scale.x, delta) {
                Some(scale) => transform.scale = Vec3::splat(scale),
                None => debug!(scale = transform.scale.x, delta, "Scale out of range, rejected"),
            },
            TransformCommand::Delete => {
                commands.entity(entity).despawn();
                session.info.placed = false;
                session.info.model_ready = false;
                info!(session = %session.info.id, "Model deleted");
                loads.write(LoadModelRequest(session.model.clone()));
            }
            TransformCommand::Snapshot => {}
        }
    }
}

fn finish_snapshot(_captured: On<ScreenshotCaptured>, mut commands: Commands) {
    commands.remove_resource::<SnapshotInProgress>();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SessionRequest;
    use smartplace_core::model::find_preset;

    fn controls_app(placed: bool) -> (App, Entity) {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .add_message::<TransformCommand>()
            .add_message::<LoadModelRequest>()
            .init_resource::<ArSettings>()
            .add_systems(Update, apply_transform_commands);

        let model = find_preset("Lantern").unwrap().to_resource();
        let mut session = ArSession::start(&SessionRequest {
            model,
            camera_id: None,
        });
        session.info.model_ready = true;
        session.info.placed = placed;
        app.world_mut().insert_resource(session);

        let entity = app
            .world_mut()
            .spawn((PlacedModel { name: "Lantern".into() }, Transform::default()))
            .id();
        (app, entity)
    }

    fn send(app: &mut App, command: TransformCommand) {
        app.world_mut().write_message(command);
        app.update();
    }

    #[test]
    fn test_rotate_steps_yaw_by_45_degrees() {
        let (mut app, entity) = controls_app(true);
        send(&mut app, TransformCommand::Rotate);
        send(&mut app, TransformCommand::Rotate);

        let rotation = app.world().get::<Transform>(entity).unwrap().rotation;
        let expected = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        assert!(rotation.angle_between(expected) < 1e-5);
    }

    #[test]
    fn test_scale_rejects_out_of_range() {
        let (mut app, entity) = controls_app(true);
        send(&mut app, TransformCommand::Scale(0.5));
        assert!((app.world().get::<Transform>(entity).unwrap().scale.x - 1.5).abs() < 1e-6);

        send(&mut app, TransformCommand::Scale(10.0));
        assert!((app.world().get::<Transform>(entity).unwrap().scale.x - 1.5).abs() < 1e-6);

        send(&mut app, TransformCommand::Scale(-1.45));
        assert!((app.world().get::<Transform>(entity).unwrap().scale.x - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_commands_ignored_when_unplaced() {
        let (mut app, entity) = controls_app(false);
        send(&mut app, TransformCommand::Rotate);
        send(&mut app, TransformCommand::Scale(0.1));
        send(&mut app, TransformCommand::Delete);

        let transform = app.world().get::<Transform>(entity).unwrap();
        assert_eq!(*transform, Transform::default());
        assert!(app.world().resource::<Messages<LoadModelRequest>>().is_empty());
    }

    #[test]
    fn test_delete_resets_placement_and_reloads() {
        let (mut app, entity) = controls_app(true);
        send(&mut app, TransformCommand::Delete);

        assert!(app.world().get_entity(entity).is_err());
        let session = app.world().resource::<ArSession>();
        assert!(!session.is_placed());
        assert!(!session.is_model_ready());

        let requests = app.world().resource::<Messages<LoadModelRequest>>();
        let mut cursor = requests.get_cursor();
        let reloaded: Vec<_> = cursor.read(requests).collect();
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded[0].0.url.ends_with("Lantern.glb"));
    }

    #[test]
    fn test_snapshot_without_window_is_skipped() {
        let (mut app, _) = controls_app(true);
        send(&mut app, TransformCommand::Snapshot);

        let mut screenshots = app.world_mut().query::<&Screenshot>();
        assert_eq!(screenshots.iter(app.world()).count(), 0);
        assert!(!app.world().contains_resource::<SnapshotInProgress>());
    }

    #[test]
    fn test_snapshot_hides_overlays_until_captured() {
        let (mut app, _) = controls_app(true);
        app.world_mut().spawn((Window::default(), PrimaryWindow));

        app.world_mut().write_message(TransformCommand::Snapshot);
        app.world_mut().write_message(TransformCommand::Snapshot);
        app.update();

        let pending = app.world().resource::<SnapshotInProgress>();
        assert!(pending.file_name.starts_with("smartplace3d-"));
        let mut screenshots = app.world_mut().query::<&Screenshot>();
        assert_eq!(screenshots.iter(app.world()).count(), 1);

        // Still pending: a further request does not stack a second capture
        send(&mut app, TransformCommand::Snapshot);
        assert_eq!(screenshots.iter(app.world()).count(), 1);
    }
}
