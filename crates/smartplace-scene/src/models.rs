//! glTF model loading and unit-cube normalization

use bevy::asset::LoadState;
use bevy::ecs::query::QueryFilter;
use bevy::gltf::Gltf;
use bevy::math::Affine3A;
use bevy::prelude::*;
use tracing::{info, warn, error};
use bevy::scene::{SceneInstance, SceneSpawner};
use smartplace_core::ArError;

use crate::types::{ArSession, ArSessionEntity, LoadModelRequest, SessionError};

/// Root of the placed model; carries placement translation, yaw and user scale
#[derive(Component, Debug, Clone)]
pub struct PlacedModel {
    pub name: String,
}

/// Child of [`PlacedModel`] holding the glTF scene and the normalization transform
#[derive(Component)]
pub struct ModelContent;

/// Attached to a [`PlacedModel`] while its glTF is loading
#[derive(Component, Debug, Clone)]
pub struct ModelLoading {
    pub handle: Handle<Gltf>,
    pub url: String,
}

/// Attached to a [`ModelContent`] until its bounds have been measured
#[derive(Component)]
pub struct PendingNormalization;

/// Plugin for model loading
pub struct ModelsPlugin;

impl Plugin for ModelsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (start_model_loads, poll_model_loads, normalize_models)
                .chain()
                .run_if(resource_exists::<ArSession>),
        );
    }
}

/// Axis-aligned bounds accumulated from mesh vertices
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn from_point(point: Vec3) -> Self {
        Self { min: point, max: point }
    }

    pub fn extend(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Transform mapping these bounds onto a unit cube centered at the origin.
    ///
    /// The largest dimension becomes exactly 1. Degenerate bounds (a single
    /// point) yield `None`.
    pub fn normalization(&self) -> Option<Transform> {
        let max_dim = self.size().max_element();
        if !(max_dim.is_finite() && max_dim > 0.0) {
            return None;
        }
        let scale = 1.0 / max_dim;
        Some(Transform {
            translation: -self.center() * scale,
            scale: Vec3::splat(scale),
            ..default()
        })
    }
}

fn extend_with_points(bounds: &mut Option<Bounds>, points: impl IntoIterator<Item = Vec3>) {
    for point in points {
        match bounds {
            Some(b) => b.extend(point),
            None => *bounds = Some(Bounds::from_point(point)),
        }
    }
}

/// Vertex bounds of every mesh below `root`, in `root`'s local space
pub fn hierarchy_bounds<F: QueryFilter>(
    root: Entity,
    children: &Query<&Children>,
    nodes: &Query<(&Transform, Option<&Mesh3d>), F>,
    meshes: &Assets<Mesh>,
) -> Option<Bounds> {
    let mut bounds = None;
    let mut stack: Vec<(Entity, Affine3A)> = children
        .get(root)
        .map(|c| {
            c.to_vec()
                .into_iter()
                .map(|child| (child, Affine3A::IDENTITY))
                .collect()
        })
        .unwrap_or_default();

    while let Some((entity, parent)) = stack.pop() {
        let Ok((transform, mesh)) = nodes.get(entity) else { continue };
        let affine = parent * transform.compute_affine();

        if let Some(positions) = mesh
            .and_then(|m| meshes.get(&m.0))
            .and_then(|m| m.attribute(Mesh::ATTRIBUTE_POSITION))
            .and_then(|a| a.as_float3())
        {
            extend_with_points(
                &mut bounds,
                positions.iter().map(|p| affine.transform_point3(Vec3::from(*p))),
            );
        }

        if let Ok(grandchildren) = children.get(entity) {
            stack.extend(grandchildren.to_vec().into_iter().map(|child| (child, affine)));
        }
    }
    bounds
}

/// Spawn a hidden model root for each load request, replacing the current model
pub fn start_model_loads(
    mut commands: Commands,
    mut requests: MessageReader<LoadModelRequest>,
    mut session: ResMut<ArSession>,
    asset_server: Res<AssetServer>,
    existing: Query<Entity, With<PlacedModel>>,
) {
    let Some(LoadModelRequest(resource)) = requests.read().last().cloned() else { return };

    for entity in existing.iter() {
        commands.entity(entity).despawn();
    }
    session.info.placed = false;
    session.info.model_ready = false;
    session.model = resource.clone();

    info!(session = %session.info.id, url = %resource.url, "Loading model");
    let handle: Handle<Gltf> = asset_server.load(resource.url.clone());
    commands.spawn((
        PlacedModel {
            name: resource.display_name().to_string(),
        },
        ModelLoading {
            handle,
            url: resource.url.clone(),
        },
        Transform::default(),
        Visibility::Hidden,
        ArSessionEntity,
        Name::new("placed_model"),
    ));
}

/// Check loading state and attach the glTF scene once loaded
pub fn poll_model_loads(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    gltf_assets: Res<Assets<Gltf>>,
    loading: Query<(Entity, &ModelLoading)>,
    mut errors: MessageWriter<SessionError>,
) {
    for (entity, model) in loading.iter() {
        if let Some(LoadState::Failed(e)) = asset_server.get_load_state(model.handle.id()) {
            error!(url = %model.url, error = %e, "Failed to load model");
            commands.entity(entity).despawn();
            errors.write(SessionError(ArError::ModelLoad(e.to_string())));
            continue;
        }
        if !asset_server.is_loaded_with_dependencies(model.handle.id()) {
            continue;
        }

        let scene = gltf_assets.get(&model.handle).and_then(|gltf| {
            gltf.default_scene
                .clone()
                .or_else(|| gltf.scenes.first().cloned())
        });
        let Some(scene) = scene else {
            error!(url = %model.url, "Model has no scenes");
            commands.entity(entity).despawn();
            errors.write(SessionError(ArError::ModelLoad(format!(
                "{} contains no scenes",
                model.url
            ))));
            continue;
        };

        info!(url = %model.url, "Model loaded");
        commands.entity(entity).remove::<ModelLoading>().with_child((
            ModelContent,
            SceneRoot(scene),
            Transform::default(),
            PendingNormalization,
        ));
    }
}

/// Scale the model to a unit cube and center it once its scene has spawned
pub fn normalize_models(
    mut commands: Commands,
    mut session: ResMut<ArSession>,
    scene_spawner: Res<SceneSpawner>,
    meshes: Res<Assets<Mesh>>,
    mut contents: Query<(Entity, &SceneInstance, &mut Transform), With<PendingNormalization>>,
    children: Query<&Children>,
    nodes: Query<(&Transform, Option<&Mesh3d>), Without<PendingNormalization>>,
) {
    for (entity, instance, mut transform) in contents.iter_mut() {
        if !scene_spawner.instance_is_ready(**instance) {
            continue;
        }
        match hierarchy_bounds(entity, &children, &nodes, &meshes)
            .and_then(|b| b.normalization())
        {
            Some(normalization) => {
                *transform = normalization;
                info!(scale = normalization.scale.x, "Model normalized");
            }
            None => warn!("Model has no measurable geometry, leaving unscaled"),
        }
        commands.entity(entity).remove::<PendingNormalization>();
        session.info.model_ready = true;
    }
}
