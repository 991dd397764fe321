//! Cameras and screen-to-ground raycasting

use bevy::prelude::*;
use smartplace_core::config::SceneConfig;

/// Marker for the perspective camera of an AR session
#[derive(Component)]
pub struct ArCamera;

/// Marker for the persistent camera that clears the frame and draws the video feed
#[derive(Component)]
pub struct BackgroundCamera;

/// Render order of the AR camera; above the background, below UI overlays
pub const AR_CAMERA_ORDER: isize = 1;

/// Plugin for camera setup
pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_background_camera);
    }
}

fn spawn_background_camera(mut commands: Commands) {
    commands.spawn((
        Camera2d,
        Camera {
            order: 0,
            ..default()
        },
        BackgroundCamera,
        Name::new("background_camera"),
    ));
}

/// Camera pose for a session: eye height above the ground, looking at the origin
pub fn ar_camera_transform(config: &SceneConfig) -> Transform {
    Transform::from_xyz(0.0, config.eye_height, config.camera_distance)
        .looking_at(Vec3::ZERO, Vec3::Y)
}

/// Perspective projection for a session with the given viewport aspect
pub fn ar_projection(config: &SceneConfig, aspect_ratio: f32) -> PerspectiveProjection {
    PerspectiveProjection {
        fov: config.fov_degrees.to_radians(),
        aspect_ratio,
        near: config.near,
        far: config.far,
        ..default()
    }
}

/// Window coordinates to normalized device coordinates, Y up, both axes in [-1, 1]
pub fn screen_to_ndc(position: Vec2, viewport: Vec2) -> Option<Vec2> {
    if viewport.x <= 0.0 || viewport.y <= 0.0 {
        return None;
    }
    Some(Vec2::new(
        position.x / viewport.x * 2.0 - 1.0,
        -(position.y / viewport.y) * 2.0 + 1.0,
    ))
}

/// Ray from the camera through a point in normalized device coordinates
pub fn ray_through_ndc(camera: &Transform, fov_y: f32, aspect_ratio: f32, ndc: Vec2) -> Option<Ray3d> {
    let half_height = (fov_y * 0.5).tan();
    let view_dir = Vec3::new(ndc.x * half_height * aspect_ratio, ndc.y * half_height, -1.0);
    let direction = Dir3::new(camera.rotation * view_dir).ok()?;
    Some(Ray3d::new(camera.translation, direction))
}

/// Intersection with the horizontal ground plane at y = 0, limited to its extent
pub fn intersect_ground(ray: Ray3d, half_extent: f32) -> Option<Vec3> {
    let distance = ray.intersect_plane(Vec3::ZERO, InfinitePlane3d::new(Vec3::Y))?;
    let point = ray.get_point(distance);
    (point.x.abs() <= half_extent && point.z.abs() <= half_extent).then_some(point)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_camera() -> Transform {
        ar_camera_transform(&SceneConfig::default())
    }

    #[test]
    fn test_screen_to_ndc() {
        let viewport = Vec2::new(800.0, 600.0);
        assert_eq!(screen_to_ndc(Vec2::new(400.0, 300.0), viewport), Some(Vec2::ZERO));
        assert_eq!(screen_to_ndc(Vec2::ZERO, viewport), Some(Vec2::new(-1.0, 1.0)));
        assert_eq!(screen_to_ndc(viewport, viewport), Some(Vec2::new(1.0, -1.0)));
        assert_eq!(screen_to_ndc(Vec2::ZERO, Vec2::ZERO), None);
    }

    #[test]
    fn test_center_ray_hits_origin() {
        let config = SceneConfig::default();
        let ray = ray_through_ndc(&default_camera(), config.fov_degrees.to_radians(), 16.0 / 9.0, Vec2::ZERO)
            .unwrap();
        let hit = intersect_ground(ray, config.ground_size / 2.0).unwrap();
        assert!(hit.distance(Vec3::ZERO) < 1e-4, "hit at {hit}");
    }

    #[test]
    fn test_lower_screen_hits_closer_to_camera() {
        let config = SceneConfig::default();
        let fov = config.fov_degrees.to_radians();
        let ray = ray_through_ndc(&default_camera(), fov, 1.0, Vec2::new(0.0, -0.5)).unwrap();
        let hit = intersect_ground(ray, 50.0).unwrap();
        assert!(hit.z > 0.0 && hit.z < 3.0);
        assert!(hit.y.abs() < 1e-4);
    }

    #[test]
    fn test_ray_above_horizon_misses() {
        let fov = 75f32.to_radians();
        let ray = ray_through_ndc(&default_camera(), fov, 1.0, Vec2::new(0.0, 1.0)).unwrap();
        assert_eq!(intersect_ground(ray, 50.0), None);

        let level = Transform::from_xyz(0.0, 1.6, 3.0);
        let horizontal = ray_through_ndc(&level, fov, 1.0, Vec2::ZERO).unwrap();
        assert_eq!(intersect_ground(horizontal, 50.0), None);
    }

    #[test]
    fn test_hit_outside_ground_extent_misses() {
        let fov = 75f32.to_radians();
        let ray = ray_through_ndc(&default_camera(), fov, 1.0, Vec2::ZERO).unwrap();
        assert!(intersect_ground(ray, 50.0).is_some());

        let far = Transform::from_xyz(0.0, 1.6, 200.0).looking_at(Vec3::new(0.0, 0.0, 190.0), Vec3::Y);
        let ray = ray_through_ndc(&far, fov, 1.0, Vec2::ZERO).unwrap();
        assert_eq!(intersect_ground(ray, 50.0), None);
    }
}
