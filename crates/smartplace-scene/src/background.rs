//! Live camera feed drawn behind the 3D scene

use bevy::asset::RenderAssetUsages;
use bevy::prelude::*;
use tracing::{debug};
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use bevy::window::PrimaryWindow;

use crate::types::{ArSessionEntity, LatestVideoFrame};

/// Image the video frames are copied into
#[derive(Debug, Clone, Resource)]
pub struct VideoTexture {
    pub handle: Handle<Image>,
    /// Generation of the last frame copied
    pub generation: u64,
    pub size: UVec2,
}

/// Marker for the full-window UI node showing the video
#[derive(Component)]
pub struct VideoBackground;

fn frame_image(width: u32, height: u32, data: Vec<u8>) -> Image {
    Image::new(
        Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        data,
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::MAIN_WORLD | RenderAssetUsages::RENDER_WORLD,
    )
}

/// Black 1x1 placeholder until the first frame arrives
pub fn placeholder_image() -> Image {
    frame_image(1, 1, vec![0, 0, 0, 255])
}

/// Spawn the background node targeting the given camera
pub fn spawn_video_background(
    commands: &mut Commands,
    images: &mut Assets<Image>,
    background_camera: Entity,
) -> VideoTexture {
    let handle = images.add(placeholder_image());
    commands.spawn((
        ImageNode::new(handle.clone()),
        Node {
            position_type: PositionType::Absolute,
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            ..default()
        },
        UiTargetCamera(background_camera),
        VideoBackground,
        ArSessionEntity,
        Name::new("video_background"),
    ));
    VideoTexture {
        handle,
        generation: 0,
        size: UVec2::ONE,
    }
}

/// Size of a node covering the viewport while keeping the video aspect ratio
pub fn cover_size(viewport: Vec2, video_aspect: f32) -> Vec2 {
    if viewport.y <= 0.0 || !video_aspect.is_finite() || video_aspect <= 0.0 {
        return viewport;
    }
    let viewport_aspect = viewport.x / viewport.y;
    if video_aspect > viewport_aspect {
        Vec2::new(viewport.y * video_aspect, viewport.y)
    } else {
        Vec2::new(viewport.x, viewport.x / video_aspect)
    }
}

/// Copy the latest camera frame into the background image
pub fn update_video_texture(
    latest: Res<LatestVideoFrame>,
    texture: Option<ResMut<VideoTexture>>,
    mut images: ResMut<Assets<Image>>,
) {
    let Some(mut texture) = texture else { return };
    if latest.generation == texture.generation {
        return;
    }
    let Some(frame) = latest.get() else { return };
    if frame.check().is_err() {
        return;
    }
    texture.generation = latest.generation;

    let size = UVec2::new(frame.width, frame.height);
    let Some(mut image) = images.get_mut(&texture.handle) else { return };
    if size == texture.size {
        image.data = Some(frame.rgba.clone());
    } else {
        // Dimensions changed (or first frame): replace the image behind the same handle
        *image = frame_image(frame.width, frame.height, frame.rgba.clone());
        texture.size = size;
        debug!(width = frame.width, height = frame.height, "Video background resized");
    }
}

/// Keep the background node covering the window, centered
pub fn fit_video_background(
    texture: Option<Res<VideoTexture>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut nodes: Query<&mut Node, With<VideoBackground>>,
) {
    let Some(texture) = texture else { return };
    let Ok(window) = windows.single() else { return };
    let viewport = Vec2::new(window.width(), window.height());
    let aspect = texture.size.x as f32 / texture.size.y.max(1) as f32;
    let size = cover_size(viewport, aspect);
    let offset = (viewport - size) * 0.5;

    for mut node in nodes.iter_mut() {
        let width = Val::Px(size.x);
        let height = Val::Px(size.y);
        if node.width != width || node.height != height {
            node.width = width;
            node.height = height;
            node.left = Val::Px(offset.x);
            node.top = Val::Px(offset.y);
        }
    }
}
