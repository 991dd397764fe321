//! Browser camera stream: device enumeration, acquisition and frame capture
//!
//! The media stream, its `<video>` element and the capture canvas are not
//! `Send`, so they live in a thread-local slot. Async results reach the ECS
//! through pending queues drained each frame.

use bevy::prelude::*;
use tracing::{info, error};
use smartplace_core::camera::{capture_size, StreamConstraints};
use smartplace_core::{ArError, StreamStatus, VideoFrame, VideoInputDevice};
use smartplace_scene::{AppMode, ArSession, ArSettings, LatestVideoFrame, SessionError, SessionRequest};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub struct VideoPlugin;

impl Plugin for VideoPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CameraDialog>()
            .init_resource::<PendingStreamEvents>()
            .init_resource::<PendingDeviceList>()
            .add_systems(OnEnter(AppMode::Ar), start_camera_stream)
            .add_systems(OnExit(AppMode::Ar), stop_camera_stream)
            .add_systems(
                Update,
                (process_stream_events, capture_video_frame)
                    .chain()
                    .run_if(resource_exists::<ArSession>),
            )
            .add_systems(Update, process_device_list);
    }
}

/// Outcome of a stream request
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Live { width: u32, height: u32 },
    Denied(String),
}

/// Stream events from async getUserMedia calls
#[derive(Resource, Default)]
pub struct PendingStreamEvents(pub Arc<Mutex<VecDeque<StreamEvent>>>);

/// Device list from async enumeration
#[derive(Resource, Default)]
pub struct PendingDeviceList(pub Arc<Mutex<Option<Vec<VideoInputDevice>>>>);

/// Camera selection dialog shown before entering AR mode
#[derive(Debug, Clone, Resource, Default)]
pub struct CameraDialog {
    pub open: bool,
    /// Enumeration in flight
    pub loading: bool,
    pub devices: Vec<VideoInputDevice>,
    pub selected: Option<String>,
}

impl CameraDialog {
    /// Open the dialog and start listing cameras
    pub fn show(&mut self, pending: &PendingDeviceList) {
        self.open = true;
        self.loading = true;
        browser::enumerate_cameras(pending.0.clone());
    }

    pub fn close(&mut self) {
        self.open = false;
        self.loading = false;
    }

    /// Replace the device list, keeping the selection if it still exists
    pub fn set_devices(&mut self, devices: Vec<VideoInputDevice>) {
        let still_present = self
            .selected
            .as_ref()
            .is_some_and(|id| devices.iter().any(|d| &d.id == id));
        if !still_present {
            self.selected = devices.first().map(|d| d.id.clone());
        }
        self.devices = devices;
        self.loading = false;
    }

    pub fn selected_device(&self) -> Option<&VideoInputDevice> {
        let id = self.selected.as_ref()?;
        self.devices.iter().find(|d| &d.id == id)
    }
}

fn process_device_list(pending: Res<PendingDeviceList>, mut dialog: ResMut<CameraDialog>) {
    let devices = {
        match pending.0.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        }
    };
    if let Some(devices) = devices {
        info!(count = devices.len(), "Cameras enumerated");
        dialog.set_devices(devices);
    }
}

/// Request the camera chosen for the session
fn start_camera_stream(
    request: Option<Res<SessionRequest>>,
    settings: Res<ArSettings>,
    pending: Res<PendingStreamEvents>,
) {
    let Some(request) = request else { return };
    let constraints = StreamConstraints::for_selection(request.camera_id.as_deref(), &settings.0.video);
    info!(
        device = constraints.device_id.as_deref().unwrap_or(constraints.facing),
        "Requesting camera stream"
    );
    browser::start_stream(constraints, pending.0.clone());
}

/// Stop every track and drop anything the stream still has queued
fn stop_camera_stream(
    pending: Res<PendingStreamEvents>,
    session: Option<ResMut<ArSession>>,
    mut latest: ResMut<LatestVideoFrame>,
) {
    browser::stop_stream();
    if let Ok(mut queue) = pending.0.lock() {
        queue.clear();
    }
    latest.clear();
    if let Some(mut session) = session {
        session.info.stream = StreamStatus::Stopped;
    }
    info!("Camera stream stopped");
}

/// Apply stream outcomes to the session; a denied stream ends it
pub fn process_stream_events(
    pending: Res<PendingStreamEvents>,
    mut session: ResMut<ArSession>,
    mut errors: MessageWriter<SessionError>,
) {
    let events = {
        if let Ok(mut queue) = pending.0.lock() {
            std::mem::take(&mut *queue)
        } else {
            VecDeque::new()
        }
    };

    for event in events {
        match event {
            StreamEvent::Live { width, height } => {
                session.info.stream = StreamStatus::Live;
                info!(session = %session.info.id, width, height, "Camera stream live");
            }
            StreamEvent::Denied(reason) => {
                session.info.stream = StreamStatus::Denied;
                error!(session = %session.info.id, reason = %reason, "Camera access failed");
                errors.write(SessionError(ArError::Permission(reason)));
            }
        }
    }
}

fn capture_video_frame(settings: Res<ArSettings>, mut latest: ResMut<LatestVideoFrame>) {
    if let Some(frame) = browser::capture_frame(settings.0.video.capture_width) {
        latest.push(frame);
    }
}

// ============================================================================
// Media stream interop (WASM only)
// ============================================================================

#[cfg(target_arch = "wasm32")]
mod browser {
    use super::*;
    use anyhow::{anyhow, Context};
    use std::cell::{Cell, RefCell};
    use wasm_bindgen::{JsCast, JsValue};
    use wasm_bindgen_futures::{spawn_local, JsFuture};
    use web_sys::{
        CanvasRenderingContext2d, HtmlCanvasElement, HtmlVideoElement, MediaDeviceInfo,
        MediaDeviceKind, MediaDevices, MediaStream, MediaStreamConstraints, MediaStreamTrack,
    };

    /// `HTMLMediaElement.HAVE_CURRENT_DATA`
    const HAVE_CURRENT_DATA: u16 = 2;

    struct ActiveStream {
        stream: MediaStream,
        video: HtmlVideoElement,
        canvas: HtmlCanvasElement,
        context: CanvasRenderingContext2d,
    }

    impl ActiveStream {
        fn release(self) {
            stop_tracks(&self.stream);
            self.video.set_src_object(None);
            self.video.remove();
        }
    }

    thread_local! {
        static ACTIVE_STREAM: RefCell<Option<ActiveStream>> = const { RefCell::new(None) };
        /// Bumped on every stop; a stream resolving under an older epoch is discarded
        static STREAM_EPOCH: Cell<u64> = const { Cell::new(0) };
    }

    fn js_error(e: JsValue) -> anyhow::Error {
        anyhow!("{:?}", e)
    }

    fn media_devices() -> anyhow::Result<MediaDevices> {
        let window = web_sys::window().context("no window object")?;
        window.navigator().media_devices().map_err(js_error)
    }

    fn stop_tracks(stream: &MediaStream) {
        for track in stream.get_tracks().iter() {
            if let Ok(track) = track.dyn_into::<MediaStreamTrack>() {
                track.stop();
            }
        }
    }

    fn set(target: &js_sys::Object, key: &str, value: &JsValue) -> anyhow::Result<()> {
        js_sys::Reflect::set(target, &JsValue::from_str(key), value).map_err(js_error)?;
        Ok(())
    }

    fn ideal(value: u32) -> anyhow::Result<JsValue> {
        let constraint = js_sys::Object::new();
        set(&constraint, "ideal", &JsValue::from(value))?;
        Ok(constraint.into())
    }

    fn video_constraints(constraints: &StreamConstraints) -> anyhow::Result<JsValue> {
        let video = js_sys::Object::new();
        match &constraints.device_id {
            Some(id) => {
                let exact = js_sys::Object::new();
                set(&exact, "exact", &JsValue::from_str(id))?;
                set(&video, "deviceId", &exact)?;
            }
            None => set(&video, "facingMode", &JsValue::from_str(constraints.facing))?,
        }
        set(&video, "width", &ideal(constraints.ideal_width)?)?;
        set(&video, "height", &ideal(constraints.ideal_height)?)?;
        Ok(video.into())
    }

    async fn get_user_media(video: &JsValue) -> anyhow::Result<MediaStream> {
        let media = MediaStreamConstraints::new();
        media.set_video(video);
        media.set_audio(&JsValue::FALSE);
        let promise = media_devices()?
            .get_user_media_with_constraints(&media)
            .map_err(js_error)?;
        let stream = JsFuture::from(promise).await.map_err(js_error)?;
        stream.dyn_into::<MediaStream>().map_err(js_error)
    }

    async fn attach(stream: MediaStream) -> anyhow::Result<ActiveStream> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .context("no document object")?;

        let video = document
            .create_element("video")
            .map_err(js_error)?
            .dyn_into::<HtmlVideoElement>()
            .map_err(|_| anyhow!("failed to create video element"))?;
        video.set_autoplay(true);
        video.set_muted(true);
        video.set_attribute("playsinline", "true").map_err(js_error)?;
        video.set_src_object(Some(&stream));
        JsFuture::from(video.play().map_err(js_error)?)
            .await
            .map_err(js_error)?;

        let canvas = document
            .create_element("canvas")
            .map_err(js_error)?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| anyhow!("failed to create canvas element"))?;
        let context = canvas
            .get_context("2d")
            .map_err(js_error)?
            .context("no 2d context")?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| anyhow!("unexpected 2d context type"))?;

        Ok(ActiveStream {
            stream,
            video,
            canvas,
            context,
        })
    }

    async fn open(constraints: &StreamConstraints) -> anyhow::Result<ActiveStream> {
        let stream = get_user_media(&video_constraints(constraints)?).await?;
        match attach(stream.clone()).await {
            Ok(active) => Ok(active),
            Err(e) => {
                stop_tracks(&stream);
                Err(e)
            }
        }
    }

    pub fn start_stream(constraints: StreamConstraints, pending: Arc<Mutex<VecDeque<StreamEvent>>>) {
        stop_stream();
        let epoch = STREAM_EPOCH.with(Cell::get);

        spawn_local(async move {
            let result = open(&constraints).await;
            if STREAM_EPOCH.with(Cell::get) != epoch {
                if let Ok(active) = result {
                    active.release();
                }
                tracing::info!("Camera stream resolved after its session ended, released");
                return;
            }

            let event = match result {
                Ok(active) => {
                    let event = StreamEvent::Live {
                        width: active.video.video_width(),
                        height: active.video.video_height(),
                    };
                    ACTIVE_STREAM.with(|slot| *slot.borrow_mut() = Some(active));
                    event
                }
                Err(e) => StreamEvent::Denied(e.to_string()),
            };
            if let Ok(mut queue) = pending.lock() {
                queue.push_back(event);
            }
        });
    }

    pub fn stop_stream() {
        STREAM_EPOCH.with(|epoch| epoch.set(epoch.get().wrapping_add(1)));
        if let Some(active) = ACTIVE_STREAM.with(|slot| slot.borrow_mut().take()) {
            active.release();
        }
    }

    pub fn capture_frame(max_width: u32) -> Option<VideoFrame> {
        ACTIVE_STREAM.with(|slot| {
            let slot = slot.borrow();
            let active = slot.as_ref()?;
            if active.video.ready_state() < HAVE_CURRENT_DATA {
                return None;
            }
            let (width, height) =
                capture_size(active.video.video_width(), active.video.video_height(), max_width);
            if width == 0 || height == 0 {
                return None;
            }
            if active.canvas.width() != width || active.canvas.height() != height {
                active.canvas.set_width(width);
                active.canvas.set_height(height);
            }

            active
                .context
                .draw_image_with_html_video_element_and_dw_and_dh(
                    &active.video,
                    0.0,
                    0.0,
                    width as f64,
                    height as f64,
                )
                .ok()?;
            let image_data = active
                .context
                .get_image_data(0.0, 0.0, width as f64, height as f64)
                .ok()?;
            VideoFrame::new(width, height, image_data.data().0).ok()
        })
    }

    async fn list_video_inputs() -> anyhow::Result<Vec<VideoInputDevice>> {
        // Labels stay empty until the page has been granted a stream once
        let probe = get_user_media(&JsValue::TRUE).await?;
        stop_tracks(&probe);

        let promise = media_devices()?.enumerate_devices().map_err(js_error)?;
        let devices = JsFuture::from(promise)
            .await
            .map_err(js_error)?
            .dyn_into::<js_sys::Array>()
            .map_err(js_error)?;

        Ok(devices
            .iter()
            .filter_map(|d| d.dyn_into::<MediaDeviceInfo>().ok())
            .filter(|d| d.kind() == MediaDeviceKind::Videoinput)
            .map(|d| VideoInputDevice {
                id: d.device_id(),
                label: d.label(),
            })
            .collect())
    }

    pub fn enumerate_cameras(pending: Arc<Mutex<Option<Vec<VideoInputDevice>>>>) {
        spawn_local(async move {
            let devices = match list_video_inputs().await {
                Ok(devices) => devices,
                Err(e) => {
                    tracing::warn!("Camera enumeration failed: {}", e);
                    Vec::new()
                }
            };
            if let Ok(mut slot) = pending.lock() {
                *slot = Some(devices);
            }
        });
    }
}

// Non-WASM stubs
#[cfg(not(target_arch = "wasm32"))]
mod browser {
    use super::*;

    pub fn start_stream(_constraints: StreamConstraints, pending: Arc<Mutex<VecDeque<StreamEvent>>>) {
        if let Ok(mut queue) = pending.lock() {
            queue.push_back(StreamEvent::Denied(
                "Camera capture not supported on this platform".to_string(),
            ));
        }
    }

    pub fn stop_stream() {}

    pub fn capture_frame(_max_width: u32) -> Option<VideoFrame> {
        None
    }

    pub fn enumerate_cameras(pending: Arc<Mutex<Option<Vec<VideoInputDevice>>>>) {
        if let Ok(mut slot) = pending.lock() {
            *slot = Some(Vec::new());
        }
    }
}
