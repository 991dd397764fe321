//! Model upload through the browser's file picker
//!
//! Picked files are validated, then stored in an in-memory asset source so
//! the glTF loader can read them as `upload://<name>`.

use bevy::asset::io::memory::Dir;
use bevy::prelude::*;
use tracing::{info, warn};
use smartplace_core::model::{upload_asset_path, upload_file_name, validate_upload, ModelFormat};
use smartplace_core::{ArError, ModelResource, ModelSource};
use smartplace_scene::ErrorBanner;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::app::ModelSelection;

/// File picker plugin
pub struct FilePickerPlugin;

impl Plugin for FilePickerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PendingFileResults>()
            .init_resource::<UploadStore>()
            .add_systems(Update, process_file_results);
    }
}

/// File filter for the picker dialog
#[derive(Debug, Clone)]
pub struct FileFilter {
    /// File extensions without dots (e.g., ["glb", "gltf"])
    pub extensions: Vec<String>,
}

impl FileFilter {
    pub fn models() -> Self {
        Self {
            extensions: ModelFormat::extensions()
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }

    /// Convert to accept string for HTML input element
    pub fn to_accept_string(&self) -> String {
        if self.extensions.is_empty() {
            "*".to_string()
        } else {
            self.extensions
                .iter()
                .map(|ext| format!(".{}", ext))
                .collect::<Vec<_>>()
                .join(",")
        }
    }
}

/// Result from a file picker operation
#[derive(Debug, Clone)]
pub struct FilePickerResult {
    /// Filename (without path)
    pub filename: String,
    /// File content, `None` when reading failed
    pub content: Option<Vec<u8>>,
    /// Error message if failed
    pub error: Option<String>,
}

/// Pending file results from JavaScript callbacks
#[derive(Resource, Default)]
pub struct PendingFileResults(pub Arc<Mutex<VecDeque<FilePickerResult>>>);

/// In-memory directory behind the `upload://` asset source
#[derive(Resource, Default)]
pub struct UploadStore {
    pub dir: Dir,
    next_id: u64,
}

impl UploadStore {
    /// Store an upload and return its asset path.
    ///
    /// Every upload gets a fresh path; the asset server caches by path, so
    /// re-uploading a file with the same name must not hit the old asset.
    pub fn store(&mut self, file_name: &str, content: Vec<u8>) -> String {
        self.next_id += 1;
        let asset_path = upload_asset_path(&format!("{}-{}", self.next_id, file_name));
        if let Some(name) = upload_file_name(&asset_path) {
            self.dir.insert_asset(Path::new(name), content);
        }
        asset_path
    }
}

/// Validate a picked file and make it the selected model.
///
/// On rejection the current selection is left untouched.
pub fn accept_upload(
    result: FilePickerResult,
    uploads: &mut UploadStore,
    selection: &mut ModelSelection,
) -> Result<ModelResource, ArError> {
    let content = match (result.content, result.error) {
        (Some(content), _) => content,
        (None, error) => {
            return Err(ArError::ModelLoad(
                error.unwrap_or_else(|| format!("could not read {}", result.filename)),
            ))
        }
    };
    let format = validate_upload(&result.filename, &content)?;
    let asset_path = uploads.store(&result.filename, content);
    info!(file = %result.filename, ?format, path = %asset_path, "Model uploaded");

    let resource = ModelResource::new(result.filename, asset_path, ModelSource::Upload);
    selection.select(resource.clone());
    Ok(resource)
}

/// System to process file results from JavaScript callbacks
fn process_file_results(
    pending: Res<PendingFileResults>,
    mut uploads: ResMut<UploadStore>,
    mut selection: ResMut<ModelSelection>,
    mut banner: ResMut<ErrorBanner>,
) {
    let results = {
        if let Ok(mut queue) = pending.0.lock() {
            std::mem::take(&mut *queue)
        } else {
            VecDeque::new()
        }
    };

    for result in results {
        let filename = result.filename.clone();
        if let Err(e) = accept_upload(result, &mut uploads, &mut selection) {
            warn!(file = %filename, error = %e, "Upload rejected");
            banner.show(&e);
        }
    }
}

// ============================================================================
// JavaScript Interop (WASM only)
// ============================================================================

#[cfg(target_arch = "wasm32")]
mod js_interop {
    use super::*;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;
    use web_sys::HtmlInputElement;

    fn push_result(pending: &Arc<Mutex<VecDeque<FilePickerResult>>>, result: FilePickerResult) {
        if let Ok(mut results) = pending.lock() {
            results.push_back(result);
        }
    }

    fn read_failed(filename: String, error: &str) -> FilePickerResult {
        FilePickerResult {
            filename,
            content: None,
            error: Some(error.to_string()),
        }
    }

    /// Open a file picker dialog using HTML input element
    pub fn open_file_picker(accept: &str, pending_results: Arc<Mutex<VecDeque<FilePickerResult>>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            tracing::error!("open_file_picker: no document object");
            return;
        };

        // Create a hidden file input element
        let input: HtmlInputElement = match document
            .create_element("input")
            .ok()
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
        {
            Some(input) => input,
            None => {
                tracing::error!("open_file_picker: failed to create input element");
                return;
            }
        };

        input.set_type("file");
        input.set_accept(accept);
        input.style().set_property("display", "none").ok();

        let Some(body) = document.body() else {
            tracing::error!("open_file_picker: no document body");
            return;
        };
        if let Err(e) = body.append_child(&input) {
            tracing::error!("open_file_picker: failed to append input to body: {:?}", e);
            return;
        }

        let input_clone = input.clone();
        let closure = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            if let Some(file) = input_clone.files().and_then(|files| files.get(0)) {
                read_file(file, pending_results.clone());
            } else {
                tracing::info!("open_file_picker: no file selected");
            }

            // Remove the input element
            if let Some(parent) = input_clone.parent_node() {
                parent.remove_child(&input_clone).ok();
            }
        }) as Box<dyn FnMut(_)>);

        input.set_onchange(Some(closure.as_ref().unchecked_ref()));
        closure.forget();

        input.click();
    }

    fn read_file(file: web_sys::File, pending: Arc<Mutex<VecDeque<FilePickerResult>>>) {
        let filename = file.name();
        let reader = match web_sys::FileReader::new() {
            Ok(reader) => reader,
            Err(_) => {
                push_result(&pending, read_failed(filename, "file reader unavailable"));
                return;
            }
        };

        let reader_clone = reader.clone();
        let onload_name = filename.clone();
        let onload_pending = pending.clone();
        let onload = Closure::wrap(Box::new(move |_: web_sys::Event| {
            let content = reader_clone
                .result()
                .ok()
                .and_then(|result| result.dyn_into::<js_sys::ArrayBuffer>().ok())
                .map(|buffer| js_sys::Uint8Array::new(&buffer).to_vec());
            let result = match content {
                Some(content) => FilePickerResult {
                    filename: onload_name.clone(),
                    content: Some(content),
                    error: None,
                },
                None => read_failed(onload_name.clone(), "failed to read file"),
            };
            push_result(&onload_pending, result);
        }) as Box<dyn FnMut(_)>);

        reader.set_onload(Some(onload.as_ref().unchecked_ref()));
        onload.forget();

        if reader.read_as_array_buffer(&file).is_err() {
            push_result(&pending, read_failed(filename, "failed to read file"));
        }
    }
}

// Non-WASM stubs
#[cfg(not(target_arch = "wasm32"))]
mod js_interop {
    use super::*;

    pub fn open_file_picker(_accept: &str, pending_results: Arc<Mutex<VecDeque<FilePickerResult>>>) {
        if let Ok(mut results) = pending_results.lock() {
            results.push_back(FilePickerResult {
                filename: String::new(),
                content: None,
                error: Some("File picker not supported on this platform".to_string()),
            });
        }
    }
}

pub use js_interop::open_file_picker;

/// Helper to trigger a model upload from UI
pub fn trigger_model_upload(pending: &PendingFileResults) {
    let accept = FileFilter::models().to_accept_string();
    open_file_picker(&accept, pending.0.clone());
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartplace_core::model::find_preset;

    fn picked(filename: &str, content: &[u8]) -> FilePickerResult {
        FilePickerResult {
            filename: filename.to_string(),
            content: Some(content.to_vec()),
            error: None,
        }
    }

    #[test]
    fn test_accept_string() {
        assert_eq!(FileFilter::models().to_accept_string(), ".glb,.gltf");
    }

    #[test]
    fn test_invalid_upload_keeps_selection() {
        let mut uploads = UploadStore::default();
        let chair = find_preset("Wooden Chair").unwrap().to_resource();
        let mut selection = ModelSelection {
            selected: Some(chair.clone()),
        };

        let err = accept_upload(picked("model.txt", b"hello"), &mut uploads, &mut selection)
            .unwrap_err();
        assert!(matches!(err, ArError::InvalidFormat(_)));
        assert_eq!(selection.selected, Some(chair));
        assert!(uploads.dir.get_asset(Path::new("1-model.txt")).is_none());
    }

    #[test]
    fn test_upload_is_stored_under_unique_path() {
        let mut uploads = UploadStore::default();
        let mut selection = ModelSelection::default();

        let first = accept_upload(picked("Duck.GLB", b"glTF"), &mut uploads, &mut selection).unwrap();
        let second = accept_upload(picked("Duck.GLB", b"glTF"), &mut uploads, &mut selection).unwrap();

        assert_eq!(first.url, "upload://1-Duck.GLB");
        assert_eq!(second.url, "upload://2-Duck.GLB");
        assert_eq!(first.source, ModelSource::Upload);
        assert!(uploads.dir.get_asset(Path::new("2-Duck.GLB")).is_some());
        assert_eq!(selection.selected, Some(second));
    }

    #[test]
    fn test_failed_read_is_reported() {
        let mut uploads = UploadStore::default();
        let mut selection = ModelSelection::default();
        let result = FilePickerResult {
            filename: "scene.glb".into(),
            content: None,
            error: Some("failed to read file".into()),
        };
        assert!(accept_upload(result, &mut uploads, &mut selection).is_err());
        assert!(selection.selected.is_none());
    }

    #[test]
    fn test_rejected_upload_sets_banner() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .add_plugins(FilePickerPlugin)
            .init_resource::<ModelSelection>()
            .init_resource::<ErrorBanner>();

        app.world()
            .resource::<PendingFileResults>()
            .0
            .lock()
            .unwrap()
            .push_back(picked("model.txt", b"not a model"));
        app.update();

        let banner = app.world().resource::<ErrorBanner>();
        assert!(banner.0.as_deref().unwrap().starts_with("Invalid file format"));
        assert!(app.world().resource::<ModelSelection>().selected.is_none());
    }
}
