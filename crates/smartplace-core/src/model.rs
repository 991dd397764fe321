//! Model catalog - presets, upload validation and prompt fallbacks
//!
//! A [`ModelResource`] is the only thing the scene needs to load a model: a
//! URL the asset loader understands and a display name.

use serde::{Deserialize, Serialize};

use crate::error::ArError;

const SAMPLE_MODELS_BASE: &str =
    "https://cdn.jsdelivr.net/gh/KhronosGroup/glTF-Sample-Models@master/2.0";

/// Asset source name under which uploaded files are served
pub const UPLOAD_SOURCE: &str = "upload";

/// Where a model resource came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelSource {
    Preset,
    Upload,
    Prompt,
}

/// A resolved, loadable model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResource {
    pub name: String,
    pub url: String,
    pub source: ModelSource,
}

impl ModelResource {
    pub fn new(name: impl Into<String>, url: impl Into<String>, source: ModelSource) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            source,
        }
    }

    /// Name shown in the UI, "Custom Model" when the name is blank
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            "Custom Model"
        } else {
            &self.name
        }
    }
}

/// Preset catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub url: String,
    /// Emoji shown next to the preset name
    pub thumbnail: String,
}

impl Preset {
    pub fn to_resource(&self) -> ModelResource {
        ModelResource::new(self.name.clone(), self.url.clone(), ModelSource::Preset)
    }
}

fn sample_model_url(name: &str) -> String {
    format!("{SAMPLE_MODELS_BASE}/{name}/glTF-Binary/{name}.glb")
}

/// Ordered list of preset demo models
pub fn preset_models() -> Vec<Preset> {
    [
        ("Wooden Chair", "Chair", "🪑"),
        ("Water Bottle", "WaterBottle", "🍶"),
        ("Lantern", "Lantern", "🏮"),
        ("Avocado", "Avocado", "🥑"),
    ]
    .into_iter()
    .map(|(name, sample, thumbnail)| Preset {
        name: name.to_string(),
        url: sample_model_url(sample),
        thumbnail: thumbnail.to_string(),
    })
    .collect()
}

/// Find a preset by its display name (case-insensitive)
pub fn find_preset(name: &str) -> Option<Preset> {
    preset_models()
        .into_iter()
        .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
}

/// Category default used when remote search yields nothing
pub fn fallback_model_url(prompt: &str) -> String {
    let prompt = prompt.to_lowercase();
    let sample = if prompt.contains("chair") {
        "Chair"
    } else if prompt.contains("table") || prompt.contains("desk") {
        "WaterBottle"
    } else if prompt.contains("sofa") || prompt.contains("couch") {
        "Avocado"
    } else if prompt.contains("lamp") || prompt.contains("light") {
        "Lantern"
    } else {
        "Box"
    };
    sample_model_url(sample)
}

/// Supported model container formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Glb,
    Gltf,
}

impl ModelFormat {
    /// Detect format from a file name extension
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let lower = file_name.to_lowercase();
        if lower.ends_with(".glb") {
            Some(ModelFormat::Glb)
        } else if lower.ends_with(".gltf") {
            Some(ModelFormat::Gltf)
        } else {
            None
        }
    }

    pub fn extensions() -> &'static [&'static str] {
        &["glb", "gltf"]
    }
}

/// Reject anything that is not a `.glb`/`.gltf` file before any load attempt
pub fn validate_upload(file_name: &str, content: &[u8]) -> Result<ModelFormat, ArError> {
    let format = ModelFormat::from_file_name(file_name)
        .ok_or_else(|| ArError::InvalidFormat(file_name.to_string()))?;
    if content.is_empty() {
        return Err(ArError::InvalidFormat(format!("{file_name} is empty")));
    }
    Ok(format)
}

/// Asset path for an uploaded file, served from the in-memory upload source
pub fn upload_asset_path(file_name: &str) -> String {
    let sanitized: String = file_name
        .chars()
        .map(|c| if c == '/' || c == '\\' || c == ':' { '_' } else { c })
        .collect();
    format!("{UPLOAD_SOURCE}://{sanitized}")
}

/// File name component of an upload asset path
pub fn upload_file_name(asset_path: &str) -> Option<&str> {
    asset_path.strip_prefix(UPLOAD_SOURCE)?.strip_prefix("://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_ordered() {
        let names: Vec<String> = preset_models().into_iter().map(|p| p.name).collect();
        assert_eq!(names, ["Wooden Chair", "Water Bottle", "Lantern", "Avocado"]);
    }

    #[test]
    fn test_wooden_chair_preset() {
        let chair = find_preset("wooden chair").unwrap();
        assert!(chair.url.ends_with("/Chair/glTF-Binary/Chair.glb"));
        assert_eq!(chair.to_resource().source, ModelSource::Preset);
    }

    #[test]
    fn test_fallback_keywords() {
        assert!(fallback_model_url("Wooden Chair").ends_with("Chair.glb"));
        assert!(fallback_model_url("office desk").ends_with("WaterBottle.glb"));
        assert!(fallback_model_url("a table").ends_with("WaterBottle.glb"));
        assert!(fallback_model_url("leather couch").ends_with("Avocado.glb"));
        assert!(fallback_model_url("SOFA").ends_with("Avocado.glb"));
        assert!(fallback_model_url("desk lamp").ends_with("WaterBottle.glb"));
        assert!(fallback_model_url("ceiling light").ends_with("Lantern.glb"));
        assert!(fallback_model_url("spaceship").ends_with("Box.glb"));
    }

    #[test]
    fn test_chair_fallback_matches_preset() {
        let chair = find_preset("Wooden Chair").unwrap();
        assert_eq!(fallback_model_url("wooden chair"), chair.url);
    }

    #[test]
    fn test_validate_upload() {
        assert_eq!(validate_upload("model.glb", b"glTF").unwrap(), ModelFormat::Glb);
        assert_eq!(validate_upload("Scene.GLTF", b"{}").unwrap(), ModelFormat::Gltf);
        assert!(matches!(
            validate_upload("model.txt", b"hello"),
            Err(ArError::InvalidFormat(_))
        ));
        assert!(matches!(
            validate_upload("model.glb.zip", b"PK"),
            Err(ArError::InvalidFormat(_))
        ));
        assert!(matches!(validate_upload("empty.glb", b""), Err(ArError::InvalidFormat(_))));
    }

    #[test]
    fn test_upload_asset_path() {
        let path = upload_asset_path("my/model.glb");
        assert_eq!(path, "upload://my_model.glb");
        assert_eq!(upload_file_name(&path), Some("my_model.glb"));
        assert_eq!(upload_file_name("https://example.com/a.glb"), None);
    }

    #[test]
    fn test_display_name() {
        let unnamed = ModelResource::new("  ", "upload://a.glb", ModelSource::Upload);
        assert_eq!(unnamed.display_name(), "Custom Model");
        let named = ModelResource::new("Lantern", "x", ModelSource::Preset);
        assert_eq!(named.display_name(), "Lantern");
    }
}
