//! Remote model search (Sketchfab v3) wire types and fallback policy
//!
//! The HTTP calls themselves live in the web frontend; this module owns the
//! request shape, response parsing and what happens when search fails.

use serde::Deserialize;
use tracing::{info, warn};

use crate::config::SearchConfig;
use crate::error::ArError;
use crate::model::{fallback_model_url, ModelResource, ModelSource};

/// Response of `GET {api}/search?type=models&...`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub uid: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Response of `GET {api}/models/{uid}/download`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadResponse {
    #[serde(default)]
    pub gltf: Option<DownloadLink>,
    #[serde(default)]
    pub glb: Option<DownloadLink>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadLink {
    #[serde(default)]
    pub url: Option<String>,
}

impl SearchResponse {
    pub fn parse(body: &str) -> Result<Self, ArError> {
        serde_json::from_str(body).map_err(|e| ArError::Search(format!("invalid search response: {e}")))
    }

    /// First hit, if any
    pub fn first_uid(&self) -> Option<&str> {
        self.results.first().map(|hit| hit.uid.as_str())
    }
}

impl DownloadResponse {
    pub fn parse(body: &str) -> Result<Self, ArError> {
        serde_json::from_str(body).map_err(|e| ArError::Search(format!("invalid download response: {e}")))
    }

    /// Download URL, glTF preferred over GLB
    pub fn best_url(&self) -> Result<&str, ArError> {
        [&self.gltf, &self.glb]
            .into_iter()
            .flatten()
            .find_map(|link| link.url.as_deref())
            .ok_or_else(|| ArError::Search("No downloadable GLTF/GLB found".to_string()))
    }
}

/// Endpoint for the search request
pub fn search_endpoint(config: &SearchConfig) -> String {
    format!("{}/search", config.api_url.trim_end_matches('/'))
}

/// Query parameters for a single-result downloadable model search
pub fn search_params(prompt: &str) -> [(&'static str, String); 4] {
    [
        ("type", "models".to_string()),
        ("q", prompt.trim().to_string()),
        ("downloadable", "true".to_string()),
        ("count", "1".to_string()),
    ]
}

/// Endpoint for the download-link request of a model
pub fn download_endpoint(config: &SearchConfig, uid: &str) -> String {
    format!("{}/models/{}/download", config.api_url.trim_end_matches('/'), uid)
}

/// Authorization header value, if a token is configured
pub fn authorization(config: &SearchConfig) -> Option<String> {
    config
        .api_token
        .as_deref()
        .filter(|token| !token.trim().is_empty())
        .map(|token| format!("Token {}", token.trim()))
}

/// Turn the outcome of a remote search into a model resource.
///
/// Never fails: errors and empty results fall back to a category default
/// matched on keywords in the prompt.
pub fn resolve_prompt(prompt: &str, remote: Result<Option<String>, ArError>) -> ModelResource {
    let url = match remote {
        Ok(Some(url)) => {
            info!(prompt = %prompt, url = %url, "Model found by remote search");
            url
        }
        Ok(None) => {
            warn!(prompt = %prompt, "No models found, using fallback");
            fallback_model_url(prompt)
        }
        Err(e) => {
            warn!(prompt = %prompt, error = %e, "Model search failed, using fallback");
            fallback_model_url(prompt)
        }
    };
    ModelResource::new(prompt.trim(), url, ModelSource::Prompt)
}
