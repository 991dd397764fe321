//! HTTP client for configuration and remote model search

use bevy::prelude::*;
use smartplace_core::config::SearchConfig;
use smartplace_core::search::resolve_prompt;
use smartplace_core::{ArConfig, ArError};
use smartplace_scene::{ArSettings, ErrorBanner};
use std::sync::{Arc, Mutex};

use crate::app::ModelSelection;

/// Configuration file fetched from the page origin unless `?config=` says otherwise
pub const DEFAULT_CONFIG_PATH: &str = "smartplace.toml";

pub struct NetworkPlugin;

impl Plugin for NetworkPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PendingConfig>()
            .init_resource::<PendingSearchResults>()
            .init_resource::<PromptState>()
            .add_systems(Startup, fetch_config)
            .add_systems(Update, (process_config, process_search_results));
    }
}

/// Config file contents from the async fetch; the inner `None` means not found
#[derive(Resource, Default)]
pub struct PendingConfig(pub Arc<Mutex<Option<Option<String>>>>);

/// A finished remote search: the prompt and the model URL it found
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub prompt: String,
    pub result: Result<Option<String>, ArError>,
}

/// Pending search results from async fetch
#[derive(Resource, Default)]
pub struct PendingSearchResults(pub Arc<Mutex<Vec<SearchOutcome>>>);

/// Prompt box state
#[derive(Debug, Clone, Resource, Default)]
pub struct PromptState {
    pub text: String,
    /// A search is in flight
    pub searching: bool,
}

impl PromptState {
    /// Trimmed prompt, `None` when blank or while a search is running
    pub fn submittable(&self) -> Option<String> {
        let prompt = self.text.trim();
        (!self.searching && !prompt.is_empty()).then(|| prompt.to_string())
    }
}

/// Parse a query parameter from a search string
pub fn parse_query_param(search: &str, param: &str) -> Option<String> {
    let search = search.trim_start_matches('?');
    for pair in search.split('&') {
        let mut parts = pair.splitn(2, '=');
        if let (Some(key), Some(value)) = (parts.next(), parts.next()) {
            if key == param && !value.is_empty() {
                // URL decode the value
                return Some(value.replace("%3A", ":").replace("%2F", "/"));
            }
        }
    }
    None
}

/// Where to load the configuration from, given the page's query string
pub fn config_location(search: &str) -> String {
    parse_query_param(search, "config").unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

/// Fetch the configuration file on startup
fn fetch_config(pending: Res<PendingConfig>) {
    #[cfg(target_arch = "wasm32")]
    {
        use wasm_bindgen_futures::spawn_local;

        let pending_clone = pending.0.clone();
        let search = web_sys::window()
            .and_then(|w| w.location().search().ok())
            .unwrap_or_default();
        let url = config_location(&search);

        spawn_local(async move {
            tracing::info!("Fetching configuration from: {}", url);

            let content = match gloo_net::http::Request::get(&url).send().await {
                Ok(response) if response.ok() => response.text().await.ok(),
                Ok(response) => {
                    tracing::warn!("Configuration not available (HTTP {})", response.status());
                    None
                }
                Err(e) => {
                    tracing::warn!("Failed to fetch configuration: {:?}", e);
                    None
                }
            };
            if let Ok(mut slot) = pending_clone.lock() {
                *slot = Some(content);
            }
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let content = std::fs::read_to_string(DEFAULT_CONFIG_PATH).ok();
        if let Ok(mut slot) = pending.0.lock() {
            *slot = Some(content);
        }
    }
}

fn process_config(pending: Res<PendingConfig>, mut settings: ResMut<ArSettings>) {
    let content = {
        match pending.0.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        }
    };
    if let Some(content) = content {
        settings.0 = ArConfig::from_toml_or_default(content.as_deref());
    }
}

/// Start resolving a prompt to a model; the outcome lands in [`PendingSearchResults`]
pub fn start_prompt_search(prompt: String, config: &SearchConfig, pending: &PendingSearchResults) {
    if !config.enabled {
        push_outcome(
            &pending.0,
            SearchOutcome {
                prompt,
                result: Err(ArError::Search("remote search disabled".to_string())),
            },
        );
        return;
    }

    #[cfg(target_arch = "wasm32")]
    {
        use wasm_bindgen_futures::spawn_local;

        let pending_clone = pending.0.clone();
        let config = config.clone();
        spawn_local(async move {
            let result = search_model(&prompt, &config).await;
            push_outcome(&pending_clone, SearchOutcome { prompt, result });
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        push_outcome(
            &pending.0,
            SearchOutcome {
                prompt,
                result: Err(ArError::Search(
                    "remote search not supported on this platform".to_string(),
                )),
            },
        );
    }
}

fn push_outcome(pending: &Arc<Mutex<Vec<SearchOutcome>>>, outcome: SearchOutcome) {
    if let Ok(mut queue) = pending.lock() {
        queue.push(outcome);
    }
}

/// Search for a downloadable model and return its download URL
#[cfg(target_arch = "wasm32")]
async fn search_model(prompt: &str, config: &SearchConfig) -> Result<Option<String>, ArError> {
    use gloo_net::http::Request;
    use smartplace_core::search::{
        authorization, download_endpoint, search_endpoint, search_params, DownloadResponse,
        SearchResponse,
    };

    let auth = authorization(config);
    let fetch = |request: gloo_net::http::RequestBuilder| {
        let request = match &auth {
            Some(auth) => request.header("Authorization", auth),
            None => request,
        };
        async move {
            let response = request
                .send()
                .await
                .map_err(|e| ArError::Search(e.to_string()))?;
            if !response.ok() {
                return Err(ArError::Search(format!("HTTP {}", response.status())));
            }
            response
                .text()
                .await
                .map_err(|e| ArError::Search(e.to_string()))
        }
    };

    let body = fetch(Request::get(&search_endpoint(config)).query(search_params(prompt))).await?;
    let Some(uid) = SearchResponse::parse(&body)?.first_uid().map(str::to_string) else {
        return Ok(None);
    };
    tracing::debug!("Search hit for '{}': {}", prompt, uid);

    let body = fetch(Request::get(&download_endpoint(config, &uid))).await?;
    Ok(Some(DownloadResponse::parse(&body)?.best_url()?.to_string()))
}

fn process_search_results(
    pending: Res<PendingSearchResults>,
    mut prompt_state: ResMut<PromptState>,
    mut selection: ResMut<ModelSelection>,
) {
    let outcomes = {
        if let Ok(mut queue) = pending.0.lock() {
            std::mem::take(&mut *queue)
        } else {
            Vec::new()
        }
    };

    for SearchOutcome { prompt, result } in outcomes {
        // Never an error for the user: failures resolve to a category default
        selection.select(resolve_prompt(&prompt, result));
        prompt_state.searching = false;
    }
}

/// Submit the prompt box, if it holds something to search for
pub fn submit_prompt(
    prompt_state: &mut PromptState,
    settings: &ArSettings,
    pending: &PendingSearchResults,
    banner: &mut ErrorBanner,
) -> bool {
    let Some(prompt) = prompt_state.submittable() else { return false };
    banner.clear();
    prompt_state.searching = true;
    start_prompt_search(prompt, &settings.0.search, pending);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartplace_core::model::find_preset;
    use smartplace_core::ModelSource;

    fn network_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<ArSettings>()
            .init_resource::<ErrorBanner>()
            .init_resource::<ModelSelection>()
            .init_resource::<PendingConfig>()
            .init_resource::<PendingSearchResults>()
            .init_resource::<PromptState>()
            .add_systems(Update, (process_config, process_search_results));
        app
    }

    #[test]
    fn test_config_location() {
        assert_eq!(config_location(""), DEFAULT_CONFIG_PATH);
        assert_eq!(config_location("?config="), DEFAULT_CONFIG_PATH);
        assert_eq!(
            config_location("?debug=1&config=https%3A%2F%2Fcdn.example%2Far.toml"),
            "https://cdn.example/ar.toml"
        );
    }

    #[test]
    fn test_blank_prompt_is_not_submitted() {
        let mut state = PromptState {
            text: "   ".into(),
            searching: false,
        };
        assert_eq!(state.submittable(), None);

        state.text = "  wooden chair ".into();
        assert_eq!(state.submittable().as_deref(), Some("wooden chair"));

        state.searching = true;
        assert_eq!(state.submittable(), None);
    }

    #[test]
    fn test_failed_search_falls_back_silently() {
        let mut app = network_app();
        app.world_mut().resource_mut::<PromptState>().text = "wooden chair".into();

        let submitted = app
            .world_mut()
            .resource_scope(|world, mut prompt_state: Mut<PromptState>| {
                let mut banner = ErrorBanner(Some("old error".into()));
                let submitted = submit_prompt(
                    &mut prompt_state,
                    world.resource::<ArSettings>(),
                    world.resource::<PendingSearchResults>(),
                    &mut banner,
                );
                assert!(banner.0.is_none());
                submitted
            });
        assert!(submitted);
        assert!(app.world().resource::<PromptState>().searching);

        app.update();

        let selected = app.world().resource::<ModelSelection>().selected.clone().unwrap();
        assert_eq!(selected.url, find_preset("Wooden Chair").unwrap().url);
        assert_eq!(selected.source, ModelSource::Prompt);
        assert_eq!(selected.name, "wooden chair");
        assert!(!app.world().resource::<PromptState>().searching);
        assert!(app.world().resource::<ErrorBanner>().0.is_none());
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let mut app = network_app();
        app.world_mut().resource_mut::<ArSettings>().0.transform.max_scale = 9.0;
        *app.world().resource::<PendingConfig>().0.lock().unwrap() = Some(None);
        app.update();
        assert_eq!(app.world().resource::<ArSettings>().0.transform.max_scale, 5.0);
    }

    #[test]
    fn test_config_is_applied() {
        let mut app = network_app();
        *app.world().resource::<PendingConfig>().0.lock().unwrap() =
            Some(Some("[transform]\nmax_scale = 3.0\n".to_string()));
        app.update();
        assert_eq!(app.world().resource::<ArSettings>().0.transform.max_scale, 3.0);
    }
}
