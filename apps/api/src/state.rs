use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::TextGenerator;
use crate::session::store::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Generation backend. Default: `OllamaClient`; tests swap in a scripted one.
    pub generator: Arc<dyn TextGenerator>,
    pub sessions: SessionStore,
    pub config: Config,
}

impl AppState {
    pub fn new(generator: Arc<dyn TextGenerator>, config: Config) -> Self {
        Self {
            generator,
            sessions: SessionStore::new(),
            config,
        }
    }
}
