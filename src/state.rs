use std::sync::Arc;

use axum::extract::FromRef;

use crate::{config::Config, extract::ContentExtractor, generation::Generator, store::Store};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub generator: Generator,
    pub extractor: Arc<dyn ContentExtractor>,
}

impl FromRef<AppState> for Arc<dyn Store> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
