// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::config::Config;
use crate::exam::controller::ExamController;
use crate::exam::registry::SessionRegistry;
use crate::notify::Dispatcher;
use crate::store::Backend;

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn Backend>,
    pub config: Config,
    pub sessions: SessionRegistry,
    pub controller: ExamController,
}

impl AppState {
    pub fn new(backend: Arc<dyn Backend>, dispatcher: Arc<Dispatcher>, config: Config) -> Self {
        let controller = ExamController::new(Arc::clone(&backend), dispatcher, config.clone());
        Self {
            backend,
            config,
            sessions: SessionRegistry::new(),
            controller,
        }
    }
}

impl FromRef<AppState> for Arc<dyn Backend> {
    fn from_ref(state: &AppState) -> Self {
        state.backend.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for SessionRegistry {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

impl FromRef<AppState> for ExamController {
    fn from_ref(state: &AppState) -> Self {
        state.controller.clone()
    }
}
