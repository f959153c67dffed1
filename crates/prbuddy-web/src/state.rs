//! Shared axum state: a handle to the Orchestrator plus the resolved
//! config, cloned cheaply into every handler.

use std::sync::Arc;

use prbuddy_core::PrbuddyConfig;
use prbuddy_daemon::Orchestrator;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub config: Arc<PrbuddyConfig>,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, config: PrbuddyConfig) -> Self {
        AppState {
            orchestrator: Arc::new(orchestrator),
            config: Arc::new(config),
        }
    }
}
