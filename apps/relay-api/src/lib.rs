pub mod config;
pub mod error;
pub mod gateway;
pub mod routes;

use std::sync::Arc;

use config::Config;
use gateway::handler::SessionManager;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub relay: Arc<SessionManager>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let relay = Arc::new(SessionManager::new(&config));
        Self {
            config: Arc::new(config),
            relay,
        }
    }
}
