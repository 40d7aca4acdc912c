//! Gateway shared state.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use baton_core::config::Config;

use crate::registry::SessionRegistry;
use crate::session_task::SessionSettings;

/// Shared gateway state accessible from all routes and connections.
pub struct GatewayState {
    pub config: Arc<Config>,
    pub sessions: SessionRegistry,
    pub started_at: DateTime<Utc>,
}

impl GatewayState {
    pub fn new(config: Arc<Config>) -> Self {
        let settings = SessionSettings::from_config(&config);
        Self::with_settings(config, settings)
    }

    /// Build state with explicit session settings (custom name source, tick rate).
    pub fn with_settings(config: Arc<Config>, settings: SessionSettings) -> Self {
        Self {
            config,
            sessions: SessionRegistry::new(settings),
            started_at: Utc::now(),
        }
    }

    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
