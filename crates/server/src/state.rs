use std::sync::Arc;

use mediaq_core::{Config, JobService, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    service: Arc<JobService>,
}

impl AppState {
    pub fn new(config: Config, service: Arc<JobService>) -> Self {
        Self { config, service }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn service(&self) -> &JobService {
        self.service.as_ref()
    }
}
