use std::sync::Arc;

use services::ForumServices;

use crate::metrics::Metrics;

/// Shared by every handler; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub services: ForumServices,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(services: ForumServices) -> Self {
        Self { services, metrics: Arc::new(Metrics::new()) }
    }
}
