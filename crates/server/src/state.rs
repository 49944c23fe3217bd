use std::sync::Arc;
use tubecast_core::{Config, PipelineDispatcher, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    dispatcher: Arc<PipelineDispatcher>,
}

impl AppState {
    pub fn new(config: Config, dispatcher: Arc<PipelineDispatcher>) -> Self {
        Self { config, dispatcher }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn dispatcher(&self) -> &PipelineDispatcher {
        self.dispatcher.as_ref()
    }
}
