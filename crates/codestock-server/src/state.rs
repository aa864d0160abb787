use codestock_storage::snippets::SnippetGateway;

use crate::error::{ApiError, MSG_CONFIG};

/// Shared application state, injected into all route handlers via Axum state.
///
/// The gateway is absent when the store credentials were missing at startup;
/// snippet routes then answer with a configuration error.
#[derive(Clone)]
pub struct AppState {
    gateway: Option<SnippetGateway>,
}

impl AppState {
    pub fn new(gateway: Option<SnippetGateway>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> Result<&SnippetGateway, ApiError> {
        self.gateway
            .as_ref()
            .ok_or_else(|| ApiError::Config(MSG_CONFIG.to_string()))
    }

    pub fn store_configured(&self) -> bool {
        self.gateway.is_some()
    }
}
