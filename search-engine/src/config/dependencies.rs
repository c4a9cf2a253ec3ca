//! Dependency initialization and wiring for the search engine.

use std::sync::Arc;

use search_engine_repository::{OpenSearchBackend, SearchEngineClient};
use serde_json::Value;
use tracing::info;

use crate::config::Settings;
use crate::AppError;

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// Client over the configured index, not yet initialized.
    pub client: Arc<SearchEngineClient<Value>>,
}

impl Dependencies {
    /// Build the OpenSearch backend and the client from `settings`.
    ///
    /// No request is sent here; the backend is probed when the client is
    /// initialized.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(AppError)` - If the URL is invalid or a configuration file cannot be read
    pub fn new(settings: &Settings) -> Result<Self, AppError> {
        info!(
            opensearch_url = %settings.opensearch_url,
            index = %settings.index_name,
            schema = %settings.schema_name,
            "Initializing dependencies"
        );

        let configuration = settings.index_configuration()?;
        let backend = OpenSearchBackend::new(&settings.opensearch_url, settings.request_timeout)
            .map_err(|e| AppError::config(format!("Failed to create OpenSearch backend: {}", e)))?;

        let client = SearchEngineClient::builder(Arc::new(backend), settings.identity())
            .with_configuration(configuration)
            .with_config(settings.engine_config())
            .build();

        Ok(Self {
            client: Arc::new(client),
        })
    }
}
