//! Index creation, configuration and reset.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, instrument};

use crate::errors::{ConfigurationStep, SearchError};
use crate::lifecycle::bounded;
use crate::interfaces::SearchBackend;
use crate::types::{IndexConfiguration, IndexIdentity};

/// Makes sure the client's index exists and carries its configuration.
///
/// Settings changes are rejected by most backends while an index is open, so
/// configuration always runs as close → settings → mapping → open → refresh.
/// A failing step aborts the sequence and is not retried; the index may be
/// left closed.
pub struct IndexLifecycleManager {
    backend: Arc<dyn SearchBackend>,
    identity: IndexIdentity,
    configuration: IndexConfiguration,
    request_timeout: Duration,
}

impl IndexLifecycleManager {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        identity: IndexIdentity,
        configuration: IndexConfiguration,
        request_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            identity,
            configuration,
            request_timeout,
        }
    }

    pub fn identity(&self) -> &IndexIdentity {
        &self.identity
    }

    /// Create the index with default settings unless it already exists.
    #[instrument(skip(self), fields(index = %self.identity.index_name))]
    pub async fn ensure_index(&self) -> Result<(), SearchError> {
        let name = &self.identity.index_name;

        let exists = bounded(self.request_timeout, self.backend.index_exists(name))
            .await
            .map_err(lifecycle_error)?;
        if exists {
            debug!("Index already exists");
            return Ok(());
        }

        bounded(self.request_timeout, self.backend.create_index(name))
            .await
            .map_err(lifecycle_error)?;
        info!("Created index");
        Ok(())
    }

    /// Apply the configured settings and mapping, if there are any.
    #[instrument(skip(self), fields(index = %self.identity.index_name))]
    pub async fn apply_configuration(&self) -> Result<(), SearchError> {
        if self.configuration.is_empty() {
            debug!("No index configuration to apply");
            return Ok(());
        }

        let name = &self.identity.index_name;
        let schema = &self.identity.schema_name;

        self.step(ConfigurationStep::Close, self.backend.close_index(name))
            .await?;

        if let Some(settings) = self.configuration.effective_settings() {
            self.step(
                ConfigurationStep::PutSettings,
                self.backend.put_index_settings(name, settings),
            )
            .await?;
        }

        if let Some(mapping) = self.configuration.effective_mapping() {
            self.step(
                ConfigurationStep::PutMapping,
                self.backend.put_index_mapping(name, schema, mapping),
            )
            .await?;
        }

        self.step(ConfigurationStep::Open, self.backend.open_index(name))
            .await?;
        self.step(ConfigurationStep::Refresh, self.backend.refresh_index(name))
            .await?;

        info!(schema = %schema, "Applied index configuration");
        Ok(())
    }

    /// Delete the index and set it up again. Every stored document is lost.
    #[instrument(skip(self), fields(index = %self.identity.index_name))]
    pub async fn drop_and_recreate(&self) -> Result<(), SearchError> {
        bounded(self.request_timeout, self.backend.delete_index(&self.identity.index_name))
            .await
            .map_err(lifecycle_error)?;
        info!("Deleted index");

        self.ensure_index().await?;
        self.apply_configuration().await
    }

    async fn step<F>(&self, step: ConfigurationStep, call: F) -> Result<(), SearchError>
    where
        F: Future<Output = Result<(), SearchError>>,
    {
        debug!(step = %step, "Applying configuration step");
        bounded(self.request_timeout, call).await.map_err(|e| {
            error!(step = %step, error = %e, "Index configuration failed");
            SearchError::configuration(step, e.to_string())
        })
    }
}

/// Keep connectivity failures recognizable; wrap everything else.
fn lifecycle_error(error: SearchError) -> SearchError {
    if error.is_connectivity() {
        error
    } else {
        SearchError::lifecycle(error.to_string())
    }
}
