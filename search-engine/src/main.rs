//! Brings the configured search index up and exits.
//!
//! Waits for OpenSearch to answer, creates the index if needed and applies
//! the settings and mapping files. Ctrl-C cancels the wait.

use search_engine::{logging, AppError, Dependencies, Settings};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenv::dotenv().ok();
    logging::init()?;

    let settings = Settings::from_env()?;
    let dependencies = Dependencies::new(&settings)?;
    let client = dependencies.client;

    let signal_client = client.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            signal_client.shutdown();
        }
    });

    if let Err(e) = client.initialize().await {
        error!(error = %e, "Failed to initialize search index");
        return Err(e.into());
    }

    info!(
        index = %settings.index_name,
        schema = %settings.schema_name,
        "Search index ready"
    );
    Ok(())
}
