//! # Search Engine
//!
//! Entry point and configuration for bringing a search index up.
//!
//! This crate reads its settings from the environment, wires an OpenSearch
//! backend into a [`SearchEngineClient`](search_engine_repository::SearchEngineClient)
//! and sets up logging.

pub mod config;
pub mod logging;

pub use config::{Dependencies, Settings};

use thiserror::Error;

/// Errors that can occur while starting the search engine.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Search error.
    #[error("Search error: {0}")]
    SearchError(#[from] search_engine_repository::SearchError),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid JSON in an index configuration file.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
