//! Settings read from the environment.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use search_engine_repository::{IndexConfiguration, IndexIdentity, RetryPolicy, SearchEngineConfig};
use serde_json::Value;
use tracing::debug;

use crate::AppError;

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default index name.
const DEFAULT_INDEX_NAME: &str = "documents";

/// Default schema (document type) name.
const DEFAULT_SCHEMA_NAME: &str = "document";

/// Everything the bootstrap needs to build a client.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub opensearch_url: String,
    pub index_name: String,
    pub schema_name: String,
    pub probe_timeout: Duration,
    pub retry_interval: Duration,
    /// `None` keeps probing until the backend answers.
    pub max_connect_attempts: Option<u32>,
    pub request_timeout: Duration,
    /// `None` disables the bulk size limit.
    pub max_batch_size: Option<usize>,
    pub settings_file: Option<PathBuf>,
    pub mapping_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        let engine = SearchEngineConfig::default();
        Self {
            opensearch_url: DEFAULT_OPENSEARCH_URL.to_string(),
            index_name: DEFAULT_INDEX_NAME.to_string(),
            schema_name: DEFAULT_SCHEMA_NAME.to_string(),
            probe_timeout: engine.retry.probe_timeout,
            retry_interval: engine.retry.retry_interval,
            max_connect_attempts: engine.retry.max_attempts,
            request_timeout: engine.request_timeout,
            max_batch_size: engine.max_batch_size,
            settings_file: None,
            mapping_file: None,
        }
    }
}

impl Settings {
    /// Read settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `SEARCH_INDEX_NAME`: Index name (default: documents)
    /// - `SEARCH_SCHEMA_NAME`: Schema name (default: document)
    /// - `SEARCH_PROBE_TIMEOUT_MS`: Health probe timeout (default: 250)
    /// - `SEARCH_RETRY_INTERVAL_MS`: Wait between failed probes (default: 2000)
    /// - `SEARCH_MAX_CONNECT_ATTEMPTS`: Give up after this many probes (default: unbounded)
    /// - `SEARCH_REQUEST_TIMEOUT_MS`: Timeout of every other request (default: 30000)
    /// - `SEARCH_MAX_BATCH_SIZE`: Bulk size limit, 0 disables it (default: 1000)
    /// - `SEARCH_INDEX_SETTINGS_FILE`: JSON file with index settings
    /// - `SEARCH_INDEX_MAPPING_FILE`: JSON file with the index mapping
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - Parsed settings
    /// * `Err(AppError)` - If a numeric variable does not parse
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through `lookup`, treating blank values as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let max_batch_size = match parse::<usize>(&get, "SEARCH_MAX_BATCH_SIZE")? {
            Some(0) => None,
            Some(max) => Some(max),
            None => defaults.max_batch_size,
        };

        Ok(Self {
            opensearch_url: get("OPENSEARCH_URL").unwrap_or(defaults.opensearch_url),
            index_name: get("SEARCH_INDEX_NAME").unwrap_or(defaults.index_name),
            schema_name: get("SEARCH_SCHEMA_NAME").unwrap_or(defaults.schema_name),
            probe_timeout: millis(&get, "SEARCH_PROBE_TIMEOUT_MS")?
                .unwrap_or(defaults.probe_timeout),
            retry_interval: millis(&get, "SEARCH_RETRY_INTERVAL_MS")?
                .unwrap_or(defaults.retry_interval),
            max_connect_attempts: parse::<u32>(&get, "SEARCH_MAX_CONNECT_ATTEMPTS")?
                .or(defaults.max_connect_attempts),
            request_timeout: millis(&get, "SEARCH_REQUEST_TIMEOUT_MS")?
                .unwrap_or(defaults.request_timeout),
            max_batch_size,
            settings_file: get("SEARCH_INDEX_SETTINGS_FILE").map(PathBuf::from),
            mapping_file: get("SEARCH_INDEX_MAPPING_FILE").map(PathBuf::from),
        })
    }

    pub fn identity(&self) -> IndexIdentity {
        IndexIdentity::new(&self.index_name, &self.schema_name)
    }

    /// Client configuration derived from these settings.
    pub fn engine_config(&self) -> SearchEngineConfig {
        let mut retry = RetryPolicy::unbounded(self.probe_timeout, self.retry_interval);
        if let Some(max) = self.max_connect_attempts {
            retry = retry.with_max_attempts(max);
        }

        SearchEngineConfig {
            request_timeout: self.request_timeout,
            max_batch_size: self.max_batch_size,
            retry,
        }
    }

    /// Load index settings and mapping from the configured files.
    pub fn index_configuration(&self) -> Result<IndexConfiguration, AppError> {
        let settings = self.settings_file.as_deref().map(read_json).transpose()?;
        let mapping = self.mapping_file.as_deref().map(read_json).transpose()?;
        Ok(IndexConfiguration::new(settings, mapping))
    }
}

fn read_json(path: &Path) -> Result<Value, AppError> {
    debug!(path = %path.display(), "Reading index configuration file");
    let content = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)?;
    if !value.is_object() {
        return Err(AppError::config(format!(
            "{} must contain a JSON object",
            path.display()
        )));
    }
    Ok(value)
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| AppError::config(format!("{} is invalid ({}): {}", key, raw, e)))
        })
        .transpose()
}

fn millis(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<Duration>, AppError> {
    Ok(parse::<u64>(get, key)?.map(Duration::from_millis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();

        assert_eq!(settings, Settings::default());
        assert_eq!(settings.opensearch_url, "http://localhost:9200");
        assert_eq!(settings.probe_timeout, Duration::from_millis(250));
        assert_eq!(settings.retry_interval, Duration::from_millis(2000));
        assert_eq!(settings.max_connect_attempts, None);
        assert_eq!(settings.max_batch_size, Some(1000));
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            ("OPENSEARCH_URL", "http://search:9200"),
            ("SEARCH_INDEX_NAME", "articles"),
            ("SEARCH_SCHEMA_NAME", "article"),
            ("SEARCH_PROBE_TIMEOUT_MS", "500"),
            ("SEARCH_RETRY_INTERVAL_MS", "100"),
            ("SEARCH_MAX_CONNECT_ATTEMPTS", "5"),
            ("SEARCH_REQUEST_TIMEOUT_MS", "1500"),
            ("SEARCH_MAX_BATCH_SIZE", "50"),
        ]))
        .unwrap();

        assert_eq!(settings.index_name, "articles");
        assert_eq!(settings.identity(), IndexIdentity::new("articles", "article"));

        let config = settings.engine_config();
        assert_eq!(config.request_timeout, Duration::from_millis(1500));
        assert_eq!(config.max_batch_size, Some(50));
        assert_eq!(config.retry.probe_timeout, Duration::from_millis(500));
        assert_eq!(config.retry.retry_interval, Duration::from_millis(100));
        assert_eq!(config.retry.max_attempts, Some(5));
    }

    #[test]
    fn test_zero_batch_size_disables_limit() {
        let settings = Settings::from_lookup(lookup(&[("SEARCH_MAX_BATCH_SIZE", "0")])).unwrap();
        assert_eq!(settings.max_batch_size, None);
    }

    #[test]
    fn test_blank_value_uses_default() {
        let settings = Settings::from_lookup(lookup(&[("SEARCH_INDEX_NAME", "  ")])).unwrap();
        assert_eq!(settings.index_name, "documents");
    }

    #[test]
    fn test_invalid_number() {
        let error = Settings::from_lookup(lookup(&[("SEARCH_RETRY_INTERVAL_MS", "soon")]))
            .unwrap_err();

        assert!(matches!(error, AppError::ConfigError(_)));
        assert!(error.to_string().contains("SEARCH_RETRY_INTERVAL_MS"));
    }

    #[test]
    fn test_index_configuration_from_files() {
        let dir = env::temp_dir().join(format!("search-engine-settings-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let mapping_path = dir.join("mapping.json");
        fs::write(&mapping_path, r#"{ "properties": { "title": { "type": "text" } } }"#).unwrap();

        let settings = Settings {
            mapping_file: Some(mapping_path),
            ..Settings::default()
        };
        let configuration = settings.index_configuration().unwrap();

        assert!(configuration.effective_settings().is_none());
        assert_eq!(
            configuration.effective_mapping().unwrap()["properties"]["title"]["type"],
            "text"
        );

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_no_files_means_empty_configuration() {
        let configuration = Settings::default().index_configuration().unwrap();
        assert!(configuration.is_empty());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let settings = Settings {
            settings_file: Some(PathBuf::from("/nonexistent/settings.json")),
            ..Settings::default()
        };

        let error = settings.index_configuration().unwrap_err();
        assert!(matches!(error, AppError::IoError(_)));
    }
}
