use serde::{Deserialize, Serialize};
use std::{fmt, path::Path};
use tracing_subscriber::EnvFilter;

pub const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";
pub const DEFAULT_PER_PAGE: u64 = 10;
pub const MAX_PER_PAGE: u64 = 100;
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
    /// An environment variable or field that holds an unusable value.
    Invalid { key: String, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "cannot read configuration: {err}"),
            Self::Yaml(err) => write!(f, "invalid configuration: {err}"),
            Self::Invalid { key, message } => write!(f, "invalid {key}: {message}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Yaml(err) => Some(err),
            Self::Invalid { .. } => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml(err)
    }
}

/// Runtime settings for the API.
///
/// Loaded from the environment (`DATABASE_URL`, `DEFAULT_PER_PAGE`,
/// `MAX_PER_PAGE`, `RUST_LOG`) or from YAML with the same fields in snake
/// case. Missing values fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub database_url: String,
    pub default_per_page: u64,
    pub max_per_page: u64,
    pub log_filter: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            default_per_page: DEFAULT_PER_PAGE,
            max_per_page: MAX_PER_PAGE,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl ApiConfig {
    /// # Errors
    ///
    /// Fails when a page size variable is not a positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup shaped like the environment.
    ///
    /// # Errors
    ///
    /// Fails when a page size value is not a positive integer.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let page_size = |key: &str, default: u64| -> Result<u64, ConfigError> {
            lookup(key).map_or(Ok(default), |raw| {
                raw.trim().parse().map_err(|_| ConfigError::Invalid {
                    key: key.to_string(),
                    message: format!("expected a positive integer, got '{raw}'"),
                })
            })
        };
        let config = Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            default_per_page: page_size("DEFAULT_PER_PAGE", defaults.default_per_page)?,
            max_per_page: page_size("MAX_PER_PAGE", defaults.max_per_page)?,
            log_filter: lookup("RUST_LOG").unwrap_or(defaults.log_filter),
        };
        config.validate()
    }

    /// # Errors
    ///
    /// Fails on malformed YAML or unusable page sizes.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()
    }

    /// # Errors
    ///
    /// Fails when the file cannot be read, is malformed or has unusable page
    /// sizes.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.default_per_page == 0 {
            return Err(ConfigError::Invalid {
                key: "default_per_page".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.max_per_page < self.default_per_page {
            return Err(ConfigError::Invalid {
                key: "max_per_page".to_string(),
                message: format!("must be at least default_per_page ({})", self.default_per_page),
            });
        }
        Ok(self)
    }

    /// The page size to use for a request, clamped to `1..=max_per_page`.
    #[must_use]
    pub fn per_page(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.default_per_page)
            .clamp(1, self.max_per_page.max(1))
    }

    /// Install a `tracing` subscriber filtered by `log_filter`.
    ///
    /// Returns `false` when a global subscriber is already set.
    pub fn init_tracing(&self) -> bool {
        let filter = EnvFilter::try_new(&self.log_filter)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .try_init()
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ApiConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ApiConfig::default());
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.default_per_page, 10);
        assert_eq!(config.max_per_page, 100);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_environment_overrides() {
        let config = ApiConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "sqlite://catalog.db?mode=rwc"),
            ("DEFAULT_PER_PAGE", "25"),
            ("MAX_PER_PAGE", "50"),
            ("RUST_LOG", "catalogcrate=debug"),
        ]))
        .unwrap();
        assert_eq!(config.database_url, "sqlite://catalog.db?mode=rwc");
        assert_eq!(config.default_per_page, 25);
        assert_eq!(config.max_per_page, 50);
        assert_eq!(config.log_filter, "catalogcrate=debug");
    }

    #[test]
    fn test_non_numeric_page_size_is_rejected() {
        let err = ApiConfig::from_lookup(lookup(&[("DEFAULT_PER_PAGE", "ten")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "DEFAULT_PER_PAGE"));
    }

    #[test]
    fn test_max_below_default_is_rejected() {
        let err = ApiConfig::from_lookup(lookup(&[("MAX_PER_PAGE", "5")])).unwrap_err();
        assert!(err.to_string().contains("max_per_page"));
    }

    #[test]
    fn test_yaml_fills_missing_fields() {
        let config = ApiConfig::from_yaml_str("default_per_page: 20\n").unwrap();
        assert_eq!(config.default_per_page, 20);
        assert_eq!(config.max_per_page, 100);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
    }

    #[test]
    fn test_yaml_rejects_malformed_input() {
        let err = ApiConfig::from_yaml_str("default_per_page: [").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_per_page_is_clamped() {
        let config = ApiConfig::default();
        assert_eq!(config.per_page(None), 10);
        assert_eq!(config.per_page(Some(0)), 1);
        assert_eq!(config.per_page(Some(30)), 30);
        assert_eq!(config.per_page(Some(1000)), 100);
    }
}
