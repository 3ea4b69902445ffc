//! Module: config
//! Responsibility: file-backed settings for the catalog and page streams.
//! Does not own: command-line overrides (the CLI applies those on top).

use crate::DEFAULT_PAGE_SIZE;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error as ThisError;
use tracing::debug;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {message}")]
    Read { path: String, message: String },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

///
/// PagecastConfig
///
/// Every section and key is optional; missing ones take their defaults.
/// Unknown keys are rejected.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PagecastConfig {
    pub catalog: CatalogConfig,
    pub paging: PagingConfig,
    pub stream: StreamConfig,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    pub data_dir: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PagingConfig {
    pub page_size: usize,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StreamConfig {
    pub interval_ms: u64,

    /// Minimum spacing between effective ticks; absent means no coalescing.
    pub coalesce_ms: Option<u64>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            coalesce_ms: None,
        }
    }
}

impl StreamConfig {
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    #[must_use]
    pub fn coalesce(&self) -> Option<Duration> {
        self.coalesce_ms.map(Duration::from_millis)
    }
}

impl PagecastConfig {
    /// Read and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;

        debug!(path = %path.display(), "loading config");

        Self::from_toml_str(&text)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.paging.page_size == 0 {
            return Err(ConfigError::Invalid {
                field: "paging.page_size",
                reason: "must be at least 1".to_string(),
            });
        }

        if self.stream.interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "stream.interval_ms",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_yields_defaults() {
        let config = PagecastConfig::from_toml_str("").expect("empty config is valid");

        assert_eq!(config, PagecastConfig::default());
        assert_eq!(config.paging.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.catalog.data_dir, PathBuf::from("data"));
        assert_eq!(config.stream.coalesce(), None);
    }

    #[test]
    fn sections_override_defaults_independently() {
        let config = PagecastConfig::from_toml_str(
            r#"
            [catalog]
            data_dir = "/srv/music"

            [stream]
            interval_ms = 250
            coalesce_ms = 1000
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.catalog.data_dir, PathBuf::from("/srv/music"));
        assert_eq!(config.paging.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.stream.interval(), Duration::from_millis(250));
        assert_eq!(config.stream.coalesce(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let err = PagecastConfig::from_toml_str("[paging]\npage_size = 0\n")
            .expect_err("zero page size must fail");

        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "paging.page_size",
                ..
            }
        ));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = PagecastConfig::from_toml_str("[stream]\ninterval_ms = 0\n")
            .expect_err("zero interval must fail");

        assert_eq!(
            err.to_string(),
            "invalid config value for 'stream.interval_ms': must be at least 1"
        );
    }

    #[test]
    fn unknown_keys_are_parse_errors() {
        let err = PagecastConfig::from_toml_str("[paging]\npagesize = 5\n")
            .expect_err("typo must fail");

        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = PagecastConfig::load("/definitely/not/here/pagecast.toml")
            .expect_err("missing file must fail");

        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
