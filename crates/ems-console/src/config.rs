//! Console configuration
//!
//! Loaded from TOML with environment overrides:
//! - `EMS_BASE_URL` replaces `[resolver] base_url`
//! - `EMS_TIMEOUT_SECS` replaces `[resolver] timeout_secs`

use ems_dispatch::DispatchConfig;
use ems_reference::{ReferenceCache, ReferenceCacheBuilder, ReferenceConfig};
use ems_resolver::RemoteResolver;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Base URL override
pub const ENV_BASE_URL: &str = "EMS_BASE_URL";
/// Timeout override, in seconds
pub const ENV_TIMEOUT_SECS: &str = "EMS_TIMEOUT_SECS";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Config path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// File is not valid TOML for this schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Value out of range
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Remote API settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// API root, resources live under `{base_url}/{resource}`
    pub base_url: String,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Full console configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Remote API
    pub resolver: ResolverSettings,
    /// Reference field behavior
    pub reference: ReferenceConfig,
    /// Bulk actions
    pub dispatch: DispatchConfig,
}

impl ConsoleConfig {
    /// Create default config
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set base URL
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.resolver.base_url = url.into();
        self
    }

    /// Set request timeout
    #[inline]
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.resolver.timeout_secs = secs;
        self
    }

    /// Set reference field config
    #[inline]
    #[must_use]
    pub fn with_reference(mut self, reference: ReferenceConfig) -> Self {
        self.reference = reference;
        self
    }

    /// Set dispatcher config
    #[inline]
    #[must_use]
    pub fn with_dispatch(mut self, dispatch: DispatchConfig) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Parse TOML text, missing keys take defaults
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] on malformed input.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read a TOML file
    ///
    /// # Errors
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// File (or defaults), then process environment, then validation
    ///
    /// # Errors
    /// Returns any read, parse, override or validation failure.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = config.with_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        tracing::debug!("Loaded config: {:?}", config);
        Ok(config)
    }

    /// Apply overrides from `lookup`
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] if the timeout override is not a number.
    pub fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.resolver.base_url = url;
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            self.resolver.timeout_secs = secs.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{ENV_TIMEOUT_SECS} must be a whole number, got '{secs}'"))
            })?;
        }
        Ok(self)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = &self.resolver.base_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "resolver.base_url must be an http(s) URL, got '{url}'"
            )));
        }
        if self.resolver.timeout_secs == 0 {
            return Err(ConfigError::Invalid("resolver.timeout_secs must be positive".into()));
        }
        if self.reference.max_options == Some(0) {
            return Err(ConfigError::Invalid("reference.max_options must be positive".into()));
        }
        if self.dispatch.identifier_field.trim().is_empty() {
            return Err(ConfigError::Invalid("dispatch.identifier_field is empty".into()));
        }
        Ok(())
    }

    /// Request timeout
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.resolver.timeout_secs)
    }

    /// Reference field over `resolver` using the `[reference]` section
    #[must_use]
    pub fn reference_field(&self, resolver: Arc<dyn RemoteResolver>) -> ReferenceCacheBuilder {
        ReferenceCache::builder(resolver).config(self.reference.clone())
    }
}
