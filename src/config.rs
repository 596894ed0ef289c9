use std::path::PathBuf;

use crate::error::{ConfigError, ConfigResult};

/// Overrides the directory schemas are materialized under.
pub const TEMP_DIR_ENV: &str = "SAML_XSD_TEMP_DIR";

/// Overrides the name prefix of the materialized directory.
pub const TEMP_PREFIX_ENV: &str = "SAML_XSD_TEMP_PREFIX";

pub const DEFAULT_TEMP_PREFIX: &str = "samlxml";

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Where a schema session writes its scratch copy of the bundled files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Parent of the materialized directory; the OS temp dir when `None`.
    pub temp_root: Option<PathBuf>,
    pub temp_prefix: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            temp_root: None,
            temp_prefix: DEFAULT_TEMP_PREFIX.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }

    pub fn with_temp_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.temp_prefix = prefix.into();
        self
    }

    /// Defaults overridden by the system environment, then validated.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_env_with(&SystemEnvProvider)
    }

    /// Defaults overridden by a custom environment provider, then validated.
    pub fn from_env_with(env: &impl EnvProvider) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(root) = env.get(TEMP_DIR_ENV).filter(|v| !v.trim().is_empty()) {
            config.temp_root = Some(PathBuf::from(root));
        }

        if let Some(prefix) = env.get(TEMP_PREFIX_ENV) {
            config.temp_prefix = prefix;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.temp_prefix.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "temp_prefix".to_string(),
                value: self.temp_prefix.clone(),
                reason: "must not be empty".to_string(),
            });
        }

        if self.temp_prefix.contains('/') || self.temp_prefix.contains('\\') {
            return Err(ConfigError::InvalidValue {
                field: "temp_prefix".to_string(),
                value: self.temp_prefix.clone(),
                reason: "must not contain path separators".to_string(),
            });
        }

        if let Some(root) = &self.temp_root {
            if !root.is_dir() {
                return Err(ConfigError::MissingDirectory { path: root.clone() });
            }
        }

        Ok(())
    }
}
