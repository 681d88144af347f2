//! Behavior when no configuration file can be used

use crate::{ConfigError, ConfigMap, Result};
use tracing::info;

static NO_DEFAULTS: ConfigMap = ConfigMap::new();

/// What to do when the configuration file is missing or unreadable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackStrategy {
    /// Missing configuration is an error.
    Fail,

    /// Missing configuration is replaced by these values.
    Defaults(ConfigMap),
}

impl FallbackStrategy {
    /// Strategy that turns a missing configuration into an error.
    pub fn fail() -> Self {
        Self::Fail
    }

    /// Strategy that falls back to `defaults`.
    pub fn from_defaults(defaults: ConfigMap) -> Self {
        Self::Defaults(defaults)
    }

    /// Like [`FallbackStrategy::from_defaults`], running `behavior` once before returning.
    ///
    /// Used for side effects that must happen before any retrieval, such as
    /// preparing files the defaults point to.
    pub fn from_defaults_with<F>(defaults: ConfigMap, behavior: F) -> Self
    where
        F: FnOnce(),
    {
        behavior();
        Self::Defaults(defaults)
    }

    /// Configuration to use in place of the file.
    pub fn resolve(&self) -> Result<&ConfigMap> {
        match self {
            Self::Fail => Err(ConfigError::NotFound(
                "no configuration file and no default values".to_string(),
            )),
            Self::Defaults(defaults) => {
                info!("Loading properties failed, fallback to default values");
                Ok(defaults)
            }
        }
    }

    /// Values to seed every merge with, empty for [`FallbackStrategy::Fail`].
    pub fn defaults(&self) -> &ConfigMap {
        match self {
            Self::Fail => &NO_DEFAULTS,
            Self::Defaults(defaults) => defaults,
        }
    }
}
