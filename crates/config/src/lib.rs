//! Configuration bootstrap for properties-file based applications
//!
//! This crate provides:
//! - Properties file reading and writing
//! - Default values through a fallback strategy
//! - Retrieval of the configuration file named in the start-up arguments
//! - Sanitized, atomic persistence of the merged configuration
//! - Reload notification when the file changes on disk

mod fallback;
mod loader;
mod map;
pub mod properties;
mod retriever;
mod settings;
mod watcher;

pub use fallback::*;
pub use loader::*;
pub use map::*;
pub use retriever::*;
pub use settings::*;
pub use watcher::*;

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration not found: {0}")]
    NotFound(String),

    #[error("Failed to read configuration file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed configuration file {} at line {line}: {reason}", path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Failed to persist configuration to {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Watch error: {0}")]
    WatchError(String),
}

impl ConfigError {
    /// Whether the error comes from reading or parsing a configuration file.
    pub fn is_read_error(&self) -> bool {
        matches!(self, Self::Read { .. } | Self::Malformed { .. })
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
