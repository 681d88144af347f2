//! Configuration file reading and writing

use crate::properties::{self, PropertiesError};
use crate::{ConfigError, ConfigMap, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Header comment written at the top of every stored file
pub const STORE_HEADER: &str = "Properties";

/// Properties file loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a properties file.
    ///
    /// Fails with [`ConfigError::Read`] when the file cannot be opened or read
    /// and with [`ConfigError::Malformed`] when an entry cannot be decoded.
    pub fn load(path: &Path) -> Result<ConfigMap> {
        let file = File::open(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let map = properties::read(BufReader::new(file)).map_err(|e| match e {
            PropertiesError::Io(source) => ConfigError::Read {
                path: path.to_path_buf(),
                source,
            },
            PropertiesError::Malformed { line, reason } => ConfigError::Malformed {
                path: path.to_path_buf(),
                line,
                reason,
            },
        })?;

        debug!(path = %path.display(), entries = map.len(), "Loaded configuration file");
        Ok(map)
    }

    /// Write `map` to `path`, replacing any previous content.
    ///
    /// The map is written to a temporary file next to `path` and renamed over
    /// it, so readers see either the old or the new file. The parent
    /// directory must already exist.
    pub fn store(path: &Path, map: &ConfigMap) -> Result<()> {
        let persistence = |source: std::io::Error| ConfigError::Persistence {
            path: path.to_path_buf(),
            source,
        };

        let dir = parent_dir(path);
        let tmp = NamedTempFile::new_in(dir).map_err(persistence)?;
        properties::write(BufWriter::new(tmp.as_file()), map, STORE_HEADER)
            .map_err(persistence)?;
        tmp.as_file().sync_all().map_err(persistence)?;
        tmp.persist(path).map_err(|e| persistence(e.error))?;

        debug!(path = %path.display(), entries = map.len(), "Stored configuration file");
        Ok(())
    }
}

/// Directory holding `path`, the current directory for a bare file name.
pub(crate) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
