//! Configuration retrieval from start-up arguments

use crate::{ConfigLoader, ConfigMap, FallbackStrategy, FileWatcher, Result};
use bootconf_args::{ArgumentTable, CONFIGURATION_FILE};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};
use tracing::{error, info, warn};

/// Location used when no `configuration` argument is given
pub const DEFAULT_CONFIGURATION_PATH: &str = "config/configuration.properties";

/// Finds, merges and persists the application configuration
///
/// Retrieval goes through these steps:
/// 1. Take the file path from the `configuration` argument, or use the
///    default path
/// 2. Load the file, or ask the fallback strategy when there is none
/// 3. Merge the strategy defaults under the loaded values
/// 4. Sanitize the values and store them back to the file
///
/// The path used by the last retrieval is kept so [`ConfigurationRetriever::on_reload`]
/// can watch it.
pub struct ConfigurationRetriever {
    strategy: FallbackStrategy,
    default_path: PathBuf,
    resolved_path: RwLock<Option<PathBuf>>,
    store_lock: Mutex<()>,
}

impl ConfigurationRetriever {
    /// Retriever using `strategy` and [`DEFAULT_CONFIGURATION_PATH`].
    pub fn new(strategy: FallbackStrategy) -> Self {
        Self {
            strategy,
            default_path: PathBuf::from(DEFAULT_CONFIGURATION_PATH),
            resolved_path: RwLock::new(None),
            store_lock: Mutex::new(()),
        }
    }

    /// Use `path` instead of [`DEFAULT_CONFIGURATION_PATH`].
    pub fn with_default_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.default_path = path.into();
        self
    }

    /// Strategy used when the file is missing or unreadable.
    pub fn strategy(&self) -> &FallbackStrategy {
        &self.strategy
    }

    /// Path settled on by the most recent retrieval.
    pub fn resolved_path(&self) -> Option<PathBuf> {
        self.resolved_path
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Retrieve the configuration named by the start-up arguments.
    ///
    /// Only fails when the fallback strategy refuses to provide values.
    /// A configuration that could not be stored is still returned.
    pub fn retrieve_from_args(&self, args: &ArgumentTable) -> Result<ConfigMap> {
        info!("Loading configuration file...");

        let path = match args.get_arg(CONFIGURATION_FILE) {
            Some(path) => PathBuf::from(path),
            None => {
                let path = self.default_path.clone();
                self.set_resolved_path(&path);
                if !path.exists() {
                    warn!(
                        path = %path.display(),
                        "Configuration file not found and no '{}' argument provided",
                        CONFIGURATION_FILE
                    );
                    let defaults = self.strategy.resolve()?;
                    return Ok(self.store(&path, defaults));
                }
                path
            }
        };

        self.set_resolved_path(&path);
        match ConfigLoader::load(&path) {
            Ok(loaded) => {
                info!(path = %path.display(), "Loading configuration file success");
                let merged = ConfigMap::layered([self.strategy.defaults(), &loaded]);
                Ok(self.store(&path, &merged))
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Configuration file could not be read");
                // The unreadable file is left untouched
                Ok(self.strategy.resolve()?.sanitized())
            }
        }
    }

    /// Watcher bound to the resolved path, `None` before any retrieval.
    pub fn watcher<F: FnMut()>(&self, on_reload: F) -> Option<FileWatcher<F>> {
        self.resolved_path()
            .map(|path| FileWatcher::new(path, on_reload))
    }

    /// Block and call `on_reload` whenever the resolved file changes.
    ///
    /// Does nothing when no retrieval happened yet.
    pub fn on_reload<F: FnMut()>(&self, on_reload: F) {
        if let Some(mut watcher) = self.watcher(on_reload) {
            watcher.inspect();
        }
    }

    fn set_resolved_path(&self, path: &Path) {
        *self
            .resolved_path
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(path.to_path_buf());
    }

    /// Sanitize `map` and write it to `path`, logging any failure.
    fn store(&self, path: &Path, map: &ConfigMap) -> ConfigMap {
        let sanitized = map.sanitized();
        let _guard = self.store_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Err(e) = ensure_parent_dir(path).and_then(|()| ConfigLoader::store(path, &sanitized)) {
            error!(path = %path.display(), error = %e, "Error writing configuration file");
        }
        sanitized
    }
}

/// Create the directory holding `path` if missing, its own parent must exist.
fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => {
            std::fs::create_dir(dir).map_err(|source| crate::ConfigError::Persistence {
                path: path.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigError;

    fn args_for(path: &Path) -> ArgumentTable {
        ArgumentTable::from_args([format!("{}={}", CONFIGURATION_FILE, path.display())])
    }

    #[test]
    fn test_retrieve_from_args() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.properties");
        std::fs::write(&path, "value=test\n").unwrap();

        let retriever = ConfigurationRetriever::new(FallbackStrategy::fail());
        let result = retriever.retrieve_from_args(&args_for(&path)).unwrap();

        assert_eq!(result.get("value"), Some("test"));
        assert_eq!(retriever.resolved_path(), Some(path));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.properties");
        std::fs::write(&path, "default=false\n").unwrap();

        let strategy = FallbackStrategy::from_defaults(ConfigMap::from([
            ("default", "true"),
            ("defaultOnly", "true"),
        ]));
        let retriever = ConfigurationRetriever::new(strategy);
        let result = retriever.retrieve_from_args(&args_for(&path)).unwrap();

        assert_eq!(
            result,
            ConfigMap::from([("default", "false"), ("defaultOnly", "true")])
        );
        // Merged values are written back
        assert_eq!(ConfigLoader::load(&path).unwrap(), result);
    }

    #[test]
    fn test_unreadable_file_with_fail_strategy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invalid").join("config.properties");

        let retriever = ConfigurationRetriever::new(FallbackStrategy::fail());
        let err = retriever.retrieve_from_args(&args_for(&path)).unwrap_err();

        assert!(matches!(err, ConfigError::NotFound(_)));
        assert!(!path.exists());
    }

    #[test]
    fn test_unreadable_file_with_defaults_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.properties");
        std::fs::write(&path, "broken=\\u12\n").unwrap();

        let strategy = FallbackStrategy::from_defaults(ConfigMap::from([("dir", "C:\\data")]));
        let retriever = ConfigurationRetriever::new(strategy);
        let result = retriever.retrieve_from_args(&args_for(&path)).unwrap();

        assert_eq!(result.get("dir"), Some("C:/data"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "broken=\\u12\n");
    }

    #[test]
    fn test_missing_default_file_stores_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("configuration.properties");

        let strategy = FallbackStrategy::from_defaults(ConfigMap::from([("language", "en")]));
        let retriever = ConfigurationRetriever::new(strategy).with_default_path(&path);
        let result = retriever.retrieve_from_args(&ArgumentTable::default()).unwrap();

        assert_eq!(result.get("language"), Some("en"));
        assert_eq!(retriever.resolved_path(), Some(path.clone()));
        assert_eq!(ConfigLoader::load(&path).unwrap(), result);
    }

    #[test]
    fn test_missing_default_file_with_fail_strategy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("configuration.properties");

        let retriever = ConfigurationRetriever::new(FallbackStrategy::fail()).with_default_path(&path);
        let err = retriever.retrieve_from_args(&ArgumentTable::default()).unwrap_err();

        assert!(matches!(err, ConfigError::NotFound(_)));
        // The path is recorded before the strategy is asked
        assert_eq!(retriever.resolved_path(), Some(path));
    }

    #[test]
    fn test_existing_default_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("configuration.properties");
        std::fs::write(&path, "value=from-default-path\n").unwrap();

        let retriever = ConfigurationRetriever::new(FallbackStrategy::fail()).with_default_path(&path);
        let result = retriever.retrieve_from_args(&ArgumentTable::default()).unwrap();

        assert_eq!(result.get("value"), Some("from-default-path"));
    }

    #[test]
    fn test_values_are_sanitized_before_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.properties");
        std::fs::write(&path, "dir=C:\\\\test\n").unwrap();

        let retriever = ConfigurationRetriever::new(FallbackStrategy::fail());
        let result = retriever.retrieve_from_args(&args_for(&path)).unwrap();

        assert_eq!(result.get("dir"), Some("C:/test"));
        assert_eq!(ConfigLoader::load(&path).unwrap().get("dir"), Some("C:/test"));
    }

    #[test]
    fn test_store_failure_still_returns_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir
            .path()
            .join("missing")
            .join("config")
            .join("configuration.properties");

        let strategy = FallbackStrategy::from_defaults(ConfigMap::from([("a", "1")]));
        let retriever = ConfigurationRetriever::new(strategy).with_default_path(&path);
        let result = retriever.retrieve_from_args(&ArgumentTable::default()).unwrap();

        assert_eq!(result.get("a"), Some("1"));
        assert!(!path.exists());
    }

    #[test]
    fn test_no_watcher_before_retrieval() {
        let retriever = ConfigurationRetriever::new(FallbackStrategy::fail());
        assert!(retriever.watcher(|| {}).is_none());

        let mut called = false;
        retriever.on_reload(|| called = true);
        assert!(!called);
    }

    #[test]
    fn test_watcher_targets_resolved_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.properties");
        std::fs::write(&path, "a=1\n").unwrap();

        let retriever = ConfigurationRetriever::new(FallbackStrategy::fail());
        retriever.retrieve_from_args(&args_for(&path)).unwrap();

        let watcher = retriever.watcher(|| {}).unwrap();
        assert_eq!(watcher.path(), path.as_path());
    }
}
