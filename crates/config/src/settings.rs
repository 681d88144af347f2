//! Application settings backed by a configuration file

use crate::{ConfigLoader, ConfigMap, Result};
use std::path::{Path, PathBuf};
use tracing::error;

/// Key holding the hash of the accepted EULA
pub const EULA_ACCEPTED: &str = "eula.accepted";

/// Key holding the language tag
pub const LANGUAGE: &str = "language";

const DEFAULT_LANGUAGE: &str = "fr";

type LanguageListener = Box<dyn Fn(&str) + Send + Sync>;
type ChangeListener = Box<dyn Fn(&str, &str) + Send + Sync>;

/// Retrieved configuration bound to the file it is stored in
///
/// Every update is written back to the file before listeners are notified.
pub struct Settings {
    values: ConfigMap,
    path: PathBuf,
    supported_languages: Vec<String>,
    language_listeners: Vec<LanguageListener>,
    change_listeners: Vec<(Vec<String>, ChangeListener)>,
}

impl Settings {
    /// Bind `values` to `path`, English being the only supported language.
    pub fn new(values: ConfigMap, path: impl Into<PathBuf>) -> Self {
        Self::with_languages(values, path, ["en"])
    }

    /// Bind `values` to `path` with the given supported languages.
    pub fn with_languages<I, S>(values: ConfigMap, path: impl Into<PathBuf>, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values,
            path: path.into(),
            supported_languages: languages.into_iter().map(Into::into).collect(),
            language_listeners: Vec::new(),
            change_listeners: Vec::new(),
        }
    }

    /// Value stored for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key)
    }

    /// Value stored for `key`, or `default` when absent.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.values.get_or(key, default)
    }

    /// All current values.
    pub fn values(&self) -> &ConfigMap {
        &self.values
    }

    /// File the values are stored in.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current language tag, `fr` when unset.
    pub fn language(&self) -> &str {
        self.get_or(LANGUAGE, DEFAULT_LANGUAGE)
    }

    /// Languages the application offers.
    pub fn supported_languages(&self) -> &[String] {
        &self.supported_languages
    }

    /// Change the language, store it and notify language listeners.
    pub fn set_language(&mut self, language: &str) -> Result<()> {
        self.values.insert(LANGUAGE, language);
        self.store()?;
        for listener in &self.language_listeners {
            listener(language);
        }
        Ok(())
    }

    /// Register `listener` for [`Settings::set_language`] calls.
    pub fn add_language_listener<F>(&mut self, listener: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.language_listeners.push(Box::new(listener));
    }

    /// Register `listener` for changes made through [`Settings::update_value`] to any of `keys`.
    pub fn add_change_listener<I, S, F>(&mut self, keys: I, listener: F)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        let keys = keys.into_iter().map(Into::into).collect();
        self.change_listeners.push((keys, Box::new(listener)));
    }

    /// Set `key`, store it and notify the listeners interested in it.
    pub fn update_value(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key, value);
        self.store()?;
        self.change_listeners
            .iter()
            .filter(|(keys, _)| keys.iter().any(|k| k == key))
            .for_each(|(_, listener)| listener(key, value));
        Ok(())
    }

    /// Whether the accepted EULA hash is `expected_hash`.
    pub fn is_eula_accepted(&self, expected_hash: &str) -> bool {
        self.get(EULA_ACCEPTED) == Some(expected_hash)
    }

    /// Record the accepted EULA, `false` when it could not be stored.
    pub fn set_eula_accepted(&mut self, hash: &str) -> bool {
        self.values.insert(EULA_ACCEPTED, hash);
        match self.store() {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "Failed to store EULA acceptance");
                false
            }
        }
    }

    /// Reset the EULA acceptance in memory, the file is left as is.
    pub fn set_eula_not_accepted(&mut self) {
        self.values.insert(EULA_ACCEPTED, "0");
    }

    fn store(&self) -> Result<()> {
        ConfigLoader::store(&self.path, &self.values.sanitized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn settings_in(dir: &tempfile::TempDir) -> Settings {
        Settings::new(ConfigMap::new(), dir.path().join("configuration.properties"))
    }

    #[test]
    fn test_default_language() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(&dir);
        assert_eq!(settings.language(), "fr");
        assert_eq!(settings.supported_languages(), ["en"]);
    }

    #[test]
    fn test_set_language_stores_and_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings_in(&dir);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        settings.add_language_listener(move |lang| sink.lock().unwrap().push(lang.to_string()));

        settings.set_language("tr").unwrap();

        assert_eq!(settings.language(), "tr");
        assert_eq!(*seen.lock().unwrap(), ["tr"]);
        let stored = ConfigLoader::load(settings.path()).unwrap();
        assert_eq!(stored.get(LANGUAGE), Some("tr"));
    }

    #[test]
    fn test_update_value_notifies_interested_listeners() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings_in(&dir);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        settings.add_change_listener(["volume"], move |k, v| {
            sink.lock().unwrap().push(format!("{k}={v}"))
        });

        settings.update_value("volume", "7").unwrap();
        settings.update_value("brightness", "3").unwrap();

        assert_eq!(*seen.lock().unwrap(), ["volume=7"]);
        assert_eq!(settings.get("brightness"), Some("3"));
    }

    #[test]
    fn test_eula() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings_in(&dir);
        assert!(!settings.is_eula_accepted("abc"));

        assert!(settings.set_eula_accepted("abc"));
        assert!(settings.is_eula_accepted("abc"));

        settings.set_eula_not_accepted();
        assert!(!settings.is_eula_accepted("abc"));
        // Only the accepted state reached the file
        let stored = ConfigLoader::load(settings.path()).unwrap();
        assert_eq!(stored.get(EULA_ACCEPTED), Some("abc"));
    }

    #[test]
    fn test_eula_store_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::new(
            ConfigMap::new(),
            dir.path().join("missing").join("configuration.properties"),
        );
        assert!(!settings.set_eula_accepted("abc"));
    }
}
