//! Configuration manager: decides where configuration files live, runs the
//! field-encryption hooks, and moves strongly typed values through the
//! chosen document format.
//!
//! Loading is lenient: an unreadable file, unparsable text, or a mismatched
//! shape logs the problem and falls back to the type's default, so a broken
//! config file degrades instead of crashing the host application. Saving is
//! strict and reports every failure.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::fields::{EncryptedFields, FieldError};
use crate::format::{DocumentFormat, FormatError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("application name must not be blank")]
    BlankApplicationName,
    #[error("no per-user configuration directory is available on this platform")]
    NoUserDirectory,
    #[error("configuration could not be converted to a document tree: {0}")]
    Tree(String),
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("configuration file `{0}` could not be written: {1}")]
    Write(PathBuf, #[source] std::io::Error),
}

/// Loads and saves configuration objects, transparently encrypting any
/// registered fields.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    location: PathBuf,
    format: DocumentFormat,
    fields: EncryptedFields,
}

impl ConfigManager {
    /// A manager using JSON documents stored next to the executable.
    pub fn new() -> Self {
        Self::with_format(DocumentFormat::Json)
    }

    /// A manager using the given document format.
    pub fn with_format(format: DocumentFormat) -> Self {
        Self {
            location: application_dir(),
            format,
            fields: EncryptedFields::new(),
        }
    }

    /// Application-wide settings live in the same directory as the
    /// application itself.
    pub fn application_settings(mut self) -> Self {
        self.location = application_dir();
        debug!(location = %self.location.display(), "configuration location selected");
        self
    }

    /// Application-wide settings in the given directory; falls back to the
    /// application directory when it does not exist.
    pub fn application_settings_in(mut self, directory: impl AsRef<Path>) -> Self {
        let directory = directory.as_ref();
        self.location = if directory.is_dir() {
            directory.to_path_buf()
        } else {
            application_dir()
        };
        debug!(location = %self.location.display(), "configuration location selected");
        self
    }

    /// User-specific settings live in the per-user configuration directory,
    /// under a subdirectory named after the application.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BlankApplicationName`] for a blank name and
    /// [`ConfigError::NoUserDirectory`] when the platform exposes no
    /// per-user configuration directory.
    pub fn user_settings(mut self, application_name: &str) -> Result<Self, ConfigError> {
        if application_name.trim().is_empty() {
            return Err(ConfigError::BlankApplicationName);
        }
        let base = dirs::config_dir().ok_or(ConfigError::NoUserDirectory)?;
        self.location = base.join(application_name);
        debug!(location = %self.location.display(), "configuration location selected");
        Ok(self)
    }

    /// Registers a string field for transparent encryption under `key`.
    /// The path is dot-separated for nested fields.
    pub fn encrypt_field(mut self, path: impl Into<String>, key: impl Into<String>) -> Self {
        self.fields.add(path, key);
        self
    }

    /// The directory configuration files resolve against.
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Loads a configuration file. Relative names resolve against the
    /// configured location; absolute paths are used as-is. Any failure is
    /// logged and answered with `T::default()`.
    pub fn load_file<T>(&self, file: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        let path = self.resolve(file);
        match fs::read_to_string(&path) {
            Ok(text) => self.load_str(&text),
            Err(err) => {
                error!(file = %path.display(), error = %err, "unable to read configuration file");
                T::default()
            }
        }
    }

    /// Parses configuration text, opening encrypted fields first. Any
    /// failure is logged and answered with `T::default()`.
    pub fn load_str<T>(&self, text: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        if text.trim().is_empty() {
            warn!("cannot parse an empty configuration document");
            return T::default();
        }

        let mut document = match self.format.parse(text) {
            Ok(document) => document,
            Err(err) => {
                error!(error = %err, "configuration document could not be parsed");
                return T::default();
            }
        };

        self.fields.open(&mut document);

        match serde_json::from_value(document) {
            Ok(config) => config,
            Err(err) => {
                warn!(error = %err, "configuration document does not match the expected shape");
                T::default()
            }
        }
    }

    /// Serializes a configuration object, sealing registered fields.
    pub fn save<T: Serialize>(&self, config: &T) -> Result<String, ConfigError> {
        let mut document =
            serde_json::to_value(config).map_err(|e| ConfigError::Tree(e.to_string()))?;
        self.fields.seal(&mut document)?;
        Ok(self.format.serialize(&document)?)
    }

    /// Serializes a configuration object and writes it to `file`, resolved
    /// like [`load_file`](Self::load_file).
    pub fn save_to_file<T: Serialize>(&self, config: &T, file: &str) -> Result<(), ConfigError> {
        let path = self.resolve(file);
        let text = self.save(config)?;
        fs::write(&path, text).map_err(|e| ConfigError::Write(path.clone(), e))?;
        info!(file = %path.display(), "configuration saved");
        Ok(())
    }

    fn resolve(&self, file: &str) -> PathBuf {
        let path = Path::new(file);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.location.join(path)
        }
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// The directory the running executable lives in, or the working directory
/// when that cannot be determined.
fn application_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ConfigManager};
    use crate::format::DocumentFormat;
    use serde::{Deserialize, Serialize};

    const KEY: &str = "cfVMjtOJ8/eJx0037MHNym3awHj9iAUBdM/bmiLUvlc=";

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct ServerConfig {
        connection_string: Option<String>,
        server_name: String,
        port_number: u16,
    }

    fn sample() -> ServerConfig {
        ServerConfig {
            connection_string: Some("server=localhost;password=hunter2".into()),
            server_name: "localhost".into(),
            port_number: 80,
        }
    }

    #[test]
    fn saves_and_loads_a_file_round_trip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let manager = ConfigManager::new().application_settings_in(dir.path());

        manager
            .save_to_file(&sample(), "settings.json")
            .expect("save should succeed");
        let loaded: ServerConfig = manager.load_file("settings.json");
        assert_eq!(loaded, sample());
    }

    #[test]
    fn missing_files_degrade_to_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let manager = ConfigManager::new().application_settings_in(dir.path());

        let loaded: ServerConfig = manager.load_file("a_file_that_doesnt_exist.json");
        assert_eq!(loaded, ServerConfig::default());
    }

    #[test]
    fn unparsable_documents_degrade_to_defaults() {
        let manager = ConfigManager::new();
        let loaded: ServerConfig = manager.load_str("{ this is not json");
        assert_eq!(loaded, ServerConfig::default());

        let loaded: ServerConfig = manager.load_str("   ");
        assert_eq!(loaded, ServerConfig::default());
    }

    #[test]
    fn encrypted_fields_never_hit_the_disk_in_plaintext() {
        let dir = tempfile::tempdir().expect("temp dir");
        let manager = ConfigManager::new()
            .application_settings_in(dir.path())
            .encrypt_field("connection_string", KEY);

        manager
            .save_to_file(&sample(), "settings.json")
            .expect("save should succeed");

        let raw = std::fs::read_to_string(dir.path().join("settings.json")).expect("read back");
        assert!(!raw.contains("hunter2"));
        assert!(raw.contains("server_name"));

        let loaded: ServerConfig = manager.load_file("settings.json");
        assert_eq!(loaded, sample());
    }

    #[test]
    fn wrong_key_degrades_only_the_encrypted_field() {
        let dir = tempfile::tempdir().expect("temp dir");
        let writer = ConfigManager::new()
            .application_settings_in(dir.path())
            .encrypt_field("connection_string", KEY);
        writer
            .save_to_file(&sample(), "settings.json")
            .expect("save should succeed");

        let reader = ConfigManager::new()
            .application_settings_in(dir.path())
            .encrypt_field(
                "connection_string",
                "b3RoZXIga2V5IGVudGlyZWx5ISEhISEhISEhISEhISE=",
            );
        let loaded: ServerConfig = reader.load_file("settings.json");

        assert_eq!(loaded.connection_string, None);
        assert_eq!(loaded.server_name, "localhost");
        assert_eq!(loaded.port_number, 80);
    }

    #[test]
    fn toml_documents_round_trip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let manager = ConfigManager::with_format(DocumentFormat::Toml)
            .application_settings_in(dir.path())
            .encrypt_field("connection_string", KEY);

        manager
            .save_to_file(&sample(), "settings.toml")
            .expect("save should succeed");
        let raw = std::fs::read_to_string(dir.path().join("settings.toml")).expect("read back");
        assert!(!raw.contains("hunter2"));

        let loaded: ServerConfig = manager.load_file("settings.toml");
        assert_eq!(loaded, sample());
    }

    #[test]
    fn absolute_paths_bypass_the_configured_location() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("absolute.json");
        let manager = ConfigManager::new();

        manager
            .save_to_file(&sample(), path.to_str().expect("utf-8 path"))
            .expect("save should succeed");
        let loaded: ServerConfig = manager.load_file(path.to_str().expect("utf-8 path"));
        assert_eq!(loaded, sample());
    }

    #[test]
    fn nonexistent_settings_directory_falls_back_to_the_application_dir() {
        let manager = ConfigManager::new().application_settings_in("/definitely/not/a/real/dir");
        assert_ne!(
            manager.location(),
            std::path::Path::new("/definitely/not/a/real/dir")
        );
    }

    #[test]
    fn blank_application_names_are_rejected() {
        let err = ConfigManager::new().user_settings("  ").unwrap_err();
        assert!(matches!(err, ConfigError::BlankApplicationName));
    }
}
