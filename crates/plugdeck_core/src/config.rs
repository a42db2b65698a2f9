//! Engine configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use jsonc_parser::ParseOptions;
use jsonschema::Validator;
use plugdeck_registry::ManifestSource;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::composer::ComposeOptions;

// Embed the schema
const SCHEMA_JSON: &str = include_str!("../../../schemas/v1/config.json");
static CONFIG_SCHEMA: OnceLock<Result<Validator, String>> = OnceLock::new();

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(String),

    #[error("Config validation failed: {0}")]
    Validation(String),
}

/// Configuration for the plugin engine.
///
/// Every relative path is resolved against `project_root`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory every other path is relative to. When loaded from a file,
    /// a relative root is resolved against the file's directory.
    pub project_root: PathBuf,

    /// Bundled manifest shipped with the SDK.
    pub original_manifest: PathBuf,

    /// Persisted record of installed plugins.
    pub local_manifest: PathBuf,

    /// URL or path of the remote catalog.
    pub remote_manifest: String,

    /// Directory download items are written under.
    pub plugin_root: PathBuf,

    pub composed_output: PathBuf,

    pub main_plugin: String,
    pub placeholder: String,
    pub separator: String,

    /// Allow fetching from loopback and private network addresses.
    pub allow_local_network: bool,

    pub timeout_secs: u64,
    pub max_download_size: u64,

    /// Re-insert the previous record when the install half of an update fails.
    pub restore_on_failed_update: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let compose = ComposeOptions::default();
        Self {
            project_root: PathBuf::from("."),
            original_manifest: PathBuf::from("sdk/editor/bundled_plugins.json"),
            local_manifest: PathBuf::from("sdk/editor/plugins.json"),
            remote_manifest: "https://plugins.plugdeck.dev/v1/plugins.json".to_string(),
            plugin_root: PathBuf::from("sdk"),
            composed_output: PathBuf::from("sdk/Scripts/SdkMain.cs"),
            main_plugin: compose.main_plugin,
            placeholder: compose.placeholder,
            separator: compose.separator,
            allow_local_network: false,
            timeout_secs: 60,
            max_download_size: 50 * 1024 * 1024,
            restore_on_failed_update: false,
        }
    }
}

impl EngineConfig {
    /// Configuration file names, in lookup order.
    pub const CONFIG_FILES: &[&str] = &[".plugdeck.jsonc", ".plugdeck.json"];

    /// Finds the first configuration file present in `dir`.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        Self::CONFIG_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Loads configuration from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::from_json(&content)?;

        if config.project_root.is_relative()
            && let Some(parent) = path.parent()
        {
            config.project_root = parent.join(&config.project_root);
        }

        Ok(config)
    }

    /// Parses configuration from JSON (comments allowed) with schema validation.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let value = jsonc_parser::parse_to_serde_value(json, &ParseOptions::default())
            .map_err(|e| ConfigError::Parse(e.to_string()))?
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));

        let schema = CONFIG_SCHEMA
            .get_or_init(|| {
                let schema_json: serde_json::Value = serde_json::from_str(SCHEMA_JSON)
                    .map_err(|e| format!("invalid embedded schema: {e}"))?;
                Validator::new(&schema_json).map_err(|e| format!("invalid schema compilation: {e}"))
            })
            .as_ref()
            .map_err(|e| ConfigError::Validation(e.clone()))?;

        if let Err(e) = schema.validate(&value) {
            return Err(ConfigError::Validation(format!(
                "{} at {}",
                e,
                e.instance_path()
            )));
        }

        serde_json::from_value(value).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Resolves a configured path against the project root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.project_root.join(path)
    }

    pub fn compose_options(&self) -> ComposeOptions {
        ComposeOptions {
            main_plugin: self.main_plugin.clone(),
            placeholder: self.placeholder.clone(),
            separator: self.separator.clone(),
        }
    }

    /// Where the remote catalog is loaded from. A relative path is resolved
    /// against the project root.
    pub fn remote_source(&self) -> ManifestSource {
        match ManifestSource::parse(&self.remote_manifest) {
            ManifestSource::Path(path) => ManifestSource::Path(self.resolve(&path)),
            url => url,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
