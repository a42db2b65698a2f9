//! Shared manifest types for plugin catalogs.
//!
//! A manifest file carries the editor metadata of the tool itself plus the
//! list of optional plugins that can be installed on top of the SDK. The same
//! shape is used for the bundled original, the persisted local copy and the
//! remote catalog.

pub mod version;

pub use version::Version;

use jsonschema::Validator;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Error type for manifest operations.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to parse manifest JSON: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Manifest validation failed: {0}")]
    ValidationError(String),
}

/// The structure of a plugin manifest file.
/// This matches `schemas/v1/manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub editor: EditorInfo,
    #[serde(default, deserialize_with = "null_as_default")]
    pub plugins: Vec<PluginRecord>,
}

/// Metadata about the tool that consumes the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorInfo {
    /// Where a newer build of the tool can be downloaded.
    #[serde(rename = "url", default, deserialize_with = "null_as_default")]
    pub download_url: String,
    pub version: Version,
    /// Floor below which the tool refuses to operate.
    pub min_version: Version,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<EditorMessage>,
}

/// A notice shown to tool versions inside `[min_version, max_version]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorMessage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub buttons: Vec<EditorButton>,
    #[serde(default, with = "version::optional")]
    pub min_version: Option<Version>,
    #[serde(default, with = "version::optional")]
    pub max_version: Option<Version>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorButton {
    pub title: String,
    pub url: String,
}

/// One installable plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginRecord {
    pub name: String,
    /// `None` in a local manifest means the plugin is not installed.
    #[serde(default, with = "version::optional")]
    pub version: Option<Version>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(rename = "can_be_removed", default)]
    pub removable: bool,
    #[serde(rename = "download", default, deserialize_with = "null_as_default")]
    pub download_items: Vec<DownloadItem>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dependencies: Vec<Dependency>,
    /// Fragment spliced into the composed source file.
    #[serde(default, deserialize_with = "null_as_default")]
    pub code: String,
    #[serde(
        rename = "documentation",
        default,
        deserialize_with = "non_empty_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub documentation_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadItem {
    pub url: String,
    /// Destination relative to the plugin root.
    #[serde(rename = "file")]
    pub relative_path: String,
}

/// A requirement on another plugin being installed at `min_version` or later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    #[serde(rename = "version")]
    pub min_version: Version,
}

impl Dependency {
    pub fn new(name: impl Into<String>, min_version: Version) -> Self {
        Self {
            name: name.into(),
            min_version,
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : v{}", self.name, self.min_version)
    }
}

impl PluginRecord {
    /// Creates a record with only a name and version set.
    pub fn new(name: impl Into<String>, version: Option<Version>) -> Self {
        Self {
            name: name.into(),
            version,
            description: String::new(),
            removable: false,
            download_items: Vec::new(),
            dependencies: Vec::new(),
            code: String::new(),
            documentation_url: None,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.version.is_some()
    }

    /// Returns `true` if this record declares a dependency on `name`.
    pub fn depends_on(&self, name: &str) -> bool {
        self.dependencies.iter().any(|d| d.name == name)
    }
}

impl Manifest {
    pub fn new(editor: EditorInfo) -> Self {
        Self {
            editor,
            plugins: Vec::new(),
        }
    }

    /// Parses and validates a manifest from JSON text.
    pub fn from_json(json: &str) -> Result<Self, ManifestError> {
        validate_manifest(json)
    }

    pub fn to_json_pretty(&self) -> Result<String, ManifestError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn get(&self, name: &str) -> Option<&PluginRecord> {
        self.plugins.iter().find(|p| p.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.plugins.iter().position(|p| p.name == name)
    }

    /// Version of `name` if it is present and installed.
    pub fn installed_version(&self, name: &str) -> Option<Version> {
        self.get(name).and_then(|p| p.version)
    }

    /// Records that carry a version, in manifest order.
    pub fn installed(&self) -> impl Iterator<Item = &PluginRecord> {
        self.plugins.iter().filter(|p| p.is_installed())
    }

    /// Replaces any same-named record by `record`, appended at the end.
    pub fn upsert(&mut self, record: PluginRecord) {
        self.remove(&record.name);
        self.plugins.push(record);
    }

    /// Removes the record called `name`, returning it.
    pub fn remove(&mut self, name: &str) -> Option<PluginRecord> {
        let index = self.position(name)?;
        Some(self.plugins.remove(index))
    }
}

impl EditorMessage {
    /// Whether `version` lies inside the inclusive message range.
    /// A missing bound does not restrict that side.
    pub fn applies_to(&self, version: &Version) -> bool {
        if self.text.is_empty() {
            return false;
        }
        let above_min = self
            .min_version
            .is_none_or(|min| version.is_higher_or_equal(&min));
        let below_max = self
            .max_version
            .is_none_or(|max| max.is_higher_or_equal(version));
        above_min && below_max
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn non_empty_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.trim().is_empty()))
}

// Path is relative to this file: ../../../schemas/v1/manifest.json
const MANIFEST_SCHEMA_JSON: &str = include_str!("../../../schemas/v1/manifest.json");

static SCHEMA: OnceLock<Result<Validator, String>> = OnceLock::new();

fn schema() -> Result<&'static Validator, ManifestError> {
    SCHEMA
        .get_or_init(|| {
            let schema_json: Value = serde_json::from_str(MANIFEST_SCHEMA_JSON)
                .map_err(|e| format!("invalid embedded schema: {e}"))?;
            Validator::new(&schema_json).map_err(|e| format!("invalid schema compilation: {e}"))
        })
        .as_ref()
        .map_err(|e| ManifestError::ValidationError(e.clone()))
}

/// Validates a manifest JSON string against the schema.
///
/// Beyond the schema, plugin names must be unique within the manifest.
pub fn validate_manifest(json_str: &str) -> Result<Manifest, ManifestError> {
    let instance: Value = serde_json::from_str(json_str)?;

    if let Err(e) = schema()?.validate(&instance) {
        let error_msg = format!("{} at {}", e, e.instance_path());
        return Err(ManifestError::ValidationError(error_msg));
    }

    let manifest: Manifest = serde_json::from_value(instance)?;

    let mut seen = HashSet::new();
    for plugin in &manifest.plugins {
        if !seen.insert(plugin.name.as_str()) {
            return Err(ManifestError::ValidationError(format!(
                "duplicate plugin name '{}'",
                plugin.name
            )));
        }
    }

    Ok(manifest)
}
