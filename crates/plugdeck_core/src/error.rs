//! Engine error types.

use std::fmt;
use std::path::PathBuf;

use plugdeck_manifest::{Dependency, ManifestError, Version};
use plugdeck_registry::SecurityError;
use thiserror::Error;

use crate::composer::ComposeError;
use crate::validator::Dependent;

/// Which of the three manifests an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestRole {
    Original,
    Local,
    Remote,
}

impl fmt::Display for ManifestRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ManifestRole::Original => "original",
            ManifestRole::Local => "local",
            ManifestRole::Remote => "remote",
        })
    }
}

/// Filesystem errors raised by a [`crate::PluginStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors that can occur while loading a session or running an operation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A download or the remote catalog could not be fetched.
    #[error("Failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Please install the following plugins first:\n{}", list_items(.0))]
    DependencyMissing(Vec<Dependency>),

    #[error("The following plugins depend on this one:\n{}", list_items(.0))]
    DependentsExist(Vec<Dependent>),

    #[error("The {role} manifest is malformed: {source}")]
    MalformedManifest {
        role: ManifestRole,
        #[source]
        source: ManifestError,
    },

    /// The bundled original manifest is required and was not found.
    #[error("Original manifest not found at {0}")]
    OriginalMissing(PathBuf),

    #[error("Tool version {current} is below the required minimum {required}; please update the tool")]
    EditorBlocked { current: Version, required: Version },

    #[error("An operation is already running for plugin '{0}'")]
    OperationInProgress(String),

    #[error("Plugin '{0}' is not installed")]
    NotInstalled(String),

    #[error("Plugin '{0}' cannot be removed")]
    NotRemovable(String),

    /// The candidate record carries no version, so it could never be
    /// recorded as installed.
    #[error("Plugin '{0}' has no version and cannot be installed")]
    MissingVersion(String),

    #[error("The remote catalog has not been loaded")]
    RemoteUnavailable,

    #[error("Operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Unsafe download path: {0}")]
    UnsafePath(#[from] SecurityError),
}

impl EngineError {
    pub fn malformed(role: ManifestRole, source: ManifestError) -> Self {
        Self::MalformedManifest { role, source }
    }

    /// Refusals are expected outcomes the user can act on, as opposed to
    /// failures of the environment.
    pub fn is_refusal(&self) -> bool {
        matches!(
            self,
            EngineError::DependencyMissing(_)
                | EngineError::DependentsExist(_)
                | EngineError::EditorBlocked { .. }
                | EngineError::OperationInProgress(_)
                | EngineError::NotInstalled(_)
                | EngineError::NotRemovable(_)
        )
    }
}

fn list_items<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dependency_missing_lists_items() {
        let err = EngineError::DependencyMissing(vec![
            Dependency::new("core", Version::new(2, 0, 0)),
            Dependency::new("ads", Version::new(1, 1, 0)),
        ]);
        assert_eq!(
            err.to_string(),
            "Please install the following plugins first:\ncore : v2.0.0\nads : v1.1.0"
        );
        assert!(err.is_refusal());
    }

    #[test]
    fn test_dependents_exist_lists_items() {
        let err = EngineError::DependentsExist(vec![Dependent {
            name: "ads".to_string(),
            version: Version::new(1, 0, 0),
            requires: Version::new(2, 0, 0),
        }]);
        assert_eq!(
            err.to_string(),
            "The following plugins depend on this one:\nads : v1.0.0 (requires v2.0.0)"
        );
    }

    #[test]
    fn test_environment_failures_are_not_refusals() {
        assert!(!EngineError::Cancelled.is_refusal());
        assert!(!EngineError::MissingVersion("ads".to_string()).is_refusal());
        assert!(!EngineError::RemoteUnavailable.is_refusal());
        assert!(
            !EngineError::Fetch {
                url: "https://example.com/a.cs".to_string(),
                message: "HTTP error: 503".to_string(),
            }
            .is_refusal()
        );
    }
}
