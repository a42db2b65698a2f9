//! # plugdeck_core
//!
//! Reconciles the bundled, local and remote plugin manifests of an SDK and
//! installs, updates and removes plugins with dependency checks.
//!
//! ```text
//! Engine::open_session  -> SessionContext (original + reconciled local)
//! Engine::refresh_remote -> remote catalog + editor gate
//! Engine::install / update / remove -> fetch, commit, persist, compose
//! ```

pub mod catalog;
pub mod composer;
pub mod config;
pub mod engine;
pub mod error;
pub mod ops;
pub mod reconciler;
pub mod session;
pub mod store;
pub mod validator;

#[cfg(test)]
mod test_utils;

pub use catalog::{CatalogEntry, SuggestedAction, build_catalog};
pub use composer::{ComposeError, ComposeOptions, compose, main_template};
pub use config::{ConfigError, EngineConfig};
pub use engine::{Engine, Progress};
pub use error::{EngineError, ManifestRole, StoreError};
pub use ops::{OperationGuard, OperationKind, OperationState, OperationTracker};
pub use reconciler::{
    EditorGate, GateState, LoadOutcome, compute_editor_gate, reconcile, reconcile_on_load,
};
pub use session::SessionContext;
pub use store::{FsStore, PluginStore};
pub use validator::{Dependent, dependents_blocking_removal, missing_for_install};

pub use plugdeck_manifest as manifest;
pub use plugdeck_registry as registry;
pub use tokio_util::sync::CancellationToken;
