//! State shared by every operation of one editor session.

use std::sync::Arc;

use parking_lot::RwLock;
use plugdeck_manifest::{Manifest, PluginRecord};

use crate::catalog::{CatalogEntry, build_catalog};
use crate::ops::OperationTracker;
use crate::reconciler::{EditorGate, LoadOutcome, compute_editor_gate};

/// The three manifests of a session plus operation bookkeeping.
///
/// Built by [`crate::Engine::open_session`] and passed by reference into
/// every engine operation. The local manifest is only replaced while the
/// commit lock is held.
#[derive(Debug)]
pub struct SessionContext {
    original: Manifest,
    local: RwLock<Manifest>,
    remote: RwLock<Option<Arc<Manifest>>>,
    load_outcome: LoadOutcome,
    operations: OperationTracker,
    commit_lock: tokio::sync::Mutex<()>,
}

impl SessionContext {
    pub fn new(original: Manifest, local: Manifest, load_outcome: LoadOutcome) -> Self {
        Self {
            original,
            local: RwLock::new(local),
            remote: RwLock::new(None),
            load_outcome,
            operations: OperationTracker::new(),
            commit_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn original(&self) -> &Manifest {
        &self.original
    }

    /// Snapshot of the local manifest.
    pub fn local_manifest(&self) -> Manifest {
        self.local.read().clone()
    }

    pub fn with_local<R>(&self, f: impl FnOnce(&Manifest) -> R) -> R {
        f(&self.local.read())
    }

    pub fn remote(&self) -> Option<Arc<Manifest>> {
        self.remote.read().clone()
    }

    pub fn set_remote(&self, remote: Manifest) {
        *self.remote.write() = Some(Arc::new(remote));
    }

    /// Candidate record `name` from the remote catalog.
    pub fn remote_record(&self, name: &str) -> Option<PluginRecord> {
        self.remote.read().as_ref()?.get(name).cloned()
    }

    pub fn load_outcome(&self) -> LoadOutcome {
        self.load_outcome
    }

    pub fn operations(&self) -> &OperationTracker {
        &self.operations
    }

    /// `None` until the remote catalog is loaded.
    pub fn editor_gate(&self) -> Option<EditorGate> {
        let remote = self.remote()?;
        Some(self.with_local(|local| compute_editor_gate(&self.original, local, &remote)))
    }

    /// `None` until the remote catalog is loaded.
    pub fn catalog(&self) -> Option<Vec<CatalogEntry>> {
        let remote = self.remote()?;
        Some(self.with_local(|local| build_catalog(&remote, local, &self.operations)))
    }

    pub(crate) fn commit_lock(&self) -> &tokio::sync::Mutex<()> {
        &self.commit_lock
    }

    pub(crate) fn replace_local(&self, local: Manifest) {
        *self.local.write() = local;
    }
}
