//! Merging the bundled original into the local manifest, and the editor gate.

use plugdeck_manifest::{EditorMessage, Manifest, Version};
use serde::Serialize;
use tracing::debug;

/// How the local manifest came to be for this session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadOutcome {
    /// No local manifest existed; it was copied from the original and must be
    /// persisted by the caller.
    Created,
    /// An existing local manifest was merged with the original.
    Reconciled,
}

/// Brings `local` up to the `original` floor.
///
/// The editor block always comes from `original`. A local record is replaced
/// in place by the same-named original when it is uninstalled or not newer
/// than the original. Records that exist only on one side are left as they are.
pub fn reconcile(original: &Manifest, local: &Manifest) -> Manifest {
    let mut merged = local.clone();
    merged.editor = original.editor.clone();

    for record in &mut merged.plugins {
        let Some(bundled) = original.get(&record.name) else {
            continue;
        };
        let replace = match (record.version, bundled.version) {
            (None, _) => true,
            (Some(local_version), Some(bundled_version)) => {
                bundled_version.is_higher_or_equal(&local_version)
            }
            (Some(_), None) => false,
        };
        if replace {
            debug!("Reconciled '{}' from the original manifest", record.name);
            *record = bundled.clone();
        }
    }

    merged
}

/// Produces the session's local manifest from the stored one, if any.
pub fn reconcile_on_load(original: &Manifest, stored: Option<Manifest>) -> (Manifest, LoadOutcome) {
    match stored {
        None => (original.clone(), LoadOutcome::Created),
        Some(local) => (reconcile(original, &local), LoadOutcome::Reconciled),
    }
}

/// Whether the tool may run plugin operations against the remote catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    Blocked,
    UpdateAvailable,
    Current,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditorGate {
    pub state: GateState,
    /// Tool version currently recorded in the local manifest.
    pub current_version: Version,
    /// Minimum tool version the remote catalog accepts.
    pub required_version: Version,
    pub latest_version: Version,
    pub download_url: String,
    /// Remote notice that applies to the current tool version.
    pub message: Option<EditorMessage>,
}

impl EditorGate {
    pub fn allows_operations(&self) -> bool {
        self.state != GateState::Blocked
    }
}

pub fn compute_editor_gate(original: &Manifest, local: &Manifest, remote: &Manifest) -> EditorGate {
    let current = local.editor.version;
    let state = if !current.is_higher_or_equal(&remote.editor.min_version) {
        GateState::Blocked
    } else if !original
        .editor
        .version
        .is_higher_or_equal(&remote.editor.version)
    {
        GateState::UpdateAvailable
    } else {
        GateState::Current
    };

    let message = remote
        .editor
        .message
        .as_ref()
        .filter(|m| m.applies_to(&current))
        .cloned();

    EditorGate {
        state,
        current_version: current,
        required_version: remote.editor.min_version,
        latest_version: remote.editor.version,
        download_url: remote.editor.download_url.clone(),
        message,
    }
}
