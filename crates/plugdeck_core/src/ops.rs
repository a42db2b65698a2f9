//! Per-plugin operation state.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Install,
    Update,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OperationState {
    pub kind: OperationKind,
    /// Fraction of download items fetched, in `[0, 1]`.
    pub progress: f32,
}

/// Tracks which plugins have an operation running.
///
/// At most one operation runs per plugin name. State is cleared when the
/// [`OperationGuard`] returned by [`OperationTracker::begin`] is dropped, so
/// every exit path of an operation clears it.
#[derive(Debug, Default)]
pub struct OperationTracker {
    states: Mutex<HashMap<String, OperationState>>,
}

impl OperationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `name` for an operation, or returns `None` if one is running.
    pub fn begin(&self, name: &str, kind: OperationKind) -> Option<OperationGuard<'_>> {
        let mut states = self.states.lock();
        if states.contains_key(name) {
            return None;
        }
        states.insert(
            name.to_string(),
            OperationState {
                kind,
                progress: 0.0,
            },
        );
        Some(OperationGuard {
            tracker: self,
            name: name.to_string(),
        })
    }

    pub fn get(&self, name: &str) -> Option<OperationState> {
        self.states.lock().get(name).copied()
    }

    pub fn is_busy(&self, name: &str) -> bool {
        self.states.lock().contains_key(name)
    }

    /// Whether any plugin has an operation running.
    pub fn any_running(&self) -> bool {
        !self.states.lock().is_empty()
    }

    fn set_progress(&self, name: &str, progress: f32) {
        if let Some(state) = self.states.lock().get_mut(name) {
            state.progress = progress.clamp(0.0, 1.0);
        }
    }

    fn finish(&self, name: &str) {
        self.states.lock().remove(name);
    }
}

/// Holds a plugin's slot in the tracker until dropped.
#[derive(Debug)]
pub struct OperationGuard<'a> {
    tracker: &'a OperationTracker,
    name: String,
}

impl OperationGuard<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_progress(&self, progress: f32) {
        self.tracker.set_progress(&self.name, progress);
    }
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        self.tracker.finish(&self.name);
    }
}
