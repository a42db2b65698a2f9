//! Dependency checks run before any mutation.

use std::fmt;

use plugdeck_manifest::{Dependency, Manifest, PluginRecord, Version};
use serde::Serialize;

/// An installed plugin that requires the one being removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependent {
    pub name: String,
    /// Installed version of the dependent.
    pub version: Version,
    /// Minimum version of the removed plugin it asks for.
    pub requires: Version,
}

impl fmt::Display for Dependent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} : v{} (requires v{})",
            self.name, self.version, self.requires
        )
    }
}

/// Dependencies of `record` that `local` does not satisfy, in declaration order.
///
/// A dependency is satisfied only by an installed local record whose version
/// is at least the required one.
pub fn missing_for_install(record: &PluginRecord, local: &Manifest) -> Vec<Dependency> {
    record
        .dependencies
        .iter()
        .filter(|dep| {
            !local
                .installed_version(&dep.name)
                .is_some_and(|installed| installed.is_higher_or_equal(&dep.min_version))
        })
        .cloned()
        .collect()
}

/// Installed local records that declare a dependency on `name`.
pub fn dependents_blocking_removal(name: &str, local: &Manifest) -> Vec<Dependent> {
    let mut dependents = Vec::new();
    for plugin in local.installed() {
        let Some(version) = plugin.version else {
            continue;
        };
        for dep in plugin.dependencies.iter().filter(|d| d.name == name) {
            dependents.push(Dependent {
                name: plugin.name.clone(),
                version,
                requires: dep.min_version,
            });
        }
    }
    dependents
}
