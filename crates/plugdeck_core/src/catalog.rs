//! Rows describing each remote plugin for a renderer.

use plugdeck_manifest::{Manifest, Version};
use serde::Serialize;

use crate::ops::{OperationState, OperationTracker};

/// What a renderer should offer for a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    Install,
    Update,
    UpToDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub name: String,
    pub description: String,
    pub available_version: Option<Version>,
    pub installed_version: Option<Version>,
    pub action: SuggestedAction,
    /// Removal is offered only for installed, removable plugins.
    pub can_remove: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<OperationState>,
}

/// One entry per remote record, in remote order.
pub fn build_catalog(
    remote: &Manifest,
    local: &Manifest,
    operations: &OperationTracker,
) -> Vec<CatalogEntry> {
    remote
        .plugins
        .iter()
        .map(|plugin| {
            let installed_version = local.installed_version(&plugin.name);
            let action = match (installed_version, plugin.version) {
                (None, _) => SuggestedAction::Install,
                (Some(installed), Some(available)) if !installed.is_higher_or_equal(&available) => {
                    SuggestedAction::Update
                }
                (Some(_), _) => SuggestedAction::UpToDate,
            };

            CatalogEntry {
                name: plugin.name.clone(),
                description: plugin.description.clone(),
                available_version: plugin.version,
                installed_version,
                action,
                can_remove: plugin.removable && installed_version.is_some(),
                documentation_url: plugin.documentation_url.clone(),
                operation: operations.get(&plugin.name),
            }
        })
        .collect()
}
