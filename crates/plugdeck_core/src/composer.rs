//! Regenerates the composed source file from installed plugin fragments.

use plugdeck_manifest::Manifest;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("The remote catalog has no main plugin '{0}' to compose from")]
    MissingMainTemplate(String),
}

/// Names and markers used when splicing fragments into the main template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeOptions {
    /// Plugin whose `code` is the template rather than a fragment.
    pub main_plugin: String,
    pub placeholder: String,
    pub separator: String,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            main_plugin: "core".to_string(),
            placeholder: "{0}".to_string(),
            separator: "\n\t\t\t".to_string(),
        }
    }
}

/// The main plugin's template from the remote catalog.
pub fn main_template<'a>(remote: &'a Manifest, main_plugin: &str) -> Result<&'a str, ComposeError> {
    remote
        .get(main_plugin)
        .map(|p| p.code.as_str())
        .ok_or_else(|| ComposeError::MissingMainTemplate(main_plugin.to_string()))
}

/// Splices the code of every installed non-main plugin, in local order, into
/// each placeholder of `template`.
pub fn compose(local: &Manifest, template: &str, options: &ComposeOptions) -> String {
    let fragments: Vec<&str> = local
        .installed()
        .filter(|p| p.name != options.main_plugin)
        .map(|p| p.code.as_str())
        .collect();

    if !template.contains(&options.placeholder) {
        warn!(
            "Main template has no '{}' placeholder; plugin code is not included",
            options.placeholder
        );
    }

    template.replace(&options.placeholder, &fragments.join(&options.separator))
}
