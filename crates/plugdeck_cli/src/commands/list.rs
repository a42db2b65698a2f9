//! List command implementation

use std::path::Path;

use miette::{IntoDiagnostic, Result};
use plugdeck_core::{CatalogEntry, SuggestedAction};

use crate::cli::OutputFormat;
use crate::utils::{create_tokio_runtime, open_online_session};

pub fn run_list(config_path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let runtime = create_tokio_runtime()?;
    let (_engine, ctx) = open_online_session(&runtime, config_path)?;
    let catalog = ctx
        .catalog()
        .ok_or_else(|| miette::miette!("The remote catalog has not been loaded"))?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&catalog).into_diagnostic()?);
        }
        OutputFormat::Text => print!("{}", render_table(&catalog)),
    }
    Ok(())
}

fn render_table(catalog: &[CatalogEntry]) -> String {
    let mut out = format!(
        "{:<20} {:<10} {:<10} {}\n",
        "NAME", "INSTALLED", "AVAILABLE", "ACTION"
    );
    for entry in catalog {
        let installed = entry
            .installed_version
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        let available = entry
            .available_version
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        let mut action = match entry.action {
            SuggestedAction::Install => "install",
            SuggestedAction::Update => "update",
            SuggestedAction::UpToDate => "up to date",
        }
        .to_string();
        if entry.can_remove {
            action.push_str(", removable");
        }
        out.push_str(&format!(
            "{:<20} {:<10} {:<10} {}\n",
            entry.name, installed, available, action
        ));
    }
    out
}
