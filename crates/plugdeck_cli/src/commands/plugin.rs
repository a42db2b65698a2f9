//! Install, update and remove command implementation

use std::path::Path;

use miette::Result;
use plugdeck_core::CancellationToken;
use tracing::{info, warn};

use crate::utils::{create_tokio_runtime, open_online_session, report_outcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginAction {
    Install,
    Update,
    Remove,
}

fn print_progress(file: &str, fraction: f32) {
    info!("  {} ({:.0}%)", file, fraction * 100.0);
}

pub fn run_plugin_action(
    config_path: Option<&Path>,
    action: PluginAction,
    name: &str,
) -> Result<bool> {
    let runtime = create_tokio_runtime()?;
    let (engine, ctx) = open_online_session(&runtime, config_path)?;

    // Removal falls back to the local record for plugins dropped from the catalog.
    let record = match action {
        PluginAction::Remove => ctx
            .remote_record(name)
            .or_else(|| ctx.with_local(|local| local.get(name).cloned())),
        PluginAction::Install | PluginAction::Update => ctx.remote_record(name),
    }
    .ok_or_else(|| miette::miette!("Plugin '{}' is not in the remote catalog", name))?;

    let cancel = CancellationToken::new();
    let result = runtime.block_on(async {
        let watcher = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Cancelling...");
                    cancel.cancel();
                }
            }
        });

        let result = match action {
            PluginAction::Install => {
                info!("Installing {}", name);
                engine.install(&ctx, &record, &print_progress, &cancel).await
            }
            PluginAction::Update => {
                info!("Updating {}", name);
                engine.update(&ctx, &record, &print_progress, &cancel).await
            }
            PluginAction::Remove => engine.remove(&ctx, &record).await,
        };

        watcher.abort();
        result
    });

    report_outcome(result)
}
