//! Status command implementation

use std::path::Path;

use miette::Result;
use plugdeck_core::{GateState, LoadOutcome, SessionContext};
use tracing::warn;

use crate::utils::{create_tokio_runtime, open_session};

/// Prints the gate and installed plugins. Returns `true` when the tool is
/// blocked by the remote catalog.
pub fn run_status(config_path: Option<&Path>) -> Result<bool> {
    let runtime = create_tokio_runtime()?;
    let (engine, ctx) = open_session(config_path)?;

    if let Err(e) = runtime.block_on(engine.refresh_remote(&ctx)) {
        warn!("Remote catalog unavailable: {}", e);
    }

    print!("{}", render_status(&ctx));

    Ok(ctx
        .editor_gate()
        .is_some_and(|gate| gate.state == GateState::Blocked))
}

fn render_status(ctx: &SessionContext) -> String {
    let mut out = String::new();
    let local = ctx.local_manifest();

    let outcome = match ctx.load_outcome() {
        LoadOutcome::Created => "created from the bundled manifest",
        LoadOutcome::Reconciled => "reconciled with the bundled manifest",
    };
    out.push_str(&format!("Local manifest: {}\n", outcome));

    match ctx.editor_gate() {
        None => out.push_str(&format!(
            "Tool: v{} (remote catalog unavailable)\n",
            local.editor.version
        )),
        Some(gate) => {
            let state = match gate.state {
                GateState::Current => "up to date".to_string(),
                GateState::UpdateAvailable => format!(
                    "update available: v{} at {}",
                    gate.latest_version, gate.download_url
                ),
                GateState::Blocked => format!(
                    "blocked, v{} or later is required: {}",
                    gate.required_version, gate.download_url
                ),
            };
            out.push_str(&format!("Tool: v{} ({})\n", gate.current_version, state));

            if let Some(message) = &gate.message {
                out.push_str(&format!("Notice: {}\n", message.text));
                for button in &message.buttons {
                    out.push_str(&format!("  {}: {}\n", button.title, button.url));
                }
            }
        }
    }

    out.push_str("Installed plugins:\n");
    let mut any = false;
    for plugin in local.installed() {
        any = true;
        let version = plugin.version.unwrap_or_default();
        out.push_str(&format!("  {} v{}\n", plugin.name, version));
    }
    if !any {
        out.push_str("  (none)\n");
    }
    out
}
