//! Compose command implementation

use std::path::Path;

use miette::{IntoDiagnostic, Result};

use crate::utils::{create_tokio_runtime, open_online_session};

pub fn run_compose(config_path: Option<&Path>) -> Result<()> {
    let runtime = create_tokio_runtime()?;
    let (engine, ctx) = open_online_session(&runtime, config_path)?;
    runtime.block_on(engine.regenerate(&ctx)).into_diagnostic()
}
