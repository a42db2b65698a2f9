//! CLI utility functions

use std::path::Path;

use miette::{IntoDiagnostic, Result};
use plugdeck_core::registry::HttpFetcher;
use plugdeck_core::{Engine, EngineConfig, EngineError, FsStore, SessionContext};
use tokio::runtime::Runtime;
use tracing::{debug, error};

pub type CliEngine = Engine<HttpFetcher, FsStore>;

pub fn create_tokio_runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .into_diagnostic()
}

/// Loads `--config`, else the first config file in the working directory,
/// else defaults rooted at the working directory.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let cwd = std::env::current_dir().into_diagnostic()?;
    let path = match path {
        Some(path) => Some(path.to_path_buf()),
        None => EngineConfig::discover(&cwd),
    };

    match path {
        Some(path) => {
            debug!("Using config {}", path.display());
            EngineConfig::from_file(&path).into_diagnostic()
        }
        None => {
            debug!("No config file found, using defaults");
            Ok(EngineConfig {
                project_root: cwd,
                ..EngineConfig::default()
            })
        }
    }
}

/// Builds the engine and opens a session without touching the network.
pub fn open_session(config_path: Option<&Path>) -> Result<(CliEngine, SessionContext)> {
    let config = load_config(config_path)?;
    let engine = Engine::from_config(config).into_diagnostic()?;
    let ctx = engine.open_session().into_diagnostic()?;
    Ok((engine, ctx))
}

/// Opens a session and loads the remote catalog.
pub fn open_online_session(
    runtime: &Runtime,
    config_path: Option<&Path>,
) -> Result<(CliEngine, SessionContext)> {
    let (engine, ctx) = open_session(config_path)?;
    runtime
        .block_on(engine.refresh_remote(&ctx))
        .into_diagnostic()?;
    Ok((engine, ctx))
}

/// Refusals are logged and reported as `Ok(true)`; anything else is an error.
pub fn report_outcome(result: std::result::Result<(), EngineError>) -> Result<bool> {
    match result {
        Ok(()) => Ok(false),
        Err(e) if e.is_refusal() => {
            error!("{}", e);
            Ok(true)
        }
        Err(e) => Err(e).into_diagnostic(),
    }
}
