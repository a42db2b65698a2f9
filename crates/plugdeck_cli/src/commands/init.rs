//! Init command implementation

use std::path::PathBuf;

use miette::{IntoDiagnostic, Result};
use plugdeck_core::EngineConfig;
use tracing::info;

const DEFAULT_CONFIG: &str = r#"{
  // Paths are relative to the directory of this file.
  "original_manifest": "sdk/editor/bundled_plugins.json",
  "local_manifest": "sdk/editor/plugins.json",
  // URL or path of the plugin catalog
  "remote_manifest": "https://plugins.plugdeck.dev/v1/plugins.json",
  "plugin_root": "sdk",
  "composed_output": "sdk/Scripts/SdkMain.cs",
  "main_plugin": "core"
}
"#;

pub fn run_init(force: bool) -> Result<()> {
    let config_path = PathBuf::from(EngineConfig::CONFIG_FILES[0]);

    loop {
        let mut options = std::fs::OpenOptions::new();
        options.write(true).create_new(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.custom_flags(libc::O_NOFOLLOW);
        }

        match options.open(&config_path) {
            Ok(mut file) => {
                use std::io::Write;
                file.write_all(DEFAULT_CONFIG.as_bytes()).into_diagnostic()?;
                info!("Created {}", config_path.display());
                return Ok(());
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                if !force {
                    return Err(miette::miette!(
                        "Config file already exists. Use --force to overwrite."
                    ));
                }

                // Removing first replaces a symlink instead of writing through it.
                match std::fs::remove_file(&config_path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e).into_diagnostic(),
                }
            }
            Err(e) => return Err(e).into_diagnostic(),
        }
    }
}
