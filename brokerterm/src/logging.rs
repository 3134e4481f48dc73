use anyhow::{Context, Result};
use std::fs::{create_dir_all, OpenOptions};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::settings::ConfigPaths;

/// Routes `tracing` (and `log` records from the client crate) to
/// `brokerterm.log` under the config root. Stdout belongs to the TUI.
pub fn init(paths: &ConfigPaths) -> Result<()> {
    create_dir_all(paths.root())
        .with_context(|| format!("create config dir {}", paths.root().display()))?;
    let path = paths.log_file();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("init logging: {e}"))?;

    tracing::info!(target: "brokerterm", version = env!("CARGO_PKG_VERSION"), "logging to {}", path.display());
    Ok(())
}
