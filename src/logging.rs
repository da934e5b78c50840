//! Tracing setup.
//!
//! The terminal belongs to the form, so log lines go to a file. The filter
//! comes from `RUST_LOG` and defaults to `info`.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::debug;
use tracing_subscriber::EnvFilter;

pub fn init(log_file: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("cannot open log file {}", log_file.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // A second call (e.g. from tests) keeps the first subscriber.
    if let Err(err) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
    {
        debug!(error = %err, log_file = %log_file.display(), "keeping existing tracing subscriber");
    }

    Ok(())
}
