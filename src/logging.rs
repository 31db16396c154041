//! Tracing setup
//!
//! Human-readable events go to stderr. Two optional files can be attached:
//! an error log receiving ERROR events, and a raw-data log receiving the
//! participant lists and overlap tallies of each crawl pass.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::{filter::LevelFilter, filter::Targets, prelude::*, EnvFilter};

/// Target of the raw crawl data events
pub const RAW_TARGET: &str = "subdrill::raw";

/// Accepts only the raw crawl data events
pub fn raw_data_filter() -> Targets {
    Targets::new().with_target(RAW_TARGET, Level::DEBUG)
}

fn open_append(path: &Path) -> Result<Mutex<File>> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Could not open log file: {}", path.display()))?;
    Ok(Mutex::new(file))
}

pub fn init_logging(verbose: bool, error_log: Option<&Path>, raw_log: Option<&Path>) -> Result<()> {
    let default = if verbose { "subdrill=debug" } else { "subdrill=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_filter(filter);

    let error_layer = match error_log {
        Some(path) => Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(open_append(path)?)
                .with_filter(LevelFilter::ERROR),
        ),
        None => None,
    };

    let raw_layer = match raw_log {
        Some(path) => Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(open_append(path)?)
                .with_filter(raw_data_filter()),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(error_layer)
        .with(raw_layer)
        .init();
    Ok(())
}
