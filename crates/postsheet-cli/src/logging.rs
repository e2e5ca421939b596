// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! File-backed tracing setup. The terminal belongs to the TUI, so nothing is
//! ever written to stdout or stderr; follow the log with `tail -f`.

use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::Path;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Installs the global subscriber writing to `log_path`. Honors `RUST_LOG`.
pub fn init(log_path: &Path) -> Result<()> {
    let directory = log_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(directory)
        .with_context(|| format!("create log directory {}", directory.display()))?;

    let file_name = log_path
        .file_name()
        .ok_or_else(|| anyhow!("log path {} has no file name; set [log].path", log_path.display()))?;

    let appender = tracing_appender::rolling::never(directory, file_name);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(appender)
        .with_ansi(false)
        .try_init()
        .map_err(|error| anyhow!("install log subscriber: {error}"))
}
