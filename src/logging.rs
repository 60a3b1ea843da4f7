//! Tracing setup.
//!
//! Console output belongs to the command prompt, so logs go to a daily
//! rolling file under the data directory unless `--log-stderr` is given.

use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "cvsync=info";

/// Directory holding the rolling log files.
pub fn log_dir() -> Option<PathBuf> {
  dirs::data_local_dir().map(|d| d.join("cvsync").join("logs"))
}

/// Install the global subscriber. Keep the returned guard alive for the
/// lifetime of the process so buffered lines are flushed.
pub fn init(log_stderr: bool) -> Result<WorkerGuard> {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

  let (writer, guard) = if log_stderr {
    tracing_appender::non_blocking(std::io::stderr())
  } else {
    let dir = log_dir().ok_or_else(|| eyre!("Could not determine a data directory for logs"))?;
    std::fs::create_dir_all(&dir)
      .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;
    tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "cvsync.log"))
  };

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .with_ansi(log_stderr)
    .with_writer(writer)
    .try_init()
    .map_err(|e| eyre!("Failed to initialise logging: {}", e))?;

  Ok(guard)
}
