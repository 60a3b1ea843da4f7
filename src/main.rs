mod api;
mod app;
mod cache;
mod commands;
mod config;
mod event;
mod logging;
mod push;
mod query;
mod record;
mod render;
mod router;
mod store;
mod sync;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

use crate::query::View;

#[derive(Parser, Debug)]
#[command(name = "cvsync")]
#[command(about = "Live, cache-backed console over a remote CV store")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/cvsync/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// View to open: all, accepted, rejected, starred, gcms, shopify
  #[arg(short, long)]
  view: Option<View>,

  /// Log to stderr instead of the rolling log file
  #[arg(long)]
  log_stderr: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = logging::init(args.log_stderr)?;

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  // Override view if specified on command line
  let config = if let Some(view) = args.view {
    config::Config {
      default_view: view,
      ..config
    }
  } else {
    config
  };

  // Initialize and run the app
  let mut app = app::App::new(config)?;
  app.run().await?;

  Ok(())
}
