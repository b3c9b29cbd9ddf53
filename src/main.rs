mod app;
mod cache;
mod config;
mod event;
mod form;
mod listing;
mod logging;
mod mutation;
mod query;
mod school;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gradedesk")]
#[command(about = "A terminal admin console for the teachers of a school grade-management service")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/gradedesk/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Base URL of the school service, overrides api.url
  #[arg(short, long)]
  url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(url) = args.url {
    config.api.url = url;
  }

  // Keep the guard alive so buffered log lines are flushed on exit
  let _log_guard = logging::init(&config.log)?;

  let mut app = app::App::new(&config)?;
  app.run().await?;

  Ok(())
}
