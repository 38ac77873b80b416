pub mod commands;
pub mod index;
pub mod models;
pub mod oura;
pub mod reconcile;
pub mod stats;

#[cfg(test)]
mod test_utils;

use clap::Parser;
use commands::Cli;
use oura::{OuraClient, OuraConfig};
use tracing::error;
use tracing_subscriber::EnvFilter;

pub fn run() {
  // Load environment variables from .env file
  dotenvy::dotenv().ok();

  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();

  let runtime = match tokio::runtime::Runtime::new() {
    Ok(runtime) => runtime,
    Err(e) => {
      error!(error = %e, "Failed to start async runtime");
      std::process::exit(1);
    }
  };

  if let Err(e) = runtime.block_on(run_cli(&cli)) {
    error!(error = %e, "oura-trends failed");
    std::process::exit(1);
  }
}

async fn run_cli(cli: &Cli) -> Result<(), commands::CommandError> {
  let config = OuraConfig::from_env()?;
  let client = OuraClient::new(&config);

  let report = commands::execute(cli, &client).await?;
  println!("{}", serde_json::to_string_pretty(&report)?);
  Ok(())
}
