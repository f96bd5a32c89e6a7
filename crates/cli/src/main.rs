//! ADSM CLI - Command-line front end for security model loading
//!
//! Usage:
//!   adsm validate <model>         - Load a model and report every error
//!   adsm adm <model> [--json]     - Print the decision-model pointer mapping
//!   adsm stats <model>            - List externals, entities, roles and flows

use anyhow::Context;
use clap::{Parser, Subcommand};
use cli::commands::{AdmCommand, StatsCommand, ValidateCommand};
use shared::LoaderConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "adsm")]
#[command(about = "ADSM - Security model reference resolution")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Loader configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// ADDB location used when a model does not name one
    #[arg(long, global = true)]
    addb: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a security model and report every error
    Validate(ValidateCommand),
    /// Print the decision-model pointers of a security model
    Adm(AdmCommand),
    /// Summarize the members of a security model
    Stats(StatsCommand),
}

impl Cli {
    fn loader_config(&self) -> anyhow::Result<LoaderConfig> {
        let mut config = match &self.config {
            Some(path) => LoaderConfig::from_file(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?,
            None => LoaderConfig::default(),
        };
        if let Some(addb) = &self.addb {
            config = config.with_default_store(addb.clone());
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = cli.loader_config()?;

    match &cli.command {
        Commands::Validate(cmd) => cmd.run(config),
        Commands::Adm(cmd) => cmd.run(config),
        Commands::Stats(cmd) => cmd.run(config),
    }
}
