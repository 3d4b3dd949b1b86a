#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::FmtSubscriber;
use tutor_gateway::{Config, gateway};

/// `tutor-gateway` - AI tutoring chat gateway.
#[derive(Parser, Debug)]
#[command(name = "tutor-gateway")]
#[command(version)]
#[command(about = "Context-aware tutoring chat over OpenAI and Anthropic.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Config file (default: ~/.tutor-gateway/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Port to listen on (use 0 for random available port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
    },

    /// Write a default config file
    InitConfig {
        /// Target path (default: ~/.tutor-gateway/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, port, host } => {
            let mut config = Config::load(config.as_deref())?;
            if let Some(port) = port {
                config.gateway.port = port;
            }
            if let Some(host) = host {
                config.gateway.host = host;
            }

            let subscriber = FmtSubscriber::builder()
                .with_max_level(config.observability.level())
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("install tracing subscriber")?;
            config.apply_locale();

            gateway::run_gateway(config).await
        }
        Commands::InitConfig { config, force } => {
            let path = config.unwrap_or_else(Config::default_path);
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (pass --force to overwrite)",
                    path.display()
                );
            }
            let config = Config {
                config_path: path.clone(),
                ..Config::default()
            };
            config.save()?;
            println!("Wrote {}", path.display());
            Ok(())
        }
    }
}
