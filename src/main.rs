#![allow(non_snake_case)]

mod cli;

use std::env;
use std::process;

use calendarBot::config::{log_level, AppConfig, BotSettings, ExtractionSettings};
use calendarBot::runtime;
use clap::Parser;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let config = match env::var("CONFIG_FILE") {
        Ok(path) => match AppConfig::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load configuration: {}", e);
                process::exit(1);
            }
        },
        Err(_) => AppConfig::from_env(),
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level(&config))))
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let settings = match BotSettings::load(&config) {
                Ok(settings) => settings,
                Err(e) => {
                    error!(error = %e, "invalid configuration");
                    process::exit(1);
                }
            };
            runtime::run_bot(settings).await;
        }
        Commands::Parse { text } => {
            let settings = match ExtractionSettings::load(&config) {
                Ok(settings) => settings,
                Err(e) => {
                    error!(error = %e, "invalid configuration");
                    process::exit(1);
                }
            };
            if let Err(e) = cli::parse_once(&settings, text).await {
                error!(error = %e, "extraction failed");
                process::exit(1);
            }
        }
    }
}
