//! Abacus CLI entry point.

use abacus::cli::commands::{self, SolveOptions};
use abacus::cli::{Cli, Commands};
use abacus::config::Settings;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up GROQ_API_KEY and friends from a local .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.as_deref().map(Settings::expand_path);
    let settings = Settings::load_from(config_path.as_ref())?;

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.clone(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("abacus={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    run(cli.command, settings, config_path).await
}

async fn run(command: Commands, settings: Settings, config_path: Option<PathBuf>) -> Result<()> {
    match command {
        Commands::Init => {
            commands::run_init(&settings, config_path.as_ref())?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings, config_path.as_ref())?;
        }

        Commands::Solve {
            problem,
            model,
            temperature,
            no_reasoning,
            tools,
            example,
            api_key,
            json,
        } => {
            let options = SolveOptions {
                problem,
                model,
                temperature,
                no_reasoning,
                tools,
                example,
                api_key,
                json,
            };
            commands::run_solve(options, settings).await?;
        }

        Commands::Chat { model, api_key } => {
            commands::run_chat(model, api_key, settings).await?;
        }

        Commands::Examples => {
            commands::run_examples();
        }

        Commands::Models => {
            commands::run_models(&settings);
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host, port, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(&action, settings, config_path.as_ref())?;
        }
    }

    Ok(())
}
