// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parlor - a local chat session manager for on-device language models.
//!
//! This is the binary entry point.

mod app;
mod engine;
mod shell;
mod status;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use parlor_core::{FileSource, ParlorError};
use parlor_model::DefaultModelState;

use crate::app::App;

/// Parlor - a local chat session manager for on-device language models.
#[derive(Parser, Debug)]
#[command(name = "parlor", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Launch the interactive chat REPL (default).
    Chat,
    /// Show the model and conversation summary.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
    /// Download the default model and wait for it to finish.
    Download,
    /// Delete the default model file.
    DeleteModel,
    /// Use a local model file.
    UseModel {
        path: PathBuf,
        /// Copy the file into the cache directory first.
        #[arg(long)]
        copy: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => parlor_config::load_and_validate_path(path),
        None => parlor_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            parlor_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.app.log_level);

    if let Err(e) = run(cli.command.unwrap_or(Commands::Chat), config).await {
        eprintln!("{}: {e}", "error".red());
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: parlor_config::ParlorConfig) -> Result<(), ParlorError> {
    let app = App::start(config).await?;
    let result = match command {
        Commands::Chat => shell::run_shell(&app).await,
        Commands::Status { json, plain } => status::run_status(&app, json, plain).await,
        Commands::Download => download(&app).await,
        Commands::DeleteModel => {
            if app.manager.delete_default_model().await {
                println!("default model deleted");
            } else {
                println!("default model not present");
            }
            Ok(())
        }
        Commands::UseModel { path, copy } => use_model(&app, path, copy).await,
    };
    app.shutdown().await;
    result
}

async fn download(app: &App) -> Result<(), ParlorError> {
    let id = app.manager.start_default_download().await?;
    println!(
        "downloading {} ({id})",
        app.manager.paths().default_model_url
    );

    loop {
        tokio::time::sleep(Duration::from_millis(500)).await;
        match app.manager.refresh_download_status().await {
            DefaultModelState::Downloading(_) => continue,
            DefaultModelState::Downloaded => {
                println!("{}", "default model ready".green());
                return Ok(());
            }
            DefaultModelState::Absent => {
                return Err(ParlorError::download("default model download failed"));
            }
        }
    }
}

async fn use_model(app: &App, path: PathBuf, copy: bool) -> Result<(), ParlorError> {
    let active = if copy {
        let imported = app
            .manager
            .import_custom_model(Arc::new(FileSource::new(&path)))
            .await;
        if imported.is_empty() {
            return Err(ParlorError::Internal(format!(
                "could not copy {} into the cache",
                path.display()
            )));
        }
        imported
    } else {
        let absolute = shell::absolute_model_path(&path)?;
        app.manager.set_model_path(absolute.clone()).await?;
        absolute
    };

    let status = app.manager.status().await;
    if status.engine_loaded {
        println!("using {active}");
    } else {
        println!("{}", format!("saved {active}, but it could not be loaded").yellow());
    }
    Ok(())
}

/// Initialize the tracing subscriber. Logs go to stderr so they do not
/// interleave with REPL output on stdout.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("parlor={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_chat() {
        let cli = Cli::parse_from(["parlor"]);
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn use_model_flags_parse() {
        let cli = Cli::parse_from(["parlor", "use-model", "--copy", "/m/a.gguf", "--config", "/c.toml"]);
        match cli.command {
            Some(Commands::UseModel { path, copy }) => {
                assert_eq!(path, PathBuf::from("/m/a.gguf"));
                assert!(copy);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(cli.config, Some(PathBuf::from("/c.toml")));
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = parlor_config::load_and_validate_str("").expect("default config should be valid");
        assert_eq!(config.app.name, "parlor");
    }
}
