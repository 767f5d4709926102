// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Graphmind - chat with an LLM backed by web search and a knowledge graph
//!
//! Entry point for the Graphmind CLI application.

use anyhow::Context;
use clap::Parser;

use graphmind::cli::{ChatArgs, Cli, Commands, ProviderArgs};
use graphmind::config::Settings;

#[path = "main/cli_commands.rs"]
mod cli_commands;
#[path = "main/repl.rs"]
mod repl;

use cli_commands::{run_models, run_test_connection};
use repl::run_chat;

/// Tracing filter for the requested verbosity. `RUST_LOG` still takes precedence.
fn env_filter(verbose: u8) -> tracing_subscriber::EnvFilter {
    let default = match verbose {
        0 => "warn",
        1 => "warn,graphmind=debug",
        _ => "warn,graphmind=trace",
    };
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default))
}

/// Apply command-line driver overrides on top of the settings file
fn apply_provider_args(settings: &mut Settings, args: &ProviderArgs) {
    if let Some(provider) = &args.provider {
        settings.llm.api_type = provider.clone();
    }
    if let Some(model) = &args.model {
        settings.llm.model = Some(model.clone());
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(cli.verbose))
        .with_writer(std::io::stderr)
        .init();

    // Load settings
    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => Settings::load().context("failed to load settings")?,
    };

    let format = cli.format;
    match cli.command {
        None => run_chat(ChatArgs::default(), settings).await,
        Some(Commands::Chat(args)) => {
            apply_provider_args(&mut settings, &args.provider);
            run_chat(args, settings).await
        }
        Some(Commands::TestConnection(args)) => {
            apply_provider_args(&mut settings, &args);
            run_test_connection(&settings, &format).await
        }
        Some(Commands::Models(args)) => {
            apply_provider_args(&mut settings, &args);
            run_models(&settings, &format).await
        }
    }
}
