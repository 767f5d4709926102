// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! CLI argument definitions using Clap
//!
//! Defines all command-line arguments and subcommands for Graphmind.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Graphmind - chat with an LLM that can search the web and your knowledge graph
#[derive(Parser, Debug)]
#[command(name = "graphmind")]
#[command(version, about = "Chat with an LLM backed by web search and a knowledge graph")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Settings file path (defaults to ~/.graphmind/settings.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start interactive chat session (default when no command given)
    Chat(ChatArgs),

    /// Check that the configured API is reachable
    #[command(alias = "test")]
    TestConnection(ProviderArgs),

    /// List the models the configured API offers
    Models(ProviderArgs),
}

/// Driver overrides shared by the subcommands
#[derive(clap::Args, Debug, Default, Clone)]
pub struct ProviderArgs {
    /// API protocol to use (anthropic, openai)
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Model to use
    #[arg(short, long)]
    pub model: Option<String>,
}

/// Arguments for the chat subcommand
#[derive(clap::Args, Debug, Default)]
pub struct ChatArgs {
    /// Initial prompt (optional)
    pub prompt: Option<String>,

    #[command(flatten)]
    pub provider: ProviderArgs,

    /// Start with web search enabled
    #[arg(long)]
    pub web_search: bool,

    /// Attach a document the model can read
    #[arg(long, value_name = "PATH")]
    pub doc: Option<PathBuf>,

    /// Upper bound on tool rounds per turn
    #[arg(long, value_name = "N")]
    pub max_tool_rounds: Option<usize>,
}

/// Output format
#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
