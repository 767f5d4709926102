// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Graphmind - conversational agent core with tool calling.
//!
//! This crate exposes the runtime used by the `graphmind` CLI (`src/main.rs`).
//!
//! Architecture highlights:
//! - `llm`: one driver contract over the Anthropic Messages and OpenAI Chat
//!   Completions protocols, and the stream parser both drivers share
//! - `tools`: the tool catalog, argument repair, and the executor that
//!   dispatches calls to web search, fetch, vault and knowledge-graph collaborators
//! - `chat`: session state, the turn controller running the tool loop, and
//!   the response filter
//! - `config`: settings file and environment lookup

pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod tools;

pub use error::{ApiError, GraphmindError, Result};
