// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Settings management for graphmind
//!
//! Handles loading and saving settings from ~/.graphmind/settings.json

use serde::{Deserialize, Serialize};

mod io;
mod migration;
mod validation;

/// Main settings structure, stored in ~/.graphmind/settings.json
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// LLM endpoint configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Web search (Whoogle) configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Knowledge-graph backend configuration
    #[serde(default)]
    pub graph: GraphConfig,

    /// Conversation loop settings
    #[serde(default)]
    pub chat: ChatConfig,
}

/// LLM endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Wire protocol family: "anthropic" or "openai"
    #[serde(default = "default_api_type")]
    pub api_type: String,

    /// Base URL for the API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// API key (if stored directly, not recommended)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable name for API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Maximum tokens for a response
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Context window of the configured model
    #[serde(default = "default_context_window")]
    pub context_window: u32,

    /// Extra system rules sent with every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_rules: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_type: default_api_type(),
            api_url: None,
            api_key: None,
            api_key_env: default_api_key_env(),
            model: None,
            max_output_tokens: default_max_output_tokens(),
            context_window: default_context_window(),
            system_rules: None,
        }
    }
}

/// Whoogle search configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SearchConfig {
    /// Whoogle instance URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whoogle_url: Option<String>,

    /// Send a bearer token with search requests
    #[serde(default)]
    pub auth_enabled: bool,

    /// Bearer token for the search instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_key: Option<String>,

    /// Whether new chats start with web search enabled
    #[serde(default)]
    pub default_enabled: bool,
}

/// Knowledge-graph REST backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GraphConfig {
    /// Base URL of the graph service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Bearer token for the graph service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Conversation loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Maximum number of tool rounds in one turn
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_tool_rounds(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_api_type() -> String {
    "anthropic".to_string()
}

fn default_api_key_env() -> String {
    "GRAPHMIND_LLM_API_KEY".to_string()
}

fn default_max_output_tokens() -> u32 {
    4096
}

fn default_context_window() -> u32 {
    128_000
}

fn default_max_tool_rounds() -> usize {
    10
}

fn default_request_timeout_secs() -> u64 {
    120
}
