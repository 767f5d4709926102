// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! LLM Provider trait and related types
//!
//! Defines the contract every wire-protocol driver implements, plus the
//! normalized response, chunk and tool-definition types that cross it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Settings;
use crate::error::{GraphmindError, Result};
use crate::llm::cancel::CancellationHandle;
use crate::llm::message::{Message, ToolCall};

/// Main trait for LLM drivers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name (e.g., "anthropic", "openai")
    fn name(&self) -> &str;

    /// Model requests are sent to
    fn model(&self) -> &str;

    /// Validate configuration, then perform a minimal round trip.
    /// Never returns an error; failures are described in the result.
    async fn test_connection(&self) -> ConnectionTestResult;

    /// Single request/response
    async fn send_message(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ChatResponse>;

    /// Streaming request. `on_chunk` sees every text fragment in arrival
    /// order; the collapsed response is returned when the stream ends or
    /// the current cancellation handle fires.
    async fn send_message_stream(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        on_chunk: &mut (dyn FnMut(StreamChunk) + Send),
    ) -> Result<ChatResponse>;

    /// Available model identifiers
    async fn fetch_models_list(&self) -> Result<ModelsList>;

    /// Associate the in-flight request with a cancellation handle
    fn set_cancellation_handle(&self, handle: Option<CancellationHandle>);
}

/// Connection settings shared by every driver
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub system_rules: Option<String>,
    pub timeout: Duration,
}

impl DriverConfig {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 4096,
            system_rules: None,
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_system_rules(mut self, rules: impl Into<String>) -> Self {
        self.system_rules = Some(rules.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build from settings. Missing values become empty strings so that
    /// `validate` can report them without touching the network.
    pub fn from_settings(settings: &Settings) -> Self {
        let mut config = Self::new(
            settings.llm.api_url.clone().unwrap_or_default(),
            settings.llm_api_key().unwrap_or_default(),
            settings.llm.model.clone().unwrap_or_default(),
        )
        .with_max_tokens(settings.llm.max_output_tokens)
        .with_timeout(Duration::from_secs(settings.chat.request_timeout_secs));
        config.system_rules = settings
            .llm
            .system_rules
            .clone()
            .filter(|r| !r.trim().is_empty());
        config
    }

    /// Endpoint, then key, then model must be non-empty
    pub fn validate(&self) -> Result<()> {
        if self.api_url.trim().is_empty() {
            return Err(GraphmindError::Config("API URL is not set".to_string()));
        }
        if self.api_key.trim().is_empty() {
            return Err(GraphmindError::Config("API key is not set".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(GraphmindError::Config("model name is not set".to_string()));
        }
        Ok(())
    }

    /// Base URL without trailing slashes
    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}

/// Collapsed result of one driver call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatResponse {
    /// Text produced by the model (possibly partial)
    pub message: String,

    /// Completed tool calls, in the order the model emitted them
    pub tool_calls: Vec<ToolCall>,

    pub stop_reason: Option<StopReason>,

    /// The stream stopped early because the cancellation handle fired
    pub cancelled: bool,
}

impl ChatResponse {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stop_reason: Some(StopReason::EndTurn),
            ..Default::default()
        }
    }

    pub fn with_tool_calls(message: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            message: message.into(),
            tool_calls,
            stop_reason: Some(StopReason::ToolUse),
            cancelled: false,
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Ephemeral piece of a streaming response
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    /// A text fragment
    Text(String),
    /// A tool call whose arguments are complete
    ToolUse(ToolCall),
    /// A unit of the stream was dropped
    Error(String),
}

/// Reason the model stopped generating
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    ToolUse,
    StopSequence,
    Other(String),
}

impl StopReason {
    /// Map an Anthropic-style `stop_reason`
    pub fn from_anthropic(reason: &str) -> Self {
        match reason {
            "end_turn" => StopReason::EndTurn,
            "max_tokens" => StopReason::MaxTokens,
            "tool_use" => StopReason::ToolUse,
            "stop_sequence" => StopReason::StopSequence,
            other => StopReason::Other(other.to_string()),
        }
    }

    /// Map an OpenAI-style `finish_reason`
    pub fn from_openai(reason: &str) -> Self {
        match reason {
            "stop" => StopReason::EndTurn,
            "length" => StopReason::MaxTokens,
            "tool_calls" | "function_call" => StopReason::ToolUse,
            other => StopReason::Other(other.to_string()),
        }
    }
}

/// Canonical tool definition, OpenAI function-calling shape
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }
}

/// Outcome of `test_connection`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionTestResult {
    pub success: bool,
    /// Plain-language summary
    pub message: String,
    /// Raw detail for logs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnectionTestResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error: None,
        }
    }

    pub fn failed(err: &GraphmindError) -> Self {
        Self {
            success: false,
            message: err.user_message(),
            error: Some(err.to_string()),
        }
    }
}

/// Where a model list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelsSource {
    /// Returned by the provider's models endpoint
    Live,
    /// Static list shipped with the driver
    Curated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelsList {
    pub models: Vec<String>,
    pub source: ModelsSource,
}
