// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Anthropic Messages API driver
//!
//! Implements the LlmProvider trait for the Anthropic wire protocol:
//! system prompt as a top-level field, tool calls and tool results as
//! content blocks, and `content_block_*` stream events.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, GraphmindError, Result};
use crate::llm::cancel::{CancellationHandle, CancellationSlot};
use crate::llm::message::{Message, Role, ToolCall};
use crate::llm::provider::{
    ChatResponse, ConnectionTestResult, DriverConfig, LlmProvider, ModelsList, ModelsSource,
    StopReason, StreamChunk, ToolDefinition,
};
use crate::llm::stream::{self, FrameDecoder, FrameEvent, StreamParser};

use super::common;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic has no public listing endpoint for every deployment, so the
/// driver ships a fixed list.
const CURATED_MODELS: &[&str] = &[
    "claude-sonnet-4-20250514",
    "claude-opus-4-20250514",
    "claude-3-7-sonnet-20250219",
    "claude-3-5-haiku-20241022",
];

/// Anthropic-style driver
pub struct AnthropicProvider {
    client: Client,
    config: DriverConfig,
    cancel: CancellationSlot,
}

impl AnthropicProvider {
    /// Create a new Anthropic driver
    pub fn new(config: DriverConfig) -> Result<Self> {
        Ok(Self {
            client: common::build_client(config.timeout)?,
            config,
            cancel: CancellationSlot::default(),
        })
    }

    /// `{base}/v1/messages`, tolerating a base that already ends in `/v1`
    fn messages_url(&self) -> String {
        let base = self.config.base_url();
        if base.ends_with("/v1") {
            format!("{}/messages", base)
        } else {
            format!("{}/v1/messages", base)
        }
    }

    /// Convert history to Anthropic format, pulling system text out.
    fn convert_messages(&self, messages: &[Message]) -> (Option<String>, Vec<AnthropicMessage>) {
        let mut system: Vec<&str> = self.config.system_rules.iter().map(String::as_str).collect();
        let mut converted: Vec<AnthropicMessage> = Vec::with_capacity(messages.len());

        for m in messages {
            match m.role {
                Role::System => system.push(&m.content),
                Role::User => converted.push(AnthropicMessage {
                    role: "user".to_string(),
                    content: AnthropicContent::Text(m.content.clone()),
                }),
                Role::Assistant if m.has_tool_calls() => {
                    let mut blocks = Vec::with_capacity(m.tool_calls.len() + 1);
                    if !m.content.trim().is_empty() {
                        blocks.push(AnthropicContentBlock::Text {
                            text: m.content.clone(),
                        });
                    }
                    blocks.extend(m.tool_calls.iter().map(|call| AnthropicContentBlock::ToolUse {
                        id: call.id.clone(),
                        name: call.function.name.clone(),
                        input: call
                            .parsed_arguments()
                            .unwrap_or_else(|_| serde_json::json!({})),
                    }));
                    converted.push(AnthropicMessage {
                        role: "assistant".to_string(),
                        content: AnthropicContent::Blocks(blocks),
                    });
                }
                Role::Assistant => converted.push(AnthropicMessage {
                    role: "assistant".to_string(),
                    content: AnthropicContent::Text(m.content.clone()),
                }),
                Role::Tool => {
                    let block = AnthropicContentBlock::ToolResult {
                        tool_use_id: m.tool_call_id.clone().unwrap_or_default(),
                        content: m.content.clone(),
                        is_error: None,
                    };
                    // Results for one assistant turn travel in a single user message.
                    match converted.last_mut() {
                        Some(AnthropicMessage {
                            role,
                            content: AnthropicContent::Blocks(blocks),
                        }) if role.as_str() == "user"
                            && blocks
                                .iter()
                                .all(|b| matches!(b, AnthropicContentBlock::ToolResult { .. })) =>
                        {
                            blocks.push(block)
                        }
                        _ => converted.push(AnthropicMessage {
                            role: "user".to_string(),
                            content: AnthropicContent::Blocks(vec![block]),
                        }),
                    }
                }
            }
        }

        let system = system
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        ((!system.is_empty()).then_some(system), converted)
    }

    /// Anthropic wants `name` at the top level and the schema as `input_schema`.
    fn convert_tools(tools: &[ToolDefinition]) -> Vec<AnthropicTool> {
        tools
            .iter()
            .map(|t| AnthropicTool {
                name: t.function.name.clone(),
                description: t.function.description.clone(),
                input_schema: t.function.parameters.clone(),
            })
            .collect()
    }

    /// Build the request body
    fn build_request(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        stream: bool,
    ) -> AnthropicRequest {
        let (system, messages) = self.convert_messages(messages);
        AnthropicRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            system,
            messages,
            tools: (!tools.is_empty()).then(|| Self::convert_tools(tools)),
            stream: stream.then_some(true),
        }
    }

    /// Parse an error response, preferring Anthropic's own error type
    fn parse_error(status: u16, body: &str, retry_after: Option<u64>) -> GraphmindError {
        let Ok(error_response) = serde_json::from_str::<AnthropicError>(body) else {
            return common::classify(status, body, retry_after);
        };
        let message = error_response.error.message;
        match error_response.error.error_type.as_str() {
            "authentication_error" | "permission_error" => {
                GraphmindError::Api(ApiError::AuthenticationFailed)
            }
            "rate_limit_error" => {
                GraphmindError::Api(ApiError::RateLimited(retry_after.unwrap_or(10) as u32))
            }
            "not_found_error" => GraphmindError::Api(ApiError::NotFound(message)),
            "overloaded_error" | "api_error" => GraphmindError::Api(ApiError::ServerError {
                status: status.max(500),
                message,
            }),
            _ => GraphmindError::Api(ApiError::from_status(status, &message, retry_after)),
        }
    }

    async fn post(&self, body: &AnthropicRequest) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(common::network_error)?;
        common::ensure_success(response, Self::parse_error).await
    }

    fn convert_response(response: AnthropicResponse) -> ChatResponse {
        let mut message = String::new();
        let mut tool_calls = Vec::new();
        for block in response.content {
            match block {
                AnthropicContentBlock::Text { text } => message.push_str(&text),
                AnthropicContentBlock::ToolUse { id, name, input } => {
                    tool_calls.push(ToolCall::new(id, name, input.to_string()))
                }
                AnthropicContentBlock::ToolResult { .. } | AnthropicContentBlock::Unknown => {}
            }
        }
        ChatResponse {
            message,
            tool_calls,
            stop_reason: response.stop_reason.as_deref().map(StopReason::from_anthropic),
            cancelled: false,
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn test_connection(&self) -> ConnectionTestResult {
        if let Err(e) = self.config.validate() {
            return ConnectionTestResult::failed(&e);
        }

        let body = AnthropicRequest {
            model: self.config.model.clone(),
            max_tokens: 1,
            system: None,
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: AnthropicContent::Text("Hi".to_string()),
            }],
            tools: None,
            stream: None,
        };

        match self.post(&body).await {
            Ok(_) => {
                tracing::info!(target: "graphmind.llm.anthropic", model = %self.config.model, "connection ok");
                ConnectionTestResult::ok(format!(
                    "Connected to Anthropic API, model {} is available",
                    self.config.model
                ))
            }
            Err(e) => {
                tracing::warn!(target: "graphmind.llm.anthropic", error = %e, "connection test failed");
                ConnectionTestResult::failed(&e)
            }
        }
    }

    async fn send_message(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ChatResponse> {
        self.config.validate()?;
        if self.cancel.is_cancelled() {
            return Err(GraphmindError::Cancelled);
        }

        let body = self.build_request(messages, tools, false);
        tracing::debug!(
            target: "graphmind.llm.anthropic",
            messages = body.messages.len(),
            tools = tools.len(),
            "sending message"
        );

        let response = self.post(&body).await?;
        let api_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| GraphmindError::Api(ApiError::InvalidResponse(e.to_string())))?;

        if self.cancel.is_cancelled() {
            return Err(GraphmindError::Cancelled);
        }
        Ok(Self::convert_response(api_response))
    }

    async fn send_message_stream(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        on_chunk: &mut (dyn FnMut(StreamChunk) + Send),
    ) -> Result<ChatResponse> {
        self.config.validate()?;
        if self.cancel.is_cancelled() {
            return Err(GraphmindError::Cancelled);
        }

        let body = self.build_request(messages, tools, true);
        tracing::debug!(
            target: "graphmind.llm.anthropic",
            messages = body.messages.len(),
            tools = tools.len(),
            "sending streaming message"
        );

        let response = self.post(&body).await?;
        stream::drive(
            response.bytes_stream(),
            StreamParser::new(AnthropicDecoder),
            &self.cancel,
            on_chunk,
        )
        .await
    }

    async fn fetch_models_list(&self) -> Result<ModelsList> {
        Ok(ModelsList {
            models: CURATED_MODELS.iter().map(|m| m.to_string()).collect(),
            source: ModelsSource::Curated,
        })
    }

    fn set_cancellation_handle(&self, handle: Option<CancellationHandle>) {
        self.cancel.set(handle);
    }
}

/// Decoder for Anthropic `data:` payloads
#[derive(Debug, Default)]
pub struct AnthropicDecoder;

impl FrameDecoder for AnthropicDecoder {
    fn decode(&mut self, payload: &serde_json::Value) -> Vec<FrameEvent> {
        match payload["type"].as_str() {
            Some("content_block_start") => {
                let block = &payload["content_block"];
                match block["type"].as_str() {
                    Some("tool_use") => vec![FrameEvent::ToolCallStart {
                        slot: None,
                        id: block["id"].as_str().unwrap_or_default().to_string(),
                        name: block["name"].as_str().unwrap_or_default().to_string(),
                    }],
                    Some("text") => match block["text"].as_str() {
                        Some(text) if !text.is_empty() => {
                            vec![FrameEvent::TextDelta(text.to_string())]
                        }
                        _ => vec![],
                    },
                    _ => vec![],
                }
            }
            Some("content_block_delta") => {
                let delta = &payload["delta"];
                match delta["type"].as_str() {
                    Some("text_delta") => vec![FrameEvent::TextDelta(
                        delta["text"].as_str().unwrap_or_default().to_string(),
                    )],
                    Some("input_json_delta") => vec![FrameEvent::ArgumentsDelta {
                        slot: None,
                        fragment: delta["partial_json"].as_str().unwrap_or_default().to_string(),
                    }],
                    _ => vec![],
                }
            }
            Some("message_delta") => payload["delta"]["stop_reason"]
                .as_str()
                .map(|r| vec![FrameEvent::Stop(StopReason::from_anthropic(r))])
                .unwrap_or_default(),
            Some("message_stop") => vec![FrameEvent::End],
            Some("error") => vec![FrameEvent::Error(
                payload["error"]["message"]
                    .as_str()
                    .unwrap_or("unknown stream error")
                    .to_string(),
            )],
            _ => vec![],
        }
    }
}

// Anthropic API types

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<AnthropicTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: AnthropicContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum AnthropicContent {
    Text(String),
    Blocks(Vec<AnthropicContentBlock>),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
    /// Block types this driver does not use (thinking, images, ...)
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicContentBlock>,
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorDetail {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}
