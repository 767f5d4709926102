// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! OpenAI-compatible Chat Completions driver
//!
//! Implements the LlmProvider trait for any endpoint speaking the OpenAI
//! chat-completions protocol (OpenAI, OpenRouter, vLLM, llama-server, ...).

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

/// OpenAI-style driver
pub struct OpenAiProvider {
    client: Client,
    config: DriverConfig,
    cancel: CancellationSlot,
}

impl OpenAiProvider {
    /// Create a new OpenAI-compatible driver
    pub fn new(config: DriverConfig) -> Result<Self> {
        Ok(Self {
            client: common::build_client(config.timeout)?,
            config,
            cancel: CancellationSlot::default(),
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url())
    }

    fn models_url(&self) -> String {
        format!("{}/models", self.config.base_url())
    }

    /// Convert history to OpenAI format. Roles map one to one; configured
    /// system rules lead the list.
    fn convert_messages(&self, messages: &[Message]) -> Vec<OpenAiMessage> {
        let mut result = Vec::with_capacity(messages.len() + 1);

        if let Some(rules) = &self.config.system_rules {
            result.push(OpenAiMessage::text("system", rules));
        }

        for m in messages {
            let converted = match m.role {
                Role::Assistant if m.has_tool_calls() => OpenAiMessage {
                    role: "assistant".to_string(),
                    content: (!m.content.is_empty()).then(|| m.content.clone()),
                    tool_calls: Some(m.tool_calls.clone()),
                    tool_call_id: None,
                },
                Role::Tool => OpenAiMessage {
                    role: "tool".to_string(),
                    content: Some(m.content.clone()),
                    tool_calls: None,
                    tool_call_id: m.tool_call_id.clone(),
                },
                role => OpenAiMessage::text(role.as_str(), &m.content),
            };
            result.push(converted);
        }

        result
    }

    /// Build the request body. Tools pass through in their canonical shape.
    fn build_request(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        stream: bool,
    ) -> OpenAiRequest {
        let has_tools = !tools.is_empty();
        OpenAiRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            messages: self.convert_messages(messages),
            tools: has_tools.then(|| tools.to_vec()),
            tool_choice: has_tools.then(|| "auto".to_string()),
            stream: stream.then_some(true),
        }
    }

    /// Parse an error response
    fn parse_error(status: u16, body: &str, retry_after: Option<u64>) -> GraphmindError {
        if let Ok(error_response) = serde_json::from_str::<OpenAiError>(body) {
            match error_response.error.code.as_deref() {
                Some("invalid_api_key") => return GraphmindError::Api(ApiError::AuthenticationFailed),
                Some("model_not_found") => {
                    return GraphmindError::Api(ApiError::NotFound(error_response.error.message))
                }
                _ => {}
            }
        }
        common::classify(status, body, retry_after)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
    }

    async fn post(&self, body: &OpenAiRequest) -> Result<reqwest::Response> {
        let response = self
            .authorized(self.client.post(self.completions_url()))
            .json(body)
            .send()
            .await
            .map_err(common::network_error)?;
        common::ensure_success(response, Self::parse_error).await
    }

    fn convert_response(response: OpenAiResponse) -> Result<ChatResponse> {
        let choice = response.choices.into_iter().next().ok_or_else(|| {
            GraphmindError::Api(ApiError::InvalidResponse("response has no choices".to_string()))
        })?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| {
                // Some servers return arguments as an object instead of a string.
                let arguments = match tc.function.arguments {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                };
                ToolCall::new(tc.id, tc.function.name, arguments)
            })
            .collect();

        Ok(ChatResponse {
            message: choice.message.content.unwrap_or_default(),
            tool_calls,
            stop_reason: choice.finish_reason.as_deref().map(StopReason::from_openai),
            cancelled: false,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn test_connection(&self) -> ConnectionTestResult {
        if let Err(e) = self.config.validate() {
            return ConnectionTestResult::failed(&e);
        }

        let body = OpenAiRequest {
            model: self.config.model.clone(),
            max_tokens: 1,
            messages: vec![OpenAiMessage::text("user", "Hi")],
            tools: None,
            tool_choice: None,
            stream: None,
        };

        match self.post(&body).await {
            Ok(_) => {
                tracing::info!(target: "graphmind.llm.openai", model = %self.config.model, "connection ok");
                ConnectionTestResult::ok(format!(
                    "Connected to OpenAI-compatible API, model {} is available",
                    self.config.model
                ))
            }
            Err(e) => {
                tracing::warn!(target: "graphmind.llm.openai", error = %e, "connection test failed");
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
            target: "graphmind.llm.openai",
            messages = body.messages.len(),
            tools = tools.len(),
            "sending message"
        );

        let response = self.post(&body).await?;
        let api_response: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| GraphmindError::Api(ApiError::InvalidResponse(e.to_string())))?;

        if self.cancel.is_cancelled() {
            return Err(GraphmindError::Cancelled);
        }
        Self::convert_response(api_response)
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
            target: "graphmind.llm.openai",
            messages = body.messages.len(),
            tools = tools.len(),
            "sending streaming message"
        );

        let response = self.post(&body).await?;
        stream::drive(
            response.bytes_stream(),
            StreamParser::new(OpenAiDecoder),
            &self.cancel,
            on_chunk,
        )
        .await
    }

    async fn fetch_models_list(&self) -> Result<ModelsList> {
        self.config.validate()?;

        let response = self
            .authorized(self.client.get(self.models_url()))
            .send()
            .await
            .map_err(common::network_error)?;
        let response = common::ensure_success(response, Self::parse_error).await?;
        let listing: OpenAiModelsResponse = response
            .json()
            .await
            .map_err(|e| GraphmindError::Api(ApiError::InvalidResponse(e.to_string())))?;

        let mut models: Vec<String> = listing.data.into_iter().map(|m| m.id).collect();
        models.sort();
        models.dedup();
        Ok(ModelsList {
            models,
            source: ModelsSource::Live,
        })
    }

    fn set_cancellation_handle(&self, handle: Option<CancellationHandle>) {
        self.cancel.set(handle);
    }
}

/// Decoder for OpenAI `chat.completion.chunk` payloads. Tool-call
/// fragments are keyed by their `index`; servers that omit it get their
/// fragments routed to the most recently opened call.
#[derive(Debug, Default)]
pub struct OpenAiDecoder;

impl FrameDecoder for OpenAiDecoder {
    fn decode(&mut self, payload: &serde_json::Value) -> Vec<FrameEvent> {
        let chunk = match OpenAiStreamChunk::deserialize(payload) {
            Ok(c) => c,
            Err(e) => {
                if let Some(message) = payload["error"]["message"].as_str() {
                    return vec![FrameEvent::Error(message.to_string())];
                }
                tracing::warn!(target: "graphmind.llm.openai", error = %e, "unexpected chunk shape");
                return Vec::new();
            }
        };

        let mut events = Vec::new();
        let Some(choice) = chunk.choices.into_iter().next() else {
            return events;
        };

        if let Some(text) = choice.delta.content {
            events.push(FrameEvent::TextDelta(text));
        }

        for tc in choice.delta.tool_calls.unwrap_or_default() {
            let slot = tc.index;
            let function = tc.function.unwrap_or_default();
            if tc.id.is_some() || function.name.is_some() {
                events.push(FrameEvent::ToolCallStart {
                    slot,
                    id: tc.id.unwrap_or_default(),
                    name: function.name.unwrap_or_default(),
                });
            }
            if let Some(fragment) = function.arguments {
                events.push(FrameEvent::ArgumentsDelta { slot, fragment });
            }
        }

        if let Some(reason) = choice.finish_reason {
            events.push(FrameEvent::Stop(StopReason::from_openai(&reason)));
        }

        events
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: String,
    /// Serialized as null for assistant turns that only call tools
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl OpenAiMessage {
    fn text(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.to_string()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseToolCall {
    id: String,
    function: OpenAiResponseFunction,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseFunction {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiModelsResponse {
    #[serde(default)]
    data: Vec<OpenAiModel>,
}

#[derive(Debug, Deserialize)]
struct OpenAiModel {
    id: String,
}

// Streaming types
#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    #[serde(default)]
    delta: OpenAiStreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAiStreamDelta {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiStreamToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamToolCall {
    index: Option<usize>,
    id: Option<String>,
    function: Option<OpenAiStreamFunction>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAiStreamFunction {
    name: Option<String>,
    arguments: Option<String>,
}
