// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Mock LLM provider for testing
//!
//! Provides a scripted implementation of the LlmProvider trait that can be
//! used in tests without making real API calls. Each driver call consumes
//! the next scripted step; once the script runs out the last step repeats.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{ApiError, GraphmindError, Result};
use crate::llm::cancel::{CancellationHandle, CancellationSlot};
use crate::llm::message::{Message, ToolCall};
use crate::llm::provider::{
    ChatResponse, ConnectionTestResult, LlmProvider, ModelsList, ModelsSource, StopReason,
    StreamChunk, ToolDefinition,
};

/// Characters per streamed text chunk
const CHUNK_CHARS: usize = 10;

/// A mock LLM provider for testing
#[derive(Clone)]
pub struct MockProvider {
    /// Provider name
    name: String,
    /// Scripted steps
    steps: Arc<Mutex<Vec<MockStep>>>,
    /// Call counter
    call_count: Arc<AtomicUsize>,
    /// Recorded requests
    recorded_requests: Arc<Mutex<Vec<RecordedRequest>>>,
    /// Handle of the request in flight
    cancel: Arc<CancellationSlot>,
}

/// One scripted driver call
#[derive(Clone, Debug)]
pub enum MockStep {
    /// Answer normally
    Reply(MockResponse),
    /// Fail the way an HTTP response with this status would
    Status(u16),
    /// Fail with a network error
    Network(String),
    /// Stream the text, then fire the cancellation handle in flight
    CancelAfter(String),
}

/// A pre-configured response for the mock provider
#[derive(Clone, Debug, Default)]
pub struct MockResponse {
    /// Text content to return
    pub text: String,
    /// Tool calls to return
    pub tool_calls: Vec<MockToolCall>,
}

/// A mock tool call
#[derive(Clone, Debug)]
pub struct MockToolCall {
    /// Tool call ID
    pub id: String,
    /// Tool name
    pub name: String,
    /// Tool input (JSON)
    pub input: serde_json::Value,
}

/// What the provider was asked to do
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
    pub streaming: bool,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_calls: Vec::new(),
        }
    }

    /// A response calling one tool, with optional preceding text
    pub fn tool_call(
        text: impl Into<String>,
        name: impl Into<String>,
        input: serde_json::Value,
    ) -> Self {
        Self {
            text: text.into(),
            tool_calls: vec![MockToolCall::new(name, input)],
        }
    }

    fn to_chat_response(&self) -> ChatResponse {
        let tool_calls: Vec<ToolCall> = self
            .tool_calls
            .iter()
            .map(|c| ToolCall::new(&c.id, &c.name, c.input.to_string()))
            .collect();
        if tool_calls.is_empty() {
            ChatResponse::text(&self.text)
        } else {
            ChatResponse::with_tool_calls(&self.text, tool_calls)
        }
    }
}

impl MockToolCall {
    pub fn new(name: impl Into<String>, input: serde_json::Value) -> Self {
        Self {
            id: format!("toolu_{}", uuid::Uuid::new_v4().simple()),
            name: name.into(),
            input,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("Mock provider lock was poisoned, recovering");
        poisoned.into_inner()
    })
}

impl MockProvider {
    /// Create a new mock provider answering "Mock response"
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            steps: Arc::new(Mutex::new(vec![MockStep::Reply(MockResponse::text(
                "Mock response",
            ))])),
            call_count: Arc::new(AtomicUsize::new(0)),
            recorded_requests: Arc::new(Mutex::new(vec![])),
            cancel: Arc::new(CancellationSlot::default()),
        }
    }

    /// Create a mock provider with a custom name
    pub fn with_name(name: impl Into<String>) -> Self {
        let mut provider = Self::new();
        provider.name = name.into();
        provider
    }

    /// Replace the script
    pub fn with_steps(self, steps: Vec<MockStep>) -> Self {
        *lock(&self.steps) = steps;
        self
    }

    /// Queue plain-text responses (returned in order)
    pub fn with_responses(self, responses: Vec<MockResponse>) -> Self {
        self.with_steps(responses.into_iter().map(MockStep::Reply).collect())
    }

    /// Get the number of driver calls made
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Get all recorded requests
    pub fn recorded_requests(&self) -> Vec<RecordedRequest> {
        lock(&self.recorded_requests).clone()
    }

    /// Get the last request made
    pub fn last_request(&self) -> Option<RecordedRequest> {
        lock(&self.recorded_requests).last().cloned()
    }

    /// The handle currently associated by the caller
    pub fn cancellation_handle(&self) -> Option<CancellationHandle> {
        self.cancel.current()
    }

    fn record(&self, messages: &[Message], tools: &[ToolDefinition], streaming: bool) {
        lock(&self.recorded_requests).push(RecordedRequest {
            messages: messages.to_vec(),
            tool_names: tools.iter().map(|t| t.name().to_string()).collect(),
            streaming,
        });
    }

    /// Get the next step
    fn next_step(&self) -> MockStep {
        let count = self.call_count.fetch_add(1, Ordering::SeqCst);
        let steps = lock(&self.steps);
        match steps.len() {
            0 => MockStep::Reply(MockResponse::default()),
            len => steps[count.min(len - 1)].clone(),
        }
    }

    fn cancel_in_flight(&self) {
        if let Some(handle) = self.cancel.current() {
            handle.cancel();
        }
    }

    /// Emit `text` in chunks, stopping early when cancelled. Returns what was sent.
    fn stream_text(&self, text: &str, on_chunk: &mut (dyn FnMut(StreamChunk) + Send)) -> (String, bool) {
        let mut sent = String::new();
        for chunk in text.chars().collect::<Vec<_>>().chunks(CHUNK_CHARS) {
            if self.cancel.is_cancelled() {
                return (sent, true);
            }
            let piece: String = chunk.iter().collect();
            sent.push_str(&piece);
            on_chunk(StreamChunk::Text(piece));
        }
        (sent, self.cancel.is_cancelled())
    }
}

fn status_error(status: u16) -> GraphmindError {
    GraphmindError::Api(ApiError::from_status(status, "mock failure", None))
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn test_connection(&self) -> ConnectionTestResult {
        ConnectionTestResult::ok(format!("Connected to {}, model mock-model is available", self.name))
    }

    async fn send_message(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ChatResponse> {
        self.record(messages, tools, false);
        if self.cancel.is_cancelled() {
            return Err(GraphmindError::Cancelled);
        }

        match self.next_step() {
            MockStep::Reply(response) => Ok(response.to_chat_response()),
            MockStep::Status(status) => Err(status_error(status)),
            MockStep::Network(message) => Err(GraphmindError::Api(ApiError::Network(message))),
            MockStep::CancelAfter(_) => {
                self.cancel_in_flight();
                Err(GraphmindError::Cancelled)
            }
        }
    }

    async fn send_message_stream(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        on_chunk: &mut (dyn FnMut(StreamChunk) + Send),
    ) -> Result<ChatResponse> {
        self.record(messages, tools, true);

        match self.next_step() {
            MockStep::Reply(response) => {
                let (sent, cancelled) = self.stream_text(&response.text, on_chunk);
                if cancelled {
                    return Ok(ChatResponse {
                        message: sent,
                        cancelled: true,
                        ..Default::default()
                    });
                }
                let collapsed = response.to_chat_response();
                for call in &collapsed.tool_calls {
                    on_chunk(StreamChunk::ToolUse(call.clone()));
                }
                Ok(collapsed)
            }
            MockStep::CancelAfter(text) => {
                let (sent, _) = self.stream_text(&text, on_chunk);
                self.cancel_in_flight();
                Ok(ChatResponse {
                    message: sent,
                    stop_reason: Some(StopReason::Other("cancelled".to_string())),
                    cancelled: true,
                    ..Default::default()
                })
            }
            MockStep::Status(status) => Err(status_error(status)),
            MockStep::Network(message) => Err(GraphmindError::Api(ApiError::Network(message))),
        }
    }

    async fn fetch_models_list(&self) -> Result<ModelsList> {
        Ok(ModelsList {
            models: vec!["mock-model".to_string()],
            source: ModelsSource::Curated,
        })
    }

    fn set_cancellation_handle(&self, handle: Option<CancellationHandle>) {
        self.cancel.set(handle);
    }
}
