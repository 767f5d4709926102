// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Turn orchestration
//!
//! `ChatController::send` drives one user turn: stream the first reply, run
//! any tool calls it carries in order, feed the results back through
//! non-streaming requests, and repeat until the model answers without tools.
//! The controller is the only writer of the session history and keeps every
//! assistant tool call paired with its result message, whatever happens.

use std::sync::Arc;

use crate::chat::filter::should_display_intermediate;
use crate::chat::state::ChatState;
use crate::config::Settings;
use crate::error::{GraphmindError, Result};
use crate::llm::{
    check_tool_pairing, CancellationHandle, CancellationSlot, ChatResponse, LlmProvider, Message,
    ProviderFactory, StreamChunk, ToolCall, ToolDefinition,
};
use crate::tools::{available_tools, Collaborators, ContextDocument, ToolExecutionResult, ToolExecutor};

/// Text of the assistant message recorded when a turn is stopped
pub const STOPPED_MARKER: &str = "⏸ Generation stopped";

/// Default bound on tool rounds per turn
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 10;

/// Output hooks for a chat turn.
///
/// Frontends implement this to render the conversation as it happens.
pub trait ChatObserver: Send {
    /// A streamed text fragment of the first reply, in arrival order
    fn on_text_delta(&mut self, _text: &str) {}

    fn on_tool_invocation(&mut self, _call: &ToolCall) {}

    fn on_tool_result(&mut self, _call: &ToolCall, _result: &ToolExecutionResult) {}

    /// Text the model produced alongside follow-up tool calls, shown only
    /// when the response filter does not consider it noise
    fn on_intermediate_text(&mut self, _text: &str) {}

    /// The final answer. `streamed` is true when it already arrived through
    /// `on_text_delta`.
    fn on_final_answer(&mut self, _answer: &str, _streamed: bool) {}

    fn on_stopped(&mut self) {}

    fn on_error(&mut self, _notice: &str) {}

    fn on_title_changed(&mut self, _title: &str) {}
}

/// No-op observer for callers that don't need output hooks.
#[derive(Debug, Default)]
pub struct NoopChatObserver;

impl ChatObserver for NoopChatObserver {}

/// How a call to `send` ended
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// Empty input; nothing changed
    Ignored,
    /// A turn was already in progress and has been stopped instead
    StopRequested,
    /// The model produced a final answer
    Completed { answer: String, tool_rounds: usize },
    /// The turn was cancelled; `partial` is the text produced before the stop
    Stopped { partial: String },
    /// The turn failed. `rolled_back` is true when the user message was
    /// removed so the input can be retried.
    Failed { notice: String, rolled_back: bool },
    /// The tool round bound was reached without a final answer
    RoundLimit { rounds: usize },
}

impl SendOutcome {
    fn label(&self) -> &'static str {
        match self {
            SendOutcome::Ignored => "ignored",
            SendOutcome::StopRequested => "stop_requested",
            SendOutcome::Completed { .. } => "completed",
            SendOutcome::Stopped { .. } => "stopped",
            SendOutcome::Failed { .. } => "failed",
            SendOutcome::RoundLimit { .. } => "round_limit",
        }
    }
}

/// Stops whatever turn is in flight. Cloneable and usable from another task
/// while `send` is running.
#[derive(Debug, Clone)]
pub struct StopHandle {
    active: Arc<CancellationSlot>,
}

impl StopHandle {
    /// Returns false when no turn is running
    pub fn stop(&self) -> bool {
        match self.active.current() {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }
}

pub struct ChatController {
    provider: Arc<dyn LlmProvider>,
    executor: ToolExecutor,
    state: ChatState,
    max_tool_rounds: usize,
    active: Arc<CancellationSlot>,
}

impl ChatController {
    pub fn new(provider: Arc<dyn LlmProvider>, executor: ToolExecutor, state: ChatState) -> Self {
        Self {
            provider,
            executor,
            state,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            active: Arc::new(CancellationSlot::default()),
        }
    }

    /// Build the driver, the collaborators and a fresh session from settings
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let provider = ProviderFactory::create(settings)?;
        let executor = ToolExecutor::new(Collaborators::from_settings(settings)?);
        let web_search = settings.search.default_enabled && settings.is_search_configured();
        Ok(Self::new(provider, executor, ChatState::new(web_search))
            .with_max_tool_rounds(settings.chat.max_tool_rounds))
    }

    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds.max(1);
        self
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn messages(&self) -> &[Message] {
        self.state.messages()
    }

    pub fn max_tool_rounds(&self) -> usize {
        self.max_tool_rounds
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            active: Arc::clone(&self.active),
        }
    }

    /// Cancel the turn in flight, if any
    pub fn stop(&self) -> bool {
        self.stop_handle().stop()
    }

    /// Clear the session for a new conversation
    pub fn new_chat(&mut self) {
        self.stop();
        self.state.reset();
        self.release_turn();
        tracing::info!(target: "graphmind.chat.controller", "new chat");
    }

    pub fn toggle_web_search(&mut self) -> bool {
        self.state.toggle_web_search()
    }

    pub fn set_context_document(&mut self, document: ContextDocument) {
        tracing::debug!(
            target: "graphmind.chat.controller",
            name = %document.name,
            chars = document.content.chars().count(),
            "context document attached"
        );
        self.state.set_context_document(document);
    }

    pub fn clear_context_document(&mut self) -> Option<ContextDocument> {
        self.state.clear_context_document()
    }

    /// End the session, cancelling anything still running
    pub fn close(self) {
        self.stop();
    }

    /// Run one user turn to completion, cancellation or failure
    pub async fn send(&mut self, input: &str, observer: &mut dyn ChatObserver) -> SendOutcome {
        let text = input.trim();
        if text.is_empty() {
            return SendOutcome::Ignored;
        }

        if self.state.is_generating() {
            // The previous turn was abandoned before it finished
            self.state.request_stop();
            self.release_turn();
            let removed = self.state.repair_history();
            tracing::info!(
                target: "graphmind.chat.controller",
                removed,
                "send during generation treated as stop request"
            );
            return SendOutcome::StopRequested;
        }

        let content = match self.state.context_document() {
            Some(doc) => format!(
                "[Context: the document \"{}\" is open; use the read_doc tool to read its full content]\n\n{}",
                doc.name, text
            ),
            None => text.to_string(),
        };

        let turn_start = self.state.len();
        self.state.push(Message::user(content));
        let handle = self.state.begin_generation();
        self.active.set(Some(handle.clone()));
        self.provider.set_cancellation_handle(Some(handle.clone()));

        tracing::info!(
            target: "graphmind.chat.controller",
            provider = self.provider.name(),
            model = self.provider.model(),
            history = self.state.len(),
            web_search = self.state.is_web_search_enabled(),
            "turn start"
        );

        let outcome = self.run_turn(turn_start, &handle, observer).await;

        self.release_turn();
        debug_assert!(check_tool_pairing(self.state.messages()).is_ok());
        tracing::info!(
            target: "graphmind.chat.controller",
            outcome = outcome.label(),
            history = self.state.len(),
            "turn complete"
        );
        outcome
    }

    fn release_turn(&mut self) {
        self.state.finish_generation();
        self.active.set(None);
        self.provider.set_cancellation_handle(None);
    }

    async fn run_turn(
        &mut self,
        turn_start: usize,
        handle: &CancellationHandle,
        observer: &mut dyn ChatObserver,
    ) -> SendOutcome {
        // Recomputed every turn from the current toggles
        let tools = available_tools(
            self.state.is_web_search_enabled(),
            self.state.has_context_document(),
        );

        let mut streamed = String::new();
        let first = {
            let mut on_chunk = |chunk: StreamChunk| {
                if let StreamChunk::Text(text) = chunk {
                    streamed.push_str(&text);
                    observer.on_text_delta(&text);
                }
            };
            self.provider
                .send_message_stream(self.state.messages(), &tools, &mut on_chunk)
                .await
        };

        let response = match first {
            Ok(response) if response.cancelled || handle.is_cancelled() => {
                let partial = if response.message.is_empty() {
                    streamed
                } else {
                    response.message
                };
                return self.stopped(partial, observer);
            }
            Ok(response) => response,
            Err(e) if e.is_cancelled() || handle.is_cancelled() => {
                return self.stopped(streamed, observer);
            }
            Err(e) => return self.first_call_failed(turn_start, &streamed, &e, observer),
        };

        let streamed_any = !streamed.is_empty();
        if !streamed_any && !response.message.is_empty() && response.has_tool_calls() {
            // The driver answered without streaming; show the text once
            observer.on_text_delta(&response.message);
        }

        self.tool_loop(response, streamed_any, handle, &tools, observer)
            .await
    }

    async fn tool_loop(
        &mut self,
        mut response: ChatResponse,
        first_streamed: bool,
        handle: &CancellationHandle,
        tools: &[ToolDefinition],
        observer: &mut dyn ChatObserver,
    ) -> SendOutcome {
        let mut rounds = 0;
        let mut last_results: Vec<ToolExecutionResult> = Vec::new();

        loop {
            if !response.has_tool_calls() {
                return self.finish(response.message, rounds, rounds == 0 && first_streamed, observer);
            }

            if rounds >= self.max_tool_rounds {
                let notice = format!(
                    "Stopped after {} tool rounds without a final answer.",
                    rounds
                );
                tracing::warn!(target: "graphmind.chat.controller", rounds, "tool round limit reached");
                self.state.push(Message::assistant(notice.clone()));
                observer.on_error(&notice);
                return SendOutcome::RoundLimit { rounds };
            }
            rounds += 1;

            let ChatResponse {
                message,
                tool_calls,
                ..
            } = response;

            if rounds > 1 && should_display_intermediate(&message, &last_results) {
                observer.on_intermediate_text(&message);
            }

            tracing::info!(
                target: "graphmind.chat.controller",
                round = rounds,
                calls = tool_calls.len(),
                "tool round"
            );
            self.state
                .push(Message::assistant_tool_calls(message, tool_calls.clone()));
            last_results = self.run_tools(&tool_calls, handle, observer).await;

            if handle.is_cancelled() {
                return self.stopped(String::new(), observer);
            }

            response = match self
                .provider
                .send_message(self.state.messages(), tools)
                .await
            {
                Ok(next) if next.cancelled || handle.is_cancelled() => {
                    return self.stopped(String::new(), observer);
                }
                Ok(next) => next,
                Err(e) if e.is_cancelled() || handle.is_cancelled() => {
                    return self.stopped(String::new(), observer);
                }
                Err(e) => {
                    tracing::warn!(
                        target: "graphmind.chat.controller",
                        round = rounds,
                        error = %e,
                        "follow-up request failed"
                    );
                    let notice = format!(
                        "Sorry, something went wrong while processing the tool results: {}",
                        e.user_message()
                    );
                    self.state.push(Message::assistant(notice.clone()));
                    observer.on_error(&notice);
                    return SendOutcome::Failed {
                        notice,
                        rolled_back: false,
                    };
                }
            };
        }
    }

    /// Execute calls strictly in order, appending one result message per call.
    /// Once cancelled, the remaining calls get error results without running.
    async fn run_tools(
        &mut self,
        calls: &[ToolCall],
        handle: &CancellationHandle,
        observer: &mut dyn ChatObserver,
    ) -> Vec<ToolExecutionResult> {
        let ctx = self.state.tool_context();
        let mut results = Vec::with_capacity(calls.len());

        for call in calls {
            let result = if handle.is_cancelled() {
                tracing::debug!(
                    target: "graphmind.chat.controller",
                    tool = call.name(),
                    "skipping tool call after cancellation"
                );
                ToolExecutionResult::failed(call.name(), "cancelled before execution")
            } else {
                observer.on_tool_invocation(call);
                let result = self.executor.execute(call, &ctx).await;
                observer.on_tool_result(call, &result);
                result
            };

            if let Some(title) = result.new_title() {
                self.state.set_title(title);
                observer.on_title_changed(title);
            }
            self.state.push(Message::tool_result(
                &call.id,
                call.name(),
                result.to_message_content(),
            ));
            results.push(result);
        }

        results
    }

    fn finish(
        &mut self,
        answer: String,
        rounds: usize,
        streamed: bool,
        observer: &mut dyn ChatObserver,
    ) -> SendOutcome {
        if answer.trim().is_empty() {
            tracing::warn!(target: "graphmind.chat.controller", rounds, "model returned an empty answer");
        } else {
            self.state.push(Message::assistant(answer.clone()));
        }
        observer.on_final_answer(&answer, streamed);
        SendOutcome::Completed {
            answer,
            tool_rounds: rounds,
        }
    }

    fn stopped(&mut self, partial: String, observer: &mut dyn ChatObserver) -> SendOutcome {
        tracing::info!(
            target: "graphmind.chat.controller",
            partial_chars = partial.chars().count(),
            "turn cancelled"
        );
        let content = if partial.trim().is_empty() {
            STOPPED_MARKER.to_string()
        } else {
            format!("{}\n\n{}", partial, STOPPED_MARKER)
        };
        self.state.push(Message::assistant(content));
        observer.on_stopped();
        SendOutcome::Stopped { partial }
    }

    /// Before any output the user message is withdrawn so the input can be
    /// retried; after partial output the text is kept with the notice.
    fn first_call_failed(
        &mut self,
        turn_start: usize,
        streamed: &str,
        error: &GraphmindError,
        observer: &mut dyn ChatObserver,
    ) -> SendOutcome {
        tracing::warn!(
            target: "graphmind.chat.controller",
            error = %error,
            partial_chars = streamed.chars().count(),
            "request failed"
        );
        let notice = format!("Sorry, an error occurred: {}", error.user_message());
        observer.on_error(&notice);

        if streamed.is_empty() {
            self.state.truncate(turn_start);
            return SendOutcome::Failed {
                notice,
                rolled_back: true,
            };
        }

        self.state
            .push(Message::assistant(format!("{}\n\n{}", streamed, notice)));
        SendOutcome::Failed {
            notice,
            rolled_back: false,
        }
    }
}
