// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Per-session chat state
//!
//! One `ChatState` belongs to one session. It holds the ordered history, the
//! generation flag with its cancellation handle, and the auxiliary session
//! fields. Only the controller mutates it.

use crate::llm::{check_tool_pairing, CancellationHandle, Message};
use crate::tools::{ContextDocument, ToolContext};

/// Title given to a fresh session
pub const DEFAULT_TITLE: &str = "New conversation";

#[derive(Debug)]
pub struct ChatState {
    messages: Vec<Message>,
    title: String,
    web_search_enabled: bool,
    default_web_search: bool,
    context_document: Option<ContextDocument>,
    generating: bool,
    cancel: Option<CancellationHandle>,
}

impl ChatState {
    /// Create an empty session; `default_web_search` is also the value
    /// restored by `reset`
    pub fn new(default_web_search: bool) -> Self {
        Self {
            messages: Vec::new(),
            title: DEFAULT_TITLE.to_string(),
            web_search_enabled: default_web_search,
            default_web_search,
            context_document: None,
            generating: false,
            cancel: None,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn remove_last(&mut self) -> Option<Message> {
        self.messages.pop()
    }

    pub fn truncate(&mut self, len: usize) {
        self.messages.truncate(len);
    }

    /// Drop trailing messages until every tool call in the history has its
    /// results. Returns the number of messages removed.
    pub fn repair_history(&mut self) -> usize {
        match check_tool_pairing(&self.messages) {
            Ok(()) => 0,
            Err(index) => {
                // The offending message is either a stray tool result or the
                // first missing one; cut back to its owning assistant message.
                let cut = self.messages[..index.min(self.messages.len())]
                    .iter()
                    .rposition(|m| m.has_tool_calls())
                    .unwrap_or(index);
                let removed = self.messages.len().saturating_sub(cut);
                self.messages.truncate(cut);
                removed
            }
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn is_web_search_enabled(&self) -> bool {
        self.web_search_enabled
    }

    pub fn set_web_search(&mut self, enabled: bool) {
        self.web_search_enabled = enabled;
    }

    /// Flip the web search toggle and return the new value
    pub fn toggle_web_search(&mut self) -> bool {
        self.web_search_enabled = !self.web_search_enabled;
        self.web_search_enabled
    }

    pub fn context_document(&self) -> Option<&ContextDocument> {
        self.context_document.as_ref()
    }

    pub fn has_context_document(&self) -> bool {
        self.context_document.is_some()
    }

    pub fn set_context_document(&mut self, document: ContextDocument) {
        self.context_document = Some(document);
    }

    pub fn clear_context_document(&mut self) -> Option<ContextDocument> {
        self.context_document.take()
    }

    /// Snapshot of what the tools may read during this turn
    pub fn tool_context(&self) -> ToolContext {
        ToolContext::new().with_document(self.context_document.clone())
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    /// The handle of the turn in flight, if any
    pub fn cancellation_handle(&self) -> Option<&CancellationHandle> {
        self.cancel.as_ref()
    }

    /// Mark a turn as started and hand out its fresh cancellation handle
    pub fn begin_generation(&mut self) -> CancellationHandle {
        let handle = CancellationHandle::new();
        self.generating = true;
        self.cancel = Some(handle.clone());
        handle
    }

    pub fn finish_generation(&mut self) {
        self.generating = false;
        self.cancel = None;
    }

    /// Cancel the turn in flight. Returns false when nothing is running.
    pub fn request_stop(&self) -> bool {
        match &self.cancel {
            Some(handle) if self.generating => {
                handle.cancel();
                true
            }
            _ => false,
        }
    }

    /// Start over: history cleared, title and toggles back to their defaults,
    /// document detached. A turn still in flight is cancelled.
    pub fn reset(&mut self) {
        self.request_stop();
        self.messages.clear();
        self.title = DEFAULT_TITLE.to_string();
        self.web_search_enabled = self.default_web_search;
        self.context_document = None;
        self.finish_generation();
    }
}

impl Drop for ChatState {
    fn drop(&mut self) {
        self.request_stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolCall;

    // ===== Lifecycle Tests =====

    #[test]
    fn test_new_state() {
        let state = ChatState::new(true);
        assert!(state.is_empty());
        assert_eq!(state.title(), DEFAULT_TITLE);
        assert!(state.is_web_search_enabled());
        assert!(!state.is_generating());
        assert!(state.cancellation_handle().is_none());
    }

    #[test]
    fn test_generation_cycle() {
        let mut state = ChatState::new(false);
        let handle = state.begin_generation();
        assert!(state.is_generating());
        assert!(state.cancellation_handle().unwrap().same_as(&handle));

        assert!(state.request_stop());
        assert!(handle.is_cancelled());

        state.finish_generation();
        assert!(!state.is_generating());
        assert!(state.cancellation_handle().is_none());
        assert!(!state.request_stop());
    }

    #[test]
    fn test_each_turn_gets_fresh_handle() {
        let mut state = ChatState::new(false);
        let first = state.begin_generation();
        first.cancel();
        state.finish_generation();
        let second = state.begin_generation();
        assert!(!second.is_cancelled());
        assert!(!second.same_as(&first));
    }

    #[test]
    fn test_reset() {
        let mut state = ChatState::new(false);
        state.push(Message::user("hello"));
        state.set_title("Rust questions");
        state.toggle_web_search();
        state.set_context_document(ContextDocument::new("notes.md", "text"));
        let handle = state.begin_generation();

        state.reset();
        assert!(handle.is_cancelled());
        assert!(state.is_empty());
        assert_eq!(state.title(), DEFAULT_TITLE);
        assert!(!state.is_web_search_enabled());
        assert!(!state.has_context_document());
        assert!(!state.is_generating());
    }

    #[test]
    fn test_drop_cancels_turn_in_flight() {
        let mut state = ChatState::new(false);
        let handle = state.begin_generation();
        drop(state);
        assert!(handle.is_cancelled());
    }

    // ===== Toggle and Document Tests =====

    #[test]
    fn test_toggle_web_search() {
        let mut state = ChatState::new(false);
        assert!(state.toggle_web_search());
        assert!(!state.toggle_web_search());
    }

    #[test]
    fn test_tool_context_carries_document() {
        let mut state = ChatState::new(false);
        assert!(state.tool_context().document.is_none());
        state.set_context_document(ContextDocument::new("a.md", "body"));
        assert_eq!(state.tool_context().document.unwrap().name, "a.md");
        assert!(state.clear_context_document().is_some());
        assert!(state.tool_context().document.is_none());
    }

    // ===== History Repair Tests =====

    #[test]
    fn test_repair_history_drops_unanswered_calls() {
        let mut state = ChatState::new(false);
        state.push(Message::user("q"));
        state.push(Message::assistant_tool_calls(
            "",
            vec![
                ToolCall::new("c1", "memory_search_nodes", r#"{"query":"a"}"#),
                ToolCall::new("c2", "memory_search_nodes", r#"{"query":"b"}"#),
            ],
        ));
        state.push(Message::tool_result("c1", "memory_search_nodes", "{}"));

        assert_eq!(state.repair_history(), 2);
        assert_eq!(state.len(), 1);
        assert!(check_tool_pairing(state.messages()).is_ok());
    }

    #[test]
    fn test_repair_history_noop_when_consistent() {
        let mut state = ChatState::new(false);
        state.push(Message::user("q"));
        state.push(Message::assistant("a"));
        assert_eq!(state.repair_history(), 0);
        assert_eq!(state.len(), 2);
    }
}
