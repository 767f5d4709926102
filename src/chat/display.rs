// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Display formatting for the chat REPL
//!
//! This module provides testable formatting functions for displaying
//! chat interface elements. Functions return formatted strings rather
//! than writing directly to stdout, making them easy to test.

use serde_json::Value;

use crate::chat::state::ChatState;
use crate::llm::ToolCall;
use crate::tools::definition as tools;
use crate::tools::ToolExecutionResult;

/// Format a tool invocation into a one-line summary based on tool type
pub fn format_tool_invocation(call: &ToolCall) -> String {
    let input = call.parsed_arguments().unwrap_or(Value::Null);
    let text = |key: &str| input.get(key).and_then(|v| v.as_str()).map(|s| truncate_string(s, 50));
    let count = |key: &str| {
        input
            .get(key)
            .and_then(|v| v.as_array())
            .map(|a| a.len())
            .unwrap_or(0)
    };

    let summary = match call.name() {
        tools::WHOOGLE_SEARCH => text("query").map(|q| format!("Searching the web for \"{}\"", q)),
        tools::VAULT_SEARCH => text("query").map(|q| format!("Searching notes for \"{}\"", q)),
        tools::WEB_FETCH => text("url").map(|u| format!("Fetching {}", u)),
        tools::OPEN_FILE => text("path").map(|p| format!("Opening {}", p)),
        tools::READ_DOC => Some("Reading the attached document".to_string()),
        tools::UPDATE_CHAT_TITLE => text("title").map(|t| format!("Renaming chat to \"{}\"", t)),
        tools::MEMORY_SEARCH_NODES | tools::MEMORY_SEMANTIC_SEARCH => {
            text("query").map(|q| format!("Searching memory for \"{}\"", q))
        }
        tools::MEMORY_CREATE_ENTITIES => Some(format!("Creating {} entities", count("entities"))),
        tools::MEMORY_CREATE_RELATIONS => {
            Some(format!("Creating {} relations", count("relations")))
        }
        _ => None,
    };

    summary.unwrap_or_else(|| call.name().to_string())
}

/// Tool result formatted for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResultDisplay {
    pub is_error: bool,
    pub summary: String,
}

/// Format a tool result for display
pub fn format_tool_result(result: &ToolExecutionResult) -> ToolResultDisplay {
    if result.success {
        ToolResultDisplay {
            is_error: false,
            summary: truncate_string(&result.summary(), 100),
        }
    } else {
        let error = result.error.as_deref().unwrap_or("unknown error");
        ToolResultDisplay {
            is_error: true,
            summary: format!("Error: {}", extract_error_preview(error, 100)),
        }
    }
}

/// Truncate a string for display, counting characters
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Extract a preview of error message
fn extract_error_preview(error: &str, max_len: usize) -> String {
    let first_line = error.lines().next().unwrap_or("");
    truncate_string(first_line, max_len)
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

/// Format welcome message
pub fn format_welcome(provider_name: &str, model: &str, web_search: bool) -> String {
    let mut output = String::new();
    output.push_str("Graphmind - knowledge-graph chat\n");
    output.push_str(&format!("Provider: {} | Model: {}\n", provider_name, model));
    output.push_str(&format!("Web search: {}\n", on_off(web_search)));
    output.push_str("\nType /help for commands, or start chatting.\n");
    output
}

/// Format the session status
pub fn format_status(state: &ChatState) -> String {
    let document = state
        .context_document()
        .map(|d| d.name.as_str())
        .unwrap_or("none");
    format!(
        "Title: {}\nMessages: {}\nWeb search: {}\nDocument: {}",
        state.title(),
        state.len(),
        on_off(state.is_web_search_enabled()),
        document
    )
}

/// Format the web search toggle confirmation
pub fn format_search_toggle(enabled: bool) -> String {
    format!("Web search {}", if enabled { "enabled" } else { "disabled" })
}

/// Format interrupt message
pub fn format_interrupt_message() -> String {
    "Stopped\nType your next message or use /help for commands.".to_string()
}
