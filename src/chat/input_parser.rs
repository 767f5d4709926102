// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Input parsing for the chat REPL
//!
//! Pure functions classifying a line typed at the prompt. Anything that is
//! not a recognised slash command is a message for the model.

/// What a line of REPL input asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplInput<'a> {
    /// Blank line
    Empty,
    /// Text to send to the model
    Message(&'a str),
    /// Start a new conversation
    New,
    /// Toggle web search
    ToggleSearch,
    /// Attach the document at this path
    AttachDocument(&'a str),
    /// Detach the current document
    DetachDocument,
    /// Show the current session status
    Status,
    Help,
    Quit,
    /// A slash command we don't know, or one missing its argument
    Invalid(String),
}

/// Check if user input is an exit command.
pub fn is_exit_command(input: &str) -> bool {
    let trimmed = input.trim().to_lowercase();
    matches!(trimmed.as_str(), "exit" | "quit" | "/exit" | "/quit")
}

/// Split `/cmd rest` into the lowercased command and its trimmed argument
fn split_command(input: &str) -> (String, &str) {
    match input.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd.to_lowercase(), rest.trim()),
        None => (input.to_lowercase(), ""),
    }
}

/// Classify one line of input
pub fn parse_input(input: &str) -> ReplInput<'_> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return ReplInput::Empty;
    }
    if is_exit_command(trimmed) {
        return ReplInput::Quit;
    }
    if !trimmed.starts_with('/') {
        return ReplInput::Message(trimmed);
    }

    let (command, argument) = split_command(trimmed);
    match command.as_str() {
        "/new" | "/clear" => ReplInput::New,
        "/search" => ReplInput::ToggleSearch,
        "/doc" if argument.is_empty() => {
            ReplInput::Invalid("usage: /doc <path>".to_string())
        }
        "/doc" => ReplInput::AttachDocument(argument),
        "/nodoc" => ReplInput::DetachDocument,
        "/status" => ReplInput::Status,
        "/help" | "/?" => ReplInput::Help,
        other => ReplInput::Invalid(format!("unknown command: {}", other)),
    }
}

/// Help text listing the REPL commands
pub fn help_text() -> &'static str {
    "Commands:\n  \
     /new          start a new conversation\n  \
     /search       toggle web search\n  \
     /doc <path>   attach a document the model can read\n  \
     /nodoc        detach the document\n  \
     /status       show the session status\n  \
     /help         show this help\n  \
     /quit         leave (Ctrl-C stops a running reply)"
}
