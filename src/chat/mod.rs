// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Chat session management
//!
//! This module provides the per-session state, the turn controller that runs
//! the tool-calling loop, the response filter, and the pieces of the REPL
//! frontend (input parsing and display formatting).

pub mod controller;
pub mod display;
pub mod filter;
pub mod input_parser;
pub mod state;

pub use controller::{
    ChatController, ChatObserver, NoopChatObserver, SendOutcome, StopHandle, STOPPED_MARKER,
};
pub use filter::{has_substantive_analysis, is_noise, should_display_intermediate};
pub use state::{ChatState, DEFAULT_TITLE};
