// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! LLM module for Graphmind
//!
//! Provides the driver abstraction over the Anthropic Messages and
//! OpenAI Chat Completions protocols, plus the streaming parser both share.

pub mod cancel;
pub mod factory;
pub mod message;
pub mod mock_provider;
pub mod provider;
pub mod providers;
pub mod stream;

pub use cancel::{CancellationHandle, CancellationSlot};
pub use factory::{ProviderFactory, ProviderKind};
pub use message::*;
pub use provider::*;
