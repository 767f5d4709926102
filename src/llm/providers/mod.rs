// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! LLM driver implementations

pub mod anthropic;
pub(crate) mod common;
pub mod openai;

pub use anthropic::{AnthropicDecoder, AnthropicProvider};
pub use openai::{OpenAiDecoder, OpenAiProvider};
