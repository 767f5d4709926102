// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Provider factory for creating LLM drivers
//!
//! Picks the wire protocol from `llm.api_type` and builds the driver from
//! the shared settings.

use std::str::FromStr;
use std::sync::Arc;

use crate::config::Settings;
use crate::error::{GraphmindError, Result};
use crate::llm::provider::{DriverConfig, LlmProvider};
use crate::llm::providers::{AnthropicProvider, OpenAiProvider};

/// Wire protocol family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Anthropic,
    OpenAi,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenAi => "openai",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = GraphmindError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "openai" | "openai-compatible" => Ok(ProviderKind::OpenAi),
            other => Err(GraphmindError::Config(format!(
                "unknown api_type '{}' (expected one of: {})",
                other,
                ProviderFactory::supported_providers().join(", ")
            ))),
        }
    }
}

/// Factory for creating LLM drivers
pub struct ProviderFactory;

impl ProviderFactory {
    /// Create the driver configured in `settings`. Construction does not
    /// validate endpoint, key or model; drivers report those on first use.
    pub fn create(settings: &Settings) -> Result<Arc<dyn LlmProvider>> {
        let kind = ProviderKind::from_str(&settings.llm.api_type)?;
        Self::create_kind(kind, DriverConfig::from_settings(settings))
    }

    /// Create a driver of a specific kind
    pub fn create_kind(kind: ProviderKind, config: DriverConfig) -> Result<Arc<dyn LlmProvider>> {
        tracing::debug!(
            target: "graphmind.llm.factory",
            kind = kind.as_str(),
            model = %config.model,
            "creating driver"
        );
        let provider: Arc<dyn LlmProvider> = match kind {
            ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(config)?),
            ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(config)?),
        };
        Ok(provider)
    }

    /// Get the list of supported api types
    pub fn supported_providers() -> &'static [&'static str] {
        &["anthropic", "openai"]
    }
}
