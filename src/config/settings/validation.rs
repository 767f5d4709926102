// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use crate::error::{GraphmindError, Result};

use super::Settings;

impl Settings {
    /// Get the LLM API key, checking the env var first.
    pub fn llm_api_key(&self) -> Option<String> {
        // Priority: env var > config file.
        std::env::var(&self.llm.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.llm.api_key.clone())
            .filter(|k| !k.trim().is_empty())
    }

    /// Check that endpoint, key and model are all present, in that order.
    pub fn validate_llm(&self) -> Result<()> {
        if self.llm.api_url.as_deref().map_or(true, |u| u.trim().is_empty()) {
            return Err(GraphmindError::Config("API URL is not set".to_string()));
        }
        if self.llm_api_key().is_none() {
            return Err(GraphmindError::Config(format!(
                "API key is not set (set llm.api_key or ${})",
                self.llm.api_key_env
            )));
        }
        if self.llm.model.as_deref().map_or(true, |m| m.trim().is_empty()) {
            return Err(GraphmindError::Config("model name is not set".to_string()));
        }
        Ok(())
    }

    /// Whether a search instance is configured.
    pub fn is_search_configured(&self) -> bool {
        self.search
            .whoogle_url
            .as_deref()
            .is_some_and(|u| !u.trim().is_empty())
    }

    /// Whether a graph backend is configured.
    pub fn is_graph_configured(&self) -> bool {
        self.graph
            .api_url
            .as_deref()
            .is_some_and(|u| !u.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> Settings {
        let mut settings = Settings::default();
        settings.llm.api_key_env = "GRAPHMIND_TEST_UNSET_KEY_VAR".to_string();
        settings.llm.api_url = Some("https://api.example.com".to_string());
        settings.llm.api_key = Some("sk-test".to_string());
        settings.llm.model = Some("model-1".to_string());
        settings
    }

    #[test]
    fn test_validate_ok() {
        assert!(configured().validate_llm().is_ok());
    }

    #[test]
    fn test_validate_missing_url_first() {
        let mut settings = configured();
        settings.llm.api_url = None;
        settings.llm.model = None;
        let err = settings.validate_llm().unwrap_err();
        assert!(err.to_string().contains("API URL"));
    }

    #[test]
    fn test_validate_missing_key() {
        let mut settings = configured();
        settings.llm.api_key = Some("  ".to_string());
        let err = settings.validate_llm().unwrap_err();
        assert!(matches!(err, GraphmindError::Config(ref m) if m.contains("API key")));
    }

    #[test]
    fn test_validate_missing_model() {
        let mut settings = configured();
        settings.llm.model = Some(String::new());
        let err = settings.validate_llm().unwrap_err();
        assert!(err.to_string().contains("model"));
    }

    #[test]
    fn test_collaborator_flags() {
        let mut settings = Settings::default();
        assert!(!settings.is_search_configured());
        assert!(!settings.is_graph_configured());
        settings.search.whoogle_url = Some("http://localhost:5000".to_string());
        settings.graph.api_url = Some("http://localhost:8000".to_string());
        assert!(settings.is_search_configured());
        assert!(settings.is_graph_configured());
    }
}
