// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use graphmind::chat::ChatController;
use graphmind::config::Settings;
use graphmind::error::GraphmindError;
use graphmind::llm::{DriverConfig, ProviderFactory, ProviderKind};
use tempfile::TempDir;

#[test]
fn test_settings_default_values() {
    let settings = Settings::default();

    assert_eq!(settings.llm.api_type, "anthropic");
    assert_eq!(settings.llm.api_key_env, "GRAPHMIND_LLM_API_KEY");
    assert_eq!(settings.llm.max_output_tokens, 4096);
    assert_eq!(settings.chat.max_tool_rounds, 10);
    assert_eq!(settings.chat.request_timeout_secs, 120);
    assert!(!settings.search.default_enabled);
}

#[test]
fn test_settings_load_missing_file_gives_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let settings = Settings::load_from(&temp_dir.path().join("absent.json")).unwrap();
    assert!(settings.llm.api_url.is_none());
}

#[test]
fn test_settings_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("settings.json");

    let mut settings = Settings::default();
    settings.llm.api_type = "openai".to_string();
    settings.llm.api_url = Some("https://api.openai.com/v1".to_string());
    settings.llm.model = Some("gpt-4o-mini".to_string());
    settings.search.whoogle_url = Some("http://localhost:5000".to_string());
    settings.chat.max_tool_rounds = 4;
    settings.save_to(&path).unwrap();

    let loaded = Settings::load_from(&path).unwrap();
    assert_eq!(loaded.llm.api_type, "openai");
    assert_eq!(loaded.llm.model.as_deref(), Some("gpt-4o-mini"));
    assert_eq!(loaded.chat.max_tool_rounds, 4);
    assert!(loaded.is_search_configured());
}

#[test]
fn test_save_keeps_unknown_keys() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("settings.json");
    std::fs::write(&path, r#"{"ui": {"theme": "dark"}, "llm": {"model": "old"}}"#).unwrap();

    let mut settings = Settings::load_from(&path).unwrap();
    settings.llm.model = Some("new".to_string());
    settings.save_to(&path).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["ui"]["theme"], "dark");
    assert_eq!(raw["llm"]["model"], "new");
}

#[test]
fn test_plugin_data_file_is_imported() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("settings.json");
    std::fs::write(
        &path,
        r#"{
            "llmApiUrl": "https://proxy.local",
            "llmApiKey": "",
            "llmModelName": "m1",
            "llmApiType": "openai",
            "llmContextWindow": 128,
            "searchWhoogleUrl": "http://localhost:5000",
            "searchAuthEnabled": true,
            "searchAuthKey": "token",
            "mcpApiUrl": "http://graph.local",
            "syncTargetFolder": ""
        }"#,
    )
    .unwrap();

    let settings = Settings::load_from(&path).unwrap();
    assert_eq!(settings.llm.api_url.as_deref(), Some("https://proxy.local"));
    assert!(settings.llm.api_key.is_none());
    assert_eq!(settings.llm.model.as_deref(), Some("m1"));
    assert_eq!(settings.llm.api_type, "openai");
    assert_eq!(settings.llm.context_window, 128000);
    assert!(settings.is_search_configured());
    assert!(settings.search.auth_enabled);
    assert_eq!(settings.search.auth_key.as_deref(), Some("token"));
    assert_eq!(settings.graph.api_url.as_deref(), Some("http://graph.local"));
}

#[test]
fn test_invalid_json_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("settings.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        Settings::load_from(&path),
        Err(GraphmindError::Json(_))
    ));
}

#[test]
fn test_api_key_priority() {
    // A variable name unique to this test avoids interference
    let mut settings = Settings::default();
    settings.llm.api_key_env = "GRAPHMIND_TEST_API_KEY_PRIORITY".to_string();
    settings.llm.api_key = Some("config-key".to_string());

    std::env::remove_var("GRAPHMIND_TEST_API_KEY_PRIORITY");
    assert_eq!(settings.llm_api_key(), Some("config-key".to_string()));

    std::env::set_var("GRAPHMIND_TEST_API_KEY_PRIORITY", "env-key");
    assert_eq!(settings.llm_api_key(), Some("env-key".to_string()));
    std::env::remove_var("GRAPHMIND_TEST_API_KEY_PRIORITY");
}

#[test]
fn test_driver_config_from_settings() {
    let mut settings = Settings::default();
    settings.llm.api_key_env = "GRAPHMIND_TEST_UNSET_DRIVER_KEY".to_string();
    settings.llm.api_url = Some("https://api.anthropic.com/".to_string());
    settings.llm.api_key = Some("sk-test".to_string());
    settings.llm.model = Some("claude-sonnet-4-20250514".to_string());
    settings.llm.system_rules = Some("   ".to_string());
    settings.chat.request_timeout_secs = 30;

    let config = DriverConfig::from_settings(&settings);
    assert_eq!(config.base_url(), "https://api.anthropic.com");
    assert_eq!(config.api_key, "sk-test");
    assert!(config.system_rules.is_none());
    assert_eq!(config.timeout.as_secs(), 30);
    assert!(config.validate().is_ok());
}

#[test]
fn test_factory_selects_protocol() {
    let mut settings = Settings::default();
    settings.llm.model = Some("m".to_string());

    settings.llm.api_type = "Anthropic".to_string();
    assert_eq!(ProviderFactory::create(&settings).unwrap().name(), "anthropic");

    settings.llm.api_type = "openai".to_string();
    let provider = ProviderFactory::create(&settings).unwrap();
    assert_eq!(provider.name(), "openai");
    assert_eq!(provider.model(), "m");

    settings.llm.api_type = "gemini".to_string();
    let err = ProviderFactory::create(&settings).err().unwrap();
    assert!(matches!(err, GraphmindError::Config(ref m) if m.contains("gemini")));
}

#[test]
fn test_provider_kind_parsing() {
    assert_eq!("claude".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
    assert_eq!(
        " openai-compatible ".parse::<ProviderKind>().unwrap(),
        ProviderKind::OpenAi
    );
    assert!("".parse::<ProviderKind>().is_err());
}

#[tokio::test]
async fn test_unconfigured_driver_reports_without_network() {
    let mut settings = Settings::default();
    settings.llm.api_key_env = "GRAPHMIND_TEST_UNSET_CONN_KEY".to_string();

    let provider = ProviderFactory::create(&settings).unwrap();
    let result = provider.test_connection().await;
    assert!(!result.success);
    assert!(result.message.starts_with("Configuration incomplete"));
}

#[test]
fn test_controller_from_settings() {
    let mut settings = Settings::default();
    settings.search.whoogle_url = Some("http://localhost:5000".to_string());
    settings.search.default_enabled = true;
    settings.chat.max_tool_rounds = 0;

    let controller = ChatController::from_settings(&settings).unwrap();
    assert!(controller.state().is_web_search_enabled());
    assert_eq!(controller.max_tool_rounds(), 1);

    // Search cannot start enabled without an instance to query
    settings.search.whoogle_url = None;
    let controller = ChatController::from_settings(&settings).unwrap();
    assert!(!controller.state().is_web_search_enabled());
}
