// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use anyhow::bail;
use serde_json::json;

use graphmind::cli::OutputFormat;
use graphmind::config::Settings;
use graphmind::llm::{ConnectionTestResult, ModelsSource, ProviderFactory};

/// Validate the settings, then round-trip the configured API. Incomplete
/// settings fail without any request.
async fn check_connection(settings: &Settings) -> ConnectionTestResult {
    if let Err(e) = settings.validate_llm() {
        return ConnectionTestResult::failed(&e);
    }
    match ProviderFactory::create(settings) {
        Ok(provider) => provider.test_connection().await,
        Err(e) => ConnectionTestResult::failed(&e),
    }
}

/// Run a minimal round trip against the configured API
pub(super) async fn run_test_connection(
    settings: &Settings,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let result = check_connection(settings).await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => {
            let mark = if result.success { "ok" } else { "failed" };
            println!("[{}] {}", mark, result.message);
            if let Some(detail) = &result.error {
                println!("  {}", detail);
            }
        }
    }

    if !result.success {
        bail!("connection test failed");
    }
    Ok(())
}

/// List the models the configured API offers
pub(super) async fn run_models(settings: &Settings, format: &OutputFormat) -> anyhow::Result<()> {
    let provider = ProviderFactory::create(settings)?;
    let list = provider.fetch_models_list().await?;

    let source = match list.source {
        ModelsSource::Live => "live",
        ModelsSource::Curated => "curated",
    };
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "provider": provider.name(),
                "source": source,
                "models": list.models,
            }))?
        ),
        OutputFormat::Text => {
            println!("Models from {} ({}):", provider.name(), source);
            for model in &list.models {
                let marker = if model == provider.model() { "*" } else { " " };
                println!(" {} {}", marker, model);
            }
        }
    }
    Ok(())
}
