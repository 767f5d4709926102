// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Whoogle web search client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::SearchConfig;
use crate::error::{GraphmindError, Result};

use super::collaborators::WebSearch;
use super::ensure_http_success;

/// One normalised search hit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub content: String,
    pub engine: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
}

/// Search results in the shape handed to the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    pub query: String,
    pub number_of_results: usize,
    pub page: u32,
    pub results: Vec<SearchHit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Value>,
}

/// Client for a Whoogle instance's JSON search endpoint
pub struct WhoogleClient {
    client: Client,
    base_url: String,
    auth_key: Option<String>,
}

impl WhoogleClient {
    pub fn new(base_url: impl Into<String>, auth_key: Option<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(GraphmindError::Config("search URL is not set".to_string()));
        }
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url,
            auth_key: auth_key.filter(|k| !k.trim().is_empty()),
        })
    }

    /// Build from settings. The key is only sent when auth is enabled.
    pub fn from_settings(config: &SearchConfig, timeout: Duration) -> Result<Self> {
        let auth_key = config.auth_key.clone().filter(|_| config.auth_enabled);
        Self::new(
            config.whoogle_url.clone().unwrap_or_default(),
            auth_key,
            timeout,
        )
    }

    fn search_url(&self) -> String {
        format!("{}/search", self.base_url)
    }
}

/// Map the instance's raw JSON onto `SearchResponse`. Field names vary
/// between instances (`url`/`link`, `content`/`snippet`/`description`).
pub fn normalize(query: &str, page: u32, data: &Value) -> SearchResponse {
    let first = |item: &Value, keys: &[&str]| -> String {
        keys.iter()
            .find_map(|k| item[*k].as_str().filter(|s| !s.is_empty()))
            .unwrap_or_default()
            .to_string()
    };

    let results: Vec<SearchHit> = data["results"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|item| SearchHit {
                    title: first(item, &["title"]),
                    url: first(item, &["url", "link"]),
                    content: first(item, &["content", "snippet", "description"]),
                    engine: "whoogle".to_string(),
                    published_date: Some(first(item, &["publishedDate", "date"]))
                        .filter(|d| !d.is_empty()),
                })
                .collect()
        })
        .unwrap_or_default();

    SearchResponse {
        query: query.to_string(),
        number_of_results: results.len(),
        page,
        results,
        suggestions: data.get("suggestions").filter(|s| !s.is_null()).cloned(),
    }
}

#[async_trait]
impl WebSearch for WhoogleClient {
    async fn search(&self, query: &str, page: u32) -> Result<Value> {
        tracing::debug!(target: "graphmind.tools.search", query, page, "web search");

        let page_param = page.to_string();
        let mut request = self.client.get(self.search_url()).query(&[
            ("q", query),
            ("format", "json"),
            ("page", page_param.as_str()),
        ]);
        if let Some(key) = &self.auth_key {
            request = request.bearer_auth(key);
        }

        let response = ensure_http_success(request.send().await?).await?;
        let data: Value = response.json().await?;
        let normalized = normalize(query, page, &data);

        tracing::debug!(
            target: "graphmind.tools.search",
            results = normalized.number_of_results,
            "web search done"
        );
        Ok(serde_json::to_value(normalized)?)
    }
}
