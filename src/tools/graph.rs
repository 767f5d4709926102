// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Knowledge-graph REST client
//!
//! Every operation maps onto one endpoint under `{base}/tools/`. Request and
//! response bodies are passed through as JSON.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde_json::{json, Value};

use crate::config::GraphConfig;
use crate::error::{GraphmindError, Result};

use super::collaborators::GraphStore;
use super::ensure_http_success;

pub struct GraphClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GraphClient {
    pub fn new(api_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url(api_url)?,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn from_settings(config: &GraphConfig, timeout: Duration) -> Result<Self> {
        Self::new(
            config.api_url.as_deref().unwrap_or_default(),
            config.api_key.clone(),
            timeout,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<Value> {
        let url = format!("{}/tools/{}", self.base_url, path);
        tracing::debug!(target: "graphmind.tools.graph", %method, %url, "graph request");

        let mut request = self.client.request(method, &url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = ensure_http_success(request.send().await?).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        self.request(Method::GET, path, query, None).await
    }

    async fn post(&self, path: &str, query: &[(&str, String)], body: Value) -> Result<Value> {
        self.request(Method::POST, path, query, Some(body)).await
    }
}

/// Service root for a configured URL. A URL pointing at the service's
/// OpenAPI document (`.../openapi.json`) is reduced to its origin.
fn base_url(api_url: &str) -> Result<String> {
    let trimmed = api_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(GraphmindError::Config("graph API URL is not set".to_string()));
    }
    if trimmed.ends_with(".json") {
        let url = Url::parse(trimmed)
            .map_err(|e| GraphmindError::Config(format!("invalid graph API URL: {}", e)))?;
        let origin = url.origin().ascii_serialization();
        return Ok(origin);
    }
    Ok(trimmed.to_string())
}

#[async_trait]
impl GraphStore for GraphClient {
    async fn create_entities(&self, entities: Value) -> Result<Value> {
        self.post("entities/create", &[], json!({ "entities": entities }))
            .await
    }

    async fn add_observations(&self, observations: Value) -> Result<Value> {
        self.post(
            "entities/add_observations",
            &[],
            json!({ "observations": observations }),
        )
        .await
    }

    async fn create_relations(
        &self,
        relations: Value,
        auto_create_entities: bool,
    ) -> Result<Value> {
        self.post(
            "relations/create",
            &[("auto_create_entities", auto_create_entities.to_string())],
            json!({ "relations": relations }),
        )
        .await
    }

    async fn search_nodes(&self, query: &str) -> Result<Value> {
        self.get("search/nodes", &[("query", query.to_string())])
            .await
    }

    async fn semantic_search(&self, query: &str, limit: u32) -> Result<Value> {
        self.get(
            "search/semantic",
            &[("query", query.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    async fn read_graph(&self, limit: Option<u32>, offset: u32) -> Result<Value> {
        let mut query = vec![("offset", offset.to_string())];
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        self.get("search/read_graph", &query).await
    }

    async fn open_nodes(&self, names: &[String]) -> Result<Value> {
        self.post("search/open", &[], json!({ "names": names })).await
    }

    async fn delete_entities(&self, entity_names: &[String]) -> Result<Value> {
        self.post(
            "entities/delete",
            &[],
            json!({ "entity_names": entity_names }),
        )
        .await
    }

    async fn delete_observations(&self, deletions: Value) -> Result<Value> {
        self.post(
            "entities/delete_observations",
            &[],
            json!({ "deletions": deletions }),
        )
        .await
    }

    async fn delete_relations(&self, relations: Value) -> Result<Value> {
        self.post("relations/delete", &[], json!({ "relations": relations }))
            .await
    }

    async fn generate_embeddings(&self, entity_names: Option<Value>, limit: u32) -> Result<Value> {
        self.post(
            "search/embeddings",
            &[("limit", limit.to_string())],
            json!({ "entity_names": entity_names }),
        )
        .await
    }

    async fn view_trash(&self, limit: u32, offset: u32) -> Result<Value> {
        self.get(
            "trash/view",
            &[("limit", limit.to_string()), ("offset", offset.to_string())],
        )
        .await
    }

    async fn restore_deleted(
        &self,
        entity_names: Option<Value>,
        observations: Option<Value>,
    ) -> Result<Value> {
        let mut body = serde_json::Map::new();
        if let Some(names) = entity_names {
            body.insert("entity_names".to_string(), names);
        }
        if let Some(observations) = observations {
            body.insert("observations".to_string(), observations);
        }
        self.post("trash/restore", &[], Value::Object(body)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_plain() {
        assert_eq!(
            base_url("http://localhost:8000/").unwrap(),
            "http://localhost:8000"
        );
        assert_eq!(
            base_url("https://graph.example.com/api").unwrap(),
            "https://graph.example.com/api"
        );
    }

    #[test]
    fn test_base_url_openapi_document() {
        assert_eq!(
            base_url("http://localhost:8000/openapi.json").unwrap(),
            "http://localhost:8000"
        );
    }

    #[test]
    fn test_base_url_errors() {
        assert!(matches!(base_url("  "), Err(GraphmindError::Config(_))));
        assert!(base_url("not a url/openapi.json").is_err());
    }

    #[test]
    fn test_from_settings() {
        let config = GraphConfig {
            api_url: Some("http://localhost:8000".to_string()),
            api_key: Some(" ".to_string()),
        };
        let client = GraphClient::from_settings(&config, Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert!(client.api_key.is_none());
    }
}
