// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! External capabilities the tools delegate to
//!
//! Each trait is a black box returning JSON or an error. Any of them may be
//! missing; the executor reports an unconfigured collaborator as a failed
//! tool result, never as a fatal error.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::Settings;
use crate::error::Result;

use super::fetch::HttpFetcher;
use super::graph::GraphClient;
use super::search::WhoogleClient;

/// Web search provider
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Search and return `{query, number_of_results, page, results: [...]}`
    async fn search(&self, query: &str, page: u32) -> Result<Value>;
}

/// Full-text search over the user's notes
#[async_trait]
pub trait VaultSearch: Send + Sync {
    /// Return `{results: [...]}` with at most `limit` hits
    async fn search(&self, query: &str, limit: u32) -> Result<Value>;
}

/// Fetches a web page as text
#[async_trait]
pub trait WebFetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Opens a note for the user
#[async_trait]
pub trait FileOpener: Send + Sync {
    async fn open(&self, path: &str) -> Result<()>;
}

/// Knowledge-graph backend. Payloads are passed through as JSON.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn create_entities(&self, entities: Value) -> Result<Value>;
    async fn add_observations(&self, observations: Value) -> Result<Value>;
    async fn create_relations(&self, relations: Value, auto_create_entities: bool)
        -> Result<Value>;
    async fn search_nodes(&self, query: &str) -> Result<Value>;
    async fn semantic_search(&self, query: &str, limit: u32) -> Result<Value>;
    async fn read_graph(&self, limit: Option<u32>, offset: u32) -> Result<Value>;
    async fn open_nodes(&self, names: &[String]) -> Result<Value>;
    async fn delete_entities(&self, entity_names: &[String]) -> Result<Value>;
    async fn delete_observations(&self, deletions: Value) -> Result<Value>;
    async fn delete_relations(&self, relations: Value) -> Result<Value>;
    async fn generate_embeddings(&self, entity_names: Option<Value>, limit: u32) -> Result<Value>;
    async fn view_trash(&self, limit: u32, offset: u32) -> Result<Value>;
    async fn restore_deleted(
        &self,
        entity_names: Option<Value>,
        observations: Option<Value>,
    ) -> Result<Value>;
}

/// The collaborators available to a tool executor
#[derive(Clone, Default)]
pub struct Collaborators {
    pub web_search: Option<Arc<dyn WebSearch>>,
    pub vault_search: Option<Arc<dyn VaultSearch>>,
    pub web_fetch: Option<Arc<dyn WebFetch>>,
    pub file_opener: Option<Arc<dyn FileOpener>>,
    pub graph: Option<Arc<dyn GraphStore>>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("web_search", &self.web_search.is_some())
            .field("vault_search", &self.vault_search.is_some())
            .field("web_fetch", &self.web_fetch.is_some())
            .field("file_opener", &self.file_opener.is_some())
            .field("graph", &self.graph.is_some())
            .finish()
    }
}

impl Collaborators {
    /// Build the HTTP-backed collaborators that `settings` configures.
    /// Vault search and file opening need a host application and stay unset.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout = std::time::Duration::from_secs(settings.chat.request_timeout_secs);

        let web_search: Option<Arc<dyn WebSearch>> = if settings.is_search_configured() {
            Some(Arc::new(WhoogleClient::from_settings(&settings.search, timeout)?))
        } else {
            None
        };
        let graph: Option<Arc<dyn GraphStore>> = if settings.is_graph_configured() {
            Some(Arc::new(GraphClient::from_settings(&settings.graph, timeout)?))
        } else {
            None
        };

        Ok(Self {
            web_search,
            web_fetch: Some(Arc::new(HttpFetcher::new(timeout)?)),
            graph,
            ..Default::default()
        })
    }

    pub fn with_web_search(mut self, search: Arc<dyn WebSearch>) -> Self {
        self.web_search = Some(search);
        self
    }

    pub fn with_vault_search(mut self, search: Arc<dyn VaultSearch>) -> Self {
        self.vault_search = Some(search);
        self
    }

    pub fn with_web_fetch(mut self, fetch: Arc<dyn WebFetch>) -> Self {
        self.web_fetch = Some(fetch);
        self
    }

    pub fn with_file_opener(mut self, opener: Arc<dyn FileOpener>) -> Self {
        self.file_opener = Some(opener);
        self
    }

    pub fn with_graph(mut self, graph: Arc<dyn GraphStore>) -> Self {
        self.graph = Some(graph);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_default_settings() {
        let collaborators = Collaborators::from_settings(&Settings::default()).unwrap();
        assert!(collaborators.web_search.is_none());
        assert!(collaborators.graph.is_none());
        assert!(collaborators.web_fetch.is_some());
        assert!(collaborators.vault_search.is_none());
    }

    #[test]
    fn test_from_configured_settings() {
        let mut settings = Settings::default();
        settings.search.whoogle_url = Some("http://localhost:5000".to_string());
        settings.graph.api_url = Some("http://localhost:8000".to_string());
        let collaborators = Collaborators::from_settings(&settings).unwrap();
        assert!(collaborators.web_search.is_some());
        assert!(collaborators.graph.is_some());
    }

    #[test]
    fn test_debug_shows_presence_only() {
        let debug = format!("{:?}", Collaborators::default());
        assert!(debug.contains("web_search: false"));
    }
}
