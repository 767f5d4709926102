// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Tool system for Graphmind
//!
//! Provides the catalog of tools the model may call, the executor that
//! dispatches them, and the HTTP clients for the search, graph and fetch
//! collaborators they delegate to.

pub mod args;
pub mod collaborators;
pub mod definition;
pub mod executor;
pub mod fetch;
pub mod graph;
pub mod search;

pub use collaborators::{Collaborators, FileOpener, GraphStore, VaultSearch, WebFetch, WebSearch};
pub use definition::{available_tools, catalog, SchemaBuilder};
pub use executor::{ToolExecutionResult, ToolExecutor};

use reqwest::Response;
use serde::{Deserialize, Serialize};

use crate::error::{GraphmindError, Result};

/// A document attached to the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextDocument {
    pub name: String,
    pub content: String,
}

impl ContextDocument {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Session data provided to tools during execution
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// The attached document, read by `read_doc`
    pub document: Option<ContextDocument>,
}

impl ToolContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, document: Option<ContextDocument>) -> Self {
        self.document = document;
        self
    }
}

/// Turn a non-2xx collaborator response into `HTTP <status>: <body>`
pub(crate) async fn ensure_http_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GraphmindError::ToolExecution(format!(
        "HTTP {}: {}",
        status.as_u16(),
        body.trim()
    )))
}
