// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Tool execution engine
//!
//! Dispatches a model's tool call by name, repairs its arguments and calls
//! the matching collaborator. Every outcome, including unknown tools, bad
//! arguments and collaborator failures, comes back as a
//! `ToolExecutionResult`; nothing here aborts the conversation loop.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::error::{GraphmindError, Result};
use crate::llm::message::ToolCall;

use super::args::{self, Args};
use super::collaborators::{Collaborators, GraphStore};
use super::definition::{self as tools, find};
use super::ToolContext;

/// Uniform envelope for one tool invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ToolExecutionResult {
    pub success: bool,
    pub tool_name: String,
    /// Structured payload for the model
    pub result: Option<Value>,
    pub error: Option<String>,
    /// Short human-readable summary
    pub display_text: Option<String>,
}

impl ToolExecutionResult {
    pub fn ok(tool_name: impl Into<String>, result: Option<Value>, display_text: impl Into<String>) -> Self {
        Self {
            success: true,
            tool_name: tool_name.into(),
            result,
            error: None,
            display_text: Some(display_text.into()),
        }
    }

    pub fn failed(tool_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            tool_name: tool_name.into(),
            result: None,
            error: Some(error.into()),
            display_text: None,
        }
    }

    /// Content of the tool-role message fed back to the model
    pub fn to_message_content(&self) -> String {
        if self.success {
            match &self.result {
                Some(result) => result.to_string(),
                None => json!({
                    "status": "success",
                    "message": self.display_text.as_deref().unwrap_or_default(),
                })
                .to_string(),
            }
        } else {
            let error = self.error.as_deref().unwrap_or("unknown error");
            json!({
                "status": "error",
                "error": error,
                "message": format!("Tool {} failed: {}", self.tool_name, error),
            })
            .to_string()
        }
    }

    /// One-line summary for display
    pub fn summary(&self) -> String {
        if self.success {
            self.display_text
                .clone()
                .unwrap_or_else(|| format!("{} succeeded", self.tool_name))
        } else {
            format!(
                "{} failed: {}",
                self.tool_name,
                self.error.as_deref().unwrap_or("unknown error")
            )
        }
    }

    /// The title set by a successful `update_chat_title` call
    pub fn new_title(&self) -> Option<&str> {
        if !self.success || self.tool_name != tools::UPDATE_CHAT_TITLE {
            return None;
        }
        self.result.as_ref()?["title"].as_str()
    }
}

/// Result of a successful dispatch: payload and summary
type Dispatched = (Option<Value>, String);

/// Tool executor that dispatches calls to collaborators
#[derive(Debug, Clone, Default)]
pub struct ToolExecutor {
    collaborators: Collaborators,
}

impl ToolExecutor {
    pub fn new(collaborators: Collaborators) -> Self {
        Self { collaborators }
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Execute one tool call. Never fails; errors are encoded in the result.
    pub async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> ToolExecutionResult {
        let name = call.name();
        tracing::debug!(target: "graphmind.tools.executor", tool = name, id = %call.id, "executing tool");

        let outcome = match prepare(call) {
            Ok(args) => self.dispatch(name, &args, ctx).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok((result, display_text)) => {
                tracing::info!(target: "graphmind.tools.executor", tool = name, summary = %display_text, "tool succeeded");
                ToolExecutionResult::ok(name, result, display_text)
            }
            Err(e) => {
                let error = describe(&e);
                tracing::warn!(target: "graphmind.tools.executor", tool = name, error = %error, "tool failed");
                ToolExecutionResult::failed(name, error)
            }
        }
    }

    async fn dispatch(&self, name: &str, args: &Args, ctx: &ToolContext) -> Result<Dispatched> {
        match name {
            tools::WHOOGLE_SEARCH => self.web_search(args).await,
            tools::UPDATE_CHAT_TITLE => update_title(args),
            tools::READ_DOC => read_doc(ctx),
            tools::VAULT_SEARCH => self.vault_search(args).await,
            tools::WEB_FETCH => self.web_fetch(args).await,
            tools::OPEN_FILE => self.open_file(args).await,
            memory => self.memory(memory, args).await,
        }
    }

    async fn web_search(&self, args: &Args) -> Result<Dispatched> {
        let search = self
            .collaborators
            .web_search
            .as_ref()
            .ok_or_else(|| unavailable("web search"))?;
        let query = args::required_str(args, "query")?;
        let page = args::optional_u64(args, "pageno").unwrap_or(1).max(1) as u32;

        let result = search.search(query, page).await?;
        let count = result["number_of_results"]
            .as_u64()
            .unwrap_or_else(|| count_of(&result, "results") as u64);
        Ok((Some(result), format!("Found {} search results", count)))
    }

    async fn vault_search(&self, args: &Args) -> Result<Dispatched> {
        let search = self
            .collaborators
            .vault_search
            .as_ref()
            .ok_or_else(|| unavailable("vault search"))?;
        let query = args::required_str(args, "query")?;
        let limit = args::optional_u64(args, "limit").unwrap_or(20) as u32;

        let result = search.search(query, limit).await?;
        let display = format!(
            "Search \"{}\" found {} results",
            query,
            count_of(&result, "results")
        );
        Ok((Some(result), display))
    }

    async fn web_fetch(&self, args: &Args) -> Result<Dispatched> {
        let fetcher = self
            .collaborators
            .web_fetch
            .as_ref()
            .ok_or_else(|| unavailable("web fetch"))?;
        let url = args::required_str(args, "url")?;
        let format = args::optional_str(args, "returnFormat").unwrap_or("markdown");

        let content = fetcher.fetch(url).await?;
        let display = format!("Fetched page content ({} characters)", content.chars().count());
        Ok((
            Some(json!({ "url": url, "content": content, "format": format })),
            display,
        ))
    }

    async fn open_file(&self, args: &Args) -> Result<Dispatched> {
        let opener = self
            .collaborators
            .file_opener
            .as_ref()
            .ok_or_else(|| unavailable("file opening"))?;
        let path = args::required_str(args, "path")?;

        opener.open(path).await?;
        Ok((
            Some(json!({ "path": path })),
            format!("Opened document: {}", path),
        ))
    }

    async fn memory(&self, name: &str, args: &Args) -> Result<Dispatched> {
        let graph: &Arc<dyn GraphStore> = self
            .collaborators
            .graph
            .as_ref()
            .ok_or_else(|| unavailable("knowledge graph"))?;

        match name {
            tools::MEMORY_CREATE_ENTITIES => {
                let result = graph
                    .create_entities(args::required_array(args, "entities")?)
                    .await?;
                let names: Vec<&str> = result["new_entities"]
                    .as_array()
                    .map(|a| a.iter().filter_map(|e| e["name"].as_str()).collect())
                    .unwrap_or_default();
                let display = format!("Created {} entities: {}", names.len(), names.join(", "));
                Ok((Some(result), display))
            }
            tools::MEMORY_ADD_OBSERVATIONS => {
                let result = graph
                    .add_observations(args::required_array(args, "observations")?)
                    .await?;
                let display = format!(
                    "Added observations to {} entities",
                    count_of(&result, "results")
                );
                Ok((Some(result), display))
            }
            tools::MEMORY_CREATE_RELATIONS => {
                let auto_create = args::optional_bool(args, "autoCreateEntities").unwrap_or(false);
                let result = graph
                    .create_relations(args::required_array(args, "relations")?, auto_create)
                    .await?;
                let display = format!("Created {} relations", count_of(&result, "relations"));
                Ok((Some(result), display))
            }
            tools::MEMORY_SEARCH_NODES => {
                let query = args::required_str(args, "query")?;
                let result = graph.search_nodes(query).await?;
                let display = format!(
                    "Keyword \"{}\" matched {} nodes",
                    query,
                    count_of(&result, "results")
                );
                Ok((Some(result), display))
            }
            tools::MEMORY_SEMANTIC_SEARCH => {
                let query = args::required_str(args, "query")?;
                let limit = args::optional_u64(args, "limit").unwrap_or(10) as u32;
                let result = graph.semantic_search(query, limit).await?;
                let display = format!(
                    "Semantic search found {} nodes",
                    count_of(&result, "results")
                );
                Ok((Some(result), display))
            }
            tools::MEMORY_READ_GRAPH => {
                let limit = args::optional_u64(args, "limit").map(|l| l as u32);
                let offset = args::optional_u64(args, "offset").unwrap_or(0) as u32;
                let result = graph.read_graph(limit, offset).await?;
                let display = format!("Read graph with {} entities", count_of(&result, "results"));
                Ok((Some(result), display))
            }
            tools::MEMORY_OPEN_NODES => {
                let names = args::string_list(args, "names")?;
                let result = graph.open_nodes(&names).await?;
                let display = format!("Retrieved {} nodes", count_of(&result, "results"));
                Ok((Some(result), display))
            }
            tools::MEMORY_DELETE_ENTITIES => {
                let names = args::string_list(args, "entityNames")?;
                let result = graph.delete_entities(&names).await?;
                let display = format!("Deleted {} entities", deleted_count(&result));
                Ok((Some(result), display))
            }
            tools::MEMORY_DELETE_OBSERVATIONS => {
                let result = graph
                    .delete_observations(args::required_array(args, "deletions")?)
                    .await?;
                let display = format!("Deleted {} observations", deleted_count(&result));
                Ok((Some(result), display))
            }
            tools::MEMORY_DELETE_RELATIONS => {
                let result = graph
                    .delete_relations(args::required_array(args, "relations")?)
                    .await?;
                let display = format!("Deleted {} relations", deleted_count(&result));
                Ok((Some(result), display))
            }
            tools::MEMORY_GENERATE_EMBEDDINGS => {
                let limit = args::optional_u64(args, "limit").unwrap_or(20) as u32;
                let result = graph
                    .generate_embeddings(args::optional_array(args, "entityNames"), limit)
                    .await?;
                Ok((Some(result), "Generated embeddings".to_string()))
            }
            tools::MEMORY_VIEW_TRASH => {
                let limit = args::optional_u64(args, "limit").unwrap_or(20) as u32;
                let offset = args::optional_u64(args, "offset").unwrap_or(0) as u32;
                let result = graph.view_trash(limit, offset).await?;
                let display = format!("Trash contains {} items", count_of(&result, "results"));
                Ok((Some(result), display))
            }
            tools::MEMORY_RESTORE_DELETED => {
                let entity_names = args::optional_array(args, "entityNames");
                let observations = args::optional_array(args, "observations");
                if entity_names.is_none() && observations.is_none() {
                    return Err(GraphmindError::InvalidInput(
                        "give entityNames or observations to restore".to_string(),
                    ));
                }
                let result = graph.restore_deleted(entity_names, observations).await?;
                Ok((Some(result), "Restored deleted content".to_string()))
            }
            other => Err(GraphmindError::ToolExecution(format!(
                "unknown tool: {}",
                other
            ))),
        }
    }
}

/// Parse and repair a call's arguments against its tool's schema
fn prepare(call: &ToolCall) -> Result<Args> {
    let definition = find(call.name())
        .ok_or_else(|| GraphmindError::ToolExecution(format!("unknown tool: {}", call.name())))?;
    let mut args = args::parse(call)?;
    args::repair(call.name(), &mut args, &definition.function.parameters)?;
    Ok(args)
}

fn update_title(args: &Args) -> Result<Dispatched> {
    let title = args::required_str(args, "title")
        .map_err(|_| GraphmindError::InvalidInput("title must not be empty".to_string()))?;
    Ok((
        Some(json!({ "title": title })),
        format!("Title changed to: {}", title),
    ))
}

fn read_doc(ctx: &ToolContext) -> Result<Dispatched> {
    let document = ctx
        .document
        .as_ref()
        .ok_or_else(|| unavailable("document reading (no document is attached)"))?;
    if document.content.trim().is_empty() {
        return Err(GraphmindError::ToolExecution(
            "the document is empty".to_string(),
        ));
    }
    let display = format!(
        "Read document ({} characters)",
        document.content.chars().count()
    );
    Ok((
        Some(json!({ "name": document.name, "content": document.content })),
        display,
    ))
}

fn unavailable(what: &str) -> GraphmindError {
    GraphmindError::ToolExecution(format!("{} is not configured", what))
}

fn count_of(result: &Value, field: &str) -> usize {
    result[field].as_array().map_or(0, Vec::len)
}

fn deleted_count(result: &Value) -> u64 {
    result["deleted_count"].as_u64().unwrap_or(0)
}

/// Error text without the error-kind prefix
fn describe(err: &GraphmindError) -> String {
    match err {
        GraphmindError::ToolExecution(msg)
        | GraphmindError::InvalidInput(msg)
        | GraphmindError::Config(msg) => msg.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::collaborators::{FileOpener, VaultSearch, WebFetch, WebSearch};
    use crate::tools::ContextDocument;
    use async_trait::async_trait;
    use std::sync::Mutex;

    // ===== Fakes =====

    struct FakeSearch;

    #[async_trait]
    impl WebSearch for FakeSearch {
        async fn search(&self, query: &str, page: u32) -> Result<Value> {
            Ok(json!({
                "query": query,
                "page": page,
                "number_of_results": 2,
                "results": [{"title": "a"}, {"title": "b"}]
            }))
        }
    }

    struct FailingSearch;

    #[async_trait]
    impl WebSearch for FailingSearch {
        async fn search(&self, _query: &str, _page: u32) -> Result<Value> {
            Err(GraphmindError::ToolExecution("HTTP 502: bad gateway".to_string()))
        }
    }

    struct FakeVault;

    #[async_trait]
    impl VaultSearch for FakeVault {
        async fn search(&self, _query: &str, limit: u32) -> Result<Value> {
            Ok(json!({"results": vec![json!({"path": "a.md"}); limit.min(3) as usize]}))
        }
    }

    struct FakeFetch;

    #[async_trait]
    impl WebFetch for FakeFetch {
        async fn fetch(&self, url: &str) -> Result<String> {
            Ok(format!("content of {}", url))
        }
    }

    #[derive(Default)]
    struct RecordingOpener(Mutex<Vec<String>>);

    #[async_trait]
    impl FileOpener for RecordingOpener {
        async fn open(&self, path: &str) -> Result<()> {
            self.0.lock().unwrap().push(path.to_string());
            Ok(())
        }
    }

    /// Records every payload it receives
    #[derive(Default)]
    struct RecordingGraph {
        calls: Mutex<Vec<(String, Value)>>,
    }

    impl RecordingGraph {
        fn record(&self, op: &str, payload: Value) {
            self.calls.lock().unwrap().push((op.to_string(), payload));
        }

        fn last(&self) -> (String, Value) {
            self.calls.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl GraphStore for RecordingGraph {
        async fn create_entities(&self, entities: Value) -> Result<Value> {
            self.record("create_entities", entities.clone());
            let created: Vec<Value> = entities
                .as_array()
                .unwrap()
                .iter()
                .map(|e| json!({"name": e["name"]}))
                .collect();
            Ok(json!({"new_entities": created}))
        }
        async fn add_observations(&self, observations: Value) -> Result<Value> {
            self.record("add_observations", observations.clone());
            Ok(json!({"results": observations}))
        }
        async fn create_relations(&self, relations: Value, auto: bool) -> Result<Value> {
            self.record("create_relations", json!({"relations": relations, "auto": auto}));
            Ok(json!({"relations": relations}))
        }
        async fn search_nodes(&self, query: &str) -> Result<Value> {
            self.record("search_nodes", json!(query));
            Ok(json!({"results": [{"name": "x"}]}))
        }
        async fn semantic_search(&self, query: &str, limit: u32) -> Result<Value> {
            self.record("semantic_search", json!({"query": query, "limit": limit}));
            Ok(json!({"results": []}))
        }
        async fn read_graph(&self, limit: Option<u32>, offset: u32) -> Result<Value> {
            self.record("read_graph", json!({"limit": limit, "offset": offset}));
            Ok(json!({"results": [{}, {}]}))
        }
        async fn open_nodes(&self, names: &[String]) -> Result<Value> {
            self.record("open_nodes", json!(names));
            Ok(json!({"results": names}))
        }
        async fn delete_entities(&self, names: &[String]) -> Result<Value> {
            self.record("delete_entities", json!(names));
            Ok(json!({"deleted_count": names.len()}))
        }
        async fn delete_observations(&self, deletions: Value) -> Result<Value> {
            self.record("delete_observations", deletions);
            Ok(json!({"deleted_count": 4}))
        }
        async fn delete_relations(&self, relations: Value) -> Result<Value> {
            self.record("delete_relations", relations);
            Ok(json!({}))
        }
        async fn generate_embeddings(&self, names: Option<Value>, limit: u32) -> Result<Value> {
            self.record("generate_embeddings", json!({"names": names, "limit": limit}));
            Ok(json!({"ok": true}))
        }
        async fn view_trash(&self, limit: u32, offset: u32) -> Result<Value> {
            self.record("view_trash", json!({"limit": limit, "offset": offset}));
            Ok(json!({"results": [{}]}))
        }
        async fn restore_deleted(&self, names: Option<Value>, obs: Option<Value>) -> Result<Value> {
            self.record("restore_deleted", json!({"names": names, "observations": obs}));
            Ok(json!({"restored": true}))
        }
    }

    fn call(name: &str, args: Value) -> ToolCall {
        ToolCall::new("call_1", name, args.to_string())
    }

    fn executor_with_graph() -> (ToolExecutor, Arc<RecordingGraph>) {
        let graph = Arc::new(RecordingGraph::default());
        let executor = ToolExecutor::new(Collaborators::default().with_graph(graph.clone()));
        (executor, graph)
    }

    // ===== Result Envelope Tests =====

    #[test]
    fn test_message_content_success_with_result() {
        let result = ToolExecutionResult::ok("t", Some(json!({"a": 1})), "done");
        assert_eq!(result.to_message_content(), r#"{"a":1}"#);
    }

    #[test]
    fn test_message_content_success_without_result() {
        let result = ToolExecutionResult::ok("t", None, "done");
        let value: Value = serde_json::from_str(&result.to_message_content()).unwrap();
        assert_eq!(value, json!({"status": "success", "message": "done"}));
    }

    #[test]
    fn test_message_content_failure() {
        let result = ToolExecutionResult::failed("whoogle_search", "timeout");
        let value: Value = serde_json::from_str(&result.to_message_content()).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"], "timeout");
        assert_eq!(value["message"], "Tool whoogle_search failed: timeout");
        assert_eq!(result.summary(), "whoogle_search failed: timeout");
    }

    #[test]
    fn test_new_title_only_for_title_tool() {
        let result = ToolExecutionResult::ok(tools::UPDATE_CHAT_TITLE, Some(json!({"title": "T"})), "x");
        assert_eq!(result.new_title(), Some("T"));
        let other = ToolExecutionResult::ok("read_doc", Some(json!({"title": "T"})), "x");
        assert_eq!(other.new_title(), None);
    }

    // ===== Dispatch Tests =====

    #[tokio::test]
    async fn test_unknown_tool() {
        let result = ToolExecutor::default()
            .execute(&call("shell", json!({})), &ToolContext::new())
            .await;
        assert!(!result.success);
        assert_eq!(result.tool_name, "shell");
        assert!(result.error.unwrap().contains("unknown tool"));
    }

    #[tokio::test]
    async fn test_invalid_json_arguments() {
        let result = ToolExecutor::default()
            .execute(
                &ToolCall::new("c", tools::UPDATE_CHAT_TITLE, "{\"title\":"),
                &ToolContext::new(),
            )
            .await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("not valid JSON"));
    }

    #[tokio::test]
    async fn test_missing_collaborator_is_recoverable() {
        let executor = ToolExecutor::default();
        let ctx = ToolContext::new();
        for (name, args) in [
            (tools::WHOOGLE_SEARCH, json!({"query": "x"})),
            (tools::VAULT_SEARCH, json!({"query": "x"})),
            (tools::WEB_FETCH, json!({"url": "https://x"})),
            (tools::OPEN_FILE, json!({"path": "a.md"})),
            (tools::MEMORY_SEARCH_NODES, json!({"query": "x"})),
        ] {
            let result = executor.execute(&call(name, args), &ctx).await;
            assert!(!result.success, "{} should fail", name);
            assert!(result.error.unwrap().contains("not configured"));
        }
    }

    #[tokio::test]
    async fn test_web_search() {
        let executor = ToolExecutor::new(Collaborators::default().with_web_search(Arc::new(FakeSearch)));
        let result = executor
            .execute(&call(tools::WHOOGLE_SEARCH, json!({"query": "rust"})), &ToolContext::new())
            .await;
        assert!(result.success);
        assert_eq!(result.display_text.as_deref(), Some("Found 2 search results"));
        assert_eq!(result.result.unwrap()["page"], 1);
    }

    #[tokio::test]
    async fn test_collaborator_error_becomes_result() {
        let executor =
            ToolExecutor::new(Collaborators::default().with_web_search(Arc::new(FailingSearch)));
        let result = executor
            .execute(&call(tools::WHOOGLE_SEARCH, json!({"query": "rust"})), &ToolContext::new())
            .await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("HTTP 502: bad gateway"));
    }

    #[tokio::test]
    async fn test_update_title() {
        let executor = ToolExecutor::default();
        let result = executor
            .execute(&call(tools::UPDATE_CHAT_TITLE, json!({"title": "  Rust notes "})), &ToolContext::new())
            .await;
        assert_eq!(result.new_title(), Some("Rust notes"));
        assert_eq!(result.display_text.as_deref(), Some("Title changed to: Rust notes"));

        let empty = executor
            .execute(&call(tools::UPDATE_CHAT_TITLE, json!({"title": " "})), &ToolContext::new())
            .await;
        assert!(!empty.success);
    }

    #[tokio::test]
    async fn test_read_doc() {
        let executor = ToolExecutor::default();
        let missing = executor
            .execute(&call(tools::READ_DOC, json!({})), &ToolContext::new())
            .await;
        assert!(!missing.success);

        let ctx = ToolContext::new().with_document(Some(ContextDocument::new("a.md", "héllo")));
        let result = executor.execute(&ToolCall::new("c", tools::READ_DOC, ""), &ctx).await;
        assert!(result.success);
        assert_eq!(result.display_text.as_deref(), Some("Read document (5 characters)"));
        assert_eq!(result.result.unwrap()["content"], "héllo");

        let ctx = ToolContext::new().with_document(Some(ContextDocument::new("a.md", "  ")));
        assert!(!executor.execute(&call(tools::READ_DOC, json!({})), &ctx).await.success);
    }

    #[tokio::test]
    async fn test_vault_fetch_and_open() {
        let opener = Arc::new(RecordingOpener::default());
        let executor = ToolExecutor::new(
            Collaborators::default()
                .with_vault_search(Arc::new(FakeVault))
                .with_web_fetch(Arc::new(FakeFetch))
                .with_file_opener(opener.clone()),
        );
        let ctx = ToolContext::new();

        let result = executor
            .execute(&call(tools::VAULT_SEARCH, json!({"query": "rust", "limit": 2})), &ctx)
            .await;
        assert_eq!(result.display_text.as_deref(), Some("Search \"rust\" found 2 results"));

        let result = executor
            .execute(&call(tools::WEB_FETCH, json!({"url": "https://a"})), &ctx)
            .await;
        let payload = result.result.unwrap();
        assert_eq!(payload["format"], "markdown");
        assert_eq!(payload["content"], "content of https://a");

        let result = executor
            .execute(&call(tools::OPEN_FILE, json!({"path": "notes/a.md"})), &ctx)
            .await;
        assert_eq!(result.display_text.as_deref(), Some("Opened document: notes/a.md"));
        assert_eq!(*opener.0.lock().unwrap(), vec!["notes/a.md".to_string()]);
    }

    // ===== Memory Tool Tests =====

    #[tokio::test]
    async fn test_create_entities_display() {
        let (executor, graph) = executor_with_graph();
        let result = executor
            .execute(
                &call(
                    tools::MEMORY_CREATE_ENTITIES,
                    json!({"entities": [
                        {"name": "Rust", "entityType": "language"},
                        {"name": "Cargo", "entityType": "tool"}
                    ]}),
                ),
                &ToolContext::new(),
            )
            .await;
        assert_eq!(result.display_text.as_deref(), Some("Created 2 entities: Rust, Cargo"));
        assert_eq!(graph.last().0, "create_entities");
    }

    #[tokio::test]
    async fn test_string_encoded_array_is_repaired() {
        let (executor, graph) = executor_with_graph();
        let encoded = r#"[{"entityName":"Rust","content":"fast"}]"#;
        let result = executor
            .execute(
                &call(tools::MEMORY_ADD_OBSERVATIONS, json!({"observations": encoded})),
                &ToolContext::new(),
            )
            .await;
        assert!(result.success);
        let (_, payload) = graph.last();
        assert_eq!(payload, json!([{"entityName": "Rust", "content": "fast"}]));
        assert_eq!(result.display_text.as_deref(), Some("Added observations to 1 entities"));
    }

    #[tokio::test]
    async fn test_unparseable_string_array_fails() {
        let (executor, graph) = executor_with_graph();
        let result = executor
            .execute(
                &call(tools::MEMORY_DELETE_ENTITIES, json!({"entityNames": "Rust, Cargo"})),
                &ToolContext::new(),
            )
            .await;
        assert!(!result.success);
        assert!(graph.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_defaults() {
        let (executor, graph) = executor_with_graph();
        let ctx = ToolContext::new();

        executor
            .execute(&call(tools::MEMORY_SEMANTIC_SEARCH, json!({"query": "q"})), &ctx)
            .await;
        assert_eq!(graph.last().1, json!({"query": "q", "limit": 10}));

        let result = executor.execute(&call(tools::MEMORY_READ_GRAPH, json!({})), &ctx).await;
        assert_eq!(graph.last().1, json!({"limit": null, "offset": 0}));
        assert_eq!(result.display_text.as_deref(), Some("Read graph with 2 entities"));

        executor.execute(&call(tools::MEMORY_VIEW_TRASH, json!({})), &ctx).await;
        assert_eq!(graph.last().1, json!({"limit": 20, "offset": 0}));

        executor
            .execute(&call(tools::MEMORY_GENERATE_EMBEDDINGS, json!({"entityNames": []})), &ctx)
            .await;
        assert_eq!(graph.last().1, json!({"names": null, "limit": 20}));

        executor
            .execute(
                &call(
                    tools::MEMORY_CREATE_RELATIONS,
                    json!({"relations": [{"from": "a", "to": "b", "relationType": "knows"}]}),
                ),
                &ctx,
            )
            .await;
        assert_eq!(graph.last().1["auto"], false);
    }

    #[tokio::test]
    async fn test_delete_counts() {
        let (executor, _graph) = executor_with_graph();
        let ctx = ToolContext::new();
        let result = executor
            .execute(&call(tools::MEMORY_DELETE_ENTITIES, json!({"entityNames": ["a", "b"]})), &ctx)
            .await;
        assert_eq!(result.display_text.as_deref(), Some("Deleted 2 entities"));

        let result = executor
            .execute(
                &call(
                    tools::MEMORY_DELETE_RELATIONS,
                    json!({"relations": [{"from": "a", "to": "b", "relationType": "r"}]}),
                ),
                &ctx,
            )
            .await;
        assert_eq!(result.display_text.as_deref(), Some("Deleted 0 relations"));
    }

    #[tokio::test]
    async fn test_restore_requires_something() {
        let (executor, _graph) = executor_with_graph();
        let ctx = ToolContext::new();
        let result = executor.execute(&call(tools::MEMORY_RESTORE_DELETED, json!({})), &ctx).await;
        assert!(!result.success);

        let result = executor
            .execute(&call(tools::MEMORY_RESTORE_DELETED, json!({"entityNames": ["a"]})), &ctx)
            .await;
        assert_eq!(result.display_text.as_deref(), Some("Restored deleted content"));
    }
}
