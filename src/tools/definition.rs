// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Tool definition types
//!
//! The catalog of callable tools offered to the model, and the schema
//! builder used to describe their arguments.

use std::sync::OnceLock;

use serde_json::{json, Value};

use crate::llm::provider::ToolDefinition;

pub const WHOOGLE_SEARCH: &str = "whoogle_search";
pub const UPDATE_CHAT_TITLE: &str = "update_chat_title";
pub const READ_DOC: &str = "read_doc";
pub const VAULT_SEARCH: &str = "obsidian_global_search";
pub const WEB_FETCH: &str = "web_fetch";
pub const OPEN_FILE: &str = "obsidian_open_file";
pub const MEMORY_CREATE_ENTITIES: &str = "memory_create_entities";
pub const MEMORY_ADD_OBSERVATIONS: &str = "memory_add_observations";
pub const MEMORY_CREATE_RELATIONS: &str = "memory_create_relations";
pub const MEMORY_SEARCH_NODES: &str = "memory_search_nodes";
pub const MEMORY_SEMANTIC_SEARCH: &str = "memory_semantic_search";
pub const MEMORY_READ_GRAPH: &str = "memory_read_graph";
pub const MEMORY_OPEN_NODES: &str = "memory_open_nodes";
pub const MEMORY_DELETE_ENTITIES: &str = "memory_delete_entities";
pub const MEMORY_DELETE_OBSERVATIONS: &str = "memory_delete_observations";
pub const MEMORY_DELETE_RELATIONS: &str = "memory_delete_relations";
pub const MEMORY_GENERATE_EMBEDDINGS: &str = "memory_generate_embeddings";
pub const MEMORY_VIEW_TRASH: &str = "memory_view_trash";
pub const MEMORY_RESTORE_DELETED: &str = "memory_restore_deleted";

/// Helper to create a tool input schema
pub struct SchemaBuilder {
    properties: serde_json::Map<String, Value>,
    required: Vec<String>,
}

impl SchemaBuilder {
    /// Create a new schema builder
    pub fn new() -> Self {
        Self {
            properties: serde_json::Map::new(),
            required: vec![],
        }
    }

    /// Add a property with an arbitrary schema
    pub fn property(mut self, name: &str, schema: Value, required: bool) -> Self {
        self.properties.insert(name.to_string(), schema);
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    /// Add a string property
    pub fn string(self, name: &str, description: &str, required: bool) -> Self {
        self.property(
            name,
            json!({ "type": "string", "description": description }),
            required,
        )
    }

    /// Add a string property limited to `values`
    pub fn string_enum(
        self,
        name: &str,
        description: &str,
        values: &[&str],
        default: &str,
    ) -> Self {
        self.property(
            name,
            json!({
                "type": "string",
                "description": description,
                "enum": values,
                "default": default
            }),
            false,
        )
    }

    /// Add an integer property
    pub fn integer(self, name: &str, description: &str, required: bool) -> Self {
        self.property(
            name,
            json!({ "type": "integer", "description": description }),
            required,
        )
    }

    /// Add an optional integer property with a default
    pub fn integer_default(self, name: &str, description: &str, default: i64) -> Self {
        self.property(
            name,
            json!({ "type": "integer", "description": description, "default": default }),
            false,
        )
    }

    /// Add a boolean property
    pub fn boolean(self, name: &str, description: &str, required: bool) -> Self {
        self.property(
            name,
            json!({ "type": "boolean", "description": description }),
            required,
        )
    }

    /// Add an array property
    pub fn array(self, name: &str, description: &str, item_type: &str, required: bool) -> Self {
        self.property(
            name,
            json!({
                "type": "array",
                "description": description,
                "items": { "type": item_type }
            }),
            required,
        )
    }

    /// Add an array property whose items are objects described by `items`
    pub fn object_array(
        self,
        name: &str,
        description: &str,
        items: SchemaBuilder,
        required: bool,
    ) -> Self {
        self.property(
            name,
            json!({
                "type": "array",
                "description": description,
                "items": items.build()
            }),
            required,
        )
    }

    /// Build the schema
    pub fn build(self) -> Value {
        json!({
            "type": "object",
            "properties": Value::Object(self.properties),
            "required": self.required,
        })
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn relation_items(relation_description: &str) -> SchemaBuilder {
    SchemaBuilder::new()
        .string("from", "Source entity name", true)
        .string("to", "Target entity name", true)
        .string("relationType", relation_description, true)
}

fn observation_items() -> SchemaBuilder {
    SchemaBuilder::new()
        .string("entityName", "Entity name", true)
        .string("content", "Observation text", true)
}

fn build_catalog() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::function(
            WHOOGLE_SEARCH,
            "Search the web for current information. Use it for recent news, fact checking or finding pages to read.",
            SchemaBuilder::new()
                .string(
                    "query",
                    "Search keywords or question, e.g. \"weather in Shanghai today\"",
                    true,
                )
                .integer_default("pageno", "Result page number, defaults to 1", 1)
                .build(),
        ),
        ToolDefinition::function(
            UPDATE_CHAT_TITLE,
            "Change the title of the current conversation. Use it when the user asks for a new title or the topic has clearly changed.",
            SchemaBuilder::new()
                .string(
                    "title",
                    "New title summarising the conversation, ideally under 20 characters",
                    true,
                )
                .build(),
        ),
        ToolDefinition::function(
            READ_DOC,
            "Read the full content of the document the user currently has open. Use it when the user refers to \"this document\" or \"this note\".",
            SchemaBuilder::new().build(),
        ),
        ToolDefinition::function(
            VAULT_SEARCH,
            "Search every note in the vault by keyword. Matches titles and Markdown content; several keywords may be given.",
            SchemaBuilder::new()
                .string("query", "Search keywords, e.g. \"Python programming\"", true)
                .integer_default("limit", "Maximum number of results, defaults to 20", 20)
                .build(),
        ),
        ToolDefinition::function(
            WEB_FETCH,
            "Fetch the content of a web page by URL, as Markdown or plain text. Use it to read articles and documentation.",
            SchemaBuilder::new()
                .string("url", "Page URL, e.g. \"https://example.com/article\"", true)
                .string_enum(
                    "returnFormat",
                    "Return format: markdown (default) or text",
                    &["markdown", "text"],
                    "markdown",
                )
                .build(),
        ),
        ToolDefinition::function(
            OPEN_FILE,
            "Open a note for the user, e.g. to point them at a specific document.",
            SchemaBuilder::new()
                .string(
                    "path",
                    "Relative path or file name of the note, e.g. \"folder/note.md\"",
                    true,
                )
                .build(),
        ),
        ToolDefinition::function(
            MEMORY_CREATE_ENTITIES,
            "Create new entities in the knowledge graph (people, concepts, events, places, ...) with optional observations. Supports batches.",
            SchemaBuilder::new()
                .object_array(
                    "entities",
                    "Entities to create",
                    SchemaBuilder::new()
                        .string("name", "Entity name", true)
                        .string(
                            "entityType",
                            "Entity type, e.g. \"person\", \"concept\", \"event\", \"place\"",
                            true,
                        )
                        .array("observations", "Observations about the entity", "string", false),
                    true,
                )
                .build(),
        ),
        ToolDefinition::function(
            MEMORY_ADD_OBSERVATIONS,
            "Add observations to existing entities, to record new facts or state changes. Supports batches.",
            SchemaBuilder::new()
                .object_array(
                    "observations",
                    "Observations to add; entityName must already exist",
                    observation_items(),
                    true,
                )
                .build(),
        ),
        ToolDefinition::function(
            MEMORY_CREATE_RELATIONS,
            "Create relations between entities, such as membership, cause or acquaintance. Supports batches.",
            SchemaBuilder::new()
                .object_array(
                    "relations",
                    "Relations to create",
                    relation_items("Relation type, e.g. \"knows\", \"belongs_to\", \"located_in\""),
                    true,
                )
                .property(
                    "autoCreateEntities",
                    json!({
                        "type": "boolean",
                        "description": "Create missing entities automatically (default false)",
                        "default": false
                    }),
                    false,
                )
                .build(),
        ),
        ToolDefinition::function(
            MEMORY_SEARCH_NODES,
            "Keyword search over entity names, types and observations. Space separated keywords must all match.",
            SchemaBuilder::new()
                .string("query", "Search keywords", true)
                .build(),
        ),
        ToolDefinition::function(
            MEMORY_SEMANTIC_SEARCH,
            "Find entities semantically related to a query using vector similarity. Better than keyword search for fuzzy questions.",
            SchemaBuilder::new()
                .string("query", "Question, description or concept", true)
                .integer_default("limit", "Maximum number of results, defaults to 10", 10)
                .build(),
        ),
        ToolDefinition::function(
            MEMORY_READ_GRAPH,
            "Read the knowledge graph page by page. Use the paging arguments to keep responses small.",
            SchemaBuilder::new()
                .integer("limit", "Number of entities to return; 20 is a good size", false)
                .integer_default("offset", "Paging offset, defaults to 0", 0)
                .build(),
        ),
        ToolDefinition::function(
            MEMORY_OPEN_NODES,
            "Fetch entities by exact name together with their relations.",
            SchemaBuilder::new()
                .array("names", "Entity names", "string", true)
                .build(),
        ),
        ToolDefinition::function(
            MEMORY_DELETE_ENTITIES,
            "Move entities and their relations to the trash. Deleted entities can be restored.",
            SchemaBuilder::new()
                .array("entityNames", "Names of the entities to delete", "string", true)
                .build(),
        ),
        ToolDefinition::function(
            MEMORY_DELETE_OBSERVATIONS,
            "Move specific observations of an entity to the trash. Deleted observations can be restored.",
            SchemaBuilder::new()
                .object_array(
                    "deletions",
                    "Observations to delete, grouped by entity",
                    SchemaBuilder::new()
                        .string("entityName", "Entity name", true)
                        .array("observations", "Observation texts to delete", "string", true),
                    true,
                )
                .build(),
        ),
        ToolDefinition::function(
            MEMORY_DELETE_RELATIONS,
            "Delete specific relations from the knowledge graph.",
            SchemaBuilder::new()
                .object_array(
                    "relations",
                    "Relations to delete",
                    relation_items("Relation type"),
                    true,
                )
                .build(),
        ),
        ToolDefinition::function(
            MEMORY_GENERATE_EMBEDDINGS,
            "Generate vectors for semantic search, for the named entities or for entities that have none yet.",
            SchemaBuilder::new()
                .array(
                    "entityNames",
                    "Entities to embed; when empty, entities missing vectors are processed",
                    "string",
                    false,
                )
                .integer_default(
                    "limit",
                    "How many entities to process when entityNames is empty, defaults to 20",
                    20,
                )
                .build(),
        ),
        ToolDefinition::function(
            MEMORY_VIEW_TRASH,
            "List deleted entities and observations in the trash, page by page.",
            SchemaBuilder::new()
                .integer_default("limit", "Number of entities to return, defaults to 20", 20)
                .integer_default("offset", "Paging offset, defaults to 0", 0)
                .build(),
        ),
        ToolDefinition::function(
            MEMORY_RESTORE_DELETED,
            "Restore deleted entities or observations from the trash.",
            SchemaBuilder::new()
                .array("entityNames", "Entities to restore", "string", false)
                .object_array("observations", "Observations to restore", observation_items(), false)
                .build(),
        ),
    ]
}

/// Every tool the executor knows how to run
pub fn catalog() -> &'static [ToolDefinition] {
    static CATALOG: OnceLock<Vec<ToolDefinition>> = OnceLock::new();
    CATALOG.get_or_init(build_catalog)
}

/// Look up a tool definition by name
pub fn find(name: &str) -> Option<&'static ToolDefinition> {
    catalog().iter().find(|d| d.name() == name)
}

/// Tool set offered for one turn. `whoogle_search` needs web search to be
/// enabled and `read_doc` needs an attached document; everything else is
/// always offered.
pub fn available_tools(web_search_enabled: bool, has_document: bool) -> Vec<ToolDefinition> {
    catalog()
        .iter()
        .filter(|d| match d.name() {
            WHOOGLE_SEARCH => web_search_enabled,
            READ_DOC => has_document,
            _ => true,
        })
        .cloned()
        .collect()
}
