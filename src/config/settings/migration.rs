// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use serde_json::Value;

/// Flat camelCase keys from the plugin's `data.json` and the nested
/// section/key they map to.
const PLUGIN_KEYS: [(&str, &str, &str); 11] = [
    ("llmApiUrl", "llm", "api_url"),
    ("llmApiKey", "llm", "api_key"),
    ("llmModelName", "llm", "model"),
    ("llmApiType", "llm", "api_type"),
    ("llmSystemRules", "llm", "system_rules"),
    ("searchWhoogleUrl", "search", "whoogle_url"),
    ("searchAuthEnabled", "search", "auth_enabled"),
    ("searchAuthKey", "search", "auth_key"),
    ("searchDefaultEnabled", "search", "default_enabled"),
    ("mcpApiUrl", "graph", "api_url"),
    ("mcpApiKey", "graph", "api_key"),
];

/// Fold plugin-style flat keys into their sections. Nested values win,
/// and empty strings are treated as unset.
pub(super) fn migrate_on_load(value: Value) -> Value {
    let Value::Object(mut map) = value else {
        return value;
    };

    for (flat, section, key) in PLUGIN_KEYS {
        let Some(v) = map.remove(flat) else {
            continue;
        };
        if v.is_null() || v.as_str().is_some_and(|s| s.trim().is_empty()) {
            continue;
        }
        let entry = map
            .entry(section.to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        if let Value::Object(section_map) = entry {
            section_map.entry(key.to_string()).or_insert(v);
        }
    }

    Value::Object(map)
}

/// Deep-merge two JSON values.
/// `base` is existing file content, `overlay` is serialized current struct.
/// Overlay values take priority.
pub(super) fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                let merged = if let Some(base_val) = base_map.remove(&key) {
                    deep_merge(base_val, overlay_val)
                } else {
                    overlay_val
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_base, overlay) => overlay,
    }
}
