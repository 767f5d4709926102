// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Tool argument parsing
//!
//! Some providers send array or object arguments as JSON-encoded strings
//! (`"[1,2,3]"` instead of `[1,2,3]`). `repair` uses the tool's schema to
//! find those and decode them before the arguments reach a collaborator.

use serde_json::{Map, Value};

use crate::error::{GraphmindError, Result};
use crate::llm::message::ToolCall;

/// Parsed arguments of one tool call
pub type Args = Map<String, Value>;

/// Parse a call's argument string. Empty input means no arguments.
pub fn parse(call: &ToolCall) -> Result<Args> {
    match call.parsed_arguments() {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Args::new()),
        Ok(other) => Err(GraphmindError::InvalidInput(format!(
            "arguments must be a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(GraphmindError::InvalidInput(format!(
            "arguments are not valid JSON: {}",
            e
        ))),
    }
}

/// Decode string-encoded arrays and objects for every property the schema
/// types as `array` or `object`. Returns the names that were repaired.
pub fn repair(tool_name: &str, args: &mut Args, schema: &Value) -> Result<Vec<String>> {
    let Some(properties) = schema["properties"].as_object() else {
        return Ok(Vec::new());
    };

    let mut repaired = Vec::new();
    for (name, property) in properties {
        let expected = match property["type"].as_str() {
            Some(kind @ ("array" | "object")) => kind,
            _ => continue,
        };
        let Some(Value::String(encoded)) = args.get(name) else {
            continue;
        };

        let decoded: Value = serde_json::from_str(encoded).map_err(|_| {
            GraphmindError::InvalidInput(format!(
                "argument '{}' must be an {}, got a string that is not valid JSON",
                name, expected
            ))
        })?;
        if json_kind(&decoded) != expected {
            return Err(GraphmindError::InvalidInput(format!(
                "argument '{}' must be an {}, got a string holding {}",
                name,
                expected,
                json_kind(&decoded)
            )));
        }

        tracing::info!(
            target: "graphmind.tools.args",
            tool = tool_name,
            argument = %name,
            "decoded string-encoded {} argument",
            expected
        );
        args.insert(name.clone(), decoded);
        repaired.push(name.clone());
    }

    Ok(repaired)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A required, non-blank string argument
pub fn required_str<'a>(args: &'a Args, name: &str) -> Result<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| GraphmindError::InvalidInput(format!("missing required argument '{}'", name)))
}

/// An optional string argument
pub fn optional_str<'a>(args: &'a Args, name: &str) -> Option<&'a str> {
    args.get(name).and_then(Value::as_str)
}

/// An optional non-negative integer. Numeric strings are accepted.
pub fn optional_u64(args: &Args, name: &str) -> Option<u64> {
    match args.get(name)? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// An optional boolean. `"true"`/`"false"` strings are accepted.
pub fn optional_bool(args: &Args, name: &str) -> Option<bool> {
    match args.get(name)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A required array argument
pub fn required_array(args: &Args, name: &str) -> Result<Value> {
    match args.get(name) {
        Some(value @ Value::Array(_)) => Ok(value.clone()),
        Some(other) => Err(GraphmindError::InvalidInput(format!(
            "argument '{}' must be an array, got {}",
            name,
            json_kind(other)
        ))),
        None => Err(GraphmindError::InvalidInput(format!(
            "missing required argument '{}'",
            name
        ))),
    }
}

/// An optional array argument; empty arrays count as absent
pub fn optional_array(args: &Args, name: &str) -> Option<Value> {
    args.get(name)
        .filter(|v| v.as_array().is_some_and(|a| !a.is_empty()))
        .cloned()
}

/// An array of strings
pub fn string_list(args: &Args, name: &str) -> Result<Vec<String>> {
    let value = required_array(args, name)?;
    serde_json::from_value(value).map_err(|_| {
        GraphmindError::InvalidInput(format!("argument '{}' must be a list of strings", name))
    })
}
