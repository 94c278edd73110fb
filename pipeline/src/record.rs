//! Loosely-structured log record model.
//!
//! Upstream agent traces have no fixed schema; a record is one JSON object
//! per line and only `name` is reliably present. Everything else degrades to
//! "no extractable content" instead of erroring.

use serde_json::{Map, Value};

/// Event name that starts a new conversation segment.
pub const GENERATION_EVENT: &str = "custom-generation-ex";

/// Event name prefix for tool invocation records.
pub const TOOL_CALL_PREFIX: &str = "tool call";

#[derive(Debug, Clone)]
pub struct LogRecord {
    value: Value,
}

/// The polymorphic `input` field, resolved once per record instead of
/// re-inspecting the JSON type at every extraction site.
#[derive(Debug, Clone, Copy)]
pub enum InputPayload<'a> {
    /// Ordered sequence of text-bearing parts.
    Parts(&'a [Value]),
    /// Mapping form, typically carrying a `result` string.
    Object(&'a Map<String, Value>),
    Missing,
}

impl<'a> InputPayload<'a> {
    pub fn result_str(&self) -> Option<&'a str> {
        match self {
            InputPayload::Object(map) => map.get("result").and_then(Value::as_str),
            _ => None,
        }
    }

    /// Text of the part at `index`, if the payload is in list form.
    pub fn part_text(&self, index: usize) -> Option<&'a str> {
        match self {
            InputPayload::Parts(parts) => parts
                .get(index)
                .and_then(|p| p.get("text"))
                .and_then(Value::as_str),
            _ => None,
        }
    }
}

impl LogRecord {
    pub fn from_value(value: Value) -> Self {
        Self { value }
    }

    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::from_value(serde_json::from_str(line)?))
    }

    pub fn name(&self) -> &str {
        self.value.get("name").and_then(Value::as_str).unwrap_or("")
    }

    pub fn is_generation(&self) -> bool {
        self.name() == GENERATION_EVENT
    }

    pub fn is_tool_call(&self) -> bool {
        self.name().starts_with(TOOL_CALL_PREFIX)
    }

    pub fn input(&self) -> InputPayload<'_> {
        match self.value.get("input") {
            Some(Value::Array(parts)) => InputPayload::Parts(parts),
            Some(Value::Object(map)) => InputPayload::Object(map),
            _ => InputPayload::Missing,
        }
    }

    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        self.value.get("metadata").and_then(Value::as_object)
    }

    pub fn tool_call_id(&self) -> Option<&str> {
        self.metadata()?.get("tool_call_id").and_then(Value::as_str)
    }

    pub fn tool_name(&self) -> Option<&str> {
        self.metadata()?.get("tool_name").and_then(Value::as_str)
    }
}
