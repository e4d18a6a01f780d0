//! Schema documents and node kinds

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::checksum::Checksum;

/// Dialect URI stamped on every inferred schema
pub const DRAFT_07: &str = "http://json-schema.org/draft-07/schema#";

/// Kind of a single schema node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaKind {
    Object,
    Array,
    String,
    Integer,
    Number,
    Boolean,
    Null,
    /// `anyOf` / `oneOf` of several shapes
    Union,
    /// `{}` - accepts anything
    Any,
}

impl SchemaKind {
    /// Map a JSON Schema `type` keyword to a kind
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "object" => Some(Self::Object),
            "array" => Some(Self::Array),
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "null" => Some(Self::Null),
            _ => None,
        }
    }

    /// Kind of a schema node, `None` when the node carries an unknown tag
    pub fn of(node: &Value) -> Option<Self> {
        let map = node.as_object()?;
        if map.contains_key("anyOf") || map.contains_key("oneOf") {
            return Some(Self::Union);
        }
        match map.get("type") {
            Some(Value::String(name)) => Self::from_type_name(name),
            Some(Value::Array(_)) => Some(Self::Union),
            Some(_) => None,
            None if map.contains_key("properties") => Some(Self::Object),
            None if map.contains_key("items") => Some(Self::Array),
            None => Some(Self::Any),
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Self::String | Self::Integer | Self::Number | Self::Boolean | Self::Null
        )
    }
}

/// True when `node` is an object schema (explicit type or bare `properties`)
pub fn is_object_node(node: &Value) -> bool {
    SchemaKind::of(node) == Some(SchemaKind::Object)
}

/// True when `node` is an array schema
pub fn is_array_node(node: &Value) -> bool {
    SchemaKind::of(node) == Some(SchemaKind::Array)
}

/// A JSON Schema document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    content: Value,
}

impl Schema {
    pub fn new(content: Value) -> Self {
        Self { content }
    }

    pub fn content(&self) -> &Value {
        &self.content
    }

    pub fn content_mut(&mut self) -> &mut Value {
        &mut self.content
    }

    pub fn into_content(self) -> Value {
        self.content
    }

    /// Root `title`, if any
    pub fn title(&self) -> Option<&str> {
        self.content.get("title").and_then(Value::as_str)
    }

    /// Kind of the root node
    pub fn kind(&self) -> Option<SchemaKind> {
        SchemaKind::of(&self.content)
    }

    /// Canonical on-disk form: pretty-printed, sorted keys, trailing newline
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        to_artifact_json(&self.content)
    }

    /// Checksum of the canonical on-disk form
    pub fn checksum(&self) -> serde_json::Result<Checksum> {
        Ok(Checksum::of_str(&self.to_pretty_json()?))
    }

    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        Ok(Self::new(serde_json::from_slice(bytes)?))
    }
}

impl From<Value> for Schema {
    fn from(content: Value) -> Self {
        Self::new(content)
    }
}

/// Serialize any JSON value the way artifacts are stored
pub fn to_artifact_json(value: &Value) -> serde_json::Result<String> {
    let mut text = serde_json::to_string_pretty(&canonicalize(value))?;
    text.push('\n');
    Ok(text)
}

/// Rebuild `value` with every object's keys in sorted order.
/// Key order must not depend on serde_json's `preserve_order` feature.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_detection() {
        assert_eq!(SchemaKind::of(&json!({"type": "object"})), Some(SchemaKind::Object));
        assert_eq!(SchemaKind::of(&json!({"properties": {}})), Some(SchemaKind::Object));
        assert_eq!(SchemaKind::of(&json!({"type": "integer"})), Some(SchemaKind::Integer));
        assert_eq!(SchemaKind::of(&json!({"anyOf": []})), Some(SchemaKind::Union));
        assert_eq!(SchemaKind::of(&json!({"type": ["string", "null"]})), Some(SchemaKind::Union));
        assert_eq!(SchemaKind::of(&json!({})), Some(SchemaKind::Any));
        assert_eq!(SchemaKind::of(&json!({"type": "date"})), None);
        assert_eq!(SchemaKind::of(&json!("string")), None);
    }

    #[test]
    fn test_artifact_json_has_sorted_keys_and_newline() {
        let schema = Schema::new(json!({"type": "object", "title": "T", "additionalProperties": false}));
        let text = schema.to_pretty_json().unwrap();
        assert!(text.ends_with("}\n"));
        let add = text.find("additionalProperties").unwrap();
        let title = text.find("title").unwrap();
        let ty = text.find("\"type\"").unwrap();
        assert!(add < title && title < ty);
    }

    #[test]
    fn test_checksum_tracks_content() {
        let a = Schema::new(json!({"type": "string"}));
        let b = Schema::new(json!({"type": "integer"}));
        assert_eq!(a.checksum().unwrap(), a.clone().checksum().unwrap());
        assert_ne!(a.checksum().unwrap(), b.checksum().unwrap());
    }
}
