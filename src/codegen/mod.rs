//! Code Generation
//!
//! Emits a textual type definition for a schema.
//!
//! Architecture:
//! - `lower`: raw schema JSON -> `TypeShape`, the only place that reads JSON.
//!   Unknown or malformed nodes fail here with a `TypeEmissionError`.
//! - Emitters (`typescript`, `rust`): render a `TypeShape` tree. They never
//!   see raw schema JSON.
//!
//! Output is a pure function of schema + name: properties are rendered in
//! sorted order and nothing time-dependent is written.

pub mod names;
pub mod rust;
pub mod typescript;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TypeEmissionError;
use crate::schema::{Schema, SchemaKind};

// =============================================================================
// Target Language
// =============================================================================

/// Language of the emitted type definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeLanguage {
    #[default]
    TypeScript,
    Rust,
}

impl TypeLanguage {
    /// File extension for `<name>-types.<ext>`
    pub fn extension(&self) -> &'static str {
        match self {
            TypeLanguage::TypeScript => "d.ts",
            TypeLanguage::Rust => "rs",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "typescript" | "ts" => Some(Self::TypeScript),
            "rust" | "rs" => Some(Self::Rust),
            _ => None,
        }
    }
}

impl fmt::Display for TypeLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeLanguage::TypeScript => f.write_str("typescript"),
            TypeLanguage::Rust => f.write_str("rust"),
        }
    }
}

// =============================================================================
// Type Shapes
// =============================================================================

/// JSON scalar type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Integer,
    Number,
    Boolean,
    Null,
}

/// A field of an object shape
#[derive(Debug, Clone, PartialEq)]
pub struct FieldShape {
    pub json_name: String,
    pub required: bool,
    pub shape: TypeShape,
}

/// Language-agnostic structure of a schema node
#[derive(Debug, Clone, PartialEq)]
pub enum TypeShape {
    Scalar(ScalarKind),
    Array(Box<TypeShape>),
    Object {
        /// Sorted by JSON name
        fields: Vec<FieldShape>,
        /// `additionalProperties` is not `false`
        open: bool,
    },
    Union(Vec<TypeShape>),
    Any,
}

impl TypeShape {
    /// Union members other than `null`, and whether `null` was among them
    pub fn split_nullable(variants: &[TypeShape]) -> (Vec<&TypeShape>, bool) {
        let mut nullable = false;
        let mut rest = Vec::new();
        for v in variants {
            if *v == TypeShape::Scalar(ScalarKind::Null) {
                nullable = true;
            } else {
                rest.push(v);
            }
        }
        (rest, nullable)
    }
}

/// Lower a schema into its type shape
pub fn lower(schema: &Schema) -> Result<TypeShape, TypeEmissionError> {
    lower_node(schema.content(), "#")
}

fn lower_node(node: &Value, path: &str) -> Result<TypeShape, TypeEmissionError> {
    let map = node.as_object().ok_or_else(|| TypeEmissionError {
        path: path.to_string(),
        reason: format!("expected a schema object, found {}", node),
    })?;

    for keyword in ["anyOf", "oneOf"] {
        if let Some(list) = map.get(keyword) {
            return lower_union(list, &format!("{}/{}", path, keyword));
        }
    }

    match map.get("type") {
        Some(Value::Array(names)) => {
            let variants = names
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let p = format!("{}/type/{}", path, i);
                    let name = name.as_str().ok_or_else(|| unknown_kind(&p, name))?;
                    lower_typed(node, name, &p)
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(TypeShape::Union(variants))
        }
        Some(Value::String(name)) => lower_typed(node, name, path),
        Some(other) => Err(unknown_kind(&format!("{}/type", path), other)),
        None => match SchemaKind::of(node) {
            Some(SchemaKind::Object) => lower_typed(node, "object", path),
            Some(SchemaKind::Array) => lower_typed(node, "array", path),
            _ => Ok(TypeShape::Any),
        },
    }
}

fn lower_union(list: &Value, path: &str) -> Result<TypeShape, TypeEmissionError> {
    let members = list.as_array().ok_or_else(|| TypeEmissionError {
        path: path.to_string(),
        reason: "union must be an array".to_string(),
    })?;
    if members.is_empty() {
        return Err(TypeEmissionError {
            path: path.to_string(),
            reason: "union has no members".to_string(),
        });
    }
    let variants = members
        .iter()
        .enumerate()
        .map(|(i, m)| lower_node(m, &format!("{}/{}", path, i)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(TypeShape::Union(variants))
}

fn lower_typed(node: &Value, type_name: &str, path: &str) -> Result<TypeShape, TypeEmissionError> {
    let kind = SchemaKind::from_type_name(type_name)
        .ok_or_else(|| unknown_kind(path, &Value::String(type_name.to_string())))?;
    Ok(match kind {
        SchemaKind::String => TypeShape::Scalar(ScalarKind::String),
        SchemaKind::Integer => TypeShape::Scalar(ScalarKind::Integer),
        SchemaKind::Number => TypeShape::Scalar(ScalarKind::Number),
        SchemaKind::Boolean => TypeShape::Scalar(ScalarKind::Boolean),
        SchemaKind::Null => TypeShape::Scalar(ScalarKind::Null),
        SchemaKind::Array => {
            let items = match node.get("items") {
                None => TypeShape::Any,
                Some(Value::Array(_)) => {
                    return Err(TypeEmissionError {
                        path: format!("{}/items", path),
                        reason: "tuple arrays are not supported".to_string(),
                    })
                }
                Some(items) => lower_node(items, &format!("{}/items", path))?,
            };
            TypeShape::Array(Box::new(items))
        }
        SchemaKind::Object => {
            let required: Vec<&str> = node
                .get("required")
                .and_then(Value::as_array)
                .map(|r| r.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            let mut fields = Vec::new();
            if let Some(props) = node.get("properties") {
                let props = props.as_object().ok_or_else(|| TypeEmissionError {
                    path: format!("{}/properties", path),
                    reason: "properties must be an object".to_string(),
                })?;
                for (name, child) in props {
                    fields.push(FieldShape {
                        json_name: name.clone(),
                        required: required.contains(&name.as_str()),
                        shape: lower_node(child, &format!("{}/properties/{}", path, name))?,
                    });
                }
            }
            fields.sort_by(|a, b| a.json_name.cmp(&b.json_name));
            let open = node.get("additionalProperties") != Some(&Value::Bool(false));
            TypeShape::Object { fields, open }
        }
        SchemaKind::Union | SchemaKind::Any => TypeShape::Any,
    })
}

fn unknown_kind(path: &str, tag: &Value) -> TypeEmissionError {
    TypeEmissionError {
        path: path.to_string(),
        reason: format!("unrecognized type tag {}", tag),
    }
}

// =============================================================================
// Public API
// =============================================================================

/// Emit a type definition named `name` for `schema`
pub fn emit(schema: &Schema, name: &str, language: TypeLanguage) -> Result<String, TypeEmissionError> {
    let shape = lower(schema)?;
    Ok(match language {
        TypeLanguage::TypeScript => typescript::emit(&shape, name),
        TypeLanguage::Rust => rust::emit(&shape, name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lower_object_fields_sorted() {
        let schema = Schema::new(json!({
            "type": "object",
            "properties": {"title": {"type": "string"}, "id": {"type": "integer"}},
            "required": ["id"],
            "additionalProperties": false
        }));
        match lower(&schema).unwrap() {
            TypeShape::Object { fields, open } => {
                assert!(!open);
                assert_eq!(fields[0].json_name, "id");
                assert!(fields[0].required);
                assert_eq!(fields[1].json_name, "title");
                assert!(!fields[1].required);
            }
            other => panic!("Expected Object, got {:?}", other),
        }
    }

    #[test]
    fn test_lower_type_list_is_union() {
        let schema = Schema::new(json!({"type": ["string", "null"]}));
        assert_eq!(
            lower(&schema).unwrap(),
            TypeShape::Union(vec![
                TypeShape::Scalar(ScalarKind::String),
                TypeShape::Scalar(ScalarKind::Null)
            ])
        );
    }

    #[test]
    fn test_unknown_kind_reports_path() {
        let schema = Schema::new(json!({
            "type": "object",
            "properties": {"when": {"type": "date"}}
        }));
        let err = lower(&schema).unwrap_err();
        assert_eq!(err.path, "#/properties/when");
        assert!(err.reason.contains("date"));
    }

    #[test]
    fn test_empty_union_rejected() {
        let schema = Schema::new(json!({"anyOf": []}));
        assert_eq!(lower(&schema).unwrap_err().path, "#/anyOf");
    }

    #[test]
    fn test_non_object_node_rejected() {
        let schema = Schema::new(json!({"type": "array", "items": 7}));
        assert_eq!(lower(&schema).unwrap_err().path, "#/items");
    }

    #[test]
    fn test_language_extension() {
        assert_eq!(TypeLanguage::TypeScript.extension(), "d.ts");
        assert_eq!(TypeLanguage::Rust.extension(), "rs");
        assert_eq!(TypeLanguage::parse("TS"), Some(TypeLanguage::TypeScript));
        assert_eq!(TypeLanguage::parse("go"), None);
    }
}
