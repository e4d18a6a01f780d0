//! Rust Code Emitter
//!
//! Generates serde-ready Rust types from a `TypeShape`.
//!
//! Key constraints:
//! - This module ONLY receives a `TypeShape` - no raw JSON
//! - Nested objects become named structs (`Parent` + field name), emitted
//!   before the types that use them
//! - Closed objects carry `deny_unknown_fields`

use super::names::{rust_field_name, to_pascal_case, NameAllocator};
use super::{FieldShape, ScalarKind, TypeShape};

const HEADER: &str = "use serde::{Deserialize, Serialize};\n";
const DERIVES: &str = "#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]\n";

// =============================================================================
// Public API
// =============================================================================

/// Emit a Rust module body for `shape` rooted at `name`
pub fn emit(shape: &TypeShape, name: &str) -> String {
    let mut emitter = Emitter::default();
    let root = emitter.names.allocate(name);
    match shape {
        TypeShape::Object { fields, open } => emitter.emit_struct(&root, fields, *open),
        other => {
            let target = emitter.type_of(other, &root);
            emitter.items.push(format!("pub type {} = {};\n", root, target));
        }
    }

    let mut output = String::from(HEADER);
    for item in emitter.items {
        output.push('\n');
        output.push_str(&item);
    }
    output
}

// =============================================================================
// Type Emission
// =============================================================================

#[derive(Default)]
struct Emitter {
    names: NameAllocator,
    /// Finished definitions, dependencies first
    items: Vec<String>,
}

impl Emitter {
    /// Rust type expression for `shape`; `hint` names any type it has to define
    fn type_of(&mut self, shape: &TypeShape, hint: &str) -> String {
        match shape {
            TypeShape::Scalar(kind) => scalar(*kind).to_string(),
            TypeShape::Any => "serde_json::Value".to_string(),
            TypeShape::Array(inner) => {
                format!("Vec<{}>", self.type_of(inner, &format!("{}Item", hint)))
            }
            TypeShape::Object { fields, open } => {
                let name = self.names.allocate(hint);
                self.emit_struct(&name, fields, *open);
                name
            }
            TypeShape::Union(variants) => {
                let (rest, nullable) = TypeShape::split_nullable(variants);
                let inner = match rest.as_slice() {
                    [] => return "Option<serde_json::Value>".to_string(),
                    [single] => self.type_of(single, hint),
                    _ => {
                        let name = self.names.allocate(hint);
                        self.emit_untagged(&name, &rest);
                        name
                    }
                };
                if nullable {
                    optional(inner)
                } else {
                    inner
                }
            }
        }
    }

    fn emit_struct(&mut self, name: &str, fields: &[FieldShape], open: bool) {
        // distinct JSON keys can collapse to one identifier ("ID" and "id")
        let mut field_names = NameAllocator::new();
        let mut body = String::new();
        for field in fields {
            let hint = format!("{}{}", name, to_pascal_case(&field.json_name));
            let ty = self.type_of(&field.shape, &hint);
            let rust_name = field_names.allocate(&rust_field_name(&field.json_name));
            emit_field(&mut body, field, &rust_name, ty);
        }

        let mut output = format!("/// {}\n", name);
        output.push_str(DERIVES);
        if !open {
            output.push_str("#[serde(deny_unknown_fields)]\n");
        }
        output.push_str(&format!("pub struct {} {{\n", name));
        output.push_str(&body);
        output.push_str("}\n");
        self.items.push(output);
    }

    fn emit_untagged(&mut self, name: &str, variants: &[&TypeShape]) {
        let mut variant_names = NameAllocator::new();
        let mut body = String::new();
        for variant in variants {
            let variant_name = variant_names.allocate(variant_label(variant));
            let ty = self.type_of(variant, &format!("{}{}", name, variant_name));
            body.push_str(&format!("    {}({}),\n", variant_name, ty));
        }

        let mut output = format!("/// {}\n", name);
        output.push_str(DERIVES);
        output.push_str("#[serde(untagged)]\n");
        output.push_str(&format!("pub enum {} {{\n", name));
        output.push_str(&body);
        output.push_str("}\n");
        self.items.push(output);
    }
}

fn emit_field(output: &mut String, field: &FieldShape, rust_name: &str, ty: String) {
    if rust_name.trim_start_matches("r#") != field.json_name {
        output.push_str(&format!("    #[serde(rename = {:?})]\n", field.json_name));
    }

    let full_type = if field.required {
        ty
    } else {
        output.push_str("    #[serde(default, skip_serializing_if = \"Option::is_none\")]\n");
        optional(ty)
    };
    output.push_str(&format!("    pub {}: {},\n", rust_name, full_type));
}

// =============================================================================
// Helper Utilities
// =============================================================================

fn scalar(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::String => "String",
        ScalarKind::Integer => "i64",
        ScalarKind::Number => "f64",
        ScalarKind::Boolean => "bool",
        // only ever observed as null
        ScalarKind::Null => "Option<serde_json::Value>",
    }
}

/// Wrap in `Option` unless it already is one
fn optional(ty: String) -> String {
    if ty.starts_with("Option<") {
        ty
    } else {
        format!("Option<{}>", ty)
    }
}

fn variant_label(shape: &TypeShape) -> &'static str {
    match shape {
        TypeShape::Scalar(ScalarKind::String) => "String",
        TypeShape::Scalar(ScalarKind::Integer) => "Integer",
        TypeShape::Scalar(ScalarKind::Number) => "Number",
        TypeShape::Scalar(ScalarKind::Boolean) => "Boolean",
        TypeShape::Scalar(ScalarKind::Null) => "Null",
        TypeShape::Array(_) => "Array",
        TypeShape::Object { .. } => "Object",
        TypeShape::Union(_) => "Union",
        TypeShape::Any => "Value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::{emit as emit_schema, TypeLanguage};
    use crate::infer::infer;
    use crate::normalize::tighten_required;
    use crate::schema::Schema;
    use serde_json::json;

    fn emit_sample(sample: serde_json::Value, name: &str) -> String {
        let mut schema = infer(name, &sample);
        tighten_required(schema.content_mut());
        emit_schema(&schema, name, TypeLanguage::Rust).unwrap()
    }

    #[test]
    fn test_flat_struct() {
        let out = emit_sample(json!({"id": 1, "title": "x", "price": 1.5, "live": true}), "Product");
        let expected = "\
use serde::{Deserialize, Serialize};

/// Product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Product {
    pub id: i64,
    pub live: bool,
    pub price: f64,
    pub title: String,
}
";
        assert_eq!(out, expected);
    }

    #[test]
    fn test_nested_structs_emitted_first() {
        let out = emit_sample(json!({"pages": [{"slug": "a"}]}), "Products");
        let nested = out.find("pub struct ProductsPagesItem").unwrap();
        let root = out.find("pub struct Products {").unwrap();
        assert!(nested < root);
        assert!(out.contains("pub pages: Vec<ProductsPagesItem>,"));
    }

    #[test]
    fn test_optional_fields_and_renames() {
        let schema = Schema::new(json!({
            "type": "object",
            "properties": {
                "featuredImage": {"type": "string"},
                "type": {"type": "string"}
            },
            "required": ["type"],
            "additionalProperties": false
        }));
        let out = emit_schema(&schema, "Post", TypeLanguage::Rust).unwrap();
        assert!(out.contains(
            "    #[serde(rename = \"featuredImage\")]\n    #[serde(default, skip_serializing_if = \"Option::is_none\")]\n    pub featured_image: Option<String>,\n"
        ));
        assert!(out.contains("    pub r#type: String,\n"));
        assert!(!out.contains("rename = \"type\""));
    }

    #[test]
    fn test_nullable_union_becomes_option() {
        let out = emit_sample(json!({"tags": ["a", null]}), "Post");
        assert!(out.contains("pub tags: Vec<Option<String>>,"), "{}", out);
    }

    #[test]
    fn test_mixed_union_becomes_untagged_enum() {
        let out = emit_sample(json!({"value": [1, "a"]}), "Setting");
        assert!(out.contains("#[serde(untagged)]\npub enum SettingValueItem {"));
        assert!(out.contains("    Integer(i64),\n    String(String),\n"));
    }

    #[test]
    fn test_open_object_and_alias_root() {
        let open = TypeShape::Object { fields: vec![], open: true };
        let out = emit(&open, "Bag");
        assert!(!out.contains("deny_unknown_fields"));
        let list = TypeShape::Array(Box::new(TypeShape::Scalar(ScalarKind::Integer)));
        assert!(emit(&list, "Ids").ends_with("pub type Ids = Vec<i64>;\n"));
    }

    #[test]
    fn test_output_is_deterministic() {
        let sample = json!({"b": {"x": 1}, "a": [{"y": "z"}]});
        assert_eq!(emit_sample(sample.clone(), "Doc"), emit_sample(sample, "Doc"));
    }

    #[test]
    fn test_colliding_field_names_are_suffixed() {
        let out = emit_sample(json!({"ID": 1, "id": 2}), "Post");
        assert_eq!(out.matches("    pub id: i64,").count(), 1, "{}", out);
        assert_eq!(out.matches("    pub id2: i64,").count(), 1, "{}", out);
        assert!(out.contains("#[serde(rename = \"ID\")]"), "{}", out);
    }
}
