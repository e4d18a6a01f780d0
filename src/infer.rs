//! Schema Inference
//!
//! Derives a structural Draft-07 schema from a single JSON sample.
//!
//! Array elements are merged per kind: scalars of one type collapse, `integer`
//! and `number` widen to `number`, nested arrays merge their items, and objects
//! merge only when they share exactly the same key set. Whatever cannot be
//! merged is kept side by side under `anyOf`, in first-seen order. Keeping
//! differently-keyed objects apart means required-field tightening never
//! rejects the sample the schema was inferred from.

use serde_json::{json, Map, Value};

use crate::schema::{Schema, SchemaKind, DRAFT_07};

/// Infer a schema for `sample`, titled `title`
pub fn infer(title: &str, sample: &Value) -> Schema {
    let mut root = infer_node(sample);
    if let Value::Object(map) = &mut root {
        map.insert("$schema".to_string(), Value::String(DRAFT_07.to_string()));
        map.insert("title".to_string(), Value::String(title.to_string()));
    }
    Schema::new(root)
}

fn infer_node(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "type": "null" }),
        Value::Bool(_) => json!({ "type": "boolean" }),
        Value::Number(n) if n.is_i64() || n.is_u64() => json!({ "type": "integer" }),
        Value::Number(_) => json!({ "type": "number" }),
        Value::String(_) => json!({ "type": "string" }),
        Value::Array(items) => json!({
            "type": "array",
            "items": infer_items(items),
        }),
        Value::Object(fields) => {
            let properties: Map<String, Value> = fields
                .iter()
                .map(|(k, v)| (k.clone(), infer_node(v)))
                .collect();
            json!({
                "type": "object",
                "properties": properties,
                "additionalProperties": false,
            })
        }
    }
}

fn infer_items(items: &[Value]) -> Value {
    let mut variants: Vec<Value> = Vec::new();
    for item in items {
        absorb(&mut variants, infer_node(item));
    }
    collapse(variants)
}

/// Fold `shape` into the first compatible variant, or append it
fn absorb(variants: &mut Vec<Value>, shape: Value) {
    for existing in variants.iter_mut() {
        if let Some(merged) = merge(existing, &shape) {
            *existing = merged;
            return;
        }
    }
    variants.push(shape);
}

fn collapse(mut variants: Vec<Value>) -> Value {
    match variants.len() {
        0 => json!({}),
        1 => variants.remove(0),
        _ => json!({ "anyOf": variants }),
    }
}

/// Branches of a node: its `anyOf` members, or the node itself
fn branches(node: &Value) -> Vec<Value> {
    match node.get("anyOf").and_then(Value::as_array) {
        Some(list) => list.clone(),
        None => vec![node.clone()],
    }
}

/// Union of two property schemas, always succeeds
fn union(a: &Value, b: &Value) -> Value {
    let mut variants = Vec::new();
    for shape in branches(a).into_iter().chain(branches(b)) {
        absorb(&mut variants, shape);
    }
    collapse(variants)
}

fn merge(a: &Value, b: &Value) -> Option<Value> {
    let (ka, kb) = (SchemaKind::of(a)?, SchemaKind::of(b)?);
    match (ka, kb) {
        _ if ka == kb && ka.is_scalar() => Some(a.clone()),
        (SchemaKind::Integer, SchemaKind::Number) | (SchemaKind::Number, SchemaKind::Integer) => {
            Some(json!({ "type": "number" }))
        }
        (SchemaKind::Array, SchemaKind::Array) => {
            let items_a = a.get("items").cloned().unwrap_or_else(|| json!({}));
            let items_b = b.get("items").cloned().unwrap_or_else(|| json!({}));
            let items = if is_any(&items_a) {
                items_b
            } else if is_any(&items_b) {
                items_a
            } else {
                union(&items_a, &items_b)
            };
            Some(json!({ "type": "array", "items": items }))
        }
        (SchemaKind::Object, SchemaKind::Object) => merge_objects(a, b),
        _ => None,
    }
}

fn merge_objects(a: &Value, b: &Value) -> Option<Value> {
    let props_a = a.get("properties")?.as_object()?;
    let props_b = b.get("properties")?.as_object()?;
    if props_a.len() != props_b.len() || !props_a.keys().all(|k| props_b.contains_key(k)) {
        return None;
    }
    let properties: Map<String, Value> = props_a
        .iter()
        .map(|(k, va)| (k.clone(), union(va, &props_b[k])))
        .collect();
    Some(json!({
        "type": "object",
        "properties": properties,
        "additionalProperties": false,
    }))
}

fn is_any(node: &Value) -> bool {
    node.as_object().map(Map::is_empty).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_metadata() {
        let schema = infer("ProductsFilter", &json!({"id": 1}));
        assert_eq!(schema.title(), Some("ProductsFilter"));
        assert_eq!(schema.content()["$schema"], DRAFT_07);
        assert_eq!(schema.content()["additionalProperties"], false);
    }

    #[test]
    fn test_scalars() {
        let schema = infer("T", &json!({"i": 1, "f": 1.5, "s": "x", "b": true, "n": null}));
        let props = &schema.content()["properties"];
        assert_eq!(props["i"]["type"], "integer");
        assert_eq!(props["f"]["type"], "number");
        assert_eq!(props["s"]["type"], "string");
        assert_eq!(props["b"]["type"], "boolean");
        assert_eq!(props["n"]["type"], "null");
    }

    #[test]
    fn test_homogeneous_object_array_merges() {
        let schema = infer("T", &json!([{"id": 1, "name": "a"}, {"id": 2, "name": "b"}]));
        let items = &schema.content()["items"];
        assert_eq!(items["type"], "object");
        assert_eq!(items["properties"]["id"]["type"], "integer");
        assert!(items.get("anyOf").is_none());
    }

    #[test]
    fn test_numeric_widening() {
        let schema = infer("T", &json!([1, 2.5, 3]));
        assert_eq!(schema.content()["items"], json!({"type": "number"}));
    }

    #[test]
    fn test_mixed_scalars_become_any_of() {
        let schema = infer("T", &json!(["a", null, "b", 1]));
        assert_eq!(
            schema.content()["items"],
            json!({"anyOf": [{"type": "string"}, {"type": "null"}, {"type": "integer"}]})
        );
    }

    #[test]
    fn test_objects_with_different_keys_stay_apart() {
        let schema = infer("T", &json!([{"id": 1}, {"id": 2, "slug": "x"}]));
        let any_of = schema.content()["items"]["anyOf"].as_array().unwrap();
        assert_eq!(any_of.len(), 2);
    }

    #[test]
    fn test_same_keys_union_property_types() {
        let schema = infer("T", &json!([{"v": 1}, {"v": "x"}, {"v": null}]));
        assert_eq!(
            schema.content()["items"]["properties"]["v"],
            json!({"anyOf": [{"type": "integer"}, {"type": "string"}, {"type": "null"}]})
        );
    }

    #[test]
    fn test_empty_array_items_accept_anything() {
        let schema = infer("T", &json!({"tags": []}));
        assert_eq!(schema.content()["properties"]["tags"]["items"], json!({}));
    }

    #[test]
    fn test_nested_arrays_merge_items() {
        let schema = infer("T", &json!([[], [1], [2.0]]));
        assert_eq!(
            schema.content()["items"],
            json!({"type": "array", "items": {"type": "number"}})
        );
    }
}
