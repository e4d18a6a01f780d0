//! Schema Normalization
//!
//! Post-processing applied to freshly inferred schemas. Both operations only
//! ever add names to `required`, so the result validates a subset of what the
//! input validated.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::schema::{is_array_node, is_object_node};

/// Mark every observed property of every object node as required
pub fn tighten_required(node: &mut Value) {
    let Some(map) = node.as_object_mut() else {
        return;
    };

    if let Some(Value::Object(props)) = map.get_mut("properties") {
        for child in props.values_mut() {
            tighten_required(child);
        }
    }
    match map.get_mut("items") {
        Some(Value::Array(tuple)) => tuple.iter_mut().for_each(tighten_required),
        Some(items) => tighten_required(items),
        None => {}
    }
    for keyword in ["anyOf", "oneOf", "allOf"] {
        if let Some(Value::Array(list)) = map.get_mut(keyword) {
            list.iter_mut().for_each(tighten_required);
        }
    }

    let keys: Vec<String> = match map.get("properties") {
        Some(Value::Object(props)) if !props.is_empty() => props.keys().cloned().collect(),
        _ => return,
    };
    let mut required = string_list(map.get("required"));
    required.extend(keys);
    required.sort();
    required.dedup();
    map.insert(
        "required".to_string(),
        Value::Array(required.into_iter().map(Value::String).collect()),
    );
}

/// One step from a schema node to a child node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    /// `properties.<name>`
    Property(String),
    /// Array element schema
    Items,
}

/// A route from the schema root to a sub-schema, written as dot-separated
/// tokens such as `properties.pages.items`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchemaPath {
    steps: Vec<PathStep>,
}

impl SchemaPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new(steps: Vec<PathStep>) -> Self {
        Self { steps }
    }

    /// `properties` consumes the following token as a property name, `items`
    /// is an array step, and any other token is shorthand for a property.
    pub fn parse(text: &str) -> Self {
        let mut steps = Vec::new();
        let mut tokens = text.split('.').filter(|t| !t.is_empty());
        while let Some(token) = tokens.next() {
            match token {
                "properties" => match tokens.next() {
                    Some(name) => steps.push(PathStep::Property(name.to_string())),
                    None => steps.push(PathStep::Property("properties".to_string())),
                },
                "items" => steps.push(PathStep::Items),
                name => steps.push(PathStep::Property(name.to_string())),
            }
        }
        Self { steps }
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Resolve to the object node this path designates.
    ///
    /// An `Items` step on a node without array items falls back to a property
    /// literally named `items`, and a path ending on an array resolves through
    /// to its element schema.
    pub fn resolve_mut<'a>(&self, root: &'a mut Value) -> Option<&'a mut Value> {
        let mut current = root;
        for step in &self.steps {
            current = match step {
                PathStep::Property(name) => current.get_mut("properties")?.get_mut(name.as_str())?,
                PathStep::Items => {
                    if is_array_node(current) && current.get("items").is_some() {
                        current.get_mut("items")?
                    } else {
                        current.get_mut("properties")?.get_mut("items")?
                    }
                }
            };
        }
        while is_array_node(current) {
            current = current.get_mut("items")?;
        }
        if is_object_node(current) {
            Some(current)
        } else {
            None
        }
    }
}

impl fmt::Display for SchemaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return f.write_str("<root>");
        }
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match step {
                PathStep::Property(name) => write!(f, "properties.{}", name)?,
                PathStep::Items => f.write_str("items")?,
            }
        }
        Ok(())
    }
}

/// Union `names` into the `required` set of the object node at `path`.
///
/// Returns `false` without touching the schema when the path does not lead to
/// an object node; a sample may legitimately lack the structure.
pub fn force_required(schema: &mut Value, path: &SchemaPath, names: &[String]) -> bool {
    let Some(node) = path.resolve_mut(schema) else {
        debug!(path = %path, "forced-required path not present, skipping");
        return false;
    };
    let Some(map) = node.as_object_mut() else {
        return false;
    };
    let mut required = string_list(map.get("required"));
    for name in names {
        if !required.contains(name) {
            required.push(name.clone());
        }
    }
    map.insert(
        "required".to_string(),
        Value::Array(required.into_iter().map(Value::String).collect()),
    );
    true
}

/// A configured forced-required override
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredOverride {
    /// Endpoint slug this override is limited to; all endpoints when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Dot path, e.g. `properties.pages.items`
    pub path: String,
    /// Field names to force into `required`
    pub required: Vec<String>,
}

impl RequiredOverride {
    pub fn applies_to(&self, endpoint: &str) -> bool {
        self.endpoint.as_deref().map_or(true, |e| e == endpoint)
    }

    /// Apply to `schema`, returning whether the path resolved
    pub fn apply(&self, schema: &mut Value) -> bool {
        force_required(schema, &SchemaPath::parse(&self.path), &self.required)
    }
}

/// Full normalization: tighten, then apply every override matching `endpoint`
pub fn normalize(schema: &mut Value, endpoint: &str, overrides: &[RequiredOverride]) -> usize {
    tighten_required(schema);
    overrides
        .iter()
        .filter(|o| o.applies_to(endpoint))
        .filter(|o| o.apply(schema))
        .count()
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infer::infer;
    use serde_json::json;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_tighten_marks_all_properties() {
        let mut schema = infer("T", &json!({"title": "x", "id": 1})).into_content();
        tighten_required(&mut schema);
        assert_eq!(schema["required"], json!(["id", "title"]));
    }

    #[test]
    fn test_tighten_recurses_through_arrays() {
        let mut schema = infer("T", &json!({"rows": [[{"a": 1, "b": {"c": true}}]]})).into_content();
        tighten_required(&mut schema);
        let inner = &schema["properties"]["rows"]["items"]["items"];
        assert_eq!(inner["required"], json!(["a", "b"]));
        assert_eq!(inner["properties"]["b"]["required"], json!(["c"]));
    }

    #[test]
    fn test_tighten_recurses_into_any_of() {
        let mut schema = infer("T", &json!([{"id": 1}, {"slug": "x"}])).into_content();
        tighten_required(&mut schema);
        let branches = schema["items"]["anyOf"].as_array().unwrap();
        assert_eq!(branches[0]["required"], json!(["id"]));
        assert_eq!(branches[1]["required"], json!(["slug"]));
    }

    #[test]
    fn test_tighten_leaves_empty_objects_alone() {
        let mut schema = json!({"type": "object", "properties": {}});
        tighten_required(&mut schema);
        assert!(schema.get("required").is_none());
    }

    #[test]
    fn test_tighten_keeps_existing_required_names() {
        let mut schema = json!({
            "type": "object",
            "properties": {"id": {"type": "integer"}},
            "required": ["slug"]
        });
        tighten_required(&mut schema);
        assert_eq!(schema["required"], json!(["id", "slug"]));
    }

    #[test]
    fn test_tighten_is_idempotent() {
        let mut once = infer("T", &json!({"a": [{"b": 1}], "c": {"d": null}})).into_content();
        tighten_required(&mut once);
        let mut twice = once.clone();
        tighten_required(&mut twice);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_path_parse() {
        let path = SchemaPath::parse("properties.pages.items");
        assert_eq!(
            path.steps(),
            &[PathStep::Property("pages".to_string()), PathStep::Items]
        );
        assert_eq!(path.to_string(), "properties.pages.items");
        assert_eq!(SchemaPath::parse("").steps(), &[]);
        assert_eq!(
            SchemaPath::parse("data.items").steps(),
            &[PathStep::Property("data".to_string()), PathStep::Items]
        );
    }

    #[test]
    fn test_force_required_through_items_property() {
        let mut schema = infer("T", &json!({"pages": {"items": [{"id": 1}]}})).into_content();
        tighten_required(&mut schema);
        let applied = force_required(
            &mut schema,
            &SchemaPath::parse("properties.pages.items"),
            &names(&["id", "title", "url", "img", "slug"]),
        );
        assert!(applied);
        let item = &schema["properties"]["pages"]["properties"]["items"]["items"];
        assert_eq!(item["required"], json!(["id", "title", "url", "img", "slug"]));
    }

    #[test]
    fn test_force_required_through_array_items() {
        let mut schema = infer("T", &json!({"posts": [{"id": 1}]})).into_content();
        let applied = force_required(
            &mut schema,
            &SchemaPath::parse("properties.posts.items"),
            &names(&["slug"]),
        );
        assert!(applied);
        assert_eq!(schema["properties"]["posts"]["items"]["required"], json!(["slug"]));
    }

    #[test]
    fn test_force_required_missing_path_is_noop() {
        let mut schema = infer("T", &json!({"id": 1})).into_content();
        tighten_required(&mut schema);
        let before = schema.clone();
        assert!(!force_required(&mut schema, &SchemaPath::parse("properties.pages.items"), &names(&["id"])));
        assert!(!force_required(&mut schema, &SchemaPath::parse("properties.id"), &names(&["x"])));
        assert_eq!(schema, before);
    }

    #[test]
    fn test_force_required_deduplicates() {
        let mut schema = infer("T", &json!({"id": 1})).into_content();
        tighten_required(&mut schema);
        force_required(&mut schema, &SchemaPath::root(), &names(&["id", "slug", "slug"]));
        assert_eq!(schema["required"], json!(["id", "slug"]));
    }

    #[test]
    fn test_override_endpoint_filter() {
        let scoped = RequiredOverride {
            endpoint: Some("products".to_string()),
            path: String::new(),
            required: names(&["slug"]),
        };
        assert!(scoped.applies_to("products"));
        assert!(!scoped.applies_to("menus"));

        let mut schema = infer("T", &json!({"id": 1})).into_content();
        assert_eq!(normalize(&mut schema, "menus", &[scoped.clone()]), 0);
        assert_eq!(schema["required"], json!(["id"]));
        assert_eq!(normalize(&mut schema, "products", &[scoped]), 1);
        assert_eq!(schema["required"], json!(["id", "slug"]));
    }
}
