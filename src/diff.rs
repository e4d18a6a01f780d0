//! Contract change reports
//!
//! Compares a previous contract with the schema replacing it and lists the
//! structural changes a consumer of the emitted types would notice.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use similar::TextDiff;

use crate::schema::{Schema, SchemaKind};

/// Result of comparing two contracts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompatibilityResult {
    /// Whether a consumer of the old contract keeps working
    pub is_compatible: bool,
    /// List of changes detected
    pub changes: Vec<SchemaChange>,
    /// Summary of the comparison
    pub summary: String,
}

impl CompatibilityResult {
    fn from_changes(changes: Vec<SchemaChange>) -> Self {
        let breaking = changes.iter().filter(|c| c.is_breaking).count();
        let summary = if changes.is_empty() {
            "No changes detected".to_string()
        } else if breaking > 0 {
            format!("{} changes, {} breaking", changes.len(), breaking)
        } else {
            format!("{} compatible changes detected", changes.len())
        };
        Self {
            is_compatible: breaking == 0,
            changes,
            summary,
        }
    }

    pub fn breaking(&self) -> impl Iterator<Item = &SchemaChange> {
        self.changes.iter().filter(|c| c.is_breaking)
    }
}

/// A detected change between two contracts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaChange {
    pub change_type: ChangeType,
    /// Schema path, e.g. `properties.pages.items.properties.slug`
    pub path: String,
    pub is_breaking: bool,
    pub description: String,
}

/// Type of contract change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    FieldAdded,
    FieldRemoved,
    TypeChanged,
    /// required <-> optional
    OptionalityChanged,
}

/// Structural changes from `old` to `new`
pub fn compare(old: &Schema, new: &Schema) -> CompatibilityResult {
    let mut changes = Vec::new();
    compare_node(old.content(), new.content(), "", &mut changes);
    CompatibilityResult::from_changes(changes)
}

fn compare_node(old: &Value, new: &Value, path: &str, changes: &mut Vec<SchemaChange>) {
    let old_kind = SchemaKind::of(old);
    let new_kind = SchemaKind::of(new);
    if old_kind != new_kind {
        changes.push(SchemaChange {
            change_type: ChangeType::TypeChanged,
            path: display_path(path),
            is_breaking: true,
            description: format!("type changed from {} to {}", kind_name(old_kind), kind_name(new_kind)),
        });
        return;
    }

    match old_kind {
        Some(SchemaKind::Object) => compare_objects(old, new, path, changes),
        Some(SchemaKind::Array) => {
            if let (Some(old_items), Some(new_items)) = (old.get("items"), new.get("items")) {
                compare_node(old_items, new_items, &join(path, "items"), changes);
            }
        }
        // union members or scalar types shifted within the same kind
        Some(SchemaKind::Union) if strip_docs(old) != strip_docs(new) => changes.push(SchemaChange {
            change_type: ChangeType::TypeChanged,
            path: display_path(path),
            is_breaking: true,
            description: "union members changed".to_string(),
        }),
        _ => {}
    }
}

fn compare_objects(old: &Value, new: &Value, path: &str, changes: &mut Vec<SchemaChange>) {
    let empty = Map::new();
    let old_props = old.get("properties").and_then(Value::as_object).unwrap_or(&empty);
    let new_props = new.get("properties").and_then(Value::as_object).unwrap_or(&empty);
    let old_required = required_names(old);
    let new_required = required_names(new);

    for (name, old_prop) in old_props {
        let prop_path = join(path, &format!("properties.{}", name));
        match new_props.get(name) {
            None => changes.push(SchemaChange {
                change_type: ChangeType::FieldRemoved,
                path: prop_path,
                is_breaking: true,
                description: format!("Property '{}' was removed", name),
            }),
            Some(new_prop) => {
                let was = old_required.contains(&name.as_str());
                let is = new_required.contains(&name.as_str());
                if was != is {
                    changes.push(SchemaChange {
                        change_type: ChangeType::OptionalityChanged,
                        path: prop_path.clone(),
                        // consumers relied on it being present
                        is_breaking: was,
                        description: if was {
                            format!("Property '{}' is no longer required", name)
                        } else {
                            format!("Property '{}' is now required", name)
                        },
                    });
                }
                compare_node(old_prop, new_prop, &prop_path, changes);
            }
        }
    }

    for name in new_props.keys().filter(|k| !old_props.contains_key(*k)) {
        changes.push(SchemaChange {
            change_type: ChangeType::FieldAdded,
            path: join(path, &format!("properties.{}", name)),
            is_breaking: false,
            description: format!("Property '{}' was added", name),
        });
    }
}

fn required_names(node: &Value) -> Vec<&str> {
    node.get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

fn strip_docs(node: &Value) -> Value {
    let mut copy = node.clone();
    if let Some(map) = copy.as_object_mut() {
        for key in ["title", "description", "$schema"] {
            map.remove(key);
        }
    }
    copy
}

fn join(base: &str, segment: &str) -> String {
    if base.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", base, segment)
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.to_string()
    }
}

fn kind_name(kind: Option<SchemaKind>) -> String {
    kind.map(|k| format!("{:?}", k).to_lowercase())
        .unwrap_or_else(|| "invalid".to_string())
}

/// Line diff of two artifact texts, unified format
pub fn unified_diff(old_text: &str, new_text: &str, old_label: &str, new_label: &str) -> String {
    TextDiff::from_lines(old_text, new_text)
        .unified_diff()
        .context_radius(3)
        .header(old_label, new_label)
        .to_string()
}
