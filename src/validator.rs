//! Contract Validation
//!
//! Compiles a schema into a Draft-07 validator and reports every violation in
//! a single pass. Two named modes exist:
//!
//! - [`ValidationMode::Strict`] checks the instance as-is; undeclared
//!   properties are violations wherever `additionalProperties` is `false`.
//! - [`ValidationMode::Sanitize`] works on a copy of the instance. It strips
//!   properties an object node does not declare and fills declared properties
//!   that carry a `default`, then checks the result.

use std::fmt;

use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, JSONSchema, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ContractError, Result};
use crate::schema::Schema;

/// How a compiled validator treats the instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    Strict,
    Sanitize,
}

/// One mismatch between an instance and a schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// JSON pointer into the instance, e.g. `/pages/0/slug`
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "path: {}  message: {}", path, self.message)
    }
}

/// What sanitizing changed on the checked copy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizeReport {
    /// Instance paths of removed undeclared properties
    pub stripped: Vec<String>,
    /// Instance paths filled from a schema `default`
    pub defaulted: Vec<String>,
}

impl SanitizeReport {
    pub fn is_empty(&self) -> bool {
        self.stripped.is_empty() && self.defaulted.is_empty()
    }
}

/// Outcome of checking one instance
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub violations: Vec<Violation>,
    /// Present in sanitizing mode
    pub sanitized: Option<SanitizeReport>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A compiled schema plus the mode it checks in
pub struct ContractValidator {
    compiled: JSONSchema,
    schema: Value,
    mode: ValidationMode,
}

impl ContractValidator {
    /// Compile `schema` for `mode`
    pub fn compile(schema: &Schema, mode: ValidationMode) -> Result<Self> {
        let content = schema.content().clone();
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&content)
            .map_err(|e| ContractError::InvalidSchema(e.to_string()))?;
        Ok(Self {
            compiled,
            schema: content,
            mode,
        })
    }

    pub fn strict(schema: &Schema) -> Result<Self> {
        Self::compile(schema, ValidationMode::Strict)
    }

    pub fn sanitizing(schema: &Schema) -> Result<Self> {
        Self::compile(schema, ValidationMode::Sanitize)
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// Check `instance`, collecting every violation
    pub fn check(&self, instance: &Value) -> ValidationResult {
        match self.mode {
            ValidationMode::Strict => ValidationResult {
                violations: self.collect(instance),
                sanitized: None,
            },
            ValidationMode::Sanitize => {
                let mut copy = instance.clone();
                let mut report = SanitizeReport::default();
                sanitize(&self.schema, &mut copy, "", &mut report);
                ValidationResult {
                    violations: self.collect(&copy),
                    sanitized: Some(report),
                }
            }
        }
    }

    fn collect(&self, instance: &Value) -> Vec<Violation> {
        match self.compiled.validate(instance) {
            Ok(()) => Vec::new(),
            Err(errors) => errors.flat_map(|e| to_violations(&e)).collect(),
        }
    }
}

fn to_violations(error: &ValidationError<'_>) -> Vec<Violation> {
    let base = error.instance_path.to_string();
    match &error.kind {
        ValidationErrorKind::Required { property } => {
            let name = property
                .as_str()
                .map(String::from)
                .unwrap_or_else(|| property.to_string());
            vec![Violation::new(child_pointer(&base, &name), "is required")]
        }
        ValidationErrorKind::AdditionalProperties { unexpected } => unexpected
            .iter()
            .map(|name| Violation::new(child_pointer(&base, name), "is not allowed"))
            .collect(),
        _ => vec![Violation::new(base, error.to_string())],
    }
}

fn child_pointer(base: &str, name: &str) -> String {
    let escaped = name.replace('~', "~0").replace('/', "~1");
    format!("{}/{}", base, escaped)
}

/// Strip undeclared properties and fill defaults, following `properties` and
/// `items` only. Union branches are left alone: which branch an instance
/// belongs to is not known before validation.
fn sanitize(schema: &Value, instance: &mut Value, path: &str, report: &mut SanitizeReport) {
    match instance {
        Value::Object(fields) => {
            let Some(props) = schema.get("properties").and_then(Value::as_object) else {
                return;
            };
            let undeclared: Vec<String> = fields
                .keys()
                .filter(|k| !props.contains_key(*k))
                .cloned()
                .collect();
            for key in undeclared {
                fields.remove(&key);
                report.stripped.push(child_pointer(path, &key));
            }
            for (key, child_schema) in props {
                let child_path = child_pointer(path, key);
                match fields.get_mut(key) {
                    Some(child) => sanitize(child_schema, child, &child_path, report),
                    None => {
                        if let Some(default) = child_schema.get("default") {
                            fields.insert(key.clone(), default.clone());
                            report.defaulted.push(child_path);
                        }
                    }
                }
            }
        }
        Value::Array(items) => {
            let Some(item_schema) = schema.get("items") else {
                return;
            };
            for (i, item) in items.iter_mut().enumerate() {
                let child_path = format!("{}/{}", path, i);
                match item_schema {
                    Value::Array(tuple) => {
                        if let Some(s) = tuple.get(i) {
                            sanitize(s, item, &child_path, report);
                        }
                    }
                    single => sanitize(single, item, &child_path, report),
                }
            }
        }
        _ => {}
    }
}
