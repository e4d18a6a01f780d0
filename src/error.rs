//! Error types for the contract engine

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::validator::Violation;

/// Result type for contract operations
pub type Result<T> = std::result::Result<T, ContractError>;

/// Failures while obtaining a sample payload
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request to {url} timed out after {}s", .after.as_secs())]
    Timeout { url: String, after: Duration },

    #[error("Request to {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Response from {source_name} is not valid JSON: {message}")]
    MalformedJson { source_name: String, message: String },

    #[error("Could not read sample from {source_name}: {source}")]
    Io {
        source_name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Artifact persistence failure
#[derive(Error, Debug)]
#[error("Store error at {}: {source}", .path.display())]
pub struct StoreError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl StoreError {
    pub fn new(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

/// Raised when a schema cannot be lowered into a type definition
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Type emission failed at {path}: {reason}")]
pub struct TypeEmissionError {
    /// Schema path of the offending node (e.g. `#/properties/pages`)
    pub path: String,
    pub reason: String,
}

/// Contract engine errors
#[derive(Error, Debug)]
pub enum ContractError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error(
        "Contract BREAKING change detected for '{endpoint}' (response does NOT match the accepted contract):\n{}",
        ViolationList(.violations)
    )]
    BreakingChange {
        endpoint: String,
        violations: Vec<Violation>,
    },

    #[error(
        "Schema validation failed for '{endpoint}': the sample does not satisfy its own generated schema:\n{}",
        ViolationList(.violations)
    )]
    InternalSchemaInconsistency {
        endpoint: String,
        violations: Vec<Violation>,
    },

    #[error(transparent)]
    Emission(#[from] TypeEmissionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Route discovery failed: {0}")]
    Discovery(String),

    #[error("Could not resolve site URL: {0}")]
    SiteUrl(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ContractError {
    /// Violations carried by a validation batch error, empty otherwise
    pub fn violations(&self) -> &[Violation] {
        match self {
            ContractError::BreakingChange { violations, .. }
            | ContractError::InternalSchemaInconsistency { violations, .. } => violations,
            _ => &[],
        }
    }
}

/// Renders one violation per line, bullet-prefixed
struct ViolationList<'a>(&'a [Violation]);

impl fmt::Display for ViolationList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "• {}", v)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breaking_change_lists_every_violation() {
        let err = ContractError::BreakingChange {
            endpoint: "products".to_string(),
            violations: vec![
                Violation::new("/slug", "is required"),
                Violation::new("/id", "\"x\" is not of type \"integer\""),
            ],
        };
        let text = err.to_string();
        assert!(text.contains("BREAKING"));
        assert!(text.contains("• path: /slug  message: is required"));
        assert!(text.contains("• path: /id"));
        assert_eq!(err.violations().len(), 2);
    }

    #[test]
    fn test_non_batch_errors_have_no_violations() {
        let err = ContractError::Discovery("empty".to_string());
        assert!(err.violations().is_empty());
    }
}
