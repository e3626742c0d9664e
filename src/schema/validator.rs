//! JSON-schema validation of parsed documents

use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;

use crate::schema::registry::{SchemaKind, SchemaRegistry};

#[derive(Debug, Error, Diagnostic)]
pub enum SchemaError {
    #[error("No embedded schema for '{0}'")]
    #[diagnostic(code(euvsim::schema::missing))]
    NotFound(&'static str),

    #[error("Embedded schema for '{kind}' is invalid: {message}")]
    #[diagnostic(code(euvsim::schema::invalid))]
    InvalidSchema { kind: &'static str, message: String },
}

/// One schema violation, located by JSON pointer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

pub struct SchemaValidator {
    registry: SchemaRegistry,
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self {
            registry: SchemaRegistry::new(),
        }
    }

    /// All violations of `document` against the schema for `kind`
    pub fn validate(&self, kind: SchemaKind, document: &Value) -> Result<Vec<SchemaIssue>, SchemaError> {
        let raw = self
            .registry
            .get(kind)
            .ok_or(SchemaError::NotFound(kind.as_str()))?;
        let schema: Value = serde_json::from_str(raw).map_err(|e| SchemaError::InvalidSchema {
            kind: kind.as_str(),
            message: e.to_string(),
        })?;
        let validator =
            jsonschema::validator_for(&schema).map_err(|e| SchemaError::InvalidSchema {
                kind: kind.as_str(),
                message: e.to_string(),
            })?;

        Ok(validator
            .iter_errors(document)
            .map(|e| SchemaIssue {
                path: e.instance_path.to_string(),
                message: e.to_string(),
            })
            .collect())
    }
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}
