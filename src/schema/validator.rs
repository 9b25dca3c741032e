//! Structural validation of the classification documents
//!
//! `dmt schema check` runs the raw YAML documents through JSON Schemas
//! embedded in the binary, collecting every violation instead of
//! stopping at the first. The catalog's own `load` already rejects
//! unparseable documents; this pass exists to explain *why* a document
//! is malformed before a user re-runs a command that needs it.

use jsonschema::{validator_for, Validator as JsonValidator};
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::documents::Assets;

#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("embedded JSON Schema is invalid: {0}")]
    BadSchema(String),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yml::Error),
}

/// A single violation found in a document
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// JSON pointer into the document (`/domains/0/code`), empty for
    /// the document root
    pub path: String,
    pub message: String,
}

/// Which of the two documents an issue belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Schema,
    Templates,
}

impl DocumentKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            DocumentKind::Schema => super::documents::SCHEMA_FILE,
            DocumentKind::Templates => super::documents::TEMPLATES_FILE,
        }
    }
}

/// Compiled validators for both document kinds
pub struct DocumentValidator {
    schema: JsonValidator,
    templates: JsonValidator,
}

impl DocumentValidator {
    pub fn new() -> Result<Self, ValidatorError> {
        Ok(Self {
            schema: compile(&Assets::schema_json_schema())?,
            templates: compile(&Assets::templates_json_schema())?,
        })
    }

    /// Validate one document's YAML text, returning every violation.
    /// An empty vec means the document is well-formed.
    pub fn check(
        &self,
        kind: DocumentKind,
        content: &str,
    ) -> Result<Vec<ValidationIssue>, ValidatorError> {
        let yaml_value: serde_yml::Value = serde_yml::from_str(content)?;
        let json_value: JsonValue = serde_json::to_value(&yaml_value)
            .map_err(|e| ValidatorError::BadSchema(e.to_string()))?;

        let validator = match kind {
            DocumentKind::Schema => &self.schema,
            DocumentKind::Templates => &self.templates,
        };

        Ok(validator
            .iter_errors(&json_value)
            .map(|err| ValidationIssue {
                path: err.instance_path.to_string(),
                message: err.to_string(),
            })
            .collect())
    }
}

fn compile(schema_text: &str) -> Result<JsonValidator, ValidatorError> {
    let schema_json: JsonValue = serde_json::from_str(schema_text)
        .map_err(|e| ValidatorError::BadSchema(e.to_string()))?;
    validator_for(&schema_json).map_err(|e| ValidatorError::BadSchema(e.to_string()))
}
