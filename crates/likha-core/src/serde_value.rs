use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Node;
use crate::transform::TransactionError;

/// Name written into every envelope this crate produces.
pub const DOCUMENT_SCHEMA: &str = "likha-rich-text";
/// Highest envelope version this crate can read.
pub const DOCUMENT_VERSION: u32 = 1;

fn default_schema() -> String {
    DOCUMENT_SCHEMA.to_string()
}

fn default_version() -> u32 {
    DOCUMENT_VERSION
}

#[derive(Debug, Error, PartialEq)]
pub enum DocumentError {
    #[error("document was written for schema `{0}`")]
    ForeignSchema(String),
    #[error("document version {found} is not supported")]
    UnsupportedVersion { found: u32 },
    #[error(transparent)]
    Invalid(#[from] TransactionError),
}

/// Versioned JSON envelope around a document tree. Missing `schema` and
/// `version` fields read as the current ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentValue {
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_version")]
    pub version: u32,
    pub document: Node,
}

impl DocumentValue {
    pub fn from_document(document: Node) -> Self {
        Self {
            schema: default_schema(),
            version: default_version(),
            document,
        }
    }

    /// Unwraps the tree once the envelope is known to be readable.
    pub fn into_document(self) -> Result<Node, DocumentError> {
        if self.schema != DOCUMENT_SCHEMA {
            return Err(DocumentError::ForeignSchema(self.schema));
        }
        if !(1..=DOCUMENT_VERSION).contains(&self.version) {
            return Err(DocumentError::UnsupportedVersion {
                found: self.version,
            });
        }
        Ok(self.document)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_envelope_fields_take_defaults() {
        let json = json!({ "document": Node::doc([Node::paragraph("hi")]) });
        let value = DocumentValue::from_json_str(&json.to_string()).unwrap();
        assert_eq!(value.schema, DOCUMENT_SCHEMA);
        assert_eq!(value.version, DOCUMENT_VERSION);
        assert_eq!(value.into_document().unwrap().text_content(), "hi");
    }

    #[test]
    fn foreign_schema_is_refused() {
        let json = json!({
            "schema": "slate",
            "document": Node::doc([Node::paragraph("hi")]),
        });
        let value = DocumentValue::from_json_str(&json.to_string()).unwrap();
        assert_eq!(
            value.into_document(),
            Err(DocumentError::ForeignSchema("slate".into()))
        );
    }

    #[test]
    fn unknown_versions_are_refused() {
        for version in [0, DOCUMENT_VERSION + 1] {
            let mut value = DocumentValue::from_document(Node::doc([Node::paragraph("x")]));
            value.version = version;
            assert_eq!(
                value.into_document(),
                Err(DocumentError::UnsupportedVersion { found: version })
            );
        }
    }

    #[test]
    fn pretty_json_round_trips() {
        let value = DocumentValue::from_document(Node::doc([Node::paragraph("x")]));
        let json = value.to_json_pretty().unwrap();
        assert_eq!(DocumentValue::from_json_str(&json).unwrap(), value);
    }
}
