//! # Operation Graph
//!
//! The in-memory result of loading one specification document: a
//! [`SpecGraph`] owning its [`Operation`]s, each with its media types, field
//! transforms, request schema and per-status [`ResponseDefinition`]s.
//!
//! Everything here is immutable once built. Compiled validators are NOT
//! stored on these objects; they live in the
//! [`ValidatorCache`](crate::ValidatorCache) keyed by [`OperationKey`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use oav_core::{HttpMethod, SourceLocation};
use serde_json::Value;

use crate::pattern::PathPattern;
use crate::transform::{Transform, TransformMap};

/// Status key of the fallback response definition.
pub const DEFAULT_RESPONSE: &str = "default";

/// Stable identity of an operation: owning document, method, path template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationKey {
    /// Owning specification file.
    pub spec_file: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Path template, base path included.
    pub path_template: String,
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.method, self.path_template, self.spec_file)
    }
}

/// Identity of one response definition of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResponseKey {
    /// Owning operation.
    pub operation: OperationKey,
    /// Status code key (`"200"`, `"default"`).
    pub status: String,
}

/// Declared response for one status code.
#[derive(Debug, Clone)]
pub struct ResponseDefinition {
    /// Status key as declared.
    pub status: String,
    /// Body schema, when the response declares one.
    pub body_schema: Option<Value>,
    /// Transforms for declared headers, keyed by lower-cased name.
    pub header_transforms: TransformMap,
    /// Composite `{headers, body}` schema the response validator compiles.
    pub validation_schema: Value,
    /// JSON reference of the definition inside the document.
    pub json_ref: String,
}

impl ResponseDefinition {
    /// Whether the response declares a body schema.
    pub fn has_schema(&self) -> bool {
        self.body_schema.is_some()
    }
}

/// Declared contract for one HTTP method + path.
#[derive(Debug, Clone)]
pub struct Operation {
    /// Stable identity.
    pub key: OperationKey,
    /// `operationId`, when declared.
    pub operation_id: Option<String>,
    /// `info.version` of the owning document.
    pub api_version: String,
    /// Compiled path template.
    pub pattern: PathPattern,
    /// Allowed request media types.
    pub consumes: Vec<String>,
    /// Allowed response media types.
    pub produces: Vec<String>,
    /// Path parameter transforms.
    pub path_transforms: TransformMap,
    /// Query parameter transforms.
    pub query_transforms: TransformMap,
    /// Header parameter transforms, keyed by lower-cased name.
    pub header_transforms: TransformMap,
    /// Whole-body transform.
    pub body_transform: Option<Transform>,
    /// Composite `{path, query, headers, body}` schema the request validator
    /// compiles.
    pub request_schema: Value,
    /// Response definitions keyed by status (`"default"` included).
    pub responses: BTreeMap<String, ResponseDefinition>,
    /// `x-ms-long-running-operation`.
    pub long_running: bool,
    /// JSON reference of the operation inside the document.
    pub json_ref: String,
}

impl Operation {
    /// HTTP method.
    pub fn method(&self) -> HttpMethod {
        self.key.method
    }

    /// Owning specification file.
    pub fn spec_file(&self) -> &str {
        &self.key.spec_file
    }

    /// Source location of the operation.
    pub fn source(&self) -> SourceLocation {
        SourceLocation::new(self.spec_file(), self.json_ref.clone())
    }

    /// Source location of the operation's `responses` object.
    pub fn responses_source(&self) -> SourceLocation {
        SourceLocation::new(self.spec_file(), format!("{}/responses", self.json_ref))
    }

    /// Response definition for an observed status code.
    ///
    /// An exact match wins. Otherwise the `default` definition applies, but
    /// only to status codes in `400..=599`; a 2xx/3xx code without its own
    /// definition resolves to nothing.
    pub fn resolve_response(&self, status_code: &str) -> Option<&ResponseDefinition> {
        if let Some(rsp) = self.responses.get(status_code) {
            return Some(rsp);
        }
        match status_code.trim().parse::<u16>() {
            Ok(code) if (400..=599).contains(&code) => self.responses.get(DEFAULT_RESPONSE),
            _ => None,
        }
    }

    /// Identity of one of this operation's responses.
    pub fn response_key(&self, response: &ResponseDefinition) -> ResponseKey {
        ResponseKey {
            operation: self.key.clone(),
            status: response.status.clone(),
        }
    }
}

/// One loaded specification document.
#[derive(Debug, Clone)]
pub struct SpecGraph {
    /// Document path.
    pub file_path: String,
    /// `info.title`.
    pub title: String,
    /// `info.version`.
    pub api_version: String,
    /// Declared operations, in document order.
    pub operations: Vec<Arc<Operation>>,
}

impl SpecGraph {
    /// Visit every declared operation exactly once, in document order.
    pub fn traverse(&self, mut on_operation: impl FnMut(&Operation)) {
        for operation in &self.operations {
            on_operation(operation);
        }
    }

    /// Declared operation identifiers, skipping operations without one.
    pub fn operation_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        self.traverse(|op| {
            if let Some(id) = &op.operation_id {
                ids.push(id.clone());
            }
        });
        ids
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::operation;
    use super::*;

    #[test]
    fn default_applies_only_to_error_codes() {
        let op = operation(HttpMethod::Get, &["200", "default"]);
        assert_eq!(op.resolve_response("200").unwrap().status, "200");
        assert_eq!(op.resolve_response("503").unwrap().status, "default");
        assert_eq!(op.resolve_response("404").unwrap().status, "default");
        assert!(op.resolve_response("301").is_none());
        assert!(op.resolve_response("201").is_none());
        assert!(op.resolve_response("600").is_none());
    }

    #[test]
    fn unresolved_without_default() {
        let op = operation(HttpMethod::Get, &["200"]);
        assert!(op.resolve_response("500").is_none());
    }

    #[test]
    fn traverse_visits_each_operation_once() {
        let graph = SpecGraph {
            file_path: "specs/items.json".into(),
            title: "Items".into(),
            api_version: "2024-01-01".into(),
            operations: vec![
                Arc::new(operation(HttpMethod::Get, &["200"])),
                Arc::new(operation(HttpMethod::Put, &["200"])),
            ],
        };
        let mut seen = Vec::new();
        graph.traverse(|op| seen.push(op.method()));
        assert_eq!(seen, vec![HttpMethod::Get, HttpMethod::Put]);
        assert_eq!(graph.operation_ids(), vec!["Items_Get", "Items_Get"]);
    }
}
