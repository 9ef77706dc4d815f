//! # Validation Issues
//!
//! [`SchemaValidateIssue`] is what a schema engine reports: a code, the engine
//! message, JSON paths into the validated payload and named message
//! parameters. [`ValidationIssue`] is the enriched, user-facing record the
//! validator returns, with severity, documentation link, JSON Pointers and a
//! source location filled in.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::code::{ErrorCode, Severity};
use crate::http::HttpMethod;

/// Parameter name carrying the missing property of
/// `OBJECT_MISSING_REQUIRED_PROPERTY` issues.
pub const MISSING_PROPERTY_PARAM: &str = "missingProperty";

/// Line/column inside a specification document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePosition {
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub column: u32,
}

/// Where in the specification corpus an issue originates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    /// Specification file. Empty when the engine could not tell.
    pub url: String,
    /// JSON reference of the violated definition inside `url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_ref: Option<String>,
    /// Position of the definition, when the loader tracked it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<FilePosition>,
}

impl SourceLocation {
    /// Location pointing at `json_ref` inside `url`.
    pub fn new(url: impl Into<String>, json_ref: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            json_ref: Some(json_ref.into()),
            position: None,
        }
    }
}

/// A raw schema violation as reported by a schema engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaValidateIssue {
    /// Violation code.
    pub code: ErrorCode,
    /// Engine-provided message.
    pub message: String,
    /// JSON paths (`.body.name`, `.headers['x-ms-id']`) inside the payload.
    pub json_paths_in_payload: Vec<String>,
    /// Named message parameters.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    /// Source location, when the engine knows it.
    #[serde(default)]
    pub source: Option<SourceLocation>,
}

impl SchemaValidateIssue {
    /// A raw issue with a single payload path.
    pub fn new(code: ErrorCode, message: impl Into<String>, json_path: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            json_paths_in_payload: vec![json_path.into()],
            params: BTreeMap::new(),
            source: None,
        }
    }

    /// Attach a named message parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// The missing property name of an `OBJECT_MISSING_REQUIRED_PROPERTY` issue.
    pub fn missing_property(&self) -> Option<&str> {
        self.params.get(MISSING_PROPERTY_PARAM).map(String::as_str)
    }
}

impl From<&ValidationIssue> for SchemaValidateIssue {
    /// Feed a classified issue back through classification.
    fn from(issue: &ValidationIssue) -> Self {
        Self {
            code: issue.code,
            message: issue.message.clone(),
            json_paths_in_payload: issue.json_paths_in_payload.clone(),
            params: BTreeMap::new(),
            source: Some(issue.source.clone()),
        }
    }
}

/// One enriched conformance violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    /// Stable violation code.
    pub code: ErrorCode,
    /// Severity derived from `code`.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// JSON paths inside the payload; body paths are rooted at `$`.
    pub json_paths_in_payload: Vec<String>,
    /// JSON Pointer equivalents of `json_paths_in_payload`.
    pub paths_in_payload: Vec<String>,
    /// Specification location the violated definition comes from.
    pub source: SourceLocation,
    /// Link to the violation reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,
}

impl ValidationIssue {
    /// Build an issue from its code and named message parameters.
    ///
    /// Severity, message and documentation link all come from the code's
    /// metadata.
    pub fn from_code(
        code: ErrorCode,
        params: &BTreeMap<String, String>,
        source: SourceLocation,
    ) -> Self {
        Self {
            code,
            severity: code.severity(),
            message: code.message(params),
            json_paths_in_payload: Vec::new(),
            paths_in_payload: Vec::new(),
            source,
            documentation_url: Some(code.documentation_url()),
        }
    }
}

/// Whether a validation call targets a request or a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationMode {
    /// Request validation.
    Request,
    /// Response validation for the observed status code and the operation's
    /// HTTP method.
    Response {
        /// Observed status code, as written in the traffic.
        status_code: String,
        /// HTTP method of the operation.
        method: HttpMethod,
    },
}

/// Transient per-call state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationContext {
    /// Request or response.
    pub mode: ValidationMode,
    /// Codes the caller wants reported; `None` reports everything.
    pub include_errors: Option<Vec<ErrorCode>>,
}

impl ValidationContext {
    /// Context for request validation.
    pub fn request(include_errors: Option<Vec<ErrorCode>>) -> Self {
        Self {
            mode: ValidationMode::Request,
            include_errors,
        }
    }

    /// Context for response validation.
    pub fn response(
        status_code: impl Into<String>,
        method: HttpMethod,
        include_errors: Option<Vec<ErrorCode>>,
    ) -> Self {
        Self {
            mode: ValidationMode::Response {
                status_code: status_code.into(),
                method,
            },
            include_errors,
        }
    }

    /// Whether this call validates a response.
    pub fn is_response(&self) -> bool {
        matches!(self.mode, ValidationMode::Response { .. })
    }

    /// Observed status code for response validation.
    pub fn status_code(&self) -> Option<&str> {
        match &self.mode {
            ValidationMode::Response { status_code, .. } => Some(status_code),
            ValidationMode::Request => None,
        }
    }

    /// Whether issues with `code` should be reported.
    pub fn includes(&self, code: ErrorCode) -> bool {
        self.include_errors
            .as_ref()
            .map_or(true, |codes| codes.contains(&code))
    }
}
