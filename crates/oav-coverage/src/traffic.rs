//! # Traffic Samples and Result Records
//!
//! A traffic sample is a JSON file holding one `liveRequest`/`liveResponse`
//! pair. Each processed sample yields one [`TrafficValidationIssue`] record.

use std::path::{Path, PathBuf};

use oav_core::{LiveRequest, LiveResponse, OavError, ValidationIssue};
use serde::{Deserialize, Serialize};

/// One captured request/response pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficSample {
    /// The captured request.
    pub live_request: LiveRequest,
    /// The captured response.
    pub live_response: LiveResponse,
}

impl TrafficSample {
    /// Read and parse a sample file.
    pub fn from_file(path: &Path) -> Result<Self, OavError> {
        let content = std::fs::read_to_string(path).map_err(|e| OavError::Sample {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| OavError::Sample {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

/// Every `*.json` file under `root` (or `root` itself), sorted by path.
pub fn discover_samples(root: &Path) -> Result<Vec<PathBuf>, OavError> {
    let mut found = Vec::new();
    if root.is_file() {
        found.push(root.to_path_buf());
    } else {
        walk(root, &["json"], &mut found)?;
    }
    found.sort();
    Ok(found)
}

/// Recursively collect files with one of `extensions`.
pub(crate) fn walk(dir: &Path, extensions: &[&str], out: &mut Vec<PathBuf>) -> Result<(), OavError> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, extensions, out)?;
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
        {
            out.push(path);
        }
    }
    Ok(())
}

/// Classification of a per-sample failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuntimeExceptionCode {
    /// The sample file could not be read or parsed.
    MalformedSample,
    /// No loaded operation matches the sample's request.
    OperationNotFound,
    /// Validation of the sample could not run to completion.
    ValidationFailure,
}

/// A failure that aborted processing of one sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeException {
    /// Failure class.
    pub code: RuntimeExceptionCode,
    /// Human-readable detail.
    pub message: String,
}

impl RuntimeException {
    /// Exception with `code` and `message`.
    pub fn new(code: RuntimeExceptionCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// The operation a sample exercised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationInfo {
    /// `operationId` of the matched operation.
    pub operation_id: String,
    /// `api-version` of the request, when present.
    pub api_version: Option<String>,
}

/// Result record for one traffic sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficValidationIssue {
    /// Sample file.
    pub payload_file_path: String,
    /// Owning specification file; `None` when no specification owns the
    /// sample.
    pub spec_file_path: Option<String>,
    /// Matched operation.
    pub operation_info: Option<OperationInfo>,
    /// Request issues.
    pub request_errors: Vec<ValidationIssue>,
    /// Response issues.
    pub response_errors: Vec<ValidationIssue>,
    /// Failures that stopped processing.
    pub runtime_exceptions: Vec<RuntimeException>,
}

impl TrafficValidationIssue {
    /// Record for a sample that could not be processed.
    pub fn failed(payload: &Path, exception: RuntimeException) -> Self {
        Self {
            payload_file_path: payload.display().to_string(),
            spec_file_path: None,
            operation_info: None,
            request_errors: Vec::new(),
            response_errors: Vec::new(),
            runtime_exceptions: vec![exception],
        }
    }

    /// Whether the sample had any request or response issue.
    pub fn has_issues(&self) -> bool {
        !self.request_errors.is_empty() || !self.response_errors.is_empty()
    }
}

/// Whether a request targets the resource-management plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallPlane {
    /// `/providers/<Namespace>/...` request; carries the namespace.
    ControlPlane {
        /// Provider namespace following the last `/providers/`.
        provider: String,
    },
    /// Any other request.
    DataPlane,
}

impl CallPlane {
    /// Classify a request path.
    pub fn of_path(path: &str) -> Self {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let provider = segments
            .iter()
            .rposition(|s| s.eq_ignore_ascii_case("providers"))
            .and_then(|i| segments.get(i + 1));
        match provider {
            Some(namespace) => Self::ControlPlane {
                provider: (*namespace).to_string(),
            },
            None => Self::DataPlane,
        }
    }

    /// Whether this is a control-plane call.
    pub fn is_control_plane(&self) -> bool {
        matches!(self, Self::ControlPlane { .. })
    }
}
