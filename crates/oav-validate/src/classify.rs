//! # Issue Classification
//!
//! Turns raw [`SchemaValidateIssue`]s into user-facing [`ValidationIssue`]s.
//!
//! ## Rules
//!
//! 1. Severity and documentation link come from the code's metadata. A raw
//!    issue without a source URL gets the operation's specification file.
//! 2. Payload paths under `.body` are re-rooted at `$` (`.body.name` →
//!    `$.name`). A missing-property issue located at the body root keeps
//!    `.body`.
//! 3. `OBJECT_MISSING_REQUIRED_PROPERTY` is reclassified:
//!    - request: `MISSING_REQUIRED_PARAMETER`;
//!    - response, within the body: `INVALID_RESPONSE_BODY`, or dropped for a
//!      long-running operation answering 201/202;
//!    - response, within the headers: `INVALID_RESPONSE_HEADER`.
//!
//!    The message is regenerated from the new code with the missing
//!    property as parameter.
//!
//! Output order follows input order; dropped issues leave no gap. Feeding
//! the output back in yields the same output.

use std::collections::BTreeMap;

use oav_core::{
    json_path_to_pointer, ErrorCode, SchemaValidateIssue, SourceLocation, ValidationContext,
    ValidationIssue, MISSING_PROPERTY_PARAM,
};
use oav_spec::Operation;

const BODY: &str = "body";
const HEADERS: &str = "headers";

/// Classify raw issues for `operation` under `ctx`.
pub fn classify_issues(
    raw: &[SchemaValidateIssue],
    operation: &Operation,
    ctx: &ValidationContext,
) -> Vec<ValidationIssue> {
    raw.iter()
        .filter_map(|issue| classify_one(issue, operation, ctx))
        .collect()
}

fn classify_one(
    raw: &SchemaValidateIssue,
    operation: &Operation,
    ctx: &ValidationContext,
) -> Option<ValidationIssue> {
    let code = match raw.code {
        ErrorCode::ObjectMissingRequiredProperty => reclassify_missing(raw, operation, ctx)?,
        other => other,
    };

    let json_paths: Vec<String> = raw
        .json_paths_in_payload
        .iter()
        .map(|path| reroot_body_path(path, code))
        .collect();
    let pointers = json_paths.iter().map(|p| json_path_to_pointer(p)).collect();

    let source = match &raw.source {
        Some(source) if !source.url.is_empty() => source.clone(),
        Some(source) => SourceLocation {
            url: operation.spec_file().to_string(),
            ..source.clone()
        },
        None => operation.source(),
    };

    let mut issue = if code == raw.code {
        ValidationIssue {
            code,
            severity: code.severity(),
            message: raw.message.clone(),
            json_paths_in_payload: Vec::new(),
            paths_in_payload: Vec::new(),
            source,
            documentation_url: Some(code.documentation_url()),
        }
    } else {
        let mut params = BTreeMap::new();
        if let Some(missing) = raw.missing_property() {
            params.insert(MISSING_PROPERTY_PARAM.to_string(), missing.to_string());
        }
        ValidationIssue::from_code(code, &params, source)
    };
    issue.json_paths_in_payload = json_paths;
    issue.paths_in_payload = pointers;
    Some(issue)
}

/// New code for a missing-property issue; `None` drops the issue.
fn reclassify_missing(
    raw: &SchemaValidateIssue,
    operation: &Operation,
    ctx: &ValidationContext,
) -> Option<ErrorCode> {
    let Some(status) = ctx.status_code() else {
        return Some(ErrorCode::MissingRequiredParameter);
    };
    if is_within(raw, BODY) {
        if operation.long_running && matches!(status.trim(), "201" | "202") {
            tracing::trace!(
                operation = %operation.key,
                status,
                "dropping missing body property of accepted long-running response"
            );
            return None;
        }
        Some(ErrorCode::InvalidResponseBody)
    } else if is_within(raw, HEADERS) {
        Some(ErrorCode::InvalidResponseHeader)
    } else {
        Some(ErrorCode::ObjectMissingRequiredProperty)
    }
}

/// Whether the issue sits inside the `section` of the composite payload.
fn is_within(raw: &SchemaValidateIssue, section: &str) -> bool {
    raw.json_paths_in_payload.iter().any(|path| {
        match path.strip_prefix('.').and_then(|p| p.strip_prefix(section)) {
            Some(rest) => rest.is_empty() || rest.starts_with('.') || rest.starts_with('['),
            None => path.is_empty() && raw.missing_property() == Some(section),
        }
    })
}

fn reroot_body_path(path: &str, code: ErrorCode) -> String {
    let Some(rest) = path.strip_prefix(".body") else {
        return path.to_string();
    };
    if rest.is_empty() && code.is_missing_property_family() {
        return path.to_string();
    }
    if rest.is_empty() || rest.starts_with('.') || rest.starts_with('[') {
        format!("${rest}")
    } else {
        path.to_string()
    }
}
