//! # Content-Type Gate
//!
//! Checks a payload's `content-type` against the operation's allowed media
//! types. Parameters after `;` are stripped and the comparison is
//! case-sensitive.
//!
//! A request without the header is not checked. A response without it is
//! checked as `application/octet-stream`.

use std::collections::BTreeMap;

use oav_core::{header_str, ErrorCode, HeaderMap, SourceLocation, ValidationContext, ValidationIssue};

/// Content type assumed for a response without a `content-type` header.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Check `headers` (already lower-cased) against `allowed`.
///
/// Returns at most one `INVALID_CONTENT_TYPE` issue.
pub fn check_content_type(
    ctx: &ValidationContext,
    headers: &HeaderMap,
    allowed: &[String],
    source: &SourceLocation,
) -> Option<ValidationIssue> {
    let content_type = match header_str(headers, "content-type") {
        Some(declared) => declared.split(';').next().unwrap_or_default().trim(),
        None if ctx.is_response() => OCTET_STREAM,
        None => return None,
    };
    if allowed.iter().any(|media| media == content_type) {
        return None;
    }

    let mut params = BTreeMap::new();
    params.insert("contentType".to_string(), content_type.to_string());
    params.insert("supported".to_string(), allowed.join(", "));
    let mut issue = ValidationIssue::from_code(ErrorCode::InvalidContentType, &params, source.clone());
    issue.json_paths_in_payload = vec![".headers['content-type']".to_string()];
    issue.paths_in_payload = vec!["/headers/content-type".to_string()];
    Some(issue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oav_core::HttpMethod;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    fn headers(value: Value) -> HeaderMap {
        match value {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    fn json_only() -> Vec<String> {
        vec!["application/json".to_string()]
    }

    #[test]
    fn strips_parameters() {
        let ctx = ValidationContext::request(None);
        let h = headers(json!({"content-type": "application/json; charset=utf-8"}));
        assert!(check_content_type(&ctx, &h, &json_only(), &SourceLocation::default()).is_none());
    }

    #[test]
    fn comparison_is_case_sensitive() {
        let ctx = ValidationContext::request(None);
        let h = headers(json!({"content-type": "Application/JSON"}));
        let issue =
            check_content_type(&ctx, &h, &json_only(), &SourceLocation::default()).unwrap();
        assert_eq!(issue.code, ErrorCode::InvalidContentType);
        assert_eq!(
            issue.message,
            "Invalid Content-Type (Application/JSON). These are supported: application/json"
        );
    }

    #[test]
    fn lists_every_supported_type() {
        let ctx = ValidationContext::response("200", HttpMethod::Get, None);
        let allowed = vec!["application/json".to_string(), "text/json".to_string()];
        let issue = check_content_type(&ctx, &HeaderMap::new(), &allowed, &SourceLocation::default())
            .unwrap();
        assert!(issue
            .message
            .ends_with("(application/octet-stream). These are supported: application/json, text/json"));
    }

    proptest! {
        #[test]
        fn request_without_header_never_fails(
            allowed in proptest::collection::vec("[a-z]{1,8}/[a-z]{1,8}", 0..4),
            other in proptest::collection::btree_map("x-[a-z]{1,6}", "[a-z]{0,6}", 0..4),
        ) {
            let ctx = ValidationContext::request(None);
            let h: HeaderMap = other.into_iter().map(|(k, v)| (k, Value::String(v))).collect();
            prop_assert!(check_content_type(&ctx, &h, &allowed, &SourceLocation::default()).is_none());
        }

        #[test]
        fn response_without_header_is_octet_stream(
            mut allowed in proptest::collection::vec("[a-z]{1,8}/[a-z]{1,8}", 0..4),
            include_octet in any::<bool>(),
        ) {
            if include_octet {
                allowed.push(OCTET_STREAM.to_string());
            }
            let expect_issue = !allowed.iter().any(|a| a == OCTET_STREAM);
            let ctx = ValidationContext::response("200", HttpMethod::Get, None);
            let issue = check_content_type(&ctx, &HeaderMap::new(), &allowed, &SourceLocation::default());
            prop_assert_eq!(issue.is_some(), expect_issue);
        }
    }
}
