//! # Long-Running Operation Rules
//!
//! The initial response of a long-running operation must use one of the
//! method's accepted status codes and, for some of them, point the client at
//! a polling endpoint through `location` or `azure-AsyncOperation`.
//!
//! | Method | Accepted | Polling header required on |
//! |---|---|---|
//! | PATCH, POST | 201, 202 | 201, 202 |
//! | DELETE | 202, 204 | 202 |
//! | PUT | 200, 201, 202 | 201, 202 |

use std::collections::BTreeMap;

use oav_core::{ErrorCode, HeaderMap, HttpMethod, SourceLocation, ValidationIssue};
use serde_json::Value;

/// Headers any one of which satisfies the polling-header requirement.
/// Names match case-insensitively, so raw and normalized header maps both
/// work.
pub const POLLING_HEADERS: [&str; 2] = ["location", "azure-asyncoperation"];

/// Outcome of the status-code rule for one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LroVerdict {
    /// Accepted code, no header requirement.
    Accepted,
    /// Accepted code that must carry a polling header.
    RequiresPollingHeader,
    /// Code the method may not answer with.
    InvalidCode,
}

/// Status-code rule of one HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LroRule {
    accepted: &'static [u16],
    polling: &'static [u16],
}

impl LroRule {
    /// The rule for `method`; methods without a rule are never checked.
    pub fn for_method(method: HttpMethod) -> Option<Self> {
        let (accepted, polling): (&'static [u16], &'static [u16]) = match method {
            HttpMethod::Patch | HttpMethod::Post => (&[201, 202], &[201, 202]),
            HttpMethod::Delete => (&[202, 204], &[202]),
            HttpMethod::Put => (&[200, 201, 202], &[201, 202]),
            _ => return None,
        };
        Some(Self { accepted, polling })
    }

    /// Judge an observed status code.
    pub fn evaluate(&self, status: u16) -> LroVerdict {
        if !self.accepted.contains(&status) {
            LroVerdict::InvalidCode
        } else if self.polling.contains(&status) {
            LroVerdict::RequiresPollingHeader
        } else {
            LroVerdict::Accepted
        }
    }
}

/// Check a long-running operation's initial response.
///
/// `headers` are the response headers after normalization. Returns zero or
/// one issue.
pub fn check_long_running(
    method: HttpMethod,
    status_code: &str,
    headers: &HeaderMap,
    source: &SourceLocation,
) -> Option<ValidationIssue> {
    let rule = LroRule::for_method(method)?;
    let status = status_code.trim().parse::<u16>().ok()?;
    let mut params = BTreeMap::new();
    match rule.evaluate(status) {
        LroVerdict::Accepted => None,
        LroVerdict::InvalidCode => {
            params.insert("statusCode".to_string(), status_code.to_string());
            Some(ValidationIssue::from_code(ErrorCode::LroResponseCode, &params, source.clone()))
        }
        LroVerdict::RequiresPollingHeader => {
            let polling = headers.iter().any(|(name, value)| {
                POLLING_HEADERS.iter().any(|p| name.eq_ignore_ascii_case(p)) && has_value(Some(value))
            });
            if polling {
                return None;
            }
            params.insert("header".to_string(), "location or azure-AsyncOperation".to_string());
            Some(ValidationIssue::from_code(ErrorCode::LroResponseHeader, &params, source.clone()))
        }
    }
}

fn has_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => items
            .iter()
            .any(|item| item.as_str().map_or(!item.is_null(), |s| !s.is_empty())),
        Some(_) => true,
    }
}
