//! # Error Codes — Fixed Metadata Table
//!
//! Every [`ValidationIssue`](crate::ValidationIssue) carries an [`ErrorCode`].
//! Severity, message template and documentation link are a pure function of
//! the code: [`ErrorCode::meta`] is a `match`, compiled into the binary, with
//! no runtime mutation.
//!
//! Codes serialize as their stable `SCREAMING_SNAKE_CASE` names
//! (`INVALID_CONTENT_TYPE`, `LRO_RESPONSE_HEADER`, ...), which is also what
//! [`FromStr`] accepts.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Base URL of the violation reference document. Each code links to its own
/// anchor.
pub const DOCUMENTATION_BASE_URL: &str =
    "https://github.com/Azure/azure-rest-api-specs/blob/main/documentation/Semantic-and-Model-Violations-Reference.md";

/// Issue severity, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    /// The payload contradicts the contract in a way clients cannot work around.
    Critical = 0,
    /// A constraint declared by the contract is violated.
    Error = 1,
    /// Suspicious but tolerable deviation.
    Warning = 2,
    /// Informational finding.
    Information = 3,
    /// Diagnostic detail.
    Verbose = 4,
}

/// Stable identifier of a conformance violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ── Raised by the schema engine ─────────────────────────────────
    /// Value has the wrong JSON type.
    InvalidType,
    /// String does not match its declared `format`.
    InvalidFormat,
    /// Value is not one of the declared `enum` values.
    EnumMismatch,
    /// Value differs from the declared constant.
    ConstMismatch,
    /// String does not match its declared `pattern`.
    Pattern,
    /// String is longer than `maxLength`.
    MaxLength,
    /// String is shorter than `minLength`.
    MinLength,
    /// Number is above `maximum`.
    Maximum,
    /// Number is below `minimum`.
    Minimum,
    /// Number is not a multiple of `multipleOf`.
    MultipleOf,
    /// Array has more than `maxItems` elements.
    ArrayLengthLong,
    /// Array has fewer than `minItems` elements.
    ArrayLengthShort,
    /// Array elements are not unique.
    ArrayUnique,
    /// Object carries properties the schema does not allow.
    ObjectAdditionalProperties,
    /// Object lacks a property listed in `required`.
    ObjectMissingRequiredProperty,
    /// No `oneOf` branch matched.
    OneOfMissing,
    /// More than one `oneOf` branch matched.
    OneOfMultiple,
    /// No `anyOf` branch matched.
    AnyOfMissing,
    /// The value matched a `not` schema.
    NotPassed,
    /// Any other schema keyword failure.
    SchemaViolation,

    // ── Raised by live validation ───────────────────────────────────
    /// The payload's content type is not among the allowed media types.
    InvalidContentType,
    /// The observed status code has no response definition.
    InvalidResponseCode,
    /// A required property is missing from a response body.
    InvalidResponseBody,
    /// A required response header is missing.
    InvalidResponseHeader,
    /// A required request parameter (body included) is missing.
    MissingRequiredParameter,
    /// A long-running operation answered with a disallowed status code.
    LroResponseCode,
    /// A long-running operation answered without a polling header.
    LroResponseHeader,
}

/// Metadata attached to every issue of a given code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorMeta {
    /// Stable code name.
    pub name: &'static str,
    /// Severity of every issue with this code.
    pub severity: Severity,
    /// Message template with `{param}` placeholders.
    pub template: &'static str,
}

/// Error returned when parsing an unknown code name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown error code: {0}")]
pub struct UnknownErrorCode(pub String);

impl ErrorCode {
    /// Every code, in declaration order.
    pub const ALL: [ErrorCode; 27] = [
        Self::InvalidType,
        Self::InvalidFormat,
        Self::EnumMismatch,
        Self::ConstMismatch,
        Self::Pattern,
        Self::MaxLength,
        Self::MinLength,
        Self::Maximum,
        Self::Minimum,
        Self::MultipleOf,
        Self::ArrayLengthLong,
        Self::ArrayLengthShort,
        Self::ArrayUnique,
        Self::ObjectAdditionalProperties,
        Self::ObjectMissingRequiredProperty,
        Self::OneOfMissing,
        Self::OneOfMultiple,
        Self::AnyOfMissing,
        Self::NotPassed,
        Self::SchemaViolation,
        Self::InvalidContentType,
        Self::InvalidResponseCode,
        Self::InvalidResponseBody,
        Self::InvalidResponseHeader,
        Self::MissingRequiredParameter,
        Self::LroResponseCode,
        Self::LroResponseHeader,
    ];

    /// Look up the fixed metadata for this code.
    pub fn meta(self) -> ErrorMeta {
        use Severity::{Critical, Error, Warning};
        let (name, severity, template) = match self {
            Self::InvalidType => ("INVALID_TYPE", Critical, "{detail}"),
            Self::InvalidFormat => ("INVALID_FORMAT", Error, "{detail}"),
            Self::EnumMismatch => ("ENUM_MISMATCH", Error, "{detail}"),
            Self::ConstMismatch => ("CONST_MISMATCH", Error, "{detail}"),
            Self::Pattern => ("PATTERN", Error, "{detail}"),
            Self::MaxLength => ("MAX_LENGTH", Error, "{detail}"),
            Self::MinLength => ("MIN_LENGTH", Error, "{detail}"),
            Self::Maximum => ("MAXIMUM", Error, "{detail}"),
            Self::Minimum => ("MINIMUM", Error, "{detail}"),
            Self::MultipleOf => ("MULTIPLE_OF", Error, "{detail}"),
            Self::ArrayLengthLong => ("ARRAY_LENGTH_LONG", Error, "{detail}"),
            Self::ArrayLengthShort => ("ARRAY_LENGTH_SHORT", Error, "{detail}"),
            Self::ArrayUnique => ("ARRAY_UNIQUE", Error, "{detail}"),
            Self::ObjectAdditionalProperties => {
                ("OBJECT_ADDITIONAL_PROPERTIES", Warning, "{detail}")
            }
            Self::ObjectMissingRequiredProperty => (
                "OBJECT_MISSING_REQUIRED_PROPERTY",
                Critical,
                "Missing required property: {missingProperty}",
            ),
            Self::OneOfMissing => ("ONE_OF_MISSING", Error, "{detail}"),
            Self::OneOfMultiple => ("ONE_OF_MULTIPLE", Error, "{detail}"),
            Self::AnyOfMissing => ("ANY_OF_MISSING", Error, "{detail}"),
            Self::NotPassed => ("NOT_PASSED", Error, "{detail}"),
            Self::SchemaViolation => ("SCHEMA_VIOLATION", Error, "{detail}"),
            Self::InvalidContentType => (
                "INVALID_CONTENT_TYPE",
                Critical,
                "Invalid Content-Type ({contentType}). These are supported: {supported}",
            ),
            Self::InvalidResponseCode => (
                "INVALID_RESPONSE_CODE",
                Critical,
                "The swagger file does not define '{statusCode}' response code",
            ),
            Self::InvalidResponseBody => (
                "INVALID_RESPONSE_BODY",
                Critical,
                "Body is required in response but property '{missingProperty}' was not provided",
            ),
            Self::InvalidResponseHeader => (
                "INVALID_RESPONSE_HEADER",
                Critical,
                "Header '{missingProperty}' is required in response but was not provided",
            ),
            Self::MissingRequiredParameter => (
                "MISSING_REQUIRED_PARAMETER",
                Critical,
                "Value is required but was not provided: {missingProperty}",
            ),
            Self::LroResponseCode => (
                "LRO_RESPONSE_CODE",
                Critical,
                "Respond to the initial request of a long running operation, Patch/Post call must return 201 or 202, Delete call must return 202 or 204, Put call must return 202 or 201 or 200, but {statusCode} being returned",
            ),
            Self::LroResponseHeader => (
                "LRO_RESPONSE_HEADER",
                Critical,
                "Long running operation should return {header} in header but not being provided",
            ),
        };
        ErrorMeta {
            name,
            severity,
            template,
        }
    }

    /// Stable name of the code.
    pub fn as_str(self) -> &'static str {
        self.meta().name
    }

    /// Severity of every issue with this code.
    pub fn severity(self) -> Severity {
        self.meta().severity
    }

    /// Link to this code's entry in the violation reference.
    pub fn documentation_url(self) -> String {
        let anchor = self.as_str().to_ascii_lowercase().replace('_', "-");
        format!("{DOCUMENTATION_BASE_URL}#{anchor}")
    }

    /// Render the message template with named parameters.
    ///
    /// Placeholders without a matching parameter are left as-is.
    pub fn message(self, params: &BTreeMap<String, String>) -> String {
        let mut out = self.meta().template.to_string();
        for (key, value) in params {
            out = out.replace(&format!("{{{key}}}"), value);
        }
        out
    }

    /// Whether the code is `OBJECT_MISSING_REQUIRED_PROPERTY` or one of the
    /// codes it is reclassified into.
    pub fn is_missing_property_family(self) -> bool {
        matches!(
            self,
            Self::ObjectMissingRequiredProperty
                | Self::MissingRequiredParameter
                | Self::InvalidResponseBody
                | Self::InvalidResponseHeader
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorCode {
    type Err = UnknownErrorCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|code| code.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownErrorCode(wanted.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_match_serde_representation() {
        for code in ErrorCode::ALL {
            let json = serde_json::to_value(code).unwrap();
            assert_eq!(json, serde_json::Value::String(code.as_str().to_string()));
        }
    }

    #[test]
    fn every_code_round_trips_through_from_str() {
        for code in ErrorCode::ALL {
            assert_eq!(code.as_str().parse::<ErrorCode>().unwrap(), code);
        }
    }

    #[test]
    fn from_str_is_case_insensitive_and_rejects_unknown() {
        assert_eq!(
            "lro_response_header".parse::<ErrorCode>().unwrap(),
            ErrorCode::LroResponseHeader
        );
        assert_eq!(
            "NOPE".parse::<ErrorCode>().unwrap_err(),
            UnknownErrorCode("NOPE".into())
        );
    }

    #[test]
    fn message_fills_named_parameters() {
        let mut params = BTreeMap::new();
        params.insert("contentType".to_string(), "text/plain".to_string());
        params.insert("supported".to_string(), "application/json, text/json".to_string());
        assert_eq!(
            ErrorCode::InvalidContentType.message(&params),
            "Invalid Content-Type (text/plain). These are supported: application/json, text/json"
        );
    }

    #[test]
    fn documentation_url_uses_kebab_anchor() {
        assert!(ErrorCode::InvalidResponseCode
            .documentation_url()
            .ends_with("#invalid-response-code"));
    }

    #[test]
    fn missing_property_family() {
        assert!(ErrorCode::ObjectMissingRequiredProperty.is_missing_property_family());
        assert!(ErrorCode::InvalidResponseBody.is_missing_property_family());
        assert!(!ErrorCode::InvalidType.is_missing_property_family());
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Critical < Severity::Error);
        assert!(Severity::Warning < Severity::Verbose);
    }
}
