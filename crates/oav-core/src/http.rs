//! # Live HTTP Model
//!
//! The request/response pair captured in a traffic sample. Header values may
//! be strings or arrays of strings; bodies are arbitrary JSON.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Header, query or path-parameter map.
pub type HeaderMap = Map<String, Value>;

/// HTTP method of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    /// GET
    Get,
    /// PUT
    Put,
    /// POST
    Post,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
    /// HEAD
    Head,
    /// OPTIONS
    Options,
}

/// Error returned when parsing an unsupported method name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported HTTP method: {0}")]
pub struct UnknownMethod(pub String);

impl HttpMethod {
    /// Every method, in Swagger path-item key order.
    pub const ALL: [HttpMethod; 7] = [
        Self::Get,
        Self::Put,
        Self::Post,
        Self::Delete,
        Self::Options,
        Self::Head,
        Self::Patch,
    ];

    /// Lower-case name, as used for Swagger path-item keys.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Put => "put",
            Self::Post => "post",
            Self::Patch => "patch",
            Self::Delete => "delete",
            Self::Head => "head",
            Self::Options => "options",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

impl FromStr for HttpMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownMethod(s.to_string()))
    }
}

/// A captured HTTP request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveRequest {
    /// Full or origin-relative request URL, query string included.
    pub url: String,
    /// HTTP method name.
    pub method: String,
    /// Request headers.
    #[serde(default)]
    pub headers: HeaderMap,
    /// Explicit query parameters; when absent they are read from `url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<HeaderMap>,
    /// Request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// A captured HTTP response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveResponse {
    /// Status code as text (`"200"`); numeric JSON values are accepted.
    #[serde(deserialize_with = "status_code_text")]
    pub status_code: String,
    /// Response headers.
    #[serde(default)]
    pub headers: HeaderMap,
    /// Response body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

fn status_code_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "statusCode must be a string or number, got {other}"
        ))),
    }
}

/// First string value of a header, if present.
///
/// Array-valued headers yield their first string element.
pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    match headers.get(name)? {
        Value::String(s) => Some(s.as_str()),
        Value::Array(items) => items.iter().find_map(Value::as_str),
        _ => None,
    }
}
