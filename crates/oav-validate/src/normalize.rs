//! # Payload Normalization
//!
//! Brings captured values into the shape the compiled schemas expect:
//! header names are lower-cased, then each field's declared [`Transform`]
//! runs. Header keys are folded before transform lookup, so transform maps
//! only ever hold lower-case header names.
//!
//! Inputs are never mutated; every function returns a new value.

use oav_core::HeaderMap;
use oav_spec::{Transform, TransformMap};
use serde_json::Value;
use url::Url;

/// Origin used to resolve origin-relative traffic URLs.
const PLACEHOLDER_ORIGIN: &str = "http://localhost";

/// Fold header names to lower case. On a case-variant collision the entry
/// iterated last wins.
pub fn lowercase_keys(headers: &HeaderMap) -> HeaderMap {
    headers
        .iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
        .collect()
}

/// Apply `transforms` to the matching fields of `values`.
pub fn apply_transforms(values: &HeaderMap, transforms: &TransformMap) -> HeaderMap {
    values
        .iter()
        .map(|(name, value)| {
            let value = match transforms.get(name) {
                Some(transform) => transform.apply(value),
                None => value.clone(),
            };
            (name.clone(), value)
        })
        .collect()
}

/// Lower-case header names, then apply header transforms.
pub fn normalize_headers(headers: &HeaderMap, transforms: &TransformMap) -> HeaderMap {
    apply_transforms(&lowercase_keys(headers), transforms)
}

/// Run the single whole-body transform, if the operation declares one.
///
/// Only a text body is converted; structured bodies are validated as sent.
pub fn normalize_body(body: Option<&Value>, transform: Option<&Transform>) -> Option<Value> {
    let body = body?;
    Some(match transform {
        Some(transform) if body.is_string() => transform.apply(body),
        _ => body.clone(),
    })
}

/// Path and query of a captured request URL.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestTarget {
    /// URL path, still percent-encoded.
    pub path: String,
    /// Decoded query parameters; repeated keys collect into arrays.
    pub query: HeaderMap,
}

impl RequestTarget {
    /// Split a captured URL into path and query.
    ///
    /// Origin-relative URLs are resolved against a placeholder origin. A URL
    /// that still fails to parse yields its text before `?` as the path and
    /// no query.
    pub fn parse(raw: &str) -> Self {
        let parsed = Url::parse(raw).or_else(|_| {
            Url::parse(PLACEHOLDER_ORIGIN).and_then(|base| base.join(raw))
        });
        match parsed {
            Ok(url) => {
                let mut query = HeaderMap::new();
                for (key, value) in url.query_pairs() {
                    let value = Value::String(value.into_owned());
                    match query.get_mut(key.as_ref()) {
                        Some(Value::Array(items)) => items.push(value),
                        Some(existing) => {
                            let first = existing.take();
                            *existing = Value::Array(vec![first, value]);
                        }
                        None => {
                            query.insert(key.into_owned(), value);
                        }
                    }
                }
                Self {
                    path: url.path().to_string(),
                    query,
                }
            }
            Err(e) => {
                tracing::debug!(url = raw, error = %e, "unparsable request url");
                Self {
                    path: raw.split('?').next().unwrap_or(raw).to_string(),
                    query: HeaderMap::new(),
                }
            }
        }
    }

    /// The `api-version` query parameter.
    pub fn api_version(&self) -> Option<&str> {
        oav_core::header_str(&self.query, "api-version")
    }
}
