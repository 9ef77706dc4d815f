//! # Operation Routing
//!
//! Finds the operation a live request targets. Every loaded document is
//! searched; when several operations match, the one from a document whose
//! `info.version` equals the request's `api-version` wins, then the one with
//! the most literal path segments, then the one loaded first.

use std::sync::Arc;

use oav_core::{HeaderMap, HttpMethod};
use serde_json::Value;

use crate::operation::{Operation, SpecGraph};

/// A routed request: the operation plus its raw path captures.
#[derive(Debug, Clone)]
pub struct OperationMatch {
    /// The matched operation.
    pub operation: Arc<Operation>,
    /// Raw (still percent-encoded) captures, in template order.
    pub captures: Vec<String>,
}

impl OperationMatch {
    /// Path parameters by name, as strings.
    pub fn path_params(&self) -> HeaderMap {
        self.operation
            .pattern
            .param_names()
            .iter()
            .zip(&self.captures)
            .map(|(name, value)| (name.clone(), Value::String(value.clone())))
            .collect()
    }
}

/// Routes requests across every loaded document.
#[derive(Debug, Clone, Default)]
pub struct Router {
    specs: Vec<Arc<SpecGraph>>,
}

impl Router {
    /// Router over `specs`, in load order.
    pub fn new(specs: Vec<Arc<SpecGraph>>) -> Self {
        Self { specs }
    }

    /// Loaded documents, in load order.
    pub fn specs(&self) -> &[Arc<SpecGraph>] {
        &self.specs
    }

    /// Find the operation for `method` + `path`.
    ///
    /// `path` must not carry a query string.
    pub fn match_operation(
        &self,
        method: HttpMethod,
        path: &str,
        api_version: Option<&str>,
    ) -> Option<OperationMatch> {
        let mut best: Option<((bool, usize), OperationMatch)> = None;
        for spec in &self.specs {
            let version_match = api_version.is_some_and(|v| v == spec.api_version);
            for operation in &spec.operations {
                if operation.method() != method {
                    continue;
                }
                let Some(captures) = operation.pattern.captures(path) else {
                    continue;
                };
                let rank = (version_match, operation.pattern.literal_count());
                if best.as_ref().map_or(true, |(top, _)| rank > *top) {
                    best = Some((
                        rank,
                        OperationMatch {
                            operation: Arc::clone(operation),
                            captures,
                        },
                    ));
                }
            }
        }
        let found = best.map(|(_, m)| m);
        match &found {
            Some(m) => tracing::trace!(operation = %m.operation.key, "routed request"),
            None => tracing::debug!(%method, path, "no operation matches request"),
        }
        found
    }
}
