//! # Validator Cache
//!
//! Compiled validators, memoized per [`OperationKey`] and [`ResponseKey`].
//! Operations themselves stay immutable; the cache is the only place a
//! compiled validator is stored.
//!
//! Concurrent callers may race to compile the same key. The first insert wins
//! and every caller gets that same validator back.

use std::collections::HashMap;
use std::sync::Arc;

use oav_core::OavError;
use parking_lot::RwLock;

use crate::compile::{PayloadValidator, ValidatorCompiler};
use crate::operation::{Operation, OperationKey, ResponseDefinition, ResponseKey};

/// Memoized compiled validators.
#[derive(Default)]
pub struct ValidatorCache {
    requests: RwLock<HashMap<OperationKey, Arc<dyn PayloadValidator>>>,
    responses: RwLock<HashMap<ResponseKey, Arc<dyn PayloadValidator>>>,
}

impl std::fmt::Debug for ValidatorCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorCache")
            .field("requests", &self.requests.read().len())
            .field("responses", &self.responses.read().len())
            .finish()
    }
}

impl ValidatorCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached request validator of an operation.
    pub fn request(&self, key: &OperationKey) -> Option<Arc<dyn PayloadValidator>> {
        self.requests.read().get(key).cloned()
    }

    /// Cached validator of one response.
    pub fn response(&self, key: &ResponseKey) -> Option<Arc<dyn PayloadValidator>> {
        self.responses.read().get(key).cloned()
    }

    /// Store a request validator unless one is already cached; returns the
    /// validator that ends up cached.
    pub fn insert_request(
        &self,
        key: OperationKey,
        validator: Arc<dyn PayloadValidator>,
    ) -> Arc<dyn PayloadValidator> {
        self.requests.write().entry(key).or_insert(validator).clone()
    }

    /// Store a response validator unless one is already cached; returns the
    /// validator that ends up cached.
    pub fn insert_response(
        &self,
        key: ResponseKey,
        validator: Arc<dyn PayloadValidator>,
    ) -> Arc<dyn PayloadValidator> {
        self.responses.write().entry(key).or_insert(validator).clone()
    }

    /// Number of cached validators, requests and responses together.
    pub fn len(&self) -> usize {
        self.requests.read().len() + self.responses.read().len()
    }

    /// Whether nothing has been compiled yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Request validator of `operation`, compiled on first use.
    ///
    /// # Errors
    ///
    /// [`OavError::ContractViolation`] if nothing is cached and no compiler
    /// was supplied; [`OavError::Load`] if compilation fails.
    pub fn request_validator(
        &self,
        operation: &Operation,
        compiler: Option<&dyn ValidatorCompiler>,
    ) -> Result<Arc<dyn PayloadValidator>, OavError> {
        if let Some(validator) = self.request(&operation.key) {
            return Ok(validator);
        }
        let compiler = compiler.ok_or_else(|| {
            OavError::ContractViolation(format!(
                "no request validator compiled for {} and no compiler available",
                operation.key
            ))
        })?;
        let compiled = compiler.compile_request_validator(operation)?;
        Ok(self.insert_request(operation.key.clone(), compiled))
    }

    /// Validator of one response of `operation`, compiled on first use.
    ///
    /// # Errors
    ///
    /// Same as [`request_validator`](Self::request_validator).
    pub fn response_validator(
        &self,
        operation: &Operation,
        response: &ResponseDefinition,
        compiler: Option<&dyn ValidatorCompiler>,
    ) -> Result<Arc<dyn PayloadValidator>, OavError> {
        let key = operation.response_key(response);
        if let Some(validator) = self.response(&key) {
            return Ok(validator);
        }
        let compiler = compiler.ok_or_else(|| {
            OavError::ContractViolation(format!(
                "no validator compiled for response '{}' of {} and no compiler available",
                response.status, operation.key
            ))
        })?;
        let compiled = compiler.compile_response_validator(operation, response)?;
        Ok(self.insert_response(key, compiled))
    }
}
