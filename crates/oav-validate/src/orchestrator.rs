//! # Live Validation Entry Points
//!
//! [`LiveValidator`] validates one captured request or response against a
//! routed operation. It composes normalization, the content-type gate, the
//! compiled schema validator, issue classification and, for responses, the
//! long-running-operation rules.
//!
//! ## Issue order
//!
//! - Request: schema issues, then the content-type issue.
//! - Response: an unknown status code yields a single
//!   `INVALID_RESPONSE_CODE` issue and nothing else. Otherwise the
//!   content-type issue, then the long-running-operation issue, then schema
//!   issues.
//!
//! The caller's error-code filter is applied last, after classification.

use std::collections::BTreeMap;
use std::sync::Arc;

use oav_core::{
    ErrorCode, HeaderMap, LiveRequest, LiveResponse, OavError, ValidationContext, ValidationIssue,
};
use oav_spec::{OperationMatch, ValidatorCache, ValidatorCompiler};
use serde_json::Value;

use crate::classify::classify_issues;
use crate::content_type::check_content_type;
use crate::lro::check_long_running;
use crate::normalize::{apply_transforms, normalize_body, normalize_headers, RequestTarget};

/// Validates live requests and responses against routed operations.
#[derive(Clone)]
pub struct LiveValidator {
    cache: Arc<ValidatorCache>,
    compiler: Option<Arc<dyn ValidatorCompiler>>,
}

impl std::fmt::Debug for LiveValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveValidator")
            .field("cache", &self.cache)
            .field("compiler", &self.compiler.is_some())
            .finish()
    }
}

impl LiveValidator {
    /// Validator compiling on demand into a fresh cache.
    pub fn new(compiler: Arc<dyn ValidatorCompiler>) -> Self {
        Self {
            cache: Arc::new(ValidatorCache::new()),
            compiler: Some(compiler),
        }
    }

    /// Validator over an existing cache. Without a compiler, every validator
    /// must already be cached.
    pub fn with_cache(cache: Arc<ValidatorCache>, compiler: Option<Arc<dyn ValidatorCompiler>>) -> Self {
        Self { cache, compiler }
    }

    /// The validator cache.
    pub fn cache(&self) -> &Arc<ValidatorCache> {
        &self.cache
    }

    /// Validate a captured request.
    ///
    /// # Errors
    ///
    /// [`OavError::ContractViolation`] when the request validator is neither
    /// cached nor compilable; [`OavError::Load`] when compilation fails.
    pub fn validate_swagger_live_request(
        &self,
        request: &LiveRequest,
        matched: &OperationMatch,
        include_errors: Option<&[ErrorCode]>,
    ) -> Result<Vec<ValidationIssue>, OavError> {
        let operation = &matched.operation;
        let validator = self
            .cache
            .request_validator(operation, self.compiler.as_deref())?;
        let ctx = ValidationContext::request(include_errors.map(<[ErrorCode]>::to_vec));

        let query = match &request.query {
            Some(query) => query.clone(),
            None => RequestTarget::parse(&request.url).query,
        };
        let headers = normalize_headers(&request.headers, &operation.header_transforms);

        let mut payload = HeaderMap::new();
        payload.insert(
            "path".into(),
            Value::Object(apply_transforms(&matched.path_params(), &operation.path_transforms)),
        );
        payload.insert(
            "query".into(),
            Value::Object(apply_transforms(&query, &operation.query_transforms)),
        );
        payload.insert("headers".into(), Value::Object(headers.clone()));
        if let Some(body) = normalize_body(request.body.as_ref(), operation.body_transform.as_ref()) {
            payload.insert("body".into(), body);
        }

        let raw = validator.validate(&Value::Object(payload));
        let mut issues = classify_issues(&raw, operation, &ctx);
        issues.extend(check_content_type(
            &ctx,
            &headers,
            &operation.consumes,
            &operation.source(),
        ));

        tracing::debug!(
            operation = %operation.key,
            issues = issues.len(),
            "validated live request"
        );
        Ok(filter(issues, &ctx))
    }

    /// Validate a captured response.
    ///
    /// `is_arm_call` enables the long-running-operation rules for
    /// control-plane traffic.
    ///
    /// # Errors
    ///
    /// Same as [`validate_swagger_live_request`](Self::validate_swagger_live_request).
    pub fn validate_swagger_live_response(
        &self,
        response: &LiveResponse,
        matched: &OperationMatch,
        is_arm_call: bool,
        include_errors: Option<&[ErrorCode]>,
    ) -> Result<Vec<ValidationIssue>, OavError> {
        let operation = &matched.operation;
        let status_code = response.status_code.trim();
        let ctx = ValidationContext::response(
            status_code,
            operation.method(),
            include_errors.map(<[ErrorCode]>::to_vec),
        );

        let Some(definition) = operation.resolve_response(status_code) else {
            let mut params = BTreeMap::new();
            params.insert("statusCode".to_string(), status_code.to_string());
            let issue = ValidationIssue::from_code(
                ErrorCode::InvalidResponseCode,
                &params,
                operation.responses_source(),
            );
            tracing::debug!(
                operation = %operation.key,
                status = status_code,
                "response code not declared"
            );
            return Ok(filter(vec![issue], &ctx));
        };

        let validator =
            self.cache
                .response_validator(operation, definition, self.compiler.as_deref())?;
        let headers = normalize_headers(&response.headers, &definition.header_transforms);
        let source = oav_core::SourceLocation::new(operation.spec_file(), definition.json_ref.clone());

        let mut issues = Vec::new();
        if definition.has_schema() {
            issues.extend(check_content_type(&ctx, &headers, &operation.produces, &source));
            let is_success = status_code.starts_with('2') && status_code.len() == 3;
            if is_arm_call && operation.long_running && is_success {
                issues.extend(check_long_running(
                    operation.method(),
                    status_code,
                    &headers,
                    &source,
                ));
            }
        }

        let mut payload = HeaderMap::new();
        payload.insert("headers".into(), Value::Object(headers));
        if let Some(body) = &response.body {
            payload.insert("body".into(), body.clone());
        }
        let raw = validator.validate(&Value::Object(payload));
        issues.extend(classify_issues(&raw, operation, &ctx));

        tracing::debug!(
            operation = %operation.key,
            status = status_code,
            issues = issues.len(),
            "validated live response"
        );
        Ok(filter(issues, &ctx))
    }
}

fn filter(issues: Vec<ValidationIssue>, ctx: &ValidationContext) -> Vec<ValidationIssue> {
    issues.into_iter().filter(|i| ctx.includes(i.code)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use oav_core::HttpMethod;
    use oav_spec::{Router, SchemaCompiler, SpecGraph, SwaggerLoader};
    use serde_json::json;

    fn graph() -> Arc<SpecGraph> {
        let doc = json!({
            "swagger": "2.0",
            "info": {"title": "t", "version": "2024-01-01"},
            "paths": {"/items/{id}": {"get": {
                "operationId": "Items_Get",
                "parameters": [
                    {"name": "id", "in": "path", "required": true, "type": "integer"},
                    {"name": "api-version", "in": "query", "required": true, "type": "string"}
                ],
                "responses": {
                    "200": {"description": "ok", "schema": {"type": "object"}}
                }
            }}}
        });
        Arc::new(SwaggerLoader::new().load_document("items.json", &doc).unwrap())
    }

    fn matched() -> OperationMatch {
        Router::new(vec![graph()])
            .match_operation(HttpMethod::Get, "/items/7", None)
            .unwrap()
    }

    fn request(url: &str) -> LiveRequest {
        LiveRequest {
            url: url.into(),
            method: "GET".into(),
            headers: HeaderMap::new(),
            query: None,
            body: None,
        }
    }

    #[test]
    fn coerces_path_params_and_reads_query_from_url() {
        let v = LiveValidator::new(Arc::new(SchemaCompiler::new()));
        let issues = v
            .validate_swagger_live_request(&request("/items/7?api-version=2024-01-01"), &matched(), None)
            .unwrap();
        assert!(issues.is_empty(), "{issues:?}");

        let issues = v
            .validate_swagger_live_request(&request("/items/7"), &matched(), None)
            .unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, ErrorCode::MissingRequiredParameter);
    }

    #[test]
    fn array_valued_integer_header_validates_as_its_value() {
        let doc = json!({
            "swagger": "2.0",
            "info": {"title": "t", "version": "2024-01-01"},
            "paths": {"/counters": {"get": {
                "parameters": [
                    {"name": "x-ms-count", "in": "header", "required": true, "type": "integer"}
                ],
                "responses": {"200": {"description": "ok"}}
            }}}
        });
        let graph = SwaggerLoader::new().load_document("counters.json", &doc).unwrap();
        let matched = Router::new(vec![Arc::new(graph)])
            .match_operation(HttpMethod::Get, "/counters", None)
            .unwrap();
        let v = LiveValidator::new(Arc::new(SchemaCompiler::new()));

        for count in [json!(["3"]), json!("3")] {
            let mut req = request("/counters");
            req.headers.insert("X-MS-Count".into(), count);
            let issues = v.validate_swagger_live_request(&req, &matched, None).unwrap();
            assert!(issues.is_empty(), "{issues:?}");
        }

        let mut req = request("/counters");
        req.headers.insert("X-MS-Count".into(), json!(["three"]));
        let issues = v.validate_swagger_live_request(&req, &matched, None).unwrap();
        assert_eq!(issues[0].code, ErrorCode::InvalidType);
    }

    #[test]
    fn include_filter_applies_after_classification() {
        let v = LiveValidator::new(Arc::new(SchemaCompiler::new()));
        let only_type = [ErrorCode::InvalidType];
        let issues = v
            .validate_swagger_live_request(&request("/items/7"), &matched(), Some(&only_type))
            .unwrap();
        assert!(issues.is_empty());
    }

    #[test]
    fn without_compiler_or_cache_is_contract_violation() {
        let v = LiveValidator::with_cache(Arc::new(ValidatorCache::new()), None);
        assert!(matches!(
            v.validate_swagger_live_request(&request("/items/7"), &matched(), None),
            Err(OavError::ContractViolation(_))
        ));
        let response = LiveResponse {
            status_code: "200".into(),
            headers: HeaderMap::new(),
            body: Some(json!({})),
        };
        assert!(matches!(
            v.validate_swagger_live_response(&response, &matched(), false, None),
            Err(OavError::ContractViolation(_))
        ));
    }

    #[test]
    fn shares_cache_between_validators() {
        let compiling = LiveValidator::new(Arc::new(SchemaCompiler::new()));
        compiling
            .validate_swagger_live_request(&request("/items/7?api-version=1"), &matched(), None)
            .unwrap();
        let cached_only = LiveValidator::with_cache(Arc::clone(compiling.cache()), None);
        assert!(cached_only
            .validate_swagger_live_request(&request("/items/7?api-version=1"), &matched(), None)
            .is_ok());
    }
}
