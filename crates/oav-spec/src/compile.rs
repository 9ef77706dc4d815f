//! # Validator Compilation
//!
//! Compiles the composite request/response schemas built by the loader into
//! [`PayloadValidator`]s. Swagger 2.0 schemas are JSON Schema draft 4, so
//! every validator is built with [`jsonschema::Draft::Draft4`].
//!
//! A validator reports raw [`SchemaValidateIssue`]s: the engine's
//! JSON Pointer instance path is converted to a JSON path, and a missing
//! required property is carried as the `missingProperty` parameter.
//! Classification into user-facing issues happens later.

use std::sync::Arc;

use jsonschema::error::ValidationErrorKind;
use oav_core::{
    pointer_to_json_path, ErrorCode, LoadError, SchemaValidateIssue, SourceLocation,
    MISSING_PROPERTY_PARAM,
};
use serde_json::Value;

use crate::operation::{Operation, ResponseDefinition};

/// A compiled validator for one request or response contract.
pub trait PayloadValidator: Send + Sync {
    /// Validate a composite payload, returning every violation found.
    fn validate(&self, payload: &Value) -> Vec<SchemaValidateIssue>;
}

/// Builds validators for operations and their responses.
pub trait ValidatorCompiler: Send + Sync {
    /// Compile the request validator of `operation`.
    fn compile_request_validator(
        &self,
        operation: &Operation,
    ) -> Result<Arc<dyn PayloadValidator>, LoadError>;

    /// Compile the validator of one response of `operation`.
    fn compile_response_validator(
        &self,
        operation: &Operation,
        response: &ResponseDefinition,
    ) -> Result<Arc<dyn PayloadValidator>, LoadError>;
}

/// A [`PayloadValidator`] backed by a compiled draft 4 JSON schema.
pub struct JsonSchemaValidator {
    validator: jsonschema::Validator,
    source: SourceLocation,
}

impl std::fmt::Debug for JsonSchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSchemaValidator")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl JsonSchemaValidator {
    /// Compile `schema`. `source` is attached to every reported issue.
    pub fn compile(schema: &Value, source: SourceLocation) -> Result<Self, LoadError> {
        let validator = jsonschema::options()
            .with_draft(jsonschema::Draft::Draft4)
            .build(schema)
            .map_err(|e| LoadError::SchemaCompile {
                target: source.json_ref.clone().unwrap_or_else(|| source.url.clone()),
                reason: e.to_string(),
            })?;
        Ok(Self { validator, source })
    }
}

impl PayloadValidator for JsonSchemaValidator {
    fn validate(&self, payload: &Value) -> Vec<SchemaValidateIssue> {
        self.validator
            .iter_errors(payload)
            .map(|err| {
                let path = pointer_to_json_path(&err.instance_path.to_string());
                let mut issue =
                    SchemaValidateIssue::new(error_code(&err.kind), err.to_string(), path);
                if let ValidationErrorKind::Required { property } = &err.kind {
                    let name = match property {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    issue = issue.with_param(MISSING_PROPERTY_PARAM, name);
                }
                issue.source = Some(self.source.clone());
                issue
            })
            .collect()
    }
}

/// Map an engine error kind to its violation code.
fn error_code(kind: &ValidationErrorKind) -> ErrorCode {
    match kind {
        ValidationErrorKind::Type { .. } => ErrorCode::InvalidType,
        ValidationErrorKind::Format { .. } => ErrorCode::InvalidFormat,
        ValidationErrorKind::Enum { .. } => ErrorCode::EnumMismatch,
        ValidationErrorKind::Constant { .. } => ErrorCode::ConstMismatch,
        ValidationErrorKind::Pattern { .. } => ErrorCode::Pattern,
        ValidationErrorKind::MaxLength { .. } => ErrorCode::MaxLength,
        ValidationErrorKind::MinLength { .. } => ErrorCode::MinLength,
        ValidationErrorKind::Maximum { .. } | ValidationErrorKind::ExclusiveMaximum { .. } => {
            ErrorCode::Maximum
        }
        ValidationErrorKind::Minimum { .. } | ValidationErrorKind::ExclusiveMinimum { .. } => {
            ErrorCode::Minimum
        }
        ValidationErrorKind::MultipleOf { .. } => ErrorCode::MultipleOf,
        ValidationErrorKind::MaxItems { .. } => ErrorCode::ArrayLengthLong,
        ValidationErrorKind::MinItems { .. } => ErrorCode::ArrayLengthShort,
        ValidationErrorKind::UniqueItems { .. } => ErrorCode::ArrayUnique,
        ValidationErrorKind::AdditionalProperties { .. } => ErrorCode::ObjectAdditionalProperties,
        ValidationErrorKind::Required { .. } => ErrorCode::ObjectMissingRequiredProperty,
        ValidationErrorKind::OneOfNotValid { .. } => ErrorCode::OneOfMissing,
        ValidationErrorKind::OneOfMultipleValid { .. } => ErrorCode::OneOfMultiple,
        ValidationErrorKind::AnyOf { .. } => ErrorCode::AnyOfMissing,
        ValidationErrorKind::Not { .. } => ErrorCode::NotPassed,
        _ => ErrorCode::SchemaViolation,
    }
}

/// The default [`ValidatorCompiler`]: draft 4 validators over the loader's
/// composite schemas.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaCompiler;

impl SchemaCompiler {
    /// Create a compiler.
    pub fn new() -> Self {
        Self
    }
}

impl ValidatorCompiler for SchemaCompiler {
    fn compile_request_validator(
        &self,
        operation: &Operation,
    ) -> Result<Arc<dyn PayloadValidator>, LoadError> {
        tracing::debug!(operation = %operation.key, "compiling request validator");
        let validator = JsonSchemaValidator::compile(&operation.request_schema, operation.source())?;
        Ok(Arc::new(validator))
    }

    fn compile_response_validator(
        &self,
        operation: &Operation,
        response: &ResponseDefinition,
    ) -> Result<Arc<dyn PayloadValidator>, LoadError> {
        tracing::debug!(
            operation = %operation.key,
            status = %response.status,
            "compiling response validator"
        );
        let source = SourceLocation::new(operation.spec_file(), response.json_ref.clone());
        let validator = JsonSchemaValidator::compile(&response.validation_schema, source)?;
        Ok(Arc::new(validator))
    }
}
