//! # Error Types — Structured Error Hierarchy
//!
//! Defines the failure types of the validator. All errors use `thiserror`
//! for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Conformance issues are NOT errors. They are collected into
//!   `Vec<ValidationIssue>` and returned.
//! - Contract violations (a validator requested before compilation with no
//!   compiler available, `validate()` before `initialize()`) fail fast with
//!   [`OavError::ContractViolation`] or [`OavError::NotInitialized`].
//! - Load errors carry the document path and the reason, so a traffic run can
//!   record them per sample.

use thiserror::Error;

/// Top-level error type for the validator.
#[derive(Error, Debug)]
pub enum OavError {
    /// A programming-contract violation. Never reported as a validation issue.
    #[error("contract violation: {0}")]
    ContractViolation(String),

    /// A specification document could not be loaded or compiled.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// A traffic sample could not be read or parsed.
    #[error("invalid traffic sample {path}: {reason}")]
    Sample {
        /// Path to the sample file.
        path: String,
        /// Human-readable reason for the failure.
        reason: String,
    },

    /// The traffic validator was used before `initialize()` completed.
    #[error("traffic validator is not initialized")]
    NotInitialized,

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while loading a specification document or compiling its
/// validators.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The document file could not be read.
    #[error("failed to read specification {path}: {reason}")]
    Read {
        /// Path to the document.
        path: String,
        /// Human-readable reason for the failure.
        reason: String,
    },

    /// The document is not valid JSON/YAML.
    #[error("failed to parse specification {path}: {reason}")]
    Parse {
        /// Path to the document.
        path: String,
        /// Human-readable reason for the failure.
        reason: String,
    },

    /// The document parsed but is not a usable Swagger 2.0 document.
    #[error("invalid specification {path}: {reason}")]
    InvalidDocument {
        /// Path to the document.
        path: String,
        /// Human-readable reason for the failure.
        reason: String,
    },

    /// A `$ref` does not point at anything inside the document.
    #[error("unresolved reference {reference} in {path}")]
    UnresolvedReference {
        /// Path to the document.
        path: String,
        /// The offending `$ref` value.
        reference: String,
    },

    /// A payload schema could not be compiled into a validator.
    #[error("failed to compile schema for {target}: {reason}")]
    SchemaCompile {
        /// Operation (and status code, for responses) the schema belongs to.
        target: String,
        /// Human-readable reason.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_converts_into_oav_error() {
        let err: OavError = LoadError::UnresolvedReference {
            path: "spec.json".into(),
            reference: "other.json#/definitions/Foo".into(),
        }
        .into();
        assert!(matches!(err, OavError::Load(_)));
        assert_eq!(
            err.to_string(),
            "unresolved reference other.json#/definitions/Foo in spec.json"
        );
    }

    #[test]
    fn contract_violation_display() {
        let err = OavError::ContractViolation("no compiler".into());
        assert_eq!(err.to_string(), "contract violation: no compiler");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: OavError = io.into();
        assert!(matches!(err, OavError::Io(_)));
    }
}
