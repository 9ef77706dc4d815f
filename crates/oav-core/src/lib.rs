//! # oav-core — Foundational Types for Traffic Validation
//!
//! Leaf crate of the validator workspace. Defines the vocabulary every other
//! crate speaks: the error taxonomy, the fixed error-code metadata table, the
//! issue records produced by validation, and the live HTTP payload model read
//! from traffic samples.
//!
//! ## Key Design Principles
//!
//! 1. **Issues are values, errors are failures.** A conformance problem in a
//!    payload is a [`ValidationIssue`] returned to the caller. [`OavError`] is
//!    reserved for contract violations and load failures.
//!
//! 2. **One metadata table.** Severity, message template and documentation
//!    link are derived from [`ErrorCode`] through [`ErrorCode::meta`] and are
//!    never set anywhere else.
//!
//! 3. **Fresh output.** Classification constructs new [`ValidationIssue`]s
//!    from raw [`SchemaValidateIssue`]s; nothing is mutated in place.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `oav-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod code;
pub mod error;
pub mod http;
pub mod issue;
pub mod json_path;

pub use code::{ErrorCode, ErrorMeta, Severity, UnknownErrorCode, DOCUMENTATION_BASE_URL};
pub use error::{LoadError, OavError};
pub use http::{header_str, HeaderMap, HttpMethod, LiveRequest, LiveResponse, UnknownMethod};
pub use issue::{
    FilePosition, SchemaValidateIssue, SourceLocation, ValidationContext, ValidationIssue,
    ValidationMode, MISSING_PROPERTY_PARAM,
};
pub use json_path::{json_path_to_pointer, pointer_to_json_path};
