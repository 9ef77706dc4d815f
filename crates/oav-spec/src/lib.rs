//! # oav-spec — Specification Loading and Compilation
//!
//! Loads Swagger 2.0 documents into an immutable operation graph, routes live
//! requests to operations, and compiles JSON Schema validators on demand.
//!
//! ## Layout
//!
//! - [`loader`]: document parsing, `$ref` checks, composite schema building.
//! - [`operation`]: [`SpecGraph`], [`Operation`], [`ResponseDefinition`].
//! - [`pattern`]: path-template matching.
//! - [`transform`]: string-to-JSON field conversions.
//! - [`router`]: request-to-operation routing.
//! - [`compile`]: draft 4 validator compilation.
//! - [`cache`]: per-operation validator memoization.

pub mod cache;
pub mod compile;
pub mod loader;
pub mod operation;
pub mod pattern;
pub mod router;
pub mod transform;

pub use cache::ValidatorCache;
pub use compile::{JsonSchemaValidator, PayloadValidator, SchemaCompiler, ValidatorCompiler};
pub use loader::{SpecLoader, SwaggerLoader, DEFAULT_MEDIA_TYPE};
pub use operation::{
    Operation, OperationKey, ResponseDefinition, ResponseKey, SpecGraph, DEFAULT_RESPONSE,
};
pub use pattern::PathPattern;
pub use router::{OperationMatch, Router};
pub use transform::{Transform, TransformMap, ValueShape};
