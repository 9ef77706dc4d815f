//! # oav-coverage — Traffic Coverage
//!
//! Runs a directory of captured traffic through live validation and reports,
//! per specification file, how many declared operations the traffic
//! exercised and how many of those failed.
//!
//! ## Flow
//!
//! ```text
//! TrafficValidator::initialize   load specs, declare operations, find samples
//! TrafficValidator::validate     per sample: parse -> route -> validate
//!                                -> owning specs -> CoverageAggregator
//! operation_coverage_result      OperationCoverageInfo per matched spec
//! ```
//!
//! One bad sample never stops a run; it yields a record carrying a
//! [`RuntimeException`].

pub mod aggregator;
pub mod config;
pub mod traffic;
pub mod validator;

pub use aggregator::{CoverageAggregator, OperationCoverageInfo, UncoveredBatch};
pub use config::{parse_error_codes, ConfigError, TrafficValidatorConfig};
pub use traffic::{
    discover_samples, CallPlane, OperationInfo, RuntimeException, RuntimeExceptionCode,
    TrafficSample, TrafficValidationIssue,
};
pub use validator::TrafficValidator;
