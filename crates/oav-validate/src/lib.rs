//! # oav-validate — Live Traffic Conformance Validation
//!
//! Validates one captured request or response against the operation it was
//! routed to and returns enriched [`ValidationIssue`](oav_core::ValidationIssue)s.
//!
//! ## Pipeline
//!
//! ```text
//! LiveRequest / LiveResponse + OperationMatch
//!   -> normalize      header case folding, field transforms
//!   -> content_type   allowed media types
//!   -> lro            long-running status/header rules (responses)
//!   -> schema         compiled validator from the cache
//!   -> classify       codes, paths, severities, sources
//!   -> include filter
//! ```
//!
//! Issues are return values. The only errors are contract violations and
//! validator compilation failures.

pub mod classify;
pub mod content_type;
pub mod lro;
pub mod normalize;
pub mod orchestrator;

pub use classify::classify_issues;
pub use content_type::{check_content_type, OCTET_STREAM};
pub use lro::{check_long_running, LroRule, LroVerdict, POLLING_HEADERS};
pub use normalize::{apply_transforms, lowercase_keys, normalize_body, normalize_headers, RequestTarget};
pub use orchestrator::LiveValidator;
