//! # oav-cli — Command-Line Interface
//!
//! Provides the `oav` binary.
//!
//! ## Subcommands
//!
//! - `oav traffic`: validate a traffic corpus against specifications and
//!   report per-specification operation coverage.
//!
//! ```bash
//! oav traffic ./traffic --spec ./specification/widgets --out coverage.json
//! OAV_SPEC_PATHS=./specs OAV_TRAFFIC_PATH=./traffic oav -v traffic
//! ```
//!
//! Exit codes: 0 when every sample validated cleanly, 1 when any sample had
//! issues or could not be processed, 2 on operational errors.

pub mod traffic;
