//! Traffic validation configuration.
//!
//! Built explicitly or read from the environment. Command-line flags take
//! precedence over the environment; that merge happens in the binary.

use std::path::PathBuf;

use oav_core::ErrorCode;

/// Specification inputs, in platform path-list syntax.
pub const ENV_SPEC_PATHS: &str = "OAV_SPEC_PATHS";
/// Traffic sample directory or file.
pub const ENV_TRAFFIC_PATH: &str = "OAV_TRAFFIC_PATH";
/// Comma-separated error codes to report.
pub const ENV_INCLUDE_ERRORS: &str = "OAV_INCLUDE_ERRORS";

/// Inputs of one traffic validation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficValidatorConfig {
    /// Specification files or directories.
    pub spec_paths: Vec<PathBuf>,
    /// Traffic sample file or directory.
    pub traffic_path: PathBuf,
    /// Codes to report; `None` reports every code.
    pub include_errors: Option<Vec<ErrorCode>>,
}

impl TrafficValidatorConfig {
    /// Configuration reporting every error code.
    pub fn new(spec_paths: Vec<PathBuf>, traffic_path: impl Into<PathBuf>) -> Self {
        Self {
            spec_paths,
            traffic_path: traffic_path.into(),
            include_errors: None,
        }
    }

    /// Restrict reporting to `codes`.
    pub fn with_include_errors(mut self, codes: Vec<ErrorCode>) -> Self {
        self.include_errors = Some(codes);
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `OAV_SPEC_PATHS` (required, path list)
    /// - `OAV_TRAFFIC_PATH` (required)
    /// - `OAV_INCLUDE_ERRORS` (optional, e.g. `INVALID_TYPE,LRO_RESPONSE_CODE`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let specs = lookup(ENV_SPEC_PATHS)
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing(ENV_SPEC_PATHS))?;
        let traffic = lookup(ENV_TRAFFIC_PATH)
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing(ENV_TRAFFIC_PATH))?;

        let mut config = Self::new(std::env::split_paths(&specs).collect(), traffic);
        if let Some(raw) = lookup(ENV_INCLUDE_ERRORS).filter(|s| !s.trim().is_empty()) {
            config.include_errors = Some(parse_error_codes(&raw)?);
        }
        Ok(config)
    }
}

/// Parse a comma-separated list of error code names.
pub fn parse_error_codes(raw: &str) -> Result<Vec<ErrorCode>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<ErrorCode>()
                .map_err(|_| ConfigError::UnknownErrorCode(s.to_string()))
        })
        .collect()
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is unset or empty.
    #[error("{0} environment variable is required")]
    Missing(&'static str),
    /// An include-list entry names no known error code.
    #[error("unknown error code: {0}")]
    UnknownErrorCode(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn reads_all_variables() {
        let joined = std::env::join_paths(["specs/a.json", "specs/b"]).unwrap();
        let joined = joined.to_string_lossy().into_owned();
        let config = TrafficValidatorConfig::from_lookup(lookup(&[
            (ENV_SPEC_PATHS, &joined),
            (ENV_TRAFFIC_PATH, "traffic"),
            (ENV_INCLUDE_ERRORS, "invalid_type, LRO_RESPONSE_CODE"),
        ]))
        .unwrap();
        assert_eq!(
            config.spec_paths,
            vec![PathBuf::from("specs/a.json"), PathBuf::from("specs/b")]
        );
        assert_eq!(config.traffic_path, PathBuf::from("traffic"));
        assert_eq!(
            config.include_errors,
            Some(vec![ErrorCode::InvalidType, ErrorCode::LroResponseCode])
        );
    }

    #[test]
    fn missing_variables_are_errors() {
        let err = TrafficValidatorConfig::from_lookup(lookup(&[(ENV_TRAFFIC_PATH, "t")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ENV_SPEC_PATHS)));

        let err = TrafficValidatorConfig::from_lookup(lookup(&[(ENV_SPEC_PATHS, "s")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ENV_TRAFFIC_PATH)));
    }

    #[test]
    fn unknown_code_is_an_error() {
        let err = parse_error_codes("INVALID_TYPE,NOT_A_CODE").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownErrorCode(ref c) if c == "NOT_A_CODE"));
        assert!(parse_error_codes(" , ").unwrap().is_empty());
    }

    #[test]
    fn builder_sets_filter() {
        let config = TrafficValidatorConfig::new(vec!["a.json".into()], "t")
            .with_include_errors(vec![ErrorCode::LroResponseHeader]);
        assert_eq!(config.include_errors, Some(vec![ErrorCode::LroResponseHeader]));
    }
}
