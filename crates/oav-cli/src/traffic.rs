//! # Traffic Subcommand
//!
//! Runs the traffic validator over a sample corpus, prints one coverage line
//! per matched specification, and optionally writes the full results as
//! JSON.
//!
//! Flags take precedence over the `OAV_*` environment variables. The
//! environment is read when the traffic path or `--spec` is omitted.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;

use oav_coverage::{
    parse_error_codes, OperationCoverageInfo, TrafficValidationIssue, TrafficValidator,
    TrafficValidatorConfig,
};

/// Arguments for the `oav traffic` subcommand.
#[derive(Args, Debug, Default)]
pub struct TrafficArgs {
    /// Traffic sample file or directory (default: `OAV_TRAFFIC_PATH`).
    #[arg(value_name = "TRAFFIC_PATH")]
    pub traffic_path: Option<PathBuf>,

    /// Specification file or directory. Repeatable (default: `OAV_SPEC_PATHS`).
    #[arg(long = "spec", value_name = "PATH")]
    pub specs: Vec<PathBuf>,

    /// Comma-separated error codes to report, e.g. `INVALID_TYPE,LRO_RESPONSE_CODE`.
    #[arg(long, value_name = "CODES")]
    pub include_errors: Option<String>,

    /// Write results and coverage as JSON to this file.
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,
}

/// Execute the traffic subcommand.
///
/// Returns exit code: 0 when every sample is clean, 1 when any sample has
/// issues or a runtime exception.
pub fn run_traffic(args: &TrafficArgs) -> Result<u8> {
    let config = resolve_config(args)?;
    tracing::info!(
        specs = config.spec_paths.len(),
        traffic = %config.traffic_path.display(),
        "starting traffic validation"
    );

    let mut validator = TrafficValidator::new(config);
    validator
        .initialize()
        .context("failed to initialize traffic validator")?;
    let results = validator.validate().context("traffic validation failed")?;
    let coverage = validator.operation_coverage_result();
    let undefined = validator.operation_undefined_result();

    print_summary(&results, &coverage, undefined);

    if let Some(out) = &args.out {
        write_report(out, &results, &coverage, undefined)?;
        println!("Report written to {}", out.display());
    }

    let unclean = results
        .iter()
        .any(|r| r.has_issues() || !r.runtime_exceptions.is_empty());
    Ok(u8::from(unclean))
}

fn resolve_config(args: &TrafficArgs) -> Result<TrafficValidatorConfig> {
    let mut config = match (&args.traffic_path, args.specs.is_empty()) {
        (Some(traffic), false) => TrafficValidatorConfig::new(args.specs.clone(), traffic),
        _ => {
            let mut config = TrafficValidatorConfig::from_env()
                .context("traffic path and --spec not both given; reading environment")?;
            if let Some(traffic) = &args.traffic_path {
                config.traffic_path = traffic.clone();
            }
            if !args.specs.is_empty() {
                config.spec_paths = args.specs.clone();
            }
            config
        }
    };
    if let Some(raw) = &args.include_errors {
        config.include_errors = Some(parse_error_codes(raw).context("invalid --include-errors")?);
    }
    Ok(config)
}

fn print_summary(
    results: &[TrafficValidationIssue],
    coverage: &[OperationCoverageInfo],
    undefined: usize,
) {
    let failing = results.iter().filter(|r| r.has_issues()).count();
    let exceptions = results
        .iter()
        .filter(|r| !r.runtime_exceptions.is_empty())
        .count();
    println!(
        "Samples: {} processed, {} with issues, {} not validated",
        results.len(),
        failing,
        exceptions
    );
    for info in coverage {
        println!(
            "  {}: {}/{} operations covered ({:.1}%), {} failing",
            info.spec,
            info.covered_operations,
            info.total_operations,
            info.coverage_rate * 100.0,
            info.validation_fail_operations
        );
    }
    println!("Undefined operations: {undefined}");
}

fn write_report(
    out: &Path,
    results: &[TrafficValidationIssue],
    coverage: &[OperationCoverageInfo],
    undefined: usize,
) -> Result<()> {
    let document = json!({
        "results": results,
        "coverage": coverage,
        "undefinedOperations": undefined,
    });
    let text = serde_json::to_string_pretty(&document).context("failed to serialize report")?;
    std::fs::write(out, text).with_context(|| format!("failed to write {}", out.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use oav_coverage::RuntimeExceptionCode;

    fn write(path: &Path, value: &serde_json::Value) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, value.to_string()).unwrap();
    }

    #[test]
    fn flags_build_config_without_environment() {
        let args = TrafficArgs {
            traffic_path: Some("traffic".into()),
            specs: vec!["a.json".into(), "dir".into()],
            include_errors: Some("INVALID_TYPE".into()),
            out: None,
        };
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.traffic_path, PathBuf::from("traffic"));
        assert_eq!(config.spec_paths.len(), 2);
        assert_eq!(config.include_errors.map(|c| c.len()), Some(1));
    }

    #[test]
    fn unknown_include_code_is_rejected() {
        let args = TrafficArgs {
            traffic_path: Some("traffic".into()),
            specs: vec!["a.json".into()],
            include_errors: Some("BOGUS".into()),
            out: None,
        };
        assert!(resolve_config(&args).is_err());
    }

    #[test]
    fn writes_report_and_flags_unclean_runs() {
        let dir = tempfile::tempdir().unwrap();
        let spec = dir.path().join("specs").join("items.json");
        write(
            &spec,
            &json!({
                "swagger": "2.0",
                "info": {"title": "Items", "version": "1.0"},
                "paths": {"/items/{id}": {"get": {
                    "operationId": "Items_Get",
                    "parameters": [
                        {"name": "id", "in": "path", "required": true, "type": "string"}
                    ],
                    "responses": {"200": {"description": "ok"}}
                }}}
            }),
        );
        let traffic = dir.path().join("traffic");
        write(
            &traffic.join("ok.json"),
            &json!({
                "liveRequest": {"url": "/items/1", "method": "GET"},
                "liveResponse": {"statusCode": 200}
            }),
        );
        std::fs::write(traffic.join("broken.json"), "nope").unwrap();

        let out = dir.path().join("report.json");
        let args = TrafficArgs {
            traffic_path: Some(traffic),
            specs: vec![spec],
            include_errors: None,
            out: Some(out.clone()),
        };
        assert_eq!(run_traffic(&args).unwrap(), 1);

        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(report["undefinedOperations"], 0);
        assert_eq!(report["coverage"][0]["coveredOperations"], 1);
        assert_eq!(report["results"].as_array().unwrap().len(), 2);
        let broken = serde_json::to_value(RuntimeExceptionCode::MalformedSample).unwrap();
        assert_eq!(report["results"][0]["runtimeExceptions"][0]["code"], broken);
    }
}
