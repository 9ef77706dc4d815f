//! # Traffic Validator
//!
//! Runs every traffic sample of a directory against the loaded
//! specifications and aggregates coverage.
//!
//! `initialize()` loads the specification corpus, declares every operation
//! with the aggregator and discovers the samples. `validate()` then processes
//! the samples one by one, in path order. A sample that cannot be processed
//! becomes a record with a [`RuntimeException`]; the run always continues.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use oav_core::{header_str, ErrorCode, HttpMethod, LoadError, OavError};
use oav_spec::{Router, SchemaCompiler, SpecGraph, SpecLoader, SwaggerLoader, ValidatorCompiler};
use oav_validate::{LiveValidator, RequestTarget};
use parking_lot::{Mutex, RwLock};

use crate::aggregator::{CoverageAggregator, OperationCoverageInfo};
use crate::config::TrafficValidatorConfig;
use crate::traffic::{
    discover_samples, walk, CallPlane, OperationInfo, RuntimeException, RuntimeExceptionCode,
    TrafficSample, TrafficValidationIssue,
};

const SPEC_EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

/// State produced by `initialize()`.
#[derive(Debug)]
struct Loaded {
    router: Router,
    samples: Vec<PathBuf>,
    /// Declared operations with nothing recorded; each run starts from a copy.
    declared: CoverageAggregator,
}

/// Validates a traffic corpus and reports per-specification coverage.
pub struct TrafficValidator {
    config: TrafficValidatorConfig,
    loader: Arc<dyn SpecLoader>,
    live: LiveValidator,
    loaded: Option<Loaded>,
    aggregator: Mutex<CoverageAggregator>,
    coverage: RwLock<Vec<OperationCoverageInfo>>,
}

impl std::fmt::Debug for TrafficValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrafficValidator")
            .field("config", &self.config)
            .field("initialized", &self.loaded.is_some())
            .finish_non_exhaustive()
    }
}

impl TrafficValidator {
    /// Validator using the Swagger loader and the draft 4 schema compiler.
    pub fn new(config: TrafficValidatorConfig) -> Self {
        Self::with_components(config, Arc::new(SwaggerLoader::new()), Arc::new(SchemaCompiler::new()))
    }

    /// Validator with a custom loader and compiler.
    pub fn with_components(
        config: TrafficValidatorConfig,
        loader: Arc<dyn SpecLoader>,
        compiler: Arc<dyn ValidatorCompiler>,
    ) -> Self {
        Self {
            config,
            loader,
            live: LiveValidator::new(compiler),
            loaded: None,
            aggregator: Mutex::new(CoverageAggregator::new()),
            coverage: RwLock::new(Vec::new()),
        }
    }

    /// The run configuration.
    pub fn config(&self) -> &TrafficValidatorConfig {
        &self.config
    }

    /// Load every specification and discover the traffic samples.
    ///
    /// # Errors
    ///
    /// [`OavError::Load`] if a specification input is missing or fails to
    /// load; [`OavError::Io`] if the traffic path cannot be read.
    pub fn initialize(&mut self) -> Result<(), OavError> {
        let mut graphs: Vec<Arc<SpecGraph>> = Vec::new();
        let mut aggregator = CoverageAggregator::new();
        for path in spec_files(&self.config.spec_paths)? {
            let graph = self.loader.load(&path)?;
            aggregator.declare_spec(&graph);
            graphs.push(Arc::new(graph));
        }
        let samples = discover_samples(&self.config.traffic_path)?;

        tracing::info!(
            specs = graphs.len(),
            samples = samples.len(),
            "traffic validator initialized"
        );
        *self.aggregator.get_mut() = aggregator.clone();
        self.loaded = Some(Loaded {
            router: Router::new(graphs),
            samples,
            declared: aggregator,
        });
        Ok(())
    }

    /// Validate every discovered sample.
    ///
    /// Every call is a fresh aggregation run; coverage from an earlier call
    /// is replaced, not added to.
    ///
    /// # Errors
    ///
    /// [`OavError::NotInitialized`] if `initialize()` has not completed.
    pub fn validate(&self) -> Result<Vec<TrafficValidationIssue>, OavError> {
        let loaded = self.loaded.as_ref().ok_or(OavError::NotInitialized)?;
        *self.aggregator.lock() = loaded.declared.clone();
        let results: Vec<TrafficValidationIssue> = loaded
            .samples
            .iter()
            .map(|path| self.process(&loaded.router, path))
            .collect();

        let aggregator = self.aggregator.lock();
        *self.coverage.write() = aggregator.report();
        tracing::info!(
            samples = results.len(),
            undefined = aggregator.undefined_count(),
            "traffic validation finished"
        );
        Ok(results)
    }

    /// Per-specification coverage of the last `validate()` run.
    pub fn operation_coverage_result(&self) -> Vec<OperationCoverageInfo> {
        self.coverage.read().clone()
    }

    /// Samples no specification owned.
    pub fn operation_undefined_result(&self) -> usize {
        self.aggregator.lock().undefined_count()
    }

    fn process(&self, router: &Router, path: &Path) -> TrafficValidationIssue {
        let fail = |code: RuntimeExceptionCode, message: String| {
            tracing::warn!(sample = %path.display(), ?code, %message, "sample not validated");
            TrafficValidationIssue::failed(path, RuntimeException::new(code, message))
        };

        let sample = match TrafficSample::from_file(path) {
            Ok(sample) => sample,
            Err(e) => return fail(RuntimeExceptionCode::MalformedSample, e.to_string()),
        };
        let request = &sample.live_request;
        let method = match HttpMethod::from_str(&request.method) {
            Ok(method) => method,
            Err(e) => return fail(RuntimeExceptionCode::MalformedSample, e.to_string()),
        };

        let target = RequestTarget::parse(&request.url);
        let api_version = request
            .query
            .as_ref()
            .and_then(|q| header_str(q, "api-version"))
            .or_else(|| target.api_version())
            .map(str::to_string);

        let Some(matched) = router.match_operation(method, &target.path, api_version.as_deref())
        else {
            self.aggregator.lock().record_undefined();
            return fail(
                RuntimeExceptionCode::OperationNotFound,
                format!("no operation matches {method} {}", target.path),
            );
        };

        let plane = CallPlane::of_path(&target.path);
        let include: Option<&[ErrorCode]> = self.config.include_errors.as_deref();
        let validated = self
            .live
            .validate_swagger_live_request(request, &matched, include)
            .and_then(|request_errors| {
                self.live
                    .validate_swagger_live_response(
                        &sample.live_response,
                        &matched,
                        plane.is_control_plane(),
                        include,
                    )
                    .map(|response_errors| (request_errors, response_errors))
            });
        let (request_errors, response_errors) = match validated {
            Ok(errors) => errors,
            Err(e) => return fail(RuntimeExceptionCode::ValidationFailure, e.to_string()),
        };

        let operation_id = matched.operation.operation_id.clone().unwrap_or_default();
        let mut record = TrafficValidationIssue {
            payload_file_path: path.display().to_string(),
            spec_file_path: None,
            operation_info: Some(OperationInfo {
                operation_id: operation_id.clone(),
                api_version: api_version.clone(),
            }),
            request_errors,
            response_errors,
            runtime_exceptions: Vec::new(),
        };

        let failed = record.has_issues();
        let mut aggregator = self.aggregator.lock();
        let owners = aggregator.owning_specs(&operation_id, api_version.as_deref(), &plane);
        if owners.is_empty() {
            aggregator.record_undefined();
            tracing::warn!(
                sample = %path.display(),
                operation_id = %operation_id,
                api_version = ?api_version,
                "sample matches no specification"
            );
        } else {
            for owner in &owners {
                aggregator.record(owner, &operation_id, failed);
            }
            record.spec_file_path = owners.into_iter().next();
        }
        tracing::debug!(
            sample = %path.display(),
            operation_id = %operation_id,
            failed,
            "sample validated"
        );
        record
    }
}

/// Expand specification inputs into files, directories in path order.
fn spec_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, OavError> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found = Vec::new();
            walk(input, &SPEC_EXTENSIONS, &mut found)?;
            found.sort();
            files.extend(found);
        } else if input.is_file() {
            files.push(input.clone());
        } else {
            return Err(LoadError::Read {
                path: input.display().to_string(),
                reason: "no such file or directory".to_string(),
            }
            .into());
        }
    }
    Ok(files)
}
