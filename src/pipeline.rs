//! Contract Workflow
//!
//! One linear pass per endpoint:
//!
//! ```text
//! Fetching → ContractCheck → Inferring → GeneratedValidation
//!          → AcceptDecision → Emitting → Done
//! ```
//!
//! Any stage may end the run in `Failed`, reported as a [`PipelineFailure`].
//! The generated artifact is always written before acceptance is considered,
//! so a failed run never leaves the contract half-written.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::checksum::Checksum;
use crate::codegen::{self, TypeLanguage};
use crate::diff::{self, CompatibilityResult};
use crate::discovery::{select_route, RouteDiscovery};
use crate::endpoint::{Endpoint, EndpointId, RouteDescriptor};
use crate::error::ContractError;
use crate::fetch::SampleSource;
use crate::infer::infer;
use crate::normalize::{normalize, RequiredOverride};
use crate::store::{write_atomic, Artifact, ContractStore};
use crate::validator::{ContractValidator, SanitizeReport, Violation};

// =============================================================================
// Stages and outcomes
// =============================================================================

/// Workflow states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    ContractCheck,
    Inferring,
    GeneratedValidation,
    AcceptDecision,
    Emitting,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetching => "fetching",
            Stage::ContractCheck => "contract check",
            Stage::Inferring => "inferring",
            Stage::GeneratedValidation => "generated validation",
            Stage::AcceptDecision => "accept decision",
            Stage::Emitting => "emitting",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// What the contract check concluded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractCheck {
    /// No contract exists yet
    Skipped,
    Passed,
    /// Violations found but accept mode carried the run forward
    Overridden(Vec<Violation>),
}

/// Per-run switches
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Promote the generated schema and tolerate contract violations
    pub accept: bool,
    pub language: TypeLanguage,
}

/// Summary of a successful run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub endpoint: EndpointId,
    pub route: RouteDescriptor,
    /// Stages visited, in order, ending with `Done`
    pub stages: Vec<Stage>,
    pub contract_check: ContractCheck,
    /// Forced-required overrides that resolved
    pub overrides_applied: usize,
    /// What sanitizing touched while re-checking the sample
    pub sanitized: SanitizeReport,
    pub generated_checksum: Checksum,
    /// Contract bytes after the run; `None` when no contract exists
    pub contract_checksum: Option<Checksum>,
    pub promoted: bool,
    /// Structural changes against the previous contract
    pub changes: Option<CompatibilityResult>,
    /// Unified diff of the previous contract against the generated schema
    pub contract_diff: Option<String>,
    pub types_path: PathBuf,
    /// Discovered routes left unprocessed
    pub skipped_routes: usize,
}

/// A run that ended in `Failed`
#[derive(Debug, Error)]
#[error("{error}")]
pub struct PipelineFailure {
    /// Stage the error occurred in
    pub stage: Stage,
    /// Stages entered before failing, including `stage`
    pub visited: Vec<Stage>,
    #[source]
    pub error: ContractError,
}

// =============================================================================
// Type sinks
// =============================================================================

/// Receives emitted type definitions
pub trait TypesSink {
    /// Store `text` for `id`, returning where it went
    fn write(&self, id: &EndpointId, language: TypeLanguage, text: &str) -> Result<PathBuf, ContractError>;
}

/// Writes `<dir>/<name>-types.<ext>`
pub struct DirTypesSink {
    dir: PathBuf,
}

impl DirTypesSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl TypesSink for DirTypesSink {
    fn write(&self, id: &EndpointId, language: TypeLanguage, text: &str) -> Result<PathBuf, ContractError> {
        let path = self.dir.join(id.types_file(language.extension()));
        write_atomic(&path, text.as_bytes())?;
        info!(path = %path.display(), %language, "types written");
        Ok(path)
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Sequences fetch, check, inference, promotion and emission for one endpoint
pub struct Pipeline<'a> {
    store: &'a ContractStore,
    source: &'a dyn SampleSource,
    sink: &'a dyn TypesSink,
    overrides: &'a [RequiredOverride],
}

/// Tracks visited stages and stamps failures with the current one
struct Progress {
    visited: Vec<Stage>,
}

impl Progress {
    fn enter(&mut self, stage: Stage) {
        debug!(%stage, "entering stage");
        self.visited.push(stage);
    }

    fn current(&self) -> Stage {
        self.visited.last().copied().unwrap_or(Stage::Fetching)
    }

    fn fail(&self, error: impl Into<ContractError>) -> PipelineFailure {
        PipelineFailure {
            stage: self.current(),
            visited: self.visited.clone(),
            error: error.into(),
        }
    }
}

impl<'a> Pipeline<'a> {
    pub fn new(store: &'a ContractStore, source: &'a dyn SampleSource, sink: &'a dyn TypesSink) -> Self {
        Self {
            store,
            source,
            sink,
            overrides: &[],
        }
    }

    pub fn with_overrides(mut self, overrides: &'a [RequiredOverride]) -> Self {
        self.overrides = overrides;
        self
    }

    /// Discover routes, keep the first, and run it
    pub fn run_discovered(
        &self,
        discovery: &dyn RouteDiscovery,
        name: Option<&str>,
        options: &RunOptions,
    ) -> Result<RunReport, PipelineFailure> {
        let progress = Progress {
            visited: vec![Stage::Fetching],
        };
        let routes = discovery.discover().map_err(|e| progress.fail(e))?;
        let (route, skipped) = select_route(routes).map_err(|e| progress.fail(e))?;
        if skipped > 0 {
            info!(route = %route, skipped, "multiple routes found, processing the first only");
        }
        let endpoint = Endpoint::identify(route.clone(), name).ok_or_else(|| {
            progress.fail(ContractError::Discovery(format!(
                "cannot derive an endpoint name from route {}",
                route
            )))
        })?;
        let mut report = self.run(&endpoint, options)?;
        report.skipped_routes = skipped;
        Ok(report)
    }

    /// Run every stage for `endpoint`
    pub fn run(&self, endpoint: &Endpoint, options: &RunOptions) -> Result<RunReport, PipelineFailure> {
        let id = &endpoint.id;
        let type_name = endpoint.type_name();
        let mut progress = Progress { visited: Vec::new() };

        // ---------------------------------------------------------------------
        progress.enter(Stage::Fetching);
        info!(endpoint = %id, source = %self.source.describe(), route = %endpoint.route, "fetching sample");
        let sample = self
            .source
            .fetch(&endpoint.route)
            .map_err(|e| progress.fail(e))?;

        // ---------------------------------------------------------------------
        progress.enter(Stage::ContractCheck);
        let previous = self
            .store
            .load(id, Artifact::Contract)
            .map_err(|e| progress.fail(e))?;
        let contract_check = match &previous {
            None => {
                info!(endpoint = %id, "no contract schema found, skipping contract check");
                ContractCheck::Skipped
            }
            Some(contract) => {
                let validator = ContractValidator::strict(contract).map_err(|e| progress.fail(e))?;
                let result = validator.check(&sample);
                if result.is_valid() {
                    info!(endpoint = %id, "response matches the accepted contract");
                    ContractCheck::Passed
                } else if options.accept {
                    warn!(
                        endpoint = %id,
                        violations = result.violations.len(),
                        "contract violated, continuing because accept mode is on"
                    );
                    for v in &result.violations {
                        warn!("• {}", v);
                    }
                    ContractCheck::Overridden(result.violations)
                } else {
                    return Err(progress.fail(ContractError::BreakingChange {
                        endpoint: id.to_string(),
                        violations: result.violations,
                    }));
                }
            }
        };

        // ---------------------------------------------------------------------
        progress.enter(Stage::Inferring);
        let mut schema = infer(&type_name, &sample);
        let overrides_applied = normalize(schema.content_mut(), id.as_str(), self.overrides);
        debug!(endpoint = %id, overrides_applied, "schema normalized");
        self.store
            .save_sample(id, &sample)
            .map_err(|e| progress.fail(e))?;
        let generated_checksum = self.store.save(id, &schema).map_err(|e| progress.fail(e))?;

        // ---------------------------------------------------------------------
        progress.enter(Stage::GeneratedValidation);
        let validator = ContractValidator::sanitizing(&schema).map_err(|e| progress.fail(e))?;
        let result = validator.check(&sample);
        if !result.is_valid() {
            return Err(progress.fail(ContractError::InternalSchemaInconsistency {
                endpoint: id.to_string(),
                violations: result.violations,
            }));
        }
        let sanitized = result.sanitized.unwrap_or_default();

        // ---------------------------------------------------------------------
        progress.enter(Stage::AcceptDecision);
        let changes = previous.as_ref().map(|old| diff::compare(old, &schema));
        let contract_diff = self.contract_diff(id).map_err(|e| progress.fail(e))?;
        let promoted = if options.accept {
            if let Some(changes) = &changes {
                info!(endpoint = %id, summary = %changes.summary, "contract changes");
                for change in &changes.changes {
                    info!("  {} {}: {}", if change.is_breaking { "!" } else { "+" }, change.path, change.description);
                }
            }
            self.store.promote(id).map_err(|e| progress.fail(e))?;
            true
        } else {
            if previous.is_none() {
                info!(endpoint = %id, "no contract recorded; run with --accept to adopt the generated schema");
            } else {
                info!(endpoint = %id, "contract left unchanged; run with --accept to promote the generated schema");
            }
            false
        };
        let contract_checksum = self
            .store
            .checksum(id, Artifact::Contract)
            .map_err(|e| progress.fail(e))?;

        // ---------------------------------------------------------------------
        progress.enter(Stage::Emitting);
        let text = codegen::emit(&schema, &type_name, options.language).map_err(|e| progress.fail(e))?;
        let types_path = self
            .sink
            .write(id, options.language, &text)
            .map_err(|e| progress.fail(e))?;

        progress.enter(Stage::Done);
        info!(endpoint = %id, checksum = generated_checksum.short(), promoted, "contract run complete");

        Ok(RunReport {
            endpoint: id.clone(),
            route: endpoint.route.clone(),
            stages: progress.visited,
            contract_check,
            overrides_applied,
            sanitized,
            generated_checksum,
            contract_checksum,
            promoted,
            changes,
            contract_diff,
            types_path,
            skipped_routes: 0,
        })
    }

    /// Text diff of the current contract against the generated artifact
    fn contract_diff(&self, id: &EndpointId) -> Result<Option<String>, ContractError> {
        let Some(contract) = self.store.read_bytes(id, Artifact::Contract)? else {
            return Ok(None);
        };
        let Some(generated) = self.store.read_bytes(id, Artifact::Generated)? else {
            return Ok(None);
        };
        if contract == generated {
            return Ok(None);
        }
        Ok(Some(diff::unified_diff(
            &String::from_utf8_lossy(&contract),
            &String::from_utf8_lossy(&generated),
            &id.contract_file(),
            &id.generated_file(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::StaticRoutes;
    use crate::error::FetchError;
    use serde_json::{json, Value};
    use std::cell::RefCell;
    use tempfile::tempdir;

    struct FixedSource(Value);

    impl SampleSource for FixedSource {
        fn describe(&self) -> String {
            "fixture".to_string()
        }

        fn fetch(&self, _route: &RouteDescriptor) -> Result<Value, FetchError> {
            Ok(self.0.clone())
        }
    }

    struct FailingSource;

    impl SampleSource for FailingSource {
        fn describe(&self) -> String {
            "down".to_string()
        }

        fn fetch(&self, route: &RouteDescriptor) -> Result<Value, FetchError> {
            Err(FetchError::HttpStatus {
                url: route.path(),
                status: 503,
            })
        }
    }

    #[derive(Default)]
    struct MemorySink(RefCell<Vec<(String, String)>>);

    impl TypesSink for MemorySink {
        fn write(&self, id: &EndpointId, language: TypeLanguage, text: &str) -> Result<PathBuf, ContractError> {
            let name = id.types_file(language.extension());
            self.0.borrow_mut().push((name.clone(), text.to_string()));
            Ok(PathBuf::from(name))
        }
    }

    fn endpoint() -> Endpoint {
        Endpoint::identify(RouteDescriptor::new("shop/v1", "products"), None).unwrap()
    }

    #[test]
    fn test_first_run_visits_every_stage() {
        let dir = tempdir().unwrap();
        let store = ContractStore::open(dir.path().join("s"), dir.path().join("j")).unwrap();
        let source = FixedSource(json!({"id": 1}));
        let sink = MemorySink::default();
        let report = Pipeline::new(&store, &source, &sink)
            .run(&endpoint(), &RunOptions::default())
            .unwrap();

        assert_eq!(
            report.stages,
            vec![
                Stage::Fetching,
                Stage::ContractCheck,
                Stage::Inferring,
                Stage::GeneratedValidation,
                Stage::AcceptDecision,
                Stage::Emitting,
                Stage::Done
            ]
        );
        assert_eq!(report.contract_check, ContractCheck::Skipped);
        assert!(!report.promoted);
        assert!(report.contract_checksum.is_none());
        assert_eq!(sink.0.borrow()[0].0, "products-types.d.ts");
    }

    #[test]
    fn test_fetch_failure_stops_at_fetching() {
        let dir = tempdir().unwrap();
        let store = ContractStore::open(dir.path().join("s"), dir.path().join("j")).unwrap();
        let sink = MemorySink::default();
        let failure = Pipeline::new(&store, &FailingSource, &sink)
            .run(&endpoint(), &RunOptions::default())
            .unwrap_err();
        assert_eq!(failure.stage, Stage::Fetching);
        assert!(matches!(failure.error, ContractError::Fetch(FetchError::HttpStatus { status: 503, .. })));
        assert!(store.load(&endpoint().id, Artifact::Generated).unwrap().is_none());
        assert!(sink.0.borrow().is_empty());
    }

    #[test]
    fn test_run_discovered_reports_skipped_routes() {
        let dir = tempdir().unwrap();
        let store = ContractStore::open(dir.path().join("s"), dir.path().join("j")).unwrap();
        let source = FixedSource(json!([1, 2]));
        let sink = MemorySink::default();
        let routes = StaticRoutes(vec![
            RouteDescriptor::new("shop/v1", "orders"),
            RouteDescriptor::new("shop/v1", "products"),
        ]);
        let report = Pipeline::new(&store, &source, &sink)
            .run_discovered(&routes, None, &RunOptions::default())
            .unwrap();
        assert_eq!(report.endpoint.as_str(), "orders");
        assert_eq!(report.skipped_routes, 1);
    }

    #[test]
    fn test_discovery_failure_is_reported_at_fetching() {
        let dir = tempdir().unwrap();
        let store = ContractStore::open(dir.path().join("s"), dir.path().join("j")).unwrap();
        let sink = MemorySink::default();
        let failure = Pipeline::new(&store, &FixedSource(json!({})), &sink)
            .run_discovered(&StaticRoutes(vec![]), None, &RunOptions::default())
            .unwrap_err();
        assert_eq!(failure.stage, Stage::Fetching);
        assert!(matches!(failure.error, ContractError::Discovery(_)));
    }

    #[test]
    fn test_dir_sink_writes_types_file() {
        let dir = tempdir().unwrap();
        let sink = DirTypesSink::new(dir.path().join("types"));
        let id = EndpointId::new("products").unwrap();
        let path = sink.write(&id, TypeLanguage::Rust, "pub type Products = i64;\n").unwrap();
        assert!(path.ends_with("products-types.rs"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "pub type Products = i64;\n");
    }
}
