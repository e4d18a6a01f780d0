//! End-to-end workflow scenarios
//!
//! Runs the pipeline against fixture payloads with a real on-disk store.

use std::path::Path;

use serde_json::{json, Value};
use tempfile::TempDir;

use schema_contracts::fetch::SampleSource;
use schema_contracts::normalize::RequiredOverride;
use schema_contracts::pipeline::DirTypesSink;
use schema_contracts::{
    Artifact, ContractCheck, ContractError, ContractStore, Endpoint, FetchError, Pipeline, RouteDescriptor,
    RunOptions, Stage, TypeLanguage, Violation,
};

struct FixtureSource(Value);

impl SampleSource for FixtureSource {
    fn describe(&self) -> String {
        "fixture".to_string()
    }

    fn fetch(&self, _route: &RouteDescriptor) -> Result<Value, FetchError> {
        Ok(self.0.clone())
    }
}

fn fixture(name: &str) -> Value {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name);
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

struct Project {
    dir: TempDir,
    store: ContractStore,
    sink: DirTypesSink,
}

impl Project {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let store = ContractStore::open(dir.path().join("schemas"), dir.path().join("json")).unwrap();
        let sink = DirTypesSink::new(dir.path().join("types"));
        Self { dir, store, sink }
    }

    fn run(
        &self,
        sample: Value,
        accept: bool,
        overrides: &[RequiredOverride],
    ) -> Result<schema_contracts::RunReport, schema_contracts::PipelineFailure> {
        let source = FixtureSource(sample);
        let options = RunOptions {
            accept,
            language: TypeLanguage::TypeScript,
        };
        Pipeline::new(&self.store, &source, &self.sink)
            .with_overrides(overrides)
            .run(&products(), &options)
    }

    fn bytes(&self, artifact: Artifact) -> Option<Vec<u8>> {
        self.store.read_bytes(&products().id, artifact).unwrap()
    }

    fn schema(&self, artifact: Artifact) -> Value {
        self.store
            .load(&products().id, artifact)
            .unwrap()
            .unwrap()
            .into_content()
    }
}

fn products() -> Endpoint {
    Endpoint::identify(RouteDescriptor::new("products-filter/v1", "products"), None).unwrap()
}

// =============================================================================
// Scenario A: first run
// =============================================================================

#[test]
fn test_first_run_skips_check_and_tightens() {
    let project = Project::new();
    let report = project.run(fixture("products.json"), false, &[]).unwrap();

    assert_eq!(report.contract_check, ContractCheck::Skipped);
    assert_eq!(report.stages.last(), Some(&Stage::Done));
    assert!(!report.promoted);

    let generated = project.schema(Artifact::Generated);
    assert_eq!(generated["required"], json!(["id", "title"]));
    assert_eq!(generated["title"], "Products");
    assert!(project.bytes(Artifact::Contract).is_none());

    let types = std::fs::read_to_string(&report.types_path).unwrap();
    assert!(report.types_path.ends_with("types/products-types.d.ts"));
    assert!(types.starts_with("export interface Products {\n"));
    assert!(project.dir.path().join("json/products-sample.json").is_file());
}

// =============================================================================
// Scenario B: breaking change without accept
// =============================================================================

#[test]
fn test_missing_required_field_fails_and_keeps_contract() {
    let project = Project::new();
    project.run(fixture("products-with-slug.json"), true, &[]).unwrap();
    let contract_before = project.bytes(Artifact::Contract).unwrap();

    let failure = project.run(fixture("products.json"), false, &[]).unwrap_err();

    assert_eq!(failure.stage, Stage::ContractCheck);
    assert!(matches!(failure.error, ContractError::BreakingChange { .. }));
    assert_eq!(failure.error.violations(), &[Violation::new("/slug", "is required")]);
    let message = failure.error.to_string();
    assert!(message.contains("BREAKING"));
    assert!(message.contains("• path: /slug  message: is required"));

    assert_eq!(project.bytes(Artifact::Contract).unwrap(), contract_before);
}

// =============================================================================
// Scenario C: breaking change with accept
// =============================================================================

#[test]
fn test_accept_mode_promotes_new_schema() {
    let project = Project::new();
    project.run(fixture("products-with-slug.json"), true, &[]).unwrap();

    let report = project.run(fixture("products.json"), true, &[]).unwrap();

    assert_eq!(
        report.contract_check,
        ContractCheck::Overridden(vec![Violation::new("/slug", "is required")])
    );
    assert!(report.promoted);
    assert_eq!(project.bytes(Artifact::Contract), project.bytes(Artifact::Generated));
    assert_eq!(project.schema(Artifact::Contract)["required"], json!(["id", "title"]));

    let changes = report.changes.unwrap();
    assert!(!changes.is_compatible);
    assert_eq!(changes.changes[0].path, "properties.slug");
    assert!(report.contract_diff.unwrap().contains("-    \"slug\""));
}

// =============================================================================
// Scenario D: forced-required override
// =============================================================================

fn pages_override() -> RequiredOverride {
    RequiredOverride {
        endpoint: None,
        path: "properties.pages.items".to_string(),
        required: ["id", "title", "url", "img", "slug"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    }
}

#[test]
fn test_override_forces_item_fields() {
    let project = Project::new();
    let report = project.run(fixture("pages.json"), false, &[pages_override()]).unwrap();
    assert_eq!(report.overrides_applied, 1);

    let generated = project.schema(Artifact::Generated);
    let item = &generated["properties"]["pages"]["properties"]["items"]["items"];
    let required: Vec<&str> = item["required"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    for name in ["id", "title", "url", "img", "slug"] {
        assert!(required.contains(&name), "missing {}", name);
    }
}

#[test]
fn test_override_naming_absent_field_is_internal_inconsistency() {
    let project = Project::new();
    let mut sample = fixture("pages.json");
    for item in sample["pages"]["items"].as_array_mut().unwrap() {
        item.as_object_mut().unwrap().remove("img");
    }

    let failure = project.run(sample, true, &[pages_override()]).unwrap_err();

    assert_eq!(failure.stage, Stage::GeneratedValidation);
    assert!(matches!(failure.error, ContractError::InternalSchemaInconsistency { .. }));
    assert_eq!(failure.error.violations().len(), 2);
    // generated snapshot is still written, contract never is
    let generated = project.schema(Artifact::Generated);
    let item = &generated["properties"]["pages"]["properties"]["items"]["items"];
    assert!(item["required"].as_array().unwrap().contains(&json!("img")));
    assert!(project.bytes(Artifact::Contract).is_none());
}

#[test]
fn test_override_for_other_endpoint_is_ignored() {
    let project = Project::new();
    let mut scoped = pages_override();
    scoped.endpoint = Some("orders".to_string());
    let report = project.run(fixture("pages.json"), false, &[scoped]).unwrap();
    assert_eq!(report.overrides_applied, 0);
}

// =============================================================================
// Contract stability and promotion
// =============================================================================

#[test]
fn test_contract_bytes_stable_without_accept() {
    let project = Project::new();
    project.run(fixture("catalog.json"), true, &[]).unwrap();
    let contract = project.bytes(Artifact::Contract).unwrap();

    for _ in 0..3 {
        let report = project.run(fixture("catalog.json"), false, &[]).unwrap();
        assert_eq!(report.contract_check, ContractCheck::Passed);
        assert!(report.contract_diff.is_none());
        assert!(report.contract_checksum.as_ref().unwrap().verify(&contract));
    }
    assert_eq!(project.bytes(Artifact::Contract).unwrap(), contract);
}

#[test]
fn test_new_field_rejected_by_strict_contract() {
    let project = Project::new();
    project.run(fixture("products.json"), true, &[]).unwrap();
    let contract = project.bytes(Artifact::Contract).unwrap();

    // extra field: strict check rejects it as not allowed
    let failure = project.run(fixture("products-with-slug.json"), false, &[]).unwrap_err();
    assert_eq!(failure.error.violations(), &[Violation::new("/slug", "is not allowed")]);
    assert_eq!(project.bytes(Artifact::Contract).unwrap(), contract);
}

#[test]
fn test_rust_types_emitted() {
    let project = Project::new();
    let source = FixtureSource(fixture("catalog.json"));
    let options = RunOptions {
        accept: false,
        language: TypeLanguage::Rust,
    };
    let report = Pipeline::new(&project.store, &source, &project.sink)
        .run(&products(), &options)
        .unwrap();
    assert!(report.types_path.ends_with("products-types.rs"));
    let text = std::fs::read_to_string(&report.types_path).unwrap();
    assert!(text.contains("pub struct Products {"));
    assert!(text.contains("#[serde(rename = \"og-image\")]"));
}
