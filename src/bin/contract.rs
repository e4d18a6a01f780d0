//! Schema Contract CLI
//!
//! Samples one endpoint, enforces its accepted contract, regenerates the
//! schema and emits types. Exits non-zero when the run fails.

use std::path::PathBuf;
use std::time::Duration;

use clap::builder::FalseyValueParser;
use clap::Parser;
use schema_contracts::codegen::TypeLanguage;
use schema_contracts::discovery::{RestRouteScanner, RouteDiscovery, StaticRoutes};
use schema_contracts::fetch::{FileSampleSource, HttpSampleSource, SampleSource};
use schema_contracts::pipeline::DirTypesSink;
use schema_contracts::site::{resolve_base_url, WpCli};
use schema_contracts::store::Artifact;
use schema_contracts::{ContractCheck, ContractConfig, ContractStore, Pipeline, RouteDescriptor, RunOptions};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-contract")]
#[command(about = "Check an endpoint against its accepted contract and regenerate its types")]
struct Cli {
    /// Promote the generated schema to contract, even if the contract is violated
    #[arg(long, env = "SCHEMA_CONTRACT_ACCEPT", value_parser = FalseyValueParser::new())]
    accept: bool,

    /// Config file to load (optional)
    #[arg(short, long)]
    config: Option<String>,

    /// Read the sample from a file ("-" for stdin) instead of the endpoint
    #[arg(short, long)]
    sample: Option<PathBuf>,

    /// Route as namespace/route; skips discovery
    #[arg(short, long)]
    route: Option<String>,

    /// Artifact name; derived from the route when omitted
    #[arg(short, long)]
    name: Option<String>,

    /// Type language: typescript or rust
    #[arg(short, long, value_parser = parse_language)]
    lang: Option<TypeLanguage>,

    /// Project root (default: current directory)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Print a unified diff of the contract against the generated schema
    #[arg(long)]
    show_diff: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_language(s: &str) -> Result<TypeLanguage, String> {
    TypeLanguage::parse(s).ok_or_else(|| format!("unknown language '{}' (expected typescript or rust)", s))
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let root = match &cli.root {
        Some(r) => r.clone(),
        None => std::env::current_dir()?,
    };
    let cfg = ContractConfig::load_in(&root, cli.config.as_deref())?;
    let paths = cfg.resolve_paths(&root);

    let options = RunOptions {
        accept: cli.accept || cfg.contract.accept,
        language: cli.lang.unwrap_or(cfg.codegen.language),
    };
    let name = cli.name.as_deref().or(cfg.endpoint.name.as_deref());

    // Route selection
    let route = match cli.route.as_deref() {
        Some(r) => Some(RouteDescriptor::parse(r).ok_or_else(|| format!("invalid route '{}', expected namespace/route", r))?),
        None => cfg.route(),
    };
    let discovery: Box<dyn RouteDiscovery> = match (route, &cli.sample, name) {
        (Some(route), _, _) => Box::new(StaticRoutes(vec![route])),
        // a saved sample only needs a name
        (None, Some(_), Some(name)) => Box::new(StaticRoutes(vec![RouteDescriptor::new("local", name)])),
        (None, _, _) => Box::new(RestRouteScanner::new(&paths.api_dir)?),
    };

    // Sample source
    let source: Box<dyn SampleSource> = match &cli.sample {
        Some(path) => Box::new(FileSampleSource::new(path)),
        None => {
            let base_url = resolve_base_url(&cfg.fetch, &root, &WpCli::default())?;
            Box::new(HttpSampleSource::new(
                base_url,
                cfg.fetch.rest_prefix.clone(),
                Duration::from_secs(cfg.fetch.timeout_secs),
            ))
        }
    };

    let store = ContractStore::open(&paths.schema_dir, &paths.json_dir)?;
    let sink = DirTypesSink::new(&paths.types_dir);
    let pipeline = Pipeline::new(&store, source.as_ref(), &sink).with_overrides(&cfg.overrides);

    println!("🔍 Checking {} ({})", source.describe(), if options.accept { "accept mode" } else { "strict" });

    let report = match pipeline.run_discovered(discovery.as_ref(), name, &options) {
        Ok(report) => report,
        Err(failure) => {
            eprintln!("❌ Failed during {}", failure.stage);
            eprintln!("{}", failure.error);
            std::process::exit(1);
        }
    };

    match &report.contract_check {
        ContractCheck::Skipped => println!("⏭️  No contract yet for {}, check skipped", report.endpoint),
        ContractCheck::Passed => println!("✅ Response matches the accepted contract"),
        ContractCheck::Overridden(violations) => {
            println!("⚠️  Contract violated ({} issues), accepted anyway", violations.len());
        }
    }
    if report.skipped_routes > 0 {
        println!("   ({} more routes found, only {} was processed)", report.skipped_routes, report.route);
    }
    println!(
        "📝 Generated schema: {} ({})",
        store.path(&report.endpoint, Artifact::Generated).display(),
        report.generated_checksum.short()
    );
    if report.overrides_applied > 0 {
        println!("   {} forced-required override(s) applied", report.overrides_applied);
    }

    if cli.show_diff {
        match &report.contract_diff {
            Some(diff) => print!("{}", diff),
            None => println!("   Contract and generated schema are identical"),
        }
    }

    if report.promoted {
        println!("🔒 Contract updated from generated schema");
        if let Some(changes) = &report.changes {
            println!("   {}", changes.summary);
        }
    } else if report.contract_checksum.is_some() {
        println!("   Contract unchanged (use --accept to promote)");
    } else {
        println!("   No contract recorded (use --accept to adopt the generated schema)");
    }
    println!("📦 Types written: {}", report.types_path.display());

    Ok(())
}
