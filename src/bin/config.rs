//! Contract Config CLI
//!
//! View and manage contract engine configuration.

use clap::{Parser, Subcommand};
use schema_contracts::ContractConfig;

#[derive(Parser)]
#[command(name = "schema-config")]
#[command(about = "View and manage contract engine configuration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show current configuration
    Show {
        /// Config file to load (optional)
        #[arg(short, long)]
        config: Option<String>,

        /// Output as TOML
        #[arg(long)]
        toml: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Initialize a new config file
    Init {
        /// Output path
        #[arg(short, long, default_value = "contract.toml")]
        output: String,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate configuration
    Validate {
        /// Config file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Show { config, toml, json } => {
            let cfg = ContractConfig::load_from(config.as_deref())?;

            if json {
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            } else if toml {
                println!("{}", ::toml::to_string_pretty(&cfg)?);
            } else {
                println!("📋 Contract Configuration\n");
                println!("Paths:");
                println!("  API: {}", cfg.paths.api_dir.display());
                println!("  Samples: {}", cfg.paths.json_dir.display());
                println!("  Schemas: {}", cfg.paths.schema_dir.display());
                println!("  Types: {}", cfg.paths.types_dir.display());

                println!("\nFetch:");
                println!(
                    "  Base URL: {}",
                    cfg.fetch.base_url.as_deref().unwrap_or("(from wp-cli)")
                );
                println!("  REST prefix: {}", cfg.fetch.rest_prefix);
                println!("  Timeout: {}s", cfg.fetch.timeout_secs);
                println!("  Use wp-cli: {}", cfg.fetch.use_wp_cli);

                println!("\nContract:");
                println!("  Accept: {}", cfg.contract.accept);
                println!("  Language: {}", cfg.codegen.language);

                println!("\nEndpoint:");
                println!(
                    "  Route: {}",
                    cfg.endpoint.route.as_deref().unwrap_or("(discovered)")
                );
                println!(
                    "  Name: {}",
                    cfg.endpoint.name.as_deref().unwrap_or("(from route)")
                );

                if !cfg.overrides.is_empty() {
                    println!("\nOverrides:");
                    for o in &cfg.overrides {
                        println!(
                            "  {} [{}] -> {}",
                            o.endpoint.as_deref().unwrap_or("*"),
                            o.path,
                            o.required.join(", ")
                        );
                    }
                }
            }
        }

        Commands::Init { output, force } => {
            if std::path::Path::new(&output).exists() && !force {
                return Err(format!("{} already exists (use --force to overwrite)", output).into());
            }
            let cfg = ContractConfig::default();
            cfg.save(&output)?;
            println!("✅ Created config file: {}", output);
        }

        Commands::Validate { config } => match ContractConfig::load_from(config.as_deref()) {
            Ok(cfg) => {
                let problems = cfg.problems();
                if !problems.is_empty() {
                    eprintln!("❌ Configuration has {} problem(s):", problems.len());
                    for p in &problems {
                        eprintln!("   • {}", p);
                    }
                    std::process::exit(1);
                }
                println!("✅ Configuration is valid");
                println!("   Schemas: {}", cfg.paths.schema_dir.display());
                println!("   Route: {}", cfg.endpoint.route.as_deref().unwrap_or("(discovered)"));
                println!("   Overrides: {}", cfg.overrides.len());
            }
            Err(e) => {
                eprintln!("❌ Configuration error: {}", e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
