//! Configuration management for the contract engine
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (contract.toml)
//! - Environment variables (CONTRACT__SECTION__KEY)
//!
//! ## Example config file (contract.toml):
//! ```toml
//! [paths]
//! api_dir = "api"
//! json_dir = "json"
//! schema_dir = "schemas"
//! types_dir = "src/vue/types"
//!
//! [fetch]
//! base_url = "https://shop.local"
//! rest_prefix = "wp-json"
//! timeout_secs = 15
//!
//! [contract]
//! accept = false
//!
//! [codegen]
//! language = "typescript"
//!
//! [endpoint]
//! route = "products-filter/v1/products"
//!
//! [[overrides]]
//! path = "properties.pages.items"
//! required = ["id", "title", "url", "img", "slug"]
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::codegen::TypeLanguage;
use crate::endpoint::RouteDescriptor;
use crate::normalize::RequiredOverride;

/// Main configuration for the contract engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractConfig {
    /// Project-relative artifact directories
    #[serde(default)]
    pub paths: PathsConfig,

    /// Sample retrieval settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Contract advancement policy
    #[serde(default)]
    pub contract: ContractPolicy,

    /// Type emission settings
    #[serde(default)]
    pub codegen: CodegenSettings,

    /// Explicit endpoint selection
    #[serde(default)]
    pub endpoint: EndpointConfig,

    /// Forced-required fields applied after tightening
    #[serde(default)]
    pub overrides: Vec<RequiredOverride>,
}

/// Directory layout, relative to the project root unless absolute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Folder scanned for route registrations
    #[serde(default = "default_api_dir")]
    pub api_dir: PathBuf,

    /// Folder for raw sample snapshots
    #[serde(default = "default_json_dir")]
    pub json_dir: PathBuf,

    /// Folder for contract and generated schemas
    #[serde(default = "default_schema_dir")]
    pub schema_dir: PathBuf,

    /// Folder for emitted type definitions
    #[serde(default = "default_types_dir")]
    pub types_dir: PathBuf,
}

/// Fetch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Site URL; resolved through wp-cli when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Path segment between the site URL and the route namespace
    #[serde(default = "default_rest_prefix")]
    pub rest_prefix: String,

    /// Upper bound for one request
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Ask wp-cli for the site URL when `base_url` is unset
    #[serde(default = "default_true")]
    pub use_wp_cli: bool,
}

/// Contract policy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractPolicy {
    /// Promote the generated schema even when the contract check fails
    #[serde(default)]
    pub accept: bool,
}

/// Codegen configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodegenSettings {
    #[serde(default)]
    pub language: TypeLanguage,
}

/// Endpoint selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// `namespace/route`; skips route discovery when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,

    /// Artifact name; derived from the route when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Absolute project directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub api_dir: PathBuf,
    pub json_dir: PathBuf,
    pub schema_dir: PathBuf,
    pub types_dir: PathBuf,
}

// Default value functions
fn default_api_dir() -> PathBuf {
    PathBuf::from("api")
}

fn default_json_dir() -> PathBuf {
    PathBuf::from("json")
}

fn default_schema_dir() -> PathBuf {
    PathBuf::from("schemas")
}

fn default_types_dir() -> PathBuf {
    PathBuf::from("src/vue/types")
}

fn default_rest_prefix() -> String {
    "wp-json".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_true() -> bool {
    true
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            api_dir: default_api_dir(),
            json_dir: default_json_dir(),
            schema_dir: default_schema_dir(),
            types_dir: default_types_dir(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            rest_prefix: default_rest_prefix(),
            timeout_secs: default_timeout_secs(),
            use_wp_cli: true,
        }
    }
}

impl ContractConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        Self::load_in(Path::new("."), config_path)
    }

    /// Load configuration with the default locations resolved against `root`
    pub fn load_in(root: &Path, config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = ["contract.toml", ".contract.toml", "config/contract.toml"];

        for location in config_locations {
            builder = builder.add_source(File::from(root.join(location)).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "schema-contracts", "contract") {
            let xdg_config = config_dir.config_dir().join("contract.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from explicit path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (CONTRACT__*)
        builder = builder.add_source(
            Environment::with_prefix("CONTRACT")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Resolve the configured directories against the project root
    pub fn resolve_paths(&self, start: &Path) -> ProjectPaths {
        let resolve = |p: &PathBuf| {
            if p.is_absolute() {
                p.clone()
            } else {
                start.join(p)
            }
        };
        ProjectPaths {
            root: start.to_path_buf(),
            api_dir: resolve(&self.paths.api_dir),
            json_dir: resolve(&self.paths.json_dir),
            schema_dir: resolve(&self.paths.schema_dir),
            types_dir: resolve(&self.paths.types_dir),
        }
    }

    /// Configured route, if any
    pub fn route(&self) -> Option<RouteDescriptor> {
        self.endpoint.route.as_deref().and_then(RouteDescriptor::parse)
    }

    /// Semantic problems serde cannot catch
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.fetch.timeout_secs == 0 {
            problems.push("fetch.timeout_secs must be greater than zero".to_string());
        }
        if let Some(url) = &self.fetch.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                problems.push(format!("fetch.base_url '{}' is not an http(s) URL", url));
            }
        }
        if let Some(route) = &self.endpoint.route {
            if RouteDescriptor::parse(route).is_none() {
                problems.push(format!("endpoint.route '{}' is not of the form namespace/route", route));
            }
        }
        for (i, o) in self.overrides.iter().enumerate() {
            if o.required.is_empty() {
                problems.push(format!("overrides[{}] at '{}' lists no required fields", i, o.path));
            }
        }
        problems
    }
}
