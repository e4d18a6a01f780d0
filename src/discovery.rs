//! Route discovery
//!
//! Finds the REST routes a project registers. The scanner reads the top level
//! of the API folder and extracts `register_rest_route('<ns>', '<route>'`
//! calls; configured routes bypass scanning.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;
use walkdir::WalkDir;

use crate::endpoint::RouteDescriptor;
use crate::error::{ContractError, Result};

const MARKER: &str = "register_rest_route";
const ROUTE_PATTERN: &str = r#"register_rest_route\(\s*['"]([^'"]+)['"]\s*,\s*['"]([^'"]+)['"]"#;

/// Source of candidate routes
pub trait RouteDiscovery {
    /// Every route found, in a stable order. Finding none is an error.
    fn discover(&self) -> Result<Vec<RouteDescriptor>>;
}

/// Scans source files for route registrations
pub struct RestRouteScanner {
    api_dir: PathBuf,
    pattern: Regex,
}

impl RestRouteScanner {
    pub fn new(api_dir: impl Into<PathBuf>) -> Result<Self> {
        let pattern = Regex::new(ROUTE_PATTERN).map_err(|e| ContractError::Discovery(e.to_string()))?;
        Ok(Self {
            api_dir: api_dir.into(),
            pattern,
        })
    }

    pub fn api_dir(&self) -> &Path {
        &self.api_dir
    }

    /// Routes declared in one file's text
    pub fn extract(&self, text: &str) -> Vec<(String, String)> {
        self.pattern
            .captures_iter(text)
            .map(|c| (c[1].to_string(), c[2].to_string()))
            .collect()
    }

    fn candidate_files(&self) -> Result<Vec<PathBuf>> {
        if !self.api_dir.is_dir() {
            return Err(ContractError::Discovery(format!(
                "API folder not found: {}",
                self.api_dir.display()
            )));
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.api_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| ContractError::Discovery(e.to_string()))?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        if files.is_empty() {
            return Err(ContractError::Discovery(format!(
                "API folder is empty: {}",
                self.api_dir.display()
            )));
        }
        Ok(files)
    }
}

impl RouteDiscovery for RestRouteScanner {
    fn discover(&self) -> Result<Vec<RouteDescriptor>> {
        let mut routes = Vec::new();
        for path in self.candidate_files()? {
            // binary or unreadable files cannot register routes
            let Ok(text) = fs::read_to_string(&path) else {
                debug!(file = %path.display(), "skipping unreadable file");
                continue;
            };
            if !text.contains(MARKER) {
                continue;
            }
            for (namespace, route) in self.extract(&text) {
                debug!(file = %path.display(), %namespace, %route, "route found");
                routes.push(RouteDescriptor::new(namespace, route).with_source(&path));
            }
        }
        if routes.is_empty() {
            return Err(ContractError::Discovery(format!(
                "no {} calls found in {}",
                MARKER,
                self.api_dir.display()
            )));
        }
        Ok(routes)
    }
}

/// Fixed list of routes, typically from configuration
pub struct StaticRoutes(pub Vec<RouteDescriptor>);

impl RouteDiscovery for StaticRoutes {
    fn discover(&self) -> Result<Vec<RouteDescriptor>> {
        if self.0.is_empty() {
            return Err(ContractError::Discovery("no routes configured".to_string()));
        }
        Ok(self.0.clone())
    }
}

/// First route and how many were left out
pub fn select_route(mut routes: Vec<RouteDescriptor>) -> Result<(RouteDescriptor, usize)> {
    if routes.is_empty() {
        return Err(ContractError::Discovery("no routes to choose from".to_string()));
    }
    let skipped = routes.len() - 1;
    Ok((routes.swap_remove(0), skipped))
}
