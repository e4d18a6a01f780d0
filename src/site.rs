//! Site URL resolution
//!
//! The base URL comes from configuration when set. Otherwise the WordPress
//! root is located from the working directory and wp-cli is asked for the
//! `siteurl` option.

use std::path::{Component, Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use crate::config::FetchConfig;
use crate::error::{ContractError, Result};

/// Walk up from `start` to the directory holding `wp-load.php`.
///
/// Falls back to `start` itself when it contains `wp-content`, then to the
/// `.../app/public` prefix of `start` (LocalWP layout).
pub fn find_wp_root(start: &Path) -> Option<PathBuf> {
    for dir in start.ancestors() {
        if dir.join("wp-load.php").is_file() {
            return Some(dir.to_path_buf());
        }
    }
    if start.join("wp-content").is_dir() {
        return Some(start.to_path_buf());
    }
    local_wp_public(start)
}

fn local_wp_public(start: &Path) -> Option<PathBuf> {
    let components: Vec<Component<'_>> = start.components().collect();
    let app = components
        .iter()
        .rposition(|c| c.as_os_str() == "app")?;
    if app == 0 || components.get(app + 1).map(|c| c.as_os_str() == "public") != Some(true) {
        return None;
    }
    Some(components[..app + 2].iter().collect())
}

/// Thin wrapper over the `wp` executable
pub struct WpCli {
    program: String,
}

impl Default for WpCli {
    fn default() -> Self {
        Self {
            program: "wp".to_string(),
        }
    }
}

impl WpCli {
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// `wp option get siteurl` for the install at `wp_root`
    pub fn site_url(&self, wp_root: &Path) -> Result<String> {
        let output = Command::new(&self.program)
            .arg("option")
            .arg("get")
            .arg("siteurl")
            .arg(format!("--path={}", wp_root.display()))
            .arg("--skip-plugins")
            .arg("--skip-themes")
            .output()
            .map_err(|e| {
                ContractError::SiteUrl(format!("could not run {} for --path={}: {}", self.program, wp_root.display(), e))
            })?;

        if !output.status.success() {
            return Err(ContractError::SiteUrl(format!(
                "WP-CLI failed for --path={}\n{}",
                wp_root.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if url.is_empty() {
            return Err(ContractError::SiteUrl("empty siteurl from WP-CLI".to_string()));
        }
        Ok(url)
    }
}

/// Configured base URL, or the one wp-cli reports for the enclosing install
pub fn resolve_base_url(fetch: &FetchConfig, start: &Path, cli: &WpCli) -> Result<String> {
    if let Some(url) = &fetch.base_url {
        debug!(%url, "using configured base URL");
        return Ok(url.clone());
    }
    if !fetch.use_wp_cli {
        return Err(ContractError::SiteUrl(
            "fetch.base_url is not set and wp-cli lookup is disabled".to_string(),
        ));
    }
    let root = find_wp_root(start).ok_or_else(|| {
        ContractError::SiteUrl(format!(
            "could not locate WordPress root from {}; set fetch.base_url",
            start.display()
        ))
    })?;
    let url = cli.site_url(&root)?;
    info!(%url, wp_root = %root.display(), "site URL from WP-CLI");
    Ok(url)
}
