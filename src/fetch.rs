//! Sample retrieval
//!
//! A [`SampleSource`] turns a route into one parsed JSON payload. The HTTP
//! source performs a single bounded GET; the file source reads a saved payload
//! or stdin.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, info};

use crate::endpoint::RouteDescriptor;
use crate::error::FetchError;

/// Where sample payloads come from
pub trait SampleSource {
    /// Human-readable origin, used in logs
    fn describe(&self) -> String;

    fn fetch(&self, route: &RouteDescriptor) -> Result<Value, FetchError>;
}

// =============================================================================
// HTTP
// =============================================================================

/// GETs `<base_url>/<rest_prefix>/<namespace>/<route>`
pub struct HttpSampleSource {
    agent: ureq::Agent,
    base_url: String,
    rest_prefix: String,
    timeout: Duration,
}

impl HttpSampleSource {
    pub fn new(base_url: impl Into<String>, rest_prefix: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.into(),
            rest_prefix: rest_prefix.into(),
            timeout,
        }
    }

    pub fn url_for(&self, route: &RouteDescriptor) -> String {
        let mut url = self.base_url.trim_end_matches('/').to_string();
        let prefix = self.rest_prefix.trim_matches('/');
        if !prefix.is_empty() {
            url.push('/');
            url.push_str(prefix);
        }
        url.push('/');
        url.push_str(&route.path());
        url
    }

    fn transport_error(&self, url: &str, error: ureq::Transport, started: Instant) -> FetchError {
        let timed_out = started.elapsed() >= self.timeout
            || std::error::Error::source(&error)
                .and_then(|s| s.downcast_ref::<io::Error>())
                .map(|e| matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock))
                .unwrap_or(false);
        if timed_out {
            FetchError::Timeout {
                url: url.to_string(),
                after: self.timeout,
            }
        } else {
            FetchError::Network {
                url: url.to_string(),
                message: error.to_string(),
            }
        }
    }
}

impl SampleSource for HttpSampleSource {
    fn describe(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), self.rest_prefix.trim_matches('/'))
    }

    fn fetch(&self, route: &RouteDescriptor) -> Result<Value, FetchError> {
        let url = self.url_for(route);
        info!(%url, timeout_secs = self.timeout.as_secs(), "fetching sample");
        let started = Instant::now();

        let response = match self.agent.get(&url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => return Err(FetchError::HttpStatus { url, status }),
            Err(ureq::Error::Transport(t)) => return Err(self.transport_error(&url, t, started)),
        };

        let body = response.into_string().map_err(|e| {
            if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) {
                FetchError::Timeout {
                    url: url.clone(),
                    after: self.timeout,
                }
            } else {
                FetchError::Io {
                    source_name: url.clone(),
                    source: e,
                }
            }
        })?;
        debug!(bytes = body.len(), elapsed_ms = started.elapsed().as_millis() as u64, "sample received");
        parse_json_lenient(&body, &url)
    }
}

// =============================================================================
// File / stdin
// =============================================================================

/// Reads one payload from a file, or stdin for `-`
pub struct FileSampleSource {
    path: PathBuf,
}

impl FileSampleSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn is_stdin(&self) -> bool {
        self.path.as_os_str() == "-"
    }
}

impl SampleSource for FileSampleSource {
    fn describe(&self) -> String {
        if self.is_stdin() {
            "stdin".to_string()
        } else {
            self.path.display().to_string()
        }
    }

    fn fetch(&self, route: &RouteDescriptor) -> Result<Value, FetchError> {
        let source_name = self.describe();
        info!(source = %source_name, %route, "reading sample");
        let text = if self.is_stdin() {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).map(|_| buf)
        } else {
            fs::read_to_string(&self.path)
        }
        .map_err(|source| FetchError::Io {
            source_name: source_name.clone(),
            source,
        })?;
        parse_json_lenient(&text, &source_name)
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parse JSON; on failure retry once without a BOM and surrounding whitespace
pub fn parse_json_lenient(text: &str, source_name: &str) -> Result<Value, FetchError> {
    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(first) => {
            let cleaned = text.trim_start_matches('\u{feff}').trim();
            serde_json::from_str(cleaned).map_err(|_| FetchError::MalformedJson {
                source_name: source_name.to_string(),
                message: first.to_string(),
            })
        }
    }
}
