//! Endpoint identity and route descriptors
//!
//! An endpoint is keyed by a slug derived from its route. The slug namespaces
//! every on-disk artifact and yields the emitted root type name.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::codegen::names::to_pascal_case;

/// A REST route as declared by the host application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDescriptor {
    /// Route namespace (e.g. `products-filter/v1`)
    pub namespace: String,
    /// Route path within the namespace (e.g. `products`)
    pub route: String,
    /// File the route was discovered in, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
}

impl RouteDescriptor {
    pub fn new(namespace: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            route: route.into(),
            source: None,
        }
    }

    /// Parse `namespace/version/route` style strings. The last segment is the
    /// route; everything before it is the namespace.
    pub fn parse(path: &str) -> Option<Self> {
        let trimmed = path.trim().trim_matches('/');
        let (namespace, route) = trimmed.rsplit_once('/')?;
        if namespace.is_empty() || route.is_empty() {
            return None;
        }
        Some(Self::new(namespace, route))
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Full REST path `namespace/route`
    pub fn path(&self) -> String {
        format!(
            "{}/{}",
            self.namespace.trim_matches('/'),
            self.route.trim_matches('/')
        )
    }
}

impl fmt::Display for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Stable artifact key for one endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointId(String);

impl EndpointId {
    /// Build from an explicit name, slugified
    pub fn new(name: &str) -> Option<Self> {
        let slug = slugify(name);
        if slug.is_empty() {
            None
        } else {
            Some(Self(slug))
        }
    }

    /// Derive from the route part of a descriptor. Path parameters such as
    /// `(?P<id>\d+)` or `{id}` are dropped; falls back to the namespace when
    /// nothing usable remains.
    pub fn from_route(route: &RouteDescriptor) -> Option<Self> {
        let cleaned: Vec<&str> = route
            .route
            .split('/')
            .filter(|seg| !seg.is_empty() && !is_path_parameter(seg))
            .collect();
        Self::new(&cleaned.join("-")).or_else(|| Self::new(&route.namespace))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Root type name used for the schema title and emitted types
    pub fn type_name(&self) -> String {
        to_pascal_case(&self.0)
    }

    pub fn sample_file(&self) -> String {
        format!("{}-sample.json", self.0)
    }

    pub fn contract_file(&self) -> String {
        format!("{}-contract.schema.json", self.0)
    }

    pub fn generated_file(&self) -> String {
        format!("{}-generated.schema.json", self.0)
    }

    pub fn types_file(&self, extension: &str) -> String {
        format!("{}-types.{}", self.0, extension)
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A route together with its derived identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub id: EndpointId,
    pub route: RouteDescriptor,
}

impl Endpoint {
    /// Identify a route, optionally overriding the derived name
    pub fn identify(route: RouteDescriptor, name: Option<&str>) -> Option<Self> {
        let id = match name {
            Some(n) => EndpointId::new(n)?,
            None => EndpointId::from_route(&route)?,
        };
        Some(Self { id, route })
    }

    pub fn type_name(&self) -> String {
        self.id.type_name()
    }
}

fn is_path_parameter(segment: &str) -> bool {
    segment.starts_with('(') || segment.starts_with('{') || segment.starts_with(':')
}

fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
