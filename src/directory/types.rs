//! Resource and dissemination service types returned by directory lookups.

use std::fmt;

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};
use thiserror::Error;
use url::{form_urlencoded, Url};

/// Identifier a resource is looked up by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceIdentifier(String);

impl ResourceIdentifier {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build the identifier from the request origin, unless `id` overrides it.
    pub fn from_origin(scheme: &str, host: &str, path: &str, id_override: Option<&str>) -> Self {
        match id_override {
            Some(id) => Self::new(id),
            None => Self(format!("{}://{}{}", scheme, host, path)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors reported by a single directory lookup.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// No resource carries the identifier.
    #[error("resource not found")]
    NotFound,

    /// More than one resource carries the identifier.
    #[error("{0} resources share the identifier")]
    AmbiguousMatch(usize),

    /// The endpoint could not be reached or answered unusably.
    #[error("directory endpoint unavailable: {0}")]
    Transport(String),

    /// Anything else; never retried on another endpoint.
    #[error("unexpected directory failure: {0}")]
    Unexpected(String),
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// A backend able to produce one media-type representation of a resource.
#[derive(Debug, Clone)]
pub struct DisseminationService {
    format: String,
    reverse_proxy: bool,
    template: String,
    headers: HeaderMap,
}

impl DisseminationService {
    pub fn new(format: impl Into<String>, template: impl Into<String>, reverse_proxy: bool) -> Self {
        Self {
            format: format.into(),
            reverse_proxy,
            template: template.into(),
            headers: HeaderMap::new(),
        }
    }

    /// Add a header sent with every request built for this service.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Media type this service produces.
    pub fn format(&self) -> &str {
        &self.format
    }

    /// Whether the gateway must relay the representation instead of redirecting to it.
    pub fn requires_proxy(&self) -> bool {
        self.reverse_proxy
    }

    /// Expand the URI template for a resource.
    ///
    /// Placeholders: `{uri}`, `{uri|enc}`, `{id}`, `{id|enc}`.
    pub fn target_uri(&self, resource: &ResolvableResource) -> DirectoryResult<Url> {
        let expanded = expand(&self.template, resource);
        Url::parse(&expanded).map_err(|e| {
            DirectoryError::Unexpected(format!(
                "dissemination template for {} expands to invalid URL '{}': {}",
                self.format, expanded, e
            ))
        })
    }

    /// Build the request fetching this representation of `resource`.
    pub fn build_request(&self, resource: &ResolvableResource) -> DirectoryResult<OutboundRequest> {
        Ok(OutboundRequest {
            method: Method::GET,
            uri: self.target_uri(resource)?,
            headers: self.headers.clone(),
        })
    }
}

fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Single left-to-right pass; substituted text is never rescanned.
fn expand(template: &str, resource: &ResolvableResource) -> String {
    let uri = resource.uri().as_str();
    let id = resource.identifier().as_str();
    let mut out = String::with_capacity(template.len() + uri.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let Some(end) = tail.find('}') else {
            out.push_str(tail);
            return out;
        };
        match &tail[..=end] {
            "{uri}" => out.push_str(uri),
            "{uri|enc}" => out.push_str(&encode(uri)),
            "{id}" => out.push_str(id),
            "{id|enc}" => out.push_str(&encode(id)),
            other => out.push_str(other),
        }
        rest = &tail[end + 1..];
    }
    out.push_str(rest);
    out
}

/// Request head addressed to a dissemination service. The body, if any, is
/// the caller's and travels separately as a stream.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub uri: Url,
    pub headers: HeaderMap,
}

impl OutboundRequest {
    /// Carry the caller's method over to this request.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }
}

/// A resource found in the directory together with its representations.
#[derive(Debug, Clone)]
pub struct ResolvableResource {
    identifier: ResourceIdentifier,
    uri: Url,
    services: Vec<DisseminationService>,
}

impl ResolvableResource {
    /// Create a resource. Services with a media type already present are
    /// dropped so that every media type maps to exactly one service.
    pub fn new(
        identifier: ResourceIdentifier,
        uri: Url,
        services: impl IntoIterator<Item = DisseminationService>,
    ) -> Self {
        let mut unique: Vec<DisseminationService> = Vec::new();
        for service in services {
            if unique.iter().any(|s| s.format == service.format) {
                tracing::warn!(
                    resource = %uri,
                    format = %service.format,
                    "Duplicate dissemination format ignored"
                );
                continue;
            }
            unique.push(service);
        }
        Self {
            identifier,
            uri,
            services: unique,
        }
    }

    pub fn identifier(&self) -> &ResourceIdentifier {
        &self.identifier
    }

    /// Canonical repository URI of the resource.
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// Dissemination services in directory order.
    pub fn services(&self) -> &[DisseminationService] {
        &self.services
    }

    /// Service producing `format`, if any.
    pub fn service(&self, format: &str) -> Option<&DisseminationService> {
        self.services.iter().find(|s| s.format == format)
    }
}
