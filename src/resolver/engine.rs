//! Resolution engine.
//!
//! # States
//! ```text
//! Start → Identified → Negotiated → Redirecting                  → Done
//!                                 → AccessChecking → Proxying    → Done
//!       ↘ Failed (lookup error)    ↘ Done (denied)
//! ```
//! Every request ends in exactly one `Outcome` or one `ResolveError`.

use std::fmt;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Response;
use url::Url;

use crate::config::{AccessProbeTarget, ResolverConfig};
use crate::directory::{
    DisseminationService, HttpDirectory, ResolvableResource, ResourceDirectory, ResourceIdentifier,
    ResourceResolver,
};
use crate::http::request::IncomingRequest;
use crate::proxy::{AccessDecision, AccessGate, ClientContext, Denial, Forwarder, UpstreamClient};
use crate::resolver::error::{ResolveError, Result};
use crate::resolver::negotiate::negotiate;

/// Read-only settings shared by every request.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub scheme: String,
    pub default_dissemination: Option<String>,
    pub access_probe: AccessProbeTarget,
    pub realm: String,
}

impl From<&ResolverConfig> for ResolverSettings {
    fn from(config: &ResolverConfig) -> Self {
        Self {
            scheme: config.resolver.scheme.clone(),
            default_dissemination: config.resolver.default_dissemination.clone(),
            access_probe: config.resolver.access_probe,
            realm: config.resolver.realm.clone(),
        }
    }
}

/// The single observable result of a successful resolution.
pub enum Outcome {
    /// Send the client to `location`; `debug` describes it in plain text instead.
    Redirect { location: Url, debug: bool },
    /// Relayed backend response.
    Proxied(Response<Body>),
    /// The access gate refused the anonymous caller.
    Denied { denial: Denial, realm: String },
}

impl Outcome {
    /// Label used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Redirect { .. } => "redirect",
            Outcome::Proxied(_) => "proxy",
            Outcome::Denied { .. } => "denied",
        }
    }
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Redirect { location, debug } => f
                .debug_struct("Redirect")
                .field("location", &location.as_str())
                .field("debug", debug)
                .finish(),
            Outcome::Proxied(response) => f.debug_tuple("Proxied").field(&response.status()).finish(),
            Outcome::Denied { denial, .. } => f.debug_tuple("Denied").field(denial).finish(),
        }
    }
}

/// Dissemination choice made by negotiation.
#[derive(Debug)]
enum Selection<'a> {
    Service(&'a DisseminationService),
    Canonical,
}

/// Composes lookup, negotiation, access gating and proxying.
pub struct Resolver {
    settings: ResolverSettings,
    resources: ResourceResolver,
    gate: AccessGate,
    forwarder: Forwarder,
}

impl Resolver {
    pub fn new(
        settings: ResolverSettings,
        resources: ResourceResolver,
        gate: AccessGate,
        forwarder: Forwarder,
    ) -> Self {
        Self {
            settings,
            resources,
            gate,
            forwarder,
        }
    }

    /// Build a resolver using `directory` for lookups and real HTTP clients for backends.
    pub fn with_directory(
        config: &ResolverConfig,
        directory: Arc<dyn ResourceDirectory>,
    ) -> std::result::Result<Self, reqwest::Error> {
        let upstream = UpstreamClient::new(&config.timeouts, config.resolver.accept_invalid_certs)?;
        let max_redirects = config.resolver.max_redirects;
        Ok(Self::new(
            ResolverSettings::from(config),
            ResourceResolver::new(directory, config.directories.clone()),
            AccessGate::new(upstream.clone(), max_redirects),
            Forwarder::new(upstream, max_redirects, config.resolver.realm.clone()),
        ))
    }

    /// Build a resolver backed by the HTTP directory client.
    pub fn from_config(config: &ResolverConfig) -> std::result::Result<Self, reqwest::Error> {
        let directory = Arc::new(HttpDirectory::new(&config.timeouts)?);
        Self::with_directory(config, directory)
    }

    pub async fn resolve(&self, request: IncomingRequest) -> Result<Outcome> {
        // Start → Identified
        let identifier = ResourceIdentifier::from_origin(
            &self.settings.scheme,
            &request.host,
            &request.path,
            request.query.id.as_deref(),
        );
        let resource = self.resources.resolve(&identifier).await?;

        // Identified → Negotiated
        let candidates = negotiate(request.accept(), request.query.format.as_deref());
        let selection = self.select(&resource, &candidates);
        tracing::debug!(
            identifier = %identifier,
            resource = %resource.uri(),
            candidates = ?candidates,
            selection = ?selection,
            "Negotiated dissemination"
        );

        let service = match selection {
            Selection::Service(service) if service.requires_proxy() => service,
            // Negotiated → Redirecting
            Selection::Service(service) => {
                let outbound = service.build_request(&resource).map_err(ResolveError::Service)?;
                return Ok(Outcome::Redirect {
                    location: outbound.uri,
                    debug: request.query.debug,
                });
            }
            Selection::Canonical => {
                return Ok(Outcome::Redirect {
                    location: resource.uri().clone(),
                    debug: request.query.debug,
                });
            }
        };

        // Negotiated → AccessChecking
        let outbound = service.build_request(&resource).map_err(ResolveError::Service)?;
        let client = ClientContext::new(&request.headers, &request.cookies);
        let probe_target = match self.settings.access_probe {
            AccessProbeTarget::Service => &outbound.uri,
            AccessProbeTarget::Resource => resource.uri(),
        };
        if let AccessDecision::Denied(denial) = self.gate.check(probe_target, &client).await? {
            tracing::info!(identifier = %identifier, target = %probe_target, status = %denial.status(), "Access denied");
            return Ok(Outcome::Denied {
                denial,
                realm: self.settings.realm.clone(),
            });
        }

        // AccessChecking → Proxying
        let outbound = outbound.with_method(request.method.clone());
        let response = self.forwarder.proxy(outbound, &client, request.body).await?;
        Ok(Outcome::Proxied(response))
    }

    fn select<'a>(&self, resource: &'a ResolvableResource, candidates: &[String]) -> Selection<'a> {
        candidates
            .iter()
            .find_map(|format| resource.service(format))
            .or_else(|| {
                self.settings
                    .default_dissemination
                    .as_deref()
                    .and_then(|format| resource.service(format))
            })
            .map_or(Selection::Canonical, Selection::Service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, Request};

    use crate::config::DirectoryEndpoints;
    use crate::directory::failover::tests::{pair, Canned, FakeDirectory};

    fn resource() -> ResolvableResource {
        ResolvableResource::new(
            ResourceIdentifier::new("https://id.example.org/1"),
            Url::parse("https://repo.example.org/rest/1").unwrap(),
            vec![
                DisseminationService::new("text/html", "https://viewer.example.org/?u={uri|enc}", false),
                DisseminationService::new("application/xml", "{uri}/metadata", false),
            ],
        )
    }

    fn resolver(default_dissemination: Option<&str>) -> Resolver {
        let mut config = ResolverConfig::default();
        config.resolver.default_dissemination = default_dissemination.map(str::to_string);
        config.directories = vec![pair("e1")];
        let fake = Arc::new(FakeDirectory::new(vec![(
            "https://e1.example.org/query",
            Canned::Found(resource()),
        )]));
        Resolver::with_directory(&config, fake).unwrap()
    }

    fn request(uri: &str, accept: Option<&str>) -> IncomingRequest {
        let mut builder = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header("host", "id.example.org");
        if let Some(accept) = accept {
            builder = builder.header("accept", accept);
        }
        IncomingRequest::from_request(builder.body(Body::empty()).unwrap())
    }

    fn location(outcome: Outcome) -> (String, bool) {
        match outcome {
            Outcome::Redirect { location, debug } => (location.to_string(), debug),
            other => panic!("expected redirect, got {}", other.label()),
        }
    }

    #[tokio::test]
    async fn test_negotiated_service_redirect() {
        let outcome = resolver(None)
            .resolve(request("/1", Some("application/xml, text/html;q=0.5")))
            .await
            .unwrap();
        assert_eq!(
            location(outcome),
            ("https://repo.example.org/rest/1/metadata".to_string(), false)
        );
    }

    #[tokio::test]
    async fn test_format_override_wins() {
        let outcome = resolver(None)
            .resolve(request("/1?format=text/html&debug=1", Some("application/xml")))
            .await
            .unwrap();
        let (loc, debug) = location(outcome);
        assert!(loc.starts_with("https://viewer.example.org/"));
        assert!(debug);
    }

    #[tokio::test]
    async fn test_default_service_used_without_match() {
        let outcome = resolver(Some("text/html"))
            .resolve(request("/1", Some("image/png")))
            .await
            .unwrap();
        assert!(location(outcome).0.starts_with("https://viewer.example.org/"));
    }

    #[tokio::test]
    async fn test_canonical_redirect_without_match_or_default() {
        let outcome = resolver(Some("application/pdf"))
            .resolve(request("/1", Some("image/png")))
            .await
            .unwrap();
        assert_eq!(location(outcome).0, "https://repo.example.org/rest/1");
    }

    #[tokio::test]
    async fn test_lookup_failure_maps_to_not_found() {
        let mut config = ResolverConfig::default();
        config.directories = vec![DirectoryEndpoints::new(
            "https://e9.example.org/",
            "https://e9.example.org/query",
        )];
        let fake = Arc::new(FakeDirectory::new(vec![("https://e9.example.org/query", Canned::Down)]));
        let resolver = Resolver::with_directory(&config, fake).unwrap();

        match resolver.resolve(request("/1", None)).await {
            Err(err) => assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND),
            Ok(outcome) => panic!("expected lookup failure, got {}", outcome.label()),
        }
    }
}
