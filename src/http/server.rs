//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the single catch-all resolve handler
//! - Wire up middleware (timeout, request ID, tracing)
//! - Bind server to listener and stop on the shutdown signal
//! - Hand each request to the resolver and render the result
//! - Observability (metrics, correlation IDs)

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Request, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ResolverConfig;
use crate::directory::ResourceDirectory;
use crate::http::request::{request_id, IncomingRequest, UuidRequestId};
use crate::http::response::{render_error, render_outcome};
use crate::observability::metrics;
use crate::resolver::Resolver;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<Resolver>,
    pub expose_error_details: bool,
}

/// HTTP front of the resolver gateway.
pub struct HttpServer {
    router: Router,
    config: ResolverConfig,
}

impl HttpServer {
    /// Create a server that looks resources up over HTTP.
    pub fn new(config: ResolverConfig) -> Result<Self, reqwest::Error> {
        let resolver = Resolver::from_config(&config)?;
        Ok(Self::with_resolver(config, resolver))
    }

    /// Create a server backed by a custom directory implementation.
    pub fn with_directory(
        config: ResolverConfig,
        directory: Arc<dyn ResourceDirectory>,
    ) -> Result<Self, reqwest::Error> {
        let resolver = Resolver::with_directory(&config, directory)?;
        Ok(Self::with_resolver(config, resolver))
    }

    fn with_resolver(config: ResolverConfig, resolver: Resolver) -> Self {
        let state = AppState {
            resolver: Arc::new(resolver),
            expose_error_details: config.resolver.expose_error_details,
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ResolverConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(resolve_handler))
            .route("/", any(resolve_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    request_id = %request_id(request),
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            directories = self.config.directories.len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Resolve one request into a redirect, a proxied response, a refusal or an error.
async fn resolve_handler(State(state): State<AppState>, request: Request<Body>) -> Response<Body> {
    let start_time = Instant::now();
    let request_id = request_id(&request).to_string();
    let incoming = IncomingRequest::from_request(request);

    tracing::debug!(
        request_id = %request_id,
        method = %incoming.method,
        host = %incoming.host,
        path = %incoming.path,
        "Resolving request"
    );

    match state.resolver.resolve(incoming).await {
        Ok(outcome) => {
            let label = outcome.label();
            let response = render_outcome(outcome);
            metrics::record_request(label, response.status().as_u16(), start_time);
            response
        }
        Err(e) => {
            let response = render_error(&e, &request_id, state.expose_error_details);
            metrics::record_request("error", response.status().as_u16(), start_time);
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    use crate::directory::failover::tests::{found, pair, Canned, FakeDirectory};

    fn server(canned: Canned) -> HttpServer {
        let mut config = ResolverConfig::default();
        config.directories = vec![pair("e1")];
        let fake = Arc::new(FakeDirectory::new(vec![("https://e1.example.org/query", canned)]));
        HttpServer::with_directory(config, fake).unwrap()
    }

    #[tokio::test]
    async fn test_request_id_is_propagated() {
        let response = server(found("https://repo.example.org/rest/7"))
            .router
            .oneshot(
                Request::builder()
                    .uri("/7")
                    .header("host", "id.example.org")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_client_request_id_kept() {
        let response = server(Canned::NotFound)
            .router
            .oneshot(
                Request::builder()
                    .uri("/missing")
                    .header("host", "id.example.org")
                    .header("x-request-id", "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers().get("x-request-id").unwrap(), "abc-123");
    }
}
