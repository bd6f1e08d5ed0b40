//! Proxy engine: relays one request to a dissemination service.
//!
//! # Data Flow
//! ```text
//! OutboundRequest + ClientContext + client body
//!     → merge headers (service headers, then forwarded client headers)
//!     → HEAD redirect chain (bounded)
//!     → final call with the caller's method and body at the settled URI
//!     → filter response headers, stream body back
//! ```
//!
//! Any response the backend produces is relayed, error statuses included,
//! except 401/403 to an anonymous caller, which the gateway answers itself.

use axum::body::Body;
use axum::http::Response;

use crate::directory::OutboundRequest;
use crate::proxy::access::Denial;
use crate::proxy::client::{ProxyResult, UpstreamClient};
use crate::proxy::headers::{
    filter_response_headers, merge_headers, probe_headers, strip_credentials, ClientContext,
};

#[derive(Clone)]
pub struct Forwarder {
    upstream: UpstreamClient,
    max_redirects: usize,
    realm: String,
}

impl Forwarder {
    pub fn new(upstream: UpstreamClient, max_redirects: usize, realm: impl Into<String>) -> Self {
        Self {
            upstream,
            max_redirects,
            realm: realm.into(),
        }
    }

    pub async fn proxy(
        &self,
        outbound: OutboundRequest,
        client: &ClientContext,
        body: Option<Body>,
    ) -> ProxyResult<Response<Body>> {
        let mut headers = merge_headers(&outbound.headers, client.forwarded.clone());

        let resolved = self
            .upstream
            .resolve_redirects(&outbound.uri, &probe_headers(&headers), self.max_redirects)
            .await?;
        if resolved.uri != outbound.uri {
            tracing::debug!(from = %outbound.uri, to = %resolved.uri, "Dissemination target redirected");
        }
        if resolved.cross_origin {
            strip_credentials(&mut headers);
        }

        let body = body.map(|b| reqwest::Body::wrap_stream(b.into_data_stream()));
        let upstream = self
            .upstream
            .send(outbound.method.clone(), &resolved.uri, headers, body)
            .await?;

        let status = upstream.status();
        tracing::debug!(method = %outbound.method, uri = %resolved.uri, status = %status, "Upstream responded");

        if !client.has_credentials {
            if let Some(denial) = Denial::from_status(status) {
                tracing::info!(uri = %resolved.uri, status = %status, "Anonymous caller refused by backend");
                return Ok(denial.into_response(&self.realm));
            }
        }

        let headers = filter_response_headers(upstream.headers());
        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}
