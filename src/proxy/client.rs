//! Outbound HTTP client for dissemination services.
//!
//! # Responsibilities
//! - Enforce connect and read timeouts on every backend call
//! - Resolve redirect chains with HEAD requests, bounded by a hop limit
//! - Issue the final streamed request
//!
//! # Design Decisions
//! - Redirects are never followed by the transport; the chain is walked explicitly
//! - HEAD calls carry a total timeout, streamed calls only connect/read timeouts

use std::time::Duration;

use axum::http::header::LOCATION;
use axum::http::{HeaderMap, Method, StatusCode};
use thiserror::Error;
use url::Url;

use crate::config::TimeoutConfig;
use crate::proxy::headers::strip_credentials;

/// Errors raised while talking to a dissemination service.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// No response was received.
    #[error("upstream request to {uri} failed: {source}")]
    Transport {
        uri: String,
        #[source]
        source: reqwest::Error,
    },

    /// The redirect chain did not settle within the hop limit.
    #[error("redirect chain starting at {uri} exceeded {max} hops")]
    TooManyRedirects { uri: String, max: usize },
}

impl ProxyError {
    fn transport(uri: &Url, source: reqwest::Error) -> Self {
        Self::Transport {
            uri: uri.to_string(),
            source,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport { source, .. } if source.is_timeout())
    }
}

pub type ProxyResult<T> = Result<T, ProxyError>;

/// Where a redirect chain settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub uri: Url,
    pub status: StatusCode,
    /// The chain left the starting origin; caller credentials must not follow.
    pub cross_origin: bool,
}

/// Scheme, host and port all match.
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}

/// Statuses treated as "follow the Location header".
pub fn is_redirect(status: StatusCode) -> bool {
    (300..=307).contains(&status.as_u16())
}

/// Backend client shared by the access gate and the forwarder.
#[derive(Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    head_timeout: Duration,
}

impl UpstreamClient {
    pub fn new(timeouts: &TimeoutConfig, accept_invalid_certs: bool) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .read_timeout(Duration::from_secs(timeouts.read_secs))
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()?;
        Ok(Self {
            client,
            head_timeout: Duration::from_secs(timeouts.lookup_secs),
        })
    }

    /// Single HEAD request, redirects not followed.
    pub async fn head(&self, uri: &Url, headers: &HeaderMap) -> ProxyResult<reqwest::Response> {
        self.client
            .head(uri.clone())
            .headers(headers.clone())
            .timeout(self.head_timeout)
            .send()
            .await
            .map_err(|e| ProxyError::transport(uri, e))
    }

    /// Follow redirects from `start` with HEAD requests until a non-redirect
    /// status, or a redirect without a usable `Location`, is reached.
    pub async fn resolve_redirects(
        &self,
        start: &Url,
        headers: &HeaderMap,
        max_hops: usize,
    ) -> ProxyResult<ResolvedTarget> {
        let mut current = start.clone();
        let mut hop_headers = headers.clone();
        let mut cross_origin = false;
        let mut hops = 0;
        loop {
            let response = self.head(&current, &hop_headers).await?;
            let status = response.status();
            if !is_redirect(status) {
                return Ok(ResolvedTarget {
                    uri: current,
                    status,
                    cross_origin,
                });
            }

            let next = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|location| current.join(location).ok());
            let Some(next) = next else {
                tracing::debug!(uri = %current, status = %status, "Redirect without usable Location");
                return Ok(ResolvedTarget {
                    uri: current,
                    status,
                    cross_origin,
                });
            };

            if hops == max_hops {
                return Err(ProxyError::TooManyRedirects {
                    uri: start.to_string(),
                    max: max_hops,
                });
            }
            hops += 1;
            if !cross_origin && !same_origin(start, &next) {
                cross_origin = true;
                strip_credentials(&mut hop_headers);
                tracing::debug!(from = %current, to = %next, "Redirect left origin, dropping caller credentials");
            }
            tracing::debug!(from = %current, to = %next, hop = hops, "Following redirect");
            current = next;
        }
    }

    /// Streamed request; only connect and read timeouts apply.
    pub async fn send(
        &self,
        method: Method,
        uri: &Url,
        headers: HeaderMap,
        body: Option<reqwest::Body>,
    ) -> ProxyResult<reqwest::Response> {
        let mut request = self.client.request(method, uri.clone()).headers(headers);
        if let Some(body) = body {
            request = request.body(body);
        }
        request.send().await.map_err(|e| ProxyError::transport(uri, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_comparison() {
        let start = Url::parse("http://127.0.0.1:8080/data").unwrap();
        assert!(same_origin(&start, &Url::parse("http://127.0.0.1:8080/other?x=1").unwrap()));
        assert!(!same_origin(&start, &Url::parse("http://127.0.0.1:9090/data").unwrap()));
        assert!(!same_origin(&start, &Url::parse("https://127.0.0.1:8080/data").unwrap()));
        assert!(!same_origin(&start, &Url::parse("http://localhost:8080/data").unwrap()));
    }

    #[test]
    fn test_redirect_range() {
        assert!(is_redirect(StatusCode::MULTIPLE_CHOICES));
        assert!(is_redirect(StatusCode::FOUND));
        assert!(is_redirect(StatusCode::TEMPORARY_REDIRECT));
        assert!(!is_redirect(StatusCode::PERMANENT_REDIRECT));
        assert!(!is_redirect(StatusCode::OK));
        assert!(!is_redirect(StatusCode::NOT_FOUND));
    }
}
