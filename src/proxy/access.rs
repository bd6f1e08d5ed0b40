//! Access gate.
//!
//! A dissemination request may embed references to other resources whose
//! access rights the gateway cannot evaluate, and the gateway must not lend
//! its own privileges to fetch them. Before any proxy pass the caller's
//! credentials are therefore tried against the target with a HEAD probe.
//! Redirect outcomes never pass through here.

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, WWW_AUTHENTICATE};
use axum::http::{HeaderValue, Response, StatusCode};
use url::Url;

use crate::proxy::client::{ProxyResult, UpstreamClient};
use crate::proxy::headers::{probe_headers, ClientContext};

/// Refusal issued by the gateway itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    Unauthorized,
    Forbidden,
}

impl Denial {
    /// Map a backend status to a gateway refusal.
    pub fn from_status(status: StatusCode) -> Option<Self> {
        match status {
            StatusCode::UNAUTHORIZED => Some(Self::Unauthorized),
            StatusCode::FORBIDDEN => Some(Self::Forbidden),
            _ => None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
        }
    }

    /// Plain-text refusal; 401 carries a Basic challenge for `realm`.
    pub fn into_response(self, realm: &str) -> Response<Body> {
        let message = match self {
            Self::Unauthorized => "Authentication required\n",
            Self::Forbidden => "Access denied\n",
        };
        let mut response = Response::new(Body::from(message));
        *response.status_mut() = self.status();
        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        if self == Self::Unauthorized {
            let challenge = format!("Basic realm=\"{}\"", realm.replace('"', ""));
            if let Ok(value) = HeaderValue::from_str(&challenge) {
                headers.insert(WWW_AUTHENTICATE, value);
            }
        }
        response
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allowed,
    Denied(Denial),
}

/// Probes a target with the caller's credentials.
#[derive(Clone)]
pub struct AccessGate {
    upstream: UpstreamClient,
    max_redirects: usize,
}

impl AccessGate {
    pub fn new(upstream: UpstreamClient, max_redirects: usize) -> Self {
        Self {
            upstream,
            max_redirects,
        }
    }

    pub async fn check(&self, target: &Url, client: &ClientContext) -> ProxyResult<AccessDecision> {
        let headers = probe_headers(&client.forwarded);
        let resolved = self
            .upstream
            .resolve_redirects(target, &headers, self.max_redirects)
            .await?;

        let decision = match Denial::from_status(resolved.status) {
            Some(denial) if !client.has_credentials => AccessDecision::Denied(denial),
            _ => AccessDecision::Allowed,
        };

        tracing::debug!(
            target = %target,
            probed = %resolved.uri,
            status = %resolved.status,
            decision = ?decision,
            "Access probe finished"
        );
        Ok(decision)
    }
}
