//! Request handling at the HTTP boundary.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) unless the client sent one
//! - Extract everything resolution needs into an immutable `IncomingRequest`
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The body is only kept when the request advertises one

use axum::body::Body;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE, HOST, TRANSFER_ENCODING};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use url::form_urlencoded;
use uuid::Uuid;

use crate::proxy::headers::parse_cookies;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

/// Issues UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Request ID of a request that went through the request-ID layer.
pub fn request_id<B>(request: &Request<B>) -> &str {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Query parameters the resolver understands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolverQuery {
    /// Explicit resource identifier.
    pub id: Option<String>,
    /// Explicit media type, ranked above the Accept header.
    pub format: Option<String>,
    /// Describe the redirect instead of performing it.
    pub debug: bool,
}

impl ResolverQuery {
    pub fn parse(query: Option<&str>) -> Self {
        let mut parsed = Self::default();
        let Some(query) = query else {
            return parsed;
        };
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "id" if !value.is_empty() => parsed.id = Some(value.into_owned()),
                "format" if !value.is_empty() => parsed.format = Some(value.into_owned()),
                "debug" => parsed.debug = !value.is_empty() && value != "0",
                _ => {}
            }
        }
        parsed
    }
}

/// Everything resolution needs from an inbound request. Built once, never mutated.
#[derive(Debug)]
pub struct IncomingRequest {
    pub method: Method,
    pub host: String,
    pub path: String,
    pub query: ResolverQuery,
    pub headers: HeaderMap,
    pub cookies: Vec<String>,
    pub body: Option<Body>,
}

impl IncomingRequest {
    pub fn from_request(request: Request<Body>) -> Self {
        let (parts, body) = request.into_parts();

        let host = forwarded_host(&parts.headers)
            .or_else(|| {
                parts
                    .headers
                    .get(HOST)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            })
            .or_else(|| parts.uri.authority().map(|a| a.to_string()))
            .unwrap_or_default();

        let has_body = parts.method != Method::TRACE
            && [CONTENT_TYPE, CONTENT_LENGTH, TRANSFER_ENCODING]
                .iter()
                .any(|h| parts.headers.contains_key(h));

        Self {
            query: ResolverQuery::parse(parts.uri.query()),
            path: parts.uri.path().to_string(),
            cookies: parse_cookies(&parts.headers),
            method: parts.method,
            host,
            headers: parts.headers,
            body: has_body.then_some(body),
        }
    }

    pub fn accept(&self) -> Option<&str> {
        self.headers
            .get(axum::http::header::ACCEPT)
            .and_then(|v| v.to_str().ok())
    }
}

/// First entry of `X-Forwarded-Host`, if any.
fn forwarded_host(headers: &HeaderMap) -> Option<String> {
    headers
        .get(X_FORWARDED_HOST)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
}
