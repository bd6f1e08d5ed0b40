//! Header hygiene for both directions of a proxied exchange.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers (plus `host`) from forwarded requests and relayed responses
//! - Fold every inbound cookie into a single `Cookie` header
//! - Re-synthesize HTTP Basic credentials into a canonical `Authorization` header
//!
//! Headers named by an inbound `Connection` header are hop-by-hop as well.

use axum::http::header::{
    AUTHORIZATION, CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, PROXY_AUTHORIZATION,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

/// Headers never relayed across the gateway.
pub const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
];

/// True if `name` must not cross the gateway.
pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// Header names listed in `Connection` values, lowercased.
fn connection_listed(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
        .collect()
}

fn strip(headers: &HeaderMap, also_skip: &[HeaderName]) -> HeaderMap {
    let listed = connection_listed(headers);
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if is_hop_by_hop(name)
            || listed.iter().any(|l| l == name.as_str())
            || also_skip.contains(name)
        {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

/// Split every inbound `Cookie` header into its `name=value` pairs, in order.
pub fn parse_cookies(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(str::to_string)
        .collect()
}

/// HTTP Basic credentials presented by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub user: String,
    pub password: String,
}

impl BasicCredentials {
    /// Parse `Authorization: Basic <base64(user:password)>`.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
        let (scheme, encoded) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = BASE64.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (user, password) = decoded.split_once(':')?;
        Some(Self {
            user: user.to_string(),
            password: password.to_string(),
        })
    }

    pub fn to_header_value(&self) -> Option<HeaderValue> {
        let encoded = BASE64.encode(format!("{}:{}", self.user, self.password));
        HeaderValue::from_str(&format!("Basic {}", encoded)).ok()
    }
}

/// Whether the caller presented any credentials at all.
pub fn has_credentials(headers: &HeaderMap) -> bool {
    headers.contains_key(AUTHORIZATION)
}

/// Headers forwarded from the client to a backend.
pub fn forward_headers(headers: &HeaderMap, cookies: &[String]) -> HeaderMap {
    let basic = BasicCredentials::from_headers(headers);

    let mut skip = vec![COOKIE];
    if basic.is_some() {
        skip.push(AUTHORIZATION);
    }
    let mut out = strip(headers, &skip);

    if !cookies.is_empty() {
        if let Ok(folded) = HeaderValue::from_str(&cookies.join("; ")) {
            out.insert(COOKIE, folded);
        }
    }

    if let Some(value) = basic.as_ref().and_then(BasicCredentials::to_header_value) {
        out.insert(AUTHORIZATION, value);
    }

    out
}

/// What a backend call inherits from the caller.
#[derive(Debug, Clone, Default)]
pub struct ClientContext {
    /// Client headers after hygiene, appended to every backend request.
    pub forwarded: HeaderMap,
    /// Whether the caller authenticated itself.
    pub has_credentials: bool,
}

impl ClientContext {
    pub fn new(headers: &HeaderMap, cookies: &[String]) -> Self {
        Self {
            forwarded: forward_headers(headers, cookies),
            has_credentials: has_credentials(headers),
        }
    }
}

/// Forwarded headers for a bodiless probe.
pub fn probe_headers(forwarded: &HeaderMap) -> HeaderMap {
    let mut probe = forwarded.clone();
    probe.remove(CONTENT_LENGTH);
    probe.remove(CONTENT_TYPE);
    probe
}

/// Drop the caller's credentials. Applied once a redirect leaves the origin
/// the caller's request was addressed to.
pub fn strip_credentials(headers: &mut HeaderMap) {
    headers.remove(AUTHORIZATION);
    headers.remove(COOKIE);
    headers.remove(PROXY_AUTHORIZATION);
}

/// Backend response headers relayed to the client. Repeated names stay repeated.
pub fn filter_response_headers(headers: &HeaderMap) -> HeaderMap {
    strip(headers, &[])
}

/// A request's own headers followed by the forwarded set.
pub fn merge_headers(own: &HeaderMap, forwarded: HeaderMap) -> HeaderMap {
    let mut merged = own.clone();
    let mut last: Option<HeaderName> = None;
    for (name, value) in forwarded {
        // `None` means "same name as the previous entry"
        let name = match name {
            Some(n) => {
                last = Some(n.clone());
                n
            }
            None => match &last {
                Some(n) => n.clone(),
                None => continue,
            },
        };
        merged.append(name, value);
    }
    merged
}
