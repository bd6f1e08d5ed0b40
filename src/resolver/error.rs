use axum::http::StatusCode;
use thiserror::Error;

use crate::directory::{DirectoryError, LookupError};
use crate::proxy::ProxyError;

/// Every failure that ends a resolution with an error response.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// The chosen dissemination service could not build its request.
    #[error("Internal Server Error")]
    Service(#[source] DirectoryError),

    #[error("Bad Gateway")]
    Proxy(#[from] ProxyError),
}

pub type Result<T> = std::result::Result<T, ResolveError>;

impl ResolveError {
    /// HTTP status reported to the client.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ResolveError::Lookup(LookupError::NotFound) => StatusCode::NOT_FOUND,
            ResolveError::Lookup(LookupError::AmbiguousMatch)
            | ResolveError::Lookup(LookupError::Unexpected(_))
            | ResolveError::Service(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ResolveError::Proxy(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            ResolveError::Proxy(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Message including the underlying cause, for logs and debug exposure.
    pub fn detail(&self) -> String {
        match self {
            ResolveError::Lookup(LookupError::Unexpected(reason)) => {
                format!("Internal Server Error: {}", reason)
            }
            ResolveError::Service(e) => format!("Internal Server Error: {}", e),
            ResolveError::Proxy(e) => format!("Bad Gateway: {}", e),
            other => other.to_string(),
        }
    }

    /// Message sent to the client.
    pub fn public_message(&self, expose_details: bool) -> String {
        if expose_details {
            self.detail()
        } else {
            self.to_string()
        }
    }
}
