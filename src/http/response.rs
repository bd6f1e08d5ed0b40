//! Response rendering.
//!
//! # Responsibilities
//! - Turn a resolution `Outcome` into the client response
//! - Map resolution errors to status codes and plain-text bodies
//!
//! # Design Decisions
//! - This is the only place an error becomes a response
//! - 5xx details are logged, and only sent to the client when configured
//! - Proxied responses pass through untouched; their body is still streaming

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, LOCATION};
use axum::http::{HeaderValue, Response, StatusCode};

use crate::resolver::{Outcome, ResolveError};

const TEXT_PLAIN: HeaderValue = HeaderValue::from_static("text/plain; charset=utf-8");

fn plain_text(status: StatusCode, body: String) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, TEXT_PLAIN);
    response
}

/// Render a successful resolution.
pub fn render_outcome(outcome: Outcome) -> Response<Body> {
    match outcome {
        Outcome::Redirect { location, debug: true } => {
            plain_text(StatusCode::OK, format!("Location: {}\n", location))
        }
        Outcome::Redirect { location, debug: false } => {
            match HeaderValue::from_str(location.as_str()) {
                Ok(value) => {
                    let mut response = Response::new(Body::empty());
                    *response.status_mut() = StatusCode::FOUND;
                    response.headers_mut().insert(LOCATION, value);
                    response
                }
                Err(e) => {
                    tracing::error!(location = %location, error = %e, "Redirect target is not a valid header value");
                    plain_text(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal Server Error".to_string(),
                    )
                }
            }
        }
        Outcome::Proxied(response) => response,
        Outcome::Denied { denial, realm } => denial.into_response(&realm),
    }
}

/// Render a failed resolution.
pub fn render_error(error: &ResolveError, request_id: &str, expose_details: bool) -> Response<Body> {
    let status = error.status_code();
    if status.is_server_error() {
        tracing::error!(request_id = %request_id, status = %status, error = %error.detail(), "Resolution failed");
    } else {
        tracing::info!(request_id = %request_id, status = %status, "Resolution failed");
    }
    let mut message = error.public_message(expose_details);
    message.push('\n');
    plain_text(status, message)
}
