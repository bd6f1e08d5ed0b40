//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, request ID)
//!     → request.rs (IncomingRequest: host, path, query, headers, body)
//!     → [resolver decides redirect, refusal or proxy]
//!     → response.rs (Outcome or error → response)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{IncomingRequest, ResolverQuery, X_REQUEST_ID};
pub use server::HttpServer;
