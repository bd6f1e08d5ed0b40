//! Reverse-proxy subsystem.
//!
//! # Data Flow
//! ```text
//! IncomingRequest headers + cookies
//!     → headers.rs (hygiene → ClientContext)
//!     → access.rs (HEAD probe with caller credentials)
//!     → forwarder.rs (redirect chain, streamed exchange)
//!     → client.rs (timeouts, transport errors)
//! ```
//!
//! # Design Decisions
//! - Bodies are streamed in both directions, never buffered
//! - Redirect chains are bounded; exceeding the bound is a transport error
//! - Dropping the handler future aborts the backend call and closes its streams

pub mod access;
pub mod client;
pub mod forwarder;
pub mod headers;

pub use access::{AccessDecision, AccessGate, Denial};
pub use client::{ProxyError, ProxyResult, UpstreamClient};
pub use forwarder::Forwarder;
pub use headers::ClientContext;
