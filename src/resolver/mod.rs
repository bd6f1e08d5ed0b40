//! Resolution subsystem.
//!
//! # Data Flow
//! ```text
//! IncomingRequest
//!     → engine.rs (identifier, directory lookup)
//!     → negotiate.rs (Accept + format → ordered media types)
//!     → engine.rs (redirect, or access check then proxy)
//!     → Outcome | ResolveError
//! ```

pub mod engine;
pub mod error;
pub mod negotiate;

pub use engine::{Outcome, Resolver, ResolverSettings};
pub use error::ResolveError;
pub use negotiate::negotiate;
