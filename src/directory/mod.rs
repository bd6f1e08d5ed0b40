//! Resource directory subsystem.
//!
//! # Data Flow
//! ```text
//! ResourceIdentifier
//!     → failover.rs (walk endpoint pairs in declared order)
//!     → client.rs (one lookup against one pair)
//!     → ResolvableResource (canonical URI + dissemination services)
//! ```
//!
//! # Design Decisions
//! - The directory is a trait so lookups can be served by any backend
//! - Unreachable endpoints are skipped, ambiguity never is
//! - Media types are unique within one resource

pub mod client;
pub mod failover;
pub mod types;

pub use client::{HttpDirectory, ResourceDirectory};
pub use failover::{LookupError, ResourceResolver};
pub use types::{
    DirectoryError, DirectoryResult, DisseminationService, OutboundRequest, ResolvableResource,
    ResourceIdentifier,
};
