//! URI resolver gateway library.

pub mod config;
pub mod directory;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod resolver;

pub use config::schema::ResolverConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
