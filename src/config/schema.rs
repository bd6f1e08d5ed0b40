//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the resolver.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the resolver gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ResolverConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Resolution and proxying behavior.
    pub resolver: ResolutionConfig,

    /// Directory endpoint pairs, tried in declared order.
    #[serde(rename = "directory")]
    pub directories: Vec<DirectoryEndpoints>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration for inbound handling and every outbound call.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout for outbound calls, in seconds.
    pub connect_secs: u64,

    /// Read timeout for outbound calls (also bounds idle body streams), in seconds.
    pub read_secs: u64,

    /// Total timeout for directory lookups, access probes and redirect-chain
    /// HEAD calls, in seconds.
    pub lookup_secs: u64,

    /// Time allowed to produce the response head for an inbound request, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            read_secs: 30,
            lookup_secs: 10,
            request_secs: 60,
        }
    }
}

/// Which URI the access gate probes before proxying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccessProbeTarget {
    /// The dissemination service's target URI.
    #[default]
    Service,
    /// The resource's canonical repository URI.
    Resource,
}

/// Resolution behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Scheme used to build resource identifiers from host and path.
    pub scheme: String,

    /// Media type of the dissemination service used when negotiation finds no match.
    pub default_dissemination: Option<String>,

    /// Maximum redirect hops followed when resolving a dissemination target.
    pub max_redirects: usize,

    /// Realm announced in `WWW-Authenticate` challenges.
    pub realm: String,

    /// Access probe target.
    pub access_probe: AccessProbeTarget,

    /// Echo internal error details to clients on 5xx responses.
    pub expose_error_details: bool,

    /// Skip TLS certificate verification for backend calls.
    pub accept_invalid_certs: bool,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            default_dissemination: None,
            max_redirects: 10,
            realm: "resolver".to_string(),
            access_probe: AccessProbeTarget::Service,
            expose_error_details: false,
            accept_invalid_certs: false,
        }
    }
}

/// One directory lookup target: the catalog the resource locations are
/// relative to and the query endpoint that answers identifier lookups.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DirectoryEndpoints {
    /// Catalog base URL (e.g., "https://repo.example.org/rest/").
    pub catalog: String,

    /// Query endpoint URL (e.g., "https://repo.example.org/lookup").
    pub query: String,

    /// Optional Basic credentials for the query endpoint.
    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

impl DirectoryEndpoints {
    pub fn new(catalog: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            catalog: catalog.into(),
            query: query.into(),
            user: None,
            password: None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Prometheus exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "uri_resolver=info,tower_http=info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: ResolverConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.resolver.max_redirects, 10);
        assert_eq!(config.resolver.realm, "resolver");
        assert!(config.directories.is_empty());
    }

    #[test]
    fn test_directory_pairs_keep_declared_order() {
        let raw = r#"
            [resolver]
            default_dissemination = "text/html"
            access_probe = "resource"

            [[directory]]
            catalog = "https://a.example.org/rest/"
            query = "https://a.example.org/lookup"

            [[directory]]
            catalog = "https://b.example.org/rest/"
            query = "https://b.example.org/lookup"
            user = "resolver"
            password = "secret"
        "#;
        let config: ResolverConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.directories.len(), 2);
        assert_eq!(config.directories[0].catalog, "https://a.example.org/rest/");
        assert_eq!(config.directories[1].user.as_deref(), Some("resolver"));
        assert_eq!(config.resolver.access_probe, AccessProbeTarget::Resource);
        assert_eq!(config.resolver.default_dissemination.as_deref(), Some("text/html"));
    }
}
