//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate URLs of every directory endpoint pair
//! - Validate value ranges (timeouts > 0, redirect bound > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ResolverConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::ResolverConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("directory[{index}].{field}: '{value}' is not an absolute http(s) URL")]
    DirectoryUrl {
        index: usize,
        field: &'static str,
        value: String,
    },

    #[error("directory[{0}]: user and password must be set together")]
    DirectoryCredentials(usize),

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("resolver.max_redirects must be greater than zero")]
    ZeroRedirects,

    #[error("resolver.scheme must be http or https, got '{0}'")]
    Scheme(String),
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ResolverConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    for (index, pair) in config.directories.iter().enumerate() {
        for (field, value) in [("catalog", &pair.catalog), ("query", &pair.query)] {
            if !is_http_url(value) {
                errors.push(ValidationError::DirectoryUrl {
                    index,
                    field,
                    value: value.clone(),
                });
            }
        }
        if pair.user.is_some() != pair.password.is_some() {
            errors.push(ValidationError::DirectoryCredentials(index));
        }
    }

    let timeouts = &config.timeouts;
    for (name, value) in [
        ("connect_secs", timeouts.connect_secs),
        ("read_secs", timeouts.read_secs),
        ("lookup_secs", timeouts.lookup_secs),
        ("request_secs", timeouts.request_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout(name));
        }
    }

    if config.resolver.max_redirects == 0 {
        errors.push(ValidationError::ZeroRedirects);
    }

    if !matches!(config.resolver.scheme.as_str(), "http" | "https") {
        errors.push(ValidationError::Scheme(config.resolver.scheme.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_http_url(value: &str) -> bool {
    Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::DirectoryEndpoints;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ResolverConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ResolverConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.timeouts.connect_secs = 0;
        config.resolver.max_redirects = 0;
        config
            .directories
            .push(DirectoryEndpoints::new("relative/path", "https://ok.example.org/q"));

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::ZeroRedirects));
        assert!(errors.contains(&ValidationError::ZeroTimeout("connect_secs")));
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::DirectoryUrl { index: 0, field: "catalog", .. }
        )));
    }

    #[test]
    fn test_half_configured_credentials_rejected() {
        let mut config = ResolverConfig::default();
        let mut pair = DirectoryEndpoints::new("https://a.example.org/", "https://a.example.org/q");
        pair.user = Some("resolver".into());
        config.directories.push(pair);

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::DirectoryCredentials(0)]);
    }
}
