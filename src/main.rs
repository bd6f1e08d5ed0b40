//! URI resolver gateway.
//!
//! Maps persistent identifiers to the current location of a resource and
//! either redirects the client there or proxies one of its disseminations.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ resolver::engine ──▶ directory (failover lookup)
//!                                             │
//!                                             ├──▶ 302 / debug text
//!                                             │
//!                                             └──▶ proxy::access (HEAD probe)
//!                                                       │
//!     Client Response                                   ▼
//!     ◀────────────── http::response ◀──── proxy::forwarder ◀────▶ Backend
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use uri_resolver::config::validation::validate_config;
use uri_resolver::config::{load_config, ConfigError, ResolverConfig};
use uri_resolver::lifecycle::{wait_for_signal, Shutdown};
use uri_resolver::observability::{logging, metrics};
use uri_resolver::HttpServer;

#[derive(Parser)]
#[command(name = "uri-resolver")]
#[command(about = "Resolves persistent identifiers to resources and their disseminations", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

/// Load the configuration and apply CLI overrides. A file is validated by
/// `load_config`; defaults and overridden values are validated here.
fn load(cli: &Cli) -> Result<ResolverConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ResolverConfig::default(),
    };
    if let Some(bind) = &cli.bind {
        config.listener.bind_address = bind.clone();
    }
    if cli.config.is_none() || cli.bind.is_some() {
        validate_config(&config).map_err(ConfigError::Validation)?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load(&cli)?;

    if cli.check {
        println!("configuration OK ({} directory endpoint pair(s))", config.directories.len());
        return Ok(());
    }

    logging::init_logging(&config.observability);
    tracing::info!("uri-resolver v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        directories = config.directories.len(),
        max_redirects = config.resolver.max_redirects,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );
    if config.directories.is_empty() {
        tracing::warn!("No directory endpoints configured; every lookup will return 404");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("uri-resolver").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults_load_without_file() {
        let config = load(&cli(&[])).unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn test_bind_override_applied_and_validated() {
        let config = load(&cli(&["--bind", "127.0.0.1:9000"])).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");

        let err = load(&cli(&["--bind", "not-an-address"])).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_missing_config_file_is_io_error() {
        let err = load(&cli(&["--config", "/nonexistent/resolver.toml"])).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
