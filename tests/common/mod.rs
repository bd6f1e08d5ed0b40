//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{any, get};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use uri_resolver::config::{DirectoryEndpoints, ResolverConfig};
use uri_resolver::{HttpServer, Shutdown};

/// Serve `router` on an ephemeral local port.
pub async fn spawn_backend(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

async fn query_handler(
    State(records): State<Arc<HashMap<String, Value>>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let id = params.get("id").cloned().unwrap_or_default();
    Json(records.get(&id).cloned().unwrap_or_else(|| json!([])))
}

/// Mock directory answering `GET /query?id=` from `records` (identifier → JSON array).
pub fn directory(records: Vec<(&str, Value)>) -> Router {
    let records: HashMap<String, Value> = records
        .into_iter()
        .map(|(id, value)| (id.to_string(), value))
        .collect();
    Router::new()
        .route("/query", get(query_handler))
        .with_state(Arc::new(records))
}

/// Mock directory that is always unavailable.
pub fn failing_directory() -> Router {
    Router::new().route("/query", any(|| async { StatusCode::SERVICE_UNAVAILABLE }))
}

pub fn endpoints(addr: SocketAddr) -> DirectoryEndpoints {
    DirectoryEndpoints::new(format!("http://{}/rest/", addr), format!("http://{}/query", addr))
}

/// A running resolver. Dropping it stops the server.
pub struct Gateway {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl Gateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn spawn_resolver(config: ResolverConfig) -> Gateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    Gateway { addr, shutdown }
}

/// Resolver whose only directory serves `records`.
pub async fn resolver_with(records: Vec<(&str, Value)>) -> Gateway {
    let directory = spawn_backend(directory(records)).await;
    let mut config = ResolverConfig::default();
    config.directories = vec![endpoints(directory)];
    spawn_resolver(config).await
}

/// Client that reports redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}

pub const FORWARDED_HOST: &str = "id.example.org";
