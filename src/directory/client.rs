//! HTTP/JSON resource directory client.
//!
//! # Responsibilities
//! - Query one endpoint pair for an identifier
//! - Decode matches into a `ResolvableResource`
//! - Classify failures so the failover loop knows whether to continue
//!
//! # Wire Format
//! ```text
//! GET <query>?id=<identifier>     Accept: application/json
//!
//! 200 [{"location": "123", "services": [
//!         {"format": "text/html", "template": "https://viewer/?uri={uri|enc}",
//!          "reverse_proxy": false, "headers": {"accept": "text/html"}}]}]
//! ```
//! `location` is resolved against the pair's catalog URL.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue};
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use crate::config::{DirectoryEndpoints, TimeoutConfig};
use crate::directory::types::{
    DirectoryError, DirectoryResult, DisseminationService, ResolvableResource, ResourceIdentifier,
};

/// Lookup service mapping an identifier to its resource.
#[async_trait]
pub trait ResourceDirectory: Send + Sync {
    /// Look `identifier` up using one endpoint pair.
    async fn lookup(
        &self,
        identifier: &ResourceIdentifier,
        endpoints: &DirectoryEndpoints,
    ) -> DirectoryResult<ResolvableResource>;
}

#[derive(Debug, Deserialize)]
struct ResourceRecord {
    location: String,
    #[serde(default)]
    services: Vec<ServiceRecord>,
}

#[derive(Debug, Deserialize)]
struct ServiceRecord {
    format: String,
    template: String,
    #[serde(default)]
    reverse_proxy: bool,
    #[serde(default)]
    headers: BTreeMap<String, String>,
}

/// Directory reached over HTTP.
#[derive(Clone)]
pub struct HttpDirectory {
    client: reqwest::Client,
}

impl HttpDirectory {
    pub fn new(timeouts: &TimeoutConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.lookup_secs))
            .build()?;
        Ok(Self { client })
    }

    fn decode(
        identifier: &ResourceIdentifier,
        catalog: &Url,
        mut records: Vec<ResourceRecord>,
    ) -> DirectoryResult<ResolvableResource> {
        match records.len() {
            0 => return Err(DirectoryError::NotFound),
            1 => {}
            n => return Err(DirectoryError::AmbiguousMatch(n)),
        }
        let record = records.remove(0);

        let uri = catalog.join(&record.location).map_err(|e| {
            DirectoryError::Unexpected(format!("invalid resource location '{}': {}", record.location, e))
        })?;

        let mut services = Vec::with_capacity(record.services.len());
        for s in record.services {
            let mut service = DisseminationService::new(s.format, s.template, s.reverse_proxy);
            for (name, value) in s.headers {
                let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                    DirectoryError::Unexpected(format!("invalid service header name '{}': {}", name, e))
                })?;
                let value = HeaderValue::from_str(&value).map_err(|e| {
                    DirectoryError::Unexpected(format!("invalid service header value: {}", e))
                })?;
                service = service.with_header(name, value);
            }
            services.push(service);
        }

        Ok(ResolvableResource::new(identifier.clone(), uri, services))
    }
}

#[async_trait]
impl ResourceDirectory for HttpDirectory {
    async fn lookup(
        &self,
        identifier: &ResourceIdentifier,
        endpoints: &DirectoryEndpoints,
    ) -> DirectoryResult<ResolvableResource> {
        let catalog = Url::parse(&endpoints.catalog)
            .map_err(|e| DirectoryError::Unexpected(format!("invalid catalog URL: {}", e)))?;

        let mut request = self
            .client
            .get(&endpoints.query)
            .query(&[("id", identifier.as_str())])
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(user) = &endpoints.user {
            request = request.basic_auth(user, endpoints.password.as_ref());
        }

        let response = request
            .send()
            .await
            .map_err(|e| DirectoryError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(DirectoryError::NotFound);
        }
        if status.is_server_error() {
            return Err(DirectoryError::Transport(format!("query endpoint returned {}", status)));
        }
        if !status.is_success() {
            return Err(DirectoryError::Unexpected(format!("query endpoint returned {}", status)));
        }

        let records: Vec<ResourceRecord> = response
            .json()
            .await
            .map_err(|e| DirectoryError::Transport(format!("undecodable lookup response: {}", e)))?;

        Self::decode(identifier, &catalog, records)
    }
}
