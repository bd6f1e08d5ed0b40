//! Failover across redundant directory endpoint pairs.

use std::sync::Arc;

use thiserror::Error;

use crate::config::DirectoryEndpoints;
use crate::directory::client::ResourceDirectory;
use crate::directory::types::{DirectoryError, ResolvableResource, ResourceIdentifier};
use crate::observability::metrics;

/// Terminal outcome of resolving an identifier across all endpoint pairs.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Not Found")]
    NotFound,

    #[error("Internal Server Error - many resources with the given URI")]
    AmbiguousMatch,

    #[error("Internal Server Error")]
    Unexpected(String),
}

/// Resolves identifiers against an ordered list of endpoint pairs.
///
/// An endpoint that does not know the identifier, or cannot be reached, is
/// skipped. Ambiguity and unexpected failures end the search.
pub struct ResourceResolver {
    directory: Arc<dyn ResourceDirectory>,
    endpoints: Vec<DirectoryEndpoints>,
}

impl ResourceResolver {
    pub fn new(directory: Arc<dyn ResourceDirectory>, endpoints: Vec<DirectoryEndpoints>) -> Self {
        Self {
            directory,
            endpoints,
        }
    }

    pub async fn resolve(&self, identifier: &ResourceIdentifier) -> Result<ResolvableResource, LookupError> {
        for (i, endpoints) in self.endpoints.iter().enumerate() {
            match self.directory.lookup(identifier, endpoints).await {
                Ok(resource) => {
                    tracing::debug!(
                        identifier = %identifier,
                        endpoint_idx = i,
                        resource = %resource.uri(),
                        "Resource found"
                    );
                    return Ok(resource);
                }
                Err(DirectoryError::NotFound) => {
                    tracing::debug!(identifier = %identifier, endpoint_idx = i, "Not found, trying next endpoint");
                }
                Err(DirectoryError::Transport(reason)) => {
                    metrics::record_directory_failover(i);
                    tracing::warn!(
                        identifier = %identifier,
                        endpoint_idx = i,
                        query = %endpoints.query,
                        error = %reason,
                        "Directory endpoint unavailable, trying next endpoint"
                    );
                }
                Err(DirectoryError::AmbiguousMatch(count)) => {
                    tracing::error!(identifier = %identifier, endpoint_idx = i, count, "Ambiguous identifier");
                    return Err(LookupError::AmbiguousMatch);
                }
                Err(DirectoryError::Unexpected(reason)) => {
                    tracing::error!(identifier = %identifier, endpoint_idx = i, error = %reason, "Directory lookup failed");
                    return Err(LookupError::Unexpected(reason));
                }
            }
        }
        Err(LookupError::NotFound)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use url::Url;

    use crate::directory::types::DirectoryResult;

    /// Canned outcome per query endpoint.
    #[derive(Clone)]
    pub(crate) enum Canned {
        Found(ResolvableResource),
        NotFound,
        Down,
        Ambiguous,
        Broken,
    }

    /// In-memory directory answering by query endpoint.
    pub(crate) struct FakeDirectory {
        pub answers: HashMap<String, Canned>,
        pub calls: AtomicUsize,
    }

    impl FakeDirectory {
        pub fn new(answers: Vec<(&str, Canned)>) -> Self {
            Self {
                answers: answers.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ResourceDirectory for FakeDirectory {
        async fn lookup(
            &self,
            _identifier: &ResourceIdentifier,
            endpoints: &DirectoryEndpoints,
        ) -> DirectoryResult<ResolvableResource> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.answers.get(&endpoints.query) {
                Some(Canned::Found(res)) => Ok(res.clone()),
                Some(Canned::NotFound) | None => Err(DirectoryError::NotFound),
                Some(Canned::Down) => Err(DirectoryError::Transport("connection refused".into())),
                Some(Canned::Ambiguous) => Err(DirectoryError::AmbiguousMatch(2)),
                Some(Canned::Broken) => Err(DirectoryError::Unexpected("boom".into())),
            }
        }
    }

    pub(crate) fn pair(name: &str) -> DirectoryEndpoints {
        DirectoryEndpoints::new(
            format!("https://{}.example.org/rest/", name),
            format!("https://{}.example.org/query", name),
        )
    }

    pub(crate) fn found(uri: &str) -> Canned {
        Canned::Found(ResolvableResource::new(
            ResourceIdentifier::new("https://id.example.org/1"),
            Url::parse(uri).unwrap(),
            Vec::new(),
        ))
    }

    fn resolver(answers: Vec<(&str, Canned)>, names: &[&str]) -> (ResourceResolver, Arc<FakeDirectory>) {
        let fake = Arc::new(FakeDirectory::new(answers));
        let endpoints = names.iter().map(|n| pair(n)).collect();
        (ResourceResolver::new(fake.clone(), endpoints), fake)
    }

    fn id() -> ResourceIdentifier {
        ResourceIdentifier::new("https://id.example.org/1")
    }

    #[tokio::test]
    async fn test_skips_failing_endpoints() {
        let (resolver, fake) = resolver(
            vec![
                ("https://e1.example.org/query", Canned::Down),
                ("https://e2.example.org/query", Canned::Down),
                ("https://e3.example.org/query", found("https://e3.example.org/rest/1")),
            ],
            &["e1", "e2", "e3"],
        );
        let res = resolver.resolve(&id()).await.unwrap();
        assert_eq!(res.uri().as_str(), "https://e3.example.org/rest/1");
        assert_eq!(fake.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_not_found_continues_and_first_success_wins() {
        let (resolver, fake) = resolver(
            vec![
                ("https://e1.example.org/query", Canned::NotFound),
                ("https://e2.example.org/query", found("https://e2.example.org/rest/1")),
                ("https://e3.example.org/query", found("https://e3.example.org/rest/1")),
            ],
            &["e1", "e2", "e3"],
        );
        let res = resolver.resolve(&id()).await.unwrap();
        assert_eq!(res.uri().as_str(), "https://e2.example.org/rest/1");
        assert_eq!(fake.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_exhausted_is_not_found() {
        let (resolver, _) = resolver(
            vec![
                ("https://e1.example.org/query", Canned::NotFound),
                ("https://e2.example.org/query", Canned::Down),
            ],
            &["e1", "e2"],
        );
        assert!(matches!(resolver.resolve(&id()).await, Err(LookupError::NotFound)));
    }

    #[tokio::test]
    async fn test_ambiguity_stops_search() {
        let (resolver, fake) = resolver(
            vec![
                ("https://e1.example.org/query", Canned::Ambiguous),
                ("https://e2.example.org/query", found("https://e2.example.org/rest/1")),
            ],
            &["e1", "e2"],
        );
        assert!(matches!(resolver.resolve(&id()).await, Err(LookupError::AmbiguousMatch)));
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unexpected_stops_search() {
        let (resolver, fake) = resolver(
            vec![
                ("https://e1.example.org/query", Canned::Broken),
                ("https://e2.example.org/query", found("https://e2.example.org/rest/1")),
            ],
            &["e1", "e2"],
        );
        assert!(matches!(resolver.resolve(&id()).await, Err(LookupError::Unexpected(_))));
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_endpoints_is_not_found() {
        let (resolver, _) = resolver(Vec::new(), &[]);
        assert!(matches!(resolver.resolve(&id()).await, Err(LookupError::NotFound)));
    }
}
