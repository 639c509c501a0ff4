//! Publication resolver: PDBe first, RCSB as fallback.

use std::sync::Arc;

use crate::config::Config;
use crate::error::Error;
use crate::models::{PdbId, PublicationSet};
use crate::sources::{FailureKind, PdbeSource, PublicationSource, RcsbSource, SourceError};
use crate::utils::HttpClient;

/// Resolves a PDB identifier into its publications by trying sources in order.
///
/// Each source is queried at most once per lookup. The first source that
/// answers wins; its result must satisfy the primary-publication invariant
/// or the lookup fails without consulting later sources.
#[derive(Debug, Clone)]
pub struct PublicationResolver {
    sources: Vec<Arc<dyn PublicationSource>>,
}

impl PublicationResolver {
    /// Resolver over the public PDBe and RCSB services
    pub fn new() -> Result<Self, Error> {
        Self::from_config(&Config::default())
    }

    /// Resolver using the configured endpoints and HTTP settings
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let client = HttpClient::from_config(&config.http)?;
        let pdbe: Arc<dyn PublicationSource> = Arc::new(PdbeSource::with_client(
            client.clone(),
            &config.endpoints.pdbe_base,
        ));
        let rcsb: Arc<dyn PublicationSource> =
            Arc::new(RcsbSource::with_client(client, &config.endpoints.rcsb_base));

        Ok(Self::with_sources(vec![pdbe, rcsb]))
    }

    /// Resolver over an explicit, ordered list of sources
    pub fn with_sources(sources: Vec<Arc<dyn PublicationSource>>) -> Self {
        Self { sources }
    }

    /// Source ids in the order they are tried
    pub fn source_ids(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.id()).collect()
    }

    /// Resolve a raw identifier into `(primary title, publication set)`.
    ///
    /// A blank identifier fails with [`Error::InvalidIdentifier`] before any
    /// request is made.
    pub async fn resolve_publications(
        &self,
        identifier: &str,
    ) -> Result<(String, PublicationSet), Error> {
        let id = PdbId::parse(identifier)?;
        self.resolve(&id).await
    }

    /// Resolve a parsed identifier
    pub async fn resolve(&self, id: &PdbId) -> Result<(String, PublicationSet), Error> {
        let mut failures: Vec<(&str, SourceError)> = Vec::new();

        for source in &self.sources {
            match source.fetch_publications(id).await {
                Ok(set) => {
                    set.validate().map_err(|e| {
                        let detail = match e {
                            Error::UpstreamMalformed(detail) => detail,
                            other => other.to_string(),
                        };
                        Error::UpstreamMalformed(format!(
                            "{} result for '{}' is inconsistent: {}",
                            source.name(),
                            id,
                            detail
                        ))
                    })?;

                    tracing::info!(
                        "Resolved {} publication(s) for {} from {}",
                        set.len(),
                        id,
                        source.name()
                    );
                    return Ok((set.primary_title().to_string(), set));
                }
                Err(e) => {
                    tracing::warn!("{} lookup for {} failed: {}", source.name(), id, e);
                    failures.push((source.name(), e));
                }
            }
        }

        Err(classify_failures(id, &failures))
    }
}

/// Turn the per-source failures of a lookup into one caller-facing error.
///
/// Not found everywhere → `NotFound`; any source unreachable →
/// `NetworkUnavailable`; otherwise some source sent unusable data →
/// `UpstreamMalformed`.
fn classify_failures(id: &PdbId, failures: &[(&str, SourceError)]) -> Error {
    let summary = failures
        .iter()
        .map(|(name, e)| format!("{}: {}", name, e))
        .collect::<Vec<_>>()
        .join("; ");

    if failures.iter().all(|(_, e)| e.kind() == FailureKind::Missing) {
        Error::NotFound {
            identifier: id.to_string(),
        }
    } else if failures
        .iter()
        .any(|(_, e)| e.kind() == FailureKind::Unavailable)
    {
        Error::NetworkUnavailable {
            identifier: id.to_string(),
            reason: summary,
        }
    } else {
        Error::UpstreamMalformed(format!(
            "publication lookup failed for '{}': {}",
            id, summary
        ))
    }
}

/// Resolve an identifier against the public PDBe and RCSB services
pub async fn resolve_publications(identifier: &str) -> Result<(String, PublicationSet), Error> {
    PublicationResolver::new()?
        .resolve_publications(identifier)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Publication;
    use crate::sources::{MockResponse, MockSource};

    fn set_of(titles: &[&str]) -> PublicationSet {
        let mut set = PublicationSet::new(titles[0]);
        for (i, title) in titles.iter().enumerate() {
            set.insert(Publication::new(*title).primary(i == 0));
        }
        set
    }

    fn resolver(a: &Arc<MockSource>, b: &Arc<MockSource>) -> PublicationResolver {
        PublicationResolver::with_sources(vec![
            a.clone() as Arc<dyn PublicationSource>,
            b.clone() as Arc<dyn PublicationSource>,
        ])
    }

    #[tokio::test]
    async fn test_first_source_wins() {
        let a = Arc::new(MockSource::with_response(
            "a",
            MockResponse::Publications(set_of(&["T1", "T2"])),
        ));
        let b = Arc::new(MockSource::with_response(
            "b",
            MockResponse::Publications(set_of(&["Other"])),
        ));

        let (primary, set) = resolver(&a, &b).resolve_publications("1cbs").await.unwrap();
        assert_eq!(primary, "T1");
        assert_eq!(set.len(), 2);
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 0);
    }

    #[tokio::test]
    async fn test_falls_back_once() {
        let a = Arc::new(MockSource::with_response("a", MockResponse::Malformed));
        let b = Arc::new(MockSource::with_response(
            "b",
            MockResponse::Publications(set_of(&["T3"])),
        ));

        let (primary, set) = resolver(&a, &b).resolve_publications("1cbs").await.unwrap();
        assert_eq!(primary, "T3");
        assert!(set.get("T3").unwrap().is_primary);
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 1);
    }

    #[tokio::test]
    async fn test_blank_identifier_makes_no_calls() {
        let a = Arc::new(MockSource::new("a"));
        let b = Arc::new(MockSource::new("b"));

        let result = resolver(&a, &b).resolve_publications("   ").await;
        assert!(matches!(result, Err(Error::InvalidIdentifier)));
        assert_eq!(a.calls() + b.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_everywhere_is_not_found() {
        let a = Arc::new(MockSource::new("a"));
        let b = Arc::new(MockSource::new("b"));

        let result = resolver(&a, &b).resolve_publications("9zzz").await;
        match result {
            Err(Error::NotFound { identifier }) => assert_eq!(identifier, "9zzz"),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_source_is_network_unavailable() {
        let a = Arc::new(MockSource::with_response("a", MockResponse::Unavailable));
        let b = Arc::new(MockSource::new("b"));

        let result = resolver(&a, &b).resolve_publications("1cbs").await;
        let err = result.unwrap_err();
        assert!(matches!(err, Error::NetworkUnavailable { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_malformed_fallback_is_upstream_malformed() {
        let a = Arc::new(MockSource::new("a"));
        let b = Arc::new(MockSource::with_response("b", MockResponse::Malformed));

        let result = resolver(&a, &b).resolve_publications("1cbs").await;
        assert!(matches!(result, Err(Error::UpstreamMalformed(_))));
    }

    #[tokio::test]
    async fn test_invariant_violation_does_not_fall_back() {
        // Duplicate title later in the list overwrites the primary record
        let mut broken = PublicationSet::new("T1");
        broken.insert(Publication::new("T1").primary(true));
        broken.insert(Publication::new("T1"));

        let a = Arc::new(MockSource::with_response(
            "a",
            MockResponse::Publications(broken),
        ));
        let b = Arc::new(MockSource::with_response(
            "b",
            MockResponse::Publications(set_of(&["T3"])),
        ));

        let result = resolver(&a, &b).resolve_publications("1cbs").await;
        assert!(matches!(result, Err(Error::UpstreamMalformed(_))));
        assert_eq!(b.calls(), 0);
    }

    #[tokio::test]
    async fn test_primary_invariant_across_sizes() {
        for n in 1..=6 {
            let titles: Vec<String> = (0..n).map(|i| format!("Title {}", i)).collect();
            let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
            let a = Arc::new(MockSource::with_response(
                "a",
                MockResponse::Publications(set_of(&refs)),
            ));
            let b = Arc::new(MockSource::new("b"));

            let (primary, set) = resolver(&a, &b).resolve_publications("1abc").await.unwrap();
            assert_eq!(primary, "Title 0");
            assert!(set.get(&primary).unwrap().is_primary);
            assert_eq!(set.iter().filter(|p| p.is_primary).count(), 1);
        }
    }

    #[test]
    fn test_default_source_order() {
        let resolver = PublicationResolver::new().unwrap();
        assert_eq!(resolver.source_ids(), vec!["pdbe", "rcsb"]);
    }
}
