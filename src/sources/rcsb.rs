//! RCSB Data API source.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Error;
use crate::models::{AbstractSections, PdbId, Publication, PublicationSet};
use crate::sources::{get_json, PublicationSource, SourceError};
use crate::utils::HttpClient;

/// RCSB Data API core base URL
const RCSB_CORE_URL: &str = "https://data.rcsb.org/rest/v1/core";

/// Citation id RCSB uses for the entry's primary citation
const PRIMARY_CITATION_ID: &str = "primary";

/// RCSB source.
///
/// Combines the entry record (citation titles) with the PubMed record
/// (DOI and abstract). Only the primary citation is described.
#[derive(Debug, Clone)]
pub struct RcsbSource {
    client: HttpClient,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct RcsbEntry {
    #[serde(default)]
    citation: Vec<RcsbCitation>,
}

#[derive(Debug, Deserialize)]
struct RcsbCitation {
    id: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RcsbPubmed {
    #[serde(default)]
    rcsb_pubmed_doi: Option<String>,
    #[serde(default)]
    rcsb_pubmed_abstract_text: Option<String>,
}

impl RcsbSource {
    /// Create a new RCSB source against the public API
    pub fn new() -> Result<Self, Error> {
        Ok(Self::with_client(HttpClient::new()?, RCSB_CORE_URL))
    }

    /// Create with a custom HTTP client and base URL
    pub fn with_client(client: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn entry_url(&self, id: &PdbId) -> String {
        format!("{}/entry/{}", self.base_url, urlencoding::encode(id.as_str()))
    }

    fn pubmed_url(&self, id: &PdbId) -> String {
        format!("{}/pubmed/{}", self.base_url, urlencoding::encode(id.as_str()))
    }

    /// Build a single-record set from the primary citation
    fn parse_publications(
        entry: RcsbEntry,
        pubmed: RcsbPubmed,
        id: &PdbId,
    ) -> Result<PublicationSet, SourceError> {
        let mut primaries = entry
            .citation
            .into_iter()
            .filter(|c| c.id.as_deref() == Some(PRIMARY_CITATION_ID));

        let primary = match (primaries.next(), primaries.next()) {
            (Some(primary), None) => primary,
            (None, _) => {
                return Err(SourceError::Malformed(format!(
                    "RCSB entry '{}' has no primary citation",
                    id
                )))
            }
            (Some(_), Some(_)) => {
                return Err(SourceError::Malformed(format!(
                    "RCSB entry '{}' has {} citations tagged primary",
                    id,
                    2 + primaries.count()
                )))
            }
        };

        let title = primary
            .title
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                SourceError::Malformed(format!("RCSB primary citation of '{}' has no title", id))
            })?;

        let mut sections = AbstractSections::new();
        sections.insert("abstract", pubmed.rcsb_pubmed_abstract_text);

        let mut set = PublicationSet::new(title.clone());
        set.insert(
            Publication::new(title)
                .doi(pubmed.rcsb_pubmed_doi)
                .abstract_sections(sections)
                .primary(true),
        );

        Ok(set)
    }
}

#[async_trait]
impl PublicationSource for RcsbSource {
    fn id(&self) -> &str {
        "rcsb"
    }

    fn name(&self) -> &str {
        "RCSB PDB"
    }

    async fn fetch_publications(&self, id: &PdbId) -> Result<PublicationSet, SourceError> {
        let entry_url = self.entry_url(id);
        let pubmed_url = self.pubmed_url(id);

        let (entry, pubmed) = tokio::join!(
            get_json::<RcsbEntry>(&self.client, &entry_url, "RCSB entry"),
            get_json::<RcsbPubmed>(&self.client, &pubmed_url, "RCSB pubmed"),
        );

        Self::parse_publications(entry?, pubmed?, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(entry: &str, pubmed: &str) -> Result<PublicationSet, SourceError> {
        RcsbSource::parse_publications(
            serde_json::from_str(entry).unwrap(),
            serde_json::from_str(pubmed).unwrap(),
            &PdbId::parse("1CBS").unwrap(),
        )
    }

    #[test]
    fn test_primary_citation_only() {
        let set = parse(
            r#"{"citation":[{"id":"1","title":"Other"},{"id":"primary","title":"T3"}]}"#,
            r#"{"rcsb_pubmed_doi":null,"rcsb_pubmed_abstract_text":"abs"}"#,
        )
        .unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(set.primary_title(), "T3");
        let record = set.get("T3").unwrap();
        assert!(record.is_primary);
        assert!(record.doi.is_none());
        assert_eq!(record.abstract_sections.len(), 1);
        assert_eq!(record.abstract_sections.get("abstract"), Some("abs"));
    }

    #[test]
    fn test_missing_abstract_keeps_section() {
        let set = parse(
            r#"{"citation":[{"id":"primary","title":"T"}]}"#,
            r#"{"rcsb_pubmed_doi":"10.2/y"}"#,
        )
        .unwrap();
        let record = set.get("T").unwrap();
        assert!(record.abstract_sections.contains("abstract"));
        assert_eq!(record.abstract_sections.get("abstract"), None);
        assert_eq!(record.doi.as_deref(), Some("10.2/y"));
    }

    #[test]
    fn test_no_primary_is_malformed() {
        let result = parse(r#"{"citation":[{"id":"1","title":"T"}]}"#, "{}");
        assert!(matches!(result, Err(SourceError::Malformed(_))));
    }

    #[test]
    fn test_multiple_primaries_is_malformed() {
        let result = parse(
            r#"{"citation":[{"id":"primary","title":"A"},{"id":"primary","title":"B"}]}"#,
            "{}",
        );
        match result {
            Err(SourceError::Malformed(msg)) => assert!(msg.contains("2 citations")),
            other => panic!("expected malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_urls_keep_raw_identifier() {
        let source = RcsbSource::with_client(HttpClient::new().unwrap(), "http://host/core");
        let id = PdbId::parse("1CBS").unwrap();
        assert_eq!(source.entry_url(&id), "http://host/core/entry/1CBS");
        assert_eq!(source.pubmed_url(&id), "http://host/core/pubmed/1CBS");
    }

    #[tokio::test]
    async fn test_fetch_requires_both_records() {
        let mut server = mockito::Server::new_async().await;
        let _entry = server
            .mock("GET", "/entry/1CBS")
            .with_status(200)
            .with_body(r#"{"citation":[{"id":"primary","title":"T3"}]}"#)
            .create_async()
            .await;
        let _pubmed = server
            .mock("GET", "/pubmed/1CBS")
            .with_status(404)
            .create_async()
            .await;

        let source = RcsbSource::with_client(HttpClient::new().unwrap(), server.url());
        let result = source
            .fetch_publications(&PdbId::parse("1CBS").unwrap())
            .await;
        assert!(matches!(result, Err(SourceError::NotFound(_))));
    }
}
