//! PDBe publications-by-entry source.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::Error;
use crate::models::{AbstractSections, PdbId, Publication, PublicationSet};
use crate::sources::{get_json, PublicationSource, SourceError};
use crate::utils::HttpClient;

/// PDBe API base URL for entry publications
const PDBE_PUBLICATIONS_URL: &str = "https://www.ebi.ac.uk/pdbe/api/pdb/entry/publications";

/// PDBe publications source.
///
/// Responses are keyed by the lowercase entry id and list every publication
/// of the entry; the first listed publication is the primary citation.
#[derive(Debug, Clone)]
pub struct PdbeSource {
    client: HttpClient,
    base_url: String,
}

/// One publication as reported by PDBe
#[derive(Debug, Deserialize)]
struct PdbePublication {
    title: Option<String>,
    #[serde(default)]
    doi: Option<String>,
    #[serde(rename = "abstract", default)]
    abstract_sections: AbstractSections,
}

impl PdbeSource {
    /// Create a new PDBe source against the public API
    pub fn new() -> Result<Self, Error> {
        Ok(Self::with_client(HttpClient::new()?, PDBE_PUBLICATIONS_URL))
    }

    /// Create with a custom HTTP client and base URL
    pub fn with_client(client: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn build_url(&self, id: &PdbId) -> String {
        format!(
            "{}/{}",
            self.base_url,
            urlencoding::encode(&id.lowercase())
        )
    }

    /// Normalize a decoded PDBe response for the lowercase id `key`
    fn parse_publications(
        mut response: HashMap<String, Vec<PdbePublication>>,
        key: &str,
    ) -> Result<PublicationSet, SourceError> {
        let entries = response
            .remove(key)
            .ok_or_else(|| SourceError::NotFound(format!("PDBe response has no entry '{}'", key)))?;

        let mut titled = Vec::with_capacity(entries.len());
        for entry in entries {
            let title = entry
                .title
                .filter(|t| !t.trim().is_empty())
                .ok_or_else(|| {
                    SourceError::Malformed(format!("PDBe publication of '{}' has no title", key))
                })?;
            titled.push((title, entry.doi, entry.abstract_sections));
        }

        let primary_title = titled
            .first()
            .map(|(title, _, _)| title.clone())
            .ok_or_else(|| SourceError::NotFound(format!("PDBe lists no publications for '{}'", key)))?;

        let mut set = PublicationSet::new(primary_title);
        for (index, (title, doi, sections)) in titled.into_iter().enumerate() {
            set.insert(
                Publication::new(title)
                    .doi(doi)
                    .abstract_sections(sections)
                    .primary(index == 0),
            );
        }

        Ok(set)
    }
}

#[async_trait]
impl PublicationSource for PdbeSource {
    fn id(&self) -> &str {
        "pdbe"
    }

    fn name(&self) -> &str {
        "PDBe"
    }

    async fn fetch_publications(&self, id: &PdbId) -> Result<PublicationSet, SourceError> {
        let url = self.build_url(id);
        let response: HashMap<String, Vec<PdbePublication>> =
            get_json(&self.client, &url, self.name()).await?;

        Self::parse_publications(response, &id.lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str, key: &str) -> Result<PublicationSet, SourceError> {
        let response: HashMap<String, Vec<PdbePublication>> = serde_json::from_str(body).unwrap();
        PdbeSource::parse_publications(response, key)
    }

    #[test]
    fn test_first_entry_is_primary() {
        let body = r#"{"1cbs":[
            {"title":"T1","doi":"10.1/x","abstract":{"a":"text"}},
            {"title":"T2","doi":null,"abstract":{}}
        ]}"#;
        let set = parse(body, "1cbs").unwrap();

        assert_eq!(set.primary_title(), "T1");
        assert!(set.get("T1").unwrap().is_primary);
        assert!(!set.get("T2").unwrap().is_primary);
        assert_eq!(set.get("T1").unwrap().doi.as_deref(), Some("10.1/x"));
        assert_eq!(set.get("T1").unwrap().abstract_sections.get("a"), Some("text"));
        assert!(set.get("T2").unwrap().doi.is_none());
    }

    fn body_with_titles(key: &str, count: usize) -> String {
        let entries: Vec<serde_json::Value> = (0..count)
            .map(|i| {
                let doi = (i % 2 == 1).then(|| format!("10.1/{}", i));
                serde_json::json!({
                    "title": format!("Title {}", i),
                    "doi": doi,
                    "abstract": {"unassigned": format!("Abstract {}", i)},
                })
            })
            .collect();

        let mut body = serde_json::Map::new();
        body.insert(key.to_string(), serde_json::Value::Array(entries));
        serde_json::Value::Object(body).to_string()
    }

    #[test]
    fn test_exactly_one_primary_for_any_size() {
        for count in 1..=6 {
            let set = parse(&body_with_titles("1abc", count), "1abc").unwrap();

            assert_eq!(set.len(), count);
            assert_eq!(set.primary_title(), "Title 0");
            assert!(set.get(set.primary_title()).unwrap().is_primary);
            assert_eq!(set.iter().filter(|p| p.is_primary).count(), 1);
            assert!(set.validate().is_ok());
        }
    }

    #[test]
    fn test_zero_entries_is_not_found() {
        let result = parse(&body_with_titles("1abc", 0), "1abc");
        assert!(matches!(result, Err(SourceError::NotFound(_))));
    }

    #[test]
    fn test_duplicate_of_first_title_breaks_primary() {
        let body = r#"{"1cbs":[{"title":"T1"},{"title":"T2"},{"title":"T1"}]}"#;
        let set = parse(body, "1cbs").unwrap();

        assert_eq!(set.len(), 2);
        assert!(!set.get("T1").unwrap().is_primary);
        assert!(set.validate().is_err());
    }

    #[test]
    fn test_empty_list_is_not_found() {
        let result = parse(r#"{"1cbs":[]}"#, "1cbs");
        assert!(matches!(result, Err(SourceError::NotFound(_))));
    }

    #[test]
    fn test_missing_key_is_not_found() {
        let result = parse(r#"{"2abc":[{"title":"T"}]}"#, "1cbs");
        assert!(matches!(result, Err(SourceError::NotFound(_))));
    }

    #[test]
    fn test_untitled_publication_is_malformed() {
        let result = parse(r#"{"1cbs":[{"title":null}]}"#, "1cbs");
        assert!(matches!(result, Err(SourceError::Malformed(_))));
    }

    #[test]
    fn test_build_url_lowercases() {
        let source = PdbeSource::with_client(HttpClient::new().unwrap(), "http://host/pubs/");
        let id = PdbId::parse("1CBS").unwrap();
        assert_eq!(source.build_url(&id), "http://host/pubs/1cbs");
    }

    #[tokio::test]
    async fn test_fetch_against_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/1cbs")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"1cbs":[{"title":"Crystal structures of CRABP","doi":"10.1016/s0969-2126(94)00057-7","abstract":{"background":null,"unassigned":"Cellular retinoic acid binding proteins."}}]}"#)
            .create_async()
            .await;

        let source = PdbeSource::with_client(HttpClient::new().unwrap(), server.url());
        let set = source
            .fetch_publications(&PdbId::parse("1CBS").unwrap())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(set.len(), 1);
        let primary = set.primary().unwrap();
        assert!(primary.is_primary);
        assert_eq!(
            primary.abstract_sections.get("unassigned"),
            Some("Cellular retinoic acid binding proteins.")
        );
    }

    #[tokio::test]
    async fn test_fetch_404_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/0xyz")
            .with_status(404)
            .with_body("{}")
            .create_async()
            .await;

        let source = PdbeSource::with_client(HttpClient::new().unwrap(), server.url());
        let result = source
            .fetch_publications(&PdbId::parse("0xyz").unwrap())
            .await;
        assert!(matches!(result, Err(SourceError::NotFound(_))));
    }
}
