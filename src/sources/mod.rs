//! Publication metadata sources.
//!
//! Every source implements [`PublicationSource`] and normalizes its upstream
//! format into a [`PublicationSet`]. Two live sources exist:
//!
//! - [`PdbeSource`]: PDBe publications-by-entry API, which lists every
//!   publication of an entry with structured abstracts
//! - [`RcsbSource`]: RCSB Data API, which only describes the primary citation
//!
//! The [`crate::resolver::PublicationResolver`] tries them in that order.

mod mock;
mod pdbe;
mod rcsb;

pub use mock::{MockResponse, MockSource};
pub use pdbe::PdbeSource;
pub use rcsb::RcsbSource;

use crate::models::{PdbId, PublicationSet};
use crate::utils::HttpClient;
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// A remote service that can list the publications of a PDB entry
#[async_trait]
pub trait PublicationSource: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this source (e.g. "pdbe", "rcsb")
    fn id(&self) -> &str;

    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// Fetch and normalize the publications of an entry.
    ///
    /// Implementations issue each upstream request once and never retry.
    async fn fetch_publications(&self, id: &PdbId) -> Result<PublicationSet, SourceError>;
}

/// Errors that can occur when querying a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Transport failure or timeout
    #[error("Network error: {0}")]
    Network(String),

    /// The source has no publications for the entry
    #[error("Not found: {0}")]
    NotFound(String),

    /// Non-success HTTP status other than 404
    #[error("API error [{status}]: {message}")]
    Api { status: u16, message: String },

    /// Body could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Body parsed but its content is inconsistent
    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Coarse classification used when every source has failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The source answered that it does not know the entry
    Missing,
    /// The source could not be reached or is temporarily failing
    Unavailable,
    /// The source answered with unusable data
    Malformed,
}

impl SourceError {
    pub fn kind(&self) -> FailureKind {
        match self {
            SourceError::Network(_) => FailureKind::Unavailable,
            SourceError::NotFound(_) => FailureKind::Missing,
            SourceError::Api { status, .. } if *status == 429 || *status >= 500 => {
                FailureKind::Unavailable
            }
            SourceError::Api { .. } => FailureKind::Missing,
            SourceError::Parse(_) | SourceError::Malformed(_) => FailureKind::Malformed,
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

/// GET a URL and decode its JSON body, mapping statuses onto [`SourceError`]
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &HttpClient,
    url: &str,
    source_name: &str,
) -> Result<T, SourceError> {
    tracing::debug!("{} request: {}", source_name, url);

    let response = client
        .client()
        .get(url)
        .send()
        .await
        .map_err(|e| SourceError::Network(format!("{} request failed: {}", source_name, e)))?;

    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(SourceError::NotFound(format!(
            "{} returned 404 for {}",
            source_name, url
        )));
    }
    if !status.is_success() {
        return Err(SourceError::Api {
            status: status.as_u16(),
            message: format!("{} returned status: {}", source_name, status),
        });
    }

    let body = response.text().await.map_err(|e| {
        SourceError::Network(format!("Failed to read {} response: {}", source_name, e))
    })?;

    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kinds() {
        assert_eq!(
            SourceError::Network("timeout".into()).kind(),
            FailureKind::Unavailable
        );
        assert_eq!(
            SourceError::NotFound("404".into()).kind(),
            FailureKind::Missing
        );
        assert_eq!(
            SourceError::Api {
                status: 503,
                message: String::new()
            }
            .kind(),
            FailureKind::Unavailable
        );
        assert_eq!(
            SourceError::Api {
                status: 429,
                message: String::new()
            }
            .kind(),
            FailureKind::Unavailable
        );
        assert_eq!(
            SourceError::Api {
                status: 400,
                message: String::new()
            }
            .kind(),
            FailureKind::Missing
        );
        assert_eq!(
            SourceError::Malformed("two primaries".into()).kind(),
            FailureKind::Malformed
        );
    }

    #[test]
    fn test_serde_error_maps_to_parse() {
        let err: SourceError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, SourceError::Parse(_)));
    }
}
