//! Mock source for testing purposes.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::models::{PdbId, PublicationSet};
use crate::sources::{PublicationSource, SourceError};

/// Canned outcome returned by a [`MockSource`]
#[derive(Debug, Clone)]
pub enum MockResponse {
    Publications(PublicationSet),
    NotFound,
    Unavailable,
    Malformed,
}

/// A mock source for testing that returns a predefined response and counts calls.
#[derive(Debug)]
pub struct MockSource {
    id: String,
    response: Mutex<MockResponse>,
    calls: AtomicUsize,
}

impl MockSource {
    /// Create a new mock source that reports "not found" until configured.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            response: Mutex::new(MockResponse::NotFound),
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a mock source with a response already configured.
    pub fn with_response(id: impl Into<String>, response: MockResponse) -> Self {
        let source = Self::new(id);
        source.set_response(response);
        source
    }

    /// Set the response to return.
    pub fn set_response(&self, response: MockResponse) {
        let mut guard = self.response.lock().unwrap_or_else(|e| e.into_inner());
        *guard = response;
    }

    /// Number of times `fetch_publications` has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PublicationSource for MockSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Mock Source"
    }

    async fn fetch_publications(&self, id: &PdbId) -> Result<PublicationSet, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response = self
            .response
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        match response {
            MockResponse::Publications(set) => Ok(set),
            MockResponse::NotFound => Err(SourceError::NotFound(format!("mock: {}", id))),
            MockResponse::Unavailable => {
                Err(SourceError::Network("mock: connection refused".to_string()))
            }
            MockResponse::Malformed => {
                Err(SourceError::Malformed("mock: inconsistent record".to_string()))
            }
        }
    }
}
