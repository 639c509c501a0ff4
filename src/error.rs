//! Crate-level error type.
//!
//! Source-specific failures ([`crate::sources::SourceError`]) stay inside the
//! resolver; everything a caller sees is an [`Error`].

/// Errors surfaced by the publication resolver and the question-answering adapter
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The identifier was blank after trimming
    #[error("Invalid identifier: PDB identifier must not be empty")]
    InvalidIdentifier,

    /// No source has publications for the identifier
    #[error("Publication lookup failed for '{identifier}': no publications found")]
    NotFound { identifier: String },

    /// At least one source could not be reached
    #[error("Publication lookup failed for '{identifier}': {reason}")]
    NetworkUnavailable { identifier: String, reason: String },

    /// Upstream data violated an invariant (e.g. no unique primary citation)
    #[error("Malformed response: {0}")]
    UpstreamMalformed(String),

    /// A context selection named a title that is not in the publication set
    #[error("Unknown publication: {0}")]
    UnknownPublication(String),

    /// The question was blank after trimming
    #[error("Invalid question: question must not be empty")]
    InvalidQuestion,

    /// Unsupported provider, provider used for an unsupported capability, or missing credential
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A call to an embedding or generation provider failed
    #[error("{provider} request failed: {message}")]
    TransientProvider { provider: String, message: String },

    /// The HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Http(String),
}

impl Error {
    /// Whether the caller may reasonably retry the same operation later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::NetworkUnavailable { .. } | Error::TransientProvider { .. }
        )
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;
