//! # PDB GPT
//!
//! Resolves a Protein Data Bank entry into the publications that describe it
//! and answers natural-language questions about a selection of them.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (PdbId, Publication, PublicationSet, ContextSelection)
//! - [`sources`]: Publication sources (PDBe, RCSB) behind the [`PublicationSource`] trait
//! - [`resolver`]: Ordered fallback across sources
//! - [`qa`]: Embedding, retrieval and answer synthesis over selected publications
//! - [`ui`]: Terminal rendering for the `pdb-gpt` binary
//! - [`utils`]: HTTP client, memo cache and text wrapping
//! - [`config`]: Configuration management

pub mod config;
pub mod error;
pub mod models;
pub mod qa;
pub mod resolver;
pub mod sources;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use error::{Error, Result};
pub use models::{ContextSelection, PdbId, Publication, PublicationSet};
pub use qa::{build_index, create_engine, query, IndexedEngine, QaCache, QaEngine};
pub use resolver::{resolve_publications, PublicationResolver};
pub use sources::{PublicationSource, SourceError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
