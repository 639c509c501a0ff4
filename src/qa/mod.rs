//! Question answering over selected publication snippets.
//!
//! A [`QaEngine`] pairs an embedding provider with a generation provider.
//! [`QaEngine::build_index`] chunks and embeds the snippets into an in-memory
//! index; [`IndexedEngine::query`] retrieves the closest chunks and answers by
//! tree summarization. [`QaCache`] memoizes both steps.

mod cache;
mod client;
mod engine;
mod index;
mod provider;
mod synthesize;

pub use cache::QaCache;
pub use engine::{build_index, create_engine, query, IndexedEngine, QaEngine, RetrievalSettings};
pub use index::{cosine_similarity, Chunker, ScoredChunk, VectorIndex};
pub use provider::{select_providers, EmbeddingConfig, GenerationConfig, Provider, ProviderConfig};
pub use synthesize::EMPTY_RESPONSE;
