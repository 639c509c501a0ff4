//! Memoization of indexed engines and answers.

use std::sync::Arc;

use crate::error::Error;
use crate::qa::engine::{IndexedEngine, QaEngine};
use crate::utils::{cache_key, CacheResult, MemoCache};

/// Caches indexed engines by (engine, snippets) and answers by (index, question).
///
/// Both maps are unbounded and only emptied by [`QaCache::clear`]. Failed
/// builds and failed answers are not cached.
#[derive(Debug)]
pub struct QaCache {
    engines: MemoCache<Arc<IndexedEngine>>,
    answers: MemoCache<String>,
}

impl Default for QaCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QaCache {
    pub fn new() -> Self {
        Self {
            engines: MemoCache::new("engines"),
            answers: MemoCache::new("answers"),
        }
    }

    /// Indexed engine for `snippets`, building it on first use
    pub async fn indexed_engine(
        &self,
        engine: &QaEngine,
        snippets: &[String],
    ) -> Result<Arc<IndexedEngine>, Error> {
        let key = cache_key(
            std::iter::once(engine.fingerprint()).chain(snippets.iter().map(String::as_str)),
        );
        if let CacheResult::Hit(indexed) = self.engines.get(&key) {
            return Ok(indexed);
        }

        let indexed = Arc::new(engine.build_index(snippets).await?);
        self.engines.insert(key, indexed.clone());
        Ok(indexed)
    }

    /// Answer for `question`, querying the engine on first use
    pub async fn answer(&self, engine: &IndexedEngine, question: &str) -> Result<String, Error> {
        let key = cache_key([engine.id(), question.trim()]);
        if let CacheResult::Hit(answer) = self.answers.get(&key) {
            return Ok(answer);
        }

        let answer = engine.query(question).await?;
        self.answers.insert(key, answer.clone());
        Ok(answer)
    }

    pub fn engine_count(&self) -> usize {
        self.engines.len()
    }

    pub fn answer_count(&self) -> usize {
        self.answers.len()
    }

    /// Drop every cached engine and answer
    pub fn clear(&self) {
        self.engines.clear();
        self.answers.clear();
    }
}
