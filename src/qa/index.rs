//! Ephemeral in-memory vector index.

/// Splits documents into overlapping word windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    size_words: usize,
    overlap_words: usize,
}

impl Chunker {
    /// `overlap_words` is clamped below `size_words`
    pub fn new(size_words: usize, overlap_words: usize) -> Self {
        let size_words = size_words.max(1);
        Self {
            size_words,
            overlap_words: overlap_words.min(size_words - 1),
        }
    }

    /// Split a document into chunks; blank documents produce no chunks
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return Vec::new();
        }
        if words.len() <= self.size_words {
            return vec![text.trim().to_string()];
        }

        let step = self.size_words - self.overlap_words;
        let mut chunks = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.size_words).min(words.len());
            chunks.push(words[start..end].join(" "));
            if end == words.len() {
                break;
            }
            start += step;
        }
        chunks
    }
}

/// A chunk returned by a similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk<'a> {
    pub text: &'a str,
    pub score: f32,
}

#[derive(Debug, Clone)]
struct IndexEntry {
    text: String,
    embedding: Vec<f32>,
}

/// Chunks with their embeddings
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair texts with embeddings; returns `None` if the counts differ
    pub fn from_parts(texts: Vec<String>, embeddings: Vec<Vec<f32>>) -> Option<Self> {
        if texts.len() != embeddings.len() {
            return None;
        }
        Some(Self {
            entries: texts
                .into_iter()
                .zip(embeddings)
                .map(|(text, embedding)| IndexEntry { text, embedding })
                .collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `k` chunks most similar to `query`, best first.
    ///
    /// Equal scores keep insertion order.
    pub fn top_k(&self, query: &[f32], k: usize) -> Vec<ScoredChunk<'_>> {
        let mut scored: Vec<ScoredChunk<'_>> = self
            .entries
            .iter()
            .map(|entry| ScoredChunk {
                text: &entry.text,
                score: cosine_similarity(query, &entry.embedding),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }
}

/// Cosine similarity; zero for mismatched lengths or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_document_is_one_chunk() {
        let chunker = Chunker::new(10, 2);
        assert_eq!(chunker.chunk("  retinoic acid  "), vec!["retinoic acid"]);
        assert!(chunker.chunk("   ").is_empty());
    }

    #[test]
    fn test_long_document_overlaps() {
        let chunker = Chunker::new(4, 1);
        let chunks = chunker.chunk("a b c d e f g");
        assert_eq!(chunks, vec!["a b c d", "d e f g"]);
    }

    #[test]
    fn test_overlap_is_clamped() {
        let chunker = Chunker::new(2, 5);
        let chunks = chunker.chunk("a b c");
        assert_eq!(chunks, vec!["a b", "b c"]);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_top_k_orders_by_similarity() {
        let index = VectorIndex::from_parts(
            vec!["x".to_string(), "y".to_string(), "xy".to_string()],
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]],
        )
        .unwrap();

        let hits = index.top_k(&[1.0, 0.1], 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "x");
        assert_eq!(hits[1].text, "xy");
    }

    #[test]
    fn test_from_parts_rejects_mismatch() {
        assert!(VectorIndex::from_parts(vec!["a".to_string()], vec![]).is_none());
    }
}
