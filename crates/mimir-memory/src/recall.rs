//! Decay-weighted recall over an embedding-addressable item store.
//!
//! The index is backend-agnostic: callers inject an [`Embedder`] and a
//! [`VectorIndex`], so any embedding model or ANN engine can sit behind the
//! same recall algorithm. Recall weight is similarity multiplied by time
//! decay and trust decay, followed by a diversity-bounded greedy pick.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use mimir_types::{DEFAULT_TRUST, Metadata, MemoryItem, now};

use crate::error::{MemoryError, Result};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Candidates fetched from the vector index per recall, before decay
/// weighting and diversity filtering.
const OVERSAMPLE: usize = 16;

// ─────────────────────────────────────────────────────────────────────────────
// Collaborator traits
// ─────────────────────────────────────────────────────────────────────────────

/// Turns text into a dense embedding vector.
///
/// Implementations may block (e.g. a network-bound model host); no timeout
/// or retry is applied at this layer and failures propagate to the caller.
pub trait Embedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// A vector index that stores embeddings by id and answers nearest-neighbor
/// queries with `(id, similarity)` pairs ordered by the backend.
pub trait VectorIndex {
    fn add(&mut self, id: &str, vector: &[f32]) -> Result<()>;
    fn search(&self, vector: &[f32], k: usize) -> Result<Vec<(String, f32)>>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Decay configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Decay tuning: γ governs time decay per day, β governs trust decay.
#[derive(Debug, Clone, Copy)]
pub struct DecayConfig {
    /// Per-day exponential time decay rate.
    pub time_gamma: f32,
    /// Trust decay sharpness; higher values punish low trust harder.
    pub trust_beta: f32,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            time_gamma: 0.03,
            trust_beta: 0.4,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Recall index
// ─────────────────────────────────────────────────────────────────────────────

/// Embedding-addressable memory with decay-weighted, diversity-bounded
/// recall.
///
/// Items form an identity space of their own (sequential `M%06d` ids); they
/// are never reconciled with graph-store node ids.
pub struct DecayRecallIndex {
    embedder: Box<dyn Embedder>,
    index: Box<dyn VectorIndex>,
    items: HashMap<String, MemoryItem>,
    config: DecayConfig,
}

impl DecayRecallIndex {
    /// Create an index with default decay configuration.
    pub fn new(embedder: Box<dyn Embedder>, index: Box<dyn VectorIndex>) -> Self {
        Self::with_config(embedder, index, DecayConfig::default())
    }

    /// Create an index with explicit γ/β overrides.
    pub fn with_config(
        embedder: Box<dyn Embedder>,
        index: Box<dyn VectorIndex>,
        config: DecayConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            items: HashMap::new(),
            config,
        }
    }

    /// Embed `text`, store it as a new item, and register the vector with
    /// the backing index. Returns the assigned id.
    pub fn add(&mut self, text: &str, meta: Metadata, trust: f32) -> Result<String> {
        let vector = self.embedder.embed(text)?;
        let id = format!("M{:06}", self.items.len() + 1);

        let item = MemoryItem {
            id: id.clone(),
            text: text.to_string(),
            vector: vector.clone(),
            meta,
            ts: now(),
            trust,
        };
        self.items.insert(id.clone(), item);
        self.index.add(&id, &vector)?;

        debug!("Added item {} ({} chars)", id, text.len());
        Ok(id)
    }

    /// Shorthand for [`add`] with the default trust of 0.7.
    ///
    /// [`add`]: DecayRecallIndex::add
    pub fn add_default(&mut self, text: &str) -> Result<String> {
        self.add(text, Metadata::new(), DEFAULT_TRUST)
    }

    /// Recall the best non-redundant items for `query`.
    ///
    /// Fetches an oversampled candidate set, weights each candidate by
    /// `similarity * time_decay * trust_decay`, sorts descending, then
    /// greedily accepts candidates whose leading words do not overlap an
    /// already-accepted item. Selection stops as soon as either `k` or
    /// `diversity` items are accepted — whichever bound is hit first, so
    /// `diversity < k` deliberately returns fewer than `k` items. The bound
    /// is checked after each acceptance, so a zero `k` or `diversity` still
    /// yields one item when any candidate survives the redundancy filter;
    /// existing callers rank with that behavior, so it stays.
    pub fn recall(&self, query: &str, k: usize, diversity: usize) -> Result<Vec<MemoryItem>> {
        let query_vector = self.embedder.embed(query)?;
        let hits = self.index.search(&query_vector, OVERSAMPLE)?;

        let mut scored: Vec<(f32, &MemoryItem)> = Vec::with_capacity(hits.len());
        for (id, similarity) in hits {
            let item = self
                .items
                .get(&id)
                .ok_or_else(|| MemoryError::UnknownItem(id.clone()))?;
            let weight = similarity * self.time_decay(item.ts) * self.trust_decay(item.trust);
            scored.push((weight, item));
        }

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut picked: Vec<MemoryItem> = Vec::new();
        for (_, item) in scored {
            if !Self::redundant(item, &picked) {
                picked.push(item.clone());
            }
            if picked.len() >= k || picked.len() >= diversity {
                break;
            }
        }

        debug!("Recall picked {} items for query ({k}/{diversity})", picked.len());
        Ok(picked)
    }

    /// Exponential time decay against recall-time now: `exp(-γ · age_days)`.
    pub fn time_decay(&self, ts: f64) -> f32 {
        let age_days = ((now() - ts) / SECONDS_PER_DAY) as f32;
        (-self.config.time_gamma * age_days).exp()
    }

    /// Trust decay `exp(β · (trust − 1))`: approaches 1.0 as trust → 1 and
    /// down-weights low-trust items. Strictly increasing in trust.
    pub fn trust_decay(&self, trust: f32) -> f32 {
        (self.config.trust_beta * (trust - 1.0)).exp()
    }

    /// Redundancy check: the first four whitespace-separated lowercase words
    /// of the candidate share any word with those of an accepted item.
    fn redundant(item: &MemoryItem, pool: &[MemoryItem]) -> bool {
        let lead = leading_words(&item.text);
        pool.iter()
            .any(|p| leading_words(&p.text).intersection(&lead).next().is_some())
    }

    /// Get an item by id.
    pub fn get(&self, id: &str) -> Option<&MemoryItem> {
        self.items.get(id)
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the index holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn leading_words(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .take(4)
        .map(str::to_string)
        .collect()
}

impl std::fmt::Debug for DecayRecallIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecayRecallIndex")
            .field("items", &self.items.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Maps known phrases to fixed vectors; everything else embeds to the
    /// query axis so tests can steer similarity precisely.
    struct StubEmbedder;

    impl Embedder for StubEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            // Three orthogonal topic axes keyed by a marker word.
            let vector = if text.contains("alpha") {
                vec![1.0, 0.0, 0.0]
            } else if text.contains("beta") {
                vec![0.0, 1.0, 0.0]
            } else {
                vec![0.0, 0.0, 1.0]
            };
            Ok(vector)
        }
    }

    /// Brute-force cosine index over dense vectors.
    #[derive(Default)]
    struct MockIndex {
        entries: Vec<(String, Vec<f32>)>,
    }

    impl VectorIndex for MockIndex {
        fn add(&mut self, id: &str, vector: &[f32]) -> Result<()> {
            self.entries.push((id.to_string(), vector.to_vec()));
            Ok(())
        }

        fn search(&self, vector: &[f32], k: usize) -> Result<Vec<(String, f32)>> {
            let mut hits: Vec<(String, f32)> = self
                .entries
                .iter()
                .map(|(id, v)| (id.clone(), dense_cosine(v, vector)))
                .collect();
            hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            hits.truncate(k);
            Ok(hits)
        }
    }

    fn dense_cosine(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if na == 0.0 || nb == 0.0 {
            return 0.0;
        }
        dot / (na * nb)
    }

    struct FailingEmbedder;

    impl Embedder for FailingEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(MemoryError::Embedding("model host unreachable".to_string()))
        }
    }

    fn test_index() -> DecayRecallIndex {
        DecayRecallIndex::new(Box::new(StubEmbedder), Box::new(MockIndex::default()))
    }

    #[test]
    fn test_add_assigns_sequential_ids() {
        let mut index = test_index();
        assert_eq!(index.add_default("alpha one").unwrap(), "M000001");
        assert_eq!(index.add_default("beta two").unwrap(), "M000002");
        assert_eq!(index.len(), 2);

        let item = index.get("M000001").unwrap();
        assert_eq!(item.text, "alpha one");
        assert_eq!(item.trust, DEFAULT_TRUST);
    }

    #[test]
    fn test_recall_prefers_matching_topic() {
        let mut index = test_index();
        index.add_default("alpha release notes").unwrap();
        index.add_default("beta testing schedule").unwrap();

        let picked = index.recall("alpha question", 5, 5).unwrap();
        assert_eq!(picked[0].text, "alpha release notes");
    }

    #[test]
    fn test_recall_diversity_bound_dominates_k() {
        // Two high-scoring, non-redundant candidates; diversity=1 still
        // caps the result at a single item.
        let mut index = test_index();
        index.add_default("alpha deployment checklist").unwrap();
        index.add_default("alpha rollback procedure").unwrap();

        let picked = index.recall("alpha", 5, 1).unwrap();
        assert_eq!(picked.len(), 1);
    }

    #[test]
    fn test_recall_filters_redundant_leading_words() {
        let mut index = test_index();
        index.add_default("alpha launch plan draft").unwrap();
        index.add_default("alpha launch retro notes").unwrap();
        index.add_default("beta capacity report").unwrap();

        let picked = index.recall("alpha", 5, 5).unwrap();
        // The second "alpha launch ..." item shares leading words with the
        // first and is rejected; the beta item survives.
        let texts: Vec<&str> = picked.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts.len(), 2);
        assert!(texts.iter().filter(|t| t.starts_with("alpha launch")).count() == 1);
    }

    #[test]
    fn test_recall_k_bound() {
        let mut index = test_index();
        index.add_default("alpha one").unwrap();
        index.add_default("beta two").unwrap();
        index.add_default("gamma three").unwrap();

        let picked = index.recall("alpha", 2, 5).unwrap();
        assert_eq!(picked.len(), 2);
    }

    #[test]
    fn test_low_trust_ranks_below_high_trust() {
        let mut index = test_index();
        index.add("alpha trusted note", Metadata::new(), 1.0).unwrap();
        index.add("alpha dubious rumor", Metadata::new(), 0.1).unwrap();

        let picked = index.recall("alpha", 5, 5).unwrap();
        assert_eq!(picked[0].text, "alpha trusted note");
    }

    #[test]
    fn test_time_decay_monotonic_in_age() {
        let index = test_index();
        let t = now();
        let young = index.time_decay(t - SECONDS_PER_DAY);
        let old = index.time_decay(t - 30.0 * SECONDS_PER_DAY);
        assert!(young > old);
        assert!(young <= 1.0 + 1e-6);
    }

    #[test]
    fn test_trust_decay_monotonic_in_trust() {
        let index = test_index();
        let high = index.trust_decay(1.0);
        let mid = index.trust_decay(0.5);
        let low = index.trust_decay(0.0);
        assert!((high - 1.0).abs() < 1e-6);
        assert!(high > mid && mid > low);
    }

    #[test]
    fn test_decay_config_overrides() {
        let config = DecayConfig {
            time_gamma: 0.5,
            trust_beta: 2.0,
        };
        let sharp = DecayRecallIndex::with_config(
            Box::new(StubEmbedder),
            Box::new(MockIndex::default()),
            config,
        );
        let soft = test_index();

        let t = now() - 10.0 * SECONDS_PER_DAY;
        assert!(sharp.time_decay(t) < soft.time_decay(t));
        assert!(sharp.trust_decay(0.3) < soft.trust_decay(0.3));
    }

    #[test]
    fn test_embedder_failure_propagates() {
        let mut index =
            DecayRecallIndex::new(Box::new(FailingEmbedder), Box::new(MockIndex::default()));
        let err = index.add_default("anything").unwrap_err();
        assert!(matches!(err, MemoryError::Embedding(_)));
        assert!(index.is_empty());
    }

    #[test]
    fn test_recall_unknown_index_id_is_an_error() {
        struct GhostIndex;
        impl VectorIndex for GhostIndex {
            fn add(&mut self, _id: &str, _vector: &[f32]) -> Result<()> {
                Ok(())
            }
            fn search(&self, _vector: &[f32], _k: usize) -> Result<Vec<(String, f32)>> {
                Ok(vec![("M999999".to_string(), 0.9)])
            }
        }

        let index = DecayRecallIndex::new(Box::new(StubEmbedder), Box::new(GhostIndex));
        let err = index.recall("alpha", 5, 5).unwrap_err();
        assert!(matches!(err, MemoryError::UnknownItem(_)));
    }

    #[test]
    fn test_recall_empty_index() {
        let index = test_index();
        assert!(index.recall("alpha", 5, 5).unwrap().is_empty());
    }

    #[test]
    fn test_recall_zero_bound_still_accepts_one_item() {
        // The k/diversity bound is only checked after an acceptance, so a
        // zero bound caps the result at one item rather than zero.
        let mut index = test_index();
        index.add_default("alpha one").unwrap();
        index.add_default("beta two").unwrap();

        assert_eq!(index.recall("alpha", 0, 5).unwrap().len(), 1);
        assert_eq!(index.recall("alpha", 5, 0).unwrap().len(), 1);
    }
}
