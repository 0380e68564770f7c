//! Multi-factor ranking over an aggregate memory view.
//!
//! The ranker is stateless: it pulls the `"M"`-tagged records from whatever
//! aggregate view it was handed and scores them additively from importance,
//! context match, recency, trust, and failure history.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::debug;

use mimir_types::{Metadata, RankRecord};

/// Aggregate memory accessor: records grouped into buckets by kind.
///
/// The ranker only reads the `"M"` bucket; other buckets belong to other
/// consumers of the same view.
pub trait AggregateMemory {
    fn all_records(&self) -> HashMap<String, Vec<RankRecord>>;
}

/// Stateless multi-factor memory scorer.
#[derive(Debug)]
pub struct MemoryRanker<M: AggregateMemory> {
    memory: M,
}

impl<M: AggregateMemory> MemoryRanker<M> {
    /// Create a ranker over the given aggregate view.
    pub fn new(memory: M) -> Self {
        Self { memory }
    }

    /// Rank the `"M"` records against a query context.
    ///
    /// Additive score per record:
    /// - `+0.3 · importance` when `meta.importance` is present (0.5 default
    ///   for non-numeric values)
    /// - `+0.2` when `meta.rhythm` equals the query's `rhythm`
    /// - `+0.2 · recency(timestamp)` when a timestamp is present
    /// - `+0.2` when `meta.trust ≥ 0.7`
    /// - `−0.5` when `meta.failed` is set
    ///
    /// Scores are rounded to three decimals before the descending sort, and
    /// the top `limit` records are returned without their score wrappers.
    pub fn rank(&self, query_vector: &Metadata, limit: usize) -> Vec<RankRecord> {
        let candidates = self
            .memory
            .all_records()
            .remove("M")
            .unwrap_or_default();

        let mut scored: Vec<(f32, RankRecord)> = candidates
            .into_iter()
            .map(|record| {
                let score = Self::score(&record, query_vector);
                (score, record)
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        debug!("Ranked {} candidate records (limit {})", scored.len(), limit);
        scored
            .into_iter()
            .take(limit)
            .map(|(_, record)| record)
            .collect()
    }

    /// Alias for [`rank`]: recommend memories for a context vector.
    ///
    /// [`rank`]: MemoryRanker::rank
    pub fn recommend(&self, context_vector: &Metadata, k: usize) -> Vec<RankRecord> {
        self.rank(context_vector, k)
    }

    fn score(record: &RankRecord, query_vector: &Metadata) -> f32 {
        let meta = &record.meta;
        let mut score = 0.0f32;

        if let Some(importance) = meta.get("importance") {
            score += 0.3 * importance.as_f64().unwrap_or(0.5) as f32;
        }

        if let (Some(rhythm), Some(query_rhythm)) = (meta.get("rhythm"), query_vector.get("rhythm"))
            && rhythm == query_rhythm
        {
            score += 0.2;
        }

        if let Some(timestamp) = &record.timestamp {
            score += 0.2 * recency(timestamp);
        }

        if meta.get("trust").and_then(|v| v.as_f64()).unwrap_or(0.0) >= 0.7 {
            score += 0.2;
        }

        if meta.get("failed").and_then(|v| v.as_bool()).unwrap_or(false) {
            // Previously failed memories are actively penalized.
            score -= 0.5;
        }

        (score * 1000.0).round() / 1000.0
    }
}

/// Recency of an ISO-8601 timestamp: `max(0, 1 − ln(1 + Δseconds) / 100)`.
///
/// Unparsable timestamps fall back to a neutral 0.5.
fn recency(timestamp: &str) -> f32 {
    let Some(then) = parse_timestamp(timestamp) else {
        return 0.5;
    };

    let elapsed = ((Utc::now() - then).num_milliseconds() as f64 / 1000.0).max(0.0);
    (1.0 - (1.0 + elapsed).ln() / 100.0).max(0.0) as f32
}

/// Accepts RFC 3339 timestamps and naive ISO datetimes (assumed UTC).
fn parse_timestamp(timestamp: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
