//! Long-term associative memory for the Mimir agent.
//!
//! Three independent retrieval surfaces share the record model from
//! `mimir-types`:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  MemoryGraphStore                                                       │
//! │  - typed nodes + predicate-labelled directed edges                      │
//! │  - content-dedup upsert, cosine/keyword search, bounded traversal       │
//! │  - JSON snapshot persistence (interop schema)                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │  DecayRecallIndex                                                       │
//! │  - injected Embedder + VectorIndex collaborators                        │
//! │  - weight = similarity × time_decay × trust_decay                       │
//! │  - diversity-bounded greedy selection                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │  MemoryRanker                                                           │
//! │  - additive importance/rhythm/recency/trust/failed scoring              │
//! │  - over an externally supplied AggregateMemory view                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The graph store and the recall index are deliberately separate identity
//! spaces; nothing reconciles node ids with item ids.
//!
//! # Usage
//!
//! ```no_run
//! use mimir_memory::MemoryGraphStore;
//! use mimir_types::{Metadata, MemoryRelationship, SparseVector};
//!
//! let mut store = MemoryGraphStore::open("memory_graph.json")?;
//!
//! // Write after an interaction turn; identical content dedups.
//! let plan = store.upsert(
//!     "ship the release on Friday",
//!     "plan",
//!     SparseVector::from([("M".to_string(), 0.8)]),
//!     Metadata::new(),
//! );
//! let risk = store.upsert("rollback window is short", "thought",
//!     SparseVector::new(), Metadata::new());
//! store.add_edge(MemoryRelationship::new(&risk.id, &plan.id, "supports"))?;
//!
//! // Query at prompt-construction time.
//! let hits = store.find_similar("release", 5, 0.2);
//! let context = store.traverse(&plan.id, None, 2);
//!
//! // Flush explicitly on paths that must not lose writes; Drop also does a
//! // best-effort save.
//! store.save()?;
//! # Ok::<(), mimir_memory::MemoryError>(())
//! ```
//!
//! Everything here is synchronous and single-threaded; injected
//! collaborators may block, and their failures propagate to the caller
//! without retries.

pub mod error;
pub mod graph;
pub mod ranker;
pub mod recall;
pub mod similarity;

pub use error::{MemoryError, Result};
pub use graph::{DEFAULT_GRAPH_PATH, MemoryGraphStore, Probe, StoreStats};
pub use ranker::{AggregateMemory, MemoryRanker};
pub use recall::{DecayConfig, DecayRecallIndex, Embedder, VectorIndex};
pub use similarity::cosine;

// Re-export the record model so most callers need a single crate.
pub use mimir_types::{
    DEFAULT_TRUST, Metadata, MemoryItem, MemoryNode, MemoryRecord, MemoryRelationship, RankRecord,
    SparseVector,
};
