//! Shared types for the Mimir memory subsystem.
//!
//! Two independent identity spaces live here on purpose:
//! - [`MemoryNode`] / [`MemoryRelationship`]: the associative graph store's
//!   records, with sparse dimension weights and open metadata.
//! - [`MemoryItem`]: the decay-weighted recall index's records, with dense
//!   embedding vectors and sequential index-local ids.
//!
//! The two are never reconciled automatically; [`MemoryRecord`] provides the
//! common read surface for code that only needs text, metadata, and age.

pub mod memory;

pub use memory::{
    DEFAULT_TRUST, Metadata, MemoryItem, MemoryNode, MemoryRecord, MemoryRelationship, RankRecord,
    SparseVector,
};

use chrono::Utc;
use uuid::Uuid;

/// Current wall-clock time as fractional unix seconds.
pub fn now() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Generate a short prefixed id, e.g. `N_1f3a9c0d`.
///
/// Eight hex characters of a v4 UUID are plenty at agent-session scale and
/// keep snapshot files readable.
pub fn short_id(prefix: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{}_{}", prefix, &hex[..8])
}
