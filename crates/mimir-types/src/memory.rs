//! Memory record shapes shared by the graph store, recall index, and ranker.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{now, short_id};

/// Open metadata attached to memory records (importance, trust, rhythm,
/// failed-flag, timestamps, anything the caller wants to carry).
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Sparse dimension-name to weight mapping.
///
/// Doubles as a lightweight embedding proxy and as an importance signal via
/// the reserved `"M"` key.
pub type SparseVector = HashMap<String, f32>;

/// An atomic unit of long-term memory in the associative graph.
///
/// Serialized field names are part of the snapshot interop contract and must
/// not change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryNode {
    /// Unique id, generated at creation, never reused.
    pub id: String,
    /// The remembered text.
    pub content: String,
    /// Open type tag: "thought", "plan", "emotion", "reflection", ...
    pub node_type: String,
    #[serde(default)]
    pub vectors: SparseVector,
    #[serde(default)]
    pub meta: Metadata,
    /// Creation time as fractional unix seconds.
    pub created: f64,
}

impl MemoryNode {
    /// Create a new node with a fresh id and the default "thought" type.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: short_id("N"),
            content: content.into(),
            node_type: "thought".to_string(),
            vectors: SparseVector::new(),
            meta: Metadata::new(),
            created: now(),
        }
    }

    /// Set the node type.
    pub fn with_node_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = node_type.into();
        self
    }

    /// Replace the sparse vector map.
    pub fn with_vectors(mut self, vectors: SparseVector) -> Self {
        self.vectors = vectors;
        self
    }

    /// Set a single dimension weight.
    pub fn with_vector(mut self, dim: impl Into<String>, weight: f32) -> Self {
        self.vectors.insert(dim.into(), weight);
        self
    }

    /// Replace the metadata map.
    pub fn with_meta(mut self, meta: Metadata) -> Self {
        self.meta = meta;
        self
    }

    /// Set a single metadata entry.
    pub fn with_meta_entry(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }
}

/// A directed, predicate-labelled, weighted edge between two graph nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRelationship {
    /// Unique id, generated at creation.
    pub id: String,
    /// Source node id.
    pub source: String,
    /// Target node id.
    pub target: String,
    /// Semantic edge label: "supports", "causes", "is_plan_for", ...
    pub predicate: String,
    #[serde(default = "default_weight")]
    pub weight: f32,
    /// Creation time as fractional unix seconds.
    pub created: f64,
}

fn default_weight() -> f32 {
    1.0
}

impl MemoryRelationship {
    /// Create a new edge with a fresh id and weight 1.0.
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        predicate: impl Into<String>,
    ) -> Self {
        Self {
            id: short_id("E"),
            source: source.into(),
            target: target.into(),
            predicate: predicate.into(),
            weight: 1.0,
            created: now(),
        }
    }

    /// Set the edge weight.
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }
}

/// An entry in the decay-weighted recall index.
///
/// This is a separate identity space from [`MemoryNode`]: ids are sequential
/// and index-local, and the two stores are never reconciled automatically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryItem {
    /// Sequential index-local id, e.g. `M000001`.
    pub id: String,
    pub text: String,
    /// Dense embedding as produced by the injected embedder.
    pub vector: Vec<f32>,
    #[serde(default)]
    pub meta: Metadata,
    /// Creation time as fractional unix seconds.
    pub ts: f64,
    /// Confidence in [0, 1]; low trust fades faster at recall time.
    pub trust: f32,
}

/// Default trust assigned to new recall-index items.
pub const DEFAULT_TRUST: f32 = 0.7;

/// A record as seen by the multi-factor ranker.
///
/// The aggregate memory view hands these over already grouped by kind; the
/// ranker reads `meta` and the optional top-level ISO-8601 `timestamp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankRecord {
    pub content: String,
    #[serde(default)]
    pub meta: Metadata,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub timestamp: Option<String>,
}

impl RankRecord {
    /// Create a record with empty metadata and no timestamp.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            meta: Metadata::new(),
            timestamp: None,
        }
    }

    /// Set a single metadata entry.
    pub fn with_meta_entry(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Set the creation timestamp (ISO-8601).
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }
}

/// Common read surface over both identity spaces.
pub trait MemoryRecord {
    /// Stable record id.
    fn id(&self) -> &str;
    /// The remembered text.
    fn text(&self) -> &str;
    /// Open metadata.
    fn meta(&self) -> &Metadata;
    /// Creation time as fractional unix seconds.
    fn created(&self) -> f64;
}

impl MemoryRecord for MemoryNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn text(&self) -> &str {
        &self.content
    }

    fn meta(&self) -> &Metadata {
        &self.meta
    }

    fn created(&self) -> f64 {
        self.created
    }
}

impl MemoryRecord for MemoryItem {
    fn id(&self) -> &str {
        &self.id
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn meta(&self) -> &Metadata {
        &self.meta
    }

    fn created(&self) -> f64 {
        self.ts
    }
}
