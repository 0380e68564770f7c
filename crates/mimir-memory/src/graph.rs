//! Associative memory graph with JSON snapshot persistence.
//!
//! Nodes carry free text, sparse dimension weights, and open metadata; edges
//! are directed, predicate-labelled, and weighted. The store owns both
//! collections, enforces referential integrity at edge creation, and
//! persists to a single JSON document whose schema is an interop contract
//! with existing snapshots.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use mimir_types::{Metadata, MemoryNode, MemoryRelationship, SparseVector};

use crate::error::{MemoryError, Result};
use crate::similarity::cosine;

/// Conventional snapshot filename used by [`MemoryGraphStore::open_default`].
pub const DEFAULT_GRAPH_PATH: &str = "memory_graph.json";

/// Importance proxy read by `best_path_meta` when ranking filtered nodes.
/// Nodes without the reserved `"M"` dimension rank at this value.
const DEFAULT_IMPORTANCE: f32 = 0.5;

// ─────────────────────────────────────────────────────────────────────────────
// Probe
// ─────────────────────────────────────────────────────────────────────────────

/// A similarity probe: either a sparse vector (cosine mode) or a keyword
/// (case-insensitive substring mode).
#[derive(Debug, Clone)]
pub enum Probe {
    /// Cosine similarity against each node's `vectors`.
    Vector(SparseVector),
    /// Substring containment against each node's `content`; matches score 1.0.
    Text(String),
}

impl From<SparseVector> for Probe {
    fn from(vectors: SparseVector) -> Self {
        Probe::Vector(vectors)
    }
}

impl From<&str> for Probe {
    fn from(keyword: &str) -> Self {
        Probe::Text(keyword.to_string())
    }
}

impl From<String> for Probe {
    fn from(keyword: String) -> Self {
        Probe::Text(keyword)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Snapshot document
// ─────────────────────────────────────────────────────────────────────────────

/// On-disk snapshot shape. Field names and nesting are normative; element
/// order within the arrays is not.
#[derive(Debug, Serialize, Deserialize)]
struct GraphSnapshot {
    nodes: Vec<MemoryNode>,
    edges: Vec<MemoryRelationship>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Graph store
// ─────────────────────────────────────────────────────────────────────────────

/// Statistics about the graph store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of nodes in the store.
    pub node_count: usize,
    /// Number of edges in the store.
    pub edge_count: usize,
}

/// In-memory node/edge collections plus disk persistence.
///
/// Single-threaded and synchronous; every mutation is visible to the next
/// call. A single writer per snapshot path is assumed — concurrent
/// multi-process access is explicitly out of scope.
pub struct MemoryGraphStore {
    nodes: HashMap<String, MemoryNode>,
    edges: HashMap<String, MemoryRelationship>,
    persist_path: PathBuf,
}

impl MemoryGraphStore {
    /// Open a store bound to the given snapshot path.
    ///
    /// If the path already exists it is loaded synchronously before the
    /// store becomes queryable; otherwise the store starts empty. A parse
    /// failure leaves the on-disk document untouched.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let persist_path = path.as_ref().to_path_buf();

        // Parse before constructing Self: a store that never loaded must
        // not exist long enough for the teardown save to overwrite the
        // document it failed to read.
        let snapshot = if persist_path.exists() {
            Some(read_snapshot(&persist_path)?)
        } else {
            None
        };

        let mut store = Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            persist_path,
        };
        if let Some(snapshot) = snapshot {
            store.install(snapshot);
        }

        info!("Memory graph opened at {:?}", store.persist_path);
        Ok(store)
    }

    /// Open a store at the conventional snapshot path.
    pub fn open_default() -> Result<Self> {
        Self::open(DEFAULT_GRAPH_PATH)
    }

    /// The snapshot path this store saves to.
    pub fn persist_path(&self) -> &Path {
        &self.persist_path
    }

    // ─── CRUD ────────────────────────────────────────────────────────────

    /// Insert a node, overwriting any existing node with the same id.
    pub fn add_node(&mut self, node: MemoryNode) {
        debug!("Added node {} ({})", node.id, node.node_type);
        self.nodes.insert(node.id.clone(), node);
    }

    /// Insert an edge, overwriting any existing edge with the same id.
    ///
    /// Fails with [`MemoryError::UnknownNode`] if either endpoint is not a
    /// known node id; the edge set is left unchanged on failure.
    pub fn add_edge(&mut self, edge: MemoryRelationship) -> Result<()> {
        if !self.nodes.contains_key(&edge.source) {
            return Err(MemoryError::UnknownNode(edge.source));
        }
        if !self.nodes.contains_key(&edge.target) {
            return Err(MemoryError::UnknownNode(edge.target));
        }

        debug!(
            "Added edge {} -[{}]-> {}",
            edge.source, edge.predicate, edge.target
        );
        self.edges.insert(edge.id.clone(), edge);
        Ok(())
    }

    /// Insert a node unless one with identical content already exists.
    ///
    /// Dedup is exact-text: two calls with the same `content` return the
    /// same node and grow the store by exactly one node across both calls.
    /// The scan is O(n) per call — fine at agent-session scale, a known
    /// scaling limit beyond it.
    pub fn upsert(
        &mut self,
        content: &str,
        node_type: &str,
        vectors: SparseVector,
        meta: Metadata,
    ) -> MemoryNode {
        if let Some(existing) = self.nodes.values().find(|n| n.content == content) {
            return existing.clone();
        }

        let node = MemoryNode::new(content)
            .with_node_type(node_type)
            .with_vectors(vectors)
            .with_meta(meta);
        let result = node.clone();
        self.add_node(node);
        result
    }

    /// Get a node by id.
    pub fn node(&self, id: &str) -> Option<&MemoryNode> {
        self.nodes.get(id)
    }

    /// Outgoing edges of a node.
    pub fn out_edges(&self, node_id: &str) -> Vec<&MemoryRelationship> {
        self.edges.values().filter(|e| e.source == node_id).collect()
    }

    /// Node and edge counts.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            node_count: self.nodes.len(),
            edge_count: self.edges.len(),
        }
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    /// Find nodes similar to the probe.
    ///
    /// Vector probes score by sparse cosine over shared dimensions and keep
    /// nodes scoring at least `min_score`; disjoint dimension sets score
    /// exactly 0.0. Text probes keep nodes whose content contains the
    /// keyword (case-insensitive) at score 1.0. Results are sorted by score
    /// descending and truncated to `top_k`; tie order is unspecified.
    pub fn find_similar(
        &self,
        probe: impl Into<Probe>,
        top_k: usize,
        min_score: f32,
    ) -> Vec<MemoryNode> {
        let mut scored: Vec<(f32, &MemoryNode)> = Vec::new();

        match probe.into() {
            Probe::Vector(vectors) => {
                for node in self.nodes.values() {
                    let sim = cosine(&node.vectors, &vectors);
                    if sim >= min_score {
                        scored.push((sim, node));
                    }
                }
            }
            Probe::Text(keyword) => {
                let keyword = keyword.to_lowercase();
                for node in self.nodes.values() {
                    if node.content.to_lowercase().contains(&keyword) {
                        scored.push((1.0, node));
                    }
                }
            }
        }

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored
            .into_iter()
            .take(top_k)
            .map(|(_, n)| n.clone())
            .collect()
    }

    /// Depth-bounded depth-first walk over outgoing edges.
    ///
    /// Visits each node at most once (cycle-safe), optionally restricted to
    /// edges whose predicate equals `predicate_filter`, and returns nodes in
    /// DFS visitation order. An unknown `start_id` yields an empty list.
    pub fn traverse(
        &self,
        start_id: &str,
        predicate_filter: Option<&str>,
        depth: i32,
    ) -> Vec<MemoryNode> {
        let mut visited = HashSet::new();
        let mut result = Vec::new();
        self.dfs(start_id, predicate_filter, depth, &mut visited, &mut result);
        result
    }

    fn dfs(
        &self,
        node_id: &str,
        predicate_filter: Option<&str>,
        depth: i32,
        visited: &mut HashSet<String>,
        result: &mut Vec<MemoryNode>,
    ) {
        if depth < 0 || visited.contains(node_id) {
            return;
        }
        let Some(node) = self.nodes.get(node_id) else {
            return;
        };

        visited.insert(node_id.to_string());
        result.push(node.clone());

        for edge in self.out_edges(node_id) {
            if let Some(predicate) = predicate_filter
                && edge.predicate != predicate
            {
                continue;
            }
            self.dfs(&edge.target, predicate_filter, depth - 1, visited, result);
        }
    }

    /// Top-ranked nodes whose meta matches every key/value in `meta_filter`.
    ///
    /// Matching is exact equality per pair; an empty filter matches all
    /// nodes. Ranking uses the reserved `"M"` vector dimension as an
    /// importance proxy, defaulting to 0.5 when absent.
    pub fn best_path_meta(&self, meta_filter: &Metadata, limit: usize) -> Vec<MemoryNode> {
        let mut candidates: Vec<&MemoryNode> = self
            .nodes
            .values()
            .filter(|node| {
                meta_filter
                    .iter()
                    .all(|(key, value)| node.meta.get(key) == Some(value))
            })
            .collect();

        candidates.sort_by(|a, b| {
            let ia = a.vectors.get("M").copied().unwrap_or(DEFAULT_IMPORTANCE);
            let ib = b.vectors.get("M").copied().unwrap_or(DEFAULT_IMPORTANCE);
            ib.partial_cmp(&ia).unwrap_or(std::cmp::Ordering::Equal)
        });

        candidates.into_iter().take(limit).cloned().collect()
    }

    // ─── Persistence ─────────────────────────────────────────────────────

    /// Write the full node/edge collections to the snapshot path.
    ///
    /// This is the supported flush path; call it on every exit route that
    /// must not lose writes. Parent directories are created as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&self.persist_path)
    }

    /// Write a snapshot to an external path without rebinding the store.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let snapshot = GraphSnapshot {
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.values().cloned().collect(),
        };
        let json = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(path, json)?;

        debug!(
            "Saved {} nodes / {} edges to {:?}",
            self.nodes.len(),
            self.edges.len(),
            path
        );
        Ok(())
    }

    /// Replace in-memory state wholesale from the snapshot path.
    ///
    /// A malformed document fails with a parse error and leaves the current
    /// state untouched; load never merges.
    pub fn load(&mut self) -> Result<()> {
        let snapshot = read_snapshot(&self.persist_path)?;
        self.install(snapshot);

        info!(
            "Loaded {} nodes / {} edges from {:?}",
            self.nodes.len(),
            self.edges.len(),
            self.persist_path
        );
        Ok(())
    }

    /// Open a store bound to `path`, loading the snapshot there if present.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(path)
    }

    /// Replace both collections from a parsed snapshot.
    fn install(&mut self, snapshot: GraphSnapshot) {
        self.nodes = snapshot
            .nodes
            .into_iter()
            .map(|n| (n.id.clone(), n))
            .collect();
        self.edges = snapshot
            .edges
            .into_iter()
            .map(|e| (e.id.clone(), e))
            .collect();
    }
}

/// Read and parse a snapshot document without touching any store state.
fn read_snapshot(path: &Path) -> Result<GraphSnapshot> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

impl Drop for MemoryGraphStore {
    /// Best-effort save on teardown.
    ///
    /// Failures are logged and suppressed; durability on the teardown path
    /// is traded for robustness. Callers needing guarantees use [`save`]
    /// explicitly and handle its result.
    ///
    /// [`save`]: MemoryGraphStore::save
    fn drop(&mut self) {
        if let Err(e) = self.save() {
            warn!("Teardown save of {:?} failed: {}", self.persist_path, e);
        }
    }
}

impl std::fmt::Debug for MemoryGraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryGraphStore")
            .field("nodes", &self.nodes.len())
            .field("edges", &self.edges.len())
            .field("persist_path", &self.persist_path)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
