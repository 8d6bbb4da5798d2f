//! Cutoff-bounded single-source shortest paths and their cache.
//!
//! # Cost units
//!
//! All costs are metres (`f64`).  The plain search uses `edge_length_m`
//! directly; callers can supply their own per-edge cost (the road-type
//! variant multiplies by a category factor).
//!
//! # Termination
//!
//! The cutoff is the only bound on a search: nodes whose tentative cost
//! exceeds it are never expanded.  [`f64::INFINITY`] means unbounded.
//!
//! # Caching
//!
//! Results of [`RoadNetwork::shortest_paths_from`] are kept in a small
//! recency-ordered cache keyed by `(source, cutoff)`.  The cache lock is held
//! only for lookup and insert, never while a search runs, so two threads
//! asking for the same cold key may both compute it.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::trace;

use sa_core::{EdgeId, GeoPoint, NodeId};

use crate::network::RoadNetwork;
use crate::tags::EdgeTag;

/// Number of path trees kept per network unless configured otherwise.
pub const DEFAULT_PATH_CACHE_CAPACITY: usize = 8;

// ── PathTree ──────────────────────────────────────────────────────────────────

/// Every node reachable from `source` within `cutoff_m`, with its distance.
///
/// Unreachable and out-of-cutoff nodes are absent, never zero.
#[derive(Debug, Clone)]
pub struct PathTree {
    source:   NodeId,
    cutoff_m: f64,
    /// Nodes in the order Dijkstra settled them (non-decreasing distance).
    settled:  Vec<(NodeId, f64)>,
    dist:     FxHashMap<NodeId, f64>,
}

impl PathTree {
    fn empty(source: NodeId, cutoff_m: f64) -> Self {
        Self { source, cutoff_m, settled: Vec::new(), dist: FxHashMap::default() }
    }

    fn from_settled(source: NodeId, cutoff_m: f64, settled: Vec<(NodeId, f64)>) -> Self {
        let dist = settled.iter().copied().collect();
        Self { source, cutoff_m, settled, dist }
    }

    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn cutoff_m(&self) -> f64 {
        self.cutoff_m
    }

    /// Distance from the source to `node`, or `None` if not reached.
    pub fn distance_to(&self, node: NodeId) -> Option<f64> {
        self.dist.get(&node).copied()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.dist.contains_key(&node)
    }

    /// `(node, distance)` pairs in settle order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, f64)> + '_ {
        self.settled.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.settled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settled.is_empty()
    }
}

// ── PathCache ─────────────────────────────────────────────────────────────────

/// `(source, cutoff bits)`.
type PathKey = (NodeId, u64);

pub(crate) struct PathCache {
    entries: Mutex<LruCache<PathKey, Arc<PathTree>>>,
}

impl PathCache {
    pub(crate) fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self { entries: Mutex::new(LruCache::new(cap)) }
    }

    fn get(&self, key: &PathKey) -> Option<Arc<PathTree>> {
        self.entries.lock().get(key).cloned()
    }

    fn insert(&self, key: PathKey, tree: Arc<PathTree>) {
        self.entries.lock().put(key, tree);
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }
}

// ── Priority queue entry ──────────────────────────────────────────────────────

/// Min-heap entry (wrapped in `Reverse`).  Secondary key `NodeId` makes
/// settle order deterministic when costs tie.
#[derive(Copy, Clone, Debug, PartialEq)]
struct QueueEntry {
    cost: f64,
    node: NodeId,
}

impl Eq for QueueEntry {}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost.total_cmp(&other.cost).then(self.node.cmp(&other.node))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ── Dijkstra internals ────────────────────────────────────────────────────────

/// Dijkstra from `source`, expanding only nodes with cost `<= cutoff_m`.
///
/// Edges whose cost is negative or NaN are skipped.
fn bounded_dijkstra<T, F>(network: &RoadNetwork<T>, source: NodeId, cutoff_m: f64, edge_cost: F) -> PathTree
where
    T: EdgeTag,
    F: Fn(EdgeId) -> f64,
{
    let n = network.node_count();
    if source.index() >= n || !(cutoff_m >= 0.0) {
        return PathTree::empty(source, cutoff_m);
    }

    let mut dist = vec![f64::INFINITY; n];
    let mut done = vec![false; n];
    let mut settled = Vec::new();
    let mut heap: BinaryHeap<Reverse<QueueEntry>> = BinaryHeap::new();

    dist[source.index()] = 0.0;
    heap.push(Reverse(QueueEntry { cost: 0.0, node: source }));

    while let Some(Reverse(QueueEntry { cost, node })) = heap.pop() {
        // Skip stale heap entries.
        if done[node.index()] || cost > dist[node.index()] {
            continue;
        }
        done[node.index()] = true;
        settled.push((node, cost));

        for (neighbor, edge) in network.neighbors(node) {
            let step = edge_cost(edge);
            if !(step >= 0.0) {
                continue;
            }
            let next = cost + step;
            if next <= cutoff_m && next < dist[neighbor.index()] {
                dist[neighbor.index()] = next;
                heap.push(Reverse(QueueEntry { cost: next, node: neighbor }));
            }
        }
    }

    PathTree::from_settled(source, cutoff_m, settled)
}

/// Unbounded point-to-point Dijkstra on edge length, returning the node
/// sequence `from ..= to`.
fn shortest_route<T: EdgeTag>(network: &RoadNetwork<T>, from: NodeId, to: NodeId) -> Option<Vec<NodeId>> {
    let n = network.node_count();
    if from.index() >= n || to.index() >= n {
        return None;
    }
    if from == to {
        return Some(vec![from]);
    }

    let mut dist = vec![f64::INFINITY; n];
    let mut prev = vec![NodeId::INVALID; n];
    let mut heap: BinaryHeap<Reverse<QueueEntry>> = BinaryHeap::new();

    dist[from.index()] = 0.0;
    heap.push(Reverse(QueueEntry { cost: 0.0, node: from }));

    while let Some(Reverse(QueueEntry { cost, node })) = heap.pop() {
        if node == to {
            return Some(reconstruct(&prev, to));
        }
        if cost > dist[node.index()] {
            continue;
        }
        for (neighbor, edge) in network.neighbors(node) {
            let next = cost + network.edge_length_m[edge.index()];
            if next < dist[neighbor.index()] {
                dist[neighbor.index()] = next;
                prev[neighbor.index()] = node;
                heap.push(Reverse(QueueEntry { cost: next, node: neighbor }));
            }
        }
    }
    None
}

fn reconstruct(prev: &[NodeId], to: NodeId) -> Vec<NodeId> {
    let mut nodes = vec![to];
    let mut cur = to;
    while prev[cur.index()] != NodeId::INVALID {
        cur = prev[cur.index()];
        nodes.push(cur);
    }
    nodes.reverse();
    nodes
}

// ── Public API on RoadNetwork ─────────────────────────────────────────────────

impl<T: EdgeTag> RoadNetwork<T> {
    /// Cached single-source search over edge length.
    ///
    /// Every returned distance is `<= cutoff_m`; the source itself is present
    /// with distance 0 when it is a valid node.
    pub fn shortest_paths_from(&self, source: NodeId, cutoff_m: f64) -> Arc<PathTree> {
        let key = (source, cutoff_m.to_bits());
        if let Some(tree) = self.paths.get(&key) {
            trace!(%source, cutoff_m, "path cache hit");
            return tree;
        }
        let tree = Arc::new(bounded_dijkstra(self, source, cutoff_m, |e| self.edge_length_m[e.index()]));
        self.paths.insert(key, Arc::clone(&tree));
        tree
    }

    /// Uncached single-source search with a caller-supplied edge cost.
    pub fn shortest_paths_weighted<F>(&self, source: NodeId, cutoff_m: f64, edge_cost: F) -> PathTree
    where
        F: Fn(EdgeId) -> f64,
    {
        bounded_dijkstra(self, source, cutoff_m, edge_cost)
    }

    /// Network distance in metres between two arbitrary points, including
    /// both snap offsets.
    ///
    /// `None` if either point fails to snap within `tolerance_m` or the two
    /// snapped nodes are disconnected.
    pub fn distance_between(&self, a: GeoPoint, b: GeoPoint, tolerance_m: f64) -> Option<f64> {
        let sa = self.snap(a, tolerance_m)?;
        let sb = self.snap(b, tolerance_m)?;
        let offsets = sa.offset_m + sb.offset_m;
        if sa.node == sb.node {
            return Some(offsets);
        }
        self.shortest_paths_from(sa.node, f64::INFINITY)
            .distance_to(sb.node)
            .map(|d| d + offsets)
    }

    /// Node sequence of the shortest route between two nodes.
    pub fn route(&self, from: NodeId, to: NodeId) -> Option<Vec<NodeId>> {
        shortest_route(self, from, to)
    }

    /// Number of path trees currently cached.
    pub fn path_cache_len(&self) -> usize {
        self.paths.len()
    }

    pub fn clear_path_cache(&self) {
        self.paths.clear();
    }
}
