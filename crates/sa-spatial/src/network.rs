//! Road network representation and builder.
//!
//! # Data layout
//!
//! Edges are **undirected** and stored once, indexed by `EdgeId`
//! (`edge_ends`, `edge_length_m`, `edge_tag`).  Adjacency is a
//! **Compressed Sparse Row (CSR)** table of half-edges.  Given a
//! `NodeId n`, its neighbours occupy the slice:
//!
//! ```text
//! adj_node[ node_adj_start[n] .. node_adj_start[n+1] ]
//! adj_edge[ node_adj_start[n] .. node_adj_start[n+1] ]
//! ```
//!
//! Iteration over a node's neighbours is therefore a contiguous memory scan,
//! which is what Dijkstra's inner loop wants.  Node tags (road-type variant
//! only) use the same CSR scheme via `node_tag_start` / `node_tags`.
//!
//! # Node deduplication
//!
//! Vertices whose coordinates round to the same six-decimal-degree key
//! (~0.11 m) collapse into one node.  The first vertex seen keeps its exact
//! coordinate.
//!
//! # Spatial index
//!
//! An R-tree (via `rstar`) maps `(lat, lon)` to the nearest `NodeId`.  Very
//! small graphs skip the tree and scan linearly.

use rstar::{AABB, PointDistance, RTree, RTreeObject};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use sa_core::{EdgeId, GeoPoint, NodeId, RoadTypeId};

use crate::geojson::RoadLine;
use crate::paths::{DEFAULT_PATH_CACHE_CAPACITY, PathCache};
use crate::tags::{EdgeTag, RoadTypeRegistry};
use crate::{SpatialError, SpatialResult};

/// Decimal degrees kept when deduplicating vertices.
pub const DEDUP_DECIMALS: i32 = 6;

/// Consecutive vertices closer than this are the same intersection; no edge
/// is added between them.
pub const MIN_EDGE_LENGTH_M: f64 = 0.5;

/// Graphs up to this size are searched linearly instead of via the R-tree.
const LINEAR_SCAN_MAX_NODES: usize = 32;

// ── R-tree node entry ─────────────────────────────────────────────────────────

/// Entry stored in the R-tree spatial index: a 2-D `[lat, lon]` point with
/// the associated `NodeId`.
#[derive(Clone)]
struct NodeEntry {
    point: [f64; 2], // [lat, lon]
    id: NodeId,
}

impl RTreeObject for NodeEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for NodeEntry {
    /// Squared Euclidean distance in lat/lon space.  Only used to pick the
    /// candidate; the reported snap offset is always haversine.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlat = self.point[0] - point[0];
        let dlon = self.point[1] - point[1];
        dlat * dlat + dlon * dlon
    }
}

enum NearestIndex {
    Linear,
    Tree(RTree<NodeEntry>),
}

impl NearestIndex {
    fn build(nodes: &[GeoPoint]) -> Self {
        if nodes.len() <= LINEAR_SCAN_MAX_NODES {
            return NearestIndex::Linear;
        }
        // Bulk-load for O(N log N) construction (faster than N inserts).
        let entries: Vec<NodeEntry> = nodes
            .iter()
            .enumerate()
            .map(|(i, pos)| NodeEntry { point: [pos.lat, pos.lon], id: NodeId(i as u32) })
            .collect();
        NearestIndex::Tree(RTree::bulk_load(entries))
    }

    fn nearest(&self, nodes: &[GeoPoint], pos: GeoPoint) -> Option<NodeId> {
        match self {
            NearestIndex::Tree(tree) => tree.nearest_neighbor(&[pos.lat, pos.lon]).map(|e| e.id),
            NearestIndex::Linear => {
                let mut best: Option<(f64, usize)> = None;
                for (i, n) in nodes.iter().enumerate() {
                    let dlat = n.lat - pos.lat;
                    let dlon = n.lon - pos.lon;
                    let d2 = dlat * dlat + dlon * dlon;
                    if best.is_none_or(|(b, _)| d2 < b) {
                        best = Some((d2, i));
                    }
                }
                best.map(|(_, i)| NodeId(i as u32))
            }
        }
    }
}

// ── NetworkParts ──────────────────────────────────────────────────────────────

/// The owned, serialisable core of a network.  Adjacency and the spatial
/// index are derived from it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkParts<T> {
    pub node_pos:       Vec<GeoPoint>,
    pub edge_ends:      Vec<[NodeId; 2]>,
    pub edge_length_m:  Vec<f64>,
    pub edge_tag:       Vec<T>,
    pub node_tag_start: Vec<u32>,
    pub node_tags:      Vec<T>,
    pub road_types:     RoadTypeRegistry,
}

impl<T: EdgeTag> NetworkParts<T> {
    /// Check internal consistency.  Decoded cache blobs go through this so a
    /// damaged file can never cause out-of-bounds indexing later.
    pub fn validate(&self) -> SpatialResult<()> {
        let n = self.node_pos.len();
        let m = self.edge_ends.len();
        let bad = |msg: String| Err(SpatialError::InvalidNetwork(msg));

        if let Some(p) = self.node_pos.iter().find(|p| !p.is_finite()) {
            return bad(format!("node position {p} is not finite"));
        }
        if self.edge_length_m.len() != m || self.edge_tag.len() != m {
            return bad(format!(
                "edge arrays disagree: {} ends, {} lengths, {} tags",
                m,
                self.edge_length_m.len(),
                self.edge_tag.len()
            ));
        }
        if let Some([a, b]) = self.edge_ends.iter().find(|[a, b]| a.index() >= n || b.index() >= n || a == b) {
            return bad(format!("edge {a}-{b} is out of range or a self-loop"));
        }
        if let Some(w) = self.edge_length_m.iter().find(|w| !(w.is_finite() && **w >= 0.0)) {
            return bad(format!("edge weight {w} is not a finite non-negative length"));
        }
        if self.node_tag_start.len() != n + 1
            || self.node_tag_start.windows(2).any(|w| w[0] > w[1])
            || self.node_tag_start.last().copied().unwrap_or(0) as usize != self.node_tags.len()
        {
            return bad("node tag table is malformed".to_owned());
        }
        Ok(())
    }
}

// ── RoadNetwork ───────────────────────────────────────────────────────────────

/// Undirected road graph in CSR form plus a nearest-node index.
///
/// Immutable after construction and `Send + Sync`: many concurrent queries
/// may share one instance behind an `Arc`.  The only interior mutability is
/// the bounded shortest-path cache, which dies with the instance.
///
/// Do not construct directly; use [`RoadNetworkBuilder`],
/// [`RoadNetwork::from_road_lines`] or [`crate::load_or_build`].
pub struct RoadNetwork<T: EdgeTag = ()> {
    // ── Node data ─────────────────────────────────────────────────────────
    /// Position of each node.  Indexed by `NodeId`.
    pub node_pos: Vec<GeoPoint>,

    // ── CSR adjacency (half-edges) ────────────────────────────────────────
    /// Length = `node_count + 1`.
    pub node_adj_start: Vec<u32>,
    pub adj_node: Vec<NodeId>,
    pub adj_edge: Vec<EdgeId>,

    // ── Edge data (indexed by EdgeId) ─────────────────────────────────────
    pub edge_ends: Vec<[NodeId; 2]>,
    /// Geodesic length of each edge in metres.
    pub edge_length_m: Vec<f64>,
    pub edge_tag: Vec<T>,

    // ── Node tags (CSR) ───────────────────────────────────────────────────
    pub node_tag_start: Vec<u32>,
    pub node_tags: Vec<T>,

    pub road_types: RoadTypeRegistry,

    index: NearestIndex,
    pub(crate) paths: PathCache,
}

/// Distance-only network.
pub type PlainNetwork = RoadNetwork<()>;

/// Network whose edges and nodes carry road categories.
pub type TypedNetwork = RoadNetwork<RoadTypeId>;

impl<T: EdgeTag> RoadNetwork<T> {
    /// A network with no nodes.  Every snap against it fails.
    pub fn empty() -> Self {
        RoadNetworkBuilder::new().build()
    }

    /// Build a network straight from loader output.
    pub fn from_road_lines(lines: &[RoadLine]) -> SpatialResult<Self> {
        let mut b = RoadNetworkBuilder::with_capacity(lines.len() * 4, lines.len() * 4);
        for line in lines {
            b.add_road_line(line)?;
        }
        Ok(b.build())
    }

    /// Validate `parts` and derive adjacency and the spatial index.
    pub fn from_parts(parts: NetworkParts<T>) -> SpatialResult<Self> {
        parts.validate()?;
        Ok(Self::assemble(parts))
    }

    fn assemble(parts: NetworkParts<T>) -> Self {
        let n = parts.node_pos.len();

        let mut node_adj_start = vec![0u32; n + 1];
        for [a, b] in &parts.edge_ends {
            node_adj_start[a.index() + 1] += 1;
            node_adj_start[b.index() + 1] += 1;
        }
        for i in 1..=n {
            node_adj_start[i] += node_adj_start[i - 1];
        }

        let half_edges = node_adj_start[n] as usize;
        let mut adj_node = vec![NodeId::INVALID; half_edges];
        let mut adj_edge = vec![EdgeId::INVALID; half_edges];
        let mut cursor: Vec<u32> = node_adj_start[..n].to_vec();
        for (e, [a, b]) in parts.edge_ends.iter().enumerate() {
            for (from, to) in [(*a, *b), (*b, *a)] {
                let slot = cursor[from.index()] as usize;
                adj_node[slot] = to;
                adj_edge[slot] = EdgeId(e as u32);
                cursor[from.index()] += 1;
            }
        }

        let index = NearestIndex::build(&parts.node_pos);

        RoadNetwork {
            node_pos: parts.node_pos,
            node_adj_start,
            adj_node,
            adj_edge,
            edge_ends: parts.edge_ends,
            edge_length_m: parts.edge_length_m,
            edge_tag: parts.edge_tag,
            node_tag_start: parts.node_tag_start,
            node_tags: parts.node_tags,
            road_types: parts.road_types,
            index,
            paths: PathCache::new(DEFAULT_PATH_CACHE_CAPACITY),
        }
    }

    /// Replace the shortest-path cache with an empty one of `capacity`
    /// entries (minimum 1).
    pub fn with_path_cache_capacity(mut self, capacity: usize) -> Self {
        self.paths = PathCache::new(capacity);
        self
    }

    // ── Graph dimensions ──────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.node_pos.len()
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.edge_ends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_pos.is_empty()
    }

    // ── Graph traversal ───────────────────────────────────────────────────

    /// `(neighbour, edge)` pairs of `node`.  Contiguous, no allocation.
    #[inline]
    pub fn neighbors(&self, node: NodeId) -> impl Iterator<Item = (NodeId, EdgeId)> + '_ {
        let start = self.node_adj_start[node.index()] as usize;
        let end = self.node_adj_start[node.index() + 1] as usize;
        self.adj_node[start..end].iter().copied().zip(self.adj_edge[start..end].iter().copied())
    }

    #[inline]
    pub fn degree(&self, node: NodeId) -> usize {
        let start = self.node_adj_start[node.index()] as usize;
        let end = self.node_adj_start[node.index() + 1] as usize;
        end - start
    }

    /// Edge joining `a` and `b`, if any.
    pub fn edge_between(&self, a: NodeId, b: NodeId) -> Option<EdgeId> {
        if a.index() >= self.node_count() {
            return None;
        }
        self.neighbors(a).find(|(n, _)| *n == b).map(|(_, e)| e)
    }

    /// Tags collected on `node` (sorted, unique).  Always empty for the plain
    /// variant.
    pub fn node_tags(&self, node: NodeId) -> &[T] {
        let Some(&[start, end]) = self.node_tag_start.get(node.index()..node.index() + 2) else {
            return &[];
        };
        &self.node_tags[start as usize..end as usize]
    }

    // ── Spatial queries ───────────────────────────────────────────────────

    /// Nearest node to `pos` by planar lat/lon distance.
    ///
    /// `None` for an empty network or a non-finite `pos`.
    pub fn nearest_node(&self, pos: GeoPoint) -> Option<NodeId> {
        if self.is_empty() || !pos.is_finite() {
            return None;
        }
        self.index.nearest(&self.node_pos, pos)
    }
}

impl TypedNetwork {
    /// Sorted road-type names present at `node`.
    pub fn road_types_for_node(&self, node: NodeId) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .node_tags(node)
            .iter()
            .map(|id| self.road_types.name(*id))
            .collect();
        names.sort_unstable();
        names
    }
}

// ── RoadNetworkBuilder ────────────────────────────────────────────────────────

/// Construct a [`RoadNetwork`] incrementally, then call [`build`](Self::build).
///
/// # Example
///
/// ```
/// use sa_core::GeoPoint;
/// use sa_spatial::RoadNetworkBuilder;
///
/// let mut b = RoadNetworkBuilder::<()>::new();
/// b.add_line(&[GeoPoint::new(27.70, 85.30), GeoPoint::new(27.71, 85.30)], ()).unwrap();
/// let net = b.build();
/// assert_eq!(net.node_count(), 2);
/// assert_eq!(net.edge_count(), 1); // undirected
/// ```
pub struct RoadNetworkBuilder<T: EdgeTag = ()> {
    nodes:          Vec<GeoPoint>,
    node_lookup:    FxHashMap<(i64, i64), NodeId>,
    node_tag_pairs: Vec<(NodeId, T)>,
    edges:          Vec<RawEdge<T>>,
    edge_lookup:    FxHashMap<(NodeId, NodeId), usize>,
    road_types:     RoadTypeRegistry,
}

struct RawEdge<T> {
    ends:     [NodeId; 2],
    length_m: f64,
    tag:      T,
}

impl<T: EdgeTag> RoadNetworkBuilder<T> {
    pub fn new() -> Self {
        Self::with_capacity(0, 0)
    }

    /// Pre-allocate for the expected number of nodes and edges.
    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            nodes:          Vec::with_capacity(nodes),
            node_lookup:    FxHashMap::with_capacity_and_hasher(nodes, Default::default()),
            node_tag_pairs: Vec::new(),
            edges:          Vec::with_capacity(edges),
            edge_lookup:    FxHashMap::with_capacity_and_hasher(edges, Default::default()),
            road_types:     RoadTypeRegistry::new(),
        }
    }

    /// Return the node at `pos`, creating it unless an existing node shares
    /// its rounded coordinate key.
    pub fn node_at(&mut self, pos: GeoPoint) -> SpatialResult<NodeId> {
        let key = pos.rounded_key(DEDUP_DECIMALS);
        if let Some(&id) = self.node_lookup.get(&key) {
            return Ok(id);
        }
        let id = NodeId::try_from(self.nodes.len())
            .ok()
            .filter(|id| *id != NodeId::INVALID)
            .ok_or(SpatialError::CapacityExceeded("node"))?;
        self.nodes.push(pos);
        self.node_lookup.insert(key, id);
        Ok(id)
    }

    /// Position of a node added earlier.
    pub fn node_pos(&self, id: NodeId) -> GeoPoint {
        self.nodes[id.index()]
    }

    /// Add an undirected edge.  Self-loops are ignored; a second edge between
    /// the same pair keeps whichever candidate is shorter (with its tag).
    pub fn add_road(&mut self, a: NodeId, b: NodeId, length_m: f64, tag: T) {
        if a == b || !(length_m.is_finite() && length_m >= 0.0) {
            return;
        }
        let key = if a < b { (a, b) } else { (b, a) };
        match self.edge_lookup.get(&key) {
            Some(&i) => {
                let existing = &mut self.edges[i];
                if length_m < existing.length_m {
                    existing.length_m = length_m;
                    existing.tag = tag;
                }
            }
            None => {
                self.edge_lookup.insert(key, self.edges.len());
                self.edges.push(RawEdge { ends: [key.0, key.1], length_m, tag });
            }
        }
    }

    /// Walk consecutive vertex pairs of one line, creating nodes and edges.
    ///
    /// Every vertex's node receives `tag` (road-type variant).  Pairs closer
    /// than [`MIN_EDGE_LENGTH_M`] are merged: no edge, and the walk continues
    /// from the later vertex.
    pub fn add_line(&mut self, coords: &[GeoPoint], tag: T) -> SpatialResult<()> {
        let mut prev: Option<NodeId> = None;
        for &pos in coords.iter().filter(|p| p.is_finite()) {
            let node = self.node_at(pos)?;
            if T::TAGS_NODES {
                self.node_tag_pairs.push((node, tag));
            }
            if let Some(p) = prev.filter(|p| *p != node) {
                let length_m = self.nodes[p.index()].distance_m(pos);
                if length_m >= MIN_EDGE_LENGTH_M {
                    self.add_road(p, node, length_m, tag);
                }
            }
            prev = Some(node);
        }
        Ok(())
    }

    /// Intern the line's road type and add it.
    pub fn add_road_line(&mut self, line: &RoadLine) -> SpatialResult<()> {
        let tag = T::intern(&line.road_type, &mut self.road_types)?;
        self.add_line(&line.coords, tag)
    }

    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn edge_count(&self) -> usize { self.edges.len() }

    /// Consume the builder and produce a [`RoadNetwork`].
    ///
    /// Time complexity: O(E + T log T) for adjacency and tag tables plus
    /// O(N log N) for the R-tree bulk load.
    pub fn build(self) -> RoadNetwork<T> {
        let n = self.nodes.len();

        let mut pairs = self.node_tag_pairs;
        pairs.sort_unstable();
        pairs.dedup();
        let mut node_tag_start = vec![0u32; n + 1];
        for (node, _) in &pairs {
            node_tag_start[node.index() + 1] += 1;
        }
        for i in 1..=n {
            node_tag_start[i] += node_tag_start[i - 1];
        }
        let node_tags: Vec<T> = pairs.into_iter().map(|(_, t)| t).collect();

        let edge_ends: Vec<[NodeId; 2]> = self.edges.iter().map(|e| e.ends).collect();
        let edge_length_m: Vec<f64> = self.edges.iter().map(|e| e.length_m).collect();
        let edge_tag: Vec<T> = self.edges.iter().map(|e| e.tag).collect();

        debug!(nodes = n, edges = edge_ends.len(), kind = T::KIND, "built road network");

        RoadNetwork::assemble(NetworkParts {
            node_pos: self.nodes,
            edge_ends,
            edge_length_m,
            edge_tag,
            node_tag_start,
            node_tags,
            road_types: self.road_types,
        })
    }
}

impl<T: EdgeTag> Default for RoadNetworkBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
