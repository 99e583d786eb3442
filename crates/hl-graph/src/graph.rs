//! `SubzoneGraph` — routing and queries over the subzone topology.
//!
//! # Determinism
//!
//! Dijkstra's tie-breaker is the node insertion index (`SubzoneNode::seq`),
//! assigned by [`SubzoneGraph::add_node`].  Two routes of equal cost always
//! resolve the same way for the same load order; hash-map iteration order
//! never reaches the heap.
//!
//! # Spatial index
//!
//! One R-tree per zone maps anchor coordinates to node ids.  Used by the
//! LOD engine to snap a demoting actor's tile position to its nearest
//! subzone.  Nodes are inserted incrementally; the graph API has no node
//! removal, so the trees never need a rebuild.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::node::SubzoneNode;

// ── R-tree anchor entry ───────────────────────────────────────────────────────

/// Entry in the per-zone spatial index: an anchor point plus its node id.
#[derive(Clone)]
struct AnchorEntry {
    point: [f64; 2],
    id: String,
}

impl RTreeObject for AnchorEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for AnchorEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

// ── Dijkstra heap entry ───────────────────────────────────────────────────────

/// Min-heap key: cost first, then node insertion index.
struct QueueEntry {
    cost: f64,
    seq: u32,
    id: String,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cost.total_cmp(&other.cost) == Ordering::Equal && self.seq == other.seq
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    // Reversed: BinaryHeap is a max-heap, we want the cheapest entry on top.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

// ── SubzoneGraph ──────────────────────────────────────────────────────────────

/// Weighted graph of every subzone node in the world.
///
/// Stored as a world-sim singleton; deterministic and read-heavy after
/// load.
#[derive(Default)]
pub struct SubzoneGraph {
    nodes: FxHashMap<String, SubzoneNode>,
    /// Node ids in insertion order — drives deterministic iteration.
    order: Vec<String>,
    /// Per-zone anchor index.
    spatial: FxHashMap<String, RTree<AnchorEntry>>,
}

impl SubzoneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Construction ──────────────────────────────────────────────────────

    pub fn add_node(&mut self, mut node: SubzoneNode) {
        node.seq = self.order.len() as u32;
        self.spatial
            .entry(node.zone.clone())
            .or_insert_with(RTree::new)
            .insert(AnchorEntry {
                point: [node.anchor.0 as f64, node.anchor.1 as f64],
                id: node.id.clone(),
            });
        self.order.push(node.id.clone());
        self.nodes.insert(node.id.clone(), node);
    }

    /// Add a connection between two nodes.  If `bidirectional`, both A→B
    /// and B→A are set to the same weight.
    pub fn add_edge(&mut self, a: &str, b: &str, travel_time: f64, bidirectional: bool) {
        if let Some(node) = self.nodes.get_mut(a) {
            node.connections.insert(b.to_owned(), travel_time);
        }
        if bidirectional {
            if let Some(node) = self.nodes.get_mut(b) {
                node.connections.insert(a.to_owned(), travel_time);
            }
        }
    }

    // ── Lookup ────────────────────────────────────────────────────────────

    pub fn node(&self, id: &str) -> Option<&SubzoneNode> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut SubzoneNode> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &SubzoneNode> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Nodes belonging to `zone`, in insertion order.
    pub fn zone_nodes(&self, zone: &str) -> Vec<&SubzoneNode> {
        self.iter().filter(|n| n.zone == zone).collect()
    }

    // ── Pathfinding ───────────────────────────────────────────────────────

    /// Dijkstra shortest path by travel time.
    ///
    /// Returns the node ids after `start`, up to and including `goal`;
    /// `Some(vec![])` when `start == goal`; `None` when either endpoint is
    /// unknown or no path exists.
    pub fn shortest_path(&self, start: &str, goal: &str) -> Option<Vec<String>> {
        self.route(start, goal, |_, travel_time| travel_time)
    }

    /// Route that penalises dangerous nodes.
    ///
    /// Edge cost is `travel_time + threat_weight * (node.threat_level +
    /// mem_threat(neighbor))`, where `mem_threat` supplies the querying
    /// actor's remembered threat for a node (0.0 when it has none).
    pub fn threat_aware_path(
        &self,
        start: &str,
        goal: &str,
        threat_weight: f64,
        mem_threat: impl Fn(&str) -> f64,
    ) -> Option<Vec<String>> {
        self.route(start, goal, |neighbor, travel_time| {
            travel_time + threat_weight * (neighbor.threat_level + mem_threat(&neighbor.id))
        })
    }

    /// Total cost of the shortest path, without reconstructing it.
    pub fn shortest_distance(&self, start: &str, goal: &str) -> Option<f64> {
        let path = self.shortest_path(start, goal)?;
        Some(self.total_path_time(&path, start))
    }

    fn route(
        &self,
        start: &str,
        goal: &str,
        edge_cost: impl Fn(&SubzoneNode, f64) -> f64,
    ) -> Option<Vec<String>> {
        if !self.nodes.contains_key(start) || !self.nodes.contains_key(goal) {
            return None;
        }
        if start == goal {
            return Some(Vec::new());
        }

        let mut dist: FxHashMap<&str, f64> = FxHashMap::default();
        let mut prev: FxHashMap<&str, &str> = FxHashMap::default();
        let mut visited: FxHashSet<&str> = FxHashSet::default();
        let mut heap: BinaryHeap<QueueEntry> = BinaryHeap::new();

        dist.insert(start, 0.0);
        heap.push(QueueEntry { cost: 0.0, seq: 0, id: start.to_owned() });

        while let Some(QueueEntry { cost, id, .. }) = heap.pop() {
            let (current, node) = match self.nodes.get_key_value(id.as_str()) {
                Some((k, n)) => (k.as_str(), n),
                None => continue,
            };
            if !visited.insert(current) {
                continue; // stale heap entry
            }
            if current == goal {
                break;
            }

            for (neighbor_id, &travel_time) in &node.connections {
                let Some((nkey, neighbor)) = self.nodes.get_key_value(neighbor_id.as_str())
                else {
                    continue;
                };
                if visited.contains(nkey.as_str()) {
                    continue;
                }
                let next_cost = cost + edge_cost(neighbor, travel_time);
                if next_cost < dist.get(nkey.as_str()).copied().unwrap_or(f64::INFINITY) {
                    dist.insert(nkey.as_str(), next_cost);
                    prev.insert(nkey.as_str(), current);
                    heap.push(QueueEntry {
                        cost: next_cost,
                        seq: neighbor.seq,
                        id: nkey.clone(),
                    });
                }
            }
        }

        if !prev.contains_key(goal) {
            return None;
        }

        // Reconstruct, excluding start.
        let mut path: Vec<String> = Vec::new();
        let mut cursor = goal;
        while cursor != start {
            path.push(cursor.to_owned());
            cursor = *prev.get(cursor)?;
        }
        path.reverse();
        Some(path)
    }

    /// Direct travel time between adjacent nodes, or `+∞`.
    pub fn travel_time(&self, a: &str, b: &str) -> f64 {
        self.nodes
            .get(a)
            .and_then(|n| n.connections.get(b).copied())
            .unwrap_or(f64::INFINITY)
    }

    /// Sum of edge weights along `path`, starting from `start`.
    pub fn total_path_time(&self, path: &[String], start: &str) -> f64 {
        let mut total = 0.0;
        let mut prev = start;
        for node_id in path {
            total += self.travel_time(prev, node_id);
            prev = node_id;
        }
        total
    }

    // ── Feature queries ───────────────────────────────────────────────────

    /// All shelter nodes, optionally filtered by zone, in insertion order.
    pub fn nodes_with_shelter(&self, zone: Option<&str>) -> Vec<&SubzoneNode> {
        self.iter()
            .filter(|n| n.shelter)
            .filter(|n| zone.is_none_or(|z| n.zone == z))
            .collect()
    }

    /// Nodes that have at least one container, optionally zone-filtered.
    pub fn nodes_with_containers(&self, zone: Option<&str>) -> Vec<&SubzoneNode> {
        self.iter()
            .filter(|n| n.has_containers())
            .filter(|n| zone.is_none_or(|z| n.zone == z))
            .collect()
    }

    /// Subzone node closest to tile `(x, y)` within `zone`, by Euclidean
    /// distance over anchors.  `None` when the zone has no nodes.
    pub fn nearest_node_to_tile(&self, zone: &str, x: f64, y: f64) -> Option<&SubzoneNode> {
        let entry = self.spatial.get(zone)?.nearest_neighbor(&[x, y])?;
        self.nodes.get(&entry.id)
    }
}
