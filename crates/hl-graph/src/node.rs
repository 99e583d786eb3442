//! `SubzoneNode` — a meaningful area within a zone.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use hl_core::Actor;

/// A single subzone.
///
/// Nodes reference their neighbours by id (never by pointer); the graph is
/// the owner.  Containers present at the node are referenced by actor id
/// and resolved through the component store — the node holds no entity
/// state of its own.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SubzoneNode {
    /// Unique identifier, e.g. `"pharmacy"`.
    pub id: String,
    /// Parent zone this subzone belongs to.
    pub zone: String,
    /// Tile coordinates of the anchor point within the zone.
    pub anchor: (i32, i32),
    /// Neighbour id → travel time in game-minutes.  Weights must be > 0.
    pub connections: BTreeMap<String, f64>,
    /// Ambient danger, added to edge costs by threat-aware routing.
    pub threat_level: f64,
    /// How easily actors here are spotted from adjacent nodes, in [0, 1].
    pub visibility: f64,
    /// Can actors rest/sleep here?
    pub shelter: bool,
    /// Harvestable resource classes present (`"farmable"`, `"scrap"`, …).
    pub resource_tags: BTreeSet<String>,
    /// Container actors at this node (real, shared state).
    pub container_actors: Vec<Actor>,
    /// Insertion index — routing tie-breaker.
    pub(crate) seq: u32,
}

impl SubzoneNode {
    pub fn new(id: &str, zone: &str, anchor: (i32, i32)) -> Self {
        Self {
            id: id.to_owned(),
            zone: zone.to_owned(),
            anchor,
            visibility: 1.0,
            ..Self::default()
        }
    }

    // ── Fluent setup (test fixtures, spawn descriptors) ───────────────────

    pub fn shelter(mut self, shelter: bool) -> Self {
        self.shelter = shelter;
        self
    }

    pub fn threat(mut self, level: f64) -> Self {
        self.threat_level = level;
        self
    }

    pub fn visibility(mut self, visibility: f64) -> Self {
        self.visibility = visibility.clamp(0.0, 1.0);
        self
    }

    pub fn tag(mut self, resource: &str) -> Self {
        self.resource_tags.insert(resource.to_owned());
        self
    }

    pub fn has_containers(&self) -> bool {
        !self.container_actors.is_empty()
    }
}
