//! `WorldMemory` — per-actor knowledge of the world beyond line of sight.
//!
//! A structured observation log with composite string keys
//! (`location:pharmacy`, `threat:road_crossroads`, `container:Actor(12)`),
//! timestamps, and TTL-based staleness.  Fresh entries drive routing and
//! decisions; stale entries are still consulted where a vague lead is
//! better than none (scavenging, raids).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Flexible observation payload — a string-keyed JSON object.
pub type MemData = serde_json::Map<String, serde_json::Value>;

/// Coerce a `serde_json::Value` into a [`MemData`] object.
///
/// Convenience for call sites built with `serde_json::json!`; non-object
/// values collapse to an empty payload.
pub fn object(value: serde_json::Value) -> MemData {
    match value {
        serde_json::Value::Object(map) => map,
        _ => MemData::new(),
    }
}

// ── MemoryEntry ───────────────────────────────────────────────────────────────

/// A single observation recorded by an actor.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Composite identifier, e.g. `"location:pharmacy"`.
    pub key: String,
    /// What was observed.
    pub data: MemData,
    /// Game-minute the observation was made.
    pub timestamp: f64,
    /// Game-minutes before the entry counts as stale.
    pub ttl: f64,
}

impl MemoryEntry {
    #[inline]
    pub fn is_stale(&self, now: f64) -> bool {
        now - self.timestamp > self.ttl
    }

    /// Numeric field accessor with a default, for `data` payloads.
    pub fn number(&self, key: &str, default: f64) -> f64 {
        self.data.get(key).and_then(|v| v.as_f64()).unwrap_or(default)
    }

    /// String field accessor, for `data` payloads.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    pub fn flag(&self, key: &str) -> bool {
        self.data.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
    }
}

// ── WorldMemory ───────────────────────────────────────────────────────────────

/// The observation log component.  `BTreeMap` keys give deterministic
/// iteration and a cheap prefix scan.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldMemory {
    pub entries: BTreeMap<String, MemoryEntry>,
}

impl WorldMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record or overwrite an observation.
    pub fn observe(&mut self, key: &str, data: MemData, now: f64, ttl: f64) {
        self.entries.insert(
            key.to_owned(),
            MemoryEntry { key: key.to_owned(), data, timestamp: now, ttl },
        );
    }

    /// Entry by key regardless of staleness, or `None`.
    pub fn recall(&self, key: &str) -> Option<&MemoryEntry> {
        self.entries.get(key)
    }

    /// Entry by key only if not stale.
    pub fn recall_fresh(&self, key: &str, now: f64) -> Option<&MemoryEntry> {
        self.entries.get(key).filter(|e| !e.is_stale(now))
    }

    /// All entries whose key starts with `prefix`; `stale_ok = false`
    /// filters expired entries out.
    pub fn query_prefix(&self, prefix: &str, now: f64, stale_ok: bool) -> Vec<&MemoryEntry> {
        self.entries
            .range(prefix.to_owned()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(_, e)| e)
            .filter(|e| stale_ok || !e.is_stale(now))
            .collect()
    }

    pub fn forget(&mut self, key: &str) {
        self.entries.remove(key);
    }

    /// Drop every stale entry.  Returns the count removed.
    pub fn purge_stale(&mut self, now: f64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_stale(now));
        before - self.entries.len()
    }
}
