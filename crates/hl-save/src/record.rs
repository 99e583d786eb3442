//! Save-file record structs.
//!
//! Every optional field uses `skip_serializing_if` so absent components
//! leave no trace in the file, and every collection is ordered — two saves
//! of the same world are byte-identical.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use hl_schedule::EventRecord;
use hl_world::{ActorKind, CrimeRecord, Locked, LodLevel, MemData};

/// Current save format.  Anything else refuses to load.
pub const FORMAT_VERSION: u32 = 2;

// ── Leaf records ──────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    pub current: f64,
    pub maximum: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HungerRecord {
    pub current: f64,
    pub rate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EquipmentRecord {
    pub weapon: String,
    pub armor: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubzonePosRecord {
    pub zone: String,
    pub subzone: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub key: String,
    pub data: MemData,
    pub timestamp: f64,
    pub ttl: f64,
}

/// Which simulation regime the entity was captured in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimMode {
    High,
    Low,
}

// ── Player ────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub zone: String,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<BTreeMap<String, u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment: Option<EquipmentRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hunger: Option<HungerRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crime_record: Option<CrimeRecord>,
}

// ── Entities ──────────────────────────────────────────────────────────────────

/// One saved non-player entity, in either simulation regime.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub sim_mode: SimMode,

    // ── Tile-resident fields ──────────────────────────────────────────────
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,

    // ── Graph-resident fields ─────────────────────────────────────────────
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subzone_pos: Option<SubzonePosRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<SubzonePosRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world_memory: Option<Vec<MemoryRecord>>,

    // ── Shared fields ─────────────────────────────────────────────────────
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ActorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lod: Option<LodLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hunger: Option<HungerRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<BTreeMap<String, u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment: Option<EquipmentRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crime_record: Option<CrimeRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<Locked>,
}

// ── Top level ─────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    pub format_version: u32,
    pub player: Option<PlayerRecord>,
    /// Non-player entities keyed by actor id (as a string).
    pub entities: BTreeMap<String, EntityRecord>,
    /// Reserved for per-zone flags.
    #[serde(default)]
    pub zone_state: MemData,
    /// Pending events in posting order, cancelled entries excluded.
    #[serde(default)]
    pub scheduler_queue: Vec<EventRecord>,
}
