//! Per-actor component types.
//!
//! Positional invariant: a simulated actor carries exactly one of
//! [`TilePos`] (real-time, tile-resident) or [`GraphPos`] (event-driven,
//! graph-resident).  The LOD engine is the only code allowed to flip
//! between them.
//!
//! All components derive `serde` so the save layer can persist them without
//! bespoke glue.  Collection-backed components use `BTreeMap` keys — save
//! round-trips must serialize identically run to run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ── Enums ─────────────────────────────────────────────────────────────────────

/// Simulation tier an actor currently runs at.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LodLevel {
    #[default]
    Low,
    Medium,
    High,
}

/// Broad category of an actor, used by spawning, LOD, and save code.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorKind {
    Player,
    #[default]
    Npc,
    Container,
    Corpse,
    Settlement,
}

impl ActorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ActorKind::Player => "player",
            ActorKind::Npc => "npc",
            ActorKind::Container => "container",
            ActorKind::Corpse => "corpse",
            ActorKind::Settlement => "settlement",
        }
    }
}

/// Stance toward actors outside one's own faction group.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    Hostile,
    #[default]
    Neutral,
    Friendly,
}

impl Disposition {
    pub const fn as_str(self) -> &'static str {
        match self {
            Disposition::Hostile => "hostile",
            Disposition::Neutral => "neutral",
            Disposition::Friendly => "friendly",
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackKind {
    #[default]
    Melee,
    Ranged,
}

// ── Position ──────────────────────────────────────────────────────────────────

/// Floating-point tile position — present iff the actor is tile-resident.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TilePos {
    pub x: f64,
    pub y: f64,
    pub zone: String,
}

/// Abstract graph position — present iff the actor is graph-resident.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphPos {
    pub zone: String,
    pub node: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Facing {
    pub dx: f64,
    pub dy: f64,
}

impl Default for Facing {
    fn default() -> Self {
        Self { dx: 0.0, dy: 1.0 }
    }
}

/// Solid body for the real-time collision resolver (external collaborator).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    pub half_w: f64,
    pub half_h: f64,
}

impl Default for Collider {
    fn default() -> Self {
        Self { half_w: 0.4, half_h: 0.4 }
    }
}

/// Damage-receiving box for the real-time combat system (external).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hurtbox {
    pub half_w: f64,
    pub half_h: f64,
}

impl Default for Hurtbox {
    fn default() -> Self {
        Self { half_w: 0.4, half_h: 0.4 }
    }
}

// ── Vitals ────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub current: f64,
    pub maximum: f64,
}

impl Default for Health {
    fn default() -> Self {
        Self { current: 100.0, maximum: 100.0 }
    }
}

impl Health {
    pub fn new(maximum: f64) -> Self {
        Self { current: maximum, maximum }
    }

    #[inline]
    pub fn ratio(&self) -> f64 {
        self.current / self.maximum.max(1.0)
    }
}

/// Hunger gauge — drains over time, restored by eating.
///
/// `current` runs from 0 (starving) to `maximum` (full).  `rate` is hunger
/// drained per game-second; `starve_dps` is HP damage per second once
/// `current` reaches 0 (applied by the real-time needs system).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hunger {
    pub current: f64,
    pub maximum: f64,
    pub rate: f64,
    pub starve_dps: f64,
}

impl Default for Hunger {
    fn default() -> Self {
        Self { current: 80.0, maximum: 100.0, rate: 0.03, starve_dps: 0.3 }
    }
}

impl Hunger {
    #[inline]
    pub fn ratio(&self) -> f64 {
        self.current / self.maximum.max(0.01)
    }
}

// ── Inventory / equipment ─────────────────────────────────────────────────────

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    pub items: BTreeMap<String, u32>,
}

impl Inventory {
    pub fn with_items<I: IntoIterator<Item = (String, u32)>>(items: I) -> Self {
        Self { items: items.into_iter().collect() }
    }

    pub fn add(&mut self, item_id: &str, count: u32) {
        if count > 0 {
            *self.items.entry(item_id.to_owned()).or_insert(0) += count;
        }
    }

    /// Remove up to `count` of `item_id`; returns the amount removed.
    pub fn remove(&mut self, item_id: &str, count: u32) -> u32 {
        let Some(have) = self.items.get_mut(item_id) else {
            return 0;
        };
        let taken = (*have).min(count);
        *have -= taken;
        if *have == 0 {
            self.items.remove(item_id);
        }
        taken
    }

    pub fn total(&self) -> u32 {
        self.items.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Equipped item ids (`""` for an empty slot).  Equipped items must also
/// exist in the actor's `Inventory`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    pub weapon: String,
    pub armor: String,
}

// ── Combat ────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CombatStats {
    pub damage: f64,
    pub defense: f64,
}

/// Sensor tuning for hostile awareness, plus the flee threshold consumed by
/// stat combat.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Threat {
    pub aggro_radius: f64,
    pub leash_radius: f64,
    pub flee_threshold: f64,
    pub sensor_interval: f64,
    pub last_sensor_time: f64,
}

impl Default for Threat {
    fn default() -> Self {
        Self {
            aggro_radius: 8.0,
            leash_radius: 16.0,
            flee_threshold: 0.0,
            sensor_interval: 0.3,
            last_sensor_time: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttackConfig {
    pub kind: AttackKind,
    pub range: f64,
    pub cooldown: f64,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self { kind: AttackKind::Melee, range: 1.2, cooldown: 0.5 }
    }
}

/// Movement speed, read by the stat-combat flee roll and the real-time
/// steering system.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Locomotion {
    pub speed: f64,
}

impl Default for Locomotion {
    fn default() -> Self {
        Self { speed: 2.0 }
    }
}

// ── Social ────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Faction {
    pub group: String,
    pub disposition: Disposition,
    /// Disposition to restore once an alert expires.
    pub home_disposition: Disposition,
    pub alert_radius: f64,
}

impl Faction {
    pub fn new(group: &str, disposition: Disposition) -> Self {
        Self {
            group: group.to_owned(),
            disposition,
            home_disposition: disposition,
            alert_radius: 10.0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Home {
    pub zone: String,
    pub node: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CrimeRecord {
    pub offenses: BTreeMap<String, u32>,
    pub total_witnessed: u32,
    pub decay_timer: f64,
}

/// Lock state on containers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Locked {
    pub faction_access: String,
    pub difficulty: f64,
}

// ── Travel ────────────────────────────────────────────────────────────────────

/// An in-flight route through the subzone graph.
///
/// `path` is the ordered node list from the current location to the
/// destination (start node excluded).  `cursor` points at the next node to
/// reach.  Attached by `begin_travel`, advanced by arrival handlers,
/// detached on completion.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TravelPlan {
    pub path: Vec<String>,
    pub cursor: usize,
    pub destination: String,
}

impl TravelPlan {
    pub fn new(path: Vec<String>, destination: &str) -> Self {
        Self { path, cursor: 0, destination: destination.to_owned() }
    }

    pub fn next_node(&self) -> Option<&str> {
        self.path.get(self.cursor).map(String::as_str)
    }

    pub fn complete(&self) -> bool {
        self.cursor >= self.path.len()
    }

    /// Move to the next node.  Returns the node stepped over, or `None` if
    /// the plan was already complete.
    pub fn advance(&mut self) -> Option<String> {
        let node = self.path.get(self.cursor).cloned()?;
        self.cursor += 1;
        Some(node)
    }
}

// ── Identity / LOD / brain ────────────────────────────────────────────────────

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub kind: ActorKind,
}

impl Identity {
    pub fn new(name: &str, kind: ActorKind) -> Self {
        Self { name: name.to_owned(), kind }
    }
}

/// Level-of-detail state.
///
/// `grace_until` is the absolute game-minute until which a freshly promoted
/// actor is "orienting" — the real-time brain skips it so it does not act
/// on stale pre-promotion state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Lod {
    pub level: LodLevel,
    pub grace_until: f64,
}

/// String-keyed heterogeneous scratch space for the real-time brain.
pub type Blackboard = BTreeMap<String, serde_json::Value>;

/// Handle the real-time engine drives an actor through.
///
/// The core never matches on `kind` — only the external real-time engine
/// interprets it (`hostile_melee`, `guard`, `villager`, …).  `active` is
/// false exactly when the actor is low-LOD.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Brain {
    pub kind: String,
    pub active: bool,
    pub state: Blackboard,
}

impl Brain {
    pub fn new(kind: &str) -> Self {
        Self { kind: kind.to_owned(), active: false, state: Blackboard::new() }
    }
}

/// Blackboard key carrying the travel destination across a promotion.
pub const BB_PENDING_DESTINATION: &str = "pending_destination";
/// Blackboard flag marking that the actor was mid-route when promoted.
pub const BB_WAS_TRAVELING: &str = "was_traveling";
/// Blackboard key the real-time brain uses for its current combat target.
pub const BB_ATTACK_TARGET: &str = "attack_target";

// ── Loot ──────────────────────────────────────────────────────────────────────

/// Marks a corpse or cache as lootable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Loot {
    pub looted: bool,
}

/// Names the loot table rolled into this actor's corpse on death.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LootTableRef {
    pub table: String,
}

// ── Settlements ───────────────────────────────────────────────────────────────

/// Shared resource pool for a settlement or camp.
///
/// Attached to a settlement actor, not to individual NPCs; residents
/// reference it through their `Home`.  Withdrawals are real — what one
/// actor eats is gone for everyone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stockpile {
    pub items: BTreeMap<String, u32>,
    pub capacity: f64,
}

impl Default for Stockpile {
    fn default() -> Self {
        Self { items: BTreeMap::new(), capacity: 200.0 }
    }
}

impl Stockpile {
    pub fn add(&mut self, item_id: &str, count: u32) -> u32 {
        *self.items.entry(item_id.to_owned()).or_insert(0) += count;
        count
    }

    /// Remove up to `count`; returns the amount actually removed.
    pub fn remove(&mut self, item_id: &str, count: u32) -> u32 {
        let Some(have) = self.items.get_mut(item_id) else {
            return 0;
        };
        let taken = (*have).min(count);
        *have -= taken;
        if *have == 0 {
            self.items.remove(item_id);
        }
        taken
    }

    pub fn has(&self, item_id: &str, count: u32) -> bool {
        self.items.get(item_id).copied().unwrap_or(0) >= count
    }

    pub fn total_count(&self) -> u32 {
        self.items.values().sum()
    }
}

// ── Player ────────────────────────────────────────────────────────────────────

/// Marks the player actor.  Never demoted, never scheduler-driven.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub speed: f64,
}

impl Default for Player {
    fn default() -> Self {
        Self { speed: 80.0 }
    }
}
