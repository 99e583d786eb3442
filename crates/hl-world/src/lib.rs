//! `hl-world` — the component store and component types for hinterland.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                   |
//! |----------------|------------------------------------------------------------|
//! | [`store`]      | `World`: typed attach/detach/query, zone index, resources  |
//! | [`components`] | All per-actor component structs and enums                  |
//! | [`memory`]     | `WorldMemory` — TTL'd observation log                      |
//! | [`items`]      | `ItemRegistry` resource                                    |
//! | [`loot`]       | `LootTableManager` resource + TOML loader                  |
//!
//! The store is the single source of truth for actor state.  It is mutated
//! only from the main thread (handler and LOD code); there is no interior
//! mutability and no locking.

pub mod components;
pub mod items;
pub mod loot;
pub mod memory;
pub mod store;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use components::{
    ActorKind, AttackConfig, AttackKind, Blackboard, Brain, Collider, CombatStats, CrimeRecord,
    Disposition, Equipment, Facing, Faction, GraphPos, Health, Home, Hunger, Hurtbox, Identity,
    Inventory, Locked, Locomotion, Lod, LodLevel, Loot, LootTableRef, Player, Stockpile, Threat,
    TilePos, TravelPlan, Velocity, BB_ATTACK_TARGET, BB_PENDING_DESTINATION, BB_WAS_TRAVELING,
};
pub use items::{ItemDef, ItemRegistry};
pub use loot::LootTableManager;
pub use memory::{object, MemData, MemoryEntry, WorldMemory};
pub use store::{Component, ComponentSet, World};
