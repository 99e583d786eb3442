//! `hl-sim` — the off-screen simulation engine.
//!
//! Keeps thousands of actors alive, deciding, travelling, and fighting
//! while the player is elsewhere, at near-zero cost per actor.  Only actors
//! near the player run as real-time tile agents; the rest live on the
//! subzone graph and are advanced by scheduled events.
//!
//! # Event loop
//!
//! ```text
//! game loop, once per frame:
//!   ① sim.sweep(world, now)   — LOD classification (throttled)
//!   ② sim.tick(world, now)    — drain every event with time <= now:
//!        cancelled?  skip          (soft-cancel)
//!        high-LOD?   skip          (real-time brain owns the actor)
//!        dead?       skip
//!        dispatch handler(ctx, actor, payload)
//! ```
//!
//! LOD transitions and dispatches never interleave: the sweep runs between
//! `tick` calls, on the same thread.
//!
//! # Crate layout
//!
//! | Module         | Contents                                            |
//! |----------------|-----------------------------------------------------|
//! | [`ctx`]        | `SimCtx` borrow bundle, `HandlerTable`              |
//! | [`world_sim`]  | `WorldSim` orchestrator (bootstrap, tick, sweep)    |
//! | [`lod`]        | promote / demote / sweep / zone change, `TileProbe` |
//! | [`handlers`]   | one handler per `EventKind`, eating helpers         |
//! | [`checkpoint`] | presence / discovery / interrupt on node arrival    |
//! | [`decision`]   | five-priority decision stack                        |
//! | [`combat`]     | closed-form stat combat + encounter wrapper         |
//! | [`travel`]     | route planning and multi-hop travel                 |
//! | [`economy`]    | settlements, stockpiles, container placement        |
//! | [`meals`]      | communal mealtime drive                             |

pub mod checkpoint;
pub mod combat;
pub mod ctx;
pub mod decision;
pub mod economy;
pub mod handlers;
pub mod lod;
pub mod meals;
pub mod travel;
pub mod world_sim;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use checkpoint::{run_checkpoint, CheckpointOutcome};
pub use combat::{resolve_encounter, stat_check_combat, CombatResult};
pub use ctx::{HandlerFn, HandlerTable, SimCtx};
pub use decision::run_decision_cycle;
pub use lod::{demote_actor, is_high_lod, promote_actor, OpenGround, TileProbe};
pub use world_sim::WorldSim;
