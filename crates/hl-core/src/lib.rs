//! `hl-core` — foundational types for the `hinterland` off-screen world
//! simulation.
//!
//! This crate is a dependency of every other `hl-*` crate.  It intentionally
//! has no `hl-*` dependencies and minimal external ones (only `rand`,
//! `serde`, and `thiserror`).
//!
//! # What lives here
//!
//! | Module    | Contents                                                  |
//! |-----------|-----------------------------------------------------------|
//! | [`ids`]   | `Actor` — stable entity identifier                        |
//! | [`time`]  | `GameClock`, minute/second conversions, day constants     |
//! | [`rng`]   | `SimRng` (world stream), `perception_roll` (hash stream)  |
//! | [`error`] | `HlError`, `HlResult`                                     |

pub mod error;
pub mod ids;
pub mod rng;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{HlError, HlResult};
pub use ids::Actor;
pub use rng::{perception_roll, SimRng};
pub use time::{GameClock, min_to_secs, secs_to_min, DAY_LENGTH_MIN, SECS_PER_MIN};
