//! `hl-schedule` — the heartbeat of off-screen time.
//!
//! Graph-resident actors cost zero CPU between events: each posts its next
//! meaningful state change to a priority queue ordered by game time, and
//! the world pump drains everything due each frame.
//!
//! # Crate layout
//!
//! | Module        | Contents                                        |
//! |---------------|-------------------------------------------------|
//! | [`event`]     | `EventKind`, `EventData`, `EventRecord`         |
//! | [`scheduler`] | `Scheduler` — soft-cancel min-heap              |
//!
//! Dispatch itself lives in `hl-sim` (`WorldSim::tick`): handlers need
//! `&mut World` and `&mut Scheduler` at once, so the scheduler exposes
//! [`Scheduler::pop_due`] and the sim layer owns the loop.

pub mod event;
pub mod scheduler;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use event::{EventData, EventKind, EventRecord};
pub use scheduler::{ScheduledEvent, Scheduler};
