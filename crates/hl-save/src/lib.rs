//! `hl-save` — game-state persistence.
//!
//! Save files (JSON, `format_version = 2`) store only runtime state: the
//! player, every simulated actor (tile- or graph-resident form), and the
//! pending scheduler queue.  Static template data (tile layouts, spawn
//! definitions, the subzone graph) lives in its own files and is merged
//! back at load time by the caller:
//!
//! 1. load the zone templates and subzone graph,
//! 2. [`load_json`] the save (a corrupt or version-mismatched file loads
//!    as `None` — treat it as a new game),
//! 3. [`restore`] entities into a fresh `World` and replay the queue.
//!
//! Collection order in the file is deterministic (`BTreeMap` keys, actor
//! ids as strings), so save → load → save reproduces the entities section
//! byte for byte.

pub mod error;
pub mod record;
pub mod state;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{SaveError, SaveResult};
pub use record::{EntityRecord, PlayerRecord, SaveData, SimMode, FORMAT_VERSION};
pub use state::{capture, load_json, restore, to_json};
