//! `hl-graph` — world topology for the off-screen simulation.
//!
//! The world is divided into zones (tile maps) and subzones (meaningful
//! areas within a zone).  Every location a graph-resident actor can occupy
//! is a subzone node; nodes form a weighted graph whose edge weights are
//! travel time in game-minutes.
//!
//! # Crate layout
//!
//! | Module     | Contents                                               |
//! |------------|--------------------------------------------------------|
//! | [`node`]   | `SubzoneNode`                                          |
//! | [`graph`]  | `SubzoneGraph`: routing + spatial and feature queries  |
//! | [`loader`] | declarative TOML graph description parser              |
//! | [`error`]  | `GraphError`, `GraphResult`                            |
//!
//! The graph is deterministic and read-heavy after load: route queries
//! break ties by node insertion order, never by hash-map iteration order.

pub mod error;
pub mod graph;
pub mod loader;
pub mod node;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{GraphError, GraphResult};
pub use graph::SubzoneGraph;
pub use node::SubzoneNode;
