//! Mutable simulation state passed to every event handler.

use rustc_hash::FxHashMap;

use hl_core::{Actor, SimRng};
use hl_graph::SubzoneGraph;
use hl_schedule::{EventData, EventKind, Scheduler};
use hl_world::World;

/// The borrow bundle handlers operate on.
///
/// Built per dispatch by `WorldSim::tick` from the sim's own fields; the
/// graph is shared, everything else is exclusive.  Handlers must finish
/// their state transitions or post further events — no handler may call
/// back into the tick pump.
pub struct SimCtx<'a> {
    pub world: &'a mut World,
    pub graph: &'a SubzoneGraph,
    pub sched: &'a mut Scheduler,
    pub rng: &'a mut SimRng,
    /// Current game-minute (the tick horizon, not the event's own time).
    pub now: f64,
}

/// One handler per event kind.  Plain `fn` pointers — the dispatch table is
/// static data, not a reflection surface.
pub type HandlerFn = fn(&mut SimCtx<'_>, Actor, &EventData);

/// Dispatch table from event kind to handler.
#[derive(Default)]
pub struct HandlerTable {
    map: FxHashMap<EventKind, HandlerFn>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for `kind`.  Exactly one handler per kind; a
    /// second registration replaces the first.
    pub fn register(&mut self, kind: EventKind, handler: HandlerFn) {
        self.map.insert(kind, handler);
    }

    pub fn get(&self, kind: EventKind) -> Option<HandlerFn> {
        self.map.get(&kind).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
