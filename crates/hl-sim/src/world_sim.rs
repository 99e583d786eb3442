//! `WorldSim` — top-level orchestrator for the off-screen simulation.
//!
//! Owns the subzone graph, the scheduler, the handler table, the world RNG
//! stream, and the LOD sweep state; the component store is passed in by
//! the game loop.  One instance per running game — no module-level state
//! anywhere in the pipeline.

use hl_core::{Actor, SimRng};
use hl_graph::{GraphResult, SubzoneGraph};
use hl_schedule::Scheduler;
use hl_world::World;

use crate::ctx::{HandlerTable, SimCtx};
use crate::economy;
use crate::handlers::{self, bootstrap_hunger_events};
use crate::lod::{
    self, demote_actor, is_high_lod, lod_sweep, promote_actor, LodSweep, OpenGround, TileProbe,
};
use crate::meals::bootstrap_meal_events;

/// The off-screen world simulation.
///
/// ```text
/// let mut sim = WorldSim::from_graph_text(GRAPH, seed)?;
/// sim.bootstrap(&mut world, clock.minutes());
/// // each frame:
/// sim.sweep(&mut world, clock.minutes());
/// sim.tick(&mut world, clock.minutes());
/// ```
pub struct WorldSim<P: TileProbe = OpenGround> {
    pub graph: SubzoneGraph,
    pub scheduler: Scheduler,
    pub rng: SimRng,
    handlers: HandlerTable,
    probe: P,
    sweep_state: LodSweep,
    bootstrapped: bool,
}

impl WorldSim<OpenGround> {
    /// Sim over `graph` with the everything-passable tile probe.
    pub fn new(graph: SubzoneGraph, seed: u64) -> Self {
        Self::with_probe(graph, seed, OpenGround)
    }

    /// Parse a declarative graph description and build a sim over it.
    pub fn from_graph_text(text: &str, seed: u64) -> GraphResult<Self> {
        Ok(Self::new(SubzoneGraph::from_text(text)?, seed))
    }
}

impl<P: TileProbe> WorldSim<P> {
    /// Sim with an application-supplied tile probe.
    pub fn with_probe(graph: SubzoneGraph, seed: u64, probe: P) -> Self {
        Self {
            graph,
            scheduler: Scheduler::new(),
            rng: SimRng::new(seed),
            handlers: HandlerTable::new(),
            probe,
            sweep_state: LodSweep::default(),
            bootstrapped: false,
        }
    }

    // ── Setup ─────────────────────────────────────────────────────────────

    /// Register handlers and seed the initial event queue: a hunger
    /// prediction per graph-resident actor and the first communal meal
    /// wave.  Call once, after spawning and graph load.
    pub fn bootstrap(&mut self, world: &mut World, now: f64) {
        handlers::register_all(&mut self.handlers);

        let hunger_events = bootstrap_hunger_events(world, &mut self.scheduler, now);
        let meal_events = bootstrap_meal_events(world, &mut self.scheduler, now);

        tracing::info!(target: "sim", hunger_events, meal_events,
            nodes = self.graph.node_count(), "simulation bootstrapped");
        self.bootstrapped = true;
    }

    /// Place a container actor at a graph node (registers it on the node).
    pub fn place_container(
        &mut self,
        world: &mut World,
        node_id: &str,
        name: &str,
        items: &[(&str, u32)],
    ) -> Option<Actor> {
        economy::place_container(world, &mut self.graph, node_id, name, items)
    }

    // ── Per-frame driving ─────────────────────────────────────────────────

    /// Process every due event up to game-minute `now`.
    ///
    /// Events are dispatched in non-decreasing time order, `seq` breaking
    /// ties.  Cancelled entries, high-LOD actors, and dead actors are
    /// dropped without dispatch.  Handlers may post follow-ups: anything
    /// landing at or before `now` dispatches within this same call.
    ///
    /// Returns the number of events dispatched.
    pub fn tick(&mut self, world: &mut World, now: f64) -> usize {
        if !self.bootstrapped {
            return 0;
        }

        let mut count = 0;
        loop {
            let Some(event) = self.scheduler.pop_due(now) else {
                break;
            };
            if is_high_lod(world, event.actor) {
                continue; // the real-time brain owns this actor now
            }
            if !world.alive(event.actor) {
                continue;
            }
            let Some(handler) = self.handlers.get(event.kind) else {
                continue;
            };

            let mut ctx = SimCtx {
                world,
                graph: &self.graph,
                sched: &mut self.scheduler,
                rng: &mut self.rng,
                now,
            };
            handler(&mut ctx, event.actor, &event.data);
            count += 1;
        }

        self.scheduler.events_processed += count as u64;
        count
    }

    /// Throttled LOD classification sweep.  Run between `tick` calls.
    pub fn sweep(&mut self, world: &mut World, now: f64) {
        lod_sweep(
            world,
            &self.graph,
            &mut self.scheduler,
            &mut self.rng,
            &self.probe,
            &mut self.sweep_state,
            now,
        );
    }

    // ── LOD transitions ───────────────────────────────────────────────────

    /// Player changed zones: promote the new zone, demote everything else.
    /// Returns `(promoted, demoted)`.
    pub fn on_zone_change(&mut self, world: &mut World, new_zone: &str, now: f64) -> (usize, usize) {
        lod::on_player_enter_zone(
            world,
            &self.graph,
            &mut self.scheduler,
            &mut self.rng,
            &self.probe,
            new_zone,
            now,
        )
    }

    /// Promote one actor (graph-resident → tile-resident).
    pub fn promote(&mut self, world: &mut World, actor: Actor, now: f64) -> bool {
        promote_actor(
            world,
            &self.graph,
            &mut self.scheduler,
            &mut self.rng,
            &self.probe,
            actor,
            now,
        )
    }

    /// Demote one actor (tile-resident → graph-resident).
    pub fn demote(&mut self, world: &mut World, actor: Actor, now: f64) -> bool {
        demote_actor(
            world,
            &self.graph,
            &mut self.scheduler,
            &mut self.rng,
            actor,
            now,
        )
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn active(&self) -> bool {
        self.bootstrapped && !self.graph.is_empty()
    }

    /// Time of the next pending event, or `+∞`.
    pub fn next_event_time(&mut self) -> f64 {
        self.scheduler.peek_time()
    }
}
