//! LOD promotion and demotion.
//!
//! Moves an actor *atomically* between the two simulation regimes.  World
//! state must stay consistent across a transition: no items appearing or
//! vanishing, no teleports, no combat outcome changing because the player
//! walked away.
//!
//! Classification, per throttled sweep:
//!
//! - **high**   — same zone as the player, within [`HIGH_RADIUS`] tiles
//! - **medium** — same zone, farther out (tile-resident; movement runs,
//!   brain on, vision/combat dormant as an external concern)
//! - **low**    — different zone (graph-resident, scheduler-driven)
//!
//! Invariants restored after every transition: exactly one of
//! `TilePos`/`GraphPos`; `Lod.level` matches the positional component; a
//! fresh promotion has no pending events; a fresh demotion has a hunger
//! prediction and a decision cycle queued.

use serde_json::json;

use hl_core::{secs_to_min, Actor, SimRng};
use hl_graph::SubzoneGraph;
use hl_schedule::{EventData, EventKind, Scheduler};
use hl_world::{
    ActorKind, Brain, Collider, Facing, GraphPos, Hurtbox, Identity, Lod, LodLevel, Player,
    TilePos, TravelPlan, Velocity, World, BB_ATTACK_TARGET, BB_PENDING_DESTINATION,
    BB_WAS_TRAVELING,
};

use crate::combat::{handle_death, stat_check_combat};
use crate::handlers::schedule_hunger_event;

/// Full-sim radius around the player, in tiles.
pub const HIGH_RADIUS: f64 = 20.0;
/// Post-promotion orientation window, in game-seconds.
pub const GRACE_PERIOD_SECS: f64 = 0.5;
/// Minimum game-seconds between LOD sweeps.
pub const LOD_SWEEP_SECS: f64 = 0.25;

// ── External tile queries ─────────────────────────────────────────────────────

/// Passability oracle supplied by the tile-map collaborator.
///
/// The LOD engine only needs two questions answered when picking a
/// promotion spot; everything else about tiles stays outside the core.
pub trait TileProbe {
    fn is_passable(&self, zone: &str, x: f64, y: f64) -> bool;

    /// A random passable tile within `radius` of `(x, y)`, if any.
    fn random_passable_spot(
        &self,
        zone: &str,
        x: f64,
        y: f64,
        radius: f64,
        rng: &mut SimRng,
    ) -> Option<(f64, f64)>;
}

/// Everything-is-passable probe (tests, headless runs).
#[derive(Default)]
pub struct OpenGround;

impl TileProbe for OpenGround {
    fn is_passable(&self, _zone: &str, _x: f64, _y: f64) -> bool {
        true
    }

    fn random_passable_spot(
        &self,
        _zone: &str,
        x: f64,
        y: f64,
        radius: f64,
        rng: &mut SimRng,
    ) -> Option<(f64, f64)> {
        let dx = rng.gen_range(-radius..=radius);
        let dy = rng.gen_range(-radius..=radius);
        Some((x + dx, y + dy))
    }
}

// ── Promotion: low → tile-resident ────────────────────────────────────────────

/// Promote a graph-resident actor into the real-time world.
///
/// Settlements are abstract and never promote.  Containers receive only a
/// `TilePos`; mobile kinds also get movement and combat plumbing.  Returns
/// whether the promotion happened.
pub fn promote_actor(
    world: &mut World,
    graph: &SubzoneGraph,
    sched: &mut Scheduler,
    rng: &mut SimRng,
    probe: &dyn TileProbe,
    actor: Actor,
    now: f64,
) -> bool {
    let Some(pos) = world.get::<GraphPos>(actor).cloned() else {
        return false;
    };
    let Some(node) = graph.node(&pos.node) else {
        // No node data — nowhere to place the actor.
        return false;
    };
    let kind = world.get::<Identity>(actor).map_or(ActorKind::Npc, |i| i.kind);
    if kind == ActorKind::Settlement {
        return false;
    }

    // Pick a tile spot: jittered anchor, exact anchor, any passable tile
    // near the anchor — and failing all that, the raw anchor regardless.
    let (ax, ay) = (node.anchor.0 as f64, node.anchor.1 as f64);
    let mut tile_x = ax + rng.gen_range(-2.0..=2.0);
    let mut tile_y = ay + rng.gen_range(-2.0..=2.0);
    if !probe.is_passable(&pos.zone, tile_x, tile_y) {
        (tile_x, tile_y) = (ax, ay);
        if !probe.is_passable(&pos.zone, tile_x, tile_y) {
            if let Some(spot) = probe.random_passable_spot(&pos.zone, ax, ay, 6.0, rng) {
                (tile_x, tile_y) = spot;
            }
        }
    }

    // The event-driven future is void once the real-time brain takes over.
    sched.cancel_actor(actor);

    let pending_route = world
        .get::<TravelPlan>(actor)
        .filter(|p| !p.complete())
        .map(|p| p.destination.clone());

    world.detach::<GraphPos>(actor);
    world.detach::<TravelPlan>(actor);
    world.attach(actor, TilePos { x: tile_x, y: tile_y, zone: pos.zone.clone() });
    world.zone_set(actor, &pos.zone);

    if kind != ActorKind::Container {
        if !world.has::<Velocity>(actor) {
            world.attach(actor, Velocity::default());
        }
        if !world.has::<Facing>(actor) {
            world.attach(actor, Facing::default());
        }
        if matches!(kind, ActorKind::Npc | ActorKind::Corpse) {
            if !world.has::<Collider>(actor) {
                world.attach(actor, Collider::default());
            }
            if !world.has::<Hurtbox>(actor) {
                world.attach(actor, Hurtbox::default());
            }
        }
    }

    let grace_until = now + secs_to_min(GRACE_PERIOD_SECS);
    match world.get_mut::<Lod>(actor) {
        Some(lod) => {
            lod.level = LodLevel::High;
            lod.grace_until = grace_until;
        }
        None => world.attach(actor, Lod { level: LodLevel::High, grace_until }),
    }

    if let Some(brain) = world.get_mut::<Brain>(actor) {
        brain.active = true;
        if let Some(destination) = pending_route {
            // Hand the interrupted route to the real-time brain.
            brain.state.insert(BB_PENDING_DESTINATION.to_owned(), json!(destination));
            brain.state.insert(BB_WAS_TRAVELING.to_owned(), json!(true));
        }
    }

    tracing::debug!(target: "sim::lod", actor = actor.0, zone = %pos.zone,
        x = tile_x, y = tile_y, "promoted to high LOD");
    true
}

// ── Demotion: tile-resident → low ─────────────────────────────────────────────

/// Demote a tile-resident actor into the event-driven world.
///
/// A mid-fight actor has its combat resolved first by stat check; losing
/// without fleeing takes the death path instead of demoting.  Returns
/// whether the actor left the real-time world (including by dying).
pub fn demote_actor(
    world: &mut World,
    graph: &SubzoneGraph,
    sched: &mut Scheduler,
    rng: &mut SimRng,
    actor: Actor,
    now: f64,
) -> bool {
    if world.has::<Player>(actor) {
        return false;
    }
    let Some(pos) = world.get::<TilePos>(actor).cloned() else {
        return false;
    };
    let Some(node) = graph.nearest_node_to_tile(&pos.zone, pos.x.floor(), pos.y.floor())
    else {
        // No subzone data for this zone — can't demote.
        return false;
    };
    let node_id = node.id.clone();

    // Resolve an in-progress fight before freezing the actor.
    let attack_target = world
        .get::<Brain>(actor)
        .filter(|b| b.active)
        .and_then(|b| b.state.get(BB_ATTACK_TARGET))
        .and_then(|v| v.as_u64())
        .map(Actor);
    if let Some(target) = attack_target {
        if world.alive(target) {
            let result = stat_check_combat(world, rng, actor, target);
            if result.loser == actor && !result.fled {
                // Died on the way out: settle the position first so the
                // corpse lands on the right node.
                world.detach::<TilePos>(actor);
                world.zone_remove(actor);
                world.attach(
                    actor,
                    GraphPos { zone: pos.zone.clone(), node: node_id.clone() },
                );
                handle_death(world, sched, rng, actor, &node_id);
                return true;
            }
        }
    }

    world.detach::<TilePos>(actor);
    world.zone_remove(actor);
    world.attach(actor, GraphPos { zone: pos.zone.clone(), node: node_id.clone() });

    if let Some(vel) = world.get_mut::<Velocity>(actor) {
        *vel = Velocity::default();
    }
    if let Some(brain) = world.get_mut::<Brain>(actor) {
        brain.active = false;
        brain.state.clear();
    }
    match world.get_mut::<Lod>(actor) {
        Some(lod) => lod.level = LodLevel::Low,
        None => world.attach(actor, Lod { level: LodLevel::Low, grace_until: 0.0 }),
    }

    // The initial event bundle: a hunger prediction plus a decision cycle.
    schedule_hunger_event(world, sched, actor, now);
    sched.post_delta(
        now,
        rng.gen_range(1.0..5.0),
        actor,
        EventKind::DecisionCycle,
        EventData::at(&node_id),
    );

    tracing::debug!(target: "sim::lod", actor = actor.0, node = %node_id,
        "demoted to low LOD");
    true
}

// ── Zone change + sweep ───────────────────────────────────────────────────────

/// Player entered `new_zone`: promote every graph-resident actor there,
/// demote every tile-resident non-player elsewhere.  Single-pass and
/// idempotent — calling it twice changes nothing the second time.
pub fn on_player_enter_zone(
    world: &mut World,
    graph: &SubzoneGraph,
    sched: &mut Scheduler,
    rng: &mut SimRng,
    probe: &dyn TileProbe,
    new_zone: &str,
    now: f64,
) -> (usize, usize) {
    let to_promote: Vec<Actor> = world
        .all_of::<GraphPos>()
        .into_iter()
        .filter(|(_, pos)| pos.zone == new_zone)
        .map(|(actor, _)| actor)
        .collect();
    let mut promoted = 0;
    for actor in to_promote {
        if promote_actor(world, graph, sched, rng, probe, actor, now) {
            promoted += 1;
        }
    }

    let to_demote: Vec<Actor> = world
        .all_of::<TilePos>()
        .into_iter()
        .filter(|(actor, pos)| pos.zone != new_zone && !world.has::<Player>(*actor))
        .map(|(actor, _)| actor)
        .collect();
    let mut demoted = 0;
    for actor in to_demote {
        if demote_actor(world, graph, sched, rng, actor, now) {
            demoted += 1;
        }
    }

    tracing::info!(target: "sim::lod", zone = new_zone, promoted, demoted, "zone transition");
    (promoted, demoted)
}

/// Sweep throttle state, carried by the sim owner rather than any
/// module-level static.
#[derive(Default)]
pub struct LodSweep {
    last_sweep_min: Option<f64>,
}

/// Distance-based LOD classification, throttled to [`LOD_SWEEP_SECS`] of
/// game time.  Runs strictly between tick calls.
pub fn lod_sweep(
    world: &mut World,
    graph: &SubzoneGraph,
    sched: &mut Scheduler,
    rng: &mut SimRng,
    probe: &dyn TileProbe,
    sweep: &mut LodSweep,
    now: f64,
) {
    let interval = secs_to_min(LOD_SWEEP_SECS);
    if sweep
        .last_sweep_min
        .is_some_and(|last| now - last < interval)
    {
        return;
    }
    sweep.last_sweep_min = Some(now);

    let Some((_, (_, player_pos))) = world.query_one::<(Player, TilePos)>() else {
        return;
    };
    let player_pos = player_pos.clone();

    // Graph-resident actors that wandered into the player's zone surface
    // into the real-time world.
    let to_promote: Vec<Actor> = world
        .all_of::<GraphPos>()
        .into_iter()
        .filter(|(_, pos)| pos.zone == player_pos.zone)
        .map(|(actor, _)| actor)
        .collect();
    for actor in to_promote {
        promote_actor(world, graph, sched, rng, probe, actor, now);
    }

    // Tile-resident actors: re-tier by distance, demote zone-strays.
    let tiled: Vec<(Actor, TilePos)> = world
        .all_of::<TilePos>()
        .into_iter()
        .filter(|(actor, _)| !world.has::<Player>(*actor))
        .map(|(actor, pos)| (actor, pos.clone()))
        .collect();

    for (actor, pos) in tiled {
        if pos.zone != player_pos.zone {
            demote_actor(world, graph, sched, rng, actor, now);
            continue;
        }

        let dx = pos.x - player_pos.x;
        let dy = pos.y - player_pos.y;
        let within_high = dx * dx + dy * dy <= HIGH_RADIUS * HIGH_RADIUS;
        let target = if within_high { LodLevel::High } else { LodLevel::Medium };

        let needs_change = world.get::<Lod>(actor).map_or(true, |l| l.level != target);
        if !needs_change {
            continue;
        }
        let grace_until = now + secs_to_min(GRACE_PERIOD_SECS);
        match world.get_mut::<Lod>(actor) {
            Some(lod) => {
                lod.level = target;
                if target == LodLevel::High {
                    lod.grace_until = grace_until;
                }
            }
            None => world.attach(
                actor,
                Lod {
                    level: target,
                    grace_until: if target == LodLevel::High { grace_until } else { 0.0 },
                },
            ),
        }
        // Medium keeps the brain running; movement is real even when
        // vision and combat are dormant.
        if let Some(brain) = world.get_mut::<Brain>(actor) {
            brain.active = true;
        }
    }
}

// ── Queries ───────────────────────────────────────────────────────────────────

/// Is the actor currently owned by the real-time world?  Used by the tick
/// pump to drop events for actors the player can see.
pub fn is_high_lod(world: &World, actor: Actor) -> bool {
    if world
        .get::<Lod>(actor)
        .is_some_and(|l| l.level == LodLevel::High)
    {
        return true;
    }
    world.has::<TilePos>(actor) && !world.has::<GraphPos>(actor)
}
