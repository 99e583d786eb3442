//! Checkpoint evaluation at subzone arrivals.
//!
//! When an `ARRIVE_NODE` event fires, the checkpoint decides what actually
//! happens at the node:
//!
//! 1. **Presence** — who else is here (and next door)?  Hostiles mean
//!    combat; friendlies swap memories.
//! 2. **Discovery** — record the node, its containers, and bystanders into
//!    the actor's memory.
//! 3. **Interrupt** — should the actor drop its plan (eat, search, rest)?
//! 4. Otherwise continue the route, or report arrival.
//!
//! Adjacent-node awareness multiplies both nodes' `visibility`: open road
//! lets actors spot hostiles a node away, dense ruins require co-location.
//! The roll is a deterministic hash, not the world RNG stream, so combat
//! seeds survive any number of perception checks.

use serde_json::json;

use hl_core::{perception_roll, Actor};
use hl_graph::SubzoneNode;
use hl_schedule::{EventData, EventKind};
use hl_world::{
    object, AttackConfig, Disposition, Faction, GraphPos, Health, Hunger, Identity, Inventory,
    MemoryEntry, TravelPlan, World, WorldMemory,
};

use crate::combat::resolve_encounter;
use crate::ctx::SimCtx;
use crate::travel::continue_travel;

/// What the arrival amounted to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CheckpointOutcome {
    /// Proceeding along the travel plan.
    Continue,
    /// Hostile encounter initiated.
    Encounter,
    /// Diverted to a new activity (eat, search, rest).
    Divert,
    /// Reached the destination.
    Arrived,
}

/// Memory prefixes exchanged between friendly actors on contact.
const SHARED_PREFIXES: [&str; 3] = ["location:", "threat:", "crime:"];

// ── Entry point ───────────────────────────────────────────────────────────────

/// Run the full checkpoint for `actor` arriving at `node_id`.
pub fn run_checkpoint(ctx: &mut SimCtx<'_>, actor: Actor, node_id: &str) -> CheckpointOutcome {
    let graph = ctx.graph;
    let Some(node) = graph.node(node_id) else {
        return CheckpointOutcome::Continue;
    };

    if presence_check(ctx, actor, node) {
        return CheckpointOutcome::Encounter;
    }

    discovery_check(ctx.world, actor, node, ctx.now);

    if interrupt_check(ctx, actor, node) {
        return CheckpointOutcome::Divert;
    }

    let plan_active = ctx
        .world
        .get::<TravelPlan>(actor)
        .is_some_and(|p| !p.complete());
    if plan_active {
        let continued =
            continue_travel(ctx.world, actor, node_id, ctx.graph, ctx.sched, ctx.now);
        return if continued {
            CheckpointOutcome::Continue
        } else {
            CheckpointOutcome::Arrived
        };
    }

    CheckpointOutcome::Arrived
}

// ── Presence ──────────────────────────────────────────────────────────────────

/// Same-node and adjacent-node awareness.  Returns `true` when a hostile
/// encounter was triggered.
fn presence_check(ctx: &mut SimCtx<'_>, actor: Actor, node: &SubzoneNode) -> bool {
    let my_faction = ctx.world.get::<Faction>(actor).cloned();

    // ── Same node: always detected ────────────────────────────────────────
    for other in entities_at_node(ctx.world, &node.id, Some(actor)) {
        let other_faction = ctx.world.get::<Faction>(other).cloned();
        match relationship(my_faction.as_ref(), other_faction.as_ref()) {
            Disposition::Hostile => {
                resolve_encounter(ctx, actor, other, &node.id);
                return true;
            }
            Disposition::Friendly => share_memories(ctx.world, actor, other, ctx.now),
            Disposition::Neutral => {}
        }
    }

    // ── Adjacent nodes: visibility-gated ──────────────────────────────────
    let graph = ctx.graph;
    for (neighbor_id, &travel_time) in &node.connections {
        let Some(neighbor) = graph.node(neighbor_id) else {
            continue;
        };
        let detection_chance = node.visibility * neighbor.visibility;
        if perception_roll(actor, neighbor_id, ctx.now) > detection_chance {
            continue; // low visibility — didn't spot them
        }

        for other in entities_at_node(ctx.world, neighbor_id, Some(actor)) {
            let other_faction = ctx.world.get::<Faction>(other).cloned();
            match relationship(my_faction.as_ref(), other_faction.as_ref()) {
                Disposition::Hostile => {
                    let hp_ratio = ctx
                        .world
                        .get::<Health>(actor)
                        .map_or(1.0, Health::ratio);
                    if hp_ratio < 0.3 {
                        // Too weak to engage — the interrupt check decides
                        // what to do instead.
                        continue;
                    }
                    ctx.sched.post(
                        ctx.now + travel_time,
                        actor,
                        EventKind::ArriveNode,
                        EventData::travel(neighbor_id, &node.id),
                    );
                    tracing::debug!(target: "sim::checkpoint", actor = actor.0,
                        at = %neighbor_id, "spotted hostile, moving to engage");
                    return true;
                }
                Disposition::Friendly => {
                    let name = ctx
                        .world
                        .get::<Identity>(other)
                        .map_or_else(|| "unknown".to_owned(), |i| i.name.clone());
                    if let Some(memory) = ctx.world.get_mut::<WorldMemory>(actor) {
                        memory.observe(
                            &format!("nearby:{}", other.0),
                            object(json!({ "node": neighbor_id, "name": name })),
                            ctx.now,
                            60.0,
                        );
                    }
                }
                Disposition::Neutral => {}
            }
        }
    }

    false
}

/// Relationship between two factions, reduced to the disposition scale.
///
/// Same group is always friendly; any hostile disposition makes the pair
/// hostile; two friendlies are friendly; everything else is neutral.
fn relationship(mine: Option<&Faction>, theirs: Option<&Faction>) -> Disposition {
    let (Some(a), Some(b)) = (mine, theirs) else {
        return Disposition::Neutral;
    };
    if a.group == b.group {
        return Disposition::Friendly;
    }
    if a.disposition == Disposition::Hostile || b.disposition == Disposition::Hostile {
        return Disposition::Hostile;
    }
    if a.disposition == Disposition::Friendly && b.disposition == Disposition::Friendly {
        return Disposition::Friendly;
    }
    Disposition::Neutral
}

/// Living actors whose `GraphPos.node` equals `node_id`.
pub fn entities_at_node(world: &World, node_id: &str, exclude: Option<Actor>) -> Vec<Actor> {
    world
        .all_of::<GraphPos>()
        .into_iter()
        .filter(|(actor, pos)| pos.node == node_id && Some(*actor) != exclude)
        .map(|(actor, _)| actor)
        .collect()
}

// ── Discovery ─────────────────────────────────────────────────────────────────

/// Record the node, its containers, and co-located actors into memory.
fn discovery_check(world: &mut World, actor: Actor, node: &SubzoneNode, now: f64) {
    if !world.has::<WorldMemory>(actor) {
        return;
    }

    // Read phase: everything observed, before taking the memory mutably.
    let container_facts: Vec<(Actor, bool, u32)> = node
        .container_actors
        .iter()
        .filter_map(|&c| {
            let inv = world.get::<Inventory>(c)?;
            Some((c, !inv.is_empty(), inv.total()))
        })
        .collect();

    let bystanders: Vec<(Actor, String, String, &'static str)> =
        entities_at_node(world, &node.id, Some(actor))
            .into_iter()
            .map(|other| {
                let name = world
                    .get::<Identity>(other)
                    .map_or_else(|| "unknown".to_owned(), |i| i.name.clone());
                let (group, disposition) = world.get::<Faction>(other).map_or_else(
                    || ("unknown".to_owned(), "neutral"),
                    |f| (f.group.clone(), f.disposition.as_str()),
                );
                (other, name, group, disposition)
            })
            .collect();

    let Some(memory) = world.get_mut::<WorldMemory>(actor) else {
        return;
    };

    memory.observe(
        &format!("location:{}", node.id),
        object(json!({
            "zone": node.zone,
            "shelter": node.shelter,
            "threat_level": node.threat_level,
            "containers": node.container_actors.len(),
            "resources": node.resource_tags.iter().collect::<Vec<_>>(),
        })),
        now,
        600.0,
    );

    for (container, has_items, item_count) in container_facts {
        memory.observe(
            &format!("container:{}", container.0),
            object(json!({
                "node": node.id,
                "has_items": has_items,
                "item_count": item_count,
            })),
            now,
            300.0,
        );
    }

    for (other, name, group, disposition) in bystanders {
        memory.observe(
            &format!("entity:{}", other.0),
            object(json!({
                "node": node.id,
                "name": name,
                "group": group,
                "disposition": disposition,
            })),
            now,
            200.0,
        );
    }
}

// ── Interrupt ─────────────────────────────────────────────────────────────────

/// Fast priority filter: should the actor deviate from its plan here?
/// First match wins.
fn interrupt_check(ctx: &mut SimCtx<'_>, actor: Actor, node: &SubzoneNode) -> bool {
    if let Some(hunger) = ctx.world.get::<Hunger>(actor) {
        if hunger.ratio() < 0.25 {
            // Has food on hand — stop and eat.
            let has_food = ctx
                .world
                .get::<Inventory>(actor)
                .is_some_and(|inv| !inv.is_empty());
            if has_food {
                ctx.sched.post_delta(
                    ctx.now,
                    2.0,
                    actor,
                    EventKind::FinishEat,
                    EventData::at(&node.id),
                );
                return true;
            }
            // No food, but containers here — rummage.
            if let Some(&container) = node.container_actors.first() {
                ctx.sched.post_delta(
                    ctx.now,
                    5.0,
                    actor,
                    EventKind::FinishSearch,
                    EventData { container: Some(container), ..EventData::at(&node.id) },
                );
                return true;
            }
        }
    }

    if node.shelter {
        if let Some(health) = ctx.world.get::<Health>(actor) {
            let hp_ratio = health.ratio();
            if hp_ratio < 0.4 {
                let rest_duration = (5.0_f64).max((1.0 - hp_ratio) * 30.0);
                ctx.sched.post_delta(
                    ctx.now,
                    rest_duration,
                    actor,
                    EventKind::RestComplete,
                    EventData { duration: Some(rest_duration), ..EventData::at(&node.id) },
                );
                return true;
            }
        }
    }

    false
}

// ── Memory sharing ────────────────────────────────────────────────────────────

/// Friendly actors exchange `location:`, `threat:`, and `crime:` memories
/// in both directions.  The recipient takes an entry when it lacks the key
/// or holds an older timestamp.
///
/// Crime knowledge radicalises guards: a combat-capable recipient with a
/// friendly disposition flips hostile on hearing of crimes — this is the
/// word-of-mouth reputation mechanism.
pub fn share_memories(world: &mut World, actor_a: Actor, actor_b: Actor, now: f64) {
    let crimes_to_b = transfer_entries(world, actor_a, actor_b, now);
    let crimes_to_a = transfer_entries(world, actor_b, actor_a, now);

    if crimes_to_b > 0 {
        guard_crime_reaction(world, actor_b, now);
    }
    if crimes_to_a > 0 {
        guard_crime_reaction(world, actor_a, now);
    }
}

/// Copy fresh shared-prefix entries from `src` to `dst`.  Returns how many
/// `crime:` entries landed.
fn transfer_entries(world: &mut World, src: Actor, dst: Actor, now: f64) -> usize {
    let to_copy: Vec<MemoryEntry> = {
        let (Some(src_mem), Some(dst_mem)) = (
            world.get::<WorldMemory>(src),
            world.get::<WorldMemory>(dst),
        ) else {
            return 0;
        };
        SHARED_PREFIXES
            .iter()
            .flat_map(|prefix| src_mem.query_prefix(prefix, now, false))
            .filter(|entry| {
                dst_mem
                    .recall(&entry.key)
                    .is_none_or(|existing| existing.timestamp < entry.timestamp)
            })
            .cloned()
            .collect()
    };

    let mut crime_count = 0;
    if let Some(dst_mem) = world.get_mut::<WorldMemory>(dst) {
        for entry in to_copy {
            if entry.key.starts_with("crime:") {
                crime_count += 1;
            }
            dst_mem.observe(&entry.key, entry.data, now, entry.ttl);
        }
    }
    crime_count
}

/// A guard who just learned of crimes turns hostile.
fn guard_crime_reaction(world: &mut World, actor: Actor, now: f64) {
    if !world.has::<AttackConfig>(actor) {
        return;
    }
    let is_friendly = world
        .get::<Faction>(actor)
        .is_some_and(|f| f.disposition == Disposition::Friendly);
    if !is_friendly {
        return;
    }
    let heard_crimes = world
        .get::<WorldMemory>(actor)
        .is_some_and(|m| !m.query_prefix("crime:", now, false).is_empty());
    if !heard_crimes {
        return;
    }
    if let Some(faction) = world.get_mut::<Faction>(actor) {
        faction.disposition = Disposition::Hostile;
        tracing::info!(target: "sim::checkpoint", actor = actor.0,
            "guard turned hostile after hearing of crimes");
    }
}
