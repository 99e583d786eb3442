//! The one-shot decision cycle.
//!
//! When a graph-resident actor needs a plan (arrived somewhere, woke up,
//! got interrupted), a priority stack picks the first action whose
//! preconditions hold:
//!
//! 1. SURVIVAL   — critically low HP: rest, or run for shelter
//! 2. NEEDS      — hunger: eat from inventory/stockpile, else scavenge
//! 3. ROLE       — farm, patrol, resupply, raid
//! 4. DISCRETION — explore neighbours the actor knows nothing about
//! 5. DEFAULT    — drift home, wander, or idle
//!
//! Every branch ends by posting at least one event, so the actor always
//! has a future.  The returned label is for tracing and tests.

use hl_core::Actor;
use hl_schedule::{EventData, EventKind};
use hl_world::{
    AttackConfig, Faction, GraphPos, Health, Home, Hunger, TravelPlan, World, WorldMemory,
};

use crate::ctx::SimCtx;
use crate::economy::settlement_needs_supplies;
use crate::handlers::{schedule_hunger_event, try_eat, try_eat_from_stockpile};
use crate::travel::{begin_travel, find_nearest_with, plan_route, MAX_SEARCH_HOPS};

/// Resource classes that count as workable farmland.
const FARM_TAGS: [&str; 3] = ["farmable", "wheat", "corn"];

// ── Entry point ───────────────────────────────────────────────────────────────

/// Run the decision stack for `actor` at `current_node`.  Returns a label
/// naming the chosen action.
pub fn run_decision_cycle(ctx: &mut SimCtx<'_>, actor: Actor, current_node: &str) -> &'static str {
    if !ctx.world.alive(actor) {
        return "dead";
    }
    if !ctx.world.has::<GraphPos>(actor) {
        return "no_position";
    }
    // Mid-route actors keep walking; arrivals re-enter through ARRIVE_NODE.
    let traveling = ctx
        .world
        .get::<TravelPlan>(actor)
        .is_some_and(|p| !p.complete());
    if traveling {
        return "traveling";
    }

    if let Some(label) = check_survival(ctx, actor, current_node) {
        return label;
    }
    if let Some(label) = check_critical_needs(ctx, actor, current_node) {
        return label;
    }
    if let Some(label) = check_role_duties(ctx, actor, current_node) {
        return label;
    }
    if let Some(label) = check_discretionary(ctx, actor, current_node) {
        return label;
    }
    default_behavior(ctx, actor, current_node)
}

// ── Priority 1: survival ──────────────────────────────────────────────────────

fn check_survival(ctx: &mut SimCtx<'_>, actor: Actor, current: &str) -> Option<&'static str> {
    let hp_ratio = ctx.world.get::<Health>(actor)?.ratio();
    if hp_ratio >= 0.3 {
        return None;
    }

    // Already somewhere safe — rest here.
    if ctx.graph.node(current).is_some_and(|n| n.shelter) {
        let duration = (10.0_f64).max((1.0 - hp_ratio) * 60.0);
        ctx.sched.post_delta(
            ctx.now,
            duration,
            actor,
            EventKind::RestComplete,
            EventData { duration: Some(duration), ..EventData::at(current) },
        );
        log_decision(ctx.world, actor, "resting in shelter");
        return Some("rest");
    }

    // Limp to the nearest shelter.
    if let Some(shelter) = find_nearest_with(ctx.graph, current, |n| n.shelter, MAX_SEARCH_HOPS)
    {
        if let Some(plan) = plan_route(ctx.graph, current, &shelter, None, ctx.now) {
            if begin_travel(ctx.world, actor, plan, ctx.graph, ctx.sched, ctx.now) {
                log_decision(ctx.world, actor, "fleeing to shelter");
                return Some("rest");
            }
        }
    }

    // No shelter anywhere — rest in place regardless.
    ctx.sched.post_delta(
        ctx.now,
        15.0,
        actor,
        EventKind::RestComplete,
        EventData { duration: Some(15.0), ..EventData::at(current) },
    );
    Some("rest")
}

// ── Priority 2: critical needs ────────────────────────────────────────────────

fn check_critical_needs(ctx: &mut SimCtx<'_>, actor: Actor, current: &str) -> Option<&'static str> {
    let ratio = ctx.world.get::<Hunger>(actor)?.ratio();
    if ratio >= 0.4 {
        return None;
    }

    if try_eat(ctx.world, actor) || try_eat_from_stockpile(ctx.world, actor) {
        schedule_hunger_event(ctx.world, ctx.sched, actor, ctx.now);
        ctx.sched.post_delta(
            ctx.now,
            2.0,
            actor,
            EventKind::DecisionCycle,
            EventData::at(current),
        );
        log_decision(ctx.world, actor, "eating");
        return Some("eat");
    }

    go_scavenge(ctx, actor, current, "hunger")
}

// ── Priority 3: role / duty ───────────────────────────────────────────────────

fn check_role_duties(ctx: &mut SimCtx<'_>, actor: Actor, current: &str) -> Option<&'static str> {
    let group = ctx
        .world
        .get::<Faction>(actor)
        .map(|f| f.group.clone())
        .unwrap_or_default();
    let home = ctx.world.get::<Home>(actor).cloned();

    // ── Farmer: work the land at home ─────────────────────────────────────
    if let Some(home) = &home {
        if current == home.node {
            let farmable = ctx.graph.node(current).is_some_and(|n| {
                FARM_TAGS.iter().any(|tag| n.resource_tags.contains(*tag))
            });
            if farmable {
                let work_duration = ctx.rng.gen_range(15.0..30.0);
                let harvest = ctx.rng.gen_range(2..=5);
                ctx.sched.post_delta(
                    ctx.now,
                    work_duration,
                    actor,
                    EventKind::FinishWork,
                    EventData {
                        job: Some("farming".to_owned()),
                        yield_count: Some(harvest),
                        ..EventData::at(current)
                    },
                );
                log_decision(ctx.world, actor, "farming");
                return Some("farm");
            }
        }
    }

    // ── Guard / settler: patrol near home ─────────────────────────────────
    //
    // Settlers cover the direct neighbours of their home node; actors with
    // an AttackConfig (guards) extend the beat to two hops.
    if group == "guards" || group == "settlers" {
        if let Some(home) = home.as_ref().filter(|h| !h.node.is_empty()) {
            if let Some(home_node) = ctx.graph.node(&home.node) {
                let is_guard = ctx.world.has::<AttackConfig>(actor);

                let mut patrol_zone: Vec<String> =
                    home_node.connections.keys().cloned().collect();
                if is_guard {
                    for adj_id in home_node.connections.keys() {
                        let Some(adj) = ctx.graph.node(adj_id) else {
                            continue;
                        };
                        for second_hop in adj.connections.keys() {
                            if second_hop != &home.node
                                && !patrol_zone.contains(second_hop)
                            {
                                patrol_zone.push(second_hop.clone());
                            }
                        }
                    }
                }

                // Off the beat — return to post.
                if current != home.node && !patrol_zone.iter().any(|n| n == current) {
                    if go_home(ctx, actor, current, "patrol").is_some() {
                        return Some("guard");
                    }
                } else if let Some(target) = ctx.rng.choose(&patrol_zone).cloned() {
                    let edge = ctx.graph.travel_time(current, &target);
                    if edge.is_finite() {
                        ctx.sched.post(
                            ctx.now + edge,
                            actor,
                            EventKind::ArriveNode,
                            EventData::travel(&target, current),
                        );
                    } else if let Some(plan) =
                        plan_route(ctx.graph, current, &target, None, ctx.now)
                    {
                        begin_travel(ctx.world, actor, plan, ctx.graph, ctx.sched, ctx.now);
                    } else {
                        let wait = ctx.rng.gen_range(3.0..8.0);
                        ctx.sched.post_delta(
                            ctx.now,
                            wait,
                            actor,
                            EventKind::DecisionCycle,
                            EventData::at(current),
                        );
                    }
                    log_decision(ctx.world, actor, "patrolling");
                    return Some("guard");
                }
            }
        }
    }

    // ── Scavenger: restock the settlement ─────────────────────────────────
    if matches!(group.as_str(), "scavengers" | "raiders" | "settlers") {
        let needs_supplies = home
            .as_ref()
            .is_some_and(|h| settlement_needs_supplies(ctx.world, h));
        if needs_supplies {
            if let Some(label) = go_scavenge(ctx, actor, current, "supply") {
                return Some(label);
            }
        }
    }

    // ── Raider: hit a remembered location with containers ─────────────────
    if group == "raiders" {
        let target: Option<String> = ctx.world.get::<WorldMemory>(actor).and_then(|mem| {
            mem.query_prefix("location:", ctx.now, true)
                .into_iter()
                .filter(|e| e.number("containers", 0.0) > 0.0)
                .map(|e| e.key.trim_start_matches("location:").to_owned())
                .find(|node| node != current)
        });
        if let Some(target) = target {
            let memory = ctx.world.get::<WorldMemory>(actor).cloned();
            if let Some(plan) =
                plan_route(ctx.graph, current, &target, memory.as_ref(), ctx.now)
            {
                if begin_travel(ctx.world, actor, plan, ctx.graph, ctx.sched, ctx.now) {
                    log_decision(ctx.world, actor, "raiding");
                    return Some("raid");
                }
            }
        }
    }

    None
}

// ── Priority 4: discretionary ─────────────────────────────────────────────────

fn check_discretionary(ctx: &mut SimCtx<'_>, actor: Actor, current: &str) -> Option<&'static str> {
    let node = ctx.graph.node(current)?;
    let unvisited: Vec<&String> = {
        let memory = ctx.world.get::<WorldMemory>(actor)?;
        node.connections
            .keys()
            .filter(|n| memory.recall_fresh(&format!("location:{n}"), ctx.now).is_none())
            .collect()
    };

    if !unvisited.is_empty() && ctx.rng.gen_bool(0.3) {
        let target = (*ctx.rng.choose(&unvisited)?).clone();
        let edge = node.connections.get(&target).copied().unwrap_or(5.0);
        ctx.sched.post(
            ctx.now + edge,
            actor,
            EventKind::ArriveNode,
            EventData::travel(&target, current),
        );
        log_decision(ctx.world, actor, "exploring");
        return Some("explore");
    }

    None
}

// ── Priority 5: default ───────────────────────────────────────────────────────

fn default_behavior(ctx: &mut SimCtx<'_>, actor: Actor, current: &str) -> &'static str {
    let home = ctx.world.get::<Home>(actor).cloned();

    // Far from home — drift back; unroutable homes fall through to idling.
    if home.is_some_and(|h| !h.node.is_empty() && h.node != current)
        && go_home(ctx, actor, current, "default").is_some()
    {
        return "return_home";
    }

    // Occasionally wander next door.
    if let Some(node) = ctx.graph.node(current) {
        if !node.connections.is_empty() && ctx.rng.gen_bool(0.4) {
            let neighbors: Vec<&String> = node.connections.keys().collect();
            if let Some(&target) = ctx.rng.choose(&neighbors) {
                let edge = node.connections.get(target).copied().unwrap_or(5.0);
                ctx.sched.post(
                    ctx.now + edge,
                    actor,
                    EventKind::ArriveNode,
                    EventData::travel(target, current),
                );
                log_decision(ctx.world, actor, "wandering");
                return "wander";
            }
        }
    }

    // Stay put and check back in a while.
    let wait = ctx.rng.gen_range(5.0..20.0);
    ctx.sched.post_delta(
        ctx.now,
        wait,
        actor,
        EventKind::DecisionCycle,
        EventData::at(current),
    );
    "idle"
}

// ── Shared subroutines ────────────────────────────────────────────────────────

/// Navigate to the best known loot location and search it.
fn go_scavenge(
    ctx: &mut SimCtx<'_>,
    actor: Actor,
    current: &str,
    reason: &str,
) -> Option<&'static str> {
    // Best candidate: the most recently seen container node with items.
    let remembered: Option<String> = ctx.world.get::<WorldMemory>(actor).and_then(|mem| {
        mem.query_prefix("container:", ctx.now, true)
            .into_iter()
            .filter(|e| e.flag("has_items"))
            .filter_map(|e| e.text("node").map(|n| (e.timestamp, n.to_owned())))
            .filter(|(_, node)| node != current)
            .max_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
            .map(|(_, node)| node)
    });

    let target = remembered.or_else(|| {
        find_nearest_with(ctx.graph, current, |n| n.has_containers(), MAX_SEARCH_HOPS)
    });

    if let Some(target) = target {
        let memory = ctx.world.get::<WorldMemory>(actor).cloned();
        if let Some(plan) = plan_route(ctx.graph, current, &target, memory.as_ref(), ctx.now) {
            if begin_travel(ctx.world, actor, plan, ctx.graph, ctx.sched, ctx.now) {
                tracing::debug!(target: "sim::decision", actor = actor.0,
                    toward = %target, reason, "scavenging");
                return Some("scavenge");
            }
        }
    }

    // Nothing known anywhere — poke a random neighbour instead.
    let neighbor: Option<String> = ctx.graph.node(current).and_then(|n| {
        let keys: Vec<&String> = n.connections.keys().collect();
        ctx.rng.choose(&keys).map(|s| (*s).clone())
    });
    if let Some(target) = neighbor {
        if let Some(plan) = plan_route(ctx.graph, current, &target, None, ctx.now) {
            if begin_travel(ctx.world, actor, plan, ctx.graph, ctx.sched, ctx.now) {
                log_decision(ctx.world, actor, "exploring for supplies");
                return Some("explore");
            }
        }
    }

    None
}

/// Navigate back to the home node.
fn go_home(
    ctx: &mut SimCtx<'_>,
    actor: Actor,
    current: &str,
    reason: &str,
) -> Option<&'static str> {
    let home = ctx.world.get::<Home>(actor).cloned()?;
    if home.node.is_empty() || home.node == current {
        return None;
    }

    let memory = ctx.world.get::<WorldMemory>(actor).cloned();
    let plan = plan_route(ctx.graph, current, &home.node, memory.as_ref(), ctx.now)?;
    if begin_travel(ctx.world, actor, plan, ctx.graph, ctx.sched, ctx.now) {
        tracing::debug!(target: "sim::decision", actor = actor.0,
            home = %home.node, reason, "returning home");
        return Some("return_home");
    }
    None
}

fn log_decision(world: &World, actor: Actor, action: &str) {
    tracing::debug!(target: "sim::decision",
        actor = actor.0, name = %crate::handlers::actor_name(world, actor), "{action}");
}
