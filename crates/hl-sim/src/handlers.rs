//! Event resolution handlers for the scheduler.
//!
//! One function per event kind, registered at bootstrap.  Handlers are
//! best-effort: a dead actor, a missing component, or a malformed payload
//! means skip, never halt — recovery is per-actor, and nothing propagates
//! an error through the tick loop.

use serde_json::json;

use hl_core::Actor;
use hl_schedule::{EventData, EventKind};
use hl_world::{
    object, GraphPos, Health, Home, Hunger, Identity, Inventory, ItemRegistry, Stockpile,
    TravelPlan, World, WorldMemory,
};

use crate::checkpoint::{run_checkpoint, CheckpointOutcome};
use crate::ctx::{HandlerTable, SimCtx};
use crate::decision::run_decision_cycle;
use crate::economy::{add_to_stockpile, stockpile_actor_at, stockpile_actor_in_zone};
use crate::meals;
use crate::travel::continue_travel;

/// Hunger refills to this fraction of maximum when the critical event
/// fires, and the next critical is predicted against it.
pub const HUNGER_CRITICAL_RATIO: f64 = 0.3;

/// Hunger restored by unregistered food items.
const FALLBACK_FOOD_VALUE: f64 = 25.0;

/// Register every handler.  Exactly one per kind.
pub fn register_all(table: &mut HandlerTable) {
    table.register(EventKind::ArriveNode, handle_arrive_node);
    table.register(EventKind::HungerCritical, handle_hunger_critical);
    table.register(EventKind::FinishSearch, handle_finish_search);
    table.register(EventKind::FinishWork, handle_finish_work);
    table.register(EventKind::FinishEat, handle_finish_eat);
    table.register(EventKind::RestComplete, handle_rest_complete);
    table.register(EventKind::DecisionCycle, handle_decision_cycle);
    table.register(EventKind::CombatResolved, handle_combat_resolved);
    table.register(EventKind::CommunalMeal, meals::handle_communal_meal);
}

// ── ARRIVE_NODE ───────────────────────────────────────────────────────────────

/// Update the actor's graph position, then run the checkpoint.  A full
/// decision cycle runs only when the checkpoint reports arrival.
fn handle_arrive_node(ctx: &mut SimCtx<'_>, actor: Actor, data: &EventData) {
    let Some(node_id) = data.node.clone() else {
        return;
    };

    let Some(node_zone) = ctx.graph.node(&node_id).map(|n| n.zone.clone()) else {
        // Unknown node: abort the move, idle, and re-decide shortly.
        let here = ctx
            .world
            .get::<GraphPos>(actor)
            .map_or_else(String::new, |p| p.node.clone());
        ctx.world.detach::<TravelPlan>(actor);
        ctx.sched.post_delta(
            ctx.now,
            1.0,
            actor,
            EventKind::DecisionCycle,
            EventData::at(&here),
        );
        return;
    };

    if let Some(pos) = ctx.world.get_mut::<GraphPos>(actor) {
        pos.node = node_id.clone();
        pos.zone = node_zone;
    }

    tracing::debug!(target: "sim::events", actor = actor.0, node = %node_id,
        from = data.from.as_deref().unwrap_or("?"), "arrived");

    if run_checkpoint(ctx, actor, &node_id) == CheckpointOutcome::Arrived {
        run_decision_cycle(ctx, actor, &node_id);
    }
}

// ── HUNGER_CRITICAL ───────────────────────────────────────────────────────────

/// Hunger crossed the critical threshold: pin it there, try to eat, and
/// either predict the next critical or divert to find food.
fn handle_hunger_critical(ctx: &mut SimCtx<'_>, actor: Actor, _data: &EventData) {
    let Some(hunger) = ctx.world.get_mut::<Hunger>(actor) else {
        return;
    };
    hunger.current = (hunger.maximum * HUNGER_CRITICAL_RATIO).max(0.0);

    if try_eat(ctx.world, actor) || try_eat_from_stockpile(ctx.world, actor) {
        schedule_hunger_event(ctx.world, ctx.sched, actor, ctx.now);
        return;
    }

    tracing::debug!(target: "sim::events", actor = actor.0, "critically hungry, no food");

    // Abandon the current route and go find food.
    let node = ctx
        .world
        .get::<GraphPos>(actor)
        .map_or_else(String::new, |p| p.node.clone());
    ctx.sched.cancel_actor_kind(actor, EventKind::ArriveNode);
    ctx.world.detach::<TravelPlan>(actor);
    ctx.sched.post_delta(
        ctx.now,
        0.1,
        actor,
        EventKind::DecisionCycle,
        EventData { reason: Some("hunger".to_owned()), ..EventData::at(&node) },
    );
}

// ── FINISH_SEARCH ─────────────────────────────────────────────────────────────

/// Transfer the container's entire inventory to the actor.  The container
/// is real — what is taken is gone for everyone.
fn handle_finish_search(ctx: &mut SimCtx<'_>, actor: Actor, data: &EventData) {
    let node = data.node.clone().unwrap_or_default();
    let Some(container) = data.container else {
        post_decision(ctx, actor, &node);
        return;
    };
    if !ctx.world.alive(container) {
        post_decision(ctx, actor, &node);
        return;
    }

    if !ctx.world.has::<Inventory>(actor) {
        post_decision(ctx, actor, &node);
        return;
    }
    let taken = ctx
        .world
        .get_mut::<Inventory>(container)
        .map(|inv| std::mem::take(&mut inv.items));
    let Some(taken) = taken else {
        post_decision(ctx, actor, &node);
        return;
    };

    let mut transferred = 0;
    if let Some(inv) = ctx.world.get_mut::<Inventory>(actor) {
        for (item, count) in taken {
            inv.add(&item, count);
            transferred += count;
        }
    }

    if let Some(memory) = ctx.world.get_mut::<WorldMemory>(actor) {
        memory.observe(
            &format!("searched:{}", container.0),
            object(json!({ "node": node, "items_found": transferred })),
            ctx.now,
            600.0,
        );
    }

    tracing::debug!(target: "sim::events", actor = actor.0, node = %node,
        transferred, "searched container");
    post_decision(ctx, actor, &node);
}

// ── FINISH_WORK ───────────────────────────────────────────────────────────────

/// Work finished: farming feeds the settlement stockpile, crafting feeds
/// the actor's own inventory.
fn handle_finish_work(ctx: &mut SimCtx<'_>, actor: Actor, data: &EventData) {
    let node = data.node.clone().unwrap_or_default();

    match data.job.as_deref() {
        Some("farming") => {
            let harvest = data.yield_count.unwrap_or(3);
            let home_node = ctx.world.get::<Home>(actor).map(|h| h.node.clone());
            if let Some(home_node) = home_node {
                add_to_stockpile(ctx.world, ctx.graph, &home_node, "raw_food", harvest);
            }
            tracing::debug!(target: "sim::events", actor = actor.0, node = %node,
                harvest, "finished farming");
        }
        Some("crafting") => {
            if let Some(product) = &data.product {
                if let Some(inv) = ctx.world.get_mut::<Inventory>(actor) {
                    inv.add(product, 1);
                }
                tracing::debug!(target: "sim::events", actor = actor.0,
                    product = %product, "finished crafting");
            }
        }
        _ => {}
    }

    post_decision(ctx, actor, &node);
}

// ── FINISH_EAT ────────────────────────────────────────────────────────────────

/// Eating pause over: consume the food, then resume interrupted travel or
/// re-decide.
fn handle_finish_eat(ctx: &mut SimCtx<'_>, actor: Actor, data: &EventData) {
    try_eat(ctx.world, actor);

    let plan_active = ctx
        .world
        .get::<TravelPlan>(actor)
        .is_some_and(|p| !p.complete());
    if plan_active {
        let current = ctx
            .world
            .get::<GraphPos>(actor)
            .map(|p| p.node.clone());
        if let Some(current) = current {
            continue_travel(ctx.world, actor, &current, ctx.graph, ctx.sched, ctx.now);
            return;
        }
    }

    let node = data.node.clone().unwrap_or_default();
    post_decision(ctx, actor, &node);
}

// ── REST_COMPLETE ─────────────────────────────────────────────────────────────

/// Rest over: heal 2% of max HP per minute of rest.
fn handle_rest_complete(ctx: &mut SimCtx<'_>, actor: Actor, data: &EventData) {
    let duration = data.duration.unwrap_or(10.0);
    if let Some(health) = ctx.world.get_mut::<Health>(actor) {
        health.current =
            (health.current + health.maximum * 0.02 * duration).min(health.maximum);
        tracing::debug!(target: "sim::events", actor = actor.0, duration,
            hp = health.current, "finished resting");
    }

    let node = data.node.clone().unwrap_or_default();
    post_decision(ctx, actor, &node);
}

// ── DECISION_CYCLE / COMBAT_RESOLVED ──────────────────────────────────────────

fn handle_decision_cycle(ctx: &mut SimCtx<'_>, actor: Actor, data: &EventData) {
    let node = data
        .node
        .clone()
        .or_else(|| ctx.world.get::<GraphPos>(actor).map(|p| p.node.clone()));
    if let Some(node) = node {
        run_decision_cycle(ctx, actor, &node);
    }
}

/// Post-combat fallback when resolution was deferred.
fn handle_combat_resolved(ctx: &mut SimCtx<'_>, actor: Actor, data: &EventData) {
    let node = data.node.clone().unwrap_or_default();
    post_decision(ctx, actor, &node);
}

fn post_decision(ctx: &mut SimCtx<'_>, actor: Actor, node: &str) {
    ctx.sched.post_delta(
        ctx.now,
        0.1,
        actor,
        EventKind::DecisionCycle,
        EventData::at(node),
    );
}

// ── Eating ────────────────────────────────────────────────────────────────────

/// Eat the best food in the actor's inventory.  Returns whether anything
/// was eaten; hunger restores by the item's `food_value` and the item
/// count drops by exactly one.
pub fn try_eat(world: &mut World, actor: Actor) -> bool {
    if !world.has::<Hunger>(actor) {
        return false;
    }

    // Read phase: pick the item before touching anything mutably.
    let choice: Option<(String, f64, f64)> = {
        let Some(inv) = world.get::<Inventory>(actor) else {
            return false;
        };
        match world.res::<ItemRegistry>() {
            Some(registry) => inv
                .items
                .iter()
                .filter(|&(_, &count)| count > 0)
                .filter(|(item, _)| registry.item_type(item) == "consumable")
                .map(|(item, _)| {
                    (
                        item.clone(),
                        registry.field(item, "food_value", 0.0),
                        registry.field(item, "heal", 0.0),
                    )
                })
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .filter(|(_, food, _)| *food > 0.0),
            // No registry: fall back to anything that looks like food.
            None => inv
                .items
                .iter()
                .find(|&(item, &count)| count > 0 && item.contains("food"))
                .map(|(item, _)| (item.clone(), FALLBACK_FOOD_VALUE, 0.0)),
        }
    };

    let Some((item, food_value, heal)) = choice else {
        return false;
    };

    if let Some(inv) = world.get_mut::<Inventory>(actor) {
        inv.remove(&item, 1);
    }
    if let Some(hunger) = world.get_mut::<Hunger>(actor) {
        hunger.current = (hunger.current + food_value).min(hunger.maximum);
    }
    if heal > 0.0 {
        if let Some(health) = world.get_mut::<Health>(actor) {
            health.current = (health.current + heal).min(health.maximum);
        }
    }
    true
}

/// Eat from the actor's home settlement stockpile.  Registered items
/// restore their `food_value`; unknown items fall back to a flat value.
pub fn try_eat_from_stockpile(world: &mut World, actor: Actor) -> bool {
    if !world.has::<Hunger>(actor) {
        return false;
    }
    let Some(home) = world.get::<Home>(actor).cloned() else {
        return false;
    };
    let Some(settlement) = stockpile_actor_at(world, &home.node)
        .or_else(|| stockpile_actor_in_zone(world, &home.zone))
    else {
        return false;
    };

    // Pick the first edible thing the stockpile holds.
    let choice: Option<(String, f64)> = {
        let Some(sp) = world.get::<Stockpile>(settlement) else {
            return false;
        };
        let registry = world.res::<ItemRegistry>();
        sp.items
            .iter()
            .filter(|&(_, &count)| count > 0)
            .map(|(item, _)| {
                let food = registry
                    .filter(|r| r.item_type(item) == "consumable")
                    .map(|r| r.field(item, "food_value", FALLBACK_FOOD_VALUE));
                (item.clone(), food.unwrap_or(FALLBACK_FOOD_VALUE))
            })
            .next()
    };

    let Some((item, food_value)) = choice else {
        return false;
    };

    let taken = world
        .get_mut::<Stockpile>(settlement)
        .map_or(0, |sp| sp.remove(&item, 1));
    if taken == 0 {
        return false;
    }
    if let Some(hunger) = world.get_mut::<Hunger>(actor) {
        hunger.current = (hunger.current + food_value).min(hunger.maximum);
    }
    true
}

// ── Hunger prediction ─────────────────────────────────────────────────────────

/// Schedule the next `HUNGER_CRITICAL` for a graph-resident actor by
/// predicting when hunger re-hits the critical threshold.
///
/// Hunger drains per game-second while the scheduler runs in game-minutes;
/// a zero drain rate schedules nothing (the prediction would be `+∞`).
pub fn schedule_hunger_event(
    world: &World,
    sched: &mut hl_schedule::Scheduler,
    actor: Actor,
    now: f64,
) {
    if !world.has::<GraphPos>(actor) {
        return;
    }
    let Some(hunger) = world.get::<Hunger>(actor) else {
        return;
    };

    sched.cancel_actor_kind(actor, EventKind::HungerCritical);

    let threshold = hunger.maximum * HUNGER_CRITICAL_RATIO;
    if hunger.current <= threshold {
        // Already critical — fire soon.
        sched.post_delta(now, 0.5, actor, EventKind::HungerCritical, EventData::default());
        return;
    }

    let drain_per_minute = hunger.rate * hl_core::SECS_PER_MIN;
    if drain_per_minute <= 0.0 {
        return;
    }
    let time_to_critical = (hunger.current - threshold) / drain_per_minute;
    sched.post_delta(
        now,
        time_to_critical,
        actor,
        EventKind::HungerCritical,
        EventData::default(),
    );
}

/// Bootstrap pass: predict hunger for every graph-resident actor.
/// Returns the count scheduled.
pub fn bootstrap_hunger_events(
    world: &World,
    sched: &mut hl_schedule::Scheduler,
    now: f64,
) -> usize {
    let hungry: Vec<Actor> = world
        .all_of::<Hunger>()
        .into_iter()
        .map(|(actor, _)| actor)
        .filter(|&actor| world.has::<GraphPos>(actor))
        .collect();
    let count = hungry.len();
    for actor in hungry {
        schedule_hunger_event(world, sched, actor, now);
    }
    count
}

/// Log-friendly actor name.
pub fn actor_name(world: &World, actor: Actor) -> String {
    world
        .get::<Identity>(actor)
        .map_or_else(|| format!("actor {}", actor.0), |i| i.name.clone())
}
