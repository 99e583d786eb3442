//! Communal mealtime drive.
//!
//! Twice per game-day settlers gather at the communal well to eat
//! together.  Guards eat late — they hold their post until the main group
//! has finished.  Meals chain themselves: every handled `COMMUNAL_MEAL`
//! posts the next one, so the cadence survives missed gatherings.

use hl_core::{Actor, DAY_LENGTH_MIN};
use hl_schedule::{EventData, EventKind};
use hl_world::{
    AttackConfig, Faction, GraphPos, Hunger, Identity, Inventory, ItemRegistry, World,
};

use crate::ctx::SimCtx;
use crate::handlers::{schedule_hunger_event, try_eat, try_eat_from_stockpile};
use crate::travel::{begin_travel, plan_route};

/// Mealtimes in minutes-of-day: 06:00 and 18:00.
pub const MEAL_TIMES: [f64; 2] = [360.0, 1080.0];
/// Minutes spent eating at the communal area.
pub const MEAL_DURATION: f64 = 10.0;
/// Guards eat this many minutes after civilians.
pub const GUARD_DELAY: f64 = 30.0;
/// Gathering point for meals.
pub const COMMUNAL_NODE: &str = "sett_well";

/// The faction group that observes communal meals.
const MEAL_GROUP: &str = "settlers";

// ── Handler ───────────────────────────────────────────────────────────────────

/// Respond to the mealtime call: route to the well, or eat if already
/// there.
pub fn handle_communal_meal(ctx: &mut SimCtx<'_>, actor: Actor, _data: &EventData) {
    let Some(current) = ctx.world.get::<GraphPos>(actor).map(|p| p.node.clone()) else {
        return;
    };
    let is_settler = ctx
        .world
        .get::<Faction>(actor)
        .is_some_and(|f| f.group == MEAL_GROUP);
    if !is_settler {
        return;
    }

    if current == COMMUNAL_NODE {
        communal_eat(ctx, actor, &current);
        return;
    }

    // Head for the well; a phase=eat call fires on arrival.
    if let Some(plan) = plan_route(ctx.graph, &current, COMMUNAL_NODE, None, ctx.now) {
        let eta = ctx.graph.total_path_time(&plan.path, &current);
        if begin_travel(ctx.world, actor, plan, ctx.graph, ctx.sched, ctx.now) {
            ctx.sched.post(
                ctx.now + eta + 0.1,
                actor,
                EventKind::CommunalMeal,
                EventData { phase: Some("eat".to_owned()), ..EventData::default() },
            );
            tracing::debug!(target: "sim::meals", actor = actor.0, "heading to communal meal");
            return;
        }
    }

    // Can't reach the well — eat alone and keep the meal chain alive.
    try_eat(ctx.world, actor);
    schedule_hunger_event(ctx.world, ctx.sched, actor, ctx.now);
    schedule_next_meal(ctx, actor);
    ctx.sched.post_delta(
        ctx.now,
        MEAL_DURATION,
        actor,
        EventKind::DecisionCycle,
        EventData::at(&current),
    );
}

/// Eat at the well: own rations, then the settlement stockpile, then any
/// communal container here.
fn communal_eat(ctx: &mut SimCtx<'_>, actor: Actor, current: &str) {
    if !ctx.world.has::<Hunger>(actor) {
        ctx.sched.post_delta(
            ctx.now,
            MEAL_DURATION,
            actor,
            EventKind::DecisionCycle,
            EventData::at(current),
        );
        return;
    }

    let ate = try_eat(ctx.world, actor)
        || try_eat_from_stockpile(ctx.world, actor)
        || try_communal_container(ctx.world, actor);
    if ate {
        tracing::debug!(target: "sim::meals", actor = actor.0, "finished communal meal");
    }

    schedule_hunger_event(ctx.world, ctx.sched, actor, ctx.now);
    schedule_next_meal(ctx, actor);

    // Back to duties once the meal is over.
    ctx.sched.post_delta(
        ctx.now,
        MEAL_DURATION,
        actor,
        EventKind::DecisionCycle,
        EventData::at(current),
    );
}

/// Eat from any container actor at the same node.
fn try_communal_container(world: &mut World, actor: Actor) -> bool {
    let Some(my_node) = world.get::<GraphPos>(actor).map(|p| p.node.clone()) else {
        return false;
    };

    // Read phase: find a container here with something edible.
    let choice: Option<(Actor, String, f64)> = {
        let registry = world.res::<ItemRegistry>();
        world
            .all_of::<Identity>()
            .into_iter()
            .filter(|(_, ident)| ident.kind == hl_world::ActorKind::Container)
            .filter(|(container, _)| {
                world
                    .get::<GraphPos>(*container)
                    .is_some_and(|p| p.node == my_node)
            })
            .find_map(|(container, _)| {
                let inv = world.get::<Inventory>(container)?;
                let (item, food) = inv
                    .items
                    .iter()
                    .filter(|&(_, &count)| count > 0)
                    .map(|(item, _)| {
                        let food = match registry {
                            Some(r) if r.item_type(item) == "consumable" => {
                                r.field(item, "food_value", 0.0)
                            }
                            _ => {
                                let looks_edible = ["stew", "ration", "beans", "meat"]
                                    .iter()
                                    .any(|w| item.contains(w));
                                if looks_edible { 25.0 } else { 0.0 }
                            }
                        };
                        (item.clone(), food)
                    })
                    .max_by(|a, b| a.1.total_cmp(&b.1))?;
                (food > 0.0).then_some((container, item, food))
            })
    };

    let Some((container, item, food)) = choice else {
        return false;
    };

    if let Some(inv) = world.get_mut::<Inventory>(container) {
        inv.remove(&item, 1);
    }
    if let Some(hunger) = world.get_mut::<Hunger>(actor) {
        hunger.current = (hunger.current + food).min(hunger.maximum);
    }
    true
}

// ── Scheduling ────────────────────────────────────────────────────────────────

/// Absolute game-minute of the next mealtime after `now`, with the guard
/// delay applied.  The one-minute slack keeps a meal being handled right
/// now from re-selecting its own slot.
pub fn next_meal_time(now: f64, is_guard: bool) -> f64 {
    let time_in_day = now.rem_euclid(DAY_LENGTH_MIN);
    let base = MEAL_TIMES
        .iter()
        .find(|&&mt| mt > time_in_day + 1.0)
        .map(|&mt| now + (mt - time_in_day))
        .unwrap_or(now + (DAY_LENGTH_MIN - time_in_day) + MEAL_TIMES[0]);
    base + if is_guard { GUARD_DELAY } else { 0.0 }
}

fn schedule_next_meal(ctx: &mut SimCtx<'_>, actor: Actor) {
    let is_guard = ctx.world.has::<AttackConfig>(actor);
    ctx.sched.post(
        next_meal_time(ctx.now, is_guard),
        actor,
        EventKind::CommunalMeal,
        EventData::default(),
    );
}

/// Bootstrap pass: post the first mealtime call for every graph-resident
/// settler.  Returns the count scheduled.
pub fn bootstrap_meal_events(
    world: &World,
    sched: &mut hl_schedule::Scheduler,
    now: f64,
) -> usize {
    let settlers: Vec<(Actor, bool)> = world
        .all_of::<GraphPos>()
        .into_iter()
        .filter(|(actor, _)| {
            world
                .get::<Faction>(*actor)
                .is_some_and(|f| f.group == MEAL_GROUP)
        })
        .map(|(actor, _)| (actor, world.has::<AttackConfig>(actor)))
        .collect();

    let count = settlers.len();
    for (actor, is_guard) in settlers {
        sched.post(
            next_meal_time(now, is_guard),
            actor,
            EventKind::CommunalMeal,
            EventData::default(),
        );
    }
    count
}
