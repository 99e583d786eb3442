//! Stat-check combat for off-screen encounters.
//!
//! When two hostile actors share a subzone node, the fight resolves in
//! closed form rather than real time.  Effective DPS is derived from base
//! damage, the equipped weapon, and the opponent's defense; the smaller
//! time-to-kill wins unless someone's flee threshold triggers first.  A
//! single Gaussian factor adds variance to the damage actually applied —
//! never to the duration, which downstream scheduling depends on.

use rand_distr::{Distribution, Normal};
use serde_json::json;

use hl_core::{Actor, SimRng};
use hl_schedule::{EventData, EventKind, Scheduler};
use hl_world::{
    object, ActorKind, CombatStats, Equipment, GraphPos, Health, Home, Identity, Inventory,
    ItemRegistry, Locomotion, Loot, LootTableManager, LootTableRef, Threat, TravelPlan, World,
    WorldMemory,
};

use crate::ctx::SimCtx;
use crate::travel::{begin_travel, find_nearest_with, plan_route, MAX_SEARCH_HOPS};

/// Game-minutes between flee checks along the fight timeline.
pub const FLEE_CHECK_INTERVAL: f64 = 2.0;
/// Standard deviation of the applied-damage variance factor.
pub const VARIANCE_SIGMA: f64 = 0.15;
/// Floor for effective DPS — keeps every fight finite.
pub const MIN_DPS: f64 = 0.1;

// ── Result ────────────────────────────────────────────────────────────────────

/// Outcome of one resolved fight.
///
/// Exactly one of two states holds on return: `fled` (the fleer survives at
/// reduced HP) or the loser's HP is zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CombatResult {
    pub winner: Actor,
    pub loser: Actor,
    pub fight_duration: f64,
    pub winner_damage_taken: f64,
    pub fled: bool,
    pub flee_actor: Option<Actor>,
}

// ── Core resolution ───────────────────────────────────────────────────────────

/// Resolve combat between two actors via stat check, applying HP changes.
pub fn stat_check_combat(
    world: &mut World,
    rng: &mut SimRng,
    attacker: Actor,
    defender: Actor,
) -> CombatResult {
    let atk_dps = effective_dps(world, attacker);
    let def_dps = effective_dps(world, defender);

    let (Some(atk_health), Some(def_health)) = (
        world.get::<Health>(attacker).copied(),
        world.get::<Health>(defender).copied(),
    ) else {
        // Can't fight without health — attacker wins by default.
        return CombatResult {
            winner: attacker,
            loser: defender,
            fight_duration: 0.0,
            winner_damage_taken: 0.0,
            fled: false,
            flee_actor: None,
        };
    };

    let atk_defense = world.get::<CombatStats>(attacker).map_or(0.0, |c| c.defense);
    let def_defense = world.get::<CombatStats>(defender).map_or(0.0, |c| c.defense);

    let atk_effective = (atk_dps - def_defense * 0.3).max(MIN_DPS);
    let def_effective = (def_dps - atk_defense * 0.3).max(MIN_DPS);

    // Time to kill, each way.
    let ttk_defender = def_health.current / atk_effective;
    let ttk_attacker = atk_health.current / def_effective;

    let atk_flee = flee_threshold(world, attacker);
    let def_flee = flee_threshold(world, defender);

    let mut fight_duration = ttk_defender.min(ttk_attacker);
    let mut fled = false;
    let mut flee_actor = None;

    // ── Flee checks along the conceptual fight timeline ──────────────────
    let mut t = FLEE_CHECK_INTERVAL;
    while t < fight_duration {
        if atk_flee > 0.0 {
            let hp_at_t = atk_health.current - def_effective * t;
            if hp_at_t / atk_health.maximum.max(1.0) <= atk_flee
                && flee_roll(world, rng, attacker, defender)
            {
                fight_duration = t;
                fled = true;
                flee_actor = Some(attacker);
                break;
            }
        }
        if def_flee > 0.0 {
            let hp_at_t = def_health.current - atk_effective * t;
            if hp_at_t / def_health.maximum.max(1.0) <= def_flee
                && flee_roll(world, rng, defender, attacker)
            {
                fight_duration = t;
                fled = true;
                flee_actor = Some(defender);
                break;
            }
        }
        t += FLEE_CHECK_INTERVAL;
    }

    // One Gaussian factor scales the damage actually applied.
    let variance = Normal::new(1.0, VARIANCE_SIGMA)
        .map(|n| n.sample(rng.inner()))
        .unwrap_or(1.0)
        .clamp(0.5, 1.5);

    if fled {
        // Both sides take proportional damage; the fleer escapes alive.
        let atk_damage = def_effective * fight_duration * variance;
        let def_damage = atk_effective * fight_duration * variance;
        if let Some(h) = world.get_mut::<Health>(attacker) {
            h.current = (h.current - atk_damage).max(1.0);
        }
        if let Some(h) = world.get_mut::<Health>(defender) {
            h.current = (h.current - def_damage).max(1.0);
        }

        let (winner, loser, winner_damage_taken) = if flee_actor == Some(attacker) {
            (defender, attacker, atk_effective * fight_duration * variance)
        } else {
            (attacker, defender, def_effective * fight_duration * variance)
        };
        return CombatResult {
            winner,
            loser,
            fight_duration,
            winner_damage_taken,
            fled: true,
            flee_actor,
        };
    }

    // No flee: the smaller TTK wins.
    let (winner, loser, winner_damage) = if ttk_defender < ttk_attacker {
        (attacker, defender, def_effective * fight_duration * variance)
    } else {
        (defender, attacker, atk_effective * fight_duration * variance)
    };

    if let Some(h) = world.get_mut::<Health>(winner) {
        h.current = (h.current - winner_damage).max(1.0);
    }
    if let Some(h) = world.get_mut::<Health>(loser) {
        h.current = 0.0;
    }

    CombatResult {
        winner,
        loser,
        fight_duration,
        winner_damage_taken: winner_damage,
        fled: false,
        flee_actor: None,
    }
}

// ── Encounter wrapper ─────────────────────────────────────────────────────────

/// Full encounter resolution: combat → death/flee → loot → follow-up events.
///
/// Called from the checkpoint when hostiles share a node, and by the LOD
/// engine when a demoting actor is mid-fight.
pub fn resolve_encounter(
    ctx: &mut SimCtx<'_>,
    actor_a: Actor,
    actor_b: Actor,
    node_id: &str,
) -> CombatResult {
    let result = stat_check_combat(ctx.world, ctx.rng, actor_a, actor_b);
    log_combat(ctx.world, &result);

    if result.fled {
        if let Some(fleer) = result.flee_actor {
            handle_flee(ctx, fleer, node_id);
        }
        post_decision(ctx.sched, result.winner, node_id, ctx.now + result.fight_duration);
    } else {
        handle_death(ctx.world, ctx.sched, ctx.rng, result.loser, node_id);
        loot_fallen(ctx.world, result.winner, result.loser);
        post_decision(ctx.sched, result.winner, node_id, ctx.now + result.fight_duration);
    }

    record_combat_memory(ctx.world, actor_a, actor_b, node_id, &result, ctx.now);
    result
}

/// Death path: corpse creation, inventory transfer, loot rolls.
///
/// The corpse inherits the dead actor's entire inventory (moved, not
/// copied) plus any loot-table rolls, then the actor is killed.  Also used
/// directly by the LOD engine's resolve-on-demote.
pub fn handle_death(
    world: &mut World,
    sched: &mut Scheduler,
    rng: &mut SimRng,
    dead: Actor,
    node_id: &str,
) {
    sched.cancel_actor(dead);

    let name = world
        .get::<Identity>(dead)
        .map_or_else(|| format!("actor {}", dead.0), |i| i.name.clone());
    let zone = world.get::<GraphPos>(dead).map_or_else(String::new, |p| p.zone.clone());
    let inventory = world.detach::<Inventory>(dead);
    let loot_table = world.get::<LootTableRef>(dead).map(|l| l.table.clone());

    let rolled: Vec<String> = match (&loot_table, world.res::<LootTableManager>()) {
        (Some(table), Some(mgr)) if !table.is_empty() => mgr.roll(table, rng),
        _ => Vec::new(),
    };

    let corpse = world.spawn();
    world.attach(corpse, Identity::new(&format!("Corpse of {name}"), ActorKind::Corpse));
    world.attach(corpse, GraphPos { zone, node: node_id.to_owned() });
    let mut corpse_inv = inventory.unwrap_or_default();
    for item in rolled {
        corpse_inv.add(&item, 1);
    }
    world.attach(corpse, corpse_inv);
    world.attach(corpse, Loot { looted: false });

    tracing::info!(target: "sim::combat", actor = dead.0, corpse = corpse.0, node = node_id,
        "{name} died, corpse created");

    world.kill(dead);
}

/// Flee path: drop everything in flight and run for home or shelter.
fn handle_flee(ctx: &mut SimCtx<'_>, fleer: Actor, from_node: &str) {
    ctx.sched.cancel_actor(fleer);
    ctx.world.detach::<TravelPlan>(fleer);

    let home_node = ctx
        .world
        .get::<Home>(fleer)
        .map(|h| h.node.clone())
        .filter(|n| !n.is_empty());
    let target = home_node.or_else(|| {
        find_nearest_with(ctx.graph, from_node, |n| n.shelter, MAX_SEARCH_HOPS)
    });

    if let Some(target) = target {
        if target != from_node {
            if let Some(plan) = plan_route(ctx.graph, from_node, &target, None, ctx.now) {
                if begin_travel(ctx.world, fleer, plan, ctx.graph, ctx.sched, ctx.now) {
                    return;
                }
            }
        }
    }

    // Nowhere to run — hole up where they stand.
    ctx.sched.post(
        ctx.now + 10.0,
        fleer,
        EventKind::RestComplete,
        EventData { duration: Some(10.0), ..EventData::at(from_node) },
    );
}

/// Winner absorbs whatever the loser still carries.  After the corpse path
/// has consumed the inventory this is a no-op.
fn loot_fallen(world: &mut World, winner: Actor, loser: Actor) {
    let Some(taken) = world.get::<Inventory>(loser).map(|inv| inv.items.clone()) else {
        return;
    };
    if taken.is_empty() {
        return;
    }
    if let Some(loser_inv) = world.get_mut::<Inventory>(loser) {
        loser_inv.items.clear();
    }
    if let Some(winner_inv) = world.get_mut::<Inventory>(winner) {
        for (item, count) in taken {
            winner_inv.add(&item, count);
        }
    }
}

fn post_decision(sched: &mut Scheduler, actor: Actor, node_id: &str, at: f64) {
    sched.post(at + 0.1, actor, EventKind::DecisionCycle, EventData::at(node_id));
}

/// Record `combat:<opponent>` and `threat:<node>` in each survivor's memory.
fn record_combat_memory(
    world: &mut World,
    actor_a: Actor,
    actor_b: Actor,
    node_id: &str,
    result: &CombatResult,
    now: f64,
) {
    for (actor, opponent) in [(actor_a, actor_b), (actor_b, actor_a)] {
        if !world.alive(actor) {
            continue;
        }
        let opp_name = world
            .get::<Identity>(opponent)
            .map_or_else(|| "unknown".to_owned(), |i| i.name.clone());
        let won = actor == result.winner;
        let damage_taken = if won { result.winner_damage_taken } else { 0.0 };

        let Some(memory) = world.get_mut::<WorldMemory>(actor) else {
            continue;
        };
        memory.observe(
            &format!("combat:{}", opponent.0),
            object(json!({
                "node": node_id,
                "opponent_name": opp_name,
                "won": won,
                "damage_taken": damage_taken,
            })),
            now,
            600.0,
        );
        memory.observe(
            &format!("threat:{node_id}"),
            object(json!({ "level": 1.0, "source": format!("combat with {opp_name}") })),
            now,
            300.0,
        );
    }
}

// ── Stat helpers ──────────────────────────────────────────────────────────────

/// Raw damage per game-minute: `(base + weapon) * attack_rate`.
fn effective_dps(world: &World, actor: Actor) -> f64 {
    let base_damage = world.get::<CombatStats>(actor).map_or(1.0, |c| c.damage);

    let mut weapon_damage = 0.0;
    let mut attack_rate = 1.0; // hits per game-minute
    if let (Some(equip), Some(registry)) =
        (world.get::<Equipment>(actor), world.res::<ItemRegistry>())
    {
        if !equip.weapon.is_empty() {
            weapon_damage = registry.field(&equip.weapon, "damage", 0.0);
            let cooldown = registry.field(&equip.weapon, "cooldown", 0.5);
            if cooldown > 0.0 {
                attack_rate = 1.0 / cooldown;
            }
        }
    }

    (base_damage + weapon_damage) * attack_rate
}

fn flee_threshold(world: &World, actor: Actor) -> f64 {
    world.get::<Threat>(actor).map_or(0.0, |t| t.flee_threshold)
}

/// Escape roll: the faster runner gets away more often, capped at 90%.
fn flee_roll(world: &World, rng: &mut SimRng, fleer: Actor, opponent: Actor) -> bool {
    let fleer_speed = world.get::<Locomotion>(fleer).map_or(2.0, |l| l.speed);
    let opp_speed = world.get::<Locomotion>(opponent).map_or(2.0, |l| l.speed);
    let chance = (0.5 * fleer_speed / opp_speed.max(0.1)).min(0.9);
    rng.gen_bool(chance)
}

fn log_combat(world: &World, result: &CombatResult) {
    let name = |actor: Actor| {
        world
            .get::<Identity>(actor)
            .map_or_else(|| format!("actor {}", actor.0), |i| i.name.clone())
    };
    if result.fled {
        tracing::info!(target: "sim::combat",
            "{} vs {} — {} fled after {:.1} min",
            name(result.winner), name(result.loser), name(result.loser), result.fight_duration);
    } else {
        tracing::info!(target: "sim::combat",
            "{} vs {} — {} wins ({:.0} dmg taken, {:.1} min)",
            name(result.winner), name(result.loser), name(result.winner),
            result.winner_damage_taken, result.fight_duration);
    }
}
