//! Unit and scenario tests for hl-sim.

use hl_core::Actor;
use hl_graph::{SubzoneGraph, SubzoneNode};
use hl_schedule::{EventData, EventKind};
use hl_world::{
    ActorKind, AttackConfig, Brain, CombatStats, Disposition, Equipment, Faction, GraphPos,
    Health, Home, Hunger, Identity, Inventory, ItemRegistry, Locomotion, Lod, LodLevel, Player,
    Stockpile, Threat, TilePos, TravelPlan, Velocity, World, WorldMemory, BB_ATTACK_TARGET,
    BB_PENDING_DESTINATION,
};
use serde_json::json;

use crate::checkpoint::{run_checkpoint, share_memories, CheckpointOutcome};
use crate::combat::{resolve_encounter, stat_check_combat};
use crate::ctx::SimCtx;
use crate::decision::run_decision_cycle;
use crate::economy::{
    create_settlement, deposit_to_stockpile, settlement_needs_supplies, withdraw_from_stockpile,
};
use crate::handlers::{schedule_hunger_event, try_eat};
use crate::lod::is_high_lod;
use crate::meals::next_meal_time;
use crate::travel::{begin_travel, continue_travel, find_nearest_with, plan_route};
use crate::world_sim::WorldSim;

// ── Fixtures ──────────────────────────────────────────────────────────────────

/// The standard test world: a settlement, a road, and some ruins.
fn test_graph() -> SubzoneGraph {
    let mut g = SubzoneGraph::new();
    g.add_node(SubzoneNode::new("sett_well", "settlement", (10, 10)).shelter(true));
    g.add_node(SubzoneNode::new("sett_farm", "settlement", (20, 10)).tag("farmable"));
    g.add_node(SubzoneNode::new("sett_gate", "settlement", (10, 20)));
    g.add_node(SubzoneNode::new("sett_market", "settlement", (14, 10)));
    g.add_node(SubzoneNode::new("road_crossroads", "roads", (30, 30)).visibility(0.8));
    g.add_node(SubzoneNode::new("ruins_entrance", "ruins", (5, 5)).threat(0.5));
    g.add_node(SubzoneNode::new("ruins_deep", "ruins", (15, 5)).threat(1.0));
    g.add_edge("sett_well", "sett_farm", 10.0, true);
    g.add_edge("sett_well", "sett_gate", 5.0, true);
    g.add_edge("sett_well", "sett_market", 4.0, true);
    g.add_edge("sett_gate", "road_crossroads", 8.0, true);
    g.add_edge("road_crossroads", "ruins_entrance", 10.0, true);
    g.add_edge("ruins_entrance", "ruins_deep", 6.0, true);
    g
}

fn test_registry() -> ItemRegistry {
    let mut reg = ItemRegistry::new();
    reg.register("canned_beans", "Canned Beans", "consumable")
        .stat("food_value", 25.0);
    reg.register("bandages", "Bandages", "consumable")
        .stat("food_value", 0.0)
        .stat("heal", 15.0);
    reg.register("knife", "Kitchen Knife", "weapon")
        .stat("damage", 6.0)
        .stat("cooldown", 0.5);
    reg
}

fn sim_with_world() -> (WorldSim, World) {
    let mut world = World::new();
    world.set_res(test_registry());
    (WorldSim::new(test_graph(), 42), world)
}

/// Graph-resident NPC with full vitals.
fn spawn_npc(world: &mut World, name: &str, group: &str, disp: Disposition, node: &str) -> Actor {
    let actor = world.spawn();
    world.attach(actor, Identity::new(name, ActorKind::Npc));
    world.attach(actor, GraphPos { zone: zone_of(node), node: node.to_owned() });
    world.attach(actor, Health::new(100.0));
    world.attach(actor, Hunger { current: 100.0, maximum: 100.0, rate: 0.03, starve_dps: 0.3 });
    world.attach(actor, Inventory::default());
    world.attach(actor, CombatStats { damage: 5.0, defense: 1.0 });
    world.attach(actor, Faction::new(group, disp));
    world.attach(actor, WorldMemory::new());
    world.attach(actor, Lod { level: LodLevel::Low, grace_until: 0.0 });
    actor
}

fn zone_of(node: &str) -> String {
    match node {
        n if n.starts_with("sett_") => "settlement".to_owned(),
        n if n.starts_with("road_") => "roads".to_owned(),
        _ => "ruins".to_owned(),
    }
}

/// Build a handler context over the sim's own parts.
macro_rules! ctx {
    ($sim:expr, $world:expr, $now:expr) => {
        SimCtx {
            world: &mut $world,
            graph: &$sim.graph,
            sched: &mut $sim.scheduler,
            rng: &mut $sim.rng,
            now: $now,
        }
    };
}

// ── Travel ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod travel {
    use super::*;

    #[test]
    fn begin_travel_posts_first_hop() {
        let (mut sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "Ada", "settlers", Disposition::Friendly, "sett_well");

        let plan = plan_route(&sim.graph, "sett_well", "sett_gate", None, 0.0).unwrap();
        assert!(begin_travel(&mut world, npc, plan, &sim.graph, &mut sim.scheduler, 0.0));

        assert!(world.has::<TravelPlan>(npc));
        let pending = sim.scheduler.actor_pending(npc);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].kind, EventKind::ArriveNode);
        assert_eq!(pending[0].time, 5.0); // edge weight
        assert_eq!(pending[0].data.node.as_deref(), Some("sett_gate"));
    }

    #[test]
    fn empty_plan_attaches_and_posts_nothing() {
        let (mut sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "Ada", "settlers", Disposition::Friendly, "sett_well");

        let plan = plan_route(&sim.graph, "sett_well", "sett_well", None, 0.0).unwrap();
        assert!(plan.complete());
        assert!(!begin_travel(&mut world, npc, plan, &sim.graph, &mut sim.scheduler, 0.0));
        assert!(!world.has::<TravelPlan>(npc));
        assert_eq!(sim.scheduler.pending_count(), 0);
    }

    #[test]
    fn continue_travel_walks_then_detaches() {
        let (mut sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "Ada", "settlers", Disposition::Friendly, "sett_gate");

        // Route gate → well → market (two hops).
        let plan = plan_route(&sim.graph, "sett_gate", "sett_market", None, 0.0).unwrap();
        assert_eq!(plan.path, vec!["sett_well".to_owned(), "sett_market".to_owned()]);
        begin_travel(&mut world, npc, plan, &sim.graph, &mut sim.scheduler, 0.0);

        // Arrived at the well; one hop remains.
        assert!(continue_travel(&mut world, npc, "sett_well", &sim.graph, &mut sim.scheduler, 5.0));
        // Arrived at the market; plan completes and detaches.
        assert!(!continue_travel(
            &mut world, npc, "sett_market", &sim.graph, &mut sim.scheduler, 9.0
        ));
        assert!(!world.has::<TravelPlan>(npc));
    }

    #[test]
    fn threat_memory_changes_route() {
        let graph = test_graph();
        let mut memory = WorldMemory::new();
        // The well is remembered as dangerous; gate → market now prefers
        // paying for the longer way only if one exists — here it still has
        // to pass the well, so the plan survives but costs more.  Use the
        // diamond in hl-graph tests for the reroute itself; this checks
        // plumbing through plan_route.
        memory.observe(
            "threat:sett_well",
            hl_world::object(json!({"level": 2.0})),
            0.0,
            300.0,
        );
        let plan = plan_route(&graph, "sett_gate", "sett_market", Some(&memory), 0.0).unwrap();
        assert_eq!(plan.destination, "sett_market");
        assert!(!plan.path.is_empty());
    }

    #[test]
    fn find_nearest_with_matches_start_first() {
        let graph = test_graph();
        assert_eq!(
            find_nearest_with(&graph, "sett_well", |n| n.shelter, 20),
            Some("sett_well".to_owned())
        );
        // Nearest shelter from the ruins is the well, three hops away.
        assert_eq!(
            find_nearest_with(&graph, "ruins_entrance", |n| n.shelter, 20),
            Some("sett_well".to_owned())
        );
        assert_eq!(find_nearest_with(&graph, "ruins_entrance", |n| n.id == "x", 20), None);
    }
}

// ── Stat combat ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod combat {
    use super::*;

    fn fighter(
        world: &mut World,
        name: &str,
        node: &str,
        hp: f64,
        damage: f64,
        defense: f64,
        flee: f64,
    ) -> Actor {
        let actor = spawn_npc(world, name, name, Disposition::Hostile, node);
        world.attach(actor, Health::new(hp));
        world.attach(actor, CombatStats { damage, defense });
        world.attach(actor, Threat { flee_threshold: flee, ..Threat::default() });
        actor
    }

    #[test]
    fn converging_hostiles_leave_one_corpse() {
        let (mut sim, mut world) = sim_with_world();
        let raider = fighter(&mut world, "Raider", "road_crossroads", 80.0, 12.0, 2.0, 0.0);
        let settler = fighter(&mut world, "Settler", "road_crossroads", 100.0, 8.0, 3.0, 0.3);
        // Zero speed: the settler's flee roll can never succeed, so the
        // outcome is deterministic regardless of seed.
        world.attach(settler, Locomotion { speed: 0.0 });

        let mut ctx = ctx!(sim, world, 100.0);
        let result = resolve_encounter(&mut ctx, raider, settler, "road_crossroads");

        // Raider kills in 100/11.1 ≈ 9.0 min; settler would need 10.8.
        assert!(!result.fled);
        assert_eq!(result.winner, raider);
        assert!(world.alive(raider));
        assert!(!world.alive(settler));

        // Exactly one corpse, at the crossroads.
        let corpses: Vec<Actor> = world
            .all_of::<Identity>()
            .into_iter()
            .filter(|(_, i)| i.kind == ActorKind::Corpse)
            .map(|(a, _)| a)
            .collect();
        assert_eq!(corpses.len(), 1);
        let corpse_pos = world.get::<GraphPos>(corpses[0]).unwrap();
        assert_eq!(corpse_pos.node, "road_crossroads");

        // Survivor remembers the fight and the danger.
        let memory = world.get::<WorldMemory>(raider).unwrap();
        assert!(memory.recall(&format!("combat:{}", settler.0)).is_some());
        assert!(memory.recall("threat:road_crossroads").is_some());
    }

    #[test]
    fn flee_or_death_exactly_one_holds() {
        // Brute vs coward across many seeds: at return, either the coward
        // fled (and lives at ≥ 1 HP) or its HP is exactly zero — never both.
        for seed in 0..20 {
            let mut world = World::new();
            world.set_res(test_registry());
            let mut sim = WorldSim::new(test_graph(), seed);

            let brute = fighter(&mut world, "Brute", "ruins_entrance", 150.0, 20.0, 5.0, 0.0);
            let coward = fighter(&mut world, "Coward", "ruins_entrance", 60.0, 3.0, 0.0, 0.8);
            world.attach(coward, Locomotion { speed: 4.0 });

            let mut ctx = ctx!(sim, world, 0.0);
            let result = resolve_encounter(&mut ctx, brute, coward, "ruins_entrance");

            assert!(world.alive(brute));
            if result.fled {
                assert_eq!(result.flee_actor, Some(coward));
                assert!(world.alive(coward));
                assert!(world.get::<Health>(coward).unwrap().current >= 1.0);
                // The fleer is running somewhere or holing up.
                assert!(
                    sim.scheduler.has_pending(coward, Some(EventKind::ArriveNode))
                        || sim.scheduler.has_pending(coward, Some(EventKind::RestComplete))
                );
            } else {
                assert!(!world.alive(coward));
            }
        }
    }

    #[test]
    fn floored_dps_still_terminates() {
        let (mut sim, mut world) = sim_with_world();
        // Defender armour swallows the whole attack: effective DPS floors
        // at 0.1 and the fight still ends in finite time.
        let tank = fighter(&mut world, "Tank", "sett_gate", 50.0, 1.0, 1000.0, 0.0);
        let mouse = fighter(&mut world, "Mouse", "sett_gate", 10.0, 1.0, 1000.0, 0.0);

        let result = stat_check_combat(&mut world, &mut sim.rng, tank, mouse);
        assert!(result.fight_duration.is_finite());
        // Mouse has less HP against the same floored DPS — it loses.
        assert_eq!(result.loser, mouse);
        assert_eq!(world.get::<Health>(mouse).unwrap().current, 0.0);
    }

    #[test]
    fn weapon_stats_feed_dps() {
        let (mut sim, mut world) = sim_with_world();
        let armed = fighter(&mut world, "Armed", "sett_gate", 100.0, 5.0, 0.0, 0.0);
        let unarmed = fighter(&mut world, "Unarmed", "sett_gate", 100.0, 5.0, 0.0, 0.0);
        world.attach(armed, Equipment { weapon: "knife".to_owned(), armor: String::new() });

        // Knife: (5 + 6) * (1 / 0.5) = 22 dps vs 5 dps — armed wins.
        let result = stat_check_combat(&mut world, &mut sim.rng, armed, unarmed);
        assert_eq!(result.winner, armed);
    }

    #[test]
    fn corpse_inherits_inventory_not_winner() {
        let (mut sim, mut world) = sim_with_world();
        let victor = fighter(&mut world, "Victor", "sett_gate", 200.0, 20.0, 5.0, 0.0);
        let victim = fighter(&mut world, "Victim", "sett_gate", 20.0, 1.0, 0.0, 0.0);
        if let Some(inv) = world.get_mut::<Inventory>(victim) {
            inv.add("canned_beans", 3);
        }

        let mut ctx = ctx!(sim, world, 0.0);
        resolve_encounter(&mut ctx, victor, victim, "sett_gate");

        let corpse = world
            .all_of::<Identity>()
            .into_iter()
            .find(|(_, i)| i.kind == ActorKind::Corpse)
            .map(|(a, _)| a)
            .unwrap();
        assert_eq!(
            world.get::<Inventory>(corpse).unwrap().items.get("canned_beans"),
            Some(&3)
        );
        assert!(world.get::<Inventory>(victor).unwrap().is_empty());
    }
}

// ── Checkpoint ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod checkpoint {
    use super::*;

    #[test]
    fn discovery_records_location_containers_entities() {
        let (mut sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "Scout", "settlers", Disposition::Friendly, "sett_market");
        let bystander =
            spawn_npc(&mut world, "Trader", "merchants", Disposition::Neutral, "sett_market");
        let chest = sim
            .place_container(&mut world, "sett_market", "Market stall", &[("canned_beans", 2)])
            .unwrap();

        let mut ctx = ctx!(sim, world, 50.0);
        let outcome = run_checkpoint(&mut ctx, npc, "sett_market");
        assert_eq!(outcome, CheckpointOutcome::Arrived);

        let memory = world.get::<WorldMemory>(npc).unwrap();
        let location = memory.recall("location:sett_market").unwrap();
        assert_eq!(location.text("zone"), Some("settlement"));
        assert_eq!(location.number("containers", 0.0), 1.0);

        let container = memory.recall(&format!("container:{}", chest.0)).unwrap();
        assert!(container.flag("has_items"));
        assert_eq!(container.number("item_count", 0.0), 2.0);

        let entity = memory.recall(&format!("entity:{}", bystander.0)).unwrap();
        assert_eq!(entity.text("name"), Some("Trader"));
        assert_eq!(entity.text("disposition"), Some("neutral"));
    }

    #[test]
    fn hungry_with_food_diverts_to_eat() {
        let (mut sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "Hungry", "settlers", Disposition::Friendly, "sett_gate");
        world.get_mut::<Hunger>(npc).unwrap().current = 20.0; // ratio 0.2
        world.get_mut::<Inventory>(npc).unwrap().add("canned_beans", 1);

        let mut ctx = ctx!(sim, world, 0.0);
        assert_eq!(run_checkpoint(&mut ctx, npc, "sett_gate"), CheckpointOutcome::Divert);
        let pending = sim.scheduler.actor_pending(npc);
        assert_eq!(pending[0].kind, EventKind::FinishEat);
        assert_eq!(pending[0].time, 2.0);
    }

    #[test]
    fn hungry_without_food_searches_containers() {
        let (mut sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "Hungry", "settlers", Disposition::Friendly, "sett_market");
        world.get_mut::<Hunger>(npc).unwrap().current = 20.0;
        let chest = sim
            .place_container(&mut world, "sett_market", "Stall", &[("canned_beans", 1)])
            .unwrap();

        let mut ctx = ctx!(sim, world, 0.0);
        assert_eq!(run_checkpoint(&mut ctx, npc, "sett_market"), CheckpointOutcome::Divert);
        let pending = sim.scheduler.actor_pending(npc);
        assert_eq!(pending[0].kind, EventKind::FinishSearch);
        assert_eq!(pending[0].time, 5.0);
        assert_eq!(pending[0].data.container, Some(chest));
    }

    #[test]
    fn wounded_at_shelter_rests() {
        let (mut sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "Hurt", "settlers", Disposition::Friendly, "sett_well");
        world.get_mut::<Health>(npc).unwrap().current = 30.0; // ratio 0.3

        let mut ctx = ctx!(sim, world, 0.0);
        assert_eq!(run_checkpoint(&mut ctx, npc, "sett_well"), CheckpointOutcome::Divert);
        let pending = sim.scheduler.actor_pending(npc);
        assert_eq!(pending[0].kind, EventKind::RestComplete);
        // max(5, (1 - 0.3) * 30) = 21 minutes.
        assert!((pending[0].time - 21.0).abs() < 1e-9);
    }

    #[test]
    fn hostiles_at_node_trigger_encounter() {
        let (mut sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "A", "settlers", Disposition::Friendly, "sett_gate");
        let _foe = spawn_npc(&mut world, "B", "raiders", Disposition::Hostile, "sett_gate");

        let mut ctx = ctx!(sim, world, 0.0);
        assert_eq!(run_checkpoint(&mut ctx, npc, "sett_gate"), CheckpointOutcome::Encounter);
    }

    #[test]
    fn friendly_sharing_is_mutual() {
        let (_sim, mut world) = sim_with_world();
        let alice = spawn_npc(&mut world, "Alice", "settlers", Disposition::Friendly, "sett_farm");
        let bob = spawn_npc(&mut world, "Bob", "settlers", Disposition::Friendly, "sett_farm");

        world.get_mut::<WorldMemory>(alice).unwrap().observe(
            "location:ruins_deep",
            hl_world::object(json!({"zone": "ruins", "containers": 2})),
            10.0,
            600.0,
        );
        world.get_mut::<WorldMemory>(bob).unwrap().observe(
            "threat:road_crossroads",
            hl_world::object(json!({"level": 1.0})),
            12.0,
            300.0,
        );

        share_memories(&mut world, alice, bob, 20.0);

        let bob_mem = world.get::<WorldMemory>(bob).unwrap();
        let got = bob_mem.recall("location:ruins_deep").unwrap();
        assert_eq!(got.number("containers", 0.0), 2.0);
        let alice_mem = world.get::<WorldMemory>(alice).unwrap();
        assert!(alice_mem.recall("threat:road_crossroads").is_some());
    }

    #[test]
    fn crime_news_radicalises_guards() {
        let (_sim, mut world) = sim_with_world();
        let witness =
            spawn_npc(&mut world, "Witness", "settlers", Disposition::Friendly, "sett_well");
        let guard = spawn_npc(&mut world, "Guard", "settlers", Disposition::Friendly, "sett_well");
        world.attach(guard, AttackConfig::default());

        world.get_mut::<WorldMemory>(witness).unwrap().observe(
            "crime:theft_market",
            hl_world::object(json!({"severity": 2})),
            5.0,
            600.0,
        );

        share_memories(&mut world, witness, guard, 10.0);
        assert_eq!(
            world.get::<Faction>(guard).unwrap().disposition,
            Disposition::Hostile
        );
        // The unarmed witness keeps their disposition.
        assert_eq!(
            world.get::<Faction>(witness).unwrap().disposition,
            Disposition::Friendly
        );
    }

    #[test]
    fn friendly_convergence_via_tick_loop() {
        // Bob walks sett_well → sett_farm and picks up Alice's knowledge.
        let (mut sim, mut world) = sim_with_world();
        let alice = spawn_npc(&mut world, "Alice", "settlers", Disposition::Friendly, "sett_farm");
        world.attach(alice, Home { zone: "settlement".into(), node: "sett_farm".into() });
        let bob = spawn_npc(&mut world, "Bob", "settlers", Disposition::Friendly, "sett_well");
        world.attach(bob, Home { zone: "settlement".into(), node: "sett_farm".into() });

        world.get_mut::<WorldMemory>(alice).unwrap().observe(
            "location:ruins_deep",
            hl_world::object(json!({"zone": "ruins", "containers": 2})),
            0.0,
            600.0,
        );

        sim.bootstrap(&mut world, 0.0);
        let plan = plan_route(&sim.graph, "sett_well", "sett_farm", None, 0.0).unwrap();
        begin_travel(&mut world, bob, plan, &sim.graph, &mut sim.scheduler, 0.0);

        for minute in 1..=30 {
            sim.tick(&mut world, minute as f64);
        }

        assert!(world.alive(alice));
        assert!(world.alive(bob));
        let bob_mem = world.get::<WorldMemory>(bob).unwrap();
        let entry = bob_mem.recall("location:ruins_deep").unwrap();
        assert_eq!(entry.text("zone"), Some("ruins"));
        assert_eq!(entry.number("containers", 0.0), 2.0);
    }

    #[test]
    fn neutral_convergence_stays_peaceful() {
        let (mut sim, mut world) = sim_with_world();
        let trader =
            spawn_npc(&mut world, "Trader", "merchants", Disposition::Neutral, "sett_market");
        let guard = spawn_npc(&mut world, "Guard", "militia", Disposition::Neutral, "sett_gate");

        sim.bootstrap(&mut world, 0.0);
        let plan = plan_route(&sim.graph, "sett_gate", "sett_market", None, 0.0).unwrap();
        begin_travel(&mut world, guard, plan, &sim.graph, &mut sim.scheduler, 0.0);

        for minute in 1..=20 {
            sim.tick(&mut world, minute as f64);
        }

        assert!(world.alive(trader));
        assert!(world.alive(guard));
        for actor in [trader, guard] {
            let memory = world.get::<WorldMemory>(actor).unwrap();
            assert!(memory.query_prefix("combat:", 20.0, true).is_empty());
        }
    }
}

// ── Decision cycle ────────────────────────────────────────────────────────────

#[cfg(test)]
mod decision {
    use super::*;

    #[test]
    fn critical_hp_rests_at_shelter() {
        let (mut sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "Hurt", "settlers", Disposition::Friendly, "sett_well");
        world.get_mut::<Health>(npc).unwrap().current = 20.0; // ratio 0.2

        let mut ctx = ctx!(sim, world, 0.0);
        assert_eq!(run_decision_cycle(&mut ctx, npc, "sett_well"), "rest");
        let pending = sim.scheduler.actor_pending(npc);
        assert_eq!(pending[0].kind, EventKind::RestComplete);
        // max(10, (1 - 0.2) * 60) = 48 minutes.
        assert!((pending[0].time - 48.0).abs() < 1e-9);
    }

    #[test]
    fn critical_hp_travels_to_shelter() {
        let (mut sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "Hurt", "loners", Disposition::Neutral, "ruins_deep");
        world.get_mut::<Health>(npc).unwrap().current = 20.0;

        let mut ctx = ctx!(sim, world, 0.0);
        assert_eq!(run_decision_cycle(&mut ctx, npc, "ruins_deep"), "rest");
        let plan = world.get::<TravelPlan>(npc).unwrap();
        assert_eq!(plan.destination, "sett_well");
    }

    #[test]
    fn hungry_eats_from_inventory() {
        let (mut sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "Hungry", "loners", Disposition::Neutral, "sett_gate");
        world.get_mut::<Hunger>(npc).unwrap().current = 30.0; // ratio 0.3
        world.get_mut::<Inventory>(npc).unwrap().add("canned_beans", 2);

        let mut ctx = ctx!(sim, world, 0.0);
        assert_eq!(run_decision_cycle(&mut ctx, npc, "sett_gate"), "eat");

        let hunger = world.get::<Hunger>(npc).unwrap();
        assert_eq!(hunger.current, 55.0); // 30 + 25
        assert_eq!(world.get::<Inventory>(npc).unwrap().items.get("canned_beans"), Some(&1));
        assert!(sim.scheduler.has_pending(npc, Some(EventKind::DecisionCycle)));
        assert!(sim.scheduler.has_pending(npc, Some(EventKind::HungerCritical)));
    }

    #[test]
    fn hungry_eats_from_home_stockpile() {
        let (mut sim, mut world) = sim_with_world();
        create_settlement(&mut world, "The Well", "settlement", "sett_well", &[("raw_food", 5)]);
        let npc = spawn_npc(&mut world, "Hungry", "loners", Disposition::Neutral, "sett_well");
        world.attach(npc, Home { zone: "settlement".into(), node: "sett_well".into() });
        world.get_mut::<Hunger>(npc).unwrap().current = 30.0;

        let mut ctx = ctx!(sim, world, 0.0);
        assert_eq!(run_decision_cycle(&mut ctx, npc, "sett_well"), "eat");
        // One item left the shared pool.
        let (_, sp) = world.query_one::<(Stockpile,)>().map(|(a, (s,))| (a, s.clone())).unwrap();
        assert_eq!(sp.total_count(), 4);
    }

    #[test]
    fn hungry_with_lead_goes_scavenging() {
        let (mut sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "Hungry", "loners", Disposition::Neutral, "sett_gate");
        world.get_mut::<Hunger>(npc).unwrap().current = 30.0;
        world.get_mut::<WorldMemory>(npc).unwrap().observe(
            "container:99",
            hl_world::object(json!({"node": "ruins_deep", "has_items": true})),
            5.0,
            300.0,
        );

        let mut ctx = ctx!(sim, world, 10.0);
        assert_eq!(run_decision_cycle(&mut ctx, npc, "sett_gate"), "scavenge");
        assert_eq!(world.get::<TravelPlan>(npc).unwrap().destination, "ruins_deep");
    }

    #[test]
    fn farmer_works_the_land_at_home() {
        let (mut sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "Farmer", "settlers", Disposition::Friendly, "sett_farm");
        world.attach(npc, Home { zone: "settlement".into(), node: "sett_farm".into() });

        let mut ctx = ctx!(sim, world, 0.0);
        assert_eq!(run_decision_cycle(&mut ctx, npc, "sett_farm"), "farm");
        let pending = sim.scheduler.actor_pending(npc);
        assert_eq!(pending[0].kind, EventKind::FinishWork);
        assert_eq!(pending[0].data.job.as_deref(), Some("farming"));
        let harvest = pending[0].data.yield_count.unwrap();
        assert!((2..=5).contains(&harvest));
        assert!((15.0..30.0).contains(&pending[0].time));
    }

    #[test]
    fn guard_patrols_near_home() {
        let (mut sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "Guard", "guards", Disposition::Friendly, "sett_gate");
        world.attach(npc, Home { zone: "settlement".into(), node: "sett_gate".into() });
        world.attach(npc, AttackConfig::default());

        let mut ctx = ctx!(sim, world, 0.0);
        assert_eq!(run_decision_cycle(&mut ctx, npc, "sett_gate"), "guard");
        // Either a direct hop or a routed patrol leg is now queued.
        assert!(
            sim.scheduler.has_pending(npc, Some(EventKind::ArriveNode))
                || sim.scheduler.has_pending(npc, Some(EventKind::DecisionCycle))
        );
    }

    #[test]
    fn off_beat_guard_returns_to_post() {
        let (mut sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "Guard", "guards", Disposition::Friendly, "ruins_deep");
        world.attach(npc, Home { zone: "settlement".into(), node: "sett_well".into() });
        // No AttackConfig: beat is only the well's direct neighbours, and
        // the deep ruins are far outside it.
        let mut ctx = ctx!(sim, world, 0.0);
        assert_eq!(run_decision_cycle(&mut ctx, npc, "ruins_deep"), "guard");
        assert_eq!(world.get::<TravelPlan>(npc).unwrap().destination, "sett_well");
    }

    #[test]
    fn raider_heads_for_remembered_containers() {
        let (mut sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "Raider", "raiders", Disposition::Hostile, "ruins_entrance");
        world.get_mut::<WorldMemory>(npc).unwrap().observe(
            "location:sett_market",
            hl_world::object(json!({"zone": "settlement", "containers": 2})),
            0.0,
            600.0,
        );

        let mut ctx = ctx!(sim, world, 1.0);
        assert_eq!(run_decision_cycle(&mut ctx, npc, "ruins_entrance"), "raid");
        assert_eq!(world.get::<TravelPlan>(npc).unwrap().destination, "sett_market");
    }

    #[test]
    fn homesick_wanderer_returns() {
        let (mut sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "Drifter", "loners", Disposition::Neutral, "ruins_deep");
        world.attach(npc, Home { zone: "settlement".into(), node: "sett_well".into() });
        // Fresh memories of every neighbour suppress the explore branch.
        world.get_mut::<WorldMemory>(npc).unwrap().observe(
            "location:ruins_entrance",
            hl_world::object(json!({})),
            0.0,
            600.0,
        );

        let mut ctx = ctx!(sim, world, 1.0);
        assert_eq!(run_decision_cycle(&mut ctx, npc, "ruins_deep"), "return_home");
        assert_eq!(world.get::<TravelPlan>(npc).unwrap().destination, "sett_well");
    }

    #[test]
    fn mid_route_actor_keeps_traveling() {
        let (mut sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "Walker", "loners", Disposition::Neutral, "sett_gate");
        let plan = plan_route(&sim.graph, "sett_gate", "ruins_deep", None, 0.0).unwrap();
        begin_travel(&mut world, npc, plan, &sim.graph, &mut sim.scheduler, 0.0);

        let mut ctx = ctx!(sim, world, 1.0);
        assert_eq!(run_decision_cycle(&mut ctx, npc, "sett_gate"), "traveling");
    }
}

// ── LOD transitions ───────────────────────────────────────────────────────────

#[cfg(test)]
mod lod {
    use super::*;

    #[test]
    fn promote_then_demote_preserves_vitals_bit_exact() {
        let (mut sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "Keeper", "settlers", Disposition::Friendly, "sett_well");
        world.attach(npc, Brain::new("villager"));
        world.get_mut::<Health>(npc).unwrap().current = 61.25;
        world.get_mut::<Hunger>(npc).unwrap().current = 47.5;
        world.get_mut::<Inventory>(npc).unwrap().add("canned_beans", 3);

        let health_before = world.get::<Health>(npc).copied().unwrap();
        let hunger_before = world.get::<Hunger>(npc).copied().unwrap();
        let items_before = world.get::<Inventory>(npc).cloned().unwrap();

        assert!(sim.promote(&mut world, npc, 5.0));
        assert!(world.has::<TilePos>(npc));
        assert!(!world.has::<GraphPos>(npc));
        assert_eq!(world.get::<Lod>(npc).unwrap().level, LodLevel::High);
        assert!(world.get::<Brain>(npc).unwrap().active);
        assert_eq!(sim.scheduler.actor_pending(npc).len(), 0);

        assert!(sim.demote(&mut world, npc, 6.0));
        assert!(world.has::<GraphPos>(npc));
        assert!(!world.has::<TilePos>(npc));
        assert_eq!(world.get::<Lod>(npc).unwrap().level, LodLevel::Low);
        assert!(!world.get::<Brain>(npc).unwrap().active);

        assert_eq!(world.get::<Health>(npc).copied().unwrap(), health_before);
        assert_eq!(world.get::<Hunger>(npc).copied().unwrap(), hunger_before);
        assert_eq!(world.get::<Inventory>(npc).cloned().unwrap(), items_before);
    }

    #[test]
    fn promote_cancels_every_pending_event() {
        let (mut sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "Busy", "settlers", Disposition::Friendly, "sett_well");
        sim.scheduler.post(50.0, npc, EventKind::ArriveNode, EventData::at("sett_gate"));
        sim.scheduler.post(90.0, npc, EventKind::HungerCritical, EventData::default());

        assert!(sim.promote(&mut world, npc, 5.0));
        assert!(!sim.scheduler.has_pending(npc, None));
    }

    #[test]
    fn promoted_container_gets_only_a_tile_position() {
        let (mut sim, mut world) = sim_with_world();
        let chest = sim
            .place_container(&mut world, "sett_market", "Stall", &[("canned_beans", 1)])
            .unwrap();

        assert!(sim.promote(&mut world, chest, 0.0));
        assert!(world.has::<TilePos>(chest));
        assert!(!world.has::<Velocity>(chest));
        assert!(!world.has::<hl_world::Facing>(chest));
        assert!(!world.has::<hl_world::Collider>(chest));
        assert!(!world.has::<hl_world::Hurtbox>(chest));
    }

    #[test]
    fn settlements_are_never_promoted() {
        let (mut sim, mut world) = sim_with_world();
        let settlement =
            create_settlement(&mut world, "The Well", "settlement", "sett_well", &[]);
        assert!(!sim.promote(&mut world, settlement, 0.0));
        assert!(world.has::<GraphPos>(settlement));
    }

    #[test]
    fn demotion_schedules_the_initial_event_bundle() {
        let (mut sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "Far", "settlers", Disposition::Friendly, "sett_well");
        world.detach::<GraphPos>(npc);
        world.attach(npc, TilePos { x: 11.0, y: 11.0, zone: "settlement".into() });
        world.zone_add(npc, "settlement");

        assert!(sim.demote(&mut world, npc, 0.0));
        assert!(sim.scheduler.has_pending(npc, Some(EventKind::HungerCritical)));
        assert!(sim.scheduler.has_pending(npc, Some(EventKind::DecisionCycle)));
        // Snapped to the nearest anchor in the zone.
        assert_eq!(world.get::<GraphPos>(npc).unwrap().node, "sett_well");
    }

    #[test]
    fn demotion_resolves_an_active_fight_first() {
        let (mut sim, mut world) = sim_with_world();
        // Doomed is mid-fight with a far stronger opponent when the player
        // leaves the zone.
        let doomed = spawn_npc(&mut world, "Doomed", "raiders", Disposition::Hostile, "sett_gate");
        world.detach::<GraphPos>(doomed);
        world.attach(doomed, TilePos { x: 10.0, y: 20.0, zone: "settlement".into() });
        world.zone_add(doomed, "settlement");
        world.get_mut::<Health>(doomed).unwrap().current = 10.0;
        world.attach(doomed, CombatStats { damage: 1.0, defense: 0.0 });

        let slayer = spawn_npc(&mut world, "Slayer", "militia", Disposition::Neutral, "sett_gate");
        world.attach(slayer, CombatStats { damage: 50.0, defense: 10.0 });

        let mut brain = Brain::new("hostile_melee");
        brain.active = true;
        brain.state.insert(BB_ATTACK_TARGET.to_owned(), json!(slayer.0));
        world.attach(doomed, brain);

        assert!(sim.demote(&mut world, doomed, 0.0));
        assert!(!world.alive(doomed));
        let corpse_count = world
            .all_of::<Identity>()
            .into_iter()
            .filter(|(_, i)| i.kind == ActorKind::Corpse)
            .count();
        assert_eq!(corpse_count, 1);
    }

    #[test]
    fn interrupted_route_is_handed_to_the_brain() {
        let (mut sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "Walker", "settlers", Disposition::Friendly, "sett_well");
        world.attach(npc, Brain::new("villager"));
        let plan = plan_route(&sim.graph, "sett_well", "ruins_deep", None, 0.0).unwrap();
        begin_travel(&mut world, npc, plan, &sim.graph, &mut sim.scheduler, 0.0);

        assert!(sim.promote(&mut world, npc, 1.0));
        assert!(!world.has::<TravelPlan>(npc));
        let brain = world.get::<Brain>(npc).unwrap();
        assert_eq!(
            brain.state.get(BB_PENDING_DESTINATION).and_then(|v| v.as_str()),
            Some("ruins_deep")
        );
    }

    #[test]
    fn zone_change_is_single_pass_and_idempotent() {
        let (mut sim, mut world) = sim_with_world();
        let player = world.spawn();
        world.attach(player, Player::default());
        world.attach(player, TilePos { x: 10.0, y: 10.0, zone: "settlement".into() });

        let local = spawn_npc(&mut world, "Local", "settlers", Disposition::Friendly, "sett_well");
        let far = spawn_npc(&mut world, "Far", "raiders", Disposition::Hostile, "ruins_deep");
        world.detach::<GraphPos>(far);
        world.attach(far, TilePos { x: 15.0, y: 5.0, zone: "ruins".into() });
        world.zone_add(far, "ruins");

        let (promoted, demoted) = sim.on_zone_change(&mut world, "settlement", 0.0);
        assert_eq!((promoted, demoted), (1, 1));
        assert!(world.has::<TilePos>(local));
        assert!(world.has::<GraphPos>(far));

        // Running the same transition again changes nothing.
        assert_eq!(sim.on_zone_change(&mut world, "settlement", 0.1), (0, 0));

        // Positional exclusivity holds for everyone.
        for (actor, _) in world.all_of::<Identity>() {
            let tile = world.has::<TilePos>(actor);
            let graph = world.has::<GraphPos>(actor);
            assert!(tile ^ graph, "actor {actor} has tile={tile} graph={graph}");
        }
    }

    #[test]
    fn high_lod_actors_are_recognised() {
        let (mut sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "Near", "settlers", Disposition::Friendly, "sett_well");
        assert!(!is_high_lod(&world, npc));
        sim.promote(&mut world, npc, 0.0);
        assert!(is_high_lod(&world, npc));
    }
}

// ── Handlers through the tick pump ────────────────────────────────────────────

#[cfg(test)]
mod handlers {
    use super::*;

    #[test]
    fn hunger_critical_bootstrap_timing() {
        let (mut sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "Solo", "loners", Disposition::Neutral, "sett_farm");
        world.attach(
            npc,
            Hunger { current: 50.0, maximum: 100.0, rate: 1.0, starve_dps: 0.3 },
        );

        sim.bootstrap(&mut world, 0.0);

        // (50 - 30) / (1.0 * 60) = 0.333… minutes to critical.
        let first = sim.next_event_time();
        assert!((first - 0.333).abs() < 0.01);

        sim.tick(&mut world, 0.4);
        assert!(world.get::<Hunger>(npc).unwrap().current <= 30.0 + 1e-9);
        // No food anywhere: the actor is now waiting on a hunger-driven
        // decision cycle.
        assert!(sim.scheduler.has_pending(npc, Some(EventKind::DecisionCycle)));
    }

    #[test]
    fn zero_drain_hunger_is_never_scheduled() {
        let (mut sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "Solo", "loners", Disposition::Neutral, "sett_farm");
        world.attach(
            npc,
            Hunger { current: 80.0, maximum: 100.0, rate: 0.0, starve_dps: 0.0 },
        );

        schedule_hunger_event(&world, &mut sim.scheduler, npc, 0.0);
        assert!(!sim.scheduler.has_pending(npc, Some(EventKind::HungerCritical)));
    }

    #[test]
    fn eating_restores_food_value_and_consumes_one() {
        let (_sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "Eater", "loners", Disposition::Neutral, "sett_well");
        world.get_mut::<Hunger>(npc).unwrap().current = 50.0;
        world.get_mut::<Inventory>(npc).unwrap().add("canned_beans", 2);

        assert!(try_eat(&mut world, npc));
        assert_eq!(world.get::<Hunger>(npc).unwrap().current, 75.0);
        assert_eq!(world.get::<Inventory>(npc).unwrap().items.get("canned_beans"), Some(&1));
    }

    #[test]
    fn eating_clamps_at_maximum() {
        let (_sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "Full", "loners", Disposition::Neutral, "sett_well");
        world.get_mut::<Hunger>(npc).unwrap().current = 90.0;
        world.get_mut::<Inventory>(npc).unwrap().add("canned_beans", 1);

        assert!(try_eat(&mut world, npc));
        assert_eq!(world.get::<Hunger>(npc).unwrap().current, 100.0);
    }

    #[test]
    fn rest_heals_two_percent_per_minute() {
        let (mut sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "Rester", "loners", Disposition::Neutral, "sett_well");
        world.get_mut::<Health>(npc).unwrap().current = 50.0;

        sim.bootstrap(&mut world, 0.0);
        sim.scheduler.post(
            5.0,
            npc,
            EventKind::RestComplete,
            EventData { duration: Some(10.0), ..EventData::at("sett_well") },
        );
        sim.tick(&mut world, 5.0);

        // 2% of 100 max per minute × 10 minutes = +20 HP.
        assert_eq!(world.get::<Health>(npc).unwrap().current, 70.0);
    }

    #[test]
    fn finish_search_empties_the_container() {
        let (mut sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "Looter", "loners", Disposition::Neutral, "sett_market");
        let chest = sim
            .place_container(
                &mut world,
                "sett_market",
                "Stall",
                &[("canned_beans", 2), ("bandages", 1)],
            )
            .unwrap();

        sim.bootstrap(&mut world, 0.0);
        sim.scheduler.post(
            1.0,
            npc,
            EventKind::FinishSearch,
            EventData { container: Some(chest), ..EventData::at("sett_market") },
        );
        sim.tick(&mut world, 1.0);

        let inv = world.get::<Inventory>(npc).unwrap();
        assert_eq!(inv.items.get("canned_beans"), Some(&2));
        assert_eq!(inv.items.get("bandages"), Some(&1));
        assert!(world.get::<Inventory>(chest).unwrap().is_empty());

        let memory = world.get::<WorldMemory>(npc).unwrap();
        let searched = memory.recall(&format!("searched:{}", chest.0)).unwrap();
        assert_eq!(searched.number("items_found", 0.0), 3.0);
    }

    #[test]
    fn farming_feeds_the_settlement_stockpile() {
        let (mut sim, mut world) = sim_with_world();
        create_settlement(&mut world, "The Well", "settlement", "sett_well", &[]);
        let npc = spawn_npc(&mut world, "Farmer", "settlers", Disposition::Friendly, "sett_farm");
        world.attach(npc, Home { zone: "settlement".into(), node: "sett_well".into() });

        sim.bootstrap(&mut world, 0.0);
        sim.scheduler.post(
            1.0,
            npc,
            EventKind::FinishWork,
            EventData {
                job: Some("farming".to_owned()),
                yield_count: Some(4),
                ..EventData::at("sett_farm")
            },
        );
        sim.tick(&mut world, 1.0);

        let (_, (stockpile,)) = world.query_one::<(Stockpile,)>().unwrap();
        assert_eq!(stockpile.items.get("raw_food"), Some(&4));
    }

    #[test]
    fn crafting_lands_in_the_inventory() {
        let (mut sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "Maker", "loners", Disposition::Neutral, "sett_well");

        sim.bootstrap(&mut world, 0.0);
        sim.scheduler.post(
            1.0,
            npc,
            EventKind::FinishWork,
            EventData {
                job: Some("crafting".to_owned()),
                product: Some("bandages".to_owned()),
                ..EventData::at("sett_well")
            },
        );
        sim.tick(&mut world, 1.0);

        assert_eq!(world.get::<Inventory>(npc).unwrap().items.get("bandages"), Some(&1));
    }

    #[test]
    fn dead_actor_events_are_dropped() {
        let (mut sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "Gone", "loners", Disposition::Neutral, "sett_well");
        sim.bootstrap(&mut world, 0.0);
        sim.scheduler.post(1.0, npc, EventKind::DecisionCycle, EventData::at("sett_well"));
        world.kill(npc);

        assert_eq!(sim.tick(&mut world, 2.0), 0);
        assert_eq!(sim.scheduler.pending_count(), 0);
    }

    #[test]
    fn high_lod_actor_events_are_dropped() {
        let (mut sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "Seen", "loners", Disposition::Neutral, "sett_well");
        sim.bootstrap(&mut world, 0.0);
        sim.scheduler.post(1.0, npc, EventKind::DecisionCycle, EventData::at("sett_well"));
        sim.promote(&mut world, npc, 0.5);
        // Promotion cancels pending events; re-post to prove the pump also
        // guards on its own.
        sim.scheduler.post(1.0, npc, EventKind::DecisionCycle, EventData::at("sett_well"));

        assert_eq!(sim.tick(&mut world, 2.0), 0);
    }

    #[test]
    fn unknown_arrival_node_idles_and_redecides() {
        let (mut sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "Lost", "loners", Disposition::Neutral, "sett_well");
        sim.bootstrap(&mut world, 0.0);
        sim.scheduler.post(1.0, npc, EventKind::ArriveNode, EventData::at("no_such_node"));
        sim.tick(&mut world, 1.0);

        // Position unchanged; a make-up decision cycle is queued one
        // minute out.
        assert_eq!(world.get::<GraphPos>(npc).unwrap().node, "sett_well");
        let pending = sim.scheduler.actor_pending(npc);
        assert!(pending
            .iter()
            .any(|e| e.kind == EventKind::DecisionCycle && (e.time - 2.0).abs() < 1e-9));
    }
}

// ── Settlements ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod economy {
    use super::*;

    #[test]
    fn deposit_and_withdraw_move_real_items() {
        let (_sim, mut world) = sim_with_world();
        create_settlement(&mut world, "Camp", "settlement", "sett_well", &[]);
        let npc = spawn_npc(&mut world, "Hauler", "settlers", Disposition::Friendly, "sett_well");
        world.attach(npc, Home { zone: "settlement".into(), node: "sett_well".into() });
        world.get_mut::<Inventory>(npc).unwrap().add("raw_food", 6);

        assert_eq!(deposit_to_stockpile(&mut world, npc, "raw_food", 4), 4);
        assert_eq!(world.get::<Inventory>(npc).unwrap().items.get("raw_food"), Some(&2));

        assert_eq!(withdraw_from_stockpile(&mut world, npc, "raw_food", 10), 4);
        assert_eq!(world.get::<Inventory>(npc).unwrap().items.get("raw_food"), Some(&6));
    }

    #[test]
    fn supply_threshold_drives_need() {
        let (_sim, mut world) = sim_with_world();
        create_settlement(&mut world, "Camp", "settlement", "sett_well", &[("raw_food", 3)]);
        let home = Home { zone: "settlement".into(), node: "sett_well".into() };
        assert!(settlement_needs_supplies(&world, &home));

        let settlement = crate::economy::stockpile_actor_at(&world, "sett_well").unwrap();
        world.get_mut::<Stockpile>(settlement).unwrap().add("raw_food", 20);
        assert!(!settlement_needs_supplies(&world, &home));
    }
}

// ── Communal meals ────────────────────────────────────────────────────────────

#[cfg(test)]
mod meals {
    use super::*;

    #[test]
    fn next_meal_selects_the_coming_slot() {
        assert_eq!(next_meal_time(0.0, false), 360.0);
        assert_eq!(next_meal_time(400.0, false), 1080.0);
        // Past dinner: wrap to tomorrow's breakfast.
        assert_eq!(next_meal_time(1100.0, false), 1800.0);
        // Guards eat 30 minutes late.
        assert_eq!(next_meal_time(0.0, true), 390.0);
    }

    /// Settler with no hunger drain, so the only scheduled traffic is the
    /// bootstrap meal call itself.
    fn calm_settler(world: &mut World, node: &str) -> Actor {
        let npc = spawn_npc(world, "Eater", "settlers", Disposition::Friendly, node);
        world.attach(
            npc,
            Hunger { current: 40.0, maximum: 100.0, rate: 0.0, starve_dps: 0.0 },
        );
        npc
    }

    #[test]
    fn meal_call_routes_to_the_well() {
        let (mut sim, mut world) = sim_with_world();
        let npc = calm_settler(&mut world, "sett_farm");

        // Bootstrap queues the 06:00 call for every settler.
        sim.bootstrap(&mut world, 0.0);
        sim.tick(&mut world, 360.0);

        assert_eq!(world.get::<TravelPlan>(npc).unwrap().destination, "sett_well");
        assert!(sim.scheduler.has_pending(npc, Some(EventKind::CommunalMeal)));
    }

    #[test]
    fn meal_at_the_well_eats_and_chains_the_next_day() {
        let (mut sim, mut world) = sim_with_world();
        create_settlement(&mut world, "The Well", "settlement", "sett_well", &[("raw_food", 5)]);
        let npc = calm_settler(&mut world, "sett_well");
        world.attach(npc, Home { zone: "settlement".into(), node: "sett_well".into() });

        sim.bootstrap(&mut world, 0.0);
        sim.tick(&mut world, 360.0);

        // Ate from the stockpile and queued tomorrow's call.
        assert!(world.get::<Hunger>(npc).unwrap().current > 40.0);
        let meal_pending: Vec<f64> = sim
            .scheduler
            .actor_pending(npc)
            .iter()
            .filter(|e| e.kind == EventKind::CommunalMeal)
            .map(|e| e.time)
            .collect();
        assert_eq!(meal_pending, vec![1080.0]);
    }

    #[test]
    fn non_settlers_ignore_the_call() {
        let (mut sim, mut world) = sim_with_world();
        let npc = spawn_npc(&mut world, "Raider", "raiders", Disposition::Hostile, "sett_farm");

        sim.bootstrap(&mut world, 0.0);
        sim.scheduler.post(360.0, npc, EventKind::CommunalMeal, EventData::default());
        sim.tick(&mut world, 360.0);

        assert!(!world.has::<TravelPlan>(npc));
        assert!(!sim.scheduler.has_pending(npc, Some(EventKind::CommunalMeal)));
    }
}
