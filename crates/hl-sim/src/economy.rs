//! Settlement economy — shared stockpiles and container placement.
//!
//! Farmers grow food into the settlement stockpile, everyone eats out of
//! it, and scavengers head out when it runs low.  Stockpiles, containers,
//! and corpses are real shared actors: what one actor takes is gone for
//! everyone.

use hl_core::Actor;
use hl_graph::SubzoneGraph;
use hl_world::{
    ActorKind, GraphPos, Home, Identity, Inventory, Stockpile, World,
};

/// A settlement wants resupply below this many stockpiled items.
pub const SUPPLY_THRESHOLD: u32 = 10;

// ── Creation ──────────────────────────────────────────────────────────────────

/// Create a settlement actor with a stockpile at `node`.
///
/// The settlement represents the communal resources of a village or camp;
/// residents reference it through their `Home` component.
pub fn create_settlement(
    world: &mut World,
    name: &str,
    zone: &str,
    node: &str,
    initial_items: &[(&str, u32)],
) -> Actor {
    let actor = world.spawn();
    world.attach(actor, Identity::new(name, ActorKind::Settlement));
    world.attach(actor, GraphPos { zone: zone.to_owned(), node: node.to_owned() });
    let mut stockpile = Stockpile::default();
    for &(item, count) in initial_items {
        stockpile.add(item, count);
    }
    world.attach(actor, stockpile);
    tracing::info!(target: "sim::economy", actor = actor.0, node, "created settlement '{name}'");
    actor
}

/// Spawn a container actor at `node_id` and register it on the graph node.
///
/// Returns `None` when the node does not exist.
pub fn place_container(
    world: &mut World,
    graph: &mut SubzoneGraph,
    node_id: &str,
    name: &str,
    items: &[(&str, u32)],
) -> Option<Actor> {
    let zone = graph.node(node_id)?.zone.clone();
    let actor = world.spawn();
    world.attach(actor, Identity::new(name, ActorKind::Container));
    world.attach(actor, GraphPos { zone, node: node_id.to_owned() });
    world.attach(
        actor,
        Inventory::with_items(items.iter().map(|&(id, n)| (id.to_owned(), n))),
    );
    graph.node_mut(node_id)?.container_actors.push(actor);
    Some(actor)
}

// ── Lookup ────────────────────────────────────────────────────────────────────

/// The settlement actor holding a stockpile at `node`, if any.
pub fn stockpile_actor_at(world: &World, node: &str) -> Option<Actor> {
    world
        .all_of::<Stockpile>()
        .into_iter()
        .find(|(actor, _)| {
            world
                .get::<GraphPos>(*actor)
                .is_some_and(|pos| pos.node == node)
        })
        .map(|(actor, _)| actor)
}

/// Fallback lookup: the first stockpile anywhere in `zone`.
pub fn stockpile_actor_in_zone(world: &World, zone: &str) -> Option<Actor> {
    world
        .all_of::<Stockpile>()
        .into_iter()
        .find(|(actor, _)| {
            world
                .get::<GraphPos>(*actor)
                .is_some_and(|pos| pos.zone == zone)
        })
        .map(|(actor, _)| actor)
}

/// `true` when the settlement backing `home` is short on supplies.
pub fn settlement_needs_supplies(world: &World, home: &Home) -> bool {
    if home.node.is_empty() {
        return false;
    }
    let settlement = stockpile_actor_at(world, &home.node)
        .or_else(|| stockpile_actor_in_zone(world, &home.zone));
    settlement
        .and_then(|actor| world.get::<Stockpile>(actor))
        .is_some_and(|sp| sp.total_count() < SUPPLY_THRESHOLD)
}

// ── Transfers ─────────────────────────────────────────────────────────────────

/// Add items to the stockpile serving `node_id` (same node, else same
/// zone).  Returns the amount deposited.
pub fn add_to_stockpile(
    world: &mut World,
    graph: &SubzoneGraph,
    node_id: &str,
    item_id: &str,
    count: u32,
) -> u32 {
    let settlement = stockpile_actor_at(world, node_id).or_else(|| {
        let zone = graph.node(node_id).map(|n| n.zone.clone())?;
        stockpile_actor_in_zone(world, &zone)
    });
    let Some(settlement) = settlement else {
        return 0;
    };
    world
        .get_mut::<Stockpile>(settlement)
        .map_or(0, |sp| sp.add(item_id, count))
}

/// An actor deposits from its inventory into its home stockpile.  Returns
/// the amount actually moved.
pub fn deposit_to_stockpile(world: &mut World, actor: Actor, item_id: &str, count: u32) -> u32 {
    let Some(home_node) = world.get::<Home>(actor).map(|h| h.node.clone()) else {
        return 0;
    };
    let Some(settlement) = stockpile_actor_at(world, &home_node) else {
        return 0;
    };
    let taken = world
        .get_mut::<Inventory>(actor)
        .map_or(0, |inv| inv.remove(item_id, count));
    if taken > 0 {
        if let Some(sp) = world.get_mut::<Stockpile>(settlement) {
            sp.add(item_id, taken);
        }
    }
    taken
}

/// An actor withdraws from its home stockpile into its inventory.  Returns
/// the amount actually moved.
pub fn withdraw_from_stockpile(world: &mut World, actor: Actor, item_id: &str, count: u32) -> u32 {
    let Some(home_node) = world.get::<Home>(actor).map(|h| h.node.clone()) else {
        return 0;
    };
    let Some(settlement) = stockpile_actor_at(world, &home_node) else {
        return 0;
    };
    if !world.has::<Inventory>(actor) {
        return 0;
    }
    let taken = world
        .get_mut::<Stockpile>(settlement)
        .map_or(0, |sp| sp.remove(item_id, count));
    if taken > 0 {
        if let Some(inv) = world.get_mut::<Inventory>(actor) {
            inv.add(item_id, taken);
        }
    }
    taken
}
