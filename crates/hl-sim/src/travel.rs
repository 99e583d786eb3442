//! Route planning and multi-hop travel through the subzone graph.
//!
//! Travel is just a chain of `ARRIVE_NODE` events: `begin_travel` posts the
//! first hop, the arrival handler calls `continue_travel` for each next
//! hop, and the plan detaches itself on completion.  Between hops the actor
//! costs nothing.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use hl_core::Actor;
use hl_graph::{SubzoneGraph, SubzoneNode};
use hl_schedule::{EventData, EventKind, Scheduler};
use hl_world::{GraphPos, TravelPlan, World, WorldMemory};

/// Travel time assumed for a hop whose edge has gone missing.
pub const FALLBACK_EDGE_MIN: f64 = 5.0;

/// How strongly remembered/ambient threat inflates edge costs.
pub const THREAT_WEIGHT: f64 = 5.0;

/// BFS depth limit for [`find_nearest_with`].
pub const MAX_SEARCH_HOPS: usize = 20;

// ── Planning ──────────────────────────────────────────────────────────────────

/// Compute a travel plan from `start` to `goal`.
///
/// Threat-aware routing when the actor's memory is supplied (fresh
/// `threat:<node>` entries inflate edge costs), plain shortest path
/// otherwise.  `start == goal` yields an empty plan; `None` means no path.
pub fn plan_route(
    graph: &SubzoneGraph,
    start: &str,
    goal: &str,
    memory: Option<&WorldMemory>,
    now: f64,
) -> Option<TravelPlan> {
    if start == goal {
        return Some(TravelPlan::new(Vec::new(), goal));
    }

    let path = match memory {
        Some(mem) => graph.threat_aware_path(start, goal, THREAT_WEIGHT, |node_id| {
            mem.recall_fresh(&format!("threat:{node_id}"), now)
                .map_or(0.0, |entry| entry.number("level", 0.0))
        }),
        None => graph.shortest_path(start, goal),
    }?;

    Some(TravelPlan::new(path, goal))
}

// ── Execution ─────────────────────────────────────────────────────────────────

/// Attach `plan` and post the first `ARRIVE_NODE`.
///
/// An empty (already complete) plan attaches nothing and posts nothing.
/// Returns whether travel actually began.
pub fn begin_travel(
    world: &mut World,
    actor: Actor,
    plan: TravelPlan,
    graph: &SubzoneGraph,
    sched: &mut Scheduler,
    now: f64,
) -> bool {
    if plan.complete() {
        return false;
    }
    let Some(pos) = world.get::<GraphPos>(actor) else {
        return false;
    };
    let current = pos.node.clone();
    let Some(next) = plan.next_node().map(str::to_owned) else {
        return false;
    };

    let mut travel_time = graph.travel_time(&current, &next);
    if travel_time.is_infinite() {
        travel_time = FALLBACK_EDGE_MIN;
    }

    sched.post(
        now + travel_time,
        actor,
        EventKind::ArriveNode,
        EventData::travel(&next, &current),
    );
    world.attach(actor, plan);
    true
}

/// Advance the plan after arriving at `arrived`.
///
/// Posts the next `ARRIVE_NODE` and returns `true`, or detaches the
/// completed plan and returns `false`.
pub fn continue_travel(
    world: &mut World,
    actor: Actor,
    arrived: &str,
    graph: &SubzoneGraph,
    sched: &mut Scheduler,
    now: f64,
) -> bool {
    let Some(plan) = world.get_mut::<TravelPlan>(actor) else {
        return false;
    };
    plan.advance();

    let Some(next) = plan.next_node().map(str::to_owned) else {
        world.detach::<TravelPlan>(actor);
        return false;
    };

    let mut travel_time = graph.travel_time(arrived, &next);
    if travel_time.is_infinite() {
        travel_time = FALLBACK_EDGE_MIN;
    }

    sched.post(
        now + travel_time,
        actor,
        EventKind::ArriveNode,
        EventData::travel(&next, arrived),
    );
    true
}

// ── Search ────────────────────────────────────────────────────────────────────

/// Breadth-first search for the nearest node matching `predicate`,
/// including `start` itself.  Returns the node id, or `None` within
/// `max_hops`.
pub fn find_nearest_with(
    graph: &SubzoneGraph,
    start: &str,
    predicate: impl Fn(&SubzoneNode) -> bool,
    max_hops: usize,
) -> Option<String> {
    let start_node = graph.node(start)?;
    if predicate(start_node) {
        return Some(start.to_owned());
    }

    let mut visited: FxHashSet<String> = FxHashSet::default();
    visited.insert(start.to_owned());
    let mut queue: VecDeque<(String, usize)> = VecDeque::new();
    queue.push_back((start.to_owned(), 0));

    while let Some((current, depth)) = queue.pop_front() {
        if depth >= max_hops {
            continue;
        }
        let Some(node) = graph.node(&current) else {
            continue;
        };
        for neighbor in node.connections.keys() {
            if !visited.insert(neighbor.clone()) {
                continue;
            }
            if let Some(nnode) = graph.node(neighbor) {
                if predicate(nnode) {
                    return Some(neighbor.clone());
                }
            }
            queue.push_back((neighbor.clone(), depth + 1));
        }
    }

    None
}
