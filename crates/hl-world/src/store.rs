//! The `World` component store.
//!
//! # Design
//!
//! Each component type `T` is stored as an `FxHashMap<Actor, T>` behind a
//! `Box<dyn AnyStore>` in a map keyed by `TypeId`.  Attach, detach, and get
//! are O(1); tuple queries iterate the smallest participating bucket and
//! membership-test the rest.
//!
//! Killing an actor tombstones it: reads return `None` immediately, storage
//! is reclaimed later by [`World::purge`].  Ids are monotonic and never
//! reused, so a stale `Actor` held by a scheduled event can always be
//! rejected by [`World::alive`].
//!
//! # Zone index
//!
//! Tile-resident actors are additionally indexed by zone name so spatial
//! queries cost O(|zone|), not O(|world|).  The index is maintained
//! explicitly by the LOD engine through [`World::zone_add`],
//! [`World::zone_set`], and [`World::zone_remove`] when `TilePos` is
//! attached, moved across zones, or detached.
//!
//! # Determinism
//!
//! `all_of`, `query`, and `zone_entities` return results sorted by actor id.
//! Hash-map iteration order must never leak into simulation behavior.

use std::any::{Any, TypeId};

use rustc_hash::{FxHashMap, FxHashSet};

use hl_core::Actor;

use crate::components::TilePos;

// ── Component trait ───────────────────────────────────────────────────────────

/// Marker for types storable as per-actor components.
///
/// Blanket-implemented; any `Send + Sync + 'static` type qualifies.
pub trait Component: Send + Sync + 'static {}
impl<T: Send + Sync + 'static> Component for T {}

// ── Type-erased store ─────────────────────────────────────────────────────────

trait AnyStore: Send + Sync {
    fn len(&self) -> usize;
    fn actors(&self) -> Vec<Actor>;
    fn purge(&mut self, dead: &FxHashSet<Actor>);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct TypedStore<T: Component>(FxHashMap<Actor, T>);

impl<T: Component> AnyStore for TypedStore<T> {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn actors(&self) -> Vec<Actor> {
        self.0.keys().copied().collect()
    }

    fn purge(&mut self, dead: &FxHashSet<Actor>) {
        for actor in dead {
            self.0.remove(actor);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ── ComponentSet (tuple queries) ──────────────────────────────────────────────

/// A tuple of component types fetched together by [`World::query`].
///
/// Implemented for 1- to 4-tuples.  `candidate_actors` returns the keys of
/// the smallest participating bucket, which drives the iteration.
pub trait ComponentSet<'w>: Sized {
    type Refs;

    /// Fetch all components for `actor`, or `None` if any is missing.
    fn fetch(world: &'w World, actor: Actor) -> Option<Self::Refs>;

    /// Keys of the smallest participating store.
    fn candidate_actors(world: &'w World) -> Vec<Actor>;
}

macro_rules! impl_component_set {
    ($($t:ident),+) => {
        impl<'w, $($t: Component),+> ComponentSet<'w> for ($($t,)+) {
            type Refs = ($(&'w $t,)+);

            fn fetch(world: &'w World, actor: Actor) -> Option<Self::Refs> {
                Some(($(world.raw_get::<$t>(actor)?,)+))
            }

            fn candidate_actors(world: &'w World) -> Vec<Actor> {
                let mut best: Option<(usize, TypeId)> = None;
                $(
                    let len = world.store_len::<$t>();
                    if best.map_or(true, |(l, _)| len < l) {
                        best = Some((len, TypeId::of::<$t>()));
                    }
                )+
                match best {
                    Some((_, tid)) => world.store_actors_by_id(tid),
                    None => Vec::new(),
                }
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);

// ── World ─────────────────────────────────────────────────────────────────────

/// The entity/component store.  One per running game.
#[derive(Default)]
pub struct World {
    next_id: u64,
    stores: FxHashMap<TypeId, Box<dyn AnyStore>>,
    dead: FxHashSet<Actor>,
    zone_index: FxHashMap<String, FxHashSet<Actor>>,
    resources: FxHashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Actor lifecycle ───────────────────────────────────────────────────

    /// Allocate a fresh actor id.  Ids start at 1 and are never reused.
    pub fn spawn(&mut self) -> Actor {
        self.next_id += 1;
        Actor(self.next_id)
    }

    /// Register an externally chosen id (save-file restore).  Bumps the id
    /// counter past it so later spawns cannot collide.
    pub fn spawn_at(&mut self, actor: Actor) {
        self.next_id = self.next_id.max(actor.0);
    }

    /// Mark an actor dead.  Subsequent reads return nothing; storage is
    /// reclaimed by [`purge`](Self::purge).
    pub fn kill(&mut self, actor: Actor) {
        self.dead.insert(actor);
    }

    pub fn alive(&self, actor: Actor) -> bool {
        actor != Actor::INVALID && !self.dead.contains(&actor)
    }

    /// Reclaim storage for dead actors and prune the zone index.
    pub fn purge(&mut self) {
        for store in self.stores.values_mut() {
            store.purge(&self.dead);
        }
        for actors in self.zone_index.values_mut() {
            for actor in &self.dead {
                actors.remove(actor);
            }
        }
        self.dead.clear();
    }

    // ── Components ────────────────────────────────────────────────────────

    /// Attach a component.  No-op for dead actors.
    pub fn attach<T: Component>(&mut self, actor: Actor, component: T) {
        if self.dead.contains(&actor) {
            return;
        }
        let store = self
            .stores
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(TypedStore::<T>(FxHashMap::default())));
        if let Some(typed) = store.as_any_mut().downcast_mut::<TypedStore<T>>() {
            typed.0.insert(actor, component);
        }
    }

    /// Detach and return a component, or `None` if absent.
    pub fn detach<T: Component>(&mut self, actor: Actor) -> Option<T> {
        self.stores
            .get_mut(&TypeId::of::<T>())?
            .as_any_mut()
            .downcast_mut::<TypedStore<T>>()?
            .0
            .remove(&actor)
    }

    /// Read a component.  `None` for unknown actors, dead actors, or a
    /// missing component — never an error.
    pub fn get<T: Component>(&self, actor: Actor) -> Option<&T> {
        if self.dead.contains(&actor) {
            return None;
        }
        self.raw_get(actor)
    }

    pub fn get_mut<T: Component>(&mut self, actor: Actor) -> Option<&mut T> {
        if self.dead.contains(&actor) {
            return None;
        }
        self.stores
            .get_mut(&TypeId::of::<T>())?
            .as_any_mut()
            .downcast_mut::<TypedStore<T>>()?
            .0
            .get_mut(&actor)
    }

    pub fn has<T: Component>(&self, actor: Actor) -> bool {
        self.get::<T>(actor).is_some()
    }

    /// `(actor, component)` for every living actor with `T`, sorted by id.
    pub fn all_of<T: Component>(&self) -> Vec<(Actor, &T)> {
        let mut out: Vec<(Actor, &T)> = match self.typed_store::<T>() {
            None => return Vec::new(),
            Some(store) => store
                .0
                .iter()
                .filter(|(a, _)| !self.dead.contains(a))
                .map(|(&a, c)| (a, c))
                .collect(),
        };
        out.sort_unstable_by_key(|(a, _)| *a);
        out
    }

    pub fn count<T: Component>(&self) -> usize {
        self.all_of::<T>().len()
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// Actors possessing every component in `Q`, with references, sorted by
    /// id.  Iterates the smallest participating bucket.
    pub fn query<'w, Q: ComponentSet<'w>>(&'w self) -> Vec<(Actor, Q::Refs)> {
        let mut actors = Q::candidate_actors(self);
        actors.sort_unstable();
        actors
            .into_iter()
            .filter(|a| !self.dead.contains(a))
            .filter_map(|a| Q::fetch(self, a).map(|refs| (a, refs)))
            .collect()
    }

    /// First match of [`query`](Self::query), or `None`.
    pub fn query_one<'w, Q: ComponentSet<'w>>(&'w self) -> Option<(Actor, Q::Refs)> {
        self.query::<Q>().into_iter().next()
    }

    // ── Zone index ────────────────────────────────────────────────────────

    /// Register `actor` in the zone index for `zone`.
    pub fn zone_add(&mut self, actor: Actor, zone: &str) {
        self.zone_index
            .entry(zone.to_owned())
            .or_default()
            .insert(actor);
    }

    /// Move `actor` from its current zone to `new_zone` in the index.
    pub fn zone_set(&mut self, actor: Actor, new_zone: &str) {
        for actors in self.zone_index.values_mut() {
            actors.remove(&actor);
        }
        self.zone_add(actor, new_zone);
    }

    /// Drop `actor` from the zone index entirely (tile position detached).
    pub fn zone_remove(&mut self, actor: Actor) {
        for actors in self.zone_index.values_mut() {
            actors.remove(&actor);
        }
    }

    /// Living actors registered in `zone`, sorted by id.
    pub fn zone_entities(&self, zone: &str) -> Vec<Actor> {
        let mut out: Vec<Actor> = match self.zone_index.get(zone) {
            None => return Vec::new(),
            Some(actors) => actors
                .iter()
                .copied()
                .filter(|a| !self.dead.contains(a))
                .collect(),
        };
        out.sort_unstable();
        out
    }

    /// Zone-filtered [`query`](Self::query): only actors registered in
    /// `zone` are examined.
    pub fn query_zone<'w, Q: ComponentSet<'w>>(&'w self, zone: &str) -> Vec<(Actor, Q::Refs)> {
        self.zone_entities(zone)
            .into_iter()
            .filter_map(|a| Q::fetch(self, a).map(|refs| (a, refs)))
            .collect()
    }

    /// Actors in `zone` within `radius` tiles of `(x, y)` that have every
    /// component in `Q`.  The trailing `f64` is the squared distance, so
    /// callers can sort or compare without a square root.
    pub fn nearby<'w, Q: ComponentSet<'w>>(
        &'w self,
        zone: &str,
        x: f64,
        y: f64,
        radius: f64,
    ) -> Vec<(Actor, Q::Refs, f64)> {
        let r_sq = radius * radius;
        self.zone_entities(zone)
            .into_iter()
            .filter_map(|a| {
                let pos = self.raw_get::<TilePos>(a)?;
                let dx = pos.x - x;
                let dy = pos.y - y;
                let d_sq = dx * dx + dy * dy;
                if d_sq > r_sq {
                    return None;
                }
                Q::fetch(self, a).map(|refs| (a, refs, d_sq))
            })
            .collect()
    }

    // ── Resources (singletons, not tied to actors) ────────────────────────

    pub fn set_res<T: Send + Sync + 'static>(&mut self, resource: T) {
        self.resources.insert(TypeId::of::<T>(), Box::new(resource));
    }

    pub fn res<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.resources
            .get(&TypeId::of::<T>())
            .and_then(|b| b.downcast_ref::<T>())
    }

    pub fn res_mut<T: Send + Sync + 'static>(&mut self) -> Option<&mut T> {
        self.resources
            .get_mut(&TypeId::of::<T>())
            .and_then(|b| b.downcast_mut::<T>())
    }

    // ── Internals shared with ComponentSet impls ──────────────────────────

    fn typed_store<T: Component>(&self) -> Option<&TypedStore<T>> {
        self.stores
            .get(&TypeId::of::<T>())?
            .as_any()
            .downcast_ref::<TypedStore<T>>()
    }

    /// Component read without the dead check (callers filter first).
    pub(crate) fn raw_get<T: Component>(&self, actor: Actor) -> Option<&T> {
        self.typed_store::<T>()?.0.get(&actor)
    }

    pub(crate) fn store_len<T: Component>(&self) -> usize {
        self.stores
            .get(&TypeId::of::<T>())
            .map_or(0, |s| s.len())
    }

    pub(crate) fn store_actors_by_id(&self, tid: TypeId) -> Vec<Actor> {
        // Used only to seed candidate lists; dead filtering happens later.
        self.stores.get(&tid).map_or_else(Vec::new, |s| s.actors())
    }
}
