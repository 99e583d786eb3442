//! `Scheduler` — time-ordered priority queue of future events.
//!
//! # Why this exists
//!
//! Most graph-resident actors are idle most of the time (walking a route,
//! sleeping, working).  Scanning all N actors every frame would cost O(N)
//! regardless of how many have anything to do.  The scheduler inverts the
//! problem: each actor posts its next meaningful state change and costs
//! nothing until that time arrives.
//!
//! # Soft cancellation
//!
//! `BinaryHeap` cannot remove interior entries, so the heap holds only
//! `(time, seq)` keys while events live in a side table.  Cancelling flips
//! a flag in the table; the stale key is discarded when it surfaces.  The
//! per-actor pending index is therefore the authoritative answer to "does
//! this actor have a pending X?" — never the heap.
//!
//! # Ordering
//!
//! Strict `(time, seq)` order, `seq` monotonic per scheduler: ties dispatch
//! FIFO.  An event posted during a drain with `time <= now` surfaces in the
//! same drain, after anything already due before it.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use rustc_hash::FxHashMap;

use hl_core::Actor;

use crate::event::{EventData, EventKind, EventRecord};

// ── ScheduledEvent ────────────────────────────────────────────────────────────

/// A single entry in the scheduler queue.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduledEvent {
    /// Absolute game-minute this event fires.
    pub time: f64,
    /// Insertion tie-breaker, monotonic per scheduler.
    pub seq: u64,
    pub actor: Actor,
    pub kind: EventKind,
    pub data: EventData,
    pub cancelled: bool,
}

// ── Heap key ──────────────────────────────────────────────────────────────────

/// Lexicographic `(time, seq)` key.  `f64::total_cmp` keeps the ordering
/// total even for pathological times.
struct HeapKey {
    time: f64,
    seq: u64,
}

impl PartialEq for HeapKey {
    fn eq(&self, other: &Self) -> bool {
        self.time.total_cmp(&other.time) == Ordering::Equal && self.seq == other.seq
    }
}

impl Eq for HeapKey {}

impl PartialOrd for HeapKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

// ── Scheduler ─────────────────────────────────────────────────────────────────

/// Priority-queue event scheduler for the off-screen world.  One per world.
#[derive(Default)]
pub struct Scheduler {
    heap: BinaryHeap<Reverse<HeapKey>>,
    /// All live entries keyed by `seq`.  Entries leave this table when
    /// their heap key surfaces (dispatch or cancelled-skip).
    events: FxHashMap<u64, ScheduledEvent>,
    /// Per-actor pending index (authoritative for queries).
    by_actor: FxHashMap<Actor, Vec<u64>>,
    next_seq: u64,
    /// Running count of dispatched events, for diagnostics.
    pub events_processed: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Posting ───────────────────────────────────────────────────────────

    /// Schedule an event at absolute game-minute `time`.  Returns its
    /// `seq` handle.
    pub fn post(&mut self, time: f64, actor: Actor, kind: EventKind, data: EventData) -> u64 {
        self.next_seq += 1;
        let seq = self.next_seq;
        self.events.insert(
            seq,
            ScheduledEvent { time, seq, actor, kind, data, cancelled: false },
        );
        self.heap.push(Reverse(HeapKey { time, seq }));
        self.by_actor.entry(actor).or_default().push(seq);
        seq
    }

    /// Schedule an event `delta` game-minutes after `now`.
    pub fn post_delta(
        &mut self,
        now: f64,
        delta: f64,
        actor: Actor,
        kind: EventKind,
        data: EventData,
    ) -> u64 {
        self.post(now + delta, actor, kind, data)
    }

    // ── Cancellation ──────────────────────────────────────────────────────

    /// Cancel every pending event for `actor`.  Returns the count newly
    /// cancelled.  O(pending for actor); the heap is untouched.
    pub fn cancel_actor(&mut self, actor: Actor) -> usize {
        let seqs = self.by_actor.remove(&actor).unwrap_or_default();
        let mut count = 0;
        for seq in seqs {
            if let Some(evt) = self.events.get_mut(&seq) {
                if !evt.cancelled {
                    evt.cancelled = true;
                    count += 1;
                }
            }
        }
        count
    }

    /// Cancel pending events of one kind for `actor`.
    pub fn cancel_actor_kind(&mut self, actor: Actor, kind: EventKind) -> usize {
        let Some(seqs) = self.by_actor.get(&actor) else {
            return 0;
        };
        let mut count = 0;
        for &seq in seqs {
            if let Some(evt) = self.events.get_mut(&seq) {
                if !evt.cancelled && evt.kind == kind {
                    evt.cancelled = true;
                    count += 1;
                }
            }
        }
        count
    }

    // ── Draining ──────────────────────────────────────────────────────────

    /// Time of the next live event, or `+∞` when the queue is empty.
    /// Cancelled heads are peeled off as a side effect.
    pub fn peek_time(&mut self) -> f64 {
        self.skip_cancelled_heads();
        match self.heap.peek() {
            Some(Reverse(key)) => key.time,
            None => f64::INFINITY,
        }
    }

    /// Pop the earliest live event with `time <= now`, or `None`.
    ///
    /// The returned event is removed from the side table and the actor's
    /// pending index — the caller owns dispatch from here.
    pub fn pop_due(&mut self, now: f64) -> Option<ScheduledEvent> {
        self.skip_cancelled_heads();
        let head_time = self.heap.peek().map(|Reverse(k)| k.time)?;
        if head_time > now {
            return None;
        }
        let Reverse(key) = self.heap.pop()?;
        let evt = self.events.remove(&key.seq)?;
        self.unindex(evt.actor, key.seq);
        Some(evt)
    }

    fn skip_cancelled_heads(&mut self) {
        while let Some(Reverse(key)) = self.heap.peek() {
            let live = self
                .events
                .get(&key.seq)
                .is_some_and(|e| !e.cancelled);
            if live {
                return;
            }
            let seq = key.seq;
            self.heap.pop();
            if let Some(evt) = self.events.remove(&seq) {
                self.unindex(evt.actor, seq);
            }
        }
    }

    fn unindex(&mut self, actor: Actor, seq: u64) {
        if let Some(seqs) = self.by_actor.get_mut(&actor) {
            seqs.retain(|&s| s != seq);
            if seqs.is_empty() {
                self.by_actor.remove(&actor);
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// Number of live (non-cancelled) events in the queue.
    pub fn pending_count(&self) -> usize {
        self.events.values().filter(|e| !e.cancelled).count()
    }

    /// Live pending events for an actor, in posting order.
    pub fn actor_pending(&self, actor: Actor) -> Vec<&ScheduledEvent> {
        self.by_actor
            .get(&actor)
            .map(|seqs| {
                seqs.iter()
                    .filter_map(|seq| self.events.get(seq))
                    .filter(|e| !e.cancelled)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Does `actor` have any live pending event (optionally of `kind`)?
    pub fn has_pending(&self, actor: Actor, kind: Option<EventKind>) -> bool {
        self.actor_pending(actor)
            .iter()
            .any(|e| kind.is_none_or(|k| e.kind == k))
    }

    // ── Persistence ───────────────────────────────────────────────────────

    /// Live events in posting order, for save files.
    pub fn to_list(&self) -> Vec<EventRecord> {
        let mut live: Vec<&ScheduledEvent> =
            self.events.values().filter(|e| !e.cancelled).collect();
        live.sort_unstable_by_key(|e| e.seq);
        live.into_iter()
            .map(|e| EventRecord {
                time: e.time,
                actor: e.actor,
                kind: e.kind,
                data: e.data.clone(),
            })
            .collect()
    }

    /// Restore events from a save file.  `seq` values are re-assigned in
    /// list order, preserving the original dispatch order within each time
    /// bucket.
    pub fn load_list(&mut self, records: Vec<EventRecord>) {
        for record in records {
            self.post(record.time, record.actor, record.kind, record.data);
        }
    }
}
