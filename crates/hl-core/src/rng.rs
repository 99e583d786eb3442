//! Deterministic RNG streams.
//!
//! # Two streams, on purpose
//!
//! The simulation draws randomness from exactly two places:
//!
//! - [`SimRng`] — one seeded `SmallRng` per world, consumed by decision
//!   rolls, combat variance, and flee checks.
//! - [`perception_roll`] — a stateless hash of `(actor, node, minute)` used
//!   by the checkpoint's adjacent-node detection.
//!
//! Keeping perception off the main stream means a test seeded for a combat
//! outcome stays stable no matter how many visibility rolls happen on the
//! way there.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::Actor;

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

// ── SimRng ────────────────────────────────────────────────────────────────────

/// World-level deterministic RNG.
///
/// One instance per world.  All simulation decisions that need randomness
/// draw from this single stream, in dispatch order, so a fixed seed plus a
/// fixed event sequence reproduces a run.
pub struct SimRng(SmallRng);

impl SimRng {
    pub fn new(seed: u64) -> Self {
        SimRng(SmallRng::seed_from_u64(seed))
    }

    /// Expose the inner `SmallRng` for use with `rand` distribution types.
    #[inline]
    pub fn inner(&mut self) -> &mut SmallRng {
        &mut self.0
    }

    /// Generate a value uniformly in `range`.
    #[inline]
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.0.gen_range(range)
    }

    /// `true` with probability `p` (clamped to [0, 1]).
    #[inline]
    pub fn gen_bool(&mut self, p: f64) -> bool {
        self.0.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Choose a random element from a slice.  Returns `None` if empty.
    #[inline]
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        use rand::seq::SliceRandom;
        slice.choose(&mut self.0)
    }
}

// ── Perception hash stream ────────────────────────────────────────────────────

/// Deterministic detection roll in `[0, 1)` for adjacent-node awareness.
///
/// Hashes `(actor, neighbor id, whole game-minute)` with a splitmix-style
/// finalizer, so the same actor looking at the same neighbor within the same
/// minute always rolls the same value — and never consumes [`SimRng`] state.
pub fn perception_roll(actor: Actor, neighbor: &str, now_min: f64) -> f64 {
    let mut h = actor.0 ^ MIXING_CONSTANT;
    for b in neighbor.bytes() {
        h = (h ^ b as u64).wrapping_mul(0x100_0000_01b3);
    }
    h ^= (now_min.floor() as i64) as u64;
    // splitmix64 finalizer
    h = (h ^ (h >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    h = (h ^ (h >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    h ^= h >> 31;
    (h >> 11) as f64 / (1u64 << 53) as f64
}
