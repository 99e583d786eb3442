//! Simulation time model.
//!
//! # Design
//!
//! Two time bases coexist:
//!
//! - The **game clock** accumulates real `dt` in game-seconds.  It is the
//!   single source of truth for grace periods and sensor throttling, and is
//!   advanced once per frame by the game loop.
//! - The **scheduler** orders events in game-minutes (`f64`).  Off-screen
//!   travel times, memory TTLs, and rest durations are all expressed in
//!   minutes.
//!
//! `GameClock::minutes()` is the only sanctioned conversion point between
//! the two; scattered `* 60.0` factors are how unit bugs happen.

use serde::{Deserialize, Serialize};

/// Game-seconds per game-minute.
pub const SECS_PER_MIN: f64 = 60.0;

/// Game-minutes in a full day/night cycle.
pub const DAY_LENGTH_MIN: f64 = 1440.0;

/// Convert game-seconds to game-minutes.
#[inline]
pub fn secs_to_min(secs: f64) -> f64 {
    secs / SECS_PER_MIN
}

/// Convert game-minutes to game-seconds.
#[inline]
pub fn min_to_secs(min: f64) -> f64 {
    min * SECS_PER_MIN
}

// ── GameClock ─────────────────────────────────────────────────────────────────

/// Monotonic game time — accumulated `dt` since session start, in seconds.
///
/// Stored as a world resource.  Updated once per frame by the game loop;
/// everything else reads it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GameClock {
    /// Accumulated game-seconds since session start.
    pub seconds: f64,
}

impl GameClock {
    pub fn new() -> Self {
        Self { seconds: 0.0 }
    }

    /// Advance the clock by `dt` game-seconds.
    #[inline]
    pub fn advance(&mut self, dt: f64) {
        self.seconds += dt;
    }

    /// Current game time in game-minutes (the scheduler's time base).
    #[inline]
    pub fn minutes(&self) -> f64 {
        secs_to_min(self.seconds)
    }

    /// Minutes elapsed since the start of the current day.
    #[inline]
    pub fn minute_of_day(&self) -> f64 {
        self.minutes() % DAY_LENGTH_MIN
    }
}
