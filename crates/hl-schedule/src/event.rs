//! Event kinds and payloads.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use hl_core::Actor;

// ── EventKind ─────────────────────────────────────────────────────────────────

/// Every event kind the off-screen simulation dispatches.
///
/// The wire names (`"ARRIVE_NODE"`, …) are stable — they appear in save
/// files — so variants serialize in screaming-snake form.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// Actor reached a subzone node on its travel path.
    ArriveNode,
    /// Hunger crossed the critical threshold.
    HungerCritical,
    /// Finished rummaging a container.
    FinishSearch,
    /// Finished a work task (farming, crafting).
    FinishWork,
    /// Finished an eating pause.
    FinishEat,
    /// Finished resting; heal proportional to duration.
    RestComplete,
    /// Run the decision priority stack.
    DecisionCycle,
    /// Deferred post-combat cleanup.
    CombatResolved,
    /// Communal mealtime call.
    CommunalMeal,
}

impl EventKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            EventKind::ArriveNode => "ARRIVE_NODE",
            EventKind::HungerCritical => "HUNGER_CRITICAL",
            EventKind::FinishSearch => "FINISH_SEARCH",
            EventKind::FinishWork => "FINISH_WORK",
            EventKind::FinishEat => "FINISH_EAT",
            EventKind::RestComplete => "REST_COMPLETE",
            EventKind::DecisionCycle => "DECISION_CYCLE",
            EventKind::CombatResolved => "COMBAT_RESOLVED",
            EventKind::CommunalMeal => "COMMUNAL_MEAL",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ARRIVE_NODE" => Ok(EventKind::ArriveNode),
            "HUNGER_CRITICAL" => Ok(EventKind::HungerCritical),
            "FINISH_SEARCH" => Ok(EventKind::FinishSearch),
            "FINISH_WORK" => Ok(EventKind::FinishWork),
            "FINISH_EAT" => Ok(EventKind::FinishEat),
            "REST_COMPLETE" => Ok(EventKind::RestComplete),
            "DECISION_CYCLE" => Ok(EventKind::DecisionCycle),
            "COMBAT_RESOLVED" => Ok(EventKind::CombatResolved),
            "COMMUNAL_MEAL" => Ok(EventKind::CommunalMeal),
            _ => Err(()),
        }
    }
}

// ── EventData ─────────────────────────────────────────────────────────────────

/// Typed event payload.  Every field is optional; handlers read what they
/// expect and skip gracefully when it is missing (a malformed payload must
/// never halt the simulation).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    /// Subzone node the event concerns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    /// Node travelled from (arrivals).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Container actor being searched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<Actor>,
    /// Work job name (`"farming"`, `"crafting"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<String>,
    /// Farming yield count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yield_count: Option<u32>,
    /// Crafting output item id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    /// Rest duration in game-minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Why the event was posted (`"hunger"`, `"supply"`, …).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Multi-step event phase (`"eat"` for communal meals).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}

impl EventData {
    /// Payload with just a node — the most common shape.
    pub fn at(node: &str) -> Self {
        Self { node: Some(node.to_owned()), ..Self::default() }
    }

    /// Arrival payload: destination plus the node travelled from.
    pub fn travel(node: &str, from: &str) -> Self {
        Self {
            node: Some(node.to_owned()),
            from: Some(from.to_owned()),
            ..Self::default()
        }
    }
}

// ── EventRecord ───────────────────────────────────────────────────────────────

/// Persistence form of a pending event (save files).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub time: f64,
    pub actor: Actor,
    pub kind: EventKind,
    #[serde(default)]
    pub data: EventData,
}
