//! `ItemRegistry` — item id → metadata lookup table.
//!
//! Stored as a world resource.  Combat reads weapon `damage`/`cooldown`;
//! eating reads `food_value`/`heal`.  Numeric stats live in a flat map so
//! new item fields never require schema changes here.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Full metadata for one item id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemDef {
    pub name: String,
    /// Type string: `"weapon"`, `"consumable"`, `"armor"`, `"misc"`, …
    pub kind: String,
    /// Numeric stats: `damage`, `cooldown`, `food_value`, `heal`, …
    pub stats: BTreeMap<String, f64>,
}

impl ItemDef {
    /// Set a numeric stat, fluently.
    pub fn stat(&mut self, key: &str, value: f64) -> &mut Self {
        self.stats.insert(key.to_owned(), value);
        self
    }
}

// ── ItemRegistry ──────────────────────────────────────────────────────────────

/// Lookup table mapping item ids to [`ItemDef`]s.  World resource.
#[derive(Clone, Debug, Default)]
pub struct ItemRegistry {
    entries: FxHashMap<String, ItemDef>,
}

impl ItemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an item and return its definition for fluent stat setup:
    ///
    /// ```
    /// # use hl_world::ItemRegistry;
    /// let mut reg = ItemRegistry::new();
    /// reg.register("canned_beans", "Canned Beans", "consumable")
    ///     .stat("food_value", 25.0);
    /// assert_eq!(reg.field("canned_beans", "food_value", 0.0), 25.0);
    /// ```
    pub fn register(&mut self, item_id: &str, name: &str, kind: &str) -> &mut ItemDef {
        let def = self.entries.entry(item_id.to_owned()).or_default();
        def.name = name.to_owned();
        def.kind = kind.to_owned();
        def
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.entries.contains_key(item_id)
    }

    /// Numeric stat accessor; `default` when the item or stat is missing.
    pub fn field(&self, item_id: &str, key: &str, default: f64) -> f64 {
        self.entries
            .get(item_id)
            .and_then(|def| def.stats.get(key).copied())
            .unwrap_or(default)
    }

    /// Item type string (`"misc"` when unregistered).
    pub fn item_type<'a>(&'a self, item_id: &str) -> &'a str {
        self.entries.get(item_id).map_or("misc", |d| d.kind.as_str())
    }

    /// Human-readable name, falling back to the id itself.
    pub fn display_name<'a>(&'a self, item_id: &'a str) -> &'a str {
        self.entries.get(item_id).map_or(item_id, |d| d.name.as_str())
    }
}
