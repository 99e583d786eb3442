//! Loot tables — weighted, pooled loot generation.
//!
//! A table holds pools; a pool rolls one weighted entry `rolls` times (plus
//! an occasional bonus roll) and each entry yields a uniform count in
//! `[min_count, max_count]`.  Tables are declared in TOML:
//!
//! ```toml
//! [tables.basic_chest]
//! description = "Street-level container"
//!
//! [[tables.basic_chest.pools]]
//! rolls = 2
//! bonus_rolls = 0.25
//! entries = [
//!     { item = "canned_beans", weight = 3.0, min_count = 1, max_count = 2 },
//!     { item = "bandages",     weight = 1.0 },
//! ]
//! ```

use rustc_hash::FxHashMap;
use serde::Deserialize;

use hl_core::{HlError, HlResult, SimRng};

// ── Table model ───────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Deserialize)]
pub struct LootEntry {
    pub item: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "default_count")]
    pub min_count: u32,
    #[serde(default = "default_count")]
    pub max_count: u32,
}

fn default_weight() -> f64 {
    1.0
}

fn default_count() -> u32 {
    1
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct LootPool {
    #[serde(default = "default_count")]
    pub rolls: u32,
    #[serde(default)]
    pub bonus_rolls: f64,
    #[serde(default)]
    pub entries: Vec<LootEntry>,
}

impl LootPool {
    fn roll(&self, rng: &mut SimRng) -> Vec<String> {
        if self.entries.is_empty() {
            return Vec::new();
        }
        let mut count = self.rolls;
        if self.bonus_rolls > 0.0 && rng.gen_bool(self.bonus_rolls) {
            count += 1;
        }
        let mut items = Vec::new();
        for _ in 0..count {
            let Some(entry) = self.weighted_choice(rng) else {
                continue;
            };
            let lo = entry.min_count.min(entry.max_count);
            let hi = entry.min_count.max(entry.max_count);
            let n = rng.gen_range(lo..=hi);
            items.extend(std::iter::repeat_n(entry.item.clone(), n as usize));
        }
        items
    }

    fn weighted_choice(&self, rng: &mut SimRng) -> Option<&LootEntry> {
        let total: f64 = self.entries.iter().map(|e| e.weight).sum();
        let mut r = rng.gen_range(0.0..total.max(f64::MIN_POSITIVE));
        for entry in &self.entries {
            r -= entry.weight;
            if r <= 0.0 {
                return Some(entry);
            }
        }
        self.entries.last()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct LootTable {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub pools: Vec<LootPool>,
}

impl LootTable {
    fn roll(&self, rng: &mut SimRng) -> Vec<String> {
        self.pools.iter().flat_map(|p| p.roll(rng)).collect()
    }
}

// ── Manager ───────────────────────────────────────────────────────────────────

/// World resource holding every loaded loot table.
#[derive(Clone, Debug, Default)]
pub struct LootTableManager {
    tables: FxHashMap<String, LootTable>,
}

#[derive(Deserialize)]
struct RawTables {
    #[serde(default)]
    tables: FxHashMap<String, LootTable>,
}

impl LootTableManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML loot-table description.
    pub fn from_text(text: &str) -> HlResult<Self> {
        let raw: RawTables =
            toml::from_str(text).map_err(|e| HlError::Parse(e.to_string()))?;
        Ok(Self { tables: raw.tables })
    }

    pub fn insert(&mut self, name: &str, table: LootTable) {
        self.tables.insert(name.to_owned(), table);
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Roll a table into a flat list of item ids.  Unknown tables yield
    /// nothing.
    pub fn roll(&self, table_name: &str, rng: &mut SimRng) -> Vec<String> {
        match self.tables.get(table_name) {
            Some(table) => table.roll(rng),
            None => Vec::new(),
        }
    }
}
