//! Capture a running world into [`SaveData`] and restore it back.

use std::collections::BTreeMap;

use hl_core::Actor;
use hl_schedule::Scheduler;
use hl_world::{
    CrimeRecord, Equipment, GraphPos, Health, Home, Hunger, Identity, Inventory, Locked, Lod,
    LodLevel, MemData, Player, TilePos, World, WorldMemory,
};

use crate::error::SaveResult;
use crate::record::{
    EntityRecord, EquipmentRecord, HealthRecord, HungerRecord, MemoryRecord, PlayerRecord,
    SaveData, SimMode, SubzonePosRecord, FORMAT_VERSION,
};

// ── Capture ───────────────────────────────────────────────────────────────────

/// Snapshot the world and pending scheduler queue.
pub fn capture(world: &World, scheduler: &Scheduler) -> SaveData {
    let mut entities: BTreeMap<String, EntityRecord> = BTreeMap::new();

    // Tile-resident entities first.
    let mut seen: Vec<Actor> = Vec::new();
    for (actor, pos) in world.all_of::<TilePos>() {
        if world.has::<Player>(actor) {
            continue;
        }
        seen.push(actor);
        let mut record = EntityRecord {
            sim_mode: SimMode::High,
            zone: Some(pos.zone.clone()),
            x: Some(pos.x),
            y: Some(pos.y),
            subzone_pos: None,
            home: None,
            world_memory: None,
            name: None,
            kind: None,
            lod: None,
            health: None,
            hunger: None,
            inventory: None,
            equipment: None,
            crime_record: None,
            locked: None,
        };
        fill_common(world, actor, &mut record);
        entities.insert(actor.0.to_string(), record);
    }

    // Then graph-resident entities.
    for (actor, pos) in world.all_of::<GraphPos>() {
        if seen.contains(&actor) || world.has::<Player>(actor) {
            continue;
        }
        let mut record = EntityRecord {
            sim_mode: SimMode::Low,
            zone: None,
            x: None,
            y: None,
            subzone_pos: Some(SubzonePosRecord {
                zone: pos.zone.clone(),
                subzone: pos.node.clone(),
            }),
            home: world.get::<Home>(actor).map(|h| SubzonePosRecord {
                zone: h.zone.clone(),
                subzone: h.node.clone(),
            }),
            world_memory: world.get::<WorldMemory>(actor).map(|memory| {
                memory
                    .entries
                    .values()
                    .map(|e| MemoryRecord {
                        key: e.key.clone(),
                        data: e.data.clone(),
                        timestamp: e.timestamp,
                        ttl: e.ttl,
                    })
                    .collect()
            }),
            name: None,
            kind: None,
            lod: None,
            health: None,
            hunger: None,
            inventory: None,
            equipment: None,
            crime_record: None,
            locked: None,
        };
        fill_common(world, actor, &mut record);
        entities.insert(actor.0.to_string(), record);
    }

    SaveData {
        format_version: FORMAT_VERSION,
        player: capture_player(world),
        entities,
        zone_state: MemData::new(),
        scheduler_queue: scheduler.to_list(),
    }
}

fn capture_player(world: &World) -> Option<PlayerRecord> {
    let (actor, (_, pos)) = world.query_one::<(Player, TilePos)>()?;
    Some(PlayerRecord {
        zone: pos.zone.clone(),
        x: pos.x,
        y: pos.y,
        inventory: world
            .get::<Inventory>(actor)
            .filter(|inv| !inv.is_empty())
            .map(|inv| inv.items.clone()),
        equipment: world.get::<Equipment>(actor).map(|eq| EquipmentRecord {
            weapon: eq.weapon.clone(),
            armor: eq.armor.clone(),
        }),
        health: world.get::<Health>(actor).map(|h| HealthRecord {
            current: h.current,
            maximum: h.maximum,
        }),
        hunger: world.get::<Hunger>(actor).map(|h| HungerRecord {
            current: h.current,
            rate: h.rate,
        }),
        crime_record: world.get::<CrimeRecord>(actor).cloned(),
    })
}

/// Shared fields: identity, LOD, vitals, inventory, equipment, records.
fn fill_common(world: &World, actor: Actor, record: &mut EntityRecord) {
    if let Some(identity) = world.get::<Identity>(actor) {
        record.name = Some(identity.name.clone());
        record.kind = Some(identity.kind);
    }
    record.lod = Some(world.get::<Lod>(actor).map_or(LodLevel::Low, |l| l.level));
    record.health = world.get::<Health>(actor).map(|h| HealthRecord {
        current: h.current,
        maximum: h.maximum,
    });
    record.hunger = world.get::<Hunger>(actor).map(|h| HungerRecord {
        current: h.current,
        rate: h.rate,
    });
    record.inventory = world
        .get::<Inventory>(actor)
        .filter(|inv| !inv.is_empty())
        .map(|inv| inv.items.clone());
    record.equipment = world.get::<Equipment>(actor).map(|eq| EquipmentRecord {
        weapon: eq.weapon.clone(),
        armor: eq.armor.clone(),
    });
    record.crime_record = world.get::<CrimeRecord>(actor).cloned();
    record.locked = world.get::<Locked>(actor).cloned();
}

// ── Serialization ─────────────────────────────────────────────────────────────

/// Pretty-printed JSON for a snapshot.
pub fn to_json(data: &SaveData) -> SaveResult<String> {
    Ok(serde_json::to_string_pretty(data)?)
}

/// Parse a save file.  Malformed JSON or a format-version mismatch returns
/// `None` — the caller treats it as "new game".
pub fn load_json(text: &str) -> Option<SaveData> {
    let data: SaveData = match serde_json::from_str(text) {
        Ok(data) => data,
        Err(err) => {
            tracing::warn!(target: "save", %err, "malformed save file");
            return None;
        }
    };
    if data.format_version != FORMAT_VERSION {
        tracing::warn!(target: "save", found = data.format_version,
            expected = FORMAT_VERSION, "save format version mismatch");
        return None;
    }
    Some(data)
}

// ── Restore ───────────────────────────────────────────────────────────────────

/// Rebuild a world and scheduler from a snapshot.
///
/// Actor ids are preserved (scheduler events reference them); the
/// scheduler re-assigns `seq` values in saved order, keeping dispatch
/// order stable within each time bucket.
pub fn restore(data: SaveData) -> (World, Scheduler) {
    let mut world = World::new();

    if let Some(player) = &data.player {
        let actor = world.spawn();
        world.attach(actor, Player::default());
        world.attach(
            actor,
            TilePos { x: player.x, y: player.y, zone: player.zone.clone() },
        );
        world.zone_add(actor, &player.zone);
        if let Some(items) = &player.inventory {
            world.attach(actor, Inventory { items: items.clone() });
        }
        if let Some(eq) = &player.equipment {
            world.attach(
                actor,
                Equipment { weapon: eq.weapon.clone(), armor: eq.armor.clone() },
            );
        }
        if let Some(h) = &player.health {
            world.attach(actor, Health { current: h.current, maximum: h.maximum });
        }
        if let Some(h) = &player.hunger {
            world.attach(actor, Hunger { current: h.current, rate: h.rate, ..Hunger::default() });
        }
        if let Some(cr) = &player.crime_record {
            world.attach(actor, cr.clone());
        }
    }

    for (key, record) in &data.entities {
        let Ok(id) = key.parse::<u64>() else {
            tracing::warn!(target: "save", key = %key, "skipping entity with non-numeric id");
            continue;
        };
        let actor = Actor(id);
        world.spawn_at(actor);
        restore_entity(&mut world, actor, record);
    }

    let mut scheduler = Scheduler::new();
    scheduler.load_list(data.scheduler_queue);

    (world, scheduler)
}

fn restore_entity(world: &mut World, actor: Actor, record: &EntityRecord) {
    match record.sim_mode {
        SimMode::High => {
            if let (Some(zone), Some(x), Some(y)) = (&record.zone, record.x, record.y) {
                world.attach(actor, TilePos { x, y, zone: zone.clone() });
                world.zone_add(actor, zone);
            }
        }
        SimMode::Low => {
            if let Some(pos) = &record.subzone_pos {
                world.attach(
                    actor,
                    GraphPos { zone: pos.zone.clone(), node: pos.subzone.clone() },
                );
            }
            if let Some(home) = &record.home {
                world.attach(
                    actor,
                    Home { zone: home.zone.clone(), node: home.subzone.clone() },
                );
            }
            if let Some(memory_records) = &record.world_memory {
                let mut memory = WorldMemory::new();
                for m in memory_records {
                    memory.observe(&m.key, m.data.clone(), m.timestamp, m.ttl);
                }
                world.attach(actor, memory);
            }
        }
    }

    if let (Some(name), Some(kind)) = (&record.name, record.kind) {
        world.attach(actor, Identity::new(name, kind));
    }
    if let Some(level) = record.lod {
        world.attach(actor, Lod { level, grace_until: 0.0 });
    }
    if let Some(h) = &record.health {
        world.attach(actor, Health { current: h.current, maximum: h.maximum });
    }
    if let Some(h) = &record.hunger {
        world.attach(actor, Hunger { current: h.current, rate: h.rate, ..Hunger::default() });
    }
    if let Some(items) = &record.inventory {
        world.attach(actor, Inventory { items: items.clone() });
    }
    if let Some(eq) = &record.equipment {
        world.attach(
            actor,
            Equipment { weapon: eq.weapon.clone(), armor: eq.armor.clone() },
        );
    }
    if let Some(cr) = &record.crime_record {
        world.attach(actor, cr.clone());
    }
    if let Some(locked) = &record.locked {
        world.attach(actor, locked.clone());
    }
}
