//! Snapshot and restore of a [`GameState`].
//!
//! Bricks are never serialized. A fact or area is stored as the full brick id
//! string and re-resolved through the [`BrickRegistry`] on load, so a save only
//! loads against a registry that can produce every id it names. Restoring does
//! not fire any hooks.
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::area::Area;
use crate::config::GameConfig;
use crate::error::{ErrorSeverity, GameError};
use crate::fact::{Fact, FactData};
use crate::primitives::{GameRng, Pos};
use crate::registry::{BrickRegistry, RegistryError};
use crate::scheduler::Gate;
use crate::state::{AreaId, EntityId, FactId, GameState, Unit};

pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("save version {found} is not supported (expected {expected})")]
    Version { found: u32, expected: u32 },

    #[error("brick `{id}` in save does not resolve: {source}")]
    UnknownBrick {
        id: String,
        #[source]
        source: RegistryError,
    },

    #[error("fact `{brick_id}` is recorded for {entity} but stored under {holder}")]
    OrphanFact {
        entity: EntityId,
        holder: EntityId,
        brick_id: String,
    },
}

impl GameError for SaveError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Fatal
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Version { .. } => "SAVE_VERSION",
            Self::UnknownBrick { .. } => "SAVE_UNKNOWN_BRICK",
            Self::OrphanFact { .. } => "SAVE_ORPHAN_FACT",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FactRecord {
    pub id: FactId,
    pub entity: EntityId,
    pub brick_id: String,
    pub stacks: u32,
    /// Rounds left; `None` is permanent.
    pub remaining: Option<u32>,
    pub data: FactData,
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnitRecord {
    pub unit: Unit,
    pub facts: Vec<FactRecord>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AreaRecord {
    pub id: AreaId,
    pub name: String,
    pub brick_id: String,
    pub tiles: Vec<Pos>,
    pub remaining: Option<u32>,
    pub occupants: Vec<EntityId>,
    pub source: Option<EntityId>,
    pub difficult_terrain: bool,
    pub z_order: i32,
}

/// Everything needed to continue a game.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SaveGame {
    pub version: u32,
    pub round: u32,
    pub config: GameConfig,
    pub rng: GameRng,
    pub gate: Gate,
    pub next_entity: u32,
    pub next_fact: u64,
    pub next_area: u32,
    pub units: Vec<UnitRecord>,
    pub areas: Vec<AreaRecord>,
}

impl SaveGame {
    pub fn fact_count(&self) -> usize {
        self.units.iter().map(|u| u.facts.len()).sum()
    }
}

fn fact_record(round: u32, fact: &Fact) -> FactRecord {
    FactRecord {
        id: fact.id(),
        entity: fact.owner(),
        brick_id: fact.brick_id().to_string(),
        stacks: fact.stacks(),
        remaining: fact.remaining_rounds(round),
        data: fact.data.clone(),
    }
}

fn resolve(registry: &BrickRegistry, id: &str) -> Result<Arc<dyn crate::brick::Brick>, SaveError> {
    registry.resolve(id).map_err(|source| SaveError::UnknownBrick {
        id: id.to_string(),
        source,
    })
}

impl GameState {
    /// Capture the state between gates. Marked facts and expired areas are left out.
    pub fn to_save(&self) -> SaveGame {
        let units = self
            .units
            .values()
            .map(|unit| UnitRecord {
                unit: unit.clone(),
                facts: unit.live_facts().map(|f| fact_record(self.round, f)).collect(),
            })
            .collect();
        let areas = self
            .areas
            .values()
            .filter(|a| a.is_active())
            .map(|a| AreaRecord {
                id: a.id,
                name: a.name.clone(),
                brick_id: a.brick.id().to_string(),
                tiles: a.tiles.iter().copied().collect(),
                remaining: a.remaining_rounds(self.round),
                occupants: a.occupants.iter().copied().collect(),
                source: a.source,
                difficult_terrain: a.difficult_terrain,
                z_order: a.z_order,
            })
            .collect();

        SaveGame {
            version: SAVE_VERSION,
            round: self.round,
            config: self.config.clone(),
            rng: self.rng.clone(),
            gate: self.gate,
            next_entity: self.next_entity,
            next_fact: self.next_fact,
            next_area: self.next_area,
            units,
            areas,
        }
    }

    /// Rebuild a game from `save`, resolving every brick id through `registry`.
    ///
    /// Fails without side effects on the first id that does not resolve.
    pub fn from_save(save: &SaveGame, registry: Arc<BrickRegistry>) -> Result<Self, SaveError> {
        if save.version != SAVE_VERSION {
            return Err(SaveError::Version {
                found: save.version,
                expected: SAVE_VERSION,
            });
        }
        let mut state = GameState::new(save.config.clone(), Arc::clone(&registry));
        state.round = save.round;
        state.rng = save.rng.clone();
        state.gate = save.gate;
        state.next_entity = save.next_entity;
        state.next_fact = save.next_fact;
        state.next_area = save.next_area;

        for record in &save.units {
            let mut unit = record.unit.clone();
            unit.facts = Vec::with_capacity(record.facts.len());
            for fr in &record.facts {
                if fr.entity != unit.id {
                    return Err(SaveError::OrphanFact {
                        entity: fr.entity,
                        holder: unit.id,
                        brick_id: fr.brick_id.clone(),
                    });
                }
                let brick = resolve(&registry, &fr.brick_id)?;
                let expires_at = fr.remaining.map(|r| save.round.saturating_add(r));
                let mut fact = Fact::new(fr.id, unit.id, brick, fr.stacks, expires_at);
                fact.data = fr.data.clone();
                unit.facts.push(fact);
            }
            state.units.insert(unit.id, unit);
        }

        for record in &save.areas {
            let brick = resolve(&registry, &record.brick_id)?;
            let area = Area {
                id: record.id,
                name: record.name.clone(),
                tiles: record.tiles.iter().copied().collect(),
                expires_at: record.remaining.map(|r| save.round.saturating_add(r)),
                occupants: record.occupants.iter().copied().collect::<BTreeSet<_>>(),
                source: record.source,
                brick,
                difficult_terrain: record.difficult_terrain,
                z_order: record.z_order,
                expired: false,
            };
            state.areas.insert(area.id, area);
        }

        tracing::info!(
            target: "tactics::save",
            round = save.round,
            units = save.units.len(),
            facts = save.fact_count(),
            areas = save.areas.len(),
            "game restored"
        );
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brick::{Brick, BrickKind};
    use crate::state::UnitSpec;

    #[derive(Debug)]
    struct Marker(String);

    impl Brick for Marker {
        fn id(&self) -> &str {
            &self.0
        }

        fn kind(&self) -> BrickKind {
            BrickKind::Buff
        }
    }

    fn registry() -> Arc<BrickRegistry> {
        let mut registry = BrickRegistry::new();
        registry.register(Arc::new(Marker("marker".into()))).unwrap();
        Arc::new(registry)
    }

    #[test]
    fn facts_survive_a_round_trip_with_their_timers() {
        let registry = registry();
        let mut state = GameState::new(GameConfig::with_seed(5), Arc::clone(&registry));
        let gob = state.spawn_unit(&UnitSpec::new("goblin", 7), Pos::new(3, 3)).unwrap();
        let marker = registry.resolve("marker").unwrap();
        state.add_fact(gob, marker, Some(3), 1);
        state.round = 2;

        let save = state.to_save();
        let restored = GameState::from_save(&save, registry).unwrap();

        let fact = restored.find_fact(gob, "marker").unwrap();
        assert_eq!(fact.remaining_rounds(restored.round), Some(2));
        assert_eq!(restored.unit(gob).unwrap().hp.current, 7);
        assert_eq!(restored.rng, state.rng);
    }

    #[test]
    fn unknown_ids_abort_the_load() {
        let registry = registry();
        let mut state = GameState::new(GameConfig::new(), Arc::clone(&registry));
        let gob = state.spawn_unit(&UnitSpec::new("goblin", 7), Pos::new(3, 3)).unwrap();
        state.add_fact(gob, registry.resolve("marker").unwrap(), None, 1);

        let mut save = state.to_save();
        save.units[0].facts[0].brick_id = "vanished".into();
        let err = GameState::from_save(&save, registry).unwrap_err();
        assert!(matches!(err, SaveError::UnknownBrick { ref id, .. } if id == "vanished"));
        assert!(state.has_fact(gob, "marker"));
    }
}
