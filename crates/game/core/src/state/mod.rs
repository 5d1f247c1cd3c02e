//! Authoritative game state.
//!
//! [`GameState`] owns every unit, area and fact, the seeded random source, the
//! journal and the deferred-action queue. Rules code mutates it directly, but
//! always from inside a resolution scope (see
//! [`with_resolution`](GameState::with_resolution)) so cleanup and deferred
//! work happen at well-defined points.
mod ids;
mod unit;

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

pub use ids::{AreaId, EntityId, FactId};
pub use unit::{Faction, HitPoints, StatBlock, Unit, UnitSpec};

use crate::area::Area;
use crate::config::GameConfig;
use crate::context::Target;
use crate::deferred::DeferredAction;
use crate::hooks::{Hook, fire};
use crate::journal::Journal;
use crate::primitives::{GameRng, Pos};
use crate::registry::BrickRegistry;
use crate::scheduler::Gate;

/// Canonical state of one game.
#[derive(Debug)]
pub struct GameState {
    /// Current round, starting at 1.
    pub round: u32,
    pub config: GameConfig,
    pub rng: GameRng,
    /// Gate the driver must satisfy next.
    pub gate: Gate,
    pub journal: Journal,

    pub(crate) units: BTreeMap<EntityId, Unit>,
    pub(crate) areas: BTreeMap<AreaId, Area>,

    /// Sequential allocators. Ids are never reused; 0 is the player.
    pub(crate) next_entity: u32,
    pub(crate) next_fact: u64,
    pub(crate) next_area: u32,

    registry: Arc<BrickRegistry>,
    pub(crate) deferred: VecDeque<DeferredAction>,
    pub(crate) depth: u32,
    pub(crate) flushing: bool,
    pub(crate) pending_cleanup: BTreeSet<EntityId>,
}

impl GameState {
    /// Fresh game at round 1, waiting on the start-of-round gate.
    pub fn new(config: GameConfig, registry: Arc<BrickRegistry>) -> Self {
        Self {
            round: 1,
            rng: GameRng::new(config.seed),
            config,
            gate: Gate::StartRound,
            journal: Journal::new(),
            units: BTreeMap::new(),
            areas: BTreeMap::new(),
            next_entity: 1,
            next_fact: 1,
            next_area: 1,
            registry,
            deferred: VecDeque::new(),
            depth: 0,
            flushing: false,
            pending_cleanup: BTreeSet::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests(config: GameConfig) -> Self {
        Self::new(config, Arc::new(BrickRegistry::new()))
    }

    pub fn registry(&self) -> &Arc<BrickRegistry> {
        &self.registry
    }

    pub(crate) fn allocate_entity_id(&mut self) -> EntityId {
        if self.next_entity == EntityId::PLAYER.0 {
            self.next_entity = 1;
        }
        let id = EntityId(self.next_entity);
        self.next_entity = self.next_entity.saturating_add(1);
        id
    }

    pub(crate) fn allocate_fact_id(&mut self) -> FactId {
        let id = FactId(self.next_fact);
        self.next_fact = self.next_fact.saturating_add(1);
        id
    }

    pub(crate) fn allocate_area_id(&mut self) -> AreaId {
        let id = AreaId(self.next_area);
        self.next_area = self.next_area.saturating_add(1);
        id
    }

    // ----- units -----

    pub fn unit(&self, id: EntityId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub fn unit_mut(&mut self, id: EntityId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// All units in spawn order, dead ones included until reaped.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    pub fn unit_ids(&self) -> Vec<EntityId> {
        self.units.keys().copied().collect()
    }

    pub fn player(&self) -> Option<&Unit> {
        self.unit(EntityId::PLAYER)
    }

    pub fn player_alive(&self) -> bool {
        self.player().is_some_and(Unit::is_alive)
    }

    /// Living unit standing on `pos`.
    pub fn unit_at(&self, pos: Pos) -> Option<EntityId> {
        self.units
            .values()
            .find(|u| u.is_alive() && u.pos == pos)
            .map(|u| u.id)
    }

    pub fn is_free(&self, pos: Pos) -> bool {
        pos.is_valid() && self.unit_at(pos).is_none()
    }

    /// `pos` itself if free, else the first free tile in growing rings around it.
    pub fn free_tile_near(&self, pos: Pos, max_radius: i32) -> Option<Pos> {
        if self.is_free(pos) {
            return Some(pos);
        }
        (1..=max_radius).find_map(|radius| {
            Pos::burst(pos, radius)
                .into_iter()
                .filter(|p| pos.chebyshev_dist(*p) == radius)
                .find(|p| self.is_free(*p))
        })
    }

    /// Place the player (id 0) from `spec`. Replaces a previous player.
    pub fn spawn_player(&mut self, spec: &UnitSpec, pos: Pos) -> EntityId {
        self.insert_unit(EntityId::PLAYER, spec, pos);
        EntityId::PLAYER
    }

    /// Spawn a unit from `spec` at `pos`, or on the nearest free tile.
    ///
    /// Permanent facts listed in the template are granted; ids that do not
    /// resolve are skipped with a warning. Returns `None` when there is no room.
    pub fn spawn_unit(&mut self, spec: &UnitSpec, pos: Pos) -> Option<EntityId> {
        let at = self.free_tile_near(pos, 3)?;
        let id = self.allocate_entity_id();
        self.insert_unit(id, spec, at);
        Some(id)
    }

    fn insert_unit(&mut self, id: EntityId, spec: &UnitSpec, pos: Pos) {
        self.units.insert(id, Unit::from_spec(id, spec, pos));
        tracing::debug!(target: "tactics::state", %id, template = %spec.template, %pos, "unit spawned");

        for brick_id in &spec.facts {
            match self.registry.try_resolve(brick_id) {
                Some(brick) => {
                    self.add_fact(id, brick, None, 1);
                }
                None => {
                    tracing::warn!(target: "tactics::state", %id, brick_id, "template fact does not resolve");
                }
            }
        }
        self.update_occupancy(id);
        self.with_resolution(Some(id), Target::Unit(id), |state, ctx| {
            fire(state, id, Hook::Spawn, ctx);
        });
    }

    /// Remove a unit from play with its facts. The player is never removed.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        if id.is_player() || !self.units.contains_key(&id) {
            return false;
        }
        if let Some(unit) = self.units.get_mut(&id) {
            unit.dead = true;
        }
        self.update_occupancy(id);
        self.units.remove(&id);
        self.pending_cleanup.remove(&id);
        tracing::debug!(target: "tactics::state", %id, "unit removed");
        true
    }

    /// Drop dead non-player units and their facts.
    pub fn reap_dead(&mut self) -> Vec<EntityId> {
        let dead: Vec<EntityId> = self
            .units
            .values()
            .filter(|u| u.dead && !u.is_player())
            .map(|u| u.id)
            .collect();
        for &id in &dead {
            self.despawn(id);
        }
        dead
    }

    /// Set current hit points directly (driver setup).
    pub fn set_hp(&mut self, id: EntityId, hp: i32) -> bool {
        match self.units.get_mut(&id) {
            Some(unit) => {
                unit.hp.current = hp;
                unit.hp.max = unit.hp.max.max(hp);
                true
            }
            None => false,
        }
    }

    /// Move a unit and update area occupancy. No hooks, no cost.
    pub fn place_unit(&mut self, id: EntityId, pos: Pos) -> bool {
        match self.units.get_mut(&id) {
            Some(unit) => {
                unit.pos = pos;
                self.update_occupancy(id);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential_and_skip_the_player() {
        let mut state = GameState::for_tests(GameConfig::new());
        let player = state.spawn_player(&UnitSpec::new("player", 20), Pos::new(1, 1));
        let a = state.spawn_unit(&UnitSpec::new("goblin", 5), Pos::new(4, 4)).unwrap();
        let b = state.spawn_unit(&UnitSpec::new("goblin", 5), Pos::new(6, 6)).unwrap();
        assert_eq!(player, EntityId::PLAYER);
        assert_eq!((a, b), (EntityId(1), EntityId(2)));
    }

    #[test]
    fn spawning_on_an_occupied_tile_uses_the_nearest_free_one() {
        let mut state = GameState::for_tests(GameConfig::new());
        let a = state.spawn_unit(&UnitSpec::new("goblin", 5), Pos::new(4, 4)).unwrap();
        let b = state.spawn_unit(&UnitSpec::new("goblin", 5), Pos::new(4, 4)).unwrap();
        let pa = state.unit(a).unwrap().pos;
        let pb = state.unit(b).unwrap().pos;
        assert_ne!(pa, pb);
        assert!(pa.is_adjacent(pb));
    }

    #[test]
    fn reaping_drops_dead_units_but_not_the_player() {
        let mut state = GameState::for_tests(GameConfig::new());
        state.spawn_player(&UnitSpec::new("player", 20), Pos::new(1, 1));
        let gob = state.spawn_unit(&UnitSpec::new("goblin", 5), Pos::new(4, 4)).unwrap();
        state.unit_mut(gob).unwrap().dead = true;
        state.unit_mut(EntityId::PLAYER).unwrap().dead = true;
        assert_eq!(state.reap_dead(), vec![gob]);
        assert!(state.unit(gob).is_none());
        assert!(state.player().is_some());
    }
}
