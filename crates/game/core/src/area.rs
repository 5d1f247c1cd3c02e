//! Free-standing, tile-anchored effects.
//!
//! An area is not owned by any unit. It keeps its own occupant set, which is
//! recomputed whenever a unit moves, spawns or leaves play; enter and exit
//! hooks fire only when that set actually changes. Each round an area ticks
//! once as a whole, and an expired area fades (exit with `faded = true` for
//! every occupant) and is dropped at the next cleanup point.
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::brick::Brick;
use crate::context::Target;
use crate::journal::{AreaChange, AreaEvent, LogRecord};
use crate::primitives::Pos;
use crate::state::{AreaId, EntityId, GameState};

/// Everything needed to place an area.
#[derive(Clone, Debug)]
pub struct AreaSpec {
    pub name: String,
    pub tiles: BTreeSet<Pos>,
    /// Rounds until it fades; `None` lasts until removed.
    pub duration: Option<u32>,
    pub source: Option<EntityId>,
    pub brick: Arc<dyn Brick>,
    pub difficult_terrain: bool,
    pub z_order: i32,
}

impl AreaSpec {
    pub fn new(brick: Arc<dyn Brick>, tiles: impl IntoIterator<Item = Pos>) -> Self {
        Self {
            name: brick.display_name().to_string(),
            tiles: tiles.into_iter().collect(),
            duration: None,
            source: None,
            brick,
            difficult_terrain: false,
            z_order: 0,
        }
    }

    /// Square burst footprint around `center`.
    pub fn burst(brick: Arc<dyn Brick>, center: Pos, radius: i32) -> Self {
        Self::new(brick, Pos::burst(center, radius))
    }

    pub fn lasting(mut self, rounds: u32) -> Self {
        self.duration = Some(rounds);
        self
    }

    pub fn from_source(mut self, source: EntityId) -> Self {
        self.source = Some(source);
        self
    }
}

#[derive(Clone, Debug)]
pub struct Area {
    pub id: AreaId,
    pub name: String,
    pub tiles: BTreeSet<Pos>,
    pub expires_at: Option<u32>,
    pub occupants: BTreeSet<EntityId>,
    pub source: Option<EntityId>,
    pub brick: Arc<dyn Brick>,
    pub difficult_terrain: bool,
    pub z_order: i32,
    pub expired: bool,
}

impl Area {
    pub fn is_active(&self) -> bool {
        !self.expired
    }

    pub fn covers(&self, pos: Pos) -> bool {
        self.tiles.contains(&pos)
    }

    pub fn remaining_rounds(&self, now: u32) -> Option<u32> {
        self.expires_at.map(|at| at.saturating_sub(now))
    }
}

impl GameState {
    /// Place an area; units already standing on it enter immediately.
    pub fn place_area(&mut self, spec: AreaSpec) -> AreaId {
        let id = self.allocate_area_id();
        let area = Area {
            id,
            name: spec.name,
            tiles: spec.tiles,
            expires_at: spec.duration.map(|d| self.round.saturating_add(d)),
            occupants: BTreeSet::new(),
            source: spec.source,
            brick: spec.brick,
            difficult_terrain: spec.difficult_terrain,
            z_order: spec.z_order,
            expired: false,
        };
        tracing::debug!(target: "tactics::areas", %id, name = %area.name, tiles = area.tiles.len(), "area placed");
        self.log_area(id, &area.name, AreaEvent::Placed, None);
        self.areas.insert(id, area);

        let standing: Vec<EntityId> = self
            .units()
            .filter(|u| u.is_alive())
            .map(|u| u.id)
            .collect();
        for unit in standing {
            self.update_area_occupancy(id, unit);
        }
        id
    }

    pub fn area(&self, id: AreaId) -> Option<&Area> {
        self.areas.get(&id)
    }

    /// Areas in creation order.
    pub fn areas(&self) -> impl Iterator<Item = &Area> {
        self.areas.values()
    }

    /// Active areas covering `pos`, lowest z-order first.
    pub fn areas_at(&self, pos: Pos) -> Vec<AreaId> {
        let mut hits: Vec<&Area> = self
            .areas
            .values()
            .filter(|a| a.is_active() && a.covers(pos))
            .collect();
        hits.sort_by_key(|a| (a.z_order, a.id));
        hits.into_iter().map(|a| a.id).collect()
    }

    pub fn is_difficult_terrain(&self, pos: Pos) -> bool {
        self.areas
            .values()
            .any(|a| a.is_active() && a.difficult_terrain && a.covers(pos))
    }

    /// Recompute `unit`'s membership in every area.
    pub fn update_occupancy(&mut self, unit: EntityId) {
        let ids: Vec<AreaId> = self.areas.keys().copied().collect();
        for area in ids {
            self.update_area_occupancy(area, unit);
        }
    }

    fn update_area_occupancy(&mut self, area: AreaId, unit: EntityId) {
        let position = self.unit(unit).filter(|u| u.is_alive()).map(|u| u.pos);
        let Some(a) = self.areas.get(&area) else {
            return;
        };
        let inside = a.is_active() && position.is_some_and(|p| a.covers(p));
        let was = a.occupants.contains(&unit);
        match (was, inside) {
            (false, true) => self.handle_enter(area, unit),
            (true, false) => self.handle_exit(area, unit, false),
            _ => {}
        }
    }

    /// Add `unit` to the area's occupants and fire enter. No-op if already inside.
    pub fn handle_enter(&mut self, area: AreaId, unit: EntityId) {
        let Some(a) = self.areas.get_mut(&area) else {
            return;
        };
        if !a.occupants.insert(unit) {
            return;
        }
        let brick = Arc::clone(&a.brick);
        let source = a.source;
        let name = a.name.clone();
        self.log_area(area, &name, AreaEvent::Enter, Some(unit));
        self.with_resolution(source, Target::Unit(unit), |state, ctx| {
            brick.on_area_enter(area, unit, state, ctx);
        });
    }

    /// Remove `unit` from the area's occupants and fire exit. No-op if not inside.
    pub fn handle_exit(&mut self, area: AreaId, unit: EntityId, faded: bool) {
        let Some(a) = self.areas.get_mut(&area) else {
            return;
        };
        if !a.occupants.remove(&unit) {
            return;
        }
        let brick = Arc::clone(&a.brick);
        let source = a.source;
        let name = a.name.clone();
        let event = if faded { AreaEvent::Faded } else { AreaEvent::Exit };
        self.log_area(area, &name, event, Some(unit));
        self.with_resolution(source, Target::Unit(unit), |state, ctx| {
            brick.on_area_exit(area, unit, faded, state, ctx);
        });
    }

    /// Round-end upkeep: expired areas fade, the rest tick once.
    pub fn tick_areas(&mut self) {
        let round = self.round;
        let ids: Vec<AreaId> = self
            .areas
            .values()
            .filter(|a| a.is_active())
            .map(|a| a.id)
            .collect();

        for id in ids {
            let Some(area) = self.areas.get(&id) else {
                continue;
            };
            let brick = Arc::clone(&area.brick);
            let source = area.source;
            if area.expires_at.is_some_and(|at| round >= at) {
                let occupants: Vec<EntityId> = area.occupants.iter().copied().collect();
                for unit in occupants {
                    self.handle_exit(id, unit, true);
                }
                if let Some(area) = self.areas.get_mut(&id) {
                    area.expired = true;
                }
            } else {
                self.with_resolution(source, Target::None, |state, ctx| {
                    brick.on_area_tick(id, state, ctx);
                });
            }
        }
    }

    /// Drop expired areas.
    pub fn cleanup_areas(&mut self) {
        let gone: Vec<(AreaId, String)> = self
            .areas
            .values()
            .filter(|a| a.expired)
            .map(|a| (a.id, a.name.clone()))
            .collect();
        for (id, name) in gone {
            self.areas.remove(&id);
            self.log_area(id, &name, AreaEvent::Removed, None);
        }
    }

    /// Remove an area at once, firing exit for everyone inside.
    pub fn remove_area(&mut self, id: AreaId) -> bool {
        let Some(area) = self.areas.get(&id) else {
            return false;
        };
        let occupants: Vec<EntityId> = area.occupants.iter().copied().collect();
        for unit in occupants {
            self.handle_exit(id, unit, true);
        }
        if let Some(area) = self.areas.get_mut(&id) {
            area.expired = true;
        }
        self.cleanup_areas();
        true
    }

    fn log_area(&mut self, area: AreaId, name: &str, event: AreaEvent, unit: Option<EntityId>) {
        let msg = match unit {
            Some(unit) => format!("{area} {name}: {event} {unit}"),
            None => format!("{area} {name}: {event}"),
        };
        self.journal.log(
            LogRecord::Area(AreaChange {
                area,
                name: name.to_string(),
                event,
                unit,
            }),
            msg,
        );
    }
}
