//! Bricks that drive free-standing areas.
use tactics_core::brick::{Brick, BrickKind};
use tactics_core::check::resolve_save;
use tactics_core::context::Resolution;
use tactics_core::effects::strike;
use tactics_core::{AreaId, DamageComponent, DamageType, DeferredAction, Dice, EntityId, GameState, SaveKind};

/// Burns everyone standing in it for 1d6 fire each round.
#[derive(Debug)]
pub struct BurningGround {
    damage: DamageComponent,
}

impl BurningGround {
    pub fn new() -> Self {
        Self {
            damage: DamageComponent::new(Dice::d(6), DamageType::Fire),
        }
    }
}

impl Default for BurningGround {
    fn default() -> Self {
        Self::new()
    }
}

impl Brick for BurningGround {
    fn id(&self) -> &str {
        "burning_ground"
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Area
    }

    fn display_name(&self) -> &str {
        "Burning ground"
    }

    fn on_area_tick(&self, area: AreaId, state: &mut GameState, _ctx: &mut Resolution) {
        let Some(a) = state.area(area) else {
            return;
        };
        let source = a.source;
        let occupants: Vec<EntityId> = a.occupants.iter().copied().collect();
        for unit in occupants {
            strike(state, source, unit, vec![self.damage.clone()], None, self.id());
        }
    }

    fn on_area_exit(
        &self,
        _area: AreaId,
        unit: EntityId,
        faded: bool,
        state: &mut GameState,
        _ctx: &mut Resolution,
    ) {
        if faded && unit.is_player() {
            state.journal.pline("The flames around you die down.");
        }
    }
}

/// Difficult terrain; anyone entering must make a reflex save or fall prone.
#[derive(Debug)]
pub struct Grease;

impl Grease {
    pub const DURATION: u32 = 6;
    const PRONE_ROUNDS: u32 = 1;
}

impl Brick for Grease {
    fn id(&self) -> &str {
        "grease"
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Area
    }

    fn display_name(&self) -> &str {
        "Grease"
    }

    fn on_area_enter(&self, _area: AreaId, unit: EntityId, state: &mut GameState, ctx: &mut Resolution) {
        let dc = state.config.default_save_dc;
        let Some(save) = resolve_save(state, ctx, unit, SaveKind::Reflex, dc, "grease") else {
            return;
        };
        if save.success() {
            return;
        }
        let line = match state.unit(unit) {
            Some(u) if u.is_player() => "You slip on the grease!".to_string(),
            Some(u) => format!("{} slips on the grease!", u.the_cap()),
            None => return,
        };
        state.journal.pline(line);
        state.defer(DeferredAction::GrantFact {
            target: unit,
            brick_id: "prone".to_string(),
            duration: Some(Self::PRONE_ROUNDS),
            stacks: 1,
        });
    }
}
