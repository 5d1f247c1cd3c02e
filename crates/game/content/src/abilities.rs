//! Spells and other abilities offered through `cast` and `use`.
use std::sync::Arc;

use tactics_core::action::{ActionBrick, CommandTarget, Targeting};
use tactics_core::damage::heal;
use tactics_core::effects::{burst, spell_attack, strike};
use tactics_core::{
    AreaSpec, Brick, BrickRegistry, DamageComponent, DamageType, Dice, DiceFormula, EntityId, GameState,
    Pos, QueryKey, RegistryError, SaveKind, SaveSpec, Target,
};

use crate::bricks::Grease;

fn target_unit(target: CommandTarget) -> Option<EntityId> {
    match target {
        CommandTarget::Unit(id) => Some(id),
        _ => None,
    }
}

fn target_pos(target: CommandTarget) -> Option<Pos> {
    match target {
        CommandTarget::Pos(p) => Some(p),
        _ => None,
    }
}

fn cast_line(state: &GameState, actor: EntityId, spell: &str) -> Option<String> {
    let unit = state.unit(actor)?;
    Some(if unit.is_player() {
        format!("You cast {spell}.")
    } else {
        format!("{} casts {spell}.", unit.the_cap())
    })
}

fn announce(state: &mut GameState, actor: EntityId, spell: &str) {
    if let Some(line) = cast_line(state, actor, spell) {
        state.journal.pline(line);
    }
}

/// 6d6 fire in a radius-1 burst, reflex for half.
#[derive(Debug)]
pub struct Fireball;

impl Fireball {
    pub const RADIUS: i32 = 1;
}

impl ActionBrick for Fireball {
    fn id(&self) -> &str {
        "fireball"
    }

    fn name(&self) -> &str {
        "Fireball"
    }

    fn targeting(&self) -> Targeting {
        Targeting::Pos
    }

    fn max_range(&self) -> i32 {
        6
    }

    fn execute(&self, state: &mut GameState, actor: EntityId, target: CommandTarget) {
        let Some(center) = target_pos(target) else {
            return;
        };
        announce(state, actor, "fireball");
        let dc = state.resolve_stat(actor, QueryKey::SpellDc, state.config.default_save_dc);
        let fire = DamageComponent::new(Dice::nd(6, 6), DamageType::Fire).half_on_save();
        let reports = burst(
            state,
            Some(actor),
            center,
            Self::RADIUS,
            &[fire],
            Some(SaveSpec::new(SaveKind::Reflex, dc)),
            self.id(),
        );
        tracing::debug!(target: "tactics::actions", %actor, %center, hit = reports.len(), "fireball");
    }
}

/// Ranged spell attack: 2d8 acid and 1d6 persistent acid.
#[derive(Debug)]
pub struct AcidArrow;

impl ActionBrick for AcidArrow {
    fn id(&self) -> &str {
        "acid_arrow"
    }

    fn name(&self) -> &str {
        "Acid arrow"
    }

    fn targeting(&self) -> Targeting {
        Targeting::Unit
    }

    fn max_range(&self) -> i32 {
        8
    }

    fn execute(&self, state: &mut GameState, actor: EntityId, target: CommandTarget) {
        let Some(victim) = target_unit(target) else {
            return;
        };
        announce(state, actor, "acid arrow");
        let components = vec![
            DamageComponent::new(Dice::nd(2, 8), DamageType::Acid),
            DamageComponent::new(Dice::d(6), DamageType::Acid).persistent(),
        ];
        spell_attack(state, actor, victim, self.id(), components);
    }
}

/// Three darts of d4+1 force that never miss.
#[derive(Debug)]
pub struct MagicMissile;

impl MagicMissile {
    pub const DARTS: usize = 3;
}

impl ActionBrick for MagicMissile {
    fn id(&self) -> &str {
        "magic_missile"
    }

    fn name(&self) -> &str {
        "Magic missile"
    }

    fn targeting(&self) -> Targeting {
        Targeting::Unit
    }

    fn max_range(&self) -> i32 {
        8
    }

    fn execute(&self, state: &mut GameState, actor: EntityId, target: CommandTarget) {
        let Some(victim) = target_unit(target) else {
            return;
        };
        announce(state, actor, "magic missile");
        let dart = DamageComponent::new(Dice::d(4).plus(1), DamageType::Force);
        strike(state, Some(actor), victim, vec![dart; Self::DARTS], None, self.id());
    }
}

/// `grant+<brick>`: puts a brick on the caster for ten rounds.
#[derive(Debug)]
pub struct GrantSelf {
    id: String,
    brick: Arc<dyn Brick>,
}

impl GrantSelf {
    pub const ROUNDS: u32 = 10;

    pub fn new(brick: Arc<dyn Brick>) -> Self {
        Self {
            id: format!("grant+{}", brick.id()),
            brick,
        }
    }
}

impl ActionBrick for GrantSelf {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        self.brick.display_name()
    }

    fn targeting(&self) -> Targeting {
        Targeting::None
    }

    fn execute(&self, state: &mut GameState, actor: EntityId, _target: CommandTarget) {
        let brick = Arc::clone(&self.brick);
        state.with_resolution(Some(actor), Target::Unit(actor), |state, _ctx| {
            state.add_fact(actor, brick, Some(Self::ROUNDS), 1);
        });
    }
}

/// Heals the caster 1d8+1.
#[derive(Debug)]
pub struct CureLightWounds;

impl ActionBrick for CureLightWounds {
    fn id(&self) -> &str {
        "cure_light_wounds"
    }

    fn name(&self) -> &str {
        "Cure light wounds"
    }

    fn targeting(&self) -> Targeting {
        Targeting::None
    }

    fn execute(&self, state: &mut GameState, actor: EntityId, _target: CommandTarget) {
        announce(state, actor, "cure light wounds");
        let formula = DiceFormula::from(Dice::new(1, 8, 1));
        let healed = state.with_resolution(Some(actor), Target::Unit(actor), |state, ctx| {
            heal(state, ctx, &formula)
        });
        if actor.is_player() && healed.is_some_and(|n| n > 0) {
            state.journal.pline("You feel better.");
        }
    }
}

/// Covers a tile and its four neighbours in grease.
#[derive(Debug)]
pub struct CreateGrease;

impl ActionBrick for CreateGrease {
    fn id(&self) -> &str {
        "create_grease"
    }

    fn name(&self) -> &str {
        "Grease"
    }

    fn targeting(&self) -> Targeting {
        Targeting::Pos
    }

    fn max_range(&self) -> i32 {
        4
    }

    fn execute(&self, state: &mut GameState, actor: EntityId, target: CommandTarget) {
        let Some(center) = target_pos(target) else {
            return;
        };
        let Some(brick) = state.registry().try_resolve(Grease.id()) else {
            tracing::warn!(target: "tactics::actions", "grease brick is not registered");
            return;
        };
        announce(state, actor, "grease");
        let mut spec = AreaSpec::new(brick, std::iter::once(center).chain(center.cardinal_neighbours()))
            .lasting(Grease::DURATION)
            .from_source(actor);
        spec.difficult_terrain = true;
        state.place_area(spec);
    }
}

/// Register every ability singleton and the `grant` factory.
pub fn register(registry: &mut BrickRegistry) -> Result<(), RegistryError> {
    registry.register_action(Arc::new(Fireball))?;
    registry.register_action(Arc::new(AcidArrow))?;
    registry.register_action(Arc::new(MagicMissile))?;
    registry.register_action(Arc::new(CureLightWounds))?;
    registry.register_action(Arc::new(CreateGrease))?;
    registry.register_action_factory("grant", |arg, registry| {
        let id = arg
            .filter(|a| !a.is_empty())
            .ok_or_else(|| RegistryError::bad_argument("grant", "needs a brick id"))?;
        Ok(Arc::new(GrantSelf::new(registry.resolve(id)?)))
    })?;
    Ok(())
}
