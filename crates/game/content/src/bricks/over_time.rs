//! Bricks that act on their owner once per round.
use tactics_core::brick::{Brick, BrickKind, QueryCx, StackMode};
use tactics_core::check::resolve_flat;
use tactics_core::damage::heal;
use tactics_core::effects::strike;
use tactics_core::fact::FactRef;
use tactics_core::{Answer, DamageComponent, DamageType, DiceFormula, GameState, QueryKey, Target};

/// `regeneration/<n>`: heals `n` at round start while hurt.
#[derive(Debug)]
pub struct Regeneration {
    id: String,
    amount: i32,
}

impl Regeneration {
    pub const AMOUNTS: [i32; 5] = [1, 2, 3, 5, 10];

    pub fn new(amount: i32) -> Self {
        Self {
            id: format!("regeneration/{amount}"),
            amount,
        }
    }
}

impl Brick for Regeneration {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Trait
    }

    fn query(&self, cx: &QueryCx<'_>) -> Option<Answer> {
        (cx.key == QueryKey::Regeneration).then_some(Answer::Int(self.amount))
    }

    fn on_round_start(&self, fact: FactRef, state: &mut GameState) {
        let owner = fact.entity;
        let hurt = state
            .unit(owner)
            .is_some_and(|u| u.is_alive() && u.hp.current < u.hp.max);
        if !hurt {
            return;
        }
        let formula = DiceFormula::flat(self.amount);
        state.with_resolution(Some(owner), Target::Unit(owner), |state, ctx| {
            heal(state, ctx, &formula);
        });
    }
}

/// `persistent+<type>/<formula>`: deals its damage at round end, then a DC 15
/// flat check ends it.
#[derive(Debug)]
pub struct PersistentDamage {
    id: String,
    name: String,
    damage_type: DamageType,
    formula: DiceFormula,
}

impl PersistentDamage {
    pub const END_DC: i32 = 15;

    pub fn new(damage_type: DamageType, formula: DiceFormula) -> Self {
        Self {
            id: format!("persistent+{damage_type}/{formula}"),
            name: format!("Persistent {damage_type} ({formula})"),
            damage_type,
            formula,
        }
    }

    fn sizzle_line(&self, state: &GameState, fact: FactRef) -> Option<String> {
        let unit = state.unit(fact.entity)?;
        Some(match self.damage_type {
            DamageType::Acid => format!("The acid on {} sizzles!", unit.the()),
            DamageType::Fire => format!("{} burns!", unit.the_cap()),
            DamageType::Poison => format!("{} suffers from the poison!", unit.the_cap()),
            _ => format!("{} suffers {} damage.", unit.the_cap(), self.damage_type),
        })
    }
}

impl Brick for PersistentDamage {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Buff
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    // a second dose of the same formula does nothing extra
    fn stack_mode(&self) -> StackMode {
        StackMode::Replace
    }

    fn on_round_end(&self, fact: FactRef, state: &mut GameState) {
        let owner = fact.entity;
        if let Some(line) = self.sizzle_line(state, fact) {
            state.journal.pline(line);
        }
        let component = DamageComponent::new(self.formula.clone(), self.damage_type);
        strike(state, None, owner, vec![component], None, &self.id);

        if !state.unit(owner).is_some_and(|u| u.is_alive()) {
            return;
        }
        let ended = state.with_resolution(None, Target::Unit(owner), |state, ctx| {
            resolve_flat(state, ctx, owner, Self::END_DC, "persistent damage ends").success()
        });
        if ended {
            state.remove_fact(fact);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tactics_core::Dice;

    #[test]
    fn persistent_ids_use_normalised_dice() {
        let brick = PersistentDamage::new(DamageType::Acid, DiceFormula::from(Dice::d(6)));
        assert_eq!(brick.id(), "persistent+acid/d6");
        assert_eq!(Regeneration::new(3).id(), "regeneration/3");
    }
}
