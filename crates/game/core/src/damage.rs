//! Typed damage components and the damage/heal pipeline.
//!
//! Interception happens through hooks, not through a central table: the
//! target's before-incoming-damage hooks call [`DamageComponent::apply_reduction`],
//! [`DamageComponent::offer_absorption`] or [`DamageComponent::negate`] on the
//! pending components. Reductions from different sources do not stack, nor do
//! absorption pools: the largest offer applies.
use bitflags::bitflags;
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::context::Resolution;
use crate::deferred::DeferredAction;
use crate::hooks::{Hook, fire};
use crate::journal::{DamageRecord, DamageRoll, DeathRecord, HealRecord, LogRecord};
use crate::modifier::Modifiers;
use crate::primitives::{DiceFormula, GameRng};
use crate::state::{EntityId, GameState};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Display, EnumString, AsRefStr, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DamageType {
    Slashing,
    Piercing,
    #[default]
    Blunt,
    Fire,
    Cold,
    Shock,
    Acid,
    Sonic,
    Force,
    Holy,
    Unholy,
    Poison,
    Magic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum DamageCategory {
    Physical,
    Energy,
    Other,
}

impl DamageType {
    pub const fn category(self) -> DamageCategory {
        match self {
            Self::Slashing | Self::Piercing | Self::Blunt => DamageCategory::Physical,
            Self::Fire | Self::Cold | Self::Shock | Self::Acid | Self::Sonic => DamageCategory::Energy,
            Self::Force | Self::Holy | Self::Unholy | Self::Poison | Self::Magic => DamageCategory::Other,
        }
    }

    pub const fn is_physical(self) -> bool {
        matches!(self.category(), DamageCategory::Physical)
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct DamageFlags: u8 {
        /// Halved (rounding down) when the accompanying check succeeded.
        const HALF_ON_SAVE = 0b0001;
        /// Applied later as a lingering effect instead of immediately.
        const PERSISTENT = 0b0010;
        /// Doubled when the accompanying check failed.
        const DOUBLE_ON_FAIL = 0b0100;
    }
}

/// One typed slice of damage in a resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DamageComponent {
    pub formula: DiceFormula,
    pub damage_type: DamageType,
    pub flags: DamageFlags,
    pub modifiers: Modifiers,
    extra_dice: i32,
    reduction: i32,
    absorb_available: i32,
    negated: bool,

    pub rolled: i32,
    pub reduced: i32,
    pub absorbed: i32,
    pub halved: bool,
    pub doubled: bool,
    pub final_amount: i32,
}

impl DamageComponent {
    pub fn new(formula: impl Into<DiceFormula>, damage_type: DamageType) -> Self {
        Self {
            formula: formula.into(),
            damage_type,
            flags: DamageFlags::empty(),
            modifiers: Modifiers::new(),
            extra_dice: 0,
            reduction: 0,
            absorb_available: 0,
            negated: false,
            rolled: 0,
            reduced: 0,
            absorbed: 0,
            halved: false,
            doubled: false,
            final_amount: 0,
        }
    }

    pub fn with_flags(mut self, flags: DamageFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn half_on_save(self) -> Self {
        self.with_flags(DamageFlags::HALF_ON_SAVE)
    }

    pub fn persistent(self) -> Self {
        self.with_flags(DamageFlags::PERSISTENT)
    }

    pub fn is_persistent(&self) -> bool {
        self.flags.contains(DamageFlags::PERSISTENT)
    }

    /// Extra dice on the first term; the largest offer wins.
    pub fn add_extra_dice(&mut self, dice: i32) {
        self.extra_dice = self.extra_dice.max(dice);
    }

    /// Flat reduction; the largest offer wins.
    pub fn apply_reduction(&mut self, amount: i32) {
        self.reduction = self.reduction.max(amount);
    }

    /// Absorption pool available to this component; the largest offer wins.
    pub fn offer_absorption(&mut self, pool: i32) {
        self.absorb_available = self.absorb_available.max(pool);
    }

    pub fn negate(&mut self) {
        self.negated = true;
    }

    pub fn extra_dice(&self) -> i32 {
        self.extra_dice
    }

    pub fn reduction(&self) -> i32 {
        self.reduction
    }

    pub fn absorb_available(&self) -> i32 {
        self.absorb_available
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Roll and apply reduction, absorption, save and negation.
    ///
    /// `saved` is the outcome of the accompanying check, if there was one.
    /// Persistent components deal nothing now.
    fn resolve(&mut self, rng: &mut GameRng, saved: Option<bool>) {
        if self.is_persistent() {
            self.final_amount = 0;
            return;
        }
        self.rolled = (self.formula.roll_with_extra(rng, self.extra_dice) + self.modifiers.calculate()).max(0);
        let after_dr = (self.rolled - self.reduction).max(0);
        self.reduced = self.rolled - after_dr;
        self.absorbed = after_dr.min(self.absorb_available.max(0));
        let mut amount = after_dr - self.absorbed;

        if self.flags.contains(DamageFlags::HALF_ON_SAVE) && saved == Some(true) {
            amount /= 2;
            self.halved = true;
        }
        if self.flags.contains(DamageFlags::DOUBLE_ON_FAIL) && saved == Some(false) {
            amount *= 2;
            self.doubled = true;
        }
        if self.negated {
            amount = 0;
        }
        self.final_amount = amount.max(0);
    }

    fn breakdown(&self) -> DamageRoll {
        DamageRoll {
            formula: self.formula.clone(),
            damage_type: self.damage_type,
            rolled: self.rolled,
            reduced: self.reduced,
            absorbed: self.absorbed,
            halved: self.halved,
            doubled: self.doubled,
            persistent: self.is_persistent(),
            final_amount: self.final_amount,
        }
    }
}

/// What one damage resolution did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DamageReport {
    pub source: Option<EntityId>,
    pub target: EntityId,
    pub total: i32,
    pub hp_before: i32,
    pub hp_after: i32,
    pub killed: bool,
}

/// Sum of `absorbed` over the resolved components of `damage_type`.
pub fn absorbed_of(ctx: &Resolution, damage_type: DamageType) -> i32 {
    ctx.damage
        .iter()
        .filter(|c| c.damage_type == damage_type)
        .map(|c| c.absorbed)
        .sum()
}

/// Apply the pending components in `ctx.damage` to the context's target.
///
/// A missing or already dead target is a silent no-op.
pub fn resolve_damage(state: &mut GameState, ctx: &mut Resolution) -> Option<DamageReport> {
    let target = ctx.target_unit()?;
    if !state.unit(target).is_some_and(|u| u.is_alive()) {
        return None;
    }
    let source = ctx.source;

    if let Some(source) = source {
        fire(state, source, Hook::BeforeDamageRoll, ctx);
    }
    fire(state, target, Hook::BeforeIncomingDamage, ctx);

    let saved = ctx.check().map(|c| c.success());
    let mut components = std::mem::take(&mut ctx.damage);
    for component in &mut components {
        component.resolve(&mut state.rng, saved);
    }
    let total: i32 = components.iter().map(|c| c.final_amount).sum();

    let round = state.round;
    let unit = state.unit_mut(target)?;
    let hp_before = unit.hp.current;
    let through = unit.hp.absorb_temp(total);
    unit.hp.current -= through;
    if total > 0 {
        unit.last_damaged_round = Some(round);
    }
    let hp_after = unit.hp.current;
    let name = unit.the_cap();

    ctx.total_damage += total;
    ctx.hp_before = Some(hp_before);
    ctx.hp_after = Some(hp_after);

    let record = DamageRecord {
        source,
        target,
        rolls: components.iter().map(DamageComponent::breakdown).collect(),
        total,
        hp_before,
        hp_after,
    };
    tracing::debug!(target: "tactics::damage", %target, total, hp_before, hp_after, "damage applied");
    state
        .journal
        .log(LogRecord::Damage(record), format!("{name} takes {total} damage ({hp_before} -> {hp_after})"));
    ctx.damage = components;

    if let Some(source) = source {
        fire(state, source, Hook::DamageDone, ctx);
    }
    fire(state, target, Hook::DamageTaken, ctx);

    let killed = hp_after <= 0 && die(state, ctx, target);

    for component in ctx.damage.iter().filter(|c| c.is_persistent() && !c.is_negated()) {
        state.defer(DeferredAction::GrantFact {
            target,
            brick_id: format!("persistent+{}/{}", component.damage_type, component.formula),
            duration: None,
            stacks: 1,
        });
    }

    Some(DamageReport {
        source,
        target,
        total,
        hp_before,
        hp_after,
        killed,
    })
}

/// Mark `target` dead and fire its death hooks. Does nothing the second time.
pub fn die(state: &mut GameState, ctx: &mut Resolution, target: EntityId) -> bool {
    let Some(unit) = state.unit_mut(target).filter(|u| u.is_alive()) else {
        return false;
    };
    unit.dead = true;
    let line = if unit.is_player() {
        "You die...".to_string()
    } else {
        format!("{} is killed!", unit.the_cap())
    };
    let killer = ctx.source.filter(|&s| s != target);

    tracing::info!(target: "tactics::damage", %target, ?killer, "death");
    state.journal.pline(line.clone());
    state
        .journal
        .log(LogRecord::Death(DeathRecord { entity: target, killer }), line);
    fire(state, target, Hook::Death, ctx);
    true
}

impl GameState {
    /// Kill `target` outright, attributing it to `killer`.
    pub fn kill(&mut self, target: EntityId, killer: Option<EntityId>) -> bool {
        self.with_resolution(killer, crate::context::Target::Unit(target), |state, ctx| {
            if let Some(unit) = state.unit_mut(target) {
                unit.hp.current = unit.hp.current.min(0);
            }
            die(state, ctx, target)
        })
    }
}

/// Heal the context's target by `formula` plus `ctx.heal_modifiers`.
///
/// Returns the hit points actually restored, or `None` for a dead or missing target.
pub fn heal(state: &mut GameState, ctx: &mut Resolution, formula: &DiceFormula) -> Option<i32> {
    let target = ctx.target_unit()?;
    if !state.unit(target).is_some_and(|u| u.is_alive()) {
        return None;
    }
    if let Some(source) = ctx.source {
        fire(state, source, Hook::BeforeHealGiven, ctx);
    }
    fire(state, target, Hook::BeforeHealReceived, ctx);

    let rolled = (formula.roll(&mut state.rng) + ctx.heal_modifiers.calculate()).max(0);
    let unit = state.unit_mut(target)?;
    let hp_before = unit.hp.current;
    unit.hp.current = (hp_before + rolled).min(unit.hp.max.max(hp_before));
    let hp_after = unit.hp.current;
    let amount = hp_after - hp_before;
    let name = unit.the_cap();
    ctx.healed += amount;

    fire(state, target, Hook::AfterHealReceived, ctx);
    state.journal.log(
        LogRecord::Heal(HealRecord {
            source: ctx.source,
            target,
            amount,
            hp_before,
            hp_after,
        }),
        format!("{name} heals {amount} ({hp_before} -> {hp_after})"),
    );
    Some(amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::Dice;

    #[test]
    fn categories() {
        assert!(DamageType::Blunt.is_physical());
        assert_eq!(DamageType::Acid.category(), DamageCategory::Energy);
        assert_eq!(DamageType::Holy.category(), DamageCategory::Other);
        assert_eq!("shock".parse::<DamageType>().ok(), Some(DamageType::Shock));
    }

    #[test]
    fn half_on_save_floors_and_never_goes_negative() {
        let mut rng = GameRng::new(1);
        for flat in 0..=40 {
            for reduction in [0, 3, 50] {
                let mut c = DamageComponent::new(DiceFormula::flat(flat), DamageType::Fire).half_on_save();
                c.apply_reduction(reduction);
                c.resolve(&mut rng, Some(true));
                let after = (flat - reduction).max(0);
                assert_eq!(c.final_amount, after / 2);
                assert!(c.final_amount >= 0);
            }
        }
    }

    #[test]
    fn reductions_and_pools_take_the_largest_offer() {
        let mut rng = GameRng::new(1);
        let mut c = DamageComponent::new(DiceFormula::flat(20), DamageType::Cold);
        c.apply_reduction(5);
        c.apply_reduction(3);
        c.offer_absorption(4);
        c.offer_absorption(6);
        c.resolve(&mut rng, None);
        assert_eq!((c.rolled, c.reduced, c.absorbed, c.final_amount), (20, 5, 6, 9));
    }

    #[test]
    fn negation_and_doubling() {
        let mut rng = GameRng::new(1);
        let mut doubled = DamageComponent::new(Dice::flat(4), DamageType::Sonic)
            .with_flags(DamageFlags::DOUBLE_ON_FAIL);
        doubled.resolve(&mut rng, Some(false));
        assert_eq!(doubled.final_amount, 8);

        let mut negated = DamageComponent::new(Dice::flat(4), DamageType::Sonic);
        negated.negate();
        negated.resolve(&mut rng, None);
        assert_eq!(negated.final_amount, 0);
        assert_eq!(negated.rolled, 4);
    }

    #[test]
    fn persistent_components_deal_nothing_now() {
        let mut rng = GameRng::new(1);
        let mut c = DamageComponent::new(Dice::flat(6), DamageType::Acid).persistent();
        c.resolve(&mut rng, None);
        assert_eq!(c.final_amount, 0);
        assert!(c.breakdown().persistent);
    }
}
