//! Damage interception: resistances, damage reduction, absorption pools and wards.
use tactics_core::brick::{Brick, BrickKind, DisplayMode, QueryCx, StackMode};
use tactics_core::context::Resolution;
use tactics_core::damage::absorbed_of;
use tactics_core::fact::FactRef;
use tactics_core::{Answer, DamageComponent, DamageType, GameState, Modifier, QueryKey};

/// `energy_res+<type>[/<n>]`: reduces every component of one type.
///
/// Without an explicit amount the reduction ramps with the owner's level.
#[derive(Debug)]
pub struct EnergyResist {
    id: String,
    damage_type: DamageType,
    amount: Option<i32>,
}

impl EnergyResist {
    const RAMP: [i32; 4] = [5, 10, 15, 20];

    pub fn new(damage_type: DamageType, amount: Option<i32>) -> Self {
        let id = match amount {
            Some(n) => format!("energy_res+{damage_type}/{n}"),
            None => format!("energy_res+{damage_type}"),
        };
        Self {
            id,
            damage_type,
            amount,
        }
    }

    /// 5 up to level 5, then 10, 15 and 20 in steps of five levels.
    pub fn ramp(level: i32) -> i32 {
        let idx = match level {
            ..=5 => 0,
            6..=10 => 1,
            11..=15 => 2,
            _ => 3,
        };
        Self::RAMP[idx]
    }

    fn amount_for(&self, state: &GameState, fact: FactRef) -> i32 {
        self.amount.unwrap_or_else(|| {
            let level = state.unit(fact.entity).map_or(1, |u| u.stats.level);
            Self::ramp(level)
        })
    }
}

impl Brick for EnergyResist {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Logic
    }

    fn query(&self, cx: &QueryCx<'_>) -> Option<Answer> {
        let asks_for_us = cx.arg.is_some_and(|a| a == self.damage_type.as_ref());
        if cx.key != QueryKey::Resistance || !asks_for_us {
            return None;
        }
        let amount = self
            .amount
            .unwrap_or_else(|| Self::ramp(cx.state.unit(cx.entity).map_or(1, |u| u.stats.level)));
        Some(Answer::Int(amount))
    }

    fn on_before_incoming_damage(&self, fact: FactRef, state: &mut GameState, ctx: &mut Resolution) {
        let amount = self.amount_for(state, fact);
        ctx.damage
            .iter_mut()
            .filter(|c| c.damage_type == self.damage_type)
            .for_each(|c| c.apply_reduction(amount));
    }
}

/// `dr+<bypass>/<n>`: physical damage reduction unless the bypass type is present.
#[derive(Debug)]
pub struct SimpleDr {
    id: String,
    bypass: String,
    amount: i32,
}

impl SimpleDr {
    pub fn new(bypass: &str, amount: i32) -> Self {
        Self {
            id: format!("dr+{bypass}/{amount}"),
            bypass: bypass.to_string(),
            amount,
        }
    }
}

impl Brick for SimpleDr {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Logic
    }

    fn on_before_incoming_damage(&self, _fact: FactRef, _state: &mut GameState, ctx: &mut Resolution) {
        let bypassed = ctx.damage.iter().any(|c| c.damage_type.as_ref() == self.bypass);
        if bypassed {
            return;
        }
        ctx.damage
            .iter_mut()
            .filter(|c| c.damage_type.is_physical())
            .for_each(|c| c.apply_reduction(self.amount));
    }
}

/// `flat_dr/<n>`: reduction on all physical damage, no bypass. Registered per amount.
#[derive(Debug)]
pub struct FlatDr {
    id: String,
    amount: i32,
}

impl FlatDr {
    pub const AMOUNTS: [i32; 3] = [2, 5, 10];

    pub fn new(amount: i32) -> Self {
        Self {
            id: format!("flat_dr/{amount}"),
            amount,
        }
    }
}

impl Brick for FlatDr {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Logic
    }

    fn on_before_incoming_damage(&self, _fact: FactRef, _state: &mut GameState, ctx: &mut Resolution) {
        ctx.damage
            .iter_mut()
            .filter(|c| c.damage_type.is_physical())
            .for_each(|c| c.apply_reduction(self.amount));
    }
}

/// What a protection pool covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProtectionScope {
    Type(DamageType),
    Physical,
}

impl ProtectionScope {
    fn covers(self, component: &DamageComponent) -> bool {
        match self {
            Self::Type(ty) => component.damage_type == ty,
            Self::Physical => component.damage_type.is_physical(),
        }
    }

    fn label(self) -> String {
        match self {
            Self::Type(ty) => ty.to_string(),
            Self::Physical => "physical".to_string(),
        }
    }
}

/// `protection+<type>`: an absorption pool of one point per stack.
///
/// Whatever the pool soaks is taken off the stacks once the damage lands.
#[derive(Debug)]
pub struct Protection {
    id: String,
    name: String,
    scope: ProtectionScope,
}

impl Protection {
    pub const MAX_POOL: u32 = 9999;

    pub fn new(scope: ProtectionScope) -> Self {
        let arg = match scope {
            ProtectionScope::Type(ty) => ty.to_string(),
            ProtectionScope::Physical => "phys".to_string(),
        };
        Self {
            id: format!("protection+{arg}"),
            name: format!("Prot {}", scope.label()),
            scope,
        }
    }
}

impl Brick for Protection {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Buff
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn display_mode(&self) -> DisplayMode {
        DisplayMode::SHOW_NAME | DisplayMode::SHOW_STACKS
    }

    fn stack_mode(&self) -> StackMode {
        StackMode::ExtendStacks
    }

    fn max_stacks(&self) -> u32 {
        Self::MAX_POOL
    }

    fn on_before_incoming_damage(&self, fact: FactRef, state: &mut GameState, ctx: &mut Resolution) {
        let Some(pool) = state.fact(fact).map(|f| f.stacks()) else {
            return;
        };
        let pool = i32::try_from(pool).unwrap_or(i32::MAX);
        ctx.damage
            .iter_mut()
            .filter(|c| self.scope.covers(c))
            .for_each(|c| c.offer_absorption(pool));
    }

    fn on_damage_taken(&self, fact: FactRef, state: &mut GameState, ctx: &mut Resolution) {
        let used: i32 = match self.scope {
            ProtectionScope::Type(ty) => absorbed_of(ctx, ty),
            ProtectionScope::Physical => ctx
                .damage
                .iter()
                .filter(|c| c.damage_type.is_physical())
                .map(|c| c.absorbed)
                .sum(),
        };
        if used <= 0 {
            return;
        }
        if fact.entity.is_player() {
            state
                .journal
                .pline(format!("Your protection absorbs {used} {} damage.", self.scope.label()));
        }
        state.remove_stack(fact.entity, &self.id, used.unsigned_abs());
    }
}

/// `ward+<alignment>`: +2 circumstance to AC and saves against sources tagged with the alignment.
#[derive(Debug)]
pub struct Ward {
    id: String,
    alignment: String,
}

impl Ward {
    pub fn new(alignment: &str) -> Self {
        Self {
            id: format!("ward+{alignment}"),
            alignment: alignment.to_string(),
        }
    }
}

impl Brick for Ward {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Buff
    }

    fn stack_mode(&self) -> StackMode {
        StackMode::ExtendDuration
    }

    fn query(&self, cx: &QueryCx<'_>) -> Option<Answer> {
        let warded = matches!(
            cx.key,
            QueryKey::Ac | QueryKey::FortitudeSave | QueryKey::ReflexSave | QueryKey::WillSave
        );
        let against = cx.against.and_then(|id| cx.state.unit(id))?;
        (warded && against.has_tag(&self.alignment))
            .then(|| Answer::Modifier(Modifier::circumstance(2, format!("ward vs {}", self.alignment))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resistance_ramps_in_steps_of_five_levels() {
        assert_eq!(
            [1, 5, 6, 10, 11, 15, 16, 30].map(EnergyResist::ramp),
            [5, 5, 10, 10, 15, 15, 20, 20]
        );
    }

    #[test]
    fn ids_round_trip_their_arguments() {
        assert_eq!(EnergyResist::new(DamageType::Fire, Some(10)).id(), "energy_res+fire/10");
        assert_eq!(EnergyResist::new(DamageType::Cold, None).id(), "energy_res+cold");
        assert_eq!(SimpleDr::new("silver", 5).id(), "dr+silver/5");
        assert_eq!(Protection::new(ProtectionScope::Physical).id(), "protection+phys");
        assert_eq!(Ward::new("evil").id(), "ward+evil");
        assert_eq!(FlatDr::new(5).id(), "flat_dr/5");
    }
}
