//! d20 checks: saves, skills and attack rolls.
//!
//! A check is assembled as a mutable [`CheckRequest`] that before-roll hooks
//! may edit through `ctx.pending_check`, then rolled once into an immutable
//! [`Check`] stored on the resolution and written to the log.
//!
//! Outcome order: a forced result wins; otherwise a natural 1 fails and a
//! natural 20 succeeds; otherwise `total >= dc`.
use std::fmt;

use arrayvec::ArrayVec;
use strum::{AsRefStr, Display, EnumString};

use crate::config::GameConfig;
use crate::context::Resolution;
use crate::hooks::{Hook, fire};
use crate::journal::LogRecord;
use crate::modifier::Modifiers;
use crate::query::{Query, QueryKey};
use crate::state::{EntityId, GameState};

/// What is being checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CheckKey {
    Query(QueryKey),
    Attack,
    /// Bare d20 with no modifiers, e.g. to end persistent damage.
    Flat,
}

impl fmt::Display for CheckKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query(key) => write!(f, "{key}"),
            Self::Attack => write!(f, "attack"),
            Self::Flat => write!(f, "flat"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SaveKind {
    #[strum(serialize = "fortitude", serialize = "fort")]
    Fortitude,
    #[strum(serialize = "reflex", serialize = "ref")]
    Reflex,
    Will,
}

impl SaveKind {
    pub const fn key(self) -> QueryKey {
        match self {
            Self::Fortitude => QueryKey::FortitudeSave,
            Self::Reflex => QueryKey::ReflexSave,
            Self::Will => QueryKey::WillSave,
        }
    }
}

/// A check being assembled. Hooks may add modifiers, advantage or force it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckRequest {
    pub key: CheckKey,
    pub label: String,
    pub roller: EntityId,
    pub opponent: Option<EntityId>,
    pub dc: i32,
    pub modifiers: Modifiers,
    pub advantage: u32,
    pub disadvantage: u32,
    pub forced: Option<bool>,
}

impl CheckRequest {
    pub fn new(key: CheckKey, roller: EntityId, dc: i32, label: impl Into<String>) -> Self {
        Self {
            key,
            label: label.into(),
            roller,
            opponent: None,
            dc,
            modifiers: Modifiers::new(),
            advantage: 0,
            disadvantage: 0,
            forced: None,
        }
    }

    pub fn against(mut self, opponent: Option<EntityId>) -> Self {
        self.opponent = opponent;
        self
    }
}

/// Outcome of one roll. Never modified after it is made.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Check {
    key: CheckKey,
    label: String,
    roller: EntityId,
    rolls: ArrayVec<u8, { GameConfig::MAX_CHECK_DICE }>,
    base: i32,
    modifiers: Modifiers,
    total: i32,
    dc: i32,
    advantage: u32,
    disadvantage: u32,
    forced: Option<bool>,
    success: bool,
}

impl Check {
    pub fn key(&self) -> CheckKey {
        self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn roller(&self) -> EntityId {
        self.roller
    }

    /// Raw d20 results, one or two.
    pub fn rolls(&self) -> &[u8] {
        &self.rolls
    }

    /// The d20 kept after advantage or disadvantage.
    pub fn base(&self) -> i32 {
        self.base
    }

    pub fn modifiers(&self) -> &Modifiers {
        &self.modifiers
    }

    pub fn total(&self) -> i32 {
        self.total
    }

    pub fn dc(&self) -> i32 {
        self.dc
    }

    pub fn advantage(&self) -> u32 {
        self.advantage
    }

    pub fn disadvantage(&self) -> u32 {
        self.disadvantage
    }

    pub fn forced(&self) -> Option<bool> {
        self.forced
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn is_natural_1(&self) -> bool {
        self.base == 1
    }

    pub fn is_natural_20(&self) -> bool {
        self.base == 20
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: d20={} {} = {} vs DC {} -> {}",
            self.key,
            self.label,
            self.base,
            self.modifiers,
            self.total,
            self.dc,
            if self.success { "success" } else { "failure" }
        )
    }
}

fn d20(state: &mut GameState) -> u8 {
    // d(20) is always in 1..=20
    u8::try_from(state.rng.d(20)).unwrap_or(1)
}

/// Roll `request` as-is, with no hooks, and record the result on `ctx`.
pub fn roll_check(state: &mut GameState, ctx: &mut Resolution, request: CheckRequest) -> Check {
    let net = i64::from(request.advantage) - i64::from(request.disadvantage);
    let mut rolls = ArrayVec::new();
    rolls.push(d20(state));
    if net != 0 {
        rolls.push(d20(state));
    }
    let base = if net > 0 {
        rolls.iter().copied().max()
    } else {
        rolls.iter().copied().min()
    }
    .map_or(1, i32::from);

    let total = base + request.modifiers.calculate();
    let success = request.forced.unwrap_or(match base {
        1 => false,
        20 => true,
        _ => total >= request.dc,
    });

    let check = Check {
        key: request.key,
        label: request.label,
        roller: request.roller,
        rolls,
        base,
        modifiers: request.modifiers,
        total,
        dc: request.dc,
        advantage: request.advantage,
        disadvantage: request.disadvantage,
        forced: request.forced,
        success,
    };

    tracing::debug!(target: "tactics::check", roller = %check.roller, "{check}");
    if !ctx.silent {
        state
            .journal
            .log(LogRecord::Check(check.clone()), check.to_string());
    }
    ctx.set_check(check.clone());
    check
}

/// Fire before-check on the roller and its opponent, then roll.
pub fn resolve_check(state: &mut GameState, ctx: &mut Resolution, request: CheckRequest) -> Check {
    let roller = request.roller;
    let opponent = request.opponent;
    ctx.pending_check = Some(request.clone());
    fire(state, roller, Hook::BeforeCheck, ctx);
    if let Some(opponent) = opponent {
        fire(state, opponent, Hook::BeforeCheck, ctx);
    }
    let request = ctx.pending_check.take().unwrap_or(request);
    roll_check(state, ctx, request)
}

/// Saving throw by `target` against `dc`; the opponent is `ctx.source`.
pub fn resolve_save(
    state: &mut GameState,
    ctx: &mut Resolution,
    target: EntityId,
    kind: SaveKind,
    dc: i32,
    label: impl Into<String>,
) -> Option<Check> {
    let unit = state.unit(target)?;
    let base = match kind {
        SaveKind::Fortitude => unit.stats.fortitude,
        SaveKind::Reflex => unit.stats.reflex,
        SaveKind::Will => unit.stats.will,
    };
    let key = kind.key();
    let mut request = CheckRequest::new(CheckKey::Query(key), target, dc, label).against(ctx.source);
    request.modifiers.untyped(base, "base");
    request
        .modifiers
        .merge(&state.query_modifiers(target, Query::new(key).against(ctx.source)));
    Some(resolve_check(state, ctx, request))
}

/// Unmodified d20 against `dc`. No hooks fire.
pub fn resolve_flat(
    state: &mut GameState,
    ctx: &mut Resolution,
    roller: EntityId,
    dc: i32,
    label: impl Into<String>,
) -> Check {
    roll_check(state, ctx, CheckRequest::new(CheckKey::Flat, roller, dc, label))
}

/// Any other check keyed by a query, e.g. athletics or perception.
pub fn resolve_skill(
    state: &mut GameState,
    ctx: &mut Resolution,
    unit: EntityId,
    key: QueryKey,
    dc: i32,
    label: impl Into<String>,
) -> Option<Check> {
    let base = state.unit(unit)?.stats.base_for(key);
    let mut request = CheckRequest::new(CheckKey::Query(key), unit, dc, label).against(ctx.source);
    if base != 0 {
        request.modifiers.untyped(base, "base");
    }
    request
        .modifiers
        .merge(&state.query_modifiers(unit, Query::new(key).against(ctx.source)));
    Some(resolve_check(state, ctx, request))
}

/// Attack roll against the defender's armor class.
///
/// `bonus` is an extra untyped bonus such as a multi-attack adjustment.
/// Returns `None` if either side is missing.
pub fn resolve_attack_roll(
    state: &mut GameState,
    ctx: &mut Resolution,
    attacker: EntityId,
    defender: EntityId,
    bonus: i32,
) -> Option<Check> {
    let att = state.unit(attacker)?;
    let def = state.unit(defender)?;
    let adjacent = att.pos.is_adjacent(def.pos);
    let base_attack = att.stats.attack;
    let dc = state.resolve_stat(defender, Query::new(QueryKey::Ac).against(Some(attacker)), def.stats.ac);

    let mut request =
        CheckRequest::new(CheckKey::Attack, attacker, dc, format!("attack {defender}")).against(Some(defender));
    request.modifiers.untyped(base_attack, "atk");
    request.modifiers.merge(
        &state.query_modifiers(attacker, Query::new(QueryKey::AttackBonus).against(Some(defender))),
    );
    if bonus != 0 {
        request.modifiers.untyped(bonus, "multi_atk");
    }
    if state.has(attacker, QueryKey::Blind) {
        request.disadvantage += 1;
    }
    if adjacent && state.has(defender, QueryKey::Prone) {
        request.advantage += 1;
    }

    ctx.pending_check = Some(request.clone());
    fire(state, attacker, Hook::BeforeAttackRoll, ctx);
    fire(state, defender, Hook::BeforeDefendRoll, ctx);
    let request = ctx.pending_check.take().unwrap_or(request);

    let check = roll_check(state, ctx, request);
    fire(state, attacker, Hook::AfterAttackRoll, ctx);
    fire(state, defender, Hook::AfterDefendRoll, ctx);
    Some(check)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Target;
    use crate::modifier::Modifier;
    use crate::state::UnitSpec;
    use crate::primitives::Pos;

    fn state() -> GameState {
        GameState::for_tests(GameConfig::with_seed(11))
    }

    fn forced(state: &mut GameState, natural: u32, modifier: i32, dc: i32) -> Check {
        state.rng.push_script([natural - 1]);
        state.with_resolution(None, Target::None, |state, ctx| {
            let mut request = CheckRequest::new(CheckKey::Query(QueryKey::Athletics), EntityId::PLAYER, dc, "t");
            request.modifiers.untyped(modifier, "mod");
            roll_check(state, ctx, request)
        })
    }

    #[test]
    fn natural_one_always_fails() {
        let mut state = state();
        for dc in 0..=40 {
            for modifier in [-5, 0, 10, 50] {
                assert!(!forced(&mut state, 1, modifier, dc).success());
            }
        }
    }

    #[test]
    fn natural_twenty_always_succeeds() {
        let mut state = state();
        for dc in 0..=40 {
            for modifier in [-50, -10, 0, 5] {
                assert!(forced(&mut state, 20, modifier, dc).success());
            }
        }
    }

    #[test]
    fn otherwise_total_meets_dc() {
        let mut state = state();
        for natural in 2..=19 {
            for dc in 0..=40 {
                let check = forced(&mut state, natural, 3, dc);
                assert_eq!(check.total(), natural as i32 + 3);
                assert_eq!(check.success(), check.total() >= dc);
            }
        }
    }

    #[test]
    fn same_category_modifiers_do_not_double_count() {
        let mut state = state();
        state.rng.push_script([9]);
        let check = state.with_resolution(None, Target::None, |state, ctx| {
            let mut request = CheckRequest::new(CheckKey::Attack, EntityId::PLAYER, 14, "t");
            request.modifiers.add(Modifier::status(1, "bless"));
            request.modifiers.add(Modifier::status(2, "heroism"));
            roll_check(state, ctx, request)
        });
        assert_eq!(check.total(), 12);
        assert!(!check.success());
    }

    #[test]
    fn advantage_keeps_the_higher_die() {
        let mut state = state();
        state.rng.push_script([3, 15]);
        let check = state.with_resolution(None, Target::None, |state, ctx| {
            let mut request = CheckRequest::new(CheckKey::Attack, EntityId::PLAYER, 10, "t");
            request.advantage = 2;
            request.disadvantage = 1;
            roll_check(state, ctx, request)
        });
        assert_eq!(check.rolls(), &[4, 16]);
        assert_eq!(check.base(), 16);
    }

    #[test]
    fn disadvantage_keeps_the_lower_die_and_equal_counts_cancel() {
        let mut state = state();
        state.rng.push_script([3, 15]);
        let low = state.with_resolution(None, Target::None, |state, ctx| {
            let mut request = CheckRequest::new(CheckKey::Attack, EntityId::PLAYER, 10, "t");
            request.disadvantage = 1;
            roll_check(state, ctx, request)
        });
        assert_eq!(low.base(), 4);

        state.rng.push_script([7]);
        let single = state.with_resolution(None, Target::None, |state, ctx| {
            let mut request = CheckRequest::new(CheckKey::Attack, EntityId::PLAYER, 10, "t");
            request.advantage = 1;
            request.disadvantage = 1;
            roll_check(state, ctx, request)
        });
        assert_eq!(single.rolls(), &[8]);
    }

    #[test]
    fn forced_result_beats_natural_rolls() {
        let mut state = state();
        state.rng.push_script([19]);
        let check = state.with_resolution(None, Target::None, |state, ctx| {
            let mut request = CheckRequest::new(CheckKey::Attack, EntityId::PLAYER, 5, "t");
            request.forced = Some(false);
            roll_check(state, ctx, request)
        });
        assert!(check.is_natural_20());
        assert!(!check.success());
    }

    #[test]
    fn saves_use_base_stat_and_log_their_key() {
        let mut state = state();
        let mut spec = UnitSpec::new("ogre", 20);
        spec.stats.fortitude = 4;
        let ogre = state.spawn_unit(&spec, Pos::new(3, 3)).unwrap();
        state.rng.push_script([9]);
        let check = state
            .with_resolution(None, Target::Unit(ogre), |state, ctx| {
                resolve_save(state, ctx, ogre, SaveKind::Fortitude, 14, "poison")
            })
            .unwrap();
        assert_eq!(check.key(), CheckKey::Query(QueryKey::FortitudeSave));
        assert_eq!(check.total(), 14);
        assert!(check.success());
        let entry = state.journal.tagged("check").last().unwrap();
        assert!(entry.msg.starts_with("fortitude_save"));
    }
}
