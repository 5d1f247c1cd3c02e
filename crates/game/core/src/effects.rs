//! Composite resolutions built from checks and damage: weapon attacks,
//! spell attacks, direct strikes and area bursts.
use crate::check::{SaveKind, resolve_attack_roll, resolve_save};
use crate::context::{Resolution, Target};
use crate::damage::{DamageComponent, DamageReport, resolve_damage};
use crate::journal::{AttackRecord, LogRecord};
use crate::primitives::Pos;
use crate::query::{Query, QueryKey};
use crate::state::{EntityId, GameState};

/// A save offered against an effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SaveSpec {
    pub kind: SaveKind,
    pub dc: i32,
}

impl SaveSpec {
    pub const fn new(kind: SaveKind, dc: i32) -> Self {
        Self { kind, dc }
    }
}

fn hit_line(state: &GameState, attacker: EntityId, defender: EntityId, hit: bool) -> Option<String> {
    let att = state.unit(attacker)?;
    let def = state.unit(defender)?;
    let verb = if hit { "hit" } else { "miss" };
    Some(if att.is_player() {
        format!("You {verb} {}.", def.the())
    } else if def.is_player() {
        format!("{} {verb}s!", att.the_cap())
    } else {
        format!("{} {verb}s {}.", att.the_cap(), def.the())
    })
}

/// Roll to hit, then apply `components` on a hit. Logs one `attack` entry.
fn attack_with(
    state: &mut GameState,
    ctx: &mut Resolution,
    attacker: EntityId,
    defender: EntityId,
    components: Vec<DamageComponent>,
) -> Option<bool> {
    // the attack entry carries the check
    ctx.silent = true;
    let check = resolve_attack_roll(state, ctx, attacker, defender, 0)?;
    ctx.silent = false;
    let hit = check.success();

    if let Some(line) = hit_line(state, attacker, defender, hit) {
        state.journal.pline(line);
    }
    let damage = if hit {
        ctx.damage.extend(components);
        resolve_damage(state, ctx).map(|report| report.total)
    } else {
        None
    };

    let msg = format!(
        "{attacker} -> {defender}: {} vs {} {}",
        check.total(),
        check.dc(),
        if hit { "hit" } else { "miss" }
    );
    state.journal.log(
        LogRecord::Attack(AttackRecord {
            attacker,
            defender,
            hit,
            check,
            damage,
        }),
        msg,
    );
    Some(hit)
}

/// Melee attack with the attacker's natural weapon from its stat block.
pub fn weapon_attack(state: &mut GameState, attacker: EntityId, defender: EntityId) -> Option<bool> {
    let unit = state.unit(attacker)?;
    let mut component = DamageComponent::new(unit.stats.damage.clone(), unit.stats.damage_type);
    let bonus = state.query_modifiers(attacker, Query::new(QueryKey::DamageBonus).against(Some(defender)));
    component.modifiers.merge(&bonus);

    state.with_resolution(Some(attacker), Target::Unit(defender), |state, ctx| {
        ctx.melee = true;
        ctx.weapon_attack = true;
        attack_with(state, ctx, attacker, defender, vec![component])
    })
}

/// Ranged spell attack: roll to hit, apply `components` on a hit.
pub fn spell_attack(
    state: &mut GameState,
    source: EntityId,
    target: EntityId,
    ability: &str,
    components: Vec<DamageComponent>,
) -> Option<bool> {
    state.with_resolution(Some(source), Target::Unit(target), |state, ctx| {
        ctx.ability = Some(ability.to_string());
        attack_with(state, ctx, source, target, components)
    })
}

/// Apply damage directly, optionally behind a save.
///
/// A missing or dead target is `None` before anything is rolled or logged.
pub fn strike(
    state: &mut GameState,
    source: Option<EntityId>,
    target: EntityId,
    components: Vec<DamageComponent>,
    save: Option<SaveSpec>,
    label: &str,
) -> Option<DamageReport> {
    if !state.unit(target)?.is_alive() {
        return None;
    }
    state.with_resolution(source, Target::Unit(target), |state, ctx| {
        ctx.ability = Some(label.to_string());
        if let Some(save) = save {
            resolve_save(state, ctx, target, save.kind, save.dc, label)?;
        }
        ctx.damage = components;
        resolve_damage(state, ctx)
    })
}

/// Area burst: every living unit on the footprint except the source gets its
/// own save and damage resolution, in spawn order.
pub fn burst(
    state: &mut GameState,
    source: Option<EntityId>,
    center: Pos,
    radius: i32,
    components: &[DamageComponent],
    save: Option<SaveSpec>,
    label: &str,
) -> Vec<DamageReport> {
    let footprint: Vec<Pos> = Pos::burst(center, radius).collect();
    let victims: Vec<EntityId> = state
        .units()
        .filter(|u| u.is_alive() && Some(u.id) != source && footprint.contains(&u.pos))
        .map(|u| u.id)
        .collect();
    tracing::debug!(target: "tactics::effects", label, %center, radius, victims = victims.len(), "burst");

    victims
        .into_iter()
        .filter_map(|victim| strike(state, source, victim, components.to_vec(), save, label))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::damage::DamageType;
    use crate::primitives::DiceFormula;
    use crate::state::{Faction, UnitSpec};

    fn fire(n: i32) -> DamageComponent {
        DamageComponent::new(DiceFormula::flat(n), DamageType::Fire)
    }

    #[test]
    fn burst_skips_the_source_and_logs_once_per_victim() {
        let mut state = GameState::for_tests(GameConfig::with_seed(2));
        let caster = state.spawn_player(&UnitSpec::new("player", 30).with_faction(Faction::Player), Pos::new(5, 5));
        for pos in [Pos::new(4, 4), Pos::new(6, 5), Pos::new(5, 6)] {
            state.spawn_unit(&UnitSpec::new("dummy", 50), pos);
        }
        state.spawn_unit(&UnitSpec::new("dummy", 50), Pos::new(9, 9));

        let reports = burst(&mut state, Some(caster), Pos::new(5, 5), 1, &[fire(6)], None, "test burst");

        assert_eq!(reports.len(), 3);
        let damage: Vec<_> = state.journal.tagged("damage").collect();
        assert_eq!(damage.len(), 3);
        assert_eq!(state.player().unwrap().hp.current, 30);
        assert!(reports.iter().all(|r| r.total == 6 && r.source == Some(caster)));
    }

    #[test]
    fn half_on_save_halves_the_hit() {
        let mut state = GameState::for_tests(GameConfig::with_seed(2));
        let dummy = state.spawn_unit(&UnitSpec::new("dummy", 50), Pos::new(1, 1)).unwrap();
        state.rng.push_script([19]);
        let report = strike(
            &mut state,
            None,
            dummy,
            vec![fire(9).half_on_save()],
            Some(SaveSpec::new(SaveKind::Reflex, 30)),
            "fire",
        )
        .unwrap();
        assert_eq!(report.total, 4);
    }

    #[test]
    fn striking_a_dead_target_rolls_and_logs_nothing() {
        let mut state = GameState::for_tests(GameConfig::with_seed(2));
        let dummy = state.spawn_unit(&UnitSpec::new("dummy", 10), Pos::new(1, 1)).unwrap();
        assert!(state.kill(dummy, None));
        state.journal.clear();
        let rng_before = state.rng.state();

        let report = strike(
            &mut state,
            None,
            dummy,
            vec![fire(9).half_on_save()],
            Some(SaveSpec::new(SaveKind::Reflex, 15)),
            "fire",
        );

        assert!(report.is_none());
        assert!(state.journal.is_empty());
        assert_eq!(state.rng.state(), rng_before);
    }

    #[test]
    fn weapon_attacks_log_one_attack_entry_with_the_check_inside() {
        let mut state = GameState::for_tests(GameConfig::with_seed(2));
        let hero = state.spawn_player(&UnitSpec::new("player", 30).with_faction(Faction::Player), Pos::new(1, 1));
        let gob = state.spawn_unit(&UnitSpec::new("goblin", 30), Pos::new(2, 1)).unwrap();
        state.rng.push_script([19]);
        assert_eq!(weapon_attack(&mut state, hero, gob), Some(true));
        assert_eq!(state.journal.tagged("attack").count(), 1);
        assert_eq!(state.journal.tagged("check").count(), 0);
        assert_eq!(state.journal.tagged("damage").count(), 1);
        assert_eq!(state.journal.plines().last().map(String::as_str), Some("You hit the goblin."));
    }
}
