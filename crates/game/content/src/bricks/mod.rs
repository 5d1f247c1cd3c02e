//! Concrete bricks and their registration.
//!
//! Parameterised bricks are registered as factories under the key before
//! `+`, e.g. `energy_res` builds `energy_res+fire/10` on first use.
mod areas;
mod buffs;
mod defense;
mod logic;
mod over_time;

use std::sync::Arc;

use tactics_core::{BrickRegistry, DamageType, QueryKey, RegistryError, UnitSpec};

pub use areas::{BurningGround, Grease};
pub use buffs::{Bless, Condition, ConstantAnswer, Heroism, Shield};
pub use defense::{EnergyResist, FlatDr, Protection, ProtectionScope, SimpleDr, Ward};
pub use logic::{OnAttackHit, SpawnDefender};
pub use over_time::{PersistentDamage, Regeneration};

/// `<head>/<tail>` with an optional tail.
pub(crate) fn split_arg(arg: &str) -> (&str, Option<&str>) {
    match arg.split_once('/') {
        Some((head, tail)) => (head, Some(tail)),
        None => (arg, None),
    }
}

pub(crate) fn require<'a>(key: &str, arg: Option<&'a str>, what: &str) -> Result<&'a str, RegistryError> {
    arg.filter(|a| !a.is_empty())
        .ok_or_else(|| RegistryError::bad_argument(key, format!("needs {what}")))
}

pub(crate) fn parse_int(key: &str, raw: &str) -> Result<i32, RegistryError> {
    raw.parse()
        .map_err(|_| RegistryError::bad_argument(key, format!("'{raw}' is not a number")))
}

pub(crate) fn parse_type(key: &str, raw: &str) -> Result<DamageType, RegistryError> {
    raw.parse()
        .map_err(|_| RegistryError::bad_argument(key, format!("'{raw}' is not a damage type")))
}

/// Register every brick singleton and factory. `defender` is what
/// `spawn_defender` summons.
pub fn register(registry: &mut BrickRegistry, defender: UnitSpec) -> Result<(), RegistryError> {
    registry.register(Arc::new(Bless))?;
    registry.register(Arc::new(Heroism))?;
    registry.register(Arc::new(Shield))?;
    for (id, name, key) in [
        ("blind", "Blind", QueryKey::Blind),
        ("prone", "Prone", QueryKey::Prone),
        ("nauseated", "Nauseated", QueryKey::Nauseated),
        ("paralyzed", "Paralyzed", QueryKey::Paralyzed),
    ] {
        registry.register(Arc::new(Condition::new(id, name, key)))?;
    }
    for amount in FlatDr::AMOUNTS {
        registry.register(Arc::new(FlatDr::new(amount)))?;
    }
    for amount in Regeneration::AMOUNTS {
        registry.register(Arc::new(Regeneration::new(amount)))?;
    }
    registry.register(Arc::new(SpawnDefender::new(defender)))?;
    registry.register(Arc::new(BurningGround::new()))?;
    registry.register(Arc::new(Grease))?;

    registry.register_factory("energy_res", |arg, _| {
        let (ty, amount) = split_arg(require("energy_res", arg, "a damage type")?);
        let amount = amount.map(|a| parse_int("energy_res", a)).transpose()?;
        Ok(Arc::new(EnergyResist::new(parse_type("energy_res", ty)?, amount)))
    })?;
    registry.register_factory("dr", |arg, _| {
        let (bypass, amount) = split_arg(require("dr", arg, "a bypass")?);
        let amount = parse_int("dr", require("dr", amount, "an amount")?)?;
        Ok(Arc::new(SimpleDr::new(bypass, amount)))
    })?;
    registry.register_factory("protection", |arg, _| {
        let scope = match require("protection", arg, "a damage type")? {
            "phys" => ProtectionScope::Physical,
            ty => ProtectionScope::Type(parse_type("protection", ty)?),
        };
        Ok(Arc::new(Protection::new(scope)))
    })?;
    registry.register_factory("ward", |arg, _| {
        Ok(Arc::new(Ward::new(require("ward", arg, "an alignment")?)))
    })?;
    registry.register_factory("persistent", |arg, _| {
        let (ty, formula) = split_arg(require("persistent", arg, "a damage type")?);
        let formula = require("persistent", formula, "a dice formula")?
            .parse()
            .map_err(|e| RegistryError::bad_argument("persistent", format!("{e}")))?;
        Ok(Arc::new(PersistentDamage::new(parse_type("persistent", ty)?, formula)))
    })?;
    registry.register_factory("on_attack_hit", |arg, registry| {
        let inner = require("on_attack_hit", arg, "a brick id")?;
        // the nested id must resolve at build time
        registry.resolve(inner)?;
        Ok(Arc::new(OnAttackHit::new(inner)))
    })?;
    registry.register_factory("query", |arg, _| {
        let (key, value) = split_arg(require("query", arg, "a query key")?);
        let key: QueryKey = key
            .parse()
            .map_err(|_| RegistryError::bad_argument("query", format!("unknown key '{key}'")))?;
        let value = require("query", value, "a value")?;
        ConstantAnswer::parse(key, value)
            .map(|b| Arc::new(b) as _)
            .ok_or_else(|| RegistryError::bad_argument("query", format!("'{value}' is not a number or flag")))
    })?;

    tracing::debug!(target: "tactics::content", bricks = registry.ids().len(), factories = registry.keys().len(), "bricks registered");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tactics_core::action::{ActionBrick, CommandTarget};
    use tactics_core::effects::{strike, weapon_attack};
    use tactics_core::hooks::{Hook, fire_round};
    use tactics_core::{
        AreaSpec, DamageComponent, DamageType, DiceFormula, EntityId, Faction, GameConfig, GameState, Pos,
        QueryKey, RegistryError, UnitSpec,
    };

    use crate::abilities::CreateGrease;

    fn arena() -> (GameState, EntityId) {
        let registry = crate::default_registry().unwrap();
        let mut state = GameState::new(GameConfig::with_seed(11), registry);
        state.spawn_player(&UnitSpec::new("player", 30).with_faction(Faction::Player), Pos::new(1, 1));
        let dummy = state
            .spawn_unit(&UnitSpec::new("dummy", 100), Pos::new(6, 6))
            .unwrap();
        (state, dummy)
    }

    fn grant(state: &mut GameState, entity: EntityId, id: &str, stacks: u32) {
        let brick = state.registry().resolve(id).unwrap();
        state.add_fact(entity, brick, None, stacks);
    }

    fn flat(amount: i32, ty: DamageType) -> DamageComponent {
        DamageComponent::new(DiceFormula::flat(amount), ty)
    }

    #[test]
    fn bless_stops_at_two_stacks() {
        let (mut state, _) = arena();
        for _ in 0..3 {
            grant(&mut state, EntityId::PLAYER, "bless", 1);
        }
        assert_eq!(state.find_fact(EntityId::PLAYER, "bless").unwrap().stacks(), 2);
        assert_eq!(state.resolve_stat(EntityId::PLAYER, QueryKey::AttackBonus, 0), 2);
    }

    #[test]
    fn resistance_softens_without_negating() {
        let (mut state, dummy) = arena();
        grant(&mut state, dummy, "energy_res+fire/5", 1);
        let report = strike(&mut state, None, dummy, vec![flat(20, DamageType::Fire)], None, "test").unwrap();
        assert!(report.total > 0 && report.total < 20);
        assert_eq!(report.total, 15);

        let cold = strike(&mut state, None, dummy, vec![flat(20, DamageType::Cold)], None, "test").unwrap();
        assert_eq!(cold.total, 20);
    }

    #[test]
    fn damage_reduction_is_bypassed_by_its_type() {
        let (mut state, dummy) = arena();
        grant(&mut state, dummy, "dr+holy/5", 1);
        let plain = strike(&mut state, None, dummy, vec![flat(8, DamageType::Slashing)], None, "t").unwrap();
        assert_eq!(plain.total, 3);
        let blessed = strike(
            &mut state,
            None,
            dummy,
            vec![flat(8, DamageType::Slashing), flat(1, DamageType::Holy)],
            None,
            "t",
        )
        .unwrap();
        assert_eq!(blessed.total, 9);
    }

    #[test]
    fn protection_pool_soaks_and_shrinks() {
        let (mut state, _) = arena();
        grant(&mut state, EntityId::PLAYER, "protection+fire", 10);
        let report = strike(&mut state, None, EntityId::PLAYER, vec![flat(4, DamageType::Fire)], None, "t").unwrap();
        assert_eq!(report.total, 0);
        assert_eq!(state.find_fact(EntityId::PLAYER, "protection+fire").unwrap().stacks(), 6);
        assert!(state.journal.plines().iter().any(|l| l.contains("absorbs 4 fire")));
    }

    #[test]
    fn persistent_damage_ticks_until_a_flat_check_succeeds() {
        let (mut state, dummy) = arena();
        grant(&mut state, dummy, "persistent+acid/3", 1);

        state.rng.push_script([0]);
        fire_round(&mut state, dummy, Hook::RoundEnd);
        assert_eq!(state.unit(dummy).unwrap().hp.current, 97);
        assert!(state.has_fact(dummy, "persistent+acid/3"));

        state.rng.push_script([19]);
        fire_round(&mut state, dummy, Hook::RoundEnd);
        assert_eq!(state.unit(dummy).unwrap().hp.current, 94);
        assert!(!state.has_fact(dummy, "persistent+acid/3"));
    }

    #[test]
    fn persistent_damage_accepts_a_leading_die_count() {
        let (mut state, dummy) = arena();
        grant(&mut state, dummy, "persistent+fire/1d4", 1);
        grant(&mut state, dummy, "persistent+fire/d4", 1);
        let facts: Vec<_> = state.facts(dummy).map(|f| f.brick_id().to_string()).collect();
        assert_eq!(facts, ["persistent+fire/d4"]);
    }

    #[test]
    fn regeneration_heals_only_when_hurt() {
        let (mut state, dummy) = arena();
        grant(&mut state, dummy, "regeneration/5", 1);
        fire_round(&mut state, dummy, Hook::RoundStart);
        assert_eq!(state.journal.tagged("heal").count(), 0);

        state.set_hp(dummy, 90);
        fire_round(&mut state, dummy, Hook::RoundStart);
        assert_eq!(state.unit(dummy).unwrap().hp.current, 95);
        assert_eq!(state.resolve_stat(dummy, QueryKey::Regeneration, 0), 5);
    }

    #[test]
    fn defender_spawns_once_per_round() {
        let (mut state, dummy) = arena();
        grant(&mut state, dummy, "spawn_defender", 1);
        let before = state.unit_ids().len();

        strike(&mut state, None, dummy, vec![flat(1, DamageType::Blunt)], None, "t");
        strike(&mut state, None, dummy, vec![flat(1, DamageType::Blunt)], None, "t");
        assert_eq!(state.unit_ids().len(), before + 1);

        state.round += 1;
        strike(&mut state, None, dummy, vec![flat(1, DamageType::Blunt)], None, "t");
        assert_eq!(state.unit_ids().len(), before + 2);
        assert!(state.units().any(|u| u.template == "defender"));
    }

    #[test]
    fn attack_hits_grant_the_nested_brick() {
        let (mut state, dummy) = arena();
        state.place_unit(dummy, Pos::new(2, 1));
        grant(&mut state, EntityId::PLAYER, "on_attack_hit+prone", 1);

        state.rng.push_script([19]);
        assert_eq!(weapon_attack(&mut state, EntityId::PLAYER, dummy), Some(true));
        assert!(state.has(dummy, QueryKey::Prone));
        assert_eq!(state.find_fact(dummy, "prone").unwrap().expires_at(), None);
    }

    #[test]
    fn grease_trips_whoever_fails_the_save() {
        let (mut state, dummy) = arena();
        let at = Pos::new(6, 6);
        state.rng.push_script([0]);
        CreateGrease.execute(&mut state, EntityId::PLAYER, CommandTarget::Pos(at));

        assert!(state.is_difficult_terrain(at));
        assert!(state.is_difficult_terrain(Pos::new(6, 5)));
        assert!(!state.is_difficult_terrain(Pos::new(5, 5)));
        assert!(state.has(dummy, QueryKey::Prone));
        assert!(!state.has(EntityId::PLAYER, QueryKey::Prone));
    }

    #[test]
    fn burning_ground_burns_then_fades() {
        let (mut state, _) = arena();
        let brick = state.registry().resolve("burning_ground").unwrap();
        state.place_area(AreaSpec::burst(brick, Pos::new(1, 1), 0).lasting(2));

        state.tick_areas();
        let hp = state.player().unwrap().hp.current;
        assert!((24..=29).contains(&hp));

        state.round += 2;
        state.tick_areas();
        assert_eq!(state.player().unwrap().hp.current, hp);
        assert_eq!(state.journal.plines().last().map(String::as_str), Some("The flames around you die down."));
    }

    #[test]
    fn parameterised_ids_share_one_instance() {
        let registry = crate::default_registry().unwrap();
        let a = registry.resolve("energy_res+fire/10").unwrap();
        let b = registry.resolve("energy_res+fire/10").unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let long = registry.resolve("persistent+acid/1d6").unwrap();
        let short = registry.resolve("persistent+acid/d6").unwrap();
        assert!(Arc::ptr_eq(&long, &short));
        assert_eq!(long.id(), "persistent+acid/d6");

        assert!(matches!(
            registry.resolve("energy_res+lava"),
            Err(RegistryError::BadArgument { .. })
        ));
        assert!(matches!(
            registry.resolve("on_attack_hit+nonsense"),
            Err(RegistryError::UnknownId(_))
        ));
    }
}
