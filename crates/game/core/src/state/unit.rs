//! Units: anything that acts on the grid and can carry facts.
use strum::{AsRefStr, Display, EnumString};

use crate::damage::DamageType;
use crate::fact::Fact;
use crate::primitives::{Dice, DiceFormula, Pos};
use crate::query::QueryKey;
use crate::state::EntityId;

/// Which side a unit fights on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Faction {
    Player,
    #[default]
    Hostile,
    Neutral,
}

impl Faction {
    /// Neutral units are nobody's enemy; everyone else fights the other side.
    pub fn is_hostile_to(self, other: Faction) -> bool {
        match (self, other) {
            (Faction::Neutral, _) | (_, Faction::Neutral) => false,
            (a, b) => a != b,
        }
    }
}

/// Current, maximum and temporary hit points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HitPoints {
    pub current: i32,
    pub max: i32,
    pub temp: i32,
}

impl HitPoints {
    pub fn full(max: i32) -> Self {
        Self {
            current: max,
            max,
            temp: 0,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.current <= 0
    }

    /// Soak `amount` with temporary hit points first; returns what is left over.
    pub fn absorb_temp(&mut self, amount: i32) -> i32 {
        let soaked = self.temp.min(amount).max(0);
        self.temp -= soaked;
        amount - soaked
    }
}

/// Level-derived base numbers. Facts modify these through queries.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StatBlock {
    pub level: i32,
    pub ac: i32,
    pub attack: i32,
    pub fortitude: i32,
    pub reflex: i32,
    pub will: i32,
    pub initiative: i32,
    pub damage: DiceFormula,
    pub damage_type: DamageType,
}

impl StatBlock {
    /// Base number behind a query key, before any fact modifies it.
    pub fn base_for(&self, key: QueryKey) -> i32 {
        match key {
            QueryKey::Ac => self.ac,
            QueryKey::AttackBonus => self.attack,
            QueryKey::FortitudeSave => self.fortitude,
            QueryKey::ReflexSave => self.reflex,
            QueryKey::WillSave => self.will,
            QueryKey::Initiative => self.initiative,
            _ => 0,
        }
    }
}

impl Default for StatBlock {
    fn default() -> Self {
        Self {
            level: 1,
            ac: 10,
            attack: 0,
            fortitude: 0,
            reflex: 0,
            will: 0,
            initiative: 0,
            damage: DiceFormula::from(Dice::d(2)),
            damage_type: DamageType::Blunt,
        }
    }
}

/// Template a unit is spawned from.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct UnitSpec {
    pub template: String,
    pub name: String,
    pub hp: i32,
    pub faction: Faction,
    pub stats: StatBlock,
    /// Free-form descriptors other rules may key on (e.g. `evil`, `undead`).
    pub tags: Vec<String>,
    /// Brick ids granted permanently at spawn.
    pub facts: Vec<String>,
    /// Ability ids the unit may use.
    pub abilities: Vec<String>,
}

impl UnitSpec {
    pub fn new(template: impl Into<String>, hp: i32) -> Self {
        let template = template.into();
        Self {
            name: template.clone(),
            template,
            hp,
            ..Self::default()
        }
    }

    pub fn with_faction(mut self, faction: Faction) -> Self {
        self.faction = faction;
        self
    }

    pub fn with_stats(mut self, stats: StatBlock) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_fact(mut self, brick_id: impl Into<String>) -> Self {
        self.facts.push(brick_id.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_abilities<I, S>(mut self, abilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.abilities.extend(abilities.into_iter().map(Into::into));
        self
    }
}

/// A unit in play.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Unit {
    pub id: EntityId,
    pub name: String,
    pub template: String,
    pub pos: Pos,
    pub hp: HitPoints,
    pub stats: StatBlock,
    pub faction: Faction,
    pub tags: Vec<String>,
    pub abilities: Vec<String>,
    pub energy: i32,
    pub dead: bool,
    pub last_damaged_round: Option<u32>,
    /// Facts are persisted separately as id strings and re-resolved on load.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub(crate) facts: Vec<Fact>,
}

impl Unit {
    pub fn from_spec(id: EntityId, spec: &UnitSpec, pos: Pos) -> Self {
        Self {
            id,
            name: spec.name.clone(),
            template: spec.template.clone(),
            pos,
            hp: HitPoints::full(spec.hp),
            stats: spec.stats.clone(),
            faction: spec.faction,
            tags: spec.tags.clone(),
            abilities: spec.abilities.clone(),
            energy: 0,
            dead: false,
            last_damaged_round: None,
            facts: Vec::new(),
        }
    }

    pub fn is_player(&self) -> bool {
        self.id.is_player()
    }

    pub fn is_alive(&self) -> bool {
        !self.dead
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Facts not marked for removal, in registration order.
    pub fn live_facts(&self) -> impl Iterator<Item = &Fact> {
        self.facts.iter().filter(|f| !f.is_marked())
    }

    pub fn fact_count(&self) -> usize {
        self.live_facts().count()
    }

    /// "the goblin" / "you"
    pub fn the(&self) -> String {
        if self.is_player() {
            "you".to_string()
        } else {
            format!("the {}", self.name)
        }
    }

    /// "The goblin" / "You"
    pub fn the_cap(&self) -> String {
        let s = self.the();
        let mut chars = s.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_hp_soaks_first() {
        let mut hp = HitPoints::full(10);
        hp.temp = 4;
        assert_eq!(hp.absorb_temp(6), 2);
        assert_eq!(hp.temp, 0);
        assert_eq!(hp.absorb_temp(3), 3);
    }

    #[test]
    fn neutral_is_never_hostile() {
        assert!(Faction::Player.is_hostile_to(Faction::Hostile));
        assert!(!Faction::Hostile.is_hostile_to(Faction::Hostile));
        assert!(!Faction::Neutral.is_hostile_to(Faction::Player));
    }

    #[test]
    fn display_names() {
        let goblin = Unit::from_spec(EntityId(3), &UnitSpec::new("goblin", 6), Pos::ZERO);
        assert_eq!(goblin.the_cap(), "The goblin");
        let you = Unit::from_spec(EntityId::PLAYER, &UnitSpec::new("player", 20), Pos::ZERO);
        assert_eq!(you.the_cap(), "You");
    }
}
