//! Unit templates by name.
use std::collections::BTreeMap;

use tactics_core::{BrickRegistry, DamageType, Dice, DiceFormula, Faction, StatBlock, UnitSpec};

use crate::error::LoadError;

/// Named [`UnitSpec`]s the driver can spawn.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct TemplateBook {
    templates: BTreeMap<String, UnitSpec>,
}

impl TemplateBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// `player`, `goblin`, `dummy` and `defender`.
    pub fn builtin() -> Self {
        let mut book = Self::new();
        book.insert(
            UnitSpec::new("player", 30)
                .with_faction(Faction::Player)
                .with_stats(StatBlock {
                    level: 3,
                    ac: 15,
                    attack: 5,
                    fortitude: 4,
                    reflex: 4,
                    will: 4,
                    initiative: 3,
                    damage: DiceFormula::from(Dice::new(1, 8, 2)),
                    damage_type: DamageType::Slashing,
                })
                .with_abilities([
                    "fireball",
                    "acid_arrow",
                    "magic_missile",
                    "cure_light_wounds",
                    "create_grease",
                    "grant+bless",
                    "grant+shield",
                    "grant+heroism",
                ]),
        );
        book.insert(
            UnitSpec::new("goblin", 8)
                .with_stats(StatBlock {
                    ac: 13,
                    attack: 3,
                    reflex: 2,
                    initiative: 2,
                    damage: DiceFormula::from(Dice::d(6)),
                    damage_type: DamageType::Slashing,
                    ..StatBlock::default()
                })
                .with_tag("evil"),
        );
        book.insert(
            UnitSpec::new("dummy", 100)
                .with_faction(Faction::Neutral)
                .with_stats(StatBlock {
                    ac: 5,
                    ..StatBlock::default()
                }),
        );
        book.insert(Self::defender());
        book
    }

    /// What `spawn_defender` summons.
    pub fn defender() -> UnitSpec {
        UnitSpec::new("defender", 12).with_stats(StatBlock {
            ac: 16,
            attack: 2,
            fortitude: 3,
            damage: DiceFormula::from(Dice::d(4)),
            ..StatBlock::default()
        })
    }

    /// Keyed by the unit's template name; replaces any previous entry.
    pub fn insert(&mut self, spec: UnitSpec) {
        self.templates.insert(spec.template.clone(), spec);
    }

    pub fn get(&self, name: &str) -> Result<&UnitSpec, LoadError> {
        self.templates
            .get(name)
            .ok_or_else(|| LoadError::UnknownTemplate(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Every fact and ability a template names must resolve.
    pub fn validate(&self, registry: &BrickRegistry) -> Result<(), LoadError> {
        for (name, spec) in &self.templates {
            for id in &spec.facts {
                registry.resolve(id).map_err(|source| LoadError::UnresolvedFact {
                    template: name.clone(),
                    id: id.clone(),
                    source,
                })?;
            }
            for id in &spec.abilities {
                registry
                    .resolve_action(id)
                    .map_err(|source| LoadError::UnknownAbility {
                        template: name.clone(),
                        id: id.clone(),
                        source,
                    })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_book_has_the_four_templates() {
        let book = TemplateBook::builtin();
        assert_eq!(book.names().collect::<Vec<_>>(), ["defender", "dummy", "goblin", "player"]);
        assert_eq!(book.get("player").unwrap().faction, Faction::Player);
        assert!(matches!(book.get("dragon"), Err(LoadError::UnknownTemplate(_))));
    }
}
