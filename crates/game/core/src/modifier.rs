//! Typed numeric contributions and their stacking rules.
//!
//! Stacking is enforced here and nowhere else:
//! - every typed category keeps only its single highest value (penalty
//!   categories included, so the least severe penalty applies);
//! - [`ModifierCategory::UntypedStackable`] entries all add;
//! - an [`ModifierCategory::Override`] replaces the whole total, the one with
//!   the highest priority winning.
use std::collections::BTreeMap;
use std::fmt;

use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Bonus type of a modifier.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, AsRefStr, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ModifierCategory {
    UntypedStackable,
    CircumstanceBonus,
    CircumstancePenalty,
    ItemBonus,
    ItemPenalty,
    StatusBonus,
    StatusPenalty,
    Override,
}

impl ModifierCategory {
    pub const fn is_typed(self) -> bool {
        !matches!(self, Self::UntypedStackable | Self::Override)
    }
}

/// A single typed numeric contribution.
///
/// `why` is a human-readable source label for diagnostics; it never affects resolution.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Modifier {
    pub category: ModifierCategory,
    pub value: i32,
    pub why: String,
    pub priority: i32,
}

impl Modifier {
    pub fn new(category: ModifierCategory, value: i32, why: impl Into<String>) -> Self {
        Self {
            category,
            value,
            why: why.into(),
            priority: 0,
        }
    }

    pub fn untyped(value: i32, why: impl Into<String>) -> Self {
        Self::new(ModifierCategory::UntypedStackable, value, why)
    }

    pub fn circumstance(value: i32, why: impl Into<String>) -> Self {
        let category = if value < 0 {
            ModifierCategory::CircumstancePenalty
        } else {
            ModifierCategory::CircumstanceBonus
        };
        Self::new(category, value, why)
    }

    pub fn status(value: i32, why: impl Into<String>) -> Self {
        let category = if value < 0 {
            ModifierCategory::StatusPenalty
        } else {
            ModifierCategory::StatusBonus
        };
        Self::new(category, value, why)
    }

    pub fn item(value: i32, why: impl Into<String>) -> Self {
        let category = if value < 0 {
            ModifierCategory::ItemPenalty
        } else {
            ModifierCategory::ItemBonus
        };
        Self::new(category, value, why)
    }

    pub fn overriding(value: i32, priority: i32, why: impl Into<String>) -> Self {
        Self {
            priority,
            ..Self::new(ModifierCategory::Override, value, why)
        }
    }

    pub fn label(&self) -> String {
        format!("{} :{}", self.why, self.category)
    }
}

/// Aggregate of modifiers applying to one quantity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Modifiers {
    stackable: Vec<Modifier>,
    typed: BTreeMap<ModifierCategory, Modifier>,
    override_mod: Option<Modifier>,
}

impl Modifiers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a modifier under the stacking rules. Returns true if it now contributes.
    pub fn add(&mut self, modifier: Modifier) -> bool {
        match modifier.category {
            ModifierCategory::Override => {
                let replace = self
                    .override_mod
                    .as_ref()
                    .is_none_or(|current| modifier.priority > current.priority);
                if replace {
                    self.override_mod = Some(modifier);
                }
                replace
            }
            ModifierCategory::UntypedStackable => {
                self.stackable.push(modifier);
                true
            }
            category => match self.typed.get(&category) {
                Some(current) if current.value >= modifier.value => false,
                _ => {
                    self.typed.insert(category, modifier);
                    true
                }
            },
        }
    }

    pub fn untyped(&mut self, value: i32, why: impl Into<String>) {
        self.add(Modifier::untyped(value, why));
    }

    pub fn remove(&mut self, modifier: &Modifier) {
        match modifier.category {
            ModifierCategory::Override => {
                if self.override_mod.as_ref() == Some(modifier) {
                    self.override_mod = None;
                }
            }
            ModifierCategory::UntypedStackable => {
                if let Some(idx) = self.stackable.iter().position(|m| m == modifier) {
                    self.stackable.remove(idx);
                }
            }
            category => {
                if self.typed.get(&category) == Some(modifier) {
                    self.typed.remove(&category);
                }
            }
        }
    }

    /// Merge another aggregate in, re-applying the stacking rules.
    pub fn merge(&mut self, other: &Modifiers) {
        for m in other.iter() {
            self.add(m.clone());
        }
        if let Some(o) = &other.override_mod {
            self.add(o.clone());
        }
    }

    pub fn calculate(&self) -> i32 {
        if let Some(o) = &self.override_mod {
            return o.value;
        }
        self.stackable.iter().map(|m| m.value).sum::<i32>()
            + self.typed.values().map(|m| m.value).sum::<i32>()
    }

    /// Contributing modifiers: untyped in insertion order, then typed by category.
    /// The override (if any) is reported separately by [`Modifiers::override_modifier`].
    pub fn iter(&self) -> impl Iterator<Item = &Modifier> {
        self.stackable.iter().chain(self.typed.values())
    }

    pub fn override_modifier(&self) -> Option<&Modifier> {
        self.override_mod.as_ref()
    }

    pub fn get(&self, category: ModifierCategory) -> Option<&Modifier> {
        self.typed.get(&category)
    }

    pub fn is_empty(&self) -> bool {
        self.stackable.is_empty() && self.typed.is_empty() && self.override_mod.is_none()
    }
}

impl fmt::Display for Modifiers {
    /// Compact breakdown such as `+2ba +1bl -1pr`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for m in self.iter().filter(|m| m.value != 0) {
            if !first {
                write!(f, " ")?;
            }
            first = false;
            let code: String = m.why.chars().take(2).collect();
            let code = if code.chars().count() < 2 { "??".to_string() } else { code };
            write!(f, "{:+}{}", m.value, code)?;
        }
        if let Some(o) = &self.override_mod {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "={}{}", o.value, o.why)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_typed_category_keeps_only_highest() {
        let mut mods = Modifiers::new();
        mods.add(Modifier::status(1, "bless"));
        mods.add(Modifier::status(2, "heroism"));
        mods.add(Modifier::status(1, "bless again"));
        assert_eq!(mods.calculate(), 2);
        assert_eq!(mods.get(ModifierCategory::StatusBonus).map(|m| m.why.as_str()), Some("heroism"));
    }

    #[test]
    fn different_categories_and_untyped_add() {
        let mut mods = Modifiers::new();
        mods.add(Modifier::status(2, "heroism"));
        mods.add(Modifier::circumstance(1, "flank"));
        mods.add(Modifier::item(1, "potency"));
        mods.untyped(3, "base");
        mods.untyped(3, "base");
        assert_eq!(mods.calculate(), 10);
    }

    #[test]
    fn penalties_keep_the_highest_value() {
        let mut mods = Modifiers::new();
        mods.add(Modifier::status(-1, "sickened"));
        mods.add(Modifier::status(-3, "frightened"));
        assert_eq!(mods.calculate(), -1);
    }

    #[test]
    fn override_wins_by_priority() {
        let mut mods = Modifiers::new();
        mods.untyped(5, "base");
        mods.add(Modifier::overriding(0, 1, "petrified"));
        mods.add(Modifier::overriding(3, 5, "mind blank"));
        mods.add(Modifier::overriding(9, 2, "ignored"));
        assert_eq!(mods.calculate(), 3);
    }

    #[test]
    fn remove_only_drops_matching_entry() {
        let mut mods = Modifiers::new();
        let shield = Modifier::circumstance(4, "shield");
        mods.add(shield.clone());
        mods.remove(&Modifier::circumstance(2, "cover"));
        assert_eq!(mods.calculate(), 4);
        mods.remove(&shield);
        assert!(mods.is_empty());
    }

    #[test]
    fn merge_reapplies_stacking() {
        let mut a = Modifiers::new();
        a.add(Modifier::status(1, "bless"));
        let mut b = Modifiers::new();
        b.add(Modifier::status(2, "heroism"));
        b.untyped(1, "misc");
        a.merge(&b);
        assert_eq!(a.calculate(), 3);
    }

    #[test]
    fn display_is_compact() {
        let mut mods = Modifiers::new();
        mods.untyped(2, "base");
        mods.add(Modifier::status(-1, "prone"));
        assert_eq!(mods.to_string(), "+2ba -1pr");
    }
}
