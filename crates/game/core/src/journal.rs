//! Narration lines and the structured resolution log.
//!
//! The structured log is part of the engine's contract: every check, attack,
//! damage application, heal, death, fact change and area event leaves one
//! tagged [`LogEntry`] carrying its full numeric breakdown. Drivers drain the
//! journal into each response.
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

use crate::check::Check;
use crate::damage::DamageType;
use crate::primitives::DiceFormula;
use crate::state::{AreaId, EntityId};

/// Structured payload of one log entry. The entry tag is the variant name.
#[derive(Clone, Debug, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum LogRecord {
    Check(Check),
    Attack(AttackRecord),
    Damage(DamageRecord),
    Heal(HealRecord),
    Death(DeathRecord),
    Fact(FactChange),
    Area(AreaChange),
}

impl LogRecord {
    /// `check`, `attack`, `damage`, ...
    pub fn tag(&self) -> &'static str {
        self.into()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttackRecord {
    pub attacker: EntityId,
    pub defender: EntityId,
    pub hit: bool,
    pub check: Check,
    /// Total damage dealt by the hit, if it landed on a living target.
    pub damage: Option<i32>,
}

/// One component's breakdown inside a [`DamageRecord`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DamageRoll {
    pub formula: DiceFormula,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub damage_type: DamageType,
    pub rolled: i32,
    pub reduced: i32,
    pub absorbed: i32,
    pub halved: bool,
    pub doubled: bool,
    pub persistent: bool,
    #[cfg_attr(feature = "serde", serde(rename = "final"))]
    pub final_amount: i32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DamageRecord {
    pub source: Option<EntityId>,
    pub target: EntityId,
    pub rolls: Vec<DamageRoll>,
    pub total: i32,
    pub hp_before: i32,
    pub hp_after: i32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HealRecord {
    pub source: Option<EntityId>,
    pub target: EntityId,
    pub amount: i32,
    pub hp_before: i32,
    pub hp_after: i32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeathRecord {
    pub entity: EntityId,
    pub killer: Option<EntityId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FactEvent {
    Added,
    Stacked,
    Refreshed,
    Unstacked,
    Removed,
    Expired,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FactChange {
    pub entity: EntityId,
    pub brick: String,
    pub event: FactEvent,
    pub stacks: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AreaEvent {
    Placed,
    Enter,
    Exit,
    Faded,
    Removed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AreaChange {
    pub area: AreaId,
    pub name: String,
    pub event: AreaEvent,
    pub unit: Option<EntityId>,
}

/// A tagged log entry as it goes over the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogEntry {
    pub tag: String,
    pub msg: String,
    pub data: LogRecord,
}

/// Accumulates narration and log entries until a driver drains them.
#[derive(Clone, Debug, Default)]
pub struct Journal {
    plines: Vec<String>,
    entries: Vec<LogEntry>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a narration line.
    pub fn pline(&mut self, line: impl Into<String>) {
        self.plines.push(line.into());
    }

    pub fn log(&mut self, record: LogRecord, msg: impl Into<String>) {
        self.entries.push(LogEntry {
            tag: record.tag().to_string(),
            msg: msg.into(),
            data: record,
        });
    }

    pub fn plines(&self) -> &[String] {
        &self.plines
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Entries carrying `tag`.
    pub fn tagged<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a LogEntry> + 'a {
        self.entries.iter().filter(move |e| e.tag == tag)
    }

    pub fn is_empty(&self) -> bool {
        self.plines.is_empty() && self.entries.is_empty()
    }

    /// Hand everything collected so far to the caller and start over.
    pub fn drain(&mut self) -> (Vec<String>, Vec<LogEntry>) {
        (
            std::mem::take(&mut self.plines),
            std::mem::take(&mut self.entries),
        )
    }

    pub fn clear(&mut self) {
        self.plines.clear();
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_follows_variant() {
        let record = LogRecord::Death(DeathRecord {
            entity: EntityId(4),
            killer: None,
        });
        assert_eq!(record.tag(), "death");

        let mut journal = Journal::new();
        journal.log(record, "#4 dies");
        journal.pline("The goblin is killed!");
        assert_eq!(journal.tagged("death").count(), 1);

        let (plines, entries) = journal.drain();
        assert_eq!(plines, vec!["The goblin is killed!".to_string()]);
        assert_eq!(entries[0].tag, "death");
        assert!(journal.is_empty());
    }
}
