//! Key/value broadcast over an entity's facts.
//!
//! Asking for a quantity means asking every live fact on the entity (and every
//! area it stands in) for an opinion and merging the answers. Nothing here
//! knows which bricks care about which key; content only answers what it
//! recognises.
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::brick::QueryCx;
use crate::fact::FactData;
use crate::modifier::{Modifier, Modifiers};
use crate::state::{EntityId, GameState};

/// Every quantity the engine or content may ask about.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, AsRefStr, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum QueryKey {
    Ac,
    AttackBonus,
    DamageBonus,
    FortitudeSave,
    ReflexSave,
    WillSave,
    Athletics,
    Perception,
    Speed,
    LightRadius,
    MaxHp,
    Initiative,
    Paralyzed,
    Blind,
    Prone,
    Nauseated,
    Flying,
    Resistance,
    Immunity,
    Proficiency,
    SpellDc,
    Regeneration,
}

/// One brick's opinion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Answer {
    Modifier(Modifier),
    Int(i32),
    Flag(bool),
}

impl Answer {
    pub fn as_int(&self) -> i32 {
        match self {
            Self::Modifier(m) => m.value,
            Self::Int(n) => *n,
            Self::Flag(b) => i32::from(*b),
        }
    }

    pub fn as_flag(&self) -> bool {
        match self {
            Self::Flag(b) => *b,
            other => other.as_int() != 0,
        }
    }
}

/// How several answers to one key are folded together.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum MergeStrategy {
    /// Last answer wins.
    Replace,
    Max,
    Min,
    Sum,
    Or,
    And,
}

impl MergeStrategy {
    fn fold(self, answers: Vec<Answer>) -> Option<Answer> {
        let mut iter = answers.into_iter();
        let first = iter.next()?;
        Some(match self {
            Self::Replace => iter.last().unwrap_or(first),
            Self::Max => Answer::Int(iter.fold(first.as_int(), |acc, a| acc.max(a.as_int()))),
            Self::Min => Answer::Int(iter.fold(first.as_int(), |acc, a| acc.min(a.as_int()))),
            Self::Sum => Answer::Int(iter.fold(first.as_int(), |acc, a| acc + a.as_int())),
            Self::Or => Answer::Flag(iter.fold(first.as_flag(), |acc, a| acc || a.as_flag())),
            Self::And => Answer::Flag(iter.fold(first.as_flag(), |acc, a| acc && a.as_flag())),
        })
    }
}

/// A question: key, optional argument, optional counterpart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Query<'a> {
    pub key: QueryKey,
    pub arg: Option<&'a str>,
    pub against: Option<EntityId>,
}

impl<'a> Query<'a> {
    pub const fn new(key: QueryKey) -> Self {
        Self {
            key,
            arg: None,
            against: None,
        }
    }

    pub const fn arg(mut self, arg: &'a str) -> Self {
        self.arg = Some(arg);
        self
    }

    pub const fn against(mut self, other: Option<EntityId>) -> Self {
        self.against = other;
        self
    }
}

impl From<QueryKey> for Query<'_> {
    fn from(key: QueryKey) -> Self {
        Self::new(key)
    }
}

const NO_DATA: FactData = FactData::None;

impl GameState {
    /// Every opinion on `query`: the entity's live facts in registration
    /// order, then the areas it occupies in creation order.
    pub fn answers(&self, entity: EntityId, query: Query<'_>) -> Vec<Answer> {
        let Some(unit) = self.unit(entity) else {
            return Vec::new();
        };

        let from_facts = unit.live_facts().filter_map(|fact| {
            fact.brick().query(&QueryCx {
                state: self,
                entity,
                key: query.key,
                arg: query.arg,
                against: query.against,
                stacks: fact.stacks(),
                data: &fact.data,
                area: None,
            })
        });

        let from_areas = self
            .areas()
            .filter(|area| area.is_active() && area.occupants.contains(&entity))
            .filter_map(|area| {
                area.brick.query(&QueryCx {
                    state: self,
                    entity,
                    key: query.key,
                    arg: query.arg,
                    against: query.against,
                    stacks: 1,
                    data: &NO_DATA,
                    area: Some(area.id),
                })
            });

        from_facts.chain(from_areas).collect()
    }

    /// Modifier answers under the stacking rules; bare integers count as untyped.
    pub fn query_modifiers<'a>(&self, entity: EntityId, query: impl Into<Query<'a>>) -> Modifiers {
        let query = query.into();
        let mut mods = Modifiers::new();
        for answer in self.answers(entity, query) {
            match answer {
                Answer::Modifier(m) => {
                    mods.add(m);
                }
                Answer::Int(n) => mods.untyped(n, query.key.as_ref()),
                Answer::Flag(_) => {}
            }
        }
        mods
    }

    pub fn query<'a>(
        &self,
        entity: EntityId,
        query: impl Into<Query<'a>>,
        merge: MergeStrategy,
    ) -> Option<Answer> {
        merge.fold(self.answers(entity, query.into()))
    }

    /// True if anything answers yes. Missing entity or no opinion is false.
    pub fn has(&self, entity: EntityId, key: QueryKey) -> bool {
        self.query(entity, key, MergeStrategy::Or)
            .is_some_and(|a| a.as_flag())
    }

    /// False if anything answers no. No opinion is true.
    pub fn allows(&self, entity: EntityId, key: QueryKey) -> bool {
        self.query(entity, key, MergeStrategy::And)
            .is_none_or(|a| a.as_flag())
    }

    /// `base` plus the stacked modifiers for `query`.
    pub fn resolve_stat<'a>(&self, entity: EntityId, query: impl Into<Query<'a>>, base: i32) -> i32 {
        base + self.query_modifiers(entity, query).calculate()
    }
}
