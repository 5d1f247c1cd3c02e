//! Facts bind a brick to an entity and carry everything per-holder.
//!
//! Removal is two-phase. [`GameState::remove_fact`] marks the fact, which
//! hides it from queries and hooks at once; the vector entry is dropped later
//! by [`GameState::cleanup_marked_facts`] at a safe point, so a hook pass that
//! is iterating a snapshot never sees the collection shift under it.
use std::fmt;
use std::sync::Arc;

use crate::brick::{Brick, DisplayMode, StackMode};
use crate::journal::{FactChange, FactEvent, LogRecord};
use crate::state::{EntityId, FactId, GameState};

/// Address of one fact: its owner plus its id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FactRef {
    pub entity: EntityId,
    pub fact: FactId,
}

impl FactRef {
    pub const fn new(entity: EntityId, fact: FactId) -> Self {
        Self { entity, fact }
    }
}

impl fmt::Display for FactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity, self.fact)
    }
}

/// Free-form per-fact payload a brick may need.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FactData {
    #[default]
    None,
    Counter(i32),
    Pool {
        remaining: i32,
    },
    /// Who put this fact here, for attribution.
    Source(EntityId),
    Flag(bool),
}

impl FactData {
    pub fn counter(&self) -> Option<i32> {
        match self {
            Self::Counter(n) => Some(*n),
            _ => None,
        }
    }

    pub fn pool(&self) -> Option<i32> {
        match self {
            Self::Pool { remaining } => Some(*remaining),
            _ => None,
        }
    }

    pub fn source(&self) -> Option<EntityId> {
        match self {
            Self::Source(id) => Some(*id),
            _ => None,
        }
    }
}

/// A brick held by one entity.
#[derive(Clone, Debug)]
pub struct Fact {
    id: FactId,
    owner: EntityId,
    brick: Arc<dyn Brick>,
    stacks: u32,
    expires_at: Option<u32>,
    pub data: FactData,
    marked: bool,
}

impl Fact {
    pub(crate) fn new(
        id: FactId,
        owner: EntityId,
        brick: Arc<dyn Brick>,
        stacks: u32,
        expires_at: Option<u32>,
    ) -> Self {
        let data = brick.create_data();
        Self {
            id,
            owner,
            brick,
            stacks,
            expires_at,
            data,
            marked: false,
        }
    }

    pub fn id(&self) -> FactId {
        self.id
    }

    pub fn owner(&self) -> EntityId {
        self.owner
    }

    pub fn fact_ref(&self) -> FactRef {
        FactRef::new(self.owner, self.id)
    }

    pub fn brick(&self) -> &Arc<dyn Brick> {
        &self.brick
    }

    pub fn brick_id(&self) -> &str {
        self.brick.id()
    }

    pub fn stacks(&self) -> u32 {
        self.stacks
    }

    /// Round at which the fact lapses; `None` is permanent.
    pub fn expires_at(&self) -> Option<u32> {
        self.expires_at
    }

    pub fn remaining_rounds(&self, now: u32) -> Option<u32> {
        self.expires_at.map(|at| at.saturating_sub(now))
    }

    pub fn is_expired(&self, now: u32) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    pub fn is_marked(&self) -> bool {
        self.marked
    }
}

fn later(a: Option<u32>, b: Option<u32>) -> Option<u32> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        _ => None,
    }
}

impl GameState {
    /// Grant `brick` to `entity` under the brick's stacking rules.
    ///
    /// Returns the id of the new or updated fact, or `None` when the entity is
    /// missing or already dead.
    pub fn add_fact(
        &mut self,
        entity: EntityId,
        brick: Arc<dyn Brick>,
        duration: Option<u32>,
        count: u32,
    ) -> Option<FactId> {
        let expires_at = duration.map(|d| self.round.saturating_add(d));
        let max = brick.max_stacks().max(1);
        let count = count.clamp(1, max);
        let mode = brick.stack_mode();

        let unit = self.units.get_mut(&entity).filter(|u| u.is_alive())?;

        if mode != StackMode::Independent {
            let existing = unit
                .facts
                .iter_mut()
                .find(|f| !f.marked && f.brick_id() == brick.id());
            if let Some(fact) = existing {
                let before = fact.stacks;
                match mode {
                    StackMode::Stack => {
                        fact.stacks = before.saturating_add(count).min(max);
                        fact.expires_at = later(fact.expires_at, expires_at);
                    }
                    StackMode::ExtendDuration => {
                        fact.expires_at = later(fact.expires_at, expires_at);
                    }
                    StackMode::ExtendStacks => {
                        fact.stacks = before.max(count);
                        fact.expires_at = later(fact.expires_at, expires_at);
                    }
                    StackMode::Replace | StackMode::Independent => {
                        fact.stacks = count;
                        fact.expires_at = expires_at;
                    }
                }
                let after = fact.stacks;
                let fact_ref = fact.fact_ref();
                let event = if after > before {
                    FactEvent::Stacked
                } else {
                    FactEvent::Refreshed
                };
                self.log_fact(fact_ref, brick.as_ref(), event, after);
                if after > before {
                    brick.on_stack_added(fact_ref, self);
                }
                return Some(fact_ref.fact);
            }
        }

        let id = self.allocate_fact_id();
        let fact = Fact::new(id, entity, Arc::clone(&brick), count, expires_at);
        let fact_ref = fact.fact_ref();
        self.units.get_mut(&entity)?.facts.push(fact);
        self.log_fact(fact_ref, brick.as_ref(), FactEvent::Added, count);
        brick.on_fact_added(fact_ref, self);
        Some(id)
    }

    /// Mark a fact for removal and fire its removal hook once.
    ///
    /// Returns false if the fact is already gone or marked.
    pub fn remove_fact(&mut self, fact: FactRef) -> bool {
        self.retire(fact, FactEvent::Removed)
    }

    fn retire(&mut self, fact_ref: FactRef, event: FactEvent) -> bool {
        let Some(fact) = self.live_fact_mut(fact_ref) else {
            return false;
        };
        fact.marked = true;
        let brick = Arc::clone(&fact.brick);
        let stacks = fact.stacks;
        self.pending_cleanup.insert(fact_ref.entity);
        self.log_fact(fact_ref, brick.as_ref(), event, stacks);
        brick.on_fact_removed(fact_ref, self);
        true
    }

    /// Take `count` stacks off the entity's fact for `brick_id`, removing it at zero.
    pub fn remove_stack(&mut self, entity: EntityId, brick_id: &str, count: u32) -> bool {
        let Some(fact) = self
            .units
            .get_mut(&entity)
            .and_then(|u| u.facts.iter_mut().find(|f| !f.marked && f.brick_id() == brick_id))
        else {
            return false;
        };
        fact.stacks = fact.stacks.saturating_sub(count.max(1));
        let left = fact.stacks;
        let fact_ref = fact.fact_ref();
        let brick = Arc::clone(&fact.brick);

        self.log_fact(fact_ref, brick.as_ref(), FactEvent::Unstacked, left);
        brick.on_stack_removed(fact_ref, self);
        if left == 0 {
            self.remove_fact(fact_ref);
        }
        true
    }

    /// Live fact by address.
    pub fn fact(&self, fact: FactRef) -> Option<&Fact> {
        self.units
            .get(&fact.entity)?
            .facts
            .iter()
            .find(|f| f.id == fact.fact && !f.marked)
    }

    /// Live fact by address, for bricks that keep state in [`Fact::data`].
    pub fn fact_mut(&mut self, fact: FactRef) -> Option<&mut Fact> {
        self.live_fact_mut(fact)
    }

    fn live_fact_mut(&mut self, fact: FactRef) -> Option<&mut Fact> {
        self.units
            .get_mut(&fact.entity)?
            .facts
            .iter_mut()
            .find(|f| f.id == fact.fact && !f.marked)
    }

    /// First live fact on `entity` built from `brick_id`.
    pub fn find_fact(&self, entity: EntityId, brick_id: &str) -> Option<&Fact> {
        self.facts(entity).find(|f| f.brick_id() == brick_id)
    }

    pub fn has_fact(&self, entity: EntityId, brick_id: &str) -> bool {
        self.find_fact(entity, brick_id).is_some()
    }

    /// Live facts of `entity` in registration order; empty if it does not exist.
    pub fn facts(&self, entity: EntityId) -> impl Iterator<Item = &Fact> {
        self.units
            .get(&entity)
            .into_iter()
            .flat_map(|u| u.live_facts())
    }

    /// Remove every fact of `entity` whose duration has run out.
    pub fn expire_facts(&mut self, entity: EntityId) -> usize {
        let round = self.round;
        let expired: Vec<FactRef> = self
            .facts(entity)
            .filter(|f| f.is_expired(round))
            .map(Fact::fact_ref)
            .collect();
        expired
            .into_iter()
            .filter(|&f| self.retire(f, FactEvent::Expired))
            .count()
    }

    /// Physically drop marked facts.
    pub fn cleanup_marked_facts(&mut self) {
        let pending = std::mem::take(&mut self.pending_cleanup);
        for entity in pending {
            if let Some(unit) = self.units.get_mut(&entity) {
                unit.facts.retain(|f| !f.marked);
            }
        }
    }

    /// Display names of the entity's visible facts: `name`, `name 2`, `name (3 left)`.
    pub fn buff_names(&self, entity: EntityId) -> Vec<String> {
        let round = self.round;
        self.facts(entity)
            .filter_map(|fact| {
                let brick = fact.brick();
                let mode = brick.display_mode();
                if !mode.contains(DisplayMode::SHOW_NAME) {
                    return None;
                }
                let mut name = brick.display_name().to_string();
                if mode.contains(DisplayMode::SHOW_STACKS) && fact.stacks > 1 {
                    name.push_str(&format!(" {}", fact.stacks));
                }
                if mode.contains(DisplayMode::SHOW_DURATION)
                    && let Some(left) = fact.remaining_rounds(round)
                {
                    name.push_str(&format!(" ({left} left)"));
                }
                Some(name)
            })
            .collect()
    }

    fn log_fact(&mut self, fact: FactRef, brick: &dyn Brick, event: FactEvent, stacks: u32) {
        tracing::debug!(
            target: "tactics::facts",
            entity = %fact.entity,
            brick = brick.id(),
            ?event,
            stacks,
            "fact changed"
        );
        let msg = format!("{} {} {}", fact.entity, event, brick.id());
        self.journal.log(
            LogRecord::Fact(FactChange {
                entity: fact.entity,
                brick: brick.id().to_string(),
                event,
                stacks,
            }),
            msg,
        );
    }
}
