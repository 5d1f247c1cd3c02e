//! Bricks: shared, stateless units of rules logic.
//!
//! A brick never stores per-entity state. Everything that differs between two
//! holders (stacks, expiry, pools, attribution) lives on the [`Fact`](crate::fact::Fact)
//! that binds the brick to its owner. Bricks are shared through `Arc` by every
//! fact that references them and are looked up by id through the
//! [`BrickRegistry`](crate::registry::BrickRegistry).
//!
//! Every hook has a no-op default, so a brick only implements what it reacts to.
use std::fmt;

use bitflags::bitflags;
use strum::{AsRefStr, Display, EnumString};

use crate::context::Resolution;
use crate::fact::{FactData, FactRef};
use crate::query::{Answer, QueryKey};
use crate::state::{AreaId, EntityId, GameState};

/// Broad role of a brick, mostly for display and diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BrickKind {
    Trait,
    Buff,
    Aura,
    Logic,
    Area,
    Equipment,
}

/// What happens when a brick is granted to an entity that already holds it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum StackMode {
    /// Every grant creates a new fact.
    #[default]
    Independent,
    /// Stacks add up to the brick's maximum.
    Stack,
    /// Keeps the later expiry; stacks are untouched.
    ExtendDuration,
    /// Raises stacks to the granted count when that is higher.
    ExtendStacks,
    /// Overwrites stacks and expiry.
    Replace,
}

bitflags! {
    /// How a fact shows up in buff listings.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct DisplayMode: u8 {
        const SHOW_NAME = 0b0001;
        const SHOW_STACKS = 0b0010;
        const SHOW_DURATION = 0b0100;
    }
}

impl Default for DisplayMode {
    fn default() -> Self {
        Self::SHOW_NAME | Self::SHOW_STACKS | Self::SHOW_DURATION
    }
}

/// Everything a brick may look at while answering a query.
///
/// For an area brick `stacks` is 1, `data` is [`FactData::None`] and `area`
/// names the area being asked.
pub struct QueryCx<'a> {
    pub state: &'a GameState,
    pub entity: EntityId,
    pub key: QueryKey,
    pub arg: Option<&'a str>,
    /// The other side of the question, e.g. the attacker when asking for AC.
    pub against: Option<EntityId>,
    pub stacks: u32,
    pub data: &'a FactData,
    pub area: Option<AreaId>,
}

/// A unit of rules logic attached to entities through facts, or to areas.
#[allow(unused_variables)]
pub trait Brick: Send + Sync + fmt::Debug {
    /// Full registry id, including any `+argument` suffix.
    fn id(&self) -> &str;

    fn kind(&self) -> BrickKind {
        BrickKind::Trait
    }

    fn display_name(&self) -> &str {
        self.id()
    }

    fn display_mode(&self) -> DisplayMode {
        DisplayMode::default()
    }

    fn stack_mode(&self) -> StackMode {
        StackMode::Independent
    }

    fn max_stacks(&self) -> u32 {
        u32::MAX
    }

    /// Initial payload for a fact created from this brick.
    fn create_data(&self) -> FactData {
        FactData::None
    }

    /// Opinion on `cx.key`, or `None` for no opinion.
    fn query(&self, cx: &QueryCx<'_>) -> Option<Answer> {
        None
    }

    // ----- lifecycle -----

    fn on_fact_added(&self, fact: FactRef, state: &mut GameState) {}
    fn on_fact_removed(&self, fact: FactRef, state: &mut GameState) {}
    fn on_stack_added(&self, fact: FactRef, state: &mut GameState) {}
    fn on_stack_removed(&self, fact: FactRef, state: &mut GameState) {}

    // ----- time -----

    fn on_round_start(&self, fact: FactRef, state: &mut GameState) {}
    fn on_round_end(&self, fact: FactRef, state: &mut GameState) {}
    fn on_turn_start(&self, fact: FactRef, state: &mut GameState, ctx: &mut Resolution) {}
    fn on_turn_end(&self, fact: FactRef, state: &mut GameState, ctx: &mut Resolution) {}

    // ----- damage -----

    /// Owner is the source; may append to `ctx.damage`.
    fn on_before_damage_roll(&self, fact: FactRef, state: &mut GameState, ctx: &mut Resolution) {}
    /// Owner is the target; may reduce, absorb or negate components.
    fn on_before_incoming_damage(&self, fact: FactRef, state: &mut GameState, ctx: &mut Resolution) {}
    fn on_damage_taken(&self, fact: FactRef, state: &mut GameState, ctx: &mut Resolution) {}
    fn on_damage_done(&self, fact: FactRef, state: &mut GameState, ctx: &mut Resolution) {}

    // ----- checks -----

    fn on_before_attack_roll(&self, fact: FactRef, state: &mut GameState, ctx: &mut Resolution) {}
    fn on_after_attack_roll(&self, fact: FactRef, state: &mut GameState, ctx: &mut Resolution) {}
    fn on_before_defend_roll(&self, fact: FactRef, state: &mut GameState, ctx: &mut Resolution) {}
    fn on_after_defend_roll(&self, fact: FactRef, state: &mut GameState, ctx: &mut Resolution) {}
    fn on_before_check(&self, fact: FactRef, state: &mut GameState, ctx: &mut Resolution) {}

    // ----- healing -----

    fn on_before_heal_given(&self, fact: FactRef, state: &mut GameState, ctx: &mut Resolution) {}
    fn on_before_heal_received(&self, fact: FactRef, state: &mut GameState, ctx: &mut Resolution) {}
    fn on_after_heal_received(&self, fact: FactRef, state: &mut GameState, ctx: &mut Resolution) {}

    // ----- presence -----

    fn on_spawn(&self, fact: FactRef, state: &mut GameState, ctx: &mut Resolution) {}
    fn on_death(&self, fact: FactRef, state: &mut GameState, ctx: &mut Resolution) {}
    fn on_move(&self, fact: FactRef, state: &mut GameState, ctx: &mut Resolution) {}

    // ----- areas -----

    fn on_area_enter(&self, area: AreaId, unit: EntityId, state: &mut GameState, ctx: &mut Resolution) {}
    fn on_area_exit(
        &self,
        area: AreaId,
        unit: EntityId,
        faded: bool,
        state: &mut GameState,
        ctx: &mut Resolution,
    ) {
    }
    fn on_area_tick(&self, area: AreaId, state: &mut GameState, ctx: &mut Resolution) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Plain;

    impl Brick for Plain {
        fn id(&self) -> &str {
            "plain"
        }
    }

    #[test]
    fn defaults_are_unbounded_and_independent() {
        let brick = Plain;
        assert_eq!(brick.display_name(), "plain");
        assert_eq!(brick.stack_mode(), StackMode::Independent);
        assert_eq!(brick.max_stacks(), u32::MAX);
        assert_eq!(brick.create_data(), FactData::None);
        assert!(brick.display_mode().contains(DisplayMode::SHOW_NAME));
    }

    #[test]
    fn stack_mode_names_are_snake_case() {
        assert_eq!(StackMode::ExtendDuration.to_string(), "extend_duration");
        assert_eq!("extend_stacks".parse::<StackMode>().ok(), Some(StackMode::ExtendStacks));
    }
}
