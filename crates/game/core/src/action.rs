//! Commands an actor can take and the abilities behind `cast`/`use`.
//!
//! Failing commands never propagate an error: an invalid target, an unknown
//! ability or a blocked tile resolve to [`ActionOutcome::NoEffect`] with a
//! narration line, and nothing in the state changes.
use std::fmt;

use strum::{AsRefStr, Display, EnumString};

use crate::context::Target;
use crate::effects;
use crate::hooks::{Hook, fire};
use crate::primitives::Pos;
use crate::state::{EntityId, GameState};

/// Energy price of an action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionCost(pub i32);

impl ActionCost {
    pub const FREE: Self = Self(0);
    pub const ONE_ACTION: Self = Self(12);
    pub const LAND_MOVE: Self = Self(12);
}

/// What an ability needs to be pointed at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Targeting {
    /// Self only.
    None,
    Direction,
    Unit,
    Pos,
}

/// Target supplied with a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CommandTarget {
    #[default]
    None,
    Dir(Pos),
    Unit(EntityId),
    Pos(Pos),
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ActionCommand {
    /// One step in a compass direction; stepping into a hostile attacks it.
    Move(Pos),
    Attack(EntityId),
    Cast { ability: String, target: CommandTarget },
    Use { ability: String },
    Wait,
}

impl fmt::Display for ActionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Move(dir) => write!(f, "move {dir}"),
            Self::Attack(id) => write!(f, "attack {id}"),
            Self::Cast { ability, target } => write!(f, "cast {ability} at {target:?}"),
            Self::Use { ability } => write!(f, "use {ability}"),
            Self::Wait => write!(f, "wait"),
        }
    }
}

/// Result of validating an ability against a target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionPlan {
    /// Ready to run against the normalised target.
    Ready(CommandTarget),
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionOutcome {
    Taken { cost: ActionCost },
    NoEffect(String),
}

impl ActionOutcome {
    pub fn is_taken(&self) -> bool {
        matches!(self, Self::Taken { .. })
    }

    pub fn cost(&self) -> ActionCost {
        match self {
            Self::Taken { cost } => *cost,
            Self::NoEffect(_) => ActionCost::FREE,
        }
    }
}

/// An ability, registered next to bricks in the [`BrickRegistry`](crate::registry::BrickRegistry).
pub trait ActionBrick: Send + Sync + fmt::Debug {
    fn id(&self) -> &str;

    fn name(&self) -> &str {
        self.id()
    }

    fn targeting(&self) -> Targeting;

    /// Chebyshev range; 0 means touch or self.
    fn max_range(&self) -> i32 {
        0
    }

    fn cost(&self) -> ActionCost {
        ActionCost::ONE_ACTION
    }

    fn can_execute(&self, state: &GameState, actor: EntityId, target: CommandTarget) -> ActionPlan {
        default_plan(self.targeting(), self.max_range(), state, actor, target)
    }

    /// Run against a target already accepted by [`can_execute`](Self::can_execute).
    fn execute(&self, state: &mut GameState, actor: EntityId, target: CommandTarget);
}

/// Standard targeting validation shared by most abilities.
pub fn default_plan(
    targeting: Targeting,
    range: i32,
    state: &GameState,
    actor: EntityId,
    target: CommandTarget,
) -> ActionPlan {
    let Some(origin) = state.unit(actor).map(|u| u.pos) else {
        return ActionPlan::Invalid("You are nowhere.".into());
    };
    let in_range = |p: Pos| origin.chebyshev_dist(p) <= range.max(1);

    match (targeting, target) {
        (Targeting::None, _) => ActionPlan::Ready(CommandTarget::Unit(actor)),
        (Targeting::Direction, CommandTarget::Dir(d)) if Pos::ALL_DIRS.contains(&d) => {
            ActionPlan::Ready(CommandTarget::Dir(d))
        }
        (Targeting::Unit, CommandTarget::Unit(id)) => match state.unit(id) {
            Some(u) if u.is_alive() && in_range(u.pos) => ActionPlan::Ready(CommandTarget::Unit(id)),
            Some(u) if u.is_alive() => ActionPlan::Invalid("That is too far away.".into()),
            _ => ActionPlan::Invalid("There is nothing there.".into()),
        },
        (Targeting::Unit, CommandTarget::Dir(d)) if Pos::ALL_DIRS.contains(&d) => {
            // first living unit along the line, within range
            (1..=range.max(1))
                .map(|step| origin + d * step)
                .find_map(|p| state.unit_at(p))
                .map_or_else(
                    || ActionPlan::Invalid("There is nothing there.".into()),
                    |id| ActionPlan::Ready(CommandTarget::Unit(id)),
                )
        }
        (Targeting::Unit, CommandTarget::Pos(p)) => match state.unit_at(p) {
            Some(id) if in_range(p) => ActionPlan::Ready(CommandTarget::Unit(id)),
            Some(_) => ActionPlan::Invalid("That is too far away.".into()),
            None => ActionPlan::Invalid("There is nothing there.".into()),
        },
        (Targeting::Pos, CommandTarget::Pos(p)) if !p.is_valid() => {
            ActionPlan::Invalid(format!("{p} is not a valid position."))
        }
        (Targeting::Pos, CommandTarget::Pos(p)) if in_range(p) => ActionPlan::Ready(CommandTarget::Pos(p)),
        (Targeting::Pos, CommandTarget::Unit(id)) => match state.unit(id) {
            Some(u) if u.is_alive() && in_range(u.pos) => ActionPlan::Ready(CommandTarget::Pos(u.pos)),
            _ => ActionPlan::Invalid("There is nothing there.".into()),
        },
        (Targeting::Pos, CommandTarget::Pos(_)) => ActionPlan::Invalid("That is too far away.".into()),
        _ => ActionPlan::Invalid("That needs a target.".into()),
    }
}

fn no_effect(state: &mut GameState, actor: EntityId, why: impl Into<String>) -> ActionOutcome {
    let why = why.into();
    if actor.is_player() {
        state.journal.pline(why.clone());
    }
    tracing::debug!(target: "tactics::actions", %actor, reason = %why, "no effect");
    ActionOutcome::NoEffect(why)
}

/// Resolve one command for `actor`.
pub fn perform(state: &mut GameState, actor: EntityId, command: ActionCommand) -> ActionOutcome {
    if !state.unit(actor).is_some_and(|u| u.is_alive()) {
        return ActionOutcome::NoEffect("dead actors do not act".into());
    }
    tracing::debug!(target: "tactics::actions", %actor, %command, "perform");

    match command {
        ActionCommand::Wait => ActionOutcome::Taken {
            cost: ActionCost::ONE_ACTION,
        },
        ActionCommand::Move(dir) => step(state, actor, dir),
        ActionCommand::Attack(target) => melee(state, actor, target),
        ActionCommand::Cast { ability, target } => use_ability(state, actor, &ability, target),
        ActionCommand::Use { ability } => use_ability(state, actor, &ability, CommandTarget::None),
    }
}

fn step(state: &mut GameState, actor: EntityId, dir: Pos) -> ActionOutcome {
    if !Pos::ALL_DIRS.contains(&dir) {
        return no_effect(state, actor, "That is not a direction.");
    }
    let Some(unit) = state.unit(actor) else {
        return ActionOutcome::NoEffect("missing actor".into());
    };
    let faction = unit.faction;
    let dest = unit.pos + dir;
    if !dest.is_valid() {
        return no_effect(state, actor, "You cannot go there.");
    }
    if let Some(other) = state.unit_at(dest) {
        let hostile = state.unit(other).is_some_and(|o| faction.is_hostile_to(o.faction));
        return if hostile {
            melee(state, actor, other)
        } else {
            no_effect(state, actor, "Something is in the way.")
        };
    }

    state.place_unit(actor, dest);
    state.with_resolution(Some(actor), Target::Pos(dest), |state, ctx| {
        fire(state, actor, Hook::Move, ctx);
    });
    ActionOutcome::Taken {
        cost: ActionCost::LAND_MOVE,
    }
}

fn melee(state: &mut GameState, actor: EntityId, target: EntityId) -> ActionOutcome {
    let positions = state
        .unit(actor)
        .map(|a| a.pos)
        .zip(state.unit(target).filter(|d| d.is_alive()).map(|d| d.pos))
        .filter(|_| actor != target);
    let Some((from, to)) = positions else {
        return no_effect(state, actor, "There is nothing there.");
    };
    if !from.is_adjacent(to) {
        return no_effect(state, actor, "That is too far away.");
    }
    effects::weapon_attack(state, actor, target);
    ActionOutcome::Taken {
        cost: ActionCost::ONE_ACTION,
    }
}

fn use_ability(state: &mut GameState, actor: EntityId, ability: &str, target: CommandTarget) -> ActionOutcome {
    let known = state
        .unit(actor)
        .is_some_and(|u| u.abilities.iter().any(|a| a == ability));
    if !known {
        return no_effect(state, actor, format!("You don't know how to {ability}."));
    }
    let Some(action) = state.registry().try_resolve_action(ability) else {
        return no_effect(state, actor, format!("Nothing happens ({ability})."));
    };
    match action.can_execute(state, actor, target) {
        ActionPlan::Ready(target) => {
            action.execute(state, actor, target);
            ActionOutcome::Taken { cost: action.cost() }
        }
        ActionPlan::Invalid(why) => no_effect(state, actor, why),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::state::{Faction, UnitSpec};

    fn arena() -> (GameState, EntityId) {
        let mut state = GameState::for_tests(GameConfig::with_seed(3));
        state.spawn_player(&UnitSpec::new("player", 20).with_faction(Faction::Player), Pos::new(2, 2));
        let gob = state
            .spawn_unit(&UnitSpec::new("goblin", 6), Pos::new(5, 5))
            .unwrap();
        (state, gob)
    }

    #[test]
    fn moving_costs_a_move_and_changes_position() {
        let (mut state, _) = arena();
        let outcome = perform(&mut state, EntityId::PLAYER, ActionCommand::Move(Pos::E));
        assert_eq!(outcome, ActionOutcome::Taken { cost: ActionCost::LAND_MOVE });
        assert_eq!(state.player().unwrap().pos, Pos::new(3, 2));
    }

    #[test]
    fn invalid_commands_have_no_effect() {
        let (mut state, gob) = arena();
        let far = perform(&mut state, EntityId::PLAYER, ActionCommand::Attack(gob));
        assert!(!far.is_taken());
        let bad_dir = perform(&mut state, EntityId::PLAYER, ActionCommand::Move(Pos::new(2, 0)));
        assert!(!bad_dir.is_taken());
        let unknown = perform(
            &mut state,
            EntityId::PLAYER,
            ActionCommand::Use {
                ability: "fly".into(),
            },
        );
        assert!(!unknown.is_taken());
        assert_eq!(state.player().unwrap().pos, Pos::new(2, 2));
        assert_eq!(state.journal.plines().len(), 3);
    }

    #[test]
    fn bumping_a_hostile_attacks_it() {
        let (mut state, gob) = arena();
        state.place_unit(gob, Pos::new(3, 2));
        let outcome = perform(&mut state, EntityId::PLAYER, ActionCommand::Move(Pos::E));
        assert_eq!(outcome, ActionOutcome::Taken { cost: ActionCost::ONE_ACTION });
        assert_eq!(state.player().unwrap().pos, Pos::new(2, 2));
        assert_eq!(state.journal.tagged("attack").count(), 1);
    }

    #[test]
    fn off_map_positions_are_invalid_not_distant() {
        let (state, _) = arena();
        let plan = default_plan(Targeting::Pos, 6, &state, EntityId::PLAYER, CommandTarget::Pos(Pos::new(-1, 2)));
        assert_eq!(plan, ActionPlan::Invalid("(-1,2) is not a valid position.".into()));
        let far = default_plan(Targeting::Pos, 6, &state, EntityId::PLAYER, CommandTarget::Pos(Pos::new(20, 2)));
        assert_eq!(far, ActionPlan::Invalid("That is too far away.".into()));
        let near = default_plan(Targeting::Pos, 6, &state, EntityId::PLAYER, CommandTarget::Pos(Pos::new(0, 0)));
        assert_eq!(near, ActionPlan::Ready(CommandTarget::Pos(Pos::new(0, 0))));
    }

    #[test]
    fn unit_targeting_follows_a_direction() {
        let (state, gob) = arena();
        let plan = default_plan(
            Targeting::Unit,
            5,
            &state,
            EntityId::PLAYER,
            CommandTarget::Dir(Pos::SE),
        );
        assert_eq!(plan, ActionPlan::Ready(CommandTarget::Unit(gob)));
        let short = default_plan(
            Targeting::Unit,
            2,
            &state,
            EntityId::PLAYER,
            CommandTarget::Dir(Pos::SE),
        );
        assert!(matches!(short, ActionPlan::Invalid(_)));
    }
}
