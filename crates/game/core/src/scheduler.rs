//! Round/energy scheduler and the gates the driver must satisfy.
//!
//! A round runs as a small state machine:
//!
//! ```text
//! StartRound ──ack──▶ Action{energy}* ──▶ EndPlayerTurn ──ack──▶ (monsters, round end)
//!      ▲                                                              │
//!      └──────────────────────────────────────────────────────────────┘
//!                                   or GameOver once the player is dead
//! ```
//!
//! The driver acknowledges [`Gate::StartRound`] and [`Gate::EndPlayerTurn`],
//! and submits commands while the gate is [`Gate::Action`]. Monsters act
//! through an [`ActorPolicy`] during the monster phase.
use std::fmt;

use crate::action::{ActionCommand, ActionCost, ActionOutcome, perform};
use crate::config::GameConfig;
use crate::error::{ErrorSeverity, GameError};
use crate::hooks::{Hook, begin_turn, end_turn, fire_round};
use crate::primitives::Pos;
use crate::query::QueryKey;
use crate::state::{EntityId, GameState};

/// What the engine is waiting for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Gate {
    #[default]
    StartRound,
    /// The player may act; carries its remaining energy.
    Action { energy: i32 },
    EndPlayerTurn,
    GameOver,
}

impl Gate {
    /// Wire name, as used by `gate: <name>` acknowledgements.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::StartRound => "start_round",
            Self::Action { .. } => "action",
            Self::EndPlayerTurn => "end_player_turn",
            Self::GameOver => "game_over",
        }
    }

    pub const fn is_action(&self) -> bool {
        matches!(self, Self::Action { .. })
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    #[error("waiting on gate {expected}, not {got}")]
    WrongGate { expected: Gate, got: String },

    #[error("actions are only accepted at the action gate (waiting on {gate})")]
    NotActionGate { gate: Gate },

    #[error("the game is over")]
    GameOver,
}

impl GameError for SchedulerError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::WrongGate { .. } | Self::NotActionGate { .. } => ErrorSeverity::Validation,
            Self::GameOver => ErrorSeverity::Recoverable,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::WrongGate { .. } => "SCHEDULER_WRONG_GATE",
            Self::NotActionGate { .. } => "SCHEDULER_NOT_ACTION_GATE",
            Self::GameOver => "SCHEDULER_GAME_OVER",
        }
    }
}

/// Chooses commands for non-player units.
pub trait ActorPolicy: Send + fmt::Debug {
    fn decide(&mut self, state: &GameState, actor: EntityId) -> ActionCommand;
}

/// Attack an adjacent hostile, else step toward the player, else wait.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChaseAndAttack;

impl ActorPolicy for ChaseAndAttack {
    fn decide(&mut self, state: &GameState, actor: EntityId) -> ActionCommand {
        let Some(me) = state.unit(actor) else {
            return ActionCommand::Wait;
        };
        let adjacent_foe = state
            .units()
            .filter(|u| u.is_alive() && u.id != actor && me.faction.is_hostile_to(u.faction))
            .find(|u| u.pos.is_adjacent(me.pos));
        if let Some(foe) = adjacent_foe {
            return ActionCommand::Attack(foe.id);
        }

        let Some(player) = state.player().filter(|p| p.is_alive() && me.faction.is_hostile_to(p.faction)) else {
            return ActionCommand::Wait;
        };
        let here = me.pos.chebyshev_dist(player.pos);
        let preferred = (player.pos - me.pos).signum();
        std::iter::once(preferred)
            .chain(Pos::ALL_DIRS)
            .filter(|dir| *dir != Pos::ZERO)
            .find(|dir| {
                let to = me.pos + *dir;
                state.is_free(to) && to.chebyshev_dist(player.pos) < here
            })
            .map_or(ActionCommand::Wait, ActionCommand::Move)
    }
}

/// Drives rounds for one game.
#[derive(Debug)]
pub struct Scheduler {
    policy: Box<dyn ActorPolicy>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(Box::new(ChaseAndAttack))
    }
}

impl Scheduler {
    pub fn new(policy: Box<dyn ActorPolicy>) -> Self {
        Self { policy }
    }

    pub fn set_policy(&mut self, policy: Box<dyn ActorPolicy>) {
        self.policy = policy;
    }

    /// Acknowledge the current gate by name and run until the next one.
    ///
    /// Acknowledging `action` ends the player's turn with energy unspent.
    pub fn acknowledge(&mut self, state: &mut GameState, gate: &str) -> Result<Gate, SchedulerError> {
        expect_gate(state, gate)?;
        self.advance(state);
        Ok(state.gate)
    }

    /// Acknowledge whatever gate is current.
    pub fn advance(&mut self, state: &mut GameState) -> Gate {
        match state.gate {
            Gate::StartRound => {
                start_round(state);
                settle_player(state);
            }
            Gate::Action { .. } => {
                close_player_turn(state);
            }
            Gate::EndPlayerTurn => {
                self.monster_phase(state);
                end_round(state);
            }
            Gate::GameOver => {}
        }
        tracing::debug!(target: "tactics::scheduler", round = state.round, gate = %state.gate, "gate reached");
        state.gate
    }

    /// Resolve a player command at the action gate.
    pub fn submit(&mut self, state: &mut GameState, command: ActionCommand) -> Result<ActionOutcome, SchedulerError> {
        match state.gate {
            Gate::Action { .. } => {}
            Gate::GameOver => return Err(SchedulerError::GameOver),
            gate => return Err(SchedulerError::NotActionGate { gate }),
        }
        let outcome = perform(state, EntityId::PLAYER, command);
        if let ActionOutcome::Taken { cost } = outcome {
            spend(state, EntityId::PLAYER, cost);
        }
        settle_player(state);
        Ok(outcome)
    }

    /// Every living non-player unit takes its turn, highest initiative first.
    fn monster_phase(&mut self, state: &mut GameState) {
        for actor in initiative_order(state) {
            if !state.unit(actor).is_some_and(|u| u.is_alive()) {
                continue;
            }
            gain_energy(state, actor);
            begin_turn(state, actor);

            while can_act(state, actor) {
                if state.has(actor, QueryKey::Paralyzed) {
                    spend(state, actor, ActionCost::ONE_ACTION);
                    continue;
                }
                let command = self.policy.decide(state, actor);
                tracing::trace!(target: "tactics::scheduler", %actor, %command, "monster decides");
                let cost = match perform(state, actor, command) {
                    ActionOutcome::Taken { cost } => cost,
                    // a failed pick still ends the monster's action
                    ActionOutcome::NoEffect(_) => ActionCost::ONE_ACTION,
                };
                spend(state, actor, cost.max(ActionCost::ONE_ACTION));
            }
            if state.unit(actor).is_some_and(|u| u.is_alive()) {
                end_turn(state, actor);
            }
        }
    }
}

/// Fails unless the game is waiting on the gate named `gate`.
pub fn expect_gate(state: &GameState, gate: &str) -> Result<(), SchedulerError> {
    if state.gate == Gate::GameOver {
        return Err(SchedulerError::GameOver);
    }
    if gate != state.gate.name() {
        return Err(SchedulerError::WrongGate {
            expected: state.gate,
            got: gate.to_string(),
        });
    }
    Ok(())
}

/// Living non-player units by initiative, descending; ties by spawn order.
pub fn initiative_order(state: &GameState) -> Vec<EntityId> {
    let mut order: Vec<(i32, EntityId)> = state
        .units()
        .filter(|u| u.is_alive() && !u.is_player())
        .map(|u| {
            let init = state.resolve_stat(u.id, QueryKey::Initiative, u.stats.initiative);
            (init, u.id)
        })
        .collect();
    order.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    order.into_iter().map(|(_, id)| id).collect()
}

fn can_act(state: &GameState, actor: EntityId) -> bool {
    state
        .unit(actor)
        .is_some_and(|u| u.is_alive() && u.energy > GameConfig::ACT_THRESHOLD)
}

/// Leftover energy does not bank; debt from an expensive action does.
fn gain_energy(state: &mut GameState, actor: EntityId) {
    let per_round = state.config.energy_per_round;
    if let Some(unit) = state.unit_mut(actor) {
        unit.energy = unit.energy.min(0) + per_round;
    }
}

fn spend(state: &mut GameState, actor: EntityId, cost: ActionCost) {
    if let Some(unit) = state.unit_mut(actor) {
        unit.energy -= cost.0;
    }
}

fn start_round(state: &mut GameState) {
    tracing::debug!(target: "tactics::scheduler", round = state.round, "round start");
    gain_energy(state, EntityId::PLAYER);

    let bearers: Vec<EntityId> = state
        .units()
        .filter(|u| u.is_alive() && (u.is_player() || u.fact_count() > 0))
        .map(|u| u.id)
        .collect();
    for id in bearers {
        fire_round(state, id, Hook::RoundStart);
    }
    if state.player_alive() {
        begin_turn(state, EntityId::PLAYER);
    }
}

/// Move the player gate forward: paralysis burns actions, spent energy ends the turn.
fn settle_player(state: &mut GameState) {
    loop {
        if !state.player_alive() {
            state.gate = Gate::GameOver;
            return;
        }
        if !can_act(state, EntityId::PLAYER) {
            close_player_turn(state);
            return;
        }
        if state.has(EntityId::PLAYER, QueryKey::Paralyzed) {
            state.journal.pline("You are paralyzed!");
            spend(state, EntityId::PLAYER, ActionCost::ONE_ACTION);
            continue;
        }
        let energy = state.player().map_or(0, |p| p.energy);
        state.gate = Gate::Action { energy };
        return;
    }
}

fn close_player_turn(state: &mut GameState) {
    if state.player_alive() {
        end_turn(state, EntityId::PLAYER);
    }
    state.gate = if state.player_alive() {
        Gate::EndPlayerTurn
    } else {
        Gate::GameOver
    };
}

fn end_round(state: &mut GameState) {
    state.cleanup_marked_facts();
    for id in state.unit_ids() {
        if state.unit(id).is_some_and(|u| u.is_alive()) {
            fire_round(state, id, Hook::RoundEnd);
        }
    }
    state.tick_areas();
    state.cleanup_areas();
    let reaped = state.reap_dead();
    state.flush_deferred();

    tracing::debug!(target: "tactics::scheduler", round = state.round, reaped = reaped.len(), "round end");
    state.round += 1;
    state.gate = if state.player_alive() {
        Gate::StartRound
    } else {
        Gate::GameOver
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Faction, StatBlock, UnitSpec};

    fn arena() -> GameState {
        let mut state = GameState::for_tests(GameConfig::with_seed(11));
        state.spawn_player(&UnitSpec::new("player", 30).with_faction(Faction::Player), Pos::new(1, 1));
        state
    }

    #[test]
    fn a_round_walks_through_every_gate() {
        let mut state = arena();
        let mut scheduler = Scheduler::default();
        assert_eq!(state.gate, Gate::StartRound);

        assert_eq!(scheduler.acknowledge(&mut state, "start_round"), Ok(Gate::Action { energy: 12 }));
        let outcome = scheduler.submit(&mut state, ActionCommand::Wait).unwrap();
        assert!(outcome.is_taken());
        assert_eq!(state.gate, Gate::EndPlayerTurn);

        assert_eq!(scheduler.acknowledge(&mut state, "end_player_turn"), Ok(Gate::StartRound));
        assert_eq!(state.round, 2);
    }

    #[test]
    fn actions_outside_the_action_gate_are_rejected() {
        let mut state = arena();
        let mut scheduler = Scheduler::default();
        let err = scheduler.submit(&mut state, ActionCommand::Wait).unwrap_err();
        assert_eq!(err, SchedulerError::NotActionGate { gate: Gate::StartRound });
        assert!(matches!(
            scheduler.acknowledge(&mut state, "action"),
            Err(SchedulerError::WrongGate { .. })
        ));
        assert_eq!(state.round, 1);
    }

    #[test]
    fn actions_with_no_effect_cost_nothing() {
        let mut state = arena();
        let mut scheduler = Scheduler::default();
        scheduler.advance(&mut state);
        let outcome = scheduler.submit(&mut state, ActionCommand::Attack(EntityId(42))).unwrap();
        assert!(!outcome.is_taken());
        assert_eq!(state.gate, Gate::Action { energy: 12 });
    }

    #[test]
    fn initiative_orders_monsters_with_ties_by_spawn_order() {
        let mut state = arena();
        let slow = StatBlock {
            initiative: 1,
            ..StatBlock::default()
        };
        let fast = StatBlock {
            initiative: 5,
            ..StatBlock::default()
        };
        let a = state.spawn_unit(&UnitSpec::new("a", 5).with_stats(slow.clone()), Pos::new(10, 10)).unwrap();
        let b = state.spawn_unit(&UnitSpec::new("b", 5).with_stats(fast), Pos::new(12, 10)).unwrap();
        let c = state.spawn_unit(&UnitSpec::new("c", 5).with_stats(slow), Pos::new(14, 10)).unwrap();
        assert_eq!(initiative_order(&state), vec![b, a, c]);
    }

    #[test]
    fn monsters_close_in_and_attack() {
        let mut state = arena();
        let mut scheduler = Scheduler::default();
        let gob = state.spawn_unit(&UnitSpec::new("goblin", 5), Pos::new(3, 1)).unwrap();

        scheduler.advance(&mut state);
        scheduler.submit(&mut state, ActionCommand::Wait).unwrap();
        scheduler.advance(&mut state);
        assert_eq!(state.unit(gob).unwrap().pos, Pos::new(2, 1));

        scheduler.advance(&mut state);
        scheduler.submit(&mut state, ActionCommand::Wait).unwrap();
        let attacks_before = state.journal.tagged("attack").count();
        scheduler.advance(&mut state);
        assert_eq!(state.journal.tagged("attack").count(), attacks_before + 1);
    }

    #[test]
    fn the_game_ends_when_the_player_dies() {
        let mut state = arena();
        let mut scheduler = Scheduler::default();
        scheduler.advance(&mut state);
        state.kill(EntityId::PLAYER, None);
        scheduler.submit(&mut state, ActionCommand::Wait).unwrap();
        assert_eq!(state.gate, Gate::GameOver);
        assert_eq!(scheduler.acknowledge(&mut state, "game_over"), Err(SchedulerError::GameOver));
    }
}
