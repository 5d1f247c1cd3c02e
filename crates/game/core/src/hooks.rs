//! Event dispatch to the bricks an entity holds.
//!
//! Dispatch works on a snapshot of `(fact, brick)` pairs taken before the
//! first call, so hooks are free to add or remove facts. A fact marked by an
//! earlier hook in the same pass is skipped; a fact added during the pass is
//! not visited until the next event.
use std::sync::Arc;

use strum::{AsRefStr, Display, EnumIter};

use crate::brick::Brick;
use crate::context::{Resolution, Target};
use crate::fact::FactRef;
use crate::state::{EntityId, GameState};

/// Unit-level events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Hook {
    FactAdded,
    FactRemoved,
    StackAdded,
    StackRemoved,
    RoundStart,
    RoundEnd,
    TurnStart,
    TurnEnd,
    BeforeDamageRoll,
    BeforeIncomingDamage,
    DamageTaken,
    DamageDone,
    BeforeAttackRoll,
    AfterAttackRoll,
    BeforeDefendRoll,
    AfterDefendRoll,
    BeforeCheck,
    BeforeHealGiven,
    BeforeHealReceived,
    AfterHealReceived,
    Spawn,
    Death,
    Move,
}

fn snapshot(state: &GameState, entity: EntityId) -> Vec<(FactRef, Arc<dyn Brick>)> {
    state
        .facts(entity)
        .map(|f| (f.fact_ref(), Arc::clone(f.brick())))
        .collect()
}

fn invoke(
    brick: &dyn Brick,
    hook: Hook,
    fact: FactRef,
    state: &mut GameState,
    ctx: &mut Resolution,
) {
    match hook {
        Hook::FactAdded => brick.on_fact_added(fact, state),
        Hook::FactRemoved => brick.on_fact_removed(fact, state),
        Hook::StackAdded => brick.on_stack_added(fact, state),
        Hook::StackRemoved => brick.on_stack_removed(fact, state),
        Hook::RoundStart => brick.on_round_start(fact, state),
        Hook::RoundEnd => brick.on_round_end(fact, state),
        Hook::TurnStart => brick.on_turn_start(fact, state, ctx),
        Hook::TurnEnd => brick.on_turn_end(fact, state, ctx),
        Hook::BeforeDamageRoll => brick.on_before_damage_roll(fact, state, ctx),
        Hook::BeforeIncomingDamage => brick.on_before_incoming_damage(fact, state, ctx),
        Hook::DamageTaken => brick.on_damage_taken(fact, state, ctx),
        Hook::DamageDone => brick.on_damage_done(fact, state, ctx),
        Hook::BeforeAttackRoll => brick.on_before_attack_roll(fact, state, ctx),
        Hook::AfterAttackRoll => brick.on_after_attack_roll(fact, state, ctx),
        Hook::BeforeDefendRoll => brick.on_before_defend_roll(fact, state, ctx),
        Hook::AfterDefendRoll => brick.on_after_defend_roll(fact, state, ctx),
        Hook::BeforeCheck => brick.on_before_check(fact, state, ctx),
        Hook::BeforeHealGiven => brick.on_before_heal_given(fact, state, ctx),
        Hook::BeforeHealReceived => brick.on_before_heal_received(fact, state, ctx),
        Hook::AfterHealReceived => brick.on_after_heal_received(fact, state, ctx),
        Hook::Spawn => brick.on_spawn(fact, state, ctx),
        Hook::Death => brick.on_death(fact, state, ctx),
        Hook::Move => brick.on_move(fact, state, ctx),
    }
}

/// Fire `hook` on every live fact of `entity`, in registration order.
pub fn fire(state: &mut GameState, entity: EntityId, hook: Hook, ctx: &mut Resolution) {
    let facts = snapshot(state, entity);
    tracing::trace!(
        target: "tactics::hooks",
        %entity,
        %hook,
        facts = facts.len(),
        depth = ctx.depth,
        "dispatch"
    );
    for (fact, brick) in facts {
        if state.fact(fact).is_none() {
            continue;
        }
        invoke(brick.as_ref(), hook, fact, state, ctx);
    }
}

/// Fire a round-level hook inside its own resolution scope.
pub fn fire_round(state: &mut GameState, entity: EntityId, hook: Hook) {
    state.with_resolution(Some(entity), Target::Unit(entity), |state, ctx| {
        fire(state, entity, hook, ctx);
    });
}

/// Start `entity`'s turn: lapse expired facts, then fire turn-start.
pub fn begin_turn(state: &mut GameState, entity: EntityId) {
    let expired = state.expire_facts(entity);
    if expired > 0 {
        tracing::debug!(target: "tactics::hooks", %entity, expired, "facts expired");
    }
    fire_round(state, entity, Hook::TurnStart);
}

pub fn end_turn(state: &mut GameState, entity: EntityId) {
    fire_round(state, entity, Hook::TurnEnd);
}
