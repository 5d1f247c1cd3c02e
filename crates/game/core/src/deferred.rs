//! Work queued by hooks until the current resolution unwinds.
//!
//! Hooks run while the engine is iterating snapshots of facts and units.
//! Anything that would reshape those collections for someone else (spawning,
//! despawning, touching another entity's facts) is queued here and drained in
//! FIFO order when the outermost resolution closes or at the round-end safe
//! point.
use crate::config::GameConfig;
use crate::fact::FactRef;
use crate::primitives::Pos;
use crate::state::{EntityId, GameState, UnitSpec};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeferredAction {
    SpawnUnit { template: UnitSpec, near: Pos },
    GrantFact {
        target: EntityId,
        brick_id: String,
        duration: Option<u32>,
        stacks: u32,
    },
    RemoveFact { fact: FactRef },
    RemoveStack {
        target: EntityId,
        brick_id: String,
        count: u32,
    },
    Despawn { target: EntityId },
    Narrate(String),
}

impl GameState {
    pub fn defer(&mut self, action: DeferredAction) {
        tracing::trace!(target: "tactics::deferred", ?action, queued = self.deferred.len() + 1, "deferred");
        self.deferred.push_back(action);
    }

    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    /// Run queued actions until the queue is empty. Returns how many ran.
    ///
    /// Actions queued while flushing run in the same flush. A nested call
    /// (from a resolution opened by a deferred action) returns immediately.
    pub fn flush_deferred(&mut self) -> usize {
        if self.flushing {
            return 0;
        }
        self.flushing = true;
        let mut ran = 0;
        while let Some(action) = self.deferred.pop_front() {
            if ran >= GameConfig::MAX_DEFERRED_PER_FLUSH {
                tracing::warn!(
                    target: "tactics::deferred",
                    dropped = self.deferred.len() + 1,
                    "deferred queue did not settle; dropping the rest"
                );
                self.deferred.clear();
                break;
            }
            self.apply_deferred(action);
            ran += 1;
        }
        self.flushing = false;
        self.cleanup_marked_facts();
        ran
    }

    fn apply_deferred(&mut self, action: DeferredAction) {
        match action {
            DeferredAction::SpawnUnit { template, near } => {
                if self.spawn_unit(&template, near).is_none() {
                    tracing::debug!(target: "tactics::deferred", template = %template.template, %near, "no room to spawn");
                }
            }
            DeferredAction::GrantFact {
                target,
                brick_id,
                duration,
                stacks,
            } => match self.registry().try_resolve(&brick_id) {
                Some(brick) => {
                    self.add_fact(target, brick, duration, stacks);
                }
                None => {
                    tracing::warn!(target: "tactics::deferred", %target, brick_id, "unresolvable brick id, grant dropped");
                }
            },
            DeferredAction::RemoveFact { fact } => {
                self.remove_fact(fact);
            }
            DeferredAction::RemoveStack {
                target,
                brick_id,
                count,
            } => {
                self.remove_stack(target, &brick_id, count);
            }
            DeferredAction::Despawn { target } => {
                self.despawn(target);
            }
            DeferredAction::Narrate(line) => self.journal.pline(line),
        }
    }
}
