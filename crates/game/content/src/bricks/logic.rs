//! Reactive bricks that queue work for other entities.
use tactics_core::brick::{Brick, BrickKind};
use tactics_core::context::Resolution;
use tactics_core::fact::{FactData, FactRef};
use tactics_core::{DeferredAction, GameState, UnitSpec};

/// Summons a defender next to its owner the first time the owner is hurt in a round.
///
/// The fact's counter holds the last round it fired in.
#[derive(Debug)]
pub struct SpawnDefender {
    spec: UnitSpec,
}

impl SpawnDefender {
    pub fn new(spec: UnitSpec) -> Self {
        Self { spec }
    }
}

impl Brick for SpawnDefender {
    fn id(&self) -> &str {
        "spawn_defender"
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Logic
    }

    fn create_data(&self) -> FactData {
        FactData::Counter(-1)
    }

    fn on_damage_taken(&self, fact: FactRef, state: &mut GameState, ctx: &mut Resolution) {
        if ctx.total_damage <= 0 {
            return;
        }
        let round = i32::try_from(state.round).unwrap_or(i32::MAX);
        let Some(f) = state.fact_mut(fact) else {
            return;
        };
        if f.data.counter() == Some(round) {
            return;
        }
        f.data = FactData::Counter(round);

        let Some((near, line)) = state
            .unit(fact.entity)
            .filter(|u| u.is_alive())
            .map(|u| (u.pos, format!("{} calls for help!", u.the_cap())))
        else {
            return;
        };
        state.journal.pline(line);
        state.defer(DeferredAction::SpawnUnit {
            template: self.spec.clone(),
            near,
        });
    }
}

/// `on_attack_hit+<id>`: a successful attack roll grants `<id>` to the target.
#[derive(Debug)]
pub struct OnAttackHit {
    id: String,
    inner: String,
}

impl OnAttackHit {
    pub fn new(inner: &str) -> Self {
        Self {
            id: format!("on_attack_hit+{inner}"),
            inner: inner.to_string(),
        }
    }

    pub fn inner(&self) -> &str {
        &self.inner
    }
}

impl Brick for OnAttackHit {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Logic
    }

    fn on_after_attack_roll(&self, _fact: FactRef, state: &mut GameState, ctx: &mut Resolution) {
        if !ctx.check_succeeded() {
            return;
        }
        let Some(target) = ctx.target_unit() else {
            return;
        };
        state.defer(DeferredAction::GrantFact {
            target,
            brick_id: self.inner.clone(),
            duration: None,
            stacks: 1,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_attack_hit_keeps_the_nested_id() {
        let brick = OnAttackHit::new("persistent+acid/d6");
        assert_eq!(brick.id(), "on_attack_hit+persistent+acid/d6");
        assert_eq!(brick.inner(), "persistent+acid/d6");
    }
}
