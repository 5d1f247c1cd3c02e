//! Scoped resolution context.
//!
//! A [`Resolution`] exists only inside [`GameState::with_resolution`]. The
//! scope owns the bookkeeping around it: depth tracking, cleanup of facts
//! marked during the resolution, and draining the deferred queue once the
//! outermost scope closes.
use crate::check::{Check, CheckRequest};
use crate::damage::DamageComponent;
use crate::modifier::Modifiers;
use crate::primitives::Pos;
use crate::state::{EntityId, GameState};

/// What a resolution is aimed at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Target {
    #[default]
    None,
    Unit(EntityId),
    Pos(Pos),
}

impl Target {
    pub fn unit(self) -> Option<EntityId> {
        match self {
            Self::Unit(id) => Some(id),
            _ => None,
        }
    }
}

/// In-flight data for one action or effect.
#[derive(Debug)]
pub struct Resolution {
    pub source: Option<EntityId>,
    pub target: Target,
    /// Nesting depth, 1 for the outermost resolution.
    pub depth: u32,
    /// Pending damage components; hooks may append or intercept them.
    pub damage: Vec<DamageComponent>,
    /// The check being assembled; before-roll hooks edit it.
    pub pending_check: Option<CheckRequest>,
    check: Option<Check>,
    pub heal_modifiers: Modifiers,
    pub total_damage: i32,
    pub healed: i32,
    pub hp_before: Option<i32>,
    pub hp_after: Option<i32>,
    /// Suppresses check log entries.
    pub silent: bool,
    pub weapon_attack: bool,
    pub melee: bool,
    /// Ability being resolved, if any.
    pub ability: Option<String>,
}

impl Resolution {
    fn new(source: Option<EntityId>, target: Target, depth: u32) -> Self {
        Self {
            source,
            target,
            depth,
            damage: Vec::new(),
            pending_check: None,
            check: None,
            heal_modifiers: Modifiers::new(),
            total_damage: 0,
            healed: 0,
            hp_before: None,
            hp_after: None,
            silent: false,
            weapon_attack: false,
            melee: false,
            ability: None,
        }
    }

    pub fn target_unit(&self) -> Option<EntityId> {
        self.target.unit()
    }

    /// The last completed check. It is never modified once set.
    pub fn check(&self) -> Option<&Check> {
        self.check.as_ref()
    }

    pub(crate) fn set_check(&mut self, check: Check) {
        self.check = Some(check);
    }

    /// True when a check was made and it succeeded.
    pub fn check_succeeded(&self) -> bool {
        self.check.as_ref().is_some_and(Check::success)
    }
}

impl GameState {
    /// Run `f` with a fresh resolution context.
    ///
    /// Facts marked during the resolution are dropped when it returns, and
    /// the deferred queue is flushed once the outermost resolution returns.
    pub fn with_resolution<R>(
        &mut self,
        source: Option<EntityId>,
        target: Target,
        f: impl FnOnce(&mut GameState, &mut Resolution) -> R,
    ) -> R {
        self.depth += 1;
        let mut ctx = Resolution::new(source, target, self.depth);
        let out = f(self, &mut ctx);
        self.depth -= 1;
        self.cleanup_marked_facts();
        if self.depth == 0 {
            self.flush_deferred();
        }
        out
    }

    /// Current resolution nesting depth; 0 outside any resolution.
    pub fn depth(&self) -> u32 {
        self.depth
    }
}
