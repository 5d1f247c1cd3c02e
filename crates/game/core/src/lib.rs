//! Deterministic rules engine for a turn-based tactical game.
//!
//! `tactics-core` owns the canonical state ([`GameState`]), the composable
//! rules units ([`Brick`]s held through [`Fact`]s), and the pipelines that
//! resolve checks, damage, hooks, areas and rounds. Content crates register
//! bricks and abilities in a [`BrickRegistry`]; drivers step the game through
//! the [`Scheduler`] gates.
//!
//! Nothing here performs I/O. Given the same seed, content and commands, every
//! run produces the same journal.
pub mod action;
pub mod area;
pub mod brick;
pub mod check;
pub mod config;
pub mod context;
pub mod damage;
pub mod deferred;
pub mod effects;
pub mod error;
pub mod fact;
pub mod hooks;
pub mod journal;
pub mod modifier;
pub mod primitives;
pub mod query;
pub mod registry;
pub mod save;
pub mod scheduler;
pub mod state;

pub use primitives::{dice, geometry, rng};

pub use action::{
    ActionBrick, ActionCommand, ActionCost, ActionOutcome, ActionPlan, CommandTarget, Targeting,
};
pub use area::{Area, AreaSpec};
pub use brick::{Brick, BrickKind, DisplayMode, QueryCx, StackMode};
pub use check::{Check, CheckKey, CheckRequest, SaveKind};
pub use config::GameConfig;
pub use context::{Resolution, Target};
pub use damage::{DamageCategory, DamageComponent, DamageFlags, DamageReport, DamageType};
pub use deferred::DeferredAction;
pub use effects::SaveSpec;
pub use error::{ErrorSeverity, GameError};
pub use fact::{Fact, FactData, FactRef};
pub use hooks::Hook;
pub use journal::{Journal, LogEntry, LogRecord};
pub use modifier::{Modifier, ModifierCategory, Modifiers};
pub use primitives::{Dice, DiceFormula, DiceParseError, GameRng, Pos, Rect};
pub use query::{Answer, MergeStrategy, Query, QueryKey};
pub use registry::{BrickRegistry, RegistryError};
pub use save::{FactRecord, SaveError, SaveGame};
pub use scheduler::{ActorPolicy, ChaseAndAttack, Gate, Scheduler, SchedulerError};
pub use state::{AreaId, EntityId, FactId, Faction, GameState, HitPoints, StatBlock, Unit, UnitSpec};
