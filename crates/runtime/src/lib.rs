//! Driver-facing runtime for the tactics rules engine.
//!
//! This crate wraps a [`tactics_core::GameState`] in a [`Session`] that speaks
//! a line-oriented JSON protocol, persists save games, and exposes the session
//! to async clients through [`Runtime`] and [`RuntimeHandle`].
//!
//! Modules are organized by responsibility:
//! - [`session`] implements the gate contract and the command set
//! - [`lookup`] resolves loosely typed names to units, templates and abilities
//! - [`repository`] stores save games on disk or in memory
//! - [`runtime`] hosts the orchestrator and its configuration
//! - [`api`] exposes the types downstream clients interact with
pub mod api;
pub mod lookup;
pub mod repository;
pub mod runtime;
pub mod session;

mod workers;

pub use api::{Result, RuntimeError, RuntimeHandle, SessionEvent};
pub use lookup::{Match, fuzzy_match};
pub use repository::{
    FileSaveRepository, InMemorySaveRepository, RepositoryError, SaveFormat, SaveRepository,
};
pub use runtime::{Runtime, RuntimeConfig};
pub use session::{Command, Request, Response, Session, SessionError, UnitRef};
