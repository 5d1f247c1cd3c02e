//! Concrete rules content for `tactics-core`.
//!
//! This crate houses the bricks, abilities and unit templates the driver and
//! tests play with:
//! - resistances, damage reduction, protection pools and wards
//! - timed buffs and status conditions
//! - regeneration and persistent damage
//! - reactive logic bricks and area bricks
//! - spells registered as action bricks
//!
//! With the `loaders` feature, templates load from RON and the game
//! configuration from TOML.
use std::sync::Arc;

use tactics_core::BrickRegistry;

pub mod abilities;
pub mod bricks;
pub mod error;
pub mod templates;

#[cfg(feature = "loaders")]
pub mod loaders;

pub use error::LoadError;
pub use templates::TemplateBook;

#[cfg(feature = "loaders")]
pub use loaders::{ConfigLoader, ContentFactory, UnitLoader};

/// Build a registry holding every brick and ability, validated against `book`.
///
/// `spawn_defender` summons the book's `defender` template, or the built-in one.
pub fn registry(book: &TemplateBook) -> Result<Arc<BrickRegistry>, LoadError> {
    let defender = book
        .get("defender")
        .cloned()
        .unwrap_or_else(|_| TemplateBook::defender());
    let mut registry = BrickRegistry::new();
    bricks::register(&mut registry, defender)?;
    abilities::register(&mut registry)?;
    book.validate(&registry)?;
    Ok(Arc::new(registry))
}

/// Registry over [`TemplateBook::builtin`].
pub fn default_registry() -> Result<Arc<BrickRegistry>, LoadError> {
    registry(&TemplateBook::builtin())
}
