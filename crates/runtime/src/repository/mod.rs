//! Save-game persistence.
//!
//! Repositories store [`SaveGame`] snapshots under slot names. Reconstructing a
//! live [`tactics_core::GameState`] from a snapshot is the session's job, since
//! it needs the brick registry.
mod error;
mod file;
mod memory;

pub use error::{RepositoryError, Result};
pub use file::{FileSaveRepository, SaveFormat};
pub use memory::InMemorySaveRepository;

use tactics_core::SaveGame;

/// Storage for save games keyed by slot name.
pub trait SaveRepository: Send + Sync {
    fn save(&self, slot: &str, save: &SaveGame) -> Result<()>;

    /// `Ok(None)` when the slot is empty.
    fn load(&self, slot: &str) -> Result<Option<SaveGame>>;

    fn exists(&self, slot: &str) -> bool;

    fn delete(&self, slot: &str) -> Result<()>;

    /// Occupied slots, sorted.
    fn list_slots(&self) -> Result<Vec<String>> {
        Ok(vec![])
    }
}

/// Slot names end up in file names: letters, digits, `-` and `_` only.
pub(crate) fn check_slot(slot: &str) -> Result<()> {
    let valid = !slot.is_empty()
        && slot
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(RepositoryError::InvalidSlot(slot.to_string()))
    }
}
