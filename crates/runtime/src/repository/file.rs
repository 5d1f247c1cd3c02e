//! File-backed save slots.
use std::fs;
use std::path::{Path, PathBuf};

use tactics_core::SaveGame;

use super::{RepositoryError, Result, SaveRepository, check_slot};

/// On-disk encoding of a save file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SaveFormat {
    /// Compact `bincode`, stored as `<slot>.bin`.
    #[default]
    Binary,
    /// Pretty-printed JSON, stored as `<slot>.json`. Handy for inspecting saves by hand.
    Json,
}

impl SaveFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Binary => "bin",
            Self::Json => "json",
        }
    }

    const fn other(self) -> Self {
        match self {
            Self::Binary => Self::Json,
            Self::Json => Self::Binary,
        }
    }

    fn encode(self, save: &SaveGame) -> Result<Vec<u8>> {
        match self {
            Self::Binary => {
                bincode::serialize(save).map_err(|e| RepositoryError::Serialization(e.to_string()))
            }
            Self::Json => {
                serde_json::to_vec_pretty(save).map_err(|e| RepositoryError::Json(e.to_string()))
            }
        }
    }

    fn decode(self, slot: &str, bytes: &[u8]) -> Result<SaveGame> {
        let decoded = match self {
            Self::Binary => bincode::deserialize(bytes).map_err(|e| e.to_string()),
            Self::Json => serde_json::from_slice(bytes).map_err(|e| e.to_string()),
        };
        decoded.map_err(|reason| RepositoryError::CorruptedData {
            slot: slot.to_string(),
            reason,
        })
    }
}

/// One file per slot under `base_dir`.
///
/// Writes go to a `.tmp` sibling first and are renamed into place, so a crash
/// mid-save leaves the previous file intact. Loading falls back to the other
/// format when the slot only exists in that one.
#[derive(Clone, Debug)]
pub struct FileSaveRepository {
    base_dir: PathBuf,
    format: SaveFormat,
}

impl FileSaveRepository {
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        Self::with_format(base_dir, SaveFormat::default())
    }

    pub fn with_format(base_dir: impl AsRef<Path>, format: SaveFormat) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir, format })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn format(&self) -> SaveFormat {
        self.format
    }

    fn slot_path(&self, slot: &str, format: SaveFormat) -> PathBuf {
        self.base_dir.join(format!("{slot}.{}", format.extension()))
    }
}

impl SaveRepository for FileSaveRepository {
    fn save(&self, slot: &str, save: &SaveGame) -> Result<()> {
        check_slot(slot)?;
        let path = self.slot_path(slot, self.format);
        let temp_path = path.with_extension(format!("{}.tmp", self.format.extension()));

        let bytes = self.format.encode(save)?;
        fs::write(&temp_path, bytes)?;
        fs::rename(&temp_path, &path)?;

        tracing::debug!(target: "runtime::repository", slot, path = %path.display(), "saved game");
        Ok(())
    }

    fn load(&self, slot: &str) -> Result<Option<SaveGame>> {
        check_slot(slot)?;
        for format in [self.format, self.format.other()] {
            let path = self.slot_path(slot, format);
            if !path.exists() {
                continue;
            }
            let bytes = fs::read(&path)?;
            let save = format.decode(slot, &bytes)?;
            tracing::debug!(target: "runtime::repository", slot, path = %path.display(), "loaded game");
            return Ok(Some(save));
        }
        Ok(None)
    }

    fn exists(&self, slot: &str) -> bool {
        check_slot(slot).is_ok()
            && [SaveFormat::Binary, SaveFormat::Json]
                .into_iter()
                .any(|format| self.slot_path(slot, format).exists())
    }

    fn delete(&self, slot: &str) -> Result<()> {
        check_slot(slot)?;
        for format in [SaveFormat::Binary, SaveFormat::Json] {
            let path = self.slot_path(slot, format);
            if path.exists() {
                fs::remove_file(&path)?;
                tracing::debug!(target: "runtime::repository", slot, "deleted save");
            }
        }
        Ok(())
    }

    fn list_slots(&self) -> Result<Vec<String>> {
        let mut slots = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Some(slot) = name
                .strip_suffix(".bin")
                .or_else(|| name.strip_suffix(".json"))
                && check_slot(slot).is_ok()
            {
                slots.push(slot.to_string());
            }
        }
        slots.sort_unstable();
        slots.dedup();
        Ok(slots)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tactics_core::{BrickRegistry, GameConfig, GameState, UnitSpec};

    use super::*;

    fn sample_save() -> SaveGame {
        let mut state = GameState::new(GameConfig::with_seed(9), Arc::new(BrickRegistry::new()));
        state.spawn_player(&UnitSpec::new("player", 20), tactics_core::Pos::new(1, 1));
        state.round = 4;
        state.to_save()
    }

    #[test]
    fn binary_and_json_slots_reload() {
        let dir = tempfile::tempdir().unwrap();
        for format in [SaveFormat::Binary, SaveFormat::Json] {
            let repo = FileSaveRepository::with_format(dir.path(), format).unwrap();
            let slot = format!("slot_{}", format.extension());
            repo.save(&slot, &sample_save()).unwrap();
            assert!(dir.path().join(format!("{slot}.{}", format.extension())).exists());

            let loaded = repo.load(&slot).unwrap().unwrap();
            assert_eq!(loaded.round, 4);
            assert_eq!(loaded.units.len(), 1);
        }
    }

    #[test]
    fn load_falls_back_to_the_other_format() {
        let dir = tempfile::tempdir().unwrap();
        let json = FileSaveRepository::with_format(dir.path(), SaveFormat::Json).unwrap();
        json.save("quick", &sample_save()).unwrap();

        let binary = FileSaveRepository::new(dir.path()).unwrap();
        assert!(binary.exists("quick"));
        assert_eq!(binary.load("quick").unwrap().unwrap().round, 4);
        assert_eq!(binary.list_slots().unwrap(), ["quick"]);

        binary.delete("quick").unwrap();
        assert!(binary.load("quick").unwrap().is_none());
    }

    #[test]
    fn rejects_path_like_slots_and_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileSaveRepository::new(dir.path()).unwrap();
        assert!(matches!(
            repo.save("../escape", &sample_save()),
            Err(RepositoryError::InvalidSlot(_))
        ));

        fs::write(dir.path().join("broken.bin"), b"\x01\x02").unwrap();
        assert!(matches!(
            repo.load("broken"),
            Err(RepositoryError::CorruptedData { .. })
        ));
    }
}
