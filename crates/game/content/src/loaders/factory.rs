//! Content factory for loading everything from one data directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tactics_core::{BrickRegistry, GameConfig};

use crate::loaders::{ConfigLoader, LoadResult, UnitLoader};
use crate::templates::TemplateBook;

/// Loads game content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── config.toml
/// └── units.ron
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// The directory shipped with this crate.
    pub fn bundled() -> Self {
        Self::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("data"))
    }

    pub fn load_config(&self) -> LoadResult<GameConfig> {
        ConfigLoader::load(&self.data_dir.join("config.toml"))
    }

    pub fn load_units(&self) -> LoadResult<TemplateBook> {
        UnitLoader::load(&self.data_dir.join("units.ron"))
    }

    /// Templates plus a registry they have been validated against.
    pub fn load_content(&self) -> LoadResult<(TemplateBook, Arc<BrickRegistry>)> {
        let book = self.load_units()?;
        let registry = crate::registry(&book)?;
        Ok((book, registry))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_paths() {
        let factory = ContentFactory::new("/tmp/data");
        assert_eq!(factory.data_dir(), Path::new("/tmp/data"));
    }

    #[test]
    fn bundled_content_loads_and_validates() {
        let factory = ContentFactory::bundled();
        let config = factory.load_config().unwrap();
        assert!(config.energy_per_round > 0);
        let (book, registry) = factory.load_content().unwrap();
        assert!(book.get("player").is_ok());
        assert!(registry.try_resolve("spawn_defender").is_some());
    }

    #[test]
    fn loads_from_a_temporary_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("units.ron"), r#"[(template: "rat", hp: 2)]"#).unwrap();
        std::fs::write(dir.path().join("config.toml"), "seed = 9\n").unwrap();
        let factory = ContentFactory::new(dir.path());
        assert_eq!(factory.load_config().unwrap().seed, 9);
        assert_eq!(factory.load_units().unwrap().names().collect::<Vec<_>>(), ["rat"]);
    }
}
