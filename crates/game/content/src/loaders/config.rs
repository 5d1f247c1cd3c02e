//! Game configuration loader.

use std::path::Path;

use tactics_core::GameConfig;

use crate::loaders::{LoadResult, read_file};

/// Loads [`GameConfig`] from TOML. Missing keys keep their defaults.
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load(path: &Path) -> LoadResult<GameConfig> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<GameConfig> {
        let config: GameConfig =
            toml::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?;
        tracing::debug!(target: "tactics::content", seed = config.seed, "config loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config = ConfigLoader::parse("seed = 42\ndefault_save_dc = 18\n").unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.default_save_dc, 18);
        assert_eq!(config.energy_per_round, GameConfig::DEFAULT_ENERGY_PER_ROUND);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(ConfigLoader::parse("seed = \"many\"").is_err());
    }
}
