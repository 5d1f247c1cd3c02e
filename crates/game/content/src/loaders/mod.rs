//! Content loaders for reading game data from files.
//!
//! Unit templates come from RON and the game configuration from TOML. Loaders
//! sit at the edge of the program, so they report through `anyhow`.

pub mod config;
pub mod factory;
pub mod units;

pub use config::ConfigLoader;
pub use factory::ContentFactory;
pub use units::UnitLoader;

use std::path::Path;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}
