//! High-level runtime orchestrator.
//!
//! The runtime owns the session worker, wires up the command and event
//! channels, and hands out [`RuntimeHandle`]s.
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use tactics_content::{ContentFactory, TemplateBook};
use tactics_core::GameConfig;

use crate::api::{Result, RuntimeError, RuntimeHandle};
use crate::repository::{FileSaveRepository, SaveFormat};
use crate::session::Session;
use crate::workers::SessionWorker;

/// Runtime configuration shared across the orchestrator and the worker.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub game_config: GameConfig,
    /// Where save slots live.
    pub save_dir: PathBuf,
    pub save_format: SaveFormat,
    /// Directory holding `config.toml` and `units.ron`; built-in content when unset.
    pub data_dir: Option<PathBuf>,
    pub event_buffer_size: usize,
    pub command_buffer_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            game_config: GameConfig::default(),
            save_dir: default_save_dir(),
            save_format: SaveFormat::default(),
            data_dir: None,
            event_buffer_size: 100,
            command_buffer_size: 32,
        }
    }
}

impl RuntimeConfig {
    /// Construct configuration from process environment variables.
    ///
    /// - `TACTICS_SEED`
    /// - `SAVE_DATA_DIR` and `TACTICS_SAVE_FORMAT` (`bin` or `json`)
    /// - `TACTICS_DATA_DIR`
    /// - `TACTICS_EVENT_BUFFER` / `TACTICS_COMMAND_BUFFER`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(seed) = read_env::<u64>("TACTICS_SEED")? {
            config.game_config.seed = seed;
        }
        if let Ok(dir) = env::var("SAVE_DATA_DIR") {
            config.save_dir = PathBuf::from(dir);
        }
        if let Ok(format) = env::var("TACTICS_SAVE_FORMAT") {
            config.save_format = match format.to_lowercase().as_str() {
                "bin" | "binary" => SaveFormat::Binary,
                "json" => SaveFormat::Json,
                _ => {
                    return Err(RuntimeError::InvalidEnv {
                        key: "TACTICS_SAVE_FORMAT",
                        value: format,
                    });
                }
            };
        }
        if let Ok(dir) = env::var("TACTICS_DATA_DIR") {
            config.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(capacity) = read_env::<usize>("TACTICS_EVENT_BUFFER")? {
            config.event_buffer_size = capacity.max(1);
        }
        if let Some(capacity) = read_env::<usize>("TACTICS_COMMAND_BUFFER")? {
            config.command_buffer_size = capacity.max(1);
        }

        Ok(config)
    }

    /// Build the session this configuration describes: content from
    /// `data_dir` (or the built-in set) and a file repository at `save_dir`.
    ///
    /// A `config.toml` in `data_dir` replaces `game_config`, except for the seed.
    pub fn load_session(&self) -> Result<Session> {
        let (templates, registry, game_config) = match &self.data_dir {
            Some(dir) => {
                let factory = ContentFactory::new(dir);
                let (templates, registry) = factory.load_content()?;
                let game_config = GameConfig {
                    seed: self.game_config.seed,
                    ..factory.load_config()?
                };
                (templates, registry, game_config)
            }
            None => {
                let templates = TemplateBook::builtin();
                let registry = tactics_content::registry(&templates)?;
                (templates, registry, self.game_config.clone())
            }
        };
        let repository = FileSaveRepository::with_format(&self.save_dir, self.save_format)?;
        tracing::info!(
            target: "runtime::worker",
            save_dir = %self.save_dir.display(),
            bricks = registry.keys().len(),
            "content loaded"
        );
        Ok(Session::new(game_config, templates, registry).with_repository(Arc::new(repository)))
    }
}

/// Platform data directory, or `./save_data` when there is none.
pub fn default_save_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "tactics")
        .map(|dirs| dirs.data_dir().join("saves"))
        .unwrap_or_else(|| PathBuf::from("./save_data"))
}

/// Unset is `Ok(None)`; set but unparsable is an error.
fn read_env<T>(key: &'static str) -> Result<Option<T>>
where
    T: std::str::FromStr,
{
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| RuntimeError::InvalidEnv { key, value }),
        Err(_) => Ok(None),
    }
}

/// Owns the session worker task.
///
/// [`RuntimeHandle`] is the cloneable façade clients use.
pub struct Runtime {
    handle: RuntimeHandle,
    worker: JoinHandle<()>,
}

impl Runtime {
    /// Spawn the worker for `session` on the current tokio runtime.
    pub fn start(config: &RuntimeConfig, session: Session) -> Self {
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer_size);
        let (event_tx, _) = broadcast::channel(config.event_buffer_size);

        let worker = SessionWorker::new(session, command_rx, event_tx.clone());
        let worker = tokio::spawn(worker.run());

        Self {
            handle: RuntimeHandle::new(command_tx, event_tx),
            worker,
        }
    }

    /// Load content per `config` and start.
    pub fn from_config(config: &RuntimeConfig) -> Result<Self> {
        let session = config.load_session()?;
        Ok(Self::start(config, session))
    }

    pub fn handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }

    /// Wait for the worker to stop.
    ///
    /// The worker exits after a `shutdown` request or once every handle,
    /// including this one, is dropped.
    pub async fn shutdown(self) -> Result<()> {
        drop(self.handle);
        self.worker.await.map_err(RuntimeError::WorkerJoin)
    }
}
