//! Behavior registry: string ids to shared brick instances.
//!
//! Two independent namespaces per kind of behavior:
//! - a singleton cache of ready instances, keyed by full id;
//! - a factory table keyed by the part of the id before [`SEPARATOR`].
//!
//! Resolving `key+argument` builds through the `key` factory once and caches
//! the result under the full id, so the same id always yields the same `Arc`.
//! Registration is a startup-only operation (`&mut self`); lookups and lazy
//! factory inserts go through `&self` and are safe to share behind an `Arc`.
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::action::ActionBrick;
use crate::brick::Brick;
use crate::error::{ErrorSeverity, GameError};

/// Splits a full id into factory key and argument.
pub const SEPARATOR: char = '+';

/// Registry failures. All of them are configuration or content errors.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("behavior registered without an id")]
    MissingId,

    #[error("duplicate behavior id '{0}'")]
    DuplicateId(String),

    #[error("unknown behavior id '{0}'")]
    UnknownId(String),

    #[error("bad argument for '{key}': {reason}")]
    BadArgument { key: String, reason: String },

    #[error("registered as '{requested}' but reports id '{actual}'")]
    IdMismatch { requested: String, actual: String },
}

impl RegistryError {
    pub fn bad_argument(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BadArgument {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

impl GameError for RegistryError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Fatal
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingId => "REGISTRY_MISSING_ID",
            Self::DuplicateId(_) => "REGISTRY_DUPLICATE_ID",
            Self::UnknownId(_) => "REGISTRY_UNKNOWN_ID",
            Self::BadArgument { .. } => "REGISTRY_BAD_ARGUMENT",
            Self::IdMismatch { .. } => "REGISTRY_ID_MISMATCH",
        }
    }
}

/// Builds a parameterized instance from the argument after the separator.
pub type Factory<T> =
    Box<dyn Fn(Option<&str>, &BrickRegistry) -> Result<Arc<T>, RegistryError> + Send + Sync>;

/// Anything stored in the registry reports its own full id.
trait Identified {
    fn ident(&self) -> &str;
}

impl Identified for dyn Brick {
    fn ident(&self) -> &str {
        self.id()
    }
}

impl Identified for dyn ActionBrick {
    fn ident(&self) -> &str {
        self.id()
    }
}

struct Namespace<T: ?Sized> {
    label: &'static str,
    cache: RwLock<BTreeMap<String, Arc<T>>>,
    factories: BTreeMap<String, Factory<T>>,
}

impl<T: ?Sized + Identified> Namespace<T> {
    fn new(label: &'static str) -> Self {
        Self {
            label,
            cache: RwLock::new(BTreeMap::new()),
            factories: BTreeMap::new(),
        }
    }

    fn register_as(&mut self, id: &str, item: Arc<T>) -> Result<(), RegistryError> {
        if id.is_empty() || item.ident().is_empty() {
            return Err(RegistryError::MissingId);
        }
        if item.ident() != id {
            return Err(RegistryError::IdMismatch {
                requested: id.to_string(),
                actual: item.ident().to_string(),
            });
        }
        let cache = self.cache.get_mut().unwrap_or_else(PoisonError::into_inner);
        if cache.contains_key(id) {
            return Err(RegistryError::DuplicateId(id.to_string()));
        }
        tracing::debug!(target: "tactics::registry", namespace = self.label, id, "registered");
        cache.insert(id.to_string(), item);
        Ok(())
    }

    fn register_factory(&mut self, key: &str, factory: Factory<T>) -> Result<(), RegistryError> {
        if key.is_empty() {
            return Err(RegistryError::MissingId);
        }
        if self.factories.contains_key(key) {
            return Err(RegistryError::DuplicateId(key.to_string()));
        }
        tracing::debug!(target: "tactics::registry", namespace = self.label, key, "factory registered");
        self.factories.insert(key.to_string(), factory);
        Ok(())
    }

    fn cached(&self, id: &str) -> Option<Arc<T>> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    fn resolve(&self, id: &str, registry: &BrickRegistry) -> Result<Arc<T>, RegistryError> {
        if id.is_empty() {
            return Err(RegistryError::MissingId);
        }
        if let Some(hit) = self.cached(id) {
            return Ok(hit);
        }

        let (key, arg) = match id.split_once(SEPARATOR) {
            Some((key, arg)) => (key, Some(arg)),
            None => (id, None),
        };
        let factory = self
            .factories
            .get(key)
            .ok_or_else(|| RegistryError::UnknownId(id.to_string()))?;

        // the lock is not held here: factories may resolve nested ids
        let built = factory(arg, registry)?;
        let canonical = built.ident().to_string();
        let canonical_key = canonical.split_once(SEPARATOR).map_or(canonical.as_str(), |(k, _)| k);
        if canonical_key != key {
            return Err(RegistryError::IdMismatch {
                requested: id.to_string(),
                actual: canonical,
            });
        }

        // an alternate spelling of the argument shares the canonical instance
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let instance = Arc::clone(cache.entry(canonical.clone()).or_insert(built));
        let entry = cache.entry(id.to_string()).or_insert(instance);
        tracing::trace!(target: "tactics::registry", namespace = self.label, id, %canonical, "built from factory");
        Ok(Arc::clone(entry))
    }

    fn ids(&self) -> Vec<String> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    fn keys(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }
}

/// Store of every brick and action brick the game knows about.
pub struct BrickRegistry {
    bricks: Namespace<dyn Brick>,
    actions: Namespace<dyn ActionBrick>,
}

impl BrickRegistry {
    pub fn new() -> Self {
        Self {
            bricks: Namespace::new("brick"),
            actions: Namespace::new("action"),
        }
    }

    /// Register a singleton under its own id.
    pub fn register(&mut self, brick: Arc<dyn Brick>) -> Result<(), RegistryError> {
        let id = brick.id().to_string();
        self.bricks.register_as(&id, brick)
    }

    /// Register a singleton, checking that it reports `id`.
    pub fn register_as(&mut self, id: &str, brick: Arc<dyn Brick>) -> Result<(), RegistryError> {
        self.bricks.register_as(id, brick)
    }

    pub fn register_factory<F>(&mut self, key: &str, factory: F) -> Result<(), RegistryError>
    where
        F: Fn(Option<&str>, &BrickRegistry) -> Result<Arc<dyn Brick>, RegistryError>
            + Send
            + Sync
            + 'static,
    {
        self.bricks.register_factory(key, Box::new(factory))
    }

    pub fn resolve(&self, id: &str) -> Result<Arc<dyn Brick>, RegistryError> {
        self.bricks.resolve(id, self)
    }

    /// Like [`resolve`](Self::resolve) but absence, or a rejected argument, is `None`.
    pub fn try_resolve(&self, id: &str) -> Option<Arc<dyn Brick>> {
        self.resolve(id).ok()
    }

    pub fn register_action(&mut self, action: Arc<dyn ActionBrick>) -> Result<(), RegistryError> {
        let id = action.id().to_string();
        self.actions.register_as(&id, action)
    }

    pub fn register_action_factory<F>(&mut self, key: &str, factory: F) -> Result<(), RegistryError>
    where
        F: Fn(Option<&str>, &BrickRegistry) -> Result<Arc<dyn ActionBrick>, RegistryError>
            + Send
            + Sync
            + 'static,
    {
        self.actions.register_factory(key, Box::new(factory))
    }

    pub fn resolve_action(&self, id: &str) -> Result<Arc<dyn ActionBrick>, RegistryError> {
        self.actions.resolve(id, self)
    }

    pub fn try_resolve_action(&self, id: &str) -> Option<Arc<dyn ActionBrick>> {
        self.resolve_action(id).ok()
    }

    /// Brick ids currently cached, singletons and built instances alike.
    pub fn ids(&self) -> Vec<String> {
        self.bricks.ids()
    }

    /// Brick factory keys.
    pub fn keys(&self) -> Vec<String> {
        self.bricks.keys()
    }

    /// Action ids currently cached.
    pub fn action_ids(&self) -> Vec<String> {
        self.actions.ids()
    }

    pub fn action_keys(&self) -> Vec<String> {
        self.actions.keys()
    }
}

impl Default for BrickRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BrickRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrickRegistry")
            .field("bricks", &self.bricks.ids())
            .field("brick_factories", &self.bricks.keys())
            .field("actions", &self.actions.ids())
            .field("action_factories", &self.actions.keys())
            .finish()
    }
}
