//! Configuration for a `Provider`: which resource types it exposes, how they're named, and how
//! ids are assigned. Everything is set through a builder:
//!
//! ```no_run
//! use crdform::config::{IdStrategy, ProviderConfig};
//!
//! let config = ProviderConfig::new()
//!     .with_builtin_crds()
//!     .with_id_strategy(IdStrategy::Sequence { start: 1 });
//! ```
pub mod schema_file;

use crate::crds;
use crate::handler::{ManifestHandler, ResourceHandler};
use crate::resource::ResourceDefinition;

use std::fmt::{self, Debug};
use std::path::Path;
use std::sync::Arc;

pub use self::schema_file::SchemaFileError;

pub const DEFAULT_TYPE_PREFIX: &str = "k8s";

/// How the computed `id` of each new state is assigned
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IdStrategy {
    /// Nanoseconds since the unix epoch, forced to be strictly increasing within one provider
    WallClock,
    /// Consecutive integers starting at `start`. Useful for tests, where ids need to be predictable.
    Sequence { start: i64 },
}

impl Default for IdStrategy {
    fn default() -> IdStrategy {
        IdStrategy::WallClock
    }
}

#[derive(Clone)]
pub struct ProviderConfig {
    /// Prepended to every resource type name, as in `k8s_cert_manager_io_certificate_v1`
    pub type_prefix: String,
    pub id_strategy: IdStrategy,
    pub handlers: Vec<Arc<dyn ResourceHandler>>,
}

impl Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let types: Vec<_> = self
            .handlers
            .iter()
            .map(|h| h.definition().k8s_type)
            .collect();
        f.debug_struct("ProviderConfig")
            .field("type_prefix", &self.type_prefix)
            .field("id_strategy", &self.id_strategy)
            .field("types", &types)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> ProviderConfig {
        ProviderConfig::new()
    }
}

impl ProviderConfig {
    /// An empty configuration with no resource types
    pub fn new() -> ProviderConfig {
        ProviderConfig {
            type_prefix: DEFAULT_TYPE_PREFIX.to_owned(),
            id_strategy: IdStrategy::default(),
            handlers: Vec::new(),
        }
    }

    pub fn with_type_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.type_prefix = prefix.into();
        self
    }

    pub fn with_id_strategy(mut self, id_strategy: IdStrategy) -> Self {
        self.id_strategy = id_strategy;
        self
    }

    /// Adds a resource type that's rendered by a plain `ManifestHandler`
    pub fn with_resource(self, definition: ResourceDefinition) -> Self {
        self.with_handler(ManifestHandler::new(definition))
    }

    /// Adds a resource type that's backed by a custom handler. If another handler was already
    /// added for the same type, the later one wins.
    pub fn with_handler(mut self, handler: impl ResourceHandler) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Adds all of the CRDs that are bundled with this crate
    pub fn with_builtin_crds(self) -> Self {
        crds::builtin_definitions()
            .into_iter()
            .fold(self, ProviderConfig::with_resource)
    }

    /// Adds a resource type for every descriptor file in the given directory
    pub fn with_schema_dir(self, dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let definitions = schema_file::load_dir(dir)?;
        Ok(definitions
            .into_iter()
            .fold(self, ProviderConfig::with_resource))
    }

    /// Creates a config with the bundled CRDs plus any descriptors found in the default schema
    /// directory. A missing default directory is not an error, since it's entirely optional.
    pub fn from_env() -> anyhow::Result<ProviderConfig> {
        let config = ProviderConfig::new().with_builtin_crds();
        let dir = schema_file::default_schema_dir()?;
        if dir.is_dir() {
            config.with_schema_dir(&dir)
        } else {
            log::debug!(
                "Schema directory '{}' does not exist, using only bundled CRDs",
                dir.display()
            );
            Ok(config)
        }
    }
}
