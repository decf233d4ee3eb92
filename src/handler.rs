//! The per-type lifecycle logic. Every resource type the provider exposes is backed by a
//! `ResourceHandler`. Most types only need a `ManifestHandler`, which validates the candidate and
//! renders it to yaml, but custom handlers can be registered to post-process the rendered
//! instance or to react to deletion.
use crate::error::ResourceError;
use crate::resource::{ResourceDefinition, ResourceInstance, ResourceState};

use serde_json::Value;

/// The main trait that backs each resource type. Only `definition` is required; the defaults for
/// everything else give the usual render-to-yaml behavior.
pub trait ResourceHandler: Send + Sync + 'static {
    /// The definition of the resource type that this handler manages
    fn definition(&self) -> &ResourceDefinition;

    /// Validates the candidate and returns the instance that will be rendered. Nothing is
    /// retained if this returns an error.
    fn render(&self, candidate: &Value) -> Result<ResourceInstance, ResourceError> {
        let instance = self.definition().materialize(candidate)?;
        Ok(instance)
    }

    /// Invoked when the host creates a new instance. The `id` has already been assigned by the
    /// provider.
    fn create(&self, candidate: &Value, id: i64) -> Result<ResourceState, ResourceError> {
        let instance = self.render(candidate)?;
        let yaml = instance.to_yaml()?;
        log::debug!(
            "Rendered {} '{}' with id: {}",
            instance.kind,
            instance.object_id(),
            id
        );
        Ok(ResourceState { id, yaml, instance })
    }

    /// Returns the state the host should see. The default simply hands back whatever was stored,
    /// since there's no remote system to refresh from.
    fn read(&self, stored: Option<&ResourceState>) -> Option<ResourceState> {
        stored.cloned()
    }

    /// Invoked when the host updates an existing instance. The prior state is `None` if the
    /// provider has no record of it. The default re-renders the candidate from scratch, exactly
    /// like `create`.
    fn update(
        &self,
        _prior: Option<&ResourceState>,
        candidate: &Value,
        id: i64,
    ) -> Result<ResourceState, ResourceError> {
        self.create(candidate, id)
    }

    /// Invoked after the state has been forgotten. Deleting can never fail.
    fn delete(&self, _prior: Option<ResourceState>) {}
}

/// Renders instances of a single `ResourceDefinition` to yaml without any further processing
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestHandler {
    definition: ResourceDefinition,
}

impl ManifestHandler {
    pub fn new(definition: ResourceDefinition) -> ManifestHandler {
        ManifestHandler { definition }
    }
}

impl ResourceHandler for ManifestHandler {
    fn definition(&self) -> &ResourceDefinition {
        &self.definition
    }
}

impl From<ResourceDefinition> for ManifestHandler {
    fn from(definition: ResourceDefinition) -> ManifestHandler {
        ManifestHandler::new(definition)
    }
}
