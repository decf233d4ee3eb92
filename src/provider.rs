//! The boundary that the host talks to. A `Provider` exposes one resource type per registered
//! handler, and dispatches the four lifecycle operations to the handler for the named type.
//!
//! Every operation runs to completion before returning, and state is only ever written after an
//! operation has fully succeeded. A failed `create` or `update` leaves the store exactly as it
//! was.
//!
//! ```
//! use crdform::config::{IdStrategy, ProviderConfig};
//! use crdform::provider::Provider;
//! use crdform::serde_json::json;
//!
//! let config = ProviderConfig::new()
//!     .with_builtin_crds()
//!     .with_id_strategy(IdStrategy::Sequence { start: 1 });
//! let mut provider = Provider::new(config);
//!
//! let state = provider
//!     .create(
//!         "k8s_databases_schemahero_io_database_v1alpha4",
//!         &json!({
//!             "metadata": {"name": "db1"},
//!             "spec": {"connection": {"sqlite": {"dsn": "file:test.db"}}},
//!         }),
//!     )
//!     .unwrap();
//! assert_eq!(1, state.id);
//! assert!(state.yaml.contains("kind: Database"));
//! ```
pub mod id;
pub mod metrics;
pub mod state;

use crate::compile::{compile_definition, HostSchema};
use crate::config::ProviderConfig;
use crate::error::ResourceError;
use crate::handler::ResourceHandler;
use crate::k8s_types::{K8sType, TypeTable};
use crate::resource::{ObjectIdRef, ResourceJson, ResourceState};

use self::id::IdClock;
use self::metrics::{Metrics, Operation};
use self::state::StateStore;

use serde_json::Value;

use std::collections::HashMap;
use std::sync::Arc;

pub struct Provider {
    types: TypeTable,
    handlers: HashMap<String, Arc<dyn ResourceHandler>>,
    /// resource type names in the order they were first registered
    type_names: Vec<String>,
    state: StateStore,
    ids: IdClock,
    metrics: Metrics,
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("types", &self.type_names)
            .field("ids", &self.ids)
            .finish()
    }
}

impl Provider {
    pub fn new(config: ProviderConfig) -> Provider {
        let ProviderConfig {
            type_prefix,
            id_strategy,
            handlers: configured,
        } = config;

        let mut types = TypeTable::new();
        let mut handlers = HashMap::new();
        let mut type_names = Vec::new();
        for handler in configured {
            let k8s_type = handler.definition().k8s_type;
            let (type_name, previous) = types.insert(&type_prefix, k8s_type);
            match previous {
                Some(previous)
                    if previous.api_version == k8s_type.api_version && previous.kind == k8s_type.kind =>
                {
                    log::warn!(
                        "Replacing the handler for resource type: '{}' ({})",
                        type_name,
                        k8s_type
                    );
                }
                Some(previous) => {
                    log::warn!(
                        "Resource type name '{}' is shared by {} and {}, so only {} will be available",
                        type_name,
                        previous,
                        k8s_type,
                        k8s_type
                    );
                }
                None => {
                    log::debug!("Registered resource type: '{}' ({})", type_name, k8s_type);
                    type_names.push(type_name.clone());
                }
            }
            handlers.insert(type_name, handler);
        }
        log::info!("Created provider with {} resource types", type_names.len());

        Provider {
            types,
            handlers,
            type_names,
            state: StateStore::new(),
            ids: IdClock::new(id_strategy),
            metrics: Metrics::new(),
        }
    }

    /// The names of every resource type, in registration order
    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.type_names.iter().map(String::as_str)
    }

    pub fn k8s_type(&self, resource_type: &str) -> Option<&'static K8sType> {
        self.types.get(resource_type)
    }

    /// Compiles the host schema for the given resource type
    pub fn schema(&self, resource_type: &str) -> Result<HostSchema, ResourceError> {
        let handler = self.handler(resource_type)?;
        Ok(compile_definition(resource_type, handler.definition()))
    }

    /// Compiles the host schemas of all resource types, in registration order
    pub fn schemas(&self) -> Vec<HostSchema> {
        self.type_names
            .iter()
            .filter_map(|name| {
                self.handlers
                    .get(name)
                    .map(|handler| compile_definition(name, handler.definition()))
            })
            .collect()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Validates and renders the candidate, and stores the result under the identity from its
    /// metadata. An existing state with the same identity is replaced.
    pub fn create(&mut self, resource_type: &str, candidate: &Value) -> Result<ResourceState, ResourceError> {
        let handler = self.handler(resource_type)?;
        let k8s_type = handler.definition().k8s_type;
        self.metrics.operation_invoked(k8s_type, Operation::Create);

        let id = self.next_id(k8s_type, Operation::Create)?;
        let state = handler
            .create(candidate, id)
            .map_err(|err| self.operation_failed(k8s_type, Operation::Create, candidate, err))?;
        self.ids.commit(id);

        let previous = self.state.insert(resource_type, state.clone());
        if let Some(previous) = previous {
            log::warn!(
                "Create of {} '{}' replaced existing state with id: {}",
                k8s_type,
                state.object_id(),
                previous.id
            );
        }
        self.update_instance_count(resource_type, k8s_type);
        log::info!(
            "Created {} '{}' with id: {}",
            k8s_type,
            state.object_id(),
            state.id
        );
        Ok(state)
    }

    /// Returns the stored state for the instance, or `None` if there isn't one. Nothing is ever
    /// refreshed, since there's no remote system to read from.
    pub fn read<'a>(
        &self,
        resource_type: &str,
        id: impl Into<ObjectIdRef<'a>>,
    ) -> Result<Option<ResourceState>, ResourceError> {
        let handler = self.handler(resource_type)?;
        self.metrics
            .operation_invoked(handler.definition().k8s_type, Operation::Read);
        Ok(handler.read(self.state.get(resource_type, id)))
    }

    /// Re-validates and re-renders the candidate from scratch, always assigning a new `id`. If the
    /// identity in the candidate differs from `prior`, the prior state is removed. Moving onto the
    /// identity of another instance that already has state is an `IdentityConflict`, and leaves
    /// both states untouched.
    pub fn update<'a>(
        &mut self,
        resource_type: &str,
        prior: impl Into<ObjectIdRef<'a>>,
        candidate: &Value,
    ) -> Result<ResourceState, ResourceError> {
        let prior = prior.into();
        let handler = self.handler(resource_type)?;
        let k8s_type = handler.definition().k8s_type;
        self.metrics.operation_invoked(k8s_type, Operation::Update);

        let prior_state = self.state.get(resource_type, prior);
        if prior_state.is_none() {
            log::warn!(
                "Updating {} '{}', which has no prior state",
                k8s_type,
                prior
            );
        }
        let id = self.next_id(k8s_type, Operation::Update)?;
        let result = handler.update(prior_state, candidate, id);
        let state =
            result.map_err(|err| self.operation_failed(k8s_type, Operation::Update, candidate, err))?;

        if state.object_id() != prior {
            if let Some(existing) = self.state.get(resource_type, state.object_id()) {
                log::warn!(
                    "Update of {} '{}' would replace the state of '{}' with id: {}",
                    k8s_type,
                    prior,
                    existing.object_id(),
                    existing.id
                );
                return Err(ResourceError::IdentityConflict {
                    id: state.object_id().to_owned(),
                    existing_id: existing.id,
                });
            }
        }
        self.ids.commit(id);

        if state.object_id() != prior {
            log::info!(
                "Update of {} moved the instance from '{}' to '{}'",
                k8s_type,
                prior,
                state.object_id()
            );
            self.state.remove(resource_type, prior);
        }
        self.state.insert(resource_type, state.clone());
        self.update_instance_count(resource_type, k8s_type);
        log::info!(
            "Updated {} '{}' with id: {}",
            k8s_type,
            state.object_id(),
            state.id
        );
        Ok(state)
    }

    /// Forgets the state of the instance and returns it, if there was any. This never fails, even
    /// for an unknown resource type.
    pub fn delete<'a>(&mut self, resource_type: &str, id: impl Into<ObjectIdRef<'a>>) -> Option<ResourceState> {
        let id = id.into();
        let handler = match self.handler(resource_type) {
            Ok(handler) => handler,
            Err(_) => {
                log::warn!(
                    "Ignoring delete of '{}' for unknown resource type: '{}'",
                    id,
                    resource_type
                );
                return None;
            }
        };
        let k8s_type = handler.definition().k8s_type;
        self.metrics.operation_invoked(k8s_type, Operation::Delete);

        let removed = self.state.remove(resource_type, id);
        match removed.as_ref() {
            Some(state) => log::info!("Deleted {} '{}' with id: {}", k8s_type, id, state.id),
            None => log::debug!("Delete of {} '{}' found no existing state", k8s_type, id),
        }
        handler.delete(removed.clone());
        self.update_instance_count(resource_type, k8s_type);
        removed
    }

    /// All stored states of the given type
    pub fn states<'a>(&'a self, resource_type: &str) -> impl Iterator<Item = &'a ResourceState> + 'a {
        self.state.iter_type(resource_type)
    }

    /// Peeks the id for a new state, which is only committed once the state is stored
    fn next_id(&self, k8s_type: &K8sType, operation: Operation) -> Result<i64, ResourceError> {
        self.ids.peek().ok_or_else(|| {
            log::error!("Failed to {} {}: no ids are left", operation, k8s_type);
            ResourceError::IdsExhausted
        })
    }

    fn handler(&self, resource_type: &str) -> Result<Arc<dyn ResourceHandler>, ResourceError> {
        self.handlers
            .get(resource_type)
            .cloned()
            .ok_or_else(|| ResourceError::UnknownResourceType(resource_type.to_owned()))
    }

    fn operation_failed(
        &self,
        k8s_type: &K8sType,
        operation: Operation,
        candidate: &Value,
        err: ResourceError,
    ) -> ResourceError {
        if err.as_validation().is_some() {
            self.metrics.validation_failed(k8s_type);
        }
        match candidate.get_id_ref() {
            Some(id) => log::debug!("Failed to {} {} '{}': {}", operation, k8s_type, id, err),
            None => log::debug!("Failed to {} {}: {}", operation, k8s_type, err),
        }
        err
    }

    fn update_instance_count(&self, resource_type: &str, k8s_type: &K8sType) {
        self.metrics
            .set_instance_count(k8s_type, self.state.count(resource_type));
    }
}
