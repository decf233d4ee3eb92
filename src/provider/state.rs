use crate::resource::object_id::{ObjectId, ObjectIdRef};
use crate::resource::ResourceState;

use std::collections::HashMap;

/// A map keyed by namespace and then by name
#[derive(Debug, Clone)]
pub struct IdMap<T>(HashMap<String, HashMap<String, T>>);

impl<T> Default for IdMap<T> {
    fn default() -> IdMap<T> {
        IdMap::new()
    }
}

impl<T> IdMap<T> {
    pub fn new() -> IdMap<T> {
        IdMap(HashMap::new())
    }

    pub fn contains<'a>(&self, id: impl Into<ObjectIdRef<'a>>) -> bool {
        let id = id.into();
        self.0
            .get(id.namespace)
            .map(|by_name| by_name.contains_key(id.name))
            .unwrap_or(false)
    }

    pub fn get<'a>(&self, id: impl Into<ObjectIdRef<'a>>) -> Option<&T> {
        let id = id.into();
        self.0.get(id.namespace).and_then(|by_name| by_name.get(id.name))
    }

    pub fn insert(&mut self, id: ObjectId, value: T) -> Option<T> {
        let ObjectId { namespace, name } = id;
        self.0.entry(namespace).or_default().insert(name, value)
    }

    pub fn remove<'a>(&mut self, id: impl Into<ObjectIdRef<'a>>) -> Option<T> {
        let id = id.into();
        let by_name = self.0.get_mut(id.namespace)?;
        let removed = by_name.remove(id.name);
        if by_name.is_empty() {
            self.0.remove(id.namespace);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.0.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectIdRef, &T)> {
        self.0.iter().flat_map(|(namespace, by_name)| {
            by_name
                .iter()
                .map(move |(name, value)| (ObjectIdRef { namespace, name }, value))
        })
    }
}

/// The persisted state of every instance, keyed by resource type name and then by identity.
/// This stands in for the host's own state storage.
#[derive(Debug, Clone, Default)]
pub struct StateStore(HashMap<String, IdMap<ResourceState>>);

impl StateStore {
    pub fn new() -> StateStore {
        StateStore(HashMap::new())
    }

    pub fn get<'a>(&self, resource_type: &str, id: impl Into<ObjectIdRef<'a>>) -> Option<&ResourceState> {
        self.0.get(resource_type).and_then(|states| states.get(id))
    }

    /// Stores the state under the identity from its own metadata, returning whatever was there
    pub fn insert(&mut self, resource_type: &str, state: ResourceState) -> Option<ResourceState> {
        let id = state.object_id().to_owned();
        self.0
            .entry(resource_type.to_owned())
            .or_default()
            .insert(id, state)
    }

    pub fn remove<'a>(&mut self, resource_type: &str, id: impl Into<ObjectIdRef<'a>>) -> Option<ResourceState> {
        self.0
            .get_mut(resource_type)
            .and_then(|states| states.remove(id))
    }

    pub fn count(&self, resource_type: &str) -> usize {
        self.0.get(resource_type).map(IdMap::len).unwrap_or(0)
    }

    pub fn iter_type<'a>(&'a self, resource_type: &str) -> impl Iterator<Item = &'a ResourceState> + 'a {
        self.0
            .get(resource_type)
            .into_iter()
            .flat_map(|states| states.iter().map(|(_, state)| state))
    }
}
