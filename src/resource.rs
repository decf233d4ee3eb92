//! The realized form of a resource. A `ResourceInstance` is what gets rendered to yaml, and a
//! `ResourceState` is what the host persists: the instance plus the computed `id` and the rendered
//! `yaml` text.
mod definition;
pub mod json_ext;
pub mod object_id;

pub use self::definition::ResourceDefinition;
pub use self::json_ext::ResourceJson;
pub use self::object_id::{ObjectId, ObjectIdRef};

use crate::k8s_types::K8sType;

use serde_json::Value;

use std::collections::BTreeMap;

fn is_none_or_empty(map: &Option<BTreeMap<String, String>>) -> bool {
    map.as_ref().map(BTreeMap::is_empty).unwrap_or(true)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "is_none_or_empty")]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "is_none_or_empty")]
    pub annotations: Option<BTreeMap<String, String>>,
}

impl Metadata {
    pub fn new(name: impl Into<String>) -> Metadata {
        Metadata {
            name: name.into(),
            namespace: None,
            labels: None,
            annotations: None,
        }
    }

    pub fn object_id(&self) -> ObjectIdRef {
        ObjectIdRef::new(self.namespace.as_deref().unwrap_or(""), self.name.as_str())
    }
}

/// One occurrence of a CRD, in exactly the shape that's written to yaml. Field order here is the
/// order of the keys in the rendered document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInstance {
    pub api_version: String,
    pub kind: String,
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<Value>,
}

impl ResourceInstance {
    /// Creates an instance stamped with the constant apiVersion and kind of the given type
    pub fn new(k8s_type: &K8sType, metadata: Metadata, spec: Option<Value>) -> ResourceInstance {
        ResourceInstance {
            api_version: k8s_type.api_version.to_owned(),
            kind: k8s_type.kind.to_owned(),
            metadata,
            spec,
        }
    }

    pub fn object_id(&self) -> ObjectIdRef {
        self.metadata.object_id()
    }

    pub fn is_type(&self, k8s_type: &K8sType) -> bool {
        self.api_version == k8s_type.api_version && self.kind == k8s_type.kind
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    pub fn from_yaml(yaml: &str) -> Result<ResourceInstance, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }
}

/// What the host persists for each instance. The `id` is computed and is never part of the yaml.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    pub id: i64,
    pub yaml: String,
    pub instance: ResourceInstance,
}

impl ResourceState {
    pub fn object_id(&self) -> ObjectIdRef {
        self.instance.object_id()
    }

    /// Parses the rendered yaml back into a generic value, which is handy for inspecting exactly
    /// which keys were emitted.
    pub fn rendered_value(&self) -> Result<Value, serde_yaml::Error> {
        serde_yaml::from_str(&self.yaml)
    }
}
