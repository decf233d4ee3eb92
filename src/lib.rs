//! Crdform exposes Kubernetes Custom Resource Definitions as declarative resources for a
//! configuration-management host, such as a Terraform provider. Each resource type validates a
//! nested configuration value against the CRD's schema and renders it to a yaml manifest. There's
//! no interaction with a Kubernetes API server: the rendered yaml is the whole output.
//!
//! CRD schemas are data, not code. The bundled CRDs are described by the yaml files in `schemas/`,
//! and more can be loaded from a directory at runtime using `ProviderConfig::with_schema_dir`.
//!
//! ```
//! use crdform::prelude::*;
//! use crdform::serde_json::json;
//!
//! let mut provider = Provider::new(ProviderConfig::new().with_builtin_crds());
//!
//! // the host reads the schemas once, to learn which attributes each resource type has
//! let schema = provider.schema("k8s_cert_manager_io_certificate_v1").unwrap();
//! assert!(schema.attribute_at("spec.secret_name").unwrap().required);
//!
//! let state = provider.create("k8s_cert_manager_io_certificate_v1", &json!({
//!     "metadata": {"name": "web", "namespace": "default"},
//!     "spec": {
//!         "secret_name": "web-tls",
//!         "issuer_ref": {"name": "letsencrypt", "kind": "ClusterIssuer"},
//!         "dns_names": ["example.com"],
//!     },
//! })).unwrap();
//! assert!(state.yaml.starts_with("apiVersion: cert-manager.io/v1\nkind: Certificate\n"));
//!
//! // delete never fails, and afterwards there's nothing left to read
//! provider.delete("k8s_cert_manager_io_certificate_v1", ("default", "web"));
//! assert!(provider.read("k8s_cert_manager_io_certificate_v1", ("default", "web")).unwrap().is_none());
//! ```
//!
//! Custom behavior for a resource type can be added by implementing `ResourceHandler` and
//! registering it with `ProviderConfig::with_handler`.

#[macro_use]
extern crate serde_derive;

pub mod compile;
pub mod config;
pub mod crds;
pub mod error;
pub mod handler;
pub mod k8s_types;
pub mod provider;
pub mod resource;
pub mod schema;

#[cfg(feature = "testkit")]
pub mod testkit;

pub use serde;
pub use serde_json;
pub use serde_yaml;

pub mod prelude {
    pub use crate::compile::{HostAttribute, HostSchema, HostType};
    pub use crate::config::{IdStrategy, ProviderConfig};
    pub use crate::error::{ErrorKind, ResourceError, ValidationError};
    pub use crate::handler::{ManifestHandler, ResourceHandler};
    pub use crate::k8s_types::{self, K8sType};
    pub use crate::provider::Provider;
    pub use crate::resource::{Metadata, ObjectId, ObjectIdRef, ResourceDefinition, ResourceInstance, ResourceState};
    pub use crate::schema::{ConfigField, Element, FieldKind, FieldMode, Validator};
    pub use serde::{Deserialize, Serialize};
}
