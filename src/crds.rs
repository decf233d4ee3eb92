//! The CRDs that ship with this crate. Their descriptors live in `schemas/` and are compiled in,
//! so they're always available even without a schema directory.
use crate::config::schema_file::parse_definition;
use crate::k8s_types::{self, K8sType};
use crate::resource::ResourceDefinition;

use lazy_static::lazy_static;

const DESCRIPTORS: &[(&str, &str)] = &[
    ("database.yaml", include_str!("../schemas/database.yaml")),
    (
        "clusterdeployment.yaml",
        include_str!("../schemas/clusterdeployment.yaml"),
    ),
    ("certificate.yaml", include_str!("../schemas/certificate.yaml")),
];

lazy_static! {
    static ref BUILTIN: Vec<ResourceDefinition> = DESCRIPTORS
        .iter()
        .map(|(file_name, yaml)| match parse_definition(yaml) {
            Ok(def) => def,
            // the descriptors are compiled in, so this can only be a bug in one of them
            Err(err) => panic!("bundled schema descriptor '{}' is invalid: {}", file_name, err),
        })
        .collect();
}

/// Returns the definitions of all the bundled CRDs, in a stable order
pub fn builtin_definitions() -> Vec<ResourceDefinition> {
    BUILTIN.clone()
}

/// Returns the bundled definition for the given type, if there is one
pub fn builtin_definition(k8s_type: &K8sType) -> Option<ResourceDefinition> {
    BUILTIN
        .iter()
        .find(|def| def.k8s_type == k8s_type)
        .cloned()
}

pub fn database() -> Option<ResourceDefinition> {
    builtin_definition(k8s_types::databases_schemahero_io::v1alpha4::Database)
}

pub fn cluster_deployment() -> Option<ResourceDefinition> {
    builtin_definition(k8s_types::hive_openshift_io::v1::ClusterDeployment)
}

pub fn certificate() -> Option<ResourceDefinition> {
    builtin_definition(k8s_types::cert_manager_io::v1::Certificate)
}
