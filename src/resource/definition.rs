use crate::error::ValidationError;
use crate::k8s_types::K8sType;
use crate::resource::{Metadata, ResourceInstance};
use crate::schema::{ConfigField, FieldPath, Validator};

use serde_json::Value;

pub const METADATA: &str = "metadata";
pub const SPEC: &str = "spec";
pub const ID: &str = "id";
pub const YAML: &str = "yaml";

/// Everything needed to validate, render, and describe one CRD: its constant type triple and the
/// schema of its `spec`. The full tree, including `metadata` and the computed `id` and `yaml`
/// attributes, is assembled once when the definition is built.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDefinition {
    pub k8s_type: &'static K8sType,
    pub namespaced: bool,
    pub description: String,
    envelope: ConfigField,
}

impl ResourceDefinition {
    /// A namespaced resource with no `spec`
    pub fn new(k8s_type: &'static K8sType) -> ResourceDefinition {
        ResourceDefinition {
            k8s_type,
            namespaced: true,
            description: String::new(),
            envelope: envelope(true, None),
        }
    }

    /// Sets an optional `spec` with the given fields
    pub fn with_spec(self, fields: Vec<ConfigField>) -> Self {
        self.with_spec_field(ConfigField::object(SPEC, fields))
    }

    /// Sets a `spec` with the given fields that must always be present
    pub fn with_required_spec(self, fields: Vec<ConfigField>) -> Self {
        self.with_spec_field(ConfigField::object(SPEC, fields).required())
    }

    /// Sets the `spec`. The name of the field is always forced to `spec`.
    pub fn with_spec_field(mut self, spec: ConfigField) -> Self {
        let spec = ConfigField {
            name: SPEC.to_owned(),
            attribute: SPEC.to_owned(),
            ..spec
        };
        self.envelope = envelope(self.namespaced, Some(spec));
        self
    }

    pub fn cluster_scoped(mut self) -> Self {
        self.namespaced = false;
        let spec = self.spec().cloned();
        self.envelope = envelope(false, spec);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn spec(&self) -> Option<&ConfigField> {
        self.envelope.child(SPEC)
    }

    pub fn metadata(&self) -> &ConfigField {
        // always present, since every envelope is created by `envelope()`
        &self.envelope.children().unwrap_or(&[])[0]
    }

    /// The whole tree: `id`, `yaml`, `metadata`, and `spec` if there is one
    pub fn root(&self) -> &ConfigField {
        &self.envelope
    }

    /// Validates the candidate and stamps the constant apiVersion and kind onto the result.
    /// Nothing about the candidate is retained if validation fails.
    pub fn materialize(&self, candidate: &Value) -> Result<ResourceInstance, ValidationError> {
        let mut rendered = self
            .envelope
            .validate(Some(candidate))?
            .and_then(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .unwrap_or_default();

        let metadata_value = rendered.remove(METADATA).unwrap_or(Value::Null);
        let metadata: Metadata = serde_json::from_value(metadata_value).map_err(|e| {
            ValidationError::violation(&FieldPath::from(METADATA), e.to_string())
        })?;
        let spec = rendered.remove(SPEC);
        Ok(ResourceInstance::new(self.k8s_type, metadata, spec))
    }
}

fn envelope(namespaced: bool, spec: Option<ConfigField>) -> ConfigField {
    let mut fields = vec![metadata_field(namespaced)];
    fields.extend(spec);
    fields.push(
        ConfigField::int(ID)
            .computed()
            .describe("Identifier of the current state, assigned on every create and update"),
    );
    fields.push(
        ConfigField::string(YAML)
            .computed()
            .describe("The rendered yaml manifest"),
    );
    ConfigField::object("", fields).required()
}

fn metadata_field(namespaced: bool) -> ConfigField {
    let mut fields = vec![ConfigField::string("name")
        .required()
        .describe("Unique name of the resource within its namespace")
        .validate_with_all(Validator::dns_subdomain())];
    if namespaced {
        fields.push(
            ConfigField::string("namespace")
                .describe("Namespace of the resource, or the default namespace if unset")
                .validate_with_all(Validator::dns_label()),
        );
    }
    fields.push(
        ConfigField::string_map("labels")
            .describe("Map of string keys and values used to organize and select resources"),
    );
    fields.push(
        ConfigField::string_map("annotations")
            .describe("Map of string keys and values for arbitrary, non-identifying metadata"),
    );
    ConfigField::object(METADATA, fields)
        .required()
        .describe("Data that identifies the resource")
}
