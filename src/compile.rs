//! Translates schema trees into the attribute schema that's handed to the host. This is a purely
//! structural translation: compiling the same tree twice always yields identical output.
use crate::resource::ResourceDefinition;
use crate::schema::reference::reference_shape;
use crate::schema::{ConfigField, Element, FieldKind, FieldMode, Validator};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HostType {
    String,
    Bool,
    Int64,
    Float64,
    Dynamic,
    List(Box<HostType>),
    Map(Box<HostType>),
    Object(Vec<HostAttribute>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostAttribute {
    pub name: String,
    #[serde(rename = "type")]
    pub host_type: HostType,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub sensitive: bool,
    /// Human readable descriptions of the validators that apply to this attribute
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<String>,
}

impl HostAttribute {
    pub fn nested(&self) -> Option<&[HostAttribute]> {
        match self.host_type {
            HostType::Object(ref attrs) => Some(attrs.as_slice()),
            HostType::List(ref element) | HostType::Map(ref element) => match **element {
                HostType::Object(ref attrs) => Some(attrs.as_slice()),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn find(&self, name: &str) -> Option<&HostAttribute> {
        self.nested()
            .and_then(|attrs| attrs.iter().find(|a| a.name == name))
    }
}

/// The schema of one resource type, as presented to the host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostSchema {
    pub type_name: String,
    pub api_version: String,
    pub kind: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub attributes: Vec<HostAttribute>,
}

impl HostSchema {
    pub fn attribute(&self, name: &str) -> Option<&HostAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Looks up a nested attribute using a dotted path of attribute names, like `spec.connection`
    pub fn attribute_at(&self, dotted_path: &str) -> Option<&HostAttribute> {
        let mut segments = dotted_path.split('.');
        let first = self.attribute(segments.next()?)?;
        segments.try_fold(first, |attr, name| attr.find(name))
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Compiles the full schema for a resource type, including the computed `id` and `yaml` attributes
pub fn compile_definition(type_name: &str, definition: &ResourceDefinition) -> HostSchema {
    let attributes = definition
        .root()
        .children()
        .unwrap_or(&[])
        .iter()
        .map(compile)
        .collect();
    let description = if definition.description.is_empty() {
        format!(
            "Renders a {} ({}) manifest as yaml",
            definition.k8s_type.kind, definition.k8s_type.api_version
        )
    } else {
        definition.description.clone()
    };
    HostSchema {
        type_name: type_name.to_owned(),
        api_version: definition.k8s_type.api_version.to_owned(),
        kind: definition.k8s_type.kind.to_owned(),
        description,
        attributes,
    }
}

/// Compiles a single field and all of its descendants
pub fn compile(field: &ConfigField) -> HostAttribute {
    let (required, optional, computed) = match field.mode {
        FieldMode::Required => (true, false, false),
        // the api server fills in defaults, so the value may change underneath the host
        FieldMode::Optional => (false, true, field.has_default),
        FieldMode::Computed => (false, false, true),
    };
    let mut validators = describe_validators(&field.validators);
    HostAttribute {
        name: field.attribute.clone(),
        host_type: compile_kind(&field.kind, &mut validators),
        description: field.description.clone(),
        required,
        optional,
        computed,
        sensitive: field.sensitive,
        validators,
    }
}

fn compile_kind(kind: &FieldKind, validators: &mut Vec<String>) -> HostType {
    match *kind {
        FieldKind::String => HostType::String,
        FieldKind::Bool => HostType::Bool,
        FieldKind::Int => HostType::Int64,
        FieldKind::Float => HostType::Float64,
        FieldKind::Any => HostType::Dynamic,
        FieldKind::List(ref element) => HostType::List(Box::new(compile_element(element, validators))),
        FieldKind::Map(ref element) => HostType::Map(Box::new(compile_element(element, validators))),
        FieldKind::Object(ref children) => HostType::Object(children.iter().map(compile).collect()),
        FieldKind::Reference => HostType::Object(reference_shape().iter().map(compile).collect()),
    }
}

fn compile_element(element: &Element, validators: &mut Vec<String>) -> HostType {
    validators.extend(
        element
            .validators
            .iter()
            .map(|v| format!("each element: {}", v)),
    );
    compile_kind(&element.kind, validators)
}

fn describe_validators(validators: &[Validator]) -> Vec<String> {
    validators.iter().map(ToString::to_string).collect()
}
