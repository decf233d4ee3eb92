//! Loads resource definitions from yaml descriptor files, so that supporting a new CRD is a matter
//! of adding a data file rather than writing code. See `schemas/` in this repository for examples.
use crate::k8s_types;
use crate::resource::ResourceDefinition;
use crate::schema::{ConfigField, Element, FieldKind, Validator};

use anyhow::Context;
use dirs::home_dir;
use serde_json::Value;

use std::fmt::{self, Display};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

pub const SCHEMA_DIR_ENV_VAR: &str = "CRDFORM_SCHEMA_DIR";
const DEFAULT_SCHEMA_DIR: &str = ".crdform/schemas";
const NO_HOME_DIR_MESSAGE: &str = "Unable to determine HOME directory to load ~/.crdform/schemas";

/// Error representing a problem with loading or interpreting a schema descriptor
#[derive(Debug)]
pub enum SchemaFileError {
    Io(io::Error),
    Format(serde_yaml::Error),
    NoHomeDir,
    Invalid(String),
}

impl From<serde_yaml::Error> for SchemaFileError {
    fn from(err: serde_yaml::Error) -> SchemaFileError {
        SchemaFileError::Format(err)
    }
}

impl From<io::Error> for SchemaFileError {
    fn from(err: io::Error) -> SchemaFileError {
        SchemaFileError::Io(err)
    }
}

impl Display for SchemaFileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            SchemaFileError::Io(ref e) => write!(f, "IO error: {}", e),
            SchemaFileError::Format(ref e) => write!(f, "Schema descriptor format error: {}", e),
            SchemaFileError::NoHomeDir => f.write_str(NO_HOME_DIR_MESSAGE),
            SchemaFileError::Invalid(ref msg) => write!(f, "Invalid schema descriptor: {}", msg),
        }
    }
}
impl std::error::Error for SchemaFileError {}

fn invalid(path: &str, msg: impl Display) -> SchemaFileError {
    SchemaFileError::Invalid(format!("{}: {}", path, msg))
}

/// Returns the directory named by `CRDFORM_SCHEMA_DIR`, or else `~/.crdform/schemas`
pub fn default_schema_dir() -> Result<PathBuf, SchemaFileError> {
    std::env::var(SCHEMA_DIR_ENV_VAR)
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            home_dir().map(|mut home| {
                home.push(DEFAULT_SCHEMA_DIR);
                home
            })
        })
        .ok_or(SchemaFileError::NoHomeDir)
}

/// Loads every `.yaml` and `.yml` file in the directory, in file name order
pub fn load_dir(dir: impl AsRef<Path>) -> anyhow::Result<Vec<ResourceDefinition>> {
    let dir = dir.as_ref();
    let mut paths = Vec::new();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read schema directory: '{}'", dir.display()))?;
    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to list schema directory: '{}'", dir.display()))?
            .path();
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e == "yaml" || e == "yml")
            .unwrap_or(false);
        if is_yaml && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut definitions = Vec::with_capacity(paths.len());
    for path in paths {
        let definition = load_file(&path)
            .with_context(|| format!("Failed to load schema descriptor: '{}'", path.display()))?;
        definitions.push(definition);
    }
    log::info!(
        "Loaded {} schema descriptors from '{}'",
        definitions.len(),
        dir.display()
    );
    Ok(definitions)
}

pub fn load_file(path: impl AsRef<Path>) -> Result<ResourceDefinition, SchemaFileError> {
    let reader = File::open(path.as_ref())?;
    let descriptor: ResourceDescriptor = serde_yaml::from_reader(reader)?;
    descriptor.into_definition()
}

pub fn parse_definition(yaml: &str) -> Result<ResourceDefinition, SchemaFileError> {
    let descriptor: ResourceDescriptor = serde_yaml::from_str(yaml)?;
    descriptor.into_definition()
}

fn default_true() -> bool {
    true
}

// below are the structs for deserializing descriptor files. They're only used to build the
// schema tree, so they aren't exposed outside of this module.

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ResourceDescriptor {
    api_version: String,
    kind: String,
    plural: Option<String>,
    #[serde(default = "default_true")]
    namespaced: bool,
    #[serde(default)]
    description: String,
    spec: Option<SpecDescriptor>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
struct SpecDescriptor {
    #[serde(default)]
    required: bool,
    #[serde(default)]
    description: String,
    #[serde(default)]
    fields: Vec<FieldDescriptor>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
struct FieldDescriptor {
    name: String,
    attribute: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    computed: bool,
    #[serde(default)]
    sensitive: bool,
    default: Option<Value>,
    items: Option<Box<ElementDescriptor>>,
    fields: Option<Vec<FieldDescriptor>>,
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    validators: Vec<ValidatorDescriptor>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
struct ElementDescriptor {
    #[serde(rename = "type")]
    kind: String,
    items: Option<Box<ElementDescriptor>>,
    fields: Option<Vec<FieldDescriptor>>,
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    validators: Vec<ValidatorDescriptor>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
enum ValidatorDescriptor {
    Pattern(String),
    OneOf(Vec<String>),
    Format(FormatName),
    MinLength(usize),
    MaxLength(usize),
    Minimum(i64),
    Maximum(i64),
    MinItems(usize),
    MaxItems(usize),
}

#[derive(Deserialize, Debug, Copy, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
enum FormatName {
    Rfc3339,
    Duration,
}

impl ResourceDescriptor {
    fn into_definition(self) -> Result<ResourceDefinition, SchemaFileError> {
        let ResourceDescriptor {
            api_version,
            kind,
            plural,
            namespaced,
            description,
            spec,
        } = self;
        if !api_version.contains('/') && api_version != "v1" {
            return Err(invalid(
                "apiVersion",
                format!("'{}' must be of the form <group>/<version>", api_version),
            ));
        }
        if kind.is_empty() {
            return Err(invalid("kind", "must not be empty"));
        }
        let plural = plural.unwrap_or_else(|| format!("{}s", kind.to_lowercase()));
        let k8s_type = k8s_types::lookup_or_define(&api_version, &kind, &plural);

        let mut definition = ResourceDefinition::new(k8s_type).describe(description);
        if !namespaced {
            definition = definition.cluster_scoped();
        }
        if let Some(spec) = spec {
            let fields = build_children(spec.fields, "spec")?;
            let mut field = ConfigField::object("spec", fields).describe(spec.description);
            if spec.required {
                field = field.required();
            }
            definition = definition.with_spec_field(field);
        }
        log::debug!("Built resource definition for {}", k8s_type);
        Ok(definition)
    }
}

fn build_children(
    descriptors: Vec<FieldDescriptor>,
    parent_path: &str,
) -> Result<Vec<ConfigField>, SchemaFileError> {
    let mut fields: Vec<ConfigField> = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        let field = build_field(descriptor, parent_path)?;
        if fields
            .iter()
            .any(|f| f.name == field.name || f.attribute == field.attribute)
        {
            return Err(invalid(
                parent_path,
                format!("duplicate field name '{}'", field.name),
            ));
        }
        fields.push(field);
    }
    Ok(fields)
}

fn build_field(descriptor: FieldDescriptor, parent_path: &str) -> Result<ConfigField, SchemaFileError> {
    let FieldDescriptor {
        name,
        attribute,
        description,
        kind,
        required,
        computed,
        sensitive,
        default,
        items,
        fields,
        validators,
    } = descriptor;
    if name.is_empty() {
        return Err(invalid(parent_path, "field names must not be empty"));
    }
    let path = format!("{}.{}", parent_path, name);
    if required && computed {
        return Err(invalid(&path, "a field cannot be both required and computed"));
    }

    let kind = build_kind(&kind, items, fields, &path)?;
    let validators = build_validators(validators, &kind, &path)?;

    let mut field = ConfigField::new(name, kind)
        .describe(description)
        .validate_with_all(validators);
    if let Some(attribute) = attribute {
        field = field.attribute(attribute);
    }
    if required {
        field = field.required();
    }
    if computed {
        field = field.computed();
    }
    if sensitive {
        field = field.sensitive();
    }
    if default.map(|v| !v.is_null()).unwrap_or(false) {
        field = field.with_default();
    }
    Ok(field)
}

fn build_kind(
    kind: &str,
    items: Option<Box<ElementDescriptor>>,
    fields: Option<Vec<FieldDescriptor>>,
    path: &str,
) -> Result<FieldKind, SchemaFileError> {
    let is_container = kind == "list" || kind == "map";
    if items.is_some() && !is_container {
        return Err(invalid(path, format!("'items' is not allowed for type '{}'", kind)));
    }
    if fields.is_some() && kind != "object" {
        return Err(invalid(path, format!("'fields' is not allowed for type '{}'", kind)));
    }

    let field_kind = match kind {
        "string" => FieldKind::String,
        "bool" | "boolean" => FieldKind::Bool,
        "int" | "integer" => FieldKind::Int,
        "float" | "number" => FieldKind::Float,
        "any" => FieldKind::Any,
        "reference" => FieldKind::Reference,
        "object" => {
            let children = fields.unwrap_or_default();
            if children.is_empty() {
                return Err(invalid(path, "objects must declare at least one field"));
            }
            FieldKind::Object(build_children(children, path)?)
        }
        "list" | "map" => {
            let element = match items {
                Some(element) => build_element(*element, path)?,
                None => Element::string(),
            };
            if kind == "list" {
                FieldKind::List(Box::new(element))
            } else {
                FieldKind::Map(Box::new(element))
            }
        }
        other => return Err(invalid(path, format!("unknown type '{}'", other))),
    };
    Ok(field_kind)
}

fn build_element(descriptor: ElementDescriptor, path: &str) -> Result<Element, SchemaFileError> {
    let ElementDescriptor {
        kind,
        items,
        fields,
        validators,
    } = descriptor;
    let path = format!("{}[]", path);
    let kind = build_kind(&kind, items, fields, &path)?;
    let validators = build_validators(validators, &kind, &path)?;
    Ok(Element { kind, validators })
}

fn build_validators(
    descriptors: Vec<ValidatorDescriptor>,
    kind: &FieldKind,
    path: &str,
) -> Result<Vec<Validator>, SchemaFileError> {
    let mut validators = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        let validator = match descriptor {
            ValidatorDescriptor::Pattern(source) => Validator::pattern(&source)
                .map_err(|e| invalid(path, format!("invalid pattern '{}': {}", source, e)))?,
            ValidatorDescriptor::OneOf(values) => Validator::OneOf(values),
            ValidatorDescriptor::Format(FormatName::Rfc3339) => Validator::rfc3339(),
            ValidatorDescriptor::Format(FormatName::Duration) => Validator::duration(),
            ValidatorDescriptor::MinLength(n) => Validator::MinLength(n),
            ValidatorDescriptor::MaxLength(n) => Validator::MaxLength(n),
            ValidatorDescriptor::Minimum(n) => Validator::Minimum(n),
            ValidatorDescriptor::Maximum(n) => Validator::Maximum(n),
            ValidatorDescriptor::MinItems(n) => Validator::MinItems(n),
            ValidatorDescriptor::MaxItems(n) => Validator::MaxItems(n),
        };
        if !validator.applies_to(kind) {
            return Err(invalid(
                path,
                format!(
                    "validator '{}' cannot be applied to type '{}'",
                    validator,
                    kind.type_name()
                ),
            ));
        }
        validators.push(validator);
    }
    Ok(validators)
}
