//! The recursive schema model. A `ConfigField` describes one attribute of a resource, and object
//! fields nest further `ConfigField`s as children. Trees are built once, either in code using the
//! builder functions here or from descriptor files (see `config::schema_file`), and are never
//! modified afterwards.
//!
//! ```rust
//! use crdform::schema::{ConfigField, Validator};
//! use crdform::serde_json::json;
//!
//! let connection = ConfigField::object("connection", vec![
//!     ConfigField::object("sqlite", vec![
//!         ConfigField::string("dsn").required(),
//!     ]),
//!     ConfigField::string("timeout").validate_with(Validator::duration()),
//! ]).required();
//!
//! let rendered = connection.validate(Some(&json!({"sqlite": {"dsn": "file:test.db"}}))).unwrap();
//! assert_eq!(Some(json!({"sqlite": {"dsn": "file:test.db"}})), rendered);
//!
//! let err = connection.validate(Some(&json!({"sqlite": {}}))).unwrap_err();
//! assert_eq!("connection.sqlite.dsn", err.path().to_string());
//! ```
pub mod naming;
mod path;
pub mod reference;
pub mod validators;

pub use self::path::FieldPath;
pub use self::validators::{Format, Pattern, Validator};

use crate::error::ValidationError;

use serde_json::{Map, Value};

/// Whether a field must be supplied by the caller, may be supplied, or is only ever set by the
/// provider itself.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FieldMode {
    Required,
    Optional,
    Computed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String,
    Bool,
    Int,
    Float,
    /// Any json value, for `x-kubernetes-preserve-unknown-fields` style schemas
    Any,
    List(Box<Element>),
    /// A map with string keys. Keys are passed through to the rendered output as-is.
    Map(Box<Element>),
    Object(Vec<ConfigField>),
    /// Either a literal string `value`, or a `valueFrom` reference to an external source
    Reference,
}

impl FieldKind {
    pub fn type_name(&self) -> &'static str {
        match *self {
            FieldKind::String => "string",
            FieldKind::Bool => "bool",
            FieldKind::Int => "int",
            FieldKind::Float => "float",
            FieldKind::Any => "any",
            FieldKind::List(_) => "list",
            FieldKind::Map(_) => "map",
            FieldKind::Object(_) => "object",
            FieldKind::Reference => "reference",
        }
    }
}

/// The type of the elements of a list or map field, along with any validators that apply to each
/// element.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub kind: FieldKind,
    pub validators: Vec<Validator>,
}

impl Element {
    pub fn new(kind: FieldKind) -> Element {
        Element {
            kind,
            validators: Vec::new(),
        }
    }

    pub fn string() -> Element {
        Element::new(FieldKind::String)
    }

    pub fn object(children: Vec<ConfigField>) -> Element {
        check_unique_names(&children);
        Element::new(FieldKind::Object(children))
    }

    pub fn validate_with(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }
}

/// A node in the schema tree
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigField {
    /// The key used in the CRD and in the rendered yaml
    pub name: String,
    /// The key used by the host, which is the snake_case version of `name` unless overridden
    pub attribute: String,
    pub description: String,
    pub kind: FieldKind,
    pub mode: FieldMode,
    /// The CRD declares a default, which is applied by the api server rather than by us
    pub has_default: bool,
    pub sensitive: bool,
    pub validators: Vec<Validator>,
}

impl ConfigField {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> ConfigField {
        let name = name.into();
        let attribute = naming::to_attribute_name(&name);
        ConfigField {
            name,
            attribute,
            description: String::new(),
            kind,
            mode: FieldMode::Optional,
            has_default: false,
            sensitive: false,
            validators: Vec::new(),
        }
    }

    pub fn string(name: impl Into<String>) -> ConfigField {
        ConfigField::new(name, FieldKind::String)
    }

    pub fn bool(name: impl Into<String>) -> ConfigField {
        ConfigField::new(name, FieldKind::Bool)
    }

    pub fn int(name: impl Into<String>) -> ConfigField {
        ConfigField::new(name, FieldKind::Int)
    }

    pub fn float(name: impl Into<String>) -> ConfigField {
        ConfigField::new(name, FieldKind::Float)
    }

    pub fn any(name: impl Into<String>) -> ConfigField {
        ConfigField::new(name, FieldKind::Any)
    }

    pub fn reference(name: impl Into<String>) -> ConfigField {
        ConfigField::new(name, FieldKind::Reference)
    }

    pub fn list(name: impl Into<String>, element: Element) -> ConfigField {
        ConfigField::new(name, FieldKind::List(Box::new(element)))
    }

    pub fn map(name: impl Into<String>, element: Element) -> ConfigField {
        ConfigField::new(name, FieldKind::Map(Box::new(element)))
    }

    /// A list of strings
    pub fn string_list(name: impl Into<String>) -> ConfigField {
        ConfigField::list(name, Element::string())
    }

    /// A map of string to string, like labels or a node selector
    pub fn string_map(name: impl Into<String>) -> ConfigField {
        ConfigField::map(name, Element::string())
    }

    /// # Panics
    ///
    /// If two children share the same name or attribute name. This always indicates a bug in the
    /// schema definition.
    pub fn object(name: impl Into<String>, children: Vec<ConfigField>) -> ConfigField {
        check_unique_names(&children);
        ConfigField::new(name, FieldKind::Object(children))
    }

    pub fn list_of_objects(name: impl Into<String>, children: Vec<ConfigField>) -> ConfigField {
        ConfigField::list(name, Element::object(children))
    }

    pub fn required(mut self) -> Self {
        self.mode = FieldMode::Required;
        self
    }

    pub fn computed(mut self) -> Self {
        self.mode = FieldMode::Computed;
        self
    }

    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = attribute.into();
        self
    }

    pub fn validate_with(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn validate_with_all(mut self, validators: impl IntoIterator<Item = Validator>) -> Self {
        self.validators.extend(validators);
        self
    }

    pub fn is_required(&self) -> bool {
        self.mode == FieldMode::Required
    }

    pub fn is_computed(&self) -> bool {
        self.mode == FieldMode::Computed
    }

    /// Returns the nested fields of an object, or of the elements of a list or map of objects.
    /// Exactly one of `is_leaf` and `children().is_some()` holds for every field.
    pub fn children(&self) -> Option<&[ConfigField]> {
        match self.kind {
            FieldKind::Object(ref children) => Some(children.as_slice()),
            FieldKind::List(ref element) | FieldKind::Map(ref element) => match element.kind {
                FieldKind::Object(ref children) => Some(children.as_slice()),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children().is_none()
    }

    /// Looks up a direct child by its CRD name
    pub fn child(&self, name: &str) -> Option<&ConfigField> {
        self.children()
            .and_then(|children| children.iter().find(|c| c.name == name))
    }

    /// Validates the candidate, which is keyed by attribute names, and returns the value to render,
    /// which is keyed by CRD names and has every absent or null optional field removed. Returns
    /// `Ok(None)` when an optional field is absent.
    ///
    /// A field with an empty name is treated as the root of the tree and does not contribute a
    /// segment to error paths.
    pub fn validate(&self, candidate: Option<&Value>) -> Result<Option<Value>, ValidationError> {
        let mut path = FieldPath::root();
        if self.name.is_empty() {
            validate_present_or_absent(self, candidate, &mut path)
        } else {
            path.push_key(self.attribute.as_str());
            validate_present_or_absent(self, candidate, &mut path)
        }
    }
}

fn check_unique_names(children: &[ConfigField]) {
    for (i, child) in children.iter().enumerate() {
        let duplicate = children[..i]
            .iter()
            .any(|c| c.name == child.name || c.attribute == child.attribute);
        assert!(
            !duplicate,
            "duplicate field name '{}' in schema definition",
            child.name
        );
    }
}

/// Validates a field whose candidate may be missing. Null is treated the same as absent.
pub(crate) fn validate_present_or_absent(
    field: &ConfigField,
    candidate: Option<&Value>,
    path: &mut FieldPath,
) -> Result<Option<Value>, ValidationError> {
    let candidate = candidate.filter(|v| !v.is_null());
    match (field.mode, candidate) {
        (FieldMode::Computed, Some(_)) => Err(ValidationError::violation(
            path,
            "this field is computed and cannot be set",
        )),
        (FieldMode::Computed, None) => Ok(None),
        (FieldMode::Required, None) => {
            if field.kind == FieldKind::Reference {
                Err(ValidationError::missing_value(path))
            } else {
                Err(ValidationError::missing_field(path))
            }
        }
        (FieldMode::Optional, None) => Ok(None),
        (_, Some(value)) => {
            if field.kind == FieldKind::Reference {
                reference::validate_reference(value, field.is_required(), path)
            } else {
                validate_value(&field.kind, &field.validators, value, path).map(Some)
            }
        }
    }
}

/// Validates a value that is known to be present. The type is checked first, then the
/// validators, and only then are any children visited.
fn validate_value(
    kind: &FieldKind,
    validators: &[Validator],
    value: &Value,
    path: &mut FieldPath,
) -> Result<Value, ValidationError> {
    check_type(kind, value, path)?;
    for validator in validators {
        validator
            .check(value)
            .map_err(|message| ValidationError::violation(path, message))?;
    }

    match *kind {
        FieldKind::List(ref element) => {
            let items = value.as_array().map(Vec::as_slice).unwrap_or(&[]);
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                path.push_index(i);
                out.push(validate_element(element, item, path)?);
                path.pop();
            }
            Ok(Value::Array(out))
        }
        FieldKind::Map(ref element) => {
            let mut out = Map::new();
            if let Some(entries) = value.as_object() {
                for (key, item) in entries {
                    path.push_key(key.as_str());
                    out.insert(key.clone(), validate_element(element, item, path)?);
                    path.pop();
                }
            }
            Ok(Value::Object(out))
        }
        FieldKind::Object(ref children) => validate_object(children, value, path).map(Value::Object),
        FieldKind::Reference => reference::validate_reference(value, true, path)?
            .ok_or_else(|| ValidationError::missing_value(path)),
        FieldKind::Any => without_nulls(value, path),
        _ => Ok(value.clone()),
    }
}

/// Copies a free-form value, dropping object keys whose value is null. A null list element is
/// rejected, the same as in a typed list.
fn without_nulls(value: &Value, path: &mut FieldPath) -> Result<Value, ValidationError> {
    match *value {
        Value::Object(ref entries) => {
            let mut out = Map::new();
            for (key, item) in entries.iter().filter(|(_, item)| !item.is_null()) {
                path.push_key(key.as_str());
                out.insert(key.clone(), without_nulls(item, path)?);
                path.pop();
            }
            Ok(Value::Object(out))
        }
        Value::Array(ref items) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                path.push_index(i);
                if item.is_null() {
                    return Err(ValidationError::violation(path, "elements may not be null"));
                }
                out.push(without_nulls(item, path)?);
                path.pop();
            }
            Ok(Value::Array(out))
        }
        _ => Ok(value.clone()),
    }
}

fn validate_element(
    element: &Element,
    item: &Value,
    path: &mut FieldPath,
) -> Result<Value, ValidationError> {
    if item.is_null() {
        return Err(ValidationError::violation(path, "elements may not be null"));
    }
    validate_value(&element.kind, &element.validators, item, path)
}

/// Validates each declared child of an object in declaration order. Keys in the candidate that
/// don't correspond to any child are rejected before any child is visited.
pub(crate) fn validate_object(
    children: &[ConfigField],
    value: &Value,
    path: &mut FieldPath,
) -> Result<Map<String, Value>, ValidationError> {
    let object = value
        .as_object()
        .ok_or_else(|| type_mismatch("object", value, path))?;

    if let Some(unknown) = object
        .keys()
        .find(|key| !children.iter().any(|c| c.attribute == key.as_str()))
    {
        let unknown_path = path.join(unknown);
        return Err(ValidationError::violation(
            &unknown_path,
            "unsupported attribute",
        ));
    }

    let mut out = Map::new();
    for child in children {
        path.push_key(child.attribute.as_str());
        let result = validate_present_or_absent(child, object.get(child.attribute.as_str()), path);
        path.pop();
        if let Some(rendered) = result? {
            out.insert(child.name.clone(), rendered);
        }
    }
    Ok(out)
}

fn check_type(kind: &FieldKind, value: &Value, path: &FieldPath) -> Result<(), ValidationError> {
    let matches = match *kind {
        FieldKind::String => value.is_string(),
        FieldKind::Bool => value.is_boolean(),
        FieldKind::Int => value.is_i64(),
        FieldKind::Float => value.is_number(),
        FieldKind::Any => true,
        FieldKind::List(_) => value.is_array(),
        FieldKind::Map(_) | FieldKind::Object(_) | FieldKind::Reference => value.is_object(),
    };
    if matches {
        Ok(())
    } else {
        Err(type_mismatch(kind.type_name(), value, path))
    }
}

fn type_mismatch(expected: &str, value: &Value, path: &FieldPath) -> ValidationError {
    ValidationError::violation(
        path,
        format!("expected {}, but found {}", expected, json_type_name(value)),
    )
}

fn json_type_name(value: &Value) -> &'static str {
    match *value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(ref n) if n.is_i64() || n.is_u64() => "int",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn bundles() -> ConfigField {
        ConfigField::list_of_objects(
            "certificateBundles",
            vec![
                ConfigField::string("name").required(),
                ConfigField::bool("generate"),
            ],
        )
    }

    fn spec() -> ConfigField {
        ConfigField::object(
            "spec",
            vec![
                ConfigField::string("clusterName").required(),
                ConfigField::string("powerState")
                    .validate_with(Validator::one_of(vec!["", "Running", "Hibernating"])),
                ConfigField::string("hibernateAfter").validate_with(Validator::duration()),
                ConfigField::int("installAttemptsLimit").validate_with(Validator::Minimum(0)),
                ConfigField::string_map("labels"),
                bundles(),
                ConfigField::object(
                    "pullSecretRef",
                    vec![ConfigField::string("name").required()],
                ),
                ConfigField::string("status").computed(),
            ],
        )
        .required()
    }

    #[test]
    fn valid_candidate_is_rendered_with_crd_names_in_declaration_order() {
        let candidate = json!({
            "certificate_bundles": [{"name": "one", "generate": true}],
            "cluster_name": "test",
            "power_state": "Running",
        });
        let rendered = spec().validate(Some(&candidate)).unwrap().unwrap();
        let keys: Vec<&String> = rendered.as_object().unwrap().keys().collect();
        assert_eq!(vec!["clusterName", "powerState", "certificateBundles"], keys);
        assert_eq!(
            json!([{"name": "one", "generate": true}]),
            rendered["certificateBundles"]
        );
    }

    #[test]
    fn absent_and_null_optional_fields_are_omitted() {
        let candidate = json!({
            "cluster_name": "test",
            "power_state": null,
            "pull_secret_ref": null,
        });
        let rendered = spec().validate(Some(&candidate)).unwrap().unwrap();
        assert_eq!(json!({"clusterName": "test"}), rendered);
    }

    #[test]
    fn missing_required_field_names_the_exact_path() {
        let err = spec()
            .validate(Some(&json!({"pull_secret_ref": {}})))
            .unwrap_err();
        // parent fields are checked in order, so clusterName is reported before the nested name
        assert_eq!(ErrorKind::MissingRequiredField, err.kind());
        assert_eq!("spec.cluster_name", err.path().to_string());

        let err = spec()
            .validate(Some(&json!({"cluster_name": "a", "pull_secret_ref": {}})))
            .unwrap_err();
        assert_eq!("spec.pull_secret_ref.name", err.path().to_string());
    }

    #[test]
    fn required_object_that_is_absent_is_reported() {
        let err = spec().validate(None).unwrap_err();
        assert_eq!(ErrorKind::MissingRequiredField, err.kind());
        assert_eq!("spec", err.path().to_string());
    }

    #[test]
    fn absent_optional_object_does_not_check_its_required_children() {
        let rendered = spec()
            .validate(Some(&json!({"cluster_name": "a"})))
            .unwrap()
            .unwrap();
        assert!(rendered.get("pullSecretRef").is_none());
    }

    #[test]
    fn list_elements_report_their_index() {
        let candidate = json!({
            "cluster_name": "a",
            "certificate_bundles": [{"name": "one"}, {"generate": false}],
        });
        let err = spec().validate(Some(&candidate)).unwrap_err();
        assert_eq!(ErrorKind::MissingRequiredField, err.kind());
        assert_eq!("spec.certificate_bundles[1].name", err.path().to_string());
    }

    #[test]
    fn no_implicit_coercion_between_kinds() {
        let err = spec()
            .validate(Some(&json!({"cluster_name": "a", "install_attempts_limit": "5"})))
            .unwrap_err();
        assert_eq!(ErrorKind::SchemaViolation, err.kind());
        assert_eq!("spec.install_attempts_limit", err.path().to_string());

        let err = spec()
            .validate(Some(&json!({"cluster_name": "a", "install_attempts_limit": 1.5})))
            .unwrap_err();
        assert_eq!(ErrorKind::SchemaViolation, err.kind());

        let err = spec()
            .validate(Some(&json!({"cluster_name": 7})))
            .unwrap_err();
        assert_eq!(ErrorKind::SchemaViolation, err.kind());
    }

    #[test]
    fn enum_and_regex_validators_are_applied() {
        let err = spec()
            .validate(Some(&json!({"cluster_name": "a", "power_state": "running"})))
            .unwrap_err();
        assert_eq!("spec.power_state", err.path().to_string());

        let err = spec()
            .validate(Some(&json!({"cluster_name": "a", "hibernate_after": "5x"})))
            .unwrap_err();
        assert_eq!("spec.hibernate_after", err.path().to_string());

        assert!(spec()
            .validate(Some(&json!({"cluster_name": "a", "hibernate_after": "1h30m", "power_state": ""})))
            .is_ok());
    }

    #[test]
    fn first_failing_validator_is_reported() {
        let field = ConfigField::string("name")
            .validate_with(Validator::MinLength(3))
            .validate_with(Validator::pattern("^[a-z]+$").unwrap());
        let err = field.validate(Some(&json!("A"))).unwrap_err();
        match err {
            ValidationError::SchemaViolation { message, .. } => {
                assert!(message.contains("minimum"), "unexpected message: {}", message)
            }
            other => panic!("expected schema violation, got: {:?}", other),
        }
    }

    #[test]
    fn unknown_attributes_are_rejected() {
        let err = spec()
            .validate(Some(&json!({"cluster_name": "a", "clusterName": "b"})))
            .unwrap_err();
        assert_eq!(ErrorKind::SchemaViolation, err.kind());
        assert_eq!("spec.clusterName", err.path().to_string());
    }

    #[test]
    fn computed_fields_cannot_be_set() {
        let err = spec()
            .validate(Some(&json!({"cluster_name": "a", "status": "done"})))
            .unwrap_err();
        assert_eq!(ErrorKind::SchemaViolation, err.kind());
        assert_eq!("spec.status", err.path().to_string());
    }

    #[test]
    fn map_values_are_checked_and_keys_passed_through() {
        let rendered = spec()
            .validate(Some(&json!({"cluster_name": "a", "labels": {"app.kubernetes.io/name": "x"}})))
            .unwrap()
            .unwrap();
        assert_eq!(json!({"app.kubernetes.io/name": "x"}), rendered["labels"]);

        let err = spec()
            .validate(Some(&json!({"cluster_name": "a", "labels": {"team": 5}})))
            .unwrap_err();
        assert_eq!("spec.labels.team", err.path().to_string());
    }

    #[test]
    fn leaf_and_children_are_mutually_exclusive() {
        let spec = spec();
        assert!(!spec.is_leaf());
        assert!(spec.child("clusterName").unwrap().is_leaf());
        assert!(spec.child("certificateBundles").unwrap().children().is_some());
        assert!(spec.child("labels").unwrap().is_leaf());
    }

    #[test]
    fn free_form_values_drop_null_keys() {
        let values = ConfigField::any("values");
        let rendered = values
            .validate(Some(&json!({"replicas": 3, "image": null, "nested": {"tag": null, "pull": "Always"}})))
            .unwrap();
        assert_eq!(
            Some(json!({"replicas": 3, "nested": {"pull": "Always"}})),
            rendered
        );

        let err = values
            .validate(Some(&json!({"args": ["-v", null]})))
            .unwrap_err();
        assert_eq!(ErrorKind::SchemaViolation, err.kind());
        assert_eq!("values.args[1]", err.path().to_string());
    }

    #[test]
    #[should_panic(expected = "duplicate field name")]
    fn duplicate_children_are_a_definition_bug() {
        ConfigField::object(
            "spec",
            vec![ConfigField::string("a"), ConfigField::int("a")],
        );
    }
}
