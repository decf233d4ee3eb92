//! Fields that hold either a literal value or a reference to a value that lives somewhere else,
//! such as a kubernetes Secret, an SSM parameter, or a Vault secret. References are never
//! dereferenced here. We only check that the reference is well formed and that exactly one
//! source is given, and leave the lookup to whatever eventually consumes the rendered yaml.
//!
//! In a candidate, these look like:
//!
//! ```json
//! { "value": "postgres://localhost" }
//! { "value_from": { "secret_key_ref": { "name": "db-creds", "key": "uri" } } }
//! ```
use crate::error::ValidationError;
use crate::schema::{validate_object, ConfigField, FieldPath};

use lazy_static::lazy_static;
use serde_json::Value;

use std::convert::TryFrom;

const LITERAL_ATTRIBUTE: &str = "value";
const VALUE_FROM_ATTRIBUTE: &str = "value_from";

/// attribute name of each source under `value_from`, paired with the name used in diagnostics
const SOURCES: &[(&str, &str)] = &[
    ("secret_key_ref", "valueFrom.secretKeyRef"),
    ("ssm", "valueFrom.ssm"),
    ("vault", "valueFrom.vault"),
];

/// The AWS credentials of an ssm source can only come from a literal or a Secret
const CREDENTIAL_SOURCES: &[(&str, &str)] = &[("secret_key_ref", "valueFrom.secretKeyRef")];
const SSM_CREDENTIALS: &[&str] = &["access_key_id", "secret_access_key"];

lazy_static! {
    static ref REFERENCE_FIELDS: Vec<ConfigField> = reference_fields();
}

fn secret_key_ref_field() -> ConfigField {
    ConfigField::object(
        "secretKeyRef",
        vec![
            ConfigField::string("name")
                .required()
                .describe("Name of the Secret"),
            ConfigField::string("key")
                .required()
                .describe("Key within the Secret"),
        ],
    )
    .describe("Read the value from a key of a kubernetes Secret")
}

fn literal_field() -> ConfigField {
    ConfigField::string("value")
        .sensitive()
        .describe("A literal value. Mutually exclusive with valueFrom.")
}

/// An ssm credential is a plain object rather than a nested reference, so the shape is finite
fn credential_field(name: &str) -> ConfigField {
    ConfigField::object(
        name,
        vec![
            literal_field(),
            ConfigField::object("valueFrom", vec![secret_key_ref_field()]),
        ],
    )
}

fn reference_fields() -> Vec<ConfigField> {
    vec![
        literal_field(),
        ConfigField::object(
            "valueFrom",
            vec![
                secret_key_ref_field(),
                ConfigField::object(
                    "ssm",
                    vec![
                        ConfigField::string("name")
                            .required()
                            .describe("Name of the SSM parameter"),
                        ConfigField::bool("withDecryption"),
                        ConfigField::string("region"),
                        credential_field("accessKeyId"),
                        credential_field("secretAccessKey"),
                    ],
                )
                .describe("Read the value from an AWS SSM parameter"),
                ConfigField::object(
                    "vault",
                    vec![
                        ConfigField::string("secret").required(),
                        ConfigField::string("role").required(),
                        ConfigField::bool("agentInject"),
                        ConfigField::string("kubernetesAuthEndpoint"),
                        ConfigField::string("serviceAccount"),
                        ConfigField::string("serviceAccountNamespace"),
                        ConfigField::string("endpoint"),
                        ConfigField::string("connectionTemplate"),
                    ],
                )
                .describe("Read the value from a Vault secret"),
            ],
        )
        .describe("Where to read the value from. Only one source may be given."),
    ]
}

/// The nested fields of every reference field. Used when compiling the host schema.
pub fn reference_shape() -> &'static [ConfigField] {
    REFERENCE_FIELDS.as_slice()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeyRef {
    pub name: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsmParameter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_decryption: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<Credential>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<Credential>,
}

/// An AWS credential used to read an ssm parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCredential", into = "RawCredential")]
pub enum Credential {
    Literal(String),
    SecretKeyRef(SecretKeyRef),
}

impl Credential {
    pub fn literal(&self) -> Option<&str> {
        match *self {
            Credential::Literal(ref value) => Some(value.as_str()),
            Credential::SecretKeyRef(_) => None,
        }
    }

    pub fn is_deferred(&self) -> bool {
        self.literal().is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultSecret {
    pub secret: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_inject: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes_auth_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_template: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceSource {
    SecretKeyRef(SecretKeyRef),
    Ssm(SsmParameter),
    Vault(VaultSecret),
}

/// A value that is either given inline or resolved later from an external source. Exactly one
/// variant is ever populated, which is enforced when parsing from a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawValueOrReference", into = "RawValueOrReference")]
pub enum ValueOrReference {
    Literal(String),
    Reference(ReferenceSource),
}

impl ValueOrReference {
    /// Returns the literal value, or `None` if resolution is deferred to an external source
    pub fn literal(&self) -> Option<&str> {
        match *self {
            ValueOrReference::Literal(ref value) => Some(value.as_str()),
            ValueOrReference::Reference(_) => None,
        }
    }

    pub fn is_deferred(&self) -> bool {
        self.literal().is_none()
    }

    pub fn reference(&self) -> Option<&ReferenceSource> {
        match *self {
            ValueOrReference::Reference(ref source) => Some(source),
            ValueOrReference::Literal(_) => None,
        }
    }
}

/// The shape of a value-or-reference as it appears in yaml. Every source is optional here, and the
/// conversion into `ValueOrReference` checks that exactly one is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawValueOrReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value_from: Option<RawValueFrom>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawValueFrom {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    secret_key_ref: Option<SecretKeyRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ssm: Option<SsmParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vault: Option<VaultSecret>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCredential {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value_from: Option<RawCredentialFrom>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCredentialFrom {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    secret_key_ref: Option<SecretKeyRef>,
}

impl TryFrom<RawCredential> for Credential {
    type Error = String;

    fn try_from(raw: RawCredential) -> Result<Credential, String> {
        let secret_key_ref = raw.value_from.and_then(|from| from.secret_key_ref);
        match (raw.value, secret_key_ref) {
            (Some(value), None) => Ok(Credential::Literal(value)),
            (None, Some(r)) => Ok(Credential::SecretKeyRef(r)),
            (None, None) => Err("either value or valueFrom.secretKeyRef must be set".to_owned()),
            (Some(_), Some(_)) => {
                Err("only one of value or valueFrom.secretKeyRef may be set".to_owned())
            }
        }
    }
}

impl From<Credential> for RawCredential {
    fn from(credential: Credential) -> RawCredential {
        match credential {
            Credential::Literal(v) => RawCredential {
                value: Some(v),
                value_from: None,
            },
            Credential::SecretKeyRef(r) => RawCredential {
                value: None,
                value_from: Some(RawCredentialFrom {
                    secret_key_ref: Some(r),
                }),
            },
        }
    }
}

impl TryFrom<RawValueOrReference> for ValueOrReference {
    type Error = String;

    fn try_from(raw: RawValueOrReference) -> Result<ValueOrReference, String> {
        let RawValueOrReference { value, value_from } = raw;
        let RawValueFrom {
            secret_key_ref,
            ssm,
            vault,
        } = value_from.unwrap_or_default();

        let mut found = Vec::with_capacity(1);
        if let Some(v) = value {
            found.push(ValueOrReference::Literal(v));
        }
        if let Some(r) = secret_key_ref {
            found.push(ValueOrReference::Reference(ReferenceSource::SecretKeyRef(r)));
        }
        if let Some(s) = ssm {
            found.push(ValueOrReference::Reference(ReferenceSource::Ssm(s)));
        }
        if let Some(v) = vault {
            found.push(ValueOrReference::Reference(ReferenceSource::Vault(v)));
        }
        match found.len() {
            1 => Ok(found.remove(0)),
            0 => Err("either value or valueFrom must be set".to_owned()),
            _ => Err("only one of value or a valueFrom source may be set".to_owned()),
        }
    }
}

impl From<ValueOrReference> for RawValueOrReference {
    fn from(value: ValueOrReference) -> RawValueOrReference {
        match value {
            ValueOrReference::Literal(v) => RawValueOrReference {
                value: Some(v),
                value_from: None,
            },
            ValueOrReference::Reference(source) => {
                let mut from = RawValueFrom::default();
                match source {
                    ReferenceSource::SecretKeyRef(r) => from.secret_key_ref = Some(r),
                    ReferenceSource::Ssm(s) => from.ssm = Some(s),
                    ReferenceSource::Vault(v) => from.vault = Some(v),
                }
                RawValueOrReference {
                    value: None,
                    value_from: Some(from),
                }
            }
        }
    }
}

/// Returns the diagnostic names of every source that is populated in the candidate
fn populated_sources(candidate: &Value, sources: &[(&str, &'static str)]) -> Vec<&'static str> {
    let mut populated = Vec::new();
    if candidate
        .get(LITERAL_ATTRIBUTE)
        .map(|v| !v.is_null())
        .unwrap_or(false)
    {
        populated.push("value");
    }
    if let Some(value_from) = candidate.get(VALUE_FROM_ATTRIBUTE).and_then(Value::as_object) {
        for &(attribute, label) in sources {
            if value_from.get(attribute).map(|v| !v.is_null()).unwrap_or(false) {
                populated.push(label);
            }
        }
    }
    populated
}

fn check_unambiguous(
    candidate: &Value,
    sources: &[(&str, &'static str)],
    path: &FieldPath,
) -> Result<Vec<&'static str>, ValidationError> {
    let populated = populated_sources(candidate, sources);
    if populated.len() > 1 {
        Err(ValidationError::AmbiguousSource {
            path: path.clone(),
            sources: populated,
        })
    } else {
        Ok(populated)
    }
}

/// Returns the ssm credentials that are given in the candidate, along with their paths
fn ssm_credentials<'a>(candidate: &'a Value, path: &FieldPath) -> Vec<(FieldPath, &'a Value)> {
    let ssm = match candidate.get(VALUE_FROM_ATTRIBUTE).and_then(|v| v.get("ssm")) {
        Some(ssm) => ssm,
        None => return Vec::new(),
    };
    SSM_CREDENTIALS
        .iter()
        .filter_map(|credential| {
            ssm.get(*credential).filter(|v| !v.is_null()).map(|value| {
                let credential_path = path.join(VALUE_FROM_ATTRIBUTE).join("ssm").join(credential);
                (credential_path, value)
            })
        })
        .collect()
}

/// Validates a value-or-reference candidate and returns the value to render. Returns `Ok(None)`
/// when no source is given and the field is optional, so that it's omitted from the output.
pub(crate) fn validate_reference(
    candidate: &Value,
    required: bool,
    path: &mut FieldPath,
) -> Result<Option<Value>, ValidationError> {
    let populated = check_unambiguous(candidate, SOURCES, path)?;
    let credentials = ssm_credentials(candidate, path);
    for (credential_path, credential) in credentials.iter() {
        check_unambiguous(credential, CREDENTIAL_SOURCES, credential_path)?;
    }

    // the shape is always checked, so that misspelled sources are reported rather than ignored
    let rendered = validate_object(reference_shape(), candidate, path)?;

    // a credential that is given at all must name a source
    if let Some((credential_path, _)) = credentials
        .iter()
        .find(|(_, credential)| populated_sources(credential, CREDENTIAL_SOURCES).is_empty())
    {
        return Err(ValidationError::missing_value(credential_path));
    }

    if populated.is_empty() {
        if required {
            Err(ValidationError::missing_value(path))
        } else {
            Ok(None)
        }
    } else {
        Ok(Some(Value::Object(rendered)))
    }
}

/// Checks the shape of a value-or-reference candidate (keyed by attribute names), and converts it
/// into a `ValueOrReference`. This never resolves the reference itself.
pub fn resolve(candidate: &Value, required: bool) -> Result<Option<ValueOrReference>, ValidationError> {
    let mut path = FieldPath::root();
    let rendered = match validate_reference(candidate, required, &mut path)? {
        Some(rendered) => rendered,
        None => return Ok(None),
    };
    serde_json::from_value(rendered)
        .map(Some)
        .map_err(|e| ValidationError::violation(&path, e.to_string()))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ErrorKind;
    use crate::schema::FieldKind;
    use serde_json::json;

    #[test]
    fn literal_value_resolves_immediately() {
        let resolved = resolve(&json!({"value": "postgres://localhost"}), true)
            .unwrap()
            .unwrap();
        assert_eq!(Some("postgres://localhost"), resolved.literal());
        assert!(!resolved.is_deferred());
    }

    #[test]
    fn secret_reference_is_deferred() {
        let candidate = json!({
            "value_from": {"secret_key_ref": {"name": "creds", "key": "uri"}}
        });
        let resolved = resolve(&candidate, true).unwrap().unwrap();
        let expected = ReferenceSource::SecretKeyRef(SecretKeyRef {
            name: "creds".to_owned(),
            key: "uri".to_owned(),
        });
        assert_eq!(Some(&expected), resolved.reference());
    }

    #[test]
    fn literal_and_reference_together_are_ambiguous() {
        let candidate = json!({
            "value": "x",
            "value_from": {"secret_key_ref": {"name": "creds", "key": "uri"}}
        });
        let err = resolve(&candidate, false).unwrap_err();
        match err {
            ValidationError::AmbiguousSource { sources, .. } => {
                assert_eq!(vec!["value", "valueFrom.secretKeyRef"], sources);
            }
            other => panic!("expected ambiguous source, got: {:?}", other),
        }
    }

    #[test]
    fn two_reference_sources_are_ambiguous() {
        let candidate = json!({
            "value_from": {
                "ssm": {"name": "/db/uri"},
                "vault": {"secret": "db", "role": "reader"}
            }
        });
        let err = resolve(&candidate, true).unwrap_err();
        assert_eq!(ErrorKind::AmbiguousSource, err.kind());
    }

    #[test]
    fn no_source_is_only_an_error_when_required() {
        let err = resolve(&json!({}), true).unwrap_err();
        assert_eq!(ErrorKind::MissingRequiredValue, err.kind());
        assert_eq!(None, resolve(&json!({"value_from": {}}), false).unwrap());
    }

    #[test]
    fn reference_shape_requires_its_sub_fields() {
        let err = resolve(
            &json!({"value_from": {"secret_key_ref": {"name": "creds"}}}),
            true,
        )
        .unwrap_err();
        assert_eq!(ErrorKind::MissingRequiredField, err.kind());
        assert_eq!("value_from.secret_key_ref.key", err.path().to_string());

        let err = resolve(&json!({"value_from": {"vault": {"secret": "db"}}}), true).unwrap_err();
        assert_eq!("value_from.vault.role", err.path().to_string());
    }

    #[test]
    fn misspelled_source_is_rejected() {
        let err = resolve(&json!({"value_from": {"secret_ref": {"name": "a"}}}), false).unwrap_err();
        assert_eq!(ErrorKind::SchemaViolation, err.kind());
        assert_eq!("value_from.secret_ref", err.path().to_string());
    }

    #[test]
    fn ssm_credentials_may_come_from_a_secret() {
        let candidate = json!({
            "value_from": {"ssm": {
                "name": "/db/uri",
                "with_decryption": true,
                "access_key_id": {"value_from": {"secret_key_ref": {"name": "aws", "key": "id"}}},
                "secret_access_key": {"value": "shh"}
            }}
        });
        let resolved = resolve(&candidate, true).unwrap().unwrap();
        match resolved.reference() {
            Some(ReferenceSource::Ssm(ssm)) => {
                assert_eq!(Some(true), ssm.with_decryption);
                assert!(ssm.access_key_id.as_ref().unwrap().is_deferred());
                assert_eq!(Some("shh"), ssm.secret_access_key.as_ref().unwrap().literal());
            }
            other => panic!("expected ssm reference, got: {:?}", other),
        }
    }

    #[test]
    fn ssm_credentials_only_accept_a_literal_or_a_secret() {
        let with_credential = |credential: Value| {
            json!({"value_from": {"ssm": {"name": "/db/uri", "access_key_id": credential}}})
        };

        let err = resolve(
            &with_credential(json!({"value_from": {"ssm": {"name": "/aws/id"}}})),
            true,
        )
        .unwrap_err();
        assert_eq!(ErrorKind::SchemaViolation, err.kind());
        assert_eq!("value_from.ssm.access_key_id.value_from.ssm", err.path().to_string());

        let err = resolve(
            &with_credential(json!({
                "value": "id",
                "value_from": {"secret_key_ref": {"name": "aws", "key": "id"}}
            })),
            true,
        )
        .unwrap_err();
        assert_eq!(ErrorKind::AmbiguousSource, err.kind());
        assert_eq!("value_from.ssm.access_key_id", err.path().to_string());

        let err = resolve(&with_credential(json!({})), true).unwrap_err();
        assert_eq!(ErrorKind::MissingRequiredValue, err.kind());
        assert_eq!("value_from.ssm.access_key_id", err.path().to_string());
    }

    #[test]
    fn reference_shape_is_finite() {
        fn depth(fields: &[ConfigField]) -> usize {
            fields
                .iter()
                .map(|f| {
                    assert_ne!(FieldKind::Reference, f.kind, "{} nests a reference", f.name);
                    1 + f.children().map(depth).unwrap_or(0)
                })
                .max()
                .unwrap_or(0)
        }
        // valueFrom.ssm.accessKeyId.valueFrom.secretKeyRef.name
        assert_eq!(6, depth(reference_shape()));
    }

    #[test]
    fn serializes_back_to_the_yaml_shape() {
        let value = ValueOrReference::Reference(ReferenceSource::Vault(VaultSecret {
            secret: "db".to_owned(),
            role: "reader".to_owned(),
            agent_inject: Some(true),
            kubernetes_auth_endpoint: None,
            service_account: None,
            service_account_namespace: None,
            endpoint: None,
            connection_template: None,
        }));
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(
            json!({"valueFrom": {"vault": {"secret": "db", "role": "reader", "agentInject": true}}}),
            json
        );
    }
}
