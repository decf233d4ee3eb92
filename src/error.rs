//! Errors returned by the lifecycle operations. Validation failures always carry the path of the
//! field that failed, and only the first failure is ever reported.
use crate::resource::ObjectId;
use crate::schema::FieldPath;

use std::fmt::{self, Display};

/// The broad category of a failure, useful for matching on an error without destructuring it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    SchemaViolation,
    MissingRequiredField,
    MissingRequiredValue,
    AmbiguousSource,
    SerializationFailure,
    UnknownResourceType,
    IdentityConflict,
    IdsExhausted,
}

/// A candidate value did not conform to the schema of a resource. These are always detected
/// before any state is written.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The value has the wrong type, is not allowed at this position, or was rejected by a validator
    SchemaViolation { path: FieldPath, message: String },
    /// A required field was absent or null
    MissingRequiredField { path: FieldPath },
    /// A required value-or-reference field had neither a literal value nor a reference
    MissingRequiredValue { path: FieldPath },
    /// A value-or-reference field had more than one source populated
    AmbiguousSource {
        path: FieldPath,
        sources: Vec<&'static str>,
    },
}

impl ValidationError {
    pub fn violation(path: &FieldPath, message: impl Into<String>) -> ValidationError {
        ValidationError::SchemaViolation {
            path: path.clone(),
            message: message.into(),
        }
    }

    pub fn missing_field(path: &FieldPath) -> ValidationError {
        ValidationError::MissingRequiredField { path: path.clone() }
    }

    pub fn missing_value(path: &FieldPath) -> ValidationError {
        ValidationError::MissingRequiredValue { path: path.clone() }
    }

    pub fn kind(&self) -> ErrorKind {
        match *self {
            ValidationError::SchemaViolation { .. } => ErrorKind::SchemaViolation,
            ValidationError::MissingRequiredField { .. } => ErrorKind::MissingRequiredField,
            ValidationError::MissingRequiredValue { .. } => ErrorKind::MissingRequiredValue,
            ValidationError::AmbiguousSource { .. } => ErrorKind::AmbiguousSource,
        }
    }

    /// The path of the field that failed validation
    pub fn path(&self) -> &FieldPath {
        match *self {
            ValidationError::SchemaViolation { ref path, .. } => path,
            ValidationError::MissingRequiredField { ref path } => path,
            ValidationError::MissingRequiredValue { ref path } => path,
            ValidationError::AmbiguousSource { ref path, .. } => path,
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ValidationError::SchemaViolation {
                ref path,
                ref message,
            } => write!(f, "Invalid value at '{}': {}", path, message),
            ValidationError::MissingRequiredField { ref path } => {
                write!(f, "Missing required field: '{}'", path)
            }
            ValidationError::MissingRequiredValue { ref path } => write!(
                f,
                "Missing required value at '{}': either a value or a reference must be given",
                path
            ),
            ValidationError::AmbiguousSource {
                ref path,
                ref sources,
            } => write!(
                f,
                "Ambiguous value at '{}': only one of [{}] may be set",
                path,
                sources.join(", ")
            ),
        }
    }
}
impl std::error::Error for ValidationError {}

/// Error returned from a lifecycle operation. No state is ever persisted when one of these is
/// returned.
#[derive(Debug)]
pub enum ResourceError {
    Validation(ValidationError),
    Serialization(serde_yaml::Error),
    UnknownResourceType(String),
    /// An update would move an instance onto the identity of another instance that already has state
    IdentityConflict { id: ObjectId, existing_id: i64 },
    /// The id strategy has no ids left to hand out
    IdsExhausted,
}

impl ResourceError {
    pub fn kind(&self) -> ErrorKind {
        match *self {
            ResourceError::Validation(ref e) => e.kind(),
            ResourceError::Serialization(_) => ErrorKind::SerializationFailure,
            ResourceError::UnknownResourceType(_) => ErrorKind::UnknownResourceType,
            ResourceError::IdentityConflict { .. } => ErrorKind::IdentityConflict,
            ResourceError::IdsExhausted => ErrorKind::IdsExhausted,
        }
    }

    pub fn as_validation(&self) -> Option<&ValidationError> {
        match *self {
            ResourceError::Validation(ref e) => Some(e),
            _ => None,
        }
    }
}

impl From<ValidationError> for ResourceError {
    fn from(err: ValidationError) -> ResourceError {
        ResourceError::Validation(err)
    }
}

impl From<serde_yaml::Error> for ResourceError {
    fn from(err: serde_yaml::Error) -> ResourceError {
        ResourceError::Serialization(err)
    }
}

impl Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ResourceError::Validation(ref e) => Display::fmt(e, f),
            ResourceError::Serialization(ref e) => {
                write!(f, "Failed to render resource as yaml: {}", e)
            }
            ResourceError::UnknownResourceType(ref name) => {
                write!(f, "No resource type is registered with the name: '{}'", name)
            }
            ResourceError::IdentityConflict {
                ref id,
                existing_id,
            } => write!(
                f,
                "Cannot move the instance to '{}', which already has state with id: {}",
                id, existing_id
            ),
            ResourceError::IdsExhausted => f.write_str("No ids are left to assign to new state"),
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            ResourceError::Validation(ref e) => Some(e),
            ResourceError::Serialization(ref e) => Some(e),
            ResourceError::UnknownResourceType(_)
            | ResourceError::IdentityConflict { .. }
            | ResourceError::IdsExhausted => None,
        }
    }
}
