//! Validators that can be attached to a field. These are checked in declaration order, after
//! the type of the value has already been checked, and the first one that fails is reported.
use crate::schema::FieldKind;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use std::fmt::{self, Display};

lazy_static! {
    /// A number followed by a time unit, repeated, as in `5m` or `1h30m`
    pub static ref DURATION: Regex = Regex::new(r"^([0-9]+(\.[0-9]+)?(ms|s|m|h))+$").unwrap();

    /// RFC 1123 subdomain, which is what kubernetes requires for most object names
    pub static ref DNS_SUBDOMAIN: Regex =
        Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$").unwrap();

    /// RFC 1123 label, which is what kubernetes requires for namespaces
    pub static ref DNS_LABEL: Regex = Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").unwrap();
}

const DNS_SUBDOMAIN_MAX_LENGTH: usize = 253;
const DNS_LABEL_MAX_LENGTH: usize = 63;

/// A compiled regular expression. `Regex` doesn't implement `PartialEq`, so we compare on the
/// source text instead.
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(source: &str) -> Result<Pattern, regex::Error> {
        Regex::new(source).map(Pattern)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.0.is_match(value)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Pattern) -> bool {
        self.as_str() == other.as_str()
    }
}

impl From<Regex> for Pattern {
    fn from(regex: Regex) -> Pattern {
        Pattern(regex)
    }
}

/// Structured string formats that need more than a regex to check
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Format {
    Rfc3339,
    Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Validator {
    /// String must match the regular expression
    Pattern(Pattern),
    /// String must be exactly equal to one of the given values. Matching is case sensitive, and the
    /// empty string is only accepted if it is one of the values.
    OneOf(Vec<String>),
    Format(Format),
    MinLength(usize),
    MaxLength(usize),
    Minimum(i64),
    Maximum(i64),
    /// Lists and maps must have at least this many entries
    MinItems(usize),
    MaxItems(usize),
}

impl Validator {
    pub fn pattern(source: &str) -> Result<Validator, regex::Error> {
        Pattern::new(source).map(Validator::Pattern)
    }

    pub fn one_of<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Validator {
        Validator::OneOf(values.into_iter().map(Into::into).collect())
    }

    pub fn duration() -> Validator {
        Validator::Format(Format::Duration)
    }

    pub fn rfc3339() -> Validator {
        Validator::Format(Format::Rfc3339)
    }

    /// The validators applied to `metadata.name`
    pub fn dns_subdomain() -> Vec<Validator> {
        vec![
            Validator::MaxLength(DNS_SUBDOMAIN_MAX_LENGTH),
            Validator::Pattern(DNS_SUBDOMAIN.clone().into()),
        ]
    }

    /// The validators applied to `metadata.namespace`
    pub fn dns_label() -> Vec<Validator> {
        vec![
            Validator::MaxLength(DNS_LABEL_MAX_LENGTH),
            Validator::Pattern(DNS_LABEL.clone().into()),
        ]
    }

    /// Returns true if this validator can ever succeed for a value of the given kind
    pub fn applies_to(&self, kind: &FieldKind) -> bool {
        match *self {
            Validator::Pattern(_)
            | Validator::OneOf(_)
            | Validator::Format(_)
            | Validator::MinLength(_)
            | Validator::MaxLength(_) => *kind == FieldKind::String,
            Validator::Minimum(_) | Validator::Maximum(_) => {
                *kind == FieldKind::Int || *kind == FieldKind::Float
            }
            Validator::MinItems(_) | Validator::MaxItems(_) => match *kind {
                FieldKind::List(_) | FieldKind::Map(_) => true,
                _ => false,
            },
        }
    }

    /// Checks the value, returning a message describing the problem if it fails
    pub fn check(&self, value: &Value) -> Result<(), String> {
        match *self {
            Validator::Pattern(ref pattern) => {
                let s = expect_str(value)?;
                if pattern.is_match(s) {
                    Ok(())
                } else {
                    Err(format!(
                        "value '{}' does not match the pattern '{}'",
                        s,
                        pattern.as_str()
                    ))
                }
            }
            Validator::OneOf(ref allowed) => {
                let s = expect_str(value)?;
                if allowed.iter().any(|a| a == s) {
                    Ok(())
                } else {
                    Err(format!(
                        "value '{}' is not one of the allowed values: {:?}",
                        s, allowed
                    ))
                }
            }
            Validator::Format(Format::Rfc3339) => {
                let s = expect_str(value)?;
                chrono::DateTime::parse_from_rfc3339(s)
                    .map(|_| ())
                    .map_err(|e| format!("value '{}' is not an RFC3339 timestamp: {}", s, e))
            }
            Validator::Format(Format::Duration) => {
                let s = expect_str(value)?;
                if DURATION.is_match(s) {
                    Ok(())
                } else {
                    Err(format!(
                        "value '{}' is not a duration, such as '30s' or '1h30m'",
                        s
                    ))
                }
            }
            Validator::MinLength(min) => {
                let len = expect_str(value)?.chars().count();
                if len >= min {
                    Ok(())
                } else {
                    Err(format!("length {} is less than the minimum of {}", len, min))
                }
            }
            Validator::MaxLength(max) => {
                let len = expect_str(value)?.chars().count();
                if len <= max {
                    Ok(())
                } else {
                    Err(format!("length {} exceeds the maximum of {}", len, max))
                }
            }
            Validator::Minimum(min) => {
                let n = expect_number(value)?;
                if n >= min as f64 {
                    Ok(())
                } else {
                    Err(format!("value {} is less than the minimum of {}", value, min))
                }
            }
            Validator::Maximum(max) => {
                let n = expect_number(value)?;
                if n <= max as f64 {
                    Ok(())
                } else {
                    Err(format!("value {} exceeds the maximum of {}", value, max))
                }
            }
            Validator::MinItems(min) => {
                let len = expect_collection_len(value)?;
                if len >= min {
                    Ok(())
                } else {
                    Err(format!("has {} items, but at least {} are required", len, min))
                }
            }
            Validator::MaxItems(max) => {
                let len = expect_collection_len(value)?;
                if len <= max {
                    Ok(())
                } else {
                    Err(format!("has {} items, but at most {} are allowed", len, max))
                }
            }
        }
    }
}

impl Display for Validator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Validator::Pattern(ref p) => {
                write!(f, "value must match regular expression '{}'", p.as_str())
            }
            Validator::OneOf(ref values) => write!(f, "value must be one of: {:?}", values),
            Validator::Format(Format::Rfc3339) => f.write_str("value must be an RFC3339 timestamp"),
            Validator::Format(Format::Duration) => {
                f.write_str("value must be a duration, such as '30s' or '1h30m'")
            }
            Validator::MinLength(n) => write!(f, "string length must be at least {}", n),
            Validator::MaxLength(n) => write!(f, "string length must be at most {}", n),
            Validator::Minimum(n) => write!(f, "value must be at least {}", n),
            Validator::Maximum(n) => write!(f, "value must be at most {}", n),
            Validator::MinItems(n) => write!(f, "must contain at least {} items", n),
            Validator::MaxItems(n) => write!(f, "must contain at most {} items", n),
        }
    }
}

fn expect_str(value: &Value) -> Result<&str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("validator requires a string, but found: {}", value))
}

fn expect_number(value: &Value) -> Result<f64, String> {
    value
        .as_f64()
        .ok_or_else(|| format!("validator requires a number, but found: {}", value))
}

fn expect_collection_len(value: &Value) -> Result<usize, String> {
    match *value {
        Value::Array(ref a) => Ok(a.len()),
        Value::Object(ref o) => Ok(o.len()),
        _ => Err(format!(
            "validator requires a list or map, but found: {}",
            value
        )),
    }
}
