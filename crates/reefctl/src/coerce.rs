//! Multi-value option coercers.
//!
//! Each coercer is a pure function from a raw parsed value to the
//! structured value shims read; none of them know which command they are
//! attached to. The free functions carry the actual logic so they can be
//! reused and tested in isolation; [`Coercer`] packages one of them for a
//! [`crate::param::Parameter`] and optionally chains a downstream transform
//! without the base step knowing about it.

use std::rc::Rc;

use serde_json::{Map, Value};

use crate::error::CliError;

/// The raw value the binder extracted from the command line, before
/// coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// A single string token.
    Text(String),
    /// A parsed integer.
    Integer(i64),
    /// An explicit boolean value.
    Boolean(bool),
    /// Flag presence.
    Flag(bool),
    /// All occurrences of a two-token option, in input order.
    Pairs(Vec<(String, String)>),
}

impl RawValue {
    /// The identity conversion used when a parameter has no coercer.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Text(s) => Value::String(s),
            Self::Integer(n) => Value::from(n),
            Self::Boolean(b) | Self::Flag(b) => Value::Bool(b),
            Self::Pairs(pairs) => Value::Array(
                pairs
                    .into_iter()
                    .map(|(a, b)| Value::Array(vec![Value::String(a), Value::String(b)]))
                    .collect(),
            ),
        }
    }
}

type AfterFn = Rc<dyn Fn(Value) -> Result<Value, CliError>>;

/// A reusable value coercer with an optional downstream transform.
#[derive(Clone)]
pub struct Coercer {
    kind: CoerceKind,
    after: Option<AfterFn>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CoerceKind {
    CommaList,
    KeyValueMap,
    NamedGroups {
        name_key: &'static str,
        members_key: &'static str,
    },
    PairObjects {
        first_key: &'static str,
        second_key: &'static str,
    },
}

impl Coercer {
    /// Split a comma-separated string into a list of trimmed strings.
    #[must_use]
    pub fn comma_list() -> Self {
        Self {
            kind: CoerceKind::CommaList,
            after: None,
        }
    }

    /// Parse a comma-separated `key=value` string into a string map.
    #[must_use]
    pub fn key_value_map() -> Self {
        Self {
            kind: CoerceKind::KeyValueMap,
            after: None,
        }
    }

    /// Turn repeated `(name, delimited-members)` tuples into a list of
    /// `{name_key, members_key: […]}` objects.
    #[must_use]
    pub fn named_groups(name_key: &'static str, members_key: &'static str) -> Self {
        Self {
            kind: CoerceKind::NamedGroups {
                name_key,
                members_key,
            },
            after: None,
        }
    }

    /// Turn repeated `(a, b)` tuples into a list of `{first_key: a,
    /// second_key: b}` objects.
    #[must_use]
    pub fn pair_objects(first_key: &'static str, second_key: &'static str) -> Self {
        Self {
            kind: CoerceKind::PairObjects {
                first_key,
                second_key,
            },
            after: None,
        }
    }

    /// Chain a downstream transform over this coercer's output.
    #[must_use]
    pub fn then(mut self, transform: impl Fn(Value) -> Result<Value, CliError> + 'static) -> Self {
        self.after = Some(Rc::new(transform));
        self
    }

    /// Short name for diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self.kind {
            CoerceKind::CommaList => "comma-list",
            CoerceKind::KeyValueMap => "key-value-map",
            CoerceKind::NamedGroups { .. } => "named-groups",
            CoerceKind::PairObjects { .. } => "pair-objects",
        }
    }

    /// Apply the coercion, then the downstream transform if any.
    pub fn apply(&self, raw: &RawValue) -> Result<Value, CliError> {
        let value = match (&self.kind, raw) {
            (CoerceKind::CommaList, RawValue::Text(s)) => {
                Value::Array(comma_list(s).into_iter().map(Value::String).collect())
            }
            (CoerceKind::KeyValueMap, RawValue::Text(s)) => Value::Object(key_value_map(s)?),
            (
                CoerceKind::NamedGroups {
                    name_key,
                    members_key,
                },
                RawValue::Pairs(pairs),
            ) => named_groups(pairs, name_key, members_key),
            (
                CoerceKind::PairObjects {
                    first_key,
                    second_key,
                },
                RawValue::Pairs(pairs),
            ) => pair_objects(pairs, first_key, second_key),
            (_, raw) => {
                return Err(CliError::invalid_usage(format!(
                    "option value {raw:?} cannot be interpreted as {}",
                    self.name()
                )));
            }
        };
        match &self.after {
            Some(transform) => transform(value),
            None => Ok(value),
        }
    }
}

impl std::fmt::Debug for Coercer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coercer")
            .field("kind", &self.kind)
            .field("chained", &self.after.is_some())
            .finish()
    }
}

/// Split a comma-separated string into trimmed entries. An empty or
/// all-whitespace input yields an empty list.
#[must_use]
pub fn comma_list(input: &str) -> Vec<String> {
    if input.trim().is_empty() {
        return Vec::new();
    }
    input.split(',').map(|item| item.trim().to_string()).collect()
}

/// Parse a comma-separated `key=value` string into a string-to-string map.
///
/// Each entry is split on the first `=` only, and keys and values are
/// trimmed of surrounding whitespace. An entry with no `=` is a usage
/// error.
pub fn key_value_map(input: &str) -> Result<Map<String, Value>, CliError> {
    let mut map = Map::new();
    for entry in input.split(',') {
        let (key, value) = entry.split_once('=').ok_or_else(|| {
            CliError::invalid_usage(format!(
                "malformed key=value entry '{}': missing '='",
                entry.trim()
            ))
        })?;
        map.insert(
            key.trim().to_string(),
            Value::String(value.trim().to_string()),
        );
    }
    Ok(map)
}

/// Coerce repeated `(name, delimited-members)` tuples into a list of
/// `{name, members}` objects, preserving input order. Member lists split
/// on commas and are trimmed. Zero occurrences yield an empty list.
#[must_use]
pub fn named_groups(pairs: &[(String, String)], name_key: &str, members_key: &str) -> Value {
    Value::Array(
        pairs
            .iter()
            .map(|(name, members)| {
                let mut object = Map::new();
                object.insert(name_key.to_string(), Value::String(name.clone()));
                object.insert(
                    members_key.to_string(),
                    Value::Array(comma_list(members).into_iter().map(Value::String).collect()),
                );
                Value::Object(object)
            })
            .collect(),
    )
}

/// Coerce repeated `(a, b)` tuples into a list of two-field objects with
/// the configured key spellings, preserving input order.
#[must_use]
pub fn pair_objects(pairs: &[(String, String)], first_key: &str, second_key: &str) -> Value {
    Value::Array(
        pairs
            .iter()
            .map(|(first, second)| {
                let mut object = Map::new();
                object.insert(first_key.to_string(), Value::String(first.clone()));
                object.insert(second_key.to_string(), Value::String(second.clone()));
                Value::Object(object)
            })
            .collect(),
    )
}
