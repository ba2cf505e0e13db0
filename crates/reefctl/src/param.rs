//! The parameter model: one typed, CLI-exposed value per [`Parameter`].
//!
//! Parameters are created by the generator (one per declared descriptor
//! field) or by an override (custom options with their own coercers). A
//! parameter's `value` slot is only meaningful after invocation binding;
//! before that it is unset.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use crate::coerce::Coercer;

/// Declared parameter value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Free-form string value.
    Text,
    /// Integer value.
    Integer,
    /// Explicit boolean value; `--flag false` is distinguishable from an
    /// absent flag.
    Boolean,
    /// Presence-only flag.
    Flag,
    /// Repeatable option taking two tokens per occurrence.
    PairList,
}

/// Where a supplied value lands in the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Written into the request body at this dot-path.
    Body(String),
    /// Substituted into the matching `{segment}` of the resource path.
    PathSegment,
    /// Appended to the query string under this key.
    Query(String),
    /// Not part of the auto-derived payload; consumed by a shim stage.
    None,
}

/// A single CLI-exposed value owned by one command.
#[derive(Clone)]
pub struct Parameter {
    /// Option or positional name, unique within the owning command.
    pub name: String,
    /// Declared value type.
    pub kind: ParamKind,
    /// Whether the user must supply the value.
    pub required: bool,
    /// Payload destination.
    pub destination: Destination,
    /// One-line help text.
    pub help: String,
    /// Display names for the value tokens (two entries for `PairList`).
    pub value_names: Vec<String>,
    /// Optional value coercer applied during binding.
    pub coercer: Option<Coercer>,
    /// The supplied value; set during invocation binding only.
    pub value: Option<Value>,
}

impl Parameter {
    /// Create a parameter with no destination, not required.
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            destination: Destination::None,
            help: String::new(),
            value_names: Vec::new(),
            coercer: None,
            value: None,
        }
    }

    /// Mark the parameter required.
    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Set the payload destination.
    #[must_use]
    pub fn destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    /// Set the help text.
    #[must_use]
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    /// Set the value token display names.
    #[must_use]
    pub fn value_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.value_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Attach a value coercer.
    #[must_use]
    pub fn coercer(mut self, coercer: Coercer) -> Self {
        self.coercer = Some(coercer);
        self
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("destination", &self.destination)
            .field("coercer", &self.coercer.as_ref().map(Coercer::name))
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}

/// A supplied value together with its payload destination.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueEntry {
    /// The coerced value.
    pub value: Value,
    /// Where the value lands in the request.
    pub destination: Destination,
}

/// The values the user actually supplied for one invocation.
///
/// Absence from the map means "unset", which is distinct from an explicit
/// `false` or an empty list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamValues {
    entries: BTreeMap<String, ValueEntry>,
}

impl ParamValues {
    /// Record a supplied value.
    pub fn set(&mut self, name: impl Into<String>, destination: Destination, value: Value) {
        self.entries
            .insert(name.into(), ValueEntry { value, destination });
    }

    /// The supplied value for `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name).map(|e| &e.value)
    }

    /// The supplied value for `name` as a string slice, if any.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Whether the user supplied a value for `name`.
    #[must_use]
    pub fn is_set(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Iterate supplied values in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ValueEntry)> {
        self.entries.iter()
    }
}
