//! Values flowing into and out of the engine.
//!
//! - [`SourceValue`] / [`SourceMap`] — decoded payload data (`serde_json`)
//! - [`PropertyType`] — what a target property declares it can hold
//! - [`MappedValue`] — what the engine hands to a setter: a raw value, one built
//!   object, or a list of built objects
//!
//! Validity is deliberately shallow: a value is eligible when it is present,
//! not null, and plausible for the declared [`PropertyType`]. Anything finer is
//! the setter's job (see [`MappedValue::decode`]).

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{AssignError, Mappable};

/// A decoded payload value.
pub type SourceValue = Value;

/// A decoded payload object.
pub type SourceMap = serde_json::Map<String, Value>;

/// Returns `true` if a resolved value may be assigned at all.
///
/// Absent (`None`) and `null` are invalid. Exposed for custom transforms that
/// want the same notion of "nothing here" as the engine.
///
/// ```
/// use objmap::is_valid_value;
/// use serde_json::json;
///
/// assert!(is_valid_value(Some(&json!("Berlin"))));
/// assert!(is_valid_value(Some(&json!(0))));
/// assert!(!is_valid_value(Some(&json!(null))));
/// assert!(!is_valid_value(None));
/// ```
#[inline]
#[must_use]
pub fn is_valid_value(value: Option<&Value>) -> bool {
    value.is_some_and(|v| !v.is_null())
}

/// The declared type of a target property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    /// Accepts any non-null value.
    Any,
    /// A string.
    String,
    /// Any JSON number.
    Number,
    /// A number without a fractional part.
    Integer,
    /// A boolean.
    Bool,
    /// A date-like value: a string (e.g. RFC 3339) or a numeric timestamp.
    Date,
    /// An array of plain values.
    Array,
    /// A plain JSON object (kept as data, not mapped into a type).
    Map,
    /// One instance of the registered type with this URL.
    Object(&'static str),
    /// A list of instances of the registered type with this URL.
    Objects(&'static str),
}

impl PropertyType {
    /// Returns `true` if a raw payload value can be assigned directly.
    ///
    /// [`Object`](Self::Object) and [`Objects`](Self::Objects) never accept a raw
    /// value: they are only filled through nested-type rules or transforms.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Any => !value.is_null(),
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Bool => value.is_boolean(),
            Self::Date => value.is_string() || value.is_number(),
            Self::Array => value.is_array(),
            Self::Map => value.is_object(),
            Self::Object(_) | Self::Objects(_) => false,
        }
    }

    /// Returns `true` for [`Object`](Self::Object) and [`Objects`](Self::Objects).
    #[must_use]
    pub fn is_nested(&self) -> bool {
        matches!(self, Self::Object(_) | Self::Objects(_))
    }

    /// Short name used in traces and logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Bool => "bool",
            Self::Date => "date",
            Self::Array => "array",
            Self::Map => "map",
            Self::Object(_) => "object",
            Self::Objects(_) => "objects",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object(url) => write!(f, "object<{url}>"),
            Self::Objects(url) => write!(f, "objects<{url}>"),
            other => f.write_str(other.name()),
        }
    }
}

/// JSON type name of a value, for diagnostics.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// The value handed to [`Mappable::set_property`].
#[derive(Debug)]
pub enum MappedValue {
    /// A payload value, already checked against the declared [`PropertyType`]
    /// unless it came from a transform.
    Value(Value),

    /// One instance built by a nested-type rule.
    Object(Box<dyn Mappable>),

    /// Instances built from an array by a nested-type rule, in payload order.
    Objects(Vec<Box<dyn Mappable>>),
}

impl MappedValue {
    /// Deserialize a [`Value`](Self::Value) into the property's Rust type.
    ///
    /// # Errors
    ///
    /// [`AssignError::Incompatible`] if this is not a plain value or if
    /// deserialization fails.
    pub fn decode<T: DeserializeOwned>(self, key: &str) -> Result<T, AssignError> {
        match self {
            Self::Value(value) => {
                serde_json::from_value(value).map_err(|e| AssignError::incompatible(key, e.to_string()))
            }
            other => Err(AssignError::incompatible(
                key,
                format!("expected a plain value, got {}", other.kind()),
            )),
        }
    }

    /// Downcast an [`Object`](Self::Object) into a concrete type.
    ///
    /// # Errors
    ///
    /// [`AssignError::Incompatible`] if this is not a single object of type `T`.
    pub fn into_object<T: Mappable>(self, key: &str) -> Result<T, AssignError> {
        match self {
            Self::Object(object) => downcast(object, key),
            other => Err(AssignError::incompatible(
                key,
                format!("expected an object, got {}", other.kind()),
            )),
        }
    }

    /// Downcast [`Objects`](Self::Objects) into a list of a concrete type.
    ///
    /// # Errors
    ///
    /// [`AssignError::Incompatible`] if this is not a list or any element is not a `T`.
    /// Nothing is returned partially.
    pub fn into_objects<T: Mappable>(self, key: &str) -> Result<Vec<T>, AssignError> {
        match self {
            Self::Objects(objects) => objects.into_iter().map(|o| downcast(o, key)).collect(),
            other => Err(AssignError::incompatible(
                key,
                format!("expected a list of objects, got {}", other.kind()),
            )),
        }
    }

    /// Returns the plain value, if this is one.
    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Value(_) => "a plain value",
            Self::Object(_) => "an object",
            Self::Objects(_) => "a list of objects",
        }
    }
}

fn downcast<T: Mappable>(object: Box<dyn Mappable>, key: &str) -> Result<T, AssignError> {
    let found = object.type_url();
    object
        .into_any()
        .downcast::<T>()
        .map(|b| *b)
        .map_err(|_| {
            AssignError::incompatible(
                key,
                format!("expected {}, got {found}", std::any::type_name::<T>()),
            )
        })
}

impl From<Value> for MappedValue {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Box<dyn Mappable>> for MappedValue {
    fn from(object: Box<dyn Mappable>) -> Self {
        Self::Object(object)
    }
}

impl From<Vec<Box<dyn Mappable>>> for MappedValue {
    fn from(objects: Vec<Box<dyn Mappable>>) -> Self {
        Self::Objects(objects)
    }
}
