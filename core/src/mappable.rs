//! `Mappable` — the property surface of a target type
//!
//! There is no runtime reflection in Rust, so each target type describes itself:
//! which properties it has, what each declares it can hold, and how to read and
//! write them by key. The engine only ever talks to targets through this trait.
//!
//! [`MapTarget`] is the static half: the type URL a type is registered under,
//! how to allocate a fresh instance, and the type's own default mapping rules.

use std::any::Any;
use std::fmt::Debug;

use serde_json::Value;

use crate::{AssignError, MappedValue, MappingConfiguration, MappingError, PropertyType};

/// A declared property: its key and the type it can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDescriptor {
    /// The property key, as used in payloads and rules.
    pub key: &'static str,
    /// What the property can hold.
    pub ty: PropertyType,
}

impl PropertyDescriptor {
    /// Create a descriptor. `const` so descriptor tables can be `static`.
    #[must_use]
    pub const fn new(key: &'static str, ty: PropertyType) -> Self {
        Self { key, ty }
    }
}

/// Dynamic access to a target object's properties.
///
/// # Setter contract
///
/// [`set_property`](Self::set_property) either stores the whole value or
/// returns an error and leaves the property as it was. Convert first, assign
/// last; [`MappedValue::decode`], [`MappedValue::into_object`] and
/// [`MappedValue::into_objects`] do the conversion.
///
/// # Example
///
/// ```ignore
/// fn set_property(&mut self, key: &str, value: MappedValue) -> Result<(), AssignError> {
///     match key {
///         "name" => self.name = Some(value.decode(key)?),
///         "trainInfo" => self.train_info = Some(value.into_object(key)?),
///         _ => return Err(AssignError::unknown(key)),
///     }
///     Ok(())
/// }
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be used as a mapping target",
    label = "`{Self}` does not implement `Mappable`",
    note = "implement `Mappable` (property access) and `MapTarget` (allocation) for your model type"
)]
pub trait Mappable: Any + Send + Debug {
    /// The type URL this instance's type is registered under.
    fn type_url(&self) -> &'static str;

    /// Declared properties, in declaration order.
    fn properties(&self) -> &'static [PropertyDescriptor];

    /// Current value of a property as JSON, or `None` when unset or unknown.
    fn property(&self, key: &str) -> Option<Value>;

    /// Store a value into a property.
    ///
    /// # Errors
    ///
    /// [`AssignError::UnknownProperty`] for keys the type does not have,
    /// [`AssignError::Incompatible`] when the value cannot be converted.
    fn set_property(&mut self, key: &str, value: MappedValue) -> Result<(), AssignError>;

    /// Returns `self` as `&dyn Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns `self` as `&mut dyn Any` for downcasting (used by callback rules).
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Converts the box into `Box<dyn Any>` for by-value downcasting.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// JSON object of every declared property that currently has a value.
    fn snapshot(&self) -> Value {
        let map = self
            .properties()
            .iter()
            .filter_map(|d| self.property(d.key).map(|v| (d.key.to_owned(), v)))
            .collect();
        Value::Object(map)
    }
}

/// Opaque handle to a persistence/session scope.
///
/// Passed through untouched to [`MapTarget::allocate`]; implementations downcast
/// to their own session type.
pub trait PersistenceContext: Debug {
    /// Returns `self` as `&dyn Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// The static side of a target type.
///
/// Registered with [`TypeRegistryBuilder::model`](crate::TypeRegistryBuilder::model),
/// which erases these associated items behind closures.
pub trait MapTarget: Mappable + Sized {
    /// The type URL used in nested-type rules and configs.
    const TYPE_URL: &'static str;

    /// Declared properties. Usually the same table [`Mappable::properties`] returns.
    const PROPERTIES: &'static [PropertyDescriptor];

    /// Allocate a fresh, unpopulated instance.
    ///
    /// # Errors
    ///
    /// [`MappingError::Allocation`] when the instance cannot be created, e.g. the
    /// context is not a session this type can be stored in.
    fn allocate(context: Option<&dyn PersistenceContext>) -> Result<Self, MappingError>;

    /// Rules used when a caller builds this type without an explicit configuration.
    ///
    /// Override to customize how the type maps itself. The default has no rules,
    /// so every declared property is mapped by name.
    fn mapping_configuration() -> MappingConfiguration {
        MappingConfiguration::new()
    }
}

// Blanket implementation for boxed targets, so `Box<dyn Mappable>` can be
// populated like any other target.
#[diagnostic::do_not_recommend]
impl Mappable for Box<dyn Mappable> {
    fn type_url(&self) -> &'static str {
        (**self).type_url()
    }

    fn properties(&self) -> &'static [PropertyDescriptor] {
        (**self).properties()
    }

    fn property(&self, key: &str) -> Option<Value> {
        (**self).property(key)
    }

    fn set_property(&mut self, key: &str, value: MappedValue) -> Result<(), AssignError> {
        (**self).set_property(key, value)
    }

    fn as_any(&self) -> &dyn Any {
        (**self).as_any()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        (**self).as_any_mut()
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        (*self).into_any()
    }

    fn snapshot(&self) -> Value {
        (**self).snapshot()
    }
}
