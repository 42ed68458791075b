//! `MappingConfiguration` — explicit rules keyed by source key path
//!
//! Each source key path carries at most one [`MappingRule`]. Registering a rule
//! for a key path that already has one replaces it, whatever the kinds involved:
//! a rename registered after a block rule discards the block rule, and vice versa.
//! The replacement keeps the original position, so iteration order is the order
//! in which key paths were first configured.
//!
//! Rules are built programmatically with the `set_*` methods, or loaded from
//! JSON/YAML through [`TypeRegistry::load_configuration`](crate::TypeRegistry::load_configuration).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::{Mappable, MappedValue};

/// A block rule's transform: `(property, key_path, resolved) -> Transformed`.
///
/// `resolved` is `None` when the key path is absent from the payload.
pub type TransformFn = dyn Fn(&str, &str, Option<&Value>) -> Transformed + Send + Sync;

/// A callback rule: `(target, key_path, resolved)`. Performs its own assignments.
pub type CallbackFn = dyn Fn(&mut dyn Mappable, &str, Option<&Value>) + Send + Sync;

/// What a block rule's transform decided.
#[derive(Debug)]
pub enum Transformed {
    /// Assign this value to the rule's property, as is.
    Assign(MappedValue),

    /// No override: assign the raw resolved value exactly as a rename would,
    /// including validation against the declared property type.
    ApplyDefault,
}

impl Transformed {
    /// Shorthand for assigning a plain JSON value.
    #[must_use]
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Assign(MappedValue::Value(value.into()))
    }
}

/// One explicit mapping rule.
#[derive(Clone)]
pub enum MappingRule {
    /// Compute the property value with a transform.
    Block {
        /// The property the result is assigned to.
        property: String,
        /// The transform.
        transform: Arc<TransformFn>,
    },

    /// Build one instance (object payload) or a list of instances (array payload)
    /// of a registered type.
    Nested {
        /// The property the built instance(s) are assigned to.
        property: String,
        /// Type URL of the nested type.
        type_url: String,
    },

    /// Assign the value at the key path to a differently named property.
    Rename {
        /// The property the value is assigned to.
        property: String,
    },

    /// Hand the resolved value to a callback that updates the target itself.
    Callback {
        /// The callback.
        callback: Arc<CallbackFn>,
    },
}

impl MappingRule {
    /// The property this rule writes, if it is bound to one.
    #[must_use]
    pub fn property(&self) -> Option<&str> {
        match self {
            Self::Block { property, .. }
            | Self::Nested { property, .. }
            | Self::Rename { property } => Some(property),
            Self::Callback { .. } => None,
        }
    }
}

impl fmt::Debug for MappingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Block { property, .. } => f
                .debug_struct("Block")
                .field("property", property)
                .finish_non_exhaustive(),
            Self::Nested { property, type_url } => f
                .debug_struct("Nested")
                .field("property", property)
                .field("type_url", type_url)
                .finish(),
            Self::Rename { property } => {
                f.debug_struct("Rename").field("property", property).finish()
            }
            Self::Callback { .. } => f.debug_struct("Callback").finish_non_exhaustive(),
        }
    }
}

/// Ordered set of explicit rules, keyed by source key path.
///
/// Cheap to clone: transforms and callbacks are shared.
///
/// # Example
///
/// ```
/// use objmap::{MappingConfiguration, Transformed};
/// use serde_json::json;
///
/// let mut config = MappingConfiguration::new();
/// config.set_rename_rule("departure.city", "departingDestination");
/// config.set_nested_type_rule("trainInfo", "trainInfo", "objmap.test.v1.TrainInfo");
/// config.set_block_rule("destination", "destination", |_, _, value| match value {
///     Some(v) if v == &json!("BER") => Transformed::value("Berlin"),
///     _ => Transformed::ApplyDefault,
/// });
///
/// assert_eq!(
///     config.all_key_paths(),
///     ["departure.city", "trainInfo", "destination"]
/// );
/// ```
#[derive(Clone, Default)]
pub struct MappingConfiguration {
    rules: HashMap<String, MappingRule>,
    order: Vec<String>,
}

impl MappingConfiguration {
    /// Create an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a block rule. Replaces any rule for `key_path`.
    pub fn set_block_rule<F>(&mut self, key_path: &str, property: &str, transform: F)
    where
        F: Fn(&str, &str, Option<&Value>) -> Transformed + Send + Sync + 'static,
    {
        self.insert(
            key_path,
            MappingRule::Block {
                property: property.to_owned(),
                transform: Arc::new(transform),
            },
        );
    }

    /// Register a nested-type rule. Replaces any rule for `key_path`.
    pub fn set_nested_type_rule(&mut self, key_path: &str, property: &str, type_url: &str) {
        self.insert(
            key_path,
            MappingRule::Nested {
                property: property.to_owned(),
                type_url: type_url.to_owned(),
            },
        );
    }

    /// Register a rename rule. Replaces any rule for `key_path`.
    pub fn set_rename_rule(&mut self, key_path: &str, property: &str) {
        self.insert(
            key_path,
            MappingRule::Rename {
                property: property.to_owned(),
            },
        );
    }

    /// Register a callback rule. Replaces any rule for `key_path`.
    pub fn set_callback_rule<F>(&mut self, key_path: &str, callback: F)
    where
        F: Fn(&mut dyn Mappable, &str, Option<&Value>) + Send + Sync + 'static,
    {
        self.insert(
            key_path,
            MappingRule::Callback {
                callback: Arc::new(callback),
            },
        );
    }

    /// Register an already-built rule. Replaces any rule for `key_path`.
    pub fn insert(&mut self, key_path: &str, rule: MappingRule) {
        if self.rules.insert(key_path.to_owned(), rule).is_none() {
            self.order.push(key_path.to_owned());
        }
    }

    /// Remove the rule for `key_path`, returning it.
    pub fn remove(&mut self, key_path: &str) -> Option<MappingRule> {
        let rule = self.rules.remove(key_path)?;
        self.order.retain(|k| k != key_path);
        Some(rule)
    }

    /// Every key path with a rule, in the order they were first configured.
    #[must_use]
    pub fn all_key_paths(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    /// The rule registered for `key_path`.
    #[must_use]
    pub fn rule(&self, key_path: &str) -> Option<&MappingRule> {
        self.rules.get(key_path)
    }

    /// Returns `true` if `key_path` has a rule.
    #[must_use]
    pub fn contains(&self, key_path: &str) -> bool {
        self.rules.contains_key(key_path)
    }

    /// Returns `true` if any property-bound rule writes `property`.
    #[must_use]
    pub fn targets_property(&self, property: &str) -> bool {
        self.rules.values().any(|r| r.property() == Some(property))
    }

    /// `(key_path, rule)` pairs in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MappingRule)> {
        self.order
            .iter()
            .filter_map(|k| self.rules.get(k).map(|r| (k.as_str(), r)))
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if there are no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl fmt::Debug for MappingConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
