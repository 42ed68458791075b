//! Config types for data-driven mapping rules.
//!
//! These types mirror [`MappingConfiguration`](crate::MappingConfiguration) but are
//! serde-deserializable, so rules can live in JSON/YAML next to the payloads they
//! describe. [`TypeRegistry::load_configuration()`](crate::TypeRegistry::load_configuration)
//! compiles them.
//!
//! # Relationship to runtime types
//!
//! | Config type | Runtime type | Resolved through |
//! |-------------|-------------|------------------|
//! | [`MappingConfig`] | [`MappingConfiguration`](crate::MappingConfiguration) | `TypeRegistry::load_configuration()` |
//! | [`RuleConfig::Rename`] | [`MappingRule::Rename`](crate::MappingRule::Rename) | direct |
//! | [`RuleConfig::Nested`] | [`MappingRule::Nested`](crate::MappingRule::Nested) | model registry (URL check) |
//! | [`RuleConfig::Transform`] | [`MappingRule::Block`](crate::MappingRule::Block) | transform registry factory |
//!
//! Callback rules have no config form: they need code.

use serde::Deserialize;

/// Configuration for a [`MappingConfiguration`](crate::MappingConfiguration).
///
/// ```json
/// { "rules": [
///     { "type": "rename", "key_path": "departure.city", "property": "departingDestination" },
///     { "type": "nested", "key_path": "trainInfo", "property": "trainInfo", "type_url": "objmap.test.v1.TrainInfo" },
///     { "type": "transform", "key_path": "speed", "property": "maxSpeed",
///       "transform": { "type_url": "objmap.core.v1.ParseNumber" } }
/// ] }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MappingConfig {
    /// Rules, applied in order. Later rules for the same key path replace earlier ones.
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// Configuration for one rule.
///
/// Uses `#[serde(tag = "type")]` for discriminated union deserialization.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum RuleConfig {
    /// Assign the value at `key_path` to `property`.
    #[serde(rename = "rename")]
    Rename {
        /// Source key path.
        key_path: String,
        /// Target property.
        property: String,
    },

    /// Build instances of a registered type from the value at `key_path`.
    #[serde(rename = "nested")]
    Nested {
        /// Source key path.
        key_path: String,
        /// Target property.
        property: String,
        /// Type URL of the nested model. Must be registered.
        type_url: String,
    },

    /// Compute the property with a registered transform.
    #[serde(rename = "transform")]
    Transform {
        /// Source key path.
        key_path: String,
        /// Target property.
        property: String,
        /// The transform and its own configuration.
        transform: TypedConfig,
    },
}

impl RuleConfig {
    /// The source key path of this rule.
    #[must_use]
    pub fn key_path(&self) -> &str {
        match self {
            Self::Rename { key_path, .. }
            | Self::Nested { key_path, .. }
            | Self::Transform { key_path, .. } => key_path,
        }
    }
}

/// Reference to a registered transform with its configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TypedConfig {
    /// The type URL identifying the registered transform.
    pub type_url: String,

    /// Transform-specific configuration payload.
    /// Deserialized as the `Config` associated type of the registered
    /// [`IntoTransform`](crate::IntoTransform).
    #[serde(default = "default_config")]
    pub config: serde_json::Value,
}

fn default_config() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Empty configuration for transforms that take no parameters.
///
/// Accepts any JSON value (`{}`, `null`, etc.) and ignores it.
#[derive(Debug, Clone, Copy)]
pub struct UnitConfig;

impl<'de> Deserialize<'de> for UnitConfig {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde::de::IgnoredAny::deserialize(deserializer)?;
        Ok(UnitConfig)
    }
}
