//! Type registry for allocation, introspection and config-driven rules.
//!
//! The registry is the default implementation of the engine's two collaborators:
//!
//! - [`InstanceFactory`] — allocate a fresh instance for a type URL, optionally
//!   bound to a [`PersistenceContext`]
//! - [`TypeIntrospection`] — declared properties and the default mapping rules for
//!   a type URL
//!
//! It also resolves transform type URLs so mapping rules can be loaded from
//! JSON/YAML via [`TypeRegistry::load_configuration`].
//!
//! # Architecture (early type erasure)
//!
//! Each model registers via [`MapTarget`], each transform via [`IntoTransform`]. At
//! registration time the concrete type `T` is monomorphized into a closure and
//! erased behind `Box<dyn Fn>`. Nothing about `T` is needed after `build()`.
//!
//! # Example
//!
//! ```ignore
//! let registry = objmap::register_core_transforms(TypeRegistryBuilder::new())
//!     .model::<TravelInfo>()
//!     .model::<TrainInfo>()
//!     .build();
//!
//! let config: MappingConfig = serde_yaml::from_str(yaml)?;
//! let rules = registry.load_configuration(config)?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::{
    config::{MappingConfig, RuleConfig, TypedConfig},
    MapTarget, Mappable, MappingConfiguration, MappingError, MappingRule, PersistenceContext,
    PropertyDescriptor, TransformFn, MAX_RULES,
};

// ═══════════════════════════════════════════════════════════════════════════════
// Collaborator traits
// ═══════════════════════════════════════════════════════════════════════════════

/// Allocates instances by type URL.
pub trait InstanceFactory {
    /// Allocate a fresh, unpopulated instance.
    ///
    /// `context` is passed through untouched to the type's allocator.
    ///
    /// # Errors
    ///
    /// [`MappingError::UnknownTypeUrl`] for unregistered types, or whatever the
    /// allocator reports (usually [`MappingError::Allocation`]).
    fn create(
        &self,
        type_url: &str,
        context: Option<&dyn PersistenceContext>,
    ) -> Result<Box<dyn Mappable>, MappingError>;
}

/// Describes registered types without allocating them.
pub trait TypeIntrospection {
    /// Declared properties of a type, or `None` if the type is unknown.
    fn properties_of(&self, type_url: &str) -> Option<&'static [PropertyDescriptor]>;

    /// The type's own default rules (its configuration hook), or `None` if unknown.
    fn mapping_configuration_of(&self, type_url: &str) -> Option<MappingConfiguration>;

    /// All registered type URLs (sorted).
    fn type_urls(&self) -> Vec<&str>;

    /// Returns `true` if the type URL is registered.
    fn contains_type(&self, type_url: &str) -> bool {
        self.properties_of(type_url).is_some()
    }
}

/// Trait for transforms that can be constructed from configuration.
///
/// The registry deserializes `Config` from the rule's [`TypedConfig`] payload and
/// calls [`from_config`](Self::from_config) at load time.
///
/// # Example
///
/// ```ignore
/// impl IntoTransform for Uppercase {
///     type Config = UnitConfig;
///     fn from_config(_: UnitConfig) -> Result<Arc<TransformFn>, MappingError> {
///         Ok(Arc::new(|_: &str, _: &str, value: Option<&Value>| match value {
///             Some(Value::String(s)) => Transformed::value(s.to_uppercase()),
///             _ => Transformed::ApplyDefault,
///         }))
///     }
/// }
/// ```
pub trait IntoTransform: Send + Sync + 'static {
    /// The configuration type deserialized from JSON/YAML.
    type Config: DeserializeOwned + Send + Sync;

    /// Construct a transform from deserialized configuration.
    ///
    /// # Errors
    ///
    /// [`MappingError::InvalidConfig`] if the config is semantically invalid.
    fn from_config(config: Self::Config) -> Result<Arc<TransformFn>, MappingError>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// Type-erased factories
// ═══════════════════════════════════════════════════════════════════════════════

/// Type-erased allocator closure.
type BoxedAllocator = Box<
    dyn Fn(Option<&dyn PersistenceContext>) -> Result<Box<dyn Mappable>, MappingError>
        + Send
        + Sync,
>;

/// Type-erased transform factory closure.
type BoxedTransformFactory =
    Box<dyn Fn(&serde_json::Value) -> Result<Arc<TransformFn>, MappingError> + Send + Sync>;

struct ModelEntry {
    allocate: BoxedAllocator,
    properties: &'static [PropertyDescriptor],
    configure: fn() -> MappingConfiguration,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Builder
// ═══════════════════════════════════════════════════════════════════════════════

/// Builder for constructing a [`TypeRegistry`].
///
/// Register models and transforms, then call [`build()`](Self::build) to produce an
/// immutable registry. No runtime registration is possible afterwards.
pub struct TypeRegistryBuilder {
    models: HashMap<String, ModelEntry>,
    transforms: HashMap<String, BoxedTransformFactory>,
}

impl TypeRegistryBuilder {
    /// Create a new empty registry builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            models: HashMap::new(),
            transforms: HashMap::new(),
        }
    }

    /// Register a model under [`MapTarget::TYPE_URL`].
    ///
    /// Registering the same URL twice keeps the last registration.
    #[must_use]
    pub fn model<T: MapTarget>(mut self) -> Self {
        self.models.insert(
            T::TYPE_URL.to_owned(),
            ModelEntry {
                allocate: Box::new(|context: Option<&dyn PersistenceContext>| {
                    T::allocate(context).map(|t| Box::new(t) as Box<dyn Mappable>)
                }),
                properties: T::PROPERTIES,
                configure: T::mapping_configuration,
            },
        );
        self
    }

    /// Register a transform with a type URL.
    ///
    /// At load time the registry deserializes the rule's config as `T::Config` and
    /// calls `T::from_config()`.
    #[must_use]
    pub fn transform<T: IntoTransform>(mut self, type_url: &str) -> Self {
        self.transforms.insert(
            type_url.to_owned(),
            Box::new(|value: &serde_json::Value| {
                let config: T::Config = serde_json::from_value(value.clone()).map_err(|e| {
                    MappingError::InvalidConfig {
                        reason: e.to_string(),
                    }
                })?;
                T::from_config(config)
            }),
        );
        self
    }

    /// Freeze the registry.
    #[must_use]
    pub fn build(self) -> TypeRegistry {
        TypeRegistry {
            models: self.models,
            transforms: self.transforms,
        }
    }
}

impl Default for TypeRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Register the built-in transforms from [`crate::transform`](crate::Stringify).
///
/// - `objmap.core.v1.Stringify` → [`Stringify`](crate::Stringify)
/// - `objmap.core.v1.ParseNumber` → [`ParseNumber`](crate::ParseNumber)
/// - `objmap.core.v1.Constant` → [`Constant`](crate::Constant)
/// - `objmap.core.v1.DefaultValue` → [`DefaultValue`](crate::DefaultValue)
#[must_use]
pub fn register_core_transforms(builder: TypeRegistryBuilder) -> TypeRegistryBuilder {
    use crate::{Constant, DefaultValue, ParseNumber, Stringify};
    builder
        .transform::<Stringify>("objmap.core.v1.Stringify")
        .transform::<ParseNumber>("objmap.core.v1.ParseNumber")
        .transform::<Constant>("objmap.core.v1.Constant")
        .transform::<DefaultValue>("objmap.core.v1.DefaultValue")
}

// ═══════════════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════════════

/// Immutable registry of models and transforms.
///
/// Constructed via [`TypeRegistryBuilder`]. `Send + Sync`: share one registry
/// across threads and build independent targets on each.
pub struct TypeRegistry {
    models: HashMap<String, ModelEntry>,
    transforms: HashMap<String, BoxedTransformFactory>,
}

impl TypeRegistry {
    /// Compile a deserialized [`MappingConfig`] into runtime rules.
    ///
    /// Rules are inserted in order, so a later rule for the same key path replaces
    /// an earlier one.
    ///
    /// # Errors
    ///
    /// - [`MappingError::TooManyRules`] — more than [`MAX_RULES`] rules
    /// - [`MappingError::UnknownTypeUrl`] — nested model or transform not registered
    /// - [`MappingError::InvalidConfig`] — empty key path or bad transform config
    pub fn load_configuration(
        &self,
        config: MappingConfig,
    ) -> Result<MappingConfiguration, MappingError> {
        if config.rules.len() > MAX_RULES {
            return Err(MappingError::TooManyRules {
                count: config.rules.len(),
                max: MAX_RULES,
            });
        }
        let mut configuration = MappingConfiguration::new();
        for rule in config.rules {
            if rule.key_path().is_empty() {
                return Err(MappingError::InvalidConfig {
                    reason: "rule key_path must not be empty".into(),
                });
            }
            match rule {
                RuleConfig::Rename { key_path, property } => {
                    configuration.set_rename_rule(&key_path, &property);
                }
                RuleConfig::Nested {
                    key_path,
                    property,
                    type_url,
                } => {
                    self.require_model(&type_url)?;
                    configuration.set_nested_type_rule(&key_path, &property, &type_url);
                }
                RuleConfig::Transform {
                    key_path,
                    property,
                    transform,
                } => {
                    let transform = self.resolve_transform(&transform)?;
                    configuration.insert(
                        &key_path,
                        MappingRule::Block {
                            property,
                            transform,
                        },
                    );
                }
            }
        }
        Ok(configuration)
    }

    /// Returns the number of registered models.
    #[must_use]
    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    /// Returns the number of registered transforms.
    #[must_use]
    pub fn transform_count(&self) -> usize {
        self.transforms.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty() && self.transforms.is_empty()
    }

    /// Returns `true` if the given transform type URL is registered.
    #[must_use]
    pub fn contains_transform(&self, type_url: &str) -> bool {
        self.transforms.contains_key(type_url)
    }

    /// Returns all registered transform type URLs (sorted).
    #[must_use]
    pub fn transform_type_urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = self.transforms.keys().map(String::as_str).collect();
        urls.sort_unstable();
        urls
    }

    fn require_model(&self, type_url: &str) -> Result<&ModelEntry, MappingError> {
        self.models
            .get(type_url)
            .ok_or_else(|| MappingError::UnknownTypeUrl {
                type_url: type_url.to_owned(),
                registry: "model",
                available: self.models.keys().cloned().collect(),
            })
    }

    fn resolve_transform(&self, config: &TypedConfig) -> Result<Arc<TransformFn>, MappingError> {
        let factory =
            self.transforms
                .get(&config.type_url)
                .ok_or_else(|| MappingError::UnknownTypeUrl {
                    type_url: config.type_url.clone(),
                    registry: "transform",
                    available: self.transforms.keys().cloned().collect(),
                })?;
        factory(&config.config)
    }
}

impl InstanceFactory for TypeRegistry {
    fn create(
        &self,
        type_url: &str,
        context: Option<&dyn PersistenceContext>,
    ) -> Result<Box<dyn Mappable>, MappingError> {
        let entry = self.require_model(type_url)?;
        (entry.allocate)(context)
    }
}

impl TypeIntrospection for TypeRegistry {
    fn properties_of(&self, type_url: &str) -> Option<&'static [PropertyDescriptor]> {
        self.models.get(type_url).map(|e| e.properties)
    }

    fn mapping_configuration_of(&self, type_url: &str) -> Option<MappingConfiguration> {
        self.models.get(type_url).map(|e| (e.configure)())
    }

    fn type_urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = self.models.keys().map(String::as_str).collect();
        urls.sort_unstable();
        urls
    }
}
