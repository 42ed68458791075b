//! objmap - key-path driven mapping of untyped payloads onto typed objects
//!
//! Converts decoded key-value data (`serde_json::Value` trees) into strongly-typed
//! object graphs, and applies the same rules to update objects that already exist.
//!
//! # Architecture
//!
//! - [`KeyPath`] — Dot-separated literal path into nested objects and arrays
//! - [`MappingConfiguration`] — Ordered rules keyed by source key path
//! - [`Mappable`] — Property surface of a target type (get, set, declared types)
//! - [`MapTarget`] — Static side of a target: type URL, allocation, configuration hook
//! - [`TypeRegistry`] — Default [`InstanceFactory`] + [`TypeIntrospection`]
//! - [`Mapper`] — The engine: precedence, implicit fallback, recursion, validation
//!
//! # Key Design Insights
//!
//! 1. **Fixed precedence per key path**: block > nested type > rename > implicit.
//!    Registration is last-write-wins, so each key path carries at most one rule.
//!
//! 2. **Stage, then commit**: every value is computed before any property is
//!    written. A property receives exactly one write or none, and a fatal error
//!    leaves the target untouched.
//!
//! 3. **Absent is not an error**: missing, null or implausible values are skipped.
//!    Only allocation-level problems (unknown type, failed allocation, runaway
//!    nesting) surface as [`MappingError`].
//!
//! # Example
//!
//! ```
//! use objmap::prelude::*;
//! use serde_json::{json, Value};
//! use std::any::Any;
//!
//! #[derive(Debug, Default)]
//! struct City { name: Option<String> }
//!
//! const CITY_PROPERTIES: &[PropertyDescriptor] =
//!     &[PropertyDescriptor::new("name", PropertyType::String)];
//!
//! impl Mappable for City {
//!     fn type_url(&self) -> &'static str { Self::TYPE_URL }
//!     fn properties(&self) -> &'static [PropertyDescriptor] { CITY_PROPERTIES }
//!     fn property(&self, key: &str) -> Option<Value> {
//!         match key {
//!             "name" => self.name.clone().map(Value::String),
//!             _ => None,
//!         }
//!     }
//!     fn set_property(&mut self, key: &str, value: MappedValue) -> Result<(), AssignError> {
//!         match key {
//!             "name" => self.name = Some(value.decode(key)?),
//!             _ => return Err(AssignError::unknown(key)),
//!         }
//!         Ok(())
//!     }
//!     fn as_any(&self) -> &dyn Any { self }
//!     fn as_any_mut(&mut self) -> &mut dyn Any { self }
//!     fn into_any(self: Box<Self>) -> Box<dyn Any> { self }
//! }
//!
//! impl MapTarget for City {
//!     const TYPE_URL: &'static str = "example.City";
//!     const PROPERTIES: &'static [PropertyDescriptor] = CITY_PROPERTIES;
//!     fn allocate(_: Option<&dyn PersistenceContext>) -> Result<Self, MappingError> {
//!         Ok(Self::default())
//!     }
//! }
//!
//! let registry = TypeRegistryBuilder::new().model::<City>().build();
//! let mapper = Mapper::new(&registry);
//!
//! let source = json!({ "name": "Berlin" });
//! let city: City = mapper.build(source.as_object().unwrap()).unwrap();
//! assert_eq!(city.name.as_deref(), Some("Berlin"));
//! ```

// ═══════════════════════════════════════════════════════════════════════════════
// Modules
// ═══════════════════════════════════════════════════════════════════════════════

mod config;
mod configuration;
mod engine;
mod key_path;
mod mappable;
mod registry;
mod trace;
mod transform;
mod value;

// ═══════════════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════════════

pub use config::{MappingConfig, RuleConfig, TypedConfig, UnitConfig};
pub use configuration::{CallbackFn, MappingConfiguration, MappingRule, TransformFn, Transformed};
pub use engine::Mapper;
pub use key_path::{resolve, KeyPath};
pub use mappable::{MapTarget, Mappable, PersistenceContext, PropertyDescriptor};
pub use registry::{
    register_core_transforms, InstanceFactory, IntoTransform, TypeIntrospection, TypeRegistry,
    TypeRegistryBuilder,
};
pub use trace::{PopulateTrace, RuleKind, SkipReason, StepOutcome, TraceStep};
pub use transform::{Constant, DefaultValue, ParseNumber, Stringify};
pub use value::{is_valid_value, MappedValue, PropertyType, SourceMap, SourceValue};

// ═══════════════════════════════════════════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════════════════════════════════════════

/// Prelude module for convenient imports.
///
/// ```
/// use objmap::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Errors
        AssignError,
        // Collaborators
        InstanceFactory,
        KeyPath,
        MapTarget,
        Mappable,
        MappedValue,
        // Engine
        Mapper,
        MappingConfiguration,
        MappingError,
        MappingRule,
        PersistenceContext,
        PopulateTrace,
        PropertyDescriptor,
        PropertyType,
        SourceMap,
        SourceValue,
        Transformed,
        TypeIntrospection,
        TypeRegistry,
        TypeRegistryBuilder,
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════════════════════════

/// Maximum nesting depth for recursive builds through nested-type rules.
///
/// Recursion depth tracks payload nesting. Deeper payloads fail with
/// [`MappingError::DepthExceeded`] instead of exhausting the stack.
pub const MAX_DEPTH: usize = 32;

/// Maximum number of rules in a single loaded [`MappingConfig`].
pub const MAX_RULES: usize = 1024;

// ═══════════════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Fatal errors from building or populating objects.
///
/// Missing or malformed payload values never produce these; they are skipped.
/// These errors mean the configuration or the collaborators are wrong.
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    /// A type URL was not found in the registry.
    #[error("unknown {registry} type URL \"{type_url}\"{}", list_available(.registry, .available))]
    UnknownTypeUrl {
        /// The unregistered type URL.
        type_url: String,
        /// Which registry was searched (`"model"` or `"transform"`).
        registry: &'static str,
        /// Type URLs that ARE registered (for self-correcting error messages).
        available: Vec<String>,
    },

    /// The instance factory could not allocate an instance.
    #[error("failed to allocate \"{type_url}\": {reason}")]
    Allocation {
        /// The type that failed to allocate.
        type_url: String,
        /// Why allocation failed.
        reason: String,
    },

    /// Nested builds exceed [`MAX_DEPTH`].
    #[error("nesting depth is {depth}, but maximum allowed is {max} — the payload nests too deeply")]
    DepthExceeded {
        /// Depth that was reached.
        depth: usize,
        /// Maximum allowed depth.
        max: usize,
    },

    /// A source that must be an object is something else.
    #[error("expected an object to build \"{type_url}\", found {found}")]
    NotAnObject {
        /// The type that was being built.
        type_url: String,
        /// JSON type name of the offending value.
        found: &'static str,
    },

    /// A built instance is not of the requested Rust type.
    #[error("instance registered as \"{type_url}\" is not a {expected}")]
    TypeMismatch {
        /// The type URL that was allocated.
        type_url: String,
        /// The Rust type that was requested.
        expected: &'static str,
    },

    /// A nested build under a key path failed.
    #[error("key path \"{key_path}\": {source}")]
    Nested {
        /// The key path whose nested-type rule failed.
        key_path: String,
        /// The underlying failure.
        source: Box<MappingError>,
    },

    /// One element of a batch failed.
    #[error("element {index}: {source}")]
    Element {
        /// Position of the failing element in the input.
        index: usize,
        /// The underlying failure.
        source: Box<MappingError>,
    },

    /// Mapping configuration deserialization or construction failed.
    #[error("invalid config: {reason}")]
    InvalidConfig {
        /// The underlying error message.
        reason: String,
    },

    /// Too many rules in a single loaded configuration.
    #[error("configuration has {count} rules, but maximum allowed is {max}")]
    TooManyRules {
        /// Actual rule count.
        count: usize,
        /// Maximum allowed.
        max: usize,
    },
}

fn list_available(registry: &str, available: &[String]) -> String {
    if available.is_empty() {
        format!(" — no {registry} types are registered")
    } else {
        let mut sorted = available.to_vec();
        sorted.sort_unstable();
        format!(" — registered: {}", sorted.join(", "))
    }
}

/// A setter refused a value.
///
/// The engine treats this as a skipped property, never as a failure of the
/// whole object.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssignError {
    /// The target has no property with this key.
    #[error("no property \"{key}\"")]
    UnknownProperty {
        /// The requested property key.
        key: String,
    },

    /// The value cannot be represented as the property's type.
    #[error("property \"{key}\" cannot hold the value: {reason}")]
    Incompatible {
        /// The property key.
        key: String,
        /// Why the conversion failed.
        reason: String,
    },
}

impl AssignError {
    /// Shorthand for [`AssignError::UnknownProperty`].
    #[must_use]
    pub fn unknown(key: &str) -> Self {
        Self::UnknownProperty {
            key: key.to_owned(),
        }
    }

    /// Shorthand for [`AssignError::Incompatible`].
    #[must_use]
    pub fn incompatible(key: &str, reason: impl Into<String>) -> Self {
        Self::Incompatible {
            key: key.to_owned(),
            reason: reason.into(),
        }
    }
}
