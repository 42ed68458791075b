//! Built-in transforms for block rules.
//!
//! Each transform is a plain struct with an `apply` method, usable directly in
//! [`MappingConfiguration::set_block_rule`](crate::MappingConfiguration::set_block_rule),
//! and an [`IntoTransform`] impl so configs can name it by type URL.
//!
//! | Type URL | Transform |
//! |----------|-----------|
//! | `objmap.core.v1.Stringify` | [`Stringify`] |
//! | `objmap.core.v1.ParseNumber` | [`ParseNumber`] |
//! | `objmap.core.v1.Constant` | [`Constant`] |
//! | `objmap.core.v1.DefaultValue` | [`DefaultValue`] |

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::{is_valid_value, IntoTransform, MappingError, TransformFn, Transformed, UnitConfig};

/// Renders numbers and booleans as strings. Everything else maps by default.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stringify;

impl Stringify {
    /// Apply the transform to a resolved value.
    #[must_use]
    pub fn apply(value: Option<&Value>) -> Transformed {
        match value {
            Some(Value::Number(n)) => Transformed::value(n.to_string()),
            Some(Value::Bool(b)) => Transformed::value(b.to_string()),
            _ => Transformed::ApplyDefault,
        }
    }
}

impl IntoTransform for Stringify {
    type Config = UnitConfig;

    fn from_config(_: UnitConfig) -> Result<Arc<TransformFn>, MappingError> {
        Ok(Arc::new(|_: &str, _: &str, value: Option<&Value>| {
            Self::apply(value)
        }))
    }
}

/// Parses numeric strings (`"300"`, `"2.5"`) into numbers.
///
/// Anything else goes to default mapping, where a numeric property's type check
/// skips non-numeric strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseNumber;

impl ParseNumber {
    /// Apply the transform to a resolved value.
    #[must_use]
    pub fn apply(value: Option<&Value>) -> Transformed {
        let Some(Value::String(s)) = value else {
            return Transformed::ApplyDefault;
        };
        let s = s.trim();
        if let Ok(i) = s.parse::<i64>() {
            return Transformed::value(i);
        }
        match s.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
            Some(n) => Transformed::value(Value::Number(n)),
            None => Transformed::ApplyDefault,
        }
    }
}

impl IntoTransform for ParseNumber {
    type Config = UnitConfig;

    fn from_config(_: UnitConfig) -> Result<Arc<TransformFn>, MappingError> {
        Ok(Arc::new(|_: &str, _: &str, value: Option<&Value>| {
            Self::apply(value)
        }))
    }
}

/// Always assigns a fixed value, whatever the payload holds.
#[derive(Debug, Clone, Deserialize)]
pub struct Constant {
    /// The value to assign.
    pub value: Value,
}

impl Constant {
    /// Apply the transform.
    #[must_use]
    pub fn apply(&self) -> Transformed {
        Transformed::value(self.value.clone())
    }
}

impl IntoTransform for Constant {
    type Config = Self;

    fn from_config(config: Self) -> Result<Arc<TransformFn>, MappingError> {
        Ok(Arc::new(move |_: &str, _: &str, _: Option<&Value>| {
            config.apply()
        }))
    }
}

/// Assigns a fallback when the payload value is absent or null; otherwise maps
/// by default.
#[derive(Debug, Clone, Deserialize)]
pub struct DefaultValue {
    /// The fallback value.
    pub value: Value,
}

impl DefaultValue {
    /// Apply the transform to a resolved value.
    #[must_use]
    pub fn apply(&self, value: Option<&Value>) -> Transformed {
        if is_valid_value(value) {
            Transformed::ApplyDefault
        } else {
            Transformed::value(self.value.clone())
        }
    }
}

impl IntoTransform for DefaultValue {
    type Config = Self;

    fn from_config(config: Self) -> Result<Arc<TransformFn>, MappingError> {
        if config.value.is_null() {
            return Err(MappingError::InvalidConfig {
                reason: "DefaultValue.value must not be null".into(),
            });
        }
        Ok(Arc::new(move |_: &str, _: &str, value: Option<&Value>| {
            config.apply(value)
        }))
    }
}
