//! Population trace types for debugging mapping behavior.
//!
//! Use [`Mapper::populate_with_trace`](crate::Mapper::populate_with_trace) to see,
//! for every key path in the working set, which rule handled it and what
//! happened: assigned, skipped (and why), shadowed by a later rule, or refused by
//! the setter.
//!
//! # Example
//!
//! ```ignore
//! let trace = mapper.populate_with_trace(&mut travel, &source, &config)?;
//! for step in &trace.steps {
//!     println!("{} -> {:?}: {:?}", step.key_path, step.property, step.outcome);
//! }
//! ```

use std::fmt;

/// Which precedence tier handled a key path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// A block rule's transform.
    Block,
    /// A nested-type rule.
    Nested,
    /// A rename rule.
    Rename,
    /// A callback rule.
    Callback,
    /// No rule: same-name mapping.
    Implicit,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Block => "block",
            Self::Nested => "nested",
            Self::Rename => "rename",
            Self::Callback => "callback",
            Self::Implicit => "implicit",
        })
    }
}

/// Why a key path produced no write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Nothing at the key path (or the key path is malformed).
    Absent,
    /// The value is `null`.
    Null,
    /// The target does not declare the property.
    UndeclaredProperty,
    /// The value cannot be represented as the declared type.
    TypeMismatch {
        /// The declared type.
        expected: String,
        /// JSON type of the value.
        found: &'static str,
    },
}

/// What happened to one key path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// A plain value was written.
    Assigned,
    /// Nested instances were built and written.
    Built {
        /// Number of instances (1 for an object payload).
        count: usize,
    },
    /// No value was staged.
    Skipped(SkipReason),
    /// A value was staged, then replaced by a later rule writing the same property.
    Shadowed,
    /// The setter refused the staged value.
    Rejected {
        /// The setter's error message.
        reason: String,
    },
    /// A callback rule ran.
    Invoked,
}

impl StepOutcome {
    /// Returns `true` if the target property was written.
    #[must_use]
    pub fn wrote(&self) -> bool {
        matches!(self, Self::Assigned | Self::Built { .. })
    }
}

/// One key path's trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceStep {
    /// The source key path.
    pub key_path: String,
    /// The target property, if the rule is bound to one.
    pub property: Option<String>,
    /// The tier that handled this key path.
    pub rule: RuleKind,
    /// The result.
    pub outcome: StepOutcome,
}

/// Trace of one [`populate`](crate::Mapper::populate) call.
///
/// # INV: trace does not change the result
///
/// The target ends in exactly the state `populate()` would leave it in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulateTrace {
    /// Type URL of the populated target.
    pub type_url: &'static str,
    /// Steps in working-set order: configured key paths first, then implicit ones.
    pub steps: Vec<TraceStep>,
}

impl PopulateTrace {
    /// The step for a key path.
    #[must_use]
    pub fn step(&self, key_path: &str) -> Option<&TraceStep> {
        self.steps.iter().find(|s| s.key_path == key_path)
    }

    /// Properties that were written, in commit order.
    #[must_use]
    pub fn written(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| s.outcome.wrote())
            .filter_map(|s| s.property.as_deref())
            .collect()
    }
}
