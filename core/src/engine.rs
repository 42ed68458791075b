//! `Mapper` — the mapping engine.
//!
//! Populates a target from a source map and a [`MappingConfiguration`], and
//! builds fresh instances through an [`InstanceFactory`].
//!
//! # Resolution
//!
//! The working set is every configured key path (configuration order), followed
//! by every declared property that no rule is keyed by and no rule writes. Each
//! key path is handled by exactly one tier:
//!
//! | Tier | Source | Validation |
//! |------|--------|------------|
//! | block | transform output, or the raw value on [`Transformed::ApplyDefault`] | raw value only |
//! | nested | object → one instance, array of objects → instances | shape vs declared type |
//! | rename | value at the key path | yes |
//! | implicit | value under the property's own name | yes |
//! | callback | the callback assigns by itself, after commit | n/a |
//!
//! # Stage, then commit
//!
//! All values are computed before the target is touched. If two rules write the
//! same property, the later one wins and the earlier staged value is dropped.
//! A fatal error during staging returns before any write.

use std::fmt;

use serde_json::Value;

use crate::value::json_type_name;
use crate::{
    CallbackFn, InstanceFactory, KeyPath, MapTarget, Mappable, MappedValue, MappingConfiguration,
    MappingError, MappingRule, PersistenceContext, PopulateTrace, PropertyDescriptor,
    PropertyType, RuleKind, SkipReason, SourceMap, StepOutcome, TraceStep, Transformed,
    TypeIntrospection, TypeRegistry, MAX_DEPTH,
};

/// The mapping engine.
///
/// Holds a shared reference to its type catalog and nothing else, so it is
/// `Copy` and cheap to create per call site.
///
/// # Example
///
/// ```ignore
/// let mapper = Mapper::new(&registry);
/// let travel: TravelInfo = mapper.build(&source)?;
/// let travels: Vec<TravelInfo> = mapper.build_many(&batch)?;
/// ```
pub struct Mapper<'r, R: ?Sized = TypeRegistry> {
    registry: &'r R,
}

impl<R: ?Sized> Clone for Mapper<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: ?Sized> Copy for Mapper<'_, R> {}

impl<R: ?Sized> fmt::Debug for Mapper<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper").finish_non_exhaustive()
    }
}

/// Per-build state threaded through recursion.
#[derive(Clone, Copy)]
struct Frame<'c> {
    depth: usize,
    context: Option<&'c dyn PersistenceContext>,
}

impl<'c> Frame<'c> {
    fn root(context: Option<&'c dyn PersistenceContext>) -> Self {
        Self { depth: 0, context }
    }

    fn child(self) -> Self {
        Self {
            depth: self.depth + 1,
            context: self.context,
        }
    }
}

impl<'r, R> Mapper<'r, R>
where
    R: InstanceFactory + TypeIntrospection + ?Sized,
{
    /// Create a mapper over a type catalog.
    #[must_use]
    pub fn new(registry: &'r R) -> Self {
        Self { registry }
    }

    /// Populate an existing target.
    ///
    /// Properties outside the working set are never touched. Values that are
    /// absent, null, undeclared or implausible for the declared type are skipped.
    ///
    /// # Errors
    ///
    /// Nested builds can fail with [`MappingError::Nested`]: unknown nested type,
    /// allocation failure, or nesting beyond [`MAX_DEPTH`]. The target is left
    /// unchanged in that case.
    pub fn populate(
        &self,
        target: &mut dyn Mappable,
        source: &SourceMap,
        configuration: &MappingConfiguration,
    ) -> Result<(), MappingError> {
        self.populate_frame(target, source, configuration, Frame::root(None), None)
            .map(drop)
    }

    /// Populate an existing target and report what happened to each key path.
    ///
    /// The target ends up exactly as [`populate`](Self::populate) would leave it.
    ///
    /// # Errors
    ///
    /// Same as [`populate`](Self::populate).
    pub fn populate_with_trace(
        &self,
        target: &mut dyn Mappable,
        source: &SourceMap,
        configuration: &MappingConfiguration,
    ) -> Result<PopulateTrace, MappingError> {
        let steps = self.populate_frame(
            target,
            source,
            configuration,
            Frame::root(None),
            Some(Vec::new()),
        )?;
        Ok(PopulateTrace {
            type_url: target.type_url(),
            steps: steps.unwrap_or_default(),
        })
    }

    /// Allocate a `T` and populate it with `T`'s own configuration.
    ///
    /// # Errors
    ///
    /// [`MappingError::UnknownTypeUrl`] if `T` is not registered, plus everything
    /// [`populate`](Self::populate) can return.
    pub fn build<T: MapTarget>(&self, source: &SourceMap) -> Result<T, MappingError> {
        self.build_typed(source, &T::mapping_configuration(), None)
    }

    /// Allocate a `T` and populate it with an explicit configuration.
    ///
    /// Nested instances still use their own types' configurations.
    ///
    /// # Errors
    ///
    /// Same as [`build`](Self::build).
    pub fn build_with<T: MapTarget>(
        &self,
        source: &SourceMap,
        configuration: &MappingConfiguration,
    ) -> Result<T, MappingError> {
        self.build_typed(source, configuration, None)
    }

    /// Allocate a `T` bound to a persistence context and populate it.
    ///
    /// Nested instances are allocated in the same context.
    ///
    /// # Errors
    ///
    /// Same as [`build`](Self::build); allocators may also refuse the context.
    pub fn build_in_context<T: MapTarget>(
        &self,
        source: &SourceMap,
        context: &dyn PersistenceContext,
    ) -> Result<T, MappingError> {
        self.build_typed(source, &T::mapping_configuration(), Some(context))
    }

    /// Build one `T` per source, preserving order.
    ///
    /// `T`'s configuration hook is called once for the whole batch.
    ///
    /// # Errors
    ///
    /// The first failing element aborts the batch with [`MappingError::Element`].
    /// A source that is not an object fails with [`MappingError::NotAnObject`].
    pub fn build_many<T: MapTarget>(&self, sources: &[Value]) -> Result<Vec<T>, MappingError> {
        let configuration = T::mapping_configuration();
        sources
            .iter()
            .enumerate()
            .map(|(index, source)| {
                let result = match source.as_object() {
                    Some(map) => self.build_typed(map, &configuration, None),
                    None => Err(MappingError::NotAnObject {
                        type_url: T::TYPE_URL.to_owned(),
                        found: json_type_name(source),
                    }),
                };
                result.map_err(|e| MappingError::Element {
                    index,
                    source: Box::new(e),
                })
            })
            .collect()
    }

    /// Build an instance of a type known only by its URL.
    ///
    /// With `configuration = None` the type's own configuration is used.
    ///
    /// # Errors
    ///
    /// Same as [`build`](Self::build).
    pub fn build_type(
        &self,
        type_url: &str,
        source: &SourceMap,
        configuration: Option<&MappingConfiguration>,
    ) -> Result<Box<dyn Mappable>, MappingError> {
        self.build_node(type_url, source, configuration, Frame::root(None))
    }

    fn build_typed<T: MapTarget>(
        &self,
        source: &SourceMap,
        configuration: &MappingConfiguration,
        context: Option<&dyn PersistenceContext>,
    ) -> Result<T, MappingError> {
        let instance =
            self.build_node(T::TYPE_URL, source, Some(configuration), Frame::root(context))?;
        let type_url = instance.type_url();
        instance
            .into_any()
            .downcast::<T>()
            .map(|b| *b)
            .map_err(|_| MappingError::TypeMismatch {
                type_url: type_url.to_owned(),
                expected: std::any::type_name::<T>(),
            })
    }

    fn build_node(
        &self,
        type_url: &str,
        source: &SourceMap,
        configuration: Option<&MappingConfiguration>,
        frame: Frame<'_>,
    ) -> Result<Box<dyn Mappable>, MappingError> {
        if frame.depth > MAX_DEPTH {
            return Err(MappingError::DepthExceeded {
                depth: frame.depth,
                max: MAX_DEPTH,
            });
        }
        let mut instance = self.registry.create(type_url, frame.context)?;
        let own;
        let configuration = match configuration {
            Some(c) => c,
            None => {
                own = self
                    .registry
                    .mapping_configuration_of(type_url)
                    .unwrap_or_default();
                &own
            }
        };
        self.populate_frame(&mut *instance, source, configuration, frame, None)?;
        Ok(instance)
    }

    fn populate_frame(
        &self,
        target: &mut dyn Mappable,
        source: &SourceMap,
        configuration: &MappingConfiguration,
        frame: Frame<'_>,
        steps: Option<Vec<TraceStep>>,
    ) -> Result<Option<Vec<TraceStep>>, MappingError> {
        let properties = self
            .registry
            .properties_of(target.type_url())
            .unwrap_or_else(|| target.properties());
        let mut staging = Staging::new(properties, steps);

        for (key_path, rule) in configuration.iter() {
            let resolved = resolve_key_path(source, key_path);
            match rule {
                MappingRule::Block {
                    property,
                    transform,
                } => match transform(property, key_path, resolved) {
                    Transformed::Assign(value) => {
                        staging.stage(key_path, property, RuleKind::Block, value);
                    }
                    Transformed::ApplyDefault => {
                        staging.assign_direct(key_path, property, RuleKind::Block, resolved);
                    }
                },
                MappingRule::Nested { property, type_url } => {
                    self.stage_nested(&mut staging, key_path, property, type_url, resolved, frame)?;
                }
                MappingRule::Rename { property } => {
                    staging.assign_direct(key_path, property, RuleKind::Rename, resolved);
                }
                MappingRule::Callback { callback } => {
                    staging.defer(key_path, callback.as_ref(), resolved);
                }
            }
        }

        for descriptor in properties {
            let key = descriptor.key;
            if configuration.contains(key) || configuration.targets_property(key) {
                continue;
            }
            let resolved = resolve_key_path(source, key);
            staging.assign_direct(key, key, RuleKind::Implicit, resolved);
        }

        Ok(staging.commit(target))
    }

    fn stage_nested<'s>(
        &self,
        staging: &mut Staging<'s>,
        key_path: &'s str,
        property: &str,
        type_url: &str,
        resolved: Option<&'s Value>,
        frame: Frame<'_>,
    ) -> Result<(), MappingError> {
        const RULE: RuleKind = RuleKind::Nested;
        let nested = |e: MappingError| MappingError::Nested {
            key_path: key_path.to_owned(),
            source: Box::new(e),
        };

        if !self.registry.contains_type(type_url) {
            return Err(nested(MappingError::UnknownTypeUrl {
                type_url: type_url.to_owned(),
                registry: "model",
                available: self
                    .registry
                    .type_urls()
                    .into_iter()
                    .map(str::to_owned)
                    .collect(),
            }));
        }

        let value = match resolved {
            Some(Value::Null) | None => {
                let reason = if resolved.is_some() {
                    SkipReason::Null
                } else {
                    SkipReason::Absent
                };
                staging.skip(key_path, property, RULE, reason);
                return Ok(());
            }
            Some(value) => value,
        };
        let Some(declared) = staging.declared(property) else {
            staging.skip(key_path, property, RULE, SkipReason::UndeclaredProperty);
            return Ok(());
        };

        match value {
            Value::Object(map) if !matches!(declared, PropertyType::Objects(_)) => {
                tracing::debug!(key_path, type_url, depth = frame.depth + 1, "building nested object");
                let built = self
                    .build_node(type_url, map, None, frame.child())
                    .map_err(nested)?;
                staging.stage(key_path, property, RULE, MappedValue::Object(built));
            }
            Value::Array(items) if !matches!(declared, PropertyType::Object(_)) => {
                if let Some(element) = items.iter().find(|v| !v.is_object()) {
                    let reason = SkipReason::TypeMismatch {
                        expected: format!("objects<{type_url}>"),
                        found: json_type_name(element),
                    };
                    staging.skip(key_path, property, RULE, reason);
                    return Ok(());
                }
                tracing::debug!(
                    key_path,
                    type_url,
                    count = items.len(),
                    depth = frame.depth + 1,
                    "building nested objects"
                );
                let mut built = Vec::with_capacity(items.len());
                for (index, map) in items.iter().filter_map(Value::as_object).enumerate() {
                    let instance = self
                        .build_node(type_url, map, None, frame.child())
                        .map_err(|e| {
                            nested(MappingError::Element {
                                index,
                                source: Box::new(e),
                            })
                        })?;
                    built.push(instance);
                }
                staging.stage(key_path, property, RULE, MappedValue::Objects(built));
            }
            other => {
                let expected = if declared.is_nested() {
                    declared.to_string()
                } else {
                    format!("object<{type_url}>")
                };
                let reason = SkipReason::TypeMismatch {
                    expected,
                    found: json_type_name(other),
                };
                staging.skip(key_path, property, RULE, reason);
            }
        }
        Ok(())
    }
}

/// Malformed key paths resolve to nothing.
fn resolve_key_path<'v>(source: &'v SourceMap, key_path: &str) -> Option<&'v Value> {
    KeyPath::parse(key_path).and_then(|path| path.resolve_in(source))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Staging
// ═══════════════════════════════════════════════════════════════════════════════

struct PendingWrite {
    property: String,
    value: MappedValue,
    step: usize,
}

struct PendingCallback<'s> {
    key_path: &'s str,
    callback: &'s CallbackFn,
    resolved: Option<&'s Value>,
}

/// Values computed for one target, not yet written.
struct Staging<'s> {
    properties: &'static [PropertyDescriptor],
    writes: Vec<PendingWrite>,
    callbacks: Vec<PendingCallback<'s>>,
    steps: Option<Vec<TraceStep>>,
}

impl<'s> Staging<'s> {
    fn new(properties: &'static [PropertyDescriptor], steps: Option<Vec<TraceStep>>) -> Self {
        Self {
            properties,
            writes: Vec::new(),
            callbacks: Vec::new(),
            steps,
        }
    }

    fn declared(&self, property: &str) -> Option<PropertyType> {
        self.properties
            .iter()
            .find(|d| d.key == property)
            .map(|d| d.ty)
    }

    /// Validate a raw value against the declared type, then stage or skip it.
    fn assign_direct(
        &mut self,
        key_path: &str,
        property: &str,
        rule: RuleKind,
        resolved: Option<&Value>,
    ) {
        let reason = match resolved {
            None => SkipReason::Absent,
            Some(Value::Null) => SkipReason::Null,
            Some(value) => match self.declared(property) {
                None => SkipReason::UndeclaredProperty,
                Some(ty) if ty.accepts(value) => {
                    self.stage(key_path, property, rule, MappedValue::Value(value.clone()));
                    return;
                }
                Some(ty) => SkipReason::TypeMismatch {
                    expected: ty.to_string(),
                    found: json_type_name(value),
                },
            },
        };
        self.skip(key_path, property, rule, reason);
    }

    fn stage(&mut self, key_path: &str, property: &str, rule: RuleKind, value: MappedValue) {
        let outcome = match &value {
            MappedValue::Value(_) => StepOutcome::Assigned,
            MappedValue::Object(_) => StepOutcome::Built { count: 1 },
            MappedValue::Objects(objects) => StepOutcome::Built {
                count: objects.len(),
            },
        };
        let step = self.record(key_path, Some(property), rule, outcome);

        match self.writes.iter().position(|w| w.property == property) {
            Some(i) => {
                tracing::trace!(key_path, property, %rule, "replaces an earlier staged value");
                let shadowed = std::mem::replace(&mut self.writes[i].step, step);
                self.writes[i].value = value;
                self.set_outcome(shadowed, StepOutcome::Shadowed);
            }
            None => self.writes.push(PendingWrite {
                property: property.to_owned(),
                value,
                step,
            }),
        }
    }

    fn skip(&mut self, key_path: &str, property: &str, rule: RuleKind, reason: SkipReason) {
        tracing::trace!(key_path, property, %rule, ?reason, "skipped");
        self.record(key_path, Some(property), rule, StepOutcome::Skipped(reason));
    }

    fn defer(&mut self, key_path: &'s str, callback: &'s CallbackFn, resolved: Option<&'s Value>) {
        self.record(key_path, None, RuleKind::Callback, StepOutcome::Invoked);
        self.callbacks.push(PendingCallback {
            key_path,
            callback,
            resolved,
        });
    }

    fn record(
        &mut self,
        key_path: &str,
        property: Option<&str>,
        rule: RuleKind,
        outcome: StepOutcome,
    ) -> usize {
        let Some(steps) = self.steps.as_mut() else {
            return 0;
        };
        steps.push(TraceStep {
            key_path: key_path.to_owned(),
            property: property.map(str::to_owned),
            rule,
            outcome,
        });
        steps.len() - 1
    }

    fn set_outcome(&mut self, step: usize, outcome: StepOutcome) {
        if let Some(s) = self.steps.as_mut().and_then(|steps| steps.get_mut(step)) {
            s.outcome = outcome;
        }
    }

    /// Write staged values, then run callbacks.
    fn commit(mut self, target: &mut dyn Mappable) -> Option<Vec<TraceStep>> {
        for write in std::mem::take(&mut self.writes) {
            if let Err(e) = target.set_property(&write.property, write.value) {
                tracing::debug!(
                    type_url = target.type_url(),
                    property = %write.property,
                    error = %e,
                    "setter rejected value"
                );
                self.set_outcome(
                    write.step,
                    StepOutcome::Rejected {
                        reason: e.to_string(),
                    },
                );
            }
        }
        for pending in &self.callbacks {
            (pending.callback)(&mut *target, pending.key_path, pending.resolved);
        }
        self.steps
    }
}
