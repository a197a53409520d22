use std::{borrow::Cow, convert::Infallible, fmt};

use log::{debug, trace, warn};

use crate::{
    accessor::{Accessor, DefaultFn, ReadHook, Rule, WriteAccessor, static_name},
    cell::BackingCell,
    lazy::Lazy,
    utils::error::{PropError, PropResult, ValidationError},
};

pub(crate) type Transform<T> = Box<dyn Fn(T) -> T + Send + Sync>;
pub(crate) type Observer<T> = Box<dyn Fn(Option<&T>, &T) + Send + Sync>;

/// A writable property backed by a [`BackingCell`].
///
/// Writes run the declared rules in order. The first rule that rejects the value aborts the
/// write and nothing is stored. Accepted values go through the optional transform, land in
/// the cell, and only then are change observers notified.
///
/// A property declared without an initial value or default producer is *late*: reading it
/// before the first write fails with [`PropError::UninitializedAccess`].
pub struct Stored<T> {
    name: Cow<'static, str>,
    cell: BackingCell<T>,
    default: Option<Lazy<T, Infallible, DefaultFn<T>>>,
    rules: Vec<Rule<T>>,
    transform: Option<Transform<T>>,
    observers: Vec<Observer<T>>,
    read_hooks: Vec<ReadHook<T>>,
}

impl<T> Stored<T> {
    /// A plain property holding `value`, with no rules or hooks.
    pub fn new(name: impl Into<Cow<'static, str>>, value: T) -> Self {
        Self::from_parts(
            name.into(),
            BackingCell::with_value(value),
            None,
            Vec::new(),
            None,
            Vec::new(),
            Vec::new(),
        )
    }

    /// A late property: must be written before it can be read.
    pub fn late(name: impl Into<Cow<'static, str>>) -> Self {
        Self::from_parts(
            name.into(),
            BackingCell::new(),
            None,
            Vec::new(),
            None,
            Vec::new(),
            Vec::new(),
        )
    }

    pub(crate) fn from_parts(
        name: Cow<'static, str>,
        cell: BackingCell<T>,
        default: Option<DefaultFn<T>>,
        rules: Vec<Rule<T>>,
        transform: Option<Transform<T>>,
        observers: Vec<Observer<T>>,
        read_hooks: Vec<ReadHook<T>>,
    ) -> Self {
        let default = default.map(|producer| Lazy::named(static_name(&name), producer));
        Self {
            name,
            cell,
            default,
            rules,
            transform,
            observers,
            read_hooks,
        }
    }

    /// Whether a read would succeed, either from a written value or a default producer.
    pub fn is_initialized(&self) -> bool {
        self.cell.is_initialized() || self.default.is_some()
    }

    /// Borrowing read. Runs read hooks, falls back to the default producer when unset.
    pub fn read_ref(&self) -> PropResult<&T> {
        let value = self
            .current()
            .ok_or_else(|| PropError::UninitializedAccess {
                property: self.name.clone(),
            })?;

        for hook in &self.read_hooks {
            hook(&self.name, value);
        }
        trace!("Read '{}'", self.name);
        Ok(value)
    }

    /// Validates and stores `value`, returning whatever the cell held before.
    pub fn replace(&mut self, value: T) -> Result<Option<T>, ValidationError<T>> {
        if let Err((rule, reason)) = self.check(&value) {
            warn!("Rejected write to '{}' by rule '{}': {}", self.name, rule, reason);
            return Err(ValidationError {
                property: self.name.clone(),
                rule,
                reason,
                value,
            });
        }

        let value = match &self.transform {
            Some(transform) => transform(value),
            None => value,
        };
        let previous = self.cell.set(value);

        if !self.observers.is_empty() {
            if let Some(new) = self.cell.get() {
                // A property that was never written reports its default as the old value, if read.
                let old = previous
                    .as_ref()
                    .or_else(|| self.default.as_ref().and_then(Lazy::get));
                for observer in &self.observers {
                    observer(old, new);
                }
            }
        }
        debug!("Wrote '{}'", self.name);

        Ok(previous)
    }

    /// The value reads currently observe, materializing the default if needed.
    fn current(&self) -> Option<&T> {
        match (self.cell.get(), &self.default) {
            (Some(value), _) => Some(value),
            (None, Some(default)) => Some(default.force()),
            (None, None) => None,
        }
    }

    fn check(&self, value: &T) -> Result<(), (Cow<'static, str>, Cow<'static, str>)> {
        // Without rules nothing needs the current value, leave the default unmaterialized.
        if self.rules.is_empty() {
            return Ok(());
        }
        let current = self.current();
        for rule in &self.rules {
            rule.check(value, current)
                .map_err(|reason| (rule.name().clone(), reason))?;
        }
        Ok(())
    }
}

impl<T: Clone> Accessor for Stored<T> {
    type Value = T;

    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> PropResult<T> {
        self.read_ref().cloned()
    }
}

impl<T: Clone> WriteAccessor for Stored<T> {
    fn write(&mut self, value: T) -> Result<(), ValidationError<T>> {
        self.replace(value).map(drop)
    }
}

impl<T: fmt::Debug> fmt::Debug for Stored<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stored")
            .field("name", &self.name)
            .field("value", &self.cell.get())
            .field("rules", &self.rules.len())
            .finish_non_exhaustive()
    }
}
