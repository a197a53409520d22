use std::{borrow::Cow, convert::Infallible};

use log::debug;

use crate::{
    accessor::{
        DefaultFn, Fixed, ReadHook, Rule, Stored, static_name,
        stored::{Observer, Transform},
    },
    cell::BackingCell,
    lazy::Lazy,
    utils::error::{PropError, PropResult},
};

/// Where the first readable value of a property comes from.
enum Initial<T> {
    /// Must be written before it is read.
    Late,
    Value(T),
    /// Produced on first read, at most once.
    Default(DefaultFn<T>),
}

/// Construction-time description of a property.
///
/// A declaration ends in exactly one of [`PropertyDecl::mutable`], which yields a writable
/// [`Stored`], or [`PropertyDecl::read_only`], which yields a [`Fixed`]. Rules, transform and
/// change observers only matter for the former.
///
/// ```rust
/// # use propcell::{Accessor, PropertyDecl, WriteAccessor, accessor::rules};
/// let mut age = PropertyDecl::new("age")
///     .initial(30)
///     .rule(rules::positive())
///     .mutable();
///
/// assert!(age.write(-1).is_err());
/// assert_eq!(age.read(), Ok(30));
/// ```
pub struct PropertyDecl<T> {
    name: Cow<'static, str>,
    initial: Initial<T>,
    rules: Vec<Rule<T>>,
    transform: Option<Transform<T>>,
    observers: Vec<Observer<T>>,
    read_hooks: Vec<ReadHook<T>>,
}

impl<T> PropertyDecl<T> {
    /// Starts a late declaration with no rules or hooks.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            initial: Initial::Late,
            rules: Vec::new(),
            transform: None,
            observers: Vec::new(),
            read_hooks: Vec::new(),
        }
    }

    /// Initial value. Not run through the rules, exactly like a field initializer.
    pub fn initial(mut self, value: T) -> Self {
        self.initial = Initial::Value(value);
        self
    }

    /// Producer for the value seen before the first write.
    pub fn default_with<F>(mut self, mut producer: F) -> Self
    where
        F: FnMut() -> T + Send + 'static,
    {
        self.initial = Initial::Default(Box::new(move || Ok::<_, Infallible>(producer())));
        self
    }

    /// Appends a rule. Rules run in the order they were declared.
    pub fn rule(mut self, rule: Rule<T>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Shorthand for an ad-hoc [`Rule`].
    pub fn validate<F>(self, name: impl Into<Cow<'static, str>>, check: F) -> Self
    where
        F: Fn(&T, Option<&T>) -> Result<(), Cow<'static, str>> + Send + Sync + 'static,
    {
        self.rule(Rule::new(name, check))
    }

    /// Normalization applied to accepted values before they are stored.
    pub fn transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        self.transform = Some(Box::new(transform));
        self
    }

    /// Called with `(old, new)` after every successful write.
    pub fn on_change<F>(mut self, observer: F) -> Self
    where
        F: Fn(Option<&T>, &T) + Send + Sync + 'static,
    {
        self.observers.push(Box::new(observer));
        self
    }

    /// Called with `(name, value)` on every successful read.
    pub fn on_read<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &T) + Send + Sync + 'static,
    {
        self.read_hooks.push(Box::new(hook));
        self
    }

    pub fn mutable(self) -> Stored<T> {
        let (cell, default) = match self.initial {
            Initial::Late => (BackingCell::new(), None),
            Initial::Value(value) => (BackingCell::with_value(value), None),
            Initial::Default(producer) => (BackingCell::new(), Some(producer)),
        };
        Stored::from_parts(
            self.name,
            cell,
            default,
            self.rules,
            self.transform,
            self.observers,
            self.read_hooks,
        )
    }

    /// Fails for a late declaration: a read-only property could never be given a value.
    pub fn read_only(self) -> PropResult<Fixed<T>> {
        if !self.rules.is_empty() || self.transform.is_some() || !self.observers.is_empty() {
            debug!(
                "Property '{}' is read-only, its write-side configuration is ignored",
                self.name
            );
        }

        let lazy = match self.initial {
            Initial::Late => {
                return Err(PropError::UninitializedAccess {
                    property: self.name,
                });
            }
            Initial::Value(value) => Lazy::with_value(static_name(&self.name), value),
            Initial::Default(producer) => Lazy::named(static_name(&self.name), producer),
        };
        Ok(Fixed::from_parts(self.name, lazy, self.read_hooks))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::accessor::{Accessor, WriteAccessor, rules};

    #[test]
    fn declared_rules_and_transform_apply_in_order() {
        let mut name = PropertyDecl::new("name")
            .initial(String::from("Ada"))
            .rule(rules::non_empty())
            .validate("no_digits", |v: &String, _| {
                if v.chars().any(|c| c.is_ascii_digit()) {
                    Err("digits are not allowed".into())
                } else {
                    Ok(())
                }
            })
            .transform(|v| v.trim().to_string())
            .mutable();

        assert_eq!(name.write("R2D2".into()).unwrap_err().rule, "no_digits");
        name.write("  Grace ".into()).unwrap();
        assert_eq!(name.read().as_deref(), Ok("Grace"));
    }

    #[test]
    fn read_hooks_fire_on_each_read() {
        let reads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&reads);
        let age = PropertyDecl::new("age")
            .initial(29_u32)
            .on_read(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .mutable();

        age.read().unwrap();
        age.read().unwrap();
        assert_eq!(reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn change_observer_receives_old_and_new() {
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let mut level = PropertyDecl::new("level")
            .default_with(|| 1_u8)
            .on_change(move |old, new| sink.lock().push((old.copied(), *new)))
            .mutable();

        level.write(2).unwrap();
        level.write(3).unwrap();
        assert_eq!(*log.lock(), vec![(Some(1), 2), (Some(2), 3)]);
    }

    #[test]
    fn read_only_late_declaration_is_rejected() {
        let decl: PropertyDecl<u8> = PropertyDecl::new("id");
        assert!(matches!(
            decl.read_only(),
            Err(PropError::UninitializedAccess { .. })
        ));
    }

    #[test]
    fn read_only_default_is_computed_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let fixed = PropertyDecl::new("banner")
            .default_with(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                String::from("welcome")
            })
            .read_only()
            .unwrap();

        assert_eq!(fixed.read().as_deref(), Ok("welcome"));
        assert_eq!(fixed.read().as_deref(), Ok("welcome"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
