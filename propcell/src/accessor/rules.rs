//! Validation rules for [`Stored`](super::Stored) properties.
//!
//! A rule sees the proposed value and the value currently visible to readers (`None` for a
//! late property that was never written). It may also look at anything its closure captures;
//! nothing is memoized between calls.

use std::{borrow::Cow, fmt::Display, ops::RangeInclusive};

type RuleFn<T> = dyn Fn(&T, Option<&T>) -> Result<(), Cow<'static, str>> + Send + Sync;

/// A named predicate gating writes.
pub struct Rule<T> {
    name: Cow<'static, str>,
    check: Box<RuleFn<T>>,
}

impl<T> Rule<T> {
    pub fn new<F>(name: impl Into<Cow<'static, str>>, check: F) -> Self
    where
        F: Fn(&T, Option<&T>) -> Result<(), Cow<'static, str>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Box::new(check),
        }
    }

    pub fn name(&self) -> &Cow<'static, str> {
        &self.name
    }

    /// Returns the rejection reason if `proposed` is not acceptable.
    pub fn check(&self, proposed: &T, current: Option<&T>) -> Result<(), Cow<'static, str>> {
        (self.check)(proposed, current)
    }
}

impl<T> std::fmt::Debug for Rule<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Rule").field(&self.name).finish()
    }
}

/// Rule from a plain predicate over the proposed value.
pub fn predicate<T, F>(
    name: impl Into<Cow<'static, str>>,
    reason: impl Into<Cow<'static, str>>,
    accept: F,
) -> Rule<T>
where
    T: 'static,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    let reason = reason.into();
    Rule::new(name, move |proposed, _| {
        if accept(proposed) {
            Ok(())
        } else {
            Err(reason.clone())
        }
    })
}

/// Rejects values that are not strictly greater than `T::default()`.
pub fn positive<T>() -> Rule<T>
where
    T: PartialOrd + Default + Display + 'static,
{
    Rule::new("positive", |proposed: &T, _| {
        if *proposed > T::default() {
            Ok(())
        } else {
            Err(format!("invalid value {proposed}, must be greater than {}", T::default()).into())
        }
    })
}

pub fn non_empty<T: AsRef<str> + 'static>() -> Rule<T> {
    Rule::new("non_empty", |proposed: &T, _| {
        if proposed.as_ref().trim().is_empty() {
            Err("must not be blank".into())
        } else {
            Ok(())
        }
    })
}

/// Rejects strings longer than `max` characters.
pub fn max_len<T: AsRef<str> + 'static>(max: usize) -> Rule<T> {
    Rule::new("max_len", move |proposed: &T, _| {
        let len = proposed.as_ref().chars().count();
        if len > max {
            Err(format!("length {len} exceeds {max}").into())
        } else {
            Ok(())
        }
    })
}

pub fn within<T>(range: RangeInclusive<T>) -> Rule<T>
where
    T: PartialOrd + Display + Send + Sync + 'static,
{
    Rule::new("within", move |proposed: &T, _| {
        if range.contains(proposed) {
            Ok(())
        } else {
            Err(format!(
                "{proposed} is outside {}..={}",
                range.start(),
                range.end()
            )
            .into())
        }
    })
}

/// Rejects values smaller than the current one.
pub fn not_decreasing<T>() -> Rule<T>
where
    T: PartialOrd + Display + 'static,
{
    Rule::new("not_decreasing", |proposed: &T, current: Option<&T>| match current {
        Some(current) if proposed < current => {
            Err(format!("{proposed} is lower than current value {current}").into())
        }
        _ => Ok(()),
    })
}

/// Lifts a rule over `T` to `Option<T>`. `None` is always accepted.
pub fn optional<T: 'static>(inner: Rule<T>) -> Rule<Option<T>> {
    let name = inner.name.clone();
    Rule::new(name, move |proposed: &Option<T>, current: Option<&Option<T>>| {
        match proposed {
            Some(proposed) => inner.check(proposed, current.and_then(Option::as_ref)),
            None => Ok(()),
        }
    })
}
