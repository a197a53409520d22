//! Read/write surfaces in front of stored, computed and lazily materialized values.
//!
//! Whether a property owns storage is decided when it is declared:
//!
//! - [`Stored`] owns a [`BackingCell`](crate::cell::BackingCell) and is the only accessor that
//!   can be written to.
//! - [`Computed`], [`TryComputed`] and [`Mapped`] have no storage and recompute on every
//!   read.
//! - [`LazyAccessor`] reads through a [`Lazy`] materializer.
//! - [`Fixed`] is a stored value declared immutable.
//!
//! Write access is a capability expressed in types: only [`WriteAccessor`] implementors
//! expose `write`, and [`ReadOnly`] strips it from anything it wraps.

use std::{borrow::Cow, convert::Infallible, fmt::Display};

use crate::{
    lazy::Lazy,
    utils::error::{PropError, PropResult, ValidationError},
};

pub mod rules;
pub mod shared;
pub mod stored;

pub use rules::Rule;
pub use shared::{Reader, Writer};
pub use stored::Stored;

/// Read side of a property.
pub trait Accessor {
    type Value;

    /// Name used in logs and errors.
    fn name(&self) -> &str;

    fn read(&self) -> PropResult<Self::Value>;

    /// Derives a computed accessor that applies `f` to every read of `self`.
    fn map<U, G>(self, f: G) -> Mapped<Self, G>
    where
        Self: Sized,
        G: Fn(Self::Value) -> U,
    {
        Mapped { inner: self, f }
    }
}

/// Write side of a property.
///
/// A write either passes every validation rule and is stored, or leaves the property exactly
/// as it was and hands the rejected value back inside the error.
pub trait WriteAccessor: Accessor {
    fn write(&mut self, value: Self::Value) -> Result<(), ValidationError<Self::Value>>;
}

impl<A: Accessor + ?Sized> Accessor for &A {
    type Value = A::Value;

    fn name(&self) -> &str {
        (**self).name()
    }

    fn read(&self) -> PropResult<Self::Value> {
        (**self).read()
    }
}

/// A property without storage, recomputed from its closure on every read.
///
/// Two consecutive reads may disagree if whatever the closure looks at changed in between.
pub struct Computed<F> {
    name: Cow<'static, str>,
    compute: F,
}

impl<T, F: Fn() -> T> Computed<F> {
    pub fn new(name: impl Into<Cow<'static, str>>, compute: F) -> Self {
        Self {
            name: name.into(),
            compute,
        }
    }
}

impl<T, F: Fn() -> T> Accessor for Computed<F> {
    type Value = T;

    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> PropResult<T> {
        Ok((self.compute)())
    }
}

/// A [`Computed`] whose expression reads other properties and may fail doing so.
///
/// The first failing read is returned as is, nothing is substituted for it.
pub struct TryComputed<F> {
    name: Cow<'static, str>,
    compute: F,
}

impl<T, F: Fn() -> PropResult<T>> TryComputed<F> {
    pub fn new(name: impl Into<Cow<'static, str>>, compute: F) -> Self {
        Self {
            name: name.into(),
            compute,
        }
    }
}

impl<T, F: Fn() -> PropResult<T>> Accessor for TryComputed<F> {
    type Value = T;

    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> PropResult<T> {
        (self.compute)()
    }
}

/// Computed accessor derived from another accessor, see [`Accessor::map`].
pub struct Mapped<A, G> {
    inner: A,
    f: G,
}

impl<A, G, U> Accessor for Mapped<A, G>
where
    A: Accessor,
    G: Fn(A::Value) -> U,
{
    type Value = U;

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn read(&self) -> PropResult<U> {
        self.inner.read().map(&self.f)
    }
}

/// Exposes only the read side of the wrapped accessor.
///
/// An owning entity keeps its [`Stored`] private and hands this out, so code outside the
/// entity can observe the property but has no way to name a write on it.
///
/// ```rust
/// use propcell::{Accessor, accessor::{ReadOnly, Stored}};
///
/// let stored = Stored::new("level", 3_u8);
/// assert_eq!(ReadOnly::new(&stored).read(), Ok(3));
/// ```
///
/// ```compile_fail
/// use propcell::{WriteAccessor, accessor::{ReadOnly, Stored}};
///
/// let stored = Stored::new("level", 3_u8);
/// let mut view = ReadOnly::new(&stored);
/// view.write(4);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ReadOnly<A>(A);

impl<A: Accessor> ReadOnly<A> {
    pub fn new(inner: A) -> Self {
        Self(inner)
    }
}

impl<A: Accessor> Accessor for ReadOnly<A> {
    type Value = A::Value;

    fn name(&self) -> &str {
        self.0.name()
    }

    fn read(&self) -> PropResult<A::Value> {
        self.0.read()
    }
}

/// Read-only view over a [`Lazy`]. Every read returns the same materialized instance.
pub struct LazyAccessor<'a, T, E, F> {
    lazy: &'a Lazy<T, E, F>,
}

impl<T, E, F> Lazy<T, E, F> {
    pub fn accessor(&self) -> LazyAccessor<'_, T, E, F> {
        LazyAccessor { lazy: self }
    }
}

impl<'a, T, E, F> Accessor for LazyAccessor<'a, T, E, F>
where
    E: Display,
    F: FnMut() -> Result<T, E>,
{
    type Value = &'a T;

    fn name(&self) -> &str {
        self.lazy.name()
    }

    fn read(&self) -> PropResult<&'a T> {
        self.lazy.value().map_err(PropError::from)
    }
}

pub(crate) type DefaultFn<T> = Box<dyn FnMut() -> Result<T, Infallible> + Send>;
pub(crate) type ReadHook<T> = Box<dyn Fn(&str, &T) + Send + Sync>;

/// A property whose value is fixed once declared.
///
/// The value is either given up front or produced on first read by a default producer.
///
/// ```rust
/// use propcell::{Accessor, accessor::Fixed};
///
/// let id = Fixed::new("id", 9_u64);
/// assert_eq!(id.read(), Ok(9));
/// ```
///
/// ```compile_fail
/// use propcell::{WriteAccessor, accessor::Fixed};
///
/// let mut id = Fixed::new("id", 9_u64);
/// id.write(10);
/// ```
pub struct Fixed<T> {
    name: Cow<'static, str>,
    value: Lazy<T, Infallible, DefaultFn<T>>,
    read_hooks: Vec<ReadHook<T>>,
}

impl<T> Fixed<T> {
    pub fn new(name: impl Into<Cow<'static, str>>, value: T) -> Self {
        let name = name.into();
        Self {
            value: Lazy::with_value(static_name(&name), value),
            name,
            read_hooks: Vec::new(),
        }
    }

    pub(crate) fn from_parts(
        name: Cow<'static, str>,
        value: Lazy<T, Infallible, DefaultFn<T>>,
        read_hooks: Vec<ReadHook<T>>,
    ) -> Self {
        Self {
            name,
            value,
            read_hooks,
        }
    }

    /// Borrowing read, no clone.
    pub fn get(&self) -> &T {
        let value = self.value.force();
        for hook in &self.read_hooks {
            hook(&self.name, value);
        }
        value
    }
}

impl<T: Clone> Accessor for Fixed<T> {
    type Value = T;

    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> PropResult<T> {
        Ok(self.get().clone())
    }
}

/// Materializer names are `'static`; owned property names fall back to a placeholder.
pub(crate) fn static_name(name: &Cow<'static, str>) -> &'static str {
    match name {
        Cow::Borrowed(name) => *name,
        Cow::Owned(_) => "<property>",
    }
}
