use std::{borrow::Cow, sync::Arc};

use parking_lot::RwLock;

use crate::{
    accessor::{Accessor, Stored, WriteAccessor},
    utils::error::{PropResult, ValidationError},
};

/// The mutating capability over a shared property.
///
/// There is exactly one writer per property. It can mint any number of [`Reader`]s, which
/// observe every accepted write but cannot perform one.
pub struct Writer<T> {
    name: Cow<'static, str>,
    inner: Arc<RwLock<Stored<T>>>,
}

/// The observing capability over a shared property.
///
/// ```rust
/// use propcell::{Accessor, WriteAccessor, accessor::Stored};
///
/// let (mut writer, reader) = Stored::new("status", String::from("idle")).into_shared();
/// writer.write(String::from("busy")).unwrap();
/// assert_eq!(reader.read().as_deref(), Ok("busy"));
/// ```
///
/// ```compile_fail
/// use propcell::{WriteAccessor, accessor::Stored};
///
/// let (_writer, mut reader) = Stored::new("status", String::from("idle")).into_shared();
/// reader.write(String::from("busy"));
/// ```
pub struct Reader<T> {
    name: Cow<'static, str>,
    inner: Arc<RwLock<Stored<T>>>,
}

impl<T> Clone for Reader<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone> Stored<T> {
    /// Moves the property behind a lock and splits it into its two capabilities.
    pub fn into_shared(self) -> (Writer<T>, Reader<T>) {
        let name: Cow<'static, str> = Cow::Owned(self.name().to_owned());
        let inner = Arc::new(RwLock::new(self));
        let reader = Reader {
            name: name.clone(),
            inner: Arc::clone(&inner),
        };
        (Writer { name, inner }, reader)
    }
}

impl<T> Writer<T> {
    pub fn reader(&self) -> Reader<T> {
        Reader {
            name: self.name.clone(),
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone> Accessor for Writer<T> {
    type Value = T;

    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> PropResult<T> {
        self.inner.read().read()
    }
}

impl<T: Clone> WriteAccessor for Writer<T> {
    fn write(&mut self, value: T) -> Result<(), ValidationError<T>> {
        self.inner.write().write(value)
    }
}

impl<T: Clone> Accessor for Reader<T> {
    type Value = T;

    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> PropResult<T> {
        self.inner.read().read()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn readers_observe_writes_from_another_thread() {
        let (mut writer, reader) = Stored::new("counter", 0_u64).into_shared();
        let second = writer.reader();

        let handle = thread::spawn(move || {
            for i in 1..=100 {
                writer.write(i).unwrap();
            }
            writer
        });
        let writer = handle.join().unwrap();

        assert_eq!(reader.read(), Ok(100));
        assert_eq!(second.read(), Ok(100));
        assert_eq!(writer.name(), "counter");
    }
}
