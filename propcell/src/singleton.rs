//! Process-wide singleton slots.
//!
//! A singleton is nothing more than a [`Lazy`] stored in a `static`: the first access from any
//! thread runs the initializer and every later access, from any thread, gets the same
//! `&'static` instance.

use crate::lazy::Lazy;

/// Types with exactly one process-wide instance, created on first access.
///
/// Implement it with [`impl_singleton!`](crate::impl_singleton).
pub trait Singleton: Sized + Send + Sync + 'static {
    /// The static slot holding the instance.
    fn slot() -> &'static Lazy<Self>;

    fn instance() -> &'static Self {
        Self::slot().force()
    }

    /// Whether the instance has been created yet. Never creates it.
    fn is_materialized() -> bool {
        Self::slot().is_ready()
    }
}

/// Declares a `static` [`Lazy`](crate::lazy::Lazy) slot initialized on first access.
///
/// ```rust
/// propcell::singleton! {
///     /// Shared lookup table.
///     pub static SQUARES: Vec<u64> = (0..16).map(|i| i * i).collect();
/// }
///
/// assert_eq!(SQUARES[4], 16);
/// ```
#[macro_export]
macro_rules! singleton {
    (
        $(#[$meta:meta])*
        $vis:vis static $name:ident : $ty:ty = $init:expr ;
    ) => {
        $(#[$meta])*
        $vis static $name: $crate::lazy::Lazy<$ty> =
            $crate::lazy::Lazy::named(stringify!($name), || Ok($init));
    };
}

/// Implements [`Singleton`](crate::singleton::Singleton) for a type, with `$init` building the
/// one instance.
///
/// ```rust
/// use propcell::Singleton;
///
/// pub struct Registry {
///     pub name: &'static str,
/// }
///
/// propcell::impl_singleton!(Registry => Registry { name: "main" });
///
/// assert_eq!(Registry::instance().name, "main");
/// assert!(std::ptr::eq(Registry::instance(), Registry::instance()));
/// ```
#[macro_export]
macro_rules! impl_singleton {
    ($ty:ty => $init:expr) => {
        impl $crate::singleton::Singleton for $ty {
            fn slot() -> &'static $crate::lazy::Lazy<$ty> {
                static SLOT: $crate::lazy::Lazy<$ty> =
                    $crate::lazy::Lazy::named(stringify!($ty), || Ok($init));
                &SLOT
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        thread,
    };

    use super::*;

    static CREATED: AtomicUsize = AtomicUsize::new(0);

    struct Clock {
        ticks_per_second: u32,
    }

    impl Clock {
        fn new() -> Self {
            CREATED.fetch_add(1, Ordering::SeqCst);
            Self {
                ticks_per_second: 60,
            }
        }
    }

    crate::impl_singleton!(Clock => Clock::new());

    #[test]
    fn instance_is_created_once_across_threads() {
        let addresses: Vec<usize> = (0..8)
            .map(|_| thread::spawn(|| Clock::instance() as *const Clock as usize))
            .collect::<Vec<_>>()
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        assert!(Clock::is_materialized());
        assert!(addresses.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(CREATED.load(Ordering::SeqCst), 1);
        assert_eq!(Clock::instance().ticks_per_second, 60);
    }

    crate::singleton! {
        static BANNER: String = format!("{}-{}", "prop", "cell");
    }

    #[test]
    fn singleton_macro_declares_named_slot() {
        assert_eq!(BANNER.name(), "BANNER");
        assert_eq!(BANNER.as_str(), "prop-cell");
    }
}
