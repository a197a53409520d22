use std::{
    cell::UnsafeCell,
    convert::Infallible,
    fmt,
    ops::Deref,
    sync::{
        Arc,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
};

use crossbeam::utils::Backoff;
use log::{debug, warn};
use parking_lot::Mutex;
use strum::FromRepr;

use crate::{cell::BackingCell, utils::error::ProducerFailure};

const STATE_UNINITIALIZED: usize = MaterializerState::Uninitialized as usize;
const STATE_COMPUTING: usize = MaterializerState::Computing as usize;
const STATE_READY: usize = MaterializerState::Ready as usize;

/// Lifecycle of a [`Lazy`]. Only moves forward, except that a failed or panicking producer
/// sends `Computing` back to `Uninitialized` so the next access retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr)]
#[repr(usize)]
pub enum MaterializerState {
    Uninitialized = 0,
    Computing = 1,
    Ready = 2,
}

/// Everything that may only be touched while holding the materializer lock.
struct Slot<E, F> {
    /// Released once the value is ready.
    producer: Option<F>,
    /// Most recent failure, tagged with its attempt number.
    last_failure: Option<(u64, Arc<E>)>,
}

/// Resets the state to `Uninitialized` unless the computation is explicitly finished.
///
/// Covers producers that unwind: without it the state would stay `Computing` forever.
struct ComputingGuard<'a> {
    state: &'a AtomicUsize,
    finished: bool,
}

impl<'a> ComputingGuard<'a> {
    fn enter(state: &'a AtomicUsize) -> Self {
        state.store(STATE_COMPUTING, Ordering::Release);
        Self {
            state,
            finished: false,
        }
    }

    fn finish(mut self, next: MaterializerState) {
        self.state.store(next as usize, Ordering::Release);
        self.finished = true;
    }
}

impl Drop for ComputingGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.state.store(STATE_UNINITIALIZED, Ordering::Release);
        }
    }
}

/// A compute-once cell over a fallible producer.
///
/// The producer runs under an exclusive lock and, once it succeeds, never again: every thread
/// that reads the value gets a reference to the very same instance. Readers of a ready value
/// pay a single acquire load. A failed attempt leaves the materializer uninitialized so a later
/// access may retry; the failure is reported to the thread that ran the producer and to every
/// thread that was waiting on that attempt.
///
/// A producer must not read the materializer it belongs to, this deadlocks.
///
/// ```rust
/// # use propcell::lazy::Lazy;
/// static GREETING: Lazy<String> = Lazy::named("greeting", || Ok("hello".to_string()));
///
/// assert_eq!(GREETING.force(), "hello");
/// assert!(std::ptr::eq(GREETING.force(), &*GREETING));
/// ```
pub struct Lazy<T, E = Infallible, F = fn() -> Result<T, E>> {
    name: &'static str,
    state: AtomicUsize,
    failures: AtomicU64,
    cell: UnsafeCell<BackingCell<T>>,
    slot: Mutex<Slot<E, F>>,
}

// SAFETY: the cell is only written while holding `slot` with the state set to `Computing`, and
// only read (through `&self`) once the state is `Ready`, after which it is never written again.
// Shared failures cross threads through `Arc<E>`, hence `E: Send + Sync`.
unsafe impl<T: Send + Sync, E: Send + Sync, F: Send> Sync for Lazy<T, E, F> {}

impl<T, E, F> Lazy<T, E, F> {
    pub const fn new(producer: F) -> Self {
        Self::named("<lazy>", producer)
    }

    /// Same as [`Lazy::new`] but with a name used in logs and errors.
    pub const fn named(name: &'static str, producer: F) -> Self {
        Self {
            name,
            state: AtomicUsize::new(STATE_UNINITIALIZED),
            failures: AtomicU64::new(0),
            cell: UnsafeCell::new(BackingCell::new()),
            slot: parking_lot::const_mutex(Slot {
                producer: Some(producer),
                last_failure: None,
            }),
        }
    }

    /// Creates a materializer that is ready from the start. No producer is ever run.
    pub const fn with_value(name: &'static str, value: T) -> Self {
        Self {
            name,
            state: AtomicUsize::new(STATE_READY),
            failures: AtomicU64::new(0),
            cell: UnsafeCell::new(BackingCell::with_value(value)),
            slot: parking_lot::const_mutex(Slot {
                producer: None,
                last_failure: None,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn state(&self) -> MaterializerState {
        MaterializerState::from_repr(self.state.load(Ordering::Acquire))
            .expect("materializer state only ever holds MaterializerState discriminants")
    }

    pub fn is_ready(&self) -> bool {
        self.state.load(Ordering::Acquire) == STATE_READY
    }

    /// Number of producer attempts that returned an error so far.
    pub fn failed_attempts(&self) -> u64 {
        self.failures.load(Ordering::Acquire)
    }

    /// Returns the value if it is ready. Never blocks and never runs the producer.
    pub fn get(&self) -> Option<&T> {
        if self.is_ready() {
            // SAFETY: the acquire load above synchronizes with the release store that
            // published `Ready`, after which the cell is never written through `&self`.
            Some(unsafe { self.get_unchecked() })
        } else {
            None
        }
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.cell.get_mut().get_mut()
    }

    pub fn into_inner(self) -> Option<T> {
        self.cell.into_inner().into_inner()
    }

    /// # Safety
    ///
    /// The state must have been observed as `Ready` with acquire ordering, or the caller must
    /// hold the slot lock after having stored the value itself.
    unsafe fn get_unchecked(&self) -> &T {
        debug_assert!(self.is_ready(), "get_unchecked called before the value was ready");
        // SAFETY: upheld by the caller.
        unsafe {
            (*self.cell.get())
                .get()
                .expect("cell is initialized once the materializer is ready")
        }
    }
}

impl<T, E, F> Lazy<T, E, F>
where
    F: FnMut() -> Result<T, E>,
{
    /// Returns the value, running the producer if nobody has successfully done so yet.
    ///
    /// Blocks while another thread is running the producer.
    pub fn value(&self) -> Result<&T, ProducerFailure<E>> {
        // Taken before looking at the state: any failure numbered above it comes from an
        // attempt that had not finished when we first looked, so we are one of its waiters.
        let seen_failures = self.failures.load(Ordering::Acquire);
        if let Some(value) = self.get() {
            return Ok(value);
        }
        self.materialize(seen_failures)
    }

    #[cold]
    fn materialize(&self, seen_failures: u64) -> Result<&T, ProducerFailure<E>> {
        // Short spin before parking: most producers in the wild are quick.
        let backoff = Backoff::new();
        while self.state.load(Ordering::Acquire) == STATE_COMPUTING && !backoff.is_completed() {
            backoff.snooze();
        }

        let mut slot = self.slot.lock();

        // Re-check, another thread may have completed while we were waiting for the lock.
        match self.state() {
            MaterializerState::Ready => {
                // SAFETY: `Ready` observed through an acquire load.
                return Ok(unsafe { self.get_unchecked() });
            }
            MaterializerState::Computing => {
                unreachable!("materializer left in Computing while its lock is free")
            }
            MaterializerState::Uninitialized => {}
        }

        if let Some((attempt, cause)) = &slot.last_failure {
            if *attempt > seen_failures {
                return Err(ProducerFailure {
                    property: self.name,
                    attempt: *attempt,
                    cause: Arc::clone(cause),
                });
            }
        }

        let guard = ComputingGuard::enter(&self.state);
        debug!("Materializing '{}'", self.name);
        let producer = slot
            .producer
            .as_mut()
            .expect("producer is only released once the value is ready");

        match producer() {
            Ok(value) => {
                // SAFETY: the state is `Computing` and we hold the slot lock, so no other
                // thread reads or writes the cell.
                unsafe { (*self.cell.get()).set(value) };
                slot.producer = None;
                slot.last_failure = None;
                guard.finish(MaterializerState::Ready);
                debug!("Materialized '{}'", self.name);

                // SAFETY: we stored the value ourselves and still hold the lock.
                Ok(unsafe { self.get_unchecked() })
            }
            Err(err) => {
                let attempt = self.failures.fetch_add(1, Ordering::AcqRel) + 1;
                let cause = Arc::new(err);
                slot.last_failure = Some((attempt, Arc::clone(&cause)));
                guard.finish(MaterializerState::Uninitialized);
                warn!(
                    "Producer for '{}' failed on attempt {}, the next access will retry",
                    self.name, attempt
                );

                Err(ProducerFailure {
                    property: self.name,
                    attempt,
                    cause,
                })
            }
        }
    }
}

impl<T, F> Lazy<T, Infallible, F>
where
    F: FnMut() -> Result<T, Infallible>,
{
    /// Infallible counterpart of [`Lazy::value`].
    pub fn force(&self) -> &T {
        match self.value() {
            Ok(value) => value,
            Err(failure) => match *failure.cause {},
        }
    }
}

impl<T, F> Deref for Lazy<T, Infallible, F>
where
    F: FnMut() -> Result<T, Infallible>,
{
    type Target = T;

    fn deref(&self) -> &T {
        self.force()
    }
}

impl<T: fmt::Debug, E, F> fmt::Debug for Lazy<T, E, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lazy")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("value", &self.get())
            .finish()
    }
}

/// Adapts an infallible closure into a producer, fixing the error type to [`Infallible`].
pub fn infallible<T>(mut f: impl FnMut() -> T) -> impl FnMut() -> Result<T, Infallible> {
    move || Ok(f())
}

#[cfg(test)]
mod tests {
    use std::panic::{self, AssertUnwindSafe};

    use super::*;

    #[test]
    fn starts_uninitialized_and_becomes_ready() {
        let lazy = Lazy::new(infallible(|| 7_u32));
        assert_eq!(lazy.state(), MaterializerState::Uninitialized);
        assert_eq!(lazy.get(), None);

        assert_eq!(*lazy.force(), 7);
        assert_eq!(lazy.state(), MaterializerState::Ready);
        assert_eq!(lazy.get(), Some(&7));
    }

    #[test]
    fn with_value_never_runs_a_producer() {
        let lazy: Lazy<&str> = Lazy::with_value("preset", "ready");
        assert!(lazy.is_ready());
        assert_eq!(*lazy, "ready");
        assert_eq!(lazy.name(), "preset");
    }

    #[test]
    fn failure_leaves_state_uninitialized() {
        let lazy: Lazy<u32, String, _> =
            Lazy::named("flaky", || Err::<u32, _>("not yet".to_string()));

        let err = lazy.value().unwrap_err();
        assert_eq!(err.attempt, 1);
        assert_eq!(err.property, "flaky");
        assert_eq!(*err.cause, "not yet");
        assert_eq!(lazy.state(), MaterializerState::Uninitialized);

        let err = lazy.value().unwrap_err();
        assert_eq!(err.attempt, 2);
        assert_eq!(lazy.failed_attempts(), 2);
    }

    #[test]
    fn waiter_that_looked_before_the_failure_gets_it_instead_of_retrying() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let lazy: Lazy<u32, String, _> = Lazy::named("late-waiter", move || {
            let call = counter.fetch_add(1, Ordering::SeqCst) + 1;
            if call == 1 {
                Err("first attempt failed".to_string())
            } else {
                Ok(5)
            }
        });

        // Snapshot as `value` takes it while another thread is still computing.
        let seen = lazy.failures.load(Ordering::Acquire);
        let leader = lazy.value().unwrap_err();

        // The failure counter was bumped before the state left `Computing`, the waiter must
        // still be handed that failure.
        let waiter = lazy.materialize(seen).unwrap_err();
        assert_eq!(waiter.attempt, leader.attempt);
        assert!(Arc::ptr_eq(&waiter.cause, &leader.cause));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(lazy.value().ok().copied(), Some(5));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn panicking_producer_can_be_retried() {
        let mut calls = 0;
        let lazy = Lazy::new(infallible(move || {
            calls += 1;
            if calls == 1 {
                panic!("first call explodes");
            }
            calls
        }));

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| *lazy.force()));
        assert!(outcome.is_err());
        assert_eq!(lazy.state(), MaterializerState::Uninitialized);

        assert_eq!(*lazy.force(), 2);
    }

    #[test]
    fn producer_is_released_after_success() {
        let token = Arc::new(());
        let captured = Arc::clone(&token);
        let lazy = Lazy::new(infallible(move || Arc::strong_count(&captured)));

        lazy.force();
        assert_eq!(Arc::strong_count(&token), 1);
    }

    #[test]
    fn into_inner_returns_materialized_value() {
        let lazy = Lazy::new(infallible(|| vec![1, 2, 3]));
        assert_eq!(Lazy::<i32, Infallible, _>::new(infallible(|| 0)).into_inner(), None);

        lazy.force();
        assert_eq!(lazy.into_inner(), Some(vec![1, 2, 3]));
    }
}
