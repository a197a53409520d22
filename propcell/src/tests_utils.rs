use std::{
    convert::Infallible,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

/// Producer that counts its invocations and sleeps for `delay` before answering, which
/// widens the window in which concurrent readers pile up on a computing materializer.
pub fn counting_producer<T: Clone>(
    calls: &Arc<AtomicUsize>,
    value: T,
    delay: Duration,
) -> impl FnMut() -> Result<T, Infallible> + Send + 'static
where
    T: Send + 'static,
{
    let calls = Arc::clone(calls);
    move || {
        calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(delay);
        Ok(value.clone())
    }
}

/// Producer that fails its first `failures` invocations, then succeeds with `value`.
pub fn flaky_producer<T: Clone>(
    calls: &Arc<AtomicUsize>,
    failures: usize,
    value: T,
    delay: Duration,
) -> impl FnMut() -> Result<T, String> + Send + 'static
where
    T: Send + 'static,
{
    let calls = Arc::clone(calls);
    move || {
        let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
        thread::sleep(delay);
        if call <= failures {
            Err(format!("attempt {call} failed"))
        } else {
            Ok(value.clone())
        }
    }
}
