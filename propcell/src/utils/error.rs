use std::{borrow::Cow, fmt::Display, sync::Arc};

use thiserror::Error;

/// Value-erased error returned by accessor reads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropError {
    #[error("Property '{property}' was read before it was initialized")]
    UninitializedAccess { property: Cow<'static, str> },

    #[error("Producer for '{property}' failed on attempt {attempt}: {message}")]
    Producer {
        property: Cow<'static, str>,
        attempt: u64,
        message: String,
    },

    #[error("Write to '{property}' rejected by rule '{rule}': {reason}")]
    Validation {
        property: Cow<'static, str>,
        rule: Cow<'static, str>,
        reason: Cow<'static, str>,
    },
}

pub type PropResult<T> = Result<T, PropError>;

/// A rejected write.
///
/// Carries the value that was refused so the caller can correct and retry it. The property
/// the write targeted is left exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Write to '{property}' rejected by rule '{rule}': {reason}")]
pub struct ValidationError<T> {
    pub property: Cow<'static, str>,
    pub rule: Cow<'static, str>,
    pub reason: Cow<'static, str>,
    pub value: T,
}

impl<T> ValidationError<T> {
    pub fn into_value(self) -> T {
        self.value
    }
}

/// Failure raised by a lazy producer.
///
/// The cause is reference counted because the same failure is handed to the thread that ran
/// the producer and to every thread that was waiting on that attempt.
#[derive(Debug, Error)]
#[error("Producer for '{property}' failed on attempt {attempt}: {cause}")]
pub struct ProducerFailure<E> {
    pub property: &'static str,
    /// 1-based index of the failed attempt.
    pub attempt: u64,
    pub cause: Arc<E>,
}

impl<E> Clone for ProducerFailure<E> {
    fn clone(&self) -> Self {
        Self {
            property: self.property,
            attempt: self.attempt,
            cause: Arc::clone(&self.cause),
        }
    }
}

impl<T> From<ValidationError<T>> for PropError {
    fn from(err: ValidationError<T>) -> Self {
        PropError::Validation {
            property: err.property,
            rule: err.rule,
            reason: err.reason,
        }
    }
}

impl<E: Display> From<ProducerFailure<E>> for PropError {
    fn from(err: ProducerFailure<E>) -> Self {
        PropError::Producer {
            property: Cow::Borrowed(err.property),
            attempt: err.attempt,
            message: err.cause.to_string(),
        }
    }
}
