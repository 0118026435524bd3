//! This module contains the [bounded_queue] submodule, a fixed-capacity queue
//! for handing values from one thread to another with backpressure.

pub mod bounded_queue;

use std::time::Duration;

use thiserror::Error;

/// Why a value couldn't be pushed into a [bounded_queue::BoundedQueue].
///
/// Every variant gives the rejected value back so the caller decides what
/// happens to it (see [PushError::into_inner]).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PushError<T> {
    #[error("The queue has been closed.")]
    Closed(T),
    #[error("The queue is full.")]
    Full(T),
    #[error("The queue stayed full for {}+ milliseconds.", timeout.as_millis())]
    Timeout { item: T, timeout: Duration },
}

impl<T> PushError<T> {
    /// Take back the value that couldn't be pushed.
    pub fn into_inner(self) -> T {
        match self {
            Self::Closed(item) | Self::Full(item) | Self::Timeout { item, .. } => item,
        }
    }

    /// Whether the push failed because the queue was closed (as opposed to the
    /// queue just being full).
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed(_))
    }
}

const THREAD_PANIC_MSG: &str = "Another thread panicked while holding a resource this one needs.";
