//! # Façade Replies
//!
//! Purpose: Represent the outcome of a façade call that may either be ready
//! now or filled in later when an open pipeline is closed.
//!
//! ## Design Principles
//! 1. **Explicit Two States**: `Reply::Ready` carries the value; a pipelined
//!    call hands back `Reply::Queued` instead of a placeholder value.
//! 2. **Single Writer**: Only the synchronizer holds the [`Completer`]; callers
//!    get a read-only [`Deferred`].
//! 3. **No Silent Loss**: A completer dropped without a result marks the slot
//!    as discarded, so readers see an error rather than waiting forever.
//! 4. **Early Reads Keep the Handle**: [`Deferred::try_take`] borrows, so
//!    polling before the flush leaves the handle readable afterwards.

use std::fmt;
use std::sync::Arc;

use hkv_common::{ClientError, ClientResult};
use parking_lot::Mutex;

/// Result of a façade call.
#[derive(Debug)]
pub enum Reply<T> {
    /// Resolved immediately.
    Ready(T),
    /// Registered under an open pipeline; filled on `close_pipeline`.
    Queued(Deferred<T>),
}

impl<T> Reply<T> {
    /// Returns true for an immediately resolved reply.
    pub fn is_ready(&self) -> bool {
        matches!(self, Reply::Ready(_))
    }

    /// Returns the value, reading the deferred slot if needed.
    ///
    /// A queued reply read before its pipeline was closed yields
    /// `ClientError::NotFlushed` and is consumed; poll through
    /// [`Reply::as_deferred`] to keep it.
    pub fn into_value(self) -> ClientResult<T> {
        match self {
            Reply::Ready(value) => Ok(value),
            Reply::Queued(deferred) => deferred.into_result(),
        }
    }

    /// Borrows the deferred handle of a queued reply.
    pub fn as_deferred(&self) -> Option<&Deferred<T>> {
        match self {
            Reply::Ready(_) => None,
            Reply::Queued(deferred) => Some(deferred),
        }
    }

    /// Returns the deferred handle of a queued reply.
    pub fn into_deferred(self) -> Option<Deferred<T>> {
        match self {
            Reply::Ready(_) => None,
            Reply::Queued(deferred) => Some(deferred),
        }
    }
}

enum Slot<T> {
    Pending,
    Resolved(ClientResult<T>),
    Taken,
    Discarded,
}

/// Read-only handle for a pipelined result.
pub struct Deferred<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T> Deferred<T> {
    /// Creates an unresolved handle and the completer that fills it.
    pub(crate) fn pending() -> (Completer<T>, Deferred<T>) {
        let slot = Arc::new(Mutex::new(Slot::Pending));
        (Completer { slot: slot.clone() }, Deferred { slot })
    }

    /// Returns true once the pipeline resolved this entry.
    pub fn is_resolved(&self) -> bool {
        matches!(*self.slot.lock(), Slot::Resolved(_) | Slot::Taken)
    }

    /// Takes the outcome without consuming the handle.
    ///
    /// Returns `None` while the pipeline is still open. Once an outcome has
    /// been taken, later reads yield `ClientError::ResultTaken`.
    pub fn try_take(&self) -> Option<ClientResult<T>> {
        let mut slot = self.slot.lock();
        match std::mem::replace(&mut *slot, Slot::Taken) {
            Slot::Resolved(result) => Some(result),
            Slot::Taken => Some(Err(ClientError::ResultTaken)),
            Slot::Pending => {
                *slot = Slot::Pending;
                None
            }
            Slot::Discarded => {
                *slot = Slot::Discarded;
                Some(Err(ClientError::PipelineDiscarded))
            }
        }
    }

    /// Takes the outcome, or `NotFlushed` while the pipeline is open.
    pub fn into_result(self) -> ClientResult<T> {
        self.try_take().unwrap_or(Err(ClientError::NotFlushed))
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match *self.slot.lock() {
            Slot::Pending => "pending",
            Slot::Resolved(Ok(_)) => "resolved",
            Slot::Resolved(Err(_)) => "failed",
            Slot::Taken => "taken",
            Slot::Discarded => "discarded",
        };
        f.debug_struct("Deferred").field("state", &state).finish()
    }
}

/// Write side of a [`Deferred`], held by the synchronizer.
pub(crate) struct Completer<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T> Completer<T> {
    pub(crate) fn complete(self, result: ClientResult<T>) {
        *self.slot.lock() = Slot::Resolved(result);
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        let mut slot = self.slot.lock();
        if matches!(*slot, Slot::Pending) {
            *slot = Slot::Discarded;
        }
    }
}
