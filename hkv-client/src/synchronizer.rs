//! # Synchronizers
//!
//! Purpose: Decide when a dispatched command's reply is awaited and converted.
//! Blocking mode waits right away on the calling thread. Pipelined mode queues
//! the reply and resolves it when the pipeline is closed.
//!
//! ## Design Principles
//! 1. **Single Resolution Path**: Both modes go through [`resolve`], so waiting,
//!    error translation and conversion behave identically.
//! 2. **Errors Translated Once**: `DriverError` becomes
//!    `ClientError::DataAccess` here and nowhere else.
//! 3. **Program Order**: Queued entries resolve in registration order.
//! 4. **Never Wait Under the Lock**: The queue is taken out of the mutex
//!    before any entry is waited on.

use hkv_common::{ClientError, ClientResult};
use parking_lot::Mutex;

use crate::driver::{CommandFuture, DriverError};
use crate::reply::{Deferred, Reply};

/// Connection-scoped strategy that turns a pending reply into a result.
pub trait Synchronizer: Send + Sync {
    /// Resolves `future` and runs `converter` on the raw value, now or later.
    ///
    /// The converter runs at most once and never on a failed reply.
    fn invoke<I, T, C>(&self, future: CommandFuture<I>, converter: C) -> ClientResult<Reply<T>>
    where
        I: Send + 'static,
        T: Send + 'static,
        C: FnOnce(I) -> ClientResult<T> + Send + 'static;
}

/// Waits for every reply on the calling thread.
///
/// Must not be used from inside an async runtime worker.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockingSynchronizer;

impl Synchronizer for BlockingSynchronizer {
    fn invoke<I, T, C>(&self, future: CommandFuture<I>, converter: C) -> ClientResult<Reply<T>>
    where
        I: Send + 'static,
        T: Send + 'static,
        C: FnOnce(I) -> ClientResult<T> + Send + 'static,
    {
        resolve(future, converter).map(Reply::Ready)
    }
}

type PipelineJob = Box<dyn FnOnce() -> bool + Send>;

/// Blocking by default; queues replies while a pipeline is open.
#[derive(Default)]
pub struct PipeliningSynchronizer {
    queue: Mutex<Option<Vec<PipelineJob>>>,
}

impl PipeliningSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts queueing replies instead of waiting on them.
    pub fn open_pipeline(&self) -> ClientResult<()> {
        let mut queue = self.queue.lock();
        if queue.is_some() {
            return Err(ClientError::PipelineAlreadyOpen);
        }
        *queue = Some(Vec::new());
        tracing::debug!("pipeline opened");
        Ok(())
    }

    pub fn is_pipelined(&self) -> bool {
        self.queue.lock().is_some()
    }

    /// Resolves every queued reply in registration order.
    ///
    /// Returns the number of entries resolved. When any of them failed, every
    /// entry is still resolved and `ClientError::Pipeline` reports the count;
    /// each handle carries its own outcome. Closing without an open pipeline
    /// resolves nothing.
    pub fn close_pipeline(&self) -> ClientResult<usize> {
        let jobs = match self.queue.lock().take() {
            Some(jobs) => jobs,
            None => return Ok(0),
        };

        let total = jobs.len();
        let failed = jobs.into_iter().map(|job| job()).filter(|ok| !ok).count();
        tracing::debug!(total, failed, "pipeline closed");

        if failed > 0 {
            Err(ClientError::Pipeline { failed, total })
        } else {
            Ok(total)
        }
    }

    /// Drops every queued entry without waiting for it.
    ///
    /// Handles of dropped entries read `ClientError::PipelineDiscarded`.
    /// Commands already sent are not recalled.
    pub fn discard_pipeline(&self) -> usize {
        let jobs = self.queue.lock().take().unwrap_or_default();
        tracing::debug!(discarded = jobs.len(), "pipeline discarded");
        jobs.len()
    }
}

impl Synchronizer for PipeliningSynchronizer {
    fn invoke<I, T, C>(&self, future: CommandFuture<I>, converter: C) -> ClientResult<Reply<T>>
    where
        I: Send + 'static,
        T: Send + 'static,
        C: FnOnce(I) -> ClientResult<T> + Send + 'static,
    {
        {
            let mut queue = self.queue.lock();
            if let Some(jobs) = queue.as_mut() {
                let (completer, deferred) = Deferred::pending();
                jobs.push(Box::new(move || {
                    let result = resolve(future, converter);
                    let ok = result.is_ok();
                    if let Err(err) = &result {
                        tracing::warn!("pipelined command failed: {err}");
                    }
                    completer.complete(result);
                    ok
                }));
                return Ok(Reply::Queued(deferred));
            }
        }
        resolve(future, converter).map(Reply::Ready)
    }
}

/// Waits for `future` and converts the raw value.
pub(crate) fn resolve<I, T, C>(future: CommandFuture<I>, converter: C) -> ClientResult<T>
where
    C: FnOnce(I) -> ClientResult<T>,
{
    let raw = future.wait().map_err(translate)?;
    converter(raw)
}

/// Maps a driver-native failure onto the façade's data access error.
pub(crate) fn translate(err: DriverError) -> ClientError {
    ClientError::data_access(err)
}
