//! Future-like handle returned by driver dispatch.
//!
//! A `CommandFuture` pairs the receiving end of a reply channel with the
//! decoder that turns the raw RESP reply into the command's native type. It
//! can be awaited from async code or waited on from a plain thread.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::driver::{DriverError, DriverResult};
use crate::resp::RespValue;

/// Sending half used by drivers to complete a dispatched command.
pub type ReplySender = oneshot::Sender<DriverResult<RespValue>>;

type Decoder<T> = Box<dyn FnOnce(RespValue) -> DriverResult<T> + Send>;

/// Pending reply of one dispatched command.
#[must_use = "a dispatched command's reply is lost unless the future is resolved"]
pub struct CommandFuture<T> {
    reply: oneshot::Receiver<DriverResult<RespValue>>,
    decode: Option<Decoder<T>>,
}

impl CommandFuture<RespValue> {
    /// Creates a pending future and the sender that completes it.
    ///
    /// Dropping the sender without sending resolves the future with
    /// `DriverError::Closed`.
    pub fn pending() -> (ReplySender, Self) {
        let (tx, rx) = oneshot::channel();
        let decode: Decoder<RespValue> = Box::new(|raw| Ok(raw));
        let future = CommandFuture {
            reply: rx,
            decode: Some(decode),
        };
        (tx, future)
    }

    /// Creates an already completed future.
    pub fn ready(reply: DriverResult<RespValue>) -> Self {
        let (tx, future) = CommandFuture::pending();
        // The receiver is held by `future`, so the send cannot fail.
        let _ = tx.send(reply);
        future
    }
}

impl<T: 'static> CommandFuture<T> {
    /// Chains a decoding step that runs when the reply arrives.
    pub fn and_then<U, F>(mut self, f: F) -> CommandFuture<U>
    where
        F: FnOnce(T) -> DriverResult<U> + Send + 'static,
    {
        let decode: Decoder<U> = match self.decode.take() {
            Some(decode) => Box::new(move |raw| decode(raw).and_then(f)),
            None => Box::new(|_| Err(polled_after_completion())),
        };
        CommandFuture {
            reply: self.reply,
            decode: Some(decode),
        }
    }
}

impl<T> CommandFuture<T> {
    /// Blocks the current thread until the reply arrives and decodes it.
    ///
    /// # Panics
    /// Panics when called from within an asynchronous execution context; use
    /// `.await` there instead.
    pub fn wait(self) -> DriverResult<T> {
        let decode = match self.decode {
            Some(decode) => decode,
            None => return Err(polled_after_completion()),
        };
        let raw = self.reply.blocking_recv().map_err(|_| DriverError::Closed)??;
        decode(raw)
    }
}

impl<T> Future for CommandFuture<T> {
    type Output = DriverResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let received = match Pin::new(&mut self.reply).poll(cx) {
            Poll::Ready(received) => received,
            Poll::Pending => return Poll::Pending,
        };
        let decode = match self.decode.take() {
            Some(decode) => decode,
            None => return Poll::Ready(Err(polled_after_completion())),
        };
        let outcome = match received {
            Ok(Ok(raw)) => decode(raw),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(DriverError::Closed),
        };
        Poll::Ready(outcome)
    }
}

fn polled_after_completion() -> DriverError {
    DriverError::Protocol("command future resolved twice".into())
}
