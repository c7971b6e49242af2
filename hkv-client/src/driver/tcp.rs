//! # TCP Driver
//!
//! Purpose: Execute RESP2 commands over one multiplexed TCP connection driven
//! by a private tokio runtime, so synchronous callers never need their own.
//!
//! ## Design Principles
//! 1. **Writer/Reader Split**: One task writes frames in submission order, one
//!    task reads replies; replies are matched to requests FIFO.
//! 2. **Register Before Write**: A reply slot is queued before its frame hits
//!    the socket, so a reply can never arrive for an unknown request.
//! 3. **Timeouts at the Boundary**: Each command may carry a timeout; expiry
//!    completes its handle with `DriverError::Timeout`.
//! 4. **Fail Everything on Loss**: When the connection breaks, every pending
//!    handle is completed with the failure and the connection is marked dead,
//!    so later commands fail instead of waiting for a reply that never comes.
//! 5. **Runtime Owned, Never Blocking on Drop**: Dropping the driver shuts its
//!    runtime down in the background, so it may be dropped from async code.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::runtime::{Handle, Runtime};
use tokio::sync::{mpsc, oneshot};

use crate::driver::{AsyncCommands, CommandArgs, CommandFuture, DriverError, DriverResult, ReplySender};
use crate::resp::{self, RespValue};

/// Connection settings for [`TcpDriver`].
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Server address, e.g. "127.0.0.1:6379".
    pub addr: String,
    /// Optional TCP connect timeout.
    pub connect_timeout: Option<Duration>,
    /// Optional per-command reply timeout.
    pub command_timeout: Option<Duration>,
    /// Initial capacity of the receive buffer.
    pub read_buffer_bytes: usize,
}

/// Reply slots awaiting a reply, plus the failure that ended the connection.
#[derive(Default)]
struct Pending {
    replies: VecDeque<ReplySender>,
    closed: Option<DriverError>,
}

impl Pending {
    /// Marks the connection dead and fails every waiting reply with `err`.
    fn close(&mut self, err: DriverError) {
        for reply in self.replies.drain(..) {
            let _ = reply.send(Err(err.clone()));
        }
        self.closed.get_or_insert(err);
    }
}

type PendingReplies = Arc<Mutex<Pending>>;

struct Request {
    frame: BytesMut,
    reply: ReplySender,
}

/// RESP2 driver over a single TCP connection.
///
/// The driver owns a small tokio runtime. It must be created outside of any
/// async context, but may be dropped anywhere.
pub struct TcpDriver {
    runtime: Option<Runtime>,
    handle: Handle,
    requests: mpsc::UnboundedSender<Request>,
    command_timeout: Option<Duration>,
    peer: SocketAddr,
}

impl TcpDriver {
    /// Connects to the configured address and starts the IO tasks.
    pub fn connect(config: &DriverConfig) -> DriverResult<Self> {
        let peer: SocketAddr = config
            .addr
            .parse()
            .map_err(|_| DriverError::Io(format!("invalid address {:?}", config.addr)))?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("hkv-driver")
            .enable_all()
            .build()?;

        let stream = runtime.block_on(open_stream(peer, config.connect_timeout))?;
        let (reader, writer) = stream.into_split();
        let pending: PendingReplies = Arc::new(Mutex::new(Pending::default()));
        let (requests, queue) = mpsc::unbounded_channel();

        runtime.spawn(write_loop(writer, queue, pending.clone()));
        runtime.spawn(read_loop(reader, pending, config.read_buffer_bytes.max(64)));

        tracing::debug!(%peer, "driver connected");
        Ok(TcpDriver {
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
            requests,
            command_timeout: config.command_timeout,
            peer,
        })
    }

    /// Address of the connected server.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Wraps `reply` so it fails with `Timeout` when no reply arrives in time.
    fn with_timeout(&self, reply: ReplySender, limit: Duration) -> ReplySender {
        let (inner, arrival) = oneshot::channel();
        self.handle.spawn(async move {
            let outcome = match tokio::time::timeout(limit, arrival).await {
                Ok(Ok(result)) => result,
                Ok(Err(_)) => Err(DriverError::Closed),
                Err(_) => Err(DriverError::Timeout(limit)),
            };
            let _ = reply.send(outcome);
        });
        inner
    }
}

impl Drop for TcpDriver {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl AsyncCommands for TcpDriver {
    fn dispatch(&self, command: CommandArgs) -> CommandFuture<RespValue> {
        tracing::trace!(peer = %self.peer, %command, "dispatch");
        let mut frame = BytesMut::new();
        resp::encode_command(command.parts(), &mut frame);

        let (reply, future) = CommandFuture::pending();
        let reply = match self.command_timeout {
            Some(limit) => self.with_timeout(reply, limit),
            None => reply,
        };

        // A closed queue drops the request, which resolves the future with
        // `DriverError::Closed`.
        if self.requests.send(Request { frame, reply }).is_err() {
            tracing::debug!(peer = %self.peer, "dispatch on closed connection");
        }
        future
    }
}

async fn open_stream(peer: SocketAddr, connect_timeout: Option<Duration>) -> DriverResult<TcpStream> {
    let stream = match connect_timeout {
        Some(limit) => tokio::time::timeout(limit, TcpStream::connect(peer))
            .await
            .map_err(|_| DriverError::Timeout(limit))??,
        None => TcpStream::connect(peer).await?,
    };
    // Disable Nagle to keep request latency low for small payloads.
    stream.set_nodelay(true)?;
    Ok(stream)
}

async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut queue: mpsc::UnboundedReceiver<Request>,
    pending: PendingReplies,
) {
    while let Some(request) = queue.recv().await {
        {
            let mut pending = pending.lock();
            if let Some(err) = &pending.closed {
                // Returning drops the queue, so later dispatches fail with
                // `DriverError::Closed` without reaching this loop.
                let _ = request.reply.send(Err(err.clone()));
                tracing::debug!("dropping request on closed connection");
                return;
            }
            pending.replies.push_back(request.reply);
        }
        if let Err(err) = writer.write_all(&request.frame).await {
            tracing::warn!("driver write failed: {err}");
            pending.lock().close(DriverError::from(err));
            return;
        }
    }
    let _ = writer.shutdown().await;
}

async fn read_loop(mut reader: OwnedReadHalf, pending: PendingReplies, buffer_bytes: usize) {
    let mut buffer = BytesMut::with_capacity(buffer_bytes);
    loop {
        loop {
            match resp::decode_reply(&mut buffer) {
                Ok(Some(value)) => {
                    let slot = pending.lock().replies.pop_front();
                    match slot {
                        Some(reply) => {
                            let _ = reply.send(resp::into_result(value));
                        }
                        None => tracing::warn!(kind = value.kind(), "reply without pending request"),
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!("driver read failed: {err}");
                    pending.lock().close(err);
                    return;
                }
            }
        }

        match reader.read_buf(&mut buffer).await {
            Ok(0) => {
                tracing::debug!("server closed connection");
                pending.lock().close(DriverError::Closed);
                return;
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!("driver read failed: {err}");
                pending.lock().close(DriverError::from(err));
                return;
            }
        }
    }
}
