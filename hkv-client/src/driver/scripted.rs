//! In-memory driver that answers commands from a scripted reply queue.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::driver::{AsyncCommands, CommandArgs, CommandFuture, DriverError, DriverResult};
use crate::resp::{self, RespValue};

#[derive(Default)]
struct ScriptState {
    replies: VecDeque<DriverResult<RespValue>>,
    dispatched: Vec<CommandArgs>,
}

/// Driver double that records every dispatched command and completes it with
/// the next queued reply.
///
/// Error replies queued with [`reply`](ScriptedDriver::reply) are surfaced as
/// `DriverError::Server`, just like a real connection would.
#[derive(Default)]
pub struct ScriptedDriver {
    state: Mutex<ScriptState>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a reply for the next dispatched command.
    pub fn reply(&self, value: RespValue) -> &Self {
        self.state.lock().replies.push_back(Ok(value));
        self
    }

    /// Queues a transport failure for the next dispatched command.
    pub fn fail(&self, err: DriverError) -> &Self {
        self.state.lock().replies.push_back(Err(err));
        self
    }

    /// Commands dispatched so far, in order.
    pub fn dispatched(&self) -> Vec<CommandArgs> {
        self.state.lock().dispatched.clone()
    }

    pub fn dispatch_count(&self) -> usize {
        self.state.lock().dispatched.len()
    }
}

impl AsyncCommands for ScriptedDriver {
    fn dispatch(&self, command: CommandArgs) -> CommandFuture<RespValue> {
        let mut state = self.state.lock();
        tracing::trace!(%command, "scripted dispatch");
        state.dispatched.push(command);
        let reply = state
            .replies
            .pop_front()
            .unwrap_or_else(|| Err(DriverError::Protocol("no scripted reply left".into())));
        CommandFuture::ready(reply.and_then(resp::into_result))
    }
}
