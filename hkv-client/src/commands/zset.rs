//! Sorted-set commands.

use hkv_common::ClientResult;

use crate::client::KVClient;
use crate::commands::{require_key, require_members};
use crate::driver::AsyncCommands;
use crate::reply::Reply;
use crate::synchronizer::Synchronizer;

/// Sorted-set command group, obtained from [`KVClient::zset`].
pub struct ZSetCommands<'a, D, S> {
    client: &'a KVClient<D, S>,
}

impl<'a, D, S> ZSetCommands<'a, D, S>
where
    D: AsyncCommands,
    S: Synchronizer,
{
    pub(crate) fn new(client: &'a KVClient<D, S>) -> Self {
        ZSetCommands { client }
    }

    /// Removes `members` from the sorted set at `key`.
    ///
    /// Returns the number of members that were present.
    pub fn z_rem<M: AsRef<[u8]>>(&self, key: &[u8], members: &[M]) -> ClientResult<Reply<i64>> {
        require_key(key)?;
        let members = require_members(members)?;
        self.client.invoke().just(|driver| driver.zrem(key, &members))
    }
}
