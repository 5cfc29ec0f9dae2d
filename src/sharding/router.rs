use std::sync::Arc;

use crate::error::{KvsError, Result};
use crate::membership::directory::{Directory, NodeAddr, ShardId};

/// Deterministic key-to-shard assignment: sum of the key's byte values,
/// modulo the shard count, 1-based.
pub fn assign(key: &str, shard_count: u32) -> ShardId {
    let sum: u64 = key.bytes().map(u64::from).sum();
    (sum % u64::from(shard_count)) as u32 + 1
}

/// Routes keys to shards using the directory's live shard map.
///
/// Ownership is recomputed from the current shard count on every call, so a
/// key's owner changes whenever the count does.
#[derive(Clone)]
pub struct ShardRouter {
    directory: Arc<Directory>,
}

impl ShardRouter {
    pub fn new(directory: Arc<Directory>) -> Self {
        Self { directory }
    }

    pub async fn shard_of(&self, key: &str) -> Result<ShardId> {
        let count = self.directory.shard_count().await;
        if count == 0 {
            // Shard 0 is the "unassigned" sentinel; with no shards
            // configured, no key routes anywhere.
            return Err(KvsError::UnknownShard(0));
        }
        Ok(assign(key, count as u32))
    }

    pub async fn owns(&self, key: &str) -> Result<bool> {
        Ok(self.shard_of(key).await? == self.directory.curr_shard().await)
    }

    pub async fn representative(&self, shard: ShardId) -> Option<NodeAddr> {
        self.directory.representative(shard).await
    }
}
