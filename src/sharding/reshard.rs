use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::Value;

use crate::error::{KvsError, Result};
use crate::membership::directory::{Directory, ShardId, ShardMap};
use crate::replication::protocol::{
    ReshardApply, ViewMessage, ADOPT_TIMEOUT, ENDPOINT_SHARD, ENDPOINT_SNAPSHOT_STORE,
    FORWARD_TIMEOUT, RESHARD_PUSH_TIMEOUT,
};
use crate::sharding::router;
use crate::storage::store::{Entry, LocalStore};

/// Answer to a shard key-count query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyCount {
    Local(usize),
    /// The representative's answer, relayed verbatim.
    Relayed(Value),
}

/// The reshard engine and shard admin operations.
///
/// Resharding is driven entirely by the node that receives the admin
/// request: it collects the cluster's full key space, rebuckets the
/// replicas, re-partitions the keys under the new count, and pushes each
/// bucket its share. The fan-out is synchronous with bounded timeouts and
/// no rollback; a peer that misses the push stays inconsistent until
/// anti-entropy reaches it.
#[derive(Clone)]
pub struct Rebalancer {
    directory: Arc<Directory>,
    store: Arc<LocalStore>,
    client: reqwest::Client,
}

impl Rebalancer {
    pub fn new(directory: Arc<Directory>, store: Arc<LocalStore>) -> Self {
        Self {
            directory,
            store,
            client: reqwest::Client::new(),
        }
    }

    /// Redistributes the cluster into `new_count` shards.
    ///
    /// Fails with `InsufficientReplicas`, touching nothing, unless every
    /// new shard retains at least two replicas.
    pub async fn reshard(&self, new_count: u32) -> Result<()> {
        let known = self.directory.known().await;
        if new_count == 0 || (known.len() as u32) / new_count < 2 {
            return Err(KvsError::InsufficientReplicas);
        }

        // One representative per existing shard suffices: shards are
        // internally consistent after anti-entropy.
        let curr_shard = self.directory.curr_shard().await;
        let mut full: HashMap<String, Entry> = HashMap::new();
        for (shard, members) in self.directory.shards().await {
            if shard == curr_shard {
                full.extend(self.store.snapshot());
                continue;
            }
            let Some(rep) = members.first() else {
                continue;
            };
            let snapshot = self
                .client
                .get(format!("http://{}{}", rep, ENDPOINT_SNAPSHOT_STORE))
                .timeout(FORWARD_TIMEOUT)
                .send()
                .await
                .map_err(|_| KvsError::PeerUnreachable(rep.clone()))?
                .json::<HashMap<String, Entry>>()
                .await
                .map_err(|_| KvsError::PeerUnreachable(rep.clone()))?;
            full.extend(snapshot);
        }

        let buckets = self.directory.rebalance(new_count).await;

        let mut subsets: BTreeMap<ShardId, HashMap<String, Entry>> = BTreeMap::new();
        for (key, entry) in full {
            let shard = router::assign(&key, new_count);
            subsets.entry(shard).or_default().insert(key, entry);
        }

        for (shard, members) in &buckets {
            let payload = ReshardApply {
                new_shard: *shard,
                shards: buckets.clone(),
                kvs: subsets.get(shard).cloned().unwrap_or_default(),
            };
            for member in members {
                if member == self.directory.curr_view() {
                    self.store.replace(payload.kvs.clone());
                    continue;
                }
                let result = self
                    .client
                    .put(format!(
                        "http://{}{}/reshard-helper",
                        member, ENDPOINT_SHARD
                    ))
                    .json(&payload)
                    .timeout(RESHARD_PUSH_TIMEOUT)
                    .send()
                    .await;
                if let Err(err) = result {
                    tracing::warn!("reshard push to {} failed: {}", member, err);
                }
            }
        }
        Ok(())
    }

    /// Receiver side of the reshard push: adopt the shard id, the full new
    /// map, and the bucket's key subset wholesale.
    pub async fn apply(&self, update: ReshardApply) {
        self.directory
            .replace_shards(update.shards, Some(update.new_shard))
            .await;
        self.store.replace(update.kvs);
    }

    /// Key count of a shard, forwarded to its representative when remote.
    pub async fn key_count(&self, shard: ShardId) -> Result<KeyCount> {
        let ids = self.directory.shard_ids().await;
        if !ids.contains(&shard) {
            return Err(KvsError::UnknownShard(shard));
        }
        if shard == self.directory.curr_shard().await {
            return Ok(KeyCount::Local(self.store.count()));
        }
        let rep = self
            .directory
            .representative(shard)
            .await
            .ok_or(KvsError::UnknownShard(shard))?;
        let body = self
            .client
            .get(format!(
                "http://{}{}/shard-id-key-count/{}",
                rep, ENDPOINT_SHARD, shard
            ))
            .timeout(FORWARD_TIMEOUT)
            .send()
            .await
            .map_err(|_| KvsError::PeerUnreachable(rep.clone()))?
            .json::<Value>()
            .await
            .map_err(|_| KvsError::PeerUnreachable(rep))?;
        Ok(KeyCount::Relayed(body))
    }

    /// Adds a known replica to an existing shard and notifies the cluster:
    /// the new member receives the full shard map, everyone else a light
    /// add-member notice. Both fan-outs are best-effort.
    pub async fn add_member(&self, shard: ShardId, addr: &str) -> Result<()> {
        self.admit_member(shard, addr).await?;

        let shards = self.directory.shards().await;
        let notice = ViewMessage {
            socket_address: Some(addr.to_string()),
        };
        for other in self.directory.peers().await {
            if other == addr {
                let result = self
                    .client
                    .put(format!(
                        "http://{}{}/added-to-shard/{}",
                        other, ENDPOINT_SHARD, shard
                    ))
                    .json(&shards)
                    .timeout(ADOPT_TIMEOUT)
                    .send()
                    .await;
                if let Err(err) = result {
                    tracing::warn!("shard-map delivery to {} failed: {}", other, err);
                }
            }
            let result = self
                .client
                .put(format!(
                    "http://{}{}/add-member-selfish/{}",
                    other, ENDPOINT_SHARD, shard
                ))
                .json(&notice)
                .timeout(FORWARD_TIMEOUT)
                .send()
                .await;
            if let Err(err) = result {
                tracing::debug!("add-member notice to {} failed: {}", other, err);
            }
        }
        Ok(())
    }

    /// Receiver side of the light add-member notice: validate and append,
    /// no fan-out.
    pub async fn admit_member(&self, shard: ShardId, addr: &str) -> Result<()> {
        let known = self.directory.known().await;
        if !known.iter().any(|v| v == addr) {
            return Err(KvsError::UnknownNode(addr.to_string()));
        }
        if !self.directory.add_shard_member(shard, addr).await {
            return Err(KvsError::UnknownShard(shard));
        }
        Ok(())
    }

    /// Receiver side of the full shard-map delivery: adopt the map and this
    /// node's new shard id. The caller follows up with an anti-entropy pull
    /// to fetch the shard's data.
    pub async fn adopt_shard(&self, shard: ShardId, shards: ShardMap) {
        self.directory.replace_shards(shards, Some(shard)).await;
    }
}
