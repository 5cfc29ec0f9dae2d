use std::collections::BTreeMap;

use tokio::sync::RwLock;

/// A replica address in `host:port` form.
pub type NodeAddr = String;

/// 1-based shard identifier. `0` means "not assigned to any shard".
pub type ShardId = u32;

/// Shard id to ordered member addresses. In steady state the member lists
/// partition the known replicas.
pub type ShardMap = BTreeMap<ShardId, Vec<NodeAddr>>;

/// Cluster membership and shard assignment for one node.
///
/// `known` is every replica ever admitted; `alive` is the subset that
/// answered the most recent liveness probe. The two lists plus the shard map
/// are guarded by a single lock so each individual mutation is atomic;
/// cross-resource updates (directory vs. store vs. chain) are deliberately
/// not transactional.
pub struct Directory {
    curr_view: NodeAddr,
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    known: Vec<NodeAddr>,
    alive: Vec<NodeAddr>,
    curr_shard: ShardId,
    shards: ShardMap,
}

impl Directory {
    pub fn new(curr_view: impl Into<NodeAddr>) -> Self {
        Self {
            curr_view: curr_view.into(),
            inner: RwLock::new(Inner::default()),
        }
    }

    /// This node's own address.
    pub fn curr_view(&self) -> &str {
        &self.curr_view
    }

    /// Admits a replica, marking it alive. Returns `false` if it was already
    /// known.
    pub async fn add_known(&self, addr: &str) -> bool {
        let mut inner = self.inner.write().await;
        if inner.known.iter().any(|v| v == addr) {
            return false;
        }
        inner.known.push(addr.to_string());
        inner.alive.push(addr.to_string());
        true
    }

    /// Drops a replica from the membership list. Returns `false` if it was
    /// not known.
    pub async fn remove_known(&self, addr: &str) -> bool {
        let mut inner = self.inner.write().await;
        let Some(pos) = inner.known.iter().position(|v| v == addr) else {
            return false;
        };
        inner.known.remove(pos);
        inner.alive.retain(|v| v != addr);
        true
    }

    pub async fn mark_alive(&self, addr: &str) {
        let mut inner = self.inner.write().await;
        if inner.known.iter().any(|v| v == addr) && !inner.alive.iter().any(|v| v == addr) {
            inner.alive.push(addr.to_string());
        }
    }

    pub async fn mark_dead(&self, addr: &str) {
        let mut inner = self.inner.write().await;
        inner.alive.retain(|v| v != addr);
    }

    pub async fn known(&self) -> Vec<NodeAddr> {
        self.inner.read().await.known.clone()
    }

    pub async fn alive(&self) -> Vec<NodeAddr> {
        self.inner.read().await.alive.clone()
    }

    /// Every known replica except this node.
    pub async fn peers(&self) -> Vec<NodeAddr> {
        self.inner
            .read()
            .await
            .known
            .iter()
            .filter(|v| *v != &self.curr_view)
            .cloned()
            .collect()
    }

    pub async fn curr_shard(&self) -> ShardId {
        self.inner.read().await.curr_shard
    }

    pub async fn set_curr_shard(&self, shard: ShardId) {
        self.inner.write().await.curr_shard = shard;
    }

    pub async fn shard_count(&self) -> usize {
        self.inner.read().await.shards.len()
    }

    pub async fn shard_ids(&self) -> Vec<ShardId> {
        self.inner.read().await.shards.keys().copied().collect()
    }

    pub async fn shard_members(&self, shard: ShardId) -> Option<Vec<NodeAddr>> {
        self.inner.read().await.shards.get(&shard).cloned()
    }

    /// First member of the shard, used as the forwarding target for reads
    /// and admin queries.
    pub async fn representative(&self, shard: ShardId) -> Option<NodeAddr> {
        self.inner
            .read()
            .await
            .shards
            .get(&shard)
            .and_then(|members| members.first().cloned())
    }

    pub async fn shards(&self) -> ShardMap {
        self.inner.read().await.shards.clone()
    }

    /// Shard the given replica currently belongs to, if any.
    pub async fn shard_of_node(&self, addr: &str) -> Option<ShardId> {
        let inner = self.inner.read().await;
        inner
            .shards
            .iter()
            .find(|(_, members)| members.iter().any(|m| m == addr))
            .map(|(id, _)| *id)
    }

    /// Creates empty shards `1..=count` if the map currently holds fewer.
    pub async fn ensure_shards(&self, count: u32) {
        let mut inner = self.inner.write().await;
        if (count as usize) > inner.shards.len() {
            for id in 1..=count {
                inner.shards.entry(id).or_default();
            }
        }
    }

    /// Bootstrap placement: appends the replica to the least-populated
    /// shard, updating `curr_shard` when the replica is this node.
    pub async fn assign_to_smallest_shard(&self, addr: &str) {
        let mut inner = self.inner.write().await;
        let Some(smallest) = inner
            .shards
            .iter()
            .min_by_key(|(_, members)| members.len())
            .map(|(id, _)| *id)
        else {
            return;
        };
        inner.shards.entry(smallest).or_default().push(addr.to_string());
        if addr == self.curr_view {
            inner.curr_shard = smallest;
        }
    }

    /// Appends a replica to an existing shard. Returns `false` if the shard
    /// is not in the map.
    pub async fn add_shard_member(&self, shard: ShardId, addr: &str) -> bool {
        let mut inner = self.inner.write().await;
        match inner.shards.get_mut(&shard) {
            Some(members) => {
                members.push(addr.to_string());
                if addr == self.curr_view {
                    inner.curr_shard = shard;
                }
                true
            }
            None => false,
        }
    }

    /// Replaces the whole shard map, optionally adopting a new own-shard id.
    pub async fn replace_shards(&self, shards: ShardMap, curr_shard: Option<ShardId>) {
        let mut inner = self.inner.write().await;
        inner.shards = shards;
        if let Some(shard) = curr_shard {
            inner.curr_shard = shard;
        }
    }

    /// Round-robins every known replica into `new_count` buckets, replaces
    /// the shard map with the result, and adopts the bucket this node landed
    /// in. Returns the new map.
    pub async fn rebalance(&self, new_count: u32) -> ShardMap {
        let mut guard = self.inner.write().await;
        // Reborrow so the loop can read `known` while writing `curr_shard`.
        let inner = &mut *guard;
        let mut buckets: ShardMap = (1..=new_count).map(|id| (id, Vec::new())).collect();
        for (i, replica) in inner.known.iter().enumerate() {
            let shard = (i as u32 % new_count) + 1;
            if let Some(members) = buckets.get_mut(&shard) {
                members.push(replica.clone());
                if replica == &self.curr_view {
                    inner.curr_shard = shard;
                }
            }
        }
        inner.shards = buckets.clone();
        buckets
    }
}
