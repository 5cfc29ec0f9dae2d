//! Sharding Module Tests
//!
//! Covers the deterministic key router, the reshard engine's precondition
//! and local repartitioning, and the add-member admission checks. Remote
//! fan-outs are pointed at refused ports so they fail fast; the reshard
//! engine treats those legs as best-effort.

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use crate::error::KvsError;
    use crate::membership::directory::{Directory, ShardMap};
    use crate::sharding::reshard::{KeyCount, Rebalancer};
    use crate::sharding::router::{assign, ShardRouter};
    use crate::storage::store::LocalStore;

    const SELF: &str = "127.0.0.1:8085";

    fn fixture() -> (Arc<Directory>, Arc<LocalStore>, Rebalancer) {
        let directory = Arc::new(Directory::new(SELF));
        let store = Arc::new(LocalStore::new());
        let rebalancer = Rebalancer::new(directory.clone(), store.clone());
        (directory, store, rebalancer)
    }

    // ============================================================
    // KEY ROUTER
    // ============================================================

    #[test]
    fn test_assign_sums_bytes_modulo_count() {
        // "a" is byte 97: 97 % 2 = 1, shards are 1-based.
        assert_eq!(assign("a", 2), 2);
        assert_eq!(assign("b", 2), 1);
        // "ab" is 97 + 98 = 195: 195 % 3 = 0.
        assert_eq!(assign("ab", 3), 1);
    }

    #[test]
    fn test_assign_is_deterministic_and_in_range() {
        for key in ["x", "hello", "shard-me", ""] {
            for count in 1..=5 {
                let shard = assign(key, count);
                assert_eq!(shard, assign(key, count));
                assert!((1..=count).contains(&shard));
            }
        }
    }

    #[test]
    fn test_single_shard_owns_everything() {
        for key in ["x", "y", "anything"] {
            assert_eq!(assign(key, 1), 1);
        }
    }

    #[tokio::test]
    async fn test_router_requires_configured_shards() {
        let (directory, _, _) = fixture();
        let router = ShardRouter::new(directory.clone());

        let err = router.shard_of("x").await.unwrap_err();
        assert!(matches!(err, KvsError::UnknownShard(0)));

        directory.ensure_shards(2).await;
        directory.add_shard_member(1, SELF).await;
        assert_eq!(router.shard_of("b").await.unwrap(), 1);
        assert!(router.owns("b").await.unwrap());
        assert!(!router.owns("a").await.unwrap());
    }

    // ============================================================
    // RESHARD
    // ============================================================

    #[tokio::test]
    async fn test_reshard_rejects_thin_replication() {
        let (directory, store, rebalancer) = fixture();
        for addr in [SELF, "127.0.0.1:1", "127.0.0.1:2"] {
            directory.add_known(addr).await;
        }
        directory.ensure_shards(1).await;
        directory.add_shard_member(1, SELF).await;
        store.put("k", "1", "V1");

        // Three replicas over two shards leaves a one-replica shard.
        let err = rebalancer.reshard(2).await.unwrap_err();
        assert!(matches!(err, KvsError::InsufficientReplicas));

        assert_eq!(directory.shard_ids().await, vec![1], "map untouched");
        assert_eq!(directory.curr_shard().await, 1);
        assert_eq!(store.count(), 1, "store untouched");
    }

    #[tokio::test]
    async fn test_reshard_rejects_zero_count() {
        let (directory, _, rebalancer) = fixture();
        directory.add_known(SELF).await;

        let err = rebalancer.reshard(0).await.unwrap_err();
        assert!(matches!(err, KvsError::InsufficientReplicas));
    }

    #[tokio::test]
    async fn test_reshard_repartitions_local_keys() {
        let (directory, store, rebalancer) = fixture();
        let fakes = ["127.0.0.1:1", "127.0.0.1:2", "127.0.0.1:3"];
        directory.add_known(SELF).await;
        for fake in fakes {
            directory.add_known(fake).await;
        }
        directory.ensure_shards(1).await;
        directory.add_shard_member(1, SELF).await;
        for fake in fakes {
            directory.add_shard_member(1, fake).await;
        }

        let keys: Vec<String> = (0..10).map(|i| format!("k{}", i)).collect();
        for key in &keys {
            store.put(key, "v", "V1");
        }

        rebalancer.reshard(2).await.unwrap();

        // Round-robin over the known order: self lands in shard 1.
        let mut expected: ShardMap = BTreeMap::new();
        expected.insert(1, vec![SELF.to_string(), fakes[1].to_string()]);
        expected.insert(2, vec![fakes[0].to_string(), fakes[2].to_string()]);
        assert_eq!(directory.shards().await, expected);
        assert_eq!(directory.curr_shard().await, 1);

        // The local store now holds exactly shard 1's slice of the keys.
        for key in &keys {
            assert_eq!(
                store.get(key).is_some(),
                assign(key, 2) == 1,
                "wrong placement for {}",
                key
            );
        }
        assert!(store.count() > 0 && store.count() < keys.len());
    }

    // ============================================================
    // SHARD ADMIN
    // ============================================================

    #[tokio::test]
    async fn test_key_count_of_own_shard() {
        let (directory, store, rebalancer) = fixture();
        directory.ensure_shards(1).await;
        directory.add_shard_member(1, SELF).await;
        store.put("k", "1", "V1");
        store.delete("gone", "V2");

        assert_eq!(rebalancer.key_count(1).await.unwrap(), KeyCount::Local(2));
    }

    #[tokio::test]
    async fn test_key_count_of_unknown_shard_fails() {
        let (directory, _, rebalancer) = fixture();
        directory.ensure_shards(1).await;

        let err = rebalancer.key_count(9).await.unwrap_err();
        assert!(matches!(err, KvsError::UnknownShard(9)));
    }

    #[tokio::test]
    async fn test_admit_member_requires_known_node() {
        let (directory, _, rebalancer) = fixture();
        directory.ensure_shards(1).await;

        let err = rebalancer.admit_member(1, "10.0.0.9:8085").await.unwrap_err();
        assert!(matches!(err, KvsError::UnknownNode(_)));
    }

    #[tokio::test]
    async fn test_admit_member_requires_existing_shard() {
        let (directory, _, rebalancer) = fixture();
        directory.add_known("127.0.0.1:1").await;
        directory.ensure_shards(1).await;

        let err = rebalancer.admit_member(7, "127.0.0.1:1").await.unwrap_err();
        assert!(matches!(err, KvsError::UnknownShard(7)));
    }

    #[tokio::test]
    async fn test_add_member_appends_and_survives_dead_peers() {
        let (directory, _, rebalancer) = fixture();
        directory.add_known(SELF).await;
        directory.add_known("127.0.0.1:1").await;
        directory.ensure_shards(1).await;
        directory.add_shard_member(1, SELF).await;

        // The notified peer is unreachable; the fan-out is best-effort.
        rebalancer.add_member(1, "127.0.0.1:1").await.unwrap();
        assert_eq!(
            directory.shard_members(1).await.unwrap(),
            vec![SELF.to_string(), "127.0.0.1:1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_adopt_shard_replaces_map_and_own_id() {
        let (directory, _, rebalancer) = fixture();
        directory.ensure_shards(1).await;
        directory.add_shard_member(1, SELF).await;

        let mut map: ShardMap = BTreeMap::new();
        map.insert(1, vec!["127.0.0.1:1".to_string()]);
        map.insert(2, vec![SELF.to_string()]);
        rebalancer.adopt_shard(2, map.clone()).await;

        assert_eq!(directory.shards().await, map);
        assert_eq!(directory.curr_shard().await, 2);
    }
}
