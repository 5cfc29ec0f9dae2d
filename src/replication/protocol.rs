//! Inter-Node Wire Contract
//!
//! Defines the route paths, per-call timeouts, and Data Transfer Objects
//! used between replicas. Everything travels as JSON over HTTP; field names
//! are part of the client-visible protocol (`causal-metadata`,
//! `socket-address`, ...) and must not change.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::membership::directory::{ShardId, ShardMap};
use crate::storage::store::Entry;

// --- Routes ---

/// Membership list; also serves as the liveness probe target.
pub const ENDPOINT_VIEW: &str = "/key-value-store-view";
/// Non-broadcasting view add, used by a booting node's announcement.
pub const ENDPOINT_VIEW_NEW: &str = "/key-value-store-view-new";
/// Full local-store snapshot (anti-entropy, reshard collection).
pub const ENDPOINT_SNAPSHOT_STORE: &str = "/new-replica-kvs";
/// Full version-chain snapshot (anti-entropy).
pub const ENDPOINT_SNAPSHOT_CHAIN: &str = "/new-replica-history";
/// Client-facing key-value operations.
pub const ENDPOINT_KVS: &str = "/key-value-store";
/// Internal write variant that never re-broadcasts (cycle prevention).
pub const ENDPOINT_KVS_SELFISH: &str = "/selfish-key-value-store";
/// Shard admin operations, suffixed per operation.
pub const ENDPOINT_SHARD: &str = "/key-value-store-shard";

// --- Timeouts ---
// Every outbound peer call is bounded; there are no retries and no backoff.

/// Liveness probes, anti-entropy snapshot pulls, view announcements.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);
/// Authoritative forwards, selfish broadcasts, reshard collection,
/// add-member notices.
pub const FORWARD_TIMEOUT: Duration = Duration::from_secs(5);
/// Reshard bucket pushes.
pub const RESHARD_PUSH_TIMEOUT: Duration = Duration::from_secs(8);
/// Full shard-map delivery to a freshly added member.
pub const ADOPT_TIMEOUT: Duration = Duration::from_secs(10);

// --- Data Transfer Objects ---

/// A single replica address, as carried by the view and add-member routes.
#[derive(Debug, Serialize, Deserialize)]
pub struct ViewMessage {
    #[serde(rename = "socket-address")]
    pub socket_address: Option<String>,
}

/// Client or inter-node write. `value` is absent on deletes;
/// `causal-metadata` is the bracketed token the write depends on, or the
/// empty string for "no dependency".
#[derive(Debug, Serialize, Deserialize)]
pub struct WriteRequest {
    pub value: Option<String>,
    #[serde(rename = "causal-metadata")]
    pub causal_metadata: Option<String>,
}

/// Admin request changing the shard count.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReshardRequest {
    #[serde(rename = "shard-count")]
    pub shard_count: Option<u32>,
}

/// Reshard push: the receiving replica adopts the shard id, the full new
/// shard map, and its bucket's key subset wholesale.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReshardApply {
    #[serde(rename = "new-shard")]
    pub new_shard: ShardId,
    #[serde(rename = "shard_count")]
    pub shards: ShardMap,
    pub kvs: HashMap<String, Entry>,
}
