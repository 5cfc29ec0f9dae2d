use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{KvsError, Result};
use crate::membership::directory::{Directory, ShardId};
use crate::replication::protocol::{
    ViewMessage, WriteRequest, ENDPOINT_KVS, ENDPOINT_KVS_SELFISH, ENDPOINT_SNAPSHOT_CHAIN,
    ENDPOINT_SNAPSHOT_STORE, ENDPOINT_VIEW, ENDPOINT_VIEW_NEW, FORWARD_TIMEOUT, PROBE_TIMEOUT,
};
use crate::sharding::router::ShardRouter;
use crate::storage::chain::{bracketed, Extension, VersionChain};
use crate::storage::store::{Entry, LocalStore};

/// A write this node answered authoritatively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteResult {
    /// True when the key had no previous entry (tombstones count as
    /// previous entries).
    pub created: bool,
    /// The freshly issued causal token, bracketed.
    pub token: String,
    /// The shard the key belongs to.
    pub shard_id: ShardId,
}

/// Outcome of applying a write locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied(WriteResult),
    /// This node does not own the target shard. The chain may still have
    /// advanced (history-only update); the owning shard decides the
    /// authoritative answer.
    NotOwner,
}

/// A client write's final answer: produced locally or relayed verbatim from
/// the peer that answered authoritatively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientWrite {
    Local(WriteResult),
    Relayed { status: u16, body: Value },
}

/// A client read's final answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRead {
    Local { value: String, token: String },
    Relayed { status: u16, body: Value },
}

/// The replication and forwarding protocol.
///
/// Owns the control flow of every client operation: causal validation and
/// local mutation, the best-effort selfish broadcast that converges the
/// cluster-wide chain, authoritative forwarding for keys this node does not
/// own, and the read-side anti-entropy reconciliation.
#[derive(Clone)]
pub struct Replicator {
    directory: Arc<Directory>,
    router: ShardRouter,
    store: Arc<LocalStore>,
    chain: Arc<VersionChain>,
    client: reqwest::Client,
}

impl Replicator {
    pub fn new(
        directory: Arc<Directory>,
        store: Arc<LocalStore>,
        chain: Arc<VersionChain>,
    ) -> Self {
        Self {
            router: ShardRouter::new(directory.clone()),
            directory,
            store,
            chain,
            client: reqwest::Client::new(),
        }
    }

    /// Validates a write against the chain and, when this node owns the
    /// target shard, applies it to the local store. `value: None` writes a
    /// tombstone.
    ///
    /// The chain advances on every acceptance regardless of ownership: a
    /// non-owner still records the new edge so the cluster-wide history
    /// converges, then reports [`WriteOutcome::NotOwner`]. Deletes require
    /// a causal token; a delete with no dependency is malformed.
    pub async fn apply_local(
        &self,
        key: &str,
        value: Option<&str>,
        token: &str,
    ) -> Result<WriteOutcome> {
        if value.is_none() && token.is_empty() {
            return Err(KvsError::Malformed("causal-metadata is required for delete"));
        }

        let shard = self.router.shard_of(key).await?;
        let owns = shard == self.directory.curr_shard().await;

        match self.chain.validate_and_extend(token) {
            Extension::Extended { token: new_tag } => {
                if !owns {
                    return Ok(WriteOutcome::NotOwner);
                }
                let existed = match value {
                    Some(v) => self.store.put(key, v, &new_tag),
                    None => self.store.delete(key, &new_tag),
                };
                Ok(WriteOutcome::Applied(WriteResult {
                    created: !existed,
                    token: bracketed(&new_tag),
                    shard_id: shard,
                }))
            }
            Extension::Unknown => {
                if owns {
                    Err(KvsError::CausalMetadataUnknown)
                } else {
                    Ok(WriteOutcome::NotOwner)
                }
            }
        }
    }

    /// Client-facing PUT/DELETE.
    ///
    /// Locally conclusive outcomes (applied, or rejected by the owning
    /// shard) trigger the selfish broadcast before answering; a write this
    /// node cannot resolve is forwarded to the peers instead, and the best
    /// authoritative answer relayed.
    pub async fn client_write(
        &self,
        key: &str,
        value: Option<&str>,
        token: &str,
    ) -> Result<ClientWrite> {
        match self.apply_local(key, value, token).await {
            Ok(WriteOutcome::Applied(result)) => {
                self.spawn_selfish_broadcast(key, value, token);
                Ok(ClientWrite::Local(result))
            }
            Ok(WriteOutcome::NotOwner) => self.forward_write(key, value, token).await,
            Err(err @ KvsError::CausalMetadataUnknown) => {
                // The owner rejected, but peers run the same validation, so
                // the broadcast still goes out (matching the peers' view of
                // the history is harmless either way).
                self.spawn_selfish_broadcast(key, value, token);
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Internal ("selfish") PUT/DELETE: applies locally, never
    /// re-broadcasts. The adapter answers 202 on [`WriteOutcome::NotOwner`].
    pub async fn selfish_write(
        &self,
        key: &str,
        value: Option<&str>,
        token: &str,
    ) -> Result<WriteOutcome> {
        self.apply_local(key, value, token).await
    }

    /// Client-facing GET: anti-entropy, then route.
    pub async fn client_get(&self, key: &str) -> Result<ClientRead> {
        self.anti_entropy().await;

        let shard = self.router.shard_of(key).await?;
        if shard != self.directory.curr_shard().await {
            let rep = self
                .router
                .representative(shard)
                .await
                .ok_or(KvsError::UnknownShard(shard))?;
            let response = self
                .client
                .get(format!("http://{}{}/{}", rep, ENDPOINT_KVS, key))
                .timeout(FORWARD_TIMEOUT)
                .send()
                .await
                .map_err(|_| KvsError::PeerUnreachable(rep.clone()))?;
            let status = response.status().as_u16();
            let body = response.json().await.unwrap_or(Value::Null);
            return Ok(ClientRead::Relayed { status, body });
        }

        match self.store.get(key) {
            Some(entry) if !entry.is_tombstone() => Ok(ClientRead::Local {
                value: entry.value.unwrap_or_default(),
                token: bracketed(&entry.version),
            }),
            _ => Err(KvsError::KeyNotFound),
        }
    }

    /// Opportunistic reconciliation with the peers of this node's own
    /// shard: the first peer holding a strictly larger store or chain
    /// snapshot replaces the local state wholesale. Not a merge; peers are
    /// assumed never to diverge incompatibly.
    pub async fn anti_entropy(&self) {
        let shard = self.directory.curr_shard().await;
        let members = self.directory.shard_members(shard).await.unwrap_or_default();
        for peer in members {
            if peer == self.directory.curr_view() {
                continue;
            }
            match self.pull_snapshots(&peer).await {
                Ok((kvs, history)) => {
                    if kvs.len() > self.store.count() || history.len() > self.chain.len() {
                        tracing::debug!("adopting larger snapshot from {}", peer);
                        self.store.replace(kvs);
                        self.chain.replace(history);
                        break;
                    }
                }
                Err(err) => {
                    tracing::debug!("anti-entropy pull from {} failed: {}", peer, err);
                }
            }
        }
    }

    async fn pull_snapshots(
        &self,
        peer: &str,
    ) -> reqwest::Result<(HashMap<String, Entry>, HashMap<String, String>)> {
        let kvs = self
            .client
            .get(format!("http://{}{}", peer, ENDPOINT_SNAPSHOT_STORE))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await?
            .json::<HashMap<String, Entry>>()
            .await?;
        let history = self
            .client
            .get(format!("http://{}{}", peer, ENDPOINT_SNAPSHOT_CHAIN))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await?
            .json::<HashMap<String, String>>()
            .await?;
        Ok((kvs, history))
    }

    /// One-shot boot announcement: tells every known peer this node exists,
    /// via the non-broadcasting view add. Best-effort.
    pub async fn announce(&self) {
        let body = ViewMessage {
            socket_address: Some(self.directory.curr_view().to_string()),
        };
        for peer in self.directory.peers().await {
            let result = self
                .client
                .put(format!("http://{}{}", peer, ENDPOINT_VIEW_NEW))
                .json(&body)
                .timeout(PROBE_TIMEOUT)
                .send()
                .await;
            if let Err(err) = result {
                tracing::debug!("announce to {} failed: {}", peer, err);
            }
        }
    }

    /// Propagates a freshly admitted view to every other peer. Spawned by
    /// the add-view handler; best-effort.
    pub async fn broadcast_new_view(&self, new_view: &str) {
        let body = ViewMessage {
            socket_address: Some(new_view.to_string()),
        };
        for peer in self.directory.known().await {
            if peer == new_view || peer == self.directory.curr_view() {
                continue;
            }
            let result = self
                .client
                .put(format!("http://{}{}", peer, ENDPOINT_VIEW))
                .json(&body)
                .timeout(PROBE_TIMEOUT)
                .send()
                .await;
            if let Err(err) = result {
                tracing::debug!("view broadcast to {} failed: {}", peer, err);
            }
        }
    }

    /// Fans the selfish copy of a write out to every known peer from a
    /// detached task. Failures never reach the triggering request.
    fn spawn_selfish_broadcast(&self, key: &str, value: Option<&str>, token: &str) {
        let this = self.clone();
        let key = key.to_string();
        let value = value.map(str::to_string);
        let token = token.to_string();
        tokio::spawn(async move {
            for peer in this.directory.peers().await {
                if let Err(err) = this.send_selfish(&peer, &key, value.as_deref(), &token).await {
                    tracing::debug!("selfish broadcast to {} failed: {}", peer, err);
                }
            }
        });
    }

    /// Authoritative forward: tries the selfish variant on every peer and
    /// keeps the best (lowest, non-202) status and its body. 202 is only a
    /// history acknowledgement, never an answer.
    async fn forward_write(
        &self,
        key: &str,
        value: Option<&str>,
        token: &str,
    ) -> Result<ClientWrite> {
        let mut best: Option<(u16, Value)> = None;
        for peer in self.directory.peers().await {
            let response = match self.send_selfish(&peer, key, value, token).await {
                Ok(response) => response,
                Err(err) => {
                    tracing::debug!("forward to {} failed: {}", peer, err);
                    continue;
                }
            };
            let status = response.status().as_u16();
            if status == 202 || status >= best.as_ref().map_or(404, |(s, _)| *s) {
                continue;
            }
            let body = response.json().await.unwrap_or(Value::Null);
            best = Some((status, body));
        }
        match best {
            Some((status, body)) => Ok(ClientWrite::Relayed { status, body }),
            None => Err(KvsError::NotFound),
        }
    }

    async fn send_selfish(
        &self,
        peer: &str,
        key: &str,
        value: Option<&str>,
        token: &str,
    ) -> reqwest::Result<reqwest::Response> {
        let url = format!("http://{}{}/{}", peer, ENDPOINT_KVS_SELFISH, key);
        let body = WriteRequest {
            value: value.map(str::to_string),
            causal_metadata: Some(token.to_string()),
        };
        let request = match value {
            Some(_) => self.client.put(url),
            None => self.client.delete(url),
        };
        request.json(&body).timeout(FORWARD_TIMEOUT).send().await
    }
}
