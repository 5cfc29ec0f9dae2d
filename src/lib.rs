//! Replicated, Sharded Key-Value Store Library
//!
//! This library crate defines the core modules of the distributed store.
//! It serves as the foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! The system is composed of four loosely coupled subsystems:
//!
//! - **`membership`**: The cluster coordination layer. Tracks the known and
//!   reachable replicas ("views"), the node's own shard assignment, and the
//!   cluster-wide shard map, and runs the periodic failure detector.
//! - **`storage`**: The node-local state. The in-memory key-value store with
//!   tombstone deletes, and the cluster-wide version chain that gates every
//!   write on client-supplied causal metadata.
//! - **`replication`**: The write/read protocol. Routes operations to the
//!   owning shard, broadcasts accepted writes cluster-wide, forwards
//!   non-local operations, and reconciles diverged replicas on reads.
//! - **`sharding`**: Key-to-shard routing and the reshard engine that
//!   redistributes replicas and migrates key ranges when the shard count
//!   changes.

pub mod error;
pub mod membership;
pub mod replication;
pub mod sharding;
pub mod storage;

pub use error::{KvsError, Result};
