//! Sharding Module
//!
//! Deterministic key-to-shard routing and the reshard engine.
//!
//! ## Core Concepts
//! - **Routing**: a key's shard is a pure function of the key and the
//!   *current* shard count. There is no key-range stability across
//!   reshardings — changing the count moves keys by design.
//! - **Resharding**: an explicit admin operation that round-robins the
//!   known replicas into new buckets, re-partitions the full key space
//!   under the new count, and pushes each bucket its subset. The fan-out is
//!   bounded but not atomic; a missed peer self-heals through anti-entropy.
//! - **Shard admin**: membership queries per shard and the add-member
//!   fan-out.

pub mod handlers;
pub mod reshard;
pub mod router;

#[cfg(test)]
mod tests;
