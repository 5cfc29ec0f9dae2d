//! Node-Local State Module
//!
//! Holds the two pieces of state every write touches:
//!
//! - **`store`**: the in-memory key-value map of the shard this node belongs
//!   to. Deletes never remove an entry; they overwrite it with a tombstone so
//!   causal history over the key stays well-defined.
//! - **`chain`**: the cluster-wide version chain, a parent-to-child mapping
//!   of causal tokens that every accepted write extends by exactly one edge.
//!   This is a single global linear history per branch, not a vector clock;
//!   the simplification is deliberate and the replication layer depends only
//!   on the narrow surface exposed here, so a stricter scheme could be
//!   substituted without touching it.

pub mod chain;
pub mod store;

#[cfg(test)]
mod tests;
