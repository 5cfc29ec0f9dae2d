//! Replication & Forwarding Module
//!
//! Orchestrates client PUT/GET/DELETE across the cluster. A write is first
//! validated against the local version chain; if this node owns the target
//! shard it mutates the local store and answers, then fans a non-recursive
//! ("selfish") copy of the write out to every known peer so the cluster-wide
//! chain converges. A write this node cannot resolve is forwarded to the
//! peers and the best authoritative answer is relayed. Reads run a crude
//! anti-entropy step first, adopting a same-shard peer's strictly larger
//! snapshot wholesale.
//!
//! ## Submodules
//! - **`protocol`**: endpoint paths, per-call timeouts, and the JSON DTOs of
//!   the inter-node wire contract.
//! - **`engine`**: the `Replicator`, owning the routing/validation/fan-out
//!   control flow.
//! - **`handlers`**: thin HTTP adapters mapping the engine's results onto
//!   routes and status codes.

pub mod engine;
pub mod handlers;
pub mod protocol;
