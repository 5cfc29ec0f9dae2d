//! Membership & Liveness Module
//!
//! Tracks the cluster topology: every replica address this node has ever
//! admitted ("views"), the subset that answered the last liveness probe, the
//! node's own shard assignment, and the cluster-wide shard map.
//!
//! ## Core Mechanisms
//! - **Directory**: lock-guarded membership and shard-map state, injected
//!   into request handlers and background tasks (no ambient globals).
//! - **Failure Detection**: a periodic HTTP probe loop flips peers between
//!   alive and dead. Dead peers stay known and remain eligible forwarding
//!   targets; liveness state is private to each node and never broadcast.

pub mod detector;
pub mod directory;
pub mod handlers;
