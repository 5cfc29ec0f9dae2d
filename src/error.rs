//! Protocol error kinds shared across all subsystems.
//!
//! Every fallible core operation returns [`KvsError`]; the HTTP handlers map
//! each variant to a status code via [`KvsError::status`]. Failures of
//! best-effort peer calls (broadcast, anti-entropy) are swallowed at the call
//! site and never reach this type.

use axum::http::StatusCode;
use thiserror::Error;

/// Result type alias for the store's core operations.
pub type Result<T> = std::result::Result<T, KvsError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KvsError {
    /// The client-supplied causal token does not resolve to a recorded head
    /// on the shard that owns the key.
    #[error("causal metadata is not in the local history")]
    CausalMetadataUnknown,

    /// The key is absent or tombstoned on the owning shard.
    #[error("key does not exist")]
    KeyNotFound,

    /// The requested shard id is not in the shard map.
    #[error("shard {0} does not exist")]
    UnknownShard(u32),

    /// The address is not a known replica.
    #[error("node {0} is not a known replica")]
    UnknownNode(String),

    /// The view being added is already in the membership list.
    #[error("socket address already exists in the view")]
    AlreadyExists,

    /// Resharding would leave a shard with fewer than two replicas.
    #[error("not enough nodes to provide fault-tolerance with the given shard count")]
    InsufficientReplicas,

    /// No peer returned an authoritative answer to a forwarded operation,
    /// or the view to delete is not in the membership list.
    #[error("not found")]
    NotFound,

    /// A required request field is missing or unusable.
    #[error("malformed request: {0}")]
    Malformed(&'static str),

    /// The single authoritative forwarding target could not be reached.
    #[error("peer {0} is unreachable")]
    PeerUnreachable(String),
}

impl KvsError {
    /// HTTP status the thin adapter reports for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            KvsError::CausalMetadataUnknown => StatusCode::BAD_REQUEST,
            KvsError::KeyNotFound => StatusCode::NOT_FOUND,
            KvsError::UnknownShard(_) => StatusCode::NOT_FOUND,
            KvsError::UnknownNode(_) => StatusCode::BAD_REQUEST,
            KvsError::AlreadyExists => StatusCode::NOT_FOUND,
            KvsError::InsufficientReplicas => StatusCode::BAD_REQUEST,
            KvsError::NotFound => StatusCode::NOT_FOUND,
            KvsError::Malformed(_) => StatusCode::BAD_REQUEST,
            KvsError::PeerUnreachable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
