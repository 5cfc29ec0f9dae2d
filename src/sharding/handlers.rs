//! HTTP adapters for the shard admin routes.

use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::error::KvsError;
use crate::membership::directory::{Directory, ShardId, ShardMap};
use crate::replication::engine::Replicator;
use crate::replication::handlers::error_response;
use crate::replication::protocol::{ReshardApply, ReshardRequest, ViewMessage};
use crate::sharding::reshard::{KeyCount, Rebalancer};

pub async fn handle_shard_ids(
    Extension(directory): Extension<Arc<Directory>>,
) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "message": "Shard IDs retrieved successfully",
            "shard-ids": directory.shard_ids().await,
        })),
    )
}

pub async fn handle_node_shard_id(
    Extension(directory): Extension<Arc<Directory>>,
) -> (StatusCode, Json<Value>) {
    match directory.shard_of_node(directory.curr_view()).await {
        Some(shard) => (
            StatusCode::OK,
            Json(json!({
                "message": "Shard ID of the node retrieved successfully",
                "shard-id": shard,
            })),
        ),
        None => error_response(
            &KvsError::UnknownNode(directory.curr_view().to_string()),
            "node-shard-id",
        ),
    }
}

pub async fn handle_shard_members(
    Extension(directory): Extension<Arc<Directory>>,
    Path(shard): Path<ShardId>,
) -> (StatusCode, Json<Value>) {
    match directory.shard_members(shard).await {
        Some(members) => (
            StatusCode::OK,
            Json(json!({
                "message": "Members of shard ID retrieved successfully",
                "shard-id-members": members,
            })),
        ),
        None => error_response(&KvsError::UnknownShard(shard), "shard-id-members"),
    }
}

pub async fn handle_shard_key_count(
    Extension(rebalancer): Extension<Arc<Rebalancer>>,
    Path(shard): Path<ShardId>,
) -> (StatusCode, Json<Value>) {
    match rebalancer.key_count(shard).await {
        Ok(KeyCount::Local(count)) => (
            StatusCode::OK,
            Json(json!({
                "message": "Key count of shard ID retrieved successfully",
                "shard-id-key-count": count,
            })),
        ),
        // The representative's answer is relayed as-is.
        Ok(KeyCount::Relayed(body)) => (StatusCode::OK, Json(body)),
        Err(err) => error_response(&err, "shard-id-key-count"),
    }
}

pub async fn handle_reshard(
    Extension(rebalancer): Extension<Arc<Rebalancer>>,
    Json(req): Json<ReshardRequest>,
) -> (StatusCode, Json<Value>) {
    let Some(count) = req.shard_count else {
        return error_response(&KvsError::Malformed("shard-count is required"), "reshard");
    };
    match rebalancer.reshard(count).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({"message": "Resharding done successfully"})),
        ),
        Err(err) => error_response(&err, "reshard"),
    }
}

pub async fn handle_reshard_apply(
    Extension(rebalancer): Extension<Arc<Rebalancer>>,
    Json(update): Json<ReshardApply>,
) -> (StatusCode, Json<Value>) {
    rebalancer.apply(update).await;
    (StatusCode::OK, Json(json!({"message": "updated"})))
}

pub async fn handle_add_member(
    Extension(rebalancer): Extension<Arc<Rebalancer>>,
    Path(shard): Path<ShardId>,
    Json(req): Json<ViewMessage>,
) -> (StatusCode, Json<Value>) {
    let Some(addr) = req.socket_address else {
        return error_response(&KvsError::Malformed("socket-address is required"), "add-member");
    };
    match rebalancer.add_member(shard, &addr).await {
        Ok(()) => (StatusCode::OK, Json(json!({"message": "Success!"}))),
        Err(err) => error_response(&err, "add-member"),
    }
}

pub async fn handle_add_member_selfish(
    Extension(rebalancer): Extension<Arc<Rebalancer>>,
    Path(shard): Path<ShardId>,
    Json(req): Json<ViewMessage>,
) -> (StatusCode, Json<Value>) {
    let Some(addr) = req.socket_address else {
        return error_response(&KvsError::Malformed("socket-address is required"), "add-member");
    };
    match rebalancer.admit_member(shard, &addr).await {
        Ok(()) => (StatusCode::OK, Json(json!({"message": "Success!"}))),
        Err(err) => error_response(&err, "add-member"),
    }
}

/// A node learning it was added to a shard adopts the delivered map and
/// immediately reconciles with its new shard-mates.
pub async fn handle_added_to_shard(
    Extension(rebalancer): Extension<Arc<Rebalancer>>,
    Extension(replicator): Extension<Arc<Replicator>>,
    Path(shard): Path<ShardId>,
    Json(shards): Json<ShardMap>,
) -> (StatusCode, Json<Value>) {
    rebalancer.adopt_shard(shard, shards).await;
    replicator.anti_entropy().await;
    (StatusCode::OK, Json(json!({"message": "Success!"})))
}
