//! HTTP adapters for the key-value and snapshot routes.
//!
//! Handlers stay thin: parse the request, call the engine, map the result
//! onto the wire statuses (201 created, 200 updated, 202 history-only ack).

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::error::KvsError;
use crate::replication::engine::{ClientRead, ClientWrite, Replicator, WriteOutcome, WriteResult};
use crate::replication::protocol::WriteRequest;
use crate::storage::chain::VersionChain;
use crate::storage::store::{Entry, LocalStore};

/// Uniform error body: the variant's message plus the failing operation.
pub(crate) fn error_response(err: &KvsError, context: &str) -> (StatusCode, Json<Value>) {
    (
        err.status(),
        Json(json!({
            "error": err.to_string(),
            "message": format!("Error in {}", context),
        })),
    )
}

fn write_success(result: WriteResult) -> (StatusCode, Json<Value>) {
    let (status, message) = if result.created {
        (StatusCode::CREATED, "Added successfully")
    } else {
        (StatusCode::OK, "Updated successfully")
    };
    (
        status,
        Json(json!({
            "message": message,
            "causal-metadata": result.token,
            "shard-id": result.shard_id,
        })),
    )
}

fn relay(status: u16, body: Value) -> (StatusCode, Json<Value>) {
    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(body),
    )
}

pub async fn handle_put(
    Extension(replicator): Extension<Arc<Replicator>>,
    Path(key): Path<String>,
    Json(req): Json<WriteRequest>,
) -> (StatusCode, Json<Value>) {
    let Some(token) = req.causal_metadata else {
        return error_response(&KvsError::Malformed("causal-metadata is required"), "PUT");
    };
    let Some(value) = req.value else {
        return error_response(&KvsError::Malformed("value is required"), "PUT");
    };
    match replicator.client_write(&key, Some(&value), &token).await {
        Ok(ClientWrite::Local(result)) => write_success(result),
        Ok(ClientWrite::Relayed { status, body }) => relay(status, body),
        Err(err) => error_response(&err, "PUT"),
    }
}

pub async fn handle_delete(
    Extension(replicator): Extension<Arc<Replicator>>,
    Path(key): Path<String>,
    Json(req): Json<WriteRequest>,
) -> (StatusCode, Json<Value>) {
    let Some(token) = req.causal_metadata else {
        return error_response(&KvsError::Malformed("causal-metadata is required"), "DELETE");
    };
    match replicator.client_write(&key, None, &token).await {
        Ok(ClientWrite::Local(result)) => write_success(result),
        Ok(ClientWrite::Relayed { status, body }) => relay(status, body),
        Err(err) => error_response(&err, "DELETE"),
    }
}

pub async fn handle_selfish_put(
    Extension(replicator): Extension<Arc<Replicator>>,
    Path(key): Path<String>,
    Json(req): Json<WriteRequest>,
) -> (StatusCode, Json<Value>) {
    let Some(token) = req.causal_metadata else {
        return error_response(&KvsError::Malformed("causal-metadata is required"), "PUT");
    };
    let Some(value) = req.value else {
        return error_response(&KvsError::Malformed("value is required"), "PUT");
    };
    match replicator.selfish_write(&key, Some(&value), &token).await {
        Ok(WriteOutcome::Applied(result)) => write_success(result),
        Ok(WriteOutcome::NotOwner) => (
            StatusCode::ACCEPTED,
            Json(json!({"message": "History updated"})),
        ),
        Err(err) => error_response(&err, "PUT"),
    }
}

pub async fn handle_selfish_delete(
    Extension(replicator): Extension<Arc<Replicator>>,
    Path(key): Path<String>,
    Json(req): Json<WriteRequest>,
) -> (StatusCode, Json<Value>) {
    let Some(token) = req.causal_metadata else {
        return error_response(&KvsError::Malformed("causal-metadata is required"), "DELETE");
    };
    match replicator.selfish_write(&key, None, &token).await {
        Ok(WriteOutcome::Applied(result)) => write_success(result),
        Ok(WriteOutcome::NotOwner) => (
            StatusCode::ACCEPTED,
            Json(json!({"message": "History updated"})),
        ),
        Err(err) => error_response(&err, "DELETE"),
    }
}

pub async fn handle_get(
    Extension(replicator): Extension<Arc<Replicator>>,
    Path(key): Path<String>,
) -> (StatusCode, Json<Value>) {
    match replicator.client_get(&key).await {
        Ok(ClientRead::Local { value, token }) => (
            StatusCode::OK,
            Json(json!({
                "message": "Retrieved successfully",
                "causal-metadata": token,
                "value": value,
            })),
        ),
        Ok(ClientRead::Relayed { status, body }) => relay(status, body),
        Err(KvsError::KeyNotFound) => (
            StatusCode::NOT_FOUND,
            Json(json!({"message": "Key does not exist", "error": "Error in GET"})),
        ),
        Err(err) => error_response(&err, "GET"),
    }
}

pub async fn handle_snapshot_store(
    Extension(store): Extension<Arc<LocalStore>>,
) -> Json<HashMap<String, Entry>> {
    Json(store.snapshot())
}

pub async fn handle_snapshot_chain(
    Extension(chain): Extension<Arc<VersionChain>>,
) -> Json<HashMap<String, String>> {
    Json(chain.snapshot())
}
