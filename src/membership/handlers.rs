//! HTTP adapters for the view (membership) routes.

use std::sync::Arc;

use axum::extract::Extension;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::error::KvsError;
use crate::membership::directory::Directory;
use crate::replication::engine::Replicator;
use crate::replication::handlers::error_response;
use crate::replication::protocol::ViewMessage;

pub async fn handle_list_views(
    Extension(directory): Extension<Arc<Directory>>,
) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "message": "View retrieved successfully",
            "view": directory.alive().await,
        })),
    )
}

/// Admits a new view and propagates it to the rest of the cluster from a
/// detached task, so the admission itself never waits on peers.
pub async fn handle_add_view(
    Extension(directory): Extension<Arc<Directory>>,
    Extension(replicator): Extension<Arc<Replicator>>,
    Json(req): Json<ViewMessage>,
) -> (StatusCode, Json<Value>) {
    let Some(addr) = req.socket_address else {
        return error_response(&KvsError::Malformed("socket-address is required"), "PUT");
    };
    if !directory.add_known(&addr).await {
        return error_response(&KvsError::AlreadyExists, "PUT");
    }
    tokio::spawn(async move { replicator.broadcast_new_view(&addr).await });
    (
        StatusCode::CREATED,
        Json(json!({"message": "Replica added successfully to the view"})),
    )
}

/// The announce variant: admits the view without re-broadcasting it. A
/// duplicate announcement is not an error, just redundant.
pub async fn handle_announce_view(
    Extension(directory): Extension<Arc<Directory>>,
    Json(req): Json<ViewMessage>,
) -> (StatusCode, Json<Value>) {
    let Some(addr) = req.socket_address else {
        return error_response(&KvsError::Malformed("socket-address is required"), "PUT");
    };
    if directory.add_known(&addr).await {
        (
            StatusCode::OK,
            Json(json!({"message": "Replica added successfully to the view"})),
        )
    } else {
        (
            StatusCode::CREATED,
            Json(json!({"error": "View already exists", "message": "Error in PUT"})),
        )
    }
}

pub async fn handle_delete_view(
    Extension(directory): Extension<Arc<Directory>>,
    Json(req): Json<ViewMessage>,
) -> (StatusCode, Json<Value>) {
    let Some(addr) = req.socket_address else {
        return error_response(&KvsError::Malformed("socket-address is required"), "DELETE");
    };
    if directory.remove_known(&addr).await {
        (
            StatusCode::OK,
            Json(json!({"message": "Replica deleted successfully from the view"})),
        )
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "Socket address does not exist in the view",
                "message": "Error in DELETE",
            })),
        )
    }
}
