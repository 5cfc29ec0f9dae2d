use std::sync::Arc;

use anyhow::Context;
use axum::extract::Extension;
use axum::routing::{get, put};
use axum::Router;

use causalkv::membership::detector::FailureDetector;
use causalkv::membership::directory::Directory;
use causalkv::membership::handlers::{
    handle_add_view, handle_announce_view, handle_delete_view, handle_list_views,
};
use causalkv::replication::engine::Replicator;
use causalkv::replication::handlers::{
    handle_delete, handle_get, handle_put, handle_selfish_delete, handle_selfish_put,
    handle_snapshot_chain, handle_snapshot_store,
};
use causalkv::sharding::handlers::{
    handle_add_member, handle_add_member_selfish, handle_added_to_shard, handle_node_shard_id,
    handle_reshard, handle_reshard_apply, handle_shard_ids, handle_shard_key_count,
    handle_shard_members,
};
use causalkv::sharding::reshard::Rebalancer;
use causalkv::storage::chain::VersionChain;
use causalkv::storage::store::LocalStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Bootstrap config comes from the environment: this node's own address,
    // the initial peer list, and optionally the shard count.
    let socket_address = std::env::var("SOCKET_ADDRESS")
        .context("SOCKET_ADDRESS must be set to this node's host:port")?;
    let initial_views = std::env::var("VIEW").unwrap_or_default();
    let shard_count: Option<u32> = match std::env::var("SHARD_COUNT") {
        Ok(raw) => Some(
            raw.trim_matches('"')
                .parse()
                .context("SHARD_COUNT must be a positive integer")?,
        ),
        Err(_) => None,
    };

    let directory = Arc::new(Directory::new(socket_address.clone()));
    let store = Arc::new(LocalStore::new());
    let chain = Arc::new(VersionChain::new());
    let replicator = Arc::new(Replicator::new(
        directory.clone(),
        store.clone(),
        chain.clone(),
    ));
    let rebalancer = Arc::new(Rebalancer::new(directory.clone(), store.clone()));

    if let Some(count) = shard_count {
        directory.ensure_shards(count).await;
    }
    for view in initial_views.split(',').filter(|v| !v.is_empty()) {
        directory.add_known(view).await;
        if shard_count.is_some() {
            directory.assign_to_smallest_shard(view).await;
        }
    }
    tracing::info!(
        "starting node {} (shard {}, {} known views)",
        socket_address,
        directory.curr_shard().await,
        directory.known().await.len()
    );

    // The three background tasks: announce this node, pull an initial
    // snapshot from shard-mates, and keep probing peer liveness.
    let announcer = replicator.clone();
    tokio::spawn(async move { announcer.announce().await });
    let syncer = replicator.clone();
    tokio::spawn(async move { syncer.anti_entropy().await });
    tokio::spawn(FailureDetector::new(directory.clone()).run());

    let app = Router::new()
        .route(
            "/key-value-store-view",
            get(handle_list_views)
                .put(handle_add_view)
                .delete(handle_delete_view),
        )
        .route("/key-value-store-view-new", put(handle_announce_view))
        .route("/new-replica-kvs", get(handle_snapshot_store))
        .route("/new-replica-history", get(handle_snapshot_chain))
        .route(
            "/key-value-store/:key",
            put(handle_put).get(handle_get).delete(handle_delete),
        )
        .route(
            "/selfish-key-value-store/:key",
            put(handle_selfish_put).delete(handle_selfish_delete),
        )
        .route("/key-value-store-shard/shard-ids", get(handle_shard_ids))
        .route(
            "/key-value-store-shard/node-shard-id",
            get(handle_node_shard_id),
        )
        .route(
            "/key-value-store-shard/shard-id-members/:id",
            get(handle_shard_members),
        )
        .route(
            "/key-value-store-shard/shard-id-key-count/:id",
            get(handle_shard_key_count),
        )
        .route("/key-value-store-shard/reshard", put(handle_reshard))
        .route(
            "/key-value-store-shard/reshard-helper",
            put(handle_reshard_apply),
        )
        .route(
            "/key-value-store-shard/add-member/:id",
            put(handle_add_member),
        )
        .route(
            "/key-value-store-shard/add-member-selfish/:id",
            put(handle_add_member_selfish),
        )
        .route(
            "/key-value-store-shard/added-to-shard/:id",
            put(handle_added_to_shard),
        )
        .layer(Extension(directory))
        .layer(Extension(store))
        .layer(Extension(chain))
        .layer(Extension(replicator))
        .layer(Extension(rebalancer));

    let listener = tokio::net::TcpListener::bind(&socket_address).await?;
    tracing::info!("HTTP server listening on {}", socket_address);
    axum::serve(listener, app).await?;

    Ok(())
}
