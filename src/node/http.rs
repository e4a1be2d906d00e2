//! Admin HTTP API: liveness, node status and Prometheus metrics

use crate::node::service::AuctionService;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn create_router(service: Arc<AuctionService>) -> Router {
    Router::new()
        .route("/health/live", get(health_live))
        .route("/admin/status", get(admin_status))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn health_live() -> impl IntoResponse {
    (
        StatusCode::OK,
        axum::Json(json!({
            "alive": true,
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now().timestamp(),
        })),
    )
}

/// Role, peers and the node's view of the auction
async fn admin_status(State(service): State<Arc<AuctionService>>) -> impl IntoResponse {
    let state = service.result();
    axum::Json(json!({
        "node_id": service.node_id(),
        "role": service.role().to_string(),
        "is_leader": service.is_leader(),
        "failover": service.failover_policy().to_string(),
        "peers": service.peer_addrs(),
        "highest_bid": state.highest_bid,
        "winner_id": state.winner_id,
        "is_over": state.is_over,
        "end_time": state.end_time.to_rfc3339(),
    }))
}

async fn metrics(State(service): State<Arc<AuctionService>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        service.metrics().to_prometheus(service.node_id()),
    )
}
