// routes.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{wallet, webhook},
    middleware::auth,
    AppState,
};

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let wallet_routes = Router::new()
        .route("/", get(wallet::get_wallet))
        .route("/balance", get(wallet::get_balance))
        .route("/settings", put(wallet::update_settings))
        .route("/recharge", post(wallet::initiate_recharge))
        .route("/recharge/:transaction_id/status", get(wallet::get_recharge_status))
        .route("/transfer", post(wallet::transfer_funds))
        .route("/transactions", get(wallet::get_transaction_history))
        .route("/transactions/:transaction_id", get(wallet::get_transaction_detail))
        .route("/stats", get(wallet::get_wallet_stats))
        .layer(middleware::from_fn(auth));

    // Signed aggregator callback; verified at the boundary, no auth layer.
    let payment_routes = Router::new().route("/webhook", post(webhook::payment_webhook));

    let api_route = Router::new()
        .nest("/wallet", wallet_routes)
        .nest("/payments", payment_routes)
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_route)
}
