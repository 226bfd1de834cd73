// handler/webhook.rs
use std::sync::Arc;

use axum::{
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde_json::Value;

use crate::{
    error::HttpError,
    service::{
        payment_gateway::{parse_webhook, verify_webhook_signature},
        settlement::{SettlementEvent, SettlementOutcome},
    },
    AppState,
};

/// Aggregator callback for payment outcomes. Signature and shape are
/// validated here, at the boundary; nothing unverified reaches the
/// settlement coordinator.
pub async fn payment_webhook(
    Extension(app_state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, HttpError> {
    let signature = headers
        .get("x-token")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            HttpError::new(
                "Missing webhook signature".to_string(),
                StatusCode::BAD_REQUEST,
            )
        })?;

    let payload_string = body.to_string();
    let secret = &app_state.env.cinetpay_secret_key;

    if !verify_webhook_signature(&payload_string, signature, secret) {
        tracing::warn!("Invalid webhook signature received");
        return Err(HttpError::new(
            "Invalid webhook signature".to_string(),
            StatusCode::UNAUTHORIZED,
        ));
    }

    let event = parse_webhook(&body, &app_state.env.cinetpay_site_id)
        .map_err(HttpError::from)?;

    let outcome = app_state
        .settlement
        .settle(SettlementEvent::from_webhook(event))
        .await
        .map_err(HttpError::from)?;

    let message = match outcome {
        SettlementOutcome::Credited { .. } => "Payment confirmed",
        SettlementOutcome::MarkedFailed(_) => "Payment failure recorded",
        SettlementOutcome::NothingToSettle => "Nothing to settle",
    };

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": message,
    })))
}
