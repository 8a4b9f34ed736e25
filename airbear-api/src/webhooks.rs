use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};

use airbear_bodega::OrderStatus;
use airbear_core::webhook::{verify_signature, EventKind, WebhookEvent};
use airbear_ride::RideTransition;

use crate::{error::AppError, state::AppState};

pub const SIGNATURE_HEADER: &str = "stripe-signature";

pub fn routes() -> Router<AppState> {
    Router::new().route("/webhooks/stripe", post(handle_stripe_webhook))
}

/// POST /api/webhooks/stripe
/// Receive payment status updates from the processor
pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let secret = state
        .webhook_secret
        .as_deref()
        .ok_or_else(|| AppError::ServiceUnavailable("Webhook secret is not configured".to_string()))?;

    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::ValidationError("Missing signature header".to_string()))?;

    verify_signature(&body, header, secret, chrono::Utc::now().timestamp()).map_err(|e| {
        tracing::warn!("Rejected webhook: {}", e);
        AppError::ValidationError(format!("Invalid signature: {}", e))
    })?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::ValidationError(format!("Invalid event payload: {}", e)))?;

    tracing::info!("Received webhook {}: {} for {}", event.id, event.event_type, event.data.object.id);

    match event.kind() {
        EventKind::PaymentSucceeded => {
            if let Some(ride_id) = event.ride_id() {
                let updated = state
                    .repos
                    .rides
                    .apply_transition(&RideTransition::paid(ride_id, "card"))
                    .await?;
                match updated {
                    Some(_) => tracing::info!("Ride {} confirmed via webhook", ride_id),
                    None => tracing::info!("Ride {} was no longer pending, ignoring payment", ride_id),
                }
            }
            settle_order(&state, &event, OrderStatus::Paid).await?;
        }
        EventKind::PaymentFailed => settle_order(&state, &event, OrderStatus::Failed).await?,
        EventKind::CheckoutExpired => settle_order(&state, &event, OrderStatus::Cancelled).await?,
        EventKind::Ignored => tracing::debug!("Ignoring webhook type {}", event.event_type),
    }

    Ok(Json(json!({ "received": true })))
}

/// Move a pending bodega order; redeliveries find it already settled
async fn settle_order(state: &AppState, event: &WebhookEvent, to: OrderStatus) -> Result<(), AppError> {
    let Some(order_id) = event.order_id() else {
        return Ok(());
    };

    match state
        .repos
        .bodega
        .transition_order(order_id, OrderStatus::Pending, to)
        .await?
    {
        Some(_) => tracing::info!("Bodega order {} marked {} via webhook", order_id, to),
        None => tracing::info!("Bodega order {} not pending, leaving as is", order_id),
    }
    Ok(())
}
