use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use airbear_bodega::{price_cart, BodegaItem, BodegaOrder, CartLine, OrderStatus};
use airbear_core::payment::{CheckoutLine, CheckoutRequest};

use crate::{
    error::AppError,
    middleware::{ensure_caller_profile, AuthUser},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct BodegaCheckoutRequest {
    #[serde(default)]
    pub items: Vec<CartLine>,
}

#[derive(Debug, Serialize)]
pub struct BodegaCheckoutResponse {
    pub order_id: Uuid,
    pub total_cents: i64,
    pub checkout_url: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/bodega/items", get(list_items))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/bodega/checkout", post(checkout))
        .route("/bodega/orders/{id}", get(get_order))
}

async fn list_items(State(state): State<AppState>) -> Result<Json<Vec<BodegaItem>>, AppError> {
    Ok(Json(state.repos.bodega.list_active_items().await?))
}

/// POST /api/bodega/checkout
async fn checkout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<BodegaCheckoutRequest>, JsonRejection>,
) -> Result<Json<BodegaCheckoutResponse>, AppError> {
    let Json(req) = payload?;

    let catalog = state.repos.bodega.list_active_items().await?;
    let cart = price_cart(&catalog, &req.items)?;

    let payments = state
        .payments
        .clone()
        .ok_or_else(|| AppError::ServiceUnavailable("Payments are not configured".to_string()))?;

    ensure_caller_profile(&state, &user).await?;
    let order = BodegaOrder::new(user.id, cart);
    state.repos.bodega.create_order(&order).await?;

    let request = CheckoutRequest {
        lines: order
            .lines
            .iter()
            .map(|line| CheckoutLine {
                name: line.name.clone(),
                unit_amount_cents: line.unit_price_cents,
                quantity: line.quantity,
            })
            .collect(),
        currency: state.currency.clone(),
        success_url: format!("{}/bodega/success?order_id={}", state.public_url, order.id),
        cancel_url: format!("{}/bodega?cancelled={}", state.public_url, order.id),
        metadata: BTreeMap::from([
            ("order_id".to_string(), order.id.to_string()),
            ("user_id".to_string(), user.id.to_string()),
        ]),
        customer_email: user.email.clone(),
    };

    let session = match payments.create_checkout_session(&request).await {
        Ok(session) => session,
        Err(e) => {
            // never leave an unpayable order pending
            state
                .repos
                .bodega
                .transition_order(order.id, OrderStatus::Pending, OrderStatus::Failed)
                .await?;
            return Err(e.into());
        }
    };
    state.repos.bodega.set_checkout_session(order.id, &session.id).await?;

    tracing::info!("Bodega order {} for {} cents, session {}", order.id, order.total_cents, session.id);
    Ok(Json(BodegaCheckoutResponse {
        order_id: order.id,
        total_cents: order.total_cents,
        checkout_url: session.url,
    }))
}

/// GET /api/bodega/orders/:id
async fn get_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<BodegaOrder>, AppError> {
    match state.repos.bodega.get_order(id).await? {
        Some(order) if order.user_id == user.id => Ok(Json(order)),
        _ => Err(AppError::NotFoundError("Order not found".to_string())),
    }
}
