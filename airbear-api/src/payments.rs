use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use airbear_core::payment::{CheckoutLine, CheckoutRequest, IntentRequest, PaymentAdapter};
use airbear_ride::{Ride, RideError, RideStatus};
use airbear_shared::Masked;

use crate::{error::AppError, middleware::AuthUser, state::AppState};

#[derive(Debug, Deserialize)]
pub struct RidePaymentRequest {
    pub ride_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct IntentResponse {
    pub payment_intent_id: String,
    pub client_secret: Option<Masked<String>>,
    pub amount_cents: i64,
    pub currency: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payments/intent", post(create_intent))
        .route("/payments/checkout", post(create_checkout))
}

/// The caller's ride, still waiting for payment
async fn payable_ride(
    state: &AppState,
    user: &AuthUser,
    payload: Result<Json<RidePaymentRequest>, JsonRejection>,
) -> Result<(Ride, Arc<dyn PaymentAdapter>), AppError> {
    let Json(req) = payload?;
    let ride_id = req
        .ride_id
        .ok_or_else(|| AppError::ValidationError("ride_id is required".to_string()))?;

    let payments = state
        .payments
        .clone()
        .ok_or_else(|| AppError::ServiceUnavailable("Payments are not configured".to_string()))?;

    let ride = match state.repos.rides.get_ride(ride_id).await? {
        Some(ride) if ride.user_id == user.id => ride,
        _ => return Err(RideError::NotFound(ride_id).into()),
    };
    if ride.status != RideStatus::Pending {
        return Err(RideError::AlreadyProcessed.into());
    }

    Ok((ride, payments))
}

fn ride_metadata(ride: &Ride) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("ride_id".to_string(), ride.id.to_string()),
        ("user_id".to_string(), ride.user_id.to_string()),
    ])
}

/// POST /api/payments/intent
async fn create_intent(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<RidePaymentRequest>, JsonRejection>,
) -> Result<Json<IntentResponse>, AppError> {
    let (ride, payments) = payable_ride(&state, &user, payload).await?;

    let intent = payments
        .create_intent(&IntentRequest {
            amount_cents: ride.fare_cents(),
            currency: state.currency.clone(),
            description: format!("AirBear ride {}", ride.id),
            metadata: ride_metadata(&ride),
            receipt_email: user.email.clone(),
        })
        .await?;

    tracing::info!("Payment intent {} for ride {}", intent.id, ride.id);
    Ok(Json(IntentResponse {
        payment_intent_id: intent.id,
        client_secret: intent.client_secret,
        amount_cents: intent.amount_cents,
        currency: intent.currency,
    }))
}

/// POST /api/payments/checkout
async fn create_checkout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<RidePaymentRequest>, JsonRejection>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let (ride, payments) = payable_ride(&state, &user, payload).await?;

    let session = payments
        .create_checkout_session(&CheckoutRequest {
            lines: vec![CheckoutLine {
                name: "AirBear ride".to_string(),
                unit_amount_cents: ride.fare_cents(),
                quantity: 1,
            }],
            currency: state.currency.clone(),
            success_url: format!("{}/rides/{}?paid=1", state.public_url, ride.id),
            cancel_url: format!("{}/rides/{}", state.public_url, ride.id),
            metadata: ride_metadata(&ride),
            customer_email: user.email.clone(),
        })
        .await?;

    tracing::info!("Checkout session {} for ride {}", session.id, ride.id);
    Ok(Json(CheckoutResponse {
        session_id: session.id,
        url: session.url,
    }))
}
