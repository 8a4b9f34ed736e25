use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use airbear_ride::{authorize, Ride, RideAction, RideError, RideRequest};

use crate::{
    error::AppError,
    middleware::{ensure_caller_profile, require_driver, AuthUser},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub payment_method: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rides", get(list_rides).post(create_ride))
        .route("/rides/pending", get(list_pending))
        .route("/rides/{id}", get(get_ride))
        .route("/rides/{id}/confirm", post(confirm_ride))
        .route("/rides/{id}/accept", post(accept_ride))
        .route("/rides/{id}/start", post(start_ride))
        .route("/rides/{id}/complete", post(complete_ride))
        .route("/rides/{id}/cancel", post(cancel_ride))
}

/// POST /api/rides
async fn create_ride(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<RideRequest>, JsonRejection>,
) -> Result<Json<Ride>, AppError> {
    let Json(req) = payload?;
    let draft = req.validate()?;

    for spot_id in [draft.pickup_spot_id, draft.dropoff_spot_id] {
        match state.repos.spots.get_spot(spot_id).await? {
            Some(spot) if spot.is_active => {}
            _ => return Err(AppError::ValidationError(format!("Unknown spot: {}", spot_id))),
        }
    }

    ensure_caller_profile(&state, &user).await?;

    let airbear = state.repos.airbears.claim_available().await?;
    let ride = Ride::new(user.id, &draft, airbear.as_ref().map(|a| a.id));

    if let Err(e) = state.repos.rides.create_ride(&ride).await {
        if let Some(airbear) = &airbear {
            if let Err(release_err) = state.repos.airbears.release(airbear.id).await {
                tracing::error!("Failed to release AirBear {} after booking error: {}", airbear.id, release_err);
            }
        }
        return Err(e.into());
    }

    match &airbear {
        Some(a) => tracing::info!("Ride {} booked with AirBear {}", ride.id, a.id),
        None => tracing::info!("Ride {} booked without an available AirBear", ride.id),
    }
    Ok(Json(ride))
}

/// GET /api/rides
async fn list_rides(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Ride>>, AppError> {
    Ok(Json(state.repos.rides.list_rides_for_user(user.id).await?))
}

/// GET /api/rides/pending
async fn list_pending(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Ride>>, AppError> {
    require_driver(&state, &user).await?;
    Ok(Json(state.repos.rides.list_pending_rides().await?))
}

/// GET /api/rides/:id
async fn get_ride(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, AppError> {
    match state.repos.rides.get_ride(id).await? {
        Some(ride) if ride.is_visible_to(user.id) => Ok(Json(ride)),
        _ => Err(RideError::NotFound(id).into()),
    }
}

async fn confirm_ride(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    payload: Result<Json<ConfirmRequest>, JsonRejection>,
) -> Result<Json<Ride>, AppError> {
    let Json(req) = payload?;
    let payment_method = req
        .payment_method
        .ok_or_else(|| AppError::ValidationError("payment_method is required".to_string()))?;

    run_action(&state, &user, id, RideAction::Confirm { payment_method }).await
}

async fn accept_ride(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, AppError> {
    run_action(&state, &user, id, RideAction::Accept).await
}

async fn start_ride(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, AppError> {
    run_action(&state, &user, id, RideAction::Start).await
}

async fn complete_ride(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, AppError> {
    run_action(&state, &user, id, RideAction::Complete).await
}

async fn cancel_ride(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, AppError> {
    run_action(&state, &user, id, RideAction::Cancel).await
}

/// Authorize `action` against the stored ride and apply it as a guarded update
async fn run_action(
    state: &AppState,
    user: &AuthUser,
    ride_id: Uuid,
    action: RideAction,
) -> Result<Json<Ride>, AppError> {
    if matches!(action, RideAction::Accept | RideAction::Start | RideAction::Complete) {
        require_driver(state, user).await?;
    }

    let ride = state
        .repos
        .rides
        .get_ride(ride_id)
        .await?
        .ok_or(RideError::NotFound(ride_id))?;

    let transition = authorize(&ride, user.id, &action)?;

    // another writer moved the ride between our read and this update
    let updated = state
        .repos
        .rides
        .apply_transition(&transition)
        .await?
        .ok_or(RideError::AlreadyProcessed)?;

    if action.releases_vehicle() {
        if let Some(airbear_id) = updated.airbear_id {
            if let Err(e) = state.repos.airbears.release(airbear_id).await {
                tracing::error!("Ride {} is {} but AirBear {} was not released: {}", updated.id, updated.status, airbear_id, e);
            }
        }
    }

    tracing::info!("Ride {} {} by {} -> {}", updated.id, action.name(), user.id, updated.status);
    Ok(Json(updated))
}
