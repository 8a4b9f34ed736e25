use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use airbear_core::{AirBear, LocationUpdate, StatusUpdate};

use crate::{
    error::AppError,
    middleware::{require_driver, AuthUser},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct LocationRequest {
    pub airbear_id: Option<Uuid>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub heading: Option<f64>,
    pub battery_level: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub airbear_id: Option<Uuid>,
    #[serde(flatten)]
    pub update: StatusUpdate,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/airbears", get(list_airbears))
        .route("/airbears/{id}", get(get_airbear))
}

pub fn driver_routes() -> Router<AppState> {
    Router::new()
        .route("/airbear/location", post(update_location))
        .route("/airbear/status", post(update_status))
}

async fn list_airbears(State(state): State<AppState>) -> Result<Json<Vec<AirBear>>, AppError> {
    Ok(Json(state.repos.airbears.list_airbears().await?))
}

async fn get_airbear(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AirBear>, AppError> {
    state
        .repos
        .airbears
        .get_airbear(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFoundError("AirBear not found".to_string()))
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::ValidationError(format!("{} is required", field)))
}

/// Only the driver assigned to `airbear_id` may report for it
async fn authorize_driver(state: &AppState, user: &AuthUser, airbear_id: Uuid) -> Result<(), AppError> {
    let profile = require_driver(state, user).await?;
    if !profile.drives(airbear_id) {
        tracing::warn!("Driver {} tried to report for AirBear {}", user.id, airbear_id);
        return Err(AppError::AuthorizationError(
            "Not assigned to this AirBear".to_string(),
        ));
    }
    Ok(())
}

/// POST /api/airbear/location
async fn update_location(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<LocationRequest>, JsonRejection>,
) -> Result<Json<AirBear>, AppError> {
    let Json(req) = payload?;
    let airbear_id = required(req.airbear_id, "airbear_id")?;
    let update = LocationUpdate {
        latitude: required(req.latitude, "latitude")?,
        longitude: required(req.longitude, "longitude")?,
        heading: req.heading,
        battery_level: req.battery_level,
    };
    update.validate()?;

    authorize_driver(&state, &user, airbear_id).await?;

    let airbear = state
        .repos
        .airbears
        .update_location(airbear_id, &update)
        .await?
        .ok_or_else(|| AppError::NotFoundError("AirBear not found".to_string()))?;

    tracing::debug!("AirBear {} at {:.5},{:.5}", airbear.id, airbear.latitude, airbear.longitude);
    Ok(Json(airbear))
}

/// POST /api/airbear/status
async fn update_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> Result<Json<AirBear>, AppError> {
    let Json(req) = payload?;
    let airbear_id = required(req.airbear_id, "airbear_id")?;
    req.update.validate()?;

    authorize_driver(&state, &user, airbear_id).await?;

    let airbear = state
        .repos
        .airbears
        .update_status(airbear_id, &req.update)
        .await?
        .ok_or_else(|| AppError::NotFoundError("AirBear not found".to_string()))?;

    tracing::info!(
        "AirBear {} available={} charging={}",
        airbear.id,
        airbear.is_available,
        airbear.is_charging
    );
    Ok(Json(airbear))
}
