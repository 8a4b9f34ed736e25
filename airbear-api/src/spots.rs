use axum::{extract::State, routing::get, Json, Router};

use airbear_core::Spot;

use crate::{error::AppError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/spots", get(list_spots))
}

async fn list_spots(State(state): State<AppState>) -> Result<Json<Vec<Spot>>, AppError> {
    Ok(Json(state.repos.spots.list_active_spots().await?))
}
