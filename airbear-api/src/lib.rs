use axum::{http::Method, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod airbears;
pub mod auth;
pub mod bodega;
pub mod error;
pub mod health;
pub mod logs;
pub mod middleware;
pub mod payments;
pub mod rides;
pub mod spots;
pub mod state;
pub mod webhooks;

pub use state::{AppState, Repositories};

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
            axum::http::HeaderName::from_static(logs::SIGNATURE_HEADER),
        ]);

    let public = Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(spots::routes())
        .merge(airbears::routes())
        .merge(bodega::routes())
        .merge(webhooks::routes())
        .merge(logs::routes());

    let protected = Router::new()
        .merge(auth::protected_routes())
        .merge(rides::routes())
        .merge(airbears::driver_routes())
        .merge(bodega::protected_routes())
        .merge(payments::routes())
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::user_auth_middleware,
        ));

    Router::new()
        .nest("/api", public.merge(protected))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
