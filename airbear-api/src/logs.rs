use axum::{
    extract::{ConnectInfo, Request, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;

use airbear_core::webhook::verify_signature;
use airbear_shared::{scrub_text, scrub_value};

use crate::{error::AppError, state::AppState};

pub const SIGNATURE_HEADER: &str = "x-airbear-signature";

const MAX_LOG_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClientLevel {
    Error,
    Warn,
    Info,
    Debug,
}

#[derive(Debug, Deserialize)]
pub struct ClientLog {
    pub level: ClientLevel,
    pub message: String,
    #[serde(default)]
    pub context: Option<Value>,
    pub url: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/logs", post(ingest))
}

/// Last `X-Forwarded-For` hop, else the socket peer.
///
/// The last hop is the one our edge proxy appended; anything before it is
/// whatever the client chose to send.
fn client_key(req: &Request) -> String {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.rsplit(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    match forwarded {
        Some(ip) => ip.to_string(),
        None => req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string()),
    }
}

/// POST /api/logs
async fn ingest(State(state): State<AppState>, req: Request) -> Result<Json<Value>, AppError> {
    let key = client_key(&req);
    if !state.log_limiter.check(&key) {
        return Err(AppError::RateLimited("Too many log submissions".to_string()));
    }

    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);

    let body = axum::body::to_bytes(req.into_body(), MAX_LOG_BYTES)
        .await
        .map_err(|_| AppError::ValidationError("Log payload too large".to_string()))?;

    if let Some(secret) = state.log_signing_secret.as_deref() {
        let header = signature
            .ok_or_else(|| AppError::AuthenticationError("Missing log signature".to_string()))?;
        verify_signature(&body, &header, secret, chrono::Utc::now().timestamp())
            .map_err(|e| AppError::AuthenticationError(format!("Invalid log signature: {}", e)))?;
    }

    let log: ClientLog = serde_json::from_slice(&body)
        .map_err(|e| AppError::ValidationError(format!("Invalid log payload: {}", e)))?;

    let message = scrub_text(&log.message);
    let url = log.url.as_deref().map(scrub_text).unwrap_or_default();
    let mut context = log.context.unwrap_or(Value::Null);
    scrub_value(&mut context);

    match log.level {
        ClientLevel::Error => tracing::error!(target: "client", url = %url, context = %context, "{}", message),
        ClientLevel::Warn => tracing::warn!(target: "client", url = %url, context = %context, "{}", message),
        ClientLevel::Info => tracing::info!(target: "client", url = %url, context = %context, "{}", message),
        ClientLevel::Debug => tracing::debug!(target: "client", url = %url, context = %context, "{}", message),
    }

    Ok(Json(json!({ "accepted": true })))
}
