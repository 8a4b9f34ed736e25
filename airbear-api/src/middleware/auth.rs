use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use airbear_core::{Role, UserProfile};

use crate::error::AppError;
use crate::state::{AppState, AuthConfig};

/// Access-token claims issued by the hosted auth service
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub email: Option<String>,
    pub aud: String,
    pub role: Option<String>,
    pub exp: usize,
}

/// The authenticated caller, inserted into request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
}

pub fn decode_token(token: &str, auth: &AuthConfig) -> Result<AuthUser, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[auth.audience.as_str()]);

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(auth.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!("Rejected access token: {}", e);
        AppError::AuthenticationError("Invalid or expired token".to_string())
    })?;

    let id = Uuid::parse_str(&token_data.claims.sub)
        .map_err(|_| AppError::AuthenticationError("Invalid token subject".to_string()))?;

    Ok(AuthUser {
        id,
        email: token_data.claims.email,
    })
}

/// Bearer header first, then the session cookie
fn extract_token(req: &Request, cookie_name: &str) -> Option<String> {
    let bearer = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    CookieJar::from_headers(req.headers())
        .get(cookie_name)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
}

pub async fn user_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(&req, &state.auth.cookie_name)
        .ok_or_else(|| AppError::AuthenticationError("Authentication required".to_string()))?;

    let user = decode_token(&token, &state.auth)?;
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

/// Load the caller's profile and insist on the driver role
pub async fn require_driver(state: &AppState, user: &AuthUser) -> Result<UserProfile, AppError> {
    match state.repos.profiles.get_profile(user.id).await? {
        Some(profile) if profile.role == Role::Driver => Ok(profile),
        _ => Err(AppError::AuthorizationError("Driver access required".to_string())),
    }
}

/// Create a rider profile for callers who signed in before one existed
pub async fn ensure_caller_profile(state: &AppState, user: &AuthUser) -> Result<UserProfile, AppError> {
    let profile = UserProfile::new(user.id, user.email.clone(), Role::Rider);
    Ok(state.repos.profiles.ensure_profile(&profile).await?)
}
