use axum::{
    extract::{rejection::JsonRejection, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};

use airbear_core::identity::{validate_credentials, AuthSession};
use airbear_core::{CoreError, Role, UserProfile};
use airbear_shared::Masked;

use crate::{error::AppError, middleware::AuthUser, state::AppState};

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: Masked<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: Masked<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub next: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserProfile,
    pub access_token: Option<Masked<String>>,
    pub expires_in: Option<u64>,
    /// Signup succeeded but the address must be confirmed before logging in
    pub requires_confirmation: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/callback", get(callback))
        .route("/auth/logout", post(logout))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(me))
}

fn session_cookie(state: &AppState, token: &str) -> Cookie<'static> {
    Cookie::build((state.auth.cookie_name.clone(), token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(state.auth.cookie_max_age_seconds))
        .build()
}

/// Only same-site relative paths are followed after a callback
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => path,
        _ => "/",
    }
}

/// Store the profile and attach the session cookie when tokens were issued
async fn finish_session(
    state: &AppState,
    jar: CookieJar,
    session: AuthSession,
    role: Role,
) -> Result<(CookieJar, AuthResponse), AppError> {
    let profile = state
        .repos
        .profiles
        .ensure_profile(&UserProfile::new(session.user.id, session.user.email.clone(), role))
        .await?;

    let jar = match &session.access_token {
        Some(token) => jar.add(session_cookie(state, token.expose())),
        None => jar,
    };

    let requires_confirmation = session.access_token.is_none();
    Ok((
        jar,
        AuthResponse {
            user: profile,
            access_token: session.access_token,
            expires_in: session.expires_in,
            requires_confirmation,
        },
    ))
}

async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let Json(req) = payload?;
    validate_credentials(&req.email, req.password.expose())?;

    // drivers are assigned by an operator, never self-declared
    let role = match req.role.as_deref() {
        Some(role) => role.parse::<Role>()?,
        None => Role::Rider,
    };
    if role != Role::Rider {
        return Err(AppError::AuthorizationError("Driver accounts are assigned by an operator".to_string()));
    }

    let session = state
        .identity
        .sign_up(req.email.trim(), req.password.expose())
        .await
        .map_err(|e| match e {
            // a rejected signup is the caller's problem, not a failed login
            CoreError::IdentityError(msg) => AppError::ValidationError(msg),
            other => other.into(),
        })?;

    tracing::info!("New {} account {}", role, session.user.id);
    let (jar, body) = finish_session(&state, jar, session, role).await?;
    Ok((jar, Json(body)))
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let Json(req) = payload?;
    if req.email.trim().is_empty() || req.password.expose().is_empty() {
        return Err(AppError::ValidationError("Email and password are required".to_string()));
    }

    let session = state.identity.sign_in(req.email.trim(), req.password.expose()).await?;
    let (jar, body) = finish_session(&state, jar, session, Role::Rider).await?;
    Ok((jar, Json(body)))
}

async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    let Some(code) = params.code.as_deref().filter(|c| !c.is_empty()) else {
        return Redirect::to("/auth/error").into_response();
    };

    let verifier_name = state.auth.verifier_cookie_name();
    let verifier = jar.get(&verifier_name).map(|c| c.value().to_string());

    let session = match state.identity.exchange_code(code, verifier.as_deref()).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!("Auth code exchange failed: {}", e);
            return Redirect::to("/auth/error").into_response();
        }
    };

    let jar = jar.remove(Cookie::build((verifier_name, "")).path("/"));
    match finish_session(&state, jar, session, Role::Rider).await {
        Ok((jar, _)) => (jar, Redirect::to(safe_next(params.next.as_deref()))).into_response(),
        Err(e) => {
            tracing::error!("Failed to finish callback session: {:?}", e);
            Redirect::to("/auth/error").into_response()
        }
    }
}

async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<serde_json::Value>) {
    let jar = jar.remove(Cookie::build((state.auth.cookie_name.clone(), "")).path("/"));
    (jar, Json(serde_json::json!({ "success": true })))
}

async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserProfile>, AppError> {
    let profile = state
        .repos
        .profiles
        .get_profile(user.id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Profile not found".to_string()))?;
    Ok(Json(profile))
}
