use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use airbear_core::identity::{AuthProvider, AuthSession, IdentityUser};
use airbear_core::{CoreError, CoreResult};
use airbear_shared::Masked;

/// Client for the hosted identity service's REST endpoints
pub struct GoTrueClient {
    base_url: String,
    anon_key: Masked<String>,
    client: reqwest::Client,
}

/// Signups that need e-mail confirmation return the bare user instead of a session
#[derive(Deserialize)]
#[serde(untagged)]
enum TokenResponse {
    Session {
        access_token: String,
        refresh_token: Option<String>,
        expires_in: Option<u64>,
        user: IdentityUser,
    },
    User(IdentityUser),
}

impl From<TokenResponse> for AuthSession {
    fn from(response: TokenResponse) -> Self {
        match response {
            TokenResponse::Session { access_token, refresh_token, expires_in, user } => AuthSession {
                user,
                access_token: Some(Masked(access_token)),
                refresh_token: refresh_token.map(Masked),
                expires_in,
            },
            TokenResponse::User(user) => AuthSession {
                user,
                access_token: None,
                refresh_token: None,
                expires_in: None,
            },
        }
    }
}

/// Pull a human readable message out of the service's several error shapes
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

impl GoTrueClient {
    pub fn new(base_url: String, anon_key: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: Masked(anon_key),
            client: reqwest::Client::new(),
        }
    }

    async fn post(&self, path: &str, body: Value) -> CoreResult<AuthSession> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("apikey", self.anon_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::UpstreamError(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CoreError::UpstreamError(e.to_string()))?;

        if status.is_client_error() {
            let message = error_message(&text).unwrap_or_else(|| "Authentication failed".to_string());
            warn!("Identity service rejected {}: {}", path, message);
            return Err(CoreError::IdentityError(message));
        }
        if !status.is_success() {
            return Err(CoreError::UpstreamError(format!(
                "Identity service returned HTTP {}",
                status.as_u16()
            )));
        }

        let parsed: TokenResponse =
            serde_json::from_str(&text).map_err(|e| CoreError::UpstreamError(e.to_string()))?;
        Ok(parsed.into())
    }
}

#[async_trait]
impl AuthProvider for GoTrueClient {
    async fn sign_up(&self, email: &str, password: &str) -> CoreResult<AuthSession> {
        self.post("/signup", json!({ "email": email, "password": password })).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> CoreResult<AuthSession> {
        self.post(
            "/token?grant_type=password",
            json!({ "email": email, "password": password }),
        )
        .await
    }

    async fn exchange_code(&self, code: &str, code_verifier: Option<&str>) -> CoreResult<AuthSession> {
        self.post(
            "/token?grant_type=pkce",
            json!({ "auth_code": code, "code_verifier": code_verifier }),
        )
        .await
    }
}
