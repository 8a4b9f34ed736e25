use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use airbear_shared::Masked;

use crate::{CoreError, CoreResult};

pub const MIN_PASSWORD_LEN: usize = 6;

/// The user record the hosted auth service returns
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityUser {
    pub id: Uuid,
    pub email: Option<String>,
}

/// Result of a signup, login or code exchange.
///
/// Signups that need e-mail confirmation come back without tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: IdentityUser,
    pub access_token: Option<Masked<String>>,
    pub refresh_token: Option<Masked<String>>,
    pub expires_in: Option<u64>,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> CoreResult<AuthSession>;

    async fn sign_in(&self, email: &str, password: &str) -> CoreResult<AuthSession>;

    /// Exchange an OAuth / magic-link callback code for a session.
    /// `code_verifier` is the PKCE verifier stored when the flow started.
    async fn exchange_code(&self, code: &str, code_verifier: Option<&str>) -> CoreResult<AuthSession>;
}

pub fn validate_credentials(email: &str, password: &str) -> CoreResult<()> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
        _ => return Err(CoreError::ValidationError("A valid email is required".to_string())),
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CoreError::ValidationError(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials() {
        assert!(validate_credentials("rider@airbear.me", "secret1").is_ok());
        assert!(validate_credentials("rider", "secret1").is_err());
        assert!(validate_credentials("@airbear.me", "secret1").is_err());
        assert!(validate_credentials("rider@airbear.me", "short").is_err());
    }
}
