use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub payments: PaymentsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Base URL used for checkout success / cancel redirects
    pub public_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Hosted auth base URL, e.g. https://<project>.supabase.co/auth/v1
    pub url: String,
    pub anon_key: String,
    pub jwt_secret: String,
    #[serde(default = "default_audience")]
    pub audience: String,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_cookie_max_age")]
    pub cookie_max_age_seconds: i64,
}

fn default_audience() -> String { "authenticated".to_string() }
fn default_cookie_name() -> String { "sb-access-token".to_string() }
fn default_cookie_max_age() -> i64 { 3600 }

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentsConfig {
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_api_base() -> String { "https://api.stripe.com".to_string() }
fn default_currency() -> String { "usd".to_string() }

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_rate_limit")]
    pub rate_limit: u32,
    #[serde(default = "default_window")]
    pub window_seconds: u64,
    pub signing_secret: Option<String>,
}

fn default_rate_limit() -> u32 { 30 }
fn default_window() -> u64 { 60 }

/// Treat an empty environment override the same as an absent key
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Environment file is optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `AIRBEAR__PAYMENTS__SECRET_KEY=sk_live_...`
            .add_source(config::Environment::with_prefix("AIRBEAR").separator("__"))
            .build()?;

        let config: Config = s.try_deserialize()?;
        config.validate()
    }

    /// Refuse to start without the secret that session tokens are checked against
    pub fn validate(self) -> Result<Self, config::ConfigError> {
        if self.jwt_secret().is_none() {
            return Err(config::ConfigError::Message(
                "auth.jwt_secret is not set (AIRBEAR__AUTH__JWT_SECRET)".to_string(),
            ));
        }
        Ok(self)
    }

    pub fn from_toml(contents: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(contents, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    pub fn jwt_secret(&self) -> Option<&str> {
        Some(self.auth.jwt_secret.trim()).filter(|v| !v.is_empty())
    }

    pub fn database_url(&self) -> Option<&str> {
        non_empty(&self.database.url)
    }

    pub fn payments_secret_key(&self) -> Option<&str> {
        non_empty(&self.payments.secret_key)
    }

    pub fn webhook_secret(&self) -> Option<&str> {
        non_empty(&self.payments.webhook_secret)
    }

    pub fn log_signing_secret(&self) -> Option<&str> {
        non_empty(&self.logging.signing_secret)
    }
}
