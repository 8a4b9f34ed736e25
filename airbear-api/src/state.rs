use std::sync::Arc;
use std::time::Duration;

use airbear_core::identity::AuthProvider;
use airbear_core::payment::PaymentAdapter;
use airbear_core::repository::{
    AirBearRepository, BodegaRepository, HealthCheck, ProfileRepository, RideRepository, SpotRepository,
};
use airbear_shared::RateLimiter;
use airbear_store::app_config::Config;
use airbear_store::{
    DbClient, MemoryStore, StoreAirBearRepository, StoreBodegaRepository, StoreProfileRepository,
    StoreRideRepository, StoreSpotRepository,
};

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub audience: String,
    pub cookie_name: String,
    pub cookie_max_age_seconds: i64,
}

impl AuthConfig {
    /// Cookie holding the PKCE verifier set by the client when a sign-in flow starts
    pub fn verifier_cookie_name(&self) -> String {
        format!("{}-code-verifier", self.cookie_name)
    }
}

/// Data access handles, backed either by Postgres or by the in-memory store
#[derive(Clone)]
pub struct Repositories {
    pub rides: Arc<dyn RideRepository>,
    pub airbears: Arc<dyn AirBearRepository>,
    pub spots: Arc<dyn SpotRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub bodega: Arc<dyn BodegaRepository>,
    pub health: Arc<dyn HealthCheck>,
}

impl Repositories {
    pub fn postgres(db: &DbClient) -> Self {
        Self {
            rides: Arc::new(StoreRideRepository::new(db.pool.clone())),
            airbears: Arc::new(StoreAirBearRepository::new(db.pool.clone())),
            spots: Arc::new(StoreSpotRepository::new(db.pool.clone())),
            profiles: Arc::new(StoreProfileRepository::new(db.pool.clone())),
            bodega: Arc::new(StoreBodegaRepository::new(db.pool.clone())),
            health: Arc::new(db.clone()),
        }
    }

    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            rides: store.clone(),
            airbears: store.clone(),
            spots: store.clone(),
            profiles: store.clone(),
            bodega: store.clone(),
            health: store,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
    pub identity: Arc<dyn AuthProvider>,
    /// `None` when no processor key is configured
    pub payments: Option<Arc<dyn PaymentAdapter>>,
    pub auth: AuthConfig,
    pub webhook_secret: Option<String>,
    pub log_limiter: Arc<RateLimiter>,
    pub log_signing_secret: Option<String>,
    pub public_url: String,
    pub currency: String,
}

impl AppState {
    pub fn new(
        config: &Config,
        repos: Repositories,
        identity: Arc<dyn AuthProvider>,
        payments: Option<Arc<dyn PaymentAdapter>>,
    ) -> Self {
        Self {
            repos,
            identity,
            payments,
            auth: AuthConfig {
                jwt_secret: config.auth.jwt_secret.clone(),
                audience: config.auth.audience.clone(),
                cookie_name: config.auth.cookie_name.clone(),
                cookie_max_age_seconds: config.auth.cookie_max_age_seconds,
            },
            webhook_secret: config.webhook_secret().map(str::to_string),
            log_limiter: Arc::new(RateLimiter::new(
                config.logging.rate_limit,
                Duration::from_secs(config.logging.window_seconds),
            )),
            log_signing_secret: config.log_signing_secret().map(str::to_string),
            public_url: config.server.public_url.trim_end_matches('/').to_string(),
            currency: config.payments.currency.clone(),
        }
    }
}
