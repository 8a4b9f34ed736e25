use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use airbear_api::{app, AppState, Repositories};
use airbear_core::payment::PaymentAdapter;
use airbear_store::{app_config::Config, DbClient, GoTrueClient, MemoryStore, StripeClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "airbear_api=debug,airbear_store=info,client=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting AirBear API on port {}", config.server.port);

    let repos = match config.database_url() {
        Some(url) => {
            let db = DbClient::new(url, config.database.max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;
            Repositories::postgres(&db)
        }
        None => {
            tracing::warn!("No database configured, using the in-memory store");
            Repositories::memory(Arc::new(MemoryStore::new()))
        }
    };

    let identity = Arc::new(GoTrueClient::new(
        config.auth.url.clone(),
        config.auth.anon_key.clone(),
    ));

    let payments: Option<Arc<dyn PaymentAdapter>> = match config.payments_secret_key() {
        Some(key) => Some(Arc::new(StripeClient::new(
            key.to_string(),
            config.payments.api_base.clone(),
        ))),
        None => {
            tracing::warn!("No payment key configured, payment routes will answer 503");
            None
        }
    };
    if config.webhook_secret().is_none() {
        tracing::warn!("No webhook secret configured, webhooks will be rejected");
    }

    let app_state = AppState::new(&config, repos, identity, payments);
    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
