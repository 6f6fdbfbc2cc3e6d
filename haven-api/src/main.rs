use std::net::SocketAddr;
use std::sync::Arc;
use anyhow::Context;
use haven_api::{app, metrics::ApiMetrics, AppState, AuthConfig};
use haven_store::{app_config::Config, DbClient, PgSlotStore, RedisClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "haven_api=debug,haven_booking=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Haven API on port {}", config.server.port);

    let db = DbClient::new(&config.database).await.context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;
    let store = Arc::new(PgSlotStore::new(db.pool.clone()));

    let metrics = ApiMetrics::new().context("Failed to register metrics")?;
    let auth = AuthConfig {
        secret: config.auth.jwt_secret.clone(),
    };
    let mut state = AppState::new(store, &config.booking, auth, metrics);

    // Rate limiting is optional
    if let Some(redis_config) = &config.redis {
        match RedisClient::new(&redis_config.url) {
            Ok(client) => {
                state = state.with_rate_limit(Arc::new(client), redis_config.rate_limit_per_minute);
            }
            Err(e) => tracing::warn!("Redis disabled, rate limiting off: {}", e),
        }
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.context("Failed to bind")?;
    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}
