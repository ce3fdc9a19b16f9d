use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use feira_api::{
    app,
    state::{AppState, AuthConfig, RulesConfig},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "feira_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = feira_store::app_config::Config::load().context("Failed to load config")?;
    tracing::info!("Starting Feira API on port {}", config.server.port);

    let db = feira_store::DbClient::new(&config.database.url)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;

    let redis_client = feira_store::RedisClient::new(&config.redis.url)
        .await
        .context("Failed to connect to Redis")?;

    let order_repo = Arc::new(feira_store::StoreOrderRepository::new(db.pool.clone()));

    let app_state = AppState {
        catalog: Arc::new(feira_store::StoreProductCatalog::new(db.pool.clone())),
        quotes: Arc::new(feira_store::StoreQuoteRepository::new(db.pool.clone())),
        orders: order_repo.clone(),
        acceptance: order_repo,
        payments: Arc::new(feira_store::StorePaymentRepository::new(db.pool.clone())),
        rate: Arc::new(redis_client),
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
        rules: RulesConfig {
            default_quote_validity_hours: config.business_rules.default_quote_validity_hours,
            pix_expiration_minutes: config.business_rules.pix_expiration_minutes,
            sweep_interval_seconds: config.business_rules.sweep_interval_seconds,
            rate_limit_per_minute: config.business_rules.rate_limit_per_minute,
        },
    };

    tokio::spawn(feira_api::sweeper::run(app_state.clone()));

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind listener")?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}
