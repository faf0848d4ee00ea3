//! Pasar Commerce - Marketplace Backend

use anyhow::Result;
use pasar_commerce::{router, AppConfig, AppState};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let config = AppConfig::from_env()?;
    let db = PgPoolOptions::new().max_connections(config.database_max_connections).connect(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let nats = match &config.nats_url {
        Some(url) => async_nats::connect(url.as_str()).await
            .map_err(|e| tracing::warn!(error = %e, "NATS unavailable, push notifications disabled"))
            .ok(),
        None => None,
    };

    let addr = config.bind_addr();
    let app = router(AppState::new(db, nats, config));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Pasar Commerce listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
