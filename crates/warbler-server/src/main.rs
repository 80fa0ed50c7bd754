mod config;

use std::sync::Arc;

use tracing::info;

use warbler_api::AppStateInner;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "warbler=debug,warbler_api=debug,warbler_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    let db = warbler_db::Database::open(&config.db_path)?;
    let state = Arc::new(AppStateInner {
        db,
        secret_key: config.secret_key,
        session_days: config.session_days,
    });

    let app = warbler_api::router(state);

    info!("Warbler listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Received Ctrl+C, shutting down...");
    }
}
