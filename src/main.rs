use rentalhub_recovery::api::build_router;
use rentalhub_recovery::bootstrap;
use rentalhub_recovery::config::Config;
use rentalhub_recovery::database::Database;
use rentalhub_recovery::infrastructure::observability;
use std::net::SocketAddr;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    observability::init(&config)?;
    tracing::info!("Configuration loaded");

    // Initialize database connection
    let db = Database::connect_with_timeout(
        &config.store.database_url,
        Duration::from_millis(config.store.store_timeout_ms),
    )
    .await?;
    tracing::info!("Database connection established");

    // Run migrations
    db.run_migrations().await?;
    tracing::info!("Database migrations applied");

    // Build application state (and start the reaper)
    let state = bootstrap::build_app_state(db, &config).await?;

    let app = build_router(state);

    // Start server
    let addr: SocketAddr = config.server_address().parse()?;
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
