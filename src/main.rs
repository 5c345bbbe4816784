// Initialize configuration
// Set up logging
// Create database connection pool
// Create the Blockchair client and wallet service
// Start address polling task (optional)
// Start HTTP server

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wallet_sync_service::{
    api, blockchain, config::Config, db, state::AppState, BlockchairClient, SqliteLedger, WalletService,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting wallet-sync-service");

    let config = Config::from_env();
    tracing::info!(
        "Configuration loaded: provider {}, database {}, gap policy {:?}",
        config.blockchair_url, config.database_url, config.gap_policy
    );

    let db_pool = db::connection::establish_connection(&config.database_url).await?;
    tracing::info!("Database connection established");

    let shutdown = CancellationToken::new();
    let provider = Arc::new(BlockchairClient::new(&config)?);
    let ledger = Arc::new(SqliteLedger::new(db_pool));
    let service = Arc::new(WalletService::new(&config, provider, ledger, shutdown.clone()));

    let polling_handle = config.poll_interval.map(|poll_interval| {
        let polling_service = service.clone();
        let polling_shutdown = shutdown.clone();
        tokio::spawn(async move {
            blockchain::start_polling(polling_service, poll_interval, polling_shutdown).await;
        })
    });

    let app_state = Arc::new(AppState {
        config: config.clone(),
        service,
    });
    let app = api::create_router(app_state);

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown signal received");
            }
            server_shutdown.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Some(handle) = polling_handle {
        let _ = handle.await;
    }

    Ok(())
}
