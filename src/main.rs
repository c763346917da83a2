use holdings_sync::config::Settings;
use holdings_sync::handlers::router;
use holdings_sync::{
    ConnectivityMonitor, HttpRemoteSource, PortfolioAggregator, SqliteHoldingCache, SyncEngine,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set the log level based on the first argument
    let args: Vec<String> = std::env::args().collect();
    let mut log_level = Level::INFO;
    if args.len() >= 2 {
        log_level = match args[1].as_str() {
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .with_max_level(log_level)
        .init();

    tracing::info!("Log level set to: {}", log_level);

    // Initalize dotenv so we can read .env file
    dotenv::dotenv().ok();

    let settings = Settings::from_env().map_err(|e| {
        tracing::error!("Invalid configuration: {}", e);
        e
    })?;

    let cache = SqliteHoldingCache::open(&settings.cache_path)?;
    tracing::info!("Holdings cache at {}", settings.cache_path.display());

    let remote = HttpRemoteSource::new(settings.holdings_url.clone(), settings.request_timeout);
    let network = ConnectivityMonitor::spawn(
        settings.probe_target.clone(),
        settings.probe_interval,
        PROBE_TIMEOUT,
    );

    let engine = SyncEngine::new(Arc::new(cache), Arc::new(remote));
    let aggregator = Arc::new(PortfolioAggregator::new(engine, Arc::new(network)));
    aggregator.start();

    let app = router(aggregator.clone(), &settings.frontend_url);

    // Run server
    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("Listening on: {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    // Last handle: releases the connectivity probe and any in-flight sync.
    drop(aggregator);

    Ok(())
}
