use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use polymarket_times::alerts::AlertFeed;
use polymarket_times::api::health::HealthState;
use polymarket_times::api::latency::LatencyStats;
use polymarket_times::api::routes::{router, ApiState};
use polymarket_times::backend;
use polymarket_times::config::Config;
use polymarket_times::error::Result;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Alert source (None = not configured, feed stays empty) ---
    info!("Alert backend: {}", cfg.backend_kind);
    let source = backend::from_config(&cfg).await?;

    let feed = AlertFeed::new(
        source,
        Arc::new(HealthState::new()),
        Arc::new(LatencyStats::new()),
    );

    // --- HTTP API server ---
    let app = router(ApiState {
        feed: Arc::new(feed),
    });
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
