//! Nuclear outage pipeline
//!
//! Incremental ingestion and scheduled analytics:
//! - Watermark-driven paginated fetch from the EIA feed
//! - Deduplicated persistence in ClickHouse
//! - Daily recompute of decomposition, severity clusters and forecast

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use validator::Validate;

use api::{router, AppState};
use clickhouse_client::{ClickHouseClient, ClickHouseConfig, ClickHouseStore};
use feed::{EiaClient, FeedClient, FeedConfig, PaginatedFetcher};
use outage_core::OutageStore;
use telemetry::{health, init_tracing_from_env};
use worker::{
    default_time_of_day, AnalyticsConfig, AnalyticsScheduler, ArtifactStore, HistoryLog, IngestionWorker, Loader,
    PipelineJob, RecomputeJob, ScheduleSource, SchedulerConfig, WatermarkTracker,
};

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    #[serde(default)]
    feed: FeedConfig,

    #[serde(default)]
    clickhouse: ClickHouseConfig,

    #[serde(default)]
    analytics: AnalyticsConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            feed: FeedConfig::default(),
            clickhouse: ClickHouseConfig::default(),
            analytics: AnalyticsConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting outage pipeline v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    config.feed.validate().context("Invalid feed configuration")?;

    info!(
        feed = %config.feed.base_url,
        api_key = if config.feed.api_key.is_some() { "set" } else { "none" },
        clickhouse = %config.clickhouse.url,
        database = %config.clickhouse.database,
        "Loaded config"
    );

    let clickhouse = ClickHouseClient::new(config.clickhouse.clone()).context("Failed to create ClickHouse client")?;

    // Tables may already exist; a failure here shows up again on first use.
    if let Err(e) = clickhouse_client::health::init_schema(&clickhouse).await {
        error!("Failed to initialize ClickHouse schema: {}", e);
    }

    let store: Arc<dyn OutageStore> = Arc::new(ClickHouseStore::new(clickhouse.clone()));
    let feed: Arc<dyn FeedClient> =
        Arc::new(EiaClient::new(config.feed.clone()).context("Failed to create feed client")?);

    check_health(&clickhouse, feed.as_ref()).await;

    let fetcher = PaginatedFetcher::new(feed.clone(), config.feed.page_size, config.feed.max_pages);
    let tracker = WatermarkTracker::new(store.clone(), config.feed.epoch);
    let ingestion = IngestionWorker::new(fetcher, tracker, Loader::new(store.clone()));

    let artifacts = ArtifactStore::new(&config.analytics.artifact_dir);
    let recompute = RecomputeJob::new(store.clone(), artifacts, config.analytics.series);
    let job = Arc::new(PipelineJob::new(
        ingestion.clone(),
        recompute.clone(),
        config.analytics.ingest_before_recompute,
    ));

    let cancel = CancellationToken::new();
    let scheduler = AnalyticsScheduler::new(
        SchedulerConfig {
            retry_backoff: config.analytics.retry_backoff(),
            max_retries: config.analytics.max_retries,
            run_at_startup: config.analytics.run_at_startup,
        },
        job,
        ScheduleSource::new(
            &config.analytics.schedule_file,
            default_time_of_day(&config.analytics.default_time),
        ),
        HistoryLog::new(&config.analytics.history_log),
        cancel.clone(),
    );
    let scheduler_handle = scheduler.start();

    let app = router(AppState::new(ingestion, recompute, store));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down...");

    cancel.cancel();
    if let Err(e) = scheduler_handle.await {
        error!("Scheduler task ended abnormally: {}", e);
    }

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        .add_source(config::Config::try_from(&Config::default())?)
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("OUTAGES")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Nested keys with underscores do not survive the "__" separator, so the
    // common ones are read directly.
    if let Ok(key) = std::env::var("OUTAGES_FEED_API_KEY") {
        config.feed.api_key = Some(key);
    }
    if let Ok(url) = std::env::var("OUTAGES_FEED_BASE_URL") {
        config.feed.base_url = url;
    }

    if let Ok(url) = std::env::var("OUTAGES_CLICKHOUSE_URL") {
        config.clickhouse.url = url;
    }
    if let Ok(database) = std::env::var("OUTAGES_CLICKHOUSE_DATABASE") {
        config.clickhouse.database = database;
    }
    if let Ok(username) = std::env::var("OUTAGES_CLICKHOUSE_USERNAME") {
        config.clickhouse.username = Some(username);
    }
    if let Ok(password) = std::env::var("OUTAGES_CLICKHOUSE_PASSWORD") {
        config.clickhouse.password = Some(password);
    }

    if let Ok(path) = std::env::var("OUTAGES_ANALYTICS_SCHEDULE_FILE") {
        config.analytics.schedule_file = path.into();
    }
    if let Ok(path) = std::env::var("OUTAGES_ANALYTICS_ARTIFACT_DIR") {
        config.analytics.artifact_dir = path.into();
    }
    if let Ok(path) = std::env::var("OUTAGES_ANALYTICS_HISTORY_LOG") {
        config.analytics.history_log = path.into();
    }

    Ok(config)
}

/// Check component health on startup.
async fn check_health(clickhouse: &ClickHouseClient, feed: &dyn FeedClient) {
    let ch_healthy = clickhouse_client::health::check_connection(clickhouse).await;
    if ch_healthy {
        health().clickhouse.set_healthy();
        info!("ClickHouse connection: healthy");
    } else {
        health().clickhouse.set_unhealthy("Connection failed");
        error!("ClickHouse connection: unhealthy");
    }

    let feed_healthy = feed::health::check_connection(feed).await;
    if feed_healthy {
        health().feed.set_healthy();
        info!("Feed connection: healthy");
    } else {
        health().feed.set_unhealthy("Connection failed");
        error!("Feed connection: unhealthy");
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
