//! HTTP client for the EIA v2 API.

use async_trait::async_trait;
use outage_core::{Error, Result, Series};
use std::time::{Duration, Instant};
use telemetry::metrics;
use tracing::{debug, warn};
use url::Url;

use crate::config::FeedConfig;
use crate::page::{parse_page, Page, PageRequest};

/// Data columns requested from every series.
const DATA_COLUMNS: [&str; 3] = ["capacity", "outage", "percentOutage"];

/// Longest response excerpt carried in an error message.
const ERROR_BODY_EXCERPT: usize = 200;

/// Source of feed pages.
///
/// Implemented by `EiaClient` for production and by in-memory mocks in tests.
#[async_trait]
pub trait FeedClient: Send + Sync {
    /// Fetch one page. Any non-2xx response or undecodable body is an error.
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page>;

    /// Check that the feed is reachable.
    async fn ping(&self) -> bool {
        true
    }
}

/// EIA v2 nuclear-outages client.
#[derive(Clone)]
pub struct EiaClient {
    http: reqwest::Client,
    base_url: Url,
    config: FeedConfig,
}

impl EiaClient {
    /// Creates a new client. The base URL is normalised to end with `/`.
    pub fn new(config: FeedConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.base_url)
            .map_err(|e| Error::config(format!("invalid feed base_url {}: {}", config.base_url, e)))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            config,
        })
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// `<base>/<series route>/data/`
    pub fn endpoint(&self, series: Series) -> Result<Url> {
        self.base_url
            .join(&format!("{}/data/", series.route()))
            .map_err(|e| Error::config(format!("invalid feed route: {}", e)))
    }

    /// Query string for one page request.
    pub fn query_params(&self, request: &PageRequest) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(12);
        if let Some(ref key) = self.config.api_key {
            params.push(("api_key".to_string(), key.clone()));
        }
        params.push(("frequency".to_string(), self.config.frequency.clone()));
        for (i, column) in DATA_COLUMNS.iter().enumerate() {
            params.push((format!("data[{}]", i), column.to_string()));
        }
        params.push(("start".to_string(), request.window.start_param()));
        params.push(("end".to_string(), request.window.end_param()));
        params.push(("sort[0][column]".to_string(), "period".to_string()));
        params.push(("sort[0][direction]".to_string(), "desc".to_string()));
        params.push(("offset".to_string(), request.offset.to_string()));
        params.push(("length".to_string(), request.length.to_string()));
        params
    }
}

#[async_trait]
impl FeedClient for EiaClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page> {
        let url = self.endpoint(request.series)?;
        let start = Instant::now();

        debug!(
            series = %request.series,
            offset = request.offset,
            length = request.length,
            window = %request.window,
            "Requesting feed page"
        );

        let response = self
            .http
            .get(url)
            .query(&self.query_params(request))
            .send()
            .await
            .map_err(|e| {
                metrics().fetch_errors.inc();
                Error::transient_fetch(format!("feed request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            metrics().fetch_errors.inc();
            let body = response.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(ERROR_BODY_EXCERPT).collect();
            warn!(status = %status, body = %excerpt, "Feed returned error status");
            return Err(Error::http_status(
                status.as_u16(),
                format!("feed returned {}: {}", status, excerpt),
            ));
        }

        let body = response.bytes().await.map_err(|e| {
            metrics().fetch_errors.inc();
            Error::transient_fetch(format!("failed to read feed body: {}", e))
        })?;

        let page = parse_page(&body, request).inspect_err(|_| {
            metrics().fetch_errors.inc();
        })?;

        metrics().fetch_latency_ms.observe(start.elapsed().as_millis() as u64);
        metrics().pages_fetched.inc();
        metrics().records_fetched.inc_by(page.len() as u64);

        Ok(page)
    }

    async fn ping(&self) -> bool {
        let mut request = self.http.get(self.base_url.clone());
        if let Some(ref key) = self.config.api_key {
            request = request.query(&[("api_key", key)]);
        }
        match request.send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!(error = %e, "Feed ping failed");
                false
            }
        }
    }
}
