use prometheus_parse::{Scrape, Value};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use crate::client;
use crate::config::ClientConfig;
use crate::metrics::RequestTimer;
use crate::models::ScrapedSample;
use crate::{AdapterError, Result};

pub const DEFAULT_SCRAPE_INTERVAL: Duration = Duration::from_secs(1);

/// Numeric reading of a parsed sample. Histograms and summaries carry no
/// single scalar and read as `0.0`.
pub fn sample_value(value: &Value) -> f64 {
    match value {
        Value::Gauge(v) => *v,
        Value::Counter(v) => *v,
        Value::Untyped(v) => *v,
        _ => 0.0,
    }
}

pub fn parse_exposition(text: &str) -> Result<Scrape> {
    Scrape::parse(text.lines().map(|l| Ok(l.to_string())))
        .map_err(|e| AdapterError::Query(format!("Failed to parse exposition: {}", e)))
}

/// Value of the first sample named `metric`.
pub fn extract(scrape: &Scrape, metric: &str) -> Result<f64> {
    scrape
        .samples
        .iter()
        .find(|sample| sample.metric == metric)
        .map(|sample| sample_value(&sample.value))
        .ok_or_else(|| AdapterError::MetricNotFound(metric.to_string()))
}

pub async fn fetch_exposition(config: &ClientConfig) -> Result<String> {
    let response = config
        .http_client()?
        .get(&config.endpoint)
        .send()
        .await?
        .error_for_status()?;
    Ok(response.text().await?)
}

/// Fetches the endpoint's exposition text and returns the current value of
/// `metric`.
pub fn scrape(config: &ClientConfig, metric: &str) -> Result<f64> {
    let timer = RequestTimer::new("scrape");
    debug!(endpoint = %config.endpoint, metric, "scrape");

    let result = client::runtime()?
        .block_on(fetch_exposition(config))
        .and_then(|text| parse_exposition(&text))
        .and_then(|parsed| extract(&parsed, metric));
    if let Err(e) = &result {
        warn!(endpoint = %config.endpoint, metric, "scrape failed: {}", e);
    }
    timer.track(result)
}

/// Repeated scrapes of one metric, stamped with the wall clock in
/// milliseconds.
pub struct ScrapeStream {
    config: ClientConfig,
    metric: String,
    interval: Duration,
    started: bool,
}

impl ScrapeStream {
    pub fn new(config: ClientConfig, metric: impl Into<String>) -> Self {
        Self {
            config,
            metric: metric.into(),
            interval: DEFAULT_SCRAPE_INTERVAL,
            started: false,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn next_sample(&mut self) -> Result<ScrapedSample> {
        if self.started {
            thread::sleep(self.interval);
        }
        self.started = true;

        let value = scrape(&self.config, &self.metric)?;
        Ok(ScrapedSample {
            timestamp: chrono::Utc::now().timestamp_millis(),
            value,
        })
    }
}

impl Iterator for ScrapeStream {
    type Item = Result<ScrapedSample>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_sample())
    }
}
