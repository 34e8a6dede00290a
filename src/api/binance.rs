use governor::{Quota, RateLimiter};
use reqwest::Client;
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

use crate::config::MarketSettings;
use crate::models::{RawKline, Ticker24h};
use crate::Result;

const INITIAL_BACKOFF_MS: u64 = 1000;

// Type alias for the rate limiter to simplify signatures
type BinanceRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Kline request parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KlineQuery {
    pub interval: String,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub limit: Option<u32>,
}

impl KlineQuery {
    /// Most recent `limit` candles at `interval`
    pub fn latest(interval: &str, limit: u32) -> Self {
        Self {
            interval: interval.to_string(),
            start_time: None,
            end_time: None,
            limit: Some(limit),
        }
    }
}

/// Binance spot REST client with rate limiting and retry
///
/// Cloneable; all clones share the same rate limiter.
#[derive(Clone)]
pub struct BinanceClient {
    client: Client,
    base_url: String,
    symbol: String,
    max_retries: u32,
    initial_backoff: Duration,
    rate_limiter: Arc<BinanceRateLimiter>,
}

impl BinanceClient {
    pub fn new(settings: &MarketSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        let rpm = NonZeroU32::new(settings.requests_per_minute).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(rpm)));

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            symbol: settings.symbol.clone(),
            max_retries: settings.max_retries.max(1),
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
            rate_limiter,
        })
    }

    /// Override the first retry delay (doubles on every further attempt)
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Make a rate-limited GET with retry on network errors, 429 and 5xx
    async fn make_request(&self, path: &str, query: &[(&str, String)]) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);

        for attempt in 1..=self.max_retries {
            self.rate_limiter.until_ready().await;

            let backoff = self.initial_backoff * 2u32.pow(attempt - 1);
            let retries_left = attempt < self.max_retries;

            match self.client.get(&url).query(query).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response);
                    }

                    if (status.as_u16() == 429 || status.is_server_error()) && retries_left {
                        tracing::warn!(
                            "Binance returned {}, retrying in {:?} (attempt {}/{})",
                            status,
                            backoff,
                            attempt,
                            self.max_retries
                        );
                        sleep(backoff).await;
                        continue;
                    }

                    let error_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    return Err(format!("Binance API error ({}): {}", status, error_text).into());
                }
                Err(e) if retries_left => {
                    tracing::warn!(
                        "Network error: {}, retrying in {:?} (attempt {}/{})",
                        e,
                        backoff,
                        attempt,
                        self.max_retries
                    );
                    sleep(backoff).await;
                }
                Err(e) => {
                    return Err(
                        format!("Network error after {} attempts: {}", self.max_retries, e).into(),
                    )
                }
            }
        }

        Err(format!("Failed after {} attempts", self.max_retries).into())
    }

    /// Fetch raw kline rows, oldest first
    pub async fn get_klines(&self, query: &KlineQuery) -> Result<Vec<RawKline>> {
        let mut params = vec![
            ("symbol", self.symbol.clone()),
            ("interval", query.interval.clone()),
        ];
        if let Some(start) = query.start_time {
            params.push(("startTime", start.to_string()));
        }
        if let Some(end) = query.end_time {
            params.push(("endTime", end.to_string()));
        }
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }

        let response = self.make_request("/api/v3/klines", &params).await?;
        let klines: Vec<RawKline> = response.json().await?;

        tracing::debug!(
            "Fetched {} {} klines for {}",
            klines.len(),
            query.interval,
            self.symbol
        );
        Ok(klines)
    }

    /// Fetch the rolling 24h ticker
    pub async fn get_24hr_ticker(&self) -> Result<Ticker24h> {
        let params = [("symbol", self.symbol.clone())];
        let response = self.make_request("/api/v3/ticker/24hr", &params).await?;
        Ok(response.json().await?)
    }
}
