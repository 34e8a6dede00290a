//! Forecast service
//!
//! Glues the market data client, the optional exchange-rate client and the
//! prediction pipeline together. The pipeline is CPU-bound, so it runs on
//! tokio's blocking pool.

use chrono::{Local, NaiveDate, Utc};
use std::sync::Arc;

use crate::api::{BinanceClient, ChartRange, KeximClient, KlineQuery};
use crate::error::PredictionError;
use crate::models::{Candle, RawKline};
use crate::pipeline::{parse_klines, PredictionPipeline};
use crate::report::{format_forecast, summarize_ticker, TickerSummary};
use crate::Result;

/// A rendered price forecast
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub usd: f64,
    pub usd_krw_rate: Option<f64>,
    pub krw: Option<f64>,
    pub display: String,
}

impl Forecast {
    pub fn new(usd: f64, usd_krw_rate: Option<f64>) -> Self {
        Self {
            usd,
            usd_krw_rate,
            krw: usd_krw_rate.map(|rate| usd * rate),
            display: format_forecast(usd, usd_krw_rate),
        }
    }
}

pub struct ForecastService {
    market: BinanceClient,
    rates: Option<KeximClient>,
    pipeline: Arc<PredictionPipeline>,
    interval: String,
    history_limit: u32,
}

impl ForecastService {
    pub fn new(
        market: BinanceClient,
        rates: Option<KeximClient>,
        pipeline: Arc<PredictionPipeline>,
        interval: impl Into<String>,
        history_limit: u32,
    ) -> Self {
        Self {
            market,
            rates,
            pipeline,
            interval: interval.into(),
            history_limit,
        }
    }

    /// Fetch recent history, predict the next close and render it
    pub async fn forecast(&self) -> Result<Forecast> {
        tracing::info!(
            "Fetching {} {} klines for {}",
            self.history_limit,
            self.interval,
            self.market.symbol()
        );
        let query = KlineQuery::latest(&self.interval, self.history_limit);
        let klines = self.market.get_klines(&query).await?;

        let usd = run_pipeline(Arc::clone(&self.pipeline), klines).await?;
        tracing::info!("Predicted next close: ${:.2}", usd);

        let rate = self.usd_krw_rate().await;
        Ok(Forecast::new(usd, rate))
    }

    /// Current 24h ticker, rendered
    pub async fn current_price(&self) -> Result<TickerSummary> {
        let ticker = self.market.get_24hr_ticker().await?;
        let rate = self.usd_krw_rate().await;
        Ok(summarize_ticker(&ticker, rate)?)
    }

    /// Candles for a chart period ending now
    pub async fn chart(&self, range: ChartRange) -> Result<Vec<Candle>> {
        let query = range.query(Utc::now().timestamp_millis());
        let klines = self.market.get_klines(&query).await?;
        Ok(parse_klines(&klines)?)
    }

    /// Today's USD/KRW rate, None if unconfigured or unavailable
    pub async fn usd_krw_rate(&self) -> Option<f64> {
        let client = self.rates.as_ref()?;
        let today: NaiveDate = Local::now().date_naive();

        match client.usd_krw_rate(today).await {
            Ok(rate) => Some(rate),
            Err(e) => {
                tracing::warn!("Exchange rate unavailable, showing USD: {}", e);
                None
            }
        }
    }
}

/// Run a prediction on the blocking pool
pub async fn run_pipeline(
    pipeline: Arc<PredictionPipeline>,
    klines: Vec<RawKline>,
) -> Result<f64> {
    let outcome = tokio::task::spawn_blocking(move || pipeline.predict(&klines)).await?;

    outcome.map_err(|e: PredictionError| {
        tracing::error!("Prediction failed: {}", e);
        e.into()
    })
}
