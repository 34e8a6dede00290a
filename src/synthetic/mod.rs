use chrono::Utc;
use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::Candle;

const MINUTE_MS: i64 = 60_000;

/// Market scenario types for synthetic data generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MarketScenario {
    /// Steady uptrend with noise (+2% per bar average)
    Uptrend,
    /// Steady downtrend with noise (-2% per bar average)
    Downtrend,
    /// Sideways/choppy market (±1% around mean)
    Sideways,
    /// High volatility (±5% large swings)
    Volatile,
}

/// Generates synthetic OHLCV candles for offline forecasting and tests
pub struct SyntheticDataGenerator {
    rng: StdRng,
    base_price: f64,
    base_volume: f64,
}

impl SyntheticDataGenerator {
    /// Create a new generator with a seed for reproducibility
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            base_price: 60_000.0,
            base_volume: 25_000.0,
        }
    }

    pub fn base_price(&self) -> f64 {
        self.base_price
    }

    /// Generate candles ending now
    pub fn generate(
        &mut self,
        scenario: MarketScenario,
        num_candles: usize,
        interval_minutes: i64,
    ) -> Vec<Candle> {
        let start_ms = Utc::now()
            .timestamp_millis()
            .saturating_sub(offset_ms(num_candles, interval_minutes));
        self.generate_from(scenario, start_ms, num_candles, interval_minutes)
    }

    /// Generate candles starting at `start_ms`
    ///
    /// # Arguments
    /// * `scenario` - The market scenario to simulate
    /// * `start_ms` - Open time of the first candle, epoch millis
    /// * `num_candles` - Number of candles to generate
    /// * `interval_minutes` - Minutes between candles (1440 for daily)
    pub fn generate_from(
        &mut self,
        scenario: MarketScenario,
        start_ms: i64,
        num_candles: usize,
        interval_minutes: i64,
    ) -> Vec<Candle> {
        let mut candles = Vec::with_capacity(num_candles);
        let mut current_price = self.base_price;
        let mean_price = self.base_price;

        for i in 0..num_candles {
            let timestamp = start_ms.saturating_add(offset_ms(i, interval_minutes));

            let change = match scenario {
                // Drift + reduced noise so trend is dominant
                MarketScenario::Uptrend => {
                    current_price * (0.02 + self.rng.gen_range(-0.005..0.005))
                }
                MarketScenario::Downtrend => {
                    current_price * (-0.02 + self.rng.gen_range(-0.005..0.005))
                }
                // Mean reversion force + noise
                MarketScenario::Sideways => {
                    (mean_price - current_price) * 0.1
                        + current_price * self.rng.gen_range(-0.01..0.01)
                }
                MarketScenario::Volatile => current_price * self.rng.gen_range(-0.05..0.05),
            };
            current_price += change;

            // Prevent price from going too low
            if current_price < self.base_price * 0.1 {
                current_price = self.base_price * 0.1;
            }

            candles.push(self.create_candle(current_price, timestamp));
        }

        candles
    }

    /// Helper to create a candle from price and timestamp
    fn create_candle(&mut self, price: f64, timestamp: i64) -> Candle {
        // Create realistic OHLC from close price
        let noise_pct = 0.01; // ±1% intrabar movement

        // Generate high and low around the close price
        let high = price * (1.0 + self.rng.gen_range(0.0..noise_pct));
        let low = price * (1.0 - self.rng.gen_range(0.0..noise_pct));

        // Generate open and clamp it between low and high
        let open_raw = price * (1.0 + self.rng.gen_range(-noise_pct..noise_pct));
        let open = open_raw.clamp(low, high);

        // Vary volume ±30%
        let volume = self.base_volume * self.rng.gen_range(0.7..1.3);

        Candle {
            timestamp,
            open,
            high,
            low,
            close: price,
            volume,
        }
    }
}

/// Millis spanned by `steps` intervals, saturating at the i64 bounds
fn offset_ms(steps: usize, interval_minutes: i64) -> i64 {
    i64::try_from(steps)
        .unwrap_or(i64::MAX)
        .saturating_mul(interval_minutes)
        .saturating_mul(MINUTE_MS)
}
