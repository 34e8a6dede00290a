// Application settings
// Defaults < optional TOML file < BTCFORECAST__SECTION__KEY environment variables

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::features::CalendarZone;

pub const DEFAULT_CONFIG_FILE: &str = "btcforecast.toml";
const ENV_PREFIX: &str = "BTCFORECAST";

#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Settings {
    pub market: MarketSettings,
    pub exchange: ExchangeSettings,
    pub artifacts: ArtifactSettings,
    pub forecast: ForecastSettings,
}

/// Binance market data endpoint
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct MarketSettings {
    pub base_url: String,
    pub symbol: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub requests_per_minute: u32,
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.binance.com".to_string(),
            symbol: "BTCUSDT".to_string(),
            timeout_secs: 30,
            max_retries: 3,
            requests_per_minute: 600,
        }
    }
}

/// KEXIM exchange-rate endpoint; no key means USD-only output
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExchangeSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.koreaexim.go.kr".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ArtifactSettings {
    pub feature_columns: PathBuf,
    pub scaler_params: PathBuf,
    pub model: PathBuf,
}

impl Default for ArtifactSettings {
    fn default() -> Self {
        Self {
            feature_columns: PathBuf::from("assets/feature_columns.json"),
            scaler_params: PathBuf::from("assets/scaler_params.json"),
            model: PathBuf::from("assets/model.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ForecastSettings {
    /// Kline interval the model was trained on
    pub interval: String,
    /// Candles fetched per forecast
    pub history_limit: u32,
    /// Calendar offset for the halving feature; None uses the system zone
    pub utc_offset_minutes: Option<i32>,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            interval: "1d".to_string(),
            history_limit: 100,
            utc_offset_minutes: None,
        }
    }
}

impl ForecastSettings {
    pub fn calendar_zone(&self) -> std::result::Result<CalendarZone, config::ConfigError> {
        match self.utc_offset_minutes {
            None => Ok(CalendarZone::Local),
            Some(minutes) => CalendarZone::from_offset_minutes(minutes).ok_or_else(|| {
                config::ConfigError::Message(format!(
                    "forecast.utc_offset_minutes out of range: {}",
                    minutes
                ))
            }),
        }
    }
}

impl Settings {
    /// Load settings, reading `.env` first
    ///
    /// An explicit `path` must exist; without one, `btcforecast.toml` in the
    /// working directory is used if present.
    pub fn load(path: Option<&Path>) -> std::result::Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings: Settings = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.forecast.calendar_zone()?;
        Ok(settings)
    }
}
