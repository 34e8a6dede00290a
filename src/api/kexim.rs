use chrono::NaiveDate;
use reqwest::Client;
use tokio::time::Duration;

use crate::config::ExchangeSettings;
use crate::error::ExchangeRateError;
use crate::models::KeximRate;
use crate::Result;

const EXCHANGE_PATH: &str = "/site/program/financial/exchangeJSON";
const DATA_CODE: &str = "AP01";

/// Client for the KEXIM (Export-Import Bank of Korea) daily rate feed
#[derive(Clone)]
pub struct KeximClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl KeximClient {
    pub fn new(settings: &ExchangeSettings, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Build from settings, None when no API key is configured
    pub fn from_settings(settings: &ExchangeSettings) -> Result<Option<Self>> {
        match settings.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(Some(Self::new(settings, key.to_string())?)),
            _ => Ok(None),
        }
    }

    /// Fetch every currency row published for `date`
    pub async fn get_exchange_rates(&self, date: NaiveDate) -> Result<Vec<KeximRate>> {
        let url = format!("{}{}", self.base_url, EXCHANGE_PATH);
        let search_date = date.format("%Y%m%d").to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("authkey", self.api_key.as_str()),
                ("searchdate", search_date.as_str()),
                ("data", DATA_CODE),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("KEXIM API error: {}", status).into());
        }

        Ok(response.json().await?)
    }

    /// KRW per USD (deal base rate) for `date`
    pub async fn usd_krw_rate(&self, date: NaiveDate) -> Result<f64> {
        let rates = self.get_exchange_rates(date).await?;
        let rate = resolve_usd_rate(&rates)?;
        tracing::debug!("USD/KRW deal base rate for {}: {}", date, rate);
        Ok(rate)
    }
}

/// Interpret a KEXIM response and extract the USD deal base rate
///
/// The result code of the first row speaks for the whole response.
pub fn resolve_usd_rate(rates: &[KeximRate]) -> std::result::Result<f64, ExchangeRateError> {
    let first = rates.first().ok_or(ExchangeRateError::Empty)?;
    if let Some(err) = ExchangeRateError::from_result_code(first.result) {
        return Err(err);
    }

    let usd = rates
        .iter()
        .find(|r| r.currency_unit == "USD")
        .ok_or(ExchangeRateError::MissingUsd)?;

    usd.deal_base_rate()
        .filter(|rate| rate.is_finite() && *rate > 0.0)
        .ok_or_else(|| ExchangeRateError::InvalidRate(usd.deal_base_rate.clone()))
}
