// Text rendering of prices and forecasts
// KRW when an exchange rate is known, USD otherwise

use crate::models::Ticker24h;

/// Direction of the 24h move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Rendered 24h ticker
#[derive(Debug, Clone, PartialEq)]
pub struct TickerSummary {
    pub price_text: String,
    pub change_text: String,
    pub direction: Direction,
}

/// Group the integer part with commas after rounding to `decimals` places
pub fn group_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let is_zero = formatted.chars().all(|c| c == '0' || c == '.');
    let sign = if value.is_sign_negative() && !is_zero { "-" } else { "" };

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

/// Currency amount with the sign ahead of the symbol, e.g. `-₩1,234`
fn currency(symbol: &str, value: f64, decimals: usize) -> String {
    let grouped = group_thousands(value, decimals);
    match grouped.strip_prefix('-') {
        Some(abs) => format!("-{}{}", symbol, abs),
        None => format!("{}{}", symbol, grouped),
    }
}

fn signed(value: f64, decimals: usize) -> String {
    let grouped = group_thousands(value, decimals);
    if grouped.starts_with('-') {
        grouped
    } else {
        format!("+{}", grouped)
    }
}

fn percent(value: f64) -> String {
    let text = format!("{:.2}", value.abs());
    let sign = if value < 0.0 && text != "0.00" { "-" } else { "+" };
    format!("{}{}%", sign, text)
}

/// Render a USD forecast, converting to KRW when a rate is available
pub fn format_forecast(predicted_usd: f64, usd_krw_rate: Option<f64>) -> String {
    match usd_krw_rate {
        Some(rate) => currency("₩", predicted_usd * rate, 0),
        None => format!(
            "{} (exchange rate unavailable)",
            currency("$", predicted_usd, 2)
        ),
    }
}

/// Render the 24h ticker, converting to KRW when a rate is available
pub fn summarize_ticker(
    ticker: &Ticker24h,
    usd_krw_rate: Option<f64>,
) -> std::result::Result<TickerSummary, std::num::ParseFloatError> {
    let last_usd = ticker.last_price()?;
    let change_usd = ticker.price_change()?;
    let change_pct = ticker.price_change_percent()?;

    let (price_text, change_text) = match usd_krw_rate {
        Some(rate) => (
            format!("{} ({})", currency("₩", last_usd * rate, 0), currency("$", last_usd, 0)),
            format!("{} ({})", currency("₩", change_usd * rate, 0), percent(change_pct)),
        ),
        None => (
            currency("$", last_usd, 2),
            format!("{} ({})", signed(change_usd, 1), percent(change_pct)),
        ),
    };

    let direction = if change_pct >= 0.0 {
        Direction::Up
    } else {
        Direction::Down
    };

    Ok(TickerSummary {
        price_text,
        change_text,
        direction,
    })
}
