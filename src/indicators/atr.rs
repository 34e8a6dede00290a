/// Average True Range (ATR) indicator
///
/// Measures market volatility by averaging true ranges over a period.
/// True Range is the greatest of:
/// - Current High - Current Low
/// - Abs(Current High - Previous Close)
/// - Abs(Current Low - Previous Close)
///
/// The first bar has no previous close, so its true range is High - Low.
/// Seeded with a simple average, then Wilder's smoothing (same as RSI).

/// Calculate the true range of every bar
pub fn true_ranges(highs: &[f64], lows: &[f64], closes: &[f64]) -> Vec<f64> {
    let len = highs.len().min(lows.len()).min(closes.len());
    let mut ranges = Vec::with_capacity(len);

    for i in 0..len {
        let high_low = highs[i] - lows[i];
        if i == 0 {
            ranges.push(high_low);
            continue;
        }

        let prev_close = closes[i - 1];
        let tr = high_low
            .max((highs[i] - prev_close).abs())
            .max((lows[i] - prev_close).abs());
        ranges.push(tr);
    }

    ranges
}

/// Calculate the ATR series
///
/// Series of unequal length are truncated to the shortest. `result[i]` is
/// NaN for `i < period - 1`; the whole series is NaN when there are fewer
/// than `period` bars.
pub fn calculate_atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Vec<f64> {
    let ranges = true_ranges(highs, lows, closes);
    let mut atr_series = vec![f64::NAN; ranges.len()];

    if period == 0 || ranges.len() < period {
        return atr_series;
    }

    // First ATR is simple average of first 'period' true ranges
    let mut atr = ranges[..period].iter().sum::<f64>() / period as f64;
    atr_series[period - 1] = atr;

    // Apply Wilder's smoothing for subsequent values
    for i in period..ranges.len() {
        atr = (atr * (period as f64 - 1.0) + ranges[i]) / period as f64;
        atr_series[i] = atr;
    }

    tracing::debug!(
        "ATR({}) calculated. Last value: {:?}",
        period,
        atr_series.last()
    );
    atr_series
}
