/// Calculate Simple Moving Average (SMA) series
///
/// `result[i]` is the mean of `prices[i + 1 - period..=i]` once a full
/// window is available, NaN before that.
pub fn calculate_sma(prices: &[f64], period: usize) -> Vec<f64> {
    let mut result = vec![f64::NAN; prices.len()];
    if period == 0 || prices.is_empty() {
        return result;
    }

    for i in (period - 1)..prices.len() {
        let sum: f64 = prices[i + 1 - period..=i].iter().sum();
        result[i] = sum / period as f64;
    }

    tracing::debug!(
        "SMA({}) calculated. Last value: {:?}",
        period,
        result.last()
    );
    result
}

/// Calculate Exponential Moving Average (EMA) series
///
/// Warm-up positions (`i < period`) hold the running mean of
/// `prices[0..=i]` rather than NaN, so the series is defined from index 0.
/// The recursive EMA starts at `i == period`, seeded from the mean at
/// `period - 1`. Model scaling parameters were fit against this warm-up, so
/// it must not be replaced with a textbook EMA.
pub fn calculate_ema(prices: &[f64], period: usize) -> Vec<f64> {
    let mut result = vec![f64::NAN; prices.len()];
    if period == 0 || prices.is_empty() {
        return result;
    }

    let multiplier = 2.0 / (period as f64 + 1.0);

    let mut running_sum = 0.0;
    for i in 0..prices.len() {
        if i < period {
            running_sum += prices[i];
            result[i] = running_sum / (i + 1) as f64;
        } else {
            let prev = result[i - 1];
            result[i] = (prices[i] - prev) * multiplier + prev;
        }
    }

    tracing::debug!(
        "EMA({}) calculated. Last value: {:?}",
        period,
        result.last()
    );
    result
}
