/// Calculate Relative Strength Index (RSI) series
///
/// RSI measures the magnitude of recent price changes to evaluate
/// overbought or oversold conditions.
///
/// Values:
/// - RSI > 70: Overbought
/// - RSI < 30: Oversold
///
/// The first value sits at index `period`, seeded from the simple average
/// of the first `period` gains and losses; later values use Wilder's
/// smoothing. Earlier positions are NaN, and the whole series is NaN unless
/// `prices.len() > period`. A window with no losses reads 100.0.
pub fn calculate_rsi(prices: &[f64], period: usize) -> Vec<f64> {
    let mut result = vec![f64::NAN; prices.len()];
    if period == 0 || prices.len() <= period {
        return result;
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let (gain, loss) = split_change(prices[i] - prices[i - 1]);
        avg_gain += gain;
        avg_loss += loss;
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    result[period] = rsi_from_averages(avg_gain, avg_loss);

    for i in (period + 1)..prices.len() {
        let (gain, loss) = split_change(prices[i] - prices[i - 1]);
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
        result[i] = rsi_from_averages(avg_gain, avg_loss);
    }

    tracing::debug!(
        "RSI({}) calculated. Last value: {:?}",
        period,
        result.last()
    );
    result
}

fn split_change(change: f64) -> (f64, f64) {
    if change > 0.0 {
        (change, 0.0)
    } else {
        (0.0, change.abs())
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}
