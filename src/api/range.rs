use super::KlineQuery;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Chart period selector
///
/// Each period maps to a kline interval and a start time relative to now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartRange {
    OneDay,
    FiveDays,
    ThirtyDays,
    HalfYear,
    OneYear,
    /// Longest daily history the exchange serves in one request
    Max,
    /// Daily candles with the exchange's default window
    Default,
}

impl ChartRange {
    /// Parse a period key ("1", "5", "30", "180", "365", "max")
    ///
    /// Unrecognised keys fall back to `Default`.
    pub fn parse(key: &str) -> Self {
        match key.trim() {
            "1" => ChartRange::OneDay,
            "5" => ChartRange::FiveDays,
            "30" => ChartRange::ThirtyDays,
            "180" => ChartRange::HalfYear,
            "365" => ChartRange::OneYear,
            "max" => ChartRange::Max,
            _ => ChartRange::Default,
        }
    }

    pub fn interval(&self) -> &'static str {
        match self {
            ChartRange::OneDay => "5m",
            ChartRange::FiveDays => "30m",
            ChartRange::ThirtyDays => "4h",
            ChartRange::HalfYear | ChartRange::OneYear | ChartRange::Max | ChartRange::Default => "1d",
        }
    }

    fn days_back(&self) -> Option<i64> {
        match self {
            ChartRange::OneDay => Some(1),
            ChartRange::FiveDays => Some(5),
            ChartRange::ThirtyDays => Some(30),
            ChartRange::HalfYear => Some(180),
            ChartRange::OneYear => Some(365),
            ChartRange::Max | ChartRange::Default => None,
        }
    }

    /// Build the kline request for this range ending at `now_ms`
    pub fn query(&self, now_ms: i64) -> KlineQuery {
        KlineQuery {
            interval: self.interval().to_string(),
            start_time: self.days_back().map(|days| now_ms - days * DAY_MS),
            end_time: Some(now_ms),
            limit: match self {
                ChartRange::Max => Some(1000),
                _ => None,
            },
        }
    }
}
