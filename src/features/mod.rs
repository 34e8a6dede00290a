// Feature assembly
// Turns a candle sequence into one named feature vector per bar

use chrono::{FixedOffset, Local, NaiveDate, TimeZone};

use crate::indicators::{calculate_atr, calculate_ema, calculate_rsi, calculate_sma};
use crate::models::Candle;

/// Trailing time steps fed to the model
pub const LOOK_BACK: usize = 5;

/// Bars needed before the longest-window indicators are defined, plus one
pub const WARM_UP_CANDLES: usize = 19;

/// Minimum number of candles a prediction needs
pub const MIN_CANDLES: usize = LOOK_BACK + WARM_UP_CANDLES;

pub const SMA_SHORT: usize = 5;
pub const SMA_MEDIUM: usize = 10;
pub const SMA_LONG: usize = 20;
pub const EMA_SHORT: usize = 5;
pub const EMA_MEDIUM: usize = 10;
pub const EMA_LONG: usize = 20;
pub const ATR_PERIOD: usize = 14;
pub const RSI_PERIOD: usize = 14;

/// Date of the most recent Bitcoin halving
pub const LAST_HALVING_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2024, 4, 20) {
    Some(date) => date,
    None => panic!("invalid halving date"),
};

/// Every feature the assembler can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Open,
    High,
    Low,
    Close,
    Volume,
    Sma5,
    Sma10,
    Sma20,
    Ema5,
    Ema10,
    Ema20,
    Atr14,
    Rsi14,
    DaysSinceLastHalving,
}

impl Feature {
    pub const COUNT: usize = 14;

    pub const ALL: [Feature; Feature::COUNT] = [
        Feature::Open,
        Feature::High,
        Feature::Low,
        Feature::Close,
        Feature::Volume,
        Feature::Sma5,
        Feature::Sma10,
        Feature::Sma20,
        Feature::Ema5,
        Feature::Ema10,
        Feature::Ema20,
        Feature::Atr14,
        Feature::Rsi14,
        Feature::DaysSinceLastHalving,
    ];

    /// Column name as it appears in the feature list artifact
    pub fn name(&self) -> &'static str {
        match self {
            Feature::Open => "Open",
            Feature::High => "High",
            Feature::Low => "Low",
            Feature::Close => "Close",
            Feature::Volume => "Volume",
            Feature::Sma5 => "SMA_5",
            Feature::Sma10 => "SMA_10",
            Feature::Sma20 => "SMA_20",
            Feature::Ema5 => "EMA_5",
            Feature::Ema10 => "EMA_10",
            Feature::Ema20 => "EMA_20",
            Feature::Atr14 => "ATR_14",
            Feature::Rsi14 => "RSI_14",
            Feature::DaysSinceLastHalving => "Days_Since_Last_Halving",
        }
    }

    pub fn from_name(name: &str) -> Option<Feature> {
        Feature::ALL.iter().copied().find(|f| f.name() == name)
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Feature values for a single bar, addressable by name
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    values: [f64; Feature::COUNT],
}

impl FeatureVector {
    pub fn value(&self, feature: Feature) -> f64 {
        self.values[feature.index()]
    }

    /// Look up a feature by column name; None if the name is unknown
    pub fn get(&self, name: &str) -> Option<f64> {
        Feature::from_name(name).map(|f| self.value(f))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        Feature::ALL.iter().map(move |&f| (f, self.value(f)))
    }

    fn set(&mut self, feature: Feature, value: f64) {
        self.values[feature.index()] = value;
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self {
            values: [f64::NAN; Feature::COUNT],
        }
    }
}

/// Time zone used to derive a candle's calendar date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalendarZone {
    /// The system's local zone
    #[default]
    Local,
    Fixed(FixedOffset),
}

impl CalendarZone {
    /// Build from an offset in minutes east of UTC; None if out of range
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(CalendarZone::Fixed)
    }

    pub fn calendar_date(&self, timestamp_ms: i64) -> Option<NaiveDate> {
        match self {
            CalendarZone::Local => Local
                .timestamp_millis_opt(timestamp_ms)
                .single()
                .map(|dt| dt.date_naive()),
            CalendarZone::Fixed(offset) => offset
                .timestamp_millis_opt(timestamp_ms)
                .single()
                .map(|dt| dt.date_naive()),
        }
    }
}

/// Whole calendar days from the last halving to the candle's date
///
/// Negative for candles before the halving. NaN if the timestamp cannot be
/// placed on a calendar.
pub fn days_since_halving(timestamp_ms: i64, zone: &CalendarZone) -> f64 {
    match zone.calendar_date(timestamp_ms) {
        Some(date) => (date - LAST_HALVING_DATE).num_days() as f64,
        None => f64::NAN,
    }
}

/// Builds per-bar feature vectors from candles
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureAssembler {
    zone: CalendarZone,
}

impl FeatureAssembler {
    pub fn new(zone: CalendarZone) -> Self {
        Self { zone }
    }

    pub fn zone(&self) -> CalendarZone {
        self.zone
    }

    /// One vector per candle, index aligned with the input
    ///
    /// Indicator values are NaN wherever their warm-up is not satisfied.
    pub fn assemble(&self, candles: &[Candle]) -> Vec<FeatureVector> {
        let opens: Vec<f64> = candles.iter().map(|c| c.open).collect();
        let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
        let lows: Vec<f64> = candles.iter().map(|c| c.low).collect();
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();

        let series = [
            (Feature::Sma5, calculate_sma(&closes, SMA_SHORT)),
            (Feature::Sma10, calculate_sma(&closes, SMA_MEDIUM)),
            (Feature::Sma20, calculate_sma(&closes, SMA_LONG)),
            (Feature::Ema5, calculate_ema(&closes, EMA_SHORT)),
            (Feature::Ema10, calculate_ema(&closes, EMA_MEDIUM)),
            (Feature::Ema20, calculate_ema(&closes, EMA_LONG)),
            (Feature::Atr14, calculate_atr(&highs, &lows, &closes, ATR_PERIOD)),
            (Feature::Rsi14, calculate_rsi(&closes, RSI_PERIOD)),
        ];
        tracing::debug!("Technical indicators calculated for {} candles", candles.len());

        candles
            .iter()
            .enumerate()
            .map(|(i, candle)| {
                let mut vector = FeatureVector::default();
                vector.set(Feature::Open, opens[i]);
                vector.set(Feature::High, highs[i]);
                vector.set(Feature::Low, lows[i]);
                vector.set(Feature::Close, closes[i]);
                vector.set(Feature::Volume, volumes[i]);
                for (feature, values) in &series {
                    vector.set(*feature, values[i]);
                }
                vector.set(
                    Feature::DaysSinceLastHalving,
                    days_since_halving(candle.timestamp, &self.zone),
                );
                vector
            })
            .collect()
    }
}

/// The trailing `LOOK_BACK` vectors in chronological order
///
/// Returns the whole slice when it is shorter than `LOOK_BACK`.
pub fn trailing_window(features: &[FeatureVector]) -> &[FeatureVector] {
    &features[features.len().saturating_sub(LOOK_BACK)..]
}
