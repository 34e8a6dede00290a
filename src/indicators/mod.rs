// Technical indicators module
// Implements SMA, EMA, ATR, RSI as full-length series
//
// Every function returns one value per input element. Positions where the
// indicator is not yet defined hold f64::NAN.

pub mod atr;
pub mod moving_average;
pub mod rsi;

pub use atr::calculate_atr;
pub use moving_average::{calculate_ema, calculate_sma};
pub use rsi::calculate_rsi;
