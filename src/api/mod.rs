pub mod binance;
pub mod kexim;
pub mod range;

pub use binance::{BinanceClient, KlineQuery};
pub use kexim::{resolve_usd_rate, KeximClient};
pub use range::ChartRange;
