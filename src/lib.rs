// Core modules
pub mod api;
pub mod artifacts;
pub mod config;
pub mod error;
pub mod features;
pub mod indicators;
pub mod inference;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod scaler;
pub mod service;
pub mod synthetic;

// Re-export commonly used types
pub use error::{PipelineError, PredictionError};
pub use features::{CalendarZone, Feature, FeatureAssembler, FeatureVector, LOOK_BACK, MIN_CANDLES};
pub use inference::{FnModel, InferenceError, InputTensor, LinearModel, PriceModel};
pub use models::{Candle, RawKline, Ticker24h};
pub use pipeline::PredictionPipeline;
pub use scaler::ScalerParams;

// Error handling
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
