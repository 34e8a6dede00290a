//! Error types for the prediction core

use std::path::PathBuf;
use thiserror::Error;

use crate::inference::InferenceError;

/// Why a single prediction produced no price
#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("Not enough data for prediction. Required: {required}, got: {got}")]
    InsufficientData { required: usize, got: usize },

    #[error("Malformed kline at row {row}: {reason}")]
    MalformedInput { row: usize, reason: String },

    #[error("Feature '{feature}' unavailable at window step {step}")]
    FeatureUnavailable { feature: String, step: usize },

    #[error("Inference failed: {0}")]
    InferenceFailure(#[from] InferenceError),
}

/// Inconsistent pipeline configuration, detected at construction
#[derive(Error, Debug, PartialEq)]
pub enum PipelineError {
    #[error("Scaler min/max lengths differ: {min} vs {max}")]
    ScalerShape { min: usize, max: usize },

    #[error("Scaler covers {scaler} features but {columns} feature columns are configured")]
    ColumnCount { columns: usize, scaler: usize },

    #[error("Model expects {model} features per step but {columns} feature columns are configured")]
    ModelShape { columns: usize, model: usize },

    #[error("No feature columns configured")]
    NoColumns,
}

/// Failure loading a bundled artifact
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid model artifact {path}: {reason}")]
    InvalidModel { path: PathBuf, reason: String },
}

/// Failure resolving the USD exchange rate
#[derive(Error, Debug, PartialEq)]
pub enum ExchangeRateError {
    #[error("Exchange rate API returned no rows")]
    Empty,

    #[error("Exchange rate API rejected the data code")]
    InvalidDataCode,

    #[error("Exchange rate API rejected the auth key")]
    InvalidAuthKey,

    #[error("Exchange rate API daily request limit reached")]
    DailyLimitExceeded,

    #[error("Exchange rate API returned unknown result code {0}")]
    Unknown(i32),

    #[error("No USD row in exchange rate response")]
    MissingUsd,

    #[error("Unparsable USD deal base rate '{0}'")]
    InvalidRate(String),
}

impl ExchangeRateError {
    /// Map a KEXIM result code to an error, None for success (1)
    pub fn from_result_code(code: i32) -> Option<Self> {
        match code {
            1 => None,
            2 => Some(ExchangeRateError::InvalidDataCode),
            3 => Some(ExchangeRateError::InvalidAuthKey),
            4 => Some(ExchangeRateError::DailyLimitExceeded),
            other => Some(ExchangeRateError::Unknown(other)),
        }
    }
}
