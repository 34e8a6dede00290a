//! Prediction pipeline
//!
//! Raw klines -> candles -> indicators -> trailing feature window ->
//! scaled tensor -> model -> unscaled USD price. Every call is a single
//! deterministic attempt that owns its intermediate buffers; the only shared
//! state is the read-only configuration held here.

use std::sync::Arc;

use crate::error::{PipelineError, PredictionError};
use crate::features::{trailing_window, Feature, FeatureAssembler, FeatureVector, MIN_CANDLES};
use crate::inference::{InferenceError, InputTensor, PriceModel};
use crate::models::{Candle, RawKline};
use crate::scaler::ScalerParams;

pub struct PredictionPipeline {
    feature_columns: Arc<[String]>,
    scaler: Arc<ScalerParams>,
    model: Arc<dyn PriceModel>,
    assembler: FeatureAssembler,
}

impl PredictionPipeline {
    /// Build a pipeline from loaded artifacts
    ///
    /// Feature column names are resolved per call, so an unknown column
    /// surfaces as `FeatureUnavailable` rather than a construction error.
    pub fn new(
        feature_columns: Vec<String>,
        scaler: ScalerParams,
        model: Arc<dyn PriceModel>,
        assembler: FeatureAssembler,
    ) -> std::result::Result<Self, PipelineError> {
        if feature_columns.is_empty() {
            return Err(PipelineError::NoColumns);
        }

        let scaler_len = scaler.feature_count().ok_or(PipelineError::ScalerShape {
            min: scaler.feature_min.len(),
            max: scaler.feature_max.len(),
        })?;
        if scaler_len != feature_columns.len() {
            return Err(PipelineError::ColumnCount {
                columns: feature_columns.len(),
                scaler: scaler_len,
            });
        }

        if let Some(model_len) = model.expected_features() {
            if model_len != feature_columns.len() {
                return Err(PipelineError::ModelShape {
                    columns: feature_columns.len(),
                    model: model_len,
                });
            }
        }

        for column in &feature_columns {
            if Feature::from_name(column).is_none() {
                tracing::warn!("Feature column '{}' is not produced by the assembler", column);
            }
        }

        Ok(Self {
            feature_columns: feature_columns.into(),
            scaler: Arc::new(scaler),
            model,
            assembler,
        })
    }

    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    pub fn scaler(&self) -> &ScalerParams {
        &self.scaler
    }

    pub fn assembler(&self) -> &FeatureAssembler {
        &self.assembler
    }

    /// Predict the next close in USD from raw exchange klines
    pub fn predict(&self, klines: &[RawKline]) -> std::result::Result<f64, PredictionError> {
        tracing::debug!(
            "Starting data processing for prediction. Klines received: {}",
            klines.len()
        );
        check_history(klines.len())?;

        let candles = parse_klines(klines)?;
        tracing::debug!("Parsed {} klines", candles.len());

        self.run(&candles)
    }

    /// Predict from already-parsed candles
    pub fn predict_candles(&self, candles: &[Candle]) -> std::result::Result<f64, PredictionError> {
        check_history(candles.len())?;
        self.run(candles)
    }

    fn run(&self, candles: &[Candle]) -> std::result::Result<f64, PredictionError> {
        let features = self.assembler.assemble(candles);
        let window = trailing_window(&features);
        tracing::debug!("Final sequence of {} steps prepared", window.len());

        let tensor = self.scale_window(window)?;
        tracing::debug!("Window scaled into {}x{} tensor", tensor.rows(), tensor.cols());

        let scaled_prediction = finite_output(self.model.infer(&tensor)?)?;
        tracing::debug!("Model run completed. Scaled output: {}", scaled_prediction);

        let price = finite_output(self.scaler.unscale_target(scaled_prediction))?;
        tracing::debug!("Prediction inverse-scaled. Predicted price USD: {}", price);

        Ok(price)
    }

    /// Validate and min-max scale the window in feature-column order
    pub fn scale_window(
        &self,
        window: &[FeatureVector],
    ) -> std::result::Result<InputTensor, PredictionError> {
        let mut tensor = InputTensor::zeros(window.len(), self.feature_columns.len());

        for (step, vector) in window.iter().enumerate() {
            for (j, column) in self.feature_columns.iter().enumerate() {
                let raw = vector
                    .get(column)
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| {
                        tracing::error!("Non-finite or unknown feature '{}' at step {}", column, step);
                        PredictionError::FeatureUnavailable {
                            feature: column.clone(),
                            step,
                        }
                    })?;
                tensor.set(step, j, self.scaler.scale_feature(j, raw));
            }
        }

        Ok(tensor)
    }
}

// Applies to every model adapter
fn finite_output(value: f64) -> std::result::Result<f64, PredictionError> {
    if value.is_finite() {
        Ok(value)
    } else {
        tracing::error!("Non-finite model output: {}", value);
        Err(InferenceError::NonFiniteOutput(value).into())
    }
}

fn check_history(got: usize) -> std::result::Result<(), PredictionError> {
    if got < MIN_CANDLES {
        tracing::error!(
            "Not enough data for prediction. Required: {}, Got: {}",
            MIN_CANDLES,
            got
        );
        return Err(PredictionError::InsufficientData {
            required: MIN_CANDLES,
            got,
        });
    }
    Ok(())
}

/// Parse every row or fail on the first malformed one
pub fn parse_klines(klines: &[RawKline]) -> std::result::Result<Vec<Candle>, PredictionError> {
    klines
        .iter()
        .enumerate()
        .map(|(row, kline)| {
            Candle::from_kline(kline).map_err(|reason| PredictionError::MalformedInput { row, reason })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{CalendarZone, LOOK_BACK};
    use crate::inference::FnModel;
    use serde_json::json;

    const DAY_MS: i64 = 86_400_000;

    fn columns() -> Vec<String> {
        Feature::ALL.iter().map(|f| f.name().to_string()).collect()
    }

    fn wide_scaler(n: usize) -> ScalerParams {
        ScalerParams {
            feature_min: vec![-1000.0; n],
            feature_max: vec![1000.0; n],
            target_min: 10_000.0,
            target_max: 20_000.0,
        }
    }

    fn constant_model(output: f64) -> Arc<dyn PriceModel> {
        Arc::new(FnModel::new(move |_: &InputTensor| Ok(output)))
    }

    fn pipeline_with(model: Arc<dyn PriceModel>) -> PredictionPipeline {
        let zone = CalendarZone::from_offset_minutes(0).unwrap();
        PredictionPipeline::new(columns(), wide_scaler(Feature::COUNT), model, FeatureAssembler::new(zone))
            .unwrap()
    }

    fn klines(count: usize) -> Vec<RawKline> {
        (0..count)
            .map(|i| {
                let close = 100.0 + i as f64;
                Candle {
                    timestamp: 1_713_571_200_000 + i as i64 * DAY_MS,
                    open: close - 0.5,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 10.0,
                }
                .to_kline()
            })
            .collect()
    }

    #[test]
    fn test_minimum_history_succeeds() {
        let pipeline = pipeline_with(constant_model(0.25));
        let price = pipeline.predict(&klines(MIN_CANDLES)).unwrap();
        assert_eq!(price, 12_500.0);
    }

    #[test]
    fn test_short_history_fails() {
        let pipeline = pipeline_with(constant_model(0.25));
        let err = pipeline.predict(&klines(MIN_CANDLES - 1)).unwrap_err();
        assert!(matches!(
            err,
            PredictionError::InsufficientData { required: 24, got: 23 }
        ));
    }

    #[test]
    fn test_history_checked_before_parsing() {
        let pipeline = pipeline_with(constant_model(0.25));
        let rows = vec![vec![json!("garbage")]; 3];
        assert!(matches!(
            pipeline.predict(&rows),
            Err(PredictionError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_malformed_row_reports_index() {
        let pipeline = pipeline_with(constant_model(0.25));
        let mut rows = klines(30);
        rows[7][4] = json!("not-a-number");

        match pipeline.predict(&rows) {
            Err(PredictionError::MalformedInput { row, reason }) => {
                assert_eq!(row, 7);
                assert!(reason.contains("close"));
            }
            other => panic!("expected MalformedInput, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_column_is_feature_unavailable() {
        let zone = CalendarZone::from_offset_minutes(0).unwrap();
        let mut cols = columns();
        cols[3] = "MACD".to_string();
        let pipeline = PredictionPipeline::new(
            cols,
            wide_scaler(Feature::COUNT),
            constant_model(0.0),
            FeatureAssembler::new(zone),
        )
        .unwrap();

        match pipeline.predict(&klines(30)) {
            Err(PredictionError::FeatureUnavailable { feature, step }) => {
                assert_eq!(feature, "MACD");
                assert_eq!(step, 0);
            }
            other => panic!("expected FeatureUnavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_feature_aborts() {
        let pipeline = pipeline_with(constant_model(0.5));
        let mut rows = klines(30);
        rows[28][5] = json!("inf");

        assert!(matches!(
            pipeline.predict(&rows),
            Err(PredictionError::FeatureUnavailable { ref feature, step: 3 }) if feature == "Volume"
        ));
    }

    #[test]
    fn test_inference_failure_propagates() {
        let model: Arc<dyn PriceModel> = Arc::new(FnModel::new(|_: &InputTensor| {
            Err(InferenceError::Runtime("interpreter crashed".into()))
        }));
        let pipeline = pipeline_with(model);

        assert!(matches!(
            pipeline.predict(&klines(30)),
            Err(PredictionError::InferenceFailure(InferenceError::Runtime(_)))
        ));
    }

    #[test]
    fn test_nan_output_from_any_model_is_failure() {
        let pipeline = pipeline_with(constant_model(f64::NAN));
        assert!(matches!(
            pipeline.predict(&klines(30)),
            Err(PredictionError::InferenceFailure(InferenceError::NonFiniteOutput(v))) if v.is_nan()
        ));

        let pipeline = pipeline_with(constant_model(f64::NEG_INFINITY));
        assert!(matches!(
            pipeline.predict(&klines(30)),
            Err(PredictionError::InferenceFailure(InferenceError::NonFiniteOutput(_)))
        ));
    }

    #[test]
    fn test_unscale_overflow_is_failure() {
        let zone = CalendarZone::from_offset_minutes(0).unwrap();
        let scaler = ScalerParams {
            target_min: 0.0,
            target_max: 1e300,
            ..wide_scaler(Feature::COUNT)
        };
        let pipeline =
            PredictionPipeline::new(columns(), scaler, constant_model(1e300), FeatureAssembler::new(zone))
                .unwrap();

        assert!(matches!(
            pipeline.predict(&klines(30)),
            Err(PredictionError::InferenceFailure(InferenceError::NonFiniteOutput(v))) if v.is_infinite()
        ));
    }

    #[test]
    fn test_tensor_follows_column_order() {
        let zone = CalendarZone::from_offset_minutes(0).unwrap();
        let cols = vec!["Volume".to_string(), "Close".to_string()];
        let scaler = ScalerParams {
            feature_min: vec![0.0, 100.0],
            feature_max: vec![20.0, 200.0],
            target_min: 0.0,
            target_max: 1.0,
        };
        let pipeline =
            PredictionPipeline::new(cols, scaler, constant_model(0.0), FeatureAssembler::new(zone)).unwrap();

        let candles: Vec<Candle> = parse_klines(&klines(30)).unwrap();
        let features = pipeline.assembler().assemble(&candles);
        let tensor = pipeline.scale_window(trailing_window(&features)).unwrap();

        assert_eq!(tensor.rows(), LOOK_BACK);
        assert_eq!(tensor.cols(), 2);
        // Last step: volume 10 -> 0.5, close 129 -> 0.29
        let last = tensor.row(LOOK_BACK - 1).unwrap();
        assert_eq!(last[0], 0.5);
        assert!((last[1] - 0.29).abs() < 1e-12);
    }

    #[test]
    fn test_model_sees_scaled_window() {
        // Model returns the scaled close of the last step, so the price is
        // the last close mapped through the target range.
        let model: Arc<dyn PriceModel> = Arc::new(FnModel::new(|t: &InputTensor| {
            t.get(t.rows() - 1, Feature::Close as usize)
                .ok_or_else(|| InferenceError::Runtime("missing close".into()))
        }));
        let pipeline = pipeline_with(model);

        let price = pipeline.predict(&klines(30)).unwrap();
        let scaled_close = (129.0 + 1000.0) / 2000.0;
        assert!((price - (scaled_close * 10_000.0 + 10_000.0)).abs() < 1e-9);
    }

    #[test]
    fn test_construction_checks_shapes() {
        let assembler = FeatureAssembler::default();

        let err = PredictionPipeline::new(columns(), wide_scaler(3), constant_model(0.0), assembler).err();
        assert_eq!(err, Some(PipelineError::ColumnCount { columns: 14, scaler: 3 }));

        let err = PredictionPipeline::new(Vec::new(), wide_scaler(0), constant_model(0.0), assembler).err();
        assert_eq!(err, Some(PipelineError::NoColumns));

        let mut lopsided = wide_scaler(Feature::COUNT);
        lopsided.feature_max.pop();
        let err = PredictionPipeline::new(columns(), lopsided, constant_model(0.0), assembler).err();
        assert_eq!(err, Some(PipelineError::ScalerShape { min: 14, max: 13 }));

        let model = crate::inference::LinearModel {
            look_back: LOOK_BACK,
            n_features: 2,
            weights: vec![vec![0.0; 2]; LOOK_BACK],
            bias: 0.0,
        };
        let err = PredictionPipeline::new(columns(), wide_scaler(Feature::COUNT), Arc::new(model), assembler).err();
        assert_eq!(err, Some(PipelineError::ModelShape { columns: 14, model: 2 }));
    }

    #[test]
    fn test_pipeline_is_shareable_across_threads() {
        let pipeline = Arc::new(pipeline_with(constant_model(0.5)));

        let handles: Vec<_> = (0..4)
            .map(|offset| {
                let pipeline = Arc::clone(&pipeline);
                std::thread::spawn(move || pipeline.predict(&klines(MIN_CANDLES + offset)))
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), 15_000.0);
        }
    }
}
