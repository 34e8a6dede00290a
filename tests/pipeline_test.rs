use btcforecast::features::{trailing_window, CalendarZone, Feature, FeatureAssembler, MIN_CANDLES};
use btcforecast::indicators::{calculate_atr, calculate_rsi, calculate_sma};
use btcforecast::scaler::{scale, unscale};
use btcforecast::service::run_pipeline;
use btcforecast::synthetic::{MarketScenario, SyntheticDataGenerator};
use btcforecast::*;
use std::sync::Arc;

const DAY_MS: i64 = 86_400_000;
const START: i64 = 1_735_689_600_000; // 2025-01-01T00:00:00Z

fn utc_assembler() -> FeatureAssembler {
    FeatureAssembler::new(CalendarZone::from_offset_minutes(0).unwrap())
}

fn all_columns() -> Vec<String> {
    Feature::ALL.iter().map(|f| f.name().to_string()).collect()
}

/// Scaler fit to the observed range of each feature in `features`
fn fitted_scaler(features: &[FeatureVector]) -> ScalerParams {
    let mut feature_min = vec![f64::INFINITY; Feature::COUNT];
    let mut feature_max = vec![f64::NEG_INFINITY; Feature::COUNT];
    for vector in features {
        for (j, (_, value)) in vector.iter().enumerate() {
            if value.is_finite() {
                feature_min[j] = feature_min[j].min(value);
                feature_max[j] = feature_max[j].max(value);
            }
        }
    }

    let close = Feature::Close as usize;
    ScalerParams {
        target_min: feature_min[close],
        target_max: feature_max[close],
        feature_min,
        feature_max,
    }
}

/// Linear model that echoes the scaled close of the last step
fn last_close_model() -> LinearModel {
    let mut weights = vec![vec![0.0; Feature::COUNT]; LOOK_BACK];
    weights[LOOK_BACK - 1][Feature::Close as usize] = 1.0;
    LinearModel {
        look_back: LOOK_BACK,
        n_features: Feature::COUNT,
        weights,
        bias: 0.0,
    }
}

fn synthetic(scenario: MarketScenario, count: usize) -> Vec<Candle> {
    SyntheticDataGenerator::new(42).generate_from(scenario, START, count, 24 * 60)
}

fn rising_candles(count: usize) -> Vec<Candle> {
    (0..count)
        .map(|i| {
            let close = 100.0 + i as f64;
            Candle {
                timestamp: START + i as i64 * DAY_MS,
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 10.0,
            }
        })
        .collect()
}

#[test]
fn test_minimum_history_returns_finite_price() {
    let candles = synthetic(MarketScenario::Volatile, MIN_CANDLES);
    let scaler = fitted_scaler(&utc_assembler().assemble(&candles));
    let pipeline =
        PredictionPipeline::new(all_columns(), scaler, Arc::new(last_close_model()), utc_assembler()).unwrap();

    let klines: Vec<RawKline> = candles.iter().map(Candle::to_kline).collect();
    let price = pipeline.predict(&klines).unwrap();

    assert!(price.is_finite());
    let last_close = candles.last().unwrap().close;
    assert!((price - last_close).abs() < 1e-6 * last_close);
}

#[test]
fn test_one_candle_short_is_insufficient() {
    let candles = synthetic(MarketScenario::Uptrend, MIN_CANDLES - 1);
    let scaler = fitted_scaler(&utc_assembler().assemble(&candles));
    let pipeline =
        PredictionPipeline::new(all_columns(), scaler, Arc::new(last_close_model()), utc_assembler()).unwrap();

    let klines: Vec<RawKline> = candles.iter().map(Candle::to_kline).collect();
    match pipeline.predict(&klines) {
        Err(PredictionError::InsufficientData { required, got }) => {
            assert_eq!(required, LOOK_BACK + 19);
            assert_eq!(got, LOOK_BACK + 18);
        }
        other => panic!("expected InsufficientData, got {:?}", other),
    }
    assert!(pipeline.predict_candles(&candles).is_err());
}

#[test]
fn test_rising_series_scenarios() {
    let candles = rising_candles(30);
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
    let lows: Vec<f64> = candles.iter().map(|c| c.low).collect();

    let sma = calculate_sma(&closes, 5);
    let last_five: f64 = closes[25..].iter().sum::<f64>() / 5.0;
    assert_eq!(sma[29], last_five);
    assert_eq!(sma[29], 127.0);

    let rsi = calculate_rsi(&closes, 14);
    assert!(rsi[14..].iter().all(|&v| v == 100.0));

    // high - low = 2, and |high - prev close| = 2 as well
    let atr = calculate_atr(&highs, &lows, &closes, 14);
    assert!(atr[13..].iter().all(|&v| (v - 2.0).abs() < 1e-12));
}

#[test]
fn test_flat_market_atr_is_zero() {
    let flat: Vec<Candle> = (0..30)
        .map(|i| Candle {
            timestamp: START + i * DAY_MS,
            open: 100.0,
            high: 100.0,
            low: 100.0,
            close: 100.0,
            volume: 1.0,
        })
        .collect();

    let features = utc_assembler().assemble(&flat);
    for vector in &features[13..] {
        assert_eq!(vector.value(Feature::Atr14), 0.0);
    }
}

#[test]
fn test_scaled_window_unscales_to_raw_features() {
    let candles = synthetic(MarketScenario::Sideways, 60);
    let features = utc_assembler().assemble(&candles);
    let scaler = fitted_scaler(&features);
    let pipeline = PredictionPipeline::new(
        all_columns(),
        scaler.clone(),
        Arc::new(last_close_model()),
        utc_assembler(),
    )
    .unwrap();

    let window = trailing_window(&features);
    let tensor = pipeline.scale_window(window).unwrap();

    for (step, vector) in window.iter().enumerate() {
        for (j, (_, raw)) in vector.iter().enumerate() {
            let scaled = tensor.get(step, j).unwrap();
            let back = scaler.unscale_feature(j, scaled);
            let range = scaler.feature_max[j] - scaler.feature_min[j];
            if range == 0.0 {
                assert_eq!(scaled, 0.0);
                assert_eq!(back, scaler.feature_min[j]);
            } else {
                assert!(
                    (back - raw).abs() <= 1e-9 * raw.abs().max(1.0),
                    "step {} feature {}: {} vs {}",
                    step,
                    j,
                    back,
                    raw
                );
            }
        }
    }
}

#[test]
fn test_degenerate_scaler_never_divides_by_zero() {
    let candles = synthetic(MarketScenario::Uptrend, 40);
    let scaler = ScalerParams {
        feature_min: vec![5.0; Feature::COUNT],
        feature_max: vec![5.0; Feature::COUNT],
        target_min: 70_000.0,
        target_max: 70_000.0,
    };
    let model: Arc<dyn PriceModel> = Arc::new(FnModel::new(|t: &InputTensor| {
        assert!(t.as_slice().iter().all(|&v| v == 0.0));
        Ok(0.42)
    }));
    let pipeline = PredictionPipeline::new(all_columns(), scaler, model, utc_assembler()).unwrap();

    assert_eq!(pipeline.predict_candles(&candles).unwrap(), 70_000.0);
}

#[test]
fn test_non_finite_model_output_is_failure() {
    let candles = synthetic(MarketScenario::Uptrend, 40);
    let scaler = fitted_scaler(&utc_assembler().assemble(&candles));
    let mut model = last_close_model();
    model.weights = vec![vec![1e308; Feature::COUNT]; LOOK_BACK];
    let pipeline = PredictionPipeline::new(all_columns(), scaler, Arc::new(model), utc_assembler()).unwrap();

    // Prices at the end of an uptrend scale near 1.0, so the weighted sum overflows
    let result = pipeline.predict_candles(&candles);
    assert!(matches!(
        result,
        Err(PredictionError::InferenceFailure(InferenceError::NonFiniteOutput(_)))
    ));
}

#[test]
fn test_custom_model_never_yields_non_finite_price() {
    let candles = synthetic(MarketScenario::Sideways, 40);
    let scaler = fitted_scaler(&utc_assembler().assemble(&candles));

    let nan_model: Arc<dyn PriceModel> = Arc::new(FnModel::new(|_: &InputTensor| Ok(f64::NAN)));
    let pipeline = PredictionPipeline::new(all_columns(), scaler.clone(), nan_model, utc_assembler()).unwrap();
    assert!(matches!(
        pipeline.predict_candles(&candles),
        Err(PredictionError::InferenceFailure(InferenceError::NonFiniteOutput(_)))
    ));

    // Finite scaled output whose inverse scaling overflows
    let huge_target = ScalerParams {
        target_min: 0.0,
        target_max: 1e300,
        ..scaler
    };
    let huge_model: Arc<dyn PriceModel> = Arc::new(FnModel::new(|_: &InputTensor| Ok(1e300)));
    let pipeline = PredictionPipeline::new(all_columns(), huge_target, huge_model, utc_assembler()).unwrap();
    assert!(matches!(
        pipeline.predict_candles(&candles),
        Err(PredictionError::InferenceFailure(InferenceError::NonFiniteOutput(v))) if v.is_infinite()
    ));
}

#[test]
fn test_scale_helpers() {
    assert_eq!(unscale(scale(64_000.0, 15_000.0, 110_000.0), 15_000.0, 110_000.0), 64_000.0);
    assert_eq!(scale(1.0, 3.0, 3.0), 0.0);
    assert_eq!(unscale(0.9, 3.0, 3.0), 3.0);
}

#[test]
fn test_run_pipeline_on_blocking_pool() {
    let candles = synthetic(MarketScenario::Downtrend, 50);
    let scaler = fitted_scaler(&utc_assembler().assemble(&candles));
    let pipeline = Arc::new(
        PredictionPipeline::new(all_columns(), scaler, Arc::new(last_close_model()), utc_assembler()).unwrap(),
    );
    let klines: Vec<RawKline> = candles.iter().map(Candle::to_kline).collect();

    let price = tokio_test::block_on(run_pipeline(Arc::clone(&pipeline), klines)).unwrap();
    let last_close = candles.last().unwrap().close;
    assert!((price - last_close).abs() < 1e-6 * last_close);

    let err = tokio_test::block_on(run_pipeline(pipeline, Vec::new())).unwrap_err();
    assert!(err.to_string().contains("Not enough data"));
}
