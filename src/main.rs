use anyhow::{Context, Result};
use btcforecast::api::{BinanceClient, ChartRange, KeximClient};
use btcforecast::artifacts::{load_feature_columns, load_linear_model, load_scaler_params};
use btcforecast::config::Settings;
use btcforecast::features::trailing_window;
use btcforecast::service::ForecastService;
use btcforecast::synthetic::{MarketScenario, SyntheticDataGenerator};
use btcforecast::{Feature, FeatureAssembler, PredictionPipeline, RawKline};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "btcforecast",
    version,
    about = "Bitcoin next-close forecast from exchange klines and a bundled model"
)]
struct Cli {
    /// Settings file (defaults to ./btcforecast.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch recent history and forecast the next close
    Forecast,
    /// Show the current 24h ticker
    Ticker,
    /// Print candles for a chart period
    Chart {
        /// Period key: 1, 5, 30, 180, 365 or max
        #[arg(long, default_value = "30")]
        range: String,
    },
    /// Forecast from a JSON file of raw kline rows
    PredictFile { path: PathBuf },
    /// Dump assembled features for a JSON file of raw kline rows as CSV
    Indicators {
        path: PathBuf,
        /// Only print the last N rows
        #[arg(long)]
        last: Option<usize>,
    },
    /// Forecast over generated candles (no network)
    Synthetic {
        #[arg(long, value_enum, default_value = "uptrend")]
        scenario: MarketScenario,
        #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u32).range(1..=100_000))]
        candles: u32,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    setup_logging();

    match cli.command {
        Commands::Forecast => {
            let service = build_service(&settings)?;
            let forecast = service.forecast().await.map_err(|e| anyhow::anyhow!(e))?;
            println!("Predicted next close: {}", forecast.display);
            if forecast.usd_krw_rate.is_some() {
                println!("  (USD ${:.2})", forecast.usd);
            }
        }
        Commands::Ticker => {
            let service = build_service(&settings)?;
            let summary = service.current_price().await.map_err(|e| anyhow::anyhow!(e))?;
            println!("{}", summary.price_text);
            println!("{}", summary.change_text);
        }
        Commands::Chart { range } => {
            let service = build_service(&settings)?;
            let candles = service
                .chart(ChartRange::parse(&range))
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
            println!("timestamp,open,high,low,close,volume");
            for c in candles {
                println!("{},{},{},{},{},{}", c.timestamp, c.open, c.high, c.low, c.close, c.volume);
            }
        }
        Commands::PredictFile { path } => {
            let klines = read_klines(&path)?;
            let pipeline = build_pipeline(&settings)?;
            let usd = pipeline.predict(&klines)?;
            println!("Predicted next close: ${:.2}", usd);
        }
        Commands::Indicators { path, last } => {
            let klines = read_klines(&path)?;
            let candles = btcforecast::pipeline::parse_klines(&klines)?;
            let assembler = FeatureAssembler::new(settings.forecast.calendar_zone()?);
            let features = assembler.assemble(&candles);
            let rows = match last {
                Some(n) => &features[features.len().saturating_sub(n)..],
                None => &features[..],
            };

            let header: Vec<&str> = Feature::ALL.iter().map(|f| f.name()).collect();
            println!("{}", header.join(","));
            for vector in rows {
                let values: Vec<String> = vector.iter().map(|(_, v)| v.to_string()).collect();
                println!("{}", values.join(","));
            }
        }
        Commands::Synthetic {
            scenario,
            candles,
            seed,
        } => {
            let series = SyntheticDataGenerator::new(seed).generate(scenario, candles as usize, 24 * 60);
            let pipeline = build_pipeline(&settings)?;
            let usd = pipeline.predict_candles(&series)?;

            let features = pipeline.assembler().assemble(&series);
            if let Some(last) = trailing_window(&features).last() {
                println!("Last close:           ${:.2}", last.value(Feature::Close));
            }
            println!("Predicted next close: ${:.2}", usd);
        }
    }

    Ok(())
}

fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("btcforecast=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_pipeline(settings: &Settings) -> Result<PredictionPipeline> {
    let artifacts = &settings.artifacts;
    let columns = load_feature_columns(&artifacts.feature_columns)?;
    let scaler = load_scaler_params(&artifacts.scaler_params)?;
    let model = load_linear_model(&artifacts.model)?;
    let zone = settings.forecast.calendar_zone()?;

    let pipeline = PredictionPipeline::new(columns, scaler, Arc::new(model), FeatureAssembler::new(zone))?;
    Ok(pipeline)
}

fn build_service(settings: &Settings) -> Result<ForecastService> {
    let pipeline = Arc::new(build_pipeline(settings)?);
    let market = BinanceClient::new(&settings.market).map_err(|e| anyhow::anyhow!(e))?;
    let rates = KeximClient::from_settings(&settings.exchange).map_err(|e| anyhow::anyhow!(e))?;
    if rates.is_none() {
        tracing::warn!("No exchange API key configured, prices will be shown in USD");
    }

    Ok(ForecastService::new(
        market,
        rates,
        pipeline,
        settings.forecast.interval.clone(),
        settings.forecast.history_limit,
    ))
}

fn read_klines(path: &Path) -> Result<Vec<RawKline>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse klines in {}", path.display()))
}
