//! fusion-cli: Generate fused trading signals and backtest them from local files.
//!
//! Price histories come from a JSON file of `{ "SYMBOL": [candle, ...] }`.
//! External sources are read from a precomputed scores file, headline feeds,
//! or remote scoring services configured through the environment.
//!
//! Usage:
//!   cargo run -p fusion-cli -- signal --prices prices.json --symbol BTC --scores scores.json
//!   cargo run -p fusion-cli -- analyze --prices prices.json --symbols BTC AAPL SCOM
//!   cargo run -p fusion-cli -- indicators --prices prices.json --symbol AAPL
//!   cargo run -p fusion-cli -- backtest --prices prices.json --symbol AAPL --balance 10000
//!   cargo run -p fusion-cli -- accuracy --prices prices.json --symbol AAPL
//!   cargo run -p fusion-cli -- synthetic --symbol DEMO --len 250 --seed 7 --out demo.json

mod providers;

use analysis_core::synthetic::{random_walk, SeededRng};
use analysis_core::{FusionConfig, PriceProvider, RateLimiter, SourceKind, SourceScorer, Timeframe};
use anyhow::{bail, Context};
use backtest_engine::{
    BacktestConfig, BacktestEngine, BacktestRunner, FusionPath, InMemoryTradeRepository,
    TechnicalPath,
};
use chrono::{DateTime, NaiveDate, Utc};
use fusion_engine::{FusionEngine, InMemorySignalRepository};
use providers::{load_headlines, HttpLlmClient, JsonPriceProvider, PriceFile, ScoreTables};
use sentiment_analysis::{
    HttpSourceScorer, LexiconNewsScorer, LlmNewsScorer, RegionalMarketScorer,
};
use serde::Serialize;
use std::sync::Arc;

const DEFAULT_BALANCE: f64 = 10_000.0;
const DEFAULT_LLM_DAILY_LIMIT: u32 = 100;

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

fn arg_list(args: &[String], flag: &str) -> Vec<String> {
    match args.iter().position(|a| a == flag) {
        Some(idx) => args[idx + 1..]
            .iter()
            .take_while(|a| !a.starts_with("--"))
            .cloned()
            .collect(),
        None => Vec::new(),
    }
}

fn parse_date(value: &str, end_of_day: bool) -> anyhow::Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{}', expected YYYY-MM-DD", value))?;
    let time = if end_of_day {
        date.and_hms_opt(23, 59, 59)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    time.map(|t| t.and_utc())
        .with_context(|| format!("invalid date '{}'", value))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn usage() -> ! {
    eprintln!("Usage:");
    eprintln!("  fusion-cli signal --prices FILE --symbol SYM       Fused signal for one symbol");
    eprintln!("  fusion-cli analyze --prices FILE [--symbols A B]   Fused signals for many symbols");
    eprintln!("  fusion-cli indicators --prices FILE --symbol SYM   Technical indicators and score");
    eprintln!("  fusion-cli backtest --prices FILE --symbol SYM     Sliding-window backtest");
    eprintln!("  fusion-cli accuracy --prices FILE --symbol SYM     Quick directional accuracy");
    eprintln!("  fusion-cli synthetic --symbol SYM                  Seeded synthetic candles (not market data)");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scores FILE       Precomputed source scores");
    eprintln!("  --headlines FILE    Headlines per symbol for news scoring");
    eprintln!("  --start DATE        Backtest start (YYYY-MM-DD)");
    eprintln!("  --end DATE          Backtest end (YYYY-MM-DD)");
    eprintln!("  --balance N         Initial balance (default: {})", DEFAULT_BALANCE);
    eprintln!("  --fusion            Backtest the fused score with --scores held fixed");
    eprintln!("  --timeframe TF      Synthetic candle interval: 1m, 5m, 15m, 30m, 1h, 4h, 1d, 1w (default: 1d)");
    eprintln!("  --len N --seed N --drift F --volatility F --out FILE   Synthetic series shape");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  FUSION_REMOTE_SCORES_URL   Remote scorer for social, messaging and regional market");
    eprintln!("  FUSION_LLM_URL             LLM news scoring service (needs --headlines)");
    eprintln!("  FUSION_LLM_DAILY_LIMIT     LLM calls per UTC day (default: {})", DEFAULT_LLM_DAILY_LIMIT);
    std::process::exit(1);
}

fn load_prices(args: &[String]) -> anyhow::Result<JsonPriceProvider> {
    match arg_value(args, "--prices") {
        Some(path) => JsonPriceProvider::from_file(path),
        None => bail!("--prices FILE is required"),
    }
}

fn required_symbol(args: &[String]) -> anyhow::Result<String> {
    arg_value(args, "--symbol")
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .context("--symbol SYM is required")
}

/// One scorer per external source. A scores file wins over remote services;
/// news falls back from the LLM to the local lexicon.
fn build_scorers(args: &[String], config: &FusionConfig) -> anyhow::Result<Vec<Arc<dyn SourceScorer>>> {
    let tables = match arg_value(args, "--scores") {
        Some(path) => ScoreTables::from_file(path)?,
        None => ScoreTables::default(),
    };

    let mut scorers: Vec<Arc<dyn SourceScorer>> = Vec::new();
    for scorer in tables.scorers() {
        if scorer.kind() == SourceKind::RegionalMarket {
            scorers.push(Arc::new(RegionalMarketScorer::from_config(scorer, config)));
        } else {
            scorers.push(Arc::new(scorer));
        }
    }

    if let Ok(base) = std::env::var("FUSION_REMOTE_SCORES_URL") {
        for kind in [SourceKind::Social, SourceKind::Messaging, SourceKind::RegionalMarket] {
            if tables.contains(kind) {
                continue;
            }
            let remote = HttpSourceScorer::new(kind, base.clone(), config.source_timeout)?;
            if kind == SourceKind::RegionalMarket {
                scorers.push(Arc::new(RegionalMarketScorer::from_config(remote, config)));
            } else {
                scorers.push(Arc::new(remote));
            }
        }
        tracing::info!("Remote scoring enabled at {}", base);
    }

    if !tables.contains(SourceKind::News) {
        if let Some(path) = arg_value(args, "--headlines") {
            let feed = Arc::new(load_headlines(path)?);
            match std::env::var("FUSION_LLM_URL") {
                Ok(url) => {
                    let llm = Arc::new(HttpLlmClient::new(url, config.source_timeout)?);
                    let budget = Arc::new(RateLimiter::from_env(
                        "FUSION_LLM_DAILY_LIMIT",
                        DEFAULT_LLM_DAILY_LIMIT,
                    ));
                    tracing::info!("LLM news scoring enabled ({} calls/day)", budget.daily_limit());
                    scorers.push(Arc::new(LlmNewsScorer::new(feed, llm, budget)));
                }
                Err(_) => scorers.push(Arc::new(LexiconNewsScorer::new(feed))),
            }
        }
    }

    Ok(scorers)
}

fn build_engine(args: &[String], prices: Arc<JsonPriceProvider>) -> anyhow::Result<FusionEngine> {
    let config = FusionConfig::from_env()?;
    let scorers = build_scorers(args, &config)?;

    let mut engine = FusionEngine::new(prices, config)
        .with_signal_repository(Arc::new(InMemorySignalRepository::new()));
    for scorer in scorers {
        engine = engine.with_scorer(scorer);
    }
    Ok(engine)
}

async fn run_signal(args: &[String]) -> anyhow::Result<()> {
    let prices = Arc::new(load_prices(args)?);
    let symbol = required_symbol(args)?;
    let engine = build_engine(args, prices)?;
    let signal = engine.generate_fusion_signal(&symbol).await?;
    print_json(&signal)
}

async fn run_analyze(args: &[String]) -> anyhow::Result<()> {
    let prices = Arc::new(load_prices(args)?);
    let mut symbols = arg_list(args, "--symbols");
    if symbols.is_empty() {
        symbols = prices.symbols();
    }
    let engine = build_engine(args, prices)?;
    let signals = engine.run_fusion_analysis(&symbols).await;
    tracing::info!("Produced {} of {} signals", signals.len(), symbols.len());
    print_json(&signals)
}

async fn run_indicators(args: &[String]) -> anyhow::Result<()> {
    let prices = load_prices(args)?;
    let symbol = required_symbol(args)?;
    let config = FusionConfig::from_env()?;
    let candles = prices
        .get_price_history(&symbol, config.history_timeframe, config.history_limit)
        .await?;
    let reading = technical_analysis::analyze(&candles)?;
    print_json(&reading)
}

fn build_runner(args: &[String], symbol: &str, prices: Arc<JsonPriceProvider>) -> anyhow::Result<BacktestRunner> {
    let backtest_config = BacktestConfig::from_env()?;
    let fusion_config = FusionConfig::from_env()?;

    let mut engine = BacktestEngine::new(backtest_config);
    if args.iter().any(|a| a == "--fusion") {
        let tables = match arg_value(args, "--scores") {
            Some(path) => ScoreTables::from_file(path)?,
            None => bail!("--fusion needs --scores FILE"),
        };
        let mut snapshot = tables.snapshot(symbol);
        if !fusion_config.is_regional(symbol) {
            snapshot.regional_market = Default::default();
        }
        engine = engine.with_generator(Arc::new(FusionPath::new(fusion_config.clone(), snapshot)));
    } else {
        engine = engine.with_generator(Arc::new(TechnicalPath {
            direction_threshold: fusion_config.direction_threshold,
        }));
    }

    // The runner sizes its fetch by timeframe, so it must match the file's spacing.
    let timeframe = prices.timeframe_of(symbol);
    let mut runner = BacktestRunner::new(prices, engine)
        .with_trade_repository(Arc::new(InMemoryTradeRepository::new()));
    if let Some(timeframe) = timeframe {
        runner = runner.with_timeframe(timeframe);
    }
    Ok(runner)
}

async fn run_backtest(args: &[String]) -> anyhow::Result<()> {
    let prices = Arc::new(load_prices(args)?);
    let symbol = required_symbol(args)?;
    let balance: f64 = match arg_value(args, "--balance") {
        Some(v) => v.parse().with_context(|| format!("invalid balance '{}'", v))?,
        None => DEFAULT_BALANCE,
    };

    // Default range covers the whole file for this symbol.
    let history = prices.get_price_history(&symbol, Timeframe::Day1, usize::MAX).await?;
    let (first, last) = match (history.first(), history.last()) {
        (Some(f), Some(l)) => (f.timestamp, l.timestamp),
        _ => bail!("no candles for {}", symbol),
    };
    let start = match arg_value(args, "--start") {
        Some(v) => parse_date(v, false)?,
        None => first,
    };
    let end = match arg_value(args, "--end") {
        Some(v) => parse_date(v, true)?,
        None => last,
    };

    let runner = build_runner(args, &symbol, prices)?;
    let result = runner.run_backtest(&symbol, start, end, balance).await?;
    tracing::info!(
        "{}: {} trades, win rate {:.1}%, return {:.2}%, max drawdown {:.2}%",
        result.symbol,
        result.total_trades,
        result.win_rate,
        result.total_return_pct,
        result.max_drawdown_pct
    );
    print_json(&result)
}

async fn run_accuracy(args: &[String]) -> anyhow::Result<()> {
    let prices = Arc::new(load_prices(args)?);
    let symbol = required_symbol(args)?;
    let runner = build_runner(args, &symbol, prices)?;
    let accuracy = runner.quick_accuracy_test(&symbol).await?;
    print_json(&accuracy)
}

fn run_synthetic(args: &[String]) -> anyhow::Result<()> {
    let symbol = required_symbol(args)?;
    let len: usize = arg_value(args, "--len").and_then(|v| v.parse().ok()).unwrap_or(250);
    let seed: u64 = arg_value(args, "--seed").and_then(|v| v.parse().ok()).unwrap_or(42);
    let drift: f64 = arg_value(args, "--drift").and_then(|v| v.parse().ok()).unwrap_or(0.0005);
    let volatility: f64 = arg_value(args, "--volatility").and_then(|v| v.parse().ok()).unwrap_or(0.02);
    let timeframe = match arg_value(args, "--timeframe") {
        Some(tf) => Timeframe::parse(tf).with_context(|| format!("unknown timeframe '{}'", tf))?,
        None => Timeframe::Day1,
    };

    tracing::warn!("Generating SYNTHETIC candles for {} (seed {}); not market data", symbol, seed);

    let start = Utc::now() - chrono::Duration::minutes(timeframe.to_minutes() * len as i64);
    let mut rng = SeededRng::new(seed);
    let candles = random_walk(&mut rng, 100.0, len, drift, volatility, start, timeframe);

    let series = PriceFile {
        synthetic: true,
        seed: Some(seed),
        series: [(symbol.clone(), candles)].into_iter().collect(),
    };
    let body = serde_json::to_string_pretty(&series)?;
    match arg_value(args, "--out") {
        Some(path) => {
            std::fs::write(path, body).with_context(|| format!("writing {}", path))?;
            tracing::info!("Wrote {} synthetic candles to {}", len, path);
        }
        None => println!("{}", body),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fusion_cli=info,fusion_engine=info,backtest_engine=info,sentiment_analysis=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("");

    match command {
        "signal" => run_signal(&args).await,
        "analyze" => run_analyze(&args).await,
        "indicators" => run_indicators(&args).await,
        "backtest" => run_backtest(&args).await,
        "accuracy" => run_accuracy(&args).await,
        "synthetic" => run_synthetic(&args),
        _ => usage(),
    }
}
