use analysis_core::{
    AnalysisError, Direction, FusionConfig, PerSource, PriceCandle, SourceKind, SourceScore,
    DIRECTION_THRESHOLD,
};
use fusion_engine::scoring::confidence_for;
use fusion_engine::{direction_for, fuse, fuse_degraded, simplified_estimate, FusionInput};
use rayon::prelude::*;
use std::sync::Arc;

use crate::metrics::summarize;
use crate::models::*;

/// Decision produced for one sliding-window step
#[derive(Debug, Clone, PartialEq)]
pub struct StepSignal {
    pub direction: Direction,
    pub confidence: f64,
    pub score: f64,
    pub degraded: bool,
    pub reasoning: String,
}

/// Produces a decision from the candles visible at one step. `window` is
/// chronological and ends at the decision candle.
pub trait SignalGenerator: Send + Sync {
    fn generate(&self, symbol: &str, window: &[PriceCandle]) -> Result<StepSignal, AnalysisError>;
}

/// Technical score as the decision score, with the simplified estimator
/// when the window is shorter than the indicator lookback.
#[derive(Debug, Clone)]
pub struct TechnicalPath {
    pub direction_threshold: f64,
}

impl Default for TechnicalPath {
    fn default() -> Self {
        Self { direction_threshold: DIRECTION_THRESHOLD }
    }
}

impl SignalGenerator for TechnicalPath {
    fn generate(&self, _symbol: &str, window: &[PriceCandle]) -> Result<StepSignal, AnalysisError> {
        match technical_analysis::analyze(window) {
            Ok(reading) => {
                let score = reading.score.total;
                let direction = direction_for(score, self.direction_threshold);
                Ok(StepSignal {
                    direction,
                    confidence: confidence_for(score, direction),
                    score,
                    degraded: false,
                    reasoning: format!(
                        "Technical score {:+.1}% (RSI {:.0}, trend {:?})",
                        score * 100.0,
                        reading.indicators.rsi,
                        reading.indicators.trend
                    ),
                })
            }
            Err(AnalysisError::InsufficientData(_)) => {
                let closes = technical_analysis::validated_closes(window)?;
                let price = closes[closes.len() - 1];
                let estimate = simplified_estimate(&closes, price, 0.0, 0.0)?;
                Ok(StepSignal {
                    direction: direction_for(estimate.score, self.direction_threshold),
                    confidence: estimate.confidence,
                    score: estimate.score,
                    degraded: true,
                    reasoning: format!(
                        "Simplified estimate {:+.1}% (price {:+.1}% vs {}-candle mean)",
                        estimate.score * 100.0,
                        estimate.deviation * 100.0,
                        estimate.candles
                    ),
                })
            }
            Err(e) => Err(e),
        }
    }
}

/// Full fusion rules over each window, with the non-technical sources held
/// at a fixed snapshot.
#[derive(Debug, Clone)]
pub struct FusionPath {
    config: FusionConfig,
    snapshot: PerSource<SourceScore>,
}

impl FusionPath {
    pub fn new(config: FusionConfig, snapshot: PerSource<SourceScore>) -> Self {
        Self { config, snapshot }
    }
}

impl SignalGenerator for FusionPath {
    fn generate(&self, symbol: &str, window: &[PriceCandle]) -> Result<StepSignal, AnalysisError> {
        let last = window
            .last()
            .ok_or_else(|| AnalysisError::InsufficientData("empty window".to_string()))?;
        let mut input = FusionInput::new(symbol, self.snapshot, last.timestamp).with_price(last.close);

        let signal = match technical_analysis::analyze(window) {
            Ok(reading) => {
                input.sources.technical = SourceScore::new(reading.score.total, 0);
                fuse(&self.config, &input)
            }
            Err(AnalysisError::InsufficientData(_)) => {
                let closes = technical_analysis::validated_closes(window)?;
                input.data_sources_used.retain(|k| *k != SourceKind::Technical);
                let estimate = simplified_estimate(
                    &closes,
                    last.close,
                    self.snapshot.news.score,
                    self.snapshot.social.score,
                )?;
                fuse_degraded(&self.config, &input, &estimate)
            }
            Err(e) => return Err(e),
        };

        Ok(StepSignal {
            direction: signal.direction,
            confidence: signal.confidence,
            score: signal.final_score,
            degraded: signal.degraded,
            reasoning: signal.reasoning,
        })
    }
}

/// Open simulated position
struct Position {
    action: Direction,
    entry_date: chrono::DateTime<chrono::Utc>,
    entry_price: f64,
    shares: f64,
    confidence: f64,
    reasoning: String,
}

impl Position {
    /// Direction-adjusted fractional move from entry.
    fn move_at(&self, price: f64) -> f64 {
        let raw = (price - self.entry_price) / self.entry_price;
        if self.action == Direction::Sell {
            -raw
        } else {
            raw
        }
    }

    fn close(self, exit_date: chrono::DateTime<chrono::Utc>, exit_price: f64, exit_reason: ExitReason) -> BacktestTrade {
        let per_share = match self.action {
            Direction::Sell => self.entry_price - exit_price,
            _ => exit_price - self.entry_price,
        };
        BacktestTrade {
            entry_date: self.entry_date,
            exit_date,
            action: self.action,
            entry_price: self.entry_price,
            exit_price,
            shares: self.shares,
            return_abs: per_share * self.shares,
            return_pct: per_share / self.entry_price * 100.0,
            confidence: self.confidence,
            exit_reason,
            reasoning: self.reasoning,
        }
    }
}

fn valid_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

/// One independent backtest of a batch
#[derive(Debug, Clone)]
pub struct BacktestJob {
    pub symbol: String,
    pub candles: Vec<PriceCandle>,
    pub initial_balance: f64,
}

/// Sliding-window, single-position backtester.
#[derive(Clone)]
pub struct BacktestEngine {
    config: BacktestConfig,
    generator: Arc<dyn SignalGenerator>,
}

impl Default for BacktestEngine {
    fn default() -> Self {
        Self::new(BacktestConfig::default())
    }
}

impl BacktestEngine {
    pub fn new(config: BacktestConfig) -> Self {
        Self {
            config,
            generator: Arc::new(TechnicalPath::default()),
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn SignalGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    pub fn generator(&self) -> &dyn SignalGenerator {
        self.generator.as_ref()
    }

    /// Replay `candles` (oldest first) and simulate trades.
    ///
    /// At each step `i` the signal sees `candles[i + 1 - window..=i]`. Entries
    /// fill at close `i`; exits fill at close `i + 1` so the decision candle
    /// never prices its own exit. A step whose signal fails is skipped.
    pub fn run(
        &self,
        symbol: &str,
        candles: &[PriceCandle],
        initial_balance: f64,
    ) -> Result<BacktestResult, AnalysisError> {
        self.config.validate()?;
        if candles.is_empty() {
            return Err(AnalysisError::InsufficientData(format!("no candles for {}", symbol)));
        }
        if !valid_price(initial_balance) {
            return Err(AnalysisError::InvalidData(format!(
                "initial balance must be positive, got {}",
                initial_balance
            )));
        }

        let n = candles.len();
        let window = self.config.window;
        tracing::info!(
            "Backtesting {} over {} candles (window {}, balance {:.2})",
            symbol,
            n,
            window,
            initial_balance
        );

        let mut balance = initial_balance;
        let mut position: Option<Position> = None;
        let mut trades: Vec<BacktestTrade> = Vec::new();
        let mut skipped_steps: u32 = 0;

        for i in window..n.saturating_sub(1) {
            let slice = &candles[i + 1 - window..=i];
            let signal = match self.generator.generate(symbol, slice) {
                Ok(signal) => signal,
                Err(e) => {
                    let failure = AnalysisError::BacktestStepFailure(format!("step {}: {}", i, e));
                    tracing::warn!("Skipping {} {}", symbol, failure);
                    skipped_steps += 1;
                    continue;
                }
            };

            let price = candles[i].close;
            if !valid_price(price) {
                tracing::warn!("Skipping {} step {}: invalid close {}", symbol, i, price);
                skipped_steps += 1;
                continue;
            }

            match position.take() {
                None => {
                    if signal.direction.is_directional() {
                        let shares = (balance * self.config.capital_reserve / price).floor();
                        if shares >= 1.0 {
                            tracing::debug!(
                                "{} step {}: open {} {} @ {:.4}",
                                symbol,
                                i,
                                signal.direction.to_label(),
                                shares,
                                price
                            );
                            position = Some(Position {
                                action: signal.direction,
                                entry_date: candles[i].timestamp,
                                entry_price: price,
                                shares,
                                confidence: signal.confidence,
                                reasoning: signal.reasoning,
                            });
                        } else {
                            tracing::debug!("{} step {}: balance too small for one share", symbol, i);
                        }
                    }
                }
                Some(open) => {
                    let moved = open.move_at(price);
                    let exit_reason = if signal.direction.opposes(open.action) {
                        Some(ExitReason::OpposingSignal)
                    } else if moved <= -self.config.stop_loss_pct {
                        Some(ExitReason::StopLoss)
                    } else if moved >= self.config.take_profit_pct {
                        Some(ExitReason::TakeProfit)
                    } else {
                        None
                    };

                    let fill = candles[i + 1].close;
                    match exit_reason {
                        Some(reason) if valid_price(fill) => {
                            let trade = open.close(candles[i + 1].timestamp, fill, reason);
                            balance += trade.return_abs;
                            tracing::debug!(
                                "{} step {}: close {:?} @ {:.4}, P&L {:.2}",
                                symbol,
                                i,
                                reason,
                                fill,
                                trade.return_abs
                            );
                            trades.push(trade);
                        }
                        _ => position = Some(open),
                    }
                }
            }
        }

        if let Some(open) = position.take() {
            let last = &candles[n - 1];
            let exit_price = if valid_price(last.close) { last.close } else { open.entry_price };
            let trade = open.close(last.timestamp, exit_price, ExitReason::EndOfData);
            balance += trade.return_abs;
            trades.push(trade);
        }

        let metrics = summarize(initial_balance, &trades);
        let result = BacktestResult {
            symbol: symbol.to_string(),
            period: Period {
                start: candles[0].timestamp,
                end: candles[n - 1].timestamp,
            },
            initial_balance,
            final_balance: balance,
            total_trades: metrics.total_trades,
            winning_trades: metrics.winning_trades,
            losing_trades: metrics.losing_trades,
            win_rate: metrics.win_rate,
            total_return_pct: (balance - initial_balance) / initial_balance * 100.0,
            max_drawdown_pct: metrics.max_drawdown_pct,
            average_return: metrics.average_return,
            sharpe_ratio: metrics.sharpe_ratio,
            skipped_steps,
            trades,
        };

        tracing::info!(
            "Backtest {} complete: {} trades, win rate {:.1}%, return {:.2}%, {} skipped steps",
            symbol,
            result.total_trades,
            result.win_rate,
            result.total_return_pct,
            result.skipped_steps
        );
        Ok(result)
    }

    /// Independent backtests in parallel, results in job order.
    pub fn run_batch(&self, jobs: &[BacktestJob]) -> Vec<(String, Result<BacktestResult, AnalysisError>)> {
        jobs.par_iter()
            .map(|job| {
                (
                    job.symbol.clone(),
                    self.run(&job.symbol, &job.candles, job.initial_balance),
                )
            })
            .collect()
    }
}
